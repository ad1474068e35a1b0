// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for predicate loading and planning.
// Run with: cargo +nightly fuzz run fuzz_predicate_json
//
// Arbitrary bytes are decoded as a JSON predicate and, when that succeeds,
// planned for every object kind. Planning must reject bad trees with an
// error, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

use moniq_model::ObjectKind;
use moniq_planner::{Captures, PagingHints, Planner, Predicate};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    // Deeply nested input only slows the fuzzer down.
    if input.len() > 4096 {
        return;
    }
    let Ok(predicate) = Predicate::from_json(input) else {
        return;
    };

    let planner = Planner::default();
    for kind in ObjectKind::ALL {
        if let Ok(plan) = planner.plan(kind, &predicate, &Captures::new(), PagingHints::default()) {
            let _ = plan.explain();
        }
    }
});
