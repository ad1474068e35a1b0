// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for values, records and the capability table

use proptest::prelude::*;

use moniq_model::{
    CapabilityTable, EnumKind, ObjectKind, Property, Record, RecordKey, Value, ValueType,
};

fn arb_comparable() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Int),
        "[a-zA-Z]{0,6}".prop_map(Value::Str),
        prop::sample::select(vec![1i64, 3, 4, 5, 6, 7, 10])
            .prop_map(|code| Value::Enum(EnumKind::Status.from_code(code).unwrap())),
        any::<bool>().prop_map(Value::Bool),
    ]
}

proptest! {
    #[test]
    fn test_compare_is_antisymmetric(a in arb_comparable(), b in arb_comparable()) {
        let forward = a.compare(&b);
        let backward = b.compare(&a).map(|o| o.reverse());
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn test_equals_is_symmetric(a in arb_comparable(), b in arb_comparable()) {
        prop_assert_eq!(a.equals(&b), b.equals(&a));
    }

    #[test]
    fn test_equals_is_reflexive(a in arb_comparable()) {
        prop_assert!(a.equals(&a));
    }

    #[test]
    fn test_status_names_resolve_in_any_case(
        code in prop::sample::select(vec![1i64, 3, 4, 5, 6, 7, 10]),
        upper in any::<bool>()
    ) {
        let name = EnumKind::Status.name_of(code).unwrap();
        let written = if upper { name.to_uppercase() } else { name.to_lowercase() };
        let parsed = EnumKind::Status.from_name(&written).unwrap();
        prop_assert_eq!(parsed.code, code);
    }

    #[test]
    fn test_integral_coercion_keeps_value(n in -1_000_000i64..1_000_000) {
        let as_float = ValueType::Float.coerce(&Value::Int(n)).unwrap();
        let back = ValueType::Int.coerce(&as_float).unwrap();
        prop_assert_eq!(back, Value::Int(n));
        prop_assert_eq!(
            CapabilityTable::standard().serialize(Property::Id, &Value::Int(n)).unwrap(),
            n.to_string()
        );
    }

    #[test]
    fn test_object_key_ignores_other_properties(
        id in any::<i64>(),
        a in "[a-z]{1,8}",
        b in "[a-z]{1,8}"
    ) {
        let first = Record::new(ObjectKind::Sensor, id).with(Property::Name, a);
        let second = Record::new(ObjectKind::Sensor, id).with(Property::Name, b);
        prop_assert_eq!(first.key(), second.key());
        prop_assert_eq!(first.key(), RecordKey::Object(id));
    }

    #[test]
    fn test_log_key_distinguishes_messages(
        id in any::<i64>(),
        a in "[a-z]{1,8}",
        b in "[a-z]{1,8}"
    ) {
        let first = Record::new(ObjectKind::Log, id).with(Property::Message, a.clone());
        let second = Record::new(ObjectKind::Log, id).with(Property::Message, b.clone());
        prop_assert_eq!(first.key() == second.key(), a == b);
    }
}
