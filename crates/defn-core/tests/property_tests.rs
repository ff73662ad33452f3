use std::collections::BTreeSet;

use defn_core::*;
use proptest::prelude::*;

fn ident() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9_]{0,8}").unwrap()
}

fn unique_idents(min: usize, max: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::btree_set(ident(), min..=max)
        .prop_map(|names| names.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

fn scalar() -> impl Strategy<Value = (DType, Value)> {
    prop_oneof![
        any::<bool>().prop_map(|b| (DType::Bool, Value::Bool(b))),
        any::<i64>().prop_map(|i| (DType::Int, Value::Int(i))),
        (-1.0e6f64..1.0e6).prop_map(|f| (DType::Float, Value::Float(f))),
        ident().prop_map(|s| (DType::Str, Value::Str(s))),
    ]
}

#[derive(Debug, Clone)]
enum Kind {
    Input,
    Attribute { typed: bool },
}

fn kind() -> impl Strategy<Value = Kind> {
    prop_oneof![
        Just(Kind::Input),
        any::<bool>().prop_map(|typed| Kind::Attribute { typed }),
    ]
}

fn signature() -> impl Strategy<Value = Signature> {
    unique_idents(0, 8)
        .prop_flat_map(|names| {
            let n = names.len();
            (
                Just(names),
                proptest::collection::vec((kind(), scalar()), n),
            )
        })
        .prop_map(|(names, params)| {
            names
                .into_iter()
                .zip(params)
                .fold(Signature::new("Generated"), |sig, (name, (kind, (dtype, value)))| {
                    match kind {
                        Kind::Input => sig.input(name, dtype),
                        Kind::Attribute { typed: true } => sig.typed_attr(name, dtype, value),
                        Kind::Attribute { typed: false } => sig.attr(name, value),
                    }
                })
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn schemas_are_deterministic(sig in signature()) {
        let first = definition(sig.clone(), |_| Ok(Value::None)).expect("build");
        let second = definition(sig.clone(), |_| Ok(Value::None)).expect("build");

        prop_assert_ne!(&first, &second);
        prop_assert_eq!(first.schema(), second.schema());
        prop_assert_eq!(first.digest(), second.digest());
        prop_assert_eq!(reflect(&sig).expect("reflect"), first.schema().clone());
    }

    #[test]
    fn every_missing_input_is_reported(
        names in unique_idents(1, 8),
        mask in proptest::collection::vec(any::<bool>(), 8),
    ) {
        let sig = names
            .iter()
            .fold(Signature::new("Wide"), |sig, name| sig.input(name.clone(), DType::Int));
        let wide = definition(sig, |_| Ok(0)).expect("build");

        let supplied: BTreeSet<&String> = names
            .iter()
            .zip(&mask)
            .filter(|(_, keep)| **keep)
            .map(|(name, _)| name)
            .collect();
        let inputs = kwargs(supplied.iter().map(|name| (name.as_str(), 1)));
        let expected_missing: Vec<String> = names
            .iter()
            .filter(|name| !supplied.contains(name))
            .cloned()
            .collect();

        let result = wide.default_instance().expect("instance").call(&inputs);
        if expected_missing.is_empty() {
            prop_assert_eq!(result, Ok(Value::Int(0)));
        } else {
            prop_assert_eq!(
                result,
                Err(DefnError::MissingRequiredInputs {
                    defn: "Wide".to_string(),
                    missing: expected_missing,
                })
            );
        }
    }

    #[test]
    fn first_declared_attribute_default_wins(defaults in proptest::collection::vec(any::<i64>(), 1..5)) {
        let bases: Vec<DefnType> = defaults
            .iter()
            .enumerate()
            .map(|(i, default)| {
                definition(Signature::new(format!("Base{i}")).attr("n", *default), |args| {
                    Ok(args.int("n")?)
                })
                .expect("build base")
            })
            .collect();
        let sig = bases
            .iter()
            .enumerate()
            .fold(Signature::new("Joined"), |sig, (i, base)| sig.base(format!("b{i}"), base));
        let joined = definition(sig, |_| Ok(Value::None)).expect("build");

        let n: Vec<&DefnAttribute> = joined.attributes(true).filter(|a| a.name == "n").collect();
        prop_assert_eq!(n.len(), 1);
        prop_assert_eq!(n[0].default.clone(), Some(Value::Int(defaults[0])));
    }

    #[test]
    fn overrides_are_used_verbatim(value in any::<i64>()) {
        let failing = definition(Signature::new("Failing").input("x", DType::Int), |args| {
            Err::<Value, _>(args.fail("evaluated"))
        })
        .expect("build");
        let outer = definition(Signature::new("Outer").base("inner", &failing), |args| {
            Ok(args.get("inner")?.clone())
        })
        .expect("build");

        let result = outer
            .default_instance()
            .expect("instance")
            .call(&kwargs([("inner", value)]));
        prop_assert_eq!(result, Ok(Value::Int(value)));
    }
}
