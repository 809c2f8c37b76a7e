use trellis_core::Value;

use crate::{Operand, P, PredicateOp};

fn literal(p: &P, value: impl Into<Value>) -> bool {
    p.evaluate::<()>(&value.into(), &mut |_| Err(())).unwrap()
}

#[test]
fn comparisons_are_numeric_aware() {
    assert!(literal(&P::eq(2), 2.0));
    assert!(literal(&P::gt(1), 1.5));
    assert!(literal(&P::lte(3.0), 3));
    assert!(!literal(&P::lt(1), "a"));
}

#[test]
fn ranges() {
    assert!(literal(&P::between(1, 3), 1));
    assert!(!literal(&P::between(1, 3), 3));
    assert!(!literal(&P::inside(1, 3), 1));
    assert!(literal(&P::inside(1, 3), 2));
    assert!(literal(&P::outside(1, 3), 4));
    assert!(!literal(&P::outside(1, 3), 2));
}

#[test]
fn membership() {
    let p = P::within(["a", "b"]);
    assert!(literal(&p, "b"));
    assert!(!literal(&p, "c"));
    assert!(literal(&P::without([1, 2]), 3));
}

#[test]
fn text_predicates() {
    assert!(literal(&P::starting_with("you"), "young guns"));
    assert!(literal(&P::test(PredicateOp::Containing, "wild"), "the wild bunch"));
    assert!(!literal(&P::test(PredicateOp::EndingWith, "x"), 1));
}

#[test]
fn connectives() {
    let p = P::gt(1).and(P::lt(5));
    assert!(literal(&p, 3));
    assert!(!literal(&p, 6));
    assert!(literal(&P::lt(0).or(P::gt(10)), 11));
    assert!(literal(&P::eq(1).negate(), 2));
}

#[test]
fn label_operands_resolve_at_evaluation() {
    let p = P::within(["friends"]).into_label_operands();
    assert_eq!(p.labels(), vec!["friends"]);
    let mut resolve = |label: &str| -> Result<Value, String> {
        match label {
            "friends" => Ok(Value::List(vec![Value::from("jen"), Value::from("dave")])),
            other => Err(other.to_owned()),
        }
    };
    assert!(p.evaluate(&Value::from("jen"), &mut resolve).unwrap());
    assert!(!p.evaluate(&Value::from("bob"), &mut resolve).unwrap());

    let unbound = P::eq("missing").into_label_operands();
    assert_eq!(
        unbound.evaluate(&Value::Int(1), &mut resolve),
        Err("missing".to_owned())
    );
}

#[test]
fn multi_value_within_stays_literal() {
    let p = P::within(["a", "b"]).into_label_operands();
    assert!(p.labels().is_empty());
    assert_eq!(
        p,
        P::Test {
            op: PredicateOp::Within,
            operand: Operand::Value(Value::List(vec![Value::from("a"), Value::from("b")])),
        }
    );
}

#[test]
fn names_roundtrip() {
    for op in PredicateOp::ALL {
        assert_eq!(PredicateOp::from_name(op.as_str()), Some(op));
    }
}

#[test]
fn display() {
    assert_eq!(P::eq("a").into_label_operands().to_string(), "eq(@a)");
    assert_eq!(P::gt(1).and(P::lt(5)).to_string(), "and(gt(1), lt(5))");
}
