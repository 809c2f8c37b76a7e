use assert_matches::assert_matches;
use trellis_core::{Traverser, Value};

use crate::memory::{Memory, MemoryKey, MemoryPartial, Reducer, Slot};
use crate::ComputerError;

fn memory() -> Memory {
    Memory::new([
        MemoryKey::new("total", Reducer::Sum, 0),
        MemoryKey::new("seen", Reducer::Append, Value::List(Vec::new())),
        MemoryKey::new("tags", Reducer::Union, Value::List(Vec::new())),
        MemoryKey::new("any", Reducer::Or, false),
        MemoryKey::traversers("parked"),
    ])
}

#[test]
fn partials_merge_in_order() {
    let mut memory = memory();
    let mut first = MemoryPartial::default();
    first.add(&memory, "seen", Slot::Value("a".into())).unwrap();
    first.add(&memory, "total", Slot::Value(2.into())).unwrap();
    let mut second = MemoryPartial::default();
    second.add(&memory, "seen", Slot::Value("b".into())).unwrap();
    second.add(&memory, "seen", Slot::Value("c".into())).unwrap();
    second.add(&memory, "total", Slot::Value(3.into())).unwrap();

    memory.merge(first).unwrap();
    memory.merge(second).unwrap();
    assert_eq!(memory.get("total"), Ok(&Value::Int(5)));
    assert_eq!(
        memory.get("seen"),
        Ok(&Value::List(vec!["a".into(), "b".into(), "c".into()]))
    );
}

#[test]
fn union_skips_present_items() {
    let mut memory = memory();
    memory.add("tags", Value::List(vec!["x".into(), "y".into()])).unwrap();
    memory.add("tags", "x".into()).unwrap();
    memory.add("tags", "z".into()).unwrap();
    assert_eq!(
        memory.get("tags"),
        Ok(&Value::List(vec!["x".into(), "y".into(), "z".into()]))
    );
}

#[test]
fn or_flag_resets_on_set() {
    let mut memory = memory();
    memory.add("any", Value::Bool(true)).unwrap();
    assert_eq!(memory.get("any"), Ok(&Value::Bool(true)));
    memory.set("any", Value::Bool(false)).unwrap();
    assert_eq!(memory.get("any"), Ok(&Value::Bool(false)));
}

#[test]
fn undeclared_keys_are_rejected() {
    let mut memory = memory();
    assert_matches!(memory.get("nope"), Err(ComputerError::UndeclaredMemoryKey(k)) if k == "nope");
    assert_matches!(
        memory.add("nope", 1.into()),
        Err(ComputerError::UndeclaredMemoryKey(_))
    );
    let mut partial = MemoryPartial::default();
    assert_matches!(
        partial.add(&memory, "nope", Slot::Value(1.into())),
        Err(ComputerError::UndeclaredMemoryKey(_))
    );
}

#[test]
fn reducer_type_errors_name_the_key() {
    let mut memory = memory();
    let err = memory.add("total", "ten".into()).unwrap_err();
    assert_matches!(err, ComputerError::MemoryType { ref key, .. } if key == "total");
}

#[test]
fn traversers_and_values_do_not_mix() {
    let mut memory = memory();
    assert_matches!(memory.get("parked"), Err(ComputerError::MemoryType { .. }));
    assert_matches!(memory.traversers("total"), Err(ComputerError::MemoryType { .. }));
    assert_matches!(memory.add("parked", 1.into()), Err(ComputerError::MemoryType { .. }));
    let mut partial = MemoryPartial::default();
    assert_matches!(
        partial.add(&memory, "total", Slot::Traversers(Vec::new())),
        Err(ComputerError::MemoryType { .. })
    );
}

#[test]
fn parked_traversers_are_taken_once() {
    let mut memory = memory();
    memory.park("parked", vec![Traverser::new(1)]).unwrap();
    memory.park("parked", vec![Traverser::new(2)]).unwrap();
    assert_eq!(memory.traversers("parked").unwrap().len(), 2);

    let taken = memory.take_traversers("parked").unwrap();
    assert_eq!(taken.len(), 2);
    assert_eq!(taken[1].object, Value::Int(2));
    assert!(memory.traversers("parked").unwrap().is_empty());
}

#[test]
fn snapshot_separates_slot_kinds() {
    let mut memory = memory();
    memory.park("parked", vec![Traverser::new(1)]).unwrap();
    let snapshot = memory.snapshot();
    assert_eq!(snapshot.get("total"), Some(&Value::Int(0)));
    assert_eq!(snapshot.get("parked"), None);
    assert_eq!(snapshot.traversers("parked").map(<[_]>::len), Some(1));
    assert_eq!(snapshot.keys().count(), 5);
}
