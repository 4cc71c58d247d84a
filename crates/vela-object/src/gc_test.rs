use crate::gc::Heap;
use crate::value::Value;

#[test]
fn interning_the_same_bytes_twice_yields_the_same_object() {
    let mut heap = Heap::new();
    let a = heap.intern_str("hello");
    let b = heap.intern_str("hello");
    assert_eq!(a, b);
}

#[test]
fn interning_distinct_bytes_yields_distinct_objects() {
    let mut heap = Heap::new();
    let a = heap.intern_str("hello");
    let b = heap.intern_str("world");
    assert_ne!(a, b);
}

#[test]
fn unreachable_string_is_reclaimed_by_sweep() {
    let mut heap = Heap::new();
    let garbage = heap.intern_str("garbage");
    assert_eq!(heap.strings.len(), 1);

    // No roots marked: `garbage` stays white and is swept.
    heap.trace_references();
    heap.sweep_strings();
    heap.sweep();

    assert_eq!(heap.strings.len(), 0);
}

#[test]
fn marked_string_survives_a_collection() {
    let mut heap = Heap::new();
    let kept = heap.intern_str("kept");

    heap.mark_object(kept);
    heap.trace_references();
    heap.sweep_strings();
    heap.sweep();

    assert_eq!(heap.strings.len(), 1);
    assert_eq!(heap.strings.get(kept), Some(Value::Nil));
}

#[test]
fn stress_gc_forces_collection_regardless_of_threshold() {
    let mut heap = Heap::new();
    heap.stress_gc = true;
    assert!(heap.should_collect());
}

#[test]
fn below_initial_threshold_does_not_force_collection() {
    let heap = Heap::new();
    assert!(!heap.should_collect());
}

#[test]
fn interning_is_idempotent_for_arbitrary_byte_content() {
    use proptest::prelude::*;

    proptest!(|(text in "[ -~]{0,64}")| {
        let mut heap = Heap::new();
        let first = heap.intern_str(&text);
        let second = heap.intern_str(&text);
        prop_assert_eq!(first, second);
        prop_assert_eq!(heap.strings.len(), 1);
    });
}
