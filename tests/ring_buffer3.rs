// Property tests for ring buffer ordering and slicing.

use flow_guard_core::primitives::RingBuffer;
use proptest::prelude::*;

/// Reference slicing over a plain vector: negative indices count from the end,
/// bounds are clamped, inverted ranges are empty.
fn reference_slice(values: &[u64], start: Option<isize>, stop: Option<isize>) -> Vec<u64> {
    let len = values.len() as isize;
    let adjust = |i: isize| {
        let i = if i < 0 { i + len } else { i };
        i.max(0).min(len) as usize
    };
    let start = start.map(adjust).unwrap_or(0);
    let stop = stop.map(adjust).unwrap_or(values.len());
    if start >= stop {
        Vec::new()
    } else {
        values[start..stop].to_vec()
    }
}

fn filled(capacity: usize, puts: usize) -> (RingBuffer<u64>, Vec<u64>) {
    let mut buffer = RingBuffer::new(capacity).unwrap();
    let mut pushed = Vec::new();
    for i in 0..puts as u64 {
        buffer.put(i);
        pushed.push(i);
    }
    (buffer, pushed)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_len_is_min_of_puts_and_capacity(
        capacity in 1usize..64,
        puts in 0usize..300
    ) {
        let (buffer, _) = filled(capacity, puts);
        prop_assert_eq!(buffer.len(), puts.min(capacity));
        prop_assert_eq!(buffer.is_full(), puts >= capacity);
    }

    #[test]
    fn prop_snapshot_keeps_most_recent_in_order(
        capacity in 1usize..64,
        puts in 0usize..300
    ) {
        let (buffer, pushed) = filled(capacity, puts);
        let expected = pushed[pushed.len().saturating_sub(capacity)..].to_vec();
        prop_assert_eq!(buffer.snapshot(), expected);
    }

    #[test]
    fn prop_slice_matches_reference(
        capacity in 1usize..32,
        puts in 0usize..100,
        start in proptest::option::of(-40isize..40),
        stop in proptest::option::of(-40isize..40)
    ) {
        let (buffer, _) = filled(capacity, puts);
        let logical = buffer.snapshot();
        let expected = reference_slice(&logical, start, stop);

        let actual = match (start, stop) {
            (Some(s), Some(e)) => buffer.slice(s..e),
            (Some(s), None) => buffer.slice(s..),
            (None, Some(e)) => buffer.slice(..e),
            (None, None) => buffer.slice(..),
        };
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_reverse_step_is_reversed_snapshot(
        capacity in 1usize..32,
        puts in 0usize..100
    ) {
        let (buffer, _) = filled(capacity, puts);
        let mut expected = buffer.snapshot();
        expected.reverse();
        prop_assert_eq!(buffer.slice_step(.., -1).unwrap(), expected);
    }

    #[test]
    fn prop_forward_step_matches_step_by(
        capacity in 1usize..32,
        puts in 0usize..100,
        step in 1isize..6
    ) {
        let (buffer, _) = filled(capacity, puts);
        let expected: Vec<u64> = buffer.snapshot().into_iter().step_by(step as usize).collect();
        prop_assert_eq!(buffer.slice_step(.., step).unwrap(), expected);
    }
}
