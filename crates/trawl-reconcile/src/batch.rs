//! Stride batching.
//!
//! Both workflows partition their work items the same way: worker slot
//! `k` of `concurrency` receives the items at positions `k, k+C, k+2C, …`,
//! chunked into batches of `batch_size`. Each wave of `concurrency`
//! batches therefore spans a wide index range, spreading load across the
//! persistence shards instead of hammering a contiguous run.
//!
//! The partition is a pure function of its inputs, with no runtime-order
//! dependence, so a replayed workflow produces byte-identical batches.

/// Partition `items` into stride-assigned batches.
///
/// Batches are ordered slot by slot: all of slot 0's batches, then all
/// of slot 1's, and so on. `batch_size` and `concurrency` are clamped to
/// at least 1.
pub fn partition_batches<T: Clone>(
    items: &[T],
    batch_size: usize,
    concurrency: usize,
) -> Vec<Vec<T>> {
    let batch_size = batch_size.max(1);
    let concurrency = concurrency.max(1);

    let mut batches = Vec::new();
    for slot in 0..concurrency.min(items.len()) {
        let assigned: Vec<T> = items
            .iter()
            .skip(slot)
            .step_by(concurrency)
            .cloned()
            .collect();
        for chunk in assigned.chunks(batch_size) {
            batches.push(chunk.to_vec());
        }
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_distribution() {
        let shards: Vec<u32> = (0..30).collect();
        let batches = partition_batches(&shards, 5, 3);
        assert_eq!(
            batches,
            vec![
                vec![0, 3, 6, 9, 12],
                vec![15, 18, 21, 24, 27],
                vec![1, 4, 7, 10, 13],
                vec![16, 19, 22, 25, 28],
                vec![2, 5, 8, 11, 14],
                vec![17, 20, 23, 26, 29],
            ]
        );
    }

    #[test]
    fn test_every_item_appears_exactly_once() {
        let shards: Vec<u32> = (0..97).collect();
        let batches = partition_batches(&shards, 7, 4);
        let mut seen: Vec<u32> = batches.into_iter().flatten().collect();
        seen.sort_unstable();
        assert_eq!(seen, shards);
    }

    #[test]
    fn test_fewer_items_than_concurrency() {
        let shards: Vec<u32> = vec![10, 20];
        let batches = partition_batches(&shards, 5, 8);
        assert_eq!(batches, vec![vec![10], vec![20]]);
    }

    #[test]
    fn test_empty_items() {
        let batches = partition_batches::<u32>(&[], 5, 3);
        assert!(batches.is_empty());
    }

    #[test]
    fn test_single_slot_preserves_order() {
        let shards: Vec<u32> = (0..7).collect();
        let batches = partition_batches(&shards, 3, 1);
        assert_eq!(batches, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
    }

    #[test]
    fn test_zero_parameters_clamped() {
        let shards: Vec<u32> = (0..4).collect();
        let batches = partition_batches(&shards, 0, 0);
        assert_eq!(batches, vec![vec![0], vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn test_partition_is_deterministic() {
        let shards: Vec<u32> = (0..50).collect();
        assert_eq!(
            partition_batches(&shards, 6, 5),
            partition_batches(&shards, 6, 5)
        );
    }
}
