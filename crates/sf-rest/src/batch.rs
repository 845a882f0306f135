//! Splitting record lists into request-sized batches.

/// Split `items` into contiguous chunks of at most `max` elements, each
/// paired with the index of its first element in `items`.
///
/// `max` is treated as at least 1.
pub fn batches<T>(items: &[T], max: usize) -> impl Iterator<Item = (usize, &[T])> {
    let size = max.max(1);
    items
        .chunks(size)
        .enumerate()
        .map(move |(n, chunk)| (n * size, chunk))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_count_and_coverage() {
        for n in [1usize, 7, 99, 100, 101, 479, 1000] {
            for b in [1usize, 3, 100, 200] {
                let items: Vec<usize> = (0..n).collect();
                let split: Vec<_> = batches(&items, b).collect();

                assert_eq!(split.len(), n.div_ceil(b), "n={n} b={b}");
                assert!(split.iter().all(|(_, chunk)| chunk.len() <= b));

                let joined: Vec<usize> = split.iter().flat_map(|(_, c)| c.iter().copied()).collect();
                assert_eq!(joined, items);

                for (offset, chunk) in &split {
                    assert_eq!(chunk[0], *offset);
                }
            }
        }
    }

    #[test]
    fn test_479_by_100() {
        let items = vec![(); 479];
        let sizes: Vec<(usize, usize)> = batches(&items, 100).map(|(o, c)| (o, c.len())).collect();
        assert_eq!(
            sizes,
            vec![(0, 100), (100, 100), (200, 100), (300, 100), (400, 79)]
        );
    }

    #[test]
    fn test_zero_max_is_clamped() {
        let items = [1, 2, 3];
        assert_eq!(batches(&items, 0).count(), 3);
    }

    #[test]
    fn test_empty_input() {
        let items: [u8; 0] = [];
        assert_eq!(batches(&items, 200).count(), 0);
    }
}
