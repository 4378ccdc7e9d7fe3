use std::cmp::Ordering;

/// A partitioned, in-memory collection of values.
///
/// Engines consume collections by value and hand back new ones; a
/// collection is never mutated once a stage has produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    partitions: Vec<Vec<T>>,
}

impl<T> Collection<T> {
    pub fn from_partitions(partitions: Vec<Vec<T>>) -> Self {
        Self { partitions }
    }

    /// Splits `items` into exactly `max(n, 1)` contiguous partitions.
    /// Trailing partitions may be empty when there are fewer items than
    /// partitions.
    pub fn partition(items: Vec<T>, n: usize) -> Self {
        let n = n.max(1);
        let size = (items.len() + n - 1) / n;

        let mut items = items.into_iter();
        let partitions = (0..n)
            .map(|_| items.by_ref().take(size).collect())
            .collect();
        Self { partitions }
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn len(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(Vec::is_empty)
    }

    pub fn partitions(&self) -> &[Vec<T>] {
        &self.partitions
    }

    pub fn into_partitions(self) -> Vec<Vec<T>> {
        self.partitions
    }

    pub fn into_vec(self) -> Vec<T> {
        self.partitions.into_iter().flatten().collect()
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(items: Vec<T>) -> Self {
        Self::partition(items, 1)
    }
}

/// Returns the first `count` items under `cmp`, sorted.
///
/// `cmp` should be a total order for the result to be deterministic.
pub fn take_ordered<T, F>(mut items: Vec<T>, count: usize, cmp: F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    if count == 0 {
        return Vec::new();
    }
    if count < items.len() {
        items.select_nth_unstable_by(count - 1, &cmp);
        items.truncate(count);
    }
    items.sort_by(cmp);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_is_contiguous() {
        let c = Collection::partition((0..7).collect(), 3);
        assert_eq!(
            c.partitions(),
            &[vec![0, 1, 2], vec![3, 4, 5], vec![6]][..]
        );
        assert_eq!(c.len(), 7);
        assert_eq!(c.into_vec(), (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn partition_pads_with_empty() {
        let c = Collection::partition(vec![1, 2], 4);
        assert_eq!(c.num_partitions(), 4);
        assert_eq!(c.len(), 2);
        assert!(!c.is_empty());

        let empty = Collection::<u8>::partition(vec![], 0);
        assert_eq!(empty.num_partitions(), 1);
        assert!(empty.is_empty());
    }

    #[test]
    fn take_ordered_selects_head() {
        let items = vec![5, 1, 9, 3, 7, 3];
        assert_eq!(take_ordered(items.clone(), 3, |a, b| b.cmp(a)), vec![9, 7, 5]);
        assert_eq!(take_ordered(items.clone(), 0, |a, b| a.cmp(b)), Vec::<i32>::new());
        assert_eq!(
            take_ordered(items, 100, |a, b| a.cmp(b)),
            vec![1, 3, 3, 5, 7, 9]
        );
    }
}
