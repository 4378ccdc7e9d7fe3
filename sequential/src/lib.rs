//! Single-threaded reference engine.
//!
//! Partitions are processed one after another on the calling thread, but
//! keyed operations still fold each partition separately before merging,
//! so combine functions are exercised exactly as a parallel engine would.

use std::{cmp::Ordering, collections::HashMap};

use common::{take_ordered, Collection, Data, Engine, Key, Result};
use itertools::Itertools;

#[derive(Debug, Clone, Copy)]
pub struct SequentialEngine {
    parallelism: usize,
}

impl SequentialEngine {
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }
}

impl Default for SequentialEngine {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Engine for SequentialEngine {
    fn default_parallelism(&self) -> usize {
        self.parallelism
    }

    fn flat_map<T, U, F>(&self, input: Collection<T>, f: F) -> Result<Collection<U>>
    where
        T: Data,
        U: Data,
        F: Fn(T) -> Result<Vec<U>> + Send + Sync + 'static,
    {
        let mut partitions = Vec::with_capacity(input.num_partitions());
        for partition in input.into_partitions() {
            let mut out = Vec::with_capacity(partition.len());
            for item in partition {
                out.extend(f(item)?);
            }
            partitions.push(out);
        }
        Ok(Collection::from_partitions(partitions))
    }

    fn map_partitions_with_index<T, U, F>(&self, input: Collection<T>, f: F) -> Result<Collection<U>>
    where
        T: Data,
        U: Data,
        F: Fn(usize, Vec<T>) -> Result<Vec<U>> + Send + Sync + 'static,
    {
        let partitions = input
            .into_partitions()
            .into_iter()
            .enumerate()
            .map(|(index, partition)| f(index, partition))
            .collect::<Result<Vec<_>>>()?;
        Ok(Collection::from_partitions(partitions))
    }

    fn group_by_key<K, V>(&self, input: Collection<(K, V)>) -> Result<Collection<(K, Vec<V>)>>
    where
        K: Key,
        V: Data,
    {
        let groups = input.into_vec().into_iter().into_group_map();
        Ok(groups.into_iter().collect_vec().into())
    }

    fn aggregate_by_key<K, V, Z, S, C>(
        &self,
        input: Collection<(K, V)>,
        zero: Z,
        seq: S,
        comb: C,
    ) -> Result<Collection<(K, Z)>>
    where
        K: Key,
        V: Data,
        Z: Data,
        S: Fn(Z, V) -> Z + Send + Sync + 'static,
        C: Fn(Z, Z) -> Z + Send + Sync + 'static,
    {
        let partials = input.into_partitions().into_iter().map(|partition| {
            let mut folded: HashMap<K, Z> = HashMap::new();
            for (k, v) in partition {
                let z = folded.remove(&k).unwrap_or_else(|| zero.clone());
                folded.insert(k, seq(z, v));
            }
            folded
        });

        let mut merged: HashMap<K, Z> = HashMap::new();
        for (k, z) in partials.flatten() {
            let z = match merged.remove(&k) {
                Some(prev) => comb(prev, z),
                None => z,
            };
            merged.insert(k, z);
        }
        Ok(merged.into_iter().collect_vec().into())
    }

    fn reduce_by_key<K, V, F>(&self, input: Collection<(K, V)>, f: F) -> Result<Collection<(K, V)>>
    where
        K: Key,
        V: Data,
        F: Fn(V, V) -> V + Send + Sync + 'static,
    {
        let mut reduced: HashMap<K, V> = HashMap::new();
        for (k, v) in input.into_vec() {
            let v = match reduced.remove(&k) {
                Some(prev) => f(prev, v),
                None => v,
            };
            reduced.insert(k, v);
        }
        Ok(reduced.into_iter().collect_vec().into())
    }

    fn ordered_top_k<T, F>(&self, input: Collection<T>, count: usize, cmp: F) -> Result<Vec<T>>
    where
        T: Data,
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Ok(take_ordered(input.into_vec(), count, cmp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Error;

    fn sorted<T: Ord>(mut items: Vec<T>) -> Vec<T> {
        items.sort();
        items
    }

    #[test]
    fn flat_map_keeps_partitions() {
        let engine = SequentialEngine::new(3);
        let input = engine.parallelize((1..=6).collect_vec());
        let out = engine.flat_map(input, |x: i32| Ok(vec![x; x as usize % 2])).unwrap();
        assert_eq!(out.num_partitions(), 3);
        assert_eq!(out.into_vec(), vec![1, 3, 5]);
    }

    #[test]
    fn flat_map_stops_on_error() {
        let engine = SequentialEngine::default();
        let input = engine.parallelize(vec![1, 2, 3]);
        let result = engine.flat_map(input, |x: i32| {
            if x == 2 {
                Err(Error::engine("boom"))
            } else {
                Ok(vec![x])
            }
        });
        assert!(matches!(result, Err(Error::Engine(_))));
    }

    #[test]
    fn map_partitions_sees_indices() {
        let engine = SequentialEngine::new(3);
        let input = engine.parallelize(vec!['a', 'b', 'c', 'd', 'e']);
        let out = engine
            .map_partitions_with_index(input, |index, partition: Vec<char>| {
                Ok(partition.into_iter().map(|c| (index, c)).collect())
            })
            .unwrap();
        assert_eq!(out.num_partitions(), 3);
        assert_eq!(
            out.into_vec(),
            vec![(0, 'a'), (0, 'b'), (1, 'c'), (1, 'd'), (2, 'e')]
        );
    }

    #[test]
    fn group_by_key() {
        let engine = SequentialEngine::new(2);
        let input = engine.parallelize(vec![("a", 1), ("b", 2), ("a", 3)]);
        let groups = engine.group_by_key(input).unwrap().into_vec();
        let groups = sorted(
            groups
                .into_iter()
                .map(|(k, vs)| (k, sorted(vs)))
                .collect_vec(),
        );
        assert_eq!(groups, vec![("a", vec![1, 3]), ("b", vec![2])]);
    }

    #[test]
    fn aggregate_by_key_merges_partitions() {
        let engine = SequentialEngine::new(3);
        let input = engine.parallelize(vec![("a", 1), ("a", 2), ("b", 5), ("a", 4), ("b", 1), ("c", 0)]);
        let out = engine
            .aggregate_by_key(input, (0, 0), |(n, s), v| (n + 1, s + v), |a, b| (a.0 + b.0, a.1 + b.1))
            .unwrap();
        assert_eq!(
            sorted(out.into_vec()),
            vec![("a", (3, 7)), ("b", (2, 6)), ("c", (1, 0))]
        );
    }

    #[test]
    fn reduce_by_key() {
        let engine = SequentialEngine::default();
        let input = engine.parallelize(vec![("x", 3), ("y", 1), ("x", 7), ("x", 5)]);
        let out = engine.reduce_by_key(input, std::cmp::max).unwrap();
        assert_eq!(sorted(out.into_vec()), vec![("x", 7), ("y", 1)]);
    }

    #[test]
    fn ordered_top_k() {
        let engine = SequentialEngine::new(4);
        let input = engine.parallelize(vec![4, 8, 1, 9, 2]);
        assert_eq!(engine.ordered_top_k(input, 2, |a, b| b.cmp(a)).unwrap(), vec![9, 8]);
    }
}
