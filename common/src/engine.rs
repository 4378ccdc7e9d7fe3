use std::{cmp::Ordering, fs, hash::Hash, path::Path};

use crate::{Collection, Result};

/// Values that may cross a worker boundary.
pub trait Data: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Data for T {}

/// Values that may be grouped on.
pub trait Key: Data + Eq + Hash {}

impl<T: Data + Eq + Hash> Key for T {}

/// The dataflow operations a pipeline is written against.
///
/// An engine decides how partitions are scheduled; callers only describe
/// the transformation. Every function handed to an engine may run
/// concurrently on disjoint partitions, more than once if a task is
/// retried, so it must be pure. Combine functions must be associative and
/// commutative.
pub trait Engine {
    /// Number of partitions [`Engine::parallelize`] splits into.
    fn default_parallelism(&self) -> usize;

    fn parallelize<T: Data>(&self, items: Vec<T>) -> Collection<T> {
        Collection::partition(items, self.default_parallelism())
    }

    /// Reads a newline-delimited file into at least `min_partitions`
    /// partitions, one element per line.
    fn text_file(&self, path: &Path, min_partitions: usize) -> Result<Collection<String>> {
        let content = fs::read_to_string(path)?;
        let lines = content.lines().map(str::to_owned).collect();
        Ok(Collection::partition(lines, min_partitions.max(self.default_parallelism())))
    }

    /// Applies `f` to every element independently and concatenates the
    /// outputs. The first `Err` returned by `f` fails the whole stage.
    fn flat_map<T, U, F>(&self, input: Collection<T>, f: F) -> Result<Collection<U>>
    where
        T: Data,
        U: Data,
        F: Fn(T) -> Result<Vec<U>> + Send + Sync + 'static;

    /// Applies `f` to whole partitions, passing each partition's index.
    /// Partition indices and the order within a partition are fixed by the
    /// input collection, so they are the same on every retry of a task.
    fn map_partitions_with_index<T, U, F>(&self, input: Collection<T>, f: F) -> Result<Collection<U>>
    where
        T: Data,
        U: Data,
        F: Fn(usize, Vec<T>) -> Result<Vec<U>> + Send + Sync + 'static;

    fn group_by_key<K, V>(&self, input: Collection<(K, V)>) -> Result<Collection<(K, Vec<V>)>>
    where
        K: Key,
        V: Data;

    /// Folds every value of a key into a copy of `zero` with `seq`, then
    /// merges the partial results of different partitions with `comb`.
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
        C: Fn(Z, Z) -> Z + Send + Sync + 'static;

    fn reduce_by_key<K, V, F>(&self, input: Collection<(K, V)>, f: F) -> Result<Collection<(K, V)>>
    where
        K: Key,
        V: Data,
        F: Fn(V, V) -> V + Send + Sync + 'static;

    /// Returns the `count` first elements under `cmp`, in order.
    fn ordered_top_k<T, F>(&self, input: Collection<T>, count: usize, cmp: F) -> Result<Vec<T>>
    where
        T: Data,
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static;
}
