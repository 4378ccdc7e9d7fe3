//! Hash partitioning between the map and reduce side of a keyed stage.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

pub fn bucket_of<K: Hash + ?Sized>(key: &K, n_buckets: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % n_buckets as u64) as usize
}

/// Splits one map task's output into `n_buckets` reduce inputs.
pub fn partition_by_key<K, A, I>(pairs: I, n_buckets: usize) -> Vec<Vec<(K, A)>>
where
    K: Hash,
    I: IntoIterator<Item = (K, A)>,
{
    let mut buckets: Vec<Vec<(K, A)>> = (0..n_buckets).map(|_| Vec::new()).collect();
    for (k, a) in pairs {
        buckets[bucket_of(&k, n_buckets)].push((k, a));
    }
    buckets
}

/// Gathers bucket `j` of every map output into reduce input `j`.
pub fn transpose<T>(map_outputs: Vec<Vec<Vec<T>>>, n_buckets: usize) -> Vec<Vec<T>> {
    let mut buckets: Vec<Vec<T>> = (0..n_buckets).map(|_| Vec::new()).collect();
    for output in map_outputs {
        for (j, bucket) in output.into_iter().enumerate() {
            buckets[j].extend(bucket);
        }
    }
    buckets
}
