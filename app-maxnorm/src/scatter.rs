//! Exact per-product maximum over skewed keys.
//!
//! Ratings are first spread over `fan_out` random buckets so no single
//! group ever holds every rating of a popular product. Each bucket keeps
//! one local maximum per product, and a final reduce by product takes the
//! maximum of those candidates.

use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    hash::{Hash, Hasher},
    sync::Arc,
};

use common::{Collection, Engine, Error, Result};
use log::{debug, info};
use rand::{rngs::StdRng, thread_rng, Rng, SeedableRng};

use crate::average::NormalizedRating;

/// Per-product result of the scatter-gather reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductMax {
    pub product_id: String,
    pub max_normalized_rating: f64,
}

/// A normalized rating tagged with the bucket it was scattered to.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterEntry {
    pub scatter_key: usize,
    pub product_id: String,
    pub value: f64,
}

/// Where a rating sits in the collection being scattered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordPosition {
    pub partition: usize,
    pub offset: usize,
}

/// Chooses the bucket of one rating.
///
/// The returned key is taken modulo `fan_out` by the reducer. A source is
/// called from several workers at once and must not depend on the order
/// in which records are seen; `position` is fixed by the input, not by
/// scheduling.
pub trait ScatterSource: Send + Sync + 'static {
    fn scatter_key(&self, rating: &NormalizedRating, position: RecordPosition, fan_out: usize)
        -> usize;
}

impl<F> ScatterSource for F
where
    F: Fn(&NormalizedRating, RecordPosition, usize) -> usize + Send + Sync + 'static,
{
    fn scatter_key(
        &self,
        rating: &NormalizedRating,
        position: RecordPosition,
        fan_out: usize,
    ) -> usize {
        self(rating, position, fan_out)
    }
}

/// Draws every key independently from the calling thread's generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngScatter;

impl ScatterSource for ThreadRngScatter {
    fn scatter_key(&self, _: &NormalizedRating, _: RecordPosition, fan_out: usize) -> usize {
        thread_rng().gen_range(0..fan_out)
    }
}

/// Derives the key from a seed and the record's position, so a retried
/// task scatters exactly as the first attempt did while repeated ratings
/// of one product still spread over every bucket.
#[derive(Debug, Clone, Copy)]
pub struct SeededScatter(pub u64);

impl ScatterSource for SeededScatter {
    fn scatter_key(&self, _: &NormalizedRating, position: RecordPosition, fan_out: usize) -> usize {
        let mut hasher = DefaultHasher::new();
        self.0.hash(&mut hasher);
        position.hash(&mut hasher);
        StdRng::seed_from_u64(hasher.finish()).gen_range(0..fan_out)
    }
}

/// Tags a rating with its bucket in `[0, fan_out)`.
pub fn assign_scatter_key<S>(
    source: &S,
    rating: NormalizedRating,
    position: RecordPosition,
    fan_out: usize,
) -> ScatterEntry
where
    S: ScatterSource + ?Sized,
{
    let scatter_key = source.scatter_key(&rating, position, fan_out) % fan_out;
    ScatterEntry {
        scatter_key,
        product_id: rating.product_id,
        value: rating.value,
    }
}

/// Keeps the largest value per product within one bucket.
pub fn local_max<I>(ratings: I) -> Vec<(String, f64)>
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut maxima: HashMap<String, f64> = HashMap::new();
    for (product_id, value) in ratings {
        maxima
            .entry(product_id)
            .and_modify(|max| *max = max.max(value))
            .or_insert(value);
    }
    maxima.into_iter().collect()
}

/// Computes the exact maximum normalized rating of every product.
///
/// `fan_out` only changes how the work is grouped, never the result.
pub fn max_normalized_ratings<E, S>(
    engine: &E,
    ratings: Collection<NormalizedRating>,
    fan_out: usize,
    source: S,
) -> Result<Collection<ProductMax>>
where
    E: Engine,
    S: ScatterSource,
{
    if fan_out == 0 {
        return Err(Error::config("scatter fan-out K must be at least 1"));
    }

    let source = Arc::new(source);
    let scattered = engine.map_partitions_with_index(ratings, move |partition, ratings| {
        let entries: Vec<_> = ratings
            .into_iter()
            .enumerate()
            .map(|(offset, rating)| {
                let position = RecordPosition { partition, offset };
                let entry = assign_scatter_key(&*source, rating, position, fan_out);
                (entry.scatter_key, (entry.product_id, entry.value))
            })
            .collect();
        Ok(entries)
    })?;

    let buckets = engine.group_by_key(scattered)?;
    info!("scattered ratings over {} buckets", buckets.len());

    let candidates = engine.flat_map(buckets, |(key, ratings): (usize, Vec<(String, f64)>)| {
        let maxima = local_max(ratings);
        debug!("bucket {}: {} candidate maxima", key, maxima.len());
        Ok(maxima)
    })?;

    let maxima = engine.reduce_by_key(candidates, f64::max)?;
    info!("found maxima for {} products", maxima.len());

    engine.flat_map(maxima, |(product_id, max_normalized_rating)| {
        Ok(vec![ProductMax {
            product_id,
            max_normalized_rating,
        }])
    })
}
