//! Re-centres every rating on its author's average rating.

use common::{Collection, Engine, Result};
use log::info;

use crate::record::parse_record;

/// A rating minus the average of all ratings by the same user.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRating {
    pub product_id: String,
    pub value: f64,
}

/// Everything one user reviewed, folded incrementally.
///
/// Product ids and ratings are kept as pairs so merging two partial
/// accumulators can never misalign them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserAccumulator {
    pub count: usize,
    pub rating_sum: f64,
    pub reviews: Vec<(String, f64)>,
}

impl UserAccumulator {
    /// Folds one `(product_id, rating)` pair in.
    pub fn push(mut self, (product_id, rating): (String, f64)) -> Self {
        self.count += 1;
        self.rating_sum += rating;
        self.reviews.push((product_id, rating));
        self
    }

    /// Merges a partial accumulator built from a disjoint set of reviews.
    pub fn merge(mut self, other: Self) -> Self {
        self.count += other.count;
        self.rating_sum += other.rating_sum;
        self.reviews.extend(other.reviews);
        self
    }

    /// `None` for an accumulator nothing was folded into.
    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.rating_sum / self.count as f64)
        }
    }

    /// One normalized rating per folded review.
    pub fn into_normalized(self) -> Vec<NormalizedRating> {
        let average = match self.average() {
            Some(average) => average,
            None => return Vec::new(),
        };
        self.reviews
            .into_iter()
            .map(|(product_id, rating)| NormalizedRating {
                product_id,
                value: rating - average,
            })
            .collect()
    }
}

/// Parses raw review lines and re-centres each rating on its user's
/// average. Fails on the first malformed line.
pub fn normalize_ratings<E: Engine>(
    engine: &E,
    lines: Collection<String>,
) -> Result<Collection<NormalizedRating>> {
    let by_user = engine.flat_map(lines, |line| {
        let review = parse_record(&line)?;
        Ok(vec![(review.user_id, (review.product_id, review.rating))])
    })?;
    info!("parsed {} reviews", by_user.len());

    let users = engine.aggregate_by_key(
        by_user,
        UserAccumulator::default(),
        UserAccumulator::push,
        UserAccumulator::merge,
    )?;
    info!("aggregated {} users", users.len());

    let normalized = engine.flat_map(users, |(_user, acc): (String, UserAccumulator)| {
        Ok(acc.into_normalized())
    })?;
    info!("normalized {} ratings", normalized.len());
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folded(reviews: &[(&str, f64)]) -> UserAccumulator {
        reviews
            .iter()
            .map(|&(p, r)| (p.to_owned(), r))
            .fold(UserAccumulator::default(), UserAccumulator::push)
    }

    #[test]
    fn push_keeps_invariants() {
        let acc = folded(&[("P1", 5.0), ("P2", 3.0)]);
        assert_eq!(acc.count, 2);
        assert_eq!(acc.reviews.len(), acc.count);
        assert_eq!(acc.rating_sum, 8.0);
        assert_eq!(acc.average(), Some(4.0));
    }

    #[test]
    fn merge_matches_single_fold() {
        let all = folded(&[("P1", 1.0), ("P2", 2.0), ("P3", 4.0), ("P4", 5.0)]);
        let left = folded(&[("P1", 1.0), ("P2", 2.0)]);
        let right = folded(&[("P3", 4.0), ("P4", 5.0)]);

        let merged = left.clone().merge(right.clone());
        assert_eq!(merged, all);

        let swapped = right.merge(left);
        assert_eq!(swapped.count, all.count);
        assert_eq!(swapped.rating_sum, all.rating_sum);
        for pair in &all.reviews {
            assert!(swapped.reviews.contains(pair));
        }
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let acc = folded(&[("P1", 2.5)]);
        assert_eq!(acc.clone().merge(UserAccumulator::default()), acc);
        assert_eq!(UserAccumulator::default().merge(acc.clone()), acc);
    }

    #[test]
    fn single_review_normalizes_to_zero() {
        let normalized = folded(&[("P1", 3.7)]).into_normalized();
        assert_eq!(
            normalized,
            vec![NormalizedRating {
                product_id: "P1".to_owned(),
                value: 0.0,
            }]
        );
    }

    #[test]
    fn normalized_values_sum_to_zero() {
        let normalized = folded(&[("P1", 1.0), ("P2", 2.0), ("P3", 4.5), ("P4", 0.5)])
            .into_normalized();
        assert_eq!(normalized.len(), 4);
        let sum: f64 = normalized.iter().map(|n| n.value).sum();
        assert!(sum.abs() < 1e-9);
        assert_eq!(normalized[2].product_id, "P3");
        assert_eq!(normalized[2].value, 2.5);
    }

    #[test]
    fn empty_accumulator_emits_nothing() {
        assert_eq!(UserAccumulator::default().average(), None);
        assert!(UserAccumulator::default().into_normalized().is_empty());
    }
}
