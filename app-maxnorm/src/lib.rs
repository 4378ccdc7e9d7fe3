//! Maximum normalized rating per product.
//!
//! Every rating is re-centred on its author's average, the largest
//! re-centred rating of each product is found with a scatter-gather
//! reduction, and the best products are ranked.

pub mod average;
pub mod params;
pub mod record;
pub mod report;
pub mod scatter;
pub mod top;

use common::{Collection, Engine, Result};

pub use average::{normalize_ratings, NormalizedRating, UserAccumulator};
pub use params::Params;
pub use record::{parse_record, Review};
pub use report::write_report;
pub use scatter::{
    max_normalized_ratings, ProductMax, RecordPosition, ScatterEntry, ScatterSource,
    SeededScatter, ThreadRngScatter,
};
pub use top::{ranking, select_top};

/// Runs the whole pipeline over raw `productId,userId,rating,timestamp`
/// lines and returns the `params.top` best products.
pub fn max_norm_ratings<E, S>(
    engine: &E,
    lines: Collection<String>,
    params: &Params,
    source: S,
) -> Result<Vec<ProductMax>>
where
    E: Engine,
    S: ScatterSource,
{
    if params.fan_out == 0 {
        return Err(common::Error::config("scatter fan-out K must be at least 1"));
    }
    let normalized = normalize_ratings(engine, lines)?;
    let maxima = max_normalized_ratings(engine, normalized, params.fan_out, source)?;
    select_top(engine, maxima, params.top)
}
