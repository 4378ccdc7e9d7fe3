use std::cmp::Ordering;

use common::{Collection, Engine, Result};

use crate::scatter::ProductMax;

/// Highest maximum first; equal values fall back to the smaller product id.
pub fn ranking(a: &ProductMax, b: &ProductMax) -> Ordering {
    // `+ 0.0` folds -0.0 into 0.0 so the two tie.
    let (a_value, b_value) = (a.max_normalized_rating + 0.0, b.max_normalized_rating + 0.0);
    b_value
        .total_cmp(&a_value)
        .then_with(|| a.product_id.cmp(&b.product_id))
}

/// The `top` best products under [`ranking`]. Returns every product, ranked,
/// when there are fewer than `top`.
pub fn select_top<E: Engine>(
    engine: &E,
    maxima: Collection<ProductMax>,
    top: usize,
) -> Result<Vec<ProductMax>> {
    if top == 0 {
        return Ok(Vec::new());
    }
    engine.ordered_top_k(maxima, top, ranking)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max(product_id: &str, value: f64) -> ProductMax {
        ProductMax {
            product_id: product_id.to_owned(),
            max_normalized_rating: value,
        }
    }

    #[test]
    fn higher_value_first() {
        assert_eq!(ranking(&max("B", 2.0), &max("A", 1.0)), Ordering::Less);
        assert_eq!(ranking(&max("A", -1.0), &max("B", 0.5)), Ordering::Greater);
    }

    #[test]
    fn ties_break_on_product_id() {
        assert_eq!(ranking(&max("A", 1.0), &max("B", 1.0)), Ordering::Less);
        assert_eq!(ranking(&max("B", 1.0), &max("A", 1.0)), Ordering::Greater);
        assert_eq!(ranking(&max("A", 0.0), &max("B", -0.0)), Ordering::Less);
        assert_eq!(ranking(&max("B", 0.0), &max("A", -0.0)), Ordering::Greater);
    }
}
