use std::{io::Write, path::Path};

use crate::{scatter::ProductMax, Params};

/// Writes the parameter echo followed by one line per ranked product.
pub fn write_report<W: Write>(
    out: &mut W,
    params: &Params,
    input: &Path,
    ranked: &[ProductMax],
) -> std::io::Result<()> {
    writeln!(
        out,
        "INPUT PARAMETERS: K={} T={} file={}",
        params.fan_out,
        params.top,
        input.display()
    )?;
    writeln!(out, "OUTPUT:")?;
    for product in ranked {
        writeln!(
            out,
            "Product {} maxNormRating {:?}",
            product.product_id, product.max_normalized_rating
        )?;
    }
    Ok(())
}
