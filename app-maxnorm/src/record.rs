use common::ParseError;

/// One parsed review line. The timestamp is read and dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub product_id: String,
    pub user_id: String,
    pub rating: f64,
}

/// Parses `productId,userId,rating,timestamp`.
pub fn parse_record(line: &str) -> Result<Review, ParseError> {
    let fields: Vec<&str> = line.split(',').collect();
    let (product_id, user_id, rating) = match fields[..] {
        [product_id, user_id, rating, _timestamp] => (product_id, user_id, rating),
        _ => {
            return Err(ParseError::FieldCount {
                record: line.to_owned(),
                found: fields.len(),
            })
        }
    };

    let rating: f64 = rating
        .trim()
        .parse()
        .map_err(|source| ParseError::Rating {
            record: line.to_owned(),
            source,
        })?;
    if !rating.is_finite() {
        return Err(ParseError::NonFinite {
            record: line.to_owned(),
        });
    }

    Ok(Review {
        product_id: product_id.to_owned(),
        user_id: user_id.to_owned(),
        rating,
    })
}
