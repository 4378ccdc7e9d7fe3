use std::convert::TryFrom;

use common::{Error, Result};

/// Validated run parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    /// Number of scatter buckets, K.
    pub fan_out: usize,
    /// Number of ranked products to report, T.
    pub top: usize,
}

impl Params {
    /// A non-positive fan-out is rejected; a negative `top` means "report
    /// nothing".
    pub fn new(fan_out: i64, top: i64) -> Result<Self> {
        if fan_out <= 0 {
            return Err(Error::config(format!(
                "K must be a positive integer, got {}",
                fan_out
            )));
        }
        let fan_out = usize::try_from(fan_out)
            .map_err(|_| Error::config(format!("K is too large: {}", fan_out)))?;
        let top = usize::try_from(top.max(0))
            .map_err(|_| Error::config(format!("T is too large: {}", top)))?;
        Ok(Self { fan_out, top })
    }

    pub fn parse(fan_out: &str, top: &str) -> Result<Self> {
        let fan_out = fan_out
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("K must be an integer, got {:?}", fan_out)))?;
        let top = parse_count(top)
            .ok_or_else(|| Error::config(format!("T must be an integer, got {:?}", top)))?;
        Ok(Self {
            top,
            ..Self::new(fan_out, 0)?
        })
    }
}

/// Parses T, saturating integers outside the `i64` range: a huge T reports
/// everything and a hugely negative one reports nothing.
fn parse_count(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Some(usize::try_from(n.max(0)).unwrap_or(usize::MAX));
    }
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { 0 } else { usize::MAX })
}
