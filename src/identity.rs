//! Stable keys for entities.
//!
//! Players carry a natural identifier and use it unchanged. Garages only have
//! a coordinate pair, so their key is a 4-hex-digit digest of `"x,y"`. Two
//! distinct garages may collide on that key; this is kept as-is so ids match
//! those produced by existing map clients.

use crate::types::{Category, CategoryGroup};

/// Resolve the key for an entity.
///
/// `natural_id` wins whenever present and non-empty. Otherwise the key is
/// derived from the coordinates; an entity with neither gets `None`.
pub fn derive_key(
    category: Category,
    natural_id: Option<&str>,
    x: Option<f64>,
    y: Option<f64>,
) -> Option<String> {
    if let Some(id) = natural_id.filter(|id| !id.is_empty()) {
        return Some(id.to_string());
    }
    match (x, y) {
        (Some(x), Some(y)) => {
            if category.group() != CategoryGroup::Garages {
                log::debug!("{category} entity without natural id keyed by coordinates");
            }
            Some(coordinate_key(x, y))
        }
        _ => None,
    }
}

/// Garage key: `hash = hash * 31 + unit` over the UTF-16 units of `"x,y"`,
/// wrapped to 32 bits, rendered as the low four hex digits.
pub fn coordinate_key(x: f64, y: f64) -> String {
    let text = format!("{},{}", number_text(x), number_text(y));
    let hash = text
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    format!("{:04x}", (hash as u32) & 0xffff)
}

/// Shortest decimal form of a coordinate: integral values print without a
/// fractional part and negative zero prints as `0`.
fn number_text(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    format!("{v}")
}
