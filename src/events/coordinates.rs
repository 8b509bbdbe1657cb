//! Parsing of coordinate meta values.
//!
//! Coordinates are stored either as PHP-serialized arrays
//! (`a:2:{s:8:"latitude";d:41.9;s:9:"longitude";d:12.5;}`) or as JSON
//! objects (`{"latitude": 41.9, "longitude": 12.5}`).

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static SERIALIZED_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"s:\d+:"(latitude|longitude)";(?:d|i):(-?[0-9]+(?:\.[0-9]+)?(?:[eE][-+]?[0-9]+)?);|s:\d+:"(latitude|longitude)";s:\d+:"(-?[0-9]+(?:\.[0-9]+)?)";"#)
        .expect("coordinate pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Both components finite, within range, and not the `0,0` placeholder.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && !(self.latitude == 0.0 && self.longitude == 0.0)
    }
}

#[derive(Deserialize)]
struct JsonCoordinates {
    latitude: serde_json::Value,
    longitude: serde_json::Value,
}

fn json_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse a stored coordinate value. Returns `None` unless both components are present and valid.
pub fn parse(raw: &str) -> Option<Coordinates> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let coords = if raw.starts_with('{') {
        let parsed: JsonCoordinates = serde_json::from_str(raw).ok()?;
        Coordinates {
            latitude: json_number(&parsed.latitude)?,
            longitude: json_number(&parsed.longitude)?,
        }
    } else {
        let mut latitude = None;
        let mut longitude = None;
        for caps in SERIALIZED_FIELD.captures_iter(raw) {
            let (key, value) = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
                (Some(k), Some(v), _, _) | (_, _, Some(k), Some(v)) => (k.as_str(), v.as_str()),
                _ => continue,
            };
            let value: f64 = value.parse().ok()?;
            match key {
                "latitude" => latitude = Some(value),
                _ => longitude = Some(value),
            }
        }
        Coordinates {
            latitude: latitude?,
            longitude: longitude?,
        }
    };

    coords.is_valid().then_some(coords)
}

/// First valid coordinates among the candidates, in order.
pub fn first_valid<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<Coordinates> {
    candidates.into_iter().flatten().find_map(parse)
}
