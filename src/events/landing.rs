//! City landing-page URIs derived from site paths.
//!
//! A conference site lives at `/city/year/slug/`. Every such site implies
//! three landing pages: the city, the city's year, and the conference title
//! across years. Re-runs of a title in the same year are disambiguated with a
//! numeric suffix (`training-2`) which is not part of the landing URI.

use super::EventCache;
use crate::error::Result;
use std::collections::BTreeSet;
use tracing::debug;

/// Strip a trailing `-N` disambiguation suffix. A slug that is only a suffix is left alone.
pub fn strip_numeric_suffix(slug: &str) -> &str {
    match slug.rsplit_once('-') {
        Some((base, digits))
            if !base.is_empty()
                && !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit()) =>
        {
            base
        }
        _ => slug,
    }
}

/// The three landing URIs implied by a site path, or `None` unless the path
/// has exactly three non-empty segments.
pub fn uris_for_path(path: &str) -> Option<[String; 3]> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let [city, year, slug] = segments.as_slice() else {
        return None;
    };
    if city.is_empty() || year.is_empty() || slug.is_empty() {
        return None;
    }
    let title = strip_numeric_suffix(slug);
    Some([
        format!("/{city}/"),
        format!("/{city}/{year}/"),
        format!("/{city}/{title}/"),
    ])
}

/// Deduplicated landing URIs for a set of site paths.
pub fn landing_uris<'a>(paths: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    paths
        .into_iter()
        .filter_map(uris_for_path)
        .flatten()
        .collect()
}

impl EventCache {
    /// Landing URIs for every site in the network directory.
    pub async fn landing_uris(&self) -> Result<BTreeSet<String>> {
        let sites = self.source.network_sites().await?;
        let uris = landing_uris(sites.iter().map(|s| s.path.as_str()));
        debug!(sites = sites.len(), uris = uris.len(), "enumerated landing URIs");
        Ok(uris)
    }
}
