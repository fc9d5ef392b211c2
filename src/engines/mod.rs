//! Static page descriptions for the supported image search engines

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::models::Resolution;

/// Supported search engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchEngine {
    Google,
    DuckDuckGo,
}

impl SearchEngine {
    pub const ALL: [SearchEngine; 2] = [SearchEngine::Google, SearchEngine::DuckDuckGo];

    pub fn profile(self) -> &'static SearchEngineProfile {
        match self {
            Self::Google => &GOOGLE,
            Self::DuckDuckGo => &DUCKDUCKGO,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::DuckDuckGo => "DuckDuckGo",
        }
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SearchEngine {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|engine| engine.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("Unknown search engine: {s}"))
    }
}

/// Selectors are opaque strings handed to the browser driver as-is
#[derive(Debug, Clone)]
pub struct EngineSelectors {
    /// Result thumbnails in the listing
    pub thumbnail: &'static str,
    /// Resolution labels rendered under each thumbnail, one per thumbnail
    pub thumbnail_resolution: Option<&'static str>,
    /// "Show more results" control
    pub load_more: Option<&'static str>,
    /// Full-size image elements in the detail panel
    pub full_image: &'static str,
    /// Attribute of `full_image` holding the image URL
    pub full_image_attribute: &'static str,
    /// Resolution labels paired with each `full_image`
    pub full_image_resolution: Option<&'static str>,
    /// Progress indicator shown while the full image loads
    pub loading_indicator: Option<&'static str>,
}

/// Static description of one engine's results page
#[derive(Debug, Clone)]
pub struct SearchEngineProfile {
    pub engine: SearchEngine,
    /// Search URL with `{q}` placeholders
    pub search_url: &'static str,
    /// Separator inside "WIDTH × HEIGHT" labels
    pub resolution_divider: Option<&'static str>,
    pub selectors: EngineSelectors,
}

static GOOGLE: SearchEngineProfile = SearchEngineProfile {
    engine: SearchEngine::Google,
    search_url: "https://www.google.com/search?safe=off&site=&tbm=isch&source=hp&q={q}&oq={q}&gs_l=img",
    resolution_divider: Some(" × "),
    selectors: EngineSelectors {
        thumbnail: "img.rg_i",
        thumbnail_resolution: Some("div.O1vY7 > span"),
        load_more: Some("input.mye4qd"),
        full_image: "img.n3VNCb",
        full_image_attribute: "src",
        full_image_resolution: Some("span.VSIspc"),
        loading_indicator: Some("div.k7O2sd"),
    },
};

static DUCKDUCKGO: SearchEngineProfile = SearchEngineProfile {
    engine: SearchEngine::DuckDuckGo,
    search_url: "https://duckduckgo.com/?q={q}&iar=images&iax=images&ia=images",
    resolution_divider: None,
    selectors: EngineSelectors {
        thumbnail: "img.tile--img__img",
        thumbnail_resolution: None,
        load_more: None,
        full_image: "a.detail__media__img-link",
        full_image_attribute: "href",
        full_image_resolution: None,
        loading_indicator: None,
    },
};

impl SearchEngineProfile {
    /// Substitute the URL-encoded query into the search URL template
    pub fn build_search_url(&self, query: &str) -> String {
        let encoded = urlencoding::encode(query);
        self.search_url.replace("{q}", &encoded)
    }

    /// Parse a displayed resolution label using this engine's divider
    pub fn parse_resolution(&self, label: &str) -> Option<Resolution> {
        parse_resolution_label(label, self.resolution_divider?)
    }
}

/// Split a "WIDTH<divider>HEIGHT" label into exactly two integers.
pub fn parse_resolution_label(label: &str, divider: &str) -> Option<Resolution> {
    let mut parts = label.trim().split(divider);
    let width = parts.next()?.trim().parse().ok()?;
    let height = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Resolution::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_google_style_label() {
        assert_eq!(
            parse_resolution_label("1024 × 768", " × "),
            Some(Resolution::new(1024, 768))
        );
    }

    #[test]
    fn rejects_malformed_labels() {
        assert_eq!(parse_resolution_label("1024", " × "), None);
        assert_eq!(parse_resolution_label("1024 × 768 × 2", " × "), None);
        assert_eq!(parse_resolution_label("wide × tall", " × "), None);
        assert_eq!(parse_resolution_label("-5 × 10", " × "), None);
    }

    #[test]
    fn profile_without_divider_never_parses() {
        let profile = SearchEngine::DuckDuckGo.profile();
        assert_eq!(profile.parse_resolution("1024 × 768"), None);
    }

    #[test]
    fn search_url_encodes_every_placeholder() {
        let url = SearchEngine::Google.profile().build_search_url("red cars");
        assert!(url.contains("q=red%20cars&oq=red%20cars"));
        assert!(!url.contains("{q}"));
    }

    #[test]
    fn engine_names_parse_case_insensitively() {
        assert_eq!("google".parse::<SearchEngine>().unwrap(), SearchEngine::Google);
        assert_eq!(
            " DuckDuckGo ".parse::<SearchEngine>().unwrap(),
            SearchEngine::DuckDuckGo
        );
        assert!("Flickr".parse::<SearchEngine>().is_err());
    }

    #[test]
    fn profiles_are_looked_up_by_identity() {
        for engine in SearchEngine::ALL {
            assert_eq!(engine.profile().engine, engine);
        }
    }
}
