use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Cache lifetime for fingerprinted build assets (one year).
pub const IMMUTABLE_MAX_AGE: u32 = 31_557_600;

/// One routing rule. Either attaches headers or dispatches to a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Regular expression matched against the request path.
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl Route {
    pub fn headers(src: impl Into<String>, headers: BTreeMap<String, String>) -> Self {
        Self {
            src: src.into(),
            dest: None,
            headers,
        }
    }

    pub fn dispatch(src: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dest: Some(dest.into()),
            headers: BTreeMap::new(),
        }
    }

    pub fn is_dispatch(&self) -> bool {
        self.dest.is_some()
    }
}

/// Ordered routing rules; the downstream router evaluates them first to last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingManifest {
    pub rules: Vec<Route>,
}

impl RoutingManifest {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Position of the first catch-all dispatch rule, if any.
    pub fn catch_all_index(&self) -> Option<usize> {
        self.rules
            .iter()
            .position(|r| r.is_dispatch() && r.src == "/(.*)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_plain_rule_list() {
        let mut headers = BTreeMap::new();
        headers.insert("cache-control".to_owned(), "max-age=10".to_owned());
        let manifest = RoutingManifest {
            rules: vec![
                Route::headers("^/_nuxt/.+", headers),
                Route::dispatch("/(.*)", "/index"),
            ],
        };

        let json: serde_json::Value =
            serde_json::from_str(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(json[0]["src"], "^/_nuxt/.+");
        assert_eq!(json[0]["headers"]["cache-control"], "max-age=10");
        assert!(json[0].get("dest").is_none());
        assert_eq!(json[1]["dest"], "/index");
        assert!(json[1].get("headers").is_none());
        assert_eq!(manifest.catch_all_index(), Some(1));
    }
}
