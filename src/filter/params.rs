//! URL query parameters
//!
//! An ordered multi-map mirroring what a browser address bar holds. Keys keep
//! their first-seen position so rewrites do not shuffle unrelated parameters.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// A set of key updates: `Some` writes the key, `None` removes it
pub type ParamPatch = Vec<(String, Option<String>)>;

/// Ordered query-string parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string. Accepts a bare `a=1&b=2`, a leading `?`, or a
    /// full URL/path (everything up to the first `?` is ignored, as is any
    /// `#fragment`).
    pub fn parse(raw: &str) -> Self {
        let without_fragment = raw.split('#').next().unwrap_or_default();
        let query = match without_fragment.split_once('?') {
            Some((_, query)) => query,
            None if without_fragment.contains('=') || !without_fragment.contains('/') => {
                without_fragment
            }
            None => "",
        };

        let pairs = form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        Self { pairs }
    }

    /// Render as an `application/x-www-form-urlencoded` string (no leading `?`)
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }

    /// First value recorded for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Write `key`, keeping its original position if already present.
    /// Repeated occurrences collapse into one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        match self.pairs.iter().position(|(k, _)| *k == key) {
            Some(idx) => {
                self.pairs[idx].1 = value;
                let mut seen = false;
                self.pairs.retain(|(k, _)| {
                    if *k != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.pairs.push((key, value)),
        }
    }

    /// Remove every occurrence of `key`, returning the first value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let first = self.get(key).map(str::to_string);
        self.pairs.retain(|(k, _)| k != key);
        first
    }

    /// Apply a patch on top of the current parameters, leaving keys the
    /// patch does not mention untouched.
    pub fn merge_patch(&mut self, patch: &[(String, Option<String>)]) {
        for (key, value) in patch {
            match value {
                Some(value) => self.set(key.clone(), value.clone()),
                None => {
                    self.remove(key);
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (key, value) in iter {
            params.set(key, value);
        }
        params
    }
}

impl std::fmt::Display for QueryParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.pairs.is_empty() {
            return Ok(());
        }
        write!(f, "?{}", self.to_query_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        let bare = QueryParams::parse("q=acme&inactive=any");
        let leading = QueryParams::parse("?q=acme&inactive=any");
        let url = QueryParams::parse("https://example.org/en/search?q=acme&inactive=any#top");

        assert_eq!(bare, leading);
        assert_eq!(bare, url);
        assert_eq!(bare.get("q"), Some("acme"));
        assert_eq!(bare.get("inactive"), Some("any"));
    }

    #[test]
    fn test_parse_path_without_query() {
        let params = QueryParams::parse("/en/search");
        assert!(params.is_empty());
    }

    #[test]
    fn test_parse_decodes() {
        let params = QueryParams::parse("q=acme+corp&category%3Aentity_type=Corporation");
        assert_eq!(params.get("q"), Some("acme corp"));
        assert_eq!(params.get("category:entity_type"), Some("Corporation"));
    }

    #[test]
    fn test_to_query_string_encodes() {
        let params: QueryParams = [("q", "acme corp"), ("category:entity_type", "Sole Prop")]
            .into_iter()
            .collect();
        let rendered = params.to_query_string();
        assert_eq!(rendered, "q=acme+corp&category%3Aentity_type=Sole+Prop");
        assert_eq!(QueryParams::parse(&rendered), params);
    }

    #[test]
    fn test_set_keeps_position() {
        let mut params = QueryParams::parse("lang=en&q=old&tab=2");
        params.set("q", "new");
        let keys: Vec<&str> = params.keys().collect();
        assert_eq!(keys, vec!["lang", "q", "tab"]);
        assert_eq!(params.get("q"), Some("new"));
    }

    #[test]
    fn test_set_collapses_duplicates() {
        let mut params = QueryParams::parse("q=a&x=1&q=b");
        params.set("q", "c");
        assert_eq!(params.to_query_string(), "q=c&x=1");
    }

    #[test]
    fn test_merge_patch() {
        let mut params = QueryParams::parse("lang=en&q=old&query=legacy&page=3");
        params.merge_patch(&[
            ("q".to_string(), Some("new".to_string())),
            ("query".to_string(), None),
            ("page".to_string(), None),
            ("inactive".to_string(), Some("any".to_string())),
        ]);
        assert_eq!(params.to_query_string(), "lang=en&q=new&inactive=any");
    }

    #[test]
    fn test_display() {
        assert_eq!(QueryParams::new().to_string(), "");
        let params = QueryParams::parse("q=acme");
        assert_eq!(params.to_string(), "?q=acme");
    }
}
