//! Global response header rules.
//!
//! Headers given on the command line are rendered as a `_headers` file with
//! a single `/*` rule that applies them to every path.

use std::collections::BTreeMap;

use crate::error::PublishError;

/// Maximum number of header entries.
pub const MAX_HEADERS: usize = 40;

/// Maximum length of one `key: value` line.
pub const MAX_LINE_LEN: usize = 1800;

/// Validated header set, keys lowercased and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRules {
    headers: BTreeMap<String, String>,
}

impl HeaderRules {
    /// Builds rules from `(key, value)` pairs. Keys are trimmed and
    /// lowercased, values trimmed; a repeated key keeps the last value.
    pub fn new<I, K, V>(pairs: I) -> Result<Self, PublishError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut headers = BTreeMap::new();
        for (key, value) in pairs {
            let key = key.as_ref().trim().to_lowercase();
            let value = value.as_ref().trim().to_string();

            if key.is_empty() || value.is_empty() {
                return Err(PublishError::InvalidHeader(
                    "header keys and values must be non-empty".into(),
                ));
            }
            if key.len() + 2 + value.len() > MAX_LINE_LEN {
                return Err(PublishError::InvalidHeader(format!(
                    "header {key:?} exceeds {MAX_LINE_LEN} characters"
                )));
            }
            headers.insert(key, value);
        }

        if headers.len() > MAX_HEADERS {
            return Err(PublishError::InvalidHeader(format!(
                "at most {MAX_HEADERS} headers are allowed, got {}",
                headers.len()
            )));
        }
        Ok(Self { headers })
    }

    /// Parses `Key: value` lines.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Result<Self, PublishError> {
        let pairs = lines
            .iter()
            .map(|line| {
                line.as_ref().split_once(':').ok_or_else(|| {
                    PublishError::InvalidHeader(format!(
                        "expected \"Key: value\", got {:?}",
                        line.as_ref()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(pairs)
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Renders the `_headers` file content.
    pub fn render(&self) -> String {
        let mut out = String::from("/*\n");
        for (key, value) in &self.headers {
            out.push_str("  ");
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sorted_global_rule() {
        let rules = HeaderRules::parse(&[
            "X-Frame-Options: DENY",
            "  Cache-Control :  public, max-age=60 ",
        ])
        .unwrap();

        assert_eq!(
            rules.render(),
            "/*\n  cache-control: public, max-age=60\n  x-frame-options: DENY\n"
        );
    }

    #[test]
    fn value_may_contain_colons() {
        let rules = HeaderRules::parse(&["Link: <https://cdn.example>; rel=preconnect"]).unwrap();
        assert!(rules.render().contains("link: <https://cdn.example>; rel=preconnect"));
    }

    #[test]
    fn last_duplicate_wins() {
        let rules = HeaderRules::new([("A", "1"), ("a", "2")]).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.render(), "/*\n  a: 2\n");
    }

    #[test]
    fn rejects_empty_parts() {
        assert!(matches!(
            HeaderRules::parse(&["X-Empty:   "]),
            Err(PublishError::InvalidHeader(_))
        ));
        assert!(HeaderRules::parse(&[": value"]).is_err());
        assert!(HeaderRules::parse(&["no separator"]).is_err());
    }

    #[test]
    fn rejects_long_lines() {
        let ok = "v".repeat(MAX_LINE_LEN - 3);
        assert!(HeaderRules::new([("k", ok.as_str())]).is_ok());
        let long = "v".repeat(MAX_LINE_LEN - 2);
        assert!(HeaderRules::new([("k", long.as_str())]).is_err());
    }

    #[test]
    fn rejects_too_many_headers() {
        let pairs: Vec<(String, String)> = (0..=MAX_HEADERS)
            .map(|i| (format!("x-h{i}"), "1".to_string()))
            .collect();
        assert!(HeaderRules::new(pairs[..MAX_HEADERS].to_vec()).is_ok());
        assert!(HeaderRules::new(pairs).is_err());
    }
}
