//! Route patterns: `/product/:id`, `/`, `*`.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;

use super::RouteError;

/// Path parameters captured by a pattern.
pub type Params = BTreeMap<String, String>;

/// A compiled route pattern.
///
/// `:name` matches one non-empty path segment and captures it; `*` matches
/// the rest of the path (possibly empty). A trailing slash on the path is
/// ignored.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
    params: Vec<String>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if pattern == "*" {
            return Ok(Self {
                source: pattern.to_string(),
                regex: Regex::new("^.*$").map_err(|err| invalid(&err.to_string()))?,
                params: Vec::new(),
            });
        }
        let Some(rest) = pattern.strip_prefix('/') else {
            return Err(invalid("must start with `/`"));
        };

        let mut source = String::from("^");
        let mut params = Vec::new();
        let segments: Vec<&str> = rest.trim_end_matches('/').split('/').collect();
        let last = segments.len() - 1;

        for (i, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                if segments.len() == 1 {
                    break;
                }
                return Err(invalid("empty path segment"));
            }
            if let Some(name) = segment.strip_prefix(':') {
                let valid = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                if !valid {
                    return Err(invalid(&format!("bad parameter name `{name}`")));
                }
                if params.iter().any(|p| p == name) {
                    return Err(invalid(&format!("parameter `{name}` appears twice")));
                }
                source.push_str(&format!("/(?P<{name}>[^/]+)"));
                params.push(name.to_string());
            } else if *segment == "*" {
                if i != last {
                    return Err(invalid("`*` must be the last segment"));
                }
                source.push_str("(?:/.*)?");
            } else {
                source.push('/');
                source.push_str(&regex::escape(segment));
            }
        }
        if source == "^" {
            source.push('/');
        } else {
            source.push_str("/?");
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|err| invalid(&err.to_string()))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
            params,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parameter names in declaration order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Captured parameters if `path` matches.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let path = if path.is_empty() { "/" } else { path };
        let captures = self.regex.captures(path)?;
        Some(
            self.params
                .iter()
                .filter_map(|name| captures.name(name).map(|m| (name.clone(), m.as_str().to_string())))
                .collect(),
        )
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
