use regex::Regex;
use serde_json::{Map, Value};

use crate::error::SpecError;
use crate::spec::{parse_path_template, Segment};

/// Compiled matcher for one `:name(regex)` route template.
///
/// Placeholders become capture groups: `[^/]+` when unconstrained, the declared
/// pattern otherwise. Literal segments are escaped.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    template: String,
    regex: Regex,
    names: Vec<String>,
    prefix: bool,
}

/// Successful match: captured parameters and, for prefix matchers, the remainder.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMatch {
    pub params: Map<String, Value>,
    /// Unmatched tail, always starting with `/` (prefix matchers only)
    pub rest: String,
}

impl PathMatcher {
    /// Matcher that must consume the whole path (a trailing `/` is tolerated).
    pub fn exact(template: &str) -> Result<Self, SpecError> {
        Self::build(template, false)
    }

    /// Matcher for a mount point: matches whole leading segments only.
    pub fn prefix(template: &str) -> Result<Self, SpecError> {
        Self::build(template, true)
    }

    fn build(template: &str, prefix: bool) -> Result<Self, SpecError> {
        let parsed = parse_path_template(template)?;

        let mut pattern = String::with_capacity(template.len() + 16);
        pattern.push('^');
        let mut names = Vec::with_capacity(parsed.segments.len());

        for segment in &parsed.segments {
            pattern.push('/');
            match segment {
                Segment::Literal(literal) => pattern.push_str(&regex::escape(literal)),
                Segment::Param(placeholder) => {
                    // group names are positional so arbitrary parameter names stay legal
                    let constraint = placeholder.pattern.as_deref().unwrap_or("[^/]+");
                    pattern.push_str(&format!("(?P<p{}>(?:{constraint}))", names.len()));
                    names.push(placeholder.name.clone());
                }
            }
        }

        if prefix {
            pattern.push_str("(?P<rest>/.*)?$");
        } else {
            pattern.push_str("/?$");
        }

        let regex = Regex::new(&pattern).map_err(|e| SpecError::InvalidPath {
            path: template.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            template: template.to_string(),
            regex,
            names,
            prefix,
        })
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Match `path`, percent-decoding captured values.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<PathMatch> {
        let captures = self.regex.captures(path)?;

        let mut params = Map::new();
        for (i, name) in self.names.iter().enumerate() {
            if let Some(m) = captures.name(&format!("p{i}")) {
                let raw = m.as_str();
                let decoded = urlencoding::decode(raw)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| raw.to_string());
                params.insert(name.clone(), Value::String(decoded));
            }
        }

        let rest = if self.prefix {
            captures
                .name("rest")
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "/".to_string())
        } else {
            String::new()
        };

        Some(PathMatch { params, rest })
    }
}
