//! URI template helpers shared by the router and the handler chain.
//!
//! Route templates use the `:name` / `:name(regex)` placeholder syntax. The
//! document uses OpenAPI's `{name}` syntax. [`parse_path_template`] converts one
//! into the other and reports every placeholder with its optional constraint.

use crate::error::SpecError;

/// One `:name` or `:name(regex)` placeholder found in a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPlaceholder {
    pub name: String,
    /// The text between the first `(` and its matching `)`, if any
    pub pattern: Option<String>,
}

/// A segment of a parsed route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(PathPlaceholder),
}

/// Result of parsing a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    /// Non-empty segments in order
    pub segments: Vec<Segment>,
}

impl PathTemplate {
    /// OpenAPI form: `/users/:id(\d+)` → `/users/{id}`.
    #[must_use]
    pub fn normalized(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Param(p) => {
                    out.push('{');
                    out.push_str(&p.name);
                    out.push('}');
                }
            }
        }
        out
    }

    #[must_use]
    pub fn placeholders(&self) -> Vec<&PathPlaceholder> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(p) => Some(p),
                Segment::Literal(_) => None,
            })
            .collect()
    }
}

/// Join two URI fragments into one absolute path.
///
/// Duplicate and trailing slashes collapse; the result always starts with `/`.
///
/// ```rust
/// use brrtgate::spec::join_uri;
///
/// assert_eq!(join_uri("/api/", "/users"), "/api/users");
/// assert_eq!(join_uri("/", "/"), "/");
/// assert_eq!(join_uri("", "pets/:id"), "/pets/:id");
/// ```
#[must_use]
pub fn join_uri(base: &str, uri: &str) -> String {
    let joined: Vec<&str> = base
        .split('/')
        .chain(uri.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    if joined.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", joined.join("/"))
    }
}

/// Parse a route template into segments.
///
/// ```rust
/// use brrtgate::spec::parse_path_template;
///
/// let t = parse_path_template(r"/users/:id(\d+)/posts/:slug").unwrap();
/// assert_eq!(t.normalized(), "/users/{id}/posts/{slug}");
/// let ps = t.placeholders();
/// assert_eq!(ps[0].pattern.as_deref(), Some(r"\d+"));
/// assert_eq!(ps[1].pattern, None);
/// ```
pub fn parse_path_template(template: &str) -> Result<PathTemplate, SpecError> {
    let invalid = |reason: &str| SpecError::InvalidPath {
        path: template.to_string(),
        reason: reason.to_string(),
    };

    let mut segments = Vec::new();
    for raw in template.split('/').filter(|s| !s.is_empty()) {
        let Some(spec) = raw.strip_prefix(':') else {
            segments.push(Segment::Literal(raw.to_string()));
            continue;
        };

        let (name, pattern) = match spec.find('(') {
            Some(open) => {
                let close = matching_paren(spec, open)
                    .ok_or_else(|| invalid("unbalanced parentheses in parameter constraint"))?;
                (&spec[..open], Some(spec[open + 1..close].to_string()))
            }
            None => (spec, None),
        };
        // express-style optional marker is not part of the name
        let name = name.trim_end_matches('?');
        if name.is_empty() {
            return Err(invalid("empty parameter name"));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid("parameter names may only contain [A-Za-z0-9_]"));
        }
        segments.push(Segment::Param(PathPlaceholder {
            name: name.to_string(),
            pattern,
        }));
    }
    Ok(PathTemplate { segments })
}

fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in s.char_indices().skip_while(|(i, _)| *i < open) {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
