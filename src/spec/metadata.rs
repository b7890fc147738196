use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

/// `Name <email> (url)`, every part optional except the name.
static AUTHOR_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<name>[^<(]*?)\s*(?:<(?P<email>[^>]*)>)?\s*(?:\((?P<url>[^)]*)\))?\s*$").ok()
});

/// Package author, either loose text or already structured.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Author {
    Text(String),
    Contact {
        name: Option<String>,
        email: Option<String>,
        url: Option<String>,
    },
}

impl Author {
    /// OpenAPI `contact` object for this author.
    #[must_use]
    pub fn to_contact(&self) -> Value {
        let (name, email, url) = match self {
            Author::Text(text) => parse_author(text),
            Author::Contact { name, email, url } => (name.clone(), email.clone(), url.clone()),
        };
        let mut contact = Map::new();
        for (key, value) in [("name", name), ("email", email), ("url", url)] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                contact.insert(key.to_string(), Value::String(value));
            }
        }
        Value::Object(contact)
    }
}

/// Split `Name <email> (url)` into its parts.
///
/// ```rust
/// use brrtgate::spec::parse_author;
///
/// let (name, email, url) = parse_author("Ada Lovelace <ada@example.com> (https://ada.dev)");
/// assert_eq!(name.as_deref(), Some("Ada Lovelace"));
/// assert_eq!(email.as_deref(), Some("ada@example.com"));
/// assert_eq!(url.as_deref(), Some("https://ada.dev"));
/// ```
#[must_use]
pub fn parse_author(text: &str) -> (Option<String>, Option<String>, Option<String>) {
    let Some(captures) = AUTHOR_RE.as_ref().and_then(|re| re.captures(text)) else {
        return (Some(text.trim().to_string()), None, None);
    };
    let part = |name: &str| {
        captures
            .name(name)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    };
    (part("name"), part("email"), part("url"))
}

/// Package facts used to fill the document's `info`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub author: Option<Author>,
    pub license: Option<String>,
}

#[derive(Deserialize)]
struct CargoManifest {
    package: CargoPackage,
}

#[derive(Deserialize)]
struct CargoPackage {
    name: String,
    version: Option<toml::Value>,
    description: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    license: Option<String>,
}

impl PackageMetadata {
    /// Build from `CARGO_PKG_*` style values; `authors` is colon separated.
    #[must_use]
    pub fn from_parts(name: &str, version: &str, description: &str, authors: &str, license: &str) -> Self {
        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.trim().to_string());
        Self {
            name: name.to_string(),
            version: version.to_string(),
            description: non_empty(description),
            author: authors
                .split(':')
                .find(|a| !a.trim().is_empty())
                .map(|a| Author::Text(a.trim().to_string())),
            license: non_empty(license),
        }
    }

    /// Read `[package]` from a `Cargo.toml`.
    ///
    /// A workspace-inherited version (`version.workspace = true`) is reported
    /// as `0.0.0`.
    pub fn from_cargo_toml(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        let manifest: CargoManifest = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;
        let package = manifest.package;
        let version = match package.version {
            Some(toml::Value::String(v)) => v,
            _ => "0.0.0".to_string(),
        };
        Ok(Self {
            name: package.name,
            version,
            description: package.description,
            author: package.authors.into_iter().next().map(Author::Text),
            license: package.license,
        })
    }

    /// Partial OpenAPI `info` object.
    #[must_use]
    pub fn to_info(&self) -> Value {
        let mut info = Map::new();
        info.insert("title".into(), Value::String(self.name.clone()));
        info.insert("version".into(), Value::String(self.version.clone()));
        if let Some(description) = &self.description {
            info.insert("description".into(), Value::String(description.clone()));
        }
        if let Some(author) = &self.author {
            let contact = author.to_contact();
            if contact.as_object().is_some_and(|c| !c.is_empty()) {
                info.insert("contact".into(), contact);
            }
        }
        if let Some(license) = &self.license {
            info.insert("license".into(), serde_json::json!({"name": license}));
        }
        Value::Object(info)
    }
}

/// Metadata of the calling crate, from its compile-time `CARGO_PKG_*` values.
///
/// ```rust
/// let meta = brrtgate::package_metadata!();
/// assert_eq!(meta.name, "brrtgate");
/// ```
#[macro_export]
macro_rules! package_metadata {
    () => {
        $crate::spec::PackageMetadata::from_parts(
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_DESCRIPTION"),
            env!("CARGO_PKG_AUTHORS"),
            env!("CARGO_PKG_LICENSE"),
        )
    };
}

/// Where `get_spec` takes its info from.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoSource {
    /// Partial info object merged as-is
    Partial(Value),
    /// Title, version, contact and license derived from package metadata
    Package(PackageMetadata),
}

impl InfoSource {
    #[must_use]
    pub fn to_info(&self) -> Value {
        match self {
            InfoSource::Partial(info) => info.clone(),
            InfoSource::Package(meta) => meta.to_info(),
        }
    }
}

impl From<Value> for InfoSource {
    fn from(info: Value) -> Self {
        InfoSource::Partial(info)
    }
}

impl From<PackageMetadata> for InfoSource {
    fn from(meta: PackageMetadata) -> Self {
        InfoSource::Package(meta)
    }
}
