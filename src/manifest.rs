//! Package index schema and deserialization.
//!
//! The container root holds an `index.json` listing every published version
//! and the per-platform archives under it. Producers do not agree on field
//! name casing (`lastModified`, `LastModified`, `lastmodified`), so object
//! keys are lowercased before the typed structures are deserialized.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Errors arising from index parsing.
#[derive(Debug, thiserror::Error)]
pub enum ManifestParseError {
    /// JSON syntax or shape is invalid.
    #[error("index parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The parsed package index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PackageIndex {
    /// When the index was last regenerated.
    #[serde(rename = "updatedat")]
    pub updated_at: String,
    /// Published versions in manifest order.
    pub versions: Vec<PackageVersion>,
}

/// One published version and its artefacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PackageVersion {
    /// Version label without a `v` prefix, e.g. `1.2.3`.
    pub version: String,
    /// Raw file listing; not used for resolution.
    pub files: Vec<String>,
    /// Downloadable artefacts in manifest order.
    pub assets: Vec<PackageAsset>,
}

/// A single downloadable archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PackageAsset {
    /// Display name, e.g. `hagicode-1.2.3-linux-x64.zip`.
    pub name: String,
    /// Path relative to the container root.
    pub path: String,
    /// Recorded size in bytes. Informational only.
    pub size: u64,
    /// Recorded modification timestamp. Informational only.
    #[serde(rename = "lastmodified")]
    pub last_modified: String,
}

impl PackageIndex {
    /// First version whose label equals `version` exactly.
    #[must_use]
    pub fn version(&self, version: &str) -> Option<&PackageVersion> {
        self.versions.iter().find(|entry| entry.version == version)
    }

    /// All version labels in manifest order.
    #[must_use]
    pub fn version_labels(&self) -> Vec<String> {
        self.versions
            .iter()
            .map(|entry| entry.version.clone())
            .collect()
    }
}

impl PackageVersion {
    /// All asset names in manifest order.
    #[must_use]
    pub fn asset_names(&self) -> Vec<String> {
        self.assets.iter().map(|asset| asset.name.clone()).collect()
    }
}

/// Parse index JSON, matching field names case-insensitively.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or a field has the wrong type.
///
/// # Examples
///
/// ```
/// use blobfetch::manifest::parse_index;
///
/// let json = r#"{"UpdatedAt":"2026-01-01","Versions":[{"Version":"1.0.0","Assets":[]}]}"#;
/// let index = parse_index(json).expect("valid index");
/// assert_eq!(index.updated_at, "2026-01-01");
/// assert_eq!(index.versions.len(), 1);
/// ```
pub fn parse_index(json: &str) -> Result<PackageIndex, ManifestParseError> {
    let raw: Value = serde_json::from_str(json.trim_start_matches('\u{feff}'))?;
    Ok(serde_json::from_value(lowercase_keys(raw))?)
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| (key.to_lowercase(), lowercase_keys(inner)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const INDEX: &str = r#"{
        "updatedAt": "2026-03-01T12:00:00Z",
        "versions": [
            {
                "version": "2.0.0",
                "files": ["app-linux-x64.zip", "app-win-x64.zip"],
                "assets": [
                    {"name": "app-linux-x64.zip", "path": "v2.0.0/app-linux-x64.zip",
                     "size": 1024, "lastModified": "2026-03-01T11:00:00Z"},
                    {"name": "app-win-x64.zip", "path": "v2.0.0/app-win-x64.zip",
                     "size": 2048, "lastModified": "2026-03-01T11:05:00Z"}
                ]
            }
        ]
    }"#;

    #[test]
    fn parses_camel_case_index() {
        let index = parse_index(INDEX).expect("valid index");
        assert_eq!(index.updated_at, "2026-03-01T12:00:00Z");
        let version = index.version("2.0.0").expect("version listed");
        assert_eq!(version.files.len(), 2);
        assert_eq!(version.assets[1].path, "v2.0.0/app-win-x64.zip");
        assert_eq!(version.assets[1].size, 2048);
        assert_eq!(version.assets[0].last_modified, "2026-03-01T11:00:00Z");
    }

    #[rstest]
    #[case::pascal("UpdatedAt", "LastModified")]
    #[case::upper("UPDATEDAT", "LASTMODIFIED")]
    #[case::lower("updatedat", "lastmodified")]
    fn matches_field_names_case_insensitively(#[case] updated: &str, #[case] modified: &str) {
        let json = INDEX
            .replace("updatedAt", updated)
            .replace("lastModified", modified)
            .replace("\"assets\"", "\"Assets\"");
        let index = parse_index(&json).expect("valid index");

        assert_eq!(index.updated_at, "2026-03-01T12:00:00Z");
        assert_eq!(
            index.versions[0].assets[0].last_modified,
            "2026-03-01T11:00:00Z"
        );
        assert_eq!(index.versions[0].assets.len(), 2);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let index = parse_index(r#"{"versions":[{"version":"1.0.0"}]}"#).expect("valid");
        assert!(index.updated_at.is_empty());
        assert!(index.versions[0].assets.is_empty());
    }

    #[test]
    fn ignores_unknown_fields() {
        let index = parse_index(r#"{"versions":[],"channel":"stable"}"#).expect("valid");
        assert!(index.versions.is_empty());
    }

    #[test]
    fn accepts_byte_order_mark() {
        let json = format!("\u{feff}{INDEX}");
        assert!(parse_index(&json).is_ok());
    }

    #[rstest]
    #[case::syntax("{not valid json")]
    #[case::wrong_type(r#"{"versions":"2.0.0"}"#)]
    #[case::negative_size(r#"{"versions":[{"assets":[{"size":-1}]}]}"#)]
    fn rejects_malformed_index(#[case] json: &str) {
        assert!(parse_index(json).is_err());
    }

    #[test]
    fn version_lookup_is_case_sensitive_and_first_wins() {
        let json = r#"{"versions":[
            {"version":"1.0.0-RC1","assets":[{"name":"first"}]},
            {"version":"1.0.0-RC1","assets":[{"name":"second"}]}
        ]}"#;
        let index = parse_index(json).expect("valid");
        assert!(index.version("1.0.0-rc1").is_none());
        let version = index.version("1.0.0-RC1").expect("listed");
        assert_eq!(version.asset_names(), vec!["first".to_owned()]);
    }
}
