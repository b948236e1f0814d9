//! Version label normalization and catalogue queries.

use crate::manifest::PackageIndex;

/// Strip leading `v` characters so `v1.2.3` and `1.2.3` compare equal.
///
/// # Examples
///
/// ```
/// use blobfetch::versions::normalise_version;
///
/// assert_eq!(normalise_version("v1.2.3"), "1.2.3");
/// assert_eq!(normalise_version("1.2.3"), "1.2.3");
/// ```
#[must_use]
pub fn normalise_version(raw: &str) -> &str {
    raw.trim_start_matches('v')
}

/// Version labels listed in the index, in manifest order.
#[must_use]
pub fn list_versions(index: &PackageIndex) -> Vec<&str> {
    index
        .versions
        .iter()
        .map(|entry| entry.version.as_str())
        .collect()
}

/// Index versions that have no matching release tag.
///
/// A version `V` counts as released when `V` or `vV` appears among
/// `released_tags`, compared case-insensitively. Manifest order is kept.
///
/// # Examples
///
/// ```
/// use blobfetch::manifest::parse_index;
/// use blobfetch::versions::unreleased_versions;
///
/// let index = parse_index(
///     r#"{"versions":[{"version":"1.0.0"},{"version":"1.1.0"},{"version":"1.2.0"}]}"#,
/// )?;
/// let released = vec!["v1.0.0".to_owned(), "1.1.0".to_owned()];
/// assert_eq!(unreleased_versions(&index, &released), vec!["1.2.0".to_owned()]);
/// # Ok::<(), blobfetch::manifest::ManifestParseError>(())
/// ```
#[must_use]
pub fn unreleased_versions(index: &PackageIndex, released_tags: &[String]) -> Vec<String> {
    list_versions(index)
        .into_iter()
        .filter(|version| !is_released(version, released_tags))
        .map(str::to_owned)
        .collect()
}

fn is_released(version: &str, released_tags: &[String]) -> bool {
    let prefixed = format!("v{version}");
    released_tags
        .iter()
        .map(|tag| tag.trim())
        .any(|tag| tag.eq_ignore_ascii_case(version) || tag.eq_ignore_ascii_case(&prefixed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::PackageVersion;
    use rstest::rstest;

    fn index_of(labels: &[&str]) -> PackageIndex {
        PackageIndex {
            updated_at: String::new(),
            versions: labels
                .iter()
                .map(|label| PackageVersion {
                    version: (*label).to_owned(),
                    ..PackageVersion::default()
                })
                .collect(),
        }
    }

    #[rstest]
    #[case::prefixed("v1.2.3", "1.2.3")]
    #[case::bare("1.2.3", "1.2.3")]
    #[case::repeated("vv1.2.3", "1.2.3")]
    #[case::prerelease("v0.1.0-beta.1", "0.1.0-beta.1")]
    #[case::upper_is_kept("V1.2.3", "V1.2.3")]
    fn normalise_strips_lowercase_v_prefix(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalise_version(raw), expected);
    }

    #[test]
    fn lists_versions_in_manifest_order() {
        let index = index_of(&["2.0.0", "1.0.0", "1.5.0"]);
        assert_eq!(list_versions(&index), vec!["2.0.0", "1.0.0", "1.5.0"]);
    }

    #[rstest]
    #[case::nothing_released(&[], &["1.0.0", "1.1.0"])]
    #[case::bare_tag(&["1.0.0"], &["1.1.0"])]
    #[case::prefixed_tag(&["v1.1.0"], &["1.0.0"])]
    #[case::case_insensitive(&["V1.0.0", "V1.1.0"], &[])]
    #[case::unrelated_tags(&["nightly", "v0.9.0"], &["1.0.0", "1.1.0"])]
    fn unreleased_versions_compares_tags(#[case] tags: &[&str], #[case] expected: &[&str]) {
        let index = index_of(&["1.0.0", "1.1.0"]);
        let released: Vec<String> = tags.iter().map(|tag| (*tag).to_owned()).collect();
        let expected: Vec<String> = expected.iter().map(|v| (*v).to_owned()).collect();

        assert_eq!(unreleased_versions(&index, &released), expected);
    }
}
