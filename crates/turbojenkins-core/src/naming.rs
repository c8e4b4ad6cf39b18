//! Job full name ⇄ URL codec.
//!
//! Jenkins addresses a job nested in folders by repeating a `job/` path
//! segment per hierarchy level:
//!
//! ```text
//! folder/sub/build1  <=>  {root}job/folder/job/sub/job/build1/
//! ```
//!
//! The empty name addresses the root itself.

use crate::error::{CoreError, Result};

const JOB_SEGMENT: &str = "/job/";

/// Ensure `url` ends with a single trailing slash.
pub fn append_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Whether `s` looks like an absolute HTTP(S) URL rather than a job name.
pub fn is_absolute_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Convert a `/`-delimited full job name to its URL under `root`.
///
/// Leading and trailing slashes on the name are ignored, so already clean
/// names and their slash-wrapped forms map to the same URL.
///
/// ```rust
/// use turbojenkins_core::naming::name_to_url;
///
/// assert_eq!(name_to_url("http://ci/", ""), "http://ci/");
/// assert_eq!(name_to_url("http://ci/", "/a/b/"), "http://ci/job/a/job/b/");
/// ```
pub fn name_to_url(root: &str, full_name: &str) -> String {
    let root = append_slash(root);
    let name = full_name.trim_matches('/');
    if name.is_empty() {
        return root;
    }
    format!("{root}job/{}/", name.replace('/', JOB_SEGMENT))
}

/// Convert a job URL under `root` back to its full name.
///
/// # Errors
///
/// Returns [`CoreError::ForeignUrl`] if `url` does not start with `root`.
pub fn url_to_name(root: &str, url: &str) -> Result<String> {
    let root = append_slash(root);
    let Some(rest) = url.strip_prefix(root.as_str()) else {
        return Err(CoreError::ForeignUrl {
            url: url.to_string(),
            root,
        });
    };
    let path = format!("/{rest}");
    Ok(path.replace(JOB_SEGMENT, "/").trim_matches('/').to_string())
}

/// Split a full name into its parent path and short name.
///
/// The parent of a top-level job is the empty string, which addresses the
/// Jenkins root rather than a zero-length folder.
///
/// ```rust
/// use turbojenkins_core::naming::split_full_name;
///
/// assert_eq!(split_full_name("a/b/c"), ("a/b", "c"));
/// assert_eq!(split_full_name("c"), ("", "c"));
/// ```
pub fn split_full_name(full_name: &str) -> (&str, &str) {
    let name = full_name.trim_matches('/');
    match name.rsplit_once('/') {
        Some((parent, short)) => (parent.trim_end_matches('/'), short),
        None => ("", name),
    }
}

/// Reject names the codec cannot round-trip (empty or with empty segments).
///
/// # Errors
///
/// Returns [`CoreError::InvalidName`] describing the first problem found.
pub fn validate_full_name(full_name: &str) -> Result<()> {
    let name = full_name.trim_matches('/');
    if name.is_empty() {
        return Err(CoreError::InvalidName {
            name: full_name.to_string(),
            reason: "name is empty",
        });
    }
    if name.split('/').any(str::is_empty) {
        return Err(CoreError::InvalidName {
            name: full_name.to_string(),
            reason: "name contains an empty path segment",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    const ROOT: &str = "http://127.0.0.1:8080/";

    #[rstest]
    #[case("", "http://127.0.0.1:8080/")]
    #[case("job", "http://127.0.0.1:8080/job/job/")]
    #[case("folder/job", "http://127.0.0.1:8080/job/folder/job/job/")]
    #[case("/folder/sub/job/", "http://127.0.0.1:8080/job/folder/job/sub/job/job/")]
    fn test_name_to_url(#[case] name: &str, #[case] url: &str) {
        assert_eq!(name_to_url(ROOT, name), url);
    }

    #[rstest]
    #[case("http://127.0.0.1:8080/", "")]
    #[case("http://127.0.0.1:8080/job/job/", "job")]
    #[case("http://127.0.0.1:8080/job/folder/job/job/", "folder/job")]
    #[case("http://127.0.0.1:8080/job/folder/job/job", "folder/job")]
    fn test_url_to_name(#[case] url: &str, #[case] name: &str) {
        assert_eq!(url_to_name(ROOT, url).unwrap(), name);
    }

    #[test]
    fn test_root_without_trailing_slash_is_normalised() {
        assert_eq!(
            name_to_url("http://ci", "a"),
            "http://ci/job/a/".to_string()
        );
        assert_eq!(url_to_name("http://ci", "http://ci/job/a/").unwrap(), "a");
    }

    #[test]
    fn test_foreign_url_rejected() {
        let err = url_to_name(ROOT, "http://other-host/job/x/").unwrap_err();
        assert_eq!(
            err,
            CoreError::ForeignUrl {
                url: "http://other-host/job/x/".into(),
                root: ROOT.into(),
            }
        );
    }

    #[test]
    fn test_name_to_url_is_idempotent_on_clean_names() {
        let once = name_to_url(ROOT, "a/b");
        let again = name_to_url(ROOT, &url_to_name(ROOT, &once).unwrap());
        assert_eq!(once, again);
    }

    #[rstest]
    #[case("a/b/c", ("a/b", "c"))]
    #[case("c", ("", "c"))]
    #[case("/a/c/", ("a", "c"))]
    #[case("", ("", ""))]
    fn test_split_full_name(#[case] name: &str, #[case] expected: (&str, &str)) {
        assert_eq!(split_full_name(name), expected);
    }

    #[test]
    fn test_validate_full_name() {
        assert!(validate_full_name("a/b").is_ok());
        assert!(validate_full_name("").is_err());
        assert!(validate_full_name("a//b").is_err());
    }

    #[test]
    fn test_is_absolute_url() {
        assert!(is_absolute_url("http://ci/job/a/"));
        assert!(is_absolute_url("https://ci/job/a/"));
        assert!(!is_absolute_url("folder/job"));
    }

    proptest! {
        #[test]
        fn prop_codec_round_trip(segments in prop::collection::vec("[a-zA-Z0-9_.-]{1,12}", 1..6)) {
            prop_assume!(segments.iter().all(|s| s != "job"));
            let name = segments.join("/");
            let url = name_to_url(ROOT, &name);
            prop_assert_eq!(url_to_name(ROOT, &url).unwrap(), name);
        }
    }
}
