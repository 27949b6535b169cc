//! Node application (boyar) download URL

/// Release installed when the request pins none
pub const DEFAULT_BOYAR_VERSION: &str = "v1.10.0";

/// Pick the boyar binary URL: an explicit URL, then a dev build by commit,
/// then a tagged release.
pub fn boyar_target_url(url: Option<&str>, commit: Option<&str>, version: Option<&str>) -> String {
    fn non_empty(s: Option<&str>) -> Option<&str> {
        s.map(str::trim).filter(|s| !s.is_empty())
    }

    if let Some(url) = non_empty(url) {
        return url.to_string();
    }
    if let Some(commit) = non_empty(commit) {
        return format!(
            "https://s3.amazonaws.com/boyar-dev-releases/boyar/boyar-{}.bin",
            commit
        );
    }

    let version = non_empty(version).unwrap_or(DEFAULT_BOYAR_VERSION);
    format!(
        "https://github.com/orbs-network/boyarin/releases/download/{v}/boyar-{v}.bin",
        v = version
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_release() {
        assert_eq!(
            boyar_target_url(None, None, None),
            "https://github.com/orbs-network/boyarin/releases/download/v1.10.0/boyar-v1.10.0.bin"
        );
        assert_eq!(
            boyar_target_url(Some("  "), Some(""), Some("v1.11.2")),
            "https://github.com/orbs-network/boyarin/releases/download/v1.11.2/boyar-v1.11.2.bin"
        );
    }

    #[test]
    fn test_blank_url_and_commit_fall_through() {
        assert_eq!(
            boyar_target_url(Some(" "), Some(" deadbeef "), None),
            "https://s3.amazonaws.com/boyar-dev-releases/boyar/boyar-deadbeef.bin"
        );
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            boyar_target_url(Some("https://example.com/boyar.bin"), Some("abc123"), None),
            "https://example.com/boyar.bin"
        );
        assert_eq!(
            boyar_target_url(None, Some("abc123"), Some("v1.10.0")),
            "https://s3.amazonaws.com/boyar-dev-releases/boyar/boyar-abc123.bin"
        );
    }
}
