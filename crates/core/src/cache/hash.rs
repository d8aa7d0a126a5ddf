//! Filesystem-safe names for cache entries and page artifacts.

use sha2::{Digest, Sha256};

/// Directory name for a cache entry id.
///
/// Keeps a readable prefix and appends a short digest so two ids that sanitize to
/// the same prefix still land in different directories.
pub fn entry_dir_name(id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    let digest = hex::encode(hasher.finalize());

    let prefix: String = safe_file_stem(id).chars().take(24).collect();
    format!("{prefix}-{}", &digest[..12])
}

/// File stem for a page's render artifacts: anything but word characters,
/// whitespace and `-` becomes `_`.
pub fn safe_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' || c.is_whitespace() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_dir_name_stability() {
        assert_eq!(entry_dir_name("doc-1"), entry_dir_name("doc-1"));
    }

    #[test]
    fn test_entry_dir_name_distinguishes_colliding_stems() {
        assert_ne!(entry_dir_name("a/b"), entry_dir_name("a:b"));
        assert!(entry_dir_name("a/b").starts_with("a_b-"));
    }

    #[test]
    fn test_safe_file_stem() {
        assert_eq!(safe_file_stem("登录页"), "登录页");
        assert_eq!(safe_file_stem("order/list.v2"), "order_list_v2");
        assert_eq!(safe_file_stem("home page-1"), "home page-1");
    }
}
