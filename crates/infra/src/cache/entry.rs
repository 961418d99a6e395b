use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Suffix of every persistent-tier file.
pub const FILE_SUFFIX: &str = ".cache.gz";

/// One cached value with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Original key; checked on disk reads since sanitised names can collide.
    pub key: String,
    pub value: JsonValue,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: JsonValue, ttl: Duration) -> Self {
        let created_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            key: key.into(),
            value,
            expires_at: created_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            created_at,
        }
    }

    /// Visible only while `now < expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Rough in-memory footprint: the serialized length of the value.
    pub fn estimated_size(&self) -> usize {
        serde_json::to_vec(&self.value).map_or(0, |bytes| bytes.len())
    }
}

/// Filesystem-safe name for a key.
///
/// Anything outside `[A-Za-z0-9_-]` becomes `_`. Case is preserved.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' => c,
            _ => '_',
        })
        .collect()
}

pub fn file_name(key: &str) -> String {
    format!("{}{FILE_SUFFIX}", sanitize_key(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn sanitizes_like_a_filename() {
        assert_eq!(sanitize_key("rep_profile_H8CA12345"), "rep_profile_H8CA12345");
        assert_eq!(sanitize_key("../etc/passwd"), "___etc_passwd");
        assert_eq!(file_name("a b"), "a_b.cache.gz");
    }

    #[test]
    fn keys_differing_by_case_get_their_own_files() {
        assert_ne!(file_name("rep_profile_a000360"), file_name("rep_profile_A000360"));
    }

    #[test]
    fn zero_ttl_is_immediately_expired() {
        let entry = CacheEntry::new("k", json!(1), Duration::ZERO);
        assert!(entry.is_expired_at(entry.created_at));
    }

    #[test]
    fn huge_ttl_saturates() {
        let entry = CacheEntry::new("k", json!(1), Duration::MAX);
        assert!(!entry.is_expired_at(Utc::now()));
    }

    #[test]
    fn size_is_serialized_length() {
        let entry = CacheEntry::new("k", json!({"a": 1}), Duration::from_secs(1));
        assert_eq!(entry.estimated_size(), r#"{"a":1}"#.len());
    }

    proptest! {
        #[test]
        fn sanitized_keys_are_safe(key in ".{0,64}") {
            let name = sanitize_key(&key);
            prop_assert_eq!(name.chars().count(), key.chars().count());
            prop_assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        }

        #[test]
        fn sanitizing_is_idempotent(key in "[A-Za-z0-9_./ -]{0,40}") {
            let once = sanitize_key(&key);
            prop_assert_eq!(sanitize_key(&once), once);
        }

        #[test]
        fn safe_keys_are_kept_verbatim(key in "[A-Za-z0-9_-]{0,40}") {
            prop_assert_eq!(sanitize_key(&key), key);
        }
    }
}
