//! Version Hasher Module
//!
//! Cheap content fingerprints used to detect whether cached data changed.
//! Not integrity or security critical.

use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::{AHasher, RandomState};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Prefix of versions produced when serialization fails.
///
/// Content versions are pure base-36 and never contain `-`, so a fallback
/// version can never compare equal to one.
const FALLBACK_PREFIX: &str = "t-";

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Hasher keys. Constant so versions survive restarts; output can still
/// differ between targets with different CPU features.
const SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

fn seeded_hasher() -> AHasher {
    RandomState::with_seeds(SEEDS[0], SEEDS[1], SEEDS[2], SEEDS[3]).build_hasher()
}

// == Version ==
/// Short base-36 fingerprint of a serialized value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Returns the version as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when this version came from the serialization fallback.
    pub fn is_fallback(&self) -> bool {
        self.0.starts_with(FALLBACK_PREFIX)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Hash ==
/// Fingerprints `data` via its canonical JSON serialization.
///
/// Identical input with identical field order always yields the same version.
/// Never fails: when serialization errors, a unique time-derived version is
/// returned so the data is always reported as changed.
pub fn hash<T: Serialize + ?Sized>(data: &T) -> Version {
    match serde_json::to_vec(data) {
        Ok(bytes) => {
            let mut hasher = seeded_hasher();
            hasher.write(&bytes);
            Version(to_base36(hasher.finish()))
        }
        Err(err) => {
            warn!(error = %err, "Version hashing failed, treating data as changed");
            fallback_version()
        }
    }
}

// == Has Data Changed ==
/// Returns true when `new_data` does not hash to `stored`.
pub fn has_data_changed<T: Serialize + ?Sized>(stored: &Version, new_data: &T) -> bool {
    let fresh = hash(new_data);
    fresh.is_fallback() || &fresh != stored
}

fn fallback_version() -> Version {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    let seq = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    Version(format!(
        "{}{}-{}",
        FALLBACK_PREFIX,
        to_base36(nanos),
        to_base36(seq)
    ))
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(13);
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use serde_json::json;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot serialize"))
        }
    }

    #[test]
    fn test_hash_is_stable() {
        let data = json!({"newest": [{"id": "a", "views": 10}], "popular": []});
        assert_eq!(hash(&data), hash(&data));
        assert_eq!(hash(&data), hash(&data.clone()));
    }

    #[test]
    fn test_hash_uses_constant_seeds() {
        let data = json!({"newest": [{"id": "a"}]});
        let bytes = serde_json::to_vec(&data).unwrap();

        // A hasher built independently from the same keys must agree
        let mut hasher =
            RandomState::with_seeds(SEEDS[0], SEEDS[1], SEEDS[2], SEEDS[3]).build_hasher();
        hasher.write(&bytes);

        assert_eq!(hash(&data).as_str(), to_base36(hasher.finish()));
    }

    #[test]
    fn test_hash_detects_change() {
        let before = json!({"views": 10});
        let after = json!({"views": 11});
        assert_ne!(hash(&before), hash(&after));
        assert!(has_data_changed(&hash(&before), &after));
        assert!(!has_data_changed(&hash(&before), &before));
    }

    #[test]
    fn test_hash_failure_always_reports_changed() {
        let first = hash(&Unserializable);
        let second = hash(&Unserializable);

        assert!(first.is_fallback());
        assert_ne!(first, second);
        assert!(has_data_changed(&first, &Unserializable));
    }

    #[test]
    fn test_content_version_is_base36() {
        let version = hash(&json!({"a": 1}));
        assert!(!version.is_fallback());
        assert!(version
            .as_str()
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u64::MAX), "3w5e11264sgsf");
    }
}
