//! License key generation and format validation.
//!
//! Keys are human-typable grouped alphanumeric strings in the format
//! `XXXXX-XXXXX-XXXXX`: dash-separated groups drawn from uppercase letters and
//! digits. The group count and length are configurable; the defaults give a
//! 36^15 keyspace, so freshly generated keys are not checked for collisions
//! against the store.

use rand::Rng;

use crate::config::{get_config, LicenseConfig};
use crate::errors::ServiceResult;

/// Character set for license key generation: uppercase letters and digits.
const LICENSE_KEY_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Shape of a generated license key.
/// Convenience wrapper constructed from `LicenseConfig`.
#[derive(Debug, Clone)]
pub struct LicenseKeyConfig {
    /// Number of dash-separated groups
    pub segments: u8,
    /// Characters per group
    pub segment_length: u8,
}

impl Default for LicenseKeyConfig {
    fn default() -> Self {
        Self {
            segments: 3,
            segment_length: 5,
        }
    }
}

impl From<&LicenseConfig> for LicenseKeyConfig {
    fn from(config: &LicenseConfig) -> Self {
        Self {
            segments: config.key_segments,
            segment_length: config.key_segment_length,
        }
    }
}

/// Generate a single group of random characters.
fn generate_segment(length: u8) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..LICENSE_KEY_CHARSET.len());
            LICENSE_KEY_CHARSET[idx] as char
        })
        .collect()
}

/// Generate a license key with the given shape.
///
/// With the default shape this produces keys like `AB3F9-12KXZ-99PPQ`.
pub fn generate_license_key(config: &LicenseKeyConfig) -> String {
    let segments: Vec<String> = (0..config.segments)
        .map(|_| generate_segment(config.segment_length))
        .collect();

    segments.join("-")
}

/// Generate a license key using the global configuration.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub fn generate_license_key_from_config() -> ServiceResult<String> {
    let config = get_config()?;
    let key_config = LicenseKeyConfig::from(&config.license);
    Ok(generate_license_key(&key_config))
}

/// Validate that a license key matches the expected shape.
///
/// This validates:
/// - The key has the correct number of groups
/// - Each group has the correct length
/// - All characters are from the valid character set
pub fn validate_license_key_format(key: &str, config: &LicenseKeyConfig) -> bool {
    let parts: Vec<&str> = key.split('-').collect();

    if parts.len() != config.segments as usize {
        return false;
    }

    for segment in &parts {
        if segment.len() != config.segment_length as usize {
            return false;
        }

        for ch in segment.chars() {
            if !LICENSE_KEY_CHARSET.contains(&(ch as u8)) {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_key_has_correct_format() {
        let config = LicenseKeyConfig::default();
        let key = generate_license_key(&config);

        let parts: Vec<&str> = key.split('-').collect();
        assert_eq!(parts.len(), 3);
        for segment in &parts {
            assert_eq!(segment.len(), 5);
        }
    }

    #[test]
    fn generate_key_uses_valid_characters() {
        let config = LicenseKeyConfig::default();
        let key = generate_license_key(&config);

        for segment in key.split('-') {
            for ch in segment.chars() {
                assert!(
                    LICENSE_KEY_CHARSET.contains(&(ch as u8)),
                    "Invalid character: {}",
                    ch
                );
            }
        }
    }

    #[test]
    fn generate_key_with_custom_config() {
        let config = LicenseKeyConfig {
            segments: 4,
            segment_length: 4,
        };
        let key = generate_license_key(&config);

        let parts: Vec<&str> = key.split('-').collect();
        assert_eq!(parts.len(), 4);
        for segment in &parts {
            assert_eq!(segment.len(), 4);
        }
    }

    #[test]
    fn validate_format_accepts_generated_key() {
        let config = LicenseKeyConfig::default();
        let key = generate_license_key(&config);
        assert!(validate_license_key_format(&key, &config));
    }

    #[test]
    fn validate_format_rejects_wrong_group_count() {
        let config = LicenseKeyConfig::default();
        assert!(!validate_license_key_format("AB3F9-12KXZ", &config)); // too few
        assert!(!validate_license_key_format(
            "AB3F9-12KXZ-99PPQ-77QQZ",
            &config
        )); // too many
    }

    #[test]
    fn validate_format_rejects_wrong_group_length() {
        let config = LicenseKeyConfig::default();
        assert!(!validate_license_key_format("AB3-12KXZ-99PPQ", &config));
        assert!(!validate_license_key_format("AB3F9X-12KXZ-99PPQ", &config));
    }

    #[test]
    fn validate_format_rejects_invalid_characters() {
        let config = LicenseKeyConfig::default();
        // Lowercase
        assert!(!validate_license_key_format("ab3f9-12kxz-99ppq", &config));
        // Punctuation
        assert!(!validate_license_key_format("AB3F!-12KXZ-99PPQ", &config));
    }

    #[test]
    fn generated_keys_are_unique() {
        let config = LicenseKeyConfig::default();
        let mut keys = std::collections::HashSet::new();

        // Generate 1000 keys and check for collisions
        for _ in 0..1000 {
            let key = generate_license_key(&config);
            assert!(keys.insert(key.clone()), "Duplicate key generated: {}", key);
        }
    }

    #[test]
    fn keyspace_is_large_enough_to_skip_collision_checks() {
        // 36 characters across 15 positions. The issuance path deliberately
        // performs no store lookup before inserting, which is only sound while
        // the keyspace dwarfs any realistic number of issued keys.
        let config = LicenseKeyConfig::default();
        let chars = LICENSE_KEY_CHARSET.len() as f64;
        let positions = (config.segments as u32 * config.segment_length as u32) as f64;
        let keyspace_bits = positions * chars.log2();

        // ~77.5 bits. Birthday bound: a million issued keys collide with
        // probability around 10^-12, far below operational concern.
        assert!(keyspace_bits > 64.0, "keyspace too small: {keyspace_bits} bits");

        let issued: f64 = 1_000_000.0;
        let collision_probability = (issued * issued) / (2.0 * chars.powf(positions));
        assert!(collision_probability < 1e-9);
    }
}
