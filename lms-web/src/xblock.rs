//! XBlock disable / deprecate configuration
//!
//! Admins keep two space-separated lists of block types: blocks that must
//! not render, and blocks that Studio should no longer offer for new
//! components. Deployment settings may deprecate further types; those are
//! merged after the admin list.

use lms_common::ConfigEntry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One revision of the block configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct XBlockDisableConfig {
    /// Space-separated block types which should not render
    #[serde(default)]
    pub disabled_blocks: String,
    /// Space-separated block types Studio may not create new instances of
    #[serde(default)]
    pub deprecated_blocks: String,
}

impl fmt::Display for XBlockDisableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Disabled xblocks = {}\nDeprecated xblocks = {}",
            self.disabled_blocks, self.deprecated_blocks
        )
    }
}

/// Whether `block_type` is disabled by the current configuration
pub fn is_block_type_disabled(entry: &ConfigEntry<XBlockDisableConfig>, block_type: &str) -> bool {
    entry.enabled
        && entry
            .value
            .disabled_blocks
            .split_whitespace()
            .any(|t| t == block_type)
}

/// Disabled block types; empty when the configuration is switched off
pub fn disabled_block_types(entry: &ConfigEntry<XBlockDisableConfig>) -> Vec<String> {
    if !entry.enabled {
        return Vec::new();
    }
    entry
        .value
        .disabled_blocks
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Deprecated block types from the admin record, then from settings
///
/// The admin list is used as written (and only when enabled). Settings
/// entries are appended in order, skipping any type already in the result.
pub fn deprecated_block_types(
    entry: &ConfigEntry<XBlockDisableConfig>,
    settings: Option<&[String]>,
) -> Vec<String> {
    let mut types: Vec<String> = if entry.enabled {
        entry
            .value
            .deprecated_blocks
            .split_whitespace()
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };

    for block_type in settings.unwrap_or_default() {
        if !types.contains(block_type) {
            types.push(block_type.clone());
        }
    }

    types
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(enabled: bool, disabled: &str, deprecated: &str) -> ConfigEntry<XBlockDisableConfig> {
        ConfigEntry {
            revision: 1,
            enabled,
            changed_by: None,
            change_date: Utc::now(),
            value: XBlockDisableConfig {
                disabled_blocks: disabled.to_string(),
                deprecated_blocks: deprecated.to_string(),
            },
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_disabled_lookup_respects_enabled_flag() {
        let on = entry(true, "poll  library_content", "");
        assert!(is_block_type_disabled(&on, "poll"));
        assert!(is_block_type_disabled(&on, "library_content"));
        assert!(!is_block_type_disabled(&on, "problem"));
        assert!(!is_block_type_disabled(&on, "pol"));

        let off = entry(false, "poll", "");
        assert!(!is_block_type_disabled(&off, "poll"));
        assert!(disabled_block_types(&off).is_empty());
        assert_eq!(disabled_block_types(&on), strings(&["poll", "library_content"]));
    }

    #[test]
    fn test_deprecated_from_settings_only() {
        let settings = strings(&["poll", "survey"]);
        let empty = entry(true, "", "");
        assert_eq!(
            deprecated_block_types(&empty, Some(&settings)),
            strings(&["poll", "survey"])
        );
    }

    #[test]
    fn test_deprecated_admin_first_then_settings() {
        let settings = strings(&["poll", "survey"]);
        let admin = entry(true, "", "annotatable");
        assert_eq!(
            deprecated_block_types(&admin, Some(&settings)),
            strings(&["annotatable", "poll", "survey"])
        );
    }

    #[test]
    fn test_deprecated_merge_skips_duplicates() {
        let settings = strings(&["poll", "annotatable", "poll"]);
        let admin = entry(true, "", "annotatable");
        assert_eq!(
            deprecated_block_types(&admin, Some(&settings)),
            strings(&["annotatable", "poll"])
        );
    }

    #[test]
    fn test_deprecated_disabled_config_and_unset_settings() {
        let off = entry(false, "", "annotatable");
        assert!(deprecated_block_types(&off, None).is_empty());
        assert_eq!(
            deprecated_block_types(&off, Some(&strings(&["poll"]))),
            strings(&["poll"])
        );
        assert_eq!(
            deprecated_block_types(&entry(true, "", "annotatable"), None),
            strings(&["annotatable"])
        );
    }

    #[test]
    fn test_display() {
        let config = XBlockDisableConfig {
            disabled_blocks: "poll".to_string(),
            deprecated_blocks: "annotatable survey".to_string(),
        };
        assert_eq!(
            config.to_string(),
            "Disabled xblocks = poll\nDeprecated xblocks = annotatable survey"
        );
    }
}
