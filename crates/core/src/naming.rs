//! Rules for operator-chosen names that end up inside file names.

/// Maximum length of a database config name.
pub const MAX_CONFIG_NAME_LEN: usize = 64;

/// A config name is 1-64 characters of `[A-Za-z0-9_-]`.
///
/// Config names are embedded in lock, status, log and backup file names, so
/// anything that could escape a directory or confuse a shell is rejected.
pub fn is_valid_config_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_CONFIG_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
