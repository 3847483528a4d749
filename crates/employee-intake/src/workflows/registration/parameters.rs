use std::collections::HashMap;

use super::storage::StoreError;

/// Value that switches a boolean parameter on. Anything else, including absence, is off.
pub const FLAG_ENABLED: &str = "1";

/// Named textual configuration values (templates, toggles, recipient lists).
pub trait ParameterSource: Send + Sync {
    /// Values for the requested names. Names without a stored value are absent from the map.
    fn get_many(&self, names: &[&str]) -> Result<HashMap<String, String>, StoreError>;
    fn get_one(&self, name: &str) -> Result<Option<String>, StoreError>;
}

pub fn flag_enabled(value: Option<&str>) -> bool {
    value.map(str::trim) == Some(FLAG_ENABLED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_enables_a_flag() {
        assert!(flag_enabled(Some("1")));
        assert!(flag_enabled(Some(" 1 ")));
        assert!(!flag_enabled(Some("0")));
        assert!(!flag_enabled(Some("true")));
        assert!(!flag_enabled(Some("")));
        assert!(!flag_enabled(None));
    }
}
