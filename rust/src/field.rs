use std::fmt;

/// The fixed set of configuration slots held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    BaseUrl,
    PreferenceName,
    Token,
}

impl ConfigField {
    pub const ALL: [ConfigField; 3] = [
        ConfigField::BaseUrl,
        ConfigField::PreferenceName,
        ConfigField::Token,
    ];

    /// Key under which the field is kept by a persistence bridge.
    pub fn key(self) -> &'static str {
        match self {
            ConfigField::BaseUrl => "base_url",
            ConfigField::PreferenceName => "preference_name",
            ConfigField::Token => "token",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            ConfigField::BaseUrl => 0,
            ConfigField::PreferenceName => 1,
            ConfigField::Token => 2,
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::ConfigField;

    #[test]
    fn keys_and_slots_are_distinct() {
        let mut keys: Vec<_> = ConfigField::ALL.iter().map(|f| f.key()).collect();
        keys.dedup();
        assert_eq!(keys, vec!["base_url", "preference_name", "token"]);
        for (i, field) in ConfigField::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
    }
}
