//! Instance configuration.

use std::fmt;

/// Identifies one database instance in the [`InstanceCache`](super::InstanceCache).
///
/// Two configs with the same address and password share an instance. The
/// password is carried along but never checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Config {
    address: String,
    password: String,
}

impl Config {
    pub fn new(address: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            password: password.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("localhost:6379", "")
    }
}

/// Shows the address only, so configs can be logged safely.
impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default() {
        let config = Config::default();
        assert_eq!(config.address(), "localhost:6379");
        assert_eq!(config.password(), "");
    }

    #[test]
    fn test_identity_includes_password() {
        let mut set = HashSet::new();
        set.insert(Config::new("a:1", ""));
        set.insert(Config::new("a:1", ""));
        set.insert(Config::new("a:1", "secret"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display_hides_password() {
        assert_eq!(Config::new("db:6379", "hunter2").to_string(), "db:6379");
    }
}
