use std::collections::BTreeMap;

use crate::error::ConfigError;

/// Static short-name to address mapping, fixed after startup.
#[derive(Debug, Clone, Default)]
pub struct GuestDirectory {
    guests: BTreeMap<String, String>,
}

impl GuestDirectory {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            guests: entries
                .into_iter()
                .map(|(name, email)| (name.into(), email.into()))
                .collect(),
        }
    }

    /// Parses `name=email;name=email`. Empty segments are skipped.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut guests = BTreeMap::new();
        for entry in raw.split(';') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let Some((name, email)) = entry.split_once('=') else {
                return Err(ConfigError::Invalid {
                    key: "GUESTS",
                    value: entry.to_string(),
                });
            };
            let (name, email) = (name.trim(), email.trim());
            if name.is_empty() || !email.contains('@') {
                return Err(ConfigError::Invalid {
                    key: "GUESTS",
                    value: entry.to_string(),
                });
            }
            guests.insert(name.to_string(), email.to_string());
        }
        Ok(Self { guests })
    }

    /// Exact, case-sensitive match.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.guests.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.guests.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.guests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let directory = GuestDirectory::new([("Bareket", "bareket@example.com")]);
        assert_eq!(directory.lookup("Bareket"), Some("bareket@example.com"));
        assert_eq!(directory.lookup("bareket"), None);
        assert_eq!(directory.lookup("Bar"), None);
    }

    #[test]
    fn parses_config_string() {
        let directory =
            GuestDirectory::parse(" ברקת = bareket@example.com ; Dan=dan@example.com;").unwrap();
        assert_eq!(directory.lookup("ברקת"), Some("bareket@example.com"));
        assert_eq!(directory.lookup("Dan"), Some("dan@example.com"));
        assert_eq!(directory.names().count(), 2);
    }

    #[test]
    fn rejects_entries_without_address() {
        assert!(matches!(
            GuestDirectory::parse("Dan"),
            Err(ConfigError::Invalid { key: "GUESTS", .. })
        ));
        assert!(GuestDirectory::parse("Dan=not-an-address").is_err());
        assert!(GuestDirectory::parse("").unwrap().is_empty());
    }
}
