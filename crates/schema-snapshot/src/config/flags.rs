//! Recognized snapshot flags and properties.
//!
//! Flags are written `-<alias>` (e.g. `-ut`), properties `-<key>=<value>` on
//! the command line or `<key>=<value>` in a property map. Property keys may
//! carry the [`PROPERTY_PREFIX`].

use std::collections::HashMap;

use super::SnapshotOptions;
use crate::error::{Result, SnapshotError};

/// Optional namespace prefix of property keys.
pub const PROPERTY_PREFIX: &str = "flyway.";

/// Boolean snapshot flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFlag {
    /// Degrade unknown column types to OBJECT.
    UnknownTypeSupport,
    /// Snapshot every cache.
    Full,
}

impl SnapshotFlag {
    pub const ALL: [SnapshotFlag; 2] = [SnapshotFlag::UnknownTypeSupport, SnapshotFlag::Full];

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            SnapshotFlag::UnknownTypeSupport => &["unsafe-type", "ut"],
            SnapshotFlag::Full => &["full"],
        }
    }

    /// Whether `arg` (in `-name` form) names this flag.
    pub fn matches(self, arg: &str) -> bool {
        arg.strip_prefix('-')
            .map_or(false, |name| self.aliases().contains(&name))
    }

    pub fn parse(arg: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|flag| flag.matches(arg))
    }
}

/// Valued snapshot property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotProperty {
    /// Base snapshot name.
    Name,
    /// Output directory.
    Dir,
}

impl SnapshotProperty {
    pub const ALL: [SnapshotProperty; 2] = [SnapshotProperty::Name, SnapshotProperty::Dir];

    pub fn key(self) -> &'static str {
        match self {
            SnapshotProperty::Name => "snapshot.name",
            SnapshotProperty::Dir => "snapshot.dir",
        }
    }

    /// Match a property key, with or without the namespace prefix.
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.strip_prefix(PROPERTY_PREFIX).unwrap_or(key);
        Self::ALL.into_iter().find(|p| p.key() == key)
    }
}

impl SnapshotOptions {
    pub fn apply_flag(&mut self, flag: SnapshotFlag) {
        match flag {
            SnapshotFlag::UnknownTypeSupport => self.unknown_type_support = true,
            SnapshotFlag::Full => self.full = true,
        }
    }

    pub fn apply_property(&mut self, property: SnapshotProperty, value: &str) {
        match property {
            SnapshotProperty::Name => self.name = value.to_string(),
            SnapshotProperty::Dir => self.dir = value.into(),
        }
    }

    /// Apply raw command-line arguments. Unrecognized arguments are an error.
    pub fn apply_args<S: AsRef<str>>(&mut self, args: &[S]) -> Result<()> {
        for arg in args {
            let arg = arg.as_ref();

            if let Some(flag) = SnapshotFlag::parse(arg) {
                self.apply_flag(flag);
                continue;
            }

            let property = arg
                .strip_prefix('-')
                .and_then(|a| a.split_once('='))
                .and_then(|(key, value)| SnapshotProperty::parse(key).map(|p| (p, value)));

            match property {
                Some((property, value)) => self.apply_property(property, value),
                None => {
                    return Err(SnapshotError::Config(format!(
                        "unrecognized snapshot argument '{}'",
                        arg
                    )))
                }
            }
        }

        Ok(())
    }

    /// Apply and remove recognized keys from a property map. Other keys are
    /// left in place.
    pub fn apply_properties(&mut self, properties: &mut HashMap<String, String>) {
        let recognized: Vec<(String, SnapshotProperty)> = properties
            .keys()
            .filter_map(|key| SnapshotProperty::parse(key).map(|p| (key.clone(), p)))
            .collect();

        for (key, property) in recognized {
            if let Some(value) = properties.remove(&key) {
                self.apply_property(property, &value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_flag_aliases() {
        assert_eq!(SnapshotFlag::parse("-ut"), Some(SnapshotFlag::UnknownTypeSupport));
        assert_eq!(
            SnapshotFlag::parse("-unsafe-type"),
            Some(SnapshotFlag::UnknownTypeSupport)
        );
        assert_eq!(SnapshotFlag::parse("-full"), Some(SnapshotFlag::Full));
        assert_eq!(SnapshotFlag::parse("ut"), None);
        assert_eq!(SnapshotFlag::parse("-"), None);
        assert_eq!(SnapshotFlag::parse("-UT"), None);
    }

    #[test]
    fn test_property_keys() {
        assert_eq!(SnapshotProperty::parse("snapshot.name"), Some(SnapshotProperty::Name));
        assert_eq!(
            SnapshotProperty::parse("flyway.snapshot.dir"),
            Some(SnapshotProperty::Dir)
        );
        assert_eq!(SnapshotProperty::parse("snapshot.other"), None);
    }

    #[test]
    fn test_apply_args() {
        let mut options = SnapshotOptions {
            full: false,
            ..Default::default()
        };
        options
            .apply_args(&["-ut", "-full", "-snapshot.name=nightly", "-snapshot.dir=/tmp/out"])
            .unwrap();

        assert!(options.unknown_type_support);
        assert!(options.full);
        assert_eq!(options.name, "nightly");
        assert_eq!(options.dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_apply_args_rejects_unknown() {
        let mut options = SnapshotOptions::default();
        assert!(options.apply_args(&["-verbose"]).is_err());
        assert!(options.apply_args(&["-snapshot.size=3"]).is_err());
    }

    #[test]
    fn test_apply_properties_consumes_recognized_keys() {
        let mut properties = HashMap::from([
            ("flyway.snapshot.name".to_string(), "weekly".to_string()),
            ("snapshot.dir".to_string(), "out".to_string()),
            ("flyway.url".to_string(), "jdbc:ignite:thin://localhost".to_string()),
        ]);

        let mut options = SnapshotOptions::default();
        options.apply_properties(&mut properties);

        assert_eq!(options.name, "weekly");
        assert_eq!(options.dir, PathBuf::from("out"));
        assert_eq!(properties.len(), 1);
        assert!(properties.contains_key("flyway.url"));
    }
}
