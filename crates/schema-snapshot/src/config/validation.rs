//! Configuration validation.

use super::{Config, SnapshotOptions};
use crate::error::{Result, SnapshotError};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    for addr in &config.cluster.addresses {
        if addr.trim().is_empty() {
            return Err(SnapshotError::Config(
                "cluster.addresses must not contain empty entries".into(),
            ));
        }
    }
    if let Some(user) = &config.cluster.user {
        if user.trim().is_empty() {
            return Err(SnapshotError::Config("cluster.user must not be empty".into()));
        }
    }

    validate_snapshot(&config.snapshot)
}

/// Validate snapshot options alone.
pub fn validate_snapshot(options: &SnapshotOptions) -> Result<()> {
    let name = options.base_name();
    if name.is_empty() {
        return Err(SnapshotError::Config("snapshot.name is required".into()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(SnapshotError::Config(format!(
            "snapshot.name must be a plain file name, got '{}'",
            options.name
        )));
    }
    if options.dir.as_os_str().is_empty() {
        return Err(SnapshotError::Config("snapshot.dir is required".into()));
    }
    if !options.full && options.caches.is_empty() {
        return Err(SnapshotError::Config(
            "snapshot.caches must list at least one cache when snapshot.full is false".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClusterConfig;

    fn valid_config() -> Config {
        Config {
            cluster: ClusterConfig {
                addresses: vec!["127.0.0.1:10800".to_string()],
                user: Some("ignite".to_string()),
            },
            snapshot: SnapshotOptions::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_blank_address() {
        let mut config = valid_config();
        config.cluster.addresses.push(" ".to_string());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_blank_user() {
        let mut config = valid_config();
        config.cluster.user = Some(String::new());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_snapshot_name() {
        let mut config = valid_config();
        config.snapshot.name = ".sql".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_snapshot_name_with_separator() {
        let mut config = valid_config();
        config.snapshot.name = "../escape".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_partial_snapshot_needs_caches() {
        let mut config = valid_config();
        config.snapshot.full = false;
        assert!(validate(&config).is_err());

        config.snapshot.caches = vec!["Pet".to_string()];
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_client_config_from_cluster() {
        let config = valid_config();
        let client = config.cluster.client_config();
        assert_eq!(client.addresses, ["127.0.0.1:10800"]);
        assert_eq!(client.user, "ignite");
    }
}
