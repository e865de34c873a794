//! Configuration validation.

use super::Config;
use crate::error::{DatasetError, Result};
use std::collections::HashSet;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Server validation
    if config.server.host.is_empty() {
        return Err(DatasetError::Config("server.host is required".into()));
    }
    if config.server.client_binary.is_empty() {
        return Err(DatasetError::Config(
            "server.client_binary is required".into(),
        ));
    }

    // Transfer validation
    if config.transfer.parallel == 0 {
        return Err(DatasetError::Config(
            "transfer.parallel must be at least 1".into(),
        ));
    }
    if config.transfer.poll_interval_ms == 0 {
        return Err(DatasetError::Config(
            "transfer.poll_interval_ms must be at least 1".into(),
        ));
    }
    if config.transfer.csv_format.is_empty() {
        return Err(DatasetError::Config(
            "transfer.csv_format is required".into(),
        ));
    }

    // Repository registry validation
    let mut seen = HashSet::new();
    for repo in &config.repos {
        if repo.name.is_empty() {
            return Err(DatasetError::Config("repos[].name is required".into()));
        }
        if !seen.insert(repo.name.as_str()) {
            return Err(DatasetError::Config(format!(
                "duplicate repository name '{}'",
                repo.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepoConfig;
    use std::path::PathBuf;

    fn valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_host() {
        let mut config = valid_config();
        config.server.host = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_parallel() {
        let mut config = valid_config();
        config.transfer.parallel = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_poll_interval() {
        let mut config = valid_config();
        config.transfer.poll_interval_ms = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_duplicate_repo_names() {
        let mut config = valid_config();
        config.repos.push(RepoConfig {
            name: "built-ins".to_string(),
            description: String::new(),
            path: PathBuf::from("/elsewhere"),
        });
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate repository name"));
    }

    #[test]
    fn test_server_config_debug_redacts_password() {
        let mut config = valid_config();
        config.server.password = Some("super_secret_password_123".to_string());
        let debug_output = format!("{:?}", config.server);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_123"),
            "Debug output should not contain actual password value"
        );
    }
}
