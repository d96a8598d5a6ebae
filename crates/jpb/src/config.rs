//! server credentials and run settings
//!
//! ```yaml
//! server_url: https://ci.example.com/
//! username: deploy
//! password: api-token
//! timeout_secs: 60
//! strict_capabilities: false
//! github_token: ghp_...
//! ```
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub server_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub strict_capabilities: bool,
    pub github_token: Option<String>,
}

fn default_timeout() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: None,
            username: None,
            password: None,
            timeout_secs: default_timeout(),
            strict_capabilities: false,
            github_token: None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("unable to read `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse `{path}`")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // an empty file is an empty config
        if source.trim().is_empty() {
            return Ok(Self::default());
        }

        let config = serde_yaml::from_str(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn load(source: &str) -> Result<Config, ConfigError> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(source.as_bytes()).unwrap();
        Config::load(file.path())
    }

    #[test]
    fn defaults() {
        let config = load("server_url: http://localhost:8080\nusername: admin\n").unwrap();
        assert_eq!(config.server_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(!config.strict_capabilities);
        assert_eq!(config.password, None);

        assert_eq!(load("").unwrap(), Config::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(load("sever_url: x"), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn missing_file() {
        let err = Config::load(Path::new("/nonexistent/credentials.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
