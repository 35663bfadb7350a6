//! Layered configuration for the `termgate` binary
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. `termgate.{toml,yaml,json}` in the working directory, or the file given by `--config`
//! 3. `TERMGATE__SECTION__KEY` environment variables (a `.env` file is loaded first)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "TERMGATE";
const DEFAULT_CONFIG_NAME: &str = "termgate";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vsac: VsacConfig,
    pub session: SessionConfig,
    pub catalog: CatalogConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VsacConfig {
    pub ticket_base_url: String,
    pub service_url: String,
    pub base_url: String,
    pub timeout_seconds: u64,
    /// Expansion profile used when a request names none.
    pub default_profile: Option<String>,
    pub include_draft: bool,
}

impl Default for VsacConfig {
    fn default() -> Self {
        Self {
            ticket_base_url: "https://utslogin.nlm.nih.gov".to_string(),
            service_url: "http://umlsks.nlm.nih.gov".to_string(),
            base_url: "https://vsac.nlm.nih.gov/vsac".to_string(),
            timeout_seconds: 30,
            default_profile: None,
            include_draft: true,
        }
    }
}

impl VsacConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub grant_lifetime_minutes: i64,
    pub max_ticket_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grant_lifetime_minutes: 480,
            max_ticket_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Mapping document URL.
    pub url: Option<String>,
    /// Local copy of the mapping document. Takes precedence over `url`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let path = dirs::data_dir()
            .map(|dir| dir.join("termgate").join("credentials.json"))
            .unwrap_or_else(|| PathBuf::from("termgate-credentials.json"));
        Self { path }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: String,
    pub file_prefix: String,
    /// daily, hourly, minutely or never
    pub file_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
            file_enabled: false,
            file_directory: "logs".to_string(),
            file_prefix: "termgate".to_string(),
            file_rotation: "daily".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// An explicit `path` must exist; the default `termgate.*` file is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        // Missing keys fall back to the `Default` impls through `#[serde(default)]`.
        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("vsac.ticket_base_url", &self.vsac.ticket_base_url),
            ("vsac.service_url", &self.vsac.service_url),
            ("vsac.base_url", &self.vsac.base_url),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{name} must not be empty"));
            }
        }
        if self.vsac.timeout_seconds == 0 {
            return Err("vsac.timeout_seconds must be greater than zero".to_string());
        }
        if self.session.grant_lifetime_minutes <= 0 {
            return Err("session.grant_lifetime_minutes must be greater than zero".to_string());
        }

        let has_url = self
            .catalog
            .url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());
        if !has_url && self.catalog.path.is_none() {
            return Err("catalog requires either url or path".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn with_catalog(mut config: Config) -> Config {
        config.catalog.url = Some("https://example.org/mapping.json".to_string());
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.vsac.base_url, "https://vsac.nlm.nih.gov/vsac");
        assert_eq!(config.session.grant_lifetime_minutes, 480);
        assert_eq!(config.session.max_ticket_attempts, 3);
        assert!(config.vsac.include_draft);
        assert!(config.store.path.ends_with("credentials.json"));
    }

    #[test]
    fn test_validate_requires_catalog_source() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.contains("catalog"));

        assert!(with_catalog(Config::default()).validate().is_ok());

        let mut config = Config::default();
        config.catalog.path = Some(PathBuf::from("mapping.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout_and_empty_urls() {
        let mut config = with_catalog(Config::default());
        config.vsac.timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = with_catalog(Config::default());
        config.vsac.base_url = " ".to_string();
        assert!(config.validate().unwrap_err().contains("vsac.base_url"));
    }

    #[test]
    fn test_load_merges_file_over_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[vsac]
timeout_seconds = 5
default_profile = "Latest eCQMs"

[catalog]
path = "/srv/mapping.json"
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.vsac.timeout_seconds, 5);
        assert_eq!(config.vsac.default_profile.as_deref(), Some("Latest eCQMs"));
        assert_eq!(config.vsac.service_url, "http://umlsks.nlm.nih.gov");
        assert_eq!(
            config.catalog.path.as_deref(),
            Some(Path::new("/srv/mapping.json"))
        );
    }

    #[test]
    fn test_load_rejects_missing_explicit_file() {
        assert!(Config::load(Some(Path::new("/nonexistent/termgate.toml"))).is_err());
    }
}
