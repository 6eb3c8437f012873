use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use rollcall_auth::providers::firebase::{DEFAULT_IDENTITY_URL, DEFAULT_TOKEN_URL};
use rollcall_utils::{SecretString, humantime_serde};
use serde::{Deserialize, Serialize};

/// Environment variables `ROLLCALL__SECTION__KEY` override the file.
pub const ENV_PREFIX: &str = "ROLLCALL__";

const CONFIG_FILE_NAME: &str = "config.yaml";
const HOME_DIR_NAME: &str = ".rollcall";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub user_agent: String,
    /// The stock backend is served over plain HTTP
    pub allow_insecure_http: bool,
    /// No timeout unless set
    #[serde(
        with = "humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: attendance_client::DEFAULT_BASE_URL.to_owned(),
            user_agent: format!("rollcall/{}", env!("CARGO_PKG_VERSION")),
            allow_insecure_http: true,
            request_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Identity provider web API key; only `login` needs it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,
    pub identity_url: String,
    pub token_url: String,
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            identity_url: DEFAULT_IDENTITY_URL.to_owned(),
            token_url: DEFAULT_TOKEN_URL.to_owned(),
            refresh_interval: rollcall_auth::SessionConfig::default().refresh_interval,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Session files live here; a leading `~` is expanded
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("~").join(HOME_DIR_NAME),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `warn` or `rollcall_auth=debug`
    pub level: String,
    pub format: LogFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

impl AppConfig {
    /// Layered load: defaults, then YAML, then `ROLLCALL__*` environment.
    ///
    /// An explicit `path` must exist. Without one, `~/.rollcall/config.yaml`
    /// is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        match path {
            Some(path) => {
                if !path.is_file() {
                    anyhow::bail!("config file does not exist: {}", path.display());
                }
                figment = figment.merge(Yaml::file_exact(path));
            }
            None => {
                if let Some(default) = default_config_path()
                    && default.is_file()
                {
                    figment = figment.merge(Yaml::file_exact(default));
                }
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    fn from_figment(figment: &Figment) -> Result<Self> {
        let mut config: AppConfig = figment.extract().context("invalid configuration")?;
        config.storage.dir = expand_home(&config.storage.dir);
        if let Some(file) = config.logging.file.take() {
            config.logging.file = Some(expand_home(&file));
        }
        Ok(config)
    }

    /// `-v` info, `-vv` debug, `-vvv` trace. Never lowers the configured level.
    pub fn apply_cli_overrides(&mut self, verbose: u8) {
        let level = match verbose {
            0 => return,
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        if level_rank(level) > level_rank(&self.logging.level) {
            self.logging.level = level.to_owned();
        }
    }

    /// YAML with secrets replaced by `[REDACTED]`.
    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self).context("failed to render configuration")
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(HOME_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest)),
        Err(_) => path.to_path_buf(),
    }
}

/// Rank of a bare level name; directives with targets rank as `trace` so
/// `-v` never overrides them.
fn level_rank(level: &str) -> u8 {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => 0,
        "error" => 1,
        "warn" => 2,
        "info" => 3,
        "debug" => 4,
        _ => 5,
    }
}
