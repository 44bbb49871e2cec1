use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const PORT: &str = "PORT";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// Root for user uploads (avatars live in `<DATA_DIR>/avatars`).
    pub const DATA_DIR: &str = "DATA_DIR";
    /// Externally-reachable base URL, used to build absolute avatar URLs.
    pub const PUBLIC_URL: &str = "PUBLIC_URL";
    pub const SESSION_TTL_HOURS: &str = "SESSION_TTL_HOURS";
    /// Set to "true" or "1" to refuse logins until the email address is verified.
    pub const REQUIRE_EMAIL_VERIFICATION: &str = "REQUIRE_EMAIL_VERIFICATION";
    /// Single allowed origin for CORS. Any origin is allowed when unset.
    pub const CORS_ALLOWED_ORIGIN: &str = "CORS_ALLOWED_ORIGIN";
    pub const PURGE_INTERVAL_SECS: &str = "PURGE_INTERVAL_SECS";
    /// OpenAI-compatible chat completions endpoint.
    pub const AI_API_URL: &str = "AI_API_URL";
    pub const AI_API_KEY: &str = "AI_API_KEY";
    pub const AI_MODEL: &str = "AI_MODEL";
    pub const AI_TIMEOUT_SECS: &str = "AI_TIMEOUT_SECS";
    pub const AI_RATE_LIMIT_PER_MINUTE: &str = "AI_RATE_LIMIT_PER_MINUTE";
}

/// Default values
pub mod defaults {
    pub const PORT: u16 = 8080;
    pub const DATABASE_URL: &str = "./.db/scribo.db";
    pub const DATA_DIR: &str = "./data";
    pub const AVATARS_DIR: &str = "avatars";
    pub const SESSION_TTL_HOURS: i64 = 24 * 7;
    pub const PURGE_INTERVAL_SECS: u64 = 3600;
    pub const AI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
    pub const AI_MODEL: &str = "gpt-4o-mini";
    pub const AI_TIMEOUT_SECS: u64 = 30;
    pub const AI_RATE_LIMIT_PER_MINUTE: usize = 20;
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Settings for the third-party text model used by the AI actions
#[derive(Clone, Debug)]
pub struct AiConfig {
    pub api_url: String,
    /// AI actions answer 503 while this is unset
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub rate_limit_per_minute: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::AI_API_URL.to_string(),
            api_key: None,
            model: defaults::AI_MODEL.to_string(),
            timeout_secs: defaults::AI_TIMEOUT_SECS,
            rate_limit_per_minute: defaults::AI_RATE_LIMIT_PER_MINUTE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub data_dir: PathBuf,
    pub public_url: Option<String>,
    pub session_ttl_hours: i64,
    pub require_email_verification: bool,
    pub cors_allowed_origin: Option<String>,
    pub purge_interval_secs: u64,
    pub ai: AiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: defaults::PORT,
            database_url: defaults::DATABASE_URL.to_string(),
            data_dir: PathBuf::from(defaults::DATA_DIR),
            public_url: None,
            session_ttl_hours: defaults::SESSION_TTL_HOURS,
            require_email_verification: false,
            cors_allowed_origin: None,
            purge_interval_secs: defaults::PURGE_INTERVAL_SECS,
            ai: AiConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: env_parse(env_vars::PORT, defaults::PORT, "port number")?,
            database_url: env::var(env_vars::DATABASE_URL)
                .unwrap_or_else(|_| defaults::DATABASE_URL.to_string()),
            data_dir: env::var(env_vars::DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(defaults::DATA_DIR)),
            public_url: env_non_empty(env_vars::PUBLIC_URL),
            session_ttl_hours: env_parse(
                env_vars::SESSION_TTL_HOURS,
                defaults::SESSION_TTL_HOURS,
                "number of hours",
            )?,
            require_email_verification: env::var(env_vars::REQUIRE_EMAIL_VERIFICATION)
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            cors_allowed_origin: env_non_empty(env_vars::CORS_ALLOWED_ORIGIN),
            purge_interval_secs: non_zero(
                env_vars::PURGE_INTERVAL_SECS,
                env_parse(
                    env_vars::PURGE_INTERVAL_SECS,
                    defaults::PURGE_INTERVAL_SECS,
                    "number of seconds",
                )?,
            )?,
            ai: AiConfig {
                api_url: env::var(env_vars::AI_API_URL)
                    .unwrap_or_else(|_| defaults::AI_API_URL.to_string()),
                api_key: env_non_empty(env_vars::AI_API_KEY),
                model: env::var(env_vars::AI_MODEL)
                    .unwrap_or_else(|_| defaults::AI_MODEL.to_string()),
                timeout_secs: env_parse(
                    env_vars::AI_TIMEOUT_SECS,
                    defaults::AI_TIMEOUT_SECS,
                    "number of seconds",
                )?,
                rate_limit_per_minute: env_parse(
                    env_vars::AI_RATE_LIMIT_PER_MINUTE,
                    defaults::AI_RATE_LIMIT_PER_MINUTE,
                    "request count",
                )?,
            },
        })
    }

    /// Directory holding uploaded avatar images
    pub fn avatars_dir(&self) -> PathBuf {
        self.data_dir.join(defaults::AVATARS_DIR)
    }

    /// Base URL used when building absolute links to served files.
    ///
    /// Falls back to http://localhost:{PORT} if PUBLIC_URL is not set.
    pub fn self_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.port),
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                name,
                expected,
                value,
            })
        }
        _ => Ok(default),
    }
}

fn non_zero(name: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            name,
            expected: "number of seconds greater than zero",
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Interpret boolean-ish environment values ("true", "1", "yes", "on")
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Create the database parent directory and the upload directories.
/// Called once at startup before the server binds.
pub fn initialize_data_dirs(config: &Config) -> std::io::Result<()> {
    if let Some(parent) = Path::new(&config.database_url).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let avatars = config.avatars_dir();
    std::fs::create_dir_all(&avatars)?;
    log::info!("Avatar directory: {:?}", avatars);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" YES "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("enabled-ish"));
    }

    #[test]
    fn test_zero_purge_interval_is_rejected() {
        let err = non_zero(env_vars::PURGE_INTERVAL_SECS, 0).unwrap_err();
        assert!(err.to_string().starts_with("PURGE_INTERVAL_SECS must be"));
        assert_eq!(non_zero(env_vars::PURGE_INTERVAL_SECS, 60).unwrap(), 60);
    }

    #[test]
    fn test_self_url_fallback_and_trim() {
        let mut config = Config::default();
        config.port = 9000;
        assert_eq!(config.self_url(), "http://localhost:9000");

        config.public_url = Some("https://notes.example.com/".to_string());
        assert_eq!(config.self_url(), "https://notes.example.com");
    }

    #[test]
    fn test_initialize_data_dirs_creates_avatar_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            database_url: dir.path().join("db/scribo.db").to_string_lossy().to_string(),
            data_dir: dir.path().join("data"),
            ..Config::default()
        };

        initialize_data_dirs(&config).unwrap();

        assert!(dir.path().join("db").is_dir());
        assert!(config.avatars_dir().is_dir());
    }
}
