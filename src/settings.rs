use chrono_tz::Tz;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::distance::DistanceUnit;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub content_base_url: Url,
    pub content_dataset: String,
    pub content_api_version: String,
    pub content_token: Option<String>,
    pub debug: bool,
    pub auth_token: String,
    pub enable_swagger: bool,
    pub port: u16,
    pub timezone: String,
    pub distance_unit: DistanceUnit,
    pub onboarding_url: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // APP_CONTENT_BASE_URL, APP_AUTH_TOKEN, ...
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("content_base_url", "http://localhost:3333")?
            .set_default("content_dataset", "production")?
            .set_default("content_api_version", "2024-01-01")?
            .set_default("debug", false)?
            .set_default("auth_token", "default-token-change-me")?
            .set_default("enable_swagger", true)?
            .set_default("port", 8080)?
            .set_default("timezone", "UTC")?
            .set_default("distance_unit", "miles")?
            .set_default("onboarding_url", "/onboarding")?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.timezone()?;
        Ok(settings)
    }

    /// Timezone used to derive calendar-day keys from session start times.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|err| ConfigError::Message(format!("invalid timezone {:?}: {err}", self.timezone)))
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const KEYS: [&str; 4] = [
        "APP_CONTENT_BASE_URL",
        "APP_TIMEZONE",
        "APP_DISTANCE_UNIT",
        "APP_CONTENT_TOKEN",
    ];

    fn clear_env() {
        for key in KEYS {
            // SAFETY: settings tests run serially and no other thread reads the environment.
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.content_dataset, "production");
        assert_eq!(settings.distance_unit, DistanceUnit::Miles);
        assert_eq!(settings.timezone().unwrap(), Tz::UTC);
        assert_eq!(settings.onboarding_url, "/onboarding");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        // SAFETY: see clear_env.
        unsafe {
            std::env::set_var("APP_CONTENT_BASE_URL", "https://abc123.api.example.io");
            std::env::set_var("APP_TIMEZONE", "Europe/Warsaw");
            std::env::set_var("APP_DISTANCE_UNIT", "kilometers");
            std::env::set_var("APP_CONTENT_TOKEN", "sk-write");
        }
        let settings = Settings::from_env().unwrap();
        clear_env();

        assert_eq!(settings.content_base_url.host_str(), Some("abc123.api.example.io"));
        assert_eq!(settings.timezone().unwrap(), chrono_tz::Europe::Warsaw);
        assert_eq!(settings.distance_unit, DistanceUnit::Kilometers);
        assert_eq!(settings.content_token.as_deref(), Some("sk-write"));
    }

    #[test]
    #[serial]
    fn test_invalid_timezone_rejected() {
        clear_env();
        // SAFETY: see clear_env.
        unsafe { std::env::set_var("APP_TIMEZONE", "Mars/Olympus") };
        let result = Settings::from_env();
        clear_env();
        assert!(result.is_err());
    }
}
