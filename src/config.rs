//! Client configuration.
//!
//! Everything environment-dependent (API base URL, admin route flag, base
//! path) is resolved once into a [`ClientConfig`] at start-up and passed
//! explicitly to the session store, the API client and the workflow. Nothing
//! in the library reads the environment after that point.

use crate::error::Sheet2DeckError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Title used when the user leaves the title blank.
pub const DEFAULT_TITLE: &str = "Rapport - Présentation du jour";

/// Monthly conversions included in the free plan.
pub const FREE_MONTHLY_LIMIT: u32 = 10;

/// Configuration shared by every client component.
///
/// Built via [`ClientConfig::builder()`], [`ClientConfig::from_env()`] or
/// [`ClientConfig::default()`].
///
/// # Example
/// ```rust
/// use sheet2deck::{ClientConfig, Theme};
///
/// let config = ClientConfig::builder()
///     .api_base("https://api.example.com/")
///     .default_theme(Theme::Minimal)
///     .build()
///     .unwrap();
/// assert_eq!(config.api_base, "https://api.example.com");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL without trailing slash. Default: `http://localhost:8000`.
    pub api_base: String,

    /// Prefix for route paths, e.g. `/app`. Default: empty.
    pub base_path: String,

    /// Exposes the internal admin route. Default: false.
    pub admin_route_enabled: bool,

    /// Delay before a non-persistent toast disappears. Default: 6 s.
    pub toast_timeout: Duration,

    /// Timeout for JSON calls (login, me, billing). Default: 30 s.
    ///
    /// The conversion upload has no overall timeout: it waits for the
    /// backend to answer or the transport to fail.
    pub request_timeout: Duration,

    /// TCP connect timeout for every call. Default: 10 s.
    pub connect_timeout: Duration,

    /// Free-plan monthly conversions, used for the remaining-count toast. Default: 10.
    pub free_monthly_limit: u32,

    /// Title used when the submitted title is blank.
    pub default_title: String,

    /// Theme used when none is chosen. Default: [`Theme::Corporate`].
    pub default_theme: Theme,

    /// Override for the session file. Default: `{config_dir}/sheet2deck/session.json`.
    pub session_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".to_string(),
            base_path: String::new(),
            admin_route_enabled: false,
            toast_timeout: Duration::from_secs(6),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            free_monthly_limit: FREE_MONTHLY_LIMIT,
            default_title: DEFAULT_TITLE.to_string(),
            default_theme: Theme::default(),
            session_path: None,
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve from `SHEET2DECK_API_BASE`, `SHEET2DECK_BASE_PATH`,
    /// `SHEET2DECK_ENABLE_ADMIN` and `SHEET2DECK_SESSION_FILE`.
    pub fn from_env() -> Result<Self, Sheet2DeckError> {
        let mut builder = Self::builder();
        if let Ok(base) = std::env::var("SHEET2DECK_API_BASE") {
            builder = builder.api_base(base);
        }
        if let Ok(path) = std::env::var("SHEET2DECK_BASE_PATH") {
            builder = builder.base_path(path);
        }
        if let Ok(flag) = std::env::var("SHEET2DECK_ENABLE_ADMIN") {
            builder = builder.admin_route_enabled(parse_flag(&flag));
        }
        if let Ok(file) = std::env::var("SHEET2DECK_SESSION_FILE") {
            builder = builder.session_path(file);
        }
        builder.build()
    }

    /// Join an API path (`/convert`) onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    /// Session file location: explicit override, else the platform config dir.
    pub fn resolved_session_path(&self) -> PathBuf {
        if let Some(ref p) = self.session_path {
            return p.clone();
        }
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(std::env::temp_dir);
        base.join("sheet2deck").join("session.json")
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.config.api_base = url.into().trim().trim_end_matches('/').to_string();
        self
    }

    /// Normalised to a leading `/` and no trailing `/` (`""` stays empty).
    pub fn base_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        let trimmed = path.trim().trim_matches('/');
        self.config.base_path = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        };
        self
    }

    pub fn admin_route_enabled(mut self, v: bool) -> Self {
        self.config.admin_route_enabled = v;
        self
    }

    pub fn toast_timeout(mut self, d: Duration) -> Self {
        self.config.toast_timeout = d;
        self
    }

    pub fn request_timeout(mut self, d: Duration) -> Self {
        self.config.request_timeout = d;
        self
    }

    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.config.connect_timeout = d;
        self
    }

    pub fn free_monthly_limit(mut self, n: u32) -> Self {
        self.config.free_monthly_limit = n;
        self
    }

    pub fn default_title(mut self, title: impl Into<String>) -> Self {
        self.config.default_title = title.into();
        self
    }

    pub fn default_theme(mut self, theme: Theme) -> Self {
        self.config.default_theme = theme;
        self
    }

    pub fn session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.session_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, Sheet2DeckError> {
        let c = &self.config;
        if !(c.api_base.starts_with("http://") || c.api_base.starts_with("https://")) {
            return Err(Sheet2DeckError::InvalidConfig(format!(
                "API base must be an http(s) URL, got '{}'",
                c.api_base
            )));
        }
        if c.default_title.trim().is_empty() {
            return Err(Sheet2DeckError::InvalidConfig(
                "Default title must not be blank".into(),
            ));
        }
        if c.toast_timeout.is_zero() {
            return Err(Sheet2DeckError::InvalidConfig(
                "Toast timeout must be > 0".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Colour theme of the generated deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Sober blues. (default)
    #[default]
    Corporate,
    /// White background, thin accents.
    Minimal,
    /// Saturated colours for marketing decks.
    Energetic,
}

impl Theme {
    /// Form value sent to the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Corporate => "corporate",
            Theme::Minimal => "minimal",
            Theme::Energetic => "energetic",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = Sheet2DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "corporate" => Ok(Theme::Corporate),
            "minimal" => Ok(Theme::Minimal),
            "energetic" => Ok(Theme::Energetic),
            other => Err(Sheet2DeckError::InvalidInput(format!(
                "Unknown theme '{other}' (expected corporate, minimal or energetic)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.toast_timeout, Duration::from_secs(6));
        assert_eq!(c.free_monthly_limit, 10);
        assert_eq!(c.default_theme, Theme::Corporate);
        assert!(!c.admin_route_enabled);
    }

    #[test]
    fn builder_normalises_urls_and_paths() {
        let c = ClientConfig::builder()
            .api_base(" https://api.example.com// ")
            .base_path("app/")
            .build()
            .unwrap();
        assert_eq!(c.api_base, "https://api.example.com");
        assert_eq!(c.base_path, "/app");
        assert_eq!(c.endpoint("/convert"), "https://api.example.com/convert");
        assert_eq!(c.endpoint("auth/me"), "https://api.example.com/auth/me");

        let c = ClientConfig::builder().base_path("/").build().unwrap();
        assert_eq!(c.base_path, "");
    }

    #[test]
    fn builder_rejects_bad_values() {
        assert!(ClientConfig::builder().api_base("ftp://x").build().is_err());
        assert!(ClientConfig::builder().default_title("  ").build().is_err());
        assert!(ClientConfig::builder()
            .toast_timeout(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn theme_round_trip_through_strings() {
        assert_eq!("Minimal".parse::<Theme>().unwrap(), Theme::Minimal);
        assert_eq!(Theme::Energetic.to_string(), "energetic");
        assert!("neon".parse::<Theme>().is_err());
    }

    #[test]
    fn explicit_session_path_wins() {
        let c = ClientConfig::builder()
            .session_path("/tmp/s.json")
            .build()
            .unwrap();
        assert_eq!(c.resolved_session_path(), PathBuf::from("/tmp/s.json"));
        let d = ClientConfig::default().resolved_session_path();
        assert!(d.ends_with("sheet2deck/session.json"));
    }

    #[test]
    fn flag_parsing() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }
}
