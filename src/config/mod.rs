use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    // App Settings
    pub app_name: String,
    pub version: String,
    pub debug: bool,

    // Server Settings
    pub host: String,
    pub port: u16,

    // Upstream Shortener API
    pub api_base_url: String,
    pub api_timeout_secs: u64,

    // Public origin used to render short links ({public_base_url}/{org}/{slug})
    pub public_base_url: String,

    // Session Settings
    pub session_cookie_secure: bool,
    pub session_ttl_days: i64,
}

impl Settings {
    pub fn new() -> Self {
        Settings {
            app_name: get_env("APP_NAME", "Linkdesk"),
            version: get_env("VERSION", env!("CARGO_PKG_VERSION")),
            debug: get_env_bool("DEBUG", false),

            host: get_env("HOST", "0.0.0.0"),
            port: get_env_int("PORT", 3000) as u16,

            api_base_url: trim_base(&get_env("API_BASE_URL", "http://localhost:8000")),
            api_timeout_secs: get_env_int("API_TIMEOUT_SECS", 10).max(1) as u64,

            public_base_url: trim_base(&get_env("PUBLIC_BASE_URL", "http://localhost:3000")),

            session_cookie_secure: get_env_bool("SESSION_COOKIE_SECURE", false),
            session_ttl_days: get_env_int("SESSION_TTL_DAYS", 7).max(1) as i64,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Browser-facing short link for an organization slug pair
    pub fn short_link(&self, org_slug: &str, slug: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, org_slug, slug)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

pub static SETTINGS: Lazy<Settings> = Lazy::new(Settings::new);

pub fn get_settings() -> &'static Settings {
    &SETTINGS
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_int(key: &str, default: i32) -> i32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
