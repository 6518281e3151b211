use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use pagesaver_auth::{ProviderConfig, SessionConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Identity provider (LinkedIn) client settings
    #[serde(default)]
    pub linkedin: ProviderConfig,
    /// Session cookie settings
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        self.linkedin
            .validate()
            .map_err(|e| format!("linkedin config error: {e}"))?;
        self.session
            .validate()
            .map_err(|e| format!("session config error: {e}"))?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origin. `*` mirrors the request origin so credentials work.
    #[serde(default = "default_origin")]
    pub origin: String,
}

fn default_origin() -> String {
    "*".to_string()
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Plain environment variables understood besides `PAGESAVER__*`.
    const FLAT_ENV: &[(&str, &str)] = &[
        ("PORT", "server.port"),
        ("LINKEDIN_CLIENT_ID", "linkedin.client_id"),
        ("LINKEDIN_CLIENT_SECRET", "linkedin.client_secret"),
        ("LINKEDIN_AUTH_SCOPE", "linkedin.scope"),
        ("LINKEDIN_RESPONSE_TYPE", "linkedin.response_type"),
        ("LINKEDIN_CALLBACK_URL", "linkedin.callback_url"),
        ("CORS_ORIGIN", "cors.origin"),
    ];

    /// Maps plain environment variables to config keys.
    ///
    /// `NODE_ENV=production` turns on secure cookies.
    pub fn flat_env_overrides(lookup: impl Fn(&str) -> Option<String>) -> Vec<(&'static str, String)> {
        let mut overrides: Vec<(&'static str, String)> = FLAT_ENV
            .iter()
            .filter_map(|(var, key)| {
                lookup(var)
                    .filter(|v| !v.is_empty())
                    .map(|v| (*key, v))
            })
            .collect();
        if lookup("NODE_ENV").as_deref() == Some("production") {
            overrides.push(("session.secure", "true".to_string()));
        }
        overrides
    }

    /// Loads the configuration.
    ///
    /// Precedence, lowest first: the TOML file, plain variables such as
    /// `PORT`, then `PAGESAVER__SECTION__KEY` variables.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or("pagesaver.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }

        let mut flat = Config::builder();
        for (key, value) in flat_env_overrides(|var| std::env::var(var).ok()) {
            flat = flat
                .set_override(key, value)
                .map_err(|e| format!("config override error: {e}"))?;
        }
        let flat = flat
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        builder = builder.add_source(flat);

        // Environment variable overrides, e.g., PAGESAVER__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("PAGESAVER")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
