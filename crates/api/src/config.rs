//! Service configuration.
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults
//! 2. an optional YAML file (`--config` / `PRINTSHOP_CONFIG`)
//! 3. `PRINTSHOP_*` environment variables (nested keys split on `__`,
//!    e.g. `PRINTSHOP_PASSWORD_HASHING__MEMORY_KIB`)

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};

use printshop_auth::Argon2Params;
use printshop_inventory::LotSelection;
use printshop_observability::{LogFormat, LoggingConfig};

/// Secret used when none is configured. Only suitable for local demos.
pub const DEV_JWT_SECRET: &str = "printshop-dev-secret";

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 365 * 24 * 60;

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a YAML configuration file
    #[arg(short = 'f', long, env = "PRINTSHOP_CONFIG")]
    pub config: Option<String>,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    /// Seed the `admin`, `operator` and `viewer` demo accounts on startup.
    pub seed_demo_users: bool,
    pub lot_selection: LotSelection,
    pub password_hashing: PasswordHashingConfig,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordHashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_minutes: 480,
            seed_demo_users: true,
            lot_selection: LotSelection::default(),
            password_hashing: PasswordHashingConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl Default for PasswordHashingConfig {
    fn default() -> Self {
        let params = Argon2Params::default();
        Self {
            memory_kib: params.memory_kib,
            iterations: params.iterations,
            parallelism: params.parallelism,
        }
    }
}

impl From<PasswordHashingConfig> for Argon2Params {
    fn from(value: PasswordHashingConfig) -> Self {
        Argon2Params {
            memory_kib: value.memory_kib,
            iterations: value.iterations,
            parallelism: value.parallelism,
        }
    }
}

impl ApiConfig {
    pub fn figment(args: &Args) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(ApiConfig::default()));
        if let Some(path) = &args.config {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed("PRINTSHOP_").split("__").ignore(&["config"]))
    }

    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(figment::Error::from)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.trim().is_empty() {
            return Err("jwt_secret cannot be empty".to_string());
        }
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&self.token_ttl_minutes) {
            return Err(format!(
                "token_ttl_minutes must be between 1 and {MAX_TOKEN_TTL_MINUTES}, got {}",
                self.token_ttl_minutes
            ));
        }
        let hashing = &self.password_hashing;
        if hashing.parallelism == 0
            || hashing.iterations == 0
            || hashing.memory_kib < 8 * hashing.parallelism
        {
            return Err("password_hashing parameters are out of range".to_string());
        }
        Ok(())
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_ttl_minutes)
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            format: self.log_format,
            ..LoggingConfig::default()
        }
    }
}
