// src/settings.rs
//! Runtime configuration.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Built-in defaults
//! 2. `zk-credentials.toml` in the working directory (optional)
//! 3. `ZKCRED__*` environment variables, e.g. `ZKCRED__SERVER__BIND_ADDRESS`
//!
//! `main` loads `.env` before reading the environment.

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::services::verifier::VerifierPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub bind_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    /// HKDF salt for holder store keys.
    pub kdf_salt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuerSettings {
    /// Hex secp256k1 secret; a fresh key is generated when absent.
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifierSettings {
    pub contract_address: String,
    pub max_proof_age_secs: i64,
    pub max_clock_skew_secs: i64,
    #[serde(default)]
    pub trusted_issuers: Vec<String>,
}

impl VerifierSettings {
    pub fn policy(&self) -> VerifierPolicy {
        VerifierPolicy {
            max_proof_age_secs: self.max_proof_age_secs,
            max_clock_skew_secs: self.max_clock_skew_secs,
            trusted_issuers: self.trusted_issuers.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub issuer: IssuerSettings,
    pub verifier: VerifierSettings,
}

const ENV_PREFIX: &str = "ZKCRED";
const CONFIG_FILE: &str = "zk-credentials";

fn defaults() -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server.bind_address", "127.0.0.1:3000")?
        .set_default("store.kdf_salt", "zkcred-default-store-salt")?
        .set_default("verifier.contract_address", "0x0000000000000000000000000000000000000000")?
        .set_default("verifier.max_proof_age_secs", 300)?
        .set_default("verifier.max_clock_skew_secs", 30)?
        .set_default("verifier.trusted_issuers", Vec::<String>::new())
}

impl Settings {
    /// Loads settings from defaults, the optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("verifier.trusted_issuers")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Loads settings from defaults overlaid with a TOML document.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
