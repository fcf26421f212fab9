// src/main.rs

//! # zk-credentials server
//!
//! Wires the issuer, verifier, revocation ledger and encrypted credential
//! store together and serves them over HTTP.
//!
//! ## Configuration
//! See [`zk_credentials::settings`]. The most useful variables:
//! - `ZKCRED__SERVER__BIND_ADDRESS`: listen address (default `127.0.0.1:3000`)
//! - `ZKCRED__ISSUER__SECRET_KEY`: issuer secp256k1 secret, hex (generated when unset)
//! - `ZKCRED__STORE__KDF_SALT`: salt for holder store keys
//! - `ZKCRED__VERIFIER__TRUSTED_ISSUERS`: comma-separated issuer public keys

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use env_logger::Env;
use log::{info, warn};

use zk_credentials::services::{ApiServer, CredentialIssuer, Verifier};
use zk_credentials::settings::Settings;
use zk_credentials::storage::RevocationLedger;
use zk_credentials::wallet::{CredentialStorage, KeyManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = Settings::load().context("failed to load configuration")?;

    let key_manager = match &settings.issuer.secret_key {
        Some(secret) => KeyManager::from_secret_hex(secret).context("invalid issuer secret key")?,
        None => {
            warn!("No issuer secret configured; generated an ephemeral key");
            KeyManager::generate()
        }
    };

    // Shared ledger replica for issuer and verifier
    let ledger = Arc::new(RevocationLedger::new());
    let store = Arc::new(CredentialStorage::new(settings.store.kdf_salt.as_bytes()));
    let credential_issuer = Arc::new(CredentialIssuer::new(key_manager, Arc::clone(&ledger)));
    let verifier = Arc::new(
        Verifier::new(Arc::clone(&ledger), settings.verifier.policy()).context("invalid trusted issuer key")?,
    );

    info!("Issuer public key: {}", credential_issuer.public_key());

    let api_server = ApiServer::new(
        credential_issuer,
        verifier,
        ledger,
        store,
        settings.verifier.contract_address.clone(),
    );

    let addr: SocketAddr = settings
        .server
        .bind_address
        .parse()
        .with_context(|| format!("invalid bind address `{}`", settings.server.bind_address))?;
    api_server.run(addr).await.context("API server stopped")?;
    Ok(())
}
