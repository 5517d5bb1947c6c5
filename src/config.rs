use anyhow::{Context, Result};
use clap::Parser;
use std::env;

const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
    pub database_url: String,
    /// Public address prefixed to generated cover URLs. Stored without a
    /// trailing slash.
    pub public_base_url: String,
    /// Maximum accepted cover upload size in bytes.
    pub max_upload_bytes: u64,
}

/// One-shot modes requested on the command line.
#[derive(Debug, Clone, Copy)]
pub struct Modes {
    pub migrate: bool,
    pub seed: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Catalog API for product records with cover images")]
pub struct Args {
    /// Host to bind to (overrides CATALOG_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CATALOG_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where cover images are stored (overrides CATALOG_UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<String>,

    /// Database URL (overrides CATALOG_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Public base URL used in cover links (overrides CATALOG_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Maximum upload size in bytes (overrides CATALOG_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,

    /// Wipe the products table, insert the sample catalog, and exit
    #[arg(long)]
    pub seed: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and one-shot modes.
    pub fn from_env_and_args() -> Result<(Self, Modes)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("CATALOG_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("CATALOG_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing CATALOG_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading CATALOG_PORT"),
        };
        let env_upload = env::var("CATALOG_UPLOAD_DIR").unwrap_or_else(|_| "./data/uploads".into());
        let env_db = env::var("CATALOG_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/catalog.db".into());
        let env_base =
            env::var("CATALOG_PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        let env_max = match env::var("CATALOG_MAX_UPLOAD_BYTES") {
            Ok(value) => value
                .parse::<u64>()
                .with_context(|| format!("parsing CATALOG_MAX_UPLOAD_BYTES value `{}`", value))?,
            Err(env::VarError::NotPresent) => DEFAULT_MAX_UPLOAD_BYTES,
            Err(err) => return Err(err).context("reading CATALOG_MAX_UPLOAD_BYTES"),
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            upload_dir: args.upload_dir.unwrap_or(env_upload),
            database_url: args.database_url.unwrap_or(env_db),
            public_base_url: args
                .public_base_url
                .unwrap_or(env_base)
                .trim_end_matches('/')
                .to_string(),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max),
        };

        Ok((
            cfg,
            Modes {
                migrate: args.migrate,
                seed: args.seed,
            },
        ))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
