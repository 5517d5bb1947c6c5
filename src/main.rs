use anyhow::Result;
use axum::{Router, extract::DefaultBodyLimit};
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

/// Multipart framing overhead allowed on top of the configured upload cap.
/// The blob store's streaming counter is the effective size enforcer.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + one-shot modes ---
    let (cfg, modes) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting catalog-api with config: {:?}", cfg);

    // --- Ensure upload directory exists ---
    if !Path::new(&cfg.upload_dir).exists() {
        fs::create_dir_all(&cfg.upload_dir)?;
        tracing::info!("Created upload directory at {}", cfg.upload_dir);
    }

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");
    tracing::debug!("Interpreted SQLite path => {}", db_path);

    // Create parent directory if needed
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    // Try opening manually before SQLx
    match fs::OpenOptions::new().create(true).write(true).open(db_path) {
        Ok(_) => tracing::debug!("Database file can be created/opened successfully."),
        Err(e) => tracing::warn!("Failed to open database file manually: {}", e),
    }

    let db: Arc<sqlx::Pool<sqlx::Sqlite>> = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?,
    );

    // --- Handle one-shot modes ---
    if modes.migrate {
        run_migrations(&db).await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }
    if modes.seed {
        run_seed(&db).await?;
        return Ok(()); // exit after seeding
    }

    // --- Initialize core services ---
    let repo = services::product_repository::ProductRepository::new(db.clone());
    let blobs = services::blob_store::BlobStore::new(
        cfg.upload_dir.clone(),
        cfg.public_base_url.clone(),
        cfg.max_upload_bytes,
    );
    let service = services::product_service::ProductService::new(repo, blobs);

    // --- Build router ---
    let app: Router = routes::routes::routes()
        .with_state(service)
        .layer(DefaultBodyLimit::max(cfg.max_upload_bytes as usize + BODY_LIMIT_SLACK))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run SQLite migrations manually from the SQL file.
async fn run_migrations(db: &Arc<sqlx::Pool<sqlx::Sqlite>>) -> Result<()> {
    let path = "migrations/0001_init.sql";

    if !Path::new(path).exists() {
        anyhow::bail!("Migration file not found: {}", path);
    }

    let sql = fs::read_to_string(path)?;
    let statements = sql
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(&**db).await?;
    }

    Ok(())
}

/// Sample catalog inserted by `--seed`. Covers point at external placeholder
/// images, so no blobs are staged for seeded rows.
const SAMPLE_CATALOG: [(&str, &str, &str); 11] = [
    (
        "Arcane: Piltover Nights (Original Soundtrack)",
        "Riot Games Music",
        "https://picsum.photos/seed/arcane-ost/600/600",
    ),
    (
        "Worlds Anthems Collection (LoL Esports)",
        "Riot Games Music",
        "https://picsum.photos/seed/worlds-anthems/600/600",
    ),
    (
        "Hospital Records: 2025 Drum & Bass Sampler",
        "Various Artists",
        "https://picsum.photos/seed/hospital-sampler/600/600",
    ),
    (
        "Hospitality: Arena Classics",
        "Various Artists",
        "https://picsum.photos/seed/hospitality/600/600",
    ),
    (
        "Epitaph: Punk Revival 2025",
        "Various Artists",
        "https://picsum.photos/seed/epitaph-punk/600/600",
    ),
    (
        "Epitaph: Alternative Essentials",
        "Various Artists",
        "https://picsum.photos/seed/epitaph-alt/600/600",
    ),
    (
        "Beggars Group: Indie Discovery Vol. 1",
        "Various Artists",
        "https://picsum.photos/seed/beggars-indie/600/600",
    ),
    (
        "4AD Sessions Vol. 3",
        "Various Artists",
        "https://picsum.photos/seed/4ad-sessions/600/600",
    ),
    (
        "Matador Records: New Voices",
        "Various Artists",
        "https://picsum.photos/seed/matador-voices/600/600",
    ),
    (
        "XL Recordings: Future Icons",
        "Various Artists",
        "https://picsum.photos/seed/xl-icons/600/600",
    ),
    (
        "Label Services: Global New Releases",
        "Various Artists",
        "https://picsum.photos/seed/label-services/600/600",
    ),
];

/// Wipe the products table and insert the sample catalog.
async fn run_seed(db: &Arc<sqlx::Pool<sqlx::Sqlite>>) -> Result<()> {
    sqlx::query("DELETE FROM products").execute(&**db).await?;

    let now = Utc::now();
    for (name, artist_name, cover_url) in SAMPLE_CATALOG {
        sqlx::query(
            "INSERT INTO products (name, artist_name, cover_url, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(artist_name)
        .bind(cover_url)
        .bind(now)
        .bind(now)
        .execute(&**db)
        .await?;
    }

    tracing::info!("Seeded {} products", SAMPLE_CATALOG.len());
    Ok(())
}
