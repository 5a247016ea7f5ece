use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ald_transport::cache::{
    CacheConfig, MemorySessionCache, RedisClient, RedisSessionCache, SessionCache,
};
use ald_transport::config::EnvironmentConfig;
use ald_transport::database::DatabaseConnection;
use ald_transport::repositories::Repositories;
use ald_transport::services::AlertMonitor;
use ald_transport::storage::LocalBlobStore;
use ald_transport::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging (RUST_LOG, por defecto info)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚐 ALD Transport - API de solicitudes de transporte");
    info!("================================================");

    let config = EnvironmentConfig::from_env()?;
    info!("⚙️ Entorno: {}", config.environment);

    // Repositorios: PostgreSQL si hay DATABASE_URL
    let repos = match config.database_url.as_deref() {
        Some(url) => {
            let connection = DatabaseConnection::connect(url).await.map_err(|e| {
                error!("❌ Error conectando a la base de datos: {}", e);
                e
            })?;
            Repositories::postgres(connection.pool().clone())
        }
        None => {
            warn!("⚠️ DATABASE_URL no definida, usando almacenamiento en memoria");
            Repositories::in_memory()
        }
    };

    // Sesiones: Redis si hay REDIS_URL
    let sessions: Arc<dyn SessionCache> = match config.redis_url.as_deref() {
        Some(url) => {
            let cache_config = CacheConfig {
                default_ttl: config.jwt_expiration,
                ..CacheConfig::new(url)
            };
            let client = RedisClient::new(cache_config).await.map_err(|e| {
                error!("❌ Error conectando a Redis: {}", e);
                e
            })?;
            info!("✅ Redis conectado exitosamente");
            Arc::new(RedisSessionCache::new(client))
        }
        None => {
            warn!("⚠️ REDIS_URL no definida, sesiones en memoria");
            Arc::new(MemorySessionCache::new())
        }
    };

    let blobs = Arc::new(LocalBlobStore::new(&config.storage_root).await?);
    info!("📁 Blobs en {}", config.storage_root.display());

    let state = AppState::new(config.clone(), repos, sessions, blobs)?;

    let monitor = AlertMonitor::new(&state).spawn();

    let app = create_router(state);

    let addr = config.server_url();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 Servidor iniciado en http://{}", addr);
    info!("📋 Endpoints disponibles:");
    info!("   GET  /health - Estado del servicio");
    info!("   GET  /metrics - Métricas Prometheus");
    info!("   POST /api/auth/sign-up | sign-in | sign-out");
    info!("   /api/requests - Solicitudes de transporte");
    info!("   /api/profile, /api/home - Perfil y pantalla inicial");
    info!("   /api/drivers/me - Datos del driver");
    info!("   /api/alerts - Alertas (controladores)");
    info!("   GET  /api/realtime/:entity - Cambios en tiempo real (SSE)");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Servidor terminó con error: {}", e);
    }

    monitor.abort();
    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo escuchar Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo escuchar SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
