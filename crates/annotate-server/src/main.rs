mod config;
mod error;
mod server;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use annotate_common::auth::{AuthProvider, StaticAuth};
use annotate_common::redis::RedisCache;
use annotate_common::repository::{AnnotationRepository, MemoryRepository, RedisRepository};
use annotate_common::seed::Workspace;
use annotate_common::session::AnnotationSession;

use config::Config;
use error::AppError;
use server::AnnotateServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing to stderr (stdout is reserved for MCP JSON-RPC)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting annotate MCP server");

    let config = Config::from_env()?;
    info!(
        workspace_path = %config.workspace_path.display(),
        user = %config.session_user,
        redis = config.redis_url.is_some(),
        "configuration loaded"
    );

    let workspace = Arc::new(Workspace::load(&config.workspace_path).map_err(AppError::from)?);
    if workspace.user(&config.session_user).is_none() {
        return Err(AppError::Config(format!(
            "ANNOTATE_USER {} is not listed in the workspace seed",
            config.session_user
        ))
        .into());
    }

    // Redis is optional: fall back to in-memory annotations when it is unreachable.
    let redis_cache = RedisCache::new(config.redis_url.as_deref());
    let repo: Arc<dyn AnnotationRepository> = if redis_cache.is_available().await {
        info!("redis connected, annotations are persisted in redis");
        Arc::new(RedisRepository::new(Arc::clone(&workspace), redis_cache))
    } else {
        info!("redis unavailable, annotations are kept in memory");
        Arc::new(MemoryRepository::new(Arc::clone(&workspace)))
    };

    let auth: Arc<dyn AuthProvider> = Arc::new(StaticAuth::new(
        Arc::clone(&workspace),
        Some(config.session_user.clone()),
    ));
    let session = AnnotationSession::open(Arc::clone(&repo), auth.as_ref(), workspace.palette().clone())
        .await
        .map_err(AppError::from)?;
    let progress = session.progress();
    info!(
        documents = progress.total,
        complete = progress.complete,
        started = progress.started,
        "session ready"
    );

    let server = AnnotateServer::new(session, repo, auth);

    if let Ok(addr) = std::env::var("MCP_TCP_LISTEN_ADDR") {
        let listener = TcpListener::bind(&addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                tracing::info!(peer = %peer, "MCP client connected");
                let service = server.clone().serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                server.flush().await;
                tracing::info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.clone().serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        server.flush().await;
        info!("MCP server shut down");
    }
    Ok(())
}
