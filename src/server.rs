use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::Config;
use crate::services::{DiscoveryRouter, ServiceRegistry};

// 关闭时等待连接排空的最长时间
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
// accept 失败后的退避时间，避免文件描述符耗尽时空转
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    // 初始化服务注册表
    let registry = ServiceRegistry::create(config.registry.lease_duration())?;
    let router = DiscoveryRouter::new(Arc::new(registry.clone()))?;

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Discovery server listening");

    serve(listener, router, shutdown_signal()).await;

    registry.shutdown().await;
    tracing::info!("Server exited properly");
    Ok(())
}

/// 在 `listener` 上提供 HTTP/1.1 服务，直到 `signal` 完成
///
/// 收到信号后停止接受新连接，通知已有连接优雅关闭，并最多等待
/// `SHUTDOWN_TIMEOUT`。
pub async fn serve<F>(listener: TcpListener, router: DiscoveryRouter, signal: F)
where
    F: Future<Output = ()>,
{
    let shutdown = CancellationToken::new();
    let connections = TaskTracker::new();
    tokio::pin!(signal);

    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut signal => {
                tracing::info!("Shutdown signal received, stopping server");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    accept_error_backoff(&e).await;
                    continue;
                }
            },
        };

        let service = TowerToHyperService::new(router.clone());
        let shutdown = shutdown.clone();

        connections.spawn(async move {
            let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
            tokio::pin!(conn);

            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = shutdown.cancelled() => {
                    conn.as_mut().graceful_shutdown();
                    conn.await
                }
            };

            if let Err(e) = result {
                tracing::debug!(peer = %peer, error = %e, "Connection closed with error");
            }
        });
    }

    shutdown.cancel();
    connections.close();

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, connections.wait())
        .await
        .is_err()
    {
        tracing::warn!(
            remaining = connections.len(),
            "Timed out waiting for connections to drain"
        );
    }
}

async fn accept_error_backoff(error: &std::io::Error) {
    tracing::warn!(
        error = %error,
        backoff_ms = ACCEPT_ERROR_BACKOFF.as_millis() as u64,
        "Failed to accept connection"
    );
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
