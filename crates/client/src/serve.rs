//! Ephemeral loopback file server for rendering sessions.
//!
//! Prototype pages load their scripts and styles with relative URLs, so they
//! have to be opened over HTTP rather than `file://`. The server lives for one
//! render batch on a random port of 127.0.0.1.

use std::net::SocketAddr;
use std::path::Path;

use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

/// Static file server over one snapshot directory.
#[derive(Debug)]
pub struct LocalServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl LocalServer {
    /// Bind to a free loopback port and start serving `root`.
    pub async fn start(root: &Path) -> std::io::Result<Self> {
        let app = Router::new().fallback_service(ServeDir::new(root));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await;
            if let Err(e) = served {
                tracing::warn!(error = %e, "snapshot file server stopped with error");
            }
        });

        tracing::debug!(%addr, root = %root.display(), "snapshot file server started");
        Ok(Self { addr, shutdown_tx: Some(shutdown_tx), task: Some(task) })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.addr.port())
    }

    /// URL of a file relative to the served root.
    pub fn url_for(&self, relative: &str) -> String {
        format!("{}/{}", self.base_url(), relative.trim_start_matches('/'))
    }

    /// Stop accepting connections and wait for the server task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
            tracing::debug!(addr = %self.addr, "snapshot file server stopped");
        }
    }
}

impl Drop for LocalServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
