//! Headless browser rendering of snapshot pages.
//!
//! A session serves the snapshot directory over loopback HTTP, launches a
//! headless Chrome/Chromium through chromiumoxide, and captures pages one at
//! a time in a single tab: navigate, settle, extract text, full-page PNG.
//! The same launcher resolves invite links, see [`invite`].

pub mod invite;
mod script;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures_util::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;

use lanhu_core::cache::{RenderBackend, RenderSession, RenderedPage};
use lanhu_core::{AppConfig, Error};

use crate::serve::LocalServer;

pub use script::TEXT_EXTRACTION_SCRIPT;

/// Errors that can occur while rendering a page.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Failed to start the local file server.
    #[error("file server failed: {0}")]
    Server(String),

    /// Failed to launch or connect to browser.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Failed to navigate to the page.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Screenshot capture failed.
    #[error("screenshot failed: {0}")]
    Screenshot(String),

    /// Text extraction script failed.
    #[error("text extraction failed: {0}")]
    TextExtraction(String),

    /// Page did not finish within the per-page timeout.
    #[error("render timeout after {0}ms")]
    Timeout(u64),

    /// Session was already closed.
    #[error("browser closed unexpectedly")]
    BrowserClosed,
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        Error::RenderFailed(err.to_string())
    }
}

/// Options for rendering pages.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Whether sessions may be started at all.
    pub enabled: bool,

    /// Per-page timeout covering navigation, settle, and capture.
    pub timeout: Duration,

    /// Extra wait after navigation for Axure scripts to lay out the page.
    pub settle: Duration,

    /// Viewport dimensions (default: 1920x1080).
    pub viewport: (u32, u32),
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { enabled: true, timeout: Duration::from_secs(30), settle: Duration::from_secs(2), viewport: (1920, 1080) }
    }
}

impl RenderOptions {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            enabled: config.render_enabled,
            timeout: config.render_timeout(),
            settle: Duration::from_millis(config.settle_ms),
            viewport: (config.viewport_width, config.viewport_height),
        }
    }
}

/// Starts browser sessions over snapshot directories.
#[derive(Debug, Clone, Default)]
pub struct BrowserBackend {
    options: RenderOptions,
}

impl BrowserBackend {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }
}

#[async_trait]
impl RenderBackend for BrowserBackend {
    type Session = BrowserSession;

    async fn start(&self, snapshot_dir: &Path) -> Result<BrowserSession, Error> {
        if !self.options.enabled {
            return Err(Error::RenderDisabled);
        }

        let mut server = LocalServer::start(snapshot_dir).await.map_err(|e| RenderError::Server(e.to_string()))?;

        match launch(&self.options).await {
            Ok((browser, page, handler)) => {
                tracing::debug!(port = server.port(), "render session started");
                Ok(BrowserSession {
                    server,
                    browser,
                    page: Some(page),
                    handler,
                    timeout: self.options.timeout,
                    settle: self.options.settle,
                })
            }
            Err(e) => {
                server.shutdown().await;
                Err(e.into())
            }
        }
    }
}

async fn launch(options: &RenderOptions) -> Result<(Browser, Page, JoinHandle<()>), RenderError> {
    let (width, height) = options.viewport;
    let config = BrowserConfig::builder()
        .window_size(width, height)
        .request_timeout(options.timeout)
        .build()
        .map_err(RenderError::BrowserLaunch)?;

    let (mut browser, mut handler) =
        Browser::launch(config).await.map_err(|e| RenderError::BrowserLaunch(e.to_string()))?;

    let handler = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::debug!("browser handler event error: {e}");
                break;
            }
        }
    });

    match browser.new_page("about:blank").await {
        Ok(page) => Ok((browser, page, handler)),
        Err(e) => {
            browser.close().await.ok();
            handler.abort();
            Err(RenderError::BrowserLaunch(e.to_string()))
        }
    }
}

/// One file server plus one browser tab, used serially.
pub struct BrowserSession {
    server: LocalServer,
    browser: Browser,
    page: Option<Page>,
    handler: JoinHandle<()>,
    timeout: Duration,
    settle: Duration,
}

impl BrowserSession {
    async fn capture(&self, page: &Page, url: String) -> Result<RenderedPage, RenderError> {
        page.goto(url).await.map_err(|e| RenderError::Navigation(e.to_string()))?;
        page.wait_for_navigation().await.map_err(|e| RenderError::Navigation(e.to_string()))?;
        tokio::time::sleep(self.settle).await;

        let text: String = page
            .evaluate(TEXT_EXTRACTION_SCRIPT)
            .await
            .map_err(|e| RenderError::TextExtraction(e.to_string()))?
            .into_value()
            .map_err(|e| RenderError::TextExtraction(e.to_string()))?;

        let image = page
            .screenshot(ScreenshotParams::builder().format(CaptureScreenshotFormat::Png).full_page(true).build())
            .await
            .map_err(|e| RenderError::Screenshot(e.to_string()))?;

        Ok(RenderedPage { image: Bytes::from(image), text })
    }
}

#[async_trait]
impl RenderSession for BrowserSession {
    async fn render(&mut self, page_file: &str) -> Result<RenderedPage, Error> {
        let page = self.page.clone().ok_or(RenderError::BrowserClosed)?;
        let url = self.server.url_for(page_file);
        let start = std::time::Instant::now();

        let rendered = tokio::time::timeout(self.timeout, self.capture(&page, url))
            .await
            .map_err(|_| RenderError::Timeout(self.timeout.as_millis() as u64))??;

        tracing::debug!(page = page_file, elapsed_ms = start.elapsed().as_millis() as u64, "page rendered");
        Ok(rendered)
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            page.close().await.ok();
        }
        self.browser.close().await.ok();
        self.browser.wait().await.ok();
        self.handler.abort();
        self.server.shutdown().await;
        tracing::debug!("render session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_app() {
        let config = AppConfig {
            render_enabled: false,
            render_timeout_ms: 5_000,
            settle_ms: 100,
            viewport_width: 800,
            viewport_height: 600,
            ..Default::default()
        };
        let options = RenderOptions::from_app(&config);
        assert!(!options.enabled);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.settle, Duration::from_millis(100));
        assert_eq!(options.viewport, (800, 600));
    }

    #[tokio::test]
    async fn test_disabled_backend_refuses_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let backend = BrowserBackend::new(RenderOptions { enabled: false, ..Default::default() });
        let result = backend.start(dir.path()).await;
        assert!(matches!(result, Err(Error::RenderDisabled)));
    }

    #[test]
    fn test_render_error_maps_to_render_failed() {
        let err: Error = RenderError::Timeout(30_000).into();
        assert_eq!(err.to_string(), "RENDER_FAILED: render timeout after 30000ms");
    }

    #[tokio::test]
    #[ignore = "requires Chrome/Chromium installation"]
    async fn test_render_local_page() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("home.html"), "<html><body><h1>Welcome</h1></body></html>").unwrap();

        let backend = BrowserBackend::new(RenderOptions { settle: Duration::from_millis(50), ..Default::default() });
        let mut session = backend.start(dir.path()).await.unwrap();
        let rendered = session.render("home.html").await;
        session.close().await;

        let rendered = rendered.unwrap();
        assert!(rendered.image.starts_with(&[0x89, b'P', b'N', b'G']));
        assert!(rendered.text.contains("Welcome"));
    }
}
