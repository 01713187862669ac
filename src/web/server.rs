//! Web server for filebay.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::file::FileService;
use crate::{FilebayError, Result};

use super::handlers::AppState;
use super::router::{create_health_router, create_router, create_static_router};

/// Web server for the file API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// CORS allowed origins.
    cors_origins: Vec<String>,
    /// Request body limit in bytes.
    body_limit: usize,
    /// Period of the expiry sweep; `None` disables it.
    sweep_interval: Option<Duration>,
    /// Age after which files are swept.
    retention: chrono::Duration,
    /// Front end directory, when static serving is enabled.
    static_path: Option<String>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, files: FileService) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| {
                FilebayError::Config(format!(
                    "invalid server address {}:{}: {e}",
                    config.server.host, config.server.port
                ))
            })?;

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(files)),
            cors_origins: config.server.cors_origins.clone(),
            body_limit: usize::try_from(config.server.max_request_size).unwrap_or(usize::MAX),
            sweep_interval: match config.files.sweep_interval_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            retention: config.files.retention()?,
            static_path: config
                .server
                .serve_static
                .then(|| config.server.static_path.clone()),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn router(&self) -> Router {
        let mut router = create_router(self.app_state.clone(), &self.cors_origins, self.body_limit)
            .merge(create_health_router());

        if let Some(static_path) = &self.static_path {
            if let Some(static_router) = create_static_router(static_path) {
                router = router.merge(static_router);
            }
        }

        router
    }

    /// Start the expiry sweep background task.
    ///
    /// The first sweep runs right away, then once per `every`.
    pub fn start_expiry_sweep_task(
        files: FileService,
        every: Duration,
        retention: chrono::Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let report = files.sweep_expired(retention).await;
                if report.scanned == 0 {
                    tracing::debug!("No expired files to sweep");
                }
            }
        })
    }

    async fn bind(&self) -> std::io::Result<(TcpListener, SocketAddr)> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        match self.sweep_interval {
            Some(every) => {
                Self::start_expiry_sweep_task(self.app_state.files.clone(), every, self.retention);
                tracing::info!(
                    "Expiry sweep started (every {}s, retention {} days)",
                    every.as_secs(),
                    self.retention.num_days()
                );
            }
            None => tracing::info!("Expiry sweep disabled"),
        }

        tracing::info!("Web server listening on http://{}", local_addr);
        Ok((listener, local_addr))
    }

    /// Run the web server.
    pub async fn run(self) -> std::result::Result<(), std::io::Error> {
        let router = self.router();
        let (listener, _) = self.bind().await?;

        axum::serve(listener, router).await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::result::Result<SocketAddr, std::io::Error> {
        let router = self.router();
        let (listener, local_addr) = self.bind().await?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
