use std::net::SocketAddr;
use std::sync::Arc;

use recon_core::QueryService;
use tokio::sync::watch;

use crate::error::GatewayError;
use crate::router::build_router;

#[derive(Clone)]
pub(crate) struct AppState {
    pub service: Arc<QueryService>,
}

pub struct GatewayServer {
    addr: SocketAddr,
    max_body_size: usize,
    service: Arc<QueryService>,
    shutdown_rx: watch::Receiver<bool>,
}

impl GatewayServer {
    #[must_use]
    pub fn new(
        bind: &str,
        port: u16,
        service: Arc<QueryService>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let addr: SocketAddr = format!("{bind}:{port}").parse().unwrap_or_else(|e| {
            tracing::warn!("invalid bind '{bind}': {e}, falling back to 127.0.0.1:{port}");
            SocketAddr::from(([127, 0, 0, 1], port))
        });

        Self {
            addr,
            max_body_size: 1_048_576,
            service,
            shutdown_rx,
        }
    }

    #[must_use]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until the shutdown channel flips to `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or encounters a fatal I/O error.
    pub async fn serve(self) -> Result<(), GatewayError> {
        let router = build_router(self.service, self.max_body_size);

        let addr = self.addr;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;
        tracing::info!("query API listening on {addr}");

        let mut shutdown_rx = self.shutdown_rx;
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                while !*shutdown_rx.borrow_and_update() {
                    if shutdown_rx.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                tracing::info!("query API shutting down");
            })
            .await
            .map_err(|source| GatewayError::Serve { addr, source })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use recon_core::QuerySettings;
    use recon_llm::mock::{MockEmbedder, MockGenerator};
    use recon_store::InMemoryVectorStore;

    use super::*;

    fn service() -> Arc<QueryService> {
        Arc::new(QueryService::new(
            Arc::new(MockEmbedder::new(8)),
            Arc::new(MockGenerator::default()),
            Arc::new(InMemoryVectorStore::new()),
            QuerySettings::default(),
        ))
    }

    #[test]
    fn server_builder_chain() {
        let (_stx, srx) = watch::channel(false);
        let server = GatewayServer::new("127.0.0.1", 7000, service(), srx).with_max_body_size(512);
        assert_eq!(server.max_body_size, 512);
        assert_eq!(server.addr().port(), 7000);
    }

    #[test]
    fn server_invalid_bind_fallback() {
        let (_stx, srx) = watch::channel(false);
        let server = GatewayServer::new("not_an_ip", 9999, service(), srx);
        assert_eq!(server.addr(), SocketAddr::from(([127, 0, 0, 1], 9999)));
    }

    #[tokio::test]
    async fn shutdown_signal_stops_server() {
        let (stx, srx) = watch::channel(false);
        let server = GatewayServer::new("127.0.0.1", 0, service(), srx);
        let handle = tokio::spawn(server.serve());
        stx.send(true).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn bind_failure_names_configured_address() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let (_stx, srx) = watch::channel(false);

        let err = GatewayServer::new("127.0.0.1", port, service(), srx)
            .serve()
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Bind { .. }));
        assert_eq!(err.addr(), SocketAddr::from(([127, 0, 0, 1], port)));
        assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
        assert!(std::error::Error::source(&err).is_some());
    }
}
