use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to bind query API on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("query API on {addr} stopped")]
    Serve {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

impl GatewayError {
    /// Address the server was configured with.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        match self {
            Self::Bind { addr, .. } | Self::Serve { addr, .. } => *addr,
        }
    }
}
