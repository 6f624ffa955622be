use std::net::SocketAddr;

use axum::routing::IntoMakeService;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::normalize_path::NormalizePath;

use crate::error::ApiResult;

type Svc = IntoMakeService<NormalizePath<axum::Router>>;

pub struct HttpServer {
    addr: SocketAddr,
    svc: Svc,
}

impl HttpServer {
    #[must_use]
    pub const fn new(addr: SocketAddr, svc: Svc) -> Self {
        Self { addr, svc }
    }

    pub async fn bind(self) -> ApiResult<BoundHttpServer> {
        log::info!("Opening listen port on {}", self.addr);
        let listener = TcpListener::bind(self.addr).await?;
        Ok(BoundHttpServer {
            listener,
            svc: self.svc,
        })
    }
}

/// Listening socket, ready to serve
pub struct BoundHttpServer {
    listener: TcpListener,
    svc: Svc,
}

impl BoundHttpServer {
    pub fn local_addr(&self) -> ApiResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve requests until `token` is cancelled, then finish in-flight
    /// requests and return.
    pub async fn run(self, token: CancellationToken) -> ApiResult<()> {
        let addr = self.local_addr()?;
        axum::serve(self.listener, self.svc)
            .with_graceful_shutdown(token.cancelled_owned())
            .await?;
        log::info!("Stopped server {addr}");
        Ok(())
    }
}
