//! Gateway listener
//!
//! Accepts device connections and runs every call session in its own task.

use crate::context::SessionContext;
use crate::handler::{CallHandler, CallOutcome};
use elgas_core::{ElgasError, ElgasResult};
use elgas_transport::TcpTransport;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// Default read/write timeout on device connections
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(30);

/// Listener for calling devices
///
/// # Usage Example
/// ```rust,no_run
/// use elgas_gateway::handler::{CallHandler, ElgasSessionFactory};
/// use elgas_gateway::listener::GatewayListener;
/// use elgas_gateway::settings::HttpSettingsProvider;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn run() -> elgas_core::ElgasResult<()> {
/// let timeout = Duration::from_secs(30);
/// let settings = HttpSettingsProvider::new("https://backend.example", "key", timeout)?;
/// let handler = CallHandler::new(Arc::new(settings), Arc::new(ElgasSessionFactory));
/// let listener = GatewayListener::new(handler, "0.0.0.0:8649".parse().unwrap());
/// listener.start().await?;
/// # Ok(())
/// # }
/// ```
pub struct GatewayListener {
    handler: Arc<CallHandler>,
    address: SocketAddr,
    socket_timeout: Option<Duration>,
}

impl GatewayListener {
    pub fn new(handler: CallHandler, address: SocketAddr) -> Self {
        Self {
            handler: Arc::new(handler),
            address,
            socket_timeout: Some(DEFAULT_SOCKET_TIMEOUT),
        }
    }

    /// Set the read/write timeout on device connections; `None` waits forever
    pub fn with_socket_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.socket_timeout = timeout;
        self
    }

    /// Bind the configured address and serve until the process ends
    ///
    /// # Errors
    /// Returns error if binding to the address fails
    pub async fn start(&self) -> ElgasResult<()> {
        let listener = TcpListener::bind(self.address).await.map_err(|e| {
            ElgasError::Connection(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("Failed to bind to {}: {}", self.address, e),
            ))
        })?;
        self.serve(listener).await
    }

    /// Accept connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> ElgasResult<()> {
        log::info!("ELGAS gateway listening on {}", listener.local_addr()?);

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let handler = self.handler.clone();
                    let timeout = self.socket_timeout;
                    tokio::spawn(async move {
                        handle_connection(handler, stream, peer_addr, timeout).await;
                    });
                }
                Err(e) => {
                    log::error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

async fn handle_connection(
    handler: Arc<CallHandler>,
    stream: TcpStream,
    peer_addr: SocketAddr,
    timeout: Option<Duration>,
) {
    let mut ctx = SessionContext::new(peer_addr);
    log::info!("{} Handling TCP stream", ctx);

    let transport = match TcpTransport::from_connected_stream(stream, timeout) {
        Ok(transport) => transport,
        Err(e) => {
            log::error!("{} Failed to set up connection: {}", ctx, e);
            return;
        }
    };

    match handler.handle(transport, &mut ctx).await {
        Ok(CallOutcome::NotACall(service)) => {
            log::info!("{} Closed connection after {}", ctx, service);
        }
        Ok(CallOutcome::Completed(readout)) => {
            log::info!(
                "{} Call session finished, total_amount_of_data={}",
                ctx,
                readout.data.len()
            );
        }
        Err(e) => {
            log::error!("{} Call session failed: {}", ctx, e);
        }
    }
}
