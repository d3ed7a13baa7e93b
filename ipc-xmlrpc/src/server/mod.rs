//! HTTP transport: accepts TCP connections, registers them, and serves `POST /` requests
//! through the [Dispatcher].

use std::{net::SocketAddr, sync::Arc};

use hyper_util::{rt::TokioIo, service::TowerToHyperService};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{error, span, trace, warn, Instrument, Level};
use url::Url;

use crate::{
    connection::{ConnectionRegistry, SessionProvider},
    dispatcher::Dispatcher,
};

mod builder;
mod http;

pub use builder::{ServerBuilder, DEFAULT_COOKIE_NAME, DEFAULT_MAX_REQUEST_SIZE};

use http::Shared;

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// A running XML-RPC server.
///
/// The listener stops once [Server::shutdown] is called or the `Server` is dropped.
/// Connections that are already open are closed as well.
pub struct Server {
    address: SocketAddr,
    url: Url,
    connections: ConnectionRegistry,
    cancel_token: CancellationToken,
    _drop_guard: DropGuard,
}

impl Server {
    /// Start serving on an already bound listener.
    pub fn new(
        tcp_listener: TcpListener,
        dispatcher: Dispatcher,
        sessions: Arc<dyn SessionProvider>,
        cookie_name: impl Into<String>,
        max_request_size: usize,
    ) -> Result<Self, ServerError> {
        let address = tcp_listener.local_addr()?;
        let url = Url::parse(&format!("http://{address}/"))?;
        let connections = dispatcher.connections().clone();
        let cancel_token = CancellationToken::new();

        let shared = Arc::new(Shared {
            dispatcher,
            sessions,
            cookie_name: cookie_name.into(),
            max_request_size,
        });

        let span = span!(
            parent: None,
            Level::DEBUG,
            "xmlrpc_listener",
            address = address.to_string(),
        );

        {
            let cancel_token = cancel_token.clone();

            tokio::spawn(
                async move {
                    Self::listener_task(tcp_listener, shared, cancel_token).await;
                    trace!("Listener task exited");
                }
                .instrument(span),
            );
        }

        Ok(Self {
            address,
            url,
            connections,
            cancel_token: cancel_token.clone(),
            _drop_guard: cancel_token.drop_guard(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Connections that are currently open.
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    async fn listener_task(
        tcp_listener: TcpListener,
        shared: Arc<Shared>,
        cancel_token: CancellationToken,
    ) {
        trace!("Listener task started");

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    trace!("Listener task stopped by cancel token.");
                    break;
                }

                connection = tcp_listener.accept() => {
                    let (stream, address) = match connection {
                        Ok(connection) => connection,
                        Err(e) => {
                            error!("Failed to accept client connection: {e}");
                            continue;
                        },
                    };

                    let span = span!(
                        Level::DEBUG,
                        "xmlrpc_connection",
                        client_addr = address.to_string(),
                    );

                    tokio::spawn(
                        Self::connection_task(
                            stream,
                            address,
                            shared.clone(),
                            cancel_token.clone(),
                        )
                        .instrument(span),
                    );
                }
            }
        }
    }

    async fn connection_task(
        stream: TcpStream,
        address: SocketAddr,
        shared: Arc<Shared>,
        cancel_token: CancellationToken,
    ) {
        let registry = shared.dispatcher.connections().clone();
        let connection = registry.connect(Some(address)).await;
        let channel = connection.channel();
        trace!("Serving channel {channel}");

        let service = TowerToHyperService::new(http::router(shared, connection));
        let serve = hyper::server::conn::http1::Builder::new()
            .keep_alive(true)
            .serve_connection(TokioIo::new(stream), service);

        tokio::select! {
            _ = cancel_token.cancelled() => {
                trace!("Channel {channel} stopped by cancel token.");
            }

            result = serve => {
                match result {
                    Ok(()) => trace!("Channel {channel} closed"),
                    Err(e) => warn!("Channel {channel} closed with error: {e}"),
                }
            }
        }

        registry.disconnect(channel).await;
    }
}
