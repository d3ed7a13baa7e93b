use std::{
    env,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::Arc,
};

use tokio::net::TcpListener;

use crate::{
    codec::{CodecConfig, FaultCodes, ObjectCodec},
    connection::{ConnectionRegistry, MemorySessions, SessionProvider},
    dispatcher::Dispatcher,
    executor::CommandExecutor,
    server::{Server, ServerError},
};

pub const DEFAULT_COOKIE_NAME: &str = "psessid";
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1024 * 1024;

const BIND_ADDRESS_VAR: &str = "XMLRPC_BIND_ADDRESS";
const COOKIE_NAME_VAR: &str = "XMLRPC_COOKIE_NAME";

/// Builds a [Server] with custom configuration values.
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use ipc_xmlrpc::{
///     call::Call,
///     executor::{CommandRouter, ExecutionResult},
///     object::Object,
///     server::ServerBuilder,
/// };
///
/// fn ping(_: &mut Call) -> ExecutionResult {
///     Ok(Object::from("pong"))
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let router = CommandRouter::new().add_command("ping", Box::new(ping));
///
///     let server = ServerBuilder::new(Arc::new(router))
///         .bind_address("127.0.0.1:8080".parse().unwrap())
///         .cookie_name("session")
///         .build()
///         .await
///         .unwrap();
///
///     println!("Serving on {}", server.url());
/// }
/// ```
pub struct ServerBuilder {
    executor: Arc<dyn CommandExecutor>,
    bind_address: Option<SocketAddr>,
    cookie_name: Option<String>,
    max_request_size: Option<usize>,
    fault_codes: FaultCodes,
    codec_config: CodecConfig,
    session_provider: Option<Arc<dyn SessionProvider>>,
}

impl ServerBuilder {
    /// Constructs a new builder around the executor that will run every call.
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            bind_address: None,
            cookie_name: None,
            max_request_size: None,
            fault_codes: FaultCodes::default(),
            codec_config: CodecConfig::default(),
            session_provider: None,
        }
    }

    fn resolve_bind_address(&self) -> SocketAddr {
        self.bind_address
            .or_else(|| {
                env::var(BIND_ADDRESS_VAR)
                    .ok()
                    .and_then(|address| address.parse().ok())
            })
            .unwrap_or(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0).into())
    }

    fn resolve_cookie_name(&self) -> String {
        self.cookie_name
            .clone()
            .or_else(|| env::var(COOKIE_NAME_VAR).ok())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| String::from(DEFAULT_COOKIE_NAME))
    }

    /// Configure the address the server listens on.
    ///
    /// If unset, the builder will attempt to use the `XMLRPC_BIND_ADDRESS` env variable before
    /// falling back on `127.0.0.1` with a randomly selected port number.
    pub fn bind_address(mut self, address: SocketAddr) -> Self {
        self.bind_address = Some(address);
        self
    }

    /// Set the name of the cookie carrying the session id.
    ///
    /// If unset, the builder will attempt to use the `XMLRPC_COOKIE_NAME` env variable
    /// before falling back to `psessid`.
    pub fn cookie_name(mut self, cookie_name: impl Into<String>) -> Self {
        self.cookie_name = Some(cookie_name.into());
        self
    }

    /// Largest accepted request body in bytes. Defaults to 1 MiB.
    pub fn max_request_size(mut self, max_request_size: usize) -> Self {
        self.max_request_size = Some(max_request_size);
        self
    }

    pub fn fault_codes(mut self, fault_codes: FaultCodes) -> Self {
        self.fault_codes = fault_codes;
        self
    }

    pub fn codec_config(mut self, codec_config: CodecConfig) -> Self {
        self.codec_config = codec_config;
        self
    }

    /// Use a custom session store. Defaults to [MemorySessions].
    pub fn session_provider(mut self, session_provider: Arc<dyn SessionProvider>) -> Self {
        self.session_provider = Some(session_provider);
        self
    }

    /// Consumes the builder, binds the listener and starts serving.
    pub async fn build(self) -> Result<Server, ServerError> {
        let tcp_listener = TcpListener::bind(self.resolve_bind_address()).await?;
        let cookie_name = self.resolve_cookie_name();

        let dispatcher = Dispatcher::new(self.executor, ConnectionRegistry::new())
            .with_codec(ObjectCodec::new(self.codec_config))
            .with_fault_codes(self.fault_codes);

        let sessions: Arc<dyn SessionProvider> = match self.session_provider {
            Some(session_provider) => session_provider,
            None => Arc::new(MemorySessions::new()),
        };

        Server::new(
            tcp_listener,
            dispatcher,
            sessions,
            cookie_name,
            self.max_request_size.unwrap_or(DEFAULT_MAX_REQUEST_SIZE),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::CommandRouter;

    #[test]
    fn explicit_values_win() {
        let builder = ServerBuilder::new(Arc::new(CommandRouter::new()))
            .bind_address("127.0.0.1:4242".parse().unwrap())
            .cookie_name("session");

        assert_eq!(
            builder.resolve_bind_address(),
            "127.0.0.1:4242".parse().unwrap()
        );
        assert_eq!(builder.resolve_cookie_name(), "session");
    }

    #[tokio::test]
    async fn build_binds_listener() {
        let server = ServerBuilder::new(Arc::new(CommandRouter::new()))
            .bind_address("127.0.0.1:0".parse().unwrap())
            .build()
            .await
            .unwrap();

        assert_ne!(server.local_addr().port(), 0);
        assert_eq!(
            server.url().as_str(),
            format!("http://{}/", server.local_addr())
        );
        assert!(server.connections().is_empty().await);

        server.shutdown();
        assert!(server.is_shutdown());
    }
}
