//! Connection binding: which transport channel a call arrived on, and the session behind it.

use std::{
    collections::HashMap,
    fmt,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use rand::{distr::Alphanumeric, Rng};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::call::Context;

const SESSION_ID_LENGTH: usize = 32;

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one transport connection. Unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl ChannelId {
    fn next() -> Self {
        Self(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub struct Session {
    id: String,
    identifier: Option<String>,
    context: Mutex<Context>,
}

impl Session {
    pub fn new(id: impl Into<String>, identifier: Option<String>) -> Self {
        Self {
            id: id.into(),
            identifier,
            context: Mutex::new(Context::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Who opened the session, typically the remote host.
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn context(&self) -> &Mutex<Context> {
        &self.context
    }
}

/// Resolves the session a request belongs to.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Return the session for `session_id`, or a new one if the id is absent or unknown.
    async fn session(&self, session_id: Option<&str>, identifier: Option<&str>) -> Arc<Session>;
}

/// Sessions kept in memory for the lifetime of the provider. Sessions never expire.
#[derive(Default)]
pub struct MemorySessions {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl MemorySessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionProvider for MemorySessions {
    async fn session(&self, session_id: Option<&str>, identifier: Option<&str>) -> Arc<Session> {
        if let Some(id) = session_id {
            if let Some(session) = self.sessions.read().await.get(id) {
                trace!("Found existing session {id}");
                return session.clone();
            }
        }

        let id: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(SESSION_ID_LENGTH)
            .map(char::from)
            .collect();

        debug!("Creating session {id} for {identifier:?}");
        let session = Arc::new(Session::new(id.clone(), identifier.map(str::to_string)));
        self.sessions.write().await.insert(id, session.clone());

        session
    }
}

/// One open transport connection.
#[derive(Debug)]
pub struct Connection {
    channel: ChannelId,
    remote_addr: Option<SocketAddr>,
    session: RwLock<Option<Arc<Session>>>,
    context: Mutex<Context>,
}

impl Connection {
    fn new(remote_addr: Option<SocketAddr>) -> Self {
        Self {
            channel: ChannelId::next(),
            remote_addr,
            session: RwLock::new(None),
            context: Mutex::new(Context::new()),
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// The session attached by the most recent request, if any.
    pub async fn session(&self) -> Option<Arc<Session>> {
        self.session.read().await.clone()
    }

    pub async fn attach_session(&self, session: Arc<Session>) {
        *self.session.write().await = Some(session);
    }

    pub fn context(&self) -> &Mutex<Context> {
        &self.context
    }
}

/// Maps channel identities to their open [Connection]s.
///
/// Populated when a transport connection is accepted and emptied again when it closes.
/// Cloning yields a handle onto the same registry.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<ChannelId, Arc<Connection>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connect(&self, remote_addr: Option<SocketAddr>) -> Arc<Connection> {
        let connection = Arc::new(Connection::new(remote_addr));
        trace!(
            "Registering channel {} for {remote_addr:?}",
            connection.channel()
        );

        self.connections
            .write()
            .await
            .insert(connection.channel(), connection.clone());

        connection
    }

    pub async fn get(&self, channel: ChannelId) -> Option<Arc<Connection>> {
        self.connections.read().await.get(&channel).cloned()
    }

    /// Remove a connection and clear its context. Unknown channels are ignored.
    pub async fn disconnect(&self, channel: ChannelId) -> Option<Arc<Connection>> {
        let connection = self.connections.write().await.remove(&channel)?;
        trace!("Removed channel {channel}");

        connection.context.lock().await.clear();
        Some(connection)
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_and_disconnect() {
        let registry = ConnectionRegistry::new();
        let first = registry.connect(None).await;
        let second = registry.connect("127.0.0.1:8080".parse().ok()).await;

        assert_ne!(first.channel(), second.channel());
        assert_eq!(registry.len().await, 2);
        assert_eq!(
            registry.get(second.channel()).await.unwrap().remote_addr(),
            "127.0.0.1:8080".parse().ok()
        );

        first.context().lock().await.insert("key", 1u8);
        let removed = registry.disconnect(first.channel()).await.unwrap();

        assert!(removed.context().lock().await.is_empty());
        assert!(registry.get(first.channel()).await.is_none());
        assert!(registry.disconnect(first.channel()).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn registry_handles_share_state() {
        let registry = ConnectionRegistry::new();
        let handle = registry.clone();

        let connection = registry.connect(None).await;
        assert!(handle.get(connection.channel()).await.is_some());
    }

    #[tokio::test]
    async fn sessions_are_reused_by_id() {
        let sessions = MemorySessions::new();

        let created = sessions.session(None, Some("localhost")).await;
        assert_eq!(created.id().len(), SESSION_ID_LENGTH);
        assert_eq!(created.identifier(), Some("localhost"));

        let found = sessions.session(Some(created.id()), None).await;
        assert!(Arc::ptr_eq(&created, &found));

        let unknown = sessions.session(Some("unknown"), None).await;
        assert_ne!(unknown.id(), created.id());
        assert_eq!(sessions.len().await, 2);
    }

    #[tokio::test]
    async fn session_attaches_to_connection() {
        let registry = ConnectionRegistry::new();
        let sessions = MemorySessions::new();
        let connection = registry.connect(None).await;

        assert!(connection.session().await.is_none());

        let session = sessions.session(None, None).await;
        connection.attach_session(session.clone()).await;

        assert_eq!(connection.session().await.unwrap().id(), session.id());
    }
}
