use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{
        header::{CONNECTION, CONTENT_TYPE, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use tracing::{error, trace};

use crate::{
    codec::{value, Fault},
    connection::{Connection, SessionProvider},
    dispatcher::Dispatcher,
    error::ProtocolViolation,
    wire::{fault_document, XmlError},
};

const TEXT_XML: &str = "text/xml";

/// State shared by every connection of one server.
pub(crate) struct Shared {
    pub dispatcher: Dispatcher,
    pub sessions: Arc<dyn SessionProvider>,
    pub cookie_name: String,
    pub max_request_size: usize,
}

#[derive(Clone)]
struct RequestState {
    shared: Arc<Shared>,
    connection: Arc<Connection>,
}

/// Build the router serving one accepted connection.
pub(crate) fn router(shared: Arc<Shared>, connection: Arc<Connection>) -> Router {
    let max_request_size = shared.max_request_size;

    Router::new()
        .route("/", post(handle_rpc))
        .layer(DefaultBodyLimit::max(max_request_size))
        .with_state(RequestState { shared, connection })
}

async fn handle_rpc(
    State(state): State<RequestState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let RequestState { shared, connection } = state;

    let session_id = find_session_id(&headers, &shared.cookie_name);
    if let Some(session_id) = &session_id {
        trace!("Found session id in cookie: {session_id}");
    }
    let identifier = connection.remote_addr().map(|addr| addr.ip().to_string());

    let session = shared
        .sessions
        .session(session_id.as_deref(), identifier.as_deref())
        .await;
    connection.attach_session(session.clone()).await;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_XML));

    trace!("Adding session cookie {}/{}", shared.cookie_name, session.id());
    match HeaderValue::from_str(&format!("{}={}", shared.cookie_name, session.id())) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(e) => error!("Session id is not a valid cookie value: {e}"),
    }

    match shared.dispatcher.handle(connection.channel(), &body).await {
        Ok(document) => (StatusCode::OK, response_headers, document).into_response(),
        Err(e) => {
            error!("Closing channel {} after protocol violation: {e}", connection.channel());
            response_headers.insert(CONNECTION, HeaderValue::from_static("close"));

            match violation_document(&e) {
                Ok(document) => (StatusCode::OK, response_headers, document).into_response(),
                Err(e) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, response_headers, e.to_string())
                        .into_response()
                }
            }
        }
    }
}

/// Fault response sent before a connection is closed over a protocol violation.
fn violation_document(violation: &ProtocolViolation) -> Result<String, XmlError> {
    let fault = Fault::new(violation.fault_code(), violation.to_string());
    fault_document(value::encode(&fault.encode()))
}

/// Value of the first cookie named `cookie_name` across all `Cookie` headers.
fn find_session_id(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}
