//! The contract for running a method once its call has been decoded and bound.

use std::{any::type_name, borrow::Cow, collections::HashMap, error::Error};

use async_trait::async_trait;
use tracing::{error, trace};

use crate::{call::Call, codec::fault::codes, object::Object};

/// An expected, domain-level failure reported by a command.
///
/// Both parts are optional: without a code the fault gets the default application error code,
/// without a message the fault string falls back to the error's type name.
#[derive(thiserror::Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("{}", .message.as_deref().unwrap_or_default())]
pub struct CommandError {
    pub code: Option<i32>,
    pub message: Option<String>,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: Some(message.into()),
        }
    }

    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: Some(message.into()),
        }
    }

    pub fn unknown_method(method_name: &str) -> Self {
        Self::with_code(
            codes::METHOD_NOT_FOUND,
            format!("Unknown method: {method_name}"),
        )
    }
}

/// A failure the command did not anticipate, tagged with the name of the error type it started
/// as.
#[derive(thiserror::Error, Debug)]
#[error("{error}")]
pub struct UnexpectedError {
    type_name: Cow<'static, str>,
    error: anyhow::Error,
}

impl UnexpectedError {
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            type_name: Cow::Borrowed(type_name::<E>()),
            error: anyhow::Error::new(error),
        }
    }

    /// Name of the original error type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }
}

/// An [anyhow::Error] has lost the static type of its source. The name is read from the `Debug`
/// output of the root cause instead, which starts with the type name for derived implementations.
impl From<anyhow::Error> for UnexpectedError {
    fn from(error: anyhow::Error) -> Self {
        let type_name = match debug_name(error.root_cause()) {
            Some(name) => Cow::Owned(name),
            None => Cow::Borrowed(type_name::<anyhow::Error>()),
        };

        Self { type_name, error }
    }
}

fn debug_name(error: &(dyn Error + 'static)) -> Option<String> {
    let mut debug = format!("{error:?}");
    let end = debug
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == ':'))
        .unwrap_or(debug.len());

    debug.truncate(end);
    (!debug.is_empty()).then_some(debug)
}

#[derive(thiserror::Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Unexpected(#[from] UnexpectedError),
}

impl ExecutionError {
    /// Wrap any error as an unexpected failure, keeping its type name for the fault.
    pub fn unexpected<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        ExecutionError::Unexpected(UnexpectedError::new(error))
    }
}

impl From<anyhow::Error> for ExecutionError {
    fn from(error: anyhow::Error) -> Self {
        ExecutionError::Unexpected(error.into())
    }
}

pub type ExecutionResult = Result<Object, ExecutionError>;

/// Runs a method by name. This is where calls leave the protocol layer.
///
/// The executor may read the connection through [Call::connection]; the call is always
/// attached by the time it gets here.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, method_name: &str, call: &mut Call) -> ExecutionResult;
}

/// A single method, registered on a [CommandRouter].
#[async_trait]
pub trait Command: Send + Sync {
    async fn execute(&self, call: &mut Call) -> ExecutionResult;
}

#[async_trait]
impl<F> Command for F
where
    F: Fn(&mut Call) -> ExecutionResult + Send + Sync,
{
    async fn execute(&self, call: &mut Call) -> ExecutionResult {
        self(call)
    }
}

pub type CommandMap = HashMap<String, Box<dyn Command>>;

/// A [CommandExecutor] that looks methods up by name.
///
/// ```rust
/// use ipc_xmlrpc::{
///     call::Call,
///     executor::{CommandRouter, ExecutionResult},
///     object::Object,
/// };
///
/// fn ping(_: &mut Call) -> ExecutionResult {
///     Ok(Object::from("pong"))
/// }
///
/// let router = CommandRouter::new().add_command("ping", Box::new(ping));
/// assert!(router.contains("ping"));
/// ```
#[derive(Default)]
pub struct CommandRouter {
    commands: CommandMap,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    pub fn add_command(mut self, method_name: impl Into<String>, command: Box<dyn Command>) -> Self {
        self.commands.insert(method_name.into(), command);
        self
    }

    pub fn contains(&self, method_name: &str) -> bool {
        self.commands.contains_key(method_name)
    }
}

#[async_trait]
impl CommandExecutor for CommandRouter {
    async fn execute(&self, method_name: &str, call: &mut Call) -> ExecutionResult {
        let command = match self.commands.get(method_name) {
            Some(command) => command,
            None => {
                error!("Client requested unknown method: \"{method_name}\"");
                return Err(CommandError::unknown_method(method_name).into());
            }
        };

        trace!("Executing \"{method_name}\"");
        command.execute(call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{call::MethodCall, codec::ObjectCodec, value::Value};

    struct Add;

    #[async_trait]
    impl Command for Add {
        async fn execute(&self, call: &mut Call) -> ExecutionResult {
            let arguments = call.arguments();
            let sum = arguments.at::<i32>(0).map_err(anyhow::Error::from)?
                + arguments.at::<i32>(1).map_err(anyhow::Error::from)?;

            Ok(Object::from(sum))
        }
    }

    fn call(method_name: &str, params: impl IntoIterator<Item = Value>) -> Call {
        Call::new(MethodCall::new(method_name, params), &ObjectCodec::default())
    }

    fn router() -> CommandRouter {
        CommandRouter::new()
            .add_command("add", Box::new(Add))
            .add_command(
                "fail",
                Box::new(|_: &mut Call| -> ExecutionResult {
                    Err(CommandError::with_code(4, "too many parameters").into())
                }),
            )
    }

    #[tokio::test]
    async fn routes_by_method_name() {
        let router = router();
        let mut call = call("add", [Value::Int(2), Value::Int(3)]);

        assert_eq!(
            router.execute("add", &mut call).await.unwrap(),
            Object::from(5)
        );
    }

    #[tokio::test]
    async fn command_errors_pass_through() {
        let router = router();
        let mut call = call("fail", []);

        let Err(ExecutionError::Command(error)) = router.execute("fail", &mut call).await else {
            panic!("Expected a command error");
        };
        assert_eq!(error, CommandError::with_code(4, "too many parameters"));
    }

    #[tokio::test]
    async fn unknown_method() {
        let router = router();
        let mut call = call("missing", []);

        let Err(ExecutionError::Command(error)) = router.execute("missing", &mut call).await
        else {
            panic!("Expected a command error");
        };
        assert_eq!(error.code, Some(codes::METHOD_NOT_FOUND));
        assert_eq!(error.to_string(), "Unknown method: missing");
    }

    #[tokio::test]
    async fn argument_errors_are_unexpected() {
        let router = router();
        let mut call = call("add", [Value::Int(2)]);

        let result = router.execute("add", &mut call).await;
        assert!(matches!(result, Err(ExecutionError::Unexpected(_))));
    }

    #[test]
    fn empty_message_displays_empty() {
        assert_eq!(CommandError::default().to_string(), "");
    }

    #[derive(thiserror::Error, Debug)]
    #[error("")]
    struct Quiet;

    #[derive(thiserror::Error, Debug)]
    #[error("disk full, {free} bytes left")]
    struct DiskFull {
        free: u64,
    }

    #[test]
    fn unexpected_errors_keep_their_type_name() {
        let typed = UnexpectedError::new(Quiet);
        assert_eq!(typed.type_name(), std::any::type_name::<Quiet>());

        let erased = UnexpectedError::from(anyhow::Error::new(Quiet));
        assert_eq!(erased.type_name(), "Quiet");

        let erased = UnexpectedError::from(anyhow::Error::new(DiskFull { free: 0 }));
        assert_eq!(erased.type_name(), "DiskFull");
        assert_eq!(erased.to_string(), "disk full, 0 bytes left");
    }

    #[test]
    fn ad_hoc_messages_fall_back_to_anyhow() {
        let error = UnexpectedError::from(anyhow::anyhow!("oops"));

        assert_eq!(error.type_name(), std::any::type_name::<anyhow::Error>());
        assert_eq!(error.to_string(), "oops");
    }
}
