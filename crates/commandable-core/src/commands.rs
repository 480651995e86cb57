//! Named commands and the registry that dispatches them.
//!
//! A [`CommandSet`] is built once and never mutated afterwards, so lookups
//! need no locking. [`CommandSet::execute`] never panics past its boundary:
//! unknown names, schema violations, handler errors and handler panics all
//! come back as an [`ApplicationError`].

use crate::{ApplicationError, ObjectSchema, Parameters};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::debug;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Result of a command. `Value::Null` means "no result".
pub type CommandResult = Result<Value, ApplicationError>;

type CommandFn =
    dyn Fn(Option<String>, Parameters) -> BoxFuture<'static, CommandResult> + Send + Sync;

/// A named operation with an optional parameter schema.
#[derive(Clone)]
pub struct Command {
    name: String,
    schema: Option<ObjectSchema>,
    handler: Arc<CommandFn>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl Command {
    pub fn new<F, Fut>(name: impl Into<String>, schema: Option<ObjectSchema>, handler: F) -> Self
    where
        F: Fn(Option<String>, Parameters) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            schema,
            handler: Arc::new(move |cid, params| handler(cid, params).boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&ObjectSchema> {
        self.schema.as_ref()
    }

    /// Validate `parameters` and run the handler.
    ///
    /// The handler is not called when validation fails.
    pub async fn execute(
        &self,
        correlation_id: Option<&str>,
        parameters: Parameters,
    ) -> CommandResult {
        if let Some(schema) = &self.schema {
            schema.validate_and_throw(correlation_id, &parameters.to_value())?;
        }

        let call = (self.handler)(correlation_id.map(str::to_string), parameters);
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(ApplicationError::invocation(
                correlation_id,
                "EXEC_FAILED",
                format!("Execution {} failed: {}", self.name, panic_message(&*panic)),
            )
            .with_details("command", self.name.clone())),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Registry of commands keyed by unique name.
#[derive(Debug, Clone, Default)]
pub struct CommandSet {
    commands: Vec<Command>,
    index: HashMap<String, usize>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. Duplicate names are rejected.
    pub fn add_command(&mut self, command: Command) -> Result<(), ApplicationError> {
        if self.index.contains_key(command.name()) {
            return Err(duplicate(command.name()));
        }
        self.index.insert(command.name().to_string(), self.commands.len());
        self.commands.push(command);
        Ok(())
    }

    /// Builder form of [`add_command`](Self::add_command).
    pub fn with_command(mut self, command: Command) -> Result<Self, ApplicationError> {
        self.add_command(command)?;
        Ok(self)
    }

    /// Merge every command of another set.
    ///
    /// Nothing is merged when any name is already registered.
    pub fn add_command_set(&mut self, other: &CommandSet) -> Result<(), ApplicationError> {
        let mut incoming = HashSet::new();
        for command in &other.commands {
            let name = command.name();
            if self.index.contains_key(name) || !incoming.insert(name) {
                return Err(duplicate(name));
            }
        }
        for command in &other.commands {
            self.index.insert(command.name().to_string(), self.commands.len());
            self.commands.push(command.clone());
        }
        Ok(())
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn find_command(&self, name: &str) -> Option<&Command> {
        self.index.get(name).map(|&i| &self.commands[i])
    }

    /// Run the named command.
    pub async fn execute(
        &self,
        name: &str,
        correlation_id: Option<&str>,
        parameters: Parameters,
    ) -> CommandResult {
        let Some(command) = self.find_command(name) else {
            return Err(ApplicationError::not_found(
                correlation_id,
                "CMD_NOT_FOUND",
                format!("Requested command does not exist: {name}"),
            )
            .with_details("command", name));
        };

        debug!(target: DISPATCH_TARGET, command = name, correlation_id, "executing command");
        command.execute(correlation_id, parameters).await
    }
}

fn duplicate(name: &str) -> ApplicationError {
    ApplicationError::config(
        None,
        "DUPLICATE_COMMAND",
        format!("Command {name} is already registered"),
    )
    .with_details("command", name.to_string())
}

/// Something that exposes its operations as a command set.
pub trait Commandable: Send + Sync {
    fn command_set(&self) -> Arc<CommandSet>;
}
