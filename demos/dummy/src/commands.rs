//! The dummy controller as a command set.

use crate::{Dummy, DummyController, dummy_schema};
use commandable_core::{
    ApplicationError, Command, CommandResult, CommandSet, Commandable, FilterParams, ObjectSchema,
    PagingParams, Parameters, TypeCode,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Commands over a shared [`DummyController`].
#[derive(Debug, Clone)]
pub struct DummyCommands {
    commands: Arc<CommandSet>,
}

impl DummyCommands {
    pub fn new(controller: Arc<DummyController>) -> Result<Self, ApplicationError> {
        let c = controller;
        let set = CommandSet::new()
            .with_command(command(
                "get_dummies",
                Some(
                    ObjectSchema::new()
                        .with_optional_property("filter", TypeCode::Map)
                        .with_optional_property("paging", TypeCode::Map),
                ),
                &c,
                get_dummies,
            ))?
            .with_command(command(
                "get_dummy_by_id",
                Some(ObjectSchema::new().with_required_property("dummy_id", TypeCode::String)),
                &c,
                get_dummy_by_id,
            ))?
            .with_command(command(
                "create_dummy",
                Some(ObjectSchema::new().with_required_property("dummy", dummy_schema())),
                &c,
                create_dummy,
            ))?
            .with_command(command(
                "update_dummy",
                Some(ObjectSchema::new().with_required_property("dummy", dummy_schema())),
                &c,
                update_dummy,
            ))?
            .with_command(command(
                "delete_dummy",
                Some(ObjectSchema::new().with_required_property("dummy_id", TypeCode::String)),
                &c,
                delete_dummy,
            ))?
            .with_command(Command::new(
                "create_dummy_without_validation",
                None,
                |_cid, _params| async { Ok::<_, ApplicationError>(Value::Null) },
            ))?
            .with_command(Command::new(
                "raise_commandset_error",
                Some(ObjectSchema::new().with_required_property("dummy", dummy_schema())),
                |cid, _params| async move { raise_commandset_error(cid) },
            ))?
            .with_command(command("raise_exception", None, &c, raise_exception))?
            .with_command(command("ping_dummy", None, &c, ping_dummy))?
            .with_command(command("check_correlation_id", None, &c, check_correlation_id))?;
        Ok(Self {
            commands: Arc::new(set),
        })
    }
}

impl Commandable for DummyCommands {
    fn command_set(&self) -> Arc<CommandSet> {
        self.commands.clone()
    }
}

/// Bind an async handler to the controller.
fn command<F, Fut>(
    name: &str,
    schema: Option<ObjectSchema>,
    controller: &Arc<DummyController>,
    handler: F,
) -> Command
where
    F: Fn(Arc<DummyController>, Option<String>, Parameters) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    let controller = controller.clone();
    Command::new(name, schema, move |cid, params| handler(controller.clone(), cid, params))
}

fn to_result<T: Serialize>(correlation_id: Option<&str>, value: &T) -> CommandResult {
    serde_json::to_value(value).map_err(|e| {
        ApplicationError::internal(
            correlation_id,
            "SERIALIZATION_FAILED",
            "Failed to serialize result",
        )
        .with_cause(e)
    })
}

fn extract_dummy(
    correlation_id: Option<&str>,
    params: &Parameters,
) -> Result<Dummy, ApplicationError> {
    params
        .get_as::<Dummy>("dummy")
        .map_err(|e| e.with_correlation_id(correlation_id))?
        .ok_or_else(|| {
            ApplicationError::bad_request(correlation_id, "NO_DUMMY", "Dummy is missing")
        })
}

async fn get_dummies(
    c: Arc<DummyController>,
    cid: Option<String>,
    params: Parameters,
) -> CommandResult {
    let cid = cid.as_deref();
    let filter = params.get("filter").map(FilterParams::from_value).unwrap_or_default();
    let paging = params.get("paging").map(PagingParams::from_value).unwrap_or_default();
    let page = c.get_page_by_filter(cid, &filter, &paging).await?;
    to_result(cid, &page)
}

async fn get_dummy_by_id(
    c: Arc<DummyController>,
    cid: Option<String>,
    params: Parameters,
) -> CommandResult {
    let cid = cid.as_deref();
    let id = params.get_as_string_or("dummy_id", "");
    let dummy = c.get_one_by_id(cid, &id).await?;
    to_result(cid, &dummy)
}

async fn create_dummy(
    c: Arc<DummyController>,
    cid: Option<String>,
    params: Parameters,
) -> CommandResult {
    let cid = cid.as_deref();
    let dummy = c.create(cid, extract_dummy(cid, &params)?).await?;
    to_result(cid, &dummy)
}

async fn update_dummy(
    c: Arc<DummyController>,
    cid: Option<String>,
    params: Parameters,
) -> CommandResult {
    let cid = cid.as_deref();
    let dummy = c.update(cid, extract_dummy(cid, &params)?).await?;
    to_result(cid, &dummy)
}

async fn delete_dummy(
    c: Arc<DummyController>,
    cid: Option<String>,
    params: Parameters,
) -> CommandResult {
    let cid = cid.as_deref();
    let id = params.get_as_string_or("dummy_id", "");
    let dummy = c.delete_by_id(cid, &id).await?;
    to_result(cid, &dummy)
}

fn raise_commandset_error(cid: Option<String>) -> CommandResult {
    Err(ApplicationError::invocation(
        cid.as_deref(),
        "COMMANDSET_ERROR",
        "Dummy error in commandset!",
    ))
}

async fn raise_exception(
    c: Arc<DummyController>,
    cid: Option<String>,
    _params: Parameters,
) -> CommandResult {
    c.raise_exception(cid.as_deref()).await?;
    Ok(Value::Null)
}

async fn ping_dummy(
    c: Arc<DummyController>,
    cid: Option<String>,
    _params: Parameters,
) -> CommandResult {
    let pong = c.ping(cid.as_deref()).await?;
    Ok(Value::Bool(pong))
}

async fn check_correlation_id(
    c: Arc<DummyController>,
    cid: Option<String>,
    _params: Parameters,
) -> CommandResult {
    let echoed = c.check_correlation_id(cid.as_deref()).await?;
    Ok(Value::String(echoed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn commands() -> Arc<CommandSet> {
        DummyCommands::new(Arc::new(DummyController::new())).unwrap().command_set()
    }

    #[tokio::test]
    async fn create_validates_input() {
        let set = commands();
        let params =
            Parameters::from_value(json!({"dummy": {"key": "Key 1", "content": "Content 1"}}))
                .unwrap();
        let created = set.execute("create_dummy", Some("1"), params).await.unwrap();
        assert_eq!(created["key"], "Key 1");
        assert!(created["id"].as_str().is_some_and(|id| !id.is_empty()));

        let params = Parameters::from_value(json!({"dummy": {"content": "no key"}})).unwrap();
        let err = set.execute("create_dummy", None, params).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_DATA");

        let params = Parameters::from_value(json!({"anything": 1})).unwrap();
        let none = set.execute("create_dummy_without_validation", None, params).await.unwrap();
        assert_eq!(none, Value::Null);
    }

    #[tokio::test]
    async fn errors_and_echoes() {
        let set = commands();
        let err = set.execute("raise_exception", Some("c1"), Parameters::new()).await.unwrap_err();
        assert_eq!((err.code(), err.status()), ("TEST_ERROR", 404));

        let cid = set.execute("check_correlation_id", Some("c2"), Parameters::new()).await.unwrap();
        assert_eq!(cid, json!("c2"));
        assert_eq!(set.commands().len(), 10);
    }
}
