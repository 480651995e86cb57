//! Commands exposed as `POST {base_route}/{command}` routes.

use crate::handler::{HttpResult, handler};
use crate::{HttpRequest, Reply, RestController, RouteMetadata, ServiceRoutes};
use axum::http::Method;
use commandable_core::{CORRELATION_ID, CallCounters, CommandSet, Commandable, Parameters};
use std::sync::Arc;

/// Controller that maps every command of a set to one POST route.
///
/// The request body is the parameter object. The correlation id comes from
/// the query, the `correlation_id` header or, failing both, a body field of
/// the same name.
pub struct CommandableHttpService {
    base_route: String,
    commands: Arc<CommandSet>,
    counters: Arc<CallCounters>,
}

impl std::fmt::Debug for CommandableHttpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandableHttpService")
            .field("base_route", &self.base_route)
            .field("commands", &self.commands.commands().len())
            .finish()
    }
}

impl CommandableHttpService {
    pub fn new(base_route: impl Into<String>, commandable: &dyn Commandable) -> Self {
        Self {
            base_route: base_route.into(),
            commands: commandable.command_set(),
            counters: Arc::new(CallCounters::new()),
        }
    }

    /// Share counters with the owner of the service.
    pub fn with_counters(mut self, counters: Arc<CallCounters>) -> Self {
        self.counters = counters;
        self
    }

    pub fn counters(&self) -> &Arc<CallCounters> {
        &self.counters
    }
}

impl RestController for CommandableHttpService {
    fn register(&self, routes: &mut ServiceRoutes<'_>) {
        let base_route = routes.base_route().to_string();
        for command in self.commands.commands() {
            let name: Arc<str> = Arc::from(command.name());
            let counter: Arc<str> = if base_route.is_empty() {
                name.clone()
            } else {
                Arc::from(format!("{base_route}.{name}"))
            };

            let mut metadata = RouteMetadata::new()
                .with_tags([base_route.clone()])
                .sends_data(200, "Successful response", None);
            if let Some(schema) = command.schema() {
                metadata = metadata.receives_body(schema.clone());
            }

            let commands = self.commands.clone();
            let counters = self.counters.clone();
            let route_name = name.clone();
            routes.register_route_with_metadata(
                Method::POST,
                &format!("/{name}"),
                None,
                handler(move |request| {
                    execute(
                        request,
                        commands.clone(),
                        counters.clone(),
                        route_name.clone(),
                        counter.clone(),
                    )
                }),
                metadata,
            );
        }
    }

    fn default_base_route(&self) -> Option<&str> {
        Some(&self.base_route)
    }
}

async fn execute(
    request: HttpRequest,
    commands: Arc<CommandSet>,
    counters: Arc<CallCounters>,
    name: Arc<str>,
    counter: Arc<str>,
) -> HttpResult {
    let parameters = Parameters::from_json(request.body())?;
    let correlation_id = request
        .correlation_id()
        .map(str::to_string)
        .or_else(|| parameters.get_as_string(CORRELATION_ID));

    let timing = counters.instrument_exec(correlation_id.as_deref(), &counter);
    let result = commands
        .execute(&name, correlation_id.as_deref(), parameters)
        .await;
    let value = timing.end(result)?;
    Ok(Reply::result(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RouteRegistrar;
    use crate::routes::{RouteMatch, RouteTable};
    use axum::body::Bytes;
    use axum::http::{HeaderMap, StatusCode};
    use commandable_core::{ApplicationError, Command, ObjectSchema, TypeCode};
    use serde_json::{Value, json};

    struct Echo;

    impl Commandable for Echo {
        fn command_set(&self) -> Arc<CommandSet> {
            let set = CommandSet::new()
                .with_command(Command::new(
                    "echo",
                    Some(ObjectSchema::new().with_required_property("value", TypeCode::String)),
                    |cid, params| async move {
                        Ok(json!({ "value": params.get_as_string("value"), "cid": cid }))
                    },
                ))
                .and_then(|set| {
                    set.with_command(Command::new("nothing", None, |_cid, _params| async {
                        Ok::<_, ApplicationError>(Value::Null)
                    }))
                })
                .unwrap();
            Arc::new(set)
        }
    }

    fn table(service: &CommandableHttpService) -> RouteTable {
        let mut routes = RouteRegistrar::new();
        service.register(&mut ServiceRoutes::new(&mut routes, "dummy"));
        RouteTable::build([&routes])
    }

    async fn post(table: &RouteTable, uri: &str, body: &str) -> HttpResult {
        let path = uri.split('?').next().unwrap();
        let RouteMatch::Found(route, params) = table.find(&Method::POST, path) else {
            panic!("no route for {uri}");
        };
        let body = Bytes::from(body.to_string());
        let request = HttpRequest::new(Method::POST, uri.parse().unwrap(), HeaderMap::new(), body)
            .with_route(route.route().clone(), params);
        route.invoke(request, None).await
    }

    #[tokio::test]
    async fn posts_execute_commands() {
        let service = CommandableHttpService::new("dummy", &Echo);
        let table = table(&service);

        let reply = post(&table, "/dummy/echo?correlation_id=q1", r#"{"value":"v"}"#)
            .await
            .unwrap();
        assert_eq!(reply.value(), Some(&json!({"value": "v", "cid": "q1"})));

        let body = r#"{"value":"v","correlation_id":"b1"}"#;
        let reply = post(&table, "/dummy/echo", body).await.unwrap();
        assert_eq!(reply.value().unwrap()["cid"], "b1");

        let reply = post(&table, "/dummy/nothing", "").await.unwrap();
        assert_eq!(reply.status(), StatusCode::NO_CONTENT);

        assert_eq!(service.counters().count("dummy.echo.exec_count"), 2);
    }

    #[tokio::test]
    async fn invalid_input_is_bad_request() {
        let service = CommandableHttpService::new("dummy", &Echo);
        let table = table(&service);

        let err = post(&table, "/dummy/echo", r#"{"value":1}"#).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_DATA");
        assert_eq!(err.status(), 400);

        let err = post(&table, "/dummy/echo", "not json").await.unwrap_err();
        assert_eq!(err.code(), "INVALID_JSON");

        assert_eq!(service.counters().count("dummy.echo.exec_errors"), 1);
        assert_eq!(table.route_docs()[0].metadata.tags, vec!["dummy".to_string()]);
    }
}
