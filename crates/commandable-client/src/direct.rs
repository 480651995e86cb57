//! In-process client that calls a controller without a network hop.

use commandable_core::{ApplicationError, CallCounters};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Holds a controller reference and instruments calls on it the same way
/// the HTTP clients do.
#[derive(Debug)]
pub struct DirectClient<C: ?Sized> {
    controller: Option<Arc<C>>,
    opened: AtomicBool,
    counters: Arc<CallCounters>,
}

impl<C: ?Sized> Default for DirectClient<C> {
    fn default() -> Self {
        Self {
            controller: None,
            opened: AtomicBool::new(false),
            counters: Arc::new(CallCounters::new()),
        }
    }
}

impl<C: ?Sized + Send + Sync> DirectClient<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_controller(controller: Arc<C>) -> Self {
        Self {
            controller: Some(controller),
            ..Self::default()
        }
    }

    pub fn set_controller(&mut self, controller: Arc<C>) {
        self.controller = Some(controller);
    }

    pub fn counters(&self) -> &Arc<CallCounters> {
        &self.counters
    }

    pub fn is_open(&self) -> bool {
        self.opened.load(Ordering::Acquire)
    }

    pub async fn open(&self, correlation_id: Option<&str>) -> Result<(), ApplicationError> {
        if self.controller.is_none() {
            return Err(ApplicationError::connection(
                correlation_id,
                "NO_CONTROLLER",
                "Controller reference is missing",
            ));
        }
        if !self.opened.swap(true, Ordering::AcqRel) {
            debug!(correlation_id, "Opened direct client");
        }
        Ok(())
    }

    pub async fn close(&self, correlation_id: Option<&str>) {
        if self.opened.swap(false, Ordering::AcqRel) {
            debug!(correlation_id, "Closed direct client");
        }
    }

    /// Controller, once the client is open.
    pub fn controller(&self, correlation_id: Option<&str>) -> Result<&Arc<C>, ApplicationError> {
        match &self.controller {
            Some(controller) if self.is_open() => Ok(controller),
            _ => Err(ApplicationError::invalid_state(
                correlation_id,
                "NOT_OPENED",
                "Client is not opened",
            )),
        }
    }

    /// Run `call` under the `<name>.call_*` counters.
    pub async fn instrumented<T, F>(
        &self,
        correlation_id: Option<&str>,
        name: &str,
        call: F,
    ) -> Result<T, ApplicationError>
    where
        F: Future<Output = Result<T, ApplicationError>>,
    {
        let timing = self.counters.instrument_call(correlation_id, name);
        timing.end(call.await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Counter(u32);

    #[tokio::test]
    async fn open_requires_controller() {
        let client: DirectClient<Counter> = DirectClient::new();
        let err = client.open(None).await.unwrap_err();
        assert_eq!(err.code(), "NO_CONTROLLER");

        let client = DirectClient::with_controller(Arc::new(Counter(7)));
        assert_eq!(client.controller(None).unwrap_err().code(), "NOT_OPENED");
        client.open(None).await.unwrap();
        client.open(None).await.unwrap();

        let value = client
            .instrumented(None, "counter.get", async { client.controller(None).map(|c| c.0) })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(client.counters().count("counter.get.call_count"), 1);

        client.close(None).await;
        assert!(!client.is_open());
    }
}
