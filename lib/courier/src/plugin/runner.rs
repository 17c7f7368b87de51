//! Composition of heterogeneous plugins behind the capability traits.

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{
    BuiltRequest, Error, RequestSpec, Response, Result, RetryDecision, ShortCircuitDecision,
};
use tokio::task::JoinSet;
use tracing::warn;

use crate::context::Snapshot;
use crate::plugin::{
    ObserverPlugin, PluginEntry, RetryPlugin, ShortCircuitPlugin, TransformPlugin,
};

/// Runs an ordered, heterogeneous plugin list as one composite plugin.
///
/// Construction partitions the entries into four per-capability lists,
/// preserving relative registration order within each; a single plugin
/// instance may appear in more than one list. The runner itself
/// implements all four capability traits, so the engine never
/// distinguishes one plugin from many:
///
/// - transform hooks fold sequentially, each plugin receiving the
///   previous plugin's output
/// - observer hooks fan out concurrently and join before returning,
///   with no ordering guarantee between plugins
/// - `should_retry` and `evaluate` poll in order and stop at the first
///   non-default decision
/// - `will_retry` is broadcast to every retry plugin in order
#[derive(Clone, Default)]
pub struct PluginRunner {
    transforms: Vec<Arc<dyn TransformPlugin>>,
    observers: Vec<Arc<dyn ObserverPlugin>>,
    retries: Vec<Arc<dyn RetryPlugin>>,
    short_circuits: Vec<Arc<dyn ShortCircuitPlugin>>,
}

impl PluginRunner {
    /// Partitions the entries into per-capability lists.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = PluginEntry>) -> Self {
        let mut runner = Self::default();
        for entry in entries {
            if let Some(plugin) = entry.transform {
                runner.transforms.push(plugin);
            }
            if let Some(plugin) = entry.observer {
                runner.observers.push(plugin);
            }
            if let Some(plugin) = entry.retry {
                runner.retries.push(plugin);
            }
            if let Some(plugin) = entry.short_circuit {
                runner.short_circuits.push(plugin);
            }
        }
        runner
    }

    /// Returns `true` if any retry plugin is registered.
    #[must_use]
    pub fn has_retry_plugins(&self) -> bool {
        !self.retries.is_empty()
    }
}

#[async_trait]
impl TransformPlugin for PluginRunner {
    async fn prepare_request(&self, spec: RequestSpec) -> Result<RequestSpec> {
        let mut prepared = spec;
        for plugin in &self.transforms {
            prepared = plugin.prepare_request(prepared).await?;
        }
        Ok(prepared)
    }

    async fn adapt_request(&self, request: BuiltRequest) -> Result<BuiltRequest> {
        let mut adapted = request;
        for plugin in &self.transforms {
            adapted = plugin.adapt_request(adapted).await?;
        }
        Ok(adapted)
    }

    async fn process_response(&self, response: Response) -> Result<Response> {
        let mut processed = response;
        for plugin in &self.transforms {
            processed = plugin.process_response(processed).await?;
        }
        Ok(processed)
    }
}

#[async_trait]
impl ObserverPlugin for PluginRunner {
    async fn will_send(&self, snapshot: &Snapshot) {
        join_observers(&self.observers, snapshot, |plugin, snapshot| async move {
            plugin.will_send(&snapshot).await;
        })
        .await;
    }

    async fn did_receive(&self, snapshot: &Snapshot) {
        join_observers(&self.observers, snapshot, |plugin, snapshot| async move {
            plugin.did_receive(&snapshot).await;
        })
        .await;
    }

    async fn did_fail(&self, snapshot: &Snapshot) {
        join_observers(&self.observers, snapshot, |plugin, snapshot| async move {
            plugin.did_fail(&snapshot).await;
        })
        .await;
    }
}

#[async_trait]
impl RetryPlugin for PluginRunner {
    async fn should_retry(&self, snapshot: &Snapshot, error: &Error) -> RetryDecision {
        for plugin in &self.retries {
            let decision = plugin.should_retry(snapshot, error).await;
            if decision.is_retry() {
                return decision;
            }
        }
        RetryDecision::DoNotRetry
    }

    async fn will_retry(&self, snapshot: &Snapshot, error: &Error, decision: &RetryDecision) {
        for plugin in &self.retries {
            plugin.will_retry(snapshot, error, decision).await;
        }
    }
}

#[async_trait]
impl ShortCircuitPlugin for PluginRunner {
    async fn evaluate(&self, snapshot: &Snapshot) -> ShortCircuitDecision {
        for plugin in &self.short_circuits {
            let decision = plugin.evaluate(snapshot).await;
            if !decision.is_miss() {
                return decision;
            }
        }
        ShortCircuitDecision::Miss
    }
}

/// Concurrent fan-out with a join barrier: one task per observer, all
/// awaited before the call proceeds.
async fn join_observers<F, Fut>(observers: &[Arc<dyn ObserverPlugin>], snapshot: &Snapshot, hook: F)
where
    F: Fn(Arc<dyn ObserverPlugin>, Snapshot) -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for plugin in observers {
        tasks.spawn(hook(Arc::clone(plugin), snapshot.clone()));
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            warn!(error = %err, "observer plugin task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    use assert2::let_assert;
    use bytes::Bytes;
    use courier_core::{Method, RequestSpec};

    use super::*;
    use crate::context::RequestContext;

    #[derive(Clone, Default)]
    struct EventLog(Arc<Mutex<Vec<String>>>);

    impl EventLog {
        fn add(&self, event: impl Into<String>) {
            self.0
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(event.into());
        }

        fn all(&self) -> Vec<String> {
            self.0
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }

        fn clear(&self) {
            self.0
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clear();
        }
    }

    struct TransformProbe {
        name: &'static str,
        log: EventLog,
    }

    #[async_trait]
    impl TransformPlugin for TransformProbe {
        async fn prepare_request(&self, spec: RequestSpec) -> Result<RequestSpec> {
            self.log.add(format!("prepare:{}", self.name));
            Ok(spec)
        }

        async fn adapt_request(&self, request: BuiltRequest) -> Result<BuiltRequest> {
            self.log.add(format!("adapt:{}", self.name));
            Ok(request)
        }

        async fn process_response(&self, response: Response) -> Result<Response> {
            self.log.add(format!("process:{}", self.name));
            Ok(response)
        }
    }

    struct ObserverProbe {
        name: &'static str,
        log: EventLog,
    }

    #[async_trait]
    impl ObserverPlugin for ObserverProbe {
        async fn will_send(&self, _snapshot: &Snapshot) {
            self.log.add(format!("willSend:{}", self.name));
        }

        async fn did_receive(&self, _snapshot: &Snapshot) {
            self.log.add(format!("didReceive:{}", self.name));
        }

        async fn did_fail(&self, _snapshot: &Snapshot) {
            self.log.add(format!("didFail:{}", self.name));
        }
    }

    struct RetryProbe {
        name: &'static str,
        log: EventLog,
        decision: RetryDecision,
    }

    #[async_trait]
    impl RetryPlugin for RetryProbe {
        async fn should_retry(&self, _snapshot: &Snapshot, _error: &Error) -> RetryDecision {
            self.log.add(format!("shouldRetry:{}", self.name));
            self.decision
        }

        async fn will_retry(
            &self,
            _snapshot: &Snapshot,
            _error: &Error,
            _decision: &RetryDecision,
        ) {
            self.log.add(format!("willRetry:{}", self.name));
        }
    }

    struct ShortCircuitProbe {
        name: &'static str,
        log: EventLog,
        decision: ShortCircuitDecision,
    }

    #[async_trait]
    impl ShortCircuitPlugin for ShortCircuitProbe {
        async fn evaluate(&self, _snapshot: &Snapshot) -> ShortCircuitDecision {
            self.log.add(format!("evaluate:{}", self.name));
            self.decision.clone()
        }
    }

    fn snapshot() -> Snapshot {
        RequestContext::new(RequestSpec::get("/test")).snapshot()
    }

    fn response() -> Response {
        Response::new(200, HashMap::new(), Bytes::new())
    }

    fn built_request() -> BuiltRequest {
        let url = url::Url::parse("https://example.com/test").expect("valid URL");
        BuiltRequest::new(Method::GET, url, HashMap::new(), Duration::from_secs(30), None)
    }

    #[tokio::test]
    async fn transforms_run_in_registration_order() {
        let log = EventLog::default();
        let runner = PluginRunner::new([
            PluginEntry::transform(Arc::new(TransformProbe {
                name: "one",
                log: log.clone(),
            })),
            PluginEntry::transform(Arc::new(TransformProbe {
                name: "two",
                log: log.clone(),
            })),
        ]);

        let _ = runner
            .prepare_request(RequestSpec::get("/test"))
            .await
            .expect("prepare");
        let _ = runner.adapt_request(built_request()).await.expect("adapt");
        let _ = runner.process_response(response()).await.expect("process");

        assert_eq!(
            log.all(),
            vec![
                "prepare:one",
                "prepare:two",
                "adapt:one",
                "adapt:two",
                "process:one",
                "process:two"
            ]
        );
    }

    #[tokio::test]
    async fn observers_all_notified_per_event() {
        let log = EventLog::default();
        let runner = PluginRunner::new([
            PluginEntry::observer(Arc::new(ObserverProbe {
                name: "one",
                log: log.clone(),
            })),
            PluginEntry::observer(Arc::new(ObserverProbe {
                name: "two",
                log: log.clone(),
            })),
        ]);

        let snapshot = snapshot();

        // No ordering guarantee between observers: compare as sets.
        runner.will_send(&snapshot).await;
        let events: HashSet<String> = log.all().into_iter().collect();
        assert_eq!(
            events,
            HashSet::from(["willSend:one".to_string(), "willSend:two".to_string()])
        );

        log.clear();
        runner.did_receive(&snapshot).await;
        let events: HashSet<String> = log.all().into_iter().collect();
        assert_eq!(
            events,
            HashSet::from(["didReceive:one".to_string(), "didReceive:two".to_string()])
        );

        log.clear();
        runner.did_fail(&snapshot).await;
        let events: HashSet<String> = log.all().into_iter().collect();
        assert_eq!(
            events,
            HashSet::from(["didFail:one".to_string(), "didFail:two".to_string()])
        );
    }

    #[tokio::test]
    async fn retry_polls_past_default_decisions() {
        let log = EventLog::default();
        let runner = PluginRunner::new([
            PluginEntry::retry(Arc::new(RetryProbe {
                name: "one",
                log: log.clone(),
                decision: RetryDecision::DoNotRetry,
            })),
            PluginEntry::retry(Arc::new(RetryProbe {
                name: "two",
                log: log.clone(),
                decision: RetryDecision::Retry,
            })),
        ]);

        let decision = runner.should_retry(&snapshot(), &Error::Timeout).await;
        assert_eq!(decision, RetryDecision::Retry);
        assert_eq!(log.all(), vec!["shouldRetry:one", "shouldRetry:two"]);
    }

    #[tokio::test]
    async fn retry_stops_at_first_non_default_decision() {
        let log = EventLog::default();
        let runner = PluginRunner::new([
            PluginEntry::retry(Arc::new(RetryProbe {
                name: "one",
                log: log.clone(),
                decision: RetryDecision::RetryAfter(Duration::from_secs(1)),
            })),
            PluginEntry::retry(Arc::new(RetryProbe {
                name: "two",
                log: log.clone(),
                decision: RetryDecision::Retry,
            })),
        ]);

        let decision = runner.should_retry(&snapshot(), &Error::Timeout).await;
        assert_eq!(decision, RetryDecision::RetryAfter(Duration::from_secs(1)));
        assert_eq!(log.all(), vec!["shouldRetry:one"]);
    }

    #[tokio::test]
    async fn retry_defaults_when_no_plugin_votes() {
        let log = EventLog::default();
        let runner = PluginRunner::new([PluginEntry::retry(Arc::new(RetryProbe {
            name: "one",
            log: log.clone(),
            decision: RetryDecision::DoNotRetry,
        }))]);

        let decision = runner.should_retry(&snapshot(), &Error::Timeout).await;
        assert_eq!(decision, RetryDecision::DoNotRetry);
    }

    #[tokio::test]
    async fn will_retry_broadcasts_to_every_plugin_in_order() {
        let log = EventLog::default();
        let runner = PluginRunner::new([
            PluginEntry::retry(Arc::new(RetryProbe {
                name: "one",
                log: log.clone(),
                decision: RetryDecision::DoNotRetry,
            })),
            PluginEntry::retry(Arc::new(RetryProbe {
                name: "two",
                log: log.clone(),
                decision: RetryDecision::DoNotRetry,
            })),
        ]);

        runner
            .will_retry(&snapshot(), &Error::Timeout, &RetryDecision::Retry)
            .await;
        assert_eq!(log.all(), vec!["willRetry:one", "willRetry:two"]);
    }

    #[tokio::test]
    async fn short_circuit_stops_at_first_hit() {
        let log = EventLog::default();
        let runner = PluginRunner::new([
            PluginEntry::short_circuit(Arc::new(ShortCircuitProbe {
                name: "one",
                log: log.clone(),
                decision: ShortCircuitDecision::Miss,
            })),
            PluginEntry::short_circuit(Arc::new(ShortCircuitProbe {
                name: "two",
                log: log.clone(),
                decision: ShortCircuitDecision::hit_result(response()),
            })),
            PluginEntry::short_circuit(Arc::new(ShortCircuitProbe {
                name: "three",
                log: log.clone(),
                decision: ShortCircuitDecision::hit_result(response()),
            })),
        ]);

        let decision = runner.evaluate(&snapshot()).await;
        let_assert!(ShortCircuitDecision::HitResult { response, .. } = decision);
        assert_eq!(response.status(), 200);
        assert_eq!(log.all(), vec!["evaluate:one", "evaluate:two"]);
    }

    #[tokio::test]
    async fn short_circuit_misses_when_all_miss() {
        let log = EventLog::default();
        let runner = PluginRunner::new([PluginEntry::short_circuit(Arc::new(ShortCircuitProbe {
            name: "one",
            log: log.clone(),
            decision: ShortCircuitDecision::Miss,
        }))]);

        assert!(runner.evaluate(&snapshot()).await.is_miss());
    }

    #[tokio::test]
    async fn one_instance_in_several_capability_lists() {
        struct Both {
            log: EventLog,
        }

        #[async_trait]
        impl TransformPlugin for Both {
            async fn process_response(&self, response: Response) -> Result<Response> {
                self.log.add("process:both");
                Ok(response)
            }
        }

        #[async_trait]
        impl ShortCircuitPlugin for Both {
            async fn evaluate(&self, _snapshot: &Snapshot) -> ShortCircuitDecision {
                self.log.add("evaluate:both");
                ShortCircuitDecision::Miss
            }
        }

        let log = EventLog::default();
        let both = Arc::new(Both { log: log.clone() });
        let runner = PluginRunner::new([
            PluginEntry::short_circuit(Arc::clone(&both) as Arc<dyn ShortCircuitPlugin>)
                .and_transform(both),
        ]);

        assert!(runner.evaluate(&snapshot()).await.is_miss());
        let _ = runner.process_response(response()).await.expect("process");
        assert_eq!(log.all(), vec!["evaluate:both", "process:both"]);
    }

    #[tokio::test]
    async fn panicking_observer_does_not_abort_the_call() {
        struct Panicking;

        #[async_trait]
        impl ObserverPlugin for Panicking {
            async fn will_send(&self, _snapshot: &Snapshot) {
                panic!("observer failure");
            }
        }

        let log = EventLog::default();
        let runner = PluginRunner::new([
            PluginEntry::observer(Arc::new(Panicking)),
            PluginEntry::observer(Arc::new(ObserverProbe {
                name: "ok",
                log: log.clone(),
            })),
        ]);

        runner.will_send(&snapshot()).await;
        assert_eq!(log.all(), vec!["willSend:ok"]);
    }

    #[test]
    fn partition_preserves_capability_and_order() {
        let log = EventLog::default();
        let runner = PluginRunner::new([
            PluginEntry::transform(Arc::new(TransformProbe {
                name: "t",
                log: log.clone(),
            })),
            PluginEntry::retry(Arc::new(RetryProbe {
                name: "r",
                log: log.clone(),
                decision: RetryDecision::Retry,
            })),
        ]);

        assert_eq!(runner.transforms.len(), 1);
        assert_eq!(runner.observers.len(), 0);
        assert_eq!(runner.retries.len(), 1);
        assert_eq!(runner.short_circuits.len(), 0);
        assert!(runner.has_retry_plugins());
    }
}
