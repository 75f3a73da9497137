// crates/capgate-registry/tests/common/mod.rs
// ============================================================================
// Module: Registry Test Fixtures
// Description: Shared providers, introspectors, and sinks for registry tests.
// Purpose: Build registries and runtimes without repeating boilerplate.
// ============================================================================

#![allow(dead_code, reason = "Each test binary uses a different subset of fixtures.")]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use capgate_config::CapgateConfig;
use capgate_config::CredentialKind;
use capgate_core::CapabilityProvider;
use capgate_core::CapabilityTables;
use capgate_core::HandlerError;
use capgate_core::ObjectSchema;
use capgate_core::Operation;
use capgate_core::OperationHandler;
use capgate_core::ParamField;
use capgate_core::ParamSchema;
use capgate_core::SchemaBranch;
use capgate_core::StaticProvider;
use capgate_core::TargetInfo;
use capgate_core::TargetState;
use capgate_core::Tier;
use capgate_registry::CapabilityRegistry;
use capgate_registry::CapabilityRuntime;
use capgate_registry::CatalogAuditSink;
use capgate_registry::CatalogMetrics;
use capgate_registry::CredentialInfo;
use capgate_registry::CredentialIntrospector;
use capgate_registry::CredentialSnapshot;
use capgate_registry::ExclusionAuditEvent;
use capgate_registry::ExecuteAuditEvent;
use capgate_registry::ExecutionMetricEvent;
use capgate_registry::IntrospectionError;
use capgate_registry::PolicyInputs;
use capgate_registry::RebuildAuditEvent;
use capgate_registry::RebuildMetricEvent;
use capgate_registry::RefreshAuditEvent;
use capgate_registry::RuntimeSettings;
use capgate_registry::SessionContext;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Handlers and Providers
// ============================================================================

/// Handler returning its arguments.
pub struct EchoHandler;

#[async_trait]
impl OperationHandler for EchoHandler {
    async fn invoke(&self, args: Value) -> Result<Value, HandlerError> {
        Ok(args)
    }
}

/// Handler that sleeps before echoing.
pub struct SlowHandler(pub Duration);

#[async_trait]
impl OperationHandler for SlowHandler {
    async fn invoke(&self, args: Value) -> Result<Value, HandlerError> {
        tokio::time::sleep(self.0).await;
        Ok(args)
    }
}

/// Builds a read-only flat operation.
pub fn browse(name: &str) -> Operation {
    Operation::new(
        name,
        format!("Browse {name}."),
        ParamSchema::Flat(ObjectSchema::new(vec![ParamField::required(
            "project_id",
            json!({ "type": "string" }),
        )])),
        Arc::new(EchoHandler),
    )
}

/// Builds a mutating operation with create/update/delete actions.
pub fn manage(name: &str) -> Operation {
    let branch = |action: &str| {
        SchemaBranch::new(
            action,
            ObjectSchema::new(vec![
                ParamField::required("project_id", json!({ "type": "string" })),
                ParamField::optional("title", json!({ "type": "string" })),
            ]),
        )
    };
    Operation::new(
        name,
        format!("Manage {name}."),
        ParamSchema::actions(vec![branch("create"), branch("update"), branch("delete")]),
        Arc::new(EchoHandler),
    )
    .mutating()
}

/// Returns a provider shaped like a small GitLab catalog.
pub fn gitlab_provider() -> Arc<dyn CapabilityProvider> {
    Arc::new(StaticProvider::new(
        "gitlab",
        vec![
            browse("browse_projects"),
            browse("browse_issues"),
            manage("manage_issue"),
            browse("browse_epics"),
            manage("manage_epic"),
            browse("browse_vulnerabilities"),
        ],
    ))
}

/// Returns a connected target state.
pub fn connected(version: &str, tier: Tier) -> TargetState {
    TargetState::Connected(TargetInfo::from_raw(version, tier))
}

/// Builds a registry over the GitLab provider with built-in tables.
pub fn gitlab_registry(inputs: PolicyInputs) -> CapabilityRegistry {
    CapabilityRegistry::initialize(&[gitlab_provider()], CapabilityTables::builtin(), inputs)
        .expect("registry")
}

/// Returns visible operation names in catalog order.
pub fn visible_names(registry: &CapabilityRegistry) -> Vec<String> {
    registry.list().into_iter().map(|descriptor| descriptor.name.to_string()).collect()
}

// ============================================================================
// SECTION: Introspectors
// ============================================================================

/// Introspector replaying queued results; repeats the last one when drained.
pub struct ScriptedIntrospector {
    /// Results returned in order.
    script: Mutex<VecDeque<Result<CredentialSnapshot, IntrospectionError>>>,
    /// Result repeated after the script drains.
    last: Mutex<Option<Result<CredentialSnapshot, IntrospectionError>>>,
    /// Number of calls.
    calls: AtomicUsize,
    /// Delay before answering.
    delay: Duration,
}

impl ScriptedIntrospector {
    /// Builds an introspector from a script.
    pub fn new(script: Vec<Result<CredentialSnapshot, IntrospectionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Adds a delay before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the number of calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialIntrospector for ScriptedIntrospector {
    async fn introspect(&self) -> Result<CredentialSnapshot, IntrospectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(next) = next {
            *last = Some(next);
        }
        last.clone().unwrap_or_else(|| Err(IntrospectionError::Unavailable("empty".to_string())))
    }
}

/// Successful introspection with the given scopes on a 17.2 top-tier target.
pub fn granted(scopes: &[&str]) -> Result<CredentialSnapshot, IntrospectionError> {
    granted_on(scopes, Some(TargetInfo::from_raw("17.2", Tier::Top)))
}

/// Successful introspection with the given scopes and reported target.
pub fn granted_on(
    scopes: &[&str],
    target: Option<TargetInfo>,
) -> Result<CredentialSnapshot, IntrospectionError> {
    Ok(CredentialSnapshot {
        credential: CredentialInfo::with_scopes(
            CredentialKind::PersonalAccessToken,
            scopes.iter().copied(),
        ),
        identity: None,
        target,
    })
}

/// Builds a runtime around a registry and introspector.
pub fn runtime_with(
    config: CapgateConfig,
    registry: CapabilityRegistry,
    introspector: Arc<dyn CredentialIntrospector>,
) -> CapabilityRuntime {
    let settings = RuntimeSettings::from_config(&config.introspection);
    CapabilityRuntime::new(Arc::new(registry), SessionContext::new(config), introspector, settings)
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink collecting serialized events.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Captured events as JSON.
    events: Mutex<Vec<Value>>,
}

impl RecordingAuditSink {
    /// Returns captured events with the given `event` label.
    pub fn events(&self, label: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event["event"] == label)
            .cloned()
            .collect()
    }

    /// Records one event.
    fn push<T: serde::Serialize>(&self, event: &T) {
        self.events.lock().unwrap().push(serde_json::to_value(event).unwrap());
    }
}

impl CatalogAuditSink for RecordingAuditSink {
    fn record_rebuild(&self, event: &RebuildAuditEvent) {
        self.push(event);
    }

    fn record_exclusion(&self, event: &ExclusionAuditEvent) {
        self.push(event);
    }

    fn record_refresh(&self, event: &RefreshAuditEvent) {
        self.push(event);
    }

    fn record_execute(&self, event: &ExecuteAuditEvent) {
        self.push(event);
    }
}

/// Metrics sink counting events.
#[derive(Default)]
pub struct CountingMetrics {
    /// Execution events.
    pub executions: Mutex<Vec<ExecutionMetricEvent>>,
    /// Rebuild events.
    pub rebuilds: Mutex<Vec<RebuildMetricEvent>>,
}

impl CatalogMetrics for CountingMetrics {
    fn record_execution(&self, event: ExecutionMetricEvent, _latency: Duration) {
        self.executions.lock().unwrap().push(event);
    }

    fn record_rebuild(&self, event: RebuildMetricEvent, _latency: Duration) {
        self.rebuilds.lock().unwrap().push(event);
    }
}
