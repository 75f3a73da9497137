// crates/capgate-registry/src/runtime.rs
// ============================================================================
// Module: Capability Runtime
// Description: Wires registry, session, and credential introspection together.
// Purpose: Drive dynamic refresh and report assembly for one process.
// Dependencies: capgate-config, capgate-core, thiserror, time, tokio
// ============================================================================

//! ## Overview
//! The runtime is the explicit context object constructed once at startup
//! and handed to every consumer. It owns the registry, the session context,
//! and the credential introspector.
//!
//! Credential refresh queries the target once, bounded by a timeout and
//! never retried. A changed scope set triggers exactly one rebuild and one
//! change notification; an unchanged set triggers neither. A failed query is
//! treated as "no change": it is audited at warn severity and the
//! last-known scopes stay in effect.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use capgate_config::CapgateConfig;
use capgate_config::ConfigError;
use capgate_config::IntrospectionConfig;
use capgate_core::CapabilityProvider;
use capgate_core::CapabilityTables;
use capgate_core::ScopeToken;
use capgate_core::TargetInfo;
use capgate_core::TargetState;
use thiserror::Error;
use time::Date;
use time::OffsetDateTime;

use crate::audit::RebuildTrigger;
use crate::audit::RefreshAuditEvent;
use crate::audit::RefreshOutcome;
use crate::audit::audit_sink_from_config;
use crate::introspection::CredentialIntrospector;
use crate::introspection::CredentialSnapshot;
use crate::introspection::HttpCredentialIntrospector;
use crate::introspection::IntrospectionError;
use crate::introspection::NoopCredentialIntrospector;
use crate::registry::CapabilityRegistry;
use crate::registry::RegistryError;
use crate::report::IntrospectionReport;
use crate::report::ReportInputs;
use crate::report::ReportThresholds;
use crate::report::build_report;
use crate::session::SessionContext;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Runtime tuning derived from `[introspection]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Upper bound on one whole introspection (credential plus identity).
    pub introspection_timeout: Duration,
    /// Report thresholds.
    pub thresholds: ReportThresholds,
}

impl RuntimeSettings {
    /// Derives settings from introspection configuration.
    #[must_use]
    pub fn from_config(config: &IntrospectionConfig) -> Self {
        Self {
            introspection_timeout: Duration::from_millis(
                config.request_timeout_ms.saturating_mul(2),
            ),
            thresholds: ReportThresholds {
                expiry_warning_days: config.expiry_warning_days,
                scope_filter_warning_percent: config.scope_filter_warning_percent,
            },
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from_config(&IntrospectionConfig::default())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Runtime construction failures.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Registry initialization failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Introspection client could not be built.
    #[error(transparent)]
    Introspection(#[from] IntrospectionError),
    /// Audit sink could not be opened.
    #[error("audit sink unavailable: {0}")]
    Audit(String),
}

// ============================================================================
// SECTION: Refresh Result
// ============================================================================

/// Result of one credential refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRefresh {
    /// Refresh outcome.
    pub outcome: RefreshOutcome,
    /// Scopes in effect after the refresh.
    pub scopes: Option<BTreeSet<ScopeToken>>,
    /// Target state in effect after the refresh.
    pub target: TargetState,
    /// Failure, when the query failed.
    pub error: Option<IntrospectionError>,
}

/// Last introspection result and error.
#[derive(Debug, Default)]
struct CredentialState {
    /// Last successful introspection.
    last: Option<CredentialSnapshot>,
    /// Error from the most recent attempt, cleared on success.
    last_error: Option<String>,
}

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Process-wide capability runtime.
pub struct CapabilityRuntime {
    /// Shared registry.
    registry: Arc<CapabilityRegistry>,
    /// Session selections.
    session: SessionContext,
    /// Credential introspection backend.
    introspector: Arc<dyn CredentialIntrospector>,
    /// Runtime tuning.
    settings: RuntimeSettings,
    /// Last introspection state.
    credentials: Mutex<CredentialState>,
    /// Serializes refreshes so scope comparison and rebuild are atomic.
    refresh_lock: tokio::sync::Mutex<()>,
}

impl CapabilityRuntime {
    /// Builds a runtime from prepared parts.
    #[must_use]
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        session: SessionContext,
        introspector: Arc<dyn CredentialIntrospector>,
        settings: RuntimeSettings,
    ) -> Self {
        Self {
            registry,
            session,
            introspector,
            settings,
            credentials: Mutex::new(CredentialState::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Builds a runtime from configuration.
    ///
    /// Introspection is enabled when both `introspection.base_url` and a
    /// token are present.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the configuration, registry, audit sink,
    /// or HTTP client cannot be initialized.
    pub fn from_config(
        config: CapgateConfig,
        providers: &[Arc<dyn CapabilityProvider>],
        tables: CapabilityTables,
        token: Option<String>,
    ) -> Result<Self, RuntimeError> {
        let audit =
            audit_sink_from_config(&config.audit).map_err(|err| RuntimeError::Audit(err.to_string()))?;
        let settings = RuntimeSettings::from_config(&config.introspection);
        let introspector: Arc<dyn CredentialIntrospector> = match token {
            Some(token) => {
                match HttpCredentialIntrospector::from_config(&config.introspection, token)? {
                    Some(client) => Arc::new(client),
                    None => Arc::new(NoopCredentialIntrospector),
                }
            }
            None => Arc::new(NoopCredentialIntrospector),
        };
        let log_exclusions = config.audit.log_exclusions;
        let session = SessionContext::new(config);
        let registry = CapabilityRegistry::initialize(providers, tables, session.initial_inputs()?)?
            .with_audit(audit)
            .with_exclusion_logging(log_exclusions);
        Ok(Self::new(Arc::new(registry), session, introspector, settings))
    }

    /// Returns the shared registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Returns the session context.
    #[must_use]
    pub const fn session(&self) -> &SessionContext {
        &self.session
    }

    // ------------------------------------------------------------------------
    // Session Triggers
    // ------------------------------------------------------------------------

    /// Activates a preset; see [`SessionContext::switch_preset`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the preset is unknown.
    pub fn switch_preset(&self, preset: Option<&str>) -> Result<bool, ConfigError> {
        self.session.switch_preset(&self.registry, preset)
    }

    /// Pins the namespace scope; see [`SessionContext::set_namespace_scope`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the scope path is malformed.
    pub fn set_namespace_scope(&self, scope: Option<&str>) -> Result<bool, ConfigError> {
        self.session.set_namespace_scope(&self.registry, scope)
    }

    /// Records the connected target; rebuilds and notifies when it changed.
    pub fn set_target(&self, target: TargetState) -> bool {
        if self.registry.inputs().target == target {
            return false;
        }
        self.registry.apply_inputs(RebuildTrigger::TargetChange, |inputs| inputs.target = target);
        true
    }

    // ------------------------------------------------------------------------
    // Credential Refresh
    // ------------------------------------------------------------------------

    /// Re-queries the credential scopes and target; rebuilds on change.
    ///
    /// The first completed refresh closes the handshake window: a target
    /// still [`TargetState::Pending`] becomes [`TargetState::Unknown`] unless
    /// the query reported its version and tier.
    pub async fn refresh_credentials(&self) -> CredentialRefresh {
        let _serialized = self.refresh_lock.lock().await;
        let before = self.registry.inputs();
        let previous = before.scopes;
        let previous_target = before.target;
        let previous_count = previous.as_ref().map(BTreeSet::len);
        let timeout = self.settings.introspection_timeout;
        let result = tokio::time::timeout(timeout, self.introspector.introspect())
            .await
            .unwrap_or_else(|_| {
                Err(IntrospectionError::Timeout(
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                ))
            });
        let audit = self.registry.audit_sink();

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.credential_state().last_error = Some(err.to_string());
                audit.record_refresh(&RefreshAuditEvent::new(
                    RefreshOutcome::Failed,
                    previous_count,
                    previous_count,
                    Some(err.to_string()),
                ));
                let target = settle_target(previous_target, None);
                if target != previous_target {
                    self.registry.apply_inputs(RebuildTrigger::TargetChange, |inputs| {
                        inputs.target = target;
                    });
                }
                return CredentialRefresh {
                    outcome: RefreshOutcome::Failed,
                    scopes: previous,
                    target,
                    error: Some(err),
                };
            }
        };

        let current = snapshot.credential.scopes.clone();
        let target = settle_target(previous_target, snapshot.target);
        let scopes_changed = previous.as_ref() != Some(&current);
        let outcome = if scopes_changed || target != previous_target {
            let trigger = if scopes_changed {
                RebuildTrigger::ScopeChange
            } else {
                RebuildTrigger::TargetChange
            };
            let scopes = current.clone();
            self.registry.apply_inputs(trigger, |inputs| {
                inputs.scopes = Some(scopes);
                inputs.target = target;
            });
            RefreshOutcome::Changed
        } else {
            RefreshOutcome::Unchanged
        };
        {
            let mut state = self.credential_state();
            state.last = Some(snapshot);
            state.last_error = None;
        }
        audit.record_refresh(&RefreshAuditEvent::new(
            outcome,
            previous_count,
            Some(current.len()),
            None,
        ));
        CredentialRefresh {
            outcome,
            scopes: Some(current),
            target,
            error: None,
        }
    }

    /// Returns the last successful introspection, if any.
    #[must_use]
    pub fn last_credential(&self) -> Option<CredentialSnapshot> {
        self.credential_state().last.clone()
    }

    // ------------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------------

    /// Refreshes credentials and builds a report for the current date.
    pub async fn introspection_report(&self) -> IntrospectionReport {
        self.introspection_report_at(OffsetDateTime::now_utc().date()).await
    }

    /// Refreshes credentials and builds a report as of `today`.
    pub async fn introspection_report_at(&self, today: Date) -> IntrospectionReport {
        self.refresh_credentials().await;
        self.report_at(today)
    }

    /// Builds a report from current state without querying the target.
    #[must_use]
    pub fn report_at(&self, today: Date) -> IntrospectionReport {
        let inputs = self.registry.inputs();
        let statistics = self.registry.filter_statistics();
        let state = self.credential_state();
        let last = state.last.as_ref();
        build_report(
            &ReportInputs {
                credential: last.map(|snapshot| &snapshot.credential),
                identity: last.and_then(|snapshot| snapshot.identity.as_ref()),
                target: inputs.target,
                statistics,
                read_only: inputs.read_only,
                preset: inputs.preset.as_deref(),
                last_error: state.last_error.as_deref(),
                today,
            },
            self.settings.thresholds,
        )
    }

    /// Locks the credential state.
    fn credential_state(&self) -> std::sync::MutexGuard<'_, CredentialState> {
        self.credentials.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Target state after a refresh that reported `reported`.
const fn settle_target(previous: TargetState, reported: Option<TargetInfo>) -> TargetState {
    match (reported, previous) {
        (Some(info), _) => TargetState::Connected(info),
        (None, TargetState::Pending) => TargetState::Unknown,
        (None, known) => known,
    }
}
