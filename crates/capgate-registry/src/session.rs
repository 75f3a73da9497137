// crates/capgate-registry/src/session.rs
// ============================================================================
// Module: Session Context
// Description: Active preset and namespace scope for one server process.
// Purpose: Translate session switches into policy input updates and rebuilds.
// Dependencies: capgate-config
// ============================================================================

//! ## Overview
//! The session context owns the validated configuration and the currently
//! active preset and namespace scope. Switching either resolves the new
//! policy first, so an invalid request leaves the catalog untouched, then
//! applies it to the registry with one rebuild and one notification.
//! Re-selecting the current value is a no-op.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::PoisonError;

use capgate_config::CapgateConfig;
use capgate_config::ConfigError;
use capgate_config::validate_namespace;
use serde::Serialize;

use crate::audit::RebuildTrigger;
use crate::policy_inputs::PolicyInputs;
use crate::registry::CapabilityRegistry;

// ============================================================================
// SECTION: Session State
// ============================================================================

/// Currently active session selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// Active preset.
    pub preset: Option<String>,
    /// Active namespace scope.
    pub namespace_scope: Option<String>,
}

/// Session context bound to one configuration.
pub struct SessionContext {
    /// Validated configuration.
    config: CapgateConfig,
    /// Active selections; held while a switch is applied.
    state: Mutex<SessionState>,
}

impl SessionContext {
    /// Builds a session from configuration defaults.
    #[must_use]
    pub fn new(config: CapgateConfig) -> Self {
        let state = SessionState {
            preset: config.session.default_preset.clone(),
            namespace_scope: config.session.namespace_scope.as_deref().map(normalize_scope),
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &CapgateConfig {
        &self.config
    }

    /// Returns the active selections.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Resolves policy inputs for the active selections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the active preset cannot be resolved.
    pub fn initial_inputs(&self) -> Result<PolicyInputs, ConfigError> {
        let state = self.state();
        let mut inputs =
            PolicyInputs::from_policy(self.config.effective_policy(state.preset.as_deref())?);
        inputs.namespace = self.config.namespace_binding(state.namespace_scope.as_deref());
        Ok(inputs)
    }

    /// Activates a preset (or the base policy for `None`).
    ///
    /// Returns `true` when the selection changed and the catalog was rebuilt.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the preset is unknown.
    pub fn switch_preset(
        &self,
        registry: &CapabilityRegistry,
        preset: Option<&str>,
    ) -> Result<bool, ConfigError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.preset.as_deref() == preset {
            return Ok(false);
        }
        let policy = self.config.effective_policy(preset)?;
        registry.apply_inputs(RebuildTrigger::PresetSwitch, |inputs| inputs.apply_policy(policy));
        state.preset = preset.map(str::to_string);
        drop(state);
        Ok(true)
    }

    /// Pins (or clears with `None`) the namespace scope.
    ///
    /// Returns `true` when the selection changed and the catalog was rebuilt.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the scope path is malformed.
    pub fn set_namespace_scope(
        &self,
        registry: &CapabilityRegistry,
        scope: Option<&str>,
    ) -> Result<bool, ConfigError> {
        if let Some(scope) = scope {
            validate_namespace(scope)?;
        }
        let scope = scope.map(normalize_scope);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.namespace_scope == scope {
            return Ok(false);
        }
        let binding = self.config.namespace_binding(scope.as_deref());
        registry.apply_inputs(RebuildTrigger::NamespaceScope, |inputs| inputs.namespace = binding);
        state.namespace_scope = scope;
        drop(state);
        Ok(true)
    }
}

/// Normalizes a namespace path.
fn normalize_scope(scope: &str) -> String {
    scope.trim().to_string()
}

#[cfg(test)]
mod tests;
