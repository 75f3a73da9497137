// crates/capgate-config/src/config.rs
// ============================================================================
// Module: Capability Gate Configuration
// Description: Configuration loading and validation for Capability Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: capgate-core, regex, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every policy input (deny rules, overrides, presets, availability defaults)
//! is validated before the registry sees it; invalid configuration fails
//! closed instead of silently widening the exposed catalog.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use capgate_core::ActionName;
use capgate_core::CrossReferenceMode;
use capgate_core::DenyRules;
use capgate_core::NamespaceBinding;
use capgate_core::OperationName;
use capgate_core::TargetVersion;
use capgate_core::UnknownOperationDefault;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "capgate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CAPGATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of the deny regex source.
pub(crate) const MAX_DENY_REGEX_LENGTH: usize = 1024;
/// Maximum number of denied action entries per section.
pub(crate) const MAX_DENIED_ACTIONS: usize = 256;
/// Maximum number of description overrides per section.
pub(crate) const MAX_DESCRIPTION_OVERRIDES: usize = 512;
/// Maximum length of a description override.
pub(crate) const MAX_DESCRIPTION_LENGTH: usize = 8192;
/// Maximum length of operation, action, and preset names.
pub(crate) const MAX_NAME_LENGTH: usize = 128;
/// Maximum number of presets.
pub(crate) const MAX_PRESETS: usize = 64;
/// Maximum length of a namespace scope path.
pub(crate) const MAX_NAMESPACE_LENGTH: usize = 255;
/// Maximum length of the introspection base URL.
pub(crate) const MAX_BASE_URL_LENGTH: usize = 2048;
/// Minimum introspection connect timeout in milliseconds.
pub(crate) const MIN_CONNECT_TIMEOUT_MS: u64 = 100;
/// Maximum introspection connect timeout in milliseconds.
pub(crate) const MAX_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Minimum introspection request timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 500;
/// Maximum introspection request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Maximum expiry warning window in days.
pub(crate) const MAX_EXPIRY_WARNING_DAYS: u32 = 365;

// ============================================================================
// SECTION: Root Configuration
// ============================================================================

/// Capability Gate configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CapgateConfig {
    /// Base policy inputs.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Availability defaults for operations absent from the table.
    #[serde(default)]
    pub availability: AvailabilityConfig,
    /// Named policy presets layered over `[policy]`.
    #[serde(default)]
    pub presets: Vec<PresetConfig>,
    /// Session defaults.
    #[serde(default)]
    pub session: SessionConfig,
    /// Credential introspection client settings.
    #[serde(default)]
    pub introspection: IntrospectionConfig,
    /// Audit logging settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl CapgateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::parse(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy.validate()?;
        self.availability.validate()?;
        self.session.validate()?;
        self.introspection.validate()?;
        self.audit.validate()?;
        if self.presets.len() > MAX_PRESETS {
            return Err(ConfigError::Invalid("too many presets".to_string()));
        }
        let mut names = BTreeSet::new();
        for preset in &self.presets {
            preset.validate()?;
            if !names.insert(preset.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate preset name: {}", preset.name)));
            }
        }
        if let Some(default_preset) = &self.session.default_preset
            && !names.contains(default_preset.as_str())
        {
            return Err(ConfigError::Invalid(format!(
                "session.default_preset references unknown preset: {default_preset}"
            )));
        }
        Ok(())
    }

    /// Returns the preset with the given name.
    #[must_use]
    pub fn preset(&self, name: &str) -> Option<&PresetConfig> {
        self.presets.iter().find(|preset| preset.name == name)
    }

    /// Returns the policy in effect with an optional preset layered on top.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the preset is unknown or a rule
    /// fails to compile.
    pub fn effective_policy(&self, preset: Option<&str>) -> Result<EffectivePolicy, ConfigError> {
        let preset = match preset {
            Some(name) => Some(
                self.preset(name)
                    .ok_or_else(|| ConfigError::Invalid(format!("unknown preset: {name}")))?,
            ),
            None => None,
        };
        let read_only = preset.and_then(|preset| preset.read_only).unwrap_or(self.policy.read_only);
        let pattern = preset
            .and_then(|preset| preset.denied_operations_regex.as_deref())
            .or(self.policy.denied_operations_regex.as_deref());
        let mut deny = DenyRules::new();
        if let Some(pattern) = pattern {
            deny = deny.with_pattern(compile_deny_regex("denied_operations_regex", pattern)?);
        }
        let preset_actions = preset.map_or(&[][..], |preset| preset.denied_actions.as_slice());
        for entry in self.policy.denied_actions.iter().chain(preset_actions) {
            let (operation, action) = parse_denied_action(entry)?;
            deny = deny.deny_action(operation, action);
        }
        let mut description_overrides = BTreeMap::new();
        let preset_overrides =
            preset.map(|preset| &preset.description_overrides).into_iter().flatten();
        for (name, text) in self.policy.description_overrides.iter().chain(preset_overrides) {
            description_overrides.insert(OperationName::new(name.trim()), text.clone());
        }
        Ok(EffectivePolicy {
            preset: preset.map(|preset| preset.name.clone()),
            read_only,
            deny,
            description_overrides,
            cross_references: self.policy.cross_references,
            unknown_operations: self.availability.unknown_default()?,
        })
    }

    /// Returns the namespace binding for a scope path, if any.
    #[must_use]
    pub fn namespace_binding(&self, scope: Option<&str>) -> Option<NamespaceBinding> {
        scope.map(|value| NamespaceBinding::new(self.session.namespace_parameter.clone(), value))
    }
}

/// Policy inputs resolved from `[policy]`, a preset, and `[availability]`.
#[derive(Debug, Clone, Default)]
pub struct EffectivePolicy {
    /// Preset applied, if any.
    pub preset: Option<String>,
    /// Read-only flag.
    pub read_only: bool,
    /// Compiled deny rules.
    pub deny: DenyRules,
    /// Description overrides keyed by operation.
    pub description_overrides: BTreeMap<OperationName, String>,
    /// Cross-reference handling.
    pub cross_references: CrossReferenceMode,
    /// Default for operations absent from the availability table.
    pub unknown_operations: UnknownOperationDefault,
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Base policy configuration (`[policy]`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyConfig {
    /// Hide operations that mutate remote state.
    #[serde(default)]
    pub read_only: bool,
    /// Regex over operation names; matches are hidden.
    #[serde(default)]
    pub denied_operations_regex: Option<String>,
    /// Denied actions as `operation:action` entries.
    #[serde(default)]
    pub denied_actions: Vec<String>,
    /// Cross-reference handling mode.
    #[serde(default)]
    pub cross_references: CrossReferenceMode,
    /// Description overrides keyed by operation name.
    #[serde(default)]
    pub description_overrides: BTreeMap<String, String>,
}

impl PolicyConfig {
    /// Validates policy configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_rule_set(
            "policy",
            self.denied_operations_regex.as_deref(),
            &self.denied_actions,
            &self.description_overrides,
        )
    }
}

/// Named preset layered over `[policy]` (`[[presets]]`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PresetConfig {
    /// Unique preset name.
    pub name: String,
    /// Read-only override.
    #[serde(default)]
    pub read_only: Option<bool>,
    /// Deny regex replacing the base regex.
    #[serde(default)]
    pub denied_operations_regex: Option<String>,
    /// Additional denied actions.
    #[serde(default)]
    pub denied_actions: Vec<String>,
    /// Additional description overrides (preset wins on conflict).
    #[serde(default)]
    pub description_overrides: BTreeMap<String, String>,
}

impl PresetConfig {
    /// Validates one preset.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_name("presets.name", &self.name)?;
        validate_rule_set(
            &format!("presets.{}", self.name),
            self.denied_operations_regex.as_deref(),
            &self.denied_actions,
            &self.description_overrides,
        )
    }
}

// ============================================================================
// SECTION: Availability
// ============================================================================

/// Handling of operations absent from the availability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownOperationsMode {
    /// Always expose (fail-open).
    Allow,
    /// Expose when the target is at least the recency floor.
    #[default]
    AllowIfRecent,
    /// Never expose (fail-closed).
    Deny,
}

/// Availability defaults (`[availability]`).
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityConfig {
    /// Handling of unknown operations.
    #[serde(default)]
    pub unknown_operations: UnknownOperationsMode,
    /// Recency floor as `major.minor`.
    #[serde(default = "default_recency_floor")]
    pub recency_floor: String,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            unknown_operations: UnknownOperationsMode::default(),
            recency_floor: default_recency_floor(),
        }
    }
}

impl AvailabilityConfig {
    /// Validates availability configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.unknown_default().map(|_| ())
    }

    /// Returns the resolved unknown-operation default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the recency floor is unparsable.
    pub fn unknown_default(&self) -> Result<UnknownOperationDefault, ConfigError> {
        match self.unknown_operations {
            UnknownOperationsMode::Allow => Ok(UnknownOperationDefault::Allow),
            UnknownOperationsMode::Deny => Ok(UnknownOperationDefault::Deny),
            UnknownOperationsMode::AllowIfRecent => {
                let floor = TargetVersion::try_parse(&self.recency_floor).ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "availability.recency_floor is not a version: {}",
                        self.recency_floor
                    ))
                })?;
                Ok(UnknownOperationDefault::AllowIfRecent(floor))
            }
        }
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Session defaults (`[session]`).
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Preset applied at startup.
    #[serde(default)]
    pub default_preset: Option<String>,
    /// Namespace path pinned at startup.
    #[serde(default)]
    pub namespace_scope: Option<String>,
    /// Parameter receiving the namespace value.
    #[serde(default = "default_namespace_parameter")]
    pub namespace_parameter: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_preset: None,
            namespace_scope: None,
            namespace_parameter: default_namespace_parameter(),
        }
    }
}

impl SessionConfig {
    /// Validates session configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_name("session.namespace_parameter", &self.namespace_parameter)?;
        if let Some(scope) = &self.namespace_scope {
            validate_namespace(scope)?;
        }
        Ok(())
    }
}

/// Validates a namespace scope path.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the path is empty, too long, or
/// contains empty segments.
pub fn validate_namespace(scope: &str) -> Result<(), ConfigError> {
    let trimmed = scope.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid("namespace scope must be non-empty".to_string()));
    }
    if trimmed.len() > MAX_NAMESPACE_LENGTH {
        return Err(ConfigError::Invalid("namespace scope exceeds max length".to_string()));
    }
    if trimmed.split('/').any(|segment| segment.trim().is_empty()) {
        return Err(ConfigError::Invalid(format!("namespace scope has empty segment: {trimmed}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Introspection
// ============================================================================

/// Kind of credential presented to the target system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Personal access token.
    #[default]
    PersonalAccessToken,
    /// OAuth access token.
    Oauth,
}

impl CredentialKind {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PersonalAccessToken => "personal_access_token",
            Self::Oauth => "oauth",
        }
    }
}

/// Credential introspection client settings (`[introspection]`).
#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectionConfig {
    /// Target system base URL; introspection is disabled when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Credential kind.
    #[serde(default)]
    pub credential_kind: CredentialKind,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Total request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Warn when the credential expires within this many days.
    #[serde(default = "default_expiry_warning_days")]
    pub expiry_warning_days: u32,
    /// Warn when more than this share of operations is hidden by scope.
    #[serde(default = "default_scope_filter_warning_percent")]
    pub scope_filter_warning_percent: u32,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            credential_kind: CredentialKind::default(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            expiry_warning_days: default_expiry_warning_days(),
            scope_filter_warning_percent: default_scope_filter_warning_percent(),
        }
    }
}

impl IntrospectionConfig {
    /// Validates introspection configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base_url) = &self.base_url {
            let trimmed = base_url.trim();
            if trimmed.is_empty() || trimmed.len() > MAX_BASE_URL_LENGTH {
                return Err(ConfigError::Invalid(
                    "introspection.base_url must be non-empty and within length limits".to_string(),
                ));
            }
            if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
                return Err(ConfigError::Invalid(
                    "introspection.base_url must use http or https".to_string(),
                ));
            }
        }
        if !(MIN_CONNECT_TIMEOUT_MS ..= MAX_CONNECT_TIMEOUT_MS).contains(&self.connect_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "introspection.connect_timeout_ms must be between {MIN_CONNECT_TIMEOUT_MS} and \
                 {MAX_CONNECT_TIMEOUT_MS}"
            )));
        }
        if !(MIN_REQUEST_TIMEOUT_MS ..= MAX_REQUEST_TIMEOUT_MS).contains(&self.request_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "introspection.request_timeout_ms must be between {MIN_REQUEST_TIMEOUT_MS} and \
                 {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        if self.request_timeout_ms < self.connect_timeout_ms {
            return Err(ConfigError::Invalid(
                "introspection.request_timeout_ms must be >= connect_timeout_ms".to_string(),
            ));
        }
        if self.expiry_warning_days > MAX_EXPIRY_WARNING_DAYS {
            return Err(ConfigError::Invalid(
                "introspection.expiry_warning_days exceeds max".to_string(),
            ));
        }
        if !(1 ..= 100).contains(&self.scope_filter_warning_percent) {
            return Err(ConfigError::Invalid(
                "introspection.scope_filter_warning_percent must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit logging configuration (`[audit]`).
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
    /// Emit one debug event per excluded operation on rebuild.
    #[serde(default)]
    pub log_exclusions: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
            log_exclusions: false,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses an `operation:action` entry.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the entry is malformed.
pub fn parse_denied_action(entry: &str) -> Result<(OperationName, ActionName), ConfigError> {
    let Some((operation, action)) = entry.split_once(':') else {
        return Err(ConfigError::Invalid(format!(
            "denied action must be `operation:action`: {entry}"
        )));
    };
    let (operation, action) = (operation.trim(), action.trim());
    validate_name("denied_actions operation", operation)?;
    validate_name("denied_actions action", action)?;
    if action.contains(':') {
        return Err(ConfigError::Invalid(format!("denied action has extra separator: {entry}")));
    }
    Ok((OperationName::new(operation), ActionName::new(action)))
}

/// Compiles a deny regex with a length bound.
fn compile_deny_regex(field: &str, pattern: &str) -> Result<Regex, ConfigError> {
    if pattern.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if pattern.len() > MAX_DENY_REGEX_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Regex::new(pattern).map_err(|err| ConfigError::Invalid(format!("{field} is invalid: {err}")))
}

/// Validates the deny and override inputs shared by `[policy]` and presets.
fn validate_rule_set(
    section: &str,
    pattern: Option<&str>,
    denied_actions: &[String],
    overrides: &BTreeMap<String, String>,
) -> Result<(), ConfigError> {
    if let Some(pattern) = pattern {
        compile_deny_regex(&format!("{section}.denied_operations_regex"), pattern)?;
    }
    if denied_actions.len() > MAX_DENIED_ACTIONS {
        return Err(ConfigError::Invalid(format!("{section}: too many denied_actions entries")));
    }
    for entry in denied_actions {
        parse_denied_action(entry)?;
    }
    if overrides.len() > MAX_DESCRIPTION_OVERRIDES {
        return Err(ConfigError::Invalid(format!(
            "{section}: too many description_overrides entries"
        )));
    }
    for (name, text) in overrides {
        validate_name(&format!("{section}.description_overrides key"), name)?;
        if text.len() > MAX_DESCRIPTION_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "{section}.description_overrides.{name} exceeds max length"
            )));
        }
    }
    Ok(())
}

/// Validates a short identifier.
fn validate_name(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    validate_path(Path::new(trimmed))
        .map_err(|_| ConfigError::Invalid(format!("{field} path component too long")))
}

/// Default recency floor for unknown operations.
fn default_recency_floor() -> String {
    "15.0".to_string()
}

/// Default namespace parameter.
fn default_namespace_parameter() -> String {
    "project_id".to_string()
}

/// Default introspection connect timeout.
const fn default_connect_timeout_ms() -> u64 {
    2_000
}

/// Default introspection request timeout.
const fn default_request_timeout_ms() -> u64 {
    5_000
}

/// Default expiry warning window.
const fn default_expiry_warning_days() -> u32 {
    7
}

/// Default scope-filter warning threshold.
const fn default_scope_filter_warning_percent() -> u32 {
    30
}

/// Default audit enabled.
const fn default_audit_enabled() -> bool {
    true
}
