// crates/capgate-registry/src/report.rs
// ============================================================================
// Module: Introspection Report
// Description: Aggregated view of credential, identity, target, and catalog.
// Purpose: Derive threshold-based notices and recommendations.
// Dependencies: capgate-core, serde, time
// ============================================================================

//! ## Overview
//! A report combines the last credential snapshot with the connected target
//! and the current filter statistics. Notices are derived from fixed rules
//! and configurable thresholds; the report never fails to build.

// ============================================================================
// SECTION: Imports
// ============================================================================

use capgate_core::ExclusionReason;
use capgate_core::FilterStatistics;
use capgate_core::TargetState;
use serde::Serialize;
use time::Date;

use crate::introspection::CredentialInfo;
use crate::introspection::Identity;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Scope granting full API access.
const FULL_ACCESS_SCOPE: &str = "api";

// ============================================================================
// SECTION: Notices
// ============================================================================

/// Kind of report notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Credential expiry date has passed.
    TokenExpired,
    /// Credential expires within the warning window.
    TokenExpiringSoon,
    /// Share of operations hidden by scope exceeds the threshold.
    ScopeFilteringHigh,
    /// Read-only mode hides mutating operations.
    ReadOnlyMode,
    /// Target version and tier are unknown.
    TargetUnknown,
    /// Most recent introspection failed.
    IntrospectionFailed,
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
}

/// One report notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Notice kind.
    pub kind: NoticeKind,
    /// Notice level.
    pub level: NoticeLevel,
    /// Human-readable message.
    pub message: String,
}

impl Notice {
    /// Builds a notice.
    fn new(kind: NoticeKind, level: NoticeLevel, message: String) -> Self {
        Self {
            kind,
            level,
            message,
        }
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Thresholds driving report notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportThresholds {
    /// Warn when the credential expires within this many days.
    pub expiry_warning_days: u32,
    /// Warn when more than this percentage is hidden by scope.
    pub scope_filter_warning_percent: u32,
}

impl Default for ReportThresholds {
    fn default() -> Self {
        Self {
            expiry_warning_days: 7,
            scope_filter_warning_percent: 30,
        }
    }
}

/// Inputs to report assembly.
#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    /// Last known credential metadata.
    pub credential: Option<&'a CredentialInfo>,
    /// Last known identity.
    pub identity: Option<&'a Identity>,
    /// Connected target state.
    pub target: TargetState,
    /// Current filter statistics.
    pub statistics: FilterStatistics,
    /// Read-only flag in effect.
    pub read_only: bool,
    /// Active preset.
    pub preset: Option<&'a str>,
    /// Error from the most recent introspection, if it failed.
    pub last_error: Option<&'a str>,
    /// Current date.
    pub today: Date,
}

/// Aggregated introspection result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntrospectionReport {
    /// Resolved identity, if known.
    pub identity: Option<Identity>,
    /// Credential metadata, if known.
    pub credential: Option<CredentialInfo>,
    /// Connected target state.
    pub target: TargetState,
    /// Active preset.
    pub preset: Option<String>,
    /// Filter statistics of the current catalog.
    pub statistics: FilterStatistics,
    /// Derived notices.
    pub notices: Vec<Notice>,
    /// Suggested remediations.
    pub recommendations: Vec<String>,
}

impl IntrospectionReport {
    /// Returns true when a notice of `kind` is present.
    #[must_use]
    pub fn has_notice(&self, kind: NoticeKind) -> bool {
        self.notices.iter().any(|notice| notice.kind == kind)
    }
}

/// Assembles a report from current state.
#[must_use]
pub fn build_report(inputs: &ReportInputs<'_>, thresholds: ReportThresholds) -> IntrospectionReport {
    let mut notices = Vec::new();
    let mut recommendations = Vec::new();

    if let Some(error) = inputs.last_error {
        notices.push(Notice::new(
            NoticeKind::IntrospectionFailed,
            NoticeLevel::Warning,
            format!("credential introspection failed: {error}; using last known scopes"),
        ));
    }
    if let Some(expires_on) = inputs.credential.and_then(|credential| credential.expires_on) {
        let days_left = (expires_on - inputs.today).whole_days();
        if days_left < 0 {
            notices.push(Notice::new(
                NoticeKind::TokenExpired,
                NoticeLevel::Warning,
                format!("credential expired on {expires_on}"),
            ));
            recommendations.push("rotate the expired credential".to_string());
        } else if days_left <= i64::from(thresholds.expiry_warning_days) {
            notices.push(Notice::new(
                NoticeKind::TokenExpiringSoon,
                NoticeLevel::Warning,
                format!("credential expires on {expires_on} ({days_left} days left)"),
            ));
            recommendations.push("rotate the credential before it expires".to_string());
        }
    }
    let scope_percent = inputs.statistics.percent_excluded(ExclusionReason::InsufficientScope);
    if inputs.statistics.insufficient_scope > 0
        && scope_percent > thresholds.scope_filter_warning_percent
    {
        notices.push(Notice::new(
            NoticeKind::ScopeFilteringHigh,
            NoticeLevel::Warning,
            format!(
                "{} of {} operations ({scope_percent}%) hidden by credential scopes",
                inputs.statistics.insufficient_scope, inputs.statistics.total
            ),
        ));
        let has_full_access = inputs.credential.is_some_and(|credential| {
            credential.scopes.iter().any(|scope| scope.as_str() == FULL_ACCESS_SCOPE)
        });
        if !has_full_access {
            recommendations
                .push(format!("grant the `{FULL_ACCESS_SCOPE}` scope to expose hidden operations"));
        }
    }
    if inputs.read_only {
        notices.push(Notice::new(
            NoticeKind::ReadOnlyMode,
            NoticeLevel::Info,
            format!("read-only mode hides {} mutating operations", inputs.statistics.read_only),
        ));
    }
    if matches!(inputs.target, TargetState::Unknown) {
        notices.push(Notice::new(
            NoticeKind::TargetUnknown,
            NoticeLevel::Warning,
            "target version and tier unknown; gated operations are hidden".to_string(),
        ));
        recommendations.push("verify the target base URL and credential".to_string());
    }

    IntrospectionReport {
        identity: inputs.identity.cloned(),
        credential: inputs.credential.cloned(),
        target: inputs.target,
        preset: inputs.preset.map(str::to_string),
        statistics: inputs.statistics,
        notices,
        recommendations,
    }
}
