// crates/capgate-core/src/pipeline/stats.rs
// ============================================================================
// Module: Filter Statistics
// Description: Exclusion reasons, exclusion ledger, and aggregate counts.
// Purpose: Attribute every excluded operation to exactly one reason.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every excluded operation is recorded once, under the first stage that
//! rejected it. [`FilterStatistics`] is computed from that ledger, so
//! `total - available` always equals the sum of per-reason counts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::OperationName;

// ============================================================================
// SECTION: Exclusion Reasons
// ============================================================================

/// Reason an operation was excluded from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionReason {
    /// Read-only mode and the operation mutates remote state.
    ReadOnly,
    /// Name matched the deny pattern.
    DeniedRegex,
    /// Connected scopes do not satisfy the scope requirement.
    InsufficientScope,
    /// Target version or tier does not satisfy availability.
    TierOrVersion,
    /// Every action of a discriminated schema was denied.
    AllActionsDenied,
}

impl ExclusionReason {
    /// All reasons in pipeline order.
    pub const ALL: [Self; 5] = [
        Self::ReadOnly,
        Self::DeniedRegex,
        Self::InsufficientScope,
        Self::TierOrVersion,
        Self::AllActionsDenied,
    ];

    /// Returns the stable label for the reason.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::DeniedRegex => "denied-regex",
            Self::InsufficientScope => "insufficient-scope",
            Self::TierOrVersion => "tier-or-version",
            Self::AllActionsDenied => "all-actions-denied",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ledger entry for one excluded operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    /// Excluded operation.
    pub operation: OperationName,
    /// First failing stage.
    pub reason: ExclusionReason,
    /// Human-readable detail.
    pub detail: String,
}

// ============================================================================
// SECTION: Statistics
// ============================================================================

/// Aggregate counts for one catalog snapshot.
///
/// # Invariants
/// - `total - available == excluded_total()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStatistics {
    /// Operations known from providers.
    pub total: usize,
    /// Operations exposed after filtering.
    pub available: usize,
    /// Excluded by read-only mode.
    pub read_only: usize,
    /// Excluded by the deny pattern.
    pub denied_regex: usize,
    /// Excluded by scope policy.
    pub insufficient_scope: usize,
    /// Excluded by version/tier policy.
    pub tier_or_version: usize,
    /// Excluded because every action was denied.
    pub all_actions_denied: usize,
}

impl FilterStatistics {
    /// Builds statistics from the exclusion ledger.
    #[must_use]
    pub fn from_ledger(total: usize, exclusions: &[Exclusion]) -> Self {
        let mut stats = Self {
            total,
            available: total.saturating_sub(exclusions.len()),
            ..Self::default()
        };
        for exclusion in exclusions {
            *stats.count_mut(exclusion.reason) += 1;
        }
        stats
    }

    /// Returns the count for one reason.
    #[must_use]
    pub const fn count(&self, reason: ExclusionReason) -> usize {
        match reason {
            ExclusionReason::ReadOnly => self.read_only,
            ExclusionReason::DeniedRegex => self.denied_regex,
            ExclusionReason::InsufficientScope => self.insufficient_scope,
            ExclusionReason::TierOrVersion => self.tier_or_version,
            ExclusionReason::AllActionsDenied => self.all_actions_denied,
        }
    }

    /// Returns the sum of per-reason counts.
    #[must_use]
    pub fn excluded_total(&self) -> usize {
        ExclusionReason::ALL.iter().map(|reason| self.count(*reason)).sum()
    }

    /// Returns true when the counts satisfy the accounting invariant.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.available <= self.total && self.total - self.available == self.excluded_total()
    }

    /// Returns the share of operations excluded for `reason`, in percent.
    #[must_use]
    pub fn percent_excluded(&self, reason: ExclusionReason) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let percent = self.count(reason).saturating_mul(100) / self.total;
        u32::try_from(percent).unwrap_or(u32::MAX)
    }

    /// Returns a mutable counter for one reason.
    const fn count_mut(&mut self, reason: ExclusionReason) -> &mut usize {
        match reason {
            ExclusionReason::ReadOnly => &mut self.read_only,
            ExclusionReason::DeniedRegex => &mut self.denied_regex,
            ExclusionReason::InsufficientScope => &mut self.insufficient_scope,
            ExclusionReason::TierOrVersion => &mut self.tier_or_version,
            ExclusionReason::AllActionsDenied => &mut self.all_actions_denied,
        }
    }
}
