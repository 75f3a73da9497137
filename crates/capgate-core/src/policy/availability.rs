// crates/capgate-core/src/policy/availability.rs
// ============================================================================
// Module: Availability Policy
// Description: Version/tier gating of operations against the connected target.
// Purpose: Decide whether an operation is available on the connected target.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Availability is a stateless lookup keyed by operation name. Each entry
//! carries a minimum version and minimum tier. Operations absent from the
//! table fall back to an explicit [`UnknownOperationDefault`], which is the
//! most debatable default in the system and is therefore configurable.
//!
//! ## Invariants
//! - Evaluation never fails; an undetermined target is a denial, except
//!   during the handshake window ([`TargetState::Pending`]) which is fail-open.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::OperationName;
use crate::core::TargetInfo;
use crate::core::TargetState;
use crate::core::TargetVersion;
use crate::core::Tier;

// ============================================================================
// SECTION: Requirements
// ============================================================================

/// Static availability requirement for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRequirement {
    /// Minimum target version.
    pub min_version: TargetVersion,
    /// Minimum target tier.
    pub min_tier: Tier,
    /// Optional human-readable note for documentation tooling.
    #[serde(default)]
    pub note: Option<String>,
}

impl AvailabilityRequirement {
    /// Builds a requirement without a note.
    #[must_use]
    pub const fn new(min_version: TargetVersion, min_tier: Tier) -> Self {
        Self {
            min_version,
            min_tier,
            note: None,
        }
    }

    /// Returns a copy with the note set.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Per-operation availability table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityTable {
    /// Requirements keyed by operation name.
    entries: BTreeMap<OperationName, AvailabilityRequirement>,
}

impl AvailabilityTable {
    /// Builds an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(name, requirement)` pairs.
    #[must_use]
    pub fn from_entries(
        entries: impl IntoIterator<Item = (OperationName, AvailabilityRequirement)>,
    ) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Inserts or replaces a requirement.
    pub fn insert(&mut self, name: impl Into<OperationName>, requirement: AvailabilityRequirement) {
        self.entries.insert(name.into(), requirement);
    }

    /// Returns the requirement for an operation, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AvailabilityRequirement> {
        self.entries.get(name)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Decision for operations absent from the availability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "floor", rename_all = "snake_case")]
pub enum UnknownOperationDefault {
    /// Always allow (fail-open).
    Allow,
    /// Allow when the connected version is at least the recency floor.
    AllowIfRecent(TargetVersion),
    /// Never allow (fail-closed).
    Deny,
}

impl Default for UnknownOperationDefault {
    fn default() -> Self {
        Self::AllowIfRecent(TargetVersion::new(15, 0))
    }
}

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Reason an operation is unavailable on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AvailabilityDenial {
    /// Target version/tier could not be determined.
    NotConnected,
    /// Connected version is older than required.
    VersionTooOld {
        /// Required minimum version.
        required: TargetVersion,
        /// Connected version.
        connected: TargetVersion,
    },
    /// Connected tier is lower than required.
    TierTooLow {
        /// Required minimum tier.
        required: Tier,
        /// Connected tier.
        connected: Tier,
    },
    /// Operation is not in the table and the default denies it.
    Unvetted {
        /// Recency floor in effect, if any.
        floor: Option<TargetVersion>,
        /// Connected version.
        connected: TargetVersion,
    },
}

impl fmt::Display for AvailabilityDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => f.write_str("target not yet connected"),
            Self::VersionTooOld {
                required,
                connected,
            } => write!(f, "requires version {required}, connected {connected}"),
            Self::TierTooLow {
                required,
                connected,
            } => write!(f, "requires tier {required}, connected {connected}"),
            Self::Unvetted {
                floor: Some(floor),
                connected,
            } => write!(
                f,
                "operation not in availability table and version {connected} is below recency \
                 floor {floor}"
            ),
            Self::Unvetted {
                floor: None, ..
            } => f.write_str("operation not in availability table"),
        }
    }
}

/// Availability decision for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AvailabilityDecision {
    /// Operation is available.
    Allowed,
    /// Operation is available only because the handshake is pending.
    AllowedPending,
    /// Operation is unavailable.
    Denied(AvailabilityDenial),
}

impl AvailabilityDecision {
    /// Returns true when the operation may be exposed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed | Self::AllowedPending)
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates availability of `name` against the current target.
#[must_use]
pub fn evaluate_availability(
    table: &AvailabilityTable,
    name: &str,
    target: &TargetState,
    unknown_default: UnknownOperationDefault,
) -> AvailabilityDecision {
    let info = match target {
        TargetState::Pending => return AvailabilityDecision::AllowedPending,
        TargetState::Unknown => {
            return AvailabilityDecision::Denied(AvailabilityDenial::NotConnected);
        }
        TargetState::Connected(info) => *info,
    };
    match table.get(name) {
        Some(requirement) => check_requirement(requirement, info),
        None => check_unknown(unknown_default, info),
    }
}

/// Checks a table requirement against connected target info.
fn check_requirement(
    requirement: &AvailabilityRequirement,
    info: TargetInfo,
) -> AvailabilityDecision {
    if info.version < requirement.min_version {
        return AvailabilityDecision::Denied(AvailabilityDenial::VersionTooOld {
            required: requirement.min_version,
            connected: info.version,
        });
    }
    if !info.tier.satisfies(requirement.min_tier) {
        return AvailabilityDecision::Denied(AvailabilityDenial::TierTooLow {
            required: requirement.min_tier,
            connected: info.tier,
        });
    }
    AvailabilityDecision::Allowed
}

/// Applies the unknown-operation default.
fn check_unknown(default: UnknownOperationDefault, info: TargetInfo) -> AvailabilityDecision {
    match default {
        UnknownOperationDefault::Allow => AvailabilityDecision::Allowed,
        UnknownOperationDefault::AllowIfRecent(floor) if info.version >= floor => {
            AvailabilityDecision::Allowed
        }
        UnknownOperationDefault::AllowIfRecent(floor) => {
            AvailabilityDecision::Denied(AvailabilityDenial::Unvetted {
                floor: Some(floor),
                connected: info.version,
            })
        }
        UnknownOperationDefault::Deny => AvailabilityDecision::Denied(AvailabilityDenial::Unvetted {
            floor: None,
            connected: info.version,
        }),
    }
}
