// crates/capgate-core/src/pipeline/stages.rs
// ============================================================================
// Module: Filter Pipeline
// Description: Ordered filter and transform stages deriving the catalog.
// Purpose: Project raw operations into derived operations under a policy snapshot.
// Dependencies: serde, crate::{core, policy}
// ============================================================================

//! ## Overview
//! The stage order is defined once, as data, in [`FILTER_STAGES`]. Admission
//! stages either keep a candidate (possibly narrowing its schema) or exclude
//! it with a reason; the first exclusion wins. Description stages run in a
//! second pass once the survivor set is final, because cross-references are
//! resolved against it.
//!
//! ## Invariants
//! - Raw operations are never mutated; derived operations are rebuilt in full.
//! - Output order follows input order.
//! - Stages never fail; undetermined inputs exclude conservatively.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::core::ActionName;
use crate::core::Operation;
use crate::core::OperationDescriptor;
use crate::core::OperationHandler;
use crate::core::OperationName;
use crate::core::ParamSchema;
use crate::core::ScopeToken;
use crate::pipeline::snapshot::CapabilityTables;
use crate::pipeline::snapshot::NamespaceBinding;
use crate::pipeline::snapshot::PolicySnapshot;
use crate::pipeline::stats::Exclusion;
use crate::pipeline::stats::ExclusionReason;
use crate::pipeline::stats::FilterStatistics;
use crate::policy::ActionFilter;
use crate::policy::AvailabilityDecision;
use crate::policy::CrossReferenceMode;
use crate::policy::evaluate_availability;
use crate::policy::filter_actions;
use crate::policy::resolve_cross_references;
use crate::policy::strip_tier_parameters;

// ============================================================================
// SECTION: Stage Order
// ============================================================================

/// One stage of the filter pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStage {
    /// Drop remote-mutating operations in read-only mode.
    ReadOnly,
    /// Drop operations matching the deny pattern.
    DeniedRegex,
    /// Drop operations whose scope requirement is unmet.
    Scope,
    /// Drop operations unavailable on the target.
    Availability,
    /// Remove denied action branches.
    ActionDenial,
    /// Remove tier-gated parameters.
    TierParameters,
    /// Hide the namespace-pinned parameter.
    NamespacePin,
    /// Apply configured description overrides.
    DescriptionOverride,
    /// Rewrite or strip cross-reference markers.
    CrossReference,
}

impl FilterStage {
    /// Returns the exclusion reason the stage can produce, if any.
    #[must_use]
    pub const fn exclusion_reason(self) -> Option<ExclusionReason> {
        match self {
            Self::ReadOnly => Some(ExclusionReason::ReadOnly),
            Self::DeniedRegex => Some(ExclusionReason::DeniedRegex),
            Self::Scope => Some(ExclusionReason::InsufficientScope),
            Self::Availability => Some(ExclusionReason::TierOrVersion),
            Self::ActionDenial => Some(ExclusionReason::AllActionsDenied),
            Self::TierParameters
            | Self::NamespacePin
            | Self::DescriptionOverride
            | Self::CrossReference => None,
        }
    }
}

/// Pipeline stages in evaluation order.
pub const FILTER_STAGES: [FilterStage; 9] = [
    FilterStage::ReadOnly,
    FilterStage::DeniedRegex,
    FilterStage::Scope,
    FilterStage::Availability,
    FilterStage::ActionDenial,
    FilterStage::TierParameters,
    FilterStage::NamespacePin,
    FilterStage::DescriptionOverride,
    FilterStage::CrossReference,
];

// ============================================================================
// SECTION: Derived Operation
// ============================================================================

/// Filtered and transformed projection of an operation.
#[derive(Clone)]
pub struct DerivedOperation {
    /// Operation name.
    pub name: OperationName,
    /// Description after override or cross-reference resolution.
    pub description: String,
    /// Schema after action denial and parameter stripping.
    pub schema: ParamSchema,
    /// Whether execution mutates remote state.
    pub mutates_remote_state: bool,
    /// Actions removed by deny rules.
    pub removed_actions: Vec<ActionName>,
    /// Parameters removed for the connected tier.
    pub stripped_parameters: Vec<String>,
    /// Parameter pinned to the namespace scope.
    pub pinned: Option<NamespaceBinding>,
    /// Whether the description came from an override.
    pub description_overridden: bool,
    /// Execution function shared with the raw operation.
    pub handler: Arc<dyn OperationHandler>,
}

impl DerivedOperation {
    /// Returns the metadata-only descriptor.
    #[must_use]
    pub fn descriptor(&self) -> OperationDescriptor {
        OperationDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.schema.to_json_schema(),
        }
    }

    /// Returns true when the action was removed by deny rules.
    #[must_use]
    pub fn is_action_removed(&self, action: &str) -> bool {
        self.removed_actions.iter().any(|removed| removed.as_str() == action)
    }
}

impl fmt::Debug for DerivedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedOperation")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("removed_actions", &self.removed_actions)
            .field("stripped_parameters", &self.stripped_parameters)
            .finish_non_exhaustive()
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Derived operations in input order.
    pub operations: Vec<DerivedOperation>,
    /// Ledger of excluded operations in input order.
    pub exclusions: Vec<Exclusion>,
    /// Aggregate counts.
    pub statistics: FilterStatistics,
}

// ============================================================================
// SECTION: Admission Stages
// ============================================================================

/// Operation moving through the admission stages.
struct Candidate<'a> {
    /// Raw operation.
    operation: &'a Operation,
    /// Working schema.
    schema: ParamSchema,
    /// Actions removed so far.
    removed_actions: Vec<ActionName>,
    /// Parameters stripped so far.
    stripped_parameters: Vec<String>,
    /// Namespace pin, once applied.
    pinned: Option<NamespaceBinding>,
}

/// Outcome of one admission stage.
enum StageOutcome<'a> {
    /// Candidate continues, possibly transformed.
    Keep(Candidate<'a>),
    /// Candidate is excluded.
    Exclude(ExclusionReason, String),
}

/// Inputs shared by every stage.
struct StageContext<'a> {
    /// Static tables.
    tables: &'a CapabilityTables,
    /// Policy snapshot.
    policy: &'a PolicySnapshot,
}

/// Signature of an admission stage.
type StageFn = for<'a> fn(Candidate<'a>, &StageContext<'_>) -> StageOutcome<'a>;

/// Returns the implementation of an admission stage.
const fn admission_stage(stage: FilterStage) -> Option<StageFn> {
    match stage {
        FilterStage::ReadOnly => Some(read_only_stage),
        FilterStage::DeniedRegex => Some(denied_regex_stage),
        FilterStage::Scope => Some(scope_stage),
        FilterStage::Availability => Some(availability_stage),
        FilterStage::ActionDenial => Some(action_denial_stage),
        FilterStage::TierParameters => Some(tier_parameter_stage),
        FilterStage::NamespacePin => Some(namespace_pin_stage),
        FilterStage::DescriptionOverride | FilterStage::CrossReference => None,
    }
}

/// Read-only stage.
fn read_only_stage<'a>(candidate: Candidate<'a>, ctx: &StageContext<'_>) -> StageOutcome<'a> {
    if ctx.policy.read_only && candidate.operation.mutates_remote_state {
        return StageOutcome::Exclude(
            ExclusionReason::ReadOnly,
            "mutates remote state in read-only mode".to_string(),
        );
    }
    StageOutcome::Keep(candidate)
}

/// Deny-pattern stage.
fn denied_regex_stage<'a>(candidate: Candidate<'a>, ctx: &StageContext<'_>) -> StageOutcome<'a> {
    match ctx.policy.deny.operation_pattern() {
        Some(pattern) if pattern.is_match(candidate.operation.name.as_str()) => {
            StageOutcome::Exclude(
                ExclusionReason::DeniedRegex,
                format!("name matches deny pattern `{}`", pattern.as_str()),
            )
        }
        _ => StageOutcome::Keep(candidate),
    }
}

/// Scope stage; skipped while scopes are unknown.
fn scope_stage<'a>(candidate: Candidate<'a>, ctx: &StageContext<'_>) -> StageOutcome<'a> {
    let Some(connected) = &ctx.policy.scopes else {
        return StageOutcome::Keep(candidate);
    };
    let name = candidate.operation.name.as_str();
    if ctx.tables.scopes.allows(name, connected) {
        return StageOutcome::Keep(candidate);
    }
    let required = ctx
        .tables
        .scopes
        .get(name)
        .map(|requirement| join_labels(requirement.scopes().iter().map(ScopeToken::as_str)))
        .unwrap_or_default();
    let held = join_labels(connected.iter().map(ScopeToken::as_str));
    StageOutcome::Exclude(
        ExclusionReason::InsufficientScope,
        format!("requires one of [{required}], connected [{held}]"),
    )
}

/// Availability stage.
fn availability_stage<'a>(candidate: Candidate<'a>, ctx: &StageContext<'_>) -> StageOutcome<'a> {
    let decision = evaluate_availability(
        &ctx.tables.availability,
        candidate.operation.name.as_str(),
        &ctx.policy.target,
        ctx.policy.unknown_operations,
    );
    match decision {
        AvailabilityDecision::Denied(denial) => {
            StageOutcome::Exclude(ExclusionReason::TierOrVersion, denial.to_string())
        }
        AvailabilityDecision::Allowed
        | AvailabilityDecision::AllowedPending => StageOutcome::Keep(candidate),
    }
}

/// Action-denial stage.
fn action_denial_stage<'a>(
    mut candidate: Candidate<'a>,
    ctx: &StageContext<'_>,
) -> StageOutcome<'a> {
    match filter_actions(&ctx.policy.deny, &candidate.operation.name, &candidate.schema) {
        ActionFilter::Unchanged => StageOutcome::Keep(candidate),
        ActionFilter::Narrowed {
            schema,
            removed,
        } => {
            candidate.schema = schema;
            candidate.removed_actions = removed;
            StageOutcome::Keep(candidate)
        }
        ActionFilter::AllDenied => {
            let actions = join_labels(
                candidate.schema.action_names().into_iter().map(ActionName::as_str),
            );
            StageOutcome::Exclude(
                ExclusionReason::AllActionsDenied,
                format!("all actions denied: {actions}"),
            )
        }
    }
}

/// Tier-parameter stage; never excludes.
fn tier_parameter_stage<'a>(
    mut candidate: Candidate<'a>,
    ctx: &StageContext<'_>,
) -> StageOutcome<'a> {
    let (schema, stripped) = strip_tier_parameters(
        &ctx.tables.tier_parameters,
        candidate.operation.name.as_str(),
        candidate.schema,
        &ctx.policy.target,
    );
    candidate.schema = schema;
    candidate.stripped_parameters = stripped;
    StageOutcome::Keep(candidate)
}

/// Namespace-pin stage; never excludes.
fn namespace_pin_stage<'a>(
    mut candidate: Candidate<'a>,
    ctx: &StageContext<'_>,
) -> StageOutcome<'a> {
    if let Some(binding) = &ctx.policy.namespace
        && candidate.schema.has_parameter(&binding.parameter)
        && candidate.schema.discriminator() != Some(binding.parameter.as_str())
    {
        candidate.schema = candidate.schema.without_parameter(&binding.parameter, None);
        candidate.pinned = Some(binding.clone());
    }
    StageOutcome::Keep(candidate)
}

/// Joins labels for detail messages.
fn join_labels<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    labels.collect::<Vec<_>>().join(", ")
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Runs the admission stages for a single operation.
///
/// # Errors
///
/// Returns the [`Exclusion`] recorded by the first failing stage.
fn admit<'a>(
    operation: &'a Operation,
    ctx: &StageContext<'_>,
) -> Result<Candidate<'a>, Exclusion> {
    let mut candidate = Candidate {
        operation,
        schema: operation.schema.clone(),
        removed_actions: Vec::new(),
        stripped_parameters: Vec::new(),
        pinned: None,
    };
    for stage in FILTER_STAGES {
        let Some(run) = admission_stage(stage) else {
            continue;
        };
        candidate = match run(candidate, ctx) {
            StageOutcome::Keep(next) => next,
            StageOutcome::Exclude(reason, detail) => {
                return Err(Exclusion {
                    operation: operation.name.clone(),
                    reason,
                    detail,
                });
            }
        };
    }
    Ok(candidate)
}

/// Returns the exclusion reason for one operation, or `None` when admitted.
///
/// Cheaper than [`run_pipeline`] for single-operation checks; description
/// stages are skipped since they never exclude.
#[must_use]
pub fn exclusion_for(
    operation: &Operation,
    tables: &CapabilityTables,
    policy: &PolicySnapshot,
) -> Option<Exclusion> {
    let ctx = StageContext {
        tables,
        policy,
    };
    admit(operation, &ctx).err()
}

/// Derives the catalog from raw operations and a policy snapshot.
#[must_use]
pub fn run_pipeline(
    operations: &[Operation],
    tables: &CapabilityTables,
    policy: &PolicySnapshot,
) -> PipelineOutput {
    let ctx = StageContext {
        tables,
        policy,
    };
    let mut admitted = Vec::new();
    let mut exclusions = Vec::new();
    for operation in operations {
        match admit(operation, &ctx) {
            Ok(candidate) => admitted.push(candidate),
            Err(exclusion) => exclusions.push(exclusion),
        }
    }
    let survivors: BTreeSet<&str> =
        admitted.iter().map(|candidate| candidate.operation.name.as_str()).collect();
    let derived = admitted
        .into_iter()
        .map(|candidate| finish(candidate, &survivors, policy))
        .collect::<Vec<_>>();
    let statistics = FilterStatistics::from_ledger(operations.len(), &exclusions);
    PipelineOutput {
        operations: derived,
        exclusions,
        statistics,
    }
}

/// Applies description stages and freezes the candidate.
fn finish(
    candidate: Candidate<'_>,
    survivors: &BTreeSet<&str>,
    policy: &PolicySnapshot,
) -> DerivedOperation {
    let operation = candidate.operation;
    let (description, description_overridden) =
        match policy.description_overrides.get(operation.name.as_str()) {
            Some(text) => (text.clone(), true),
            None => {
                let resolved = resolve_description(
                    &operation.description,
                    policy.cross_references,
                    survivors,
                );
                (resolved, false)
            }
        };
    DerivedOperation {
        name: operation.name.clone(),
        description,
        schema: candidate.schema,
        mutates_remote_state: operation.mutates_remote_state,
        removed_actions: candidate.removed_actions,
        stripped_parameters: candidate.stripped_parameters,
        pinned: candidate.pinned,
        description_overridden,
        handler: Arc::clone(&operation.handler),
    }
}

/// Resolves cross-references against the survivor set.
fn resolve_description(
    description: &str,
    mode: CrossReferenceMode,
    survivors: &BTreeSet<&str>,
) -> String {
    resolve_cross_references(description, mode, |name| survivors.contains(name))
}
