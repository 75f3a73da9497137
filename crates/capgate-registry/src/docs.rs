// crates/capgate-registry/src/docs.rs
// ============================================================================
// Module: Capability Documentation
// Description: Per-operation metadata for documentation tooling.
// Purpose: Describe every provider operation with its static requirements.
// Dependencies: capgate-core, serde
// ============================================================================

//! ## Overview
//! Documentation is generated from the unfiltered catalog so that it lists
//! every operation regardless of the caller's credential or target. Each
//! entry joins the operation with its availability, scope, and tier-gated
//! parameter rows from the static tables.

// ============================================================================
// SECTION: Imports
// ============================================================================

use capgate_core::OperationName;
use capgate_core::ScopeToken;
use capgate_core::TargetVersion;
use capgate_core::Tier;
use serde::Serialize;

use crate::registry::CapabilityRegistry;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Tier-gated parameter row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatedParameterDoc {
    /// Parameter name.
    pub parameter: String,
    /// Minimum tier exposing the parameter.
    pub min_tier: Tier,
    /// Action the gate applies to; all actions when `None`.
    pub action: Option<String>,
}

/// Documentation entry for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityDoc {
    /// Operation name.
    pub name: OperationName,
    /// Original description.
    pub description: String,
    /// Discriminator values; empty for flat schemas.
    pub actions: Vec<String>,
    /// Whether the operation mutates remote state.
    pub mutates_remote_state: bool,
    /// Minimum target version, if gated.
    pub min_version: Option<TargetVersion>,
    /// Minimum target tier, if gated.
    pub min_tier: Option<Tier>,
    /// Availability note.
    pub note: Option<String>,
    /// Acceptable scopes; `None` when unrestricted.
    pub scopes: Option<Vec<ScopeToken>>,
    /// Tier-gated parameters.
    pub gated_parameters: Vec<GatedParameterDoc>,
}

// ============================================================================
// SECTION: Generation
// ============================================================================

/// Returns documentation entries for every provider operation.
#[must_use]
pub fn capability_docs(registry: &CapabilityRegistry) -> Vec<CapabilityDoc> {
    let tables = registry.tables();
    registry
        .raw_operations()
        .iter()
        .map(|operation| {
            let name = operation.name.as_str();
            let availability = tables.availability.get(name);
            CapabilityDoc {
                name: operation.name.clone(),
                description: operation.description.clone(),
                actions: operation
                    .schema
                    .action_names()
                    .into_iter()
                    .map(|action| action.as_str().to_string())
                    .collect(),
                mutates_remote_state: operation.mutates_remote_state,
                min_version: availability.map(|requirement| requirement.min_version),
                min_tier: availability.map(|requirement| requirement.min_tier),
                note: availability.and_then(|requirement| requirement.note.clone()),
                scopes: tables
                    .scopes
                    .get(name)
                    .map(|requirement| requirement.scopes().iter().cloned().collect()),
                gated_parameters: tables
                    .tier_parameters
                    .get(name)
                    .iter()
                    .map(|gate| GatedParameterDoc {
                        parameter: gate.parameter.clone(),
                        min_tier: gate.min_tier,
                        action: gate.action.as_ref().map(|action| action.as_str().to_string()),
                    })
                    .collect(),
            }
        })
        .collect()
}

/// Renders documentation entries as Markdown.
#[must_use]
pub fn capability_docs_markdown(docs: &[CapabilityDoc]) -> String {
    let mut out = String::new();
    out.push_str("# Capabilities\n\n");
    out.push_str("| Operation | Mutates | Min version | Min tier | Scopes |\n");
    out.push_str("| --- | --- | --- | --- | --- |\n");
    for doc in docs {
        out.push_str("| ");
        out.push_str(doc.name.as_str());
        out.push_str(" | ");
        out.push_str(if doc.mutates_remote_state { "yes" } else { "no" });
        out.push_str(" | ");
        out.push_str(&doc.min_version.map_or_else(|| "-".to_string(), |version| version.to_string()));
        out.push_str(" | ");
        out.push_str(doc.min_tier.map_or("-", Tier::as_str));
        out.push_str(" | ");
        out.push_str(&doc.scopes.as_ref().map_or_else(
            || "any".to_string(),
            |scopes| scopes.iter().map(ScopeToken::as_str).collect::<Vec<_>>().join(", "),
        ));
        out.push_str(" |\n");
    }
    out.push('\n');
    for doc in docs {
        out.push_str("## ");
        out.push_str(doc.name.as_str());
        out.push_str("\n\n");
        out.push_str(&doc.description);
        out.push_str("\n\n");
        if !doc.actions.is_empty() {
            out.push_str("Actions: ");
            out.push_str(&doc.actions.join(", "));
            out.push_str("\n\n");
        }
        if let Some(note) = &doc.note {
            out.push_str("Note: ");
            out.push_str(note);
            out.push_str("\n\n");
        }
        for gate in &doc.gated_parameters {
            out.push_str("- `");
            out.push_str(&gate.parameter);
            out.push_str("` requires tier ");
            out.push_str(gate.min_tier.as_str());
            if let Some(action) = &gate.action {
                out.push_str(" (action `");
                out.push_str(action);
                out.push_str("`)");
            }
            out.push('\n');
        }
        if !doc.gated_parameters.is_empty() {
            out.push('\n');
        }
    }
    out
}
