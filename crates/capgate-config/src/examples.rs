// crates/capgate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for Capability Gate configuration. The example parses
//! and validates against [`crate::CapgateConfig`].

/// Returns a canonical example `capgate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[policy]
read_only = false
denied_operations_regex = "^manage_(wiki|label)$"
denied_actions = ["manage_merge_request:merge", "manage_issue:delete"]
cross_references = "rewrite"

[policy.description_overrides]
browse_projects = "List projects visible to the connected account."

[availability]
unknown_operations = "allow_if_recent"
recency_floor = "15.0"

[[presets]]
name = "reviewer"
read_only = true

[[presets]]
name = "maintainer"
denied_actions = ["manage_project:delete"]

[session]
default_preset = "maintainer"
# namespace_scope = "group/project"
namespace_parameter = "project_id"

[introspection]
base_url = "https://gitlab.example.com"
credential_kind = "personal_access_token"
connect_timeout_ms = 2000
request_timeout_ms = 5000
expiry_warning_days = 7
scope_filter_warning_percent = 30

[audit]
enabled = true
# path = "/var/log/capgate/audit.jsonl"
log_exclusions = false
"#,
    )
}
