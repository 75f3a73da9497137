//! Limits validation tests for capgate-config.
// crates/capgate-config/tests/limits_validation.rs
// =============================================================================
// Module: Limits Validation Tests
// Description: Enforcement of size, range, and count limits.
// Purpose: Ensure out-of-range values fail closed.
// =============================================================================

use std::fmt::Write;

use capgate_config::CapgateConfig;
use capgate_config::validate_namespace;

mod common;

use common::assert_invalid;

type TestResult = Result<(), String>;

const MAX_PRESETS: usize = 64;
const MAX_DENIED_ACTIONS: usize = 256;

#[test]
fn connect_timeout_out_of_range_is_rejected() -> TestResult {
    assert_invalid(
        CapgateConfig::parse("[introspection]\nconnect_timeout_ms = 10"),
        "connect_timeout_ms",
    )
}

#[test]
fn request_timeout_below_connect_timeout_is_rejected() -> TestResult {
    assert_invalid(
        CapgateConfig::parse(
            "[introspection]\nconnect_timeout_ms = 5000\nrequest_timeout_ms = 1000",
        ),
        "request_timeout_ms must be >= connect_timeout_ms",
    )
}

#[test]
fn scope_filter_percent_out_of_range_is_rejected() -> TestResult {
    assert_invalid(
        CapgateConfig::parse("[introspection]\nscope_filter_warning_percent = 0"),
        "scope_filter_warning_percent",
    )?;
    assert_invalid(
        CapgateConfig::parse("[introspection]\nscope_filter_warning_percent = 101"),
        "scope_filter_warning_percent",
    )
}

#[test]
fn base_url_requires_http_scheme() -> TestResult {
    assert_invalid(
        CapgateConfig::parse("[introspection]\nbase_url = \"ftp://gitlab.example.com\""),
        "http or https",
    )
}

#[test]
fn too_many_presets_are_rejected() -> TestResult {
    let mut toml = String::new();
    for index in 0 ..= MAX_PRESETS {
        writeln!(toml, "[[presets]]\nname = \"preset-{index}\"\n").map_err(|err| err.to_string())?;
    }
    assert_invalid(CapgateConfig::parse(&toml), "too many presets")
}

#[test]
fn too_many_denied_actions_are_rejected() -> TestResult {
    let entries = (0 ..= MAX_DENIED_ACTIONS)
        .map(|index| format!("\"op_{index}:delete\""))
        .collect::<Vec<_>>()
        .join(", ");
    assert_invalid(
        CapgateConfig::parse(&format!("[policy]\ndenied_actions = [{entries}]")),
        "too many denied_actions",
    )
}

#[test]
fn oversized_config_is_rejected() -> TestResult {
    let padding = "#".repeat(1024 * 1024 + 1);
    assert_invalid(CapgateConfig::parse(&padding), "size limit")
}

#[test]
fn empty_audit_path_is_rejected() -> TestResult {
    assert_invalid(CapgateConfig::parse("[audit]\npath = \"  \""), "audit.path must be non-empty")
}

#[test]
fn namespace_scope_rejects_empty_segments() -> TestResult {
    assert_invalid(validate_namespace("group//project"), "empty segment")?;
    assert_invalid(validate_namespace(""), "must be non-empty")?;
    validate_namespace("group/sub/project").map_err(|err| err.to_string())
}
