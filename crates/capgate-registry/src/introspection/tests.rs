// crates/capgate-registry/src/introspection/tests.rs
// ============================================================================
// Module: Credential Introspection Unit Tests
// Description: Unit tests for wire decoding and date handling.
// Purpose: Validate token payload conversion without a network.
// Dependencies: serde_json, time
// ============================================================================

//! ## Overview
//! Decodes captured payload shapes into [`super::CredentialInfo`].

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use capgate_config::CredentialKind;
use capgate_core::ScopeToken;
use serde_json::json;
use time::Month;

use super::IntrospectionError;
use super::MetadataResponse;
use super::OauthTokenInfoResponse;
use super::PersonalAccessTokenResponse;
use super::parse_date;

// ============================================================================
// SECTION: Personal Access Tokens
// ============================================================================

#[test]
fn personal_access_token_payload_decodes_scopes_and_expiry() {
    let payload = json!({
        "id": 4,
        "name": "automation",
        "revoked": false,
        "created_at": "2026-01-10T14:31:47.729Z",
        "scopes": ["read_api", "read_repository"],
        "user_id": 3,
        "last_used_at": "2026-10-01T17:58:37.550Z",
        "active": true,
        "expires_at": "2026-12-01"
    });
    let response: PersonalAccessTokenResponse = serde_json::from_value(payload).unwrap();
    let credential = response.into_credential().unwrap();
    assert_eq!(credential.kind, CredentialKind::PersonalAccessToken);
    assert_eq!(credential.name.as_deref(), Some("automation"));
    assert!(credential.scopes.contains(&ScopeToken::new("read_api")));
    assert_eq!(credential.scopes.len(), 2);
    let expires = credential.expires_on.unwrap();
    assert_eq!((expires.year(), expires.month(), expires.day()), (2026, Month::December, 1));
    assert!(credential.last_used_at.is_some());
}

#[test]
fn personal_access_token_without_expiry_never_expires() {
    let payload = json!({ "scopes": ["api"], "active": true, "expires_at": null });
    let response: PersonalAccessTokenResponse = serde_json::from_value(payload).unwrap();
    assert_eq!(response.into_credential().unwrap().expires_on, None);
}

#[test]
fn revoked_personal_access_token_is_unauthorized() {
    let payload = json!({ "scopes": ["api"], "active": false, "revoked": true });
    let response: PersonalAccessTokenResponse = serde_json::from_value(payload).unwrap();
    let err = response.into_credential().unwrap_err();
    assert_eq!(err.code(), "unauthorized");
}

#[test]
fn malformed_expiry_is_invalid_response() {
    let payload = json!({ "scopes": ["api"], "expires_at": "next tuesday" });
    let response: PersonalAccessTokenResponse = serde_json::from_value(payload).unwrap();
    assert!(matches!(response.into_credential(), Err(IntrospectionError::InvalidResponse(_))));
}

// ============================================================================
// SECTION: OAuth Tokens
// ============================================================================

#[test]
fn oauth_token_info_derives_expiry_from_issue_time() {
    // 2026-10-18T00:00:00Z plus two days.
    let payload = json!({
        "resource_owner_id": 1,
        "scope": ["api", "read_user"],
        "expires_in": 172_800,
        "created_at": 1_792_281_600
    });
    let response: OauthTokenInfoResponse = serde_json::from_value(payload).unwrap();
    let credential = response.into_credential();
    assert_eq!(credential.kind, CredentialKind::Oauth);
    assert_eq!(credential.scopes.len(), 2);
    let expires = credential.expires_on.unwrap();
    assert_eq!((expires.year(), expires.month(), expires.day()), (2026, Month::October, 20));
}

#[test]
fn oauth_token_info_accepts_plural_scopes_field() {
    let payload = json!({ "scopes": ["read_api"], "expires_in": null });
    let response: OauthTokenInfoResponse = serde_json::from_value(payload).unwrap();
    let credential = response.into_credential();
    assert!(credential.scopes.contains(&ScopeToken::new("read_api")));
    assert_eq!(credential.expires_on, None);
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

#[test]
fn parse_date_rejects_extra_components_and_invalid_days() {
    assert!(parse_date("2026-02-28").is_some());
    assert!(parse_date("2026-02-30").is_none());
    assert!(parse_date("2026-02-28-01").is_none());
    assert!(parse_date("2026-13-01").is_none());
}

// ============================================================================
// SECTION: Instance Metadata
// ============================================================================

#[test]
fn metadata_enterprise_flag_wins_over_version_suffix() {
    let payload = json!({ "version": "17.2.1-ee", "revision": "abc", "enterprise": false });
    let metadata: MetadataResponse = serde_json::from_value(payload).unwrap();
    assert!(!metadata.is_enterprise());
}

#[test]
fn legacy_version_payload_infers_edition_from_suffix() {
    let enterprise: MetadataResponse =
        serde_json::from_value(json!({ "version": "14.9.0-EE", "revision": "abc" })).unwrap();
    assert!(enterprise.is_enterprise());
    let community: MetadataResponse =
        serde_json::from_value(json!({ "version": "14.9.0", "revision": "abc" })).unwrap();
    assert!(!community.is_enterprise());
}
