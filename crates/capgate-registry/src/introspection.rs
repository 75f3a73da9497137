// crates/capgate-registry/src/introspection.rs
// ============================================================================
// Module: Credential Introspection
// Description: Queries the target system for the credential's current grants.
// Purpose: Feed scope changes into the registry without blocking callers.
// Dependencies: async-trait, capgate-config, capgate-core, reqwest, time
// ============================================================================

//! ## Overview
//! A [`CredentialIntrospector`] resolves the scopes, expiry, and kind of the
//! configured credential plus the identity it belongs to. The HTTP backend
//! speaks the GitLab REST surface: personal access tokens via
//! `/api/v4/personal_access_tokens/self`, OAuth tokens via
//! `/oauth/token/info`, and identity via `/api/v4/user`. The target's
//! version comes from `/api/v4/metadata` (falling back to `/api/v4/version`
//! on older instances); enterprise instances read their plan from
//! `/api/v4/license`, and any plan that cannot be read resolves to the base
//! tier.
//! Requests are bounded by connect and total timeouts and never retried.
//! Security posture: responses are untrusted; malformed payloads fail the
//! introspection and leave the last-known scopes in place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use capgate_config::CredentialKind;
use capgate_config::IntrospectionConfig;
use capgate_core::ScopeToken;
use capgate_core::TargetInfo;
use capgate_core::Tier;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;
use serde::de::DeserializeOwned;
use thiserror::Error;
use time::Date;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Personal access token self-introspection endpoint.
const PERSONAL_ACCESS_TOKEN_PATH: &str = "/api/v4/personal_access_tokens/self";
/// OAuth token info endpoint.
const OAUTH_TOKEN_INFO_PATH: &str = "/oauth/token/info";
/// Authenticated user endpoint.
const CURRENT_USER_PATH: &str = "/api/v4/user";
/// Instance metadata endpoint.
const METADATA_PATH: &str = "/api/v4/metadata";
/// Legacy instance version endpoint.
const VERSION_PATH: &str = "/api/v4/version";
/// Instance license endpoint.
const LICENSE_PATH: &str = "/api/v4/license";

// ============================================================================
// SECTION: Public Types
// ============================================================================

/// Credential metadata reported by the target system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialInfo {
    /// Credential kind.
    pub kind: CredentialKind,
    /// Token display name, when the target reports one.
    pub name: Option<String>,
    /// Granted scopes.
    pub scopes: BTreeSet<ScopeToken>,
    /// Expiry date, if the credential expires.
    #[serde(serialize_with = "serialize_optional_display")]
    pub expires_on: Option<Date>,
    /// Last use reported by the target.
    #[serde(serialize_with = "serialize_optional_display")]
    pub last_used_at: Option<OffsetDateTime>,
}

impl CredentialInfo {
    /// Builds credential info with scopes only.
    #[must_use]
    pub fn with_scopes<I, S>(kind: CredentialKind, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ScopeToken>,
    {
        Self {
            kind,
            name: None,
            scopes: scopes.into_iter().map(Into::into).collect(),
            expires_on: None,
            last_used_at: None,
        }
    }

    /// Sets the expiry date.
    #[must_use]
    pub fn expiring_on(mut self, date: Date) -> Self {
        self.expires_on = Some(date);
        self
    }
}

/// Identity the credential belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Numeric user identifier.
    pub id: u64,
    /// Login name.
    pub username: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// One successful introspection result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSnapshot {
    /// Credential metadata.
    pub credential: CredentialInfo,
    /// Resolved identity; absence is not an error.
    pub identity: Option<Identity>,
    /// Target version and tier; `None` when the target did not report them.
    pub target: Option<TargetInfo>,
}

/// Credential introspection interface.
#[async_trait]
pub trait CredentialIntrospector: Send + Sync {
    /// Queries the target for the credential's current grants.
    ///
    /// # Errors
    ///
    /// Returns [`IntrospectionError`] when the target cannot be queried or
    /// rejects the credential.
    async fn introspect(&self) -> Result<CredentialSnapshot, IntrospectionError>;
}

/// Introspector used when no target is configured.
pub struct NoopCredentialIntrospector;

#[async_trait]
impl CredentialIntrospector for NoopCredentialIntrospector {
    async fn introspect(&self) -> Result<CredentialSnapshot, IntrospectionError> {
        Err(IntrospectionError::Unavailable("credential introspection disabled".to_string()))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Credential introspection failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntrospectionError {
    /// Target unreachable or returned an unexpected status.
    #[error("introspection unavailable: {0}")]
    Unavailable(String),
    /// Credential rejected, revoked, or inactive.
    #[error("credential unauthorized: {0}")]
    Unauthorized(String),
    /// Response payload could not be decoded.
    #[error("invalid introspection response: {0}")]
    InvalidResponse(String),
    /// Request exceeded its time bound.
    #[error("introspection timed out after {0} ms")]
    Timeout(u64),
}

impl IntrospectionError {
    /// Returns a stable error code label.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Unauthorized(_) => "unauthorized",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Timeout(_) => "timeout",
        }
    }
}

// ============================================================================
// SECTION: HTTP Introspector
// ============================================================================

/// GitLab-style HTTP introspector.
pub struct HttpCredentialIntrospector {
    /// Target base URL (no trailing slash).
    base_url: String,
    /// Credential presented as a bearer token.
    token: String,
    /// Credential kind selecting the introspection endpoint.
    kind: CredentialKind,
    /// Total request timeout in milliseconds, reported on timeouts.
    request_timeout_ms: u64,
    /// HTTP client configured with timeouts.
    client: Client,
}

impl HttpCredentialIntrospector {
    /// Builds a new HTTP introspector.
    ///
    /// # Errors
    ///
    /// Returns [`IntrospectionError::Unavailable`] when the HTTP client cannot
    /// be built.
    pub fn new(
        mut base_url: String,
        token: String,
        kind: CredentialKind,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, IntrospectionError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|err| IntrospectionError::Unavailable(err.to_string()))?;
        let trimmed_len = base_url.trim_end_matches('/').len();
        base_url.truncate(trimmed_len);
        Ok(Self {
            base_url,
            token,
            kind,
            request_timeout_ms: u64::try_from(request_timeout.as_millis()).unwrap_or(u64::MAX),
            client,
        })
    }

    /// Builds an introspector from configuration; `None` when no base URL
    /// is configured.
    ///
    /// # Errors
    ///
    /// Returns [`IntrospectionError::Unavailable`] when the HTTP client cannot
    /// be built.
    pub fn from_config(
        config: &IntrospectionConfig,
        token: String,
    ) -> Result<Option<Self>, IntrospectionError> {
        let Some(base_url) = &config.base_url else {
            return Ok(None);
        };
        Self::new(
            base_url.trim().to_string(),
            token,
            config.credential_kind,
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.request_timeout_ms),
        )
        .map(Some)
    }

    /// Builds bearer-auth headers.
    fn build_headers(&self) -> Result<HeaderMap, IntrospectionError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| IntrospectionError::Unauthorized("invalid credential".to_string()))?;
        headers.insert(reqwest::header::AUTHORIZATION, value);
        Ok(headers)
    }

    /// Issues a GET and decodes a JSON body.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, IntrospectionError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(url)
            .headers(self.build_headers()?)
            .send()
            .await
            .map_err(|err| self.transport_error(&err))?;
        match response.status() {
            StatusCode::OK => response
                .json::<T>()
                .await
                .map_err(|err| IntrospectionError::InvalidResponse(err.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(IntrospectionError::Unauthorized(format!("{path} rejected the credential")))
            }
            status => Err(IntrospectionError::Unavailable(format!(
                "{path} returned status {status}"
            ))),
        }
    }

    /// Maps a transport error.
    fn transport_error(&self, err: &reqwest::Error) -> IntrospectionError {
        if err.is_timeout() {
            IntrospectionError::Timeout(self.request_timeout_ms)
        } else {
            IntrospectionError::Unavailable(err.to_string())
        }
    }

    /// Resolves credential metadata for the configured kind.
    async fn credential(&self) -> Result<CredentialInfo, IntrospectionError> {
        match self.kind {
            CredentialKind::PersonalAccessToken => {
                let token: PersonalAccessTokenResponse =
                    self.get_json(PERSONAL_ACCESS_TOKEN_PATH).await?;
                token.into_credential()
            }
            CredentialKind::Oauth => {
                let token: OauthTokenInfoResponse = self.get_json(OAUTH_TOKEN_INFO_PATH).await?;
                Ok(token.into_credential())
            }
        }
    }

    /// Resolves the target's version and tier; `None` when neither version
    /// endpoint answers.
    async fn target(&self) -> Option<TargetInfo> {
        let metadata = match self.get_json::<MetadataResponse>(METADATA_PATH).await {
            Ok(metadata) => metadata,
            Err(_) => self.get_json::<MetadataResponse>(VERSION_PATH).await.ok()?,
        };
        let tier = if metadata.is_enterprise() {
            self.get_json::<LicenseResponse>(LICENSE_PATH)
                .await
                .ok()
                .and_then(|license| license.plan)
                .and_then(|plan| Tier::parse(&plan))
                .unwrap_or(Tier::Base)
        } else {
            Tier::Base
        };
        Some(TargetInfo::from_raw(&metadata.version, tier))
    }
}

#[async_trait]
impl CredentialIntrospector for HttpCredentialIntrospector {
    async fn introspect(&self) -> Result<CredentialSnapshot, IntrospectionError> {
        let credential = self.credential().await?;
        let identity = self.get_json::<Identity>(CURRENT_USER_PATH).await.ok();
        let target = self.target().await;
        Ok(CredentialSnapshot {
            credential,
            identity,
            target,
        })
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// `GET /api/v4/metadata` and `GET /api/v4/version` body.
#[derive(Debug, Deserialize)]
struct MetadataResponse {
    /// Raw version string, e.g. `17.2.1-ee`.
    version: String,
    /// Enterprise flag; absent on the legacy version endpoint.
    #[serde(default)]
    enterprise: Option<bool>,
}

impl MetadataResponse {
    /// Returns true when the instance runs the enterprise edition.
    fn is_enterprise(&self) -> bool {
        self.enterprise.unwrap_or_else(|| self.version.to_ascii_lowercase().ends_with("-ee"))
    }
}

/// `GET /api/v4/license` body.
#[derive(Debug, Deserialize)]
struct LicenseResponse {
    /// Subscription plan name.
    #[serde(default)]
    plan: Option<String>,
}

/// `GET /api/v4/personal_access_tokens/self` body.
#[derive(Debug, Deserialize)]
struct PersonalAccessTokenResponse {
    /// Token name.
    #[serde(default)]
    name: Option<String>,
    /// Granted scopes.
    #[serde(default)]
    scopes: Vec<String>,
    /// Whether the token is usable.
    #[serde(default = "default_active")]
    active: bool,
    /// Whether the token was revoked.
    #[serde(default)]
    revoked: bool,
    /// Expiry date (`YYYY-MM-DD`).
    #[serde(default)]
    expires_at: Option<String>,
    /// Last use (RFC 3339).
    #[serde(default)]
    last_used_at: Option<String>,
}

impl PersonalAccessTokenResponse {
    /// Converts the response into credential info.
    fn into_credential(self) -> Result<CredentialInfo, IntrospectionError> {
        if self.revoked || !self.active {
            return Err(IntrospectionError::Unauthorized("token inactive or revoked".to_string()));
        }
        let expires_on = match self.expires_at.as_deref() {
            Some(value) => Some(parse_date(value).ok_or_else(|| {
                IntrospectionError::InvalidResponse(format!("invalid expires_at: {value}"))
            })?),
            None => None,
        };
        let last_used_at = self
            .last_used_at
            .as_deref()
            .and_then(|value| OffsetDateTime::parse(value, &Rfc3339).ok());
        Ok(CredentialInfo {
            kind: CredentialKind::PersonalAccessToken,
            name: self.name,
            scopes: self.scopes.into_iter().map(ScopeToken::from).collect(),
            expires_on,
            last_used_at,
        })
    }
}

/// `GET /oauth/token/info` body.
#[derive(Debug, Deserialize)]
struct OauthTokenInfoResponse {
    /// Granted scopes.
    #[serde(default, alias = "scopes")]
    scope: Vec<String>,
    /// Seconds until expiry from `created_at`.
    #[serde(default)]
    expires_in: Option<i64>,
    /// Issue time (unix seconds).
    #[serde(default)]
    created_at: Option<i64>,
}

impl OauthTokenInfoResponse {
    /// Converts the response into credential info.
    fn into_credential(self) -> CredentialInfo {
        let expires_on = self
            .created_at
            .zip(self.expires_in)
            .and_then(|(created, ttl)| created.checked_add(ttl))
            .and_then(|expiry| OffsetDateTime::from_unix_timestamp(expiry).ok())
            .map(OffsetDateTime::date);
        CredentialInfo {
            kind: CredentialKind::Oauth,
            name: None,
            scopes: self.scope.into_iter().map(ScopeToken::from).collect(),
            expires_on,
            last_used_at: None,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Default for the token `active` flag.
const fn default_active() -> bool {
    true
}

/// Parses a date-only value (`YYYY-MM-DD`).
fn parse_date(value: &str) -> Option<Date> {
    let mut parts = value.trim().split('-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u8 = parts.next()?.parse().ok()?;
    let day: u8 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let month = time::Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

/// Serializes optional values through their `Display` form.
fn serialize_optional_display<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: std::fmt::Display,
    S: Serializer,
{
    match value {
        Some(value) => serializer.collect_str(value),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests;
