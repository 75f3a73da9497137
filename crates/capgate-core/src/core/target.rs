// crates/capgate-core/src/core/target.rs
// ============================================================================
// Module: Target System Metadata
// Description: Version, tier, and connection state of the remote target system.
// Purpose: Provide ordered, lossy-parse version and tier types for gating.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The target system reports a version string (for example `16.3.0-ee`) and
//! an edition tier. Versions collapse to a `major.minor` pair; anything that
//! cannot be parsed ranks as the lowest possible version so gated operations
//! fail closed. Tiers are ordered `base < mid < top`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest minor component that still orders below the next major.
const MAX_MINOR: u32 = 99;

// ============================================================================
// SECTION: Tier
// ============================================================================

/// Ordered edition tier of the target system.
///
/// # Invariants
/// - Ordering is `Base < Mid < Top`; comparisons use [`Tier::rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Entry tier (free edition).
    #[serde(alias = "free")]
    Base,
    /// Middle tier (premium edition).
    #[serde(alias = "premium")]
    Mid,
    /// Top tier (ultimate edition).
    #[serde(alias = "ultimate")]
    Top,
}

impl Tier {
    /// Returns the numeric rank used for comparisons.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Base => 0,
            Self::Mid => 1,
            Self::Top => 2,
        }
    }

    /// Returns true when this tier meets the required tier.
    #[must_use]
    pub const fn satisfies(self, required: Self) -> bool {
        self.rank() >= required.rank()
    }

    /// Returns a stable label for the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Mid => "mid",
            Self::Top => "top",
        }
    }

    /// Parses a tier label, accepting edition aliases.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "base" | "free" | "core" => Some(Self::Base),
            "mid" | "premium" | "starter" => Some(Self::Mid),
            "top" | "ultimate" => Some(Self::Top),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Version
// ============================================================================

/// Target system version collapsed to `major.minor`.
///
/// # Invariants
/// - `minor` is clamped to `0..=99`, so field ordering matches the
///   `major + minor / 100` score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetVersion {
    /// Major version component.
    major: u32,
    /// Minor version component (clamped).
    minor: u32,
}

impl TargetVersion {
    /// Lowest possible version; used for unparsable inputs.
    pub const LOWEST: Self = Self {
        major: 0,
        minor: 0,
    };

    /// Creates a version from components.
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        let minor = if minor > MAX_MINOR { MAX_MINOR } else { minor };
        Self {
            major,
            minor,
        }
    }

    /// Parses a version string strictly, returning `None` when unparsable.
    ///
    /// Accepts `major`, `major.minor`, and longer forms with patch or edition
    /// suffixes (`16.3.0-ee`); only the first two components are kept.
    #[must_use]
    pub fn try_parse(value: &str) -> Option<Self> {
        let trimmed = value.trim().trim_start_matches(['v', 'V']);
        let core = trimmed.split(['-', '+', ' ']).next().unwrap_or_default();
        let mut parts = core.split('.');
        let major = parts.next().filter(|part| !part.is_empty())?.parse::<u32>().ok()?;
        let minor = match parts.next() {
            Some(part) => part.parse::<u32>().ok()?,
            None => 0,
        };
        Some(Self::new(major, minor))
    }

    /// Parses a version string, mapping unparsable input to [`Self::LOWEST`].
    #[must_use]
    pub fn parse_lossy(value: &str) -> Self {
        Self::try_parse(value).unwrap_or(Self::LOWEST)
    }

    /// Returns the comparable score (`major * 100 + minor`).
    #[must_use]
    pub const fn score(self) -> u64 {
        (self.major as u64) * 100 + self.minor as u64
    }

    /// Returns the major component.
    #[must_use]
    pub const fn major(self) -> u32 {
        self.major
    }

    /// Returns the minor component.
    #[must_use]
    pub const fn minor(self) -> u32 {
        self.minor
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

// ============================================================================
// SECTION: Connection State
// ============================================================================

/// Version and tier of a connected target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    /// Connected target version.
    pub version: TargetVersion,
    /// Connected target tier.
    pub tier: Tier,
}

impl TargetInfo {
    /// Builds target info from a raw version string and tier.
    #[must_use]
    pub fn from_raw(version: &str, tier: Tier) -> Self {
        Self {
            version: TargetVersion::parse_lossy(version),
            tier,
        }
    }
}

/// What is currently known about the target system.
///
/// # Invariants
/// - Only [`TargetState::Pending`] is fail-open; [`TargetState::Unknown`]
///   excludes every version/tier-gated decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TargetState {
    /// Credential handshake still in progress; gating is deferred.
    Pending,
    /// Target could not be determined.
    #[default]
    Unknown,
    /// Target version and tier are known.
    Connected(TargetInfo),
}

impl TargetState {
    /// Returns the connected target info, if any.
    #[must_use]
    pub const fn info(&self) -> Option<TargetInfo> {
        match self {
            Self::Connected(info) => Some(*info),
            Self::Pending | Self::Unknown => None,
        }
    }
}
