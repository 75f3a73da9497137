// crates/capgate-config/src/lib.rs
// ============================================================================
// Module: Capability Gate Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for capgate.toml semantics.
// Dependencies: capgate-core, regex, serde, toml
// ============================================================================

//! ## Overview
//! `capgate-config` defines the canonical configuration model for
//! Capability Gate. It provides strict, fail-closed validation and resolves
//! presets into the policy inputs consumed by the registry.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
