// crates/capgate-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Fixtures
// Description: Shared operations and handlers for capgate-core integration tests.
// Purpose: Build small catalogs without repeating schema boilerplate.
// ============================================================================

#![allow(dead_code, reason = "Each test binary uses a different subset of fixtures.")]

use std::sync::Arc;

use async_trait::async_trait;
use capgate_core::HandlerError;
use capgate_core::ObjectSchema;
use capgate_core::Operation;
use capgate_core::OperationHandler;
use capgate_core::ParamField;
use capgate_core::ParamSchema;
use capgate_core::SchemaBranch;
use capgate_core::TargetInfo;
use capgate_core::TargetState;
use capgate_core::Tier;
use serde_json::Value;
use serde_json::json;

/// Handler returning its arguments.
pub struct EchoHandler;

#[async_trait]
impl OperationHandler for EchoHandler {
    async fn invoke(&self, args: Value) -> Result<Value, HandlerError> {
        Ok(args)
    }
}

/// Builds a read-only flat operation.
pub fn flat_operation(name: &str, description: &str) -> Operation {
    Operation::new(
        name,
        description,
        ParamSchema::Flat(ObjectSchema::new(vec![ParamField::required(
            "project_id",
            json!({ "type": "string" }),
        )])),
        Arc::new(EchoHandler),
    )
}

/// Builds a remote-mutating operation with the given actions.
pub fn action_operation(name: &str, actions: &[&str]) -> Operation {
    let branches = actions
        .iter()
        .map(|action| {
            SchemaBranch::new(
                *action,
                ObjectSchema::new(vec![ParamField::optional("title", json!({ "type": "string" }))]),
            )
        })
        .collect();
    Operation::new(name, format!("Manage {name}."), ParamSchema::actions(branches), Arc::new(EchoHandler))
        .mutating()
}

/// Returns a connected target state.
pub fn connected(version: &str, tier: Tier) -> TargetState {
    TargetState::Connected(TargetInfo::from_raw(version, tier))
}
