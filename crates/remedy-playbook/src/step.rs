//! Step executor interface

use crate::context::{StepContext, StepResources};
use crate::redaction::redact_output;
use async_trait::async_trait;
use remedy_core::StepResult;
use serde_json::Value;

/// One idempotent playbook step
#[async_trait]
pub trait PlaybookStep: Send + Sync {
    /// Stable step id, also the key of this step's output in later inputs
    fn id(&self) -> &'static str;

    /// Top-level output fields allowed to leave the step
    fn output_fields(&self) -> &'static [&'static str];

    /// Pure, stable key: `<stepFamily>:<incidentKey>:<disambiguator>`
    fn idempotency_key(&self, context: &StepContext) -> String;

    /// Run the step; gates fail before any side effect
    async fn execute(&self, resources: &StepResources, context: &StepContext) -> StepResult;

    /// Whether a recorded result for this step's key may be reused
    fn is_reusable(&self, result: &StepResult) -> bool {
        result.success
    }

    /// Successful result carrying only allow-listed output
    fn succeed(&self, output: &Value) -> StepResult {
        StepResult::ok(redact_output(output, self.output_fields()))
    }

    /// Re-apply output redaction to any result
    fn redact(&self, mut result: StepResult) -> StepResult {
        if let Some(output) = result.output.take() {
            result.output = Some(redact_output(&output, self.output_fields()));
        }
        result
    }
}
