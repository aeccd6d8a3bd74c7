//! In-memory fakes for collaborator traits (testing only).
//!
//! `MemoryProvisioner` satisfies [`Provisioner`] without touching any real
//! infrastructure and records every call for assertions.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::ProvisionError;
use crate::stack::Provisioner;

/// Scriptable provisioner backed by a map of outputs.
#[derive(Debug, Default)]
pub struct MemoryProvisioner {
    outputs: BTreeMap<String, String>,
    fail_apply: Option<String>,
    fail_destroy: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl MemoryProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    /// Make `apply` fail with the given stderr.
    pub fn failing_apply(mut self, stderr: impl Into<String>) -> Self {
        self.fail_apply = Some(stderr.into());
        self
    }

    /// Make `destroy` fail with the given stderr.
    pub fn failing_destroy(mut self, stderr: impl Into<String>) -> Self {
        self.fail_destroy = Some(stderr.into());
        self
    }

    /// Calls received so far, e.g. `["apply", "output:alb_arn", "destroy"]`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }
}

#[async_trait]
impl Provisioner for MemoryProvisioner {
    async fn apply(&self) -> Result<(), ProvisionError> {
        self.record("apply".to_string());
        match &self.fail_apply {
            Some(stderr) => Err(ProvisionError::CommandFailed {
                command: "apply".to_string(),
                code: Some(1),
                stderr: stderr.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn destroy(&self) -> Result<(), ProvisionError> {
        self.record("destroy".to_string());
        match &self.fail_destroy {
            Some(stderr) => Err(ProvisionError::CommandFailed {
                command: "destroy".to_string(),
                code: Some(1),
                stderr: stderr.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn output(&self, key: &str) -> Result<String, ProvisionError> {
        self.record(format!("output:{}", key));
        self.outputs
            .get(key)
            .cloned()
            .ok_or_else(|| ProvisionError::OutputNotFound {
                key: key.to_string(),
            })
    }
}
