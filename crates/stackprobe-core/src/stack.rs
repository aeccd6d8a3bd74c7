//! Provisioning collaborator, read-only stack context, and the scoped
//! apply → run → destroy guard.

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;

use crate::error::{HarnessError, ProvisionError};
use crate::obs::{emit_stack_phase, emit_teardown_error};

/// Narrow surface over the tool that provisions the stack under test.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn apply(&self) -> Result<(), ProvisionError>;

    async fn destroy(&self) -> Result<(), ProvisionError>;

    /// Look up one output; `OutputNotFound` when the key is absent.
    async fn output(&self, key: &str) -> Result<String, ProvisionError>;
}

/// Snapshot of the provisioned stack, shared read-only by all checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackContext {
    region: String,
    outputs: BTreeMap<String, String>,
}

impl StackContext {
    pub fn new(region: impl Into<String>, outputs: BTreeMap<String, String>) -> Self {
        Self {
            region: region.into(),
            outputs,
        }
    }

    /// Read the declared `keys` from the provisioner.
    ///
    /// Missing keys are left out so only checks that need them fail; any
    /// other provisioner error aborts loading.
    pub async fn load<P>(
        provisioner: &P,
        region: impl Into<String>,
        keys: &[String],
    ) -> Result<Self, ProvisionError>
    where
        P: Provisioner + ?Sized,
    {
        let mut outputs = BTreeMap::new();
        for key in keys {
            match provisioner.output(key).await {
                Ok(value) => {
                    outputs.insert(key.clone(), value);
                }
                Err(ProvisionError::OutputNotFound { key }) => {
                    tracing::warn!(output = %key, "stack output missing");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(Self::new(region, outputs))
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn output(&self, key: &str) -> Result<&str, ProvisionError> {
        self.outputs
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ProvisionError::OutputNotFound {
                key: key.to_string(),
            })
    }

    pub fn outputs(&self) -> &BTreeMap<String, String> {
        &self.outputs
    }
}

/// How [`with_stack`] sets up and releases the stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackOptions {
    pub region: String,
    pub output_keys: Vec<String>,
    /// Leave the stack in place after the run.
    pub keep_stack: bool,
}

impl StackOptions {
    pub fn new<K: AsRef<str>>(region: impl Into<String>, output_keys: &[K]) -> Self {
        Self {
            region: region.into(),
            output_keys: output_keys.iter().map(|k| k.as_ref().to_string()).collect(),
            keep_stack: false,
        }
    }

    pub fn keep_stack(mut self, keep: bool) -> Self {
        self.keep_stack = keep;
        self
    }
}

/// Apply the stack, hand its context to `body`, and destroy it on every
/// exit path.
///
/// A setup failure still attempts a best-effort destroy and returns the
/// setup error. A teardown failure is logged and returned only when
/// nothing failed before it. A panic in `body` is re-raised after teardown.
pub async fn with_stack<P, F, Fut, T>(
    provisioner: &P,
    options: &StackOptions,
    body: F,
) -> Result<T, HarnessError>
where
    P: Provisioner + ?Sized,
    F: FnOnce(StackContext) -> Fut,
    Fut: Future<Output = T>,
{
    try_with_stack(provisioner, options, |context| {
        let run = body(context);
        async move { Ok::<T, HarnessError>(run.await) }
    })
    .await
}

/// [`with_stack`] for a fallible body.
///
/// An error from `body` wins over a teardown error; the teardown error is
/// still logged.
pub async fn try_with_stack<P, F, Fut, T, E>(
    provisioner: &P,
    options: &StackOptions,
    body: F,
) -> Result<T, HarnessError>
where
    P: Provisioner + ?Sized,
    F: FnOnce(StackContext) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<HarnessError>,
{
    emit_stack_phase("apply");
    if let Err(err) = provisioner.apply().await {
        release(provisioner, options).await.ok();
        return Err(HarnessError::Setup(err));
    }

    let context = match StackContext::load(provisioner, options.region.clone(), &options.output_keys)
        .await
    {
        Ok(context) => context,
        Err(err) => {
            release(provisioner, options).await.ok();
            return Err(HarnessError::Setup(err));
        }
    };

    emit_stack_phase("run");
    let result = AssertUnwindSafe(body(context)).catch_unwind().await;
    let teardown = release(provisioner, options).await;

    match result {
        Ok(Ok(value)) => {
            teardown.map_err(HarnessError::Teardown)?;
            Ok(value)
        }
        Ok(Err(err)) => Err(err.into()),
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

async fn release<P>(provisioner: &P, options: &StackOptions) -> Result<(), ProvisionError>
where
    P: Provisioner + ?Sized,
{
    if options.keep_stack {
        tracing::info!(event = "stack.kept", "skipping destroy; stack left in place");
        return Ok(());
    }

    emit_stack_phase("destroy");
    provisioner.destroy().await.map_err(|err| {
        emit_teardown_error(&err);
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_lookup() {
        let mut outputs = BTreeMap::new();
        outputs.insert("service_name".to_string(), "web".to_string());
        let ctx = StackContext::new("ap-southeast-1", outputs);

        assert_eq!(ctx.output("service_name").expect("present"), "web");
        assert!(matches!(
            ctx.output("alb_arn"),
            Err(ProvisionError::OutputNotFound { key }) if key == "alb_arn"
        ));
        assert_eq!(ctx.region(), "ap-southeast-1");
    }

    #[test]
    fn test_options_from_str_keys() {
        let options = StackOptions::new("us-east-1", &["a", "b"]).keep_stack(true);
        assert_eq!(options.output_keys, vec!["a".to_string(), "b".to_string()]);
        assert!(options.keep_stack);
    }
}
