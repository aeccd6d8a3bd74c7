//! Check authoring: the [`Check`] trait, named suites, and the minimal
//! pass/fail/skip vocabulary used inside checks.

use std::collections::HashSet;
use std::fmt::Debug;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{CheckError, HarnessError};

/// Result of running one check body.
///
/// `Ok(())` passes, `Err(CheckError::Skipped(_))` skips, anything else fails.
pub type CheckResult = Result<(), CheckError>;

/// A single validation executed against a shared, read-only context.
#[async_trait]
pub trait Check<C>: Send + Sync {
    async fn run(&self, ctx: &C) -> CheckResult;
}

/// Adapter turning a plain function into a [`Check`].
pub struct FnCheck<F>(F);

#[async_trait]
impl<C, F> Check<C> for FnCheck<F>
where
    C: Sync,
    F: for<'a> Fn(&'a C) -> BoxFuture<'a, CheckResult> + Send + Sync,
{
    async fn run(&self, ctx: &C) -> CheckResult {
        (self.0)(ctx).await
    }
}

/// Wrap a plain function as a [`Check`].
pub fn check_fn<F>(f: F) -> FnCheck<F> {
    FnCheck(f)
}

/// A check paired with its report name.
pub struct NamedCheck<C> {
    name: String,
    check: Box<dyn Check<C>>,
}

impl<C> NamedCheck<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self) -> &dyn Check<C> {
        self.check.as_ref()
    }
}

/// Ordered batch of uniquely named checks.
pub struct Suite<C> {
    name: String,
    checks: Vec<NamedCheck<C>>,
    names: HashSet<String>,
}

impl<C> Suite<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            checks: Vec::new(),
            names: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a check; names must be unique within the suite.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        check: impl Check<C> + 'static,
    ) -> Result<(), HarnessError> {
        let name = name.into();
        if !self.names.insert(name.clone()) {
            return Err(HarnessError::DuplicateCheck(name));
        }
        self.checks.push(NamedCheck {
            name,
            check: Box::new(check),
        });
        Ok(())
    }

    /// Append a function-backed check.
    pub fn add_fn<F>(&mut self, name: impl Into<String>, f: F) -> Result<(), HarnessError>
    where
        C: Sync,
        F: for<'a> Fn(&'a C) -> BoxFuture<'a, CheckResult> + Send + Sync + 'static,
    {
        self.add(name, check_fn(f))
    }

    /// Builder form of [`Suite::add`].
    pub fn with_check(
        mut self,
        name: impl Into<String>,
        check: impl Check<C> + 'static,
    ) -> Result<Self, HarnessError> {
        self.add(name, check)?;
        Ok(self)
    }

    pub fn checks(&self) -> &[NamedCheck<C>] {
        &self.checks
    }

    pub fn names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

// ── assertion vocabulary ──────────────────────────────────────────────────

/// Fail unconditionally.
pub fn fail(message: impl Into<String>) -> CheckResult {
    Err(CheckError::Assertion(message.into()))
}

/// Skip the current check.
pub fn skip(reason: impl Into<String>) -> CheckResult {
    Err(CheckError::Skipped(reason.into()))
}

/// Fail with `message` unless `condition` holds.
pub fn ensure(condition: bool, message: impl Into<String>) -> CheckResult {
    if condition {
        Ok(())
    } else {
        fail(message)
    }
}

/// Fail unless `expected == actual`, naming both values.
pub fn ensure_eq<T>(expected: &T, actual: &T, message: impl Into<String>) -> CheckResult
where
    T: PartialEq + Debug + ?Sized,
{
    if expected == actual {
        Ok(())
    } else {
        fail(format!(
            "{}: expected {:?}, got {:?}",
            message.into(),
            expected,
            actual
        ))
    }
}

/// Fail when `value` is empty.
pub fn ensure_not_empty(value: &str, message: impl Into<String>) -> CheckResult {
    ensure(!value.trim().is_empty(), message)
}

/// Fail unless `haystack` contains `needle`.
pub fn ensure_contains(haystack: &str, needle: &str, message: impl Into<String>) -> CheckResult {
    if haystack.contains(needle) {
        Ok(())
    } else {
        fail(format!(
            "{}: {:?} does not contain {:?}",
            message.into(),
            haystack,
            needle
        ))
    }
}
