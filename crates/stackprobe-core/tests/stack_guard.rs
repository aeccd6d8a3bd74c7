//! Scoped apply → run → destroy guarantees with an in-memory provisioner.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use futures::FutureExt;
use stackprobe_core::fakes::MemoryProvisioner;
use stackprobe_core::{
    try_with_stack, with_stack, HarnessError, ProvisionError, ReportError, StackOptions,
};

fn options() -> StackOptions {
    StackOptions::new("ap-southeast-1", &["ecs_cluster_name", "alb_dns_name"])
}

#[tokio::test]
async fn body_receives_loaded_outputs_and_stack_is_destroyed() {
    let provisioner = MemoryProvisioner::new()
        .with_output("ecs_cluster_name", "demo-cluster")
        .with_output("alb_dns_name", "demo-alb.example.internal");

    let cluster = with_stack(&provisioner, &options(), |ctx| async move {
        assert_eq!(ctx.region(), "ap-southeast-1");
        ctx.output("ecs_cluster_name").map(str::to_string)
    })
    .await
    .expect("harness ok")
    .expect("output present");

    assert_eq!(cluster, "demo-cluster");
    assert_eq!(
        provisioner.calls(),
        vec![
            "apply",
            "output:ecs_cluster_name",
            "output:alb_dns_name",
            "destroy"
        ]
    );
}

#[tokio::test]
async fn missing_output_fails_only_the_lookup() {
    let provisioner = MemoryProvisioner::new().with_output("ecs_cluster_name", "demo-cluster");

    let lookup = with_stack(&provisioner, &options(), |ctx| async move {
        ctx.output("alb_dns_name").map(str::to_string)
    })
    .await
    .expect("harness ok");

    assert!(matches!(lookup, Err(ProvisionError::OutputNotFound { .. })));
    assert_eq!(provisioner.calls().last().map(String::as_str), Some("destroy"));
}

#[tokio::test]
async fn setup_failure_still_attempts_teardown() {
    let provisioner = MemoryProvisioner::new().failing_apply("Error: creating ECS Service");
    let mut ran = false;

    let result = with_stack(&provisioner, &options(), |_ctx| {
        ran = true;
        async {}
    })
    .await;

    assert!(matches!(result, Err(HarnessError::Setup(_))));
    assert!(!ran, "body must not run when setup fails");
    assert_eq!(provisioner.calls(), vec!["apply", "destroy"]);
}

#[tokio::test]
async fn setup_error_is_not_masked_by_teardown_error() {
    let provisioner = MemoryProvisioner::new()
        .failing_apply("apply exploded")
        .failing_destroy("destroy exploded");

    let err = with_stack(&provisioner, &options(), |_ctx| async {})
        .await
        .expect_err("setup fails");

    let msg = err.to_string();
    assert!(matches!(err, HarnessError::Setup(_)));
    assert!(msg.contains("apply exploded"));
    assert!(!msg.contains("destroy exploded"));
}

#[tokio::test]
async fn teardown_failure_after_successful_body_is_reported() {
    let provisioner = MemoryProvisioner::new().failing_destroy("DependencyViolation");

    let err = with_stack(&provisioner, &options(), |_ctx| async { 7 })
        .await
        .expect_err("teardown fails");

    assert!(matches!(err, HarnessError::Teardown(_)));
}

#[tokio::test]
async fn body_error_is_not_masked_by_teardown_error() {
    let provisioner = MemoryProvisioner::new().failing_destroy("DependencyViolation");

    let err = try_with_stack(&provisioner, &options(), |_ctx| async {
        Err::<(), _>(ReportError::Io {
            path: PathBuf::from("reports/test-report.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    })
    .await
    .expect_err("body fails");

    assert!(matches!(err, HarnessError::Report(ReportError::Io { .. })));
    assert!(err.to_string().contains("test-report.json"));
    assert!(!err.to_string().contains("DependencyViolation"));
    assert_eq!(provisioner.calls().last().map(String::as_str), Some("destroy"));
}

#[tokio::test]
async fn fallible_body_value_is_returned_after_teardown() {
    let provisioner = MemoryProvisioner::new();

    let value = try_with_stack(&provisioner, &options(), |_ctx| async {
        Ok::<_, HarnessError>("report")
    })
    .await
    .expect("harness ok");

    assert_eq!(value, "report");
    assert_eq!(provisioner.calls().last().map(String::as_str), Some("destroy"));
}

#[tokio::test]
async fn keep_stack_skips_destroy() {
    let provisioner = MemoryProvisioner::new();
    let options = options().keep_stack(true);

    with_stack(&provisioner, &options, |_ctx| async {})
        .await
        .expect("harness ok");

    assert!(!provisioner.calls().iter().any(|c| c == "destroy"));
}

#[tokio::test]
async fn panic_in_body_still_destroys_then_propagates() {
    let provisioner = MemoryProvisioner::new();

    let outcome = AssertUnwindSafe(with_stack(&provisioner, &options(), |_ctx| async {
        panic!("driver bug");
    }))
    .catch_unwind()
    .await;

    assert!(outcome.is_err(), "panic should propagate to the caller");
    assert_eq!(provisioner.calls().last().map(String::as_str), Some("destroy"));
}
