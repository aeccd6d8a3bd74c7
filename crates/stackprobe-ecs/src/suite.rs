//! The ECS Fargate + ALB validation suite.
//!
//! Four checks run against an [`EcsContext`]: the service exists and is
//! healthy, it is wired to the load balancer, at least one task reaches
//! RUNNING, and the application answers through the ALB.

use std::sync::Arc;

use async_trait::async_trait;
use stackprobe_core::{
    ensure, ensure_contains, ensure_eq, ensure_not_empty, fail, Check, CheckError, CheckResult,
    Clock, HarnessError, PollPolicy, Poller, StackContext, Suite, TokioClock,
};
use tracing::{debug, info};

use crate::inspector::ResourceInspector;
use crate::probes::{probe_running_tasks, EndpointProbe};

pub const ECS_CLUSTER_NAME: &str = "ecs_cluster_name";
pub const SERVICE_NAME: &str = "service_name";
pub const SERVICE_ARN: &str = "service_arn";
pub const TARGET_GROUP_ARN: &str = "target_group_arn";
pub const ALB_ARN: &str = "alb_arn";
pub const TASK_DEFINITION_ARN: &str = "task_definition_arn";
pub const ALB_DNS_NAME: &str = "alb_dns_name";

/// Every stack output the suite reads.
pub const OUTPUT_KEYS: &[&str] = &[
    ECS_CLUSTER_NAME,
    SERVICE_NAME,
    SERVICE_ARN,
    TARGET_GROUP_ARN,
    ALB_ARN,
    TASK_DEFINITION_ARN,
    ALB_DNS_NAME,
];

pub const TEST_ECS_SERVICE_CREATED: &str = "TestECSServiceCreated";
pub const TEST_ECS_SERVICE_ATTACHED_TO_ALB: &str = "TestECSServiceAttachedToALB";
pub const TEST_ECS_TASK_CREATED: &str = "TestECSTaskCreated";
pub const TEST_APP_ACCESSIBLE_FROM_ALB: &str = "TestAppAccessibleFromALB";

pub const DEFAULT_SUITE_NAME: &str = "Terraform AWS ECS Fargate Service Tests";

const FARGATE: &str = "FARGATE";

/// Shared, read-only state handed to every check.
pub struct EcsContext {
    stack: StackContext,
    inspector: Arc<dyn ResourceInspector>,
    endpoint: EndpointProbe,
    clock: Arc<dyn Clock>,
    task_policy: PollPolicy,
    endpoint_policy: PollPolicy,
    endpoint_override: Option<String>,
}

impl EcsContext {
    pub fn new(
        stack: StackContext,
        inspector: Arc<dyn ResourceInspector>,
        endpoint: EndpointProbe,
    ) -> Self {
        Self {
            stack,
            inspector,
            endpoint,
            clock: Arc::new(TokioClock),
            task_policy: PollPolicy::default(),
            endpoint_policy: PollPolicy::default(),
            endpoint_override: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_task_policy(mut self, policy: PollPolicy) -> Self {
        self.task_policy = policy;
        self
    }

    pub fn with_endpoint_policy(mut self, policy: PollPolicy) -> Self {
        self.endpoint_policy = policy;
        self
    }

    /// Probe this URL instead of `http://<alb_dns_name>`.
    pub fn with_endpoint_override(mut self, url: impl Into<String>) -> Self {
        self.endpoint_override = Some(url.into());
        self
    }

    pub fn stack(&self) -> &StackContext {
        &self.stack
    }

    /// URL the accessibility check polls.
    pub fn endpoint_url(&self) -> Result<String, CheckError> {
        if let Some(url) = &self.endpoint_override {
            return Ok(url.clone());
        }
        let dns_name = self.stack.output(ALB_DNS_NAME)?;
        ensure_not_empty(dns_name, "ALB DNS name should not be empty")?;
        Ok(format!("http://{}", dns_name))
    }

    fn poller(&self, label: &str) -> Poller {
        Poller::with_clock(label, self.clock.clone())
    }
}

/// Service exists, is ACTIVE on Fargate, and matches the stack outputs.
pub struct ServiceCreated;

#[async_trait]
impl Check<EcsContext> for ServiceCreated {
    async fn run(&self, ctx: &EcsContext) -> CheckResult {
        let cluster = ctx.stack.output(ECS_CLUSTER_NAME)?;
        let service_name = ctx.stack.output(SERVICE_NAME)?;
        let service_arn = ctx.stack.output(SERVICE_ARN)?;

        ensure_not_empty(cluster, "ECS cluster name should not be empty")?;
        ensure_not_empty(service_name, "ECS service name should not be empty")?;
        ensure_not_empty(service_arn, "ECS service ARN should not be empty")?;

        let service = ctx.inspector.describe_service(cluster, service_name).await?;

        ensure_eq(service_name, service.service_name.as_str(), "Service name should match")?;
        ensure_eq(service_arn, service.service_arn.as_str(), "Service ARN should match")?;
        ensure_eq("ACTIVE", service.status.as_str(), "Service should be active")?;
        ensure_eq(
            &Some(FARGATE),
            &service.launch_type.as_deref(),
            "Service should use Fargate launch type",
        )?;
        ensure(
            service.desired_count > 0,
            "Service should have desired count > 0",
        )?;

        info!(
            service = %service.service_name,
            status = %service.status,
            desired = service.desired_count,
            running = service.running_count,
            "ECS service verified"
        );
        Ok(())
    }
}

/// Service registers with the target group, which hangs off the ALB.
pub struct ServiceAttachedToAlb;

#[async_trait]
impl Check<EcsContext> for ServiceAttachedToAlb {
    async fn run(&self, ctx: &EcsContext) -> CheckResult {
        let cluster = ctx.stack.output(ECS_CLUSTER_NAME)?;
        let service_name = ctx.stack.output(SERVICE_NAME)?;
        let target_group_arn = ctx.stack.output(TARGET_GROUP_ARN)?;
        let alb_arn = ctx.stack.output(ALB_ARN)?;

        ensure_not_empty(target_group_arn, "Target group ARN should not be empty")?;
        ensure_not_empty(alb_arn, "ALB ARN should not be empty")?;

        let service = ctx.inspector.describe_service(cluster, service_name).await?;
        let binding = match service.load_balancers.first() {
            Some(binding) => binding,
            None => return fail("Service should have load balancer configuration"),
        };

        ensure_eq(
            &Some(target_group_arn),
            &binding.target_group_arn.as_deref(),
            "Target group ARN should match",
        )?;
        ensure_not_empty(
            binding.container_name.as_deref().unwrap_or_default(),
            "Container name should be specified",
        )?;
        ensure(
            binding.container_port.unwrap_or(0) > 0,
            "Container port should be > 0",
        )?;

        let target_group = ctx.inspector.describe_target_group(target_group_arn).await?;
        ensure(
            !target_group.load_balancer_arns.is_empty(),
            "Target group should be attached to load balancer",
        )?;
        ensure(
            target_group.load_balancer_arns.iter().any(|arn| arn == alb_arn),
            "Target group should be attached to the specified ALB",
        )?;

        info!(
            service = %service_name,
            target_group = %target_group.target_group_name,
            "ECS service ALB attachment verified"
        );
        Ok(())
    }
}

/// At least one task reaches RUNNING on Fargate with the expected definition.
pub struct TaskCreated;

#[async_trait]
impl Check<EcsContext> for TaskCreated {
    async fn run(&self, ctx: &EcsContext) -> CheckResult {
        let cluster = ctx.stack.output(ECS_CLUSTER_NAME)?;
        let service_name = ctx.stack.output(SERVICE_NAME)?;
        let task_definition = ctx.stack.output(TASK_DEFINITION_ARN)?;

        ensure_not_empty(task_definition, "Task definition ARN should not be empty")?;

        let inspector = ctx.inspector.as_ref();
        let running = ctx
            .poller("ecs.tasks")
            .poll(&ctx.task_policy, move || {
                probe_running_tasks(inspector, cluster, service_name)
            })
            .await
            .into_result()?;

        for task in &running {
            ensure_eq(
                &Some(FARGATE),
                &task.launch_type.as_deref(),
                "Task should use Fargate launch type",
            )?;
            let task_definition_arn = task.task_definition_arn.as_deref().unwrap_or_default();
            ensure_not_empty(task_definition_arn, "Task should have task definition ARN")?;
            ensure_contains(
                task_definition_arn,
                task_definition,
                "Task should use the correct task definition",
            )?;
            ensure(!task.containers.is_empty(), "Task should have containers")?;
            for container in &task.containers {
                if let Some(status) = &container.last_status {
                    debug!(container = %container.name, status = %status, "container status");
                }
            }
        }

        info!(running = running.len(), "ECS tasks verified");
        Ok(())
    }
}

/// The application answers 2xx/3xx through the ALB with a `Server` header.
pub struct AppAccessibleFromAlb;

#[async_trait]
impl Check<EcsContext> for AppAccessibleFromAlb {
    async fn run(&self, ctx: &EcsContext) -> CheckResult {
        let url = ctx.endpoint_url()?;
        let target = url.as_str();
        let endpoint = &ctx.endpoint;

        let response = ctx
            .poller("alb.endpoint")
            .poll(&ctx.endpoint_policy, move || endpoint.probe(target))
            .await
            .into_result()?;

        info!(url = %url, status = response.status, "application accessible via ALB");
        ensure(
            response
                .server
                .as_deref()
                .map_or(false, |server| !server.trim().is_empty()),
            "Response should have Server header",
        )
    }
}

/// The four ECS checks, in execution order.
pub fn ecs_suite(name: impl Into<String>) -> Result<Suite<EcsContext>, HarnessError> {
    Suite::new(name)
        .with_check(TEST_ECS_SERVICE_CREATED, ServiceCreated)?
        .with_check(TEST_ECS_SERVICE_ATTACHED_TO_ALB, ServiceAttachedToAlb)?
        .with_check(TEST_ECS_TASK_CREATED, TaskCreated)?
        .with_check(TEST_APP_ACCESSIBLE_FROM_ALB, AppAccessibleFromAlb)
}
