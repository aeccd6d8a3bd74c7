//! ECS Fargate + ALB collaborators and checks for stackprobe
//!
//! - `terraform`: provisions the stack and reads its outputs
//! - `inspector`: typed ECS / ELBv2 descriptions via the `aws` CLI
//! - `probes`: single-attempt probes for the convergence poller
//! - `suite`: the four service, load balancer, task and endpoint checks

pub mod fakes;
pub mod inspector;
pub mod probes;
pub mod suite;
pub mod terraform;

pub use inspector::{
    classify_cli_error, AwsCliInspector, ContainerDescription, LoadBalancerBinding,
    ResourceInspector, ServiceDescription, TargetGroupDescription, TaskDescription,
};
pub use probes::{is_success_status, probe_running_tasks, EndpointProbe, EndpointResponse};
pub use suite::{
    ecs_suite, AppAccessibleFromAlb, EcsContext, ServiceAttachedToAlb, ServiceCreated,
    TaskCreated, DEFAULT_SUITE_NAME, OUTPUT_KEYS,
};
pub use terraform::{parse_output, TerraformProvisioner, RETRYABLE_ERRORS};
