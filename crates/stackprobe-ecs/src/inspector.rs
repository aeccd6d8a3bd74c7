//! Resource-description collaborator for ECS services and ALB target groups.
//!
//! Defines the `ResourceInspector` async trait plus the minimal typed
//! descriptions the suite checks need, and an implementation backed by the
//! `aws` CLI (`--output json`).

use std::process::Stdio;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stackprobe_core::ResourceError;
use tokio::process::Command;
use tracing::debug;

// ---------------------------------------------------------------------------
// Descriptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerBinding {
    pub target_group_arn: Option<String>,
    pub container_name: Option<String>,
    pub container_port: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescription {
    pub service_name: String,
    pub service_arn: String,
    pub status: String,
    #[serde(default)]
    pub launch_type: Option<String>,
    #[serde(default)]
    pub desired_count: i32,
    #[serde(default)]
    pub running_count: i32,
    #[serde(default)]
    pub load_balancers: Vec<LoadBalancerBinding>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDescription {
    pub name: String,
    #[serde(default)]
    pub last_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescription {
    pub task_arn: String,
    #[serde(default)]
    pub last_status: Option<String>,
    #[serde(default)]
    pub launch_type: Option<String>,
    #[serde(default)]
    pub task_definition_arn: Option<String>,
    #[serde(default)]
    pub containers: Vec<ContainerDescription>,
}

impl TaskDescription {
    pub fn is_running(&self) -> bool {
        self.last_status.as_deref() == Some("RUNNING")
    }
}

/// ELBv2 responses use PascalCase keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetGroupDescription {
    pub target_group_arn: String,
    #[serde(default)]
    pub target_group_name: String,
    #[serde(default)]
    pub load_balancer_arns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Inspector trait
// ---------------------------------------------------------------------------

/// Read-only queries against the deployed resources.
#[async_trait]
pub trait ResourceInspector: Send + Sync {
    async fn describe_service(
        &self,
        cluster: &str,
        service: &str,
    ) -> Result<ServiceDescription, ResourceError>;

    async fn list_tasks(&self, cluster: &str, service: &str) -> Result<Vec<String>, ResourceError>;

    async fn describe_tasks(
        &self,
        cluster: &str,
        task_arns: &[String],
    ) -> Result<Vec<TaskDescription>, ResourceError>;

    async fn describe_target_group(&self, arn: &str)
        -> Result<TargetGroupDescription, ResourceError>;
}

// ---------------------------------------------------------------------------
// AWS CLI implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct DescribeServicesResponse {
    #[serde(default)]
    services: Vec<ServiceDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTasksResponse {
    #[serde(default)]
    task_arns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DescribeTasksResponse {
    #[serde(default)]
    tasks: Vec<TaskDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeTargetGroupsResponse {
    #[serde(default)]
    target_groups: Vec<TargetGroupDescription>,
}

/// Inspector that shells out to the `aws` CLI.
#[derive(Debug, Clone)]
pub struct AwsCliInspector {
    binary: String,
    region: String,
}

impl AwsCliInspector {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            binary: "aws".to_string(),
            region: region.into(),
        }
    }

    /// Use a different `aws` executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    async fn query<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, ResourceError> {
        debug!(binary = %self.binary, args = ?args, "aws query");
        let output = Command::new(&self.binary)
            .args(args)
            .args(["--region", self.region.as_str(), "--output", "json"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ResourceError::Client(format!("failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_cli_error(stderr.trim()));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ResourceError::Transport(format!("unexpected aws output: {}", e)))
    }
}

#[async_trait]
impl ResourceInspector for AwsCliInspector {
    async fn describe_service(
        &self,
        cluster: &str,
        service: &str,
    ) -> Result<ServiceDescription, ResourceError> {
        let response: DescribeServicesResponse = self
            .query(&[
                "ecs",
                "describe-services",
                "--cluster",
                cluster,
                "--services",
                service,
            ])
            .await?;
        single(response.services, || format!("service {} in cluster {}", service, cluster))
    }

    async fn list_tasks(&self, cluster: &str, service: &str) -> Result<Vec<String>, ResourceError> {
        let response: ListTasksResponse = self
            .query(&[
                "ecs",
                "list-tasks",
                "--cluster",
                cluster,
                "--service-name",
                service,
            ])
            .await?;
        Ok(response.task_arns)
    }

    async fn describe_tasks(
        &self,
        cluster: &str,
        task_arns: &[String],
    ) -> Result<Vec<TaskDescription>, ResourceError> {
        if task_arns.is_empty() {
            return Ok(Vec::new());
        }
        let mut args = vec!["ecs", "describe-tasks", "--cluster", cluster, "--tasks"];
        args.extend(task_arns.iter().map(String::as_str));
        let response: DescribeTasksResponse = self.query(&args).await?;
        Ok(response.tasks)
    }

    async fn describe_target_group(
        &self,
        arn: &str,
    ) -> Result<TargetGroupDescription, ResourceError> {
        let response: DescribeTargetGroupsResponse = self
            .query(&["elbv2", "describe-target-groups", "--target-group-arns", arn])
            .await?;
        single(response.target_groups, || format!("target group {}", arn))
    }
}

/// Expect exactly one item in a describe response.
fn single<T>(mut items: Vec<T>, what: impl FnOnce() -> String) -> Result<T, ResourceError> {
    match items.len() {
        1 => Ok(items.remove(0)),
        0 => Err(ResourceError::NotFound(what())),
        n => Err(ResourceError::Malformed(format!(
            "expected exactly one {}, got {}",
            what(),
            n
        ))),
    }
}

/// Map `aws` CLI stderr onto the resource error taxonomy.
pub fn classify_cli_error(stderr: &str) -> ResourceError {
    const UNAUTHORIZED: &[&str] = &[
        "AccessDenied",
        "Unauthorized",
        "UnrecognizedClientException",
        "ExpiredToken",
        "InvalidClientTokenId",
        "Unable to locate credentials",
    ];
    const MALFORMED: &[&str] = &[
        "ValidationError",
        "ValidationException",
        "InvalidParameter",
        "Invalid ARN",
        "is not a valid",
    ];
    const NOT_FOUND: &[&str] = &[
        "ClusterNotFoundException",
        "ServiceNotFoundException",
        "TargetGroupNotFound",
        "NotFound",
    ];

    let message = stderr.to_string();
    if UNAUTHORIZED.iter().any(|m| stderr.contains(m)) {
        ResourceError::Unauthorized(message)
    } else if MALFORMED.iter().any(|m| stderr.contains(m)) {
        ResourceError::Malformed(message)
    } else if NOT_FOUND.iter().any(|m| stderr.contains(m)) {
        ResourceError::NotFound(message)
    } else {
        ResourceError::Transport(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_cli_errors() {
        assert!(matches!(
            classify_cli_error("An error occurred (AccessDeniedException) when calling"),
            ResourceError::Unauthorized(_)
        ));
        assert!(matches!(
            classify_cli_error("An error occurred (InvalidParameterException): Invalid ARN"),
            ResourceError::Malformed(_)
        ));
        assert!(matches!(
            classify_cli_error("An error occurred (ValidationException) when calling"),
            ResourceError::Malformed(_)
        ));
        assert!(matches!(
            classify_cli_error("An error occurred (ClusterNotFoundException)"),
            ResourceError::NotFound(_)
        ));
        assert!(matches!(
            classify_cli_error("Connection reset by peer"),
            ResourceError::Transport(_)
        ));
    }

    #[test]
    fn test_parse_describe_services_response() {
        let raw = r#"{
            "services": [{
                "serviceArn": "arn:aws:ecs:ap-southeast-1:123:service/demo/web",
                "serviceName": "web",
                "status": "ACTIVE",
                "launchType": "FARGATE",
                "desiredCount": 2,
                "runningCount": 1,
                "loadBalancers": [{
                    "targetGroupArn": "arn:aws:elasticloadbalancing:tg/web",
                    "containerName": "app",
                    "containerPort": 8080
                }]
            }],
            "failures": []
        }"#;

        let response: DescribeServicesResponse = serde_json::from_str(raw).expect("parse");
        let service = single(response.services, || "service".to_string()).expect("one");
        assert_eq!(service.service_name, "web");
        assert_eq!(service.launch_type.as_deref(), Some("FARGATE"));
        assert_eq!(service.desired_count, 2);
        assert_eq!(service.load_balancers[0].container_port, Some(8080));
    }

    #[test]
    fn test_missing_service_is_not_found() {
        let response: DescribeServicesResponse =
            serde_json::from_str(r#"{"services": [], "failures": [{"reason": "MISSING"}]}"#)
                .expect("parse");
        let err = single(response.services, || "service web".to_string()).expect_err("none");
        assert!(matches!(err, ResourceError::NotFound(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_parse_target_groups_pascal_case() {
        let raw = r#"{"TargetGroups": [{
            "TargetGroupArn": "arn:tg",
            "TargetGroupName": "web-tg",
            "LoadBalancerArns": ["arn:alb"]
        }]}"#;
        let response: DescribeTargetGroupsResponse = serde_json::from_str(raw).expect("parse");
        assert_eq!(response.target_groups[0].load_balancer_arns, vec!["arn:alb"]);
    }

    #[test]
    fn test_task_running_state() {
        let task = TaskDescription {
            task_arn: "arn:task".to_string(),
            last_status: Some("RUNNING".to_string()),
            ..Default::default()
        };
        assert!(task.is_running());
        assert!(!TaskDescription::default().is_running());
    }

    #[tokio::test]
    async fn test_missing_binary_is_fatal_client_error() {
        let inspector = AwsCliInspector::new("ap-southeast-1")
            .with_binary("/nonexistent/stackprobe-aws-cli");
        let err = inspector
            .list_tasks("demo", "web")
            .await
            .expect_err("binary does not exist");
        assert!(matches!(err, ResourceError::Client(_)));
        assert!(!err.is_retryable());
    }
}
