//! In-memory [`ResourceInspector`] for tests.
//!
//! Task listings are scripted as a sequence of rounds: each `list_tasks`
//! call consumes one round and the final round repeats, so convergence
//! ("PENDING, PENDING, RUNNING") can be simulated without a cluster.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use stackprobe_core::ResourceError;

use crate::inspector::{
    ContainerDescription, ResourceInspector, ServiceDescription, TargetGroupDescription,
    TaskDescription,
};

type TaskRound = Result<Vec<TaskDescription>, ResourceError>;

#[derive(Debug, Default)]
pub struct MemoryInspector {
    services: HashMap<(String, String), ServiceDescription>,
    service_error: Option<ResourceError>,
    target_groups: HashMap<String, TargetGroupDescription>,
    task_rounds: Mutex<VecDeque<TaskRound>>,
    current_tasks: Mutex<Vec<TaskDescription>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, cluster: impl Into<String>, service: ServiceDescription) -> Self {
        self.services
            .insert((cluster.into(), service.service_name.clone()), service);
        self
    }

    /// Make every `describe_service` call fail.
    pub fn failing_describe_service(mut self, err: ResourceError) -> Self {
        self.service_error = Some(err);
        self
    }

    pub fn with_target_group(mut self, target_group: TargetGroupDescription) -> Self {
        self.target_groups
            .insert(target_group.target_group_arn.clone(), target_group);
        self
    }

    /// Append one `list_tasks` round.
    pub fn with_task_round(self, tasks: Vec<TaskDescription>) -> Self {
        self.task_rounds.lock().unwrap_or_else(PoisonError::into_inner).push_back(Ok(tasks));
        self
    }

    /// Append a `list_tasks` round that fails.
    pub fn with_task_error(self, err: ResourceError) -> Self {
        self.task_rounds.lock().unwrap_or_else(PoisonError::into_inner).push_back(Err(err));
        self
    }

    /// Calls received so far, e.g. `["describe_service:web", "list_tasks:web"]`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    fn next_round(&self) -> TaskRound {
        let mut rounds = self.task_rounds.lock().unwrap_or_else(PoisonError::into_inner);
        if rounds.len() > 1 {
            rounds.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        } else {
            rounds.front().cloned().unwrap_or_else(|| Ok(Vec::new()))
        }
    }
}

#[async_trait]
impl ResourceInspector for MemoryInspector {
    async fn describe_service(
        &self,
        cluster: &str,
        service: &str,
    ) -> Result<ServiceDescription, ResourceError> {
        self.record(format!("describe_service:{}", service));
        if let Some(err) = &self.service_error {
            return Err(err.clone());
        }
        self.services
            .get(&(cluster.to_string(), service.to_string()))
            .cloned()
            .ok_or_else(|| {
                ResourceError::NotFound(format!("service {} in cluster {}", service, cluster))
            })
    }

    async fn list_tasks(&self, _cluster: &str, service: &str) -> Result<Vec<String>, ResourceError> {
        self.record(format!("list_tasks:{}", service));
        let tasks = self.next_round()?;
        let arns = tasks.iter().map(|t| t.task_arn.clone()).collect();
        *self.current_tasks.lock().unwrap_or_else(PoisonError::into_inner) = tasks;
        Ok(arns)
    }

    async fn describe_tasks(
        &self,
        _cluster: &str,
        task_arns: &[String],
    ) -> Result<Vec<TaskDescription>, ResourceError> {
        self.record(format!("describe_tasks:{}", task_arns.len()));
        let current = self.current_tasks.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(current
            .iter()
            .filter(|t| task_arns.contains(&t.task_arn))
            .cloned()
            .collect())
    }

    async fn describe_target_group(
        &self,
        arn: &str,
    ) -> Result<TargetGroupDescription, ResourceError> {
        self.record(format!("describe_target_group:{}", arn));
        self.target_groups
            .get(arn)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(format!("target group {}", arn)))
    }
}

/// A Fargate task with a single `app` container in the given state.
pub fn fargate_task(arn: &str, status: &str, task_definition_arn: &str) -> TaskDescription {
    TaskDescription {
        task_arn: arn.to_string(),
        last_status: Some(status.to_string()),
        launch_type: Some("FARGATE".to_string()),
        task_definition_arn: Some(task_definition_arn.to_string()),
        containers: vec![ContainerDescription {
            name: "app".to_string(),
            last_status: Some(status.to_string()),
        }],
    }
}
