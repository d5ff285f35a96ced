//! Port over the local container runtime.
//!
//! Like the supervisor port, the core sees only this interface; the
//! production implementation shells out to the docker CLI.

pub mod cli;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::Result;

/// Everything needed to run one container.
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    pub project: String,
    pub service: String,
    pub image: String,
    pub ports: Vec<String>,
    /// (volume name, path inside the container) pairs.
    pub volumes: Vec<(String, String)>,
    pub networks: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub command: Option<String>,
}

/// The subset of `inspect` output the core consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub status: String,
    pub networks: Vec<String>,
    pub created: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
}

/// One row of `ps -a`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
}

pub trait ContainerPort {
    /// Run the container and wait for the runtime command to complete.
    fn start_container(
        &self,
        wire_name: &str,
        spec: &ContainerSpec,
    ) -> impl std::future::Future<Output = Result<()>>;

    /// Spawn the runtime command without waiting; returns the spawned pid so
    /// the caller can persist it.
    fn start_container_async(
        &self,
        wire_name: &str,
        spec: &ContainerSpec,
    ) -> impl std::future::Future<Output = Result<u32>>;

    /// Force-remove the container so the next start never collides on name.
    fn stop_container(&self, wire_name: &str) -> impl std::future::Future<Output = Result<()>>;

    fn container_info(
        &self,
        wire_name: &str,
    ) -> impl std::future::Future<Output = Result<Option<ContainerInfo>>>;

    fn list_containers(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ContainerSummary>>>;

    /// Idempotent; an already-existing volume is not an error.
    fn create_volume(&self, name: &str) -> impl std::future::Future<Output = Result<()>>;

    fn show_logs(
        &self,
        wire_name: &str,
        follow: bool,
    ) -> impl std::future::Future<Output = Result<()>>;
}
