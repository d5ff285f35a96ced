//! Canonical wire naming: `zap.<project>[.<instance>].<service>`.
//!
//! This is the only module that knows the wire-name format. Everything that
//! talks to the supervisor or the container runtime goes through it.

pub const WIRE_PREFIX: &str = "zap";

/// A wire name decomposed back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireName {
    pub project: String,
    pub instance: Option<String>,
    pub service: String,
}

/// Build the fully qualified name passed to the supervisor / container
/// runtime. The instance segment is inserted only when non-empty.
pub fn build_service_name(project: &str, service: &str, instance: Option<&str>) -> String {
    match instance {
        Some(id) if !id.is_empty() => format!("{WIRE_PREFIX}.{project}.{id}.{service}"),
        _ => format!("{WIRE_PREFIX}.{project}.{service}"),
    }
}

/// Build the project-wide prefix used to recognise this project's entries in
/// supervisor and container listings.
pub fn build_prefix(project: &str, instance: Option<&str>) -> String {
    match instance {
        Some(id) if !id.is_empty() => format!("{WIRE_PREFIX}.{project}.{id}."),
        _ => format!("{WIRE_PREFIX}.{project}."),
    }
}

/// Parse a wire name. Valid only when the first segment is `zap` and there
/// are exactly three or four non-empty segments.
pub fn parse_service_name(wire: &str) -> Option<WireName> {
    let segments: Vec<&str> = wire.split('.').collect();
    if segments[0] != WIRE_PREFIX || segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    match segments.as_slice() {
        [_, project, service] => Some(WireName {
            project: project.to_string(),
            instance: None,
            service: service.to_string(),
        }),
        [_, project, instance, service] => Some(WireName {
            project: project.to_string(),
            instance: Some(instance.to_string()),
            service: service.to_string(),
        }),
        _ => None,
    }
}
