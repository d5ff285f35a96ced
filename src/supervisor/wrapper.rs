//! Wrapper script generation.
//!
//! Every native service runs through a generated shell script that exports
//! the inherited PATH, recolors stderr red so it stands out in the merged
//! log, sources an optional file, and execs the configured command. Scripts
//! are namespaced `<project>.<service>.<timestamp>.sh` under `.zap/`; the
//! timestamp suffix keeps a new start from clobbering a file tail another
//! tool is reading, and prior scripts for the same service are deleted
//! before a new one is written.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;

pub fn zap_dir(project_root: &Path) -> PathBuf {
    project_root.join(".zap")
}

pub fn logs_dir(project_root: &Path) -> PathBuf {
    zap_dir(project_root).join("logs")
}

pub fn log_path(project_root: &Path, project: &str, service: &str) -> PathBuf {
    logs_dir(project_root).join(format!("{project}.{service}.log"))
}

fn script_prefix(project: &str, service: &str) -> String {
    format!("{project}.{service}.")
}

/// Write the wrapper script for one service, removing any prior wrappers
/// for the same (project, service) first. Returns the script path.
pub fn write_wrapper_script(
    project_root: &Path,
    project: &str,
    service: &str,
    cmd: &str,
    source: Option<&Path>,
) -> Result<PathBuf> {
    let dir = zap_dir(project_root);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating {}", dir.display()))?;

    remove_wrapper_scripts(project_root, project, service)?;

    let timestamp = Utc::now().timestamp_millis();
    let path = dir.join(format!("{}{timestamp}.sh", script_prefix(project, service)));

    let inherited_path = std::env::var("PATH").unwrap_or_default();
    let mut script = String::new();
    script.push_str("#!/bin/sh\n");
    script.push_str(&format!("export PATH=\"{inherited_path}\"\n"));
    script.push_str(
        "exec 2> >(while IFS= read -r line; do printf '\\033[31m%s\\033[0m\\n' \"$line\"; done)\n",
    );
    if let Some(source) = source {
        script.push_str(&format!(". \"{}\"\n", source.display()));
    }
    script.push_str(cmd);
    script.push('\n');

    std::fs::write(&path, script)
        .with_context(|| format!("writing wrapper script {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(path)
}

/// Delete every wrapper script for one (project, service) pair.
pub fn remove_wrapper_scripts(project_root: &Path, project: &str, service: &str) -> Result<()> {
    let dir = zap_dir(project_root);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Ok(());
    };
    let prefix = script_prefix(project, service);
    for entry in entries.flatten() {
        let file_name = entry.file_name().to_string_lossy().to_string();
        if file_name.starts_with(&prefix) && file_name.ends_with(".sh") {
            let _ = std::fs::remove_file(entry.path());
        }
    }
    Ok(())
}

/// Delete the merged log file for one (project, service) pair.
pub fn remove_log_file(project_root: &Path, project: &str, service: &str) -> Result<()> {
    let path = log_path(project_root, project, service);
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    Ok(())
}
