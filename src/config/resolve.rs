use std::path::{Path, PathBuf};

const CONFIG_NAMES: [&str; 2] = ["zapper.yml", "zapper.yaml"];

/// Walk up the directory tree from `start`, checking for a config file at
/// each level. Returns the full path if found.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in CONFIG_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Resolve the config file path. If `cli_file` is provided, verify it exists
/// and return it. Otherwise search from the current working directory upward.
pub fn resolve_config(cli_file: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(path) = cli_file {
        if path.is_file() {
            return Ok(path.canonicalize()?);
        }
        anyhow::bail!("Config file not found: {}", path.display());
    }

    let cwd = std::env::current_dir()?;
    find_config(&cwd).ok_or_else(|| {
        anyhow::anyhow!(
            "No zapper.yml found in {} or any parent directory",
            cwd.display()
        )
    })
}
