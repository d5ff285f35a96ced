use tokio::process::Command;

#[cfg(unix)]
mod unix;

#[cfg(unix)]
use unix as imp;

/// Create a shell command: `$SHELL -l -c <command>`, falling back to `sh`.
pub fn shell_command(command: &str) -> Command {
    imp::shell_command(command)
}

/// Terminate a process and all of its descendants. A no-op when the root
/// pid is already gone.
///
/// Sends TERM to the process group when the root pid leads one; otherwise
/// walks children via the OS parent-pid query and kills each subtree, then
/// the root pid. Sleeps the 300 ms grace period before returning.
pub async fn kill_process_tree(pid: u32) {
    imp::kill_process_tree(pid).await
}

/// Expand leading `~` or `$HOME` in a path string to the actual home directory.
///
/// Returns the original string unchanged when no home directory is available
/// or the string doesn't start with `~` or `$HOME`.
pub fn expand_home(path: &str) -> String {
    if let Some(home) = std::env::var_os("HOME") {
        let home = home.to_string_lossy();
        if path == "~" || path == "$HOME" {
            return home.to_string();
        }
        if let Some(rest) = path.strip_prefix("~/") {
            return format!("{}/{}", home, rest);
        }
        if let Some(rest) = path.strip_prefix("$HOME/") {
            return format!("{}/{}", home, rest);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_home_tilde_slash() {
        let home = std::env::var("HOME").unwrap();
        assert_eq!(expand_home("~/bin/cmd"), format!("{}/bin/cmd", home));
    }

    #[test]
    fn expand_home_bare_tilde() {
        let home = std::env::var("HOME").unwrap();
        assert_eq!(expand_home("~"), home);
    }

    #[test]
    fn expand_home_dollar_home() {
        let home = std::env::var("HOME").unwrap();
        assert_eq!(expand_home("$HOME/projects"), format!("{}/projects", home));
    }

    #[test]
    fn expand_home_no_expansion_needed() {
        assert_eq!(expand_home("/usr/bin/cmd"), "/usr/bin/cmd");
        assert_eq!(expand_home("relative/path"), "relative/path");
        assert_eq!(expand_home(""), "");
    }

    #[test]
    fn expand_home_tilde_not_at_start() {
        assert_eq!(expand_home("/some/~path"), "/some/~path");
    }
}
