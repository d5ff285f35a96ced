use std::time::Duration;

use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::{getpgid, Pid};
use tokio::process::Command;
use tracing::debug;

const TREE_KILL_GRACE: Duration = Duration::from_millis(300);

/// Return the user's default shell from `$SHELL`, falling back to `sh`.
fn user_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "sh".to_string())
}

pub fn shell_command(command: &str) -> Command {
    let shell = user_shell();
    let mut cmd = Command::new(&shell);
    // Login shell (-l) sources the user's profile/rc files so that
    // PATH and other environment customisations are available.
    cmd.arg("-l").arg("-c").arg(command);
    cmd
}

fn is_process_alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

pub async fn kill_process_tree(pid: u32) {
    let root = Pid::from_raw(pid as i32);

    if !is_process_alive(pid) {
        debug!(pid, "process already gone, nothing to kill");
        return;
    }

    match getpgid(Some(root)) {
        Ok(pgid) if pgid == root => {
            debug!(pid, "sending SIGTERM to process group");
            let _ = killpg(pgid, Signal::SIGTERM);
        }
        _ => {
            // Not a group leader: walk the tree via the parent-pid query and
            // terminate each descendant individually, deepest first.
            for child in descendant_pids(pid).await.into_iter().rev() {
                debug!(pid = child, "sending SIGTERM to descendant");
                let _ = kill(Pid::from_raw(child as i32), Signal::SIGTERM);
            }
        }
    }

    let _ = kill(root, Signal::SIGTERM);
    tokio::time::sleep(TREE_KILL_GRACE).await;
}

/// Collect every transitive child of `root` via `pgrep -P`.
async fn descendant_pids(root: u32) -> Vec<u32> {
    let mut found = Vec::new();
    let mut queue = vec![root];
    while let Some(pid) = queue.pop() {
        let output = Command::new("pgrep")
            .arg("-P")
            .arg(pid.to_string())
            .output()
            .await;
        let Ok(output) = output else { continue };
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            if let Ok(child) = line.trim().parse::<u32>() {
                found.push(child);
                queue.push(child);
            }
        }
    }
    found
}
