use crate::common::*;
use predicates::prelude::*;

#[test]
fn isolate_mints_six_char_id() {
    let project = TestProject::new(MINIMAL);
    let output = project.zap().arg("isolate").assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
    let id = stdout.trim().rsplit(' ').next().unwrap().to_string();
    assert_eq!(id.len(), 6, "unexpected id in {stdout:?}");
    assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));

    let instance = project.instance_json().unwrap();
    assert_eq!(instance["mode"], "isolate");
    assert_eq!(instance["instanceId"], id.as_str());
}

#[test]
fn isolate_is_stable_across_runs() {
    let project = TestProject::new(MINIMAL);
    project.zap().arg("isolate").assert().success();
    let first = project.instance_json().unwrap()["instanceId"].clone();
    project.zap().arg("isolate").assert().success();
    let second = project.instance_json().unwrap()["instanceId"].clone();
    assert_eq!(first, second);
}

#[test]
fn isolate_accepts_explicit_id() {
    let project = TestProject::new(MINIMAL);
    project.zap().args(["isolate", "blue"]).assert().success();
    assert_eq!(project.instance_json().unwrap()["instanceId"], "blue");
}

#[test]
fn worktree_checkout_warns_until_isolated() {
    let project = TestProject::new(MINIMAL);
    std::fs::write(
        project.dir.path().join(".git"),
        "gitdir: /repo/.git/worktrees/feature\n",
    )
    .unwrap();

    // Any config-loading command resolves the instance and emits the warning.
    project
        .zap()
        .arg("profile")
        .assert()
        .success()
        .stdout(predicate::str::contains("WORKTREE"));

    project.zap().arg("isolate").assert().success();
    project
        .zap()
        .arg("profile")
        .assert()
        .success()
        .stdout(predicate::str::contains("WORKTREE").not());
}
