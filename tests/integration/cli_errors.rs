use crate::common::*;
use predicates::prelude::*;

#[test]
fn conflicting_git_flags_rejected() {
    let project = TestProject::new(MINIMAL);
    project
        .zap()
        .args(["--http", "--ssh", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--http and --ssh"));
}

#[test]
fn unknown_service_on_up_fails_with_suggestion() {
    let project = TestProject::new(MINIMAL);
    project
        .zap()
        .args(["up", "aapi"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("no such service")
                .and(predicate::str::contains("api")),
        );
}

#[test]
fn unknown_service_on_logs_fails() {
    let project = TestProject::new(MINIMAL);
    project
        .zap()
        .args(["logs", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no such service"));
}

#[test]
fn unknown_task_fails() {
    let project = TestProject::new(
        r#"
project: shop
native:
  api:
    cmd: "true"
tasks:
  migrate:
    cmds: ["true"]
"#,
    );
    project
        .zap()
        .args(["task", "migrat"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("no such task")
                .and(predicate::str::contains("migrate")),
        );
}

#[test]
fn malformed_task_argument_rejected() {
    let project = TestProject::new(
        r#"
project: shop
tasks:
  migrate:
    cmds: ["true"]
"#,
    );
    project
        .zap()
        .args(["task", "migrate", "direction"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("key=value"));
}

#[test]
fn unparseable_yaml_fails_loudly() {
    let project = TestProject::new("project: [unclosed\n");
    project
        .zap()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("parsing config file"));
}
