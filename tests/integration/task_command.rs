use crate::common::*;
use predicates::prelude::*;

#[test]
fn task_runs_with_substituted_params() {
    let project = TestProject::new(
        r#"
project: shop
tasks:
  greet:
    cmds:
      - printf '%s' "hello {{name}}" > greeting.txt
    params:
      - name: name
        default: world
"#,
    );

    project.zap().args(["task", "greet"]).assert().success();
    let content =
        std::fs::read_to_string(project.dir.path().join("greeting.txt")).unwrap();
    assert_eq!(content, "hello world");

    project
        .zap()
        .args(["task", "greet", "name=zapper"])
        .assert()
        .success();
    let content =
        std::fs::read_to_string(project.dir.path().join("greeting.txt")).unwrap();
    assert_eq!(content, "hello zapper");
}

#[test]
fn task_resolves_by_alias() {
    let project = TestProject::new(
        r#"
project: shop
tasks:
  greet:
    aliases: [hi]
    cmds:
      - printf ok > ok.txt
"#,
    );
    project.zap().args(["task", "hi"]).assert().success();
    assert!(project.dir.path().join("ok.txt").exists());
}

#[test]
fn task_refs_run_in_order() {
    let project = TestProject::new(
        r#"
project: shop
tasks:
  build:
    cmds:
      - printf built >> order.txt
  deploy:
    cmds:
      - task: build
      - printf ",deployed" >> order.txt
"#,
    );
    project.zap().args(["task", "deploy"]).assert().success();
    let content = std::fs::read_to_string(project.dir.path().join("order.txt")).unwrap();
    assert_eq!(content, "built,deployed");
}

#[test]
fn task_ref_cycle_is_an_error() {
    let project = TestProject::new(
        r#"
project: shop
tasks:
  a:
    cmds:
      - task: b
  b:
    cmds:
      - task: a
"#,
    );
    project
        .zap()
        .args(["task", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle"));
}

#[test]
fn missing_required_param_aborts_before_running() {
    let project = TestProject::new(
        r#"
project: shop
tasks:
  migrate:
    cmds:
      - printf ran > ran.txt
    params:
      - name: direction
        required: true
"#,
    );
    project
        .zap()
        .args(["task", "migrate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("direction"));
    assert!(!project.dir.path().join("ran.txt").exists());
}

#[test]
fn failing_command_surfaces_backend_error() {
    let project = TestProject::new(
        r#"
project: shop
tasks:
  boom:
    cmds:
      - exit 3
"#,
    );
    project
        .zap()
        .args(["task", "boom"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("task command failed"));
}

#[test]
fn task_runs_in_declared_cwd() {
    let project = TestProject::new(
        r#"
project: shop
tasks:
  here:
    cwd: ./sub
    cmds:
      - printf ok > where.txt
"#,
    );
    std::fs::create_dir(project.dir.path().join("sub")).unwrap();
    project.zap().args(["task", "here"]).assert().success();
    assert!(project.dir.path().join("sub/where.txt").exists());
}
