use crate::common::*;
use predicates::prelude::*;

#[test]
fn valid_config_passes() {
    let project = TestProject::new(MINIMAL);
    project
        .zap()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn duplicate_alias_fails() {
    let project = TestProject::new(
        r#"
project: shop
native:
  api:
    cmd: "true"
docker:
  db:
    image: postgres:16
    aliases: [api]
"#,
    );
    project
        .zap()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate identifier"));
}

#[test]
fn unknown_dependency_fails() {
    let project = TestProject::new(
        r#"
project: shop
native:
  api:
    cmd: "true"
    depends_on: [ghost]
"#,
    );
    project
        .zap()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn dependency_cycle_fails_with_path() {
    let project = TestProject::new(
        r#"
project: shop
native:
  a:
    cmd: "true"
    depends_on: [b]
  b:
    cmd: "true"
    depends_on: [a]
"#,
    );
    project
        .zap()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("dependency cycle"));
}

#[test]
fn legacy_processes_entry_without_name_fails() {
    let project = TestProject::new(
        r#"
project: shop
processes:
  - cmd: "true"
"#,
    );
    project
        .zap()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("name"));
}

#[test]
fn missing_config_reports_walk_failure() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut cmd = assert_cmd::Command::cargo_bin("zap").unwrap();
    cmd.current_dir(dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No zapper.yml found"));
}

#[test]
fn explicit_config_flag_is_honored() {
    let project = TestProject::new(MINIMAL);
    let mut cmd = assert_cmd::Command::cargo_bin("zap").unwrap();
    // Run from an unrelated directory, pointing at the project config.
    let elsewhere = tempfile::TempDir::new().unwrap();
    cmd.current_dir(elsewhere.path())
        .arg("--config")
        .arg(&project.config_path)
        .arg("validate")
        .assert()
        .success();
}
