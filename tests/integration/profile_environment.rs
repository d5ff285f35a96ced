use crate::common::*;
use predicates::prelude::*;

const WITH_PROFILES: &str = r#"
project: shop
env_files:
  default: [.env]
  staging: [.env.staging]
native:
  api:
    cmd: "true"
  frontend:
    cmd: "true"
    profiles: [dev]
  worker:
    cmd: "true"
    profiles: [prod]
"#;

#[test]
fn set_and_show_profile() {
    let project = TestProject::new(WITH_PROFILES);
    project
        .zap()
        .args(["profile", "dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("active profile: dev"));

    let state = project.state_json().unwrap();
    assert_eq!(state["activeProfile"], "dev");
    assert!(state["lastUpdated"].is_string());

    project
        .zap()
        .arg("profile")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("active profile: dev")
                .and(predicate::str::contains("dev, prod")),
        );
}

#[test]
fn clear_profile() {
    let project = TestProject::new(WITH_PROFILES);
    project.zap().args(["profile", "dev"]).assert().success();
    project
        .zap()
        .args(["profile", "--clear"])
        .assert()
        .success();
    let state = project.state_json().unwrap();
    assert!(state.get("activeProfile").is_none());
}

#[test]
fn unknown_profile_rejected() {
    let project = TestProject::new(WITH_PROFILES);
    project
        .zap()
        .args(["profile", "nope"])
        .assert()
        .failure();
}

#[test]
fn set_environment_persists() {
    let project = TestProject::new(WITH_PROFILES);
    project
        .zap()
        .args(["environment", "staging"])
        .assert()
        .success();
    let state = project.state_json().unwrap();
    assert_eq!(state["activeEnvironment"], "staging");
}

#[test]
fn unknown_environment_rejected_with_available_list() {
    let project = TestProject::new(WITH_PROFILES);
    project
        .zap()
        .args(["environment", "prod"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("prod")
                .and(predicate::str::contains("staging")),
        );
}

#[test]
fn env_command_prints_resolved_service_env() {
    let project = TestProject::new(
        r#"
project: shop
env_files: [.env]
native:
  api:
    cmd: "true"
    env:
      OVERRIDE: literal
"#,
    );
    std::fs::write(
        project.dir.path().join(".env"),
        "FROM_FILE=hello\nOVERRIDE=file\n",
    )
    .unwrap();

    project
        .zap()
        .args(["env", "api"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("FROM_FILE=hello")
                .and(predicate::str::contains("OVERRIDE=literal")),
        );
}

#[test]
fn stale_active_environment_fails_subsequent_loads() {
    let project = TestProject::new(WITH_PROFILES);
    project.zap().args(["environment", "staging"]).assert().success();

    // Re-write the config without the staging environment.
    std::fs::write(
        &project.config_path,
        "project: shop\nenv_files: [.env]\nnative:\n  api:\n    cmd: \"true\"\n",
    )
    .unwrap();

    project
        .zap()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("staging"));
}
