use predicates::prelude::*;

#[test]
fn init_writes_starter_config() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut cmd = assert_cmd::Command::cargo_bin("zap").unwrap();
    cmd.current_dir(dir.path()).arg("init").assert().success();

    let content = std::fs::read_to_string(dir.path().join("zapper.yml")).unwrap();
    assert!(content.contains("project:"));

    // The starter config must itself validate.
    let mut validate = assert_cmd::Command::cargo_bin("zap").unwrap();
    validate
        .current_dir(dir.path())
        .arg("validate")
        .assert()
        .success();
}

#[test]
fn init_refuses_to_overwrite() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("zapper.yml"), "project: keepme\n").unwrap();
    let mut cmd = assert_cmd::Command::cargo_bin("zap").unwrap();
    cmd.current_dir(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let content = std::fs::read_to_string(dir.path().join("zapper.yml")).unwrap();
    assert_eq!(content, "project: keepme\n");
}
