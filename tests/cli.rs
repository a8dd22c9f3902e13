use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;

fn mememaker() -> Command {
    Command::cargo_bin("mememaker").expect("binary exists")
}

#[test]
fn init_creates_database_and_admin_token() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().to_str().unwrap();

    mememaker()
        .args(["admin", "init", "--data-dir", data_dir, "--non-interactive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Admin token"));

    assert!(temp_dir.path().join("mememaker.db").exists());

    let token = std::fs::read_to_string(temp_dir.path().join(".admin_token")).unwrap();
    assert!(token.trim().starts_with("mememaker_"));
}

#[test]
fn init_refuses_to_run_twice() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().to_str().unwrap();

    mememaker()
        .args(["admin", "init", "--data-dir", data_dir, "--non-interactive"])
        .assert()
        .success();

    mememaker()
        .args(["admin", "init", "--data-dir", data_dir, "--non-interactive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn serve_requires_initialization() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().to_str().unwrap();

    mememaker()
        .args(["serve", "--data-dir", data_dir])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}
