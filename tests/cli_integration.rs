//! Integration tests for the keystore CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.
//! Values are passed inline and deletes use `--force`, so nothing
//! needs an interactive terminal.

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;

const MASTER_KEY: &str = "4242424242424242424242424242424242424242424242424242424242424242";

/// Helper: a Command for the keystore binary, isolated in `dir`.
fn keystore(dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("keystore").expect("binary should exist");
    cmd.current_dir(dir.path())
        .env("KEYSTORE_MASTER_KEY", MASTER_KEY)
        .env_remove("KEYSTORE_FILE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_flag_shows_usage() {
    let tmp = TempDir::new().unwrap();
    keystore(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Encrypted secret and API key store"))
        .stdout(predicate::str::contains("set"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("keys"))
        .stdout(predicate::str::contains("gen-key"));
}

#[test]
fn no_args_shows_help() {
    let tmp = TempDir::new().unwrap();
    keystore(&tmp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn gen_key_prints_64_hex_chars() {
    let tmp = TempDir::new().unwrap();
    keystore(&tmp)
        .arg("gen-key")
        .assert()
        .success()
        .stdout(predicate::str::is_match("^[0-9a-f]{64}\n").unwrap());
}

#[test]
fn missing_store_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    keystore(&tmp)
        .args(["get", "app", "k"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no store file configured"));
}

#[test]
fn missing_master_key_is_an_error() {
    let tmp = TempDir::new().unwrap();
    keystore(&tmp)
        .env_remove("KEYSTORE_MASTER_KEY")
        .args(["--store", "s.kstore", "list", "app"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEYSTORE_MASTER_KEY"));
}

#[test]
fn set_get_list_delete_secret() {
    let tmp = TempDir::new().unwrap();

    keystore(&tmp)
        .args(["--store", "s.kstore", "set", "app", "greeting", "hello-world"])
        .assert()
        .success();

    keystore(&tmp)
        .args(["--store", "s.kstore", "get", "app", "greeting"])
        .assert()
        .success()
        .stdout("hello-world\n");

    keystore(&tmp)
        .args(["--store", "s.kstore", "list", "app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("greeting"))
        .stdout(predicate::str::contains("hello-world").not());

    keystore(&tmp)
        .args(["--store", "s.kstore", "delete", "app", "greeting", "--force"])
        .assert()
        .success();

    keystore(&tmp)
        .args(["--store", "s.kstore", "get", "app", "greeting"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no secret"));
}

#[test]
fn typed_json_secret() {
    let tmp = TempDir::new().unwrap();

    keystore(&tmp)
        .args([
            "--store", "s.kstore", "set", "app", "limits", r#"{"a":[1,2,3]}"#, "--type", "json",
        ])
        .assert()
        .success();

    keystore(&tmp)
        .args(["--store", "s.kstore", "get", "app", "limits"])
        .assert()
        .success()
        .stdout("{\"a\":[1,2,3]}\n");

    keystore(&tmp)
        .args(["--store", "s.kstore", "set", "app", "n", "abc", "--type", "number"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a number"));
}

#[test]
fn api_key_lifecycle() {
    let tmp = TempDir::new().unwrap();

    keystore(&tmp)
        .args(["--store", "s.kstore", "keys", "create", "openai", "sk-test-123"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created with id"));

    keystore(&tmp)
        .args(["--store", "s.kstore", "keys", "reveal", "openai"])
        .assert()
        .success()
        .stdout("sk-test-123\n");

    keystore(&tmp)
        .args(["--store", "s.kstore", "keys", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("openai"))
        .stdout(predicate::str::contains("sk-test-123").not());

    keystore(&tmp)
        .args(["--store", "s.kstore", "keys", "create", "openai", "sk-other"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn wrong_master_key_cannot_open_store() {
    let tmp = TempDir::new().unwrap();

    keystore(&tmp)
        .args(["--store", "s.kstore", "set", "app", "k", "v"])
        .assert()
        .success();

    keystore(&tmp)
        .env("KEYSTORE_MASTER_KEY", "1".repeat(64))
        .args(["--store", "s.kstore", "get", "app", "k"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HMAC verification failed"));
}

#[test]
fn store_file_from_config() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join(".keystore.toml"),
        "store_file = \"data/app.kstore\"\n",
    )
    .unwrap();

    keystore(&tmp)
        .args(["set", "system", "mode", "maintenance"])
        .assert()
        .success();
    assert!(tmp.path().join("data/app.kstore").exists());

    keystore(&tmp)
        .arg("namespaces")
        .assert()
        .success()
        .stdout(predicate::str::contains("system"));
}

#[test]
fn gen_key_tip_names_configured_variable() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join(".keystore.toml"),
        "master_key_env = \"CALC_MASTER_KEY\"\n",
    )
    .unwrap();

    keystore(&tmp)
        .arg("gen-key")
        .assert()
        .success()
        .stdout(predicate::str::contains("CALC_MASTER_KEY"))
        .stdout(predicate::str::contains("KEYSTORE_MASTER_KEY").not());
}

#[test]
fn set_reports_added_then_updated() {
    let tmp = TempDir::new().unwrap();

    keystore(&tmp)
        .args(["--store", "s.kstore", "set", "app", "mode", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added"));

    keystore(&tmp)
        .args(["--store", "s.kstore", "set", "app", "mode", "b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("updated"));
}
