//! End-to-end tests for the `fncall` binary.

#![allow(deprecated)]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ECHO_SH: &str = r#"#!/usr/bin/env bash
# @describe Echo input
# @option --text! text to echo
text=""
while [ $# -gt 0 ]; do
    case "$1" in
        --text) text="$2"; shift 2 ;;
        *) shift ;;
    esac
done
printf '%s' "$text" >> "$LLM_OUTPUT"
"#;

const FAIL_SH: &str = r#"#!/usr/bin/env bash
# @describe Always fails
printf 'partial' >> "$LLM_OUTPUT"
echo "disk full" >&2
exit 3
"#;

const TODO_SH: &str = r#"#!/usr/bin/env bash
# @cmd Add a new todo item
# @option --desc! The todo description
add_todo() {
    printf 'added' >> "$LLM_OUTPUT"
}

"$@"
"#;

const TODO_MANIFEST: &str = "name: todo\ndescription: Manage todos\n";

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn fncall(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("fncall").unwrap();
    cmd.arg("--root")
        .arg(root)
        .env_remove("FNCALL_LOG")
        .env_remove("FNCALL_CACHE_DIR")
        .env_remove("FNCALL_SHELL");
    cmd
}

fn repository() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "tools.txt", "echo.sh\nfail.sh\n");
    write(dir.path(), "tools/echo.sh", ECHO_SH);
    write(dir.path(), "tools/fail.sh", FAIL_SH);
    write(dir.path(), "agents.txt", "todo\n");
    write(dir.path(), "agents/todo/index.yaml", TODO_MANIFEST);
    write(dir.path(), "agents/todo/tools.sh", TODO_SH);
    dir
}

fn built_repository() -> TempDir {
    let dir = repository();
    fncall(dir.path()).arg("build").assert().success();
    dir
}

fn bash_installed() -> bool {
    std::process::Command::new("bash")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

#[test]
fn version_flag() {
    Command::cargo_bin("fncall")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn build_prints_summary() {
    let dir = repository();
    fncall(dir.path())
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 built, 0 failed"));
    assert!(dir.path().join("functions.json").is_file());
    assert!(dir.path().join("agents/todo/functions.json").is_file());
}

#[test]
fn build_fails_only_when_everything_fails() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "tools.txt", "missing.sh\n");
    fncall(dir.path())
        .arg("build")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("0 built, 1 failed"));

    write(dir.path(), "tools.txt", "missing.sh\necho.sh\n");
    write(dir.path(), "tools/echo.sh", ECHO_SH);
    fncall(dir.path())
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 built, 1 failed"));
}

#[test]
fn run_prints_captured_output() {
    if !bash_installed() {
        return;
    }
    let dir = built_repository();
    fncall(dir.path())
        .args(["run", "tool", "echo", r#"{"text":"hi"}"#])
        .assert()
        .success()
        .stdout("hi\n");

    fncall(dir.path())
        .args(["run", "agent", "todo", "add_todo", r#"{"desc":"milk"}"#])
        .assert()
        .success()
        .stdout("added\n");
}

#[test]
fn run_exits_with_child_status() {
    if !bash_installed() {
        return;
    }
    let dir = built_repository();
    fncall(dir.path())
        .args(["run", "tool", "fail"])
        .assert()
        .code(3)
        .stdout("")
        .stderr(
            predicate::str::contains("exited with status 3")
                .and(predicate::str::contains("disk full")),
        );
}

#[test]
fn child_exit_64_is_reported_as_child_failure() {
    if !bash_installed() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "tools.txt", "strict.sh\n");
    write(
        dir.path(),
        "tools/strict.sh",
        "#!/usr/bin/env bash\n# @describe Reject input\necho \"bad input\" >&2\nexit 64\n",
    );
    fncall(dir.path()).arg("build").assert().success();

    fncall(dir.path())
        .args(["run", "tool", "strict"])
        .assert()
        .code(64)
        .stderr(
            predicate::str::contains("`strict` exited with status 64")
                .and(predicate::str::contains("bad input")),
        );
}

#[test]
fn pre_spawn_failures_exit_64() {
    let dir = built_repository();
    fncall(dir.path())
        .args(["run", "tool", "echo", "{}"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("missing required parameter: text"));

    fncall(dir.path())
        .args(["run", "tool", "echo", "{not json"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("invalid JSON arguments"));

    fncall(dir.path())
        .args(["run", "agent", "todo", "remove_todo"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("action `todo.remove_todo` not found"));

    let unbuilt = repository();
    fncall(unbuilt.path())
        .args(["run", "tool", "echo", r#"{"text":"hi"}"#])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("fncall build"));
}

#[test]
fn list_shows_tools_and_agent_actions() {
    let dir = built_repository();
    fncall(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout("echo\tEcho input\nfail\tAlways fails\ntodo.add_todo\tAdd a new todo item\n");

    let output = fncall(dir.path())
        .args(["list", "--agent", "todo", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let document: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(document[0]["name"], "add_todo");
    assert_eq!(document[0]["agent"], true);
}

#[test]
fn check_passes_on_empty_repository() {
    let dir = tempfile::tempdir().unwrap();
    fncall(dir.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("all checks passed"));
}
