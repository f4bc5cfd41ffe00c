//! Drives the `minishell` binary with piped input, the way a script would.

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn shell(dir: &Path, input: &str) -> Output {
    shell_with_args(dir, &[], input)
}

fn shell_with_args(dir: &Path, args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_minishell"))
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn minishell");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().expect("wait for minishell")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn end_of_input_exits_with_zero() {
    let dir = tempfile::tempdir().unwrap();
    let out = shell(dir.path(), "");
    assert_eq!(out.status.code(), Some(0));
    assert!(out.stdout.is_empty());
}

#[test]
fn pwd_prints_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let cwd = fs::canonicalize(dir.path()).unwrap();
    let out = shell(&cwd, "pwd\n");
    assert_eq!(stdout(&out), format!("{}\n", cwd.display()));
}

#[test]
fn cd_changes_directory_for_later_lines() {
    let dir = tempfile::tempdir().unwrap();
    let target = fs::canonicalize(dir.path()).unwrap().join("sub");
    fs::create_dir(&target).unwrap();

    let out = shell(dir.path(), "cd sub\npwd\n");
    assert_eq!(stdout(&out), format!("{}\n", target.display()));
}

#[test]
fn missing_program_is_reported_and_shell_continues() {
    let dir = tempfile::tempdir().unwrap();
    let out = shell(dir.path(), "nonexistentprog arg1\npwd\n");

    assert!(stderr(&out).contains("nonexistentprog: the file doesn't exist"));
    assert!(!stdout(&out).is_empty());
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn exit_ignores_remaining_lines() {
    let dir = tempfile::tempdir().unwrap();
    let out = shell(dir.path(), "exit\npwd\n");
    assert_eq!(out.status.code(), Some(0));
    assert!(out.stdout.is_empty());
}

#[test]
fn help_lists_builtins() {
    let dir = tempfile::tempdir().unwrap();
    let out = shell(dir.path(), "help\n");
    let text = stdout(&out);
    for name in ["help", "exit", "pwd", "cd"] {
        assert!(
            text.lines().any(|line| line.starts_with(&format!("{name} - "))),
            "{name} missing from:\n{text}"
        );
    }
}

#[test]
fn redirections_reach_external_programs() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("in.txt"), "b\nc\na\n").unwrap();

    let out = shell(dir.path(), "sort < in.txt > out.txt\ncat out.txt\n");

    assert_eq!(stdout(&out), "a\nb\nc\n");
    let mode = fs::metadata(dir.path().join("out.txt"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o660);
}

#[test]
fn redirection_does_not_leak_into_the_shell() {
    let dir = tempfile::tempdir().unwrap();
    let cwd = fs::canonicalize(dir.path()).unwrap();

    let out = shell(&cwd, "pwd > first.txt\npwd\n");

    assert_eq!(stdout(&out), format!("{}\n", cwd.display()));
    assert_eq!(
        fs::read_to_string(cwd.join("first.txt")).unwrap(),
        format!("{}\n", cwd.display())
    );
}

#[test]
fn oversized_line_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let long = format!("pwd {}", "x".repeat(64));
    let input = format!("{long}\nhelp\n");

    let out = shell_with_args(dir.path(), &["--max-line-length", "32"], &input);

    assert!(stderr(&out).contains("input line too long"));
    assert!(stdout(&out).contains("pwd - "));
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn single_command_mode_returns_its_status() {
    let dir = tempfile::tempdir().unwrap();
    let out = shell_with_args(dir.path(), &["-c", "sh -c 'exit 4'"], "");
    assert_eq!(out.status.code(), Some(4));

    let out = shell_with_args(dir.path(), &["-c", "nonexistentprog"], "");
    assert_eq!(out.status.code(), Some(127));
}

#[test]
fn quoted_operator_is_passed_to_the_program() {
    let dir = tempfile::tempdir().unwrap();
    let out = shell(dir.path(), "sh -c 'printf \"%s|\" \"$@\"' x '>' lit\n");

    assert_eq!(stdout(&out), ">|lit|");
    assert!(!dir.path().join("lit").exists());
}

#[test]
fn builtins_ignore_extra_operands() {
    let dir = tempfile::tempdir().unwrap();
    let cwd = fs::canonicalize(dir.path()).unwrap();
    fs::create_dir(cwd.join("sub")).unwrap();

    let out = shell(&cwd, "cd sub extra\npwd now\n");

    assert_eq!(stdout(&out), format!("{}\n", cwd.join("sub").display()));
    assert!(stderr(&out).is_empty());
}
