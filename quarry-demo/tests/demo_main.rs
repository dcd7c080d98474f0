use std::path::PathBuf;
use std::process::{Command, Output};

fn bin_path() -> PathBuf {
    let exe = std::env::current_exe().expect("failed to locate test binary");
    let target_dir = exe
        .parent()
        .and_then(|p| p.parent())
        .expect("unexpected test binary path");
    let candidate = target_dir.join("quarry-demo.exe");
    if candidate.exists() {
        candidate
    } else {
        target_dir.join("quarry-demo")
    }
}

fn run_demo(args: &[&str], envs: &[(&str, &str)]) -> Output {
    let mut command = Command::new(bin_path());
    command.arg("--no-dotenv").args(args);
    for default in &quarry::MYSQL_ENV_DEFAULTS {
        command.env_remove(default.variable);
    }
    command.env_remove(quarry::config::CONNECT_TIMEOUT_VARIABLE);
    command.envs(envs.iter().copied());
    command.output().expect("failed to run quarry-demo")
}

const UNREACHABLE: [(&str, &str); 3] = [
    ("DB_MYSQL_HOST", "127.0.0.1"),
    ("DB_MYSQL_PORT", "1"),
    ("DB_MYSQL_CONNECT_TIMEOUT", "2"),
];

#[test]
fn demo_prints_banners_before_connecting() {
    let output = run_demo(&[], &UNREACHABLE);
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.split('\n').collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("sqlx "));
    assert!(lines[1].starts_with("quarry "));
    assert!(lines[2].is_empty());
}

#[test]
fn demo_reports_the_refused_address_once() {
    let output = run_demo(&["--no-banner"], &UNREACHABLE);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("could not connect to 127.0.0.1:1").count(), 1);
    assert!(!stderr.contains("pool timed out"));
    assert!(!stderr.contains('\u{1b}'));
}

#[test]
fn demo_reports_malformed_port() {
    let output = run_demo(&["--no-banner"], &[("DB_MYSQL_PORT", "33o6")]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("invalid port '33o6'").count(), 1);
}

#[test]
fn demo_prints_help() {
    let status = Command::new(bin_path())
        .arg("--help")
        .status()
        .expect("failed to run quarry-demo");
    assert!(status.success());
}
