//! End-to-end tests for the `dispatch` binary.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

const CONFIG: &str = r#"
[directive]
header = "!"
match_prompt = true

[[orders]]
name = "roll"
description = "Roll dice"
param_usage = "<sides>"
headers = ["roll"]
regexps = ["\\d+"]
"#;

fn write_config(dir: &Path) -> String {
    let path = dir.join("config.toml");
    std::fs::write(&path, CONFIG).unwrap();
    path.display().to_string()
}

/// Runs the binary with the given arguments and optional stdin.
fn run_dispatch(args: &[&str], stdin: Option<&str>) -> (i32, String, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_dispatch"))
        .args(args)
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");

    {
        let mut pipe = child.stdin.take().unwrap();
        if let Some(text) = stdin {
            pipe.write_all(text.as_bytes()).unwrap();
        }
    }

    let output = child.wait_with_output().unwrap();
    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (exit_code, stdout, stderr)
}

#[test]
fn test_dispatch_inputs_as_text() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let (code, stdout, _) = run_dispatch(&["--config", &config, "!roll 6", "!roll x", "hi"], None);

    assert_eq!(code, 0);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], r#"roll (!roll) ["6"]"#);
    assert_eq!(lines[1], "Invalid parameters for roll (!roll)");
    assert_eq!(lines[2], "Usage: Roll dice !roll <sides>");
    assert_eq!(lines[3], "No order matched");
}

#[test]
fn test_dispatch_stdin_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let (code, stdout, _) = run_dispatch(
        &["--config", &config, "--output", "json", "--concurrent"],
        Some("!roll 12\nnope\n"),
    );

    assert_eq!(code, 0);
    let values: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(values.len(), 2);
    assert_eq!(values[0]["input"], "!roll 12");
    assert_eq!(values[0]["outcome"]["type"], "invoked");
    assert_eq!(values[0]["outcome"]["arguments"][0], "12");
    assert_eq!(values[1]["outcome"]["type"], "unrecognized");
}

#[test]
fn test_prefix_override() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let (code, stdout, _) = run_dispatch(&["--config", &config, "--prefix", "#", "#roll 4"], None);

    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), r#"roll (#roll) ["4"]"#);
}

#[test]
fn test_help_text() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let (code, stdout, _) = run_dispatch(&["--config", &config, "--help-text"], None);

    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "Roll dice !roll <sides>");
}

#[test]
fn test_invalid_output_format_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let (code, stdout, stderr) =
        run_dispatch(&["--config", &config, "--output", "yaml", "!roll 1"], None);

    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Invalid output format"));
}
