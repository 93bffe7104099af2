#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Run the CLI binary against `api_url`, keeping the session in `session_file`.
///
/// The child inherits nothing session-related from the caller's environment.
pub fn run_cli(args: &[&str], api_url: &str, session_file: &Path) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_fieldkey"));
    cmd.args(args);
    cmd.env("FIELDKEY_API_URL", api_url);
    cmd.env("FIELDKEY_SESSION_FILE", session_file);
    cmd.env_remove("FIELDKEY_IDENTITY_URL");
    cmd.env_remove("FIELDKEY_DISABLE_EXPIRY");
    cmd.env_remove("FIELDKEY_PASSWORD");
    cmd.env_remove("FIELDKEY_USE_KEYRING");
    cmd.env("NO_COLOR", "1");
    cmd.output().expect("Failed to execute CLI")
}

/// Same as [`run_cli`] but off the async runtime, so a mock server on the
/// same runtime keeps answering.
pub async fn run_cli_async(args: &[&str], api_url: &str, session_file: &Path) -> Output {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    let api_url = api_url.to_string();
    let session_file = session_file.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_cli(&args, &api_url, &session_file)
    })
    .await
    .expect("CLI task panicked")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

pub fn assert_success(args: &[&str], output: &Output) {
    if !output.status.success() {
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr(output));
    }
}

/// Session file inside a fresh temporary directory.
pub fn session_file(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("session.json")
}
