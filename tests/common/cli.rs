use assert_cmd::Command;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

#[derive(Debug)]
pub struct CwRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub log_path: PathBuf,
}

impl CwRun {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&extract_json_payload(&self.stdout)).unwrap_or_else(|e| {
            panic!(
                "stdout is not JSON ({e}): stdout='{}' stderr='{}'",
                self.stdout, self.stderr
            )
        })
    }

    pub fn error_json(&self) -> serde_json::Value {
        serde_json::from_str(&extract_json_payload(&self.stderr))
            .unwrap_or_else(|e| panic!("stderr is not JSON ({e}): '{}'", self.stderr))
    }
}

pub struct CwWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub log_dir: PathBuf,
}

impl CwWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        let log_dir = root.join("logs");
        fs::create_dir_all(&log_dir).expect("log dir");
        Self {
            temp_dir,
            root,
            log_dir,
        }
    }
}

pub fn run_cw<I, S>(workspace: &CwWorkspace, args: I, label: &str) -> CwRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_cw_with_env(
        workspace,
        args,
        std::iter::empty::<(String, String)>(),
        label,
    )
}

pub fn run_cw_with_env<I, S, E, K, V>(
    workspace: &CwWorkspace,
    args: I,
    env_vars: E,
    label: &str,
) -> CwRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cw"));
    cmd.current_dir(&workspace.root);
    cmd.args(args);
    for (key, _) in std::env::vars() {
        if key.starts_with("CIVICWATCH_") {
            cmd.env_remove(key);
        }
    }
    cmd.envs(env_vars);
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "civicwatch=debug");
    cmd.env("RUST_BACKTRACE", "1");
    cmd.env("HOME", &workspace.root);

    let start = Instant::now();
    let output = cmd.output().expect("run cw");
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_path = workspace.log_dir.join(format!("{label}.log"));
    let timestamp = SystemTime::now();
    let log_body = format!(
        "label: {label}\nstarted: {:?}\nduration: {:?}\nstatus: {}\nargs: {:?}\ncwd: {}\n\nstdout:\n{}\n\nstderr:\n{}\n",
        timestamp,
        duration,
        output.status,
        cmd.get_args().collect::<Vec<_>>(),
        workspace.root.display(),
        stdout,
        stderr
    );
    fs::write(&log_path, log_body).expect("write log");

    CwRun {
        stdout,
        stderr,
        status: output.status,
        duration,
        log_path,
    }
}

/// Skip any log lines ahead of the first JSON line.
pub fn extract_json_payload(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') || trimmed == "null" {
            return lines[idx..].join("\n").trim().to_string();
        }
    }
    text.trim().to_string()
}
