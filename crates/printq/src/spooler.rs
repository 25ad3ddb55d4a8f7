use async_trait::async_trait;
use printq_core::cups::{parse_lp_request_id, parse_lpq, parse_lpstat_printer};
use printq_core::{PrinterInfo, Spooler, SpoolerError, SpoolerJob};
use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// CUPS through its command-line tools.
#[derive(Debug, Clone, Default)]
pub struct CupsSpooler;

impl CupsSpooler {
    pub fn new() -> Self {
        Self
    }
}

async fn run(program: &str, args: &[&str]) -> Result<Output, SpoolerError> {
    debug!(program, ?args, "running spooler command");
    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await?;
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Err(SpoolerError::CommandFailed {
        command: program.to_string(),
        status: output.status.to_string(),
        stderr: if stderr.is_empty() { stdout } else { stderr },
    })
}

#[async_trait]
impl Spooler for CupsSpooler {
    async fn poll_jobs(&self) -> Result<Vec<SpoolerJob>, SpoolerError> {
        let output = run("lpq", &["-a"]).await?;
        Ok(parse_lpq(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn default_printer(&self) -> Result<PrinterInfo, SpoolerError> {
        let output = run("lpstat", &["-p", "-d"]).await?;
        Ok(parse_lpstat_printer(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn submit(&self, path: &Path, copies: u32) -> Result<String, SpoolerError> {
        if !path.exists() {
            return Err(SpoolerError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let copies = copies.max(1).to_string();
        let path_arg = path.to_string_lossy();
        let output = run("lp", &["-t", &title, "-n", &copies, &path_arg]).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_lp_request_id(&stdout).ok_or_else(|| SpoolerError::CommandFailed {
            command: "lp".to_string(),
            status: output.status.to_string(),
            stderr: format!("no request id in output: {}", stdout.trim()),
        })
    }

    async fn cancel(&self, system_job_id: &str) -> Result<(), SpoolerError> {
        run("cancel", &[system_job_id]).await.map(|_| ())
    }
}

/// Launches the desktop opener for `path` without waiting on it.
pub fn open_path(path: &Path) -> std::io::Result<()> {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    std::process::Command::new(opener)
        .arg(path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map(|_| ())
}
