//! Docker CLI adapter.
//!
//! Each call spawns one runtime CLI process and waits for it. Output is only
//! read for the liveness probe; everything else is judged by exit status.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Output, Stdio};

use tokio::process::Command;
use tracing::debug;

use crate::client::{ExitCode, RuntimeClient, RuntimeCommand, RuntimeError, RuntimeFuture, RuntimeResult};

/// Runtime client that shells out to `docker` (or a CLI-compatible
/// replacement such as `podman`).
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    binary: String,
}

impl DockerRuntime {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// CLI arguments for a node command.
    fn execute_args(node_id: &str, command: &RuntimeCommand) -> Vec<OsString> {
        match command {
            RuntimeCommand::Start => vec!["start".into(), node_id.into()],
            RuntimeCommand::Stop => vec!["stop".into(), node_id.into()],
            RuntimeCommand::Remove { path } => {
                vec!["exec".into(), node_id.into(), "rm".into(), path.into()]
            }
        }
    }

    fn copy_in_args(node_id: &str, local: &Path, remote: &str) -> Vec<OsString> {
        vec![
            "cp".into(),
            local.as_os_str().to_owned(),
            format!("{node_id}:{remote}").into(),
        ]
    }

    fn copy_out_args(node_id: &str, remote: &str, local: &Path) -> Vec<OsString> {
        vec![
            "cp".into(),
            format!("{node_id}:{remote}").into(),
            local.as_os_str().to_owned(),
        ]
    }

    fn probe_args(node_id: &str) -> Vec<OsString> {
        vec![
            "inspect".into(),
            "--format={{.State.Running}}".into(),
            node_id.into(),
        ]
    }

    async fn run(&self, args: Vec<OsString>) -> RuntimeResult<Output> {
        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RuntimeError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            debug!(
                binary = %self.binary,
                ?args,
                code = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "runtime command exited non-zero"
            );
        }
        Ok(output)
    }

    async fn run_for_exit(&self, args: Vec<OsString>) -> RuntimeResult<ExitCode> {
        let output = self.run(args).await?;
        // Killed by a signal: no code, treat as a generic failure.
        Ok(ExitCode(output.status.code().unwrap_or(-1)))
    }
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl RuntimeClient for DockerRuntime {
    fn execute<'a>(
        &'a self,
        node_id: &'a str,
        command: &'a RuntimeCommand,
    ) -> RuntimeFuture<'a, ExitCode> {
        Box::pin(self.run_for_exit(Self::execute_args(node_id, command)))
    }

    fn copy_in<'a>(
        &'a self,
        node_id: &'a str,
        local: &'a Path,
        remote: &'a str,
    ) -> RuntimeFuture<'a, ExitCode> {
        Box::pin(self.run_for_exit(Self::copy_in_args(node_id, local, remote)))
    }

    fn copy_out<'a>(
        &'a self,
        node_id: &'a str,
        remote: &'a str,
        local: &'a Path,
    ) -> RuntimeFuture<'a, ExitCode> {
        Box::pin(self.run_for_exit(Self::copy_out_args(node_id, remote, local)))
    }

    fn probe_status<'a>(&'a self, node_id: &'a str) -> RuntimeFuture<'a, bool> {
        Box::pin(async move {
            let output = self.run(Self::probe_args(node_id)).await?;
            probe_verdict(output.status.success(), &output.stdout, &output.stderr)
        })
    }
}

/// Read an `inspect` result. A missing container is "not running"; any
/// other failure (daemon down, permission denied) is a call error.
fn probe_verdict(success: bool, stdout: &[u8], stderr: &[u8]) -> RuntimeResult<bool> {
    if success {
        return Ok(String::from_utf8_lossy(stdout).trim() == "true");
    }
    let stderr = String::from_utf8_lossy(stderr);
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("no such object") || lower.contains("no such container") {
        return Ok(false);
    }
    Err(RuntimeError::Other(format!("inspect failed: {}", stderr.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn lifecycle_args() {
        assert_eq!(
            strs(DockerRuntime::execute_args("file-server", &RuntimeCommand::Start)),
            vec!["start", "file-server"]
        );
        assert_eq!(
            strs(DockerRuntime::execute_args("file-server", &RuntimeCommand::Stop)),
            vec!["stop", "file-server"]
        );
    }

    #[test]
    fn remove_args() {
        let cmd = RuntimeCommand::Remove {
            path: "/files/a.txt".into(),
        };
        assert_eq!(
            strs(DockerRuntime::execute_args("file-server", &cmd)),
            vec!["exec", "file-server", "rm", "/files/a.txt"]
        );
    }

    #[test]
    fn copy_args() {
        let local = Path::new("/tmp/stage/a.txt");
        assert_eq!(
            strs(DockerRuntime::copy_in_args("n1", local, "/files/a.txt")),
            vec!["cp", "/tmp/stage/a.txt", "n1:/files/a.txt"]
        );
        assert_eq!(
            strs(DockerRuntime::copy_out_args("n1", "/files/a.txt", local)),
            vec!["cp", "n1:/files/a.txt", "/tmp/stage/a.txt"]
        );
    }

    #[test]
    fn probe_args() {
        assert_eq!(
            strs(DockerRuntime::probe_args("n1")),
            vec!["inspect", "--format={{.State.Running}}", "n1"]
        );
    }

    #[test]
    fn probe_verdicts() {
        assert!(probe_verdict(true, b"true\n", b"").unwrap());
        assert!(!probe_verdict(true, b"false\n", b"").unwrap());
        assert!(!probe_verdict(false, b"", b"Error: No such object: n1\n").unwrap());
        assert!(!probe_verdict(false, b"", b"Error: no such container n1").unwrap());

        let err = probe_verdict(
            false,
            b"",
            b"Cannot connect to the Docker daemon at unix:///var/run/docker.sock.",
        )
        .unwrap_err();
        assert!(matches!(err, RuntimeError::Other(msg) if msg.contains("Cannot connect")));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let rt = DockerRuntime::new("/nonexistent/fleet-runtime-cli");
        let err = rt.probe_status("n1").await.unwrap_err();
        assert!(matches!(err, RuntimeError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_status_is_reported() {
        // `false` ignores its arguments and exits 1.
        let rt = DockerRuntime::new("false");
        let code = rt.execute("n1", &RuntimeCommand::Start).await.unwrap();
        assert_eq!(code, ExitCode(1));
        // A failing inspect without a "no such object" message is an error.
        assert!(matches!(
            rt.probe_status("n1").await,
            Err(RuntimeError::Other(_))
        ));

        // `echo` exits 0 but does not print "true".
        let rt = DockerRuntime::new("echo");
        assert!(!rt.probe_status("n1").await.unwrap());
    }
}
