//! Deterministic in-memory runtime for tests.
//!
//! Nodes are scripted: liveness, per-operation exit codes, hanging calls and
//! a global pause gate can all be set from the test. Files copied into a
//! node are kept in memory so storage round trips work end to end.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::client::{ExitCode, RuntimeClient, RuntimeCommand, RuntimeError, RuntimeFuture};

/// Operation kinds the fake can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOp {
    Start,
    Stop,
    Remove,
    CopyIn,
    CopyOut,
    Probe,
}

impl FakeOp {
    fn of(command: &RuntimeCommand) -> Self {
        match command {
            RuntimeCommand::Start => FakeOp::Start,
            RuntimeCommand::Stop => FakeOp::Stop,
            RuntimeCommand::Remove { .. } => FakeOp::Remove,
        }
    }
}

/// A recorded runtime call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCall {
    pub node_id: String,
    pub op: FakeOp,
}

#[derive(Debug, Default)]
struct FakeNode {
    running: bool,
    /// remote path → contents.
    files: HashMap<String, Vec<u8>>,
}

#[derive(Debug, Default)]
struct FakeState {
    nodes: HashMap<String, FakeNode>,
    /// (node, op) → exit code returned instead of doing the work.
    failures: HashMap<(String, FakeOp), i32>,
    hanging: HashSet<String>,
    calls: Vec<FakeCall>,
}

/// Scriptable runtime client with no external dependencies.
#[derive(Debug)]
pub struct FakeRuntime {
    state: Mutex<FakeState>,
    /// `true` while calls are held at the gate.
    paused: watch::Sender<bool>,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRuntime {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            state: Mutex::new(FakeState::default()),
            paused,
        }
    }

    /// A fake that knows the given nodes, all in the same liveness state.
    pub fn with_nodes<I, S>(ids: I, running: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fake = Self::new();
        for id in ids {
            fake.add_node(id, running);
        }
        fake
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_node(&self, id: impl Into<String>, running: bool) {
        self.lock().nodes.insert(
            id.into(),
            FakeNode {
                running,
                files: HashMap::new(),
            },
        );
    }

    pub fn set_running(&self, id: &str, running: bool) {
        if let Some(node) = self.lock().nodes.get_mut(id) {
            node.running = running;
        }
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.lock().nodes.get(id).is_some_and(|n| n.running)
    }

    /// Make every call against `id` wait forever (until the caller's timeout).
    pub fn set_hanging(&self, id: &str, hanging: bool) {
        let mut state = self.lock();
        if hanging {
            state.hanging.insert(id.to_string());
        } else {
            state.hanging.remove(id);
        }
    }

    /// Make `op` against `id` return `exit_code` (or an error, for probes).
    pub fn fail(&self, id: &str, op: FakeOp, exit_code: i32) {
        self.lock().failures.insert((id.to_string(), op), exit_code);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Hold every subsequent call until [`FakeRuntime::resume`].
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Place a file directly on a node.
    pub fn put_file(&self, id: &str, remote: &str, contents: &[u8]) {
        if let Some(node) = self.lock().nodes.get_mut(id) {
            node.files.insert(remote.to_string(), contents.to_vec());
        }
    }

    pub fn file(&self, id: &str, remote: &str) -> Option<Vec<u8>> {
        self.lock().nodes.get(id)?.files.get(remote).cloned()
    }

    /// Remote paths stored on a node, sorted.
    pub fn files(&self, id: &str) -> Vec<String> {
        let mut files: Vec<String> = self
            .lock()
            .nodes
            .get(id)
            .map(|n| n.files.keys().cloned().collect())
            .unwrap_or_default();
        files.sort();
        files
    }

    /// Every call seen so far, oldest first.
    pub fn calls(&self) -> Vec<FakeCall> {
        self.lock().calls.clone()
    }

    pub fn calls_for(&self, op: FakeOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op == op).count()
    }

    /// Record the call, honour the pause gate and hangs, and return any
    /// scripted failure code.
    async fn enter(&self, node_id: &str, op: FakeOp) -> Option<i32> {
        let (hanging, failure) = {
            let mut state = self.lock();
            state.calls.push(FakeCall {
                node_id: node_id.to_string(),
                op,
            });
            (
                state.hanging.contains(node_id),
                state.failures.get(&(node_id.to_string(), op)).copied(),
            )
        };

        let mut gate = self.paused.subscribe();
        let _ = gate.wait_for(|paused| !*paused).await;

        if hanging {
            std::future::pending::<()>().await;
        }
        failure
    }
}

impl RuntimeClient for FakeRuntime {
    fn execute<'a>(
        &'a self,
        node_id: &'a str,
        command: &'a RuntimeCommand,
    ) -> RuntimeFuture<'a, ExitCode> {
        Box::pin(async move {
            if let Some(code) = self.enter(node_id, FakeOp::of(command)).await {
                return Ok(ExitCode(code));
            }
            let mut state = self.lock();
            let Some(node) = state.nodes.get_mut(node_id) else {
                return Ok(ExitCode(1));
            };
            let code = match command {
                RuntimeCommand::Start => {
                    node.running = true;
                    0
                }
                RuntimeCommand::Stop => {
                    node.running = false;
                    0
                }
                // exec needs a running container.
                RuntimeCommand::Remove { path } if node.running => {
                    if node.files.remove(path).is_some() { 0 } else { 1 }
                }
                RuntimeCommand::Remove { .. } => 1,
            };
            Ok(ExitCode(code))
        })
    }

    fn copy_in<'a>(
        &'a self,
        node_id: &'a str,
        local: &'a Path,
        remote: &'a str,
    ) -> RuntimeFuture<'a, ExitCode> {
        Box::pin(async move {
            if let Some(code) = self.enter(node_id, FakeOp::CopyIn).await {
                return Ok(ExitCode(code));
            }
            let Ok(contents) = tokio::fs::read(local).await else {
                return Ok(ExitCode(1));
            };
            let mut state = self.lock();
            match state.nodes.get_mut(node_id) {
                Some(node) => {
                    node.files.insert(remote.to_string(), contents);
                    Ok(ExitCode::SUCCESS)
                }
                None => Ok(ExitCode(1)),
            }
        })
    }

    fn copy_out<'a>(
        &'a self,
        node_id: &'a str,
        remote: &'a str,
        local: &'a Path,
    ) -> RuntimeFuture<'a, ExitCode> {
        Box::pin(async move {
            if let Some(code) = self.enter(node_id, FakeOp::CopyOut).await {
                return Ok(ExitCode(code));
            }
            let contents = match self.file(node_id, remote) {
                Some(contents) => contents,
                None => return Ok(ExitCode(1)),
            };
            match tokio::fs::write(local, contents).await {
                Ok(()) => Ok(ExitCode::SUCCESS),
                Err(_) => Ok(ExitCode(1)),
            }
        })
    }

    fn probe_status<'a>(&'a self, node_id: &'a str) -> RuntimeFuture<'a, bool> {
        Box::pin(async move {
            if let Some(code) = self.enter(node_id, FakeOp::Probe).await {
                return Err(RuntimeError::Other(format!(
                    "injected probe failure ({code})"
                )));
            }
            Ok(self.is_running(node_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn lifecycle_commands_flip_liveness() {
        let fake = FakeRuntime::with_nodes(["n1"], false);
        assert!(!fake.probe_status("n1").await.unwrap());

        fake.execute("n1", &RuntimeCommand::Start).await.unwrap();
        assert!(fake.probe_status("n1").await.unwrap());

        fake.execute("n1", &RuntimeCommand::Stop).await.unwrap();
        assert!(!fake.is_running("n1"));
    }

    #[tokio::test]
    async fn unknown_node_fails_like_the_cli() {
        let fake = FakeRuntime::new();
        let code = fake.execute("ghost", &RuntimeCommand::Start).await.unwrap();
        assert_eq!(code, ExitCode(1));
        assert!(!fake.probe_status("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn scripted_failures() {
        let fake = FakeRuntime::with_nodes(["n1"], false);
        fake.fail("n1", FakeOp::Start, 125);
        fake.fail("n1", FakeOp::Probe, 1);

        let code = fake.execute("n1", &RuntimeCommand::Start).await.unwrap();
        assert_eq!(code, ExitCode(125));
        assert!(!fake.is_running("n1"));
        assert!(fake.probe_status("n1").await.is_err());

        fake.clear_failures();
        assert!(fake.execute("n1", &RuntimeCommand::Start).await.unwrap().success());
    }

    #[tokio::test]
    async fn files_round_trip_through_copy() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.txt");
        let dst = dir.path().join("out.txt");
        std::fs::write(&src, b"hello").unwrap();

        let fake = FakeRuntime::with_nodes(["n1"], true);
        assert!(fake.copy_in("n1", &src, "/files/a.txt").await.unwrap().success());
        assert_eq!(fake.files("n1"), vec!["/files/a.txt"]);

        assert!(fake.copy_out("n1", "/files/a.txt", &dst).await.unwrap().success());
        assert_eq!(std::fs::read(&dst).unwrap(), b"hello");

        let missing = fake.copy_out("n1", "/files/b.txt", &dst).await.unwrap();
        assert_eq!(missing, ExitCode(1));
    }

    #[tokio::test]
    async fn remove_requires_running_node_and_existing_file() {
        let fake = FakeRuntime::with_nodes(["n1"], true);
        fake.put_file("n1", "/files/a.txt", b"x");
        let rm = RuntimeCommand::Remove {
            path: "/files/a.txt".into(),
        };

        assert!(fake.execute("n1", &rm).await.unwrap().success());
        assert_eq!(fake.execute("n1", &rm).await.unwrap(), ExitCode(1));

        fake.put_file("n1", "/files/a.txt", b"x");
        fake.set_running("n1", false);
        assert_eq!(fake.execute("n1", &rm).await.unwrap(), ExitCode(1));
        assert!(fake.file("n1", "/files/a.txt").is_some());
    }

    #[tokio::test]
    async fn hanging_node_never_answers() {
        let fake = FakeRuntime::with_nodes(["n1"], true);
        fake.set_hanging("n1", true);
        let res = tokio::time::timeout(Duration::from_millis(20), fake.probe_status("n1")).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn pause_holds_calls_until_resume() {
        let fake = Arc::new(FakeRuntime::with_nodes(["n1"], false));
        fake.pause();

        let task = {
            let fake = fake.clone();
            tokio::spawn(async move { fake.execute("n1", &RuntimeCommand::Start).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());
        assert_eq!(fake.calls_for(FakeOp::Start), 1);
        assert!(!fake.is_running("n1"));

        fake.resume();
        assert!(task.await.unwrap().unwrap().success());
        assert!(fake.is_running("n1"));
    }
}
