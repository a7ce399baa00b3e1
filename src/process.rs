//! Execution of external tool commands.
//!
//! Commands run through the platform shell (`sh -c` / `cmd /C`) in their own
//! process group, so cancelling a run or hitting the timeout kills the shell
//! together with everything it spawned. Background jobs still alive when the
//! shell exits are killed as well.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A fully templated shell command ready to run.
#[derive(Debug, Clone, Default)]
pub struct ShellCommand {
    pub command: String,
    /// Working directory
    pub dir: PathBuf,
    /// Overrides on top of the inherited environment
    pub env: Vec<(String, String)>,
    /// Text written to the command's stdin, which is closed afterwards
    pub stdin: Option<String>,
}

impl ShellCommand {
    pub fn new(command: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    pub fn stdin(mut self, text: Option<String>) -> Self {
        self.stdin = text;
        self
    }
}

/// Result of a command that ran to completion.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `-1` when terminated by a signal
    pub exit_code: i32,
    /// Whether the command exited with status zero
    pub success: bool,
}

impl ProcessOutput {
    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut out = String::with_capacity(self.stdout.len() + self.stderr.len());
        out.push_str(&self.stdout);
        out.push_str(&self.stderr);
        out
    }
}

/// Errors from running an external command.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn { command: String, source: io::Error },

    #[error("I/O error while running command: {0}")]
    Io(#[from] io::Error),

    /// The run was cancelled and the process tree killed
    #[error("command cancelled")]
    Cancelled,

    #[error("command timed out after {0:?}")]
    TimedOut(Duration),
}

fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

/// Run `cmd` to completion unless `cancel` fires or `timeout` elapses first.
///
/// A non-zero exit status is not an error: callers decide what it means.
pub async fn spawn_cancellable(
    cmd: &ShellCommand,
    cancel: &CancellationToken,
    timeout: Option<Duration>,
) -> Result<ProcessOutput, ProcessError> {
    if cancel.is_cancelled() {
        return Err(ProcessError::Cancelled);
    }

    let mut command = shell(&cmd.command);
    command
        .current_dir(&cmd.dir)
        .envs(cmd.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(if cmd.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    command.process_group(0);

    log::debug!("Running `{}` in {}", cmd.command, cmd.dir.display());
    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        command: cmd.command.clone(),
        source,
    })?;
    // `Child::id` is gone once the child is reaped, but the group outlives it
    let pid = child.id();
    let _group = GroupGuard(pid);

    let mut io = PipeTasks {
        stdin: match (child.stdin.take(), cmd.stdin.clone()) {
            (Some(mut pipe), Some(text)) => Some(tokio::spawn(async move {
                // the tool may exit without reading its input
                if let Err(e) = pipe.write_all(text.as_bytes()).await {
                    log::debug!("Failed to write command stdin: {e}");
                }
            })),
            _ => None,
        },
        stdout: child.stdout.take().map(read_pipe),
        stderr: child.stderr.take().map(read_pipe),
    };

    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProcessError::Cancelled),
        _ = deadline => Err(ProcessError::TimedOut(timeout.unwrap_or_default())),
        output = run_to_end(&mut child, pid, &mut io) => output,
    };

    if outcome.is_err() {
        io.abort();
        kill_tree(&mut child, pid).await;
    }
    outcome
}

type PipeTask = JoinHandle<io::Result<Vec<u8>>>;

struct PipeTasks {
    stdin: Option<JoinHandle<()>>,
    stdout: Option<PipeTask>,
    stderr: Option<PipeTask>,
}

impl PipeTasks {
    fn abort(&self) {
        if let Some(task) = &self.stdin {
            task.abort();
        }
        for task in [&self.stdout, &self.stderr].into_iter().flatten() {
            task.abort();
        }
    }
}

fn read_pipe(mut pipe: impl AsyncRead + Unpin + Send + 'static) -> PipeTask {
    tokio::spawn(async move {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf).await.map(|_| buf)
    })
}

/// Wait for the shell to exit, kill whatever it left behind in its group,
/// then drain the pipes.
async fn run_to_end(child: &mut Child, pid: Option<u32>, io: &mut PipeTasks) -> Result<ProcessOutput, ProcessError> {
    let status = child.wait().await?;
    // stragglers; the group is usually gone already
    #[cfg(unix)]
    let _ = kill_group(pid);
    #[cfg(not(unix))]
    let _ = pid;

    if let Some(task) = io.stdin.as_mut() {
        let _ = task.await;
    }
    let stdout = collect(io.stdout.as_mut()).await?;
    let stderr = collect(io.stderr.as_mut()).await?;

    Ok(ProcessOutput {
        stdout,
        stderr,
        exit_code: status.code().unwrap_or(-1),
        success: status.success(),
    })
}

async fn collect(task: Option<&mut PipeTask>) -> Result<String, ProcessError> {
    let Some(task) = task else {
        return Ok(String::new());
    };
    let bytes = task.await.map_err(|e| ProcessError::Io(io::Error::other(e)))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Kills the process group when the run is dropped before it finishes.
/// `kill_on_drop` only reaches the shell itself.
struct GroupGuard(Option<u32>);

impl Drop for GroupGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        let _ = kill_group(self.0);
        #[cfg(not(unix))]
        let _ = self.0;
    }
}

/// Send SIGKILL to the group led by `pid`. Returns false when no such group exists.
#[cfg(unix)]
fn kill_group(pid: Option<u32>) -> bool {
    let Some(pid) = pid else {
        return false;
    };
    // SAFETY: the child was started with `process_group(0)`, so its pid
    // is also the id of the group that holds its descendants.
    unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) == 0 }
}

/// Kill the child together with its process group and reap it.
async fn kill_tree(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    {
        if !kill_group(pid) {
            let _ = child.start_kill();
        }
    }

    #[cfg(windows)]
    {
        let killed = match pid {
            Some(pid) => Command::new("taskkill")
                .args(["/F", "/T", "/PID", &pid.to_string()])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
                .is_ok_and(|s| s.success()),
            None => false,
        };
        if !killed {
            let _ = child.start_kill();
        }
    }

    if let Err(e) = child.wait().await {
        log::debug!("Failed to reap killed command {pid:?}: {e}");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(command: &str) -> ShellCommand {
        ShellCommand::new(command, std::env::temp_dir())
    }

    #[tokio::test]
    async fn test_captures_output_and_status() {
        let output = spawn_cancellable(&sh("echo out; echo err >&2; exit 3"), &CancellationToken::new(), None)
            .await
            .unwrap();
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert_eq!(output.exit_code, 3);
        assert!(!output.success);
        assert_eq!(output.combined(), "out\nerr\n");
    }

    #[tokio::test]
    async fn test_stdin_env_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = ShellCommand::new("cat; echo \"$GREETING\"; pwd", dir.path())
            .env(vec![("GREETING".to_string(), "hello".to_string())])
            .stdin(Some("from stdin\n".to_string()));
        let output = spawn_cancellable(&cmd, &CancellationToken::new(), None).await.unwrap();

        let lines: Vec<&str> = output.stdout.lines().collect();
        assert_eq!(lines[0], "from stdin");
        assert_eq!(lines[1], "hello");
        let reported = std::fs::canonicalize(lines[2]).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
        assert!(output.success);
    }

    #[tokio::test]
    async fn test_cancel_kills_process() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = spawn_cancellable(&sh("sleep 10; echo done"), &cancel, None).await;
        assert!(matches!(result, Err(ProcessError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancel_kills_grandchildren() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("survived");
        let command = format!("(sleep 1; touch '{}') & wait", marker.display());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });
        let result = spawn_cancellable(&sh(&command), &cancel, None).await;
        assert!(matches!(result, Err(ProcessError::Cancelled)));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists(), "background job outlived the cancelled command");
    }

    fn has_setsid() -> bool {
        std::process::Command::new("sh")
            .args(["-c", "command -v setsid"])
            .output()
            .is_ok_and(|o| o.status.success())
    }

    #[tokio::test]
    async fn test_cancel_while_pipe_held_open() {
        if !has_setsid() {
            return;
        }
        // the detached sleep keeps stdout open after the shell exits
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = spawn_cancellable(&sh("setsid sleep 3 & echo x"), &cancel, None).await;
        assert!(matches!(result, Err(ProcessError::Cancelled)));
        assert!(started.elapsed() < Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn test_timeout_while_pipe_held_open() {
        if !has_setsid() {
            return;
        }
        let started = Instant::now();
        let result = spawn_cancellable(
            &sh("setsid sleep 3 & echo x"),
            &CancellationToken::new(),
            Some(Duration::from_millis(300)),
        )
        .await;
        assert!(matches!(result, Err(ProcessError::TimedOut(_))));
        assert!(started.elapsed() < Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn test_background_job_killed_after_normal_exit() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("survived");
        let command = format!("(sleep 1; touch '{}') >/dev/null 2>&1 & echo done", marker.display());

        let output = spawn_cancellable(&sh(&command), &CancellationToken::new(), None)
            .await
            .unwrap();
        assert_eq!(output.stdout, "done\n");
        assert!(output.success);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists(), "background job outlived the command");
    }

    #[tokio::test]
    async fn test_background_job_holding_stdout_does_not_stall() {
        let started = Instant::now();
        let output = spawn_cancellable(&sh("sleep 5 & echo done"), &CancellationToken::new(), None)
            .await
            .unwrap();
        assert_eq!(output.stdout, "done\n");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_dropped_run_kills_grandchildren() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("survived");
        let command = format!("(sleep 1; touch '{}') & wait", marker.display());

        let cancel = CancellationToken::new();
        let cmd = sh(&command);
        let run = spawn_cancellable(&cmd, &cancel, None);
        assert!(tokio::time::timeout(Duration::from_millis(200), run).await.is_err());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists(), "background job outlived the dropped run");
    }

    #[tokio::test]
    async fn test_already_cancelled_never_spawns() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = spawn_cancellable(&sh("echo hi"), &cancel, None).await;
        assert!(matches!(result, Err(ProcessError::Cancelled)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let result = spawn_cancellable(&sh("sleep 10"), &CancellationToken::new(), Some(Duration::from_millis(100))).await;
        assert!(matches!(result, Err(ProcessError::TimedOut(_))));
    }
}
