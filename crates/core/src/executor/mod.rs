//! Execution of a single (pair, version, target) tuple.
//!
//! Every call produces exactly one [`Run`]; launch failures, timeouts and
//! cancellations are folded into the exit code instead of being returned as
//! errors.

mod launcher;

pub use launcher::{DockerLauncher, Launcher, to_shell_command};

use crate::{
    error::Result,
    targets::{Mode, RunTarget},
    types::{Pair, Run, RunStatus},
    version::DraftVersion,
};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The process could not be started or observed.
pub const EXIT_LAUNCH_FAILED: i32 = -1;
/// The process was terminated by a signal and reported no exit code.
pub const EXIT_SIGNALED: i32 = -2;
/// The process outlived the configured timeout and was killed.
pub const EXIT_TIMED_OUT: i32 = 124;
/// The invocation was interrupted while the process was running.
pub const EXIT_CANCELLED: i32 = 130;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared interrupt flag, raised from a signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything needed to launch one run.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    pub pair: &'a Pair,
    pub client_image: Option<&'a str>,
    pub version: DraftVersion,
    pub target: &'a RunTarget,
    /// Position among this pair's earlier targets of the same mode; keeps
    /// transcript names distinct.
    pub ordinal: usize,
}

impl RunRequest<'_> {
    /// Transcript name without the ordinal suffix.
    pub fn log_stem(&self) -> String {
        format!(
            "{}_to_{}_{}",
            self.pair.client, self.pair.relay, self.target.mode
        )
    }

    pub fn log_file_name(&self) -> String {
        let stem = self.log_stem();
        if self.ordinal == 0 {
            format!("{stem}.log")
        } else {
            format!("{stem}_{}.log", self.ordinal)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub log_dir: PathBuf,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl ExecutorOptions {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct RunExecutor {
    launcher: Box<dyn Launcher>,
    options: ExecutorOptions,
    cancel: CancelFlag,
}

impl RunExecutor {
    pub fn new(launcher: Box<dyn Launcher>, options: ExecutorOptions) -> Self {
        Self {
            launcher,
            options,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn log_dir(&self) -> &Path {
        &self.options.log_dir
    }

    pub fn execute(&self, request: &RunRequest<'_>) -> Run {
        let log_file = request.log_file_name();
        let log_path = self.options.log_dir.join(&log_file);
        let started = Instant::now();

        let exit_code = match self.launch_and_wait(request, &log_path) {
            Ok(code) => code,
            Err(e) => {
                warn!(
                    "Could not run {} against {}: {e}",
                    request.pair, request.target
                );
                note_launch_failure(&log_path, &e.to_string());
                EXIT_LAUNCH_FAILED
            }
        };
        let status = RunStatus::from_exit_code(exit_code);
        info!(
            "{} [{}] {} -> {status} (exit {exit_code})",
            request.pair, request.version, request.target
        );

        Run {
            client: request.pair.client.clone(),
            relay: request.pair.relay.clone(),
            version: request.version,
            mode: request.target.mode,
            target: request.target.reference.clone(),
            tls_disable_verify: request.target.tls_disable_verify,
            status,
            exit_code,
            log_file,
            transport: match request.target.mode {
                Mode::Remote => request.target.transport.clone(),
                Mode::Docker => None,
            },
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }

    fn launch_and_wait(&self, request: &RunRequest<'_>, log_path: &Path) -> Result<i32> {
        if self.cancel.is_cancelled() {
            return Ok(EXIT_CANCELLED);
        }

        let mut command = self.launcher.command(request)?;
        let shell_cmd = to_shell_command(&command);
        debug!("Launching via {}: {shell_cmd}", self.launcher.name());

        std::fs::create_dir_all(&self.options.log_dir)?;
        let mut log = File::create(log_path)?;
        writeln!(
            log,
            "# {} at {} against {}\n# {shell_cmd}",
            request.pair, request.version, request.target
        )?;
        log.flush()?;
        let stderr = log.try_clone()?;

        // A terminal interrupt must not reach the child directly; only the
        // executor decides when it stops.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(stderr))
            .spawn()?;
        match self.wait_for_child(&mut child)? {
            Waited::Exited(code) => Ok(code),
            Waited::Stopped(code) => {
                self.clean_up(request, log_path);
                Ok(code)
            }
        }
    }

    fn wait_for_child(&self, child: &mut Child) -> Result<Waited> {
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                if self.cancel.is_cancelled() {
                    return Ok(Waited::Exited(EXIT_CANCELLED));
                }
                return Ok(Waited::Exited(status.code().unwrap_or(EXIT_SIGNALED)));
            }
            if self.cancel.is_cancelled() {
                warn!("Interrupted, stopping pid {}", child.id());
                terminate(child);
                return Ok(Waited::Stopped(EXIT_CANCELLED));
            }
            if started.elapsed() >= self.options.timeout {
                warn!(
                    "Timed out after {:?}, stopping pid {}",
                    self.options.timeout,
                    child.id()
                );
                terminate(child);
                return Ok(Waited::Stopped(EXIT_TIMED_OUT));
            }
            thread::sleep(self.options.poll_interval);
        }
    }

    /// Release whatever a killed run left behind (containers, networks).
    fn clean_up(&self, request: &RunRequest<'_>, log_path: &Path) {
        let command = match self.launcher.cleanup(request) {
            Ok(Some(command)) => command,
            Ok(None) => return,
            Err(e) => {
                warn!("No cleanup for {} against {}: {e}", request.pair, request.target);
                return;
            }
        };
        let shell_cmd = to_shell_command(&command);
        debug!("Cleaning up via {}: {shell_cmd}", self.launcher.name());
        if let Err(e) = self.run_cleanup(command, &shell_cmd, log_path) {
            warn!("Cleanup `{shell_cmd}` failed: {e}");
        }
    }

    fn run_cleanup(&self, mut command: Command, shell_cmd: &str, log_path: &Path) -> Result<()> {
        let mut log = OpenOptions::new().create(true).append(true).open(log_path)?;
        writeln!(log, "# cleanup: {shell_cmd}")?;
        log.flush()?;
        let stderr = log.try_clone()?;

        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(stderr))
            .spawn()?;
        let started = Instant::now();
        while child.try_wait()?.is_none() {
            if started.elapsed() >= self.options.timeout {
                warn!("Cleanup timed out, stopping pid {}", child.id());
                terminate(&mut child);
                break;
            }
            thread::sleep(self.options.poll_interval);
        }
        Ok(())
    }
}

/// How a launched process ended.
enum Waited {
    Exited(i32),
    /// Killed by the executor on timeout or interrupt.
    Stopped(i32),
}

fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn note_launch_failure(log_path: &Path, reason: &str) {
    if let Ok(mut log) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    {
        let _ = writeln!(log, "# launch failed: {reason}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Runs the target reference as a shell script.
    struct ScriptLauncher;

    impl Launcher for ScriptLauncher {
        fn command(&self, request: &RunRequest<'_>) -> Result<Command> {
            let mut command = Command::new("sh");
            command.arg("-c").arg(&request.target.reference);
            Ok(command)
        }

        fn name(&self) -> &'static str {
            "script"
        }
    }

    fn target(script: &str) -> RunTarget {
        RunTarget {
            mode: Mode::Docker,
            reference: script.to_string(),
            transport: None,
            tls_disable_verify: false,
        }
    }

    fn run_script(executor: &RunExecutor, script: &str) -> Run {
        let pair = Pair::new("client", "relay");
        let target = target(script);
        executor.execute(&RunRequest {
            pair: &pair,
            client_image: Some("client"),
            version: DraftVersion::new(14),
            target: &target,
            ordinal: 0,
        })
    }

    fn executor(dir: &TempDir) -> RunExecutor {
        RunExecutor::new(Box::new(ScriptLauncher), ExecutorOptions::new(dir.path()))
    }

    #[test]
    fn test_exit_zero_passes_and_captures_output() {
        let dir = TempDir::new().unwrap();
        let run = run_script(&executor(&dir), "echo hello-relay; echo oops >&2");

        assert_eq!(run.status, RunStatus::Pass);
        assert_eq!(run.exit_code, 0);
        assert_eq!(run.log_file, "client_to_relay_docker.log");
        let transcript = std::fs::read_to_string(dir.path().join(&run.log_file)).unwrap();
        assert!(transcript.contains("hello-relay"));
        assert!(transcript.contains("oops"));
    }

    #[test]
    fn test_non_zero_exit_fails() {
        let dir = TempDir::new().unwrap();
        let run = run_script(&executor(&dir), "exit 3");
        assert_eq!(run.status, RunStatus::Fail);
        assert_eq!(run.exit_code, 3);
    }

    #[test]
    fn test_timeout_kills_and_fails() {
        let dir = TempDir::new().unwrap();
        let executor = RunExecutor::new(
            Box::new(ScriptLauncher),
            ExecutorOptions::new(dir.path()).with_timeout(Duration::from_millis(200)),
        );
        let started = Instant::now();
        let run = run_script(&executor, "sleep 10");
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(run.status, RunStatus::Fail);
        assert_eq!(run.exit_code, EXIT_TIMED_OUT);
    }

    #[test]
    fn test_launch_failure_is_recorded_not_raised() {
        struct MissingBinary;
        impl Launcher for MissingBinary {
            fn command(&self, _: &RunRequest<'_>) -> Result<Command> {
                Ok(Command::new("/nonexistent/interop-client"))
            }
            fn name(&self) -> &'static str {
                "missing"
            }
        }

        let dir = TempDir::new().unwrap();
        let executor = RunExecutor::new(Box::new(MissingBinary), ExecutorOptions::new(dir.path()));
        let run = run_script(&executor, "unused");
        assert_eq!(run.status, RunStatus::Fail);
        assert_eq!(run.exit_code, EXIT_LAUNCH_FAILED);
        let transcript = std::fs::read_to_string(dir.path().join(&run.log_file)).unwrap();
        assert!(transcript.contains("launch failed"));
    }

    #[test]
    fn test_cancelled_run_is_recorded_as_failure() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelFlag::new();
        let executor = executor(&dir).with_cancel_flag(cancel.clone());

        let trigger = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            trigger.cancel();
        });
        let run = run_script(&executor, "sleep 10");
        handle.join().unwrap();

        assert_eq!(run.status, RunStatus::Fail);
        assert_eq!(run.exit_code, EXIT_CANCELLED);
    }

    /// Raises the cancel flag as the run starts, like an interrupt arriving
    /// while the child is being launched; the child then dies of SIGINT itself.
    struct InterruptedLauncher(CancelFlag);

    impl Launcher for InterruptedLauncher {
        fn command(&self, _: &RunRequest<'_>) -> Result<Command> {
            self.0.cancel();
            let mut command = Command::new("sh");
            command.arg("-c").arg("kill -INT $$; sleep 5");
            Ok(command)
        }

        fn name(&self) -> &'static str {
            "interrupted"
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_child_killed_by_interrupt_counts_as_cancelled() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelFlag::new();
        let executor = RunExecutor::new(
            Box::new(InterruptedLauncher(cancel.clone())),
            ExecutorOptions::new(dir.path()),
        )
        .with_cancel_flag(cancel);

        let run = run_script(&executor, "unused");
        assert_eq!(run.exit_code, EXIT_CANCELLED);
        assert_eq!(run.status, RunStatus::Fail);
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_without_interrupt_is_reported_as_signaled() {
        let dir = TempDir::new().unwrap();
        let run = run_script(&executor(&dir), "kill -TERM $$; sleep 5");
        assert_eq!(run.exit_code, EXIT_SIGNALED);
        assert_eq!(run.status, RunStatus::Fail);
    }

    /// Hangs, and on cleanup leaves a marker next to the transcripts.
    struct HangingLauncher {
        marker: PathBuf,
        hang: bool,
    }

    impl Launcher for HangingLauncher {
        fn command(&self, _: &RunRequest<'_>) -> Result<Command> {
            let mut command = Command::new("sh");
            command
                .arg("-c")
                .arg(if self.hang { "exec sleep 10" } else { "exit 0" });
            Ok(command)
        }

        fn cleanup(&self, _: &RunRequest<'_>) -> Result<Option<Command>> {
            let mut command = Command::new("sh");
            command
                .arg("-c")
                .arg(format!("echo released > '{}'", self.marker.display()));
            Ok(Some(command))
        }

        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    #[test]
    fn test_timed_out_run_is_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("released");
        let executor = RunExecutor::new(
            Box::new(HangingLauncher {
                marker: marker.clone(),
                hang: true,
            }),
            ExecutorOptions::new(dir.path()).with_timeout(Duration::from_millis(200)),
        );

        let run = run_script(&executor, "unused");
        assert_eq!(run.exit_code, EXIT_TIMED_OUT);
        assert!(marker.exists());
        let transcript = std::fs::read_to_string(dir.path().join(&run.log_file)).unwrap();
        assert!(transcript.contains("# cleanup: sh -c"));
    }

    #[test]
    fn test_finished_run_needs_no_cleanup() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("released");
        let executor = RunExecutor::new(
            Box::new(HangingLauncher {
                marker: marker.clone(),
                hang: false,
            }),
            ExecutorOptions::new(dir.path()),
        );

        let run = run_script(&executor, "unused");
        assert_eq!(run.exit_code, 0);
        assert!(!marker.exists());
    }

    #[test]
    fn test_log_names_include_ordinal_after_first() {
        let pair = Pair::new("a", "b");
        let target = RunTarget {
            mode: Mode::Remote,
            reference: "https://b".to_string(),
            transport: None,
            tls_disable_verify: false,
        };
        let mut request = RunRequest {
            pair: &pair,
            client_image: None,
            version: DraftVersion::new(14),
            target: &target,
            ordinal: 0,
        };
        assert_eq!(request.log_file_name(), "a_to_b_remote.log");
        request.ordinal = 2;
        assert_eq!(request.log_file_name(), "a_to_b_remote_2.log");
    }
}
