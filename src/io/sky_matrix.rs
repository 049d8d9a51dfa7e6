//! Sky radiation matrices from an external tool (Radiance `gendaymtx`).

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::sim::exposure::error::ToolInvocationError;
use crate::sim::exposure::period::Period;
use crate::sim::exposure::radiation::SkyComponent;

pub const DEFAULT_PROGRAM: &str = "gendaymtx";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Provides the sky-matrix text of one component for one weather file.
pub trait SkyMatrixSource {
    fn sky_matrix(
        &self,
        weather: &Path,
        component: SkyComponent,
        period: Period,
    ) -> Result<String, ToolInvocationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub program: String,
    /// Arguments placed before the tool's own arguments (e.g. a wrapper script).
    pub prefix_args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            prefix_args: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ToolSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Runs the sky-matrix tool as a subprocess.
///
/// Invocation: `<program> [prefix_args..] -m 1 <-d|-s> -A -h <weather>`.
#[derive(Debug, Clone)]
pub struct SkyMatrixTool {
    settings: ToolSettings,
    timeout: Duration,
}

impl SkyMatrixTool {
    pub fn new(settings: ToolSettings) -> Self {
        let timeout = settings.timeout();
        Self { settings, timeout }
    }

    /// Overrides the timeout with sub-second precision.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn args(&self, weather: &Path, component: SkyComponent) -> Vec<String> {
        let mut args = self.settings.prefix_args.clone();
        args.extend(
            ["-m", "1", component.flag(), "-A", "-h"]
                .iter()
                .map(|s| s.to_string()),
        );
        args.push(weather.display().to_string());
        args
    }

    fn command_line(&self, args: &[String]) -> String {
        std::iter::once(self.settings.program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl SkyMatrixSource for SkyMatrixTool {
    fn sky_matrix(
        &self,
        weather: &Path,
        component: SkyComponent,
        period: Period,
    ) -> Result<String, ToolInvocationError> {
        let args = self.args(weather, component);
        let command = self.command_line(&args);
        tracing::debug!(%command, %period, "running sky matrix tool");

        let mut child = Command::new(&self.settings.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolInvocationError::Spawn {
                command: command.clone(),
                period,
                source,
            })?;

        // Drain both pipes so a large matrix cannot block the child
        let deadline = Instant::now() + self.timeout;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match wait_until(&mut child, deadline) {
            Ok(Some(status)) => status,
            Ok(None) => {
                return Err(ToolInvocationError::Timeout {
                    command,
                    period,
                    timeout: self.timeout,
                });
            }
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolInvocationError::Wait {
                    command,
                    period,
                    source,
                });
            }
        };

        // A process left behind by the tool may keep the pipes open
        let (Some(stdout), Some(stderr)) = (collect(stdout, deadline), collect(stderr, deadline))
        else {
            tracing::warn!(%command, %period, "tool output still open at the deadline");
            return Err(ToolInvocationError::Timeout {
                command,
                period,
                timeout: self.timeout,
            });
        };

        if !status.success() {
            return Err(ToolInvocationError::NonZeroExit {
                command,
                period,
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        String::from_utf8(stdout).map_err(|_| ToolInvocationError::NonUtf8Output { command, period })
    }
}

/// Polls the child until it exits or `deadline` passes.
///
/// On timeout the child is killed and reaped, and `Ok(None)` is returned.
fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Reads `pipe` to the end on a helper thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
        rx
    })
}

/// Waits for a drained pipe until `deadline`.
///
/// Returns `None` if the pipe is still open at the deadline. The reader
/// thread is then left to finish on its own.
fn collect(rx: Option<Receiver<Vec<u8>>>, deadline: Instant) -> Option<Vec<u8>> {
    let Some(rx) = rx else {
        return Some(Vec::new());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(buf) => Some(buf),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_args_layout() {
        let tool = SkyMatrixTool::new(ToolSettings::default());
        let weather = PathBuf::from("site_3.wea");
        assert_eq!(
            tool.args(&weather, SkyComponent::Direct),
            vec!["-m", "1", "-d", "-A", "-h", "site_3.wea"]
        );
        assert_eq!(tool.args(&weather, SkyComponent::Diffuse)[2], "-s");
    }

    #[test]
    fn test_prefix_args_come_first() {
        let tool = SkyMatrixTool::new(ToolSettings {
            program: "wrapper".into(),
            prefix_args: vec!["--quiet".into()],
            ..Default::default()
        });
        let args = tool.args(Path::new("a.wea"), SkyComponent::Direct);
        assert_eq!(args[0], "--quiet");
        assert_eq!(
            tool.command_line(&args),
            "wrapper --quiet -m 1 -d -A -h a.wea"
        );
    }

    #[test]
    fn test_spawn_failure() {
        let tool = SkyMatrixTool::new(ToolSettings {
            program: "/nonexistent/gendaymtx-missing".into(),
            ..Default::default()
        });
        let err = tool
            .sky_matrix(Path::new("x.wea"), SkyComponent::Direct, Period::Annual)
            .unwrap_err();
        assert!(matches!(err, ToolInvocationError::Spawn { .. }));
        assert!(err.to_string().contains("gendaymtx-missing"));
    }

    #[cfg(unix)]
    fn shell_tool(script: &str) -> SkyMatrixTool {
        // `sh -c <script> <name> <args..>` exposes the tool arguments as $@
        SkyMatrixTool::new(ToolSettings {
            program: "sh".into(),
            prefix_args: vec!["-c".into(), script.into(), "gendaymtx".into()],
            timeout_secs: 10,
        })
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout() {
        let tool = shell_tool("echo \"$@\"");
        let out = tool
            .sky_matrix(Path::new("jan.wea"), SkyComponent::Diffuse, Period::Month(1))
            .unwrap();
        assert_eq!(out.trim(), "-m 1 -s -A -h jan.wea");
    }

    #[cfg(unix)]
    #[test]
    fn test_large_output_does_not_deadlock() {
        let tool = shell_tool("i=0; while [ $i -lt 20000 ]; do echo '1.0 2.0 3.0'; i=$((i+1)); done");
        let out = tool
            .sky_matrix(Path::new("x.wea"), SkyComponent::Direct, Period::Annual)
            .unwrap();
        assert_eq!(out.lines().count(), 20000);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_reports_stderr() {
        let tool = shell_tool("echo boom >&2; exit 3");
        let err = tool
            .sky_matrix(Path::new("x.wea"), SkyComponent::Direct, Period::Month(7))
            .unwrap_err();
        match &err {
            ToolInvocationError::NonZeroExit { stderr, period, command, .. } => {
                assert_eq!(stderr, "boom");
                assert_eq!(*period, Period::Month(7));
                assert!(command.starts_with("sh -c"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("July"));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let tool = shell_tool("exec sleep 5").with_timeout(Duration::from_millis(200));
        let started = Instant::now();
        let err = tool
            .sky_matrix(Path::new("x.wea"), SkyComponent::Direct, Period::Annual)
            .unwrap_err();
        assert!(matches!(err, ToolInvocationError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_covers_inherited_output_pipe() {
        // The shell exits at once, the background sleep keeps stdout open
        let tool = shell_tool("sleep 4 & echo started").with_timeout(Duration::from_millis(300));
        let started = Instant::now();
        let err = tool
            .sky_matrix(Path::new("x.wea"), SkyComponent::Direct, Period::Annual)
            .unwrap_err();
        assert!(matches!(err, ToolInvocationError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
