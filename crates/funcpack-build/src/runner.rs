use std::collections::{BTreeMap, VecDeque};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Mutex, PoisonError};

/// Number of trailing output lines kept for error reports.
const DEFAULT_TAIL_LINES: usize = 40;

/// One external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Variables added to (or overriding) the inherited environment
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, cwd: &Path) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Value following `flag`, for `--flag value` style arguments.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("`{program}` could not be started")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{program}` exited unsuccessfully")]
    Exit {
        program: String,
        /// `None` when terminated by a signal
        code: Option<i32>,
        output_tail: Vec<String>,
    },
}

/// Abstraction over subprocess execution for testability.
///
/// Production code uses [`SystemRunner`], tests use fakes or mockall mocks.
pub trait CommandRunner: Send + Sync {
    /// Run to completion, forwarding output for observability.
    fn run(&self, spec: &CommandSpec) -> Result<(), RunError>;
}

/// Runs commands as real subprocesses.
///
/// stdout and stderr are forwarded line by line as `tracing` events on the
/// `funcpack::tool` target; the last lines are kept for error reports.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    tail_lines: usize,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<(), RunError> {
        tracing::info!(
            program = %spec.program,
            args = ?spec.args,
            cwd = %spec.cwd.display(),
            "running command"
        );

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RunError::Spawn {
                program: spec.program.clone(),
                source: e,
            })?;

        let tail = Mutex::new(VecDeque::with_capacity(self.tail_lines));
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        std::thread::scope(|s| {
            if let Some(out) = stdout {
                s.spawn(|| forward_lines(out, &spec.program, &tail, self.tail_lines));
            }
            if let Some(err) = stderr {
                s.spawn(|| forward_lines(err, &spec.program, &tail, self.tail_lines));
            }
        });

        let status = child.wait().map_err(|e| RunError::Spawn {
            program: spec.program.clone(),
            source: e,
        })?;

        if status.success() {
            Ok(())
        } else {
            let output_tail = tail
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner)
                .into_iter()
                .collect();
            Err(RunError::Exit {
                program: spec.program.clone(),
                code: status.code(),
                output_tail,
            })
        }
    }
}

fn forward_lines(
    stream: impl Read,
    program: &str,
    tail: &Mutex<VecDeque<String>>,
    limit: usize,
) {
    for line in BufReader::new(stream).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::debug!(program, error = %e, "stopped reading command output");
                break;
            }
        };
        tracing::info!(target: "funcpack::tool", tool = program, "{line}");

        let mut tail = tail.lock().unwrap_or_else(PoisonError::into_inner);
        if tail.len() == limit {
            tail.pop_front();
        }
        tail.push_back(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_args_and_env() {
        let mut env = BTreeMap::new();
        env.insert("NODE_ENV".to_owned(), "production".to_owned());
        let spec = CommandSpec::new("yarn", Path::new("/work"))
            .arg("install")
            .args(["--modules-folder", "/work/node_modules_dev"])
            .envs(&env);

        assert_eq!(spec.program, "yarn");
        assert!(spec.has_arg("install"));
        assert_eq!(spec.flag_value("--modules-folder"), Some("/work/node_modules_dev"));
        assert_eq!(spec.flag_value("--missing"), None);
        assert_eq!(spec.env["NODE_ENV"], "production");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_reports_exit_code_and_tail() {
        let tmp = tempfile::TempDir::new().unwrap();
        let spec = CommandSpec::new("sh", tmp.path()).args(["-c", "echo boom; exit 3"]);

        let err = SystemRunner::new().run(&spec).unwrap_err();
        match err {
            RunError::Exit {
                code, output_tail, ..
            } => {
                assert_eq!(code, Some(3));
                assert_eq!(output_tail, vec!["boom"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn system_runner_reports_missing_program() {
        let tmp = tempfile::TempDir::new().unwrap();
        let spec = CommandSpec::new("funcpack-no-such-program", tmp.path());
        assert!(matches!(
            SystemRunner::new().run(&spec),
            Err(RunError::Spawn { .. })
        ));
    }
}
