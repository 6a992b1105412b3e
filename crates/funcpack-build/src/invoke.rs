//! Build tool invocation.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::BuildToolError;
use crate::runner::{CommandRunner, CommandSpec, RunError};

/// Runs the framework's build tool once, without retries.
pub struct BuildInvoker<'r, R: CommandRunner + ?Sized> {
    runner: &'r R,
}

impl<'r, R: CommandRunner + ?Sized> BuildInvoker<'r, R> {
    pub fn new(runner: &'r R) -> Self {
        Self { runner }
    }

    pub fn invoke(
        &self,
        tool: &str,
        args: &[String],
        cwd: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<(), BuildToolError> {
        let spec = CommandSpec::new(tool, cwd).args(args.iter().cloned()).envs(env);

        tracing::info!(tool, cwd = %cwd.display(), "invoking build tool");
        self.runner.run(&spec).map_err(|e| match e {
            RunError::Spawn { program, source } => BuildToolError::NotFound {
                tool: program,
                source,
            },
            RunError::Exit {
                program,
                code,
                output_tail,
            } => BuildToolError::Failed {
                tool: program,
                exit_code: code.unwrap_or(-1),
                output_tail,
            },
        })?;

        tracing::info!(tool, "build tool finished");
        Ok(())
    }
}

/// `PATH` with `dirs` prepended to the inherited search path.
pub fn search_path_with(dirs: &[PathBuf]) -> String {
    let inherited = std::env::var_os("PATH").unwrap_or_default();
    let mut all: Vec<PathBuf> = dirs.to_vec();
    all.extend(std::env::split_paths(&inherited));

    std::env::join_paths(&all)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "search path entry contains a separator; using inherited PATH");
            OsString::from(&inherited)
        })
        .to_string_lossy()
        .into_owned()
}
