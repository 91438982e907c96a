//! Platform Services: subprocess spawning with captured stdout and an exit
//! code (spec section 1's external-collaborator contract, section 5's
//! "all suspension points are blocking calls").

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{CrucibleError, Result};

pub struct Invocation<'a> {
    pub program: &'a str,
    pub args: &'a [String],
    pub working_dir: Option<&'a Path>,
}

pub struct Output {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs `invocation` to completion, capturing stdout/stderr. Blocking, per
/// spec section 5 - there is no async path in this engine.
pub fn run(invocation: &Invocation<'_>) -> Result<Output> {
    let mut command = Command::new(invocation.program);
    command.args(invocation.args);
    if let Some(dir) = invocation.working_dir {
        command.current_dir(dir);
    }
    command.stdout(Stdio::piped()).stderr(Stdio::piped());

    let child = command.spawn().map_err(|source| {
        CrucibleError::Io {
            path: invocation.program.into(),
            source,
        }
    })?;

    let output = child.wait_with_output().map_err(|source| CrucibleError::Io {
        path: invocation.program.into(),
        source,
    })?;

    Ok(Output {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Renders an invocation the way `--verbose` printing and the compilation
/// database want it: program followed by its arguments, shell-quoted only
/// where an argument actually contains whitespace.
pub fn render_command_line(program: &str, args: &[String]) -> String {
    let mut parts = vec![program.to_string()];
    for arg in args {
        if arg.contains(' ') {
            parts.push(format!("\"{arg}\""));
        } else {
            parts.push(arg.clone());
        }
    }
    parts.join(" ")
}
