//! Common test utilities for CLI tests.

use std::path::Path;
use std::process::Command;

/// Output of one `escript` invocation.
pub struct Run {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run the `escript` binary with `args`, from `cwd`, with a clean logging
/// environment.
pub fn run_escript(cwd: &Path, args: &[&str]) -> Run {
    let output = Command::new(env!("CARGO_BIN_EXE_escript"))
        .current_dir(cwd)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("ECOMPILE_PATH_EM")
        .env_remove("ECOMPILE_PATH_INC")
        .output()
        .expect("Failed to execute escript");

    Run {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}
