//! Points the host-side polling script at a mailbox directory.

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const MONITOR_KEYWORD: &str = "MonitorFile";

/// Replaces the first `MonitorFile "<dir>"` line, keeping its indentation
/// and line ending.
pub fn rewrite_monitor_line(script: &str, dir: &Path) -> Result<String> {
    let mut out = String::with_capacity(script.len() + 64);
    let mut replaced = false;
    for line in script.split_inclusive('\n') {
        if !replaced && line.contains(MONITOR_KEYWORD) && line.contains('"') {
            let body = line.trim_start();
            let indent = &line[..line.len() - body.len()];
            let ending = if line.ends_with("\r\n") {
                "\r\n"
            } else if line.ends_with('\n') {
                "\n"
            } else {
                ""
            };
            out.push_str(&format!(
                "{indent}{MONITOR_KEYWORD} \"{}\"{ending}",
                dir.display()
            ));
            replaced = true;
        } else {
            out.push_str(line);
        }
    }
    if !replaced {
        bail!("no {MONITOR_KEYWORD} line found in the script");
    }
    Ok(out)
}

/// Creates `comm_dir`, rewrites the script in place and returns the
/// absolute script and mailbox paths.
pub fn install(script_path: &Path, comm_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let comm_dir = absolute(comm_dir)?;
    fs::create_dir_all(&comm_dir)
        .with_context(|| format!("failed to create mailbox directory {comm_dir:?}"))?;

    let script = fs::read_to_string(script_path)
        .with_context(|| format!("failed to read script {script_path:?}"))?;
    let updated = rewrite_monitor_line(&script, &comm_dir)
        .with_context(|| format!("cannot update {script_path:?}"))?;
    fs::write(script_path, updated)
        .with_context(|| format!("failed to write script {script_path:?}"))?;

    Ok((absolute(script_path)?, comm_dir))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().context("cannot resolve the working directory")?;
    Ok(cwd.join(path))
}
