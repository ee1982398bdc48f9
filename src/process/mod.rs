use std::path::Path;
use std::process::{Child, Command, Stdio};

use log::{debug, info, warn};
use sysinfo::System;

const BYTES_PER_GIB: u64 = 1024 * 1024 * 1024;

#[derive(Clone, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Start `command` in `working_dir` with the launcher's console attached.
    pub fn spawn(&self, command: &[String], working_dir: &Path) -> Result<Child, String> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| "launch command is empty".to_owned())?;

        info!("launch: starting {program}");
        debug!("launch: {}", command.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        cmd.spawn()
            .map_err(|e| format!("failed to start game process: {e}"))
    }

    /// Spawn the game and reap it on a blocking worker so the UI stays free.
    pub fn run_detached(&self, command: &[String], working_dir: &Path) -> Result<(), String> {
        let mut child = self.spawn(command, working_dir)?;
        let pid = child.id();
        info!("launch: process {pid} started");
        tokio::task::spawn_blocking(move || match child.wait() {
            Ok(status) => info!("launch: process {pid} exited with {status}"),
            Err(err) => warn!("launch: lost track of process {pid}: {err}"),
        });
        Ok(())
    }
}

/// `-Xmx`/`-Xms` pair for the configured memory.
pub fn memory_flags(ram_gb: u32) -> Vec<String> {
    vec![format!("-Xmx{ram_gb}G"), format!("-Xms{ram_gb}G")]
}

pub fn total_memory_bytes() -> Option<u64> {
    let mut system = System::new();
    system.refresh_memory();
    let total = system.total_memory();
    (total > 0).then_some(total)
}

/// Log a warning when the requested heap is larger than physical memory.
///
/// Returns whether the request exceeds it.
pub fn warn_if_exceeds_memory(ram_gb: u32) -> bool {
    let Some(total) = total_memory_bytes() else {
        debug!("launch: unable to determine system memory");
        return false;
    };
    let exceeds = exceeds_memory(ram_gb, total);
    if exceeds {
        warn!(
            "launch: {ram_gb} GB requested but only {:.1} GB installed",
            total as f64 / BYTES_PER_GIB as f64
        );
    }
    exceeds
}

fn exceeds_memory(ram_gb: u32, total_bytes: u64) -> bool {
    u64::from(ram_gb).saturating_mul(BYTES_PER_GIB) > total_bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_flags_use_gigabytes() {
        assert_eq!(memory_flags(4), ["-Xmx4G", "-Xms4G"]);
    }

    #[test]
    fn compares_against_installed_memory() {
        assert!(!exceeds_memory(4, 8 * BYTES_PER_GIB));
        assert!(!exceeds_memory(8, 8 * BYTES_PER_GIB));
        assert!(exceeds_memory(16, 8 * BYTES_PER_GIB));
    }

    #[test]
    fn empty_command_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(ProcessLauncher::new().spawn(&[], tmp.path()).is_err());
    }

    #[test]
    fn missing_program_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let command = vec![tmp.path().join("no-such-java").display().to_string()];
        let err = ProcessLauncher::new().spawn(&command, tmp.path()).unwrap_err();
        assert!(err.contains("failed to start game process"));
    }
}
