//! Operator shell hooks run on countdown start and finish

use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// Missing, blank or `#`-commented hook.
    Skipped,
    Spawned,
    Failed,
}

/// Spawn `hook` through `sh -c` without waiting for it.
///
/// Blank and `#`-commented hooks are skipped. A spawn failure is logged and
/// reported as [`HookOutcome::Failed`].
pub fn execute_hook(name: &str, hook: Option<&str>) -> HookOutcome {
    let Some(command) = hook else {
        tracing::debug!(hook = name, "no hook configured");
        return HookOutcome::Skipped;
    };

    let command = command.trim();
    if command.is_empty() {
        tracing::debug!(hook = name, "hook is empty");
        return HookOutcome::Skipped;
    }
    if command.starts_with('#') {
        tracing::debug!(hook = name, command, "hook is commented out");
        return HookOutcome::Skipped;
    }

    match Command::new("sh").arg("-c").arg(command).spawn() {
        Ok(_) => {
            tracing::info!(hook = name, command, "hook started");
            HookOutcome::Spawned
        }
        Err(err) => {
            tracing::warn!(hook = name, command, error = %err, "failed to spawn hook");
            HookOutcome::Failed
        }
    }
}
