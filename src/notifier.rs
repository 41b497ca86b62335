//! Best-effort desktop notifications.
//!
//! Callers log and discard every [`NotifyError`]; a missing helper binary or a
//! headless session must never affect conversion.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::NotifyError;

/// Something that can show the user a short message.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

/// Notifier used when notifications are turned off.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _title: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Helper {
    NotifySend,
    Osascript,
}

impl Helper {
    fn program(self) -> &'static str {
        match self {
            Helper::NotifySend => "notify-send",
            Helper::Osascript => "osascript",
        }
    }
}

/// Shells out to `notify-send` (freedesktop) or `osascript` (macOS).
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    helper: Option<(Helper, PathBuf)>,
    icon: Option<PathBuf>,
}

impl DesktopNotifier {
    /// Locate a helper on PATH. Construction never fails; if nothing is found
    /// every `notify` call returns [`NotifyError::Unavailable`].
    pub fn new(icon: Option<PathBuf>) -> Self {
        let candidates: &[Helper] = if cfg!(target_os = "macos") {
            &[Helper::Osascript, Helper::NotifySend]
        } else {
            &[Helper::NotifySend]
        };

        let helper = candidates
            .iter()
            .find_map(|h| which::which(h.program()).ok().map(|p| (*h, p)));

        match &helper {
            Some((h, path)) => log::debug!("notifications via {} ({})", h.program(), path.display()),
            None => log::warn!("no desktop notification helper found; notifications disabled"),
        }

        Self { helper, icon }
    }

    pub fn is_available(&self) -> bool {
        self.helper.is_some()
    }

    fn command(&self, title: &str, message: &str) -> Option<Command> {
        let (helper, program) = self.helper.as_ref()?;
        let mut cmd = Command::new(program);
        match helper {
            Helper::NotifySend => {
                if let Some(icon) = &self.icon {
                    cmd.arg("--icon").arg(icon);
                }
                cmd.arg("--app-name").arg("webpwatch").arg(title).arg(message);
            }
            Helper::Osascript => {
                cmd.arg("-e").arg(apple_script(title, message));
            }
        }
        Some(cmd)
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let mut cmd = self.command(title, message).ok_or(NotifyError::Unavailable)?;
        let program = cmd.get_program().to_string_lossy().into_owned();

        let status = cmd.status().map_err(|source| NotifyError::Spawn {
            program: program.clone(),
            source,
        })?;

        if !status.success() {
            return Err(NotifyError::Failed {
                program,
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

/// `display notification` one-liner with both strings escaped for AppleScript.
fn apple_script(title: &str, message: &str) -> String {
    format!(
        "display notification \"{}\" with title \"{}\"",
        escape_apple(message),
        escape_apple(title)
    )
}

fn escape_apple(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Message body shown after a successful conversion.
pub fn converted_message(source: &Path) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string());
    format!("Converted {}", name)
}
