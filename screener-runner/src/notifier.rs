//! Alert notification collaborators.
//!
//! A failed notification is logged by the caller and otherwise ignored; it
//! never interrupts a cycle.

use std::io;
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' exited with {status}")]
    Failed { command: String, status: ExitStatus },
}

pub trait Notifier: Send + Sync {
    /// Notify that `symbol` met `condition` with the given indicator `value`.
    fn notify(&self, symbol: &str, value: f64, condition: &str) -> Result<(), NotifyError>;
}

/// Title and body of a notification.
pub fn notification_text(symbol: &str, value: f64, condition: &str) -> (String, String) {
    (
        format!("SCREENER ALERT: {symbol}"),
        format!("{symbol} is {condition}! Value: {value:.2}"),
    )
}

/// Writes notifications to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, symbol: &str, value: f64, condition: &str) -> Result<(), NotifyError> {
        let (title, body) = notification_text(symbol, value, condition);
        info!(target: "screener::notify", %title, "{body}");
        Ok(())
    }
}

/// Runs `program TITLE MESSAGE` for each alert, e.g. `notify-send`.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, symbol: &str, value: f64, condition: &str) -> Result<(), NotifyError> {
        let (title, body) = notification_text(symbol, value, condition);
        let status = Command::new(&self.program)
            .arg(title)
            .arg(body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .map_err(|source| NotifyError::Spawn {
                command: self.program.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(NotifyError::Failed {
                command: self.program.clone(),
                status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_formats_value_to_two_places() {
        let (title, body) = notification_text("BTC_USDT", 72.456, "RSI OVERBOUGHT");
        assert_eq!(title, "SCREENER ALERT: BTC_USDT");
        assert_eq!(body, "BTC_USDT is RSI OVERBOUGHT! Value: 72.46");
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let notifier = CommandNotifier::new("/definitely/not/a/real/notifier");
        let err = notifier.notify("X", 1.0, "RSI OVERSOLD").unwrap_err();
        assert!(matches!(err, NotifyError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn command_exit_status_is_checked() {
        assert!(CommandNotifier::new("true").notify("X", 1.0, "c").is_ok());
        assert!(matches!(
            CommandNotifier::new("false").notify("X", 1.0, "c"),
            Err(NotifyError::Failed { .. })
        ));
    }
}
