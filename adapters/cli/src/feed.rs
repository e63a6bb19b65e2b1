//! External command feed: one JSON `InputCommand` per line on stdin.

use std::{
    io::{self, BufRead},
    thread,
};

use anyhow::{Context, Result};
use neuroflight_core::InputCommand;
use neuroflight_system_input::CommandSlot;

/// Parses one feed line and publishes it. Blank lines are ignored.
pub(crate) fn publish_line(line: &str, slot: &CommandSlot) -> Result<()> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }
    let command: InputCommand =
        serde_json::from_str(line).with_context(|| format!("invalid command line `{line}`"))?;
    slot.store(command);
    Ok(())
}

/// Reads commands until the reader is exhausted; the slot is cleared at the end.
pub(crate) fn pump(reader: impl BufRead, slot: &CommandSlot) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                tracing::warn!(%error, "command feed read failed");
                break;
            }
        };
        if let Err(error) = publish_line(&line, slot) {
            tracing::warn!(error = %format!("{error:#}"), "ignoring command");
        }
    }
    slot.clear();
    tracing::info!("command feed closed");
}

/// Feeds stdin into `slot` from a background thread.
pub(crate) fn spawn_stdin(slot: CommandSlot) {
    let _ = thread::spawn(move || pump(io::stdin().lock(), &slot));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_commands_default_missing_directives() {
        let slot = CommandSlot::new();
        publish_line(r#"{"forward": true, "turnLeft": true}"#, &slot).expect("valid line");

        let command = slot.load();
        assert!(command.forward && command.turn_left);
        assert!(!command.start && !command.up);
    }

    #[test]
    fn malformed_lines_leave_the_previous_command() {
        let slot = CommandSlot::new();
        publish_line(r#"{"up": true}"#, &slot).expect("valid line");
        assert!(publish_line("{up", &slot).is_err());
        assert!(slot.load().up);
    }

    #[test]
    fn exhausted_feed_releases_every_directive() {
        let slot = CommandSlot::new();
        let input = "{\"start\": true}\n\n{\"back\": true}\nnot json\n";
        pump(input.as_bytes(), &slot);
        assert_eq!(slot.load(), InputCommand::IDLE);
    }
}
