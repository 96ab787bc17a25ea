//! Line console driving a [`HostShell`]
//!
//! One command per line:
//!
//! ```text
//! toggle <id>            press the toggle of <id>
//! targets <id> <ids...>  set the targets <id> broadcasts to
//! send <json>            publish a raw contract message
//! state                  show every view and the canonical state
//! history                list recent messages
//! unmount <id>           tear <id> down
//! help                   list commands
//! quit                   leave
//! ```

use bulbkit_core::ParticipantId;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use thiserror::Error;

use crate::shell::HostShell;

const HELP: &str = "\
Commands:
  toggle <id>            press the toggle of <id>
  targets <id> <ids...>  set the targets <id> broadcasts to
  send <json>            publish a raw contract message
  state                  show every view and the canonical state
  history                list recent messages
  unmount <id>           tear <id> down
  help                   list commands
  quit                   leave";

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Toggle(ParticipantId),
    Targets(ParticipantId, Vec<ParticipantId>),
    Send(String),
    State,
    History,
    Unmount(ParticipantId),
    Help,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command '{0}', try 'help'")]
    Unknown(String),

    #[error("'{0}' needs a participant id")]
    MissingId(&'static str),

    #[error("'send' needs a JSON message")]
    MissingMessage,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let name = words.first().copied().unwrap_or_default().to_ascii_lowercase();
        let id = |command: &'static str| {
            words
                .get(1)
                .map(|w| ParticipantId::from(*w))
                .ok_or(CommandError::MissingId(command))
        };

        let command = match name.as_str() {
            "toggle" | "t" => Command::Toggle(id("toggle")?),
            "targets" => Command::Targets(
                id("targets")?,
                words.iter().skip(2).map(|w| ParticipantId::from(*w)).collect(),
            ),
            "send" => {
                let rest = line.trim_start().split_once(char::is_whitespace).map(|(_, r)| r.trim());
                match rest {
                    Some(json) if !json.is_empty() => Command::Send(json.to_string()),
                    _ => return Err(CommandError::MissingMessage),
                }
            }
            "state" | "s" => Command::State,
            "history" => Command::History,
            "unmount" => Command::Unmount(id("unmount")?),
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

/// Run one command; returns false once the console should stop
pub fn execute<W: Write>(shell: &mut HostShell, command: Command, out: &mut W) -> io::Result<bool> {
    match command {
        Command::Toggle(id) => match shell.toggle(&id) {
            Ok(correlation_id) => writeln!(out, "sent {}", correlation_id)?,
            Err(err) => writeln!(out, "error: {}", err)?,
        },
        Command::Targets(id, targets) => match shell.select_targets(&id, targets) {
            Ok(()) => match shell.view(&id) {
                Ok(view) => writeln!(out, "{}", view.label())?,
                Err(err) => writeln!(out, "error: {}", err)?,
            },
            Err(err) => writeln!(out, "error: {}", err)?,
        },
        Command::Send(json) => match shell.send_json(&json) {
            Ok(report) => writeln!(out, "delivered to {} handlers", report.delivered)?,
            Err(err) => writeln!(out, "error: {}", err)?,
        },
        Command::State => write_state(shell, out)?,
        Command::History => {
            let history = shell.history();
            if history.is_empty() {
                writeln!(out, "(no messages)")?;
            }
            for message in history {
                writeln!(out, "{}  {}", message.correlation_id(), message.description())?;
            }
        }
        Command::Unmount(id) => match shell.unmount(&id) {
            Ok(()) => writeln!(out, "unmounted {}", id)?,
            Err(err) => writeln!(out, "error: {}", err)?,
        },
        Command::Help => writeln!(out, "{}", HELP)?,
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

fn write_state<W: Write>(shell: &HostShell, out: &mut W) -> io::Result<()> {
    for (id, label) in shell.participants() {
        match shell.view(&id) {
            Ok(view) => writeln!(out, "{:<12} {}", label, view.label())?,
            Err(_) => match shell.load_error(&id) {
                Some(err) => writeln!(out, "{:<12} {} (failed: {})", label, id, err)?,
                None => writeln!(out, "{:<12} {} (unmounted)", label, id)?,
            },
        }
    }
    let canonical = shell
        .snapshot()
        .into_iter()
        .map(|(id, on)| format!("{}={}", id, if on { "on" } else { "off" }))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "mediator     {}", canonical)
}

/// Read commands from `input` until it ends or `quit` is entered
pub fn run<R: BufRead, W: Write>(shell: &mut HostShell, input: R, mut out: W) -> io::Result<()> {
    writeln!(out, "Type 'help' for commands.")?;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => {
                if !execute(shell, command, &mut out)? {
                    break;
                }
            }
            Err(err) => writeln!(out, "{}", err)?,
        }
        out.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulbkit_core::participant_ids;
    use bulbkit_settings::Config;

    fn shell() -> HostShell {
        HostShell::from_config(&Config::default()).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("toggle mfe1".parse::<Command>(), Ok(Command::Toggle("mfe1".into())));
        assert_eq!(
            "targets host mfe2 mfe3".parse::<Command>(),
            Ok(Command::Targets("host".into(), participant_ids(["mfe2", "mfe3"])))
        );
        assert_eq!("targets host".parse::<Command>(), Ok(Command::Targets("host".into(), vec![])));
        assert_eq!("STATE".parse::<Command>(), Ok(Command::State));
        assert_eq!("q".parse::<Command>(), Ok(Command::Quit));
        assert_eq!(
            "toggle".parse::<Command>(),
            Err(CommandError::MissingId("toggle"))
        );
        assert_eq!(
            r#"send {"type": "BULB_SET_REQUEST"}"#.parse::<Command>(),
            Ok(Command::Send(r#"{"type": "BULB_SET_REQUEST"}"#.to_string()))
        );
        assert_eq!("send   ".parse::<Command>(), Err(CommandError::MissingMessage));
        assert_eq!(
            "dance".parse::<Command>(),
            Err(CommandError::Unknown("dance".to_string()))
        );
    }

    #[test]
    fn test_run_session() {
        let mut shell = shell();
        let input = b"toggle mfe1\n\nstate\nbogus\nunmount mfe3\nstate\nquit\ntoggle host\n";
        let mut out = Vec::new();
        run(&mut shell, &input[..], &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("sent corr-"));
        assert!(text.contains("mediator     host=on mfe1=on mfe2=on mfe3=off"));
        assert!(text.contains("Unknown command 'bogus'"));
        assert!(text.contains("unmounted mfe3"));
        assert!(text.contains("mfe3 (unmounted)"));
        // Nothing after quit runs
        assert_eq!(text.matches("sent corr-").count(), 1);
    }

    #[test]
    fn test_errors_are_reported_not_fatal() {
        let mut shell = shell();
        let mut out = Vec::new();
        assert!(execute(&mut shell, Command::Toggle("ghost".into()), &mut out).unwrap());
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.trim(), "error: Unknown participant: ghost");
    }

    #[test]
    fn test_send_reports_bad_json() {
        let mut shell = shell();
        let mut out = Vec::new();
        execute(&mut shell, Command::Send("{oops".to_string()), &mut out).unwrap();
        execute(
            &mut shell,
            Command::Send(
                r#"{"type":"BULB_SET_REQUEST","source":"mfe3","targets":["mfe3"],"payload":{"state":true}}"#
                    .to_string(),
            ),
            &mut out,
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("error: Invalid message JSON"));
        assert!(text.contains("delivered to 1 handlers"));
        assert_eq!(shell.mediator().state_of(&"mfe3".into()), Some(true));
    }

    #[test]
    fn test_history_lists_pairs() {
        let mut shell = shell();
        let mut out = Vec::new();
        execute(&mut shell, Command::History, &mut out).unwrap();
        execute(&mut shell, Command::Toggle("mfe3".into()), &mut out).unwrap();
        execute(&mut shell, Command::History, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("(no messages)"));
        assert!(text.contains("BULB_SET_REQUEST from mfe3 -> 1 targets, state on"));
        assert!(text.contains("BULB_STATE_CHANGED [mfe3] state on"));
    }
}
