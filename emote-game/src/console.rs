//! Headless presentation shell
//!
//! Reads control lines from stdin and forwards them to the scheduler:
//!
//! ```text
//! start <name>   begin a round
//! stop           end the round and record the score
//! board          show the leaderboard
//! status         show round state and the current dominant emotion
//! quit           exit
//! ```

use std::io::{self, BufRead, BufReader};
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::round::ValidationError;
use crate::scheduler::Command;

pub const USAGE: &str = "commands: start <name> | stop | board | status | quit";

/// Why a console line was not understood
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Blank,
    MissingName,
    Unknown(String),
}

/// Parse one console line
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Blank);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb.to_lowercase().as_str() {
        "start" => {
            if rest.is_empty() {
                Err(ParseError::MissingName)
            } else {
                Ok(Command::Start(rest.to_string()))
            }
        }
        "stop" => Ok(Command::Stop),
        "board" | "leaderboard" => Ok(Command::ShowLeaderboard),
        "status" => Ok(Command::Status),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

/// Forward stdin lines to `commands` until EOF or the receiver is dropped
///
/// EOF sends `Quit`. The reader is a plain OS thread outside the runtime;
/// callers do not join it, so a read still parked on stdin ends with the
/// process.
pub fn spawn_console(commands: mpsc::Sender<Command>) -> io::Result<thread::JoinHandle<()>> {
    spawn_reader(BufReader::new(io::stdin()), commands)
}

/// Forward lines from `reader` to `commands` on a dedicated thread
pub fn spawn_reader<R>(reader: R, commands: mpsc::Sender<Command>) -> io::Result<thread::JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("emote-console".to_string())
        .spawn(move || forward_lines(reader, &commands))
}

fn forward_lines<R: BufRead>(reader: R, commands: &mpsc::Sender<Command>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                break;
            }
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(ParseError::Blank) => continue,
            Err(ParseError::MissingName) => {
                warn!("{}", ValidationError::EmptyName);
                continue;
            }
            Err(ParseError::Unknown(verb)) => {
                warn!("Unknown command {:?}; {}", verb, USAGE);
                continue;
            }
        };

        if commands.blocking_send(command).is_err() {
            return;
        }
    }

    debug!("Console input closed");
    let _ = commands.blocking_send(Command::Quit);
}
