//! Parsing of interactive commands

use thiserror::Error;

/// A command typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start { minutes: Option<u32> },
    Continue,
    Stop,
    Run { code: String },
    List { path: String },
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no command given")]
    Empty,

    #[error("unknown command '{0}', type `help` for a list")]
    Unknown(String),

    #[error("'{0}' is not a whole number of minutes")]
    InvalidMinutes(String),

    #[error("`run` needs some code to execute")]
    MissingCode,
}

pub const HELP: &str = "\
Commands:
  start [minutes]   provision a sandbox (default length when omitted)
  continue          replace a paused sandbox with a fresh one
  stop              close the sandbox
  run <code>        execute code in the active sandbox
  ls [path]         list files (default: current directory)
  status            show the current session
  help              show this message
  quit              close any sandbox and exit";

impl Command {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word {
            "" => Err(ParseError::Empty),
            "start" => {
                let minutes = if rest.is_empty() {
                    None
                } else {
                    Some(
                        rest.parse::<u32>()
                            .map_err(|_| ParseError::InvalidMinutes(rest.to_string()))?,
                    )
                };
                Ok(Command::Start { minutes })
            }
            "continue" => Ok(Command::Continue),
            "stop" => Ok(Command::Stop),
            "run" if rest.is_empty() => Err(ParseError::MissingCode),
            "run" => Ok(Command::Run {
                code: rest.to_string(),
            }),
            "ls" => Ok(Command::List {
                path: if rest.is_empty() { "." } else { rest }.to_string(),
            }),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_start() {
        assert_eq!(Command::parse("start"), Ok(Command::Start { minutes: None }));
        assert_eq!(
            Command::parse("  start   30 "),
            Ok(Command::Start { minutes: Some(30) })
        );
        assert_eq!(
            Command::parse("start soon"),
            Err(ParseError::InvalidMinutes("soon".into()))
        );
    }

    #[test]
    fn parse_run_keeps_code_verbatim() {
        assert_eq!(
            Command::parse("run print('a  b')"),
            Ok(Command::Run {
                code: "print('a  b')".into()
            })
        );
        assert_eq!(Command::parse("run"), Err(ParseError::MissingCode));
    }

    #[test]
    fn parse_ls_defaults_to_cwd() {
        assert_eq!(Command::parse("ls"), Ok(Command::List { path: ".".into() }));
        assert_eq!(
            Command::parse("ls /tmp"),
            Ok(Command::List {
                path: "/tmp".into()
            })
        );
    }

    #[test]
    fn parse_simple_words() {
        assert_eq!(Command::parse("continue"), Ok(Command::Continue));
        assert_eq!(Command::parse("stop"), Ok(Command::Stop));
        assert_eq!(Command::parse("status"), Ok(Command::Status));
        assert_eq!(Command::parse("exit"), Ok(Command::Quit));
        assert_eq!(Command::parse(""), Err(ParseError::Empty));
        assert!(matches!(Command::parse("launch"), Err(ParseError::Unknown(_))));
    }

    #[test]
    fn parse_errors_read_as_messages() {
        assert_eq!(
            Command::parse("launch now").unwrap_err().to_string(),
            "unknown command 'launch', type `help` for a list"
        );
        assert_eq!(
            Command::parse("start 1.5").unwrap_err().to_string(),
            "'1.5' is not a whole number of minutes"
        );
        assert_eq!(
            ParseError::MissingCode.to_string(),
            "`run` needs some code to execute"
        );
        assert_eq!(ParseError::Empty.to_string(), "no command given");
    }
}
