use std::num::ParseIntError;

use restrictions_core::{PlayerSlot, Team};
use thiserror::Error;

/// One line of a harness script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessCommand {
    Map { name: String },
    Round,
    Join { team: Team, admin: bool },
    Leave { slot: PlayerSlot },
    Warmup { enabled: bool },
    Reload { caller: Option<PlayerSlot> },
    Tick { frames: u32 },
    Status,
    Unload,
    Quit,
}

#[derive(Debug, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid integer '{value}' for {context}: {source}")]
    InvalidInteger {
        value: String,
        context: &'static str,
        source: ParseIntError,
    },
    #[error("invalid team '{0}'")]
    InvalidTeam(String),
    #[error("invalid toggle '{0}', expected on or off")]
    InvalidToggle(String),
}

/// Parse a script line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_command_line(input: &str) -> Result<Option<HarnessCommand>, CommandParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts
        .next()
        .map(|v| v.to_ascii_lowercase())
        .ok_or(CommandParseError::Empty)?;

    let command = match verb.as_str() {
        "map" => {
            let name = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("map name"))?;
            HarnessCommand::Map {
                name: name.to_string(),
            }
        }
        "round" => HarnessCommand::Round,
        "join" => {
            let team_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("team"))?;
            let team = parse_team(team_str)?;
            let admin = parts
                .next()
                .is_some_and(|flag| flag.eq_ignore_ascii_case("admin"));
            HarnessCommand::Join { team, admin }
        }
        "leave" => {
            let slot_str = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("slot"))?;
            HarnessCommand::Leave {
                slot: PlayerSlot(parse_u32(slot_str, "leave slot")?),
            }
        }
        "warmup" => {
            let toggle = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("on|off"))?;
            let enabled = match toggle.to_ascii_lowercase().as_str() {
                "on" | "true" | "1" => true,
                "off" | "false" | "0" => false,
                other => return Err(CommandParseError::InvalidToggle(other.to_string())),
            };
            HarnessCommand::Warmup { enabled }
        }
        "reload" => {
            let caller = parts
                .next()
                .map(|slot| parse_u32(slot, "reload caller").map(PlayerSlot))
                .transpose()?;
            HarnessCommand::Reload { caller }
        }
        "tick" => {
            let frames_str = parts.next().unwrap_or("1");
            HarnessCommand::Tick {
                frames: parse_u32(frames_str, "tick frames")?,
            }
        }
        "status" => HarnessCommand::Status,
        "unload" => HarnessCommand::Unload,
        "quit" | "exit" => HarnessCommand::Quit,
        other => return Err(CommandParseError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_team(value: &str) -> Result<Team, CommandParseError> {
    match value.to_ascii_lowercase().as_str() {
        "t" | "terrorist" => Ok(Team::Terrorist),
        "ct" | "counterterrorist" => Ok(Team::CounterTerrorist),
        "spec" | "spectator" => Ok(Team::Spectator),
        "none" | "unassigned" => Ok(Team::Unassigned),
        _ => Err(CommandParseError::InvalidTeam(value.to_string())),
    }
}

fn parse_u32(value: &str, context: &'static str) -> Result<u32, CommandParseError> {
    value
        .parse()
        .map_err(|source| CommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}
