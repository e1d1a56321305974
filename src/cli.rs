//! Command-line interface parsing for Dramaball
//!
//! Each subcommand is one bot command. Global flags override the matching
//! environment settings.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::config::Config;
use crate::data::schedule::DEFAULT_NEXT_GAMES_LIMIT;
use crate::data::{
    AssignmentSort, CharacterRecord, Conference, Division, Period, Roster, TeamRecord,
};

/// Most games `schedule` will list
pub const MAX_GAMES_LIMIT: usize = 20;

/// Furthest `gameweek --offset` reaches, in weeks, either way
pub const MAX_WEEK_OFFSET: i64 = 520;

/// Error types for CLI arguments and lookups
#[derive(Debug, Error)]
pub enum CliError {
    /// The limit is zero, too large or not a number
    #[error("Invalid limit: '{0}'. Expected a number from 1 to 20")]
    InvalidLimit(String),

    /// No team matches the query
    #[error("Unknown team: '{0}'. Try a team name, nickname or abbreviation such as 'DAL'")]
    UnknownTeam(String),

    /// No character matches the query
    #[error("Unknown character: '{0}'")]
    UnknownCharacter(String),

    /// The team exists but no game in the schedule names it
    #[error("No games found for {0}")]
    TeamNotScheduled(String),

    /// The team has no id for the injuries API
    #[error("No injuries API id known for {0}")]
    MissingApiId(String),
}

/// Dramaball - NFL gameweeks narrated by Total Drama characters
#[derive(Parser, Debug)]
#[command(name = "dramaball")]
#[command(about = "NFL gameweeks narrated by Total Drama characters")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Response cache directory (overrides DRAMABALL_CACHE_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory with teams, characters, assignments and storyline (overrides DRAMABALL_DATA_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Tell the story of a gameweek
    ///
    /// Examples:
    ///   dramaball gameweek              # Current gameweek
    ///   dramaball gameweek previous     # Last gameweek's results
    ///   dramaball gameweek --offset 2   # Two gameweeks ahead
    Gameweek {
        #[arg(value_enum, default_value_t = Period::Current)]
        period: Period,
        /// Weeks from the current gameweek; overrides the period
        #[arg(
            long,
            allow_negative_numbers = true,
            value_parser = clap::value_parser!(i64).range(-MAX_WEEK_OFFSET..=MAX_WEEK_OFFSET)
        )]
        offset: Option<i64>,
    },
    /// Upcoming games of a team
    Schedule {
        team: String,
        #[arg(long, default_value_t = DEFAULT_NEXT_GAMES_LIMIT, value_parser = parse_limit_arg)]
        limit: usize,
    },
    /// Conference standings
    Standings {
        #[arg(value_enum)]
        conference: Conference,
    },
    /// Injury report of a team, by name, abbreviation or API team id
    Injuries { team: String },
    /// Full record of one game
    Game { id: u64 },
    /// Which character plays for a team
    Team { query: String },
    /// Which team a character plays for
    Character { query: String },
    /// All character/team pairings
    List {
        #[arg(long, value_enum, default_value_t)]
        sort_by: AssignmentSort,
    },
    /// Teams, optionally filtered by conference and division
    Teams {
        #[arg(long, value_enum)]
        conference: Option<Conference>,
        #[arg(long, value_enum)]
        division: Option<Division>,
    },
    /// A random character/team pairing
    Random,
    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CacheAction {
    /// Remove cached responses; the finished-match archive is kept
    Clear {
        /// Only drop the cached season schedule
        #[arg(long)]
        matches: bool,
    },
}

/// Parses the `--limit` argument of `schedule`.
///
/// # Returns
/// * `Ok(limit)` for 1 to `MAX_GAMES_LIMIT`
/// * `Err(CliError::InvalidLimit)` otherwise
pub fn parse_limit_arg(s: &str) -> Result<usize, CliError> {
    match s.trim().parse::<usize>() {
        Ok(limit) if (1..=MAX_GAMES_LIMIT).contains(&limit) => Ok(limit),
        _ => Err(CliError::InvalidLimit(s.to_string())),
    }
}

impl Cli {
    /// Applies the global flags on top of the environment configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
    }
}

/// Week offset of a `gameweek` command
pub fn gameweek_offset(period: Period, offset: Option<i64>) -> i64 {
    offset.unwrap_or_else(|| period.offset())
}

/// Looks up a team and its character, or explains what went wrong
pub fn lookup_team<'a>(
    roster: &'a Roster,
    query: &str,
) -> Result<(&'a TeamRecord, &'a CharacterRecord), CliError> {
    roster
        .character_for_team(query)
        .ok_or_else(|| CliError::UnknownTeam(query.to_string()))
}

/// Injuries API id for a team query
///
/// A bare number is taken as the id itself; anything else is looked up in
/// the roster.
pub fn injuries_team_id(roster: &Roster, query: &str) -> Result<u64, CliError> {
    if let Ok(id) = query.trim().parse::<u64>() {
        return Ok(id);
    }
    let (team, _) = lookup_team(roster, query)?;
    team.api_id
        .ok_or_else(|| CliError::MissingApiId(team.name.clone()))
}

/// Looks up a character and its team, or explains what went wrong
pub fn lookup_character<'a>(
    roster: &'a Roster,
    query: &str,
) -> Result<(&'a CharacterRecord, &'a TeamRecord), CliError> {
    roster
        .team_for_character(query)
        .ok_or_else(|| CliError::UnknownCharacter(query.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::roster::test_support::small_roster;

    #[test]
    fn test_parse_limit_arg_valid() {
        assert_eq!(parse_limit_arg("1").unwrap(), 1);
        assert_eq!(parse_limit_arg("5").unwrap(), 5);
        assert_eq!(parse_limit_arg("20").unwrap(), 20);
    }

    #[test]
    fn test_parse_limit_arg_invalid() {
        for raw in ["0", "21", "-3", "many"] {
            let err = parse_limit_arg(raw).unwrap_err();
            assert!(err.to_string().contains("Invalid limit"));
            assert!(err.to_string().contains(raw));
        }
    }

    #[test]
    fn test_cli_parse_gameweek_defaults() {
        let cli = Cli::parse_from(["dramaball", "gameweek"]);
        assert!(!cli.debug);
        assert_eq!(
            cli.command,
            Command::Gameweek {
                period: Period::Current,
                offset: None
            }
        );
    }

    #[test]
    fn test_cli_parse_gameweek_period_and_negative_offset() {
        let cli = Cli::parse_from(["dramaball", "gameweek", "previous"]);
        assert_eq!(
            cli.command,
            Command::Gameweek {
                period: Period::Previous,
                offset: None
            }
        );

        let cli = Cli::parse_from(["dramaball", "gameweek", "--offset", "-2"]);
        assert_eq!(
            cli.command,
            Command::Gameweek {
                period: Period::Current,
                offset: Some(-2)
            }
        );
    }

    #[test]
    fn test_cli_parse_gameweek_offset_is_bounded() {
        assert!(Cli::try_parse_from(["dramaball", "gameweek", "--offset", "520"]).is_ok());
        assert!(Cli::try_parse_from(["dramaball", "gameweek", "--offset", "-520"]).is_ok());
        assert!(Cli::try_parse_from(["dramaball", "gameweek", "--offset", "521"]).is_err());
        assert!(Cli::try_parse_from(["dramaball", "gameweek", "--offset", "1000000000"]).is_err());
    }

    #[test]
    fn test_gameweek_offset_prefers_explicit_offset() {
        assert_eq!(gameweek_offset(Period::Next, None), 1);
        assert_eq!(gameweek_offset(Period::Previous, None), -1);
        assert_eq!(gameweek_offset(Period::Next, Some(3)), 3);
    }

    #[test]
    fn test_cli_parse_schedule_limit() {
        let cli = Cli::parse_from(["dramaball", "schedule", "cowboys"]);
        assert_eq!(
            cli.command,
            Command::Schedule {
                team: "cowboys".to_string(),
                limit: DEFAULT_NEXT_GAMES_LIMIT
            }
        );

        let cli = Cli::parse_from(["dramaball", "schedule", "DAL", "--limit", "3"]);
        assert!(matches!(cli.command, Command::Schedule { limit: 3, .. }));

        assert!(Cli::try_parse_from(["dramaball", "schedule", "DAL", "--limit", "0"]).is_err());
    }

    #[test]
    fn test_cli_parse_list_sort_aliases() {
        let cli = Cli::parse_from(["dramaball", "list", "--sort-by", "c"]);
        assert_eq!(
            cli.command,
            Command::List {
                sort_by: AssignmentSort::Character
            }
        );

        let cli = Cli::parse_from(["dramaball", "list"]);
        assert_eq!(
            cli.command,
            Command::List {
                sort_by: AssignmentSort::Team
            }
        );
    }

    #[test]
    fn test_cli_parse_teams_filters() {
        let cli = Cli::parse_from(["dramaball", "teams", "--conference", "nfc", "--division", "west"]);
        assert_eq!(
            cli.command,
            Command::Teams {
                conference: Some(Conference::Nfc),
                division: Some(Division::West)
            }
        );
    }

    #[test]
    fn test_cli_parse_standings_rejects_unknown_conference() {
        assert!(Cli::try_parse_from(["dramaball", "standings", "afc"]).is_ok());
        assert!(Cli::try_parse_from(["dramaball", "standings", "xfl"]).is_err());
    }

    #[test]
    fn test_cli_parse_cache_clear() {
        let cli = Cli::parse_from(["dramaball", "cache", "clear", "--matches"]);
        assert_eq!(
            cli.command,
            Command::Cache {
                action: CacheAction::Clear { matches: true }
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["dramaball", "random", "--debug", "--data-dir", "/tmp/data"]);
        assert!(cli.debug);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/data")));
    }

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::parse_from(["dramaball", "--cache-dir", "/tmp/c", "random"]);
        let mut config = Config::default();

        cli.apply_overrides(&mut config);

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/c"));
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_lookups() {
        let roster = small_roster();

        let (team, character) = lookup_team(&roster, "KC").unwrap();
        assert_eq!(team.abbreviation, "KC");
        assert_eq!(character.name, "Owen");

        let (character, team) = lookup_character(&roster, "gwen").unwrap();
        assert_eq!(character.name, "Gwen");
        assert_eq!(team.abbreviation, "BUF");

        let err = lookup_team(&roster, "London Monarchs").unwrap_err();
        assert!(err.to_string().contains("Unknown team"));
        assert!(lookup_character(&roster, "Chris").is_err());
    }

    #[test]
    fn test_injuries_team_id() {
        let roster = small_roster();

        assert_eq!(injuries_team_id(&roster, "cowboys").unwrap(), 6);
        assert_eq!(injuries_team_id(&roster, " 22 ").unwrap(), 22);

        let err = injuries_team_id(&roster, "KC").unwrap_err();
        assert!(matches!(err, CliError::MissingApiId(ref name) if name == "Kansas City Chiefs"));

        let err = injuries_team_id(&roster, "London Monarchs").unwrap_err();
        assert!(matches!(err, CliError::UnknownTeam(_)));
    }
}
