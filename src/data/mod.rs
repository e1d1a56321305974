//! Core data models for Dramaball
//!
//! This module contains the game records returned by the sports API, the
//! gameweek filter that buckets them, the API client itself and the static
//! team/character roster.

pub mod roster;
pub mod schedule;
pub mod sports_api;

pub use roster::{AssignmentSort, CharacterRecord, Division, Roster, RosterError, TeamRecord};
pub use schedule::{
    decode_events, find_team_id, next_scheduled_games_for_team, select_window, select_window_at,
    Period, ScheduleError, WeekWindow, WindowPolicy,
};
pub use sports_api::{ApiEndpoint, ApiError, Conference, SportsClient};

use serde::{Deserialize, Serialize};

/// A single game as returned by the matches endpoint
///
/// Only the fields the bot reads are modelled; everything else in the API
/// record is ignored on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEvent {
    /// API identifier of the game
    pub id: u64,
    /// Kick-off time, ISO-8601 in UTC (usually with a trailing `Z`)
    #[serde(default)]
    pub date: Option<String>,
    /// Home side
    pub home_team: TeamRef,
    /// Away side
    pub away_team: TeamRef,
    /// Progress and score
    pub state: GameState,
}

/// Reference to a team inside a game record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRef {
    /// API identifier of the team
    pub id: u64,
    /// Full team name, e.g. "Dallas Cowboys"
    pub name: String,
}

/// Progress of a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Status as reported by the API
    pub description: GameStatus,
    /// Score, once the game has started
    #[serde(default)]
    pub score: Option<Score>,
    /// Report label; "Final" once the result is official
    #[serde(default)]
    pub report: Option<String>,
}

/// Score of a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Current score formatted as "home-away"
    #[serde(default)]
    pub current: Option<String>,
}

/// Status of a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GameStatus {
    /// Not started yet
    Scheduled,
    /// Being played
    InProgress,
    /// Over
    Finished,
    /// Any status the bot does not know about (postponed, cancelled, ...)
    Other(String),
}

impl From<String> for GameStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Scheduled" => GameStatus::Scheduled,
            "In Progress" | "InProgress" => GameStatus::InProgress,
            "Finished" => GameStatus::Finished,
            _ => GameStatus::Other(value),
        }
    }
}

impl From<GameStatus> for String {
    fn from(value: GameStatus) -> Self {
        match value {
            GameStatus::Scheduled => "Scheduled".to_string(),
            GameStatus::InProgress => "In Progress".to_string(),
            GameStatus::Finished => "Finished".to_string(),
            GameStatus::Other(other) => other,
        }
    }
}

impl GameEvent {
    /// API identifier of the home team
    pub fn home_team_id(&self) -> u64 {
        self.home_team.id
    }

    /// API identifier of the away team
    pub fn away_team_id(&self) -> u64 {
        self.away_team.id
    }

    /// Current status
    pub fn status(&self) -> &GameStatus {
        &self.state.description
    }

    /// Whether the team plays in this game, home or away
    pub fn involves(&self, team_id: u64) -> bool {
        self.home_team.id == team_id || self.away_team.id == team_id
    }

    /// Whether the API has published the final report
    pub fn is_final(&self) -> bool {
        self.state.report.as_deref() == Some("Final")
    }

    /// Score as `(home, away)`, when present and well formed
    pub fn score(&self) -> Option<(u32, u32)> {
        let current = self.state.score.as_ref()?.current.as_deref()?;
        let (home, away) = current.split_once('-')?;
        Some((home.trim().parse().ok()?, away.trim().parse().ok()?))
    }
}
