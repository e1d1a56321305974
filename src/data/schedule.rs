//! Gameweek windows over a flat list of games
//!
//! A gameweek starts at midnight on the anchor weekday (Thursday by default)
//! and ends at 23:59:59 on the anchor day plus `length_days`. With the default
//! length of 4 that is Thursday through the end of Monday night. All
//! comparisons happen on naive date-times in one explicit reference timezone.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc, Weekday,
};
use clap::ValueEnum;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use super::roster::normalize_key;
use super::{GameEvent, GameStatus};

/// Default gameweek anchor
pub const DEFAULT_ANCHOR: Weekday = Weekday::Thu;

/// Default number of days after the anchor covered by a gameweek
pub const DEFAULT_WINDOW_LENGTH_DAYS: u32 = 4;

/// Default number of games returned by `next_scheduled_games_for_team`
pub const DEFAULT_NEXT_GAMES_LIMIT: usize = 5;

/// Errors for individual game records; they skip the record, never the batch
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The date field is not an ISO-8601 timestamp
    #[error("Invalid date '{0}'")]
    MalformedTimestamp(String),

    /// The record has no date at all
    #[error("Game {0} has no date")]
    MissingDate(u64),

    /// The gameweek offset points outside the supported calendar
    #[error("Gameweek offset {0} is out of range")]
    OffsetOutOfRange(i64),
}

/// How gameweeks are laid out on the calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    /// Weekday every gameweek starts on
    pub anchor: Weekday,
    /// Days from the anchor to the last day of the window
    pub length_days: u32,
    /// Reference timezone for "today" and for game times
    pub timezone: FixedOffset,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            anchor: DEFAULT_ANCHOR,
            length_days: DEFAULT_WINDOW_LENGTH_DAYS,
            timezone: Utc.fix(),
        }
    }
}

impl WindowPolicy {
    /// Current date in the reference timezone
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

/// Boundaries of one gameweek, both inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    /// Midnight on the anchor day
    pub start: NaiveDateTime,
    /// Last second of the final day
    pub end: NaiveDateTime,
}

impl WeekWindow {
    /// The gameweek `offset` weeks away from the one containing `today`
    ///
    /// `offset` 0 is the gameweek that started on the most recent anchor day
    /// (today included), -1 the one before, 1 the next one. Offsets that leave
    /// the calendar's range are an error.
    pub fn containing(
        today: NaiveDate,
        offset: i64,
        policy: &WindowPolicy,
    ) -> Result<Self, ScheduleError> {
        let days_since_anchor = (today.weekday().num_days_from_monday() + 7
            - policy.anchor.num_days_from_monday())
            % 7;
        let current_anchor = today - Duration::days(days_since_anchor as i64);
        let target_anchor = Duration::try_weeks(offset)
            .and_then(|shift| current_anchor.checked_add_signed(shift))
            .ok_or(ScheduleError::OffsetOutOfRange(offset))?;
        let day_after = target_anchor
            .checked_add_signed(Duration::days(policy.length_days as i64 + 1))
            .ok_or(ScheduleError::OffsetOutOfRange(offset))?;

        Ok(Self {
            start: target_anchor.and_time(NaiveTime::MIN),
            end: day_after.and_time(NaiveTime::MIN) - Duration::seconds(1),
        })
    }

    /// Whether a time falls inside the window
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Named gameweeks relative to the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Period {
    Previous,
    #[default]
    Current,
    Next,
}

impl Period {
    /// Week offset of the period
    pub fn offset(self) -> i64 {
        match self {
            Period::Previous => -1,
            Period::Current => 0,
            Period::Next => 1,
        }
    }
}

/// Parses a game timestamp and expresses it in the reference timezone
///
/// Accepts RFC 3339 (a trailing `Z` is read as `+00:00`), a date-time without
/// offset, or a bare date. The last two are taken to be UTC like every other
/// timestamp the API returns.
pub fn parse_game_time(raw: &str, timezone: &FixedOffset) -> Result<NaiveDateTime, ScheduleError> {
    let raw = raw.trim();
    let normalized = match raw.strip_suffix('Z') {
        Some(stripped) => format!("{}+00:00", stripped),
        None => raw.to_string(),
    };

    let utc = if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        parsed.naive_utc()
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f") {
        naive
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M") {
        naive
    } else if let Ok(date) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
        date.and_time(NaiveTime::MIN)
    } else {
        return Err(ScheduleError::MalformedTimestamp(raw.to_string()));
    };

    Ok(timezone.from_utc_datetime(&utc).naive_local())
}

/// Kick-off time of a game in the reference timezone
fn game_time(game: &GameEvent, timezone: &FixedOffset) -> Result<NaiveDateTime, ScheduleError> {
    let raw = game
        .date
        .as_deref()
        .ok_or(ScheduleError::MissingDate(game.id))?;
    parse_game_time(raw, timezone)
}

/// Pairs games with their parsed times, dropping (and logging) bad dates
fn timed_games<'a>(
    games: impl Iterator<Item = &'a GameEvent>,
    timezone: &FixedOffset,
) -> Vec<(NaiveDateTime, &'a GameEvent)> {
    games
        .filter_map(|game| match game_time(game, timezone) {
            Ok(time) => Some((time, game)),
            Err(e) => {
                warn!("Skipping game {} with invalid date: {}", game.id, e);
                None
            }
        })
        .collect()
}

/// Sorts by kick-off, ties broken by id, and clones the games out
fn sorted_games(mut timed: Vec<(NaiveDateTime, &GameEvent)>) -> Vec<GameEvent> {
    timed.sort_by(|(ta, a), (tb, b)| ta.cmp(tb).then(a.id.cmp(&b.id)));
    timed.into_iter().map(|(_, game)| game.clone()).collect()
}

/// Games of the gameweek `offset` weeks from today, soonest first
pub fn select_window(games: &[GameEvent], offset: i64, policy: &WindowPolicy) -> Vec<GameEvent> {
    select_window_at(games, offset, policy, policy.today())
}

/// Same as [`select_window`] with an explicit "today"
///
/// Games with a missing or malformed date are skipped with a warning. An
/// empty result simply means there are no games in that window.
pub fn select_window_at(
    games: &[GameEvent],
    offset: i64,
    policy: &WindowPolicy,
    today: NaiveDate,
) -> Vec<GameEvent> {
    let window = match WeekWindow::containing(today, offset, policy) {
        Ok(window) => window,
        Err(e) => {
            warn!("No gameweek selected: {}", e);
            return Vec::new();
        }
    };

    let mut timed = timed_games(games.iter(), &policy.timezone);
    timed.retain(|(time, _)| window.contains(*time));

    sorted_games(timed)
}

/// The next `limit` scheduled games of a team, soonest first
pub fn next_scheduled_games_for_team(
    games: &[GameEvent],
    team_id: u64,
    limit: usize,
) -> Vec<GameEvent> {
    let candidates = games
        .iter()
        .filter(|game| game.status() == &GameStatus::Scheduled && game.involves(team_id));
    let utc = Utc.fix();

    let mut next = sorted_games(timed_games(candidates, &utc));
    next.truncate(limit);
    next
}

/// API id of a team, looked up by name in a list of games
///
/// The roster knows teams by name only; the schedule API has its own ids.
pub fn find_team_id(games: &[GameEvent], team_name: &str) -> Option<u64> {
    let wanted = normalize_key(team_name);
    games
        .iter()
        .flat_map(|game| [&game.home_team, &game.away_team])
        .find(|team| normalize_key(&team.name) == wanted)
        .map(|team| team.id)
}

/// Decodes the game list of a matches payload
///
/// Accepts either `{"data": [...]}` or a bare array. Records that do not
/// match the `GameEvent` schema are skipped with a warning.
pub fn decode_events(payload: &Value) -> Vec<GameEvent> {
    let records = match payload {
        Value::Array(records) => records,
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(records)) => records,
            _ => {
                warn!("Matches payload has no 'data' array");
                return Vec::new();
            }
        },
        _ => {
            warn!("Matches payload is neither an object nor an array");
            return Vec::new();
        }
    };

    records
        .iter()
        .filter_map(|record| match serde_json::from_value::<GameEvent>(record.clone()) {
            Ok(game) => Some(game),
            Err(e) => {
                warn!("Skipping malformed game record: {}", e);
                None
            }
        })
        .collect()
}
