//! Narrated output for the bot's commands
//!
//! Turns games and roster lookups into plain text: gameweek stories told
//! through the characters assigned to each team, upcoming schedules and the
//! assignment table.

use std::path::Path;

use chrono::FixedOffset;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

use crate::data::roster::RosterError;
use crate::data::schedule::parse_game_time;
use crate::data::{CharacterRecord, GameEvent, GameStatus, Roster, TeamRecord, WeekWindow};

/// Storyline file inside the data directory
pub const STORYLINE_FILE: &str = "storyline.json";

/// Margin from which a win counts as a blowout
pub const BIG_WIN_MARGIN: u32 = 20;

/// Narrator for teams nobody was assigned to
const UNASSIGNED_CHARACTER: &str = "Chris";

/// Sentence templates with `{placeholder}` fields
///
/// Win and tie templates use `winner_character`, `winner_team`,
/// `winner_score`, `loser_character`, `loser_team` and `loser_score`.
/// Upcoming templates use `team1_character`, `team1`, `team2_character`,
/// `team2` and `game_time`.
#[derive(Debug, Clone, Deserialize)]
pub struct Storyline {
    pub big_win: Vec<String>,
    pub small_win: Vec<String>,
    pub tie: Vec<String>,
    pub upcoming: Vec<String>,
}

impl Default for Storyline {
    fn default() -> Self {
        Self {
            big_win: vec![
                "{winner_character}'s {winner_team} crushed {loser_character}'s {loser_team} {winner_score}-{loser_score}."
                    .to_string(),
            ],
            small_win: vec![
                "{winner_character}'s {winner_team} edged {loser_character}'s {loser_team} {winner_score}-{loser_score}."
                    .to_string(),
            ],
            tie: vec![
                "{winner_character}'s {winner_team} and {loser_character}'s {loser_team} tied {winner_score}-{loser_score}."
                    .to_string(),
            ],
            upcoming: vec![
                "{team1_character}'s {team1} face {team2_character}'s {team2} on {game_time}."
                    .to_string(),
            ],
        }
    }
}

impl Storyline {
    /// Loads templates from a JSON file
    pub fn load(path: &Path) -> Result<Self, RosterError> {
        let content = std::fs::read_to_string(path).map_err(|source| RosterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| RosterError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads templates from the data directory, falling back to the built-in ones
    pub fn load_or_default(data_dir: &Path) -> Self {
        match Self::load(&data_dir.join(STORYLINE_FILE)) {
            Ok(storyline) => storyline,
            Err(e) => {
                tracing::warn!("Using built-in storyline: {}", e);
                Self::default()
            }
        }
    }
}

/// Picks a template; empty lists fall back to the built-in template
fn pick<'a, R: Rng + ?Sized>(templates: &'a [String], fallback: &'a [String], rng: &mut R) -> &'a str {
    templates
        .choose(rng)
        .or_else(|| fallback.first())
        .map(String::as_str)
        .unwrap_or_default()
}

/// Replaces every `{name}` in the template
fn fill(template: &str, fields: &[(&str, &str)]) -> String {
    fields.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}

/// Formats a game date as "January 02, 2025"
pub fn long_date(raw: &str, timezone: &FixedOffset) -> String {
    parse_game_time(raw, timezone)
        .map(|t| t.format("%B %d, %Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Formats a game date as "02/01/25"
pub fn short_date(raw: &str, timezone: &FixedOffset) -> String {
    parse_game_time(raw, timezone)
        .map(|t| t.format("%d/%m/%y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// One side of a game as the story tells it
struct Side {
    character: String,
    team: String,
}

impl Side {
    fn resolve(roster: &Roster, api_team_name: &str) -> Self {
        match roster.character_for_team(api_team_name) {
            Some((team, character)) => Self {
                character: character.name.clone(),
                team: team.name.clone(),
            },
            None => Self {
                character: UNASSIGNED_CHARACTER.to_string(),
                team: api_team_name.to_string(),
            },
        }
    }

    fn title(&self) -> String {
        format!("{}'s {}", self.character, self.team)
    }
}

/// Title line announcing the gameweek `offset` weeks from the current one
pub fn gameweek_title(offset: i64, window: &WeekWindow) -> String {
    let label = match offset {
        -1 => "last gameweek".to_string(),
        0 => "this gameweek".to_string(),
        1 => "next gameweek".to_string(),
        n if n < 0 => format!("the gameweek {} weeks ago", -n),
        n => format!("the gameweek {} weeks ahead", n),
    };
    format!(
        "Here's the storyline for {} ({} - {})...",
        label,
        window.start.format("%a %d %b"),
        window.end.format("%a %d %b")
    )
}

/// Narrates each game of a gameweek
///
/// Every game yields a headline and, for finished or scheduled games, one
/// story sentence. Games in any other state only get the headline.
pub fn gameweek_story<R: Rng + ?Sized>(
    games: &[GameEvent],
    roster: &Roster,
    storyline: &Storyline,
    timezone: &FixedOffset,
    rng: &mut R,
) -> Vec<String> {
    let builtin = Storyline::default();
    let mut lines = Vec::new();

    for game in games {
        let home = Side::resolve(roster, &game.home_team.name);
        let away = Side::resolve(roster, &game.away_team.name);
        lines.push(format!("{} vs {}", home.title(), away.title()));

        match game.status() {
            GameStatus::Finished => match game.score() {
                Some((home_score, away_score)) => {
                    let margin = home_score.abs_diff(away_score);
                    let template = if margin == 0 {
                        pick(&storyline.tie, &builtin.tie, rng)
                    } else if margin >= BIG_WIN_MARGIN {
                        pick(&storyline.big_win, &builtin.big_win, rng)
                    } else {
                        pick(&storyline.small_win, &builtin.small_win, rng)
                    };
                    let (winner, winner_score, loser, loser_score) = if away_score > home_score {
                        (&away, away_score, &home, home_score)
                    } else {
                        (&home, home_score, &away, away_score)
                    };
                    let winner_score = winner_score.to_string();
                    let loser_score = loser_score.to_string();
                    lines.push(fill(
                        template,
                        &[
                            ("winner_character", winner.character.as_str()),
                            ("winner_team", winner.team.as_str()),
                            ("winner_score", winner_score.as_str()),
                            ("loser_character", loser.character.as_str()),
                            ("loser_team", loser.team.as_str()),
                            ("loser_score", loser_score.as_str()),
                        ],
                    ));
                }
                None => lines.push("Final score unavailable.".to_string()),
            },
            GameStatus::Scheduled => {
                let game_time = game
                    .date
                    .as_deref()
                    .map(|raw| long_date(raw, timezone))
                    .unwrap_or_else(|| "a date to be announced".to_string());
                let template = pick(&storyline.upcoming, &builtin.upcoming, rng);
                lines.push(fill(
                    template,
                    &[
                        ("team1_character", home.character.as_str()),
                        ("team1", home.team.as_str()),
                        ("team2_character", away.character.as_str()),
                        ("team2", away.team.as_str()),
                        ("game_time", game_time.as_str()),
                    ],
                ));
            }
            _ => {}
        }
    }

    lines
}

/// Lists a team's upcoming games, one per line
pub fn upcoming_games(
    team: &TeamRecord,
    character: &CharacterRecord,
    games: &[GameEvent],
    timezone: &FixedOffset,
) -> String {
    let mut out = format!("Upcoming games for {}'s {}:\n", character.name, team.name);
    if games.is_empty() {
        out.push_str("  No scheduled games.\n");
        return out;
    }
    for game in games {
        let date = game
            .date
            .as_deref()
            .map(|raw| short_date(raw, timezone))
            .unwrap_or_default();
        out.push_str(&format!(
            "  {}  {} vs {}\n",
            date, game.home_team.name, game.away_team.name
        ));
    }
    out
}

/// Renders rows as a box-drawn table with a header row
pub fn table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule = |left: &str, mid: &str, right: &str| {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{}{}{}\n", left, segments.join(mid), right)
    };
    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!(" {}{} ", cell, " ".repeat(w - cell.chars().count())))
            .collect();
        format!("│{}│\n", padded.join("│"))
    };

    let mut out = rule("┌", "┬", "┐");
    out.push_str(&line(header.to_vec()));
    out.push_str(&rule("├", "┼", "┤"));
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
    }
    out.push_str(&rule("└", "┴", "┘"));
    out
}

/// The character/team assignment table
pub fn assignment_table(pairs: &[(&CharacterRecord, &TeamRecord)]) -> String {
    let rows: Vec<Vec<String>> = pairs
        .iter()
        .map(|(character, team)| vec![character.name.clone(), team.abbreviation.clone()])
        .collect();
    table(&["Character", "Team"], &rows)
}
