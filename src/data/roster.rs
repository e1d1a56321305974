//! Static team and character data
//!
//! The roster joins two datasets: NFL teams and reality-show characters. Each
//! team is assigned exactly one character. All three files are JSON and are
//! validated when loaded, so lookups never deal with dangling keys.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use rand::seq::IteratorRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::Conference;

/// File holding the team list
pub const TEAMS_FILE: &str = "teams.json";

/// File holding the character list
pub const CHARACTERS_FILE: &str = "characters.json";

/// File mapping team keys to character keys
pub const ASSIGNMENTS_FILE: &str = "assignments.json";

/// Errors that can occur when loading the roster
#[derive(Debug, Error)]
pub enum RosterError {
    /// A data file could not be read
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A data file is not valid JSON for its schema
    #[error("Invalid data in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Two records share a key
    #[error("Duplicate key '{0}'")]
    DuplicateKey(String),

    /// An assignment names a team that does not exist
    #[error("Assignment refers to unknown team '{0}'")]
    UnknownTeam(String),

    /// An assignment names a character that does not exist
    #[error("Assignment refers to unknown character '{0}'")]
    UnknownCharacter(String),
}

/// Division inside a conference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Division {
    East,
    North,
    South,
    West,
}

impl Division {
    /// Display name
    pub fn label(self) -> &'static str {
        match self {
            Division::East => "East",
            Division::North => "North",
            Division::South => "South",
            Division::West => "West",
        }
    }
}

/// An NFL team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    /// Snake-case key, e.g. "dallas_cowboys"
    pub key: String,
    /// Full name, e.g. "Dallas Cowboys"
    pub name: String,
    /// Short code, e.g. "DAL"
    pub abbreviation: String,
    /// AFC or NFC
    pub conference: Conference,
    /// Division inside the conference
    pub division: Division,
    /// Team id used by the injuries API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_id: Option<u64>,
}

/// A character from the show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    /// Snake-case key, e.g. "heather"
    pub key: String,
    /// Display name
    pub name: String,
    /// One-line description
    #[serde(default)]
    pub description: Option<String>,
}

/// Ordering of the assignment listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AssignmentSort {
    /// By team abbreviation
    #[default]
    #[value(alias = "t")]
    Team,
    /// By character name
    #[value(alias = "c")]
    Character,
}

/// Teams, characters and who plays for whom
#[derive(Debug, Clone)]
pub struct Roster {
    teams: BTreeMap<String, TeamRecord>,
    characters: BTreeMap<String, CharacterRecord>,
    /// team key -> character key
    assignments: BTreeMap<String, String>,
}

/// Normalizes user input or API names into a record key
///
/// # Example
///
/// ```
/// use dramaball::data::roster::normalize_key;
///
/// assert_eq!(normalize_key("Dallas Cowboys"), "dallas_cowboys");
/// assert_eq!(normalize_key("  san-francisco 49ers "), "san_francisco_49ers");
/// ```
pub fn normalize_key(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, RosterError> {
    let content = fs::read_to_string(path).map_err(|source| RosterError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| RosterError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Roster {
    /// Loads and validates the roster from a data directory
    pub fn load(dir: &Path) -> Result<Self, RosterError> {
        let teams: Vec<TeamRecord> = read_json(&dir.join(TEAMS_FILE))?;
        let characters: Vec<CharacterRecord> = read_json(&dir.join(CHARACTERS_FILE))?;
        let assignments: BTreeMap<String, String> = read_json(&dir.join(ASSIGNMENTS_FILE))?;

        let roster = Self::from_parts(teams, characters, assignments)?;
        debug!(
            "Loaded {} teams, {} characters, {} assignments from {:?}",
            roster.teams.len(),
            roster.characters.len(),
            roster.assignments.len(),
            dir
        );
        Ok(roster)
    }

    /// Builds a roster from records, checking keys and assignments
    pub fn from_parts(
        teams: Vec<TeamRecord>,
        characters: Vec<CharacterRecord>,
        assignments: BTreeMap<String, String>,
    ) -> Result<Self, RosterError> {
        let mut team_map = BTreeMap::new();
        for team in teams {
            if let Some(previous) = team_map.insert(team.key.clone(), team) {
                return Err(RosterError::DuplicateKey(previous.key));
            }
        }

        let mut character_map = BTreeMap::new();
        for character in characters {
            if let Some(previous) = character_map.insert(character.key.clone(), character) {
                return Err(RosterError::DuplicateKey(previous.key));
            }
        }

        for (team_key, character_key) in &assignments {
            if !team_map.contains_key(team_key) {
                return Err(RosterError::UnknownTeam(team_key.clone()));
            }
            if !character_map.contains_key(character_key) {
                return Err(RosterError::UnknownCharacter(character_key.clone()));
            }
        }

        Ok(Self {
            teams: team_map,
            characters: character_map,
            assignments,
        })
    }

    /// All teams, ordered by key
    pub fn teams(&self) -> impl Iterator<Item = &TeamRecord> {
        self.teams.values()
    }

    /// Finds a team by key, full name, abbreviation or nickname
    ///
    /// "Dallas Cowboys", "dallas_cowboys", "DAL" and "cowboys" all find the
    /// same team.
    pub fn team(&self, query: &str) -> Option<&TeamRecord> {
        let key = normalize_key(query);
        if key.is_empty() {
            return None;
        }
        if let Some(team) = self.teams.get(&key) {
            return Some(team);
        }
        let suffix = format!("_{}", key);
        self.teams
            .values()
            .find(|team| team.abbreviation.eq_ignore_ascii_case(query.trim()))
            .or_else(|| self.teams.values().find(|team| team.key.ends_with(&suffix)))
    }

    /// Finds a character by key or name
    pub fn character(&self, query: &str) -> Option<&CharacterRecord> {
        let key = normalize_key(query);
        self.characters.get(&key).or_else(|| {
            self.characters
                .values()
                .find(|character| normalize_key(&character.name) == key)
        })
    }

    /// The character assigned to a team
    pub fn character_for_team(&self, query: &str) -> Option<(&TeamRecord, &CharacterRecord)> {
        let team = self.team(query)?;
        let character_key = self.assignments.get(&team.key)?;
        let character = self.characters.get(character_key)?;
        Some((team, character))
    }

    /// The team a character is assigned to
    pub fn team_for_character(&self, query: &str) -> Option<(&CharacterRecord, &TeamRecord)> {
        let character = self.character(query)?;
        let team_key = self
            .assignments
            .iter()
            .find(|(_, character_key)| **character_key == character.key)
            .map(|(team_key, _)| team_key)?;
        let team = self.teams.get(team_key)?;
        Some((character, team))
    }

    /// Every assignment as `(character, team)`, in the requested order
    pub fn assignments(&self, sort: AssignmentSort) -> Vec<(&CharacterRecord, &TeamRecord)> {
        let mut pairs: Vec<(&CharacterRecord, &TeamRecord)> = self
            .assignments
            .iter()
            .filter_map(|(team_key, character_key)| {
                Some((self.characters.get(character_key)?, self.teams.get(team_key)?))
            })
            .collect();

        match sort {
            AssignmentSort::Team => pairs.sort_by(|a, b| a.1.abbreviation.cmp(&b.1.abbreviation)),
            AssignmentSort::Character => pairs.sort_by(|a, b| a.0.name.cmp(&b.0.name)),
        }
        pairs
    }

    /// Teams filtered by conference and/or division
    pub fn teams_in(
        &self,
        conference: Option<Conference>,
        division: Option<Division>,
    ) -> Vec<&TeamRecord> {
        self.teams
            .values()
            .filter(|team| conference.map_or(true, |c| team.conference == c))
            .filter(|team| division.map_or(true, |d| team.division == d))
            .collect()
    }

    /// A random `(character, team)` pairing
    pub fn random_assignment<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Option<(&CharacterRecord, &TeamRecord)> {
        let (team_key, character_key) = self.assignments.iter().choose(rng)?;
        Some((self.characters.get(character_key)?, self.teams.get(team_key)?))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn team(key: &str, name: &str, abbr: &str, conference: Conference, division: Division) -> TeamRecord {
        TeamRecord {
            key: key.to_string(),
            name: name.to_string(),
            abbreviation: abbr.to_string(),
            conference,
            division,
            api_id: None,
        }
    }

    pub fn character(key: &str, name: &str) -> CharacterRecord {
        CharacterRecord {
            key: key.to_string(),
            name: name.to_string(),
            description: None,
        }
    }

    /// Four teams, four characters, all assigned; only Dallas has an API id
    pub fn small_roster() -> Roster {
        let mut teams = vec![
            team("dallas_cowboys", "Dallas Cowboys", "DAL", Conference::Nfc, Division::East),
            team("kansas_city_chiefs", "Kansas City Chiefs", "KC", Conference::Afc, Division::West),
            team("buffalo_bills", "Buffalo Bills", "BUF", Conference::Afc, Division::East),
            team("san_francisco_49ers", "San Francisco 49ers", "SF", Conference::Nfc, Division::West),
        ];
        teams[0].api_id = Some(6);
        let characters = vec![
            character("heather", "Heather"),
            character("owen", "Owen"),
            character("gwen", "Gwen"),
            character("duncan", "Duncan"),
        ];
        let assignments = [
            ("dallas_cowboys", "heather"),
            ("kansas_city_chiefs", "owen"),
            ("buffalo_bills", "gwen"),
            ("san_francisco_49ers", "duncan"),
        ]
        .into_iter()
        .map(|(t, c)| (t.to_string(), c.to_string()))
        .collect();

        Roster::from_parts(teams, characters, assignments).expect("valid roster")
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Dallas Cowboys"), "dallas_cowboys");
        assert_eq!(normalize_key("LeShawna"), "leshawna");
        assert_eq!(normalize_key("new  york-giants"), "new_york_giants");
        assert_eq!(normalize_key("   "), "");
    }

    #[test]
    fn test_team_lookup_variants() {
        let roster = small_roster();

        for query in ["Dallas Cowboys", "dallas_cowboys", "DAL", "dal", "cowboys", " Cowboys "] {
            let team = roster.team(query).unwrap_or_else(|| panic!("no team for {:?}", query));
            assert_eq!(team.key, "dallas_cowboys");
        }
        assert_eq!(roster.team("49ers").unwrap().abbreviation, "SF");
        assert!(roster.team("jets").is_none());
        assert!(roster.team("").is_none());
    }

    #[test]
    fn test_character_for_team() {
        let roster = small_roster();

        let (team, character) = roster.character_for_team("chiefs").unwrap();

        assert_eq!(team.name, "Kansas City Chiefs");
        assert_eq!(character.name, "Owen");
        assert!(roster.character_for_team("Jets").is_none());
    }

    #[test]
    fn test_team_for_character() {
        let roster = small_roster();

        let (character, team) = roster.team_for_character("GWEN").unwrap();

        assert_eq!(character.key, "gwen");
        assert_eq!(team.abbreviation, "BUF");
        assert!(roster.team_for_character("chris").is_none());
    }

    #[test]
    fn test_assignments_sorted_by_team_and_character() {
        let roster = small_roster();

        let by_team: Vec<&str> = roster
            .assignments(AssignmentSort::Team)
            .iter()
            .map(|(_, t)| t.abbreviation.as_str())
            .collect();
        assert_eq!(by_team, vec!["BUF", "DAL", "KC", "SF"]);

        let by_character: Vec<&str> = roster
            .assignments(AssignmentSort::Character)
            .iter()
            .map(|(c, _)| c.name.as_str())
            .collect();
        assert_eq!(by_character, vec!["Duncan", "Gwen", "Heather", "Owen"]);
    }

    #[test]
    fn test_teams_in_conference_and_division() {
        let roster = small_roster();

        assert_eq!(roster.teams_in(Some(Conference::Afc), None).len(), 2);
        assert_eq!(roster.teams_in(None, Some(Division::West)).len(), 2);

        let nfc_east = roster.teams_in(Some(Conference::Nfc), Some(Division::East));
        assert_eq!(nfc_east.len(), 1);
        assert_eq!(nfc_east[0].key, "dallas_cowboys");

        assert_eq!(roster.teams_in(None, None).len(), 4);
        assert!(roster.teams_in(Some(Conference::Afc), Some(Division::South)).is_empty());
    }

    #[test]
    fn test_random_assignment_is_a_real_pair() {
        let roster = small_roster();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let (character, team) = roster.random_assignment(&mut rng).unwrap();
            let (_, expected) = roster.character_for_team(&team.key).unwrap();
            assert_eq!(character, expected);
        }
    }

    #[test]
    fn test_from_parts_rejects_dangling_assignments() {
        let teams = vec![team("dallas_cowboys", "Dallas Cowboys", "DAL", Conference::Nfc, Division::East)];
        let characters = vec![character("heather", "Heather")];

        let unknown_team: BTreeMap<String, String> =
            [("new_york_jets".to_string(), "heather".to_string())].into_iter().collect();
        let err = Roster::from_parts(teams.clone(), characters.clone(), unknown_team).unwrap_err();
        assert!(matches!(err, RosterError::UnknownTeam(key) if key == "new_york_jets"));

        let unknown_character: BTreeMap<String, String> =
            [("dallas_cowboys".to_string(), "chris".to_string())].into_iter().collect();
        let err = Roster::from_parts(teams, characters, unknown_character).unwrap_err();
        assert!(matches!(err, RosterError::UnknownCharacter(key) if key == "chris"));
    }

    #[test]
    fn test_from_parts_rejects_duplicate_keys() {
        let characters = vec![character("owen", "Owen"), character("owen", "Owen Again")];
        let err = Roster::from_parts(Vec::new(), characters, BTreeMap::new()).unwrap_err();
        assert!(matches!(err, RosterError::DuplicateKey(_)));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(TEAMS_FILE),
            r#"[{"key":"buffalo_bills","name":"Buffalo Bills","abbreviation":"BUF","conference":"AFC","division":"East"}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(CHARACTERS_FILE),
            r#"[{"key":"gwen","name":"Gwen","description":"Goth loner"}]"#,
        )
        .unwrap();
        fs::write(dir.path().join(ASSIGNMENTS_FILE), r#"{"buffalo_bills":"gwen"}"#).unwrap();

        let roster = Roster::load(dir.path()).expect("roster should load");

        let (team, character) = roster.character_for_team("bills").unwrap();
        assert_eq!(team.conference, Conference::Afc);
        assert_eq!(team.api_id, None);
        assert_eq!(character.description.as_deref(), Some("Goth loner"));
    }

    #[test]
    fn test_load_reports_missing_and_invalid_files() {
        let dir = TempDir::new().unwrap();
        let err = Roster::load(dir.path()).unwrap_err();
        assert!(matches!(err, RosterError::Io { .. }));

        fs::write(dir.path().join(TEAMS_FILE), "{ nope").unwrap();
        let err = Roster::load(dir.path()).unwrap_err();
        assert!(matches!(err, RosterError::Parse { .. }));
        assert!(err.to_string().contains(TEAMS_FILE));
    }

    #[test]
    fn test_bundled_data_is_consistent() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
        let roster = Roster::load(&dir).expect("bundled roster should load");

        assert_eq!(roster.teams().count(), 32);
        assert_eq!(roster.assignments(AssignmentSort::Team).len(), 32);
        for conference in [Conference::Afc, Conference::Nfc] {
            for division in [Division::East, Division::North, Division::South, Division::West] {
                assert_eq!(roster.teams_in(Some(conference), Some(division)).len(), 4);
            }
        }

        let mut api_ids: Vec<u64> = roster.teams().filter_map(|team| team.api_id).collect();
        api_ids.sort_unstable();
        api_ids.dedup();
        assert_eq!(api_ids.len(), 32, "every team needs its own API id");
        assert_eq!(roster.team("DAL").and_then(|team| team.api_id), Some(6));
    }
}
