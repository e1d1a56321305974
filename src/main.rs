//! Dramaball - NFL gameweeks narrated by Total Drama characters
//!
//! Each subcommand answers one bot command and prints the narration to
//! stdout. Logs go to stderr.

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dramaball::cli::{self, CacheAction, Cli, CliError, Command};
use dramaball::config::Config;
use dramaball::data::{
    find_team_id, next_scheduled_games_for_team, select_window_at, Roster, WeekWindow,
};
use dramaball::story::{self, Storyline};

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("dramaball=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dramaball=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("Dramaball starting with args: {:?}", cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = Config::from_env()?;
    cli.apply_overrides(&mut config);

    match cli.command {
        Command::Gameweek { period, offset } => {
            let offset = cli::gameweek_offset(period, offset);
            let roster = Roster::load(&config.data_dir)?;
            let storyline = Storyline::load_or_default(&config.data_dir);
            let games = config.sports_client().matches().await?;

            let today = config.window.today();
            let window = WeekWindow::containing(today, offset, &config.window)?;
            let selected = select_window_at(&games, offset, &config.window, today);

            println!("{}", story::gameweek_title(offset, &window));
            if selected.is_empty() {
                println!("No games this gameweek.");
            }
            let mut rng = rand::thread_rng();
            for line in story::gameweek_story(
                &selected,
                &roster,
                &storyline,
                &config.window.timezone,
                &mut rng,
            ) {
                println!("{}", line);
            }
        }
        Command::Schedule { team, limit } => {
            let roster = Roster::load(&config.data_dir)?;
            let (team, character) = cli::lookup_team(&roster, &team)?;
            let games = config.sports_client().matches().await?;

            let team_id = find_team_id(&games, &team.name)
                .ok_or_else(|| CliError::TeamNotScheduled(team.name.clone()))?;
            let upcoming = next_scheduled_games_for_team(&games, team_id, limit);
            print!(
                "{}",
                story::upcoming_games(team, character, &upcoming, &config.window.timezone)
            );
        }
        Command::Standings { conference } => {
            let standings = config.sports_client().standings(conference).await?;
            println!("{} standings", conference.label());
            println!("{}", serde_json::to_string_pretty(&standings)?);
        }
        Command::Injuries { team } => {
            let roster = Roster::load(&config.data_dir)?;
            let team_id = cli::injuries_team_id(&roster, &team)?;
            let injuries = config.sports_client().team_injuries(team_id).await?;
            println!("{}", serde_json::to_string_pretty(&injuries)?);
        }
        Command::Game { id } => {
            let game = config.sports_client().match_by_id(id).await?;
            println!("{}", serde_json::to_string_pretty(&game)?);
        }
        Command::Team { query } => {
            let roster = Roster::load(&config.data_dir)?;
            let (team, character) = cli::lookup_team(&roster, &query)?;
            println!(
                "{} ({} {}) is played by {}.",
                team.name,
                team.conference.label(),
                team.division.label(),
                character.name
            );
        }
        Command::Character { query } => {
            let roster = Roster::load(&config.data_dir)?;
            let (character, team) = cli::lookup_character(&roster, &query)?;
            println!("{} plays for the {}.", character.name, team.name);
            if let Some(description) = &character.description {
                println!("{}", description);
            }
        }
        Command::List { sort_by } => {
            let roster = Roster::load(&config.data_dir)?;
            print!("{}", story::assignment_table(&roster.assignments(sort_by)));
        }
        Command::Teams {
            conference,
            division,
        } => {
            let roster = Roster::load(&config.data_dir)?;
            let rows: Vec<Vec<String>> = roster
                .teams_in(conference, division)
                .into_iter()
                .map(|team| {
                    vec![
                        team.name.clone(),
                        team.abbreviation.clone(),
                        team.conference.label().to_string(),
                        team.division.label().to_string(),
                    ]
                })
                .collect();
            print!(
                "{}",
                story::table(&["Team", "Abbr", "Conference", "Division"], &rows)
            );
        }
        Command::Random => {
            let roster = Roster::load(&config.data_dir)?;
            let mut rng = rand::thread_rng();
            match roster.random_assignment(&mut rng) {
                Some((character, team)) => {
                    println!("{} and the {}!", character.name, team.name)
                }
                None => println!("Nobody has been assigned a team yet."),
            }
        }
        Command::Cache { action } => {
            let client = config.sports_client();
            match action {
                CacheAction::Clear { matches: true } => {
                    if client.clear_matches_cache()? {
                        println!("Cleared the cached schedule.");
                    } else {
                        println!("No cached schedule to clear.");
                    }
                }
                CacheAction::Clear { matches: false } => {
                    client.clear_cache();
                    println!("Cache cleared.");
                }
            }
        }
    }

    Ok(())
}
