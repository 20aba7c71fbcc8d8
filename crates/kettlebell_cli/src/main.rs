//! Command-line front end for the kettlebell scoring core.
//!
//! # Responsibility
//! - Open the competition database and resolve categories by uuid or name.
//! - Run recomputes and print standings or start lists.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use kettlebell_core::{
    build_start_list, default_log_level, init_logging, open_db, Category, Discipline,
    RecomputeService, RosterService, SqliteAthleteRepository, SqliteResultRepository,
    SqliteStandingsRepository, StationDistribution,
};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "kettlebell")]
#[command(about = "Kettlebell competition scoring and standings", long_about = None)]
#[command(version)]
struct Cli {
    /// Competition database file
    #[arg(long, global = true, env = "KETTLEBELL_DB", default_value = "kettlebell.db")]
    db: PathBuf,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, global = true, env = "KETTLEBELL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rotating log files; logging stays off without it
    #[arg(long, global = true, env = "KETTLEBELL_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the core library links and report its version
    Ping,
    /// Recompute discipline positions and overall standings of a category
    Recompute {
        /// Category uuid or name
        #[arg(long)]
        category: String,
    },
    /// Print overall standings, or one discipline's standings
    Standings {
        /// Category uuid or name
        #[arg(long)]
        category: String,
        /// Discipline code, e.g. `snatch` or `tgu`
        #[arg(long)]
        discipline: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Split a category's athletes across lifting stations
    StartList {
        /// Category uuid or name
        #[arg(long)]
        category: String,
        /// Number of stations
        #[arg(long)]
        stations: usize,
        /// Alternate stations instead of filling contiguous blocks
        #[arg(long)]
        round_robin: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).context("failed to initialize logging")?;
    }

    match cli.command {
        Commands::Ping => {
            println!("kettlebell_core ping={}", kettlebell_core::ping());
            println!("kettlebell_core version={}", kettlebell_core::core_version());
            Ok(())
        }
        Commands::Recompute { category } => {
            let conn = open(&cli.db)?;
            let category = resolve_category(&conn, &category)?;
            let outcome = RecomputeService::new(SqliteStandingsRepository::new(&conn))
                .recompute_category(category.uuid)
                .with_context(|| format!("failed to recompute category `{}`", category.name))?;
            println!(
                "recomputed `{}`: athletes={} disciplines={} positions_written={}",
                category.name,
                outcome.athlete_count,
                outcome.disciplines.len(),
                outcome.positions_written
            );
            Ok(())
        }
        Commands::Standings {
            category,
            discipline,
            json,
        } => {
            let conn = open(&cli.db)?;
            let category = resolve_category(&conn, &category)?;
            match discipline {
                Some(code) => print_discipline_standings(&conn, &category, &code, json),
                None => print_standings(&conn, &category, json),
            }
        }
        Commands::StartList {
            category,
            stations,
            round_robin,
            json,
        } => {
            let conn = open(&cli.db)?;
            let category = resolve_category(&conn, &category)?;
            let athletes = roster(&conn).list_athletes(category.uuid)?;
            let distribution = if round_robin {
                StationDistribution::RoundRobin
            } else {
                StationDistribution::Even
            };
            let list = build_start_list(&athletes, stations, distribution)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
                return Ok(());
            }
            println!("Start list: {} ({} stations)", category.name, stations);
            for station in &list {
                println!("Station {}", station.number);
                for athlete in &station.athletes {
                    println!("  {}", athlete.full_name());
                }
            }
            Ok(())
        }
    }
}

fn open(path: &Path) -> Result<Connection> {
    open_db(path).with_context(|| format!("failed to open database `{}`", path.display()))
}

fn roster(
    conn: &Connection,
) -> RosterService<
    SqliteAthleteRepository<'_>,
    SqliteResultRepository<'_>,
    SqliteStandingsRepository<'_>,
> {
    RosterService::new(
        SqliteAthleteRepository::new(conn),
        SqliteResultRepository::new(conn),
        SqliteStandingsRepository::new(conn),
    )
}

fn resolve_category(conn: &Connection, value: &str) -> Result<Category> {
    Ok(roster(conn).resolve_category(value)?)
}

fn print_standings(conn: &Connection, category: &Category, json: bool) -> Result<()> {
    let rows = RecomputeService::new(SqliteStandingsRepository::new(conn)).standings(category.uuid)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let disciplines = category.enabled_disciplines();
    let mut header = format!("{:>4}  {:<28}", "Pos", "Athlete");
    for discipline in &disciplines {
        header.push_str(&format!(" {:>8}", short_label(*discipline)));
    }
    header.push_str(&format!(" {:>6} {:>7}", "TB", "Total"));
    println!("{}", category.name);
    println!("{header}");

    for row in &rows {
        let mut line = format!(
            "{:>4}  {:<28}",
            row.overall.final_position,
            format!("{} {}", row.surname, row.first_name)
        );
        for discipline in &disciplines {
            match row.overall.points.get(discipline) {
                Some(points) => line.push_str(&format!(" {points:>8.1}")),
                None => line.push_str(&format!(" {:>8}", "-")),
            }
        }
        line.push_str(&format!(
            " {:>6.1} {:>7.1}",
            row.overall.tiebreak_points, row.overall.total_points
        ));
        println!("{line}");
    }
    Ok(())
}

fn print_discipline_standings(
    conn: &Connection,
    category: &Category,
    code: &str,
    json: bool,
) -> Result<()> {
    let Some(discipline) = Discipline::from_code(code) else {
        bail!("unknown discipline code `{code}`");
    };
    let rows = RecomputeService::new(SqliteStandingsRepository::new(conn))
        .discipline_standings(category.uuid, discipline)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{} - {}", category.name, discipline.display_name());
    println!(
        "{:>4}  {:<28} {:>9} {:>9}",
        "Pos", "Athlete", "Score", "% BW"
    );
    for row in &rows {
        let position = row
            .position
            .map_or_else(|| "-".to_string(), |position| position.to_string());
        let percentage = row
            .body_weight_percentage
            .map_or_else(|| "-".to_string(), |value| format!("{value:.2}"));
        println!(
            "{:>4}  {:<28} {:>9.1} {:>9}",
            position,
            format!("{} {}", row.surname, row.first_name),
            row.score,
            percentage
        );
    }
    Ok(())
}

fn short_label(discipline: Discipline) -> &'static str {
    match discipline {
        Discipline::Snatch => "Snatch",
        Discipline::Tgu => "TGU",
        Discipline::PistolSquat => "Pistol",
        Discipline::SeeSawPress => "SeeSaw",
        Discipline::KbSquat => "Squat",
        Discipline::OneKettlebellPress => "1KB",
        Discipline::TwoKettlebellPress => "2KB",
    }
}
