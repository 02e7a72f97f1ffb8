use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{metadata::LevelFilter, Level};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};
use uuid::Uuid;

use pupil_results::config::Config;
use pupil_results::models::{AcademicSession, SummaryRemarks, Term};
use pupil_results::{db, grading, release, report, standings};

#[derive(Parser)]
#[command(name = "pupil-results")]
#[command(about = "Result release and grading tool for school sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Upsert scores from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show whether results are visible to pupils
    Release {
        /// Defaults to the active session
        #[arg(long)]
        session: Option<Uuid>,
    },
    /// Make results visible regardless of the release date
    Unlock {
        #[arg(long)]
        session: Uuid,
    },
    /// Remove the admin override so the release date applies again
    Lock {
        #[arg(long)]
        session: Uuid,
    },
    /// Set or clear the release date
    #[command(group(
        ArgGroup::new("when")
            .args(["at", "clear"])
            .required(true)
            .multiple(false)
    ))]
    SetRelease {
        #[arg(long)]
        session: Uuid,
        /// RFC 3339 instant, e.g. 2026-04-10T09:00:00Z
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        #[arg(long)]
        clear: bool,
    },
    /// Print a pupil's term summary
    Summary {
        #[arg(long)]
        pupil: Uuid,
        #[arg(long)]
        session: Option<Uuid>,
        #[arg(long)]
        term: Option<Term>,
    },
    /// Write a pupil's result sheet as markdown
    Report {
        #[arg(long)]
        pupil: Uuid,
        #[arg(long)]
        session: Option<Uuid>,
        #[arg(long)]
        term: Option<Term>,
        #[arg(long, default_value = "result.md")]
        out: PathBuf,
    },
    /// Set the class teacher's and principal's term comments for a pupil
    #[command(group(
        ArgGroup::new("comments")
            .args(["teacher_comment", "principal_comment"])
            .required(true)
            .multiple(true)
    ))]
    Remark {
        #[arg(long)]
        pupil: Uuid,
        #[arg(long)]
        session: Option<Uuid>,
        #[arg(long)]
        term: Option<Term>,
        #[arg(long)]
        teacher_comment: Option<String>,
        #[arg(long)]
        principal_comment: Option<String>,
    },
    /// Rank pupils by average for a session term
    Rank {
        #[arg(long)]
        session: Option<Uuid>,
        #[arg(long)]
        term: Option<Term>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

async fn load_session(pool: &PgPool, id: Option<Uuid>) -> anyhow::Result<AcademicSession> {
    match id {
        Some(id) => db::fetch_session(pool, id)
            .await?
            .with_context(|| format!("no session with id {id}")),
        None => db::fetch_active_session(pool)
            .await?
            .context("no active session found"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    tracing_subscriber::registry()
        .with(fmt)
        .with(LevelFilter::from_level(Level::INFO))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let outcome = db::import_csv(&pool, &csv).await?;
            println!(
                "Upserted {} scores from {} ({} rejected).",
                outcome.upserted,
                csv.display(),
                outcome.rejected.len()
            );
            for rejected in outcome.rejected.iter() {
                println!("- line {}: {}", rejected.line, rejected.reason);
            }
        }
        Commands::Release { session } => {
            let session = load_session(&pool, session).await?;
            let now = Utc::now();

            if release::is_released(&session, now) {
                let reason = if session.results_unlocked {
                    "unlocked by an administrator"
                } else if session.result_release_date.is_none() {
                    "no release date set"
                } else {
                    "release date reached"
                };
                println!("Results for {} are released ({reason}).", session.name);
            } else if let Some(left) = release::time_remaining(&session, now) {
                println!(
                    "Results for {} are locked: {}d {}h {}m {}s remaining.",
                    session.name, left.days, left.hours, left.minutes, left.seconds
                );
            }
        }
        Commands::Unlock { session } => {
            if !db::set_results_unlocked(&pool, session, true).await? {
                anyhow::bail!("no session with id {session}");
            }
            println!("Results unlocked.");
        }
        Commands::Lock { session } => {
            if !db::set_results_unlocked(&pool, session, false).await? {
                anyhow::bail!("no session with id {session}");
            }
            println!("Results locked until the release date.");
        }
        Commands::SetRelease { session, at, clear } => {
            let release_at = if clear { None } else { at };
            if !db::set_release_date(&pool, session, release_at).await? {
                anyhow::bail!("no session with id {session}");
            }
            match release_at {
                Some(at) => println!("Results release at {}.", at.to_rfc3339()),
                None => println!("Release date cleared."),
            }
        }
        Commands::Summary {
            pupil,
            session,
            term,
        } => {
            let session = load_session(&pool, session).await?;
            let term = term.unwrap_or(session.current_term);
            let entries = db::fetch_scores(&pool, pupil, session.id, term).await?;

            match grading::summarize(&entries) {
                Ok(summary) => println!(
                    "{} subjects, total {:.2}, average {:.2}, grade {} ({})",
                    summary.subject_count,
                    summary.total_score,
                    summary.average_score,
                    summary.overall_grade,
                    summary.overall_grade.remark()
                ),
                Err(_) => println!(
                    "No results recorded for {} {}.",
                    session.name,
                    term.label()
                ),
            }
        }
        Commands::Report {
            pupil,
            session,
            term,
            out,
        } => {
            let session = load_session(&pool, session).await?;
            let term = term.unwrap_or(session.current_term);
            let profile = db::fetch_pupil(&pool, pupil)
                .await?
                .with_context(|| format!("no pupil with id {pupil}"))?;
            let entries = db::fetch_scores(&pool, pupil, session.id, term).await?;
            let remarks = db::fetch_summary_remarks(&pool, pupil, session.id, term).await?;
            let sheet = report::build_result_sheet(
                &profile,
                &session,
                term,
                &entries,
                &remarks,
                Utc::now(),
            );
            std::fs::write(&out, sheet)?;
            println!("Result sheet written to {}.", out.display());
        }
        Commands::Remark {
            pupil,
            session,
            term,
            teacher_comment,
            principal_comment,
        } => {
            let session = load_session(&pool, session).await?;
            let term = term.unwrap_or(session.current_term);
            db::fetch_pupil(&pool, pupil)
                .await?
                .with_context(|| format!("no pupil with id {pupil}"))?;

            // Keep whichever comment was not given on the command line.
            let existing = db::fetch_summary_remarks(&pool, pupil, session.id, term).await?;
            let remarks = SummaryRemarks {
                teacher_comment: teacher_comment.or(existing.teacher_comment),
                principal_comment: principal_comment.or(existing.principal_comment),
            };
            db::set_summary_remarks(&pool, pupil, session.id, term, &remarks).await?;
            println!("Comments saved for {} {}.", session.name, term.label());
        }
        Commands::Rank {
            session,
            term,
            limit,
        } => {
            let session = load_session(&pool, session).await?;
            let term = term.unwrap_or(session.current_term);
            let records = db::fetch_session_scores(&pool, session.id, term).await?;
            let ranked = standings::rank_pupils(&records);
            print!("{}", report::build_standings_report(&session, term, &ranked, limit));
        }
    }

    Ok(())
}
