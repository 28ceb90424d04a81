use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod cache;
mod catalog;
mod connectivity;
mod db;
mod games;
mod models;
mod report;
mod roster;
mod tracker;
mod tutor;

use cache::CacheStore;
use connectivity::Connectivity;
use db::DurableStore;
use models::{Completion, Role, SessionUser};
use tracker::{CompletionResult, ProgressTracker};

#[derive(Parser)]
#[command(name = "vidyahub-progress")]
#[command(about = "Offline-first student progress tracker for VidyaHub", long_about = None)]
struct Cli {
    /// Path to the durable SQLite store
    #[arg(long, default_value = "vidyahub.db", global = true)]
    db: PathBuf,
    /// Path to the fast cache store file
    #[arg(long, default_value = "vidyahub_cache.json", global = true)]
    cache: PathBuf,
    /// Treat the device as offline: mutations skip the cache store
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Student,
    Teacher,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Lecture,
    Pdf,
    Quiz,
    Game,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the durable store schema
    InitDb,
    /// Load the seed roster into both stores
    Seed,
    /// Import student records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Start a session as a student or teacher
    Login {
        #[arg(long)]
        name: String,
        #[arg(long, value_enum)]
        role: RoleArg,
        #[arg(long)]
        grade: Option<i64>,
    },
    /// End the current session
    Logout,
    /// Record a completed content item for the logged-in student
    Complete {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        content: String,
        /// Content type; inferred from the catalog when omitted
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
        #[arg(long)]
        score: Option<i64>,
    },
    /// Grant coins to the logged-in student
    AddCoins {
        #[arg(long)]
        amount: i64,
    },
    /// Play a scripted mini-game and record the outcome
    Play {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        content: String,
        /// Game inputs: numbers for Number Collector, guesses for Word Scramble
        #[arg(long, value_delimiter = ',')]
        inputs: Vec<String>,
    },
    /// Simulate coming back online and sync the cache from the durable store
    Sync,
    /// Show the leaderboard, descending by coins
    Leaderboard {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Show the full teacher roster
    Roster,
    /// Generate a markdown class progress report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// List every badge students can earn
    Badges,
    /// Ask the AI tutor for an explanation and quiz on a topic
    Tutor {
        #[arg(long)]
        topic: String,
    },
    /// Get personalized learning recommendations
    Recommend,
}

fn completion_for(kind: KindArg, score: Option<i64>) -> Completion {
    match kind {
        KindArg::Lecture => Completion::Lecture,
        KindArg::Pdf => Completion::Pdf,
        KindArg::Quiz => Completion::Quiz { score },
        KindArg::Game => Completion::Game { score },
    }
}

fn kind_from_catalog(kind: &catalog::ContentKind, score: Option<i64>) -> Completion {
    match kind {
        catalog::ContentKind::Lecture { .. } => Completion::Lecture,
        catalog::ContentKind::Pdf { .. } => Completion::Pdf,
        catalog::ContentKind::Quiz { .. } => Completion::Quiz { score },
        catalog::ContentKind::Game { .. } => Completion::Game { score },
    }
}

async fn open_stores(cli: &Cli) -> anyhow::Result<(DurableStore, CacheStore)> {
    let durable = DurableStore::open(&cli.db).await?;
    durable.init().await?;
    let cache = CacheStore::open(&cli.cache);
    Ok((durable, cache))
}

/// Loads the stored session and requires a student behind it.
fn require_student(cache: &mut CacheStore) -> anyhow::Result<SessionUser> {
    let user = cache
        .session_user()
        .context("not logged in; run `login` first")?;
    anyhow::ensure!(
        user.role == Role::Student,
        "this command needs a student session, but {} is a teacher",
        user.name
    );
    Ok(user)
}

fn print_completion(result: CompletionResult, content: &str) {
    match result {
        CompletionResult::Completed {
            coins_earned,
            completion_percentage,
        } => println!(
            "Completed {content}: +{coins_earned} coins, subject now {completion_percentage}% done."
        ),
        CompletionResult::AlreadyCompleted => {
            println!("{content} was already completed; nothing changed.")
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::InitDb => {
            let durable = DurableStore::open(&cli.db).await?;
            durable.init().await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let (durable, mut cache) = open_stores(&cli).await?;
            let roster = catalog::seed_roster();
            for record in &roster {
                durable.put(record).await?;
            }
            cache.set_roster_snapshot(&roster)?;
            println!("Seed roster inserted ({} students).", roster.len());
        }
        Commands::Import { csv } => {
            let (durable, _) = open_stores(&cli).await?;
            let inserted = db::import_csv(&durable, csv).await?;
            println!("Imported {inserted} students from {}.", csv.display());
        }
        Commands::Login { name, role, grade } => {
            let (durable, mut cache) = open_stores(&cli).await?;
            let user = SessionUser {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.clone(),
                role: match role {
                    RoleArg::Student => Role::Student,
                    RoleArg::Teacher => Role::Teacher,
                },
                grade: *grade,
            };
            cache.set_session_user(&user)?;

            match user.role {
                Role::Student => {
                    let mut tracker = ProgressTracker::new(
                        durable,
                        cache,
                        catalog::standard_catalog(),
                        Connectivity::new(!cli.offline),
                    );
                    let record = tracker.start_session(&user).await;
                    println!(
                        "Logged in as {} (grade {}, {} coins, level {}).",
                        record.name, record.grade, record.coins, record.level
                    );
                }
                Role::Teacher => println!("Logged in as teacher {}.", user.name),
            }
        }
        Commands::Logout => {
            let mut cache = CacheStore::open(&cli.cache);
            cache.clear_session()?;
            println!("Logged out.");
        }
        Commands::Complete {
            subject,
            content,
            kind,
            score,
        } => {
            if let Some(score) = score {
                anyhow::ensure!(*score >= 0, "--score cannot be negative");
            }
            let (durable, mut cache) = open_stores(&cli).await?;
            let user = require_student(&mut cache)?;
            let mut tracker = ProgressTracker::new(
                durable,
                cache,
                catalog::standard_catalog(),
                Connectivity::new(!cli.offline),
            );
            tracker.start_session(&user).await;

            let completion = match kind {
                Some(kind) => completion_for(*kind, *score),
                None => {
                    let item = tracker
                        .catalog()
                        .find_content(subject, content)
                        .with_context(|| {
                            format!("{content} is not in the catalog; pass --kind explicitly")
                        })?;
                    kind_from_catalog(&item.kind, *score)
                }
            };

            let result = tracker.complete_content(subject, content, completion).await?;
            print_completion(result, content);
            if !tracker.is_online() {
                println!("Offline: the cache store was not updated.");
            }
        }
        Commands::AddCoins { amount } => {
            anyhow::ensure!(*amount >= 0, "--amount cannot be negative");
            let (durable, mut cache) = open_stores(&cli).await?;
            let user = require_student(&mut cache)?;
            let mut tracker = ProgressTracker::new(
                durable,
                cache,
                catalog::standard_catalog(),
                Connectivity::new(!cli.offline),
            );
            tracker.start_session(&user).await;
            let total = tracker.add_coins(*amount).await?;
            println!("Added {amount} coins; new balance {total}.");
        }
        Commands::Play {
            subject,
            content,
            inputs,
        } => {
            let (durable, mut cache) = open_stores(&cli).await?;
            let user = require_student(&mut cache)?;
            let mut tracker = ProgressTracker::new(
                durable,
                cache,
                catalog::standard_catalog(),
                Connectivity::new(!cli.offline),
            );
            tracker.start_session(&user).await;

            let item = tracker
                .catalog()
                .find_content(subject, content)
                .with_context(|| format!("{content} is not in the catalog"))?;
            anyhow::ensure!(
                matches!(item.kind, catalog::ContentKind::Game { .. }),
                "{} is not a game",
                item.title
            );

            let outcome = match content.as_str() {
                "m1g1" => {
                    let (mut game, mut rx) = games::NumberCollector::new();
                    game.start();
                    for input in inputs {
                        let value: i64 = input
                            .parse()
                            .with_context(|| format!("{input} is not a number"))?;
                        game.collect(value);
                    }
                    rx.try_recv().ok()
                }
                "e1g1" => {
                    let (mut game, mut rx) = games::WordScramble::pick();
                    println!("Hint: {}", game.hint());
                    println!("Scrambled: {}", game.scrambled());
                    game.start();
                    for guess in inputs {
                        game.guess(guess);
                    }
                    rx.try_recv().ok()
                }
                _ => anyhow::bail!("{} cannot be played from the command line", item.title),
            };

            match outcome {
                Some(outcome) => {
                    if outcome.won {
                        println!("You win! Score: {}", outcome.score);
                    } else {
                        println!("Game over. Score: {}", outcome.score);
                    }
                    let result = tracker
                        .complete_content(
                            subject,
                            content,
                            Completion::Game {
                                score: Some(outcome.score),
                            },
                        )
                        .await?;
                    print_completion(result, content);
                    if let Some(record) = tracker.active() {
                        println!("Coin balance: {}.", record.coins);
                    }
                }
                None => println!("Game abandoned before finishing; nothing recorded."),
            }
        }
        Commands::Sync => {
            let (durable, mut cache) = open_stores(&cli).await?;
            let user = require_student(&mut cache)?;
            // Start offline so the online flip below is a real transition.
            let mut tracker = ProgressTracker::new(
                durable,
                cache,
                catalog::standard_catalog(),
                Connectivity::new(false),
            );
            tracker.start_session(&user).await;
            tracker.set_online(true).await;
            println!("Cache synced from the durable store for {}.", user.name);
        }
        Commands::Leaderboard { limit } => {
            let (durable, cache) = open_stores(&cli).await?;
            let mut tracker = ProgressTracker::new(
                durable,
                cache,
                catalog::standard_catalog(),
                Connectivity::new(!cli.offline),
            );
            tracker.load_full_roster().await;
            println!("Top students by coins:");
            for (rank, record) in tracker.leaderboard().iter().take(*limit).enumerate() {
                println!(
                    "{}. {} ({}) {} coins",
                    rank + 1,
                    record.name,
                    record.level,
                    record.coins
                );
            }
        }
        Commands::Roster => {
            let (durable, cache) = open_stores(&cli).await?;
            let mut tracker = ProgressTracker::new(
                durable,
                cache,
                catalog::standard_catalog(),
                Connectivity::new(!cli.offline),
            );
            tracker.load_full_roster().await;
            println!("Class roster:");
            for record in tracker.students() {
                println!(
                    "- {} (grade {}) {} coins, level {}, badges: {}",
                    record.name,
                    record.grade,
                    record.coins,
                    record.level,
                    if record.badges.is_empty() {
                        "none".to_string()
                    } else {
                        record.badges.join(", ")
                    }
                );
            }
        }
        Commands::Report { out } => {
            let (durable, cache) = open_stores(&cli).await?;
            let mut tracker = ProgressTracker::new(
                durable,
                cache,
                catalog::standard_catalog(),
                Connectivity::new(!cli.offline),
            );
            tracker.load_full_roster().await;
            let report = report::build_report(&tracker.leaderboard(), tracker.catalog());
            std::fs::write(out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Badges => {
            println!("Available badges:");
            for badge in catalog::BADGES {
                println!(
                    "- {} {} ({}): {}",
                    badge.icon, badge.name, badge.key, badge.description
                );
            }
        }
        Commands::Tutor { topic } => {
            let client = tutor::TutorClient::from_env();
            let response = client.generate_tutor_content(topic).await?;
            println!("{}\n", response.explanation);
            println!("Quiz ({} questions):", response.quiz.len());
            for question in response.quiz.iter().take(5) {
                println!("- {}", question.question);
            }
            if response.quiz.len() > 5 {
                println!("  ... and {} more.", response.quiz.len() - 5);
            }
        }
        Commands::Recommend => {
            let (durable, mut cache) = open_stores(&cli).await?;
            let user = require_student(&mut cache)?;
            let mut tracker = ProgressTracker::new(
                durable,
                cache,
                catalog::standard_catalog(),
                Connectivity::new(!cli.offline),
            );
            let record = tracker.start_session(&user).await.clone();

            let client = tutor::TutorClient::from_env();
            let recommendations = client.recommendations(&record, tracker.catalog()).await;
            if recommendations.is_empty() {
                println!("Everything is complete; no recommendations.");
            } else {
                println!("Recommended next steps:");
                for rec in recommendations {
                    println!("- [{}] {}: {}", rec.kind, rec.title, rec.reason);
                }
            }
        }
    }

    Ok(())
}
