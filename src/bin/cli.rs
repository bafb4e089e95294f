//! Rewind backend CLI
//!
//! Local driver for the four handler operations, running against
//! filesystem-backed stores. Useful for seeding a test group and exercising
//! the generation pipeline without a deployed backend.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rewind::{
    config::Config,
    context::AppContext,
    error::Result,
    handlers::{
        generate_weekly_quiz, generate_year_news_article, generate_year_news_package,
        nostalgia_chat, ArticleRequest, CallerIdentity, ChatContext, ChatRequest, PackageRequest,
        QuizRequest,
    },
    store::{paths, DocumentStore},
};
use serde_json::json;

/// Rewind - nostalgia content backend
#[derive(Parser, Debug)]
#[command(name = "rewind", version, about = "Nostalgia content backend driver")]
struct Cli {
    /// Path to the data directory (documents, objects, config.toml)
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Caller uid to run operations as
    #[arg(short, long, default_value = "local-dev")]
    uid: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a group document and a membership for the caller
    SeedGroup {
        /// Group id
        #[arg(long, default_value = "g1")]
        group: String,

        /// The year the group is reliving
        #[arg(long, default_value_t = 1990)]
        year: i32,

        /// Quiz difficulty (easy|medium|hard)
        #[arg(long, default_value = "medium")]
        difficulty: String,
    },

    /// Generate (or fetch the cached) weekly quiz
    Quiz {
        #[arg(long, default_value = "g1")]
        group: String,

        #[arg(long, default_value = "w1")]
        week: String,

        /// Force regeneration (requires group admin)
        #[arg(long)]
        force: bool,
    },

    /// Generate the year-news package for a year
    Package {
        #[arg(long)]
        year: i32,
    },

    /// Generate a feature article for a news card
    Article {
        #[arg(long)]
        year: i32,

        #[arg(long, default_value_t = 1)]
        month: i64,

        #[arg(long)]
        title: String,

        #[arg(long)]
        subtitle: String,
    },

    /// Ask the nostalgia assistant a question
    Chat {
        #[arg(long, default_value = "g1")]
        group: String,

        #[arg(long)]
        year: Option<i32>,

        message: String,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(cli.data_dir.join("config.toml"));
    let ctx = AppContext::local(config, &cli.data_dir)?;
    let caller = CallerIdentity::new(&cli.uid);

    match cli.command {
        Command::SeedGroup {
            group,
            year,
            difficulty,
        } => {
            ctx.store
                .set(
                    &paths::group(&group),
                    json!({
                        "adminUid": cli.uid,
                        "currentYear": year,
                        "settings": { "quizDifficulty": difficulty },
                    }),
                )
                .await?;
            ctx.store
                .set(&paths::member(&group, &cli.uid), json!({ "joined": true }))
                .await?;
            log::info!("Seeded group {group} (year {year}) with admin {}", cli.uid);
        }

        Command::Quiz { group, week, force } => {
            let response = generate_weekly_quiz(
                &ctx,
                Some(&caller),
                QuizRequest {
                    group_id: group,
                    week_id: week,
                    year: None,
                    force_regenerate: force,
                },
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&response.questions)?);
        }

        Command::Package { year } => {
            let response = generate_year_news_package(
                &ctx,
                Some(&caller),
                PackageRequest { year: Some(year) },
            )
            .await?;
            log::info!("Package {}: {}", response.year, response.status);
        }

        Command::Article {
            year,
            month,
            title,
            subtitle,
        } => {
            let response = generate_year_news_article(
                &ctx,
                Some(&caller),
                ArticleRequest {
                    year: Some(year),
                    month: Some(month),
                    title,
                    subtitle,
                    image_query: String::new(),
                },
            )
            .await?;
            log::info!("Article {} ({})", response.story_key, response.status);
            println!("{}", serde_json::to_string_pretty(&response.article)?);
        }

        Command::Chat {
            group,
            year,
            message,
        } => {
            let response = nostalgia_chat(
                &ctx,
                Some(&caller),
                ChatRequest {
                    group_id: group,
                    message,
                    context: Some(ChatContext {
                        year,
                        history: Vec::new(),
                    }),
                },
            )
            .await?;
            println!("{}", response.reply);
        }
    }

    Ok(())
}
