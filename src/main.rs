use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use post_sync::config::{default_data_dir, AppConfig, JobConfig};
use post_sync::storage::{IndexStore, JsonIndexStore};
use post_sync::sync::{plan_sync, ChangeRule, ContentHasher, TimeWindow};
use post_sync::types::timestamp::parse_timestamp;
use post_sync::types::{ContentValue, CreatorKey, PostRecord};

#[derive(Parser)]
#[command(name = "post-sync")]
#[command(about = "Plan incremental downloads of creator posts")]
struct Cli {
    #[arg(long, env = "POST_SYNC_DATA_DIR", default_value_os_t = default_data_dir())]
    data_dir: PathBuf,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute which posts need downloading and where they go.
    Plan {
        /// JSON array of fetched posts
        #[arg(long)]
        posts: PathBuf,

        /// Only posts published at or after this time
        #[arg(long, value_parser = parse_timestamp)]
        start: Option<DateTime<Utc>>,

        /// Only posts published at or before this time
        #[arg(long, value_parser = parse_timestamp)]
        end: Option<DateTime<Utc>>,

        #[arg(long, env = "POST_SYNC_POST_ID_AS_PATH")]
        post_id_as_path: bool,

        #[arg(long, env = "POST_SYNC_POST_DIRNAME_FORMAT", default_value = "{title}")]
        post_dirname_format: String,

        #[arg(long, env = "POST_SYNC_MIX_POSTS")]
        mix_posts: bool,

        /// Accept posts without an `edited` timestamp
        #[arg(long)]
        allow_missing_edited: bool,

        #[arg(long, env = "POST_SYNC_CHANGE_RULE", default_value = "edited")]
        change_rule: ChangeRule,

        /// Persist the updated indices. Only do this once the planned
        /// downloads have completed.
        #[arg(long)]
        commit: bool,
    },
    /// Print the canonical digest of a JSON document.
    Hash {
        file: PathBuf,

        /// Ignore the order of array elements
        #[arg(long)]
        unordered: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig {
        data_dir: cli.data_dir,
        log_level: cli.log_level,
        ..AppConfig::default()
    };

    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Hash { file, unordered } => {
            let raw = tokio::fs::read_to_string(&file).await?;
            let value: serde_json::Value = serde_json::from_str(&raw)?;
            println!("{}", ContentHasher::hash(&ContentValue::from(value), unordered));
            Ok(())
        }
        Command::Plan {
            posts,
            start,
            end,
            post_id_as_path,
            post_dirname_format,
            mix_posts,
            allow_missing_edited,
            change_rule,
            commit,
        } => {
            let config = AppConfig {
                job: JobConfig {
                    post_id_as_path,
                    post_dirname_format,
                    mix_posts,
                    require_edited: !allow_missing_edited,
                    change_rule,
                },
                ..config
            };
            run_plan(config, posts, TimeWindow::new(start, end), commit).await
        }
    }
}

async fn run_plan(
    config: AppConfig,
    posts_file: PathBuf,
    window: TimeWindow,
    commit: bool,
) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&posts_file).await?;
    let posts: Vec<PostRecord> = serde_json::from_str(&raw)?;

    let store = JsonIndexStore::new(&config.data_dir);
    let keys: Vec<CreatorKey> = posts
        .iter()
        .map(PostRecord::creator_key)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let indices = store.load_indices(&keys).await?;

    let plan = match plan_sync(&posts, &indices, window, &config.job) {
        Ok(plan) => plan,
        Err(e) if e.is_fatal() => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", serde_json::to_string_pretty(&plan.entries)?);

    if commit && !config.job.mix_posts {
        store.save_indices(&plan.indices).await?;
        tracing::info!(
            creators = plan.indices.len(),
            data_dir = %store.root().display(),
            "Indices committed"
        );
    }

    Ok(())
}
