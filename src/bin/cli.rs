//! LocalBrain CLI
//!
//! Command-line interface for the local memory store.

use std::io::{self, Read};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use localbrain::error::Result;
use localbrain::intelligence::truncate_chars;
use localbrain::storage::{JsonFileBackend, MemoryStore};
use localbrain::types::*;
use localbrain::FallbackAnalyzer;

#[derive(Parser)]
#[command(name = "localbrain")]
#[command(about = "Local memory engine for AI chat assistants")]
#[command(version)]
struct Cli {
    /// Memory file path
    #[arg(
        long,
        env = "LOCALBRAIN_STORE_PATH",
        default_value = "~/.local/share/localbrain/memories.json"
    )]
    store_path: String,

    /// NLP backend URL (local rules only when unset)
    #[arg(long, env = "LOCALBRAIN_BACKEND_URL")]
    backend_url: Option<String>,

    /// Maximum number of memories kept
    #[arg(long)]
    max_memories: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save content (use - to read stdin)
    Save {
        content: String,
        /// Source hostname or platform
        #[arg(short, long, default_value = "cli")]
        source: String,
        /// Originating page URL
        #[arg(short, long, default_value = "")]
        url: String,
        /// Memory type tag
        #[arg(short = 't', long)]
        r#type: Option<String>,
        /// Explicit conversation id
        #[arg(short, long)]
        conversation: Option<String>,
    },
    /// Extract facts from content and save each one
    Facts {
        content: String,
        #[arg(short, long, default_value = "cli")]
        source: String,
        #[arg(short, long, default_value = "")]
        url: String,
    },
    /// Search memories
    Search {
        /// Search query (shorter than 3 characters lists recent memories)
        query: String,
        /// Maximum results
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Page number (1-based)
        #[arg(short, long, default_value = "1")]
        page: usize,
        /// Filter by category
        #[arg(short = 'C', long)]
        category: Option<String>,
        /// Filter by source substring
        #[arg(short, long)]
        source: Option<String>,
        /// Require tags (comma-separated)
        #[arg(short = 'T', long)]
        tags: Option<String>,
    },
    /// List recent memories
    List {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Get a memory by ID
    Get { id: String },
    /// Delete memories by ID
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Delete every memory
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
    /// Remove near-identical memories
    Dedup,
    /// Purge memories past the retention horizon
    Cleanup,
    /// Export memories
    Export {
        /// Output format (json, csv, text)
        #[arg(short, long, default_value = "json")]
        format: String,
        /// Output file (- for stdout)
        #[arg(short, long, default_value = "-")]
        output: String,
    },
    /// Import a JSON export
    Import {
        /// Input file (- for stdin)
        input: String,
        /// Replace the current collection instead of merging
        #[arg(long)]
        replace: bool,
    },
    /// Analyze content without saving
    Analyze { content: String },
    /// Show statistics
    Stats,
}

fn read_arg(value: &str) -> Result<String> {
    if value == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(value.to_string())
    }
}

fn print_record(record: &MemoryRecord, score: Option<f32>) {
    let score = score
        .map(|s| format!(" (score: {:.3})", s))
        .unwrap_or_default();
    println!(
        "{} [{}]{} {} - {}",
        record.id,
        record.category,
        score,
        record.tags.join(", "),
        truncate_chars(&record.content.replace('\n', " "), 60)
    );
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error[{}]: {}", e.code(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = StoreConfig::from_env()?;
    if let Some(max) = cli.max_memories {
        config.max_memories = max;
    }

    let backend_config = match cli.backend_url {
        Some(url) => Some(BackendConfig {
            base_url: url,
            ..BackendConfig::from_env()?.unwrap_or_default()
        }),
        None => BackendConfig::from_env()?,
    };

    let backend = JsonFileBackend::from_user_path(&cli.store_path)?;
    let store = MemoryStore::new(config, Arc::new(backend))?
        .with_analyzer(FallbackAnalyzer::from_config(backend_config)?);
    store.initialize().await?;

    match cli.command {
        Commands::Save {
            content,
            source,
            url,
            r#type,
            conversation,
        } => {
            let content = read_arg(&content)?;
            let mut context = SaveContext::new(source, url);
            if let Some(t) = r#type {
                context = context.with_type(t);
            }
            if let Some(id) = conversation {
                context = context.with_conversation_id(id);
            }

            match store.save(&content, &context).await? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("Not saved (empty, not worth saving, or duplicate)"),
            }
        }

        Commands::Facts {
            content,
            source,
            url,
        } => {
            let content = read_arg(&content)?;
            let saved = store
                .save_facts(&content, &SaveContext::new(source, url))
                .await?;
            println!("Saved {} fact(s)", saved.len());
            for record in &saved {
                print_record(record, None);
            }
        }

        Commands::Search {
            query,
            limit,
            page,
            category,
            source,
            tags,
        } => {
            let category = category
                .map(|c| c.parse::<Category>())
                .transpose()
                .map_err(localbrain::LocalBrainError::InvalidInput)?;
            let filters = SearchFilters {
                category,
                source,
                tags: tags
                    .map(|t| t.split(',').map(|s| s.trim().to_string()).collect())
                    .unwrap_or_default(),
                ..Default::default()
            };

            let options = SearchOptions::new(limit, page).with_filters(filters);
            let results = store.search(&query, &options).await?;
            if results.is_empty() {
                println!("No memories found");
            }
            for result in results {
                print_record(&result.record, result.score);
            }
        }

        Commands::List { limit } => {
            for record in store.get_all().iter().take(limit) {
                print_record(record, None);
            }
        }

        Commands::Get { id } => match store.get(&id) {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => return Err(localbrain::LocalBrainError::NotFound(id)),
        },

        Commands::Delete { ids } => {
            let removed = store.delete_many(&ids).await;
            println!("Deleted {} memory(ies)", removed);
        }

        Commands::Clear { yes } => {
            if !yes {
                println!("Refusing to clear {} memories without --yes", store.len());
            } else {
                let removed = store.clear_all().await;
                println!("Cleared {} memories", removed);
            }
        }

        Commands::Dedup => {
            let removed = store.deduplicate().await;
            println!("Removed {} duplicate(s)", removed);
        }

        Commands::Cleanup => {
            let removed = store.cleanup_expired().await;
            println!("Removed {} expired memory(ies)", removed);
        }

        Commands::Export { format, output } => {
            let format: ExportFormat = format
                .parse()
                .map_err(localbrain::LocalBrainError::InvalidInput)?;
            let content = store.export(format)?;

            if output == "-" {
                println!("{}", content);
            } else {
                std::fs::write(&output, content)?;
                println!("Exported {} memories to {}", store.len(), output);
            }
        }

        Commands::Import { input, replace } => {
            let data = if input == "-" {
                read_arg("-")?
            } else {
                std::fs::read_to_string(&input)?
            };
            let mode = if replace {
                ImportMode::Replace
            } else {
                ImportMode::Merge
            };
            let report = store.import(&data, mode).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Analyze { content } => {
            let content = read_arg(&content)?;
            let report = store.analyze(&content).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Stats => {
            println!("{}", serde_json::to_string_pretty(&store.stats())?);
        }
    }

    Ok(())
}
