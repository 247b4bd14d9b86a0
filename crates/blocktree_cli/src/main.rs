//! Command-line host for the block tree engine.
//!
//! # Responsibility
//! - Wire a [`SharedBlockStore`] to a SQLite snapshot file.
//! - Offer small maintenance commands: probe, demo seeding, export, import,
//!   stats.
//!
//! Every command restores the snapshot first; mutating commands persist it
//! again before exiting.

use anyhow::{bail, Context};
use blocktree_core::db::open_db;
use blocktree_core::{
    default_log_level, init_logging, BlockFilter, BlockTree, BlockType, CreateBlock,
    SchemaRegistry, SharedBlockStore, SqliteTreeRepository,
};
use clap::{Parser, Subcommand};
use log::info;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "blocktree", version, about = "Typed block tree engine host")]
struct Cli {
    /// SQLite snapshot file.
    #[arg(long, env = "BLOCKTREE_DB", default_value = "blocktree.db", global = true)]
    db: PathBuf,
    /// trace|debug|info|warn|error; defaults by build mode.
    #[arg(long, env = "BLOCKTREE_LOG_LEVEL", global = true)]
    log_level: Option<String>,
    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, env = "BLOCKTREE_LOG_DIR", global = true)]
    log_dir: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check core linkage.
    Ping,
    /// Seed a demo page with a Kanban board.
    Demo,
    /// Write the stored tree as JSON.
    Export {
        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace the stored tree with a JSON export.
    Import { file: PathBuf },
    /// Print block counts per type.
    Stats,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).context("failed to initialize logging")?;
    }

    if let Command::Ping = cli.command {
        println!("blocktree_core ping={}", blocktree_core::ping());
        println!("blocktree_core version={}", blocktree_core::core_version());
        return Ok(());
    }

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;
    let repo = SqliteTreeRepository::try_new(&conn)?;
    let store = SharedBlockStore::new(Arc::new(SchemaRegistry::with_builtin_schemas()));
    store.restore(&repo).context("failed to restore stored tree")?;

    match cli.command {
        Command::Ping => {}
        Command::Demo => {
            let created = seed_demo(&store)?;
            store.persist(&repo)?;
            println!("seeded {created} blocks; store now holds {}", store.count());
        }
        Command::Export { out } => {
            let json = store.export_tree().to_json()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write `{}`", path.display()))?;
                    println!("exported {} blocks to {}", store.count(), path.display());
                }
                None => println!("{json}"),
            }
        }
        Command::Import { file } => {
            let input = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read `{}`", file.display()))?;
            let tree = BlockTree::from_json(&input).context("export file is not a block tree")?;
            let count = store.import_tree(tree)?;
            store.persist(&repo)?;
            println!("imported {count} blocks");
        }
        Command::Stats => print_stats(&store),
    }

    info!("event=cli_exit module=cli status=ok");
    Ok(())
}

fn seed_demo(store: &SharedBlockStore) -> anyhow::Result<usize> {
    let before = store.count();
    let page = store.create(
        CreateBlock::new(BlockType::Page).data(json!({ "title": "Demo project", "icon": "📋" })),
    )?;
    let board = store.create(
        CreateBlock::new(BlockType::KanbanBoard)
            .parent(page.id)
            .data(json!({ "name": "Sprint board" })),
    )?;

    for (title, cards) in [
        ("To do", &["Write release notes", "Plan retro"][..]),
        ("Doing", &["Review import checks"][..]),
        ("Done", &[][..]),
    ] {
        let column = store.create(
            CreateBlock::new(BlockType::KanbanColumn)
                .parent(board.id)
                .data(json!({ "title": title })),
        )?;
        for card_title in cards {
            let card = store.create(
                CreateBlock::new(BlockType::KanbanCard)
                    .parent(column.id)
                    .data(json!({ "title": card_title, "priority": "medium" })),
            )?;
            store.create(
                CreateBlock::new(BlockType::Todo)
                    .parent(card.id)
                    .data(json!({ "content": "Add acceptance notes" })),
            )?;
        }
    }

    if let Err(err) = store.verify_integrity() {
        bail!("demo tree failed integrity check: {err}");
    }
    Ok(store.count() - before)
}

fn print_stats(store: &SharedBlockStore) {
    let blocks = store.query(&BlockFilter::all());
    let mut per_kind: BTreeMap<BlockType, usize> = BTreeMap::new();
    for block in &blocks {
        *per_kind.entry(block.kind()).or_default() += 1;
    }

    println!("blocks={} roots={}", blocks.len(), store.get_roots().len());
    for (kind, count) in per_kind {
        println!("  {kind:<16} {count}");
    }
}
