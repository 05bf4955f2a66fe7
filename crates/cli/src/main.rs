use anyhow::Result;
use atlas_indexer::{snapshot_path_for_root, CorpusIndexer, WatchConfig, WatchService};
use atlas_json_path::JsonPath;
use atlas_query::QueryEngine;
use atlas_scanner::{CorpusLayout, FsDocumentProvider, RecordKind};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "atlas", version, about = "Reference index for map-theme configuration corpora")]
struct Cli {
    /// Corpus root containing the assets/ tree
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Snapshot file (defaults to <root>/.atlas/index.json)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the index, rescanning files whose mtime advanced
    Index,
    /// Watch the corpus and keep the index fresh until interrupted
    Watch,
    /// List indexed entities of a kind
    Entities {
        #[arg(value_enum)]
        kind: KindArg,
    },
    /// Resolve the reference recorded at a use site
    Resolve {
        /// Corpus-relative document path
        doc: String,
        /// Dotted JSON path of the use site, e.g. layers.0.builtin.1
        path: String,
    },
    /// List every reference targeting a qualified id
    Usages { qualified_id: String },
}

#[derive(Copy, Clone, ValueEnum)]
enum KindArg {
    Layer,
    TagRendering,
    Filter,
}

impl KindArg {
    const fn as_kind(self) -> RecordKind {
        match self {
            Self::Layer => RecordKind::Layer,
            Self::TagRendering => RecordKind::TagRendering,
            Self::Filter => RecordKind::Filter,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let snapshot = cli
        .snapshot
        .clone()
        .unwrap_or_else(|| snapshot_path_for_root(&cli.root));
    let layout = CorpusLayout::new(&cli.root);
    let mut indexer = CorpusIndexer::open(layout, FsDocumentProvider, snapshot).await;

    match cli.command {
        Command::Index => {
            let stats = indexer.rebuild_all().await;
            println!(
                "Indexed {} files in {}ms ({} changed, {} unchanged, {} removed)",
                stats.scanned, stats.time_ms, stats.changed, stats.unchanged, stats.removed
            );
            println!("{} entities, {} references", stats.entities, stats.references);
            for error in &stats.errors {
                eprintln!("error: {error}");
            }
        }
        Command::Watch => {
            indexer.rebuild_all().await;
            let service = WatchService::start(indexer, WatchConfig::default())?;
            let mut updates = service.subscribe_updates();
            println!("Watching {} (ctrl-c to stop)", cli.root.display());
            loop {
                tokio::select! {
                    update = updates.recv() => {
                        match update {
                            Ok(update) => println!(
                                "[{}] {} in {}ms",
                                if update.success { "ok" } else { "failed" },
                                update.reason,
                                update.duration_ms
                            ),
                            Err(_) => break,
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        let indexer = service.indexer();
                        let guard = indexer.lock().await;
                        guard.persist().await?;
                        break;
                    }
                }
            }
        }
        Command::Entities { kind } => {
            let engine = QueryEngine::new(indexer.store(), indexer.layout());
            for hit in engine.entities_of(kind.as_kind()) {
                println!(
                    "{}",
                    json!({
                        "qualifiedId": hit.entity.qualified_id,
                        "doc": hit.entity.doc,
                        "path": hit.entity.path,
                        "sharedPool": hit.shared_pool,
                    })
                );
            }
        }
        Command::Resolve { doc, path } => {
            let engine = QueryEngine::new(indexer.store(), indexer.layout());
            for anchor in engine.resolve_at(&doc, &JsonPath::parse(&path)) {
                println!("{}", serde_json::to_string(anchor)?);
            }
        }
        Command::Usages { qualified_id } => {
            let engine = QueryEngine::new(indexer.store(), indexer.layout());
            for reference in engine.references_to(&qualified_id) {
                println!("{}", serde_json::to_string(reference)?);
            }
        }
    }

    Ok(())
}
