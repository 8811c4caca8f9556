use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use ufs_fetch::{
    materialize_to_dir, BlockFetcher, Driver, FetchConfig, FetchResult, FileContents, StoreFetcher,
};
use ufs_store::{import_path, FsBlockStore};
use ufs_types::ContentAddress;
use ufs_walk::Item;

use crate::cli::*;
use crate::config::Config;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config.store = store;
    }

    match cli.command {
        Command::Add(args) => cmd_add(args, config, cli.format),
        Command::Cat(args) => cmd_cat(args, config).await,
        Command::Ls(args) => cmd_ls(args, config, cli.format).await,
        Command::Get(args) => cmd_get(args, config, cli.format).await,
    }
}

fn open_fetcher(config: &Config) -> anyhow::Result<Arc<StoreFetcher<FsBlockStore>>> {
    let store = FsBlockStore::open(&config.store)
        .with_context(|| format!("failed to open store {}", config.store.display()))?;
    Ok(Arc::new(StoreFetcher::new(Arc::new(store))))
}

fn parse_address(text: &str) -> anyhow::Result<ContentAddress> {
    text.parse().with_context(|| format!("invalid address {text:?}"))
}

fn cmd_add(args: AddArgs, config: Config, format: OutputFormat) -> anyhow::Result<()> {
    let mut builder = config.builder;
    if let Some(chunk_size) = args.chunk_size {
        builder.chunk_size = chunk_size;
    }
    let store = FsBlockStore::open(&config.store)?;
    let summary = import_path(&store, &args.path, builder)
        .with_context(|| format!("failed to import {}", args.path.display()))?;

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "address": summary.root.address.to_hex(),
                "size": summary.root.size,
                "files": summary.files,
                "directories": summary.directories,
                "symlinks": summary.symlinks,
                "blocks": summary.blocks_written,
            });
            println!("{out}");
        }
        OutputFormat::Text => {
            println!(
                "{} Added {}",
                "✓".green().bold(),
                args.path.display().to_string().bold()
            );
            println!("  Address: {}", summary.root.address.to_hex().yellow());
            println!(
                "  {} files, {} directories, {} symlinks, {} bytes in {} blocks",
                summary.files,
                summary.directories,
                summary.symlinks,
                summary.root.size,
                summary.blocks_written
            );
        }
    }
    Ok(())
}

async fn cmd_cat(args: CatArgs, config: Config) -> anyhow::Result<()> {
    let root = parse_address(&args.address)?;
    let mut contents = FileContents::open(open_fetcher(&config)?, root, config.fetch).await?;
    let mut stdout = std::io::stdout();
    while let Some(chunk) = contents.next_chunk().await? {
        stdout.write_all(&chunk)?;
    }
    stdout.flush()?;
    Ok(())
}

/// One line of `ufs ls` output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ListEntry {
    Directory { path: String },
    File { path: String, size: u64 },
    Symlink { path: String, target: String },
}

/// Walk `root` and summarize every entry; buckets and file segments are
/// folded into the entries they belong to.
pub async fn list_entries<F: BlockFetcher + ?Sized>(
    fetcher: Arc<F>,
    root: ContentAddress,
    root_name: &str,
    config: FetchConfig,
) -> FetchResult<Vec<ListEntry>> {
    let mut driver = Driver::new(fetcher, root, root_name, config);
    let mut entries = Vec::new();
    let mut file_size = 0;

    while let Some(item) = driver.next_item().await? {
        match item {
            Item::Directory { is_new: false, .. } => {}
            Item::Directory { path, .. } => entries.push(ListEntry::Directory { path }),
            Item::Symlink { path, target } => entries.push(ListEntry::Symlink {
                path,
                target: String::from_utf8_lossy(&target).into_owned(),
            }),
            Item::File {
                is_new,
                path,
                segment,
            } => {
                if is_new {
                    file_size = 0;
                }
                file_size += segment.len() as u64;
                if segment.is_final() {
                    entries.push(ListEntry::File {
                        path,
                        size: file_size,
                    });
                }
            }
        }
    }
    Ok(entries)
}

async fn cmd_ls(args: LsArgs, config: Config, format: OutputFormat) -> anyhow::Result<()> {
    let root = parse_address(&args.address)?;
    let entries = list_entries(open_fetcher(&config)?, root, &args.name, config.fetch).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            for entry in &entries {
                match entry {
                    ListEntry::Directory { path } => {
                        println!("{} {:>10}  {}/", "d".blue(), "-", display_path(path).blue().bold())
                    }
                    ListEntry::File { path, size } => {
                        println!("{} {:>10}  {}", "f".green(), size, display_path(path))
                    }
                    ListEntry::Symlink { path, target } => println!(
                        "{} {:>10}  {} -> {}",
                        "l".cyan(),
                        "-",
                        display_path(path).cyan(),
                        target
                    ),
                }
            }
        }
    }
    Ok(())
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "."
    } else {
        path
    }
}

async fn cmd_get(args: GetArgs, config: Config, format: OutputFormat) -> anyhow::Result<()> {
    let root = parse_address(&args.address)?;
    let name = args.name.unwrap_or_else(|| root.to_hex());
    let written = materialize_to_dir(open_fetcher(&config)?, root, &name, &args.output, config.fetch)
        .await
        .with_context(|| format!("failed to materialize {}", root.short_hex()))?;

    let target = args.output.join(&name);
    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "address": root.to_hex(),
                "path": target.display().to_string(),
                "entries": written,
            });
            println!("{out}");
        }
        OutputFormat::Text => println!(
            "{} Wrote {} entries to {}",
            "✓".green().bold(),
            written,
            target.display().to_string().bold()
        ),
    }
    Ok(())
}
