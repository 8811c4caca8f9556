use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ufs",
    about = "UFS: content-addressed filesystem trees",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Block store directory, overriding the config file
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Config file (default: ./ufs.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Import a file or directory tree into the store
    Add(AddArgs),
    /// Print the contents of a file
    Cat(CatArgs),
    /// List every entry below an address
    Ls(LsArgs),
    /// Write a tree out to the local filesystem
    Get(GetArgs),
}

#[derive(Args)]
pub struct AddArgs {
    pub path: PathBuf,
    /// Chunk size in bytes, overriding the config file
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

#[derive(Args)]
pub struct CatArgs {
    pub address: String,
}

#[derive(Args)]
pub struct LsArgs {
    pub address: String,
    /// Name to report for the root entry
    #[arg(long, default_value = "")]
    pub name: String,
}

#[derive(Args)]
pub struct GetArgs {
    pub address: String,
    /// Directory to write into
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
    /// Name of the written root (default: the address)
    #[arg(long)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ufs", "ls", "abcd", "--format", "json", "--store", "/tmp/blocks", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/blocks")));
        assert!(matches!(cli.command, Command::Ls(LsArgs { ref address, .. }) if address == "abcd"));
    }

    #[test]
    fn get_defaults() {
        let cli = Cli::try_parse_from(["ufs", "get", "abcd"]).unwrap();
        let Command::Get(args) = cli.command else {
            panic!("expected get");
        };
        assert_eq!(args.output, PathBuf::from("."));
        assert!(args.name.is_none());
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn add_requires_path() {
        assert!(Cli::try_parse_from(["ufs", "add"]).is_err());
    }
}
