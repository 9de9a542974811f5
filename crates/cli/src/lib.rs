mod clear;
mod find;
mod stats;
mod tree;
mod units;
mod view;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use symdex_api::LinkageId;
use symdex_core::{IndexConfig, SymbolIndex};

#[derive(Parser)]
#[command(
    name = "symdex",
    version,
    about = "Inspect persistent C and C++ symbol indices",
    long_about = "Symdex stores the declarations of C and C++ translation units in a single \
                  index file, keyed by semantic identity. This tool reads those files: \
                  statistics, qualified name lookup, scope trees and indexed units."
)]
pub struct Cli {
    /// Also print log output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show storage and cache statistics of an index
    Stats {
        #[arg(value_name = "INDEX")]
        index: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up bindings by qualified name
    #[command(
        long_about = "Resolves a qualified name such as `std::vector` segment by segment. \
                            With --prefix, the last segment matches any name it begins."
    )]
    Find {
        #[arg(value_name = "INDEX")]
        index: PathBuf,
        #[arg(value_name = "QUALIFIED_NAME")]
        name: String,
        #[arg(long)]
        prefix: bool,
        #[arg(long, default_value = "C++")]
        linkage: String,
    },
    /// Print the scope tree of a linkage
    Tree {
        #[arg(value_name = "INDEX")]
        index: PathBuf,
        /// Deepest level to print
        #[arg(long)]
        depth: Option<usize>,
        #[arg(long, default_value = "C++")]
        linkage: String,
    },
    /// List indexed source units
    Units {
        #[arg(value_name = "INDEX")]
        index: PathBuf,
    },
    /// Remove index files
    #[command(
        long_about = "Removes the given index file. Without an argument, every index under \
                            the base index directory (~/.symdex/indices or SYMDEX_INDEX_DIR) is removed."
    )]
    Clear {
        #[arg(value_name = "INDEX")]
        index: Option<PathBuf>,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = IndexConfig::from_env()?;
    let _guard = symdex_core::logging::init_logging("cli", cli.verbose, config.log_dir.as_deref());

    match cli.command {
        Commands::Stats { index, json } => stats::run(&open_index(&index, config)?, json),
        Commands::Find {
            index,
            name,
            prefix,
            linkage,
        } => find::run(&open_index(&index, config)?, &linkage_id(&linkage), &name, prefix),
        Commands::Tree {
            index,
            depth,
            linkage,
        } => tree::run(&open_index(&index, config)?, &linkage_id(&linkage), depth),
        Commands::Units { index } => units::run(&open_index(&index, config)?),
        Commands::Clear { index } => clear::run(index),
    }
}

/// Open an existing index with every known linkage registered.
pub fn open_index(
    path: &Path,
    config: IndexConfig,
) -> Result<SymbolIndex, Box<dyn std::error::Error>> {
    if !path.is_file() {
        return Err(format!("no index at {}", path.display()).into());
    }
    let index = SymbolIndex::open(path, config)?;
    for rules in symdex_cpp::all_linkages() {
        index.register_linkage(rules)?;
    }
    Ok(index)
}

fn linkage_id(name: &str) -> LinkageId {
    LinkageId::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linkage_aliases() {
        assert_eq!(linkage_id("cpp"), LinkageId::CPP);
        assert_eq!(linkage_id("C"), LinkageId::C);
        assert_eq!(linkage_id("fortran").as_str(), "fortran");
    }

    #[test]
    fn test_open_index_requires_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.symdex");
        assert!(open_index(&path, IndexConfig::default()).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_cli_parses_find() {
        let cli = Cli::try_parse_from(["symdex", "find", "idx.symdex", "std::vec", "--prefix"])
            .unwrap();
        match cli.command {
            Commands::Find {
                name,
                prefix,
                linkage,
                ..
            } => {
                assert_eq!(name, "std::vec");
                assert!(prefix);
                assert_eq!(linkage, "C++");
            }
            _ => panic!("expected find"),
        }
    }
}
