//!
//! This module is the main entry point for the CLI and orchestrates the
//! rewrite/parse/write pipeline over the given files.

use std::path::{Path, PathBuf};
use std::{env, fs, process};

use clap::{Parser as ClapParser, ValueEnum};

use crate::cache::ContentCache;
use crate::errors::PolyblocksError;
use crate::parser::{ParseOutcome, Parser};
use crate::registry::{build_default_registry, BlockRegistry};
use crate::{rewriter, writer};

// ============================================================================
// CLI ARGUMENTS - Command-line argument definitions
// ============================================================================

/// The main CLI argument structure.
#[derive(Debug, ClapParser)]
#[command(
    name = "polyblocks",
    version,
    about = "Parses block documents that embed multiple languages in one file."
)]
pub struct PolyblocksArgs {
    /// The .block files (or embedded-source files) to process.
    pub files: Vec<PathBuf>,

    /// List the available block types.
    #[arg(long)]
    pub list: bool,

    /// Defines the output format.
    #[arg(short = 'O', long, value_enum, default_value_t = OutputFormat::Xml)]
    pub output_format: OutputFormat,

    /// Pretty-prints the output.
    #[arg(short, long)]
    pub pretty: bool,

    /// Wipes the content cache before processing.
    #[arg(long)]
    pub clean_cache: bool,

    /// Overrides the cache directory.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Xml,
    Json,
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// The main entry point for the CLI.
pub fn run() {
    let args = PolyblocksArgs::parse();
    let registry = build_default_registry();

    if args.list {
        for (tag, description) in registry.list() {
            println!("@{tag:<10} {description}");
        }
        return;
    }

    let cache_dir = args.cache_dir.clone().unwrap_or_else(default_cache_dir);
    let cache = match ContentCache::new(&cache_dir) {
        Ok(cache) => Some(cache),
        Err(e) => {
            eprintln!("warning: cache disabled: {e}");
            None
        }
    };

    if args.clean_cache {
        if let Some(cache) = &cache {
            match cache.wipe() {
                Ok(removed) => eprintln!("cache: removed {removed} entries"),
                Err(e) => {
                    print_error(e);
                    process::exit(1);
                }
            }
        }
        if args.files.is_empty() {
            return;
        }
    }

    for path in &args.files {
        let outcome = parse_file(path, &registry, cache.as_ref()).unwrap_or_else(|e| {
            print_error(e);
            process::exit(1);
        });
        for warning in &outcome.warnings {
            eprintln!("warning: {warning}");
        }
        let rendered = match args.output_format {
            OutputFormat::Xml => writer::write_xml(&outcome.blocks, args.pretty),
            OutputFormat::Json => writer::write_json(&outcome.blocks, args.pretty)
                .unwrap_or_else(|e| {
                    print_error(e);
                    process::exit(1);
                }),
        };
        println!("{rendered}");
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Rewrites (when the extension calls for it) and parses one file.
fn parse_file(
    path: &Path,
    registry: &BlockRegistry,
    cache: Option<&ContentCache>,
) -> Result<ParseOutcome, PolyblocksError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let mut parser = Parser::new(registry);
    if let Some(cache) = cache {
        parser = parser.with_cache(cache);
    }
    if rewriter::is_native_extension(ext) {
        parser.parse_path(path)
    } else {
        let text = fs::read_to_string(path).map_err(|source| PolyblocksError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let lines = rewriter::rewrite_source(&text, ext);
        parser.parse_lines(&lines, Some(&path.display().to_string()))
    }
}

fn default_cache_dir() -> PathBuf {
    if let Some(dir) = env::var_os("POLYBLOCKS_CACHE") {
        return PathBuf::from(dir);
    }
    let home = env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(env::temp_dir);
    home.join(".cache").join("polyblocks")
}

fn print_error(e: PolyblocksError) {
    let report = miette::Report::new(e);
    eprintln!("{report:?}");
}
