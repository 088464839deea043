//! GBX CLI - Command-line tool for resolving and rebuilding GBX files.
//!
//! This is the main entry point for the `gbx` command-line application.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use gbx::prelude::*;
use gbx::view::{byte_spans, hex_dump};

/// GBX - node graph resolution and round-trip tool for GBX files
#[derive(Parser)]
#[command(name = "gbx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that resolves external nodes.
#[derive(clap::Args)]
struct ResolveArgs {
    /// Variant used for synthetic materials
    #[arg(long, value_enum, default_value = "asset")]
    variant: VariantArg,

    /// Load *.Material.Gbx references from disk instead of synthesizing them
    #[arg(long)]
    no_material_substitution: bool,
}

impl ResolveArgs {
    fn options(&self) -> LoadOptions {
        LoadOptions {
            material_variant: self.variant.into(),
            substitute_materials: !self.no_material_substitution,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum VariantArg {
    Asset,
    Linked,
}

impl From<VariantArg> for MaterialVariant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Asset => MaterialVariant::Asset,
            VariantArg::Linked => MaterialVariant::Linked,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a file and print its node tree
    Inspect {
        /// Input GBX file
        #[arg(short, long, env = "GBX_INPUT")]
        input: PathBuf,

        /// Maximum tree depth to print
        #[arg(short, long)]
        depth: Option<usize>,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,

        /// Hex dump the byte leaf at this field path instead of the tree
        #[arg(long)]
        bytes: Option<FieldPath>,

        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Resolve a file, verify the round trip and write the result
    Rebuild {
        /// Input GBX file
        #[arg(short, long, env = "GBX_INPUT")]
        input: PathBuf,

        /// Output GBX file
        #[arg(short, long)]
        output: PathBuf,

        /// Inline every resolved external node into the output
        #[arg(long)]
        merge: bool,

        /// Store the body uncompressed
        #[arg(long)]
        uncompressed: bool,

        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Rewrite a file with an uncompressed body
    Normalize {
        /// Input GBX file
        #[arg(short, long, env = "GBX_INPUT")]
        input: PathBuf,

        /// Output GBX file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Resolve and round-trip every file matching a pattern
    Check {
        /// Glob pattern, e.g. "Items/**/*.Item.Gbx"
        #[arg(short, long)]
        pattern: String,

        #[command(flatten)]
        resolve: ResolveArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            input,
            depth,
            json,
            bytes,
            resolve,
        } => {
            cmd_inspect(&input, depth, json, bytes.as_ref(), resolve.options())?;
        }
        Commands::Rebuild {
            input,
            output,
            merge,
            uncompressed,
            resolve,
        } => {
            cmd_rebuild(&input, &output, merge, uncompressed, resolve.options())?;
        }
        Commands::Normalize { input, output } => {
            cmd_normalize(&input, &output)?;
        }
        Commands::Check { pattern, resolve } => {
            cmd_check(&pattern, resolve.options())?;
        }
    }

    Ok(())
}

fn cmd_inspect(
    input: &Path,
    depth: Option<usize>,
    json: bool,
    bytes: Option<&FieldPath>,
    options: LoadOptions,
) -> Result<()> {
    let file = Loader::new(options)
        .load(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let tree = project_file(&file);

    if let Some(path) = bytes {
        let span = byte_spans(&tree)
            .into_iter()
            .find(|span| &span.path == path)
            .with_context(|| format!("No byte leaf at `{}`", path))?;
        print!("{}", hex_dump(&span.bytes, span.offset));
        return Ok(());
    }

    if json {
        println!("{}", gbx::view::to_json(&tree).context("Failed to serialize tree")?);
    } else {
        print!("{}", tree.render(depth));
    }

    Ok(())
}

fn cmd_rebuild(
    input: &Path,
    output: &Path,
    merge: bool,
    uncompressed: bool,
    options: LoadOptions,
) -> Result<()> {
    let mut loader = Loader::new(options);
    let materials = if loader.options().substitute_materials {
        loader.options().material_variant.name()
    } else {
        "from disk"
    };
    println!("Resolving: {} (materials: {})", input.display(), materials);

    let start = Instant::now();
    let mut file = loader
        .load(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    println!("Resolved {} nodes in {:?}", file.nb_nodes(), start.elapsed());

    if merge {
        file.merge_external_nodes();
    }
    if uncompressed {
        file.set_body_compression(Compression::Uncompressed);
    }

    let report = build_and_check(&file).context("Round trip failed")?;
    if !report.is_clean() {
        println!("{} nodes were never referenced", report.unreferenced.len());
    }

    fs::write(output, &report.bytes).context("Failed to write output file")?;
    println!(
        "Wrote {} ({} bytes, {} nodes)",
        output.display(),
        report.bytes.len(),
        report.rebuilt.nb_nodes()
    );

    Ok(())
}

fn cmd_normalize(input: &Path, output: &Path) -> Result<()> {
    println!("Normalizing: {} -> {}", input.display(), output.display());

    let data = fs::read(input).context("Failed to read input file")?;
    let normalized = normalize_compression(&data).context("Failed to decode input file")?;
    fs::write(output, normalized).context("Failed to write output file")?;

    println!("Normalization complete");

    Ok(())
}

fn cmd_check(pattern: &str, options: LoadOptions) -> Result<()> {
    let paths: Vec<PathBuf> = glob::glob(pattern)
        .context("Invalid glob pattern")?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();

    println!("Checking {} files...", paths.len());

    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let failures = Mutex::new(Vec::new());
    let unclean = Mutex::new(0usize);

    paths.par_iter().for_each(|path| {
        let result = Loader::new(options)
            .load(path)
            .map_err(anyhow::Error::from)
            .and_then(|file| build_and_check(&file).map_err(anyhow::Error::from));

        match result {
            Ok(report) if !report.is_clean() => {
                if let Ok(mut count) = unclean.lock() {
                    *count += 1;
                }
            }
            Ok(_) => {}
            Err(e) => {
                if let Ok(mut failures) = failures.lock() {
                    failures.push((path.clone(), e));
                }
            }
        }

        pb.inc(1);
    });

    pb.finish_with_message("Done");

    let failures = failures.into_inner().unwrap_or_default();
    let unclean = unclean.into_inner().unwrap_or_default();
    for (path, error) in &failures {
        eprintln!("Error checking {}: {:#}", path.display(), error);
    }

    println!(
        "Checked {} files in {:?} ({} errors, {} with unreferenced nodes)",
        paths.len(),
        start.elapsed(),
        failures.len(),
        unclean
    );

    if !failures.is_empty() {
        anyhow::bail!("{} files failed the round trip", failures.len());
    }

    Ok(())
}
