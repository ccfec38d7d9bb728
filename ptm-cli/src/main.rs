//! Process-tree differencing and merging tool.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use clap::{Args, Parser, Subcommand, ValueEnum};
use proctree_merge::{
    delta_tree, diff_trees, merge_trees, parse_file, print_to_string_pretty, render_tree,
    resolve_placeholders, DiffConfig, MatchingAlgorithm, Thresholds, Tree,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Process-tree differencing and merging tool
#[derive(Parser)]
#[command(name = "ptm")]
#[command(version)]
#[command(about = "Structural diff and three-way merge for process models", long_about = None)]
struct Cli {
    /// Log debug diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe the changes between two versions of a process
    #[command(visible_alias = "d")]
    Diff {
        /// Old version
        old: String,
        /// New version
        new: String,

        /// How to present the changes
        #[arg(short, long, value_enum, default_value_t = Format::Operations)]
        format: Format,

        #[command(flatten)]
        matching: MatchingArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Merge two edited copies of a common base
    #[command(visible_alias = "m")]
    Merge {
        /// Base file (common ancestor)
        base: String,
        /// Branch A; its changes win conflicts
        branch_a: String,
        /// Branch B
        branch_b: String,

        #[command(flatten)]
        matching: MatchingArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Write the resolved conflicts as XML to this file
        #[arg(long)]
        conflicts: Option<String>,

        /// Write the changes replayed from branch A as XML to this file
        #[arg(long)]
        edits: Option<String>,
    },
}

#[derive(Args)]
struct MatchingArgs {
    /// Largest dissimilarity accepted for leaf matches
    #[arg(short = 't', long, default_value_t = 0.25)]
    leaf_threshold: f64,

    /// Largest dissimilarity accepted for inner-node matches
    #[arg(short = 'i', long, default_value_t = 0.25)]
    inner_threshold: f64,

    /// Matching algorithm: bucket, path, top-down, bottom-up or exact
    #[arg(short, long, default_value = "bucket")]
    algorithm: String,
}

impl MatchingArgs {
    fn config(&self) -> proctree_merge::Result<DiffConfig> {
        let thresholds = Thresholds::new(self.leaf_threshold, self.inner_threshold)?;
        let algorithm: MatchingAlgorithm = self.algorithm.parse()?;
        debug!(
            %algorithm,
            leaf = thresholds.leaf(),
            inner = thresholds.inner(),
            "matching configuration"
        );
        Ok(DiffConfig::new(thresholds, algorithm))
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// The edit script, one change per line
    Operations,
    /// ASCII drawing of the annotated delta tree
    DeltaTree,
    /// The annotated delta tree as XML
    DeltaXml,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Diff {
            old,
            new,
            format,
            matching,
            output,
        } => run_diff(&old, &new, format, &matching, output.as_deref()),
        Commands::Merge {
            base,
            branch_a,
            branch_b,
            matching,
            output,
            conflicts,
            edits,
        } => run_merge(
            &base,
            &branch_a,
            &branch_b,
            &matching,
            output.as_deref(),
            conflicts.as_deref(),
            edits.as_deref(),
        ),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

/// Installs a stderr subscriber filtered by `RUST_LOG`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Runs the diff and writes it in the requested format.
fn run_diff(
    old_path: &str,
    new_path: &str,
    format: Format,
    matching: &MatchingArgs,
    output_path: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = matching.config()?;

    eprintln!("Parsing old: {}", old_path);
    let old = read_tree(old_path)?;

    eprintln!("Parsing new: {}", new_path);
    let new = read_tree(new_path)?;

    eprintln!("Diffing ({})...", config.algorithm);
    let text = match format {
        Format::Operations => diff_trees(&old, &new, &config).script.to_string(),
        Format::DeltaTree => render_tree(&resolve_placeholders(&delta_tree(&old, &new, &config)?)),
        Format::DeltaXml => {
            print_to_string_pretty(&resolve_placeholders(&delta_tree(&old, &new, &config)?))?
        }
    };

    let mut output = open_output(output_path)?;
    output.write_all(text.as_bytes())?;
    output.flush()?;

    eprintln!("Diff complete.");
    Ok(())
}

/// Runs the three-way merge.
fn run_merge(
    base_path: &str,
    a_path: &str,
    b_path: &str,
    matching: &MatchingArgs,
    output_path: Option<&str>,
    conflicts_path: Option<&str>,
    edits_path: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = matching.config()?;

    eprintln!("Parsing base: {}", base_path);
    let base = read_tree(base_path)?;

    eprintln!("Parsing branch A: {}", a_path);
    let branch_a = read_tree(a_path)?;

    eprintln!("Parsing branch B: {}", b_path);
    let branch_b = read_tree(b_path)?;

    eprintln!("Merging ({})...", config.algorithm);
    let result = merge_trees(&base, &branch_a, &branch_b, &config)?;

    let mut output = open_output(output_path)?;
    output.write_all(print_to_string_pretty(&result.merged())?.as_bytes())?;
    output.flush()?;

    if let Some(path) = conflicts_path {
        let mut writer = BufWriter::new(File::create(path)?);
        result.conflicts.write_xml(&mut writer)?;
        writer.flush()?;
    }

    if let Some(path) = edits_path {
        let mut writer = BufWriter::new(File::create(path)?);
        result.edits.write_xml(&mut writer)?;
        writer.flush()?;
    }

    let count = result.conflicts.conflict_count();
    if count > 0 {
        eprintln!("Merge complete with {} resolved conflicts:", count);
        for conflict in result.conflicts.resolved() {
            eprintln!("  {}", conflict);
        }
    } else {
        eprintln!("Merge complete.");
    }

    Ok(())
}

fn read_tree(path: &str) -> Result<Tree, Box<dyn std::error::Error>> {
    if !Path::new(path).is_file() {
        return Err(format!("file not found: {}", path).into());
    }
    Ok(parse_file(path)?)
}

fn open_output(path: Option<&str>) -> io::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    })
}
