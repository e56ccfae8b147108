use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use cutflow::{Accounting, Filter, FilterList};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

mod simulate;

use simulate::{Selection, WorkerResult};

/// cutflow - cut-flow accounting for event selections
#[derive(Parser)]
#[command(name = "cutflow")]
#[command(about = "Inspect, merge and produce cut-flow statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cut-flow of a saved state file
    Show {
        /// State file written by `simulate` or `merge`
        file: PathBuf,
    },

    /// Merge state files from independent jobs over the same cuts
    Merge {
        /// State files to merge, all with the same stages in the same order
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,

        /// Write the merged state to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the demonstration selection over toy events
    Simulate {
        /// Number of events to generate
        #[arg(long, default_value = "100000")]
        events: u64,

        /// Number of parallel workers (defaults to the rayon pool size)
        #[arg(long)]
        workers: Option<usize>,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Minimum missing transverse energy
        #[arg(long, default_value = "25.0")]
        min_met: f64,

        /// Minimum jet transverse momentum
        #[arg(long, default_value = "30.0")]
        min_jet_pt: f64,

        /// Maximum absolute jet pseudorapidity
        #[arg(long, default_value = "2.5")]
        max_jet_eta: f64,

        /// Keep the MET stage in the cut-flow without applying it
        #[arg(long)]
        no_met_cut: bool,

        /// Directory receiving events.json and objects.json
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Show { file } => handle_show(&file)?,
        Commands::Merge { files, output } => handle_merge(&files, output.as_deref())?,
        Commands::Simulate {
            events,
            workers,
            seed,
            min_met,
            min_jet_pt,
            max_jet_eta,
            no_met_cut,
            output_dir,
        } => {
            let selection = Selection {
                min_met,
                min_jet_pt,
                max_jet_eta,
                disable_met_cut: no_met_cut,
            };
            let workers = workers.unwrap_or_else(rayon::current_num_threads);
            handle_simulate(events, workers, seed, selection, output_dir.as_deref())?
        }
    }

    Ok(())
}

/// Handle the 'show' command
fn handle_show(file: &Path) -> Result<()> {
    let list = store::load(file)
        .with_context(|| format!("Failed to load cut-flow from {}", file.display()))?;

    print_cutflow(&file.display().to_string(), &list);
    Ok(())
}

/// Handle the 'merge' command
fn handle_merge(files: &[PathBuf], output: Option<&Path>) -> Result<()> {
    let start = Instant::now();
    let merged = store::load_and_merge(files).context("Failed to merge cut-flows")?;
    println!(
        "{} Merged {} files in {:?}",
        "✓".green(),
        files.len(),
        start.elapsed()
    );

    print_cutflow("Merged", &merged);

    if let Some(path) = output {
        store::save(path, &merged.states())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} Wrote {}", "✓".green(), path.display());
    }
    Ok(())
}

/// Handle the 'simulate' command
fn handle_simulate(
    events: u64,
    workers: usize,
    seed: u64,
    selection: Selection,
    output_dir: Option<&Path>,
) -> Result<()> {
    if selection.max_jet_eta <= 0.0 {
        bail!("--max-jet-eta must be positive");
    }

    let ranges = simulate::partition(events, workers);
    tracing::info!(events, workers = ranges.len(), seed, "starting simulation");

    let start = Instant::now();
    let selected = Arc::new(AtomicU64::new(0));
    let results: Vec<WorkerResult> = ranges
        .into_par_iter()
        .map(|range| simulate::run_worker(seed, range, selection, selected.clone()))
        .collect();
    println!(
        "{} Processed {} events in {:?}",
        "✓".green(),
        events,
        start.elapsed()
    );

    let (event_lists, object_lists): (Vec<_>, Vec<_>) =
        results.into_iter().map(|r| (r.events, r.objects)).unzip();
    let event_cuts: FilterList<Filter> =
        FilterList::merge_all(event_lists).context("Failed to merge event cut-flows")?;
    let object_cuts: FilterList<Filter> =
        FilterList::merge_all(object_lists).context("Failed to merge object cut-flows")?;

    print_cutflow("Event selection", &event_cuts);
    print_cutflow("Jet selection", &object_cuts);
    println!(
        "{}Selected events (hook): {}",
        "• ".cyan(),
        selected.load(Ordering::Relaxed)
    );

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        store::save(&dir.join("events.json"), &event_cuts.states())?;
        store::save(&dir.join("objects.json"), &object_cuts.states())?;
        println!("{} Wrote state files to {}", "✓".green(), dir.display());
    }
    Ok(())
}

/// Helper function to print a cut-flow with its overall efficiency
fn print_cutflow<F: Accounting>(title: &str, list: &FilterList<F>) {
    println!("{}", format!("{title}:").bold().blue());
    println!("{list}");

    if let Some(last) = list.iter().last() {
        let efficiency = match list.total() {
            0 => 0.0,
            total => list.passing() as f64 / total as f64,
        };
        println!(
            "{}Overall efficiency: {:.2}% ({} of {})",
            "• ".green(),
            100.0 * efficiency,
            list.passing(),
            list.total()
        );
        for (label, total) in last.count_funcs_total() {
            let passing = last.count_funcs_passing().get(label).copied().unwrap_or(0.0);
            println!("{}{label}: {passing:.2} of {total:.2}", "• ".cyan());
        }
    }
}
