//! Run a text trace through the predictor and print statistics.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tagescl::*;
use tagescl::sim;

#[derive(Parser, Debug)]
#[command(version, about = "Evaluate the TAGE-SC-L predictor on a branch trace")]
struct Cli {
    /// Path to a text trace
    #[arg(short, long)]
    trace: PathBuf,

    /// Path to a JSON predictor configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable the loop predictor
    #[arg(long)]
    no_loop: bool,

    /// Disable the statistical corrector
    #[arg(long)]
    no_corrector: bool,

    /// Seed for allocation decisions
    #[arg(long)]
    seed: Option<u64>,

    /// Number of records used only to train the predictor
    #[arg(long, default_value_t = 0)]
    warmup: usize,

    /// Number of worst-predicted branches to list
    #[arg(long, default_value_t = 8)]
    top: usize,

    /// Print a JSON summary instead of text
    #[arg(long)]
    json: bool,
}

fn build_config(args: &Cli) -> Result<PredictorConfig, ConfigError> {
    let mut cfg = match &args.config {
        Some(path) => PredictorConfig::from_file(path)?,
        None => PredictorConfig::default(),
    };
    if args.no_loop {
        cfg.loop_enabled = false;
    }
    if args.no_corrector {
        cfg.corrector_enabled = false;
    }
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    Ok(cfg)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    let cfg = match build_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        },
    };
    let mut predictor = match Predictor::new(cfg) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        },
    };
    let trace = match TextTrace::from_file(&args.trace) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let start = Instant::now();
    let stats = sim::run_with_warmup(&mut predictor, trace.as_slice(), args.warmup);
    let done = start.elapsed();

    if args.json {
        match serde_json::to_string_pretty(&stats.summary()) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            },
        }
        return ExitCode::SUCCESS;
    }

    let cfg = predictor.config();
    println!("[*] Loaded {} records from {}", trace.num_entries(), trace.name());
    println!("[*] Predictor configuration:");
    println!("      History lengths: {:?}", cfg.history_lengths);
    println!("      Loop predictor:  {}", cfg.loop_enabled);
    println!("      Corrector:       {}", cfg.corrector_enabled);
    println!("      Storage:         {:.2}KiB", StorageReport::new().total_kib());
    println!("[*] ... simulated in {:.3?}", done);
    println!();

    println!("[*] Global statistics:");
    println!("      Instructions:    {}", stats.instructions);
    println!("      Unique branches: {}", stats.num_unique_branches());
    println!("      Global hit rate: {}/{} ({:.2}% correct) ({} misses)",
        stats.global_hits(), stats.global_brns(),
        stats.hit_rate() * 100.0, stats.global_miss()
    );
    println!("      MPKI:            {:.3}", stats.mpki());
    println!();

    let s = predictor.stats();
    println!("[*] Per-component statistics:");
    println!("      Base component: {} misses", s.base_miss);
    for (idx, comp) in predictor.tables().iter().enumerate() {
        println!("      Component[{}] (GHR[0..{:03}]): {} misses, {} allocations, {} useful entries",
            idx, comp.history_len(), s.comp_miss[idx], s.comp_alcs[idx],
            comp.num_useful_entries()
        );
    }
    println!("      Failed allocations:  {}", s.failed_alcs);
    println!("      Loop overrides:      {}", s.loop_overrides);
    println!("      Corrector overrides: {}", s.corrector_overrides);
    println!("      Useful resets:       {}", s.resets);
    println!();

    println!("[*] Worst branches:");
    for (pc, data) in stats.worst_branches(args.top) {
        println!("      {:08x} {:8}/{:8} {:.4}",
            pc, data.hits, data.occ, data.hit_rate()
        );
    }
    ExitCode::SUCCESS
}
