//! Print the storage budget of the predictor.

use clap::Parser;

use tagescl::StorageReport;

#[derive(Parser, Debug)]
#[command(version, about = "Print the storage budget of the TAGE-SC-L predictor")]
struct Cli {
    /// Print the breakdown as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), serde_json::Error> {
    let args = Cli::parse();
    let report = StorageReport::new();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let rows = [
        ("Base component", report.base),
        ("Tagged components", report.tagged),
        ("Loop predictor", report.loops),
        ("Corrector", report.corrector),
        ("Global history", report.ghr),
        ("Meta-selector", report.meta),
        ("Clock", report.clock),
    ];
    println!("[*] Storage budget:");
    for (name, bits) in rows {
        println!("      {:<18} {:>7}b", name, bits);
    }
    println!("      {:<18} {:>7}b, {:.2}KiB", "Total",
        report.total_bits(), report.total_kib()
    );
    Ok(())
}
