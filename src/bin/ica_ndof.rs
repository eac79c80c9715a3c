use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use megica::{config::NdofMethod, estimate_ndof, io::Recording, NdofConfig};

#[derive(Parser)]
#[command(name = "ica_ndof", about = "Suggest a component count from the data covariance spectrum")]
struct Args {
    /// Recording safetensors (`data`, `sfreq`)
    #[arg(long)]
    input: PathBuf,

    /// Cutoff rule: abs, maxrel or rel
    #[arg(long, default_value = "rel")]
    method: NdofMethod,

    /// Threshold for the cutoff rule
    #[arg(long, default_value_t = 1e3)]
    param: f64,

    /// Print every eigenvalue and ratio
    #[arg(long)]
    show_spectrum: bool,

    /// -v info, -vv debug
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let rec = Recording::load(&args.input)?;
    let cfg = NdofConfig { method: args.method, param: args.param, ..NdofConfig::default() };
    let est = estimate_ndof(&rec.data, &cfg)?;

    if args.show_spectrum {
        for (i, d) in est.eigenvalues.iter().enumerate() {
            let ratio = est.ratios.get(i).map_or(String::new(), |r| format!("{r:12.4e}"));
            println!("{i:4} {d:12.4e} {ratio}");
        }
    }
    println!(
        "cutoff {:.4e} at index {}: keep {} of {} directions",
        est.cutoff,
        est.index,
        est.ndof,
        est.eigenvalues.len()
    );
    Ok(())
}
