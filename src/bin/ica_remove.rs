use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use megica::{
    comparison_traces, epoch,
    io::{load_ic, Recording, StWriter},
    remove_components, Renderer, Signal, SvgRenderer,
};

#[derive(Parser)]
#[command(name = "ica_remove", about = "Remove rejected independent components from a recording")]
struct Args {
    /// Recording safetensors the IC file was estimated from
    #[arg(long)]
    input: PathBuf,

    /// IC safetensors written by `ica_estimate`
    #[arg(long)]
    ic: PathBuf,

    /// Cleaned data output path
    #[arg(long)]
    output: PathBuf,

    /// Components to remove (comma-separated, 0-based); default: the stored reject list
    #[arg(long, value_delimiter = ',')]
    components: Option<Vec<usize>>,

    /// Epoch length used at estimation time, if the recording was epoched on load
    #[arg(long)]
    epoch_samples: Option<usize>,

    /// Directory for before/after SVG traces
    #[arg(long)]
    figures: Option<PathBuf>,

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

    let mut rec = Recording::load(&args.input)?;
    if let Some(n) = args.epoch_samples {
        if let Signal::Continuous(x) = &rec.data {
            rec.data = Signal::from(epoch(x, n)?);
        }
    }
    let (ic, stored_reject) = load_ic(&args.ic)?;
    let reject = args.components.unwrap_or(stored_reject);

    let cleaned = remove_components(&rec.data, &ic, &reject).context("removing components")?;
    println!("Removed components {reject:?} from {:?}", rec.data.shape());

    if let Some(dir) = &args.figures {
        let traces = comparison_traces(&rec.data, &cleaned, &ic, &reject)?;
        SvgRenderer::new(dir).render_removal(&traces, &rec.header())?;
    }

    let mut w = StWriter::new();
    w.add_signal("data", &cleaned);
    w.add_f64("sfreq", &[rec.sfreq], &[1]);
    w.add_strings("ch_names", &rec.ch_names);
    w.write(&args.output)?;
    println!("Written → {}", args.output.display());

    Ok(())
}
