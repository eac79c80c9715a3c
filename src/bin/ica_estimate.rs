use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use megica::{
    epoch, estimate,
    io::{write_ic, Recording},
    Collaborators, EstimateConfig, FastIcaDecomposer, Signal, SvgRenderer,
};

#[derive(Parser)]
#[command(name = "ica_estimate", about = "Temporal ICA decomposition and artifact classification")]
struct Args {
    /// Recording safetensors (`data`, `sfreq`, optional `extdata`, `ch_names`)
    #[arg(long)]
    input: PathBuf,

    /// IC safetensors output path
    #[arg(long)]
    output: PathBuf,

    /// JSON configuration (defaults for every missing key)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for SVG diagnostics; no figures when omitted
    #[arg(long)]
    figures: Option<PathBuf>,

    /// Cut continuous data into epochs of this many samples first
    #[arg(long)]
    epoch_samples: Option<usize>,

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

    let mut cfg = match &args.config {
        Some(p) => EstimateConfig::from_json_file(p).with_context(|| format!("loading {}", p.display()))?,
        None => EstimateConfig::default(),
    };

    let mut rec = Recording::load(&args.input)?;
    println!("Loaded {:?} @ {} Hz", rec.data.shape(), rec.sfreq);

    // The recording's rate wins over configured defaults.
    cfg.fft.sfreq = rec.sfreq;
    cfg.corr.filt.sfreq = rec.sfreq;

    if let Some(n) = args.epoch_samples {
        if let Signal::Continuous(x) = &rec.data {
            rec.data = Signal::from(epoch(x, n)?);
        }
        if let Some(Signal::Continuous(x)) = &rec.extdata {
            rec.extdata = Some(Signal::from(epoch(x, n)?));
        }
    }

    let header = rec.header();
    let decomposer = FastIcaDecomposer::new(cfg.ica.fastica.clone());
    let mut svg = args.figures.as_ref().map(SvgRenderer::new);
    let collab = Collaborators {
        renderer: svg.as_mut().map(|r| r as &mut dyn megica::Renderer),
        viewer: None,
    };

    let est = estimate(&header, &rec.data, rec.extdata.as_ref(), &cfg, &decomposer, collab)?;
    println!(
        "{} components: keep {}, reject {:?}",
        est.ic.n_components(),
        est.verdict.keep.len(),
        est.verdict.reject
    );

    write_ic(&est.ic, &est.verdict, &args.output)?;
    println!("Written → {}", args.output.display());

    Ok(())
}
