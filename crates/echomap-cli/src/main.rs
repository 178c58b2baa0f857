//! Command-line frontend: run the frame pipeline over image directories,
//! train the window classifier, and count targets with a trained model.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use echomap::{
    count_components, count_targets, train, FrameBatch, Mlp, MlpConfig, MlpParams, Pipeline,
    PipelineConfig, WindowDataset,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "echomap")]
#[command(about = "Grayscale frames to binary target maps, with a trainable window classifier")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the target-map pipeline over a directory of images.
    Process(ProcessArgs),
    /// Train the window classifier on a directory of images.
    Train(TrainArgs),
    /// Count targets in a single image with a trained model.
    Count(CountArgs),
}

#[derive(Debug, Clone, Args)]
struct ProcessArgs {
    /// Directory of input images; every readable image becomes a frame.
    #[arg(long)]
    input: PathBuf,
    /// Directory for refined masks and the JSON summary.
    #[arg(long)]
    out_dir: PathBuf,
    /// Pipeline configuration file (JSON); defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Also write the intermediate binary and reduced masks.
    #[arg(long)]
    keep_stages: bool,
}

#[derive(Debug, Clone, Args)]
struct TrainArgs {
    /// Directory of input images.
    #[arg(long)]
    input: PathBuf,
    /// Output path for the trained model (JSON).
    #[arg(long)]
    model: PathBuf,
    /// Classifier configuration file (JSON); defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CountArgs {
    /// Trained model file (JSON).
    #[arg(long)]
    model: PathBuf,
    /// Image to count targets in.
    #[arg(long)]
    image: PathBuf,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Process(args) => run_process(args),
        Commands::Train(args) => run_train(args),
        Commands::Count(args) => run_count(args),
    }
}

// ── process ─────────────────────────────────────────────────────────────────

#[derive(serde::Serialize)]
struct FrameSummary {
    index: usize,
    source: String,
    threshold: f64,
    refined_on_pixels: usize,
    components: usize,
}

#[derive(serde::Serialize)]
struct ProcessSummary {
    config: PipelineConfig,
    frames: Vec<FrameSummary>,
}

fn run_process(args: ProcessArgs) -> CliResult<()> {
    let config: PipelineConfig = load_config(args.config.as_deref())?;
    let (batch, names) = load_batch(&args.input)?;
    let pipeline = Pipeline::new(config)?;
    let run = pipeline.run(&batch)?;

    fs::create_dir_all(&args.out_dir)?;
    let on_counts = run.refined_on_counts();
    let mut frames = Vec::with_capacity(batch.len());
    for (index, name) in names.iter().enumerate() {
        let stem = stem_of(name, index);
        let refined = run
            .refined
            .get(index)
            .ok_or_else(|| format!("missing refined mask for frame {}", index))?;
        refined.save(args.out_dir.join(format!("{}_refined.png", stem)))?;
        if args.keep_stages {
            if let Some(mask) = run.binary.get(index) {
                mask.save(args.out_dir.join(format!("{}_binary.png", stem)))?;
            }
            if let Some(mask) = run.reduced.get(index) {
                mask.save(args.out_dir.join(format!("{}_reduced.png", stem)))?;
            }
        }
        frames.push(FrameSummary {
            index,
            source: name.clone(),
            threshold: run.thresholds[index],
            refined_on_pixels: on_counts[index],
            components: count_components(refined),
        });
    }

    let summary = ProcessSummary {
        config: pipeline.config().clone(),
        frames,
    };
    let summary_path = args.out_dir.join("summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    info!("wrote {} masks and {}", batch.len(), summary_path.display());
    Ok(())
}

// ── train ───────────────────────────────────────────────────────────────────

fn run_train(args: TrainArgs) -> CliResult<()> {
    let config: MlpConfig = load_config(args.config.as_deref())?;
    let (batch, _names) = load_batch(&args.input)?;
    let data = WindowDataset::extract(&batch, config.window, config.target_threshold)?;
    info!(
        "extracted {} samples ({:.1}% positive) from {} frames",
        data.len(),
        100.0 * data.positive_fraction(),
        batch.len()
    );

    let mut model = Mlp::init(config.feature_dim(), &config)?;
    let report = train(&mut model, &data, &config)?;
    if let Some(accuracy) = report.final_accuracy() {
        info!("final training accuracy {:.4}", accuracy);
    }

    if let Some(parent) = args.model.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&args.model, serde_json::to_string_pretty(&model.to_params())?)?;
    info!("wrote model to {}", args.model.display());
    Ok(())
}

// ── count ───────────────────────────────────────────────────────────────────

fn run_count(args: CountArgs) -> CliResult<()> {
    let text = fs::read_to_string(&args.model)?;
    let params: MlpParams = serde_json::from_str(&text)?;
    let model = Mlp::from_params(&params)?;
    let window = window_of(&params)?;

    let frame = image::open(&args.image)?.to_luma8();
    let count = count_targets(&model, &frame, window)?;
    println!("{}", count);
    Ok(())
}

/// Recover the feature window side from a model's input width.
fn window_of(params: &MlpParams) -> CliResult<u32> {
    let dim = params
        .layers
        .first()
        .map(|l| l.fan_in)
        .ok_or("model has no layers")?;
    let side = (dim as f64).sqrt().round() as usize;
    if side * side != dim {
        return Err(format!("model input width {} is not a square window", dim).into());
    }
    Ok(side as u32)
}

// ── shared helpers ──────────────────────────────────────────────────────────

fn load_config<T>(path: Option<&Path>) -> CliResult<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    match path {
        Some(p) => {
            let text = fs::read_to_string(p)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(T::default()),
    }
}

/// Load every readable image in `dir` as a grayscale frame, in path order.
fn load_batch(dir: &Path) -> CliResult<(FrameBatch, Vec<String>)> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    let mut frames = Vec::new();
    let mut names = Vec::new();
    for path in &paths {
        match image::open(path) {
            Ok(img) => {
                frames.push(img.to_luma8());
                names.push(
                    path.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                );
            }
            Err(err) => warn!("skipping {}: {}", path.display(), err),
        }
    }
    if frames.is_empty() {
        return Err(format!("no readable images in {}", dir.display()).into());
    }
    info!("loaded {} frames from {}", frames.len(), dir.display());
    Ok((FrameBatch::new(frames)?, names))
}

fn stem_of(name: &str, index: usize) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem.is_empty() {
        format!("frame_{:04}", index)
    } else {
        stem
    }
}
