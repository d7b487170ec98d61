use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use transcriber::audio::{FfmpegTool, MediaTool};
use transcriber::config::{Config, OutputFormat};
use transcriber::interactive::{self, InputFile};
use transcriber::transcribe::{Transcriber, WhisperClient, WhisperModel};
use transcriber::{derive_output_path, print_summary, transcribe_file, PipelineConfig, PipelineResult};

#[derive(Parser)]
#[command(name = "transcriber")]
#[command(version, about = "Transcribe audio and video with the Whisper API")]
#[command(
    long_about = "Transcribe audio and video files with the OpenAI Whisper API. Files over the 25 MB upload limit are converted, split into chunks, and stitched back into one subtitle file."
)]
struct Cli {
    /// Media file, or a folder of media files
    input: PathBuf,

    /// Output file (single input only; defaults to input name with the format's extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for output files (defaults to next to each input)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Output format: srt, txt
    #[arg(short, long, default_value = "srt")]
    format: String,

    /// Source language code (e.g., en, ja, es)
    #[arg(short, long)]
    language: Option<String>,

    /// Vocabulary hints passed to the model
    #[arg(long)]
    prompt: Option<String>,

    /// Model name (defaults to the config file's model, then whisper-1)
    #[arg(long)]
    model: Option<String>,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Transcribe without asking for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Hide progress bars
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// `RUST_LOG` directives when set and valid, otherwise info (debug with `--verbose`).
fn log_filter(verbose: bool, directives: Option<&str>) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

fn init_logging(verbose: bool) {
    let directives = std::env::var("RUST_LOG").ok();

    FmtSubscriber::builder()
        .with_env_filter(log_filter(verbose, directives.as_deref()))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Pair each input with the path its transcript is written to.
fn plan_outputs(
    inputs: &[InputFile],
    output: Option<PathBuf>,
    output_dir: Option<&Path>,
    format: OutputFormat,
) -> Result<Vec<(PathBuf, PathBuf)>> {
    if let Some(output) = output {
        match inputs {
            [single] => return Ok(vec![(single.path.clone(), output)]),
            _ => anyhow::bail!(
                "--output names a single file but {} inputs were found; use --output-dir",
                inputs.len()
            ),
        }
    }

    Ok(inputs
        .iter()
        .map(|f| (f.path.clone(), derive_output_path(&f.path, format, output_dir)))
        .collect())
}

async fn run_batch(
    jobs: &[(PathBuf, PathBuf)],
    tool: &dyn MediaTool,
    transcriber: &dyn Transcriber,
    pipeline_config: &PipelineConfig,
) -> Result<Vec<PipelineResult>> {
    let mut results = Vec::with_capacity(jobs.len());

    for (i, (input, output)) in jobs.iter().enumerate() {
        info!("[{}/{}] {}", i + 1, jobs.len(), input.display());
        let result = transcribe_file(input, output, tool, transcriber, pipeline_config)
            .await
            .with_context(|| format!("Failed to transcribe {}", input.display()))?;
        results.push(result);
    }

    Ok(results)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Parse format
    let format: OutputFormat = cli
        .format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    interactive::print_header();

    // Load configuration and make sure there is a key to use
    let config_path = cli.config.clone().or_else(Config::config_file_path);
    let config = match &config_path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    let mut config = interactive::ensure_api_key(config, config_path.as_deref())?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(language) = cli.language {
        config.language = Some(language);
    }
    config
        .validate()
        .context("Configuration validation failed")?;

    // Find the files to transcribe
    let inputs = interactive::discover_inputs(&cli.input)?;
    if inputs.is_empty() {
        anyhow::bail!("No supported files found in {}", cli.input.display());
    }

    if cli.input.is_dir() {
        interactive::print_file_table(&inputs);
        if !cli.yes && !interactive::confirm_batch(inputs.len())? {
            println!("Transcription cancelled");
            return Ok(());
        }
    }

    let jobs = plan_outputs(&inputs, cli.output, cli.output_dir.as_deref(), format)?;

    let tool = FfmpegTool::new().with_bitrate(config.bitrate.clone());
    tool.check().await.context("FFmpeg is required")?;

    let api_key = config.api_key.clone().unwrap_or_default();
    let mut client = WhisperClient::new(api_key).with_model(WhisperModel::from(config.model.as_str()));
    if let Some(language) = config.language.clone() {
        client = client.with_language(language);
    }
    if let Some(prompt) = cli.prompt {
        client = client.with_prompt(prompt);
    }

    let pipeline_config = PipelineConfig::from_config(&config, format, !cli.no_progress);

    info!("Format:   {}", format);
    info!("Model:    {}", config.model);
    if let Some(ref language) = config.language {
        info!("Language: {}", language);
    }

    // Dropping the batch future on Ctrl+C kills running subprocesses and
    // removes the run's temp directory.
    let results = tokio::select! {
        results = run_batch(&jobs, &tool, &client, &pipeline_config) => results?,
        _ = tokio::signal::ctrl_c() => {
            anyhow::bail!("Operation interrupted by user, temp audio files removed");
        }
    };

    print_summary(&results);
    Ok(())
}
