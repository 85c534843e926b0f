use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{Level, debug, warn};
use tracing_subscriber::FmtSubscriber;
use walkdir::WalkDir;

use listinglens::{
    GenerationClient, GenerationClientConfig, GenerationOutcome, ImagePart, InputPart,
    LISTING_STYLES, ModelsClient, Template, build_request,
};

#[derive(Parser, Debug)]
#[command(name = "describe")]
#[command(version)]
#[command(about = "Turn property photos into a market-ready listing description using Gemini")]
#[command(after_help = "EXAMPLES:
    describe photos/
    describe kitchen.jpg living-room.jpg
    describe -s \"Luxury & Elegant\" photos/
    describe -m gemini-1.5-pro -o listing.md photos/")]
struct Args {
    /// Photo files or folders to scan for photos (jpg, jpeg, png)
    #[arg(required = true, value_name = "PHOTOS")]
    photos: Vec<PathBuf>,

    /// Listing style
    #[arg(
        short,
        long,
        default_value = LISTING_STYLES[0],
        value_parser = clap::builder::PossibleValuesParser::new(LISTING_STYLES.iter().copied())
    )]
    style: String,

    /// Gemini model to use (skips auto-detection)
    #[arg(short = 'm', long)]
    model: Option<String>,

    /// Output file path (prints to stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// API timeout in seconds
    #[arg(short, long, default_value = "120")]
    timeout: u64,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (no progress output)
    #[arg(short, long)]
    quiet: bool,
}

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

fn get_api_key() -> Result<String> {
    std::env::var("GOOGLE_API_KEY")
        .or_else(|_| std::env::var("GEMINI_API_KEY"))
        .context("GOOGLE_API_KEY or GEMINI_API_KEY environment variable is not set")
}

fn is_photo_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| PHOTO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn find_photo_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.exists() {
            warn!("Path does not exist: {:?}", input);
            continue;
        }
        if input.is_file() {
            // Explicitly named files skip the extension filter
            files.push(input.clone());
            continue;
        }
        for entry in WalkDir::new(input)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && is_photo_file(path) {
                files.push(path.to_path_buf());
            }
        }
    }
    files
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).ok();
}

fn spinner(quiet: bool, message: &str) -> Option<ProgressBar> {
    if quiet {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let api_key = get_api_key()?;

    let files = find_photo_files(&args.photos);

    if files.is_empty() {
        anyhow::bail!("No photos found (looking for jpg, jpeg, png files)");
    }

    println!("Found {} photos", files.len());

    let config = GenerationClientConfig {
        timeout_secs: args.timeout,
    };

    let client = GenerationClient::with_config(api_key.clone(), config)
        .map_err(|e| anyhow::anyhow!("Failed to create Gemini client: {}", e))?;

    let model = match args.model {
        Some(model) => model,
        None => {
            let pb = spinner(args.quiet, "Detecting available models...");
            let models_client = ModelsClient::new(client.http_client().clone(), api_key);
            let descriptor = models_client
                .resolve()
                .await
                .map_err(|e| anyhow::anyhow!("Model detection failed: {}", e))?;
            let model = descriptor.identifier().to_string();
            if let Some(pb) = pb {
                pb.finish_with_message(format!("Using model {}", model));
            }
            model
        }
    };

    let mut parts = Vec::with_capacity(files.len());
    for file in &files {
        let image = ImagePart::from_path(file)
            .await
            .with_context(|| format!("Failed to read photo {:?}", file))?;
        debug!("Decoded {:?} ({}x{})", file, image.width, image.height);
        parts.push(InputPart::Image(image));
    }

    let request = build_request(&args.style, parts, &Template::PhotoListing);

    let pb = spinner(args.quiet, "Analyzing property details...");

    let outcome = client
        .generate(&model, &request)
        .await
        .map_err(|e| anyhow::anyhow!("Generation failed: {}", e))?;

    match outcome {
        GenerationOutcome::Text(text) => {
            if let Some(pb) = pb {
                pb.finish_with_message("Description ready");
            }
            if let Some(path) = args.output {
                fs::write(&path, &text)
                    .await
                    .context("Failed to write output file")?;
                println!("Description saved to: {:?}", path);
            } else {
                println!("\n📝 Market-Ready Description\n");
                println!("{}", text);
            }
        }
        GenerationOutcome::Refusal => {
            if let Some(pb) = pb {
                pb.finish_with_message("No description produced");
            }
            println!("The model declined to describe these photos. Try different property images.");
        }
    }

    Ok(())
}
