use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use listinglens::{
    AUDIT_STYLES, GenerationClient, GenerationClientConfig, GenerationOutcome, ModelsClient,
    ScrapeClient, Template, build_request,
};

#[derive(Parser, Debug)]
#[command(name = "audit")]
#[command(version)]
#[command(about = "Audit how visible a website is to AI search engines using Gemini")]
#[command(after_help = "EXAMPLES:
    audit example.com
    audit https://example.com/services -i \"dental clinics\"
    audit example.com -c rival.com -s \"Technical Deep-Dive\"
    audit example.com -o report.md")]
struct Args {
    /// Website URL to audit (https:// is assumed when the scheme is missing)
    #[arg(value_name = "URL")]
    url: String,

    /// Industry or niche to frame the audit
    #[arg(short, long)]
    industry: Option<String>,

    /// Competitor site or name to compare against
    #[arg(short, long)]
    competitor: Option<String>,

    /// Report style
    #[arg(
        short,
        long,
        default_value = AUDIT_STYLES[0],
        value_parser = clap::builder::PossibleValuesParser::new(AUDIT_STYLES.iter().copied())
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

fn get_api_key() -> Result<String> {
    std::env::var("GOOGLE_API_KEY")
        .or_else(|_| std::env::var("GEMINI_API_KEY"))
        .context("GOOGLE_API_KEY or GEMINI_API_KEY environment variable is not set")
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

    let scraper = ScrapeClient::new()
        .map_err(|e| anyhow::anyhow!("Failed to create scrape client: {}", e))?;

    let pb = spinner(args.quiet, "Fetching page...");

    let page = scraper
        .fetch(&args.url)
        .await
        .map_err(|e| anyhow::anyhow!("Scrape failed: {}", e))?;

    if let Some(pb) = pb {
        pb.finish_with_message(format!("Fetched {} characters", page.text.chars().count()));
    }

    if page.text.is_empty() {
        anyhow::bail!("No visible text could be extracted from {}", page.url);
    }

    let url = page.url.clone();
    let parts = vec![page.into_part()];

    let request = build_request(
        &args.style,
        parts,
        &Template::SiteAudit {
            url,
            industry: args.industry,
            competitor: args.competitor,
        },
    );

    let pb = spinner(args.quiet, "Auditing AI search visibility...");

    let outcome = client
        .generate(&model, &request)
        .await
        .map_err(|e| anyhow::anyhow!("Generation failed: {}", e))?;

    match outcome {
        GenerationOutcome::Text(text) => {
            if let Some(pb) = pb {
                pb.finish_with_message("Audit ready");
            }
            if let Some(path) = args.output {
                fs::write(&path, &text)
                    .await
                    .context("Failed to write output file")?;
                println!("Audit saved to: {:?}", path);
            } else {
                println!("\n🔎 GEO Visibility Audit\n");
                println!("{}", text);
            }
        }
        GenerationOutcome::Refusal => {
            if let Some(pb) = pb {
                pb.finish_with_message("No audit produced");
            }
            println!("The model declined to audit this page.");
        }
    }

    Ok(())
}
