use anyhow::Context;
use clap::{Parser, Subcommand};
use shotframe::{CaptureBackend, CaptureRequest, DeviceKind, Pipeline, PipelineConfig, Quality};
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Runtime;

// How long exit waits for an interrupted capture still running on the
// blocking pool.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "shotframe", version, about = "Capture a webpage inside a device frame")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture a URL and composite it into a device frame
    Generate {
        url: String,
        #[arg(long, default_value = "laptop")]
        device: DeviceKind,
        #[arg(long, default_value = "high")]
        quality: Quality,
        /// Directory holding the frame templates
        #[arg(long)]
        assets: Option<PathBuf>,
        /// Directory the mockup is written to
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print the artifact as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the screen area computed for a frame of the given size
    Area {
        #[arg(long, default_value = "laptop")]
        device: DeviceKind,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::from_file(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let result = runtime.block_on(run(cli));
    shut_down(runtime, SHUTDOWN_GRACE);
    result
}

/// Stop the runtime without waiting on blocking tasks past `grace`.
fn shut_down(runtime: Runtime, grace: Duration) {
    runtime.shutdown_timeout(grace);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Area { device, width, height } => {
            let area = config.profiles.get(device).geometry.screen_area(width, height);
            println!("{}", serde_json::to_string(&area)?);
        }
        Command::Generate {
            url,
            device,
            quality,
            assets,
            output,
            json,
        } => {
            if let Some(dir) = assets {
                config.assets_dir = dir;
            }
            if let Some(dir) = output {
                config.output_dir = dir;
            }

            // Validate before paying for a browser launch
            let request = CaptureRequest::new(&url, device, quality)?;

            let browser_config = config.browser.clone();
            let backend = tokio::task::spawn_blocking(move || shotframe::launch_backend(&browser_config))
                .await
                .context("browser launch task failed")??;
            let pipeline = Pipeline::new(config, backend.clone())?;

            let outcome = tokio::select! {
                res = pipeline.generate(&request) => Some(res),
                _ = tokio::signal::ctrl_c() => None,
            };

            if let Err(e) = backend.shutdown() {
                log::warn!("Failed to shut down capture browser: {}", e);
            }

            match outcome {
                Some(Ok(artifact)) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&artifact)?);
                    } else {
                        println!(
                            "{} -> {} ({}x{}, {} bytes)",
                            artifact.source_url,
                            artifact.output_location.display(),
                            artifact.width,
                            artifact.height,
                            artifact.byte_size
                        );
                    }
                }
                Some(Err(e)) => {
                    log::error!("{}", e);
                    anyhow::bail!(e.user_message());
                }
                None => anyhow::bail!("interrupted"),
            }
        }
    }

    Ok(())
}
