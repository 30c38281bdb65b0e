use anyhow::Result;
use clap::Parser;
use gemini_line_client::image::ImageAttachment;
use gemini_line_client::models::{Config, Prompt};
use gemini_line_client::network::{self, RetryPolicy};
use gemini_line_client::session::{Session, SessionOptions};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "gemini-line-client")]
#[command(about = "Send prompts to Gemini over a hand-framed HTTPS request")]
struct CliArgs {
    /// Send a single prompt and exit instead of reading lines from stdin.
    #[arg(long)]
    prompt: Option<String>,

    /// Attach the built-in sample image to every prompt.
    #[arg(long, conflicts_with = "image_file")]
    image: bool,

    /// Attach an image file to every prompt.
    #[arg(long, value_name = "PATH")]
    image_file: Option<PathBuf>,

    /// Skip TLS certificate verification. Insecure; for testing only.
    #[arg(long)]
    insecure: bool,
}

impl CliArgs {
    fn attachment(&self) -> gemini_line_client::Result<Option<ImageAttachment>> {
        match (&self.image_file, self.image) {
            (Some(path), _) => ImageAttachment::from_file(path).map(Some),
            (None, true) => Ok(Some(ImageAttachment::embedded())),
            (None, false) => Ok(None),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_line_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting gemini-line-client");

    let args = CliArgs::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    config.insecure_tls |= args.insecure;

    let policy = RetryPolicy::default();
    if let Err(e) = network::wait_for_network(&config.host, config.port, policy).await {
        error!("{}. Giving up", e);
        std::process::exit(1);
    }

    let options = SessionOptions {
        image: args.attachment()?,
        ..SessionOptions::default()
    };
    let mut session = Session::from_config(&config, options)?;
    if let Some(image) = session.image() {
        info!(
            "Attaching {} image ({} base64 bytes) to each prompt",
            image.mime_type(),
            image.data().len()
        );
    }

    if let Some(line) = args.prompt.as_deref() {
        match Prompt::from_line(line) {
            Some(prompt) => {
                let reply = session.ask(&prompt).await;
                println!("{}", reply);
            }
            None => error!("Prompt is empty"),
        }
        return Ok(());
    }

    println!("Enter your prompt text:");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(prompt) = Prompt::from_line(&line) else {
            continue;
        };

        info!("User prompt received: {}", prompt);
        let reply = session.ask(&prompt).await;
        println!("Reply from Gemini:");
        println!("{}", reply);
        println!("Enter your prompt text:");
    }

    info!("Input closed, exiting");
    Ok(())
}
