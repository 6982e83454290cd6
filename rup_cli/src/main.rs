use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;

use rup_core::body::{FileBody, RequestBody};
use rup_core::progress::{format_bytes, ProgressListener};
use rup_core::types::types::MediaType;
use rup_core::uploader::{HttpUploader, Method, UploadConfig};

mod terminal_listener;
use terminal_listener::{JsonLinesListener, TerminalProgressListener};

#[derive(Parser)]
#[command(name = "rup", about = "Rust Upload with Progress")]
struct Args {
    /// URL to upload to (defaults to $RUP_URL)
    #[arg(short, long)]
    url: Option<String>,

    /// File to upload
    #[arg(short, long)]
    file: PathBuf,

    /// HTTP method
    #[arg(short, long, default_value = "POST")]
    method: String,

    /// Content type sent with the file
    #[arg(short = 't', long, default_value = "application/octet-stream")]
    content_type: String,

    /// Extra header as `Name: value`; may be repeated
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Basic auth user name
    #[arg(long, requires = "password")]
    user: Option<String>,

    /// Basic auth password
    #[arg(long, requires = "user")]
    password: Option<String>,

    /// Seconds to wait for the connection to be established
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,

    /// Print progress as JSON lines instead of a progress bar
    #[arg(long)]
    json: bool,
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}

fn build_config(args: &Args) -> UploadConfig {
    let url = args
        .url
        .clone()
        .or_else(|| std::env::var("RUP_URL").ok())
        .unwrap_or_else(|| fail("No URL given: pass --url or set RUP_URL"));
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .unwrap_or_else(|_| fail(format!("Invalid HTTP method: {}", args.method)));

    let mut builder = UploadConfig::builder(url)
        .with_method(method)
        .with_connect_timeout(Duration::from_secs(args.connect_timeout));
    for raw in &args.headers {
        let (name, value) = raw
            .split_once(':')
            .unwrap_or_else(|| fail(format!("Invalid header (expected `Name: value`): {}", raw)));
        builder = builder.with_header(name.trim(), value.trim());
    }
    if let (Some(user), Some(password)) = (&args.user, &args.password) {
        builder = builder.with_basic_auth(user.as_str(), password.as_str());
    }
    builder.build()
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = build_config(&args);
    let content_type = MediaType::parse(&args.content_type)
        .unwrap_or_else(|e| fail(format!("Invalid content type: {}", e)));
    let body = FileBody::open(&args.file, Some(content_type))
        .await
        .unwrap_or_else(|e| fail(format!("Cannot read {}: {}", args.file.display(), e)));
    let size = body.content_length().unwrap_or(None);

    let uploader = HttpUploader::new(config).unwrap_or_else(|e| fail(e));

    let terminal = (!args.json).then(|| Arc::new(TerminalProgressListener::new(size)));
    let listener: Arc<dyn ProgressListener> = match &terminal {
        Some(terminal) => terminal.clone(),
        None => Arc::new(JsonLinesListener),
    };

    if !args.json {
        println!(
            "Uploading {} ({}) to {}",
            args.file.display(),
            size.map_or_else(|| "unknown size".to_string(), format_bytes),
            uploader.config().url
        );
    }
    let start = Instant::now();

    match uploader.upload(body, listener).await {
        Ok(response) => {
            let elapsed = start.elapsed();
            log::debug!("Server response body: {}", response.body);
            if !args.json {
                println!(
                    "Upload completed with status {} in {:.2}s",
                    response.status,
                    elapsed.as_secs_f64()
                );
            }
        }
        Err(e) => {
            if let Some(terminal) = &terminal {
                terminal.fail(&e.to_string());
            }
            fail(format!("Upload failed: {}", e));
        }
    }
}
