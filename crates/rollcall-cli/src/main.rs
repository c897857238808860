mod enroll;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollcall_store::SessionContext;

#[zbus::proxy(
    interface = "org.rollcall.Engine1",
    default_service = "org.rollcall.Engine1",
    default_path = "/org/rollcall/Engine1"
)]
trait Engine {
    fn start(&self) -> zbus::Result<bool>;
    fn stop(&self) -> zbus::Result<bool>;
    fn status(&self) -> zbus::Result<String>;
    fn latest_frame(&self) -> zbus::Result<(Vec<u8>, u64)>;
    fn ledger_snapshot(&self, date: &str, lecture: &str) -> zbus::Result<String>;
}

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall attendance engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an attendance session
    Start,
    /// Stop the running session
    Stop,
    /// Show daemon status
    Status,
    /// Print present/absent lists for a session
    Snapshot {
        /// Lecture name
        lecture: String,
        /// Session date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Save the latest published frame as JPEG
    Frame {
        /// Output file
        #[arg(short, long, default_value = "frame.jpg")]
        output: PathBuf,
    },
    /// Set the session context used by the next Start
    Context {
        /// Lecture name
        lecture: String,
        /// Name of the person taking attendance
        #[arg(short, long, default_value = "")]
        name: String,
        /// Directory holding the daemon's data files
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,
    },
    /// Build the encoding store from a directory of reference photos
    Enroll {
        /// Directory of images; each file stem is an identity id
        images_dir: PathBuf,
        /// Directory containing the ONNX model files
        #[arg(long, default_value = "models")]
        model_dir: PathBuf,
        /// Output encoding store
        #[arg(short, long, default_value = "encodings.bin")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start => {
            let proxy = connect().await?;
            if proxy.start().await? {
                println!("session started");
            } else {
                println!("a session is already running");
            }
        }
        Commands::Stop => {
            let proxy = connect().await?;
            if proxy.stop().await? {
                println!("stop requested");
            } else {
                println!("no session running");
            }
        }
        Commands::Status => {
            let proxy = connect().await?;
            let status = proxy.status().await?;
            println!("{}", pretty(&status)?);
        }
        Commands::Snapshot { lecture, date } => {
            let proxy = connect().await?;
            let date =
                date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
            let entry = proxy.ledger_snapshot(&date, &lecture).await?;
            println!("{}", pretty(&entry)?);
        }
        Commands::Frame { output } => {
            let proxy = connect().await?;
            let (jpeg, version) = proxy.latest_frame().await?;
            if version == 0 {
                println!("no frame published yet");
            } else {
                std::fs::write(&output, &jpeg)
                    .with_context(|| format!("cannot write {}", output.display()))?;
                println!("wrote {} ({} bytes, version {version})", output.display(), jpeg.len());
            }
        }
        Commands::Context {
            lecture,
            name,
            data_dir,
        } => {
            let context = SessionContext { name, lecture };
            let path = data_dir.join("session_context.json");
            context.save(&path)?;
            println!("wrote {}", path.display());
        }
        Commands::Enroll {
            images_dir,
            model_dir,
            output,
        } => {
            let detector = model_dir.join("version-RFB-320.onnx");
            let embedder = model_dir.join("mobilefacenet.onnx");
            enroll::run(
                &images_dir,
                &detector.to_string_lossy(),
                &embedder.to_string_lossy(),
                &output,
            )?;
        }
    }

    Ok(())
}

async fn connect() -> Result<EngineProxy<'static>> {
    let conn = zbus::Connection::session()
        .await
        .context("cannot connect to the session bus")?;
    EngineProxy::new(&conn)
        .await
        .context("is rollcalld running?")
}

fn pretty(json: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    Ok(serde_json::to_string_pretty(&value)?)
}
