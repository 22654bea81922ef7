use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use clap::{Parser, Subcommand};
use tracing::error;

use rotina::automation::{self, steps::StepScript};
use rotina::config::Config;
use rotina::package::RoutineManifest;
use rotina::store::CredentialStore;
use rotina::voice::{CloudTranscriber, DispatchCommand, VoiceListener, recording};
use rotina::webui;

#[derive(Parser)]
#[command(name = "rotina")]
#[command(about = "Voice-triggered desktop routines with a local web configurator")]
#[command(version)]
struct Cli {
    /// Working directory holding the credential file and routine manifest
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Path to the config file (defaults to rotina.toml in the working directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open every configured site now
    Run,

    /// Listen for the trigger phrase; the routine also runs once at start
    Listen {
        /// Skip the routine run at startup
        #[arg(long)]
        no_startup_run: bool,
    },

    /// Serve the configuration web UI
    Serve,

    /// Locate a template image on screen and click it
    Click {
        /// Template name, resolved as <images-dir>/<name>.png
        name: String,

        /// Folder with template images (defaults to the configured images dir)
        #[arg(long)]
        folder: Option<PathBuf>,
    },

    /// Run a scripted GUI step sequence from a TOML file
    Steps {
        /// Step script file
        script: PathBuf,
    },

    /// Write a default rotina.toml into the working directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let work_dir = cli.path.unwrap_or_else(|| PathBuf::from("."));
    let config = Config::load(cli.config.as_deref(), &work_dir)?;

    match cli.command {
        Commands::Run => run_command(&config, &work_dir),
        Commands::Listen { no_startup_run } => listen_command(&config, &work_dir, no_startup_run),
        Commands::Serve => webui::serve(&config, work_dir),
        Commands::Click { name, folder } => click_command(&config, &work_dir, &name, folder),
        Commands::Steps { script } => steps_command(&config, &work_dir, &script),
        Commands::Init { force } => {
            let path = Config::init(&work_dir, force)?;
            println!("Created {}", path.display());
            Ok(())
        }
    }
}

fn run_command(config: &Config, work_dir: &Path) -> Result<()> {
    let store = CredentialStore::open(&work_dir.join(&config.paths.store_file))?;
    let manifest_path = work_dir.join(&config.paths.manifest_file);
    let manifest = if manifest_path.exists() {
        Some(RoutineManifest::from_file(&manifest_path)?)
    } else {
        None
    };
    automation::run_routine(&store, manifest.as_ref())
}

fn listen_command(config: &Config, work_dir: &Path, no_startup_run: bool) -> Result<()> {
    ensure!(
        recording::recorder_available(),
        "the sox `rec` binary is required for the voice listener"
    );

    let recording_dir = work_dir.join(".rotina");
    std::fs::create_dir_all(&recording_dir)
        .with_context(|| format!("failed to create {}", recording_dir.display()))?;
    let recording_path = recording_dir.join("phrase.wav");
    let phrase_secs = config.listener.phrase_secs;

    let listener = VoiceListener::spawn(
        move || recording::record_phrase(&recording_path, phrase_secs),
        CloudTranscriber::from_config(&config.speech),
        config.listener.trigger.clone(),
        DispatchCommand::self_run(work_dir)?,
    );

    // The startup run and a voice dispatch may overlap; they are not
    // serialized.
    if !no_startup_run
        && let Err(e) = run_command(config, work_dir)
    {
        error!("startup routine failed: {e:#}");
    }

    println!("Listening for \"{}\" (press Enter to stop)", config.listener.trigger);
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);

    listener.stop();
    listener.join();
    Ok(())
}

fn click_command(config: &Config, work_dir: &Path, name: &str, folder: Option<PathBuf>) -> Result<()> {
    let folder = folder.unwrap_or_else(|| work_dir.join(&config.paths.images_dir));
    let mut input = automation::InputDriver::new()?;
    let found = automation::vision::locate_and_click(&mut input, name, &folder)?;
    ensure!(found, "template '{name}' was not found on screen");
    Ok(())
}

fn steps_command(config: &Config, work_dir: &Path, script_path: &Path) -> Result<()> {
    let script = StepScript::from_file(script_path)?;
    automation::steps::run_script(&script, &work_dir.join(&config.paths.images_dir))
}
