//! Application entry point — convert-easy.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse the command line.
//! 3. Resolve [`AppPaths`] and open the shared stores ([`SettingsStore`],
//!    [`ArtifactVault`], [`HistoryLedger`]).
//! 4. For `convert`, build the local [`Backends`] from the engine settings
//!    and run one [`ConversionOrchestrator`] session.
//! 5. Otherwise run the requested store operation and exit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use convert_easy::{
    backend::{Backends, FileType},
    cli::{Cli, Commands, ConvertCommand, ExportCommand, HistoryCommand, SettingsCommand},
    config::{AppPaths, SettingsStore},
    convert::{ConversionOrchestrator, SelectedFile},
    storage::{format_file_size, ArtifactVault, HistoryLedger, MAX_HISTORY_ENTRIES},
};

// ---------------------------------------------------------------------------
// Shared stores
// ---------------------------------------------------------------------------

/// The application's durable state, opened once at startup.
struct Stores {
    settings: Arc<SettingsStore>,
    vault: Arc<ArtifactVault>,
    ledger: Arc<HistoryLedger>,
}

impl Stores {
    fn open(paths: &AppPaths) -> Self {
        let settings = Arc::new(SettingsStore::open(&paths.settings_file));
        let vault = Arc::new(ArtifactVault::open(&paths.artifacts_dir));
        let ledger = Arc::new(HistoryLedger::open(
            &paths.history_file,
            Arc::clone(&settings),
            Arc::clone(&vault),
        ));
        Self {
            settings,
            vault,
            ledger,
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn run_convert(stores: &Stores, cmd: ConvertCommand) -> Result<()> {
    let backends = Backends::local(&stores.settings.get().engines);
    let orchestrator = ConversionOrchestrator::new(
        Arc::clone(&stores.settings),
        Arc::clone(&stores.ledger),
        Arc::clone(&stores.vault),
        backends,
    );

    let file = SelectedFile::from_path(&cmd.file)
        .await
        .with_context(|| format!("could not read {}", cmd.file.display()))?;
    orchestrator.select_file(Some(file))?;
    orchestrator.choose_kind(Some(cmd.kind.into()))?;
    let outcome = orchestrator.convert().await?;

    let out_dir = cmd.out.unwrap_or_else(|| default_out_dir(&cmd.file));
    tokio::fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("could not create {}", out_dir.display()))?;
    let target = out_dir.join(&outcome.result.file_name);
    let blob = outcome.result.blob.as_deref().unwrap_or_default();
    tokio::fs::write(&target, blob)
        .await
        .with_context(|| format!("could not write {}", target.display()))?;

    println!(
        "Saved {} ({})",
        target.display(),
        format_file_size(outcome.result.file_size)
    );
    match outcome.history_id {
        Some(id) if stores.vault.exists(&id) => println!("History id: {id}"),
        Some(id) => println!("History id: {id} (result too large to keep for re-download)"),
        None => println!("History saving is off; nothing recorded"),
    }
    Ok(())
}

fn default_out_dir(input: &Path) -> PathBuf {
    input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn run_history(stores: &Stores, cmd: HistoryCommand) -> Result<()> {
    match cmd {
        HistoryCommand::List { file_type } => {
            let entries = match file_type {
                Some(t) => stores.ledger.filter_by_type(FileType::from(t)),
                None => stores.ledger.list(),
            };
            if entries.is_empty() {
                println!("No conversions recorded");
                return Ok(());
            }
            for e in &entries {
                let saved = if stores.vault.exists(&e.id) { "saved" } else { "-" };
                println!(
                    "{}  {}  {:<3}  {} <- {}  {}  {}",
                    e.id,
                    e.created_at.format("%Y-%m-%d %H:%M"),
                    e.file_type.tag(),
                    e.file_name,
                    e.original_file_name,
                    format_file_size(e.file_size),
                    saved
                );
            }
            println!("{} of {MAX_HISTORY_ENTRIES} entries", entries.len());
        }
        HistoryCommand::Remove { id } => {
            if !stores.ledger.remove(&id)? {
                bail!("no history entry {id}");
            }
            println!("Removed {id}");
        }
        HistoryCommand::Clear { artifacts } => {
            stores.ledger.clear()?;
            if artifacts {
                stores.vault.clear();
            }
            println!("History cleared");
        }
    }
    Ok(())
}

fn run_export(stores: &Stores, cmd: ExportCommand) -> Result<()> {
    let Some(blob) = stores.vault.get(&cmd.id) else {
        bail!("no saved result for {}", cmd.id);
    };
    let target = if cmd.path.is_dir() {
        let name = stores
            .ledger
            .get(&cmd.id)
            .map(|e| e.file_name)
            .unwrap_or_else(|| cmd.id.clone());
        cmd.path.join(name)
    } else {
        cmd.path
    };
    std::fs::write(&target, &blob)
        .with_context(|| format!("could not write {}", target.display()))?;
    println!("Exported {} ({})", target.display(), format_file_size(blob.len() as u64));
    Ok(())
}

fn run_settings(stores: &Stores, cmd: SettingsCommand) -> Result<()> {
    match cmd {
        SettingsCommand::Show => {
            let origin = if stores.settings.has_saved() { "" } else { " (defaults, not saved yet)" };
            println!("# {}{origin}", stores.settings.path().display());
            print!("{}", toml::to_string_pretty(&stores.settings.get())?);
        }
        SettingsCommand::Reset => {
            stores.settings.reset()?;
            println!("Settings restored to defaults");
        }
        SettingsCommand::SetHistory { enabled } => {
            let mut settings = stores.settings.get();
            settings.save_history = enabled;
            stores.settings.set(settings)?;
            println!("History saving {}", if enabled { "on" } else { "off" });
        }
    }
    Ok(())
}

fn run_storage(stores: &Stores) {
    println!(
        "{} saved results, {} ({} history entries)",
        stores.vault.ids().len(),
        format_file_size(stores.vault.storage_size()),
        stores.ledger.count()
    );
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Command line
    let cli = Cli::parse();

    // 3. Stores
    let paths = AppPaths::new();
    log::debug!("data in {}", paths.artifacts_dir.display());
    let stores = Stores::open(&paths);

    // 4./5. Dispatch
    match cli.command {
        Commands::Convert(cmd) => run_convert(&stores, cmd).await,
        Commands::History(cmd) => run_history(&stores, cmd),
        Commands::Export(cmd) => run_export(&stores, cmd),
        Commands::Settings(cmd) => run_settings(&stores, cmd),
        Commands::Storage => {
            run_storage(&stores);
            Ok(())
        }
    }
}
