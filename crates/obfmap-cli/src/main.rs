//! CLI entry point for the obfmap store (for dev and testing).

use anyhow::{bail, Context};
use clap::Parser;
use indexmap::IndexMap;
use obfmap_core::{with_instance, ConfigStore, Environment, SystemEnvironment};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "obfmap")]
#[command(about = "obfmap: preferences and recent mapping files")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show where obfmap stores its configs document.
    Path,
    /// Print the current settings as JSON.
    Show,
    /// List recent files, most recently used first.
    Recents,
    /// Mark a file as just opened.
    Touch {
        #[arg(value_name = "FILE")]
        file: String,
    },
    /// Read a property of a recent file, or set it when VALUE is given.
    Prop {
        file: String,
        key: String,
        value: Option<String>,
    },
    /// Append a value to a named list of a recent file (e.g. `Pdb`).
    Add { file: String, key: String, value: String },
    /// Remove the first matching value from a named list of a recent file.
    Remove { file: String, key: String, value: String },
    /// Set a preference by its stored name, e.g. `set ShowUnicode True`.
    Set { name: String, value: String },
    /// Drop recent files that no longer exist.
    Prune,
}

#[derive(Serialize)]
struct RecentView<'a> {
    filename: &'a str,
    properties: &'a IndexMap<String, String>,
    additional: &'a IndexMap<String, Vec<String>>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Recents) {
        Commands::Path => with_instance(|store| -> anyhow::Result<()> {
            println!("{}", store_path(store)?.display());
            Ok(())
        })?,
        Commands::Show => {
            let json = with_instance(|store| serde_json::to_string_pretty(store.settings()))?;
            println!("{json}");
        }
        Commands::Recents => with_instance(|store| -> anyhow::Result<()> {
            let recents = store.recents();
            if recents.is_empty() {
                println!("No recent files.");
                return Ok(());
            }
            let views: Vec<_> = recents
                .entries()
                .iter()
                .map(|e| RecentView {
                    filename: e.filename(),
                    properties: e.properties(),
                    additional: e.additional_lists(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&views)?);
            Ok(())
        })?,
        Commands::Touch { file } => mutate(|store| {
            store.recents_mut().touch(&file);
            Ok(())
        })?,
        Commands::Prop { file, key, value } => match value {
            Some(value) => mutate(|store| {
                require_recent(store, &file)?;
                store.recents_mut().set_property(&file, &key, &value);
                Ok(())
            })?,
            None => with_instance(|store| match store.recents().property(&file, &key) {
                Some(v) => println!("{v}"),
                None => eprintln!("No property {key:?} for {file}."),
            }),
        },
        Commands::Add { file, key, value } => mutate(|store| {
            require_recent(store, &file)?;
            store.recents_mut().add_additional(&file, &key, &value);
            Ok(())
        })?,
        Commands::Remove { file, key, value } => mutate(|store| {
            require_recent(store, &file)?;
            store.recents_mut().remove_additional(&file, &key, &value);
            Ok(())
        })?,
        Commands::Set { name, value } => mutate(|store| {
            store
                .settings_mut()
                .set_named(&name, &value)
                .with_context(|| format!("cannot set {name}"))
        })?,
        Commands::Prune => mutate(|store| {
            let dropped = store.recents_mut().prune_missing(|p| SystemEnvironment.exists(p));
            println!("Dropped {dropped} recent file(s).");
            Ok(())
        })?,
    }
    Ok(())
}

/// Applies `f` to the process-wide store and saves it.
fn mutate(f: impl FnOnce(&mut ConfigStore) -> anyhow::Result<()>) -> anyhow::Result<()> {
    with_instance(|store| {
        f(store)?;
        store.save_to_file().context("preferences could not be saved")
    })
}

fn store_path(store: &ConfigStore) -> anyhow::Result<&std::path::Path> {
    store.path().context("could not determine config directory")
}

fn require_recent(store: &ConfigStore, file: &str) -> anyhow::Result<()> {
    if store.recents().get(file).is_none() {
        bail!("{file} is not a recent file; `touch` it first");
    }
    Ok(())
}
