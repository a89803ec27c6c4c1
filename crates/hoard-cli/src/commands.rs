use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use hoard_store::{FsContentStore, RemovalOutcome, Source, StoreConfig};
use hoard_types::{Blake3Id, ContentId, Md5Id};
use serde::Serialize;
use serde_json::json;

use crate::cli::*;
use crate::import;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli.config.as_deref(), cli.root)?;
    match cli.algorithm {
        Algorithm::Md5 => run::<Md5Id>(cli.command, config, cli.format),
        Algorithm::Blake3 => run::<Blake3Id>(cli.command, config, cli.format),
    }
}

/// Defaults, then the config file, then `--root`.
pub fn resolve_config(
    file: Option<&Path>,
    root: Option<std::path::PathBuf>,
) -> anyhow::Result<StoreConfig> {
    let mut config = match file {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(root) = root {
        config.base_path = root;
    }
    Ok(config)
}

fn run<I: ContentId>(command: Command, config: StoreConfig, format: OutputFormat) -> anyhow::Result<()> {
    let store = FsContentStore::<I>::open_with_fs_index(config)
        .context("opening content store")?;
    match command {
        Command::Store(args) => cmd_store(&store, None, &args.input, format),
        Command::Link(args) => {
            let parent = parse_id::<I>(&args.parent)?;
            cmd_store(&store, Some(&parent), &args.input, format)
        }
        Command::Cat(args) => cmd_cat(&store, &parse_id(&args.id)?),
        Command::Exists(args) => cmd_exists(&store, &parse_id(&args.id)?, format),
        Command::Path(args) => cmd_path(&store, &parse_id(&args.id)?, format),
        Command::Deps(args) => cmd_deps(&store, &parse_id(&args.id)?, format),
        Command::Rm(args) => cmd_rm(&store, &parse_id(&args.id)?, args.recursive, format),
        Command::Verify(args) => cmd_verify(&store, args.id.as_deref(), format),
        Command::Stats => cmd_stats(&store, format),
        Command::Import(args) => cmd_import(&store, &args, format),
    }
}

fn parse_id<I: ContentId>(s: &str) -> anyhow::Result<I> {
    I::from_hex(s.trim()).with_context(|| format!("invalid {} identifier {s:?}", I::ALGORITHM))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_store<I: ContentId>(
    store: &FsContentStore<I>,
    parent: Option<&I>,
    input: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut stdin;
    let mut file;
    let source = if input == Path::new("-") {
        stdin = io::stdin().lock();
        Source::stream(&mut stdin)
    } else {
        file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
        Source::seekable(&mut file)
    };
    let id = match parent {
        Some(parent) => store.store_as_dependent(parent, source)?,
        None => store.store(source)?,
    };

    match format {
        OutputFormat::Json => print_json(&json!({
            "id": id,
            "parent": parent,
            "path": store.path_for(&id),
        })),
        OutputFormat::Text => {
            match parent {
                Some(parent) => println!(
                    "{} {} {} {}",
                    "✓".green().bold(),
                    id.to_hex().yellow(),
                    "→".dimmed(),
                    parent.to_hex().dimmed()
                ),
                None => println!("{} {}", "✓".green().bold(), id.to_hex().yellow()),
            }
            Ok(())
        }
    }
}

fn cmd_cat<I: ContentId>(store: &FsContentStore<I>, id: &I) -> anyhow::Result<()> {
    let mut object = store.open(id)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    io::copy(&mut object, &mut out)?;
    out.flush()?;
    Ok(())
}

fn cmd_exists<I: ContentId>(store: &FsContentStore<I>, id: &I, format: OutputFormat) -> anyhow::Result<()> {
    let exists = store.exists(id);
    match format {
        OutputFormat::Json => print_json(&json!({ "id": id, "exists": exists })),
        OutputFormat::Text => {
            if exists {
                println!("{} {}", "present".green(), id.to_hex());
            } else {
                println!("{} {}", "absent".red(), id.to_hex());
            }
            Ok(())
        }
    }
}

fn cmd_path<I: ContentId>(store: &FsContentStore<I>, id: &I, format: OutputFormat) -> anyhow::Result<()> {
    let path = store.path_for(id);
    match format {
        OutputFormat::Json => print_json(&json!({ "id": id, "path": path })),
        OutputFormat::Text => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn cmd_deps<I: ContentId>(store: &FsContentStore<I>, id: &I, format: OutputFormat) -> anyhow::Result<()> {
    let deps = store.dependencies(id)?;
    match format {
        OutputFormat::Json => print_json(&json!({ "id": id, "dependencies": deps })),
        OutputFormat::Text => {
            if deps.is_empty() {
                println!("No dependents registered under {}.", id.to_hex().yellow());
            }
            for dep in &deps {
                let marker = if store.exists(dep) { "•".green() } else { "✗".red() };
                println!("  {} {}", marker, dep.to_hex());
            }
            Ok(())
        }
    }
}

fn cmd_rm<I: ContentId>(
    store: &FsContentStore<I>,
    id: &I,
    recursive: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let report = if recursive {
        store.remove_transitive(id)
    } else {
        store.remove_report(id)
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            for (dep, outcome) in &report.dependents {
                println!("  {} {}", outcome_marker(outcome), dep.to_hex());
            }
            println!("{} {}", outcome_marker(&report.target_outcome), id.to_hex().bold());
            println!("{} object(s) removed", report.removed_count());
        }
    }

    if let RemovalOutcome::Failed(reason) = &report.target_outcome {
        anyhow::bail!("could not remove {}: {reason}", id.to_hex());
    }
    Ok(())
}

fn outcome_marker(outcome: &RemovalOutcome) -> colored::ColoredString {
    match outcome {
        RemovalOutcome::Removed => "removed".green(),
        RemovalOutcome::Missing => "missing".yellow(),
        RemovalOutcome::Failed(_) => "failed ".red().bold(),
    }
}

#[derive(Serialize)]
struct VerifyLine<I> {
    id: I,
    ok: bool,
}

fn cmd_verify<I: ContentId>(
    store: &FsContentStore<I>,
    id: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let ids = match id {
        Some(s) => vec![parse_id::<I>(s)?],
        None => store.iter_ids()?,
    };

    let mut results = Vec::with_capacity(ids.len());
    for id in ids {
        let ok = store.verify(&id)?;
        results.push(VerifyLine { id, ok });
    }
    let corrupt = results.iter().filter(|r| !r.ok).count();

    match format {
        OutputFormat::Json => print_json(&results)?,
        OutputFormat::Text => {
            for line in results.iter().filter(|r| !r.ok) {
                println!("  {} {}", "corrupt".red().bold(), line.id.to_hex());
            }
            if corrupt == 0 {
                println!("{} {} object(s) verified", "✓".green().bold(), results.len());
            }
        }
    }

    if corrupt > 0 {
        anyhow::bail!("{corrupt} of {} object(s) failed verification", results.len());
    }
    Ok(())
}

fn cmd_stats<I: ContentId>(store: &FsContentStore<I>, format: OutputFormat) -> anyhow::Result<()> {
    let stats = store.stats()?;
    match format {
        OutputFormat::Json => print_json(&json!({
            "base_path": store.base_path(),
            "algorithm": I::ALGORITHM,
            "objects": stats.objects,
            "total_bytes": stats.total_bytes,
        })),
        OutputFormat::Text => {
            println!("Store: {} ({})", store.base_path().display().to_string().bold(), I::ALGORITHM.cyan());
            println!("  Objects: {}", stats.objects.to_string().bold());
            println!("  Bytes:   {}", stats.total_bytes.to_string().bold());
            Ok(())
        }
    }
}

fn cmd_import<I: ContentId>(
    store: &FsContentStore<I>,
    args: &ImportArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let parent = args.parent.as_deref().map(parse_id::<I>).transpose()?;
    let options = import::ImportOptions {
        parent: parent.as_ref(),
        remove_source: args.remove_source,
    };
    let summary = import::import_dir(store, &args.dir, &options)?;

    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Text => {
            for entry in &summary.imported {
                println!("{}  {}", entry.id.to_hex().yellow(), entry.label);
            }
            println!(
                "{} {} file(s) imported",
                "✓".green().bold(),
                summary.imported.len()
            );
            if summary.removed_sources > 0 {
                println!("  {} source file(s) deleted", summary.removed_sources);
            }
            if summary.skipped > 0 {
                println!("{} {} entries skipped", "!".yellow().bold(), summary.skipped);
            }
            Ok(())
        }
    }
}
