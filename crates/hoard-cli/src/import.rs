//! Directory producer: feeds every regular file under a root into a store.

use std::fs::{self, File};
use std::path::Path;

use anyhow::Context;
use hoard_store::{ContentStore, DependencyGraph, Source};
use hoard_types::ContentId;
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// One stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Imported<I> {
    pub id: I,
    /// Path relative to the import root, `/`-separated.
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct ImportSummary<I> {
    pub imported: Vec<Imported<I>>,
    /// Entries that could not be read.
    pub skipped: usize,
    /// Source files deleted after being stored.
    pub removed_sources: usize,
}

/// How [`import_dir`] treats each file.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions<'a, I> {
    /// Register every stored file as a dependent of this object.
    pub parent: Option<&'a I>,
    /// Delete each source file once its content is stored.
    pub remove_source: bool,
}

impl<I> Default for ImportOptions<'_, I> {
    fn default() -> Self {
        Self {
            parent: None,
            remove_source: false,
        }
    }
}

/// Store every regular file below `root`, in file-name order.
///
/// With a `parent`, each file is registered as its dependent. With
/// `remove_source`, a file is deleted only after it was stored (and linked);
/// files that fail to store are left in place. Unreadable entries are logged
/// and skipped; a missing root is an error.
pub fn import_dir<G, I>(
    store: &ContentStore<G, I>,
    root: &Path,
    options: &ImportOptions<'_, I>,
) -> anyhow::Result<ImportSummary<I>>
where
    G: DependencyGraph<I>,
    I: ContentId,
{
    anyhow::ensure!(root.is_dir(), "{} is not a directory", root.display());

    let mut summary = ImportSummary {
        imported: Vec::new(),
        skipped: 0,
        removed_sources: 0,
    };
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                summary.skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let label = label_for(root, entry.path());
        match store_entry(store, entry.path(), options.parent) {
            Ok(id) => {
                debug!(id = %id, label = %label, "imported");
                if options.remove_source {
                    match fs::remove_file(entry.path()) {
                        Ok(()) => summary.removed_sources += 1,
                        Err(e) => warn!(label = %label, error = %e, "failed to delete source file"),
                    }
                }
                summary.imported.push(Imported { id, label });
            }
            Err(e) => {
                warn!(label = %label, error = %e, "skipping file");
                summary.skipped += 1;
            }
        }
    }
    Ok(summary)
}

fn store_entry<G, I>(store: &ContentStore<G, I>, path: &Path, parent: Option<&I>) -> anyhow::Result<I>
where
    G: DependencyGraph<I>,
    I: ContentId,
{
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let source = Source::seekable(&mut file);
    let id = match parent {
        Some(parent) => store.store_as_dependent(parent, source)?,
        None => store.store(source)?,
    };
    Ok(id)
}

fn label_for(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
