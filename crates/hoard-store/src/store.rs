use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use hoard_types::{ContentId, Md5Id};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::graph::DependencyGraph;
use crate::index::FsDependencyGraph;
use crate::memory::InMemoryDependencyGraph;
use crate::removal::{RemovalOutcome, RemovalReport};
use crate::source::{ReadSeek, Source};

/// Object count and size of a store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub objects: usize,
    pub total_bytes: u64,
}

/// Sharded, deduplicating content-addressable store.
///
/// Objects live at `base/<shard>/<leaf>` where shard and leaf are the first
/// two and the remaining hex characters of the identifier. The file holds
/// the raw bytes, nothing else; the name is the only binding between
/// identifier and content.
///
/// The dependency graph `G` decides how depends-on edges are recorded;
/// removal of a parent removes its registered dependents first.
pub struct ContentStore<G, I = Md5Id> {
    config: StoreConfig,
    graph: G,
    _id: PhantomData<fn() -> I>,
}

impl<I: ContentId> ContentStore<FsDependencyGraph<I>, I> {
    /// Open a store whose edges persist in the on-disk index.
    pub fn open_with_fs_index(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let graph = FsDependencyGraph::for_config(&config)?;
        Self::new(config, graph)
    }
}

impl<I: ContentId> ContentStore<InMemoryDependencyGraph<I>, I> {
    /// Open a store whose edges live only for the lifetime of the process.
    pub fn open_with_memory_index(config: StoreConfig) -> StoreResult<Self> {
        Self::new(config, InMemoryDependencyGraph::new())
    }
}

impl<G: DependencyGraph<I>, I: ContentId> ContentStore<G, I> {
    /// Open (or create) a store rooted at `config.base_path`.
    pub fn new(config: StoreConfig, graph: G) -> StoreResult<Self> {
        config.validate()?;
        fs::create_dir_all(&config.base_path)?;
        info!(
            base = %config.base_path.display(),
            algorithm = I::ALGORITHM,
            "content store opened"
        );
        Ok(Self {
            config,
            graph,
            _id: PhantomData,
        })
    }

    /// The store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Root directory of the object shards.
    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    /// The dependency graph.
    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Where the object for `id` lives. Pure; performs no I/O.
    pub fn path_for(&self, id: &I) -> PathBuf {
        self.config.base_path.join(id.shard()).join(id.leaf())
    }

    // ---------------------------------------------------------------
    // Store
    // ---------------------------------------------------------------

    /// Persist content and return its identifier.
    ///
    /// Nothing is written if an object already exists for the identifier;
    /// the call still succeeds and returns the same identifier.
    pub fn store(&self, source: Source<'_>) -> StoreResult<I> {
        match source {
            Source::Seekable(reader) => self.store_seekable(reader),
            Source::Stream(reader) => {
                let mut spool = tempfile::spooled_tempfile(self.config.spool_threshold);
                let buffered = io::copy(reader, &mut spool)?;
                debug!(
                    bytes = buffered,
                    spilled = spool.is_rolled(),
                    "buffered single-pass source"
                );
                spool.seek(SeekFrom::Start(0))?;
                self.store_seekable(&mut spool)
            }
        }
    }

    fn store_seekable(&self, reader: &mut dyn ReadSeek) -> StoreResult<I> {
        let start = reader.stream_position()?;
        let id = I::compute(reader)?;
        reader.seek(SeekFrom::Start(start))?;
        self.persist(&id, reader)?;
        Ok(id)
    }

    /// Write `reader` under `id` unless an object is already there.
    ///
    /// Content goes to a temporary file in the shard directory first and is
    /// then linked into place without clobbering, so a concurrent reader
    /// never sees a partial object. Losing a race to another writer of the
    /// same identifier counts as success.
    fn persist<R: Read + ?Sized>(&self, id: &I, reader: &mut R) -> StoreResult<bool> {
        let path = self.path_for(id);
        if path.exists() {
            debug!(id = %id, "object already present");
            return Ok(false);
        }

        let shard_dir = self.config.base_path.join(id.shard());
        fs::create_dir_all(&shard_dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".tmp-")
            .tempfile_in(&shard_dir)?;
        let written = io::copy(reader, tmp.as_file_mut())?;
        if self.config.sync {
            tmp.as_file().sync_all()?;
        }

        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                debug!(id = %id, bytes = written, "object written");
                Ok(true)
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!(id = %id, "object written concurrently");
                Ok(false)
            }
            Err(e) => Err(StoreError::Io(e.error)),
        }
    }

    /// Persist an in-memory byte sequence.
    pub fn store_bytes(&self, data: &[u8]) -> StoreResult<I> {
        let mut cursor = Cursor::new(data);
        self.store(Source::seekable(&mut cursor))
    }

    /// Persist the contents of a file.
    pub fn store_file(&self, path: &Path) -> StoreResult<I> {
        let mut file = File::open(path)?;
        self.store(Source::seekable(&mut file))
    }

    /// Persist content and register it as a dependent of `parent`.
    ///
    /// The edge is recorded only after the content is safely stored.
    pub fn store_as_dependent(&self, parent: &I, source: Source<'_>) -> StoreResult<I> {
        let child = self.store(source)?;
        self.graph.set_dependency(parent, &child)?;
        debug!(parent = %parent, child = %child, "dependency registered");
        Ok(child)
    }

    /// [`store_as_dependent`](Self::store_as_dependent) for in-memory bytes.
    pub fn store_bytes_as_dependent(&self, parent: &I, data: &[u8]) -> StoreResult<I> {
        let mut cursor = Cursor::new(data);
        self.store_as_dependent(parent, Source::seekable(&mut cursor))
    }

    // ---------------------------------------------------------------
    // Read
    // ---------------------------------------------------------------

    /// Returns `true` if an object is persisted under `id`.
    pub fn exists(&self, id: &I) -> bool {
        self.path_for(id).is_file()
    }

    /// Open the object for reading, positioned at its first byte.
    pub fn open(&self, id: &I) -> StoreResult<File> {
        match File::open(self.path_for(id)) {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(id.to_hex())),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the whole object into memory.
    pub fn read(&self, id: &I) -> StoreResult<Vec<u8>> {
        let mut data = Vec::new();
        self.open(id)?.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Re-hash the stored bytes and compare them with `id`.
    pub fn verify(&self, id: &I) -> StoreResult<bool> {
        let mut file = self.open(id)?;
        Ok(I::compute(&mut file)? == *id)
    }

    /// Dependents registered directly under `parent`.
    pub fn dependencies(&self, parent: &I) -> StoreResult<Vec<I>> {
        self.graph.get_dependencies(parent)
    }

    /// Every identifier with a persisted object, sorted.
    ///
    /// Entries that are not objects (temporary files, the dependency index)
    /// are skipped.
    pub fn iter_ids(&self) -> StoreResult<Vec<I>> {
        let mut ids = Vec::new();
        for shard in fs::read_dir(&self.config.base_path)? {
            let shard = shard?;
            let shard_name = shard.file_name();
            let Some(shard_name) = shard_name.to_str() else {
                continue;
            };
            if shard_name.len() != 2 || !shard.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(shard.path())? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let leaf = entry.file_name();
                let Some(leaf) = leaf.to_str() else {
                    continue;
                };
                if let Ok(id) = I::from_hex(&format!("{shard_name}{leaf}")) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Object count and total stored bytes.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        let mut stats = StoreStats::default();
        for id in self.iter_ids()? {
            match fs::metadata(self.path_for(&id)) {
                Ok(meta) => {
                    stats.objects += 1;
                    stats.total_bytes += meta.len();
                }
                // Removed between listing and stat.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(stats)
    }

    // ---------------------------------------------------------------
    // Remove
    // ---------------------------------------------------------------

    /// Remove `id` after removing its direct dependents.
    ///
    /// Returns `true` iff the target object itself was removed. Dependents
    /// that are missing or cannot be deleted do not stop the cascade.
    pub fn remove(&self, id: &I) -> bool {
        self.remove_report(id).target_removed()
    }

    /// [`remove`](Self::remove) with per-object outcomes.
    ///
    /// Only one level of dependents is removed: whatever the graph returns
    /// for `id`. Graphs that want deeper cascades either return the full
    /// transitive set or callers use [`remove_transitive`](Self::remove_transitive).
    pub fn remove_report(&self, id: &I) -> RemovalReport<I> {
        let mut report = RemovalReport::new(*id);
        let mut seen = HashSet::new();
        for dependent in self.dependencies_or_empty(id) {
            if dependent == *id || !seen.insert(dependent) {
                continue;
            }
            let outcome = self.remove_single(&dependent);
            self.forget_edges(&dependent, &outcome);
            report.dependents.push((dependent, outcome));
        }
        report.target_outcome = self.remove_single(id);
        self.forget_edges(id, &report.target_outcome);
        report
    }

    /// Remove `id` and everything reachable from it through the graph.
    ///
    /// Dependents are removed before their parents, also when one dependent
    /// depends on another. Each identifier is expanded at most once, so
    /// cycles terminate; on a cycle the back edge is ignored.
    pub fn remove_transitive(&self, id: &I) -> RemovalReport<I> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![(*id, false)];
        while let Some((node, finished)) = stack.pop() {
            if finished {
                if node != *id {
                    order.push(node);
                }
                continue;
            }
            // Marked on expansion, not on push: a node queued under one
            // parent may be reached again below a sibling first.
            if !visited.insert(node) {
                continue;
            }
            stack.push((node, true));
            for child in self.dependencies_or_empty(&node) {
                if !visited.contains(&child) {
                    stack.push((child, false));
                }
            }
        }

        let mut report = RemovalReport::new(*id);
        for dependent in order {
            let outcome = self.remove_single(&dependent);
            self.forget_edges(&dependent, &outcome);
            report.dependents.push((dependent, outcome));
        }
        report.target_outcome = self.remove_single(id);
        self.forget_edges(id, &report.target_outcome);
        debug!(
            id = %id,
            removed = report.removed_count(),
            visited = visited.len(),
            "transitive removal finished"
        );
        report
    }

    fn dependencies_or_empty(&self, parent: &I) -> Vec<I> {
        match self.graph.get_dependencies(parent) {
            Ok(dependents) => dependents,
            Err(e) => {
                warn!(id = %parent, error = %e, "cannot list dependents; removing target only");
                Vec::new()
            }
        }
    }

    fn remove_single(&self, id: &I) -> RemovalOutcome {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => {
                debug!(id = %id, "object removed");
                RemovalOutcome::Removed
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => RemovalOutcome::Missing,
            Err(e) => {
                warn!(id = %id, error = %e, "failed to remove object");
                RemovalOutcome::Failed(e.to_string())
            }
        }
    }

    fn forget_edges(&self, id: &I, outcome: &RemovalOutcome) {
        if outcome.is_failed() {
            return;
        }
        if let Err(e) = self.graph.clear_dependencies(id) {
            warn!(id = %id, error = %e, "failed to clear dependency edges");
        }
    }
}

impl<G, I> std::fmt::Debug for ContentStore<G, I>
where
    G: std::fmt::Debug,
    I: ContentId,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("base_path", &self.config.base_path)
            .field("algorithm", &I::ALGORITHM)
            .field("graph", &self.graph)
            .finish()
    }
}
