//! On-disk dependency index.
//!
//! Each parent with at least one dependent owns a small JSON record at
//! `<root>/<shard>/<leaf>.json`, sharded exactly like the objects
//! themselves:
//!
//! ```text
//! { "parent": "5D41402ABC4B2A76B9719D911017C592",
//!   "children": ["7D793037A0760186574B0282F2F435E7"] }
//! ```
//!
//! Records are rewritten through a temporary file and an atomic rename, so a
//! reader never sees a half-written record.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use hoard_types::ContentId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::graph::DependencyGraph;

#[derive(Serialize, Deserialize)]
#[serde(bound = "I: ContentId")]
struct EdgeRecord<I> {
    parent: I,
    children: BTreeSet<I>,
}

/// Dependency graph persisted as a side index next to the objects.
pub struct FsDependencyGraph<I: ContentId> {
    root: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
    _id: PhantomData<fn() -> I>,
}

impl<I: ContentId> FsDependencyGraph<I> {
    /// Open (or create) an index rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
            _id: PhantomData,
        })
    }

    /// Open the index directory named by a store configuration.
    pub fn for_config(config: &StoreConfig) -> StoreResult<Self> {
        Self::open(config.index_path())
    }

    /// Root directory of the index.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the record for `parent`.
    pub fn record_path(&self, parent: &I) -> PathBuf {
        self.root
            .join(parent.shard())
            .join(format!("{}.json", parent.leaf()))
    }

    fn load(&self, parent: &I) -> StoreResult<BTreeSet<I>> {
        let path = self.record_path(parent);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(e.into()),
        };
        let record: EdgeRecord<I> =
            serde_json::from_slice(&data).map_err(|e| StoreError::Index {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        if record.parent != *parent {
            return Err(StoreError::Index {
                path: path.display().to_string(),
                reason: format!("record belongs to {}", record.parent),
            });
        }
        Ok(record.children)
    }

    fn save(&self, parent: &I, children: BTreeSet<I>) -> StoreResult<()> {
        let path = self.record_path(parent);
        if children.is_empty() {
            return match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }

        let shard_dir = self.root.join(parent.shard());
        fs::create_dir_all(&shard_dir)?;

        let record = EdgeRecord {
            parent: *parent,
            children,
        };
        let data = serde_json::to_vec_pretty(&record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".tmp-")
            .tempfile_in(&shard_dir)?;
        tmp.write_all(&data)?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        debug!(parent = %parent, edges = record.children.len(), "dependency record written");
        Ok(())
    }

    fn modify<T>(
        &self,
        parent: &I,
        f: impl FnOnce(&mut BTreeSet<I>) -> T,
    ) -> StoreResult<T> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut children = self.load(parent)?;
        let before = children.clone();
        let out = f(&mut children);
        if children != before {
            self.save(parent, children)?;
        }
        Ok(out)
    }
}

impl<I: ContentId> DependencyGraph<I> for FsDependencyGraph<I> {
    fn get_dependencies(&self, parent: &I) -> StoreResult<Vec<I>> {
        Ok(self.load(parent)?.into_iter().collect())
    }

    fn set_dependency(&self, parent: &I, child: &I) -> StoreResult<()> {
        self.modify(parent, |children| {
            children.insert(*child);
        })
    }

    fn remove_dependency(&self, parent: &I, child: &I) -> StoreResult<bool> {
        self.modify(parent, |children| children.remove(child))
    }

    fn clear_dependencies(&self, parent: &I) -> StoreResult<()> {
        self.modify(parent, |children| children.clear())
    }

    fn set_dependencies(&self, parent: &I, children: &[I]) -> StoreResult<()> {
        self.modify(parent, |existing| existing.extend(children.iter().copied()))
    }
}

impl<I: ContentId> std::fmt::Debug for FsDependencyGraph<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsDependencyGraph")
            .field("root", &self.root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoard_types::{Blake3Id, Md5Id};

    fn id(data: &[u8]) -> Md5Id {
        Md5Id::digest(data)
    }

    #[test]
    fn missing_record_means_no_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let graph = FsDependencyGraph::<Md5Id>::open(dir.path()).unwrap();
        assert!(graph.get_dependencies(&id(b"p")).unwrap().is_empty());
    }

    #[test]
    fn record_is_sharded_json() {
        let dir = tempfile::tempdir().unwrap();
        let graph = FsDependencyGraph::open(dir.path()).unwrap();
        let (parent, child) = (id(b"hello"), id(b"world"));
        graph.set_dependency(&parent, &child).unwrap();

        let path = graph.record_path(&parent);
        assert_eq!(path, dir.path().join("5D").join("41402ABC4B2A76B9719D911017C592.json"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(&parent.to_hex()));
        assert!(text.contains(&child.to_hex()));
    }

    #[test]
    fn edges_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let parent = id(b"p");
        {
            let graph = FsDependencyGraph::open(dir.path()).unwrap();
            graph.set_dependencies(&parent, &[id(b"a"), id(b"b")]).unwrap();
        }
        let graph = FsDependencyGraph::<Md5Id>::open(dir.path()).unwrap();
        assert_eq!(graph.get_dependencies(&parent).unwrap().len(), 2);
    }

    #[test]
    fn set_dependency_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let graph = FsDependencyGraph::open(dir.path()).unwrap();
        let (parent, child) = (id(b"p"), id(b"c"));
        graph.set_dependency(&parent, &child).unwrap();
        graph.set_dependency(&parent, &child).unwrap();
        assert_eq!(graph.get_dependencies(&parent).unwrap(), vec![child]);
    }

    #[test]
    fn clearing_last_edge_removes_record() {
        let dir = tempfile::tempdir().unwrap();
        let graph = FsDependencyGraph::open(dir.path()).unwrap();
        let (parent, child) = (id(b"p"), id(b"c"));
        graph.set_dependency(&parent, &child).unwrap();
        assert!(graph.remove_dependency(&parent, &child).unwrap());
        assert!(!graph.record_path(&parent).exists());

        graph.set_dependency(&parent, &child).unwrap();
        graph.clear_dependencies(&parent).unwrap();
        assert!(!graph.record_path(&parent).exists());
        // Clearing an absent record is fine.
        graph.clear_dependencies(&parent).unwrap();
    }

    #[test]
    fn corrupt_record_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let graph = FsDependencyGraph::<Md5Id>::open(dir.path()).unwrap();
        let parent = id(b"p");
        let path = graph.record_path(&parent);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{ not json").unwrap();
        let err = graph.get_dependencies(&parent).unwrap_err();
        assert!(matches!(err, StoreError::Index { .. }));
    }

    #[test]
    fn misplaced_record_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let graph = FsDependencyGraph::open(dir.path()).unwrap();
        let (a, b) = (id(b"a"), id(b"b"));
        graph.set_dependency(&a, &id(b"child")).unwrap();
        let dest = graph.record_path(&b);
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::copy(graph.record_path(&a), &dest).unwrap();
        assert!(matches!(
            graph.get_dependencies(&b),
            Err(StoreError::Index { .. })
        ));
    }

    #[test]
    fn works_with_blake3_ids() {
        let dir = tempfile::tempdir().unwrap();
        let graph = FsDependencyGraph::open(dir.path()).unwrap();
        let (parent, child) = (Blake3Id::digest(b"p"), Blake3Id::digest(b"c"));
        graph.set_dependency(&parent, &child).unwrap();
        assert_eq!(graph.get_dependencies(&parent).unwrap(), vec![child]);
    }
}
