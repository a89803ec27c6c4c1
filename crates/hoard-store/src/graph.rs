use std::sync::Arc;

use hoard_types::ContentId;

use crate::error::StoreResult;

/// Directed depends-on edges between stored objects.
///
/// A parent identifier may declare any number of dependents ("this
/// composite object is made of these parts"). The store only ever asks for
/// one level of neighbours at a time, so implementations never need the
/// whole graph in memory.
///
/// Contract:
/// - `get_dependencies` returns the directly registered dependents and an
///   empty list (not an error) for a parent without any.
/// - `set_dependency` is idempotent and does not check that `child` is a
///   stored object; the store always persists before registering.
/// - No cycle detection is required.
pub trait DependencyGraph<I: ContentId>: Send + Sync {
    /// Dependents registered directly under `parent`.
    fn get_dependencies(&self, parent: &I) -> StoreResult<Vec<I>>;

    /// Register `child` as a dependent of `parent`.
    fn set_dependency(&self, parent: &I, child: &I) -> StoreResult<()>;

    /// Drop a single edge. Returns `true` if it existed.
    fn remove_dependency(&self, parent: &I, child: &I) -> StoreResult<bool>;

    /// Drop every edge recorded under `parent`.
    fn clear_dependencies(&self, parent: &I) -> StoreResult<()>;

    /// Register several dependents at once.
    fn set_dependencies(&self, parent: &I, children: &[I]) -> StoreResult<()> {
        children
            .iter()
            .try_for_each(|child| self.set_dependency(parent, child))
    }
}

impl<I: ContentId, G: DependencyGraph<I> + ?Sized> DependencyGraph<I> for Arc<G> {
    fn get_dependencies(&self, parent: &I) -> StoreResult<Vec<I>> {
        (**self).get_dependencies(parent)
    }

    fn set_dependency(&self, parent: &I, child: &I) -> StoreResult<()> {
        (**self).set_dependency(parent, child)
    }

    fn remove_dependency(&self, parent: &I, child: &I) -> StoreResult<bool> {
        (**self).remove_dependency(parent, child)
    }

    fn clear_dependencies(&self, parent: &I) -> StoreResult<()> {
        (**self).clear_dependencies(parent)
    }

    fn set_dependencies(&self, parent: &I, children: &[I]) -> StoreResult<()> {
        (**self).set_dependencies(parent, children)
    }
}
