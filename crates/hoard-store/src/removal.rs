use serde::Serialize;

/// What happened to one object during a removal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum RemovalOutcome {
    /// The object existed and was deleted.
    Removed,
    /// Nothing was persisted under the identifier.
    Missing,
    /// The object could not be deleted.
    Failed(String),
}

impl RemovalOutcome {
    /// Returns `true` if the object was deleted by this call.
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed)
    }

    /// Returns `true` if the deletion failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Outcome of a cascading removal.
///
/// Dependent failures never abort the cascade; they are recorded here and
/// only the target's own outcome decides the boolean result of
/// [`ContentStore::remove`](crate::ContentStore::remove).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RemovalReport<I> {
    /// The identifier removal was requested for.
    pub target: I,
    /// Outcome for the target itself.
    pub target_outcome: RemovalOutcome,
    /// Outcomes for dependents, in removal order.
    pub dependents: Vec<(I, RemovalOutcome)>,
}

impl<I> RemovalReport<I> {
    pub(crate) fn new(target: I) -> Self {
        Self {
            target,
            target_outcome: RemovalOutcome::Missing,
            dependents: Vec::new(),
        }
    }

    /// Returns `true` iff the target object itself was removed.
    pub fn target_removed(&self) -> bool {
        self.target_outcome.is_removed()
    }

    /// Number of objects (target included) deleted by the call.
    pub fn removed_count(&self) -> usize {
        self.dependents
            .iter()
            .filter(|(_, outcome)| outcome.is_removed())
            .count()
            + usize::from(self.target_removed())
    }

    /// Dependents that could not be deleted.
    pub fn failures(&self) -> impl Iterator<Item = (&I, &str)> {
        self.dependents.iter().filter_map(|(id, outcome)| match outcome {
            RemovalOutcome::Failed(reason) => Some((id, reason.as_str())),
            _ => None,
        })
    }
}
