//! Edit requests, their reports and change notifications.

use scnr_schema::FieldId;

use crate::scenario::Scenario;
use crate::selection::{EntityHandle, SelectionKind};
use crate::value::FieldValue;

/// Result of a field write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Written to the store and the cache; listeners were notified.
    Written,
    /// Cache only: the entity was loading or already mid-write.
    Cached,
    /// The schema has no such field for this kind. Nothing was written.
    Unsupported,
}

/// A structural edit on one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralOp {
    pub kind: SelectionKind,
    pub action: EditAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    /// Append one zero-initialised record.
    Add,
    /// Remove one record. With `cascade`, removing a placement also removes
    /// the object name it references.
    Remove { index: usize, cascade: bool },
    /// Duplicate `source` into a new slot at `dest`.
    Copy { source: usize, dest: usize },
}

impl StructuralOp {
    pub const fn add(kind: SelectionKind) -> Self {
        Self {
            kind,
            action: EditAction::Add,
        }
    }

    pub const fn remove(kind: SelectionKind, index: usize) -> Self {
        Self {
            kind,
            action: EditAction::Remove {
                index,
                cascade: false,
            },
        }
    }

    pub const fn remove_cascading(kind: SelectionKind, index: usize) -> Self {
        Self {
            kind,
            action: EditAction::Remove { index, cascade: true },
        }
    }

    pub const fn copy(kind: SelectionKind, source: usize, dest: usize) -> Self {
        Self {
            kind,
            action: EditAction::Copy { source, dest },
        }
    }
}

/// An entity that moved within its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexChange {
    pub kind: SelectionKind,
    pub old: usize,
    pub new: usize,
}

/// A cross-reference rewritten by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldChange {
    pub entity: EntityHandle,
    pub field: FieldId,
    pub old: i64,
    pub new: i64,
}

/// What a structural edit changed, so callers can refresh only those nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditReport {
    /// Element count of every collection the edit touched, in edit order.
    pub counts: Vec<(SelectionKind, usize)>,
    pub created: Option<EntityHandle>,
    pub detached: Vec<EntityHandle>,
    pub reindexed: Vec<IndexChange>,
    pub rewritten: Vec<FieldChange>,
}

impl EditReport {
    /// Element count of `kind` after the edit.
    pub fn count(&self, kind: SelectionKind) -> Option<usize> {
        self.counts
            .iter()
            .rev()
            .find(|(k, _)| *k == kind)
            .map(|(_, count)| *count)
    }

    /// Every live entity whose index or label may have changed.
    pub fn touched(&self) -> Vec<EntityHandle> {
        let mut handles = Vec::new();
        let all = self
            .created
            .into_iter()
            .chain(self.reindexed.iter().map(|c| EntityHandle::new(c.kind, c.new)))
            .chain(self.rewritten.iter().map(|c| c.entity));
        for handle in all {
            if !handles.contains(&handle) {
                handles.push(handle);
            }
        }
        handles
    }

    pub(crate) fn events(&self) -> Vec<ChangeEvent> {
        let detached = self.detached.iter().copied().map(ChangeEvent::Detached);
        let moved = self.reindexed.iter().map(|c| ChangeEvent::Index {
            kind: c.kind,
            old: c.old,
            new: c.new,
        });
        let rewritten = self.rewritten.iter().map(|c| ChangeEvent::Reference {
            entity: c.entity,
            field: c.field,
            value: c.new,
        });
        detached.chain(moved).chain(rewritten).collect()
    }
}

/// Notification delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A field was written through.
    Field {
        entity: EntityHandle,
        field: FieldId,
        value: FieldValue,
    },
    /// A cross-reference was rewritten by a structural edit.
    Reference {
        entity: EntityHandle,
        field: FieldId,
        value: i64,
    },
    /// An entity moved; labels embedding the index need a refresh.
    Index {
        kind: SelectionKind,
        old: usize,
        new: usize,
    },
    /// The entity's record was removed.
    Detached(EntityHandle),
}

/// Receives change notifications.
///
/// Listeners get the scenario itself, so they may read or write it. A write
/// to the entity whose change is being delivered only updates its cache.
pub trait ChangeListener {
    fn on_change(&mut self, scenario: &mut Scenario, event: &ChangeEvent);
}

impl<F> ChangeListener for F
where
    F: FnMut(&mut Scenario, &ChangeEvent),
{
    fn on_change(&mut self, scenario: &mut Scenario, event: &ChangeEvent) {
        self(scenario, event)
    }
}
