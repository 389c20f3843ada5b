//! The scenario facade: load, read, write-through and structural edits.

use std::collections::VecDeque;
use std::path::Path;

use scnr_common::ByteStore;
use scnr_schema::{FieldDef, FieldId, FormatVersion, SchemaCatalog, SectionLayout};
use tracing::{debug, info, warn};

use crate::ai::{AiTree, AiTreeBuilder};
use crate::binding::WriteMode;
use crate::block::{BlockId, BlockTable};
use crate::change::{
    ChangeEvent, ChangeListener, EditAction, EditReport, FieldChange, IndexChange, StructuralOp, WriteOutcome,
};
use crate::coordinator::{dependents, shift_reference, IndexEdit, CROSS_REFERENCE_FIELDS};
use crate::editor::BlockEditor;
use crate::entity::{ObjectName, PaletteEntry, Placement, StartingPosition, TriggerVolume};
use crate::locator::{self, PropertyContext};
use crate::record::{BoundRecord, Collection, FxHashMap};
use crate::selection::{EntityHandle, PathStep, PlacementKind, Selection, SelectionKind};
use crate::value::{FieldValue, SENTINEL};
use crate::{Error, Result};

/// One row of an item listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLabel {
    pub handle: EntityHandle,
    /// Caption embedding the index, e.g. `[003] warthog_1`.
    pub label: String,
}

/// A cross-reference rewrite planned before a structural edit.
#[derive(Debug, Clone)]
struct Fixup {
    /// Holder position after the edit.
    entity: EntityHandle,
    field: FieldId,
    def: FieldDef,
    old: i64,
    value: FieldValue,
}

/// A loaded scenario: the byte store, its schema and the bound object model.
///
/// All mutation goes through `&mut self`, so edits are serialized by the
/// borrow checker. Listener callbacks run synchronously inside the call that
/// raised the change.
pub struct Scenario {
    store: ByteStore,
    catalog: SchemaCatalog,
    blocks: BlockTable,
    sections: FxHashMap<String, Collection>,
    listeners: Vec<Box<dyn ChangeListener>>,
    pending: VecDeque<ChangeEvent>,
    dispatching: bool,
    writing: Option<EntityHandle>,
}

impl Scenario {
    /// Bind every section of `catalog` found in `store`.
    ///
    /// Sections whose block cannot be read are skipped with a warning.
    pub fn load(store: ByteStore, catalog: SchemaCatalog) -> Result<Self> {
        catalog.validate()?;
        let mut blocks = BlockTable::new(catalog.pointer_base);
        let mut sections = FxHashMap::default();

        for name in catalog.section_names() {
            let Some(layout) = catalog.section(name) else { continue };
            let header = catalog.root_address + u64::from(layout.header_offset);
            if let Some(collection) = Collection::load(&store, &mut blocks, header, layout, None, name) {
                debug!(section = name, count = collection.len(), "loaded section");
                sections.insert(name.to_string(), collection);
            }
        }

        info!(
            sections = sections.len(),
            blocks = blocks.live_count(),
            format = %catalog.format,
            "loaded scenario"
        );

        Ok(Self {
            store,
            catalog,
            blocks,
            sections,
            listeners: Vec::new(),
            pending: VecDeque::new(),
            dispatching: false,
            writing: None,
        })
    }

    /// Read a scenario file using the catalog's byte order.
    pub fn open<P: AsRef<Path>>(path: P, catalog: SchemaCatalog) -> Result<Self> {
        let store = ByteStore::open(path, catalog.endian)?;
        Self::load(store, catalog)
    }

    #[inline]
    pub fn store(&self) -> &ByteStore {
        &self.store
    }

    /// Replace where [`commit`](Self::commit) writes to.
    pub fn set_origin(&mut self, origin: Box<dyn scnr_common::Origin>) {
        self.store.set_origin(origin);
    }

    #[inline]
    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    #[inline]
    pub fn blocks(&self) -> &BlockTable {
        &self.blocks
    }

    #[inline]
    pub fn format(&self) -> FormatVersion {
        self.catalog.format
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    /// Flush the store to its origin.
    ///
    /// On failure the in-memory model is untouched and stays dirty.
    pub fn commit(&mut self) -> Result<()> {
        self.store.commit()?;
        info!(size = self.store.len(), "committed scenario");
        Ok(())
    }

    /// Schema layout of a collection.
    pub fn layout(&self, kind: SelectionKind) -> Option<&SectionLayout> {
        if kind.is_synthetic() {
            return None;
        }
        self.catalog.resolve(&kind.schema_path())
    }

    /// Loaded collection, or `None` for synthetic, absent or unreadable ones.
    pub fn collection(&self, kind: SelectionKind) -> Option<&Collection> {
        find(&self.sections, kind)
    }

    pub fn count(&self, kind: SelectionKind) -> Option<usize> {
        self.collection(kind).map(Collection::len)
    }

    pub fn record(&self, handle: EntityHandle) -> Option<&BoundRecord> {
        self.collection(handle.kind)?.get(handle.index)
    }

    pub fn object_name(&self, index: usize) -> Option<ObjectName<'_>> {
        self.record(EntityHandle::new(SelectionKind::ObjectNames, index))
            .map(ObjectName::new)
    }

    pub fn placement(&self, kind: PlacementKind, index: usize) -> Option<Placement<'_>> {
        self.record(EntityHandle::new(SelectionKind::Placements(kind), index))
            .map(Placement::new)
    }

    pub fn palette_entry(&self, kind: PlacementKind, index: usize) -> Option<PaletteEntry<'_>> {
        self.record(EntityHandle::new(SelectionKind::Palette(kind), index))
            .map(PaletteEntry::new)
    }

    pub fn trigger_volume(&self, index: usize) -> Option<TriggerVolume<'_>> {
        self.record(EntityHandle::new(SelectionKind::TriggerVolumes, index))
            .map(TriggerVolume::new)
    }

    pub fn starting_position(&self, index: usize) -> Option<StartingPosition<'_>> {
        self.record(EntityHandle::new(SelectionKind::StartingPositions, index))
            .map(StartingPosition::new)
    }

    /// Ordered `(label, handle)` rows for a collection.
    ///
    /// The default zone lists the squads it groups; their handles point at
    /// the squad collection.
    pub fn items(&self, kind: SelectionKind) -> Result<Vec<ItemLabel>> {
        if kind == SelectionKind::DefaultZone {
            let tree = self.ai_tree();
            return Ok(tree
                .default_zone
                .squads
                .iter()
                .map(|squad| {
                    let handle = squad.handle();
                    ItemLabel {
                        handle,
                        label: locator::label(self, handle),
                    }
                })
                .collect());
        }

        let collection = self.collection(kind).ok_or(Error::NotEditable(kind))?;
        Ok((0..collection.len())
            .map(|index| {
                let handle = EntityHandle::new(kind, index);
                ItemLabel {
                    handle,
                    label: locator::label(self, handle),
                }
            })
            .collect())
    }

    /// Cached value of a field. `Ok(None)` when the schema lacks the field.
    pub fn get_field(&self, handle: EntityHandle, field: FieldId) -> Result<Option<FieldValue>> {
        let layout = self.layout(handle.kind).ok_or(Error::NotEditable(handle.kind))?;
        let record = self.record(handle).ok_or(Error::UnknownEntity(handle))?;
        if !layout.has_field(field) {
            return Ok(None);
        }
        Ok(record.get(field).cloned())
    }

    /// Set a field, writing through to the store when the entity is live.
    ///
    /// Listeners are notified while the entity is busy; a listener writing the
    /// same entity again only updates the cache.
    pub fn set_field(&mut self, handle: EntityHandle, field: FieldId, value: FieldValue) -> Result<WriteOutcome> {
        let layout = self.layout(handle.kind).ok_or(Error::NotEditable(handle.kind))?;
        let Some(def) = layout.field(field).copied() else {
            debug!(entity = %handle, field = field.as_str(), "field not in schema, skipping write");
            return Ok(WriteOutcome::Unsupported);
        };
        if value.kind() != def.kind {
            return Err(Error::TypeMismatch {
                field,
                expected: def.kind,
                found: value.kind().as_str(),
            });
        }
        value.check_encodable()?;

        let record = find_record_mut(&mut self.sections, handle).ok_or(Error::UnknownEntity(handle))?;
        match record.binding_mut().begin_write() {
            WriteMode::Rejected => Err(Error::EntityDetached {
                kind: handle.kind,
                index: handle.index,
            }),
            WriteMode::CacheOnly => {
                record.set_cached(field, value);
                Ok(WriteOutcome::Cached)
            }
            WriteMode::WriteThrough => {
                debug_assert!(record.binding().in_bounds(&self.store, &self.blocks));
                if let Err(e) = record.store_value(&mut self.store, &self.blocks, field, &def, value.clone()) {
                    record.binding_mut().end_write();
                    return Err(e);
                }

                let outer = self.writing.replace(handle);
                self.emit(vec![ChangeEvent::Field {
                    entity: handle,
                    field,
                    value,
                }]);
                self.writing = outer;

                if let Some(record) = find_record_mut(&mut self.sections, handle) {
                    record.binding_mut().end_write();
                }
                Ok(WriteOutcome::Written)
            }
        }
    }

    /// Parse `text` for the field's schema kind, then [`set_field`](Self::set_field).
    pub fn set_field_text(&mut self, handle: EntityHandle, field: FieldId, text: &str) -> Result<WriteOutcome> {
        let layout = self.layout(handle.kind).ok_or(Error::NotEditable(handle.kind))?;
        let Some(def) = layout.field(field) else {
            return Ok(WriteOutcome::Unsupported);
        };
        let value = FieldValue::parse(def.kind, text)?;
        self.set_field(handle, field, value)
    }

    /// Register a listener for change notifications.
    pub fn subscribe(&mut self, listener: Box<dyn ChangeListener>) {
        self.listeners.push(listener);
    }

    /// Resolve the property context for a selection.
    pub fn locate(&self, selection: Selection) -> Option<PropertyContext<'_>> {
        locator::locate(self, selection)
    }

    /// Rebuild the AI hierarchy from the loaded collections.
    pub fn ai_tree(&self) -> AiTree {
        AiTreeBuilder::new(self).build()
    }

    /// Perform a structural edit and fix up every dependent reference.
    ///
    /// Invalid indices are rejected before any byte is touched.
    pub fn apply(&mut self, op: StructuralOp) -> Result<EditReport> {
        if self.writing.is_some() {
            return Err(Error::EditInProgress(op.kind));
        }

        let mut report = EditReport::default();
        let result = self.run_edit(op, &mut report);
        self.finish_edit(report, result)
    }

    fn run_edit(&mut self, op: StructuralOp, report: &mut EditReport) -> Result<()> {
        match op.action {
            EditAction::Add => self.add_record(op.kind, report),
            EditAction::Remove { index, cascade } => {
                let name = match (cascade, op.kind) {
                    (true, SelectionKind::Placements(_)) => self.cascade_name(op.kind, index)?,
                    _ => None,
                };
                // Placements first, so name references are rewritten against the
                // new placement order before the name table itself shifts.
                self.remove_record(op.kind, index, report)?;
                match name {
                    Some(name) => self.remove_record(SelectionKind::ObjectNames, name, report),
                    None => Ok(()),
                }
            }
            EditAction::Copy { source, dest } => self.copy_record(op.kind, source, dest, report),
        }
    }

    /// Deliver the events of every completed step, even when a later step
    /// failed, then return the report or the error.
    fn finish_edit(&mut self, report: EditReport, result: Result<()>) -> Result<EditReport> {
        self.emit(report.events());
        match result {
            Ok(()) => Ok(report),
            Err(e) => {
                if !report.counts.is_empty() {
                    warn!(error = %e, steps = report.counts.len(), "structural edit failed after partial changes");
                }
                Err(e)
            }
        }
    }

    pub fn add(&mut self, kind: SelectionKind) -> Result<EditReport> {
        self.apply(StructuralOp::add(kind))
    }

    pub fn remove(&mut self, kind: SelectionKind, index: usize) -> Result<EditReport> {
        self.apply(StructuralOp::remove(kind, index))
    }

    pub fn copy(&mut self, kind: SelectionKind, source: usize, dest: usize) -> Result<EditReport> {
        self.apply(StructuralOp::copy(kind, source, dest))
    }

    /// Layout and current length of an editable collection.
    fn editable(&self, kind: SelectionKind) -> Result<(SectionLayout, BlockId, usize)> {
        let layout = self.layout(kind).ok_or(Error::NotEditable(kind))?;
        let collection = self.collection(kind).ok_or(Error::NotEditable(kind))?;
        Ok((layout.clone(), collection.block(), collection.len()))
    }

    fn cascade_name(&self, kind: SelectionKind, index: usize) -> Result<Option<usize>> {
        let collection = self.collection(kind).ok_or(Error::NotEditable(kind))?;
        let record = collection.get(index).ok_or(Error::InvalidIndex {
            kind,
            index,
            count: collection.len(),
        })?;
        let name = record.valid_ref(FieldId::NameIndex);
        let names = self.count(SelectionKind::ObjectNames).unwrap_or(0);
        Ok(match name {
            Some(n) if n < names => Some(n),
            Some(n) => {
                warn!(name = n, names, "placement names a missing entry, not cascading");
                None
            }
            None => None,
        })
    }

    fn add_record(&mut self, kind: SelectionKind, report: &mut EditReport) -> Result<()> {
        let (layout, block, count) = self.editable(kind)?;
        let plan = self.plan_fixups(kind, IndexEdit::Inserted(count), None)?;

        let index = BlockEditor::new(&mut self.store, &mut self.blocks).add(block)?;
        let mut record = BoundRecord::load(&self.store, &mut self.blocks, block, index, &layout, &kind.to_string())?;
        for field in CROSS_REFERENCE_FIELDS {
            let Some(def) = layout.field(field) else { continue };
            let Some(value) = FieldValue::from_index(def.kind, i64::from(SENTINEL)) else {
                continue;
            };
            record.store_value(&mut self.store, &self.blocks, field, def, value)?;
        }

        let collection = find_mut(&mut self.sections, kind).ok_or(Error::NotEditable(kind))?;
        collection.records.push(record);
        report.counts.push((kind, collection.len()));
        report.created = Some(EntityHandle::new(kind, index));
        debug!(%kind, index, "added record");

        self.apply_fixups(plan, report)
    }

    fn remove_record(&mut self, kind: SelectionKind, index: usize, report: &mut EditReport) -> Result<()> {
        let (_, block, count) = self.editable(kind)?;
        if index >= count {
            return Err(Error::InvalidIndex { kind, index, count });
        }
        let plan = self.plan_fixups(kind, IndexEdit::Removed(index), None)?;

        let released = BlockEditor::new(&mut self.store, &mut self.blocks).remove(block, index)?;

        let collection = find_mut(&mut self.sections, kind).ok_or(Error::NotEditable(kind))?;
        let mut removed = collection.records.remove(index);
        removed.detach();
        report.detached.push(EntityHandle::new(kind, index));
        for record in &mut collection.records[index..] {
            let new = record.index() - 1;
            let old = record.binding_mut().reindex(new);
            report.reindexed.push(IndexChange { kind, old, new });
        }
        report.counts.push((kind, collection.len()));
        debug!(%kind, index, released = released.len(), "removed record");

        self.apply_fixups(plan, report)
    }

    fn copy_record(&mut self, kind: SelectionKind, source: usize, dest: usize, report: &mut EditReport) -> Result<()> {
        let (layout, block, count) = self.editable(kind)?;
        if source >= count {
            return Err(Error::InvalidIndex {
                kind,
                index: source,
                count,
            });
        }
        if dest > count {
            return Err(Error::InvalidIndex {
                kind,
                index: dest,
                count,
            });
        }
        let plan = self.plan_fixups(kind, IndexEdit::Inserted(dest), Some(source))?;

        let mut editor = BlockEditor::new(&mut self.store, &mut self.blocks);
        let address = editor.copy(block, source, dest)?;
        editor.detach_nested(address, &layout)?;
        let record = BoundRecord::load(&self.store, &mut self.blocks, block, dest, &layout, &kind.to_string())?;

        let collection = find_mut(&mut self.sections, kind).ok_or(Error::NotEditable(kind))?;
        collection.records.insert(dest, record);
        for record in &mut collection.records[dest + 1..] {
            let new = record.index() + 1;
            let old = record.binding_mut().reindex(new);
            report.reindexed.push(IndexChange { kind, old, new });
        }
        report.counts.push((kind, collection.len()));
        report.created = Some(EntityHandle::new(kind, dest));
        debug!(%kind, source, dest, "copied record");

        self.apply_fixups(plan, report)
    }

    /// Compute every cross-reference rewrite an edit of `edited` implies.
    ///
    /// Runs before the edit so that an index overflow rejects the operation
    /// with the store untouched. Holder positions are expressed after the
    /// edit; for a copy, the duplicate inherits the source's rewrite.
    fn plan_fixups(&self, edited: SelectionKind, edit: IndexEdit, copied: Option<usize>) -> Result<Vec<Fixup>> {
        let mut plan = Vec::new();
        for dependent in dependents(edited) {
            let Some(layout) = self.layout(dependent.holder) else { continue };
            let Some(def) = layout.field(dependent.field).copied() else { continue };
            let Some(holders) = self.collection(dependent.holder) else { continue };
            if dependent.object_type.is_some() && !layout.has_field(FieldId::ObjectType) {
                warn!(
                    holder = %dependent.holder,
                    field = dependent.field.as_str(),
                    %edited,
                    "holder has no object type field, references left unchanged"
                );
                continue;
            }
            let same = dependent.holder == edited;

            for (i, record) in holders.iter().enumerate() {
                if let Some(code) = dependent.object_type {
                    if record.index_ref(FieldId::ObjectType) != Some(code) {
                        continue;
                    }
                }
                let Some(old) = record.index_ref(dependent.field) else { continue };
                let new = shift_reference(old, edit);
                if new == old {
                    continue;
                }
                let value = FieldValue::from_index(def.kind, new).ok_or(Error::IndexOverflow {
                    field: dependent.field,
                    kind: def.kind,
                    value: new,
                })?;

                let mut targets = Vec::with_capacity(2);
                if !same {
                    targets.push(i);
                } else {
                    targets.extend(edit.remap(i));
                    if copied == Some(i) {
                        targets.push(edit.position());
                    }
                }
                for target in targets {
                    plan.push(Fixup {
                        entity: EntityHandle::new(dependent.holder, target),
                        field: dependent.field,
                        def,
                        old,
                        value: value.clone(),
                    });
                }
            }
        }
        Ok(plan)
    }

    fn apply_fixups(&mut self, plan: Vec<Fixup>, report: &mut EditReport) -> Result<()> {
        for fixup in plan {
            let record = find_record_mut(&mut self.sections, fixup.entity).ok_or(Error::UnknownEntity(fixup.entity))?;
            let new = fixup.value.as_index().unwrap_or(fixup.old);
            record.store_value(&mut self.store, &self.blocks, fixup.field, &fixup.def, fixup.value)?;
            report.rewritten.push(FieldChange {
                entity: fixup.entity,
                field: fixup.field,
                old: fixup.old,
                new,
            });
        }
        Ok(())
    }

    /// Queue events and deliver them unless a delivery is already running.
    fn emit(&mut self, events: Vec<ChangeEvent>) {
        if self.listeners.is_empty() && !self.dispatching {
            return;
        }
        self.pending.extend(events);
        if self.dispatching {
            return;
        }

        self.dispatching = true;
        let mut listeners = std::mem::take(&mut self.listeners);
        while let Some(event) = self.pending.pop_front() {
            for listener in &mut listeners {
                listener.on_change(self, &event);
            }
        }
        // Keep listeners subscribed during delivery.
        listeners.append(&mut self.listeners);
        self.listeners = listeners;
        self.dispatching = false;
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("store", &self.store)
            .field("format", &self.catalog.format)
            .field("sections", &self.sections.len())
            .field("blocks", &self.blocks.live_count())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn find(sections: &FxHashMap<String, Collection>, kind: SelectionKind) -> Option<&Collection> {
    let mut steps = kind.steps().into_iter();
    let Some(PathStep::Section(name)) = steps.next() else {
        return None;
    };
    let mut current = sections.get(name)?;
    for step in steps {
        match step {
            PathStep::Nested { index, name } => current = current.get(index)?.child(name)?,
            PathStep::Section(_) => return None,
        }
    }
    Some(current)
}

fn find_mut(sections: &mut FxHashMap<String, Collection>, kind: SelectionKind) -> Option<&mut Collection> {
    let mut steps = kind.steps().into_iter();
    let Some(PathStep::Section(name)) = steps.next() else {
        return None;
    };
    let mut current = sections.get_mut(name)?;
    for step in steps {
        match step {
            PathStep::Nested { index, name } => current = current.get_mut(index)?.child_mut(name)?,
            PathStep::Section(_) => return None,
        }
    }
    Some(current)
}

fn find_record_mut(sections: &mut FxHashMap<String, Collection>, handle: EntityHandle) -> Option<&mut BoundRecord> {
    find_mut(sections, handle.kind)?.get_mut(handle.index)
}
