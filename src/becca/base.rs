use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    sync::Arc,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    becca::graph::{EdgeInsert, NoteHierarchy},
    config::BeccaConfig,
    error::BeccaError,
    event::{ChangeEvent, EntityChange, EventOrigin},
    properties::{Attribute, AttributeType, Branch, Note},
    query::normalize,
};

/// In-memory mirror of all notes, branches and attributes, plus the indices the query engine
/// reads from.
///
/// Writers take `&mut self`; readers only need `&self`. Share one instance across threads with
/// [crate::becca::SharedBecca].
#[derive(Debug)]
pub struct Becca {
    config: BeccaConfig,
    notes: BTreeMap<String, Note>,
    orphaned: BTreeSet<String>,
    note_arrival: BTreeMap<String, u64>,
    next_arrival: u64,
    branches: BTreeMap<String, Branch>,
    attributes: BTreeMap<String, Attribute>,
    child_parent_to_branch: BTreeMap<(String, String), String>,
    attribute_index: BTreeMap<(AttributeType, String), BTreeSet<String>>,
    owned_attributes: BTreeMap<String, BTreeSet<String>>,
    target_relations: BTreeMap<String, BTreeSet<String>>,
    hierarchy: NoteHierarchy,
    pub(crate) attribute_cache: RwLock<BTreeMap<String, Arc<Vec<Attribute>>>>,
    universe_cache: RwLock<Option<Arc<Vec<String>>>>,
    emitter: Option<UnboundedSender<ChangeEvent>>,
}

impl Default for Becca {
    fn default() -> Self {
        Becca::new(BeccaConfig::default())
    }
}

impl Becca {
    pub fn new(config: BeccaConfig) -> Becca {
        Becca {
            config,
            notes: BTreeMap::new(),
            orphaned: BTreeSet::new(),
            note_arrival: BTreeMap::new(),
            next_arrival: 0,
            branches: BTreeMap::new(),
            attributes: BTreeMap::new(),
            child_parent_to_branch: BTreeMap::new(),
            attribute_index: BTreeMap::new(),
            owned_attributes: BTreeMap::new(),
            target_relations: BTreeMap::new(),
            hierarchy: NoteHierarchy::default(),
            attribute_cache: RwLock::new(BTreeMap::new()),
            universe_cache: RwLock::new(None),
            emitter: None,
        }
    }

    /// Route the events produced by the mutation helpers to `tx`.
    pub fn with_emitter(mut self, tx: UnboundedSender<ChangeEvent>) -> Becca {
        self.emitter = Some(tx);
        self
    }

    pub fn set_emitter(&mut self, tx: Option<UnboundedSender<ChangeEvent>>) {
        self.emitter = tx;
    }

    pub fn config(&self) -> &BeccaConfig {
        &self.config
    }

    pub fn root_note_id(&self) -> &str {
        &self.config.root_note_id
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.branches.is_empty() && self.attributes.is_empty()
    }

    /// Build a store by applying `events` in order.
    pub fn from_events<I>(config: BeccaConfig, events: I) -> Becca
    where
        I: IntoIterator<Item = ChangeEvent>,
    {
        let mut becca = Becca::new(config);
        for event in events {
            becca.process_event(&event);
        }
        becca
    }

    /// Apply one change event. Returns true when the in-memory state changed.
    ///
    /// Events with [EventOrigin::Local] were produced by this store's own mutation helpers and
    /// are already reflected in its state, so they are skipped. Applying an event equal to the
    /// current row is a no-op.
    pub fn process_event(&mut self, event: &ChangeEvent) -> bool {
        if event.origin == EventOrigin::Local {
            return false;
        }
        self.apply_change(event.change.clone())
    }

    pub(crate) fn apply_change(&mut self, change: EntityChange) -> bool {
        match change {
            EntityChange::NoteUpserted(note) => self.upsert_note(note),
            EntityChange::BranchUpserted(branch) => self.upsert_branch(branch),
            EntityChange::AttributeUpserted(attr) => self.upsert_attribute(attr),
            EntityChange::NoteErased { note_id } => self.erase_note(&note_id),
            EntityChange::BranchErased { branch_id } => self.erase_branch(&branch_id),
            EntityChange::AttributeErased { attribute_id } => self.erase_attribute(&attribute_id),
        }
    }

    fn upsert_note(&mut self, note: Note) -> bool {
        let previous = self.notes.get(&note.note_id);
        if previous == Some(&note) {
            return false;
        }
        let liveness_changed = previous.map(|prev| prev.is_deleted) != Some(note.is_deleted);
        let note_id = note.note_id.clone();
        if !self.note_arrival.contains_key(&note_id) {
            self.note_arrival.insert(note_id.clone(), self.next_arrival);
            self.next_arrival += 1;
        }
        self.notes.insert(note_id.clone(), note);
        if liveness_changed {
            self.invalidate_subtree(&note_id);
            self.invalidate_universe();
        }
        true
    }

    fn erase_note(&mut self, note_id: &str) -> bool {
        if self.notes.remove(note_id).is_none() {
            return false;
        }
        self.note_arrival.remove(note_id);
        self.orphaned.remove(note_id);
        self.invalidate_subtree(note_id);
        self.invalidate_universe();
        true
    }

    fn upsert_branch(&mut self, branch: Branch) -> bool {
        let previous = self.branches.get(&branch.branch_id).cloned();
        if previous.as_ref() == Some(&branch) {
            return false;
        }
        if let Some(previous) = &previous {
            self.detach_branch(previous);
        }
        if !branch.is_deleted {
            self.attach_branch(&branch);
        }
        self.branches.insert(branch.branch_id.clone(), branch.clone());
        if let Some(previous) = previous {
            if !previous.is_deleted && previous.note_id != branch.note_id {
                self.mark_deleted_if_orphaned(&previous.note_id);
            }
        }
        if branch.is_deleted {
            self.mark_deleted_if_orphaned(&branch.note_id);
        }
        true
    }

    fn erase_branch(&mut self, branch_id: &str) -> bool {
        let Some(branch) = self.branches.remove(branch_id) else {
            return false;
        };
        self.detach_branch(&branch);
        if !branch.is_deleted {
            self.mark_deleted_if_orphaned(&branch.note_id);
        }
        true
    }

    fn attach_branch(&mut self, branch: &Branch) {
        match self.hierarchy.insert_branch(
            &branch.branch_id,
            &branch.parent_note_id,
            &branch.note_id,
        ) {
            EdgeInsert::RejectedCycle => {
                tracing::warn!(
                    "[Becca] branch {} ({} -> {}) would close a cycle, ignoring its edge",
                    branch.branch_id,
                    branch.parent_note_id,
                    branch.note_id
                );
                return;
            }
            EdgeInsert::Added | EdgeInsert::Unchanged => {}
        }
        self.child_parent_to_branch.insert(
            (branch.note_id.clone(), branch.parent_note_id.clone()),
            branch.branch_id.clone(),
        );
        if self.orphaned.remove(&branch.note_id) {
            tracing::debug!("[Becca] note {} has a parent branch again", branch.note_id);
        }
        self.invalidate_subtree(&branch.note_id);
        self.invalidate_universe();
    }

    fn detach_branch(&mut self, branch: &Branch) {
        if self.hierarchy.remove_branch(&branch.branch_id).is_none() {
            return;
        }
        let key = (branch.note_id.clone(), branch.parent_note_id.clone());
        if self.child_parent_to_branch.get(&key) == Some(&branch.branch_id) {
            self.child_parent_to_branch.remove(&key);
        }
        self.invalidate_subtree(&branch.note_id);
        self.invalidate_universe();
    }

    /// A note whose last live parent branch went away stops being live until a branch places
    /// it in the tree again. The note row itself is left as received.
    fn mark_deleted_if_orphaned(&mut self, note_id: &str) {
        if note_id == self.config.root_note_id {
            return;
        }
        if !self.hierarchy.parent_branch_ids(note_id).is_empty() {
            return;
        }
        if !self.is_live(note_id) {
            return;
        }
        tracing::debug!("[Becca] note {note_id} lost its last parent branch, treating it as deleted");
        self.orphaned.insert(note_id.to_string());
        self.invalidate_subtree(note_id);
        self.invalidate_universe();
    }

    fn upsert_attribute(&mut self, attr: Attribute) -> bool {
        let previous = self.attributes.get(&attr.attribute_id).cloned();
        if previous.as_ref() == Some(&attr) {
            return false;
        }
        if let Some(previous) = &previous {
            self.unindex_attribute(previous);
            self.invalidate_subtree(&previous.note_id);
        }
        if !attr.is_deleted {
            self.index_attribute(&attr);
        }
        self.invalidate_subtree(&attr.note_id);
        self.attributes.insert(attr.attribute_id.clone(), attr);
        true
    }

    fn erase_attribute(&mut self, attribute_id: &str) -> bool {
        let Some(attr) = self.attributes.remove(attribute_id) else {
            return false;
        };
        self.unindex_attribute(&attr);
        self.invalidate_subtree(&attr.note_id);
        true
    }

    fn index_attribute(&mut self, attr: &Attribute) {
        self.attribute_index
            .entry(attr.index_key())
            .or_default()
            .insert(attr.attribute_id.clone());
        self.owned_attributes
            .entry(attr.note_id.clone())
            .or_default()
            .insert(attr.attribute_id.clone());
        if let Some(target) = attr.target_note_id() {
            self.target_relations
                .entry(target.to_string())
                .or_default()
                .insert(attr.attribute_id.clone());
        }
    }

    fn unindex_attribute(&mut self, attr: &Attribute) {
        fn remove_from<K: Ord>(map: &mut BTreeMap<K, BTreeSet<String>>, key: &K, id: &str) {
            if let Some(ids) = map.get_mut(key) {
                ids.remove(id);
                if ids.is_empty() {
                    map.remove(key);
                }
            }
        }
        remove_from(
            &mut self.attribute_index,
            &attr.index_key(),
            &attr.attribute_id,
        );
        remove_from(
            &mut self.owned_attributes,
            &attr.note_id,
            &attr.attribute_id,
        );
        if let Some(target) = attr.target_note_id() {
            remove_from(
                &mut self.target_relations,
                &target.to_string(),
                &attr.attribute_id,
            );
        }
    }

    /// Drop cached effective attributes of `note_id` and of every note that may inherit from it
    /// through branches or template relations.
    pub(crate) fn invalidate_subtree(&self, note_id: &str) {
        if self.attribute_cache.read().is_empty() {
            return;
        }
        match self.propagation_targets(note_id, true) {
            Propagation::All => self.attribute_cache.write().clear(),
            Propagation::Notes(targets) => {
                let mut cache = self.attribute_cache.write();
                for target in targets.keys() {
                    cache.remove(target);
                }
            }
        }
    }

    fn invalidate_universe(&self) {
        *self.universe_cache.write() = None;
    }

    /// Notes an attribute owned by `holder` can reach: the holder, its subtree when `inheritable`,
    /// and, transitively, notes using any of those as a template.
    ///
    /// The map value records whether the attribute keeps propagating to descendants from that
    /// note. Reaching the default template means every note is affected.
    pub(crate) fn propagation_targets(&self, holder: &str, inheritable: bool) -> Propagation {
        let default_template = self.config.default_template_note_id.as_deref();
        let mut reached: BTreeMap<String, bool> = BTreeMap::new();
        let mut queue = VecDeque::from([(holder.to_string(), inheritable)]);
        while let Some((note_id, descends)) = queue.pop_front() {
            if let Some(seen) = reached.get(&note_id) {
                if *seen || !descends {
                    continue;
                }
            }
            if Some(note_id.as_str()) == default_template {
                return Propagation::All;
            }
            reached.insert(note_id.clone(), descends);
            if descends {
                for child in self.child_note_ids(&note_id) {
                    queue.push_back((child, true));
                }
            }
            for relation in self.template_relations_to(&note_id) {
                queue.push_back((
                    relation.note_id.clone(),
                    descends || relation.is_inheritable,
                ));
            }
        }
        Propagation::Notes(reached)
    }

    /// Notes that may carry an effective attribute of the given type and name. Callers still
    /// check the effective attributes of each candidate.
    pub(crate) fn attribute_candidates(
        &self,
        attribute_type: AttributeType,
        name: &str,
    ) -> Propagation {
        let mut reached = BTreeMap::new();
        for attr in self.find_attributes(attribute_type, name) {
            match self.propagation_targets(&attr.note_id, attr.is_inheritable) {
                Propagation::All => return Propagation::All,
                Propagation::Notes(notes) => reached.extend(notes),
            }
        }
        Propagation::Notes(reached)
    }

    /// Live notes in tree order: breadth-first from the root with siblings ordered by branch
    /// position, followed by live notes unreachable from the root in arrival order.
    pub fn all_note_ids(&self) -> Arc<Vec<String>> {
        if let Some(universe) = self.universe_cache.read().as_ref() {
            return universe.clone();
        }
        let mut ordered = Vec::new();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([self.config.root_note_id.clone()]);
        while let Some(note_id) = queue.pop_front() {
            if !seen.insert(note_id.clone()) {
                continue;
            }
            match self.notes.get(&note_id) {
                Some(_) if !self.is_live(&note_id) => continue,
                Some(_) => ordered.push(note_id.clone()),
                None => {}
            }
            queue.extend(self.child_note_ids(&note_id));
        }
        let mut unreachable: Vec<(&u64, &String)> = self
            .note_arrival
            .iter()
            .filter(|(note_id, _)| !seen.contains(*note_id) && self.is_live(note_id))
            .map(|(note_id, arrival)| (arrival, note_id))
            .collect();
        unreachable.sort();
        ordered.extend(unreachable.into_iter().map(|(_, note_id)| note_id.clone()));

        let universe = Arc::new(ordered);
        *self.universe_cache.write() = Some(universe.clone());
        universe
    }

    pub fn get_note(&self, note_id: &str) -> Option<&Note> {
        self.notes.get(note_id)
    }

    /// The note row, if it exists, is not tombstoned and has not lost all of its parents.
    pub fn get_live_note(&self, note_id: &str) -> Option<&Note> {
        self.notes
            .get(note_id)
            .filter(|note| !note.is_deleted && !self.orphaned.contains(note_id))
    }

    pub fn is_live(&self, note_id: &str) -> bool {
        self.get_live_note(note_id).is_some()
    }

    pub fn get_branch(&self, branch_id: &str) -> Option<&Branch> {
        self.branches.get(branch_id)
    }

    pub fn get_attribute(&self, attribute_id: &str) -> Option<&Attribute> {
        self.attributes.get(attribute_id)
    }

    pub fn get_branch_from_child_and_parent(
        &self,
        child_note_id: &str,
        parent_note_id: &str,
    ) -> Option<&Branch> {
        self.child_parent_to_branch
            .get(&(child_note_id.to_string(), parent_note_id.to_string()))
            .and_then(|branch_id| self.branches.get(branch_id))
    }

    fn sorted_branches(&self, branch_ids: Vec<String>) -> Vec<&Branch> {
        let mut branches: Vec<&Branch> = branch_ids
            .iter()
            .filter_map(|branch_id| self.branches.get(branch_id))
            .collect();
        branches.sort_by(|a, b| {
            a.note_position
                .cmp(&b.note_position)
                .then_with(|| a.branch_id.cmp(&b.branch_id))
        });
        branches
    }

    /// Live branches placing `note_id` under its parents, ordered by branch position.
    pub fn get_branches(&self, note_id: &str) -> Vec<&Branch> {
        self.sorted_branches(self.hierarchy.parent_branch_ids(note_id))
    }

    /// Live branches placing children under `note_id`, ordered by branch position.
    pub fn get_child_branches(&self, note_id: &str) -> Vec<&Branch> {
        self.sorted_branches(self.hierarchy.child_branch_ids(note_id))
    }

    /// Parents in branch order. Parents whose note row exists but is not live are skipped.
    pub fn parent_note_ids(&self, note_id: &str) -> Vec<String> {
        self.get_branches(note_id)
            .into_iter()
            .filter(|branch| {
                !self.notes.contains_key(&branch.parent_note_id)
                    || self.is_live(&branch.parent_note_id)
            })
            .map(|branch| branch.parent_note_id.clone())
            .collect()
    }

    pub fn child_note_ids(&self, note_id: &str) -> Vec<String> {
        self.get_child_branches(note_id)
            .into_iter()
            .map(|branch| branch.note_id.clone())
            .collect()
    }

    /// All ancestors of `note_id` breadth-first, nearest first, each listed once.
    pub fn get_ancestors(&self, note_id: &str) -> Vec<String> {
        let mut ancestors = Vec::new();
        let mut seen = BTreeSet::from([note_id.to_string()]);
        let mut queue: VecDeque<String> = self.parent_note_ids(note_id).into();
        while let Some(ancestor) = queue.pop_front() {
            if !seen.insert(ancestor.clone()) {
                continue;
            }
            queue.extend(self.parent_note_ids(&ancestor));
            ancestors.push(ancestor);
        }
        ancestors
    }

    /// Live descendants of `note_id` with their shortest distance (children are at depth 1).
    pub fn get_descendants(&self, note_id: &str) -> Vec<(String, usize)> {
        let mut descendants = Vec::new();
        let mut seen = BTreeSet::from([note_id.to_string()]);
        let mut queue: VecDeque<(String, usize)> = self
            .child_note_ids(note_id)
            .into_iter()
            .map(|child| (child, 1))
            .collect();
        while let Some((descendant, depth)) = queue.pop_front() {
            if !seen.insert(descendant.clone()) || !self.is_live(&descendant) {
                continue;
            }
            queue.extend(
                self.child_note_ids(&descendant)
                    .into_iter()
                    .map(|child| (child, depth + 1)),
            );
            descendants.push((descendant, depth));
        }
        descendants
    }

    /// Live attributes held directly by `note_id`, ordered by position.
    pub fn get_owned_attributes(&self, note_id: &str) -> Vec<&Attribute> {
        let mut owned: Vec<&Attribute> = self
            .owned_attributes
            .get(note_id)
            .into_iter()
            .flatten()
            .filter_map(|attribute_id| self.attributes.get(attribute_id))
            .collect();
        owned.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.attribute_id.cmp(&b.attribute_id))
        });
        owned
    }

    /// Live attributes of the given type and (case-insensitive) name, regardless of holder.
    pub fn find_attributes(&self, attribute_type: AttributeType, name: &str) -> Vec<&Attribute> {
        self.attribute_index
            .get(&(attribute_type, name.to_lowercase()))
            .into_iter()
            .flatten()
            .filter_map(|attribute_id| self.attributes.get(attribute_id))
            .collect()
    }

    /// Live relations pointing at `note_id`.
    pub fn get_target_relations(&self, note_id: &str) -> Vec<&Attribute> {
        self.target_relations
            .get(note_id)
            .into_iter()
            .flatten()
            .filter_map(|attribute_id| self.attributes.get(attribute_id))
            .collect()
    }

    fn template_relations_to(&self, note_id: &str) -> Vec<&Attribute> {
        self.get_target_relations(note_id)
            .into_iter()
            .filter(|relation| relation.is_template_relation())
            .collect()
    }

    /// Notes holding a template relation to `note_id`.
    pub fn template_users(&self, note_id: &str) -> Vec<String> {
        let users: BTreeSet<String> = self
            .template_relations_to(note_id)
            .into_iter()
            .map(|relation| relation.note_id.clone())
            .collect();
        users.into_iter().collect()
    }

    /// Normalized text searched by flat-text queries: id, type, mime, branch prefixes, title and
    /// the effective attributes of the note.
    pub fn flat_text(&self, note_id: &str) -> String {
        let Some(note) = self.notes.get(note_id) else {
            return String::new();
        };
        let mut flat = format!("{} {} {} ", note.note_id, note.note_type, note.mime);
        for branch in self.get_branches(note_id) {
            if let Some(prefix) = &branch.prefix {
                flat.push_str(prefix);
                flat.push(' ');
            }
        }
        flat.push_str(&note.title);
        flat.push(' ');
        for attr in self.effective_attributes(note_id).iter() {
            match attr.attribute_type {
                AttributeType::Label => flat.push('#'),
                AttributeType::Relation => flat.push('~'),
            }
            flat.push_str(&attr.name);
            if !attr.value.is_empty() {
                flat.push('=');
                flat.push_str(&attr.value);
            }
            flat.push(' ');
        }
        normalize(&flat)
    }

    pub fn note_count(&self) -> usize {
        self.notes
            .keys()
            .filter(|note_id| self.is_live(note_id))
            .count()
    }

    pub fn branch_count(&self) -> usize {
        self.branches.values().filter(|branch| !branch.is_deleted).count()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.values().filter(|attr| !attr.is_deleted).count()
    }

    fn emit(&self, change: EntityChange) -> Result<(), BeccaError> {
        if let Some(tx) = &self.emitter {
            tx.send(ChangeEvent::local(change))?;
        }
        Ok(())
    }

    fn require_live_note(&self, note_id: &str) -> Result<&Note, BeccaError> {
        self.get_live_note(note_id)
            .ok_or_else(|| BeccaError::NotFound(format!("note {note_id}")))
    }

    fn next_attribute_position(&self, note_id: &str) -> i64 {
        self.get_owned_attributes(note_id)
            .last()
            .map(|attr| attr.position + 10)
            .unwrap_or(10)
    }

    fn add_attribute(&mut self, attr: Attribute) -> Result<Attribute, BeccaError> {
        self.require_live_note(&attr.note_id)?;
        let attr = Attribute {
            position: self.next_attribute_position(&attr.note_id),
            ..attr
        };
        self.apply_change(EntityChange::AttributeUpserted(attr.clone()));
        self.emit(EntityChange::AttributeUpserted(attr.clone()))?;
        Ok(attr)
    }

    /// Create a label on `note_id`.
    ///
    /// Mutation helpers update this store synchronously, then send the change as a
    /// [EventOrigin::Local] event to the emitter, if one is attached. A send failure is returned
    /// but the in-memory change stays applied.
    pub fn add_label(
        &mut self,
        note_id: &str,
        name: &str,
        value: &str,
        inheritable: bool,
    ) -> Result<Attribute, BeccaError> {
        let mut attr = Attribute::label(uuid::Uuid::new_v4().to_string(), note_id, name, value);
        attr.is_inheritable = inheritable;
        self.add_attribute(attr)
    }

    pub fn add_relation(
        &mut self,
        note_id: &str,
        name: &str,
        target_note_id: &str,
        inheritable: bool,
    ) -> Result<Attribute, BeccaError> {
        let mut attr = Attribute::relation(
            uuid::Uuid::new_v4().to_string(),
            note_id,
            name,
            target_note_id,
        );
        attr.is_inheritable = inheritable;
        self.add_attribute(attr)
    }

    pub fn set_attribute_value(
        &mut self,
        attribute_id: &str,
        value: &str,
    ) -> Result<Attribute, BeccaError> {
        let attr = self
            .attributes
            .get(attribute_id)
            .filter(|attr| !attr.is_deleted)
            .ok_or_else(|| BeccaError::NotFound(format!("attribute {attribute_id}")))?;
        let updated = Attribute {
            value: value.to_string(),
            ..attr.clone()
        };
        self.apply_change(EntityChange::AttributeUpserted(updated.clone()));
        self.emit(EntityChange::AttributeUpserted(updated.clone()))?;
        Ok(updated)
    }

    /// Tombstone an attribute.
    pub fn remove_attribute(&mut self, attribute_id: &str) -> Result<(), BeccaError> {
        let attr = self
            .attributes
            .get(attribute_id)
            .ok_or_else(|| BeccaError::NotFound(format!("attribute {attribute_id}")))?;
        if attr.is_deleted {
            return Ok(());
        }
        let deleted = Attribute {
            is_deleted: true,
            ..attr.clone()
        };
        self.apply_change(EntityChange::AttributeUpserted(deleted.clone()));
        self.emit(EntityChange::AttributeUpserted(deleted))
    }

    pub fn set_note_title(&mut self, note_id: &str, title: &str) -> Result<Note, BeccaError> {
        let updated = Note {
            title: title.to_string(),
            ..self.require_live_note(note_id)?.clone()
        };
        self.apply_change(EntityChange::NoteUpserted(updated.clone()));
        self.emit(EntityChange::NoteUpserted(updated.clone()))?;
        Ok(updated)
    }
}

/// Result of [Becca::propagation_targets].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Propagation {
    All,
    Notes(BTreeMap<String, bool>),
}

impl Propagation {
    pub(crate) fn contains(&self, note_id: &str) -> bool {
        match self {
            Propagation::All => true,
            Propagation::Notes(notes) => notes.contains_key(note_id),
        }
    }
}
