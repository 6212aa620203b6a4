//! Effective attribute resolution.
//!
//! A note's effective attributes are, from highest to lowest precedence:
//!
//! 1. its own live attributes, by position;
//! 2. inheritable attributes of its ancestors, breadth-first by distance, sibling parents in
//!    branch order. An ancestor also passes down the inheritable attributes it receives from its
//!    own (non-inheritable) templates;
//! 3. the attributes of every note named by a `~template`/`~inherit` relation collected so far,
//!    except the template marker labels;
//! 4. the configured default template, if any.
//!
//! Inherited and templated attributes are dropped when a closer source already contributed an
//! attribute of the same type and name. A note's own attributes are never dropped.

use std::{
    collections::{BTreeSet, VecDeque},
    sync::Arc,
};

use crate::{
    becca::base::Becca,
    properties::{Attribute, AttributeType},
};

/// Accumulates attributes source by source, suppressing keys already contributed by a closer
/// source.
#[derive(Default)]
struct AttributeCollector {
    attributes: Vec<Attribute>,
    attribute_ids: BTreeSet<String>,
    blocked: BTreeSet<(AttributeType, String)>,
}

impl AttributeCollector {
    /// Add all attributes of one source. Attributes within a source never shadow each other.
    fn extend_from_source<'a, I>(&mut self, source: I)
    where
        I: IntoIterator<Item = &'a Attribute>,
    {
        let mut contributed = Vec::new();
        for attr in source {
            let key = attr.index_key();
            if self.blocked.contains(&key) || self.attribute_ids.contains(&attr.attribute_id) {
                continue;
            }
            self.attribute_ids.insert(attr.attribute_id.clone());
            self.attributes.push(attr.clone());
            contributed.push(key);
        }
        self.blocked.extend(contributed);
    }

    fn template_targets(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.attributes
            .iter()
            .filter(|attr| attr.is_template_relation())
            .filter_map(|attr| attr.target_note_id())
            .filter(|target| seen.insert(target.to_string()))
            .map(str::to_string)
            .collect()
    }
}

impl Becca {
    /// All attributes applying to `note_id`, own ones first. See the module docs for ordering.
    ///
    /// Results are cached per note until a change that can affect them arrives.
    pub fn effective_attributes(&self, note_id: &str) -> Arc<Vec<Attribute>> {
        if let Some(cached) = self.attribute_cache.read().get(note_id) {
            return cached.clone();
        }
        let mut path = Vec::new();
        let (resolved, _) = self.resolve_attributes(note_id, &mut path);
        self.attribute_cache
            .write()
            .insert(note_id.to_string(), resolved.clone());
        resolved
    }

    /// Effective attributes of the given type and (case-insensitive) name.
    pub fn effective_attributes_named(
        &self,
        note_id: &str,
        attribute_type: AttributeType,
        name: &str,
    ) -> Vec<Attribute> {
        let name = name.to_lowercase();
        self.effective_attributes(note_id)
            .iter()
            .filter(|attr| attr.attribute_type == attribute_type && attr.name.to_lowercase() == name)
            .cloned()
            .collect()
    }

    pub fn has_label(&self, note_id: &str, name: &str) -> bool {
        !self
            .effective_attributes_named(note_id, AttributeType::Label, name)
            .is_empty()
    }

    /// Resolve `note_id` while `path` holds the notes whose resolution is in progress. A note
    /// already on the path contributes nothing, which cuts template cycles.
    ///
    /// The flag is false when some cycle was cut below this note. Such a result depends on the
    /// path it was computed on and is not cached.
    fn resolve_attributes(
        &self,
        note_id: &str,
        path: &mut Vec<String>,
    ) -> (Arc<Vec<Attribute>>, bool) {
        if path.iter().any(|on_path| on_path == note_id) {
            return (Arc::new(Vec::new()), false);
        }
        if !path.is_empty() {
            if let Some(cached) = self.attribute_cache.read().get(note_id) {
                return (cached.clone(), true);
            }
        }
        path.push(note_id.to_string());
        let mut complete = true;
        let mut collector = AttributeCollector::default();
        collector.extend_from_source(self.get_owned_attributes(note_id));

        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<String> = self.parent_note_ids(note_id).into();
        while let Some(ancestor) = queue.pop_front() {
            if !seen.insert(ancestor.clone()) {
                continue;
            }
            if path.contains(&ancestor) {
                complete = false;
                continue;
            }
            let owned = self.get_owned_attributes(&ancestor);
            collector.extend_from_source(owned.iter().copied().filter(|attr| attr.is_inheritable));

            // Inheritable template relations were collected above and get expanded in full for
            // this note below.
            let ancestor_templates: Vec<String> = owned
                .iter()
                .filter(|attr| attr.is_template_relation() && !attr.is_inheritable)
                .filter_map(|attr| attr.target_note_id().map(str::to_string))
                .collect();
            for template in ancestor_templates {
                let (templated, template_complete) = self.resolve_attributes(&template, path);
                complete &= template_complete;
                collector.extend_from_source(
                    templated
                        .iter()
                        .filter(|attr| attr.is_inheritable && !attr.is_template_marker()),
                );
            }
            queue.extend(self.parent_note_ids(&ancestor));
        }

        let mut templates = collector.template_targets();
        if let Some(default_template) = &self.config().default_template_note_id {
            if !templates.contains(default_template) {
                templates.push(default_template.clone());
            }
        }
        for template in templates {
            if template == note_id {
                continue;
            }
            let (templated, template_complete) = self.resolve_attributes(&template, path);
            complete &= template_complete;
            collector.extend_from_source(templated.iter().filter(|attr| !attr.is_template_marker()));
        }

        path.pop();
        let resolved = Arc::new(collector.attributes);
        if complete && !path.is_empty() {
            self.attribute_cache
                .write()
                .insert(note_id.to_string(), resolved.clone());
        }
        (resolved, complete)
    }
}
