use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    fs::read_to_string,
    path::Path,
};

use crate::{
    error::BeccaError,
    properties::{Attribute, Branch, Note},
};

/// Indicates the origin of a ChangeEvent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EventOrigin {
    /// Event was generated locally by a Becca mutation helper and has already been applied to
    /// its state. Reapplying it is a no-op.
    Local,

    /// Event came from the persistence collaborator (initial load, sync, another process).
    #[default]
    Remote,
}

/// One entity change, as produced by the persistence layer.
///
/// Upserts with `is_deleted = true` tombstone the entity. The `*Erased` variants remove the row
/// entirely (e.g. after the tombstone has been synchronized and purged).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityChange {
    NoteUpserted(Note),
    BranchUpserted(Branch),
    AttributeUpserted(Attribute),
    NoteErased {
        #[serde(rename = "noteId")]
        note_id: String,
    },
    BranchErased {
        #[serde(rename = "branchId")]
        branch_id: String,
    },
    AttributeErased {
        #[serde(rename = "attributeId")]
        attribute_id: String,
    },
}

impl EntityChange {
    /// Id of the entity the change applies to.
    pub fn entity_id(&self) -> &str {
        match self {
            EntityChange::NoteUpserted(note) => &note.note_id,
            EntityChange::BranchUpserted(branch) => &branch.branch_id,
            EntityChange::AttributeUpserted(attr) => &attr.attribute_id,
            EntityChange::NoteErased { note_id } => note_id,
            EntityChange::BranchErased { branch_id } => branch_id,
            EntityChange::AttributeErased { attribute_id } => attribute_id,
        }
    }
}

impl Display for EntityChange {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            EntityChange::NoteUpserted(_) => write!(f, "NoteUpserted({})", self.entity_id()),
            EntityChange::BranchUpserted(_) => write!(f, "BranchUpserted({})", self.entity_id()),
            EntityChange::AttributeUpserted(_) => {
                write!(f, "AttributeUpserted({})", self.entity_id())
            }
            EntityChange::NoteErased { .. } => write!(f, "NoteErased({})", self.entity_id()),
            EntityChange::BranchErased { .. } => write!(f, "BranchErased({})", self.entity_id()),
            EntityChange::AttributeErased { .. } => {
                write!(f, "AttributeErased({})", self.entity_id())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(default)]
    pub origin: EventOrigin,
    pub change: EntityChange,
}

impl ChangeEvent {
    pub fn remote(change: EntityChange) -> ChangeEvent {
        ChangeEvent {
            origin: EventOrigin::Remote,
            change,
        }
    }

    pub fn local(change: EntityChange) -> ChangeEvent {
        ChangeEvent {
            origin: EventOrigin::Local,
            change,
        }
    }

    /// Returns a new event with the specified origin
    pub fn with_origin(self, origin: EventOrigin) -> Self {
        ChangeEvent { origin, ..self }
    }
}

impl From<EntityChange> for ChangeEvent {
    fn from(change: EntityChange) -> Self {
        ChangeEvent::remote(change)
    }
}

impl Display for ChangeEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{:?}:{}", self.origin, self.change)
    }
}

/// Parse a JSON array of change events. Events without an `origin` are [EventOrigin::Remote].
pub fn parse_events(json: &str) -> Result<Vec<ChangeEvent>, BeccaError> {
    Ok(serde_json::from_str(json)?)
}

pub fn read_events<P: AsRef<Path>>(path: P) -> Result<Vec<ChangeEvent>, BeccaError> {
    tracing::debug!("Reading change events from {:?}", path.as_ref());
    parse_events(&read_to_string(path)?)
}
