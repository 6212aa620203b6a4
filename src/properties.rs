//! Entity rows mirrored by the note index: notes, branches and attributes.
//!
//! These are plain value types. Their relationships (parent/child branches, owned attributes,
//! incoming relations) are maintained as indices by [crate::becca::Becca] rather than as
//! pointers between entities, so a row can arrive before the rows it refers to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Relation names that copy the target note's attributes onto the holder.
pub const TEMPLATE_RELATIONS: [&str; 2] = ["template", "inherit"];

/// Label names marking a note as a template. They are never copied onto template users.
pub const TEMPLATE_MARKER_LABELS: [&str; 2] = ["template", "workspacetemplate"];

pub const ARCHIVED_LABEL: &str = "archived";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Label,
    Relation,
}

impl AttributeType {
    /// The query sigil introducing this attribute type (`#label`, `~relation`).
    pub fn sigil(&self) -> char {
        match self {
            AttributeType::Label => '#',
            AttributeType::Relation => '~',
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::Label => write!(f, "label"),
            AttributeType::Relation => write!(f, "relation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub note_id: String,
    pub title: String,
    #[serde(rename = "type", default = "default_note_type")]
    pub note_type: String,
    #[serde(default = "default_mime")]
    pub mime: String,
    #[serde(default)]
    pub is_deleted: bool,
    /// Resolved body text, scanned by full-text search unless fast search is requested.
    #[serde(default)]
    pub content: Option<String>,
}

fn default_note_type() -> String {
    "text".to_string()
}

fn default_mime() -> String {
    "text/html".to_string()
}

impl Note {
    pub fn new<I: Into<String>, T: Into<String>>(note_id: I, title: T) -> Note {
        Note {
            note_id: note_id.into(),
            title: title.into(),
            note_type: default_note_type(),
            mime: default_mime(),
            is_deleted: false,
            content: None,
        }
    }

    pub fn with_content<C: Into<String>>(mut self, content: C) -> Note {
        self.content = Some(content.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub branch_id: String,
    pub note_id: String,
    pub parent_note_id: String,
    #[serde(default)]
    pub note_position: i64,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub is_expanded: bool,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Branch {
    pub fn new<B, N, P>(branch_id: B, note_id: N, parent_note_id: P, note_position: i64) -> Branch
    where
        B: Into<String>,
        N: Into<String>,
        P: Into<String>,
    {
        Branch {
            branch_id: branch_id.into(),
            note_id: note_id.into(),
            parent_note_id: parent_note_id.into(),
            note_position,
            prefix: None,
            is_expanded: false,
            is_deleted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub attribute_id: String,
    /// The holder of the attribute.
    pub note_id: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    pub name: String,
    /// For relations this is the target noteId.
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub is_inheritable: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub utc_date_modified: Option<String>,
}

impl Attribute {
    pub fn label<A, N, K, V>(attribute_id: A, note_id: N, name: K, value: V) -> Attribute
    where
        A: Into<String>,
        N: Into<String>,
        K: Into<String>,
        V: Into<String>,
    {
        Attribute {
            attribute_id: attribute_id.into(),
            note_id: note_id.into(),
            attribute_type: AttributeType::Label,
            name: name.into(),
            value: value.into(),
            position: 0,
            is_inheritable: false,
            is_deleted: false,
            utc_date_modified: None,
        }
    }

    pub fn relation<A, N, K, V>(attribute_id: A, note_id: N, name: K, target: V) -> Attribute
    where
        A: Into<String>,
        N: Into<String>,
        K: Into<String>,
        V: Into<String>,
    {
        Attribute {
            attribute_type: AttributeType::Relation,
            ..Attribute::label(attribute_id, note_id, name, target)
        }
    }

    pub fn inheritable(mut self) -> Attribute {
        self.is_inheritable = true;
        self
    }

    /// Key used by the attribute index and by inheritance de-duplication.
    pub fn index_key(&self) -> (AttributeType, String) {
        (self.attribute_type, self.name.to_lowercase())
    }

    pub fn is_template_relation(&self) -> bool {
        self.attribute_type == AttributeType::Relation
            && TEMPLATE_RELATIONS.contains(&self.name.to_lowercase().as_str())
    }

    pub fn is_template_marker(&self) -> bool {
        self.attribute_type == AttributeType::Label
            && TEMPLATE_MARKER_LABELS.contains(&self.name.to_lowercase().as_str())
    }

    /// Target note of a relation. Labels have no target.
    pub fn target_note_id(&self) -> Option<&str> {
        match self.attribute_type {
            AttributeType::Relation if !self.value.is_empty() => Some(self.value.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.attribute_type.sigil(), self.name)?;
        if !self.value.is_empty() {
            write!(f, "={}", self.value)?;
        }
        if self.is_inheritable {
            write!(f, "(inheritable)")?;
        }
        Ok(())
    }
}
