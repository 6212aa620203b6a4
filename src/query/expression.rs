use regex::{Regex, RegexBuilder};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{
    cmp::Ordering,
    collections::HashSet,
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    str::FromStr,
};

use crate::{
    becca::Becca,
    error::BeccaError,
    properties::{AttributeType, ARCHIVED_LABEL},
    query::{context::SearchContext, lex::normalize, noteset::NoteSet},
};

/// Case-insensitive regex that can be compared, hashed and (de)serialized by its pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrappedRegex(
    #[serde(serialize_with = "serialize_regex")]
    #[serde(deserialize_with = "deserialize_regex")]
    Regex,
);

fn build_regex(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .unicode(true)
        .case_insensitive(true)
        .build()
}

fn serialize_regex<S>(re: &Regex, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(re.as_str())
}

struct ReVisitor;

impl<'de> de::Visitor<'de> for ReVisitor {
    type Value = Regex;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "A regex string, as validated by the Rust regex crate")
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        build_regex(s).map_err(|_e| E::invalid_value(de::Unexpected::Str(s), &self))
    }
}

fn deserialize_regex<'de, D>(deserializer: D) -> Result<Regex, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_str(ReVisitor)
}

impl WrappedRegex {
    pub fn new(pattern: &str) -> Result<WrappedRegex, regex::Error> {
        Ok(WrappedRegex(build_regex(pattern)?))
    }
}

impl Hash for WrappedRegex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_str().hash(state);
    }
}

impl PartialEq for WrappedRegex {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

impl Eq for WrappedRegex {}

impl Deref for WrappedRegex {
    type Target = Regex;
    fn deref(&self) -> &Regex {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    Equals,
    NotEquals,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    EndsWith,
    StartsWith,
    Contains,
    Regex,
}

impl ComparisonOp {
    pub fn from_token(token: &str) -> Option<ComparisonOp> {
        Some(match token {
            "=" => ComparisonOp::Equals,
            "!=" => ComparisonOp::NotEquals,
            "<" => ComparisonOp::Less,
            "<=" => ComparisonOp::LessOrEqual,
            ">" => ComparisonOp::Greater,
            ">=" => ComparisonOp::GreaterOrEqual,
            "*=" => ComparisonOp::EndsWith,
            "=*" => ComparisonOp::StartsWith,
            "*=*" => ComparisonOp::Contains,
            "%=" => ComparisonOp::Regex,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Equals => "=",
            ComparisonOp::NotEquals => "!=",
            ComparisonOp::Less => "<",
            ComparisonOp::LessOrEqual => "<=",
            ComparisonOp::Greater => ">",
            ComparisonOp::GreaterOrEqual => ">=",
            ComparisonOp::EndsWith => "*=",
            ComparisonOp::StartsWith => "=*",
            ComparisonOp::Contains => "*=*",
            ComparisonOp::Regex => "%=",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order two attribute or property values: numerically when both parse as finite numbers,
/// otherwise as lowercase strings.
fn compare_values(left: &str, right: &str) -> Ordering {
    fn finite(value: &str) -> Option<f64> {
        value.trim().parse::<f64>().ok().filter(|number| number.is_finite())
    }
    match (finite(left), finite(right)) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        _ => left.to_lowercase().cmp(&right.to_lowercase()),
    }
}

/// A comparison operator bound to its right-hand constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Comparator {
    pub op: ComparisonOp,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    regex: Option<WrappedRegex>,
}

impl Comparator {
    pub fn new(op: ComparisonOp, value: &str) -> Result<Comparator, regex::Error> {
        let regex = match op {
            ComparisonOp::Regex => Some(WrappedRegex::new(value)?),
            _ => None,
        };
        Ok(Comparator {
            op,
            value: value.to_lowercase(),
            regex,
        })
    }

    /// Case-insensitive equality with `value`.
    pub fn equals(value: &str) -> Comparator {
        Comparator {
            op: ComparisonOp::Equals,
            value: value.to_lowercase(),
            regex: None,
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        if let Some(regex) = &self.regex {
            return regex.is_match(candidate);
        }
        let candidate = candidate.to_lowercase();
        let value = self.value.as_str();
        match self.op {
            ComparisonOp::Equals => candidate == value,
            ComparisonOp::NotEquals => candidate != value,
            ComparisonOp::EndsWith => candidate.ends_with(value),
            ComparisonOp::StartsWith => candidate.starts_with(value),
            ComparisonOp::Contains => candidate.contains(value),
            ComparisonOp::Less => compare_values(&candidate, value) == Ordering::Less,
            ComparisonOp::LessOrEqual => compare_values(&candidate, value) != Ordering::Greater,
            ComparisonOp::Greater => compare_values(&candidate, value) == Ordering::Greater,
            ComparisonOp::GreaterOrEqual => compare_values(&candidate, value) != Ordering::Less,
            ComparisonOp::Regex => false,
        }
    }
}

/// Note properties addressable as `note.<property>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteProperty {
    NoteId,
    Title,
    Type,
    Mime,
    Content,
    IsArchived,
    ParentCount,
    ChildrenCount,
    LabelCount,
    OwnedLabelCount,
    RelationCount,
    AttributeCount,
    TargetRelationCount,
    /// Any other name. Never matches.
    Unknown(String),
}

impl NoteProperty {
    pub fn from_name(name: &str) -> NoteProperty {
        match name.to_lowercase().as_str() {
            "noteid" => NoteProperty::NoteId,
            "title" => NoteProperty::Title,
            "type" => NoteProperty::Type,
            "mime" => NoteProperty::Mime,
            "content" => NoteProperty::Content,
            "isarchived" => NoteProperty::IsArchived,
            "parentcount" => NoteProperty::ParentCount,
            "childrencount" => NoteProperty::ChildrenCount,
            "labelcount" => NoteProperty::LabelCount,
            "ownedlabelcount" => NoteProperty::OwnedLabelCount,
            "relationcount" => NoteProperty::RelationCount,
            "attributecount" => NoteProperty::AttributeCount,
            "targetrelationcount" => NoteProperty::TargetRelationCount,
            other => NoteProperty::Unknown(other.to_string()),
        }
    }

    /// Value of this property for a live note, as compared by a [Comparator].
    pub fn value(&self, becca: &Becca, note_id: &str) -> Option<String> {
        let note = becca.get_live_note(note_id)?;
        let count_effective = |attribute_type: AttributeType| {
            becca
                .effective_attributes(note_id)
                .iter()
                .filter(|attr| attr.attribute_type == attribute_type)
                .count()
        };
        Some(match self {
            NoteProperty::NoteId => note.note_id.clone(),
            NoteProperty::Title => note.title.clone(),
            NoteProperty::Type => note.note_type.clone(),
            NoteProperty::Mime => note.mime.clone(),
            NoteProperty::Content => note.content.clone().unwrap_or_default(),
            NoteProperty::IsArchived => becca.has_label(note_id, ARCHIVED_LABEL).to_string(),
            NoteProperty::ParentCount => becca.get_branches(note_id).len().to_string(),
            NoteProperty::ChildrenCount => becca.get_child_branches(note_id).len().to_string(),
            NoteProperty::LabelCount => count_effective(AttributeType::Label).to_string(),
            NoteProperty::OwnedLabelCount => becca
                .get_owned_attributes(note_id)
                .iter()
                .filter(|attr| attr.attribute_type == AttributeType::Label)
                .count()
                .to_string(),
            NoteProperty::RelationCount => count_effective(AttributeType::Relation).to_string(),
            NoteProperty::AttributeCount => becca.effective_attributes(note_id).len().to_string(),
            NoteProperty::TargetRelationCount => {
                becca.get_target_relations(note_id).len().to_string()
            }
            NoteProperty::Unknown(_) => return None,
        })
    }
}

/// Depth restriction for ancestor filtering, written `eq1`, `lt3`, `gt2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepthFilter {
    Eq(usize),
    Lt(usize),
    Gt(usize),
}

impl DepthFilter {
    pub fn accepts(&self, depth: usize) -> bool {
        match self {
            DepthFilter::Eq(limit) => depth == *limit,
            DepthFilter::Lt(limit) => depth < *limit,
            DepthFilter::Gt(limit) => depth > *limit,
        }
    }
}

impl FromStr for DepthFilter {
    type Err = BeccaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BeccaError::Serialization(format!("Unrecognized depth filter '{s}'"));
        if s.len() < 3 || !s.is_char_boundary(2) {
            return Err(invalid());
        }
        let (kind, depth) = s.split_at(2);
        let depth: usize = depth.parse().map_err(|_| invalid())?;
        match kind {
            "eq" => Ok(DepthFilter::Eq(depth)),
            "lt" => Ok(DepthFilter::Lt(depth)),
            "gt" => Ok(DepthFilter::Gt(depth)),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSource {
    Property(NoteProperty),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderKey {
    pub source: OrderSource,
    pub descending: bool,
}

impl OrderKey {
    fn value(&self, becca: &Becca, note_id: &str) -> Option<String> {
        match &self.source {
            OrderSource::Property(property) => property.value(becca, note_id),
            OrderSource::Label(name) => becca
                .effective_attributes_named(note_id, AttributeType::Label, name)
                .into_iter()
                .next()
                .map(|attr| attr.value),
        }
    }
}

/// A node of a parsed query. Every node maps an input [NoteSet] to a subset of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expression {
    /// Each operand narrows the output of the previous one.
    And(Vec<Expression>),
    /// Union of the operands, each evaluated against the same input.
    Or(Vec<Expression>),
    /// The input minus the notes the operand selects from all live notes.
    Not(Box<Expression>),
    AttributeExists {
        attribute_type: AttributeType,
        name: String,
    },
    AttributeComparison {
        attribute_type: AttributeType,
        name: String,
        comparator: Comparator,
    },
    PropertyComparison {
        property: NoteProperty,
        comparator: Comparator,
    },
    /// Notes with an effective relation `name` whose target satisfies `condition`.
    RelationWhere {
        name: String,
        condition: Box<Expression>,
    },
    /// Every token occurs in the title or, unless fast search is on, in the content.
    FullTextSearch { tokens: Vec<String> },
    /// Every token occurs in the note's flat text or in the title of one of its ancestors.
    NoteFlat { tokens: Vec<String> },
    /// Descendants of `note_id`, optionally restricted by depth.
    Ancestor {
        note_id: String,
        depth: Option<DepthFilter>,
        include_self: bool,
    },
    /// Notes with a parent satisfying the operand.
    ChildOf(Box<Expression>),
    /// Notes with a child satisfying the operand.
    ParentOf(Box<Expression>),
    /// Notes with an ancestor satisfying the operand.
    DescendantOf(Box<Expression>),
    OrderBy {
        keys: Vec<OrderKey>,
        limit: Option<usize>,
        sub: Box<Expression>,
    },
}

impl Expression {
    /// Conjunction of `operands`, collapsing the single-operand case.
    pub fn and_of(mut operands: Vec<Expression>) -> Option<Expression> {
        match operands.len() {
            0 => None,
            1 => operands.pop(),
            _ => Some(Expression::And(operands)),
        }
    }

    pub fn or_of(mut operands: Vec<Expression>) -> Option<Expression> {
        match operands.len() {
            0 => None,
            1 => operands.pop(),
            _ => Some(Expression::Or(operands)),
        }
    }

    pub fn is_ordered(&self) -> bool {
        match self {
            Expression::OrderBy { .. } => true,
            Expression::And(operands) => operands.last().is_some_and(Expression::is_ordered),
            _ => false,
        }
    }

    pub fn evaluate(&self, input: &NoteSet, ctx: &SearchContext) -> Result<NoteSet, BeccaError> {
        let becca = ctx.becca;
        Ok(match self {
            Expression::And(operands) => {
                let mut carry = input.clone();
                for operand in operands {
                    ctx.check_cancelled()?;
                    carry = operand.evaluate(&carry, ctx)?;
                    if carry.is_empty() {
                        break;
                    }
                }
                carry
            }
            Expression::Or(operands) => {
                let mut union = NoteSet::new();
                for operand in operands {
                    ctx.check_cancelled()?;
                    union.add_all(&operand.evaluate(input, ctx)?);
                }
                union
            }
            Expression::Not(operand) => {
                let excluded = operand.evaluate(&ctx.universe, ctx)?;
                input.minus(&excluded)
            }
            Expression::AttributeExists {
                attribute_type,
                name,
            } => filter_by_attribute(input, becca, *attribute_type, name, |_| true),
            Expression::AttributeComparison {
                attribute_type,
                name,
                comparator,
            } => filter_by_attribute(input, becca, *attribute_type, name, |value| {
                comparator.matches(value)
            }),
            Expression::PropertyComparison {
                property,
                comparator,
            } => input.filter(|note_id| {
                property
                    .value(becca, note_id)
                    .is_some_and(|value| comparator.matches(&value))
            }),
            Expression::RelationWhere { name, condition } => {
                let candidates = becca.attribute_candidates(AttributeType::Relation, name);
                let mut targets = NoteSet::new();
                let mut note_targets = Vec::new();
                for note_id in input.iter().filter(|note_id| candidates.contains(note_id)) {
                    let related: Vec<String> = becca
                        .effective_attributes_named(note_id, AttributeType::Relation, name)
                        .into_iter()
                        .map(|relation| relation.value)
                        .filter(|target| becca.is_live(target))
                        .collect();
                    for target in &related {
                        targets.add(target.as_str());
                    }
                    note_targets.push((note_id, related));
                }
                let matched = condition.evaluate(&targets, ctx)?;
                note_targets
                    .into_iter()
                    .filter(|(_, related)| related.iter().any(|target| matched.has(target)))
                    .map(|(note_id, _)| note_id)
                    .collect()
            }
            Expression::FullTextSearch { tokens } => input.filter(|note_id| {
                let Some(note) = becca.get_live_note(note_id) else {
                    return false;
                };
                let title = normalize(&note.title);
                let content = match (&note.content, ctx.fast_search) {
                    (Some(content), false) => normalize(content),
                    _ => String::new(),
                };
                tokens
                    .iter()
                    .all(|token| title.contains(token.as_str()) || content.contains(token.as_str()))
            }),
            Expression::NoteFlat { tokens } => {
                input.filter(|note_id| note_flat_matches(becca, note_id, tokens))
            }
            Expression::Ancestor {
                note_id: ancestor,
                depth,
                include_self,
            } => {
                let descendants: HashSet<String> = becca
                    .get_descendants(ancestor)
                    .into_iter()
                    .filter(|(_, distance)| depth.map_or(true, |depth| depth.accepts(*distance)))
                    .map(|(descendant, _)| descendant)
                    .collect();
                input.filter(|note_id| {
                    descendants.contains(note_id) || (*include_self && note_id == ancestor)
                })
            }
            Expression::ChildOf(operand) => {
                filter_by_related(input, ctx, operand, |note_id| becca.parent_note_ids(note_id))?
            }
            Expression::ParentOf(operand) => {
                filter_by_related(input, ctx, operand, |note_id| becca.child_note_ids(note_id))?
            }
            Expression::DescendantOf(operand) => {
                filter_by_related(input, ctx, operand, |note_id| becca.get_ancestors(note_id))?
            }
            Expression::OrderBy { keys, limit, sub } => {
                let mut ordered = sub.evaluate(input, ctx)?;
                sort_notes(&mut ordered, becca, keys);
                if let Some(limit) = limit {
                    ordered.truncate(*limit);
                }
                ordered
            }
        })
    }
}

fn filter_by_attribute<F>(
    input: &NoteSet,
    becca: &Becca,
    attribute_type: AttributeType,
    name: &str,
    value_matches: F,
) -> NoteSet
where
    F: Fn(&str) -> bool,
{
    let candidates = becca.attribute_candidates(attribute_type, name);
    let name = name.to_lowercase();
    input.filter(|note_id| {
        candidates.contains(note_id)
            && becca.effective_attributes(note_id).iter().any(|attr| {
                attr.attribute_type == attribute_type
                    && attr.name.to_lowercase() == name
                    && value_matches(attr.value.as_str())
            })
    })
}

/// Keep the input notes for which some note returned by `related` satisfies `operand`.
fn filter_by_related<F>(
    input: &NoteSet,
    ctx: &SearchContext,
    operand: &Expression,
    related: F,
) -> Result<NoteSet, BeccaError>
where
    F: Fn(&str) -> Vec<String>,
{
    let mut candidates = NoteSet::new();
    let mut per_note = Vec::with_capacity(input.len());
    for note_id in input.iter() {
        let others: Vec<String> = related(note_id)
            .into_iter()
            .filter(|other| ctx.becca.is_live(other))
            .collect();
        for other in &others {
            candidates.add(other.as_str());
        }
        per_note.push((note_id, others));
    }
    let matched = operand.evaluate(&candidates, ctx)?;
    Ok(per_note
        .into_iter()
        .filter(|(_, others)| others.iter().any(|other| matched.has(other)))
        .map(|(note_id, _)| note_id)
        .collect())
}

fn note_flat_matches(becca: &Becca, note_id: &str, tokens: &[String]) -> bool {
    if !becca.is_live(note_id) {
        return false;
    }
    let flat = becca.flat_text(note_id);
    let remaining: Vec<&String> = tokens
        .iter()
        .filter(|token| !flat.contains(token.as_str()))
        .collect();
    if remaining.len() == tokens.len() {
        return false;
    }
    if remaining.is_empty() {
        return true;
    }
    let ancestor_titles: Vec<String> = becca
        .get_ancestors(note_id)
        .iter()
        .filter_map(|ancestor| becca.get_live_note(ancestor))
        .map(|ancestor| normalize(&ancestor.title))
        .collect();
    remaining.iter().all(|token| {
        ancestor_titles
            .iter()
            .any(|title| title.contains(token.as_str()))
    })
}

/// Stable sort by `keys`. Notes lacking a value sort after notes having one, in both directions.
fn sort_notes(notes: &mut NoteSet, becca: &Becca, keys: &[OrderKey]) {
    let values: std::collections::HashMap<String, Vec<Option<String>>> = notes
        .iter()
        .map(|note_id| {
            (
                note_id.to_string(),
                keys.iter().map(|key| key.value(becca, note_id)).collect(),
            )
        })
        .collect();
    notes.sort_by(|left, right| {
        let (Some(left), Some(right)) = (values.get(left), values.get(right)) else {
            return Ordering::Equal;
        };
        for (idx, key) in keys.iter().enumerate() {
            let ordering = match (&left[idx], &right[idx]) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(left), Some(right)) if key.descending => compare_values(right, left),
                (Some(left), Some(right)) => compare_values(left, right),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}
