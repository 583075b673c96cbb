//! External source identifiers
//!
//! Records can carry the identifiers other systems use for the same
//! entity ("sources"). They play no role in the temporal algorithm; they
//! exist so callers can cross-reference external ids to identities.
//!
//! - [`Source`]: a named, typed descriptor owned by one entity kind
//! - [`Sourcing`]: the source ids attached to one record
//! - [`SourceSet`] / [`SourceRegister`]: the static table of descriptors,
//!   built once at startup
//!
//! Sources are persisted under `sources.<name>`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::error::{TemporaError, TemporaResult};
use crate::value::Value;

/// One identifier value from an external system
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalId {
    /// Integer identifier
    Int(i64),
    /// Textual identifier
    Text(String),
}

impl ExternalId {
    /// The type of this identifier
    pub fn id_type(&self) -> SourceIdType {
        match self {
            ExternalId::Int(_) => SourceIdType::Int,
            ExternalId::Text(_) => SourceIdType::Text,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            ExternalId::Int(i) => Value::Int(*i),
            ExternalId::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalId::Int(i) => write!(f, "{}", i),
            ExternalId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ExternalId {
    fn from(s: &str) -> Self {
        ExternalId::Text(s.to_string())
    }
}

impl From<String> for ExternalId {
    fn from(s: String) -> Self {
        ExternalId::Text(s)
    }
}

impl From<i64> for ExternalId {
    fn from(i: i64) -> Self {
        ExternalId::Int(i)
    }
}

/// Type of the identifiers a source carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceIdType {
    /// Textual identifiers
    Text,
    /// Integer identifiers
    Int,
}

/// Whether a record holds one or several ids for a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Exactly one id
    Single,
    /// A set of ids
    Collection,
}

/// Named, typed source descriptor
///
/// Two descriptors with the same name but different owning entities are
/// different sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Source {
    entity: String,
    name: String,
    id_type: SourceIdType,
    cardinality: Cardinality,
}

impl Source {
    /// Single-valued source
    pub fn single(entity: impl Into<String>, name: impl Into<String>, id_type: SourceIdType) -> Self {
        Source {
            entity: entity.into(),
            name: name.into(),
            id_type,
            cardinality: Cardinality::Single,
        }
    }

    /// Collection-valued source
    pub fn collection(
        entity: impl Into<String>,
        name: impl Into<String>,
        id_type: SourceIdType,
    ) -> Self {
        Source {
            entity: entity.into(),
            name: name.into(),
            id_type,
            cardinality: Cardinality::Collection,
        }
    }

    /// Source name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity kind owning this source
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Identifier type
    pub fn id_type(&self) -> SourceIdType {
        self.id_type
    }

    /// Single or collection
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Persisted field path, `sources.<name>`
    pub fn query_name(&self) -> String {
        format!("sources.{}", self.name)
    }

    fn check_type(&self, id: &ExternalId) -> TemporaResult<()> {
        if id.id_type() != self.id_type {
            return Err(TemporaError::invalid_argument(format!(
                "source '{}' expects {:?} identifiers, got {:?}",
                self.name,
                self.id_type,
                id.id_type()
            )));
        }
        Ok(())
    }
}

/// Ids held by one record for one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceValue {
    /// Single-valued source
    One(ExternalId),
    /// Collection-valued source
    Many(BTreeSet<ExternalId>),
}

impl SourceValue {
    /// Does this value hold the id
    pub fn contains(&self, id: &ExternalId) -> bool {
        match self {
            SourceValue::One(one) => one == id,
            SourceValue::Many(many) => many.contains(id),
        }
    }

    /// All ids held
    pub fn ids(&self) -> Box<dyn Iterator<Item = &ExternalId> + '_> {
        match self {
            SourceValue::One(one) => Box::new(std::iter::once(one)),
            SourceValue::Many(many) => Box::new(many.iter()),
        }
    }
}

/// Source ids attached to a record, keyed by source name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sourcing {
    sources: BTreeMap<String, SourceValue>,
}

impl Sourcing {
    /// No sources
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the id of a single-valued source
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for collection sources or mismatched id types.
    pub fn set_source_id(&mut self, source: &Source, id: impl Into<ExternalId>) -> TemporaResult<&mut Self> {
        let id = id.into();
        source.check_type(&id)?;
        if source.cardinality() != Cardinality::Single {
            return Err(TemporaError::invalid_argument(format!(
                "source '{}' is a collection, use add_source_id",
                source.name()
            )));
        }
        self.sources.insert(source.name().to_string(), SourceValue::One(id));
        Ok(self)
    }

    /// Add one id to a collection-valued source
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for single sources or mismatched id types.
    pub fn add_source_id(&mut self, source: &Source, id: impl Into<ExternalId>) -> TemporaResult<&mut Self> {
        let id = id.into();
        source.check_type(&id)?;
        if source.cardinality() != Cardinality::Collection {
            return Err(TemporaError::invalid_argument(format!(
                "source '{}' is single-valued, use set_source_id",
                source.name()
            )));
        }
        let entry = self
            .sources
            .entry(source.name().to_string())
            .or_insert_with(|| SourceValue::Many(BTreeSet::new()));
        if let SourceValue::Many(ids) = entry {
            ids.insert(id);
        } else {
            *entry = SourceValue::Many(BTreeSet::from([id]));
        }
        Ok(self)
    }

    /// Ids held for a source
    pub fn source_id(&self, source: &Source) -> Option<&SourceValue> {
        self.sources.get(source.name())
    }

    /// Does the record carry the source at all
    pub fn has_source(&self, source: &Source) -> bool {
        self.sources.contains_key(source.name())
    }

    /// Does the record carry this id for the source
    pub fn matches(&self, source: &Source, id: &ExternalId) -> bool {
        self.source_id(source).is_some_and(|v| v.contains(id))
    }

    /// True when no source is attached
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// `(name, ids)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceValue)> {
        self.sources.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Structured form used in the content hash
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.sources
                .iter()
                .map(|(name, value)| {
                    let v = match value {
                        SourceValue::One(id) => id.to_value(),
                        SourceValue::Many(ids) => {
                            Value::Array(ids.iter().map(ExternalId::to_value).collect())
                        }
                    };
                    (name.clone(), v)
                })
                .collect(),
        )
    }
}

/// The sources declared for one entity kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    entity: String,
    sources: Vec<Source>,
}

impl SourceSet {
    /// Empty set for an entity kind
    pub fn new(entity: impl Into<String>) -> Self {
        SourceSet {
            entity: entity.into(),
            sources: Vec::new(),
        }
    }

    /// Declare a single-valued source
    pub fn with_source(mut self, name: impl Into<String>, id_type: SourceIdType) -> Self {
        let source = Source::single(self.entity.clone(), name, id_type);
        self.sources.push(source);
        self
    }

    /// Declare a collection-valued source
    pub fn with_collection(mut self, name: impl Into<String>, id_type: SourceIdType) -> Self {
        let source = Source::collection(self.entity.clone(), name, id_type);
        self.sources.push(source);
        self
    }

    /// Entity kind
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Look up a declared source
    pub fn source(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name() == name)
    }

    /// All declared sources, in declaration order
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }
}

/// Static registration table of source sets, keyed by entity kind
#[derive(Debug, Clone, Default)]
pub struct SourceRegister {
    sets: HashMap<String, SourceSet>,
}

impl SourceRegister {
    /// Start building a register
    pub fn builder() -> SourceRegisterBuilder {
        SourceRegisterBuilder::default()
    }

    /// A source by entity kind and name
    pub fn for_name(&self, entity: &str, name: &str) -> Option<&Source> {
        self.sets.get(entity).and_then(|set| set.source(name))
    }

    /// The set registered for an entity kind
    pub fn for_entity(&self, entity: &str) -> Option<&SourceSet> {
        self.sets.get(entity)
    }

    /// All sources of an entity kind; empty if unknown
    pub fn list(&self, entity: &str) -> &[Source] {
        self.sets.get(entity).map(SourceSet::sources).unwrap_or(&[])
    }
}

/// Builder for [`SourceRegister`]
#[derive(Debug, Default)]
pub struct SourceRegisterBuilder {
    sets: HashMap<String, SourceSet>,
}

impl SourceRegisterBuilder {
    /// Register a source set
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the entity kind is already registered or the
    /// set declares the same source name twice.
    pub fn register(mut self, set: SourceSet) -> TemporaResult<Self> {
        let mut seen = BTreeSet::new();
        for source in set.sources() {
            if !seen.insert(source.name()) {
                return Err(TemporaError::invalid_argument(format!(
                    "source '{}' declared twice for entity '{}'",
                    source.name(),
                    set.entity()
                )));
            }
        }
        if self.sets.contains_key(set.entity()) {
            return Err(TemporaError::invalid_argument(format!(
                "entity '{}' already has a registered source set",
                set.entity()
            )));
        }
        self.sets.insert(set.entity().to_string(), set);
        Ok(self)
    }

    /// Freeze the register
    pub fn build(self) -> SourceRegister {
        SourceRegister { sets: self.sets }
    }
}
