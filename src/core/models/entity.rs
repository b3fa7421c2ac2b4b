use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use itertools::Itertools;
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::core::error::ModelError;
use super::Kind;

/// Reserved key naming the variant inside a property bag.
pub const CLASS_KEY: &str = "__class__";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

const RESERVED_KEYS: [&str; 4] = ["id", "created_at", "updated_at", CLASS_KEY];

/// A record of one variant: identity, timestamps and a side-table of
/// free-form attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    kind: Kind,
    id: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    attributes: Map<String, Value>,
}

// Microsecond precision so a timestamp survives a trip through the file.
fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}

pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

impl Entity {
    pub fn new(kind: Kind) -> Self {
        let timestamp = now();
        Self {
            kind,
            id: Uuid::new_v4().to_string(),
            created_at: timestamp,
            updated_at: timestamp,
            attributes: Map::new(),
        }
    }

    /// Rebuilds an entity from its serialized property bag. The type tag is
    /// ignored here; the caller already resolved it to `kind`.
    pub fn from_dict(kind: Kind, bag: &Map<String, Value>) -> Result<Self, ModelError> {
        let id = bag
            .get("id")
            .and_then(Value::as_str)
            .ok_or(ModelError::MissingId)?
            .to_string();
        let created_at = timestamp_field(bag, "created_at")?.unwrap_or_else(now);
        let updated_at = timestamp_field(bag, "updated_at")?.unwrap_or_else(now);

        let attributes = bag
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            kind,
            id,
            created_at,
            updated_at,
            attributes,
        })
    }

    pub fn storage_key(kind: Kind, id: &str) -> String {
        format!("{}.{}", kind, id)
    }

    // Getter methods
    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> String {
        Self::storage_key(self.kind, &self.id)
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn updated_at(&self) -> NaiveDateTime {
        self.updated_at
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Value of `name` as it appears in the property bag.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::String(self.id.clone())),
            "created_at" => Some(Value::String(format_timestamp(&self.created_at))),
            "updated_at" => Some(Value::String(format_timestamp(&self.updated_at))),
            _ => self.attributes.get(name).cloned(),
        }
    }

    /// Names owned by the record itself rather than the attribute table.
    pub fn is_reserved(name: &str) -> bool {
        RESERVED_KEYS.contains(&name)
    }

    pub fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), ModelError> {
        if Self::is_reserved(name) {
            return Err(ModelError::ReservedAttribute(name.to_string()));
        }
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    /// Refreshes `updated_at`; never moves it backwards.
    pub fn touch(&mut self) {
        let timestamp = now();
        if timestamp > self.updated_at {
            self.updated_at = timestamp;
        }
    }

    pub fn to_dict(&self) -> Map<String, Value> {
        let mut bag = self.attribute_bag();
        bag.insert(CLASS_KEY.to_string(), Value::String(self.kind.to_string()));
        bag
    }

    fn attribute_bag(&self) -> Map<String, Value> {
        let mut bag = self.attributes.clone();
        bag.insert("id".to_string(), Value::String(self.id.clone()));
        bag.insert(
            "created_at".to_string(),
            Value::String(format_timestamp(&self.created_at)),
        );
        bag.insert(
            "updated_at".to_string(),
            Value::String(format_timestamp(&self.updated_at)),
        );
        bag
    }
}

fn timestamp_field(
    bag: &Map<String, Value>,
    field: &str,
) -> Result<Option<NaiveDateTime>, ModelError> {
    match bag.get(field) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .and_then(parse_timestamp)
            .map(Some)
            .ok_or_else(|| ModelError::InvalidTimestamp {
                field: field.to_string(),
                value: value.to_string(),
            }),
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bag = self
            .attribute_bag()
            .into_iter()
            .map(|(key, value)| format!("{}: {}", Value::String(key), value))
            .join(", ");
        write!(f, "[{}] ({}) {{{}}}", self.kind, self.id, bag)
    }
}
