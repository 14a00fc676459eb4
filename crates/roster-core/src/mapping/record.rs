use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::MappingError;

use super::primitive::{Field, Primitive};

/// One declared column of a storage record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub unique: bool,
}

/// Shape of one storage table.
///
/// `version` names an integer field used for optimistic locking;
/// `updated_at` names a timestamp stamped on every update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordSchema {
    pub table: &'static str,
    pub key: &'static str,
    pub fields: &'static [FieldSpec],
    pub version: Option<&'static str>,
    pub updated_at: Option<&'static str>,
}

impl RecordSchema {
    pub fn unique_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.unique).map(|f| f.name)
    }

    pub fn declares(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.name == field)
    }
}

/// Flat, storage-shaped representation of one aggregate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Primitive>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: &str, value: Primitive) {
        self.fields.insert(field.to_string(), value);
    }

    pub fn get(&self, field: &str) -> Option<&Primitive> {
        self.fields.get(field)
    }

    /// Missing fields read as [`Primitive::Null`].
    pub fn value(&self, field: &str) -> Primitive {
        self.get(field).cloned().unwrap_or(Primitive::Null)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Primitive)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Decode one field into its declared type.
    pub fn decode<T: Field>(
        &self,
        aggregate: &'static str,
        field: &'static str,
    ) -> Result<T, MappingError> {
        T::from_primitive(self.value(field)).map_err(|reason| MappingError::MalformedPrimitive {
            aggregate,
            field,
            reason,
        })
    }
}

impl FromIterator<(String, Primitive)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Primitive)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec {
            name: "id",
            unique: false,
        },
        FieldSpec {
            name: "email",
            unique: true,
        },
    ];

    #[test]
    fn schema_lists_unique_fields() {
        let schema = RecordSchema {
            table: "users",
            key: "id",
            fields: FIELDS,
            version: None,
            updated_at: None,
        };
        assert_eq!(schema.unique_fields().collect::<Vec<_>>(), vec!["email"]);
        assert!(schema.declares("id"));
        assert!(!schema.declares("name"));
    }

    #[test]
    fn decode_reports_missing_field_as_malformed() {
        let record = Record::new();
        let err = record.decode::<String>("User", "email").unwrap_err();
        assert_eq!(
            err,
            MappingError::MalformedPrimitive {
                aggregate: "User",
                field: "email",
                reason: "expected text, found null".to_string(),
            }
        );
    }

    #[test]
    fn decode_reads_present_values() {
        let mut record = Record::new();
        record.set("count", Primitive::Integer(4));
        assert_eq!(record.decode::<i64>("Team", "count"), Ok(4));
        assert_eq!(record.decode::<Option<i64>>("Team", "missing"), Ok(None));
    }
}
