//! Aggregate ⇄ storage record translation.
//!
//! Each aggregate declares its record shape once (see [`storage_record!`]);
//! the [`MappingRegistry`] collects those declarations at startup and is the
//! only component that converts between the two worlds.
//!
//! [`storage_record!`]: crate::storage_record

pub mod macros;
pub mod primitive;
pub mod record;
pub mod registry;

use std::fmt;

use crate::errors::MappingError;

pub use primitive::{Field, Primitive};
pub use record::{FieldSpec, Record, RecordSchema};
pub use registry::{MappingEntry, MappingRegistry, MappingRegistryBuilder};

/// A domain entity that is persisted as one unit.
pub trait Aggregate: Clone + Send + Sync + 'static {
    type Id: Field + Clone + fmt::Display + Send + Sync + 'static;

    /// Name used in errors and logs.
    const NAME: &'static str;

    fn id(&self) -> &Self::Id;
}

/// The storage shape of one aggregate type.
///
/// Usually generated by [`storage_record!`](crate::storage_record).
pub trait StorageRecord: 'static {
    type Aggregate: Aggregate;

    fn schema() -> &'static RecordSchema;

    fn to_record(aggregate: &Self::Aggregate) -> Record;

    fn from_record(record: &Record) -> Result<Self::Aggregate, MappingError>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! A small aggregate used by the persistence tests.

    use std::fmt;

    use super::{Aggregate, Field, Primitive};

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Sku(String);

    impl Sku {
        pub fn new(code: &str) -> Self {
            Self(code.to_string())
        }
    }

    impl fmt::Display for Sku {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl Field for Sku {
        fn to_primitive(&self) -> Primitive {
            Primitive::Text(self.0.clone())
        }

        fn from_primitive(value: Primitive) -> Result<Self, String> {
            let code = String::from_primitive(value)?;
            if code.starts_with("SKU-") {
                Ok(Self(code))
            } else {
                Err(format!("`{code}` is not a SKU"))
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Item {
        sku: Sku,
        label: String,
        barcode: Option<String>,
        stock: i64,
        revision: i64,
    }

    impl Item {
        pub fn new(sku: &str, label: &str, barcode: Option<&str>, stock: i64) -> Self {
            Self {
                sku: Sku::new(sku),
                label: label.to_string(),
                barcode: barcode.map(str::to_string),
                stock,
                revision: 0,
            }
        }

        pub fn restore(
            sku: Sku,
            label: String,
            barcode: Option<String>,
            stock: i64,
            revision: i64,
        ) -> Result<Self, String> {
            if stock < 0 {
                return Err(format!("negative stock {stock}"));
            }
            Ok(Self {
                sku,
                label,
                barcode,
                stock,
                revision,
            })
        }

        pub fn sku(&self) -> &Sku {
            &self.sku
        }

        pub fn label(&self) -> &String {
            &self.label
        }

        pub fn barcode(&self) -> &Option<String> {
            &self.barcode
        }

        pub fn stock(&self) -> i64 {
            self.stock
        }

        pub fn revision(&self) -> i64 {
            self.revision
        }

        pub fn with_label(self, label: &str) -> Self {
            Self {
                label: label.to_string(),
                ..self
            }
        }
    }

    impl Aggregate for Item {
        type Id = Sku;
        const NAME: &'static str = "Item";

        fn id(&self) -> &Sku {
            &self.sku
        }
    }

    crate::storage_record! {
        /// Row shape of the `items` test table.
        pub struct ItemRecord => Item {
            table: "items",
            key: sku,
            fields: {
                sku: Sku,
                label: String,
                #[unique] barcode: Option<String>,
                stock: i64,
                revision: i64,
            },
            version: revision,
            restore: Item::restore,
        }
    }

    /// A second record for the same aggregate, used to prove double registration fails.
    pub struct ItemShadowRecord;

    impl super::StorageRecord for ItemShadowRecord {
        type Aggregate = Item;

        fn schema() -> &'static super::RecordSchema {
            <ItemRecord as super::StorageRecord>::schema()
        }

        fn to_record(aggregate: &Item) -> super::Record {
            <ItemRecord as super::StorageRecord>::to_record(aggregate)
        }

        fn from_record(record: &super::Record) -> Result<Item, crate::errors::MappingError> {
            <ItemRecord as super::StorageRecord>::from_record(record)
        }
    }
}
