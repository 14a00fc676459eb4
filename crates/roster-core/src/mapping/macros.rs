//! Declarative storage-record definitions.

/// Declare the storage shape of an aggregate and generate its
/// [`StorageRecord`](crate::mapping::StorageRecord) implementation.
///
/// Every listed field is read through an accessor of the same name on the
/// aggregate and converted with [`Field`](crate::mapping::Field). Loading
/// decodes the fields in declaration order and hands them to `restore`, which
/// must return `Result<Aggregate, impl Display>`.
///
/// ```ignore
/// storage_record! {
///     pub struct UserRecord => User {
///         table: "users",
///         key: id,
///         fields: {
///             id: UserId,
///             #[unique] email: Email,
///             updated_at: DateTime<Utc>,
///         },
///         updated_at: updated_at,
///         restore: User::restore,
///     }
/// }
/// ```
#[macro_export]
macro_rules! storage_record {
    (@unique unique) => { true };
    (@unique) => { false };
    (@opt) => { None };
    (@opt $field:ident) => { Some(stringify!($field)) };

    (
        $(#[$outer:meta])*
        $vis:vis struct $record:ident => $aggregate:ty {
            table: $table:literal,
            key: $key:ident,
            fields: {
                $( $(#[$flag:ident])? $field:ident : $ty:ty ),+ $(,)?
            },
            $( version: $version:ident, )?
            $( updated_at: $touched:ident, )?
            restore: $restore:path $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Clone, Copy, Debug, Default)]
        $vis struct $record;

        impl $crate::mapping::StorageRecord for $record {
            type Aggregate = $aggregate;

            fn schema() -> &'static $crate::mapping::RecordSchema {
                static SCHEMA: $crate::mapping::RecordSchema = $crate::mapping::RecordSchema {
                    table: $table,
                    key: stringify!($key),
                    fields: &[
                        $(
                            $crate::mapping::FieldSpec {
                                name: stringify!($field),
                                unique: $crate::storage_record!(@unique $($flag)?),
                            },
                        )+
                    ],
                    version: $crate::storage_record!(@opt $($version)?),
                    updated_at: $crate::storage_record!(@opt $($touched)?),
                };
                &SCHEMA
            }

            fn to_record(aggregate: &$aggregate) -> $crate::mapping::Record {
                use $crate::mapping::Field as _;

                let mut record = $crate::mapping::Record::new();
                $( record.set(stringify!($field), aggregate.$field().to_primitive()); )+
                record
            }

            fn from_record(
                record: &$crate::mapping::Record,
            ) -> ::std::result::Result<$aggregate, $crate::errors::MappingError> {
                const NAME: &str = <$aggregate as $crate::mapping::Aggregate>::NAME;

                $( let $field: $ty = record.decode(NAME, stringify!($field))?; )+
                $restore($($field),+).map_err(|err| {
                    $crate::errors::MappingError::InvariantViolation {
                        aggregate: NAME,
                        reason: err.to_string(),
                    }
                })
            }
        }
    };
}
