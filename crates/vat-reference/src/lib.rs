pub mod combine;
pub mod config;
pub mod encode;
pub mod normalize;
pub mod select;

pub use combine::combine;
pub use config::{CustomSelect, DatasetConfig, DatasetConfigRegistry, RowPredicate, builtin_registry};
pub use encode::{EnumSpec, apply_enum_encoding, ordinal_of, value_at};
pub use normalize::normalize;
pub use select::{ALLELE_INDEX_COLUMN, FieldPath, SelectSpec};
