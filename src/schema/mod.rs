pub mod overrides;
pub mod raw;
pub mod relation;
pub mod table;

pub use overrides::{OverrideSet, TableOverride, VirtualColumn};
pub use raw::{RawColumn, RawForeignKey, RawIndex, RawSchema, RawTable};
pub use relation::{Relation, RelationKind};
pub use table::{CREATED_AT_NAMES, Column, Table, UPDATED_AT_NAMES};
