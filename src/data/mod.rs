//! Data structures for frame selection.

pub mod criteria;
pub mod frame;
pub mod region;
pub mod target;

pub use criteria::{
    parse_loose, Criterion, Field, FieldType, LooseValue, Pattern, Predicate, Value, DATE_FORMAT,
    WILDCARD,
};
pub use frame::{FrameId, FrameRecord};
pub use region::{Override, RegionContext, RegionSet};
pub use target::TargetRecord;
