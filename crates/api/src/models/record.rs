use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle of a stored record.
///
/// The value is the byte address of the record inside the index file, so it
/// never changes for the lifetime of the record. `0` is reserved as null.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub u32);

impl RecordId {
    pub const NULL: RecordId = RecordId(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Absolute address of the field at `offset` inside this record.
    pub fn at(self, offset: u32) -> u32 {
        self.0 + offset
    }

    pub fn non_null(self) -> Option<RecordId> {
        if self.is_null() { None } else { Some(self) }
    }
}

impl From<u32> for RecordId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
