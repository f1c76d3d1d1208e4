//! Advisory lock identifiers, one per protected resource.

use std::fmt;

/// Key of a database advisory lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdvisoryLockId(i64);

impl AdvisoryLockId {
    /// Guards the outbox fetch-and-reserve step.
    pub const OUTBOX_DISPATCH: AdvisoryLockId = AdvisoryLockId(1);

    /// Guards the temporary object sweep.
    pub const TEMP_OBJECT_GC: AdvisoryLockId = AdvisoryLockId(2);

    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for AdvisoryLockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
