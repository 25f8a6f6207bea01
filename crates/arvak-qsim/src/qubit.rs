//! Instance and qubit handles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry-issued handle for a simulator instance.
///
/// Ids come from a process-wide monotonically increasing counter and are never
/// handed out twice, even by different registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sim{}", self.0)
    }
}

/// The backend's own numeric id for an instance's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendId(pub u32);

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Backend qubit id, unique among the live qubits of one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

/// A logical qubit handle.
///
/// The handle is only meaningful for the instance that issued it. Besides the
/// backend id it carries an allocation serial, so a handle kept across a
/// release stays invalid even when the backend hands the same id out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Qubit {
    id: QubitId,
    instance: InstanceId,
    serial: u64,
}

impl Qubit {
    pub(crate) fn new(id: QubitId, instance: InstanceId, serial: u64) -> Self {
        Self {
            id,
            instance,
            serial,
        }
    }

    /// The backend qubit id.
    #[inline]
    pub fn id(&self) -> QubitId {
        self.id
    }

    /// The instance that owns this qubit.
    #[inline]
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    #[inline]
    pub(crate) fn serial(&self) -> u64 {
        self.serial
    }
}

impl fmt::Display for Qubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let q = Qubit::new(QubitId(2), InstanceId(7), 0);
        assert_eq!(q.to_string(), "q2@sim7");
        assert_eq!(BackendId(4).to_string(), "#4");
    }

    #[test]
    fn test_handles_with_same_id_differ_by_serial() {
        let a = Qubit::new(QubitId(0), InstanceId(1), 0);
        let b = Qubit::new(QubitId(0), InstanceId(1), 1);
        assert_eq!(a.id(), b.id());
        assert_ne!(a, b);
    }
}
