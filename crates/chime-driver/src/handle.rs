//! Schedule handle abstraction

/// Opaque handle to one pending driver-scheduled callback
///
/// Created by a driver's `schedule_after`; owned by exactly one timer
/// instance at a time and surrendered back to the driver on cancel.
#[derive(Debug)]
pub struct ScheduleHandle {
    /// Driver-specific payload (opaque to the scheduler core)
    payload: HandlePayload,
}

impl ScheduleHandle {
    pub fn new(payload: HandlePayload) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &HandlePayload {
        &self.payload
    }
}

/// Driver-specific handle payload
#[derive(Debug)]
pub enum HandlePayload {
    /// Tokio: abort handle for the sleeping task
    Tokio { abort: tokio::task::AbortHandle },

    /// Virtual clock: queue entry id
    Virtual { id: u64 },
}

impl HandlePayload {
    /// Get the virtual queue entry id if applicable
    pub fn virtual_id(&self) -> Option<u64> {
        match self {
            HandlePayload::Virtual { id } => Some(*id),
            HandlePayload::Tokio { .. } => None,
        }
    }
}
