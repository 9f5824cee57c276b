use serde::{Deserialize, Serialize};

/// One event of an upload progress stream.
///
/// A stream carries zero or more `Progress` events followed by exactly one
/// `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress { percent: u8 },
    Done { success: bool },
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Done { .. })
    }
}
