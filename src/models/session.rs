//! Session identity for per-session settings containers

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Handle identifying one game session
///
/// Per-session containers key their loaded settings objects to a handle;
/// equality is by id, so a cloned handle still names the same session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    label: String,
    started_at: DateTime<Utc>,
}

impl SessionHandle {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SessionHandle {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_by_id() {
        let session = SessionHandle::new("campaign");
        let clone = session.clone();
        let other = SessionHandle::new("campaign");

        assert_eq!(session, clone);
        assert_ne!(session, other);
    }
}
