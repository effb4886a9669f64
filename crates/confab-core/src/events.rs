use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain events published by the orchestrator after each state change.
///
/// Consumers (the presentation shell) subscribe via a broadcast channel and
/// re-fetch the immutable conversation snapshot on receipt. Events never
/// carry mutable state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ChatEvent {
    /// A conversation was created or mutated and republished.
    ConversationUpdated { id: Uuid },

    /// A conversation was deleted from the store and the in-memory list.
    ConversationDeleted { id: Uuid },

    /// The global API configuration was saved.
    ConfigSaved,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serde_round_trip() {
        let id = Uuid::new_v4();
        let event = ChatEvent::ConversationUpdated { id };
        let json = serde_json::to_string(&event).unwrap();
        let back: ChatEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_events_are_cloneable() {
        let event = ChatEvent::ConfigSaved;
        assert_eq!(event.clone(), event);
    }
}
