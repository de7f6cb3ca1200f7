use crate::models::BroadcastEnvelope;

/// Filter state of one live stream
///
/// Absent filters match everything; a subscription with neither filter
/// receives every broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscription {
    user_id: Option<String>,
    topic: Option<String>,
}

impl Subscription {
    /// Empty strings are treated as "no filter"
    pub fn new(user_id: Option<String>, topic: Option<String>) -> Self {
        Self {
            user_id: user_id.filter(|u| !u.is_empty()),
            topic: topic.filter(|t| !t.is_empty()),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn matches(&self, user_id: Option<&str>, topic: Option<&str>) -> bool {
        let matches_user = self.user_id.as_deref().map_or(true, |f| user_id == Some(f));
        let matches_topic = self.topic.as_deref().map_or(true, |f| topic == Some(f));
        matches_user && matches_topic
    }

    pub fn matches_envelope(&self, envelope: &BroadcastEnvelope) -> bool {
        self.matches(envelope.user_id(), envelope.resolved_topic())
    }
}
