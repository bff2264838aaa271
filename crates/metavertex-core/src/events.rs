// In-process notification bus feeding the realtime WebSocket feed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::model::meeting::MeetingStatus;
use crate::model::request::RequestStatus;
use crate::model::user::UserType;
use crate::model::ReviewStatus;

/// Default channel capacity. Slow subscribers past this many pending
/// notifications skip ahead.
pub const DEFAULT_CAPACITY: usize = 256;

/// Marketplace events, serialized for clients as `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum MarketEvent {
    NewUserRegistration {
        user_id: String,
        email: String,
        name: String,
        user_type: UserType,
        unique_id: String,
    },
    UserStatusChanged {
        user_id: String,
        status: ReviewStatus,
    },
    NewProduct {
        product_id: String,
        product_name: String,
        founder_unique_id: String,
    },
    ProductStatusChanged {
        product_id: String,
        product_name: String,
        status: ReviewStatus,
    },
    NewInvestorInterest {
        interest_id: String,
        product_id: String,
        product_name: String,
        investor_unique_id: String,
    },
    InterestReviewed {
        interest_id: String,
        product_id: String,
        status: ReviewStatus,
    },
    NewContactRequest {
        request_id: String,
        from_user_id: String,
        to_user_id: String,
    },
    RequestStatusChanged {
        request_id: String,
        status: RequestStatus,
    },
    NewFounderQuery {
        query_id: String,
        product_id: String,
    },
    QueryReviewed {
        query_id: String,
        status: ReviewStatus,
    },
    MeetingScheduled {
        meeting_id: String,
        title: String,
        scheduled_at: DateTime<Utc>,
        join_url: String,
    },
    MeetingStatusChanged {
        meeting_id: String,
        status: MeetingStatus,
    },
}

/// Who may see a notification. Admins see everything.
#[derive(Debug, Clone, PartialEq)]
pub enum Audience {
    Admins,
    Participants(Vec<String>),
}

impl Audience {
    pub fn visible_to(&self, user_id: &str, is_admin: bool) -> bool {
        if is_admin {
            return true;
        }
        match self {
            Audience::Admins => false,
            Audience::Participants(ids) => ids.iter().any(|id| id == user_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub audience: Audience,
    pub event: MarketEvent,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Client wire form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.event)
    }
}

/// Broadcast fan-out of notifications to every connected subscriber.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Notification>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, audience: Audience, event: MarketEvent) {
        let notification = Notification {
            audience,
            event,
            timestamp: Utc::now(),
        };
        // No subscribers is normal when nobody is connected.
        if let Err(broadcast::error::SendError(n)) = self.tx.send(notification) {
            tracing::debug!("no subscribers for {:?}", n.event);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
