// Marketplace rules: who may do what, and what each role gets to see.
//
// Every operation takes the calling `Actor` and enforces role checks and
// admin mediation before touching the database. Submodules group the
// operations by record type; all of them extend `Marketplace`.

mod documents;
mod interests;
mod meetings;
mod products;
mod queries;
mod requests;
mod users;

pub use documents::UploadLimits;
pub use interests::PendingInterest;
pub use meetings::{format_meeting_id, LocalMeetingLinks, MeetingProvider};
pub use users::{NewAdmin, Session};

use std::sync::Arc;

use chrono::Utc;

use crate::auth::TokenService;
use crate::db::Database;
use crate::error::{MarketError, MarketResult};
use crate::events::{Audience, EventBus, MarketEvent};
use crate::model::audit::AdminAction;
use crate::model::new_id;
use crate::model::user::{Actor, User, UserType};

pub struct Marketplace {
    db: Arc<Database>,
    tokens: TokenService,
    events: EventBus,
    uploads: UploadLimits,
    meetings: Arc<dyn MeetingProvider>,
}

impl Marketplace {
    pub fn new(
        db: Arc<Database>,
        tokens: TokenService,
        events: EventBus,
        uploads: UploadLimits,
    ) -> Self {
        Self {
            db,
            tokens,
            events,
            uploads,
            meetings: Arc::new(LocalMeetingLinks::default()),
        }
    }

    /// Replace the default local meeting link generator.
    pub fn with_meeting_provider(mut self, provider: Arc<dyn MeetingProvider>) -> Self {
        self.meetings = provider;
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    // ------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------

    fn load_user(&self, id: &str) -> MarketResult<User> {
        self.db
            .find_user(id)?
            .ok_or_else(|| MarketError::not_found("User", id))
    }

    fn publish(&self, audience: Audience, event: MarketEvent) {
        self.events.publish(audience, event);
    }

    /// Append to the admin action log.
    fn audit(
        &self,
        actor: &Actor,
        action: &str,
        target_id: Option<&str>,
        details: serde_json::Value,
    ) -> MarketResult<()> {
        self.db.record_action(&AdminAction {
            id: new_id(),
            action: action.to_string(),
            actor_id: actor.id.clone(),
            target_id: target_id.map(str::to_string),
            details,
            timestamp: Utc::now(),
        })?;
        Ok(())
    }
}

pub(crate) fn require_admin(actor: &Actor) -> MarketResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(MarketError::Forbidden("Admin access required".into()))
    }
}

pub(crate) fn require_role(actor: &Actor, role: UserType, message: &str) -> MarketResult<()> {
    if actor.user_type == role {
        Ok(())
    } else {
        Err(MarketError::Forbidden(message.to_string()))
    }
}

/// Trimmed text, or `None` when blank.
fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
