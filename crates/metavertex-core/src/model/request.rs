// Communication requests between two users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Contact,
    Meeting,
    Investment,
    Partnership,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Contact => "contact",
            RequestKind::Meeting => "meeting",
            RequestKind::Investment => "investment",
            RequestKind::Partnership => "partnership",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "contact" => Some(RequestKind::Contact),
            "meeting" => Some(RequestKind::Meeting),
            "investment" => Some(RequestKind::Investment),
            "partnership" => Some(RequestKind::Partnership),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactMethod {
    Whatsapp,
    Email,
    Zoom,
}

impl ContactMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactMethod::Whatsapp => "whatsapp",
            ContactMethod::Email => "email",
            ContactMethod::Zoom => "zoom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "whatsapp" => Some(ContactMethod::Whatsapp),
            "email" => Some(ContactMethod::Email),
            "zoom" => Some(ContactMethod::Zoom),
            _ => None,
        }
    }
}

/// Request lifecycle: `pending` is reviewed by an admin; an approved request
/// can then be worked (`ongoing`) and closed (`completed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Ongoing,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Ongoing => "ongoing",
            RequestStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            "ongoing" => Some(RequestStatus::Ongoing),
            "completed" => Some(RequestStatus::Completed),
            _ => None,
        }
    }

    /// Whether `self -> next` is a legal move, and whether only an admin may
    /// make it.
    pub fn transition(&self, next: RequestStatus) -> Option<TransitionAuthority> {
        use RequestStatus::*;
        match (self, next) {
            (Pending, Approved) | (Pending, Rejected) => Some(TransitionAuthority::AdminOnly),
            (Approved, Ongoing) | (Ongoing, Completed) => Some(TransitionAuthority::Participants),
            _ => None,
        }
    }

    /// Whether the two parties may talk directly (e.g. schedule a meeting).
    pub fn is_open_channel(&self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Ongoing)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAuthority {
    AdminOnly,
    /// Either party of the request, or an admin.
    Participants,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub product_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub message: String,
    pub contact_method: ContactMethod,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub admin_notes: Option<String>,
}

impl Request {
    pub fn involves(&self, user_id: &str) -> bool {
        self.from_user_id == user_id || self.to_user_id == user_id
    }

    pub fn counterpart(&self, user_id: &str) -> Option<&str> {
        if self.from_user_id == user_id {
            Some(&self.to_user_id)
        } else if self.to_user_id == user_id {
            Some(&self.from_user_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRequest {
    #[serde(default)]
    pub to_user_id: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    pub contact_method: ContactMethod,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: RequestStatus,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestStatus::*;

    #[test]
    fn admin_decides_pending_requests() {
        assert_eq!(
            Pending.transition(Approved),
            Some(TransitionAuthority::AdminOnly)
        );
        assert_eq!(
            Pending.transition(Rejected),
            Some(TransitionAuthority::AdminOnly)
        );
    }

    #[test]
    fn participants_move_approved_requests_forward() {
        assert_eq!(
            Approved.transition(Ongoing),
            Some(TransitionAuthority::Participants)
        );
        assert_eq!(
            Ongoing.transition(Completed),
            Some(TransitionAuthority::Participants)
        );
    }

    #[test]
    fn backwards_and_skipping_moves_are_illegal() {
        assert_eq!(Pending.transition(Ongoing), None);
        assert_eq!(Approved.transition(Pending), None);
        assert_eq!(Rejected.transition(Approved), None);
        assert_eq!(Completed.transition(Ongoing), None);
        assert_eq!(Approved.transition(Approved), None);
    }

    #[test]
    fn kind_serializes_as_type_field() {
        let json = r#"{"productId":"p1","type":"contact","contactMethod":"whatsapp"}"#;
        let req: NewRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.kind, RequestKind::Contact);
        assert_eq!(req.contact_method, ContactMethod::Whatsapp);
        assert!(req.to_user_id.is_none());
    }

    #[test]
    fn counterpart_is_the_other_party() {
        let now = Utc::now();
        let req = Request {
            id: "r".into(),
            from_user_id: "a".into(),
            to_user_id: "b".into(),
            product_id: None,
            kind: RequestKind::Meeting,
            message: String::new(),
            contact_method: ContactMethod::Zoom,
            status: Approved,
            created_at: now,
            updated_at: now,
            admin_notes: None,
        };
        assert_eq!(req.counterpart("a"), Some("b"));
        assert_eq!(req.counterpart("b"), Some("a"));
        assert_eq!(req.counterpart("c"), None);
        assert!(req.involves("a"));
        assert!(!req.involves("c"));
    }
}
