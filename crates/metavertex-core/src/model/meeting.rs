// Video meetings scheduled between marketplace users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_MEETING_MINUTES: u32 = 480;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Scheduled => "scheduled",
            MeetingStatus::InProgress => "in_progress",
            MeetingStatus::Completed => "completed",
            MeetingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(MeetingStatus::Scheduled),
            "in_progress" => Some(MeetingStatus::InProgress),
            "completed" => Some(MeetingStatus::Completed),
            "cancelled" => Some(MeetingStatus::Cancelled),
            _ => None,
        }
    }

    pub fn can_move_to(&self, next: MeetingStatus) -> bool {
        use MeetingStatus::*;
        matches!(
            (self, next),
            (Scheduled, InProgress) | (Scheduled, Cancelled) | (InProgress, Completed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: String,
    /// Provider-facing id, formatted `123-456-789`.
    pub meeting_id: String,
    pub title: String,
    pub description: String,
    pub duration_minutes: u32,
    pub scheduled_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub organizer_id: String,
    pub organizer_unique_id: String,
    pub participant_ids: Vec<String>,
    pub join_url: String,
    pub passcode: String,
    pub status: MeetingStatus,
    pub created_at: DateTime<Utc>,
}

impl Meeting {
    pub fn involves(&self, user_id: &str) -> bool {
        self.organizer_id == user_id || self.participant_ids.iter().any(|p| p == user_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeeting {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub duration_minutes: u32,
    pub scheduled_at: DateTime<Utc>,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub participant_ids: Vec<String>,
}

fn default_kind() -> String {
    "meeting".to_string()
}

impl NewMeeting {
    pub fn validate(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push("Meeting title is required".to_string());
        }
        if self.duration_minutes == 0 || self.duration_minutes > MAX_MEETING_MINUTES {
            errors.push(format!(
                "Duration must be between 1 and {MAX_MEETING_MINUTES} minutes"
            ));
        }
        if self.scheduled_at < now {
            errors.push("Scheduled time must not be in the past".to_string());
        }
        errors
    }
}

/// Details handed back by a meeting provider for a new booking.
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingLink {
    pub meeting_id: String,
    pub join_url: String,
    pub passcode: String,
}
