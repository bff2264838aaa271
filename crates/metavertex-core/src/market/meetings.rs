// Video meetings between users who already have an admin-approved channel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::info;

use super::{non_blank, Marketplace};
use crate::error::{MarketError, MarketResult};
use crate::events::{Audience, MarketEvent};
use crate::model::meeting::{Meeting, MeetingLink, MeetingStatus, NewMeeting};
use crate::model::new_id;
use crate::model::user::Actor;

/// Source of join links for new meetings.
#[async_trait]
pub trait MeetingProvider: Send + Sync {
    async fn create_meeting(
        &self,
        title: &str,
        scheduled_at: DateTime<Utc>,
        duration_minutes: u32,
    ) -> anyhow::Result<MeetingLink>;
}

/// Generates meeting ids, join URLs and passcodes locally.
#[derive(Debug, Clone)]
pub struct LocalMeetingLinks {
    base_url: String,
}

impl LocalMeetingLinks {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for LocalMeetingLinks {
    fn default() -> Self {
        Self::new("https://meet.metavertex.io/j")
    }
}

#[async_trait]
impl MeetingProvider for LocalMeetingLinks {
    async fn create_meeting(
        &self,
        _title: &str,
        _scheduled_at: DateTime<Utc>,
        _duration_minutes: u32,
    ) -> anyhow::Result<MeetingLink> {
        let (number, passcode) = {
            let mut rng = rand::rng();
            (
                rng.random_range(100_000_000..=999_999_999u64),
                rng.random_range(0..=999_999u32),
            )
        };
        let passcode = format!("{passcode:06}");
        Ok(MeetingLink {
            meeting_id: format_meeting_id(number),
            join_url: format!("{}/{number}?pwd={passcode}", self.base_url),
            passcode,
        })
    }
}

/// `123456789` -> `123-456-789`.
pub fn format_meeting_id(number: u64) -> String {
    let digits = format!("{number:09}");
    let (head, rest) = digits.split_at(digits.len() - 6);
    let (mid, tail) = rest.split_at(3);
    format!("{head}-{mid}-{tail}")
}

impl Marketplace {
    /// Book a meeting. Non-admin organizers may only invite users they share
    /// an approved or ongoing request with.
    pub async fn schedule_meeting(&self, actor: &Actor, input: NewMeeting) -> MarketResult<Meeting> {
        let errors = input.validate(Utc::now());
        if !errors.is_empty() {
            return Err(MarketError::Invalid(errors));
        }

        let mut participants: Vec<String> = Vec::new();
        for id in &input.participant_ids {
            let id = id.trim();
            if id.is_empty() || id == actor.id || participants.iter().any(|p| p == id) {
                continue;
            }
            participants.push(self.load_user(id)?.id);
        }

        if !actor.is_admin() {
            let requests = self.db.list_requests(Some(&actor.id))?;
            for participant in &participants {
                let connected = requests.iter().any(|r| {
                    r.status.is_open_channel() && r.counterpart(&actor.id) == Some(participant.as_str())
                });
                if !connected {
                    let unique_id = self.load_user(participant)?.unique_id;
                    return Err(MarketError::Forbidden(format!(
                        "No approved contact with {unique_id}; request an introduction first"
                    )));
                }
            }
        }

        let title = input.title.trim().to_string();
        let link = self
            .meetings
            .create_meeting(&title, input.scheduled_at, input.duration_minutes)
            .await?;

        let meeting = Meeting {
            id: new_id(),
            meeting_id: link.meeting_id,
            title,
            description: input.description.trim().to_string(),
            duration_minutes: input.duration_minutes,
            scheduled_at: input.scheduled_at,
            kind: non_blank(Some(input.kind.as_str())).unwrap_or_else(|| "meeting".to_string()),
            organizer_id: actor.id.clone(),
            organizer_unique_id: actor.unique_id.clone(),
            participant_ids: participants,
            join_url: link.join_url,
            passcode: link.passcode,
            status: MeetingStatus::Scheduled,
            created_at: Utc::now(),
        };
        self.db.insert_meeting(&meeting)?;

        self.audit(
            actor,
            "zoom_meeting_scheduled",
            Some(&meeting.id),
            serde_json::json!({
                "meetingId": meeting.meeting_id,
                "title": meeting.title,
                "scheduledAt": meeting.scheduled_at,
                "participants": meeting.participant_ids,
            }),
        )?;
        info!(
            "{} scheduled meeting {} for {}",
            actor.unique_id, meeting.meeting_id, meeting.scheduled_at
        );
        self.publish(
            Audience::Participants(everyone_in(&meeting)),
            MarketEvent::MeetingScheduled {
                meeting_id: meeting.id.clone(),
                title: meeting.title.clone(),
                scheduled_at: meeting.scheduled_at,
                join_url: meeting.join_url.clone(),
            },
        );
        Ok(meeting)
    }

    pub fn list_meetings(&self, actor: &Actor) -> MarketResult<Vec<Meeting>> {
        Ok(self
            .db
            .list_meetings()?
            .into_iter()
            .filter(|m| actor.is_admin() || m.involves(&actor.id))
            .collect())
    }

    pub fn start_meeting(&self, actor: &Actor, id: &str) -> MarketResult<Meeting> {
        self.move_meeting(actor, id, MeetingStatus::InProgress)
    }

    pub fn complete_meeting(&self, actor: &Actor, id: &str) -> MarketResult<Meeting> {
        self.move_meeting(actor, id, MeetingStatus::Completed)
    }

    pub fn cancel_meeting(&self, actor: &Actor, id: &str) -> MarketResult<Meeting> {
        self.move_meeting(actor, id, MeetingStatus::Cancelled)
    }

    fn move_meeting(&self, actor: &Actor, id: &str, next: MeetingStatus) -> MarketResult<Meeting> {
        let mut meeting = self
            .db
            .find_meeting(id)?
            .filter(|m| actor.is_admin() || m.involves(&actor.id))
            .ok_or_else(|| MarketError::not_found("Meeting", id))?;
        if !actor.is_admin() && meeting.organizer_id != actor.id {
            return Err(MarketError::Forbidden(
                "Only the organizer can change this meeting".into(),
            ));
        }
        if !meeting.status.can_move_to(next) {
            return Err(MarketError::Conflict(format!(
                "Cannot move meeting from {} to {}",
                meeting.status.as_str(),
                next.as_str()
            )));
        }

        self.db.set_meeting_status(&meeting.id, next)?;
        meeting.status = next;
        self.publish(
            Audience::Participants(everyone_in(&meeting)),
            MarketEvent::MeetingStatusChanged {
                meeting_id: meeting.id.clone(),
                status: next,
            },
        );
        Ok(meeting)
    }
}

fn everyone_in(meeting: &Meeting) -> Vec<String> {
    let mut ids = vec![meeting.organizer_id.clone()];
    ids.extend(meeting.participant_ids.iter().cloned());
    ids
}
