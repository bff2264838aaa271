// Structured investor interest in a product.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Decision, ReviewStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimaryIntent {
    #[serde(rename = "Equity Investment")]
    EquityInvestment,
    #[serde(rename = "Debt Funding")]
    DebtFunding,
    #[serde(rename = "Other")]
    Other,
}

impl PrimaryIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryIntent::EquityInvestment => "Equity Investment",
            PrimaryIntent::DebtFunding => "Debt Funding",
            PrimaryIntent::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Equity Investment" => Some(PrimaryIntent::EquityInvestment),
            "Debt Funding" => Some(PrimaryIntent::DebtFunding),
            "Other" => Some(PrimaryIntent::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interest {
    pub id: String,
    pub investor_id: String,
    pub product_id: String,
    pub primary_intent: PrimaryIntent,
    pub areas_of_interest: Vec<String>,
    pub specific_questions: String,
    pub message: String,
    /// Admin-approved wording released to the founder.
    pub admin_text: Option<String>,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
}

/// Investor's submission. `primary_intent` is optional here so a missing
/// value surfaces as a validation error instead of a malformed payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewInterest {
    pub product_id: String,
    pub primary_intent: Option<String>,
    pub areas_of_interest: Vec<String>,
    pub specific_questions: String,
}

impl NewInterest {
    /// Validate and return the parsed intent and the cleaned areas.
    pub fn validate(&self) -> Result<(PrimaryIntent, Vec<String>), Vec<String>> {
        let mut errors = Vec::new();

        let intent = match self.primary_intent.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push("Primary intent is required".to_string());
                None
            }
            Some(raw) => match PrimaryIntent::parse(raw) {
                Some(intent) => Some(intent),
                None => {
                    errors.push(format!("Unknown primary intent: {raw}"));
                    None
                }
            },
        };

        let areas: Vec<String> = self
            .areas_of_interest
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if areas.is_empty() {
            errors.push("At least one area of interest is required".to_string());
        }

        if self.product_id.trim().is_empty() {
            errors.push("Product is required".to_string());
        }

        match intent {
            Some(intent) if errors.is_empty() => Ok((intent, areas)),
            _ => Err(errors),
        }
    }
}

/// Summary line shown to the founder and admins.
pub fn interest_message(intent: PrimaryIntent, areas: &[String]) -> String {
    format!(
        "Primary Intent: {}. Areas of Interest: {}",
        intent.as_str(),
        areas.join(", ")
    )
}

/// Admin review of a mediated record (interest or founder query). On
/// approval the admin may reword the content before it is released.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestReview {
    pub decision: Decision,
    #[serde(default)]
    pub primary_intent: Option<PrimaryIntent>,
    #[serde(default)]
    pub areas_of_interest: Option<Vec<String>>,
    #[serde(default)]
    pub admin_text: Option<String>,
}
