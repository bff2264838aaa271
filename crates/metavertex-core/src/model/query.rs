// Founder questions addressed to an investor, released after admin review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Decision, ReviewStatus};

/// The questions a founder may pick from.
pub const FOUNDER_QUESTIONS: [&str; 8] = [
    "Clarify Investor Requirements",
    "Investment Criteria",
    "Value-Add Beyond Funding",
    "Time Horizon",
    "Portfolio Companies",
    "Decision Process",
    "Market Insights",
    "Next Steps",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FounderQuery {
    pub id: String,
    pub founder_id: String,
    pub investor_id: String,
    pub product_id: String,
    pub questions: Vec<String>,
    pub specific_questions: String,
    pub admin_text: Option<String>,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewFounderQuery {
    pub product_id: String,
    pub investor_id: String,
    pub questions: Vec<String>,
    pub specific_questions: String,
}

impl NewFounderQuery {
    /// Deduplicated questions in submission order, or every validation failure.
    pub fn validate(&self) -> Result<Vec<String>, Vec<String>> {
        let mut errors = Vec::new();
        let mut questions: Vec<String> = Vec::new();

        for q in &self.questions {
            let q = q.trim();
            if !FOUNDER_QUESTIONS.contains(&q) {
                errors.push(format!("Unknown question: {q}"));
            } else if !questions.iter().any(|existing| existing == q) {
                questions.push(q.to_string());
            }
        }
        if self.questions.is_empty() {
            errors.push("Please select at least one question to ask the investor".to_string());
        }
        if self.product_id.trim().is_empty() {
            errors.push("Product is required".to_string());
        }
        if self.investor_id.trim().is_empty() {
            errors.push("Investor is required".to_string());
        }

        if errors.is_empty() {
            Ok(questions)
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryReview {
    pub decision: Decision,
    #[serde(default)]
    pub questions: Option<Vec<String>>,
    #[serde(default)]
    pub admin_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(questions: &[&str]) -> NewFounderQuery {
        NewFounderQuery {
            product_id: "p".into(),
            investor_id: "i".into(),
            questions: questions.iter().map(|s| s.to_string()).collect(),
            specific_questions: String::new(),
        }
    }

    #[test]
    fn requires_at_least_one_question() {
        let errors = query(&[]).validate().unwrap_err();
        assert_eq!(
            errors,
            vec!["Please select at least one question to ask the investor".to_string()]
        );
    }

    #[test]
    fn rejects_free_form_questions() {
        let errors = query(&["What's your phone number?"]).validate().unwrap_err();
        assert!(errors[0].starts_with("Unknown question"));
    }

    #[test]
    fn duplicates_collapse() {
        let questions = query(&["Next Steps", "Time Horizon", "Next Steps"])
            .validate()
            .unwrap();
        assert_eq!(questions, vec!["Next Steps", "Time Horizon"]);
    }
}
