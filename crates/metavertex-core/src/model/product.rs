// Products (startups) submitted by founders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ReviewStatus;

/// Long-form pitch details. Every field is free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetailedInfo {
    pub problem_statement: String,
    pub solution_description: String,
    pub market_size: String,
    pub unique_value: String,
    pub business_model: String,
    pub revenue_model: String,
    pub target_market: String,
    pub competitive_advantage: String,
    pub team_size: String,
    pub key_team_members: String,
    pub advisors: String,
    pub current_revenue: String,
    pub projected_revenue: String,
    pub funding_history: String,
    pub use_of_funds: String,
    pub technology_stack: String,
    pub intellectual_property: String,
    pub development_stage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub founder_id: String,
    pub founder_unique_id: String,
    pub product_name: String,
    pub category: String,
    pub description: String,
    pub problem: String,
    pub solution: String,
    pub benefits: Vec<String>,
    pub funding_required: u64,
    pub current_stage: String,
    pub status: ReviewStatus,
    pub submitted_at: DateTime<Utc>,
    pub views: u64,
    pub interests: u64,
    pub image: Option<String>,
    pub detailed_info: Option<DetailedInfo>,
    pub admin_notes: Option<String>,
}

/// Largest funding amount the store can hold.
pub const MAX_FUNDING: u64 = i64::MAX as u64;

/// Founder's product submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewProduct {
    pub product_name: String,
    pub category: String,
    pub description: String,
    pub current_stage: String,
    pub funding_required: Option<u64>,
    pub problem: String,
    pub solution: String,
    pub benefits: Vec<String>,
    pub image: Option<String>,
    pub detailed_info: Option<DetailedInfo>,
}

impl NewProduct {
    /// Collect every missing required field. An empty list means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.product_name.trim().is_empty() {
            errors.push("Product name is required".to_string());
        }
        if self.category.trim().is_empty() {
            errors.push("Category is required".to_string());
        }
        if self.current_stage.trim().is_empty() {
            errors.push("Development stage is required".to_string());
        }
        match self.funding_required {
            None | Some(0) => errors.push("Funding requirement is required".to_string()),
            Some(amount) if amount > MAX_FUNDING => {
                errors.push(format!("Funding requirement must not exceed {MAX_FUNDING}"))
            }
            Some(_) => {}
        }
        if self.problem.trim().is_empty() {
            errors.push("Problem statement is required".to_string());
        }
        if self.solution.trim().is_empty() {
            errors.push("Solution description is required".to_string());
        }
        errors
    }
}

/// Optional narrowing applied on top of role visibility.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductFilter {
    /// Case-insensitive substring of name or description.
    pub q: Option<String>,
    pub category: Option<String>,
    pub status: Option<ReviewStatus>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let q = q.to_lowercase();
            if !product.product_name.to_lowercase().contains(&q)
                && !product.description.to_lowercase().contains(&q)
            {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref().filter(|c| *c != "all") {
            if product.category != category {
                return false;
            }
        }
        if let Some(status) = self.status {
            if product.status != status {
                return false;
            }
        }
        true
    }
}

/// Admin verdict on a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReview {
    pub decision: super::Decision,
    #[serde(default)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_submission() -> NewProduct {
        NewProduct {
            product_name: "Hydroponics Revolution".into(),
            category: "AgriTech".into(),
            description: "Soilless growing systems".into(),
            current_stage: "MVP".into(),
            funding_required: Some(500_000),
            problem: "Farming wastes water".into(),
            solution: "AI-managed hydroponics".into(),
            ..Default::default()
        }
    }

    fn product(name: &str, description: &str, category: &str) -> Product {
        Product {
            id: "p".into(),
            founder_id: "f".into(),
            founder_unique_id: "FNB-001".into(),
            product_name: name.into(),
            category: category.into(),
            description: description.into(),
            problem: String::new(),
            solution: String::new(),
            benefits: vec![],
            funding_required: 1,
            current_stage: "MVP".into(),
            status: ReviewStatus::Approved,
            submitted_at: Utc::now(),
            views: 0,
            interests: 0,
            image: None,
            detailed_info: None,
            admin_notes: None,
        }
    }

    #[test]
    fn complete_submission_is_valid() {
        assert!(complete_submission().validate().is_empty());
    }

    #[test]
    fn empty_submission_reports_every_required_field() {
        let errors = NewProduct::default().validate();
        assert_eq!(errors.len(), 6);
        assert!(errors.contains(&"Product name is required".to_string()));
        assert!(errors.contains(&"Funding requirement is required".to_string()));
    }

    #[test]
    fn whitespace_name_counts_as_missing() {
        let sub = NewProduct {
            product_name: "   ".into(),
            ..complete_submission()
        };
        assert_eq!(sub.validate(), vec!["Product name is required".to_string()]);
    }

    #[test]
    fn zero_funding_is_rejected() {
        let sub = NewProduct {
            funding_required: Some(0),
            ..complete_submission()
        };
        assert_eq!(
            sub.validate(),
            vec!["Funding requirement is required".to_string()]
        );
    }

    #[test]
    fn funding_beyond_storable_range_is_rejected() {
        let sub = NewProduct {
            funding_required: Some(10_000_000_000_000_000_000),
            ..complete_submission()
        };
        assert_eq!(
            sub.validate(),
            vec![format!("Funding requirement must not exceed {MAX_FUNDING}")]
        );

        let at_limit = NewProduct {
            funding_required: Some(MAX_FUNDING),
            ..complete_submission()
        };
        assert!(at_limit.validate().is_empty());
    }

    #[test]
    fn filter_searches_name_and_description_case_insensitively() {
        let p = product("ECG Smart Monitor", "AI-powered heart monitoring", "HealthTech");
        let by_name = ProductFilter {
            q: Some("smart".into()),
            ..Default::default()
        };
        let by_description = ProductFilter {
            q: Some("HEART".into()),
            ..Default::default()
        };
        let miss = ProductFilter {
            q: Some("farm".into()),
            ..Default::default()
        };
        assert!(by_name.matches(&p));
        assert!(by_description.matches(&p));
        assert!(!miss.matches(&p));
    }

    #[test]
    fn category_all_matches_everything() {
        let p = product("A", "B", "HealthTech");
        let all = ProductFilter {
            category: Some("all".into()),
            ..Default::default()
        };
        let other = ProductFilter {
            category: Some("AgriTech".into()),
            ..Default::default()
        };
        assert!(all.matches(&p));
        assert!(!other.matches(&p));
    }
}
