// Founder-to-investor questions, released only after admin review.

use chrono::Utc;
use tracing::info;

use super::{non_blank, require_admin, require_role, Marketplace};
use crate::error::{MarketError, MarketResult};
use crate::events::{Audience, MarketEvent};
use crate::filter;
use crate::model::query::{FounderQuery, NewFounderQuery, QueryReview, FOUNDER_QUESTIONS};
use crate::model::user::{Actor, UserType};
use crate::model::{new_id, Decision, ReviewStatus};

impl Marketplace {
    pub fn submit_query(&self, actor: &Actor, input: NewFounderQuery) -> MarketResult<FounderQuery> {
        require_role(actor, UserType::Founder, "Only founders can ask investors questions")?;
        let questions = input.validate().map_err(MarketError::Invalid)?;

        let product = self
            .db
            .find_product(input.product_id.trim())?
            .ok_or_else(|| MarketError::not_found("Product", input.product_id.trim()))?;
        if product.founder_id != actor.id {
            return Err(MarketError::Forbidden(
                "You can only ask questions about your own products".into(),
            ));
        }
        let investor = self.load_user(input.investor_id.trim())?;
        if investor.user_type != UserType::Investor {
            return Err(MarketError::invalid("Questions can only be sent to investors"));
        }

        let query = FounderQuery {
            id: new_id(),
            founder_id: actor.id.clone(),
            investor_id: investor.id.clone(),
            product_id: product.id.clone(),
            questions,
            specific_questions: input.specific_questions.trim().to_string(),
            admin_text: None,
            status: ReviewStatus::Pending,
            created_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
        };
        self.db.insert_query(&query)?;

        info!(
            "{} asked {} about product {}",
            actor.unique_id, investor.unique_id, product.id
        );
        self.publish(
            Audience::Admins,
            MarketEvent::NewFounderQuery {
                query_id: query.id.clone(),
                product_id: product.id,
            },
        );
        Ok(query)
    }

    /// Founders see their own queries; investors see released queries sent
    /// to them (admin text only); admins see everything.
    pub fn list_queries(&self, actor: &Actor) -> MarketResult<Vec<FounderQuery>> {
        let all = self.db.list_queries()?;
        let visible = match actor.user_type {
            UserType::Admin | UserType::Superadmin => all,
            UserType::Founder => all
                .into_iter()
                .filter(|q| q.founder_id == actor.id)
                .collect(),
            UserType::Investor => all
                .into_iter()
                .filter(|q| q.investor_id == actor.id && q.status == ReviewStatus::Approved)
                .map(|mut q| {
                    q.specific_questions = String::new();
                    q
                })
                .collect(),
            UserType::Organization | UserType::Mentor => Vec::new(),
        };
        Ok(visible)
    }

    pub fn review_query(
        &self,
        actor: &Actor,
        id: &str,
        review: QueryReview,
    ) -> MarketResult<FounderQuery> {
        require_admin(actor)?;
        let mut query = self
            .db
            .find_query(id)?
            .ok_or_else(|| MarketError::not_found("Query", id))?;
        if query.status != ReviewStatus::Pending {
            return Err(MarketError::Conflict(format!(
                "Query has already been {}",
                query.status
            )));
        }

        if review.decision == Decision::Approve {
            if let Some(questions) = review.questions {
                query.questions = NewFounderQuery {
                    questions,
                    product_id: query.product_id.clone(),
                    investor_id: query.investor_id.clone(),
                    specific_questions: String::new(),
                }
                .validate()
                .map_err(MarketError::Invalid)?;
            }
            query.admin_text = non_blank(review.admin_text.as_deref())
                .or_else(|| non_blank(Some(query.specific_questions.as_str())))
                .map(|text| filter::redact(&text));
        }
        query.status = review.decision.outcome();
        query.reviewed_at = Some(Utc::now());
        query.reviewed_by = Some(actor.id.clone());
        self.db.update_query_review(&query)?;

        self.audit(
            actor,
            "query_reviewed",
            Some(&query.id),
            serde_json::json!({ "status": query.status, "questions": query.questions.len() }),
        )?;

        let mut audience = vec![query.founder_id.clone()];
        if query.status == ReviewStatus::Approved {
            audience.push(query.investor_id.clone());
        }
        info!("query {} {} by {}", query.id, query.status, actor.unique_id);
        self.publish(
            Audience::Participants(audience),
            MarketEvent::QueryReviewed {
                query_id: query.id.clone(),
                status: query.status,
            },
        );
        Ok(query)
    }

    /// The fixed question list founders pick from.
    pub fn founder_questions(&self) -> &'static [&'static str] {
        &FOUNDER_QUESTIONS
    }
}
