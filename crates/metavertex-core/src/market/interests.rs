// Investor interest: submission, the admin review queue and release to the
// founder.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::{non_blank, require_admin, require_role, Marketplace};
use crate::error::{MarketError, MarketResult};
use crate::events::{Audience, MarketEvent};
use crate::filter::{self, ContactKind};
use crate::model::interest::{interest_message, Interest, InterestReview, NewInterest};
use crate::model::user::{Actor, UserType};
use crate::model::{new_id, Decision, ReviewStatus};

/// A pending interest with the context an admin needs to review it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInterest {
    #[serde(flatten)]
    pub interest: Interest,
    pub product_name: String,
    pub investor_email: String,
    pub investor_unique_id: String,
    pub founder_email: String,
    /// Kinds of contact detail found in the investor's free text.
    pub contact_flags: Vec<ContactKind>,
}

impl Marketplace {
    pub fn express_interest(&self, actor: &Actor, input: NewInterest) -> MarketResult<Interest> {
        require_role(actor, UserType::Investor, "Only investors can express interest")?;
        let (primary_intent, areas) = input.validate().map_err(MarketError::Invalid)?;

        let product = self.visible_product(actor, input.product_id.trim())?;
        if self.db.interest_exists(&actor.id, &product.id)? {
            return Err(already_expressed());
        }

        let interest = Interest {
            id: new_id(),
            investor_id: actor.id.clone(),
            product_id: product.id.clone(),
            primary_intent,
            message: interest_message(primary_intent, &areas),
            areas_of_interest: areas,
            specific_questions: input.specific_questions.trim().to_string(),
            admin_text: None,
            status: ReviewStatus::Pending,
            created_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
        };
        // Lost a race with a concurrent submission.
        if !self.db.insert_interest(&interest)? {
            return Err(already_expressed());
        }

        info!(
            "{} expressed interest in product {}",
            actor.unique_id, product.id
        );
        self.publish(
            Audience::Admins,
            MarketEvent::NewInvestorInterest {
                interest_id: interest.id.clone(),
                product_id: product.id.clone(),
                product_name: product.product_name.clone(),
                investor_unique_id: actor.unique_id.clone(),
            },
        );
        Ok(interest)
    }

    /// Investors see their own interests. Founders see only released
    /// (approved) interests on their products, without the investor's raw
    /// free text. Admins see everything.
    pub fn list_interests(&self, actor: &Actor) -> MarketResult<Vec<Interest>> {
        let all = self.db.list_interests()?;
        let visible = match actor.user_type {
            UserType::Admin | UserType::Superadmin => all,
            UserType::Investor => all
                .into_iter()
                .filter(|i| i.investor_id == actor.id)
                .collect(),
            UserType::Founder => {
                let own: HashSet<String> = self
                    .db
                    .list_products(Some(&actor.id))?
                    .into_iter()
                    .map(|p| p.id)
                    .collect();
                all.into_iter()
                    .filter(|i| i.status == ReviewStatus::Approved && own.contains(&i.product_id))
                    .map(released_to_founder)
                    .collect()
            }
            UserType::Organization | UserType::Mentor => Vec::new(),
        };
        Ok(visible)
    }

    pub fn pending_reviews(&self, actor: &Actor) -> MarketResult<Vec<PendingInterest>> {
        require_admin(actor)?;
        let products: HashMap<String, _> = self
            .db
            .list_products(None)?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        let users: HashMap<String, _> = self
            .db
            .list_users(None, None)?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let mut pending = Vec::new();
        for interest in self.db.list_interests()? {
            if interest.status != ReviewStatus::Pending {
                continue;
            }
            let product = products.get(&interest.product_id);
            let investor = users.get(&interest.investor_id);
            let founder = product.and_then(|p| users.get(&p.founder_id));

            let mut contact_flags: Vec<ContactKind> = Vec::new();
            for found in filter::scan(&interest.specific_questions) {
                if !contact_flags.contains(&found.kind) {
                    contact_flags.push(found.kind);
                }
            }

            pending.push(PendingInterest {
                product_name: product.map(|p| p.product_name.clone()).unwrap_or_default(),
                investor_email: investor.map(|u| u.email.clone()).unwrap_or_default(),
                investor_unique_id: investor.map(|u| u.unique_id.clone()).unwrap_or_default(),
                founder_email: founder.map(|u| u.email.clone()).unwrap_or_default(),
                contact_flags,
                interest,
            });
        }
        Ok(pending)
    }

    /// Approve (optionally rewording) or reject a pending interest. Released
    /// text always passes through the contact filter.
    pub fn review_interest(
        &self,
        actor: &Actor,
        id: &str,
        review: InterestReview,
    ) -> MarketResult<Interest> {
        require_admin(actor)?;
        let mut interest = self
            .db
            .find_interest(id)?
            .ok_or_else(|| MarketError::not_found("Interest", id))?;
        if interest.status != ReviewStatus::Pending {
            return Err(MarketError::Conflict(format!(
                "Interest has already been {}",
                interest.status
            )));
        }

        if review.decision == Decision::Approve {
            if let Some(intent) = review.primary_intent {
                interest.primary_intent = intent;
            }
            if let Some(areas) = review.areas_of_interest {
                let areas: Vec<String> = areas
                    .iter()
                    .filter_map(|a| non_blank(Some(a.as_str())))
                    .collect();
                if areas.is_empty() {
                    return Err(MarketError::invalid(
                        "At least one area of interest is required",
                    ));
                }
                interest.areas_of_interest = areas;
            }
            interest.message =
                interest_message(interest.primary_intent, &interest.areas_of_interest);
            interest.admin_text = non_blank(review.admin_text.as_deref())
                .or_else(|| non_blank(Some(interest.specific_questions.as_str())))
                .map(|text| filter::redact(&text));
        }
        interest.status = review.decision.outcome();
        interest.reviewed_at = Some(Utc::now());
        interest.reviewed_by = Some(actor.id.clone());
        self.db.update_interest_review(&interest)?;

        self.audit(
            actor,
            "interest_reviewed",
            Some(&interest.id),
            serde_json::json!({ "status": interest.status, "productId": interest.product_id }),
        )?;

        let mut audience = vec![interest.investor_id.clone()];
        if interest.status == ReviewStatus::Approved {
            if let Some(product) = self.db.find_product(&interest.product_id)? {
                audience.push(product.founder_id);
            }
        }
        info!("interest {} {} by {}", interest.id, interest.status, actor.unique_id);
        self.publish(
            Audience::Participants(audience),
            MarketEvent::InterestReviewed {
                interest_id: interest.id.clone(),
                product_id: interest.product_id.clone(),
                status: interest.status,
            },
        );
        Ok(interest)
    }
}

fn already_expressed() -> MarketError {
    MarketError::Conflict("You have already expressed interest in this product".into())
}

/// The founder's view: the admin-approved text replaces the raw questions.
fn released_to_founder(mut interest: Interest) -> Interest {
    interest.specific_questions = String::new();
    interest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::testing::fixture;
    use crate::model::interest::PrimaryIntent;

    fn submission(product_id: &str, intent: Option<&str>) -> NewInterest {
        NewInterest {
            product_id: product_id.into(),
            primary_intent: intent.map(String::from),
            areas_of_interest: vec!["Financials & Valuation".into(), "Technology & IP".into()],
            specific_questions: "What is your burn? Email me at ada@example.com".into(),
        }
    }

    fn approve(admin_text: Option<&str>) -> InterestReview {
        InterestReview {
            decision: Decision::Approve,
            primary_intent: None,
            areas_of_interest: None,
            admin_text: admin_text.map(String::from),
        }
    }

    #[test]
    fn missing_primary_intent_is_rejected() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let investor = fx.member("i@example.com", UserType::Investor);
        let product = fx.product(&founder, "Target", true);

        match fx
            .market
            .express_interest(&investor, submission(&product.id, None))
        {
            Err(MarketError::Invalid(errors)) => {
                assert!(errors.contains(&"Primary intent is required".to_string()))
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(fx.market.list_interests(&investor).unwrap().is_empty());
    }

    #[test]
    fn interest_is_pending_counted_and_unique() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let investor = fx.member("i@example.com", UserType::Investor);
        let product = fx.product(&founder, "Target", true);

        let interest = fx
            .market
            .express_interest(&investor, submission(&product.id, Some("Equity Investment")))
            .unwrap();
        assert_eq!(interest.status, ReviewStatus::Pending);
        assert_eq!(
            interest.message,
            "Primary Intent: Equity Investment. Areas of Interest: Financials & Valuation, Technology & IP"
        );
        assert_eq!(
            fx.market.get_product(&fx.admin, &product.id).unwrap().interests,
            1
        );

        match fx
            .market
            .express_interest(&investor, submission(&product.id, Some("Debt Funding")))
        {
            Err(MarketError::Conflict(msg)) => {
                assert_eq!(msg, "You have already expressed interest in this product")
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn unapproved_products_and_non_investors_are_refused() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let investor = fx.member("i@example.com", UserType::Investor);
        let pending = fx.product(&founder, "Pending", false);

        assert!(matches!(
            fx.market
                .express_interest(&investor, submission(&pending.id, Some("Other"))),
            Err(MarketError::NotFound(_))
        ));
        assert!(matches!(
            fx.market
                .express_interest(&founder, submission(&pending.id, Some("Other"))),
            Err(MarketError::Forbidden(_))
        ));
    }

    #[test]
    fn founder_sees_interest_only_after_release_with_redacted_text() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let investor = fx.member("i@example.com", UserType::Investor);
        let product = fx.product(&founder, "Target", true);
        let interest = fx
            .market
            .express_interest(&investor, submission(&product.id, Some("Equity Investment")))
            .unwrap();

        assert!(fx.market.list_interests(&founder).unwrap().is_empty());

        let queue = fx.market.pending_reviews(&fx.admin).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].product_name, "Target");
        assert_eq!(queue[0].investor_email, "i@example.com");
        assert_eq!(queue[0].founder_email, "f@example.com");
        assert_eq!(queue[0].contact_flags, vec![ContactKind::Email]);

        let reviewed = fx
            .market
            .review_interest(&fx.admin, &interest.id, approve(None))
            .unwrap();
        assert_eq!(reviewed.status, ReviewStatus::Approved);
        assert_eq!(
            reviewed.admin_text.as_deref(),
            Some("What is your burn? Email me at [contact removed]")
        );
        assert_eq!(reviewed.reviewed_by.as_deref(), Some(fx.admin.id.as_str()));

        let released = fx.market.list_interests(&founder).unwrap();
        assert_eq!(released.len(), 1);
        assert!(released[0].specific_questions.is_empty());
        assert!(fx.market.pending_reviews(&fx.admin).unwrap().is_empty());
    }

    #[test]
    fn admin_may_reword_on_approval() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let investor = fx.member("i@example.com", UserType::Investor);
        let product = fx.product(&founder, "Target", true);
        let interest = fx
            .market
            .express_interest(&investor, submission(&product.id, Some("Other")))
            .unwrap();

        let reviewed = fx
            .market
            .review_interest(
                &fx.admin,
                &interest.id,
                InterestReview {
                    decision: Decision::Approve,
                    primary_intent: Some(PrimaryIntent::DebtFunding),
                    areas_of_interest: Some(vec!["Customer Acquisition".into()]),
                    admin_text: Some("Call +44 7700 900123 about churn".into()),
                },
            )
            .unwrap();
        assert_eq!(
            reviewed.message,
            "Primary Intent: Debt Funding. Areas of Interest: Customer Acquisition"
        );
        assert_eq!(
            reviewed.admin_text.as_deref(),
            Some("Call [contact removed] about churn")
        );
    }

    #[test]
    fn rejection_is_final_and_never_released() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let investor = fx.member("i@example.com", UserType::Investor);
        let product = fx.product(&founder, "Target", true);
        let interest = fx
            .market
            .express_interest(&investor, submission(&product.id, Some("Other")))
            .unwrap();

        let rejected = fx
            .market
            .review_interest(
                &fx.admin,
                &interest.id,
                InterestReview {
                    decision: Decision::Reject,
                    primary_intent: None,
                    areas_of_interest: None,
                    admin_text: None,
                },
            )
            .unwrap();
        assert_eq!(rejected.status, ReviewStatus::Rejected);
        assert!(rejected.admin_text.is_none());
        assert!(fx.market.list_interests(&founder).unwrap().is_empty());
        assert!(matches!(
            fx.market
                .review_interest(&fx.admin, &interest.id, approve(None)),
            Err(MarketError::Conflict(_))
        ));
    }
}
