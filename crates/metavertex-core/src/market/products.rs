// Product submission, review and role-scoped browsing.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::info;

use super::{non_blank, require_admin, require_role, Marketplace};
use crate::error::{MarketError, MarketResult};
use crate::events::{Audience, MarketEvent};
use crate::model::product::{NewProduct, Product, ProductFilter, ProductReview};
use crate::model::user::{Actor, UserType};
use crate::model::{new_id, ReviewStatus};

/// Founders see only their own products, admins see everything and every
/// other role sees approved products only.
pub(crate) fn can_view_product(actor: &Actor, product: &Product) -> bool {
    match actor.user_type {
        UserType::Admin | UserType::Superadmin => true,
        UserType::Founder => product.founder_id == actor.id,
        _ => product.status == ReviewStatus::Approved,
    }
}

impl Marketplace {
    pub fn submit_product(&self, actor: &Actor, input: NewProduct) -> MarketResult<Product> {
        require_role(actor, UserType::Founder, "Only founders can submit products")?;
        let errors = input.validate();
        if !errors.is_empty() {
            return Err(MarketError::Invalid(errors));
        }

        let product = Product {
            id: new_id(),
            founder_id: actor.id.clone(),
            founder_unique_id: actor.unique_id.clone(),
            product_name: input.product_name.trim().to_string(),
            category: input.category.trim().to_string(),
            description: input.description.trim().to_string(),
            problem: input.problem.trim().to_string(),
            solution: input.solution.trim().to_string(),
            benefits: input
                .benefits
                .iter()
                .filter_map(|b| non_blank(Some(b.as_str())))
                .collect(),
            funding_required: input.funding_required.unwrap_or_default(),
            current_stage: input.current_stage.trim().to_string(),
            status: ReviewStatus::Pending,
            submitted_at: Utc::now(),
            views: 0,
            interests: 0,
            image: non_blank(input.image.as_deref()),
            detailed_info: input.detailed_info,
            admin_notes: None,
        };
        self.db.insert_product(&product)?;

        info!("{} submitted product {}", actor.unique_id, product.id);
        self.publish(
            Audience::Admins,
            MarketEvent::NewProduct {
                product_id: product.id.clone(),
                product_name: product.product_name.clone(),
                founder_unique_id: product.founder_unique_id.clone(),
            },
        );
        Ok(product)
    }

    pub fn list_products(&self, actor: &Actor, filter: &ProductFilter) -> MarketResult<Vec<Product>> {
        let scope = (actor.user_type == UserType::Founder).then_some(actor.id.as_str());
        Ok(self
            .db
            .list_products(scope)?
            .into_iter()
            .filter(|p| can_view_product(actor, p) && filter.matches(p))
            .collect())
    }

    pub fn my_products(&self, actor: &Actor) -> MarketResult<Vec<Product>> {
        require_role(actor, UserType::Founder, "Only founders have products")?;
        Ok(self.db.list_products(Some(&actor.id))?)
    }

    /// Load one product. Anyone other than the owner or an admin counts as a
    /// view. Invisible products are reported as missing.
    pub fn get_product(&self, actor: &Actor, id: &str) -> MarketResult<Product> {
        let mut product = self.visible_product(actor, id)?;
        if !actor.is_admin() && product.founder_id != actor.id {
            self.db.increment_product_views(&product.id)?;
            product.views += 1;
        }
        Ok(product)
    }

    pub(crate) fn visible_product(&self, actor: &Actor, id: &str) -> MarketResult<Product> {
        self.db
            .find_product(id)?
            .filter(|p| can_view_product(actor, p))
            .ok_or_else(|| MarketError::not_found("Product", id))
    }

    pub fn review_product(
        &self,
        actor: &Actor,
        id: &str,
        review: ProductReview,
    ) -> MarketResult<Product> {
        require_admin(actor)?;
        let product = self
            .db
            .find_product(id)?
            .ok_or_else(|| MarketError::not_found("Product", id))?;
        if product.status != ReviewStatus::Pending {
            return Err(MarketError::Conflict(format!(
                "Product has already been {}",
                product.status
            )));
        }

        let status = review.decision.outcome();
        let notes = non_blank(review.notes.as_deref());
        self.db
            .set_product_status(&product.id, status, notes.as_deref())?;
        self.audit(
            actor,
            "product_reviewed",
            Some(&product.id),
            serde_json::json!({ "status": status, "notes": notes }),
        )?;

        let product = self
            .db
            .find_product(id)?
            .ok_or_else(|| MarketError::not_found("Product", id))?;
        info!("product {} {} by {}", product.id, status, actor.unique_id);
        self.publish(
            Audience::Participants(vec![product.founder_id.clone()]),
            MarketEvent::ProductStatusChanged {
                product_id: product.id.clone(),
                product_name: product.product_name.clone(),
                status,
            },
        );
        Ok(product)
    }

    /// Distinct categories of the products visible to `actor`, sorted.
    pub fn categories(&self, actor: &Actor) -> MarketResult<Vec<String>> {
        let categories: BTreeSet<String> = self
            .list_products(actor, &ProductFilter::default())?
            .into_iter()
            .map(|p| p.category)
            .collect();
        Ok(categories.into_iter().collect())
    }
}
