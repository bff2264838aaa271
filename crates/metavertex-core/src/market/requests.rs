// Contact requests between users and their admin-gated lifecycle.

use chrono::Utc;
use tracing::info;

use super::{non_blank, Marketplace};
use crate::error::{MarketError, MarketResult};
use crate::events::{Audience, MarketEvent};
use crate::model::request::{NewRequest, Request, RequestStatus, StatusChange, TransitionAuthority};
use crate::model::user::Actor;
use crate::model::{new_id, ReviewStatus};

impl Marketplace {
    /// Open a request to a product's founder (`product_id`) or directly to a
    /// user (`to_user_id`). Every request starts pending admin approval.
    pub fn create_request(&self, actor: &Actor, input: NewRequest) -> MarketResult<Request> {
        let product_id = non_blank(input.product_id.as_deref());
        let to_user_id = non_blank(input.to_user_id.as_deref());

        let (recipient_id, product) = match (product_id, to_user_id) {
            (Some(product_id), _) => {
                let product = self.visible_product(actor, &product_id)?;
                if product.status != ReviewStatus::Approved {
                    return Err(MarketError::Conflict(
                        "Requests can only be made for approved products".into(),
                    ));
                }
                (product.founder_id.clone(), Some(product))
            }
            (None, Some(user_id)) => {
                let user = self.load_user(&user_id)?;
                (user.id, None)
            }
            (None, None) => {
                return Err(MarketError::invalid(
                    "Either a product or a recipient is required",
                ))
            }
        };
        if recipient_id == actor.id {
            return Err(MarketError::invalid("You cannot send a request to yourself"));
        }

        let message = non_blank(input.message.as_deref()).unwrap_or_else(|| match &product {
            Some(p) => format!(
                "Contact request via {} for {}",
                input.contact_method.as_str(),
                p.product_name
            ),
            None => format!("Contact request via {}", input.contact_method.as_str()),
        });

        let now = Utc::now();
        let request = Request {
            id: new_id(),
            from_user_id: actor.id.clone(),
            to_user_id: recipient_id,
            product_id: product.map(|p| p.id),
            kind: input.kind,
            message,
            contact_method: input.contact_method,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
            admin_notes: None,
        };
        self.db.insert_request(&request)?;

        info!(
            "{} opened {} request {}",
            actor.unique_id,
            request.kind.as_str(),
            request.id
        );
        self.publish(
            Audience::Admins,
            MarketEvent::NewContactRequest {
                request_id: request.id.clone(),
                from_user_id: request.from_user_id.clone(),
                to_user_id: request.to_user_id.clone(),
            },
        );
        Ok(request)
    }

    /// Admins see every request; everyone else sees the ones they sent or
    /// received.
    pub fn list_requests(&self, actor: &Actor) -> MarketResult<Vec<Request>> {
        let party = (!actor.is_admin()).then_some(actor.id.as_str());
        Ok(self.db.list_requests(party)?)
    }

    /// Move one request along its lifecycle. Only that request changes.
    pub fn change_request_status(
        &self,
        actor: &Actor,
        id: &str,
        change: StatusChange,
    ) -> MarketResult<Request> {
        let request = self
            .db
            .find_request(id)?
            .filter(|r| actor.is_admin() || r.involves(&actor.id))
            .ok_or_else(|| MarketError::not_found("Request", id))?;

        let next = change.status;
        let authority = request.status.transition(next).ok_or_else(|| {
            MarketError::Conflict(format!(
                "Cannot move request from {} to {}",
                request.status, next
            ))
        })?;
        if authority == TransitionAuthority::AdminOnly && !actor.is_admin() {
            return Err(MarketError::Forbidden(
                "Only admins can approve or reject requests".into(),
            ));
        }

        let notes = if actor.is_admin() {
            non_blank(change.admin_notes.as_deref())
        } else {
            None
        };
        self.db
            .set_request_status(&request.id, next, notes.as_deref(), Utc::now())?;
        if actor.is_admin() {
            self.audit(
                actor,
                "request_status_changed",
                Some(&request.id),
                serde_json::json!({ "from": request.status, "to": next, "notes": notes }),
            )?;
        }

        let updated = self
            .db
            .find_request(id)?
            .ok_or_else(|| MarketError::not_found("Request", id))?;
        info!(
            "request {} {} -> {} by {}",
            updated.id, request.status, next, actor.unique_id
        );
        self.publish(
            Audience::Participants(vec![
                updated.from_user_id.clone(),
                updated.to_user_id.clone(),
            ]),
            MarketEvent::RequestStatusChanged {
                request_id: updated.id.clone(),
                status: next,
            },
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::testing::fixture;
    use crate::model::request::{ContactMethod, RequestKind};
    use crate::model::user::UserType;

    fn to_product(product_id: &str) -> NewRequest {
        NewRequest {
            to_user_id: None,
            product_id: Some(product_id.into()),
            kind: RequestKind::Contact,
            contact_method: ContactMethod::Email,
            message: None,
        }
    }

    fn to_user(user_id: &str) -> NewRequest {
        NewRequest {
            to_user_id: Some(user_id.into()),
            product_id: None,
            kind: RequestKind::Meeting,
            contact_method: ContactMethod::Zoom,
            message: Some("Coffee?".into()),
        }
    }

    fn change(status: RequestStatus) -> StatusChange {
        StatusChange {
            status,
            admin_notes: None,
        }
    }

    #[test]
    fn product_request_goes_to_founder_with_default_message() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let investor = fx.member("i@example.com", UserType::Investor);
        let product = fx.product(&founder, "Hydro", true);

        let request = fx
            .market
            .create_request(&investor, to_product(&product.id))
            .unwrap();
        assert_eq!(request.to_user_id, founder.id);
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.message, "Contact request via email for Hydro");
    }

    #[test]
    fn approving_one_request_leaves_others_untouched() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let investor = fx.member("i@example.com", UserType::Investor);
        let mentor = fx.member("m@example.com", UserType::Mentor);
        let product = fx.product(&founder, "Hydro", true);

        let first = fx
            .market
            .create_request(&investor, to_product(&product.id))
            .unwrap();
        let second = fx
            .market
            .create_request(&mentor, to_product(&product.id))
            .unwrap();
        let third = fx
            .market
            .create_request(&investor, to_user(&mentor.id))
            .unwrap();

        let approved = fx
            .market
            .change_request_status(
                &fx.admin,
                &first.id,
                StatusChange {
                    status: RequestStatus::Approved,
                    admin_notes: Some("Looks legitimate".into()),
                },
            )
            .unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.admin_notes.as_deref(), Some("Looks legitimate"));

        for other in [&second, &third] {
            let reloaded = fx.market.db().find_request(&other.id).unwrap().unwrap();
            assert_eq!(reloaded.status, RequestStatus::Pending);
        }
    }

    #[test]
    fn participants_cannot_approve_but_can_progress() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let investor = fx.member("i@example.com", UserType::Investor);
        let product = fx.product(&founder, "Hydro", true);
        let request = fx
            .market
            .create_request(&investor, to_product(&product.id))
            .unwrap();

        assert!(matches!(
            fx.market
                .change_request_status(&founder, &request.id, change(RequestStatus::Approved)),
            Err(MarketError::Forbidden(_))
        ));
        // Skipping approval is not a valid move for anyone.
        assert!(matches!(
            fx.market
                .change_request_status(&fx.admin, &request.id, change(RequestStatus::Ongoing)),
            Err(MarketError::Conflict(_))
        ));

        fx.market
            .change_request_status(&fx.admin, &request.id, change(RequestStatus::Approved))
            .unwrap();
        fx.market
            .change_request_status(&founder, &request.id, change(RequestStatus::Ongoing))
            .unwrap();
        let done = fx
            .market
            .change_request_status(&investor, &request.id, change(RequestStatus::Completed))
            .unwrap();
        assert_eq!(done.status, RequestStatus::Completed);
    }

    #[test]
    fn outsiders_cannot_see_or_touch_requests() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let investor = fx.member("i@example.com", UserType::Investor);
        let outsider = fx.member("o@example.com", UserType::Organization);
        let product = fx.product(&founder, "Hydro", true);
        let request = fx
            .market
            .create_request(&investor, to_product(&product.id))
            .unwrap();

        assert!(fx.market.list_requests(&outsider).unwrap().is_empty());
        assert_eq!(fx.market.list_requests(&founder).unwrap().len(), 1);
        assert_eq!(fx.market.list_requests(&fx.admin).unwrap().len(), 1);
        assert!(matches!(
            fx.market
                .change_request_status(&outsider, &request.id, change(RequestStatus::Ongoing)),
            Err(MarketError::NotFound(_))
        ));
    }

    #[test]
    fn unreviewed_products_take_no_requests() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let investor = fx.member("i@example.com", UserType::Investor);
        let product = fx.product(&founder, "Hydro", false);

        assert!(matches!(
            fx.market.create_request(&fx.admin, to_product(&product.id)),
            Err(MarketError::Conflict(_))
        ));
        assert!(matches!(
            fx.market.create_request(&investor, to_product(&product.id)),
            Err(MarketError::NotFound(_))
        ));
        assert!(fx.market.list_requests(&fx.admin).unwrap().is_empty());
    }

    #[test]
    fn request_needs_a_target_other_than_self() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let product = fx.product(&founder, "Hydro", true);

        assert!(matches!(
            fx.market.create_request(
                &founder,
                NewRequest {
                    product_id: None,
                    ..to_user("")
                }
            ),
            Err(MarketError::Invalid(_))
        ));
        assert!(matches!(
            fx.market.create_request(&founder, to_product(&product.id)),
            Err(MarketError::Invalid(_))
        ));
    }
}
