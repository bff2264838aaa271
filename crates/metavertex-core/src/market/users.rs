// Accounts: registration, sign-in, approval and profiles.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{require_admin, require_role, Marketplace};
use crate::auth::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::config::SuperadminSeed;
use crate::error::{MarketError, MarketResult};
use crate::events::{Audience, MarketEvent};
use crate::model::user::{Actor, BasicInfo, ProfileUpdate, Registration, User, UserType};
use crate::model::{new_id, Decision, ReviewStatus};

/// A signed-in user and their bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Superadmin's request to create an admin account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAdmin {
    pub email: String,
    pub password: String,
    pub name: String,
}

struct Account {
    email: String,
    password: String,
    name: String,
    user_type: UserType,
    status: ReviewStatus,
    company: String,
    phone: String,
    basic_info: BasicInfo,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_account(email: &str, name: &str, password: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if email.is_empty() {
        errors.push("Email is required".to_string());
    } else if !looks_like_email(email) {
        errors.push("Email address is invalid".to_string());
    }
    if name.trim().is_empty() {
        errors.push("Name is required".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    errors
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

impl Marketplace {
    fn create_account(&self, account: Account) -> MarketResult<User> {
        let now = Utc::now();
        let user = User {
            id: new_id(),
            email: account.email,
            name: account.name.trim().to_string(),
            user_type: account.user_type,
            unique_id: String::new(),
            status: account.status,
            company: account.company.trim().to_string(),
            phone: account.phone.trim().to_string(),
            basic_info: account.basic_info,
            created_at: now,
            last_active: now,
            is_active: false,
        };
        let hash = hash_password(&account.password)?;
        self.db
            .insert_user(&user, &hash)?
            .ok_or_else(|| MarketError::Conflict("User already exists with this email".into()))
    }

    /// Public sign-up. New accounts wait for admin approval.
    pub fn register(&self, input: Registration) -> MarketResult<User> {
        let email = normalize_email(&input.email);
        let mut errors = validate_account(&email, &input.name, &input.password);
        if !input.user_type.is_self_service() {
            errors.push(format!(
                "Cannot register as {}; choose founder, investor, organization or mentor",
                input.user_type
            ));
        }
        if !errors.is_empty() {
            return Err(MarketError::Invalid(errors));
        }

        let user = self.create_account(Account {
            email,
            password: input.password,
            name: input.name,
            user_type: input.user_type,
            status: ReviewStatus::Pending,
            company: input.company,
            phone: input.phone,
            basic_info: input.basic_info,
        })?;

        info!("registered {} {} ({})", user.user_type, user.unique_id, user.id);
        self.publish(
            Audience::Admins,
            MarketEvent::NewUserRegistration {
                user_id: user.id.clone(),
                email: user.email.clone(),
                name: user.name.clone(),
                user_type: user.user_type,
                unique_id: user.unique_id.clone(),
            },
        );
        Ok(user)
    }

    pub fn login(&self, email: &str, password: &str) -> MarketResult<Session> {
        let invalid = || MarketError::Unauthorized("Invalid email or password".into());

        let (user, hash) = self
            .db
            .find_credentials(&normalize_email(email))?
            .ok_or_else(invalid)?;
        if !verify_password(password, &hash) {
            return Err(invalid());
        }
        ensure_approved(&user)?;

        self.db.set_user_active(&user.id, true, Utc::now())?;
        let user = self.load_user(&user.id)?;
        let token = self.tokens.issue(&user)?;
        info!("{} signed in", user.unique_id);
        Ok(Session { token, user })
    }

    pub fn logout(&self, actor: &Actor) -> MarketResult<()> {
        self.db.set_user_active(&actor.id, false, Utc::now())?;
        Ok(())
    }

    /// Resolve a token to its user. Bad or expired tokens are `Unauthorized`;
    /// a deleted account is `NotFound`.
    pub fn verify(&self, token: &str) -> MarketResult<User> {
        let claims = self.tokens.verify(token)?;
        self.load_user(&claims.sub)
    }

    /// Resolve a token for an authenticated call: the account must still
    /// exist and be approved.
    pub fn authenticate(&self, token: &str) -> MarketResult<User> {
        let user = self.verify(token).map_err(|e| match e {
            MarketError::NotFound(_) => MarketError::Unauthorized("Account no longer exists".into()),
            other => other,
        })?;
        ensure_approved(&user)?;
        Ok(user)
    }

    /// Create the configured superadmin unless an account with that email
    /// already exists. Returns the new account, if any.
    pub fn bootstrap_superadmin(&self, seed: &SuperadminSeed) -> MarketResult<Option<User>> {
        let email = normalize_email(&seed.email);
        if self.db.find_credentials(&email)?.is_some() {
            return Ok(None);
        }
        let errors = validate_account(&email, &seed.name, &seed.password);
        if !errors.is_empty() {
            return Err(MarketError::Invalid(errors));
        }
        let user = self.create_account(Account {
            email,
            password: seed.password.clone(),
            name: seed.name.clone(),
            user_type: UserType::Superadmin,
            status: ReviewStatus::Approved,
            company: String::new(),
            phone: String::new(),
            basic_info: BasicInfo::default(),
        })?;
        info!("bootstrapped superadmin {}", user.unique_id);
        Ok(Some(user))
    }

    pub fn create_admin(&self, actor: &Actor, input: NewAdmin) -> MarketResult<User> {
        require_role(actor, UserType::Superadmin, "Superadmin access required")?;
        let email = normalize_email(&input.email);
        let errors = validate_account(&email, &input.name, &input.password);
        if !errors.is_empty() {
            return Err(MarketError::Invalid(errors));
        }
        let user = self.create_account(Account {
            email,
            password: input.password,
            name: input.name,
            user_type: UserType::Admin,
            status: ReviewStatus::Approved,
            company: String::new(),
            phone: String::new(),
            basic_info: BasicInfo::default(),
        })?;
        self.audit(
            actor,
            "admin_created",
            Some(&user.id),
            serde_json::json!({ "email": user.email, "uniqueId": user.unique_id }),
        )?;
        Ok(user)
    }

    pub fn list_users(
        &self,
        actor: &Actor,
        status: Option<ReviewStatus>,
        user_type: Option<UserType>,
    ) -> MarketResult<Vec<User>> {
        require_admin(actor)?;
        Ok(self.db.list_users(status, user_type)?)
    }

    /// Approve or reject a pending account. No other account changes.
    pub fn review_user(
        &self,
        actor: &Actor,
        user_id: &str,
        decision: Decision,
    ) -> MarketResult<User> {
        require_admin(actor)?;
        let user = self.load_user(user_id)?;
        if user.status != ReviewStatus::Pending {
            return Err(MarketError::Conflict(format!(
                "User has already been {}",
                user.status
            )));
        }

        let status = decision.outcome();
        self.db.set_user_status(&user.id, status)?;
        let user = self.load_user(&user.id)?;

        let action = match decision {
            Decision::Approve => "user_approved",
            Decision::Reject => "user_rejected",
        };
        self.audit(
            actor,
            action,
            Some(&user.id),
            serde_json::json!({ "uniqueId": user.unique_id, "userType": user.user_type }),
        )?;
        info!("{} {} by {}", user.unique_id, status, actor.unique_id);
        self.publish(
            Audience::Participants(vec![user.id.clone()]),
            MarketEvent::UserStatusChanged {
                user_id: user.id.clone(),
                status,
            },
        );
        Ok(user)
    }

    pub fn approve_user(&self, actor: &Actor, user_id: &str) -> MarketResult<User> {
        self.review_user(actor, user_id, Decision::Approve)
    }

    pub fn reject_user(&self, actor: &Actor, user_id: &str) -> MarketResult<User> {
        self.review_user(actor, user_id, Decision::Reject)
    }

    pub fn update_profile(&self, actor: &Actor, patch: ProfileUpdate) -> MarketResult<User> {
        let patch = ProfileUpdate {
            name: patch.name.map(|n| n.trim().to_string()),
            company: patch.company.map(|c| c.trim().to_string()),
            phone: patch.phone.map(|p| p.trim().to_string()),
            basic_info: patch.basic_info,
        };
        if patch.name.as_deref().is_some_and(str::is_empty) {
            return Err(MarketError::invalid("Name is required"));
        }
        self.db.update_profile(&actor.id, &patch)?;
        self.load_user(&actor.id)
    }
}

fn ensure_approved(user: &User) -> MarketResult<()> {
    match user.status {
        ReviewStatus::Approved => Ok(()),
        ReviewStatus::Pending => Err(MarketError::Forbidden(
            "Account pending admin approval".into(),
        )),
        ReviewStatus::Rejected => Err(MarketError::Forbidden("Account has been rejected".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::testing::fixture;

    fn registration(email: &str, user_type: UserType) -> Registration {
        Registration {
            email: email.into(),
            password: "password123".into(),
            name: "Ada Lovelace".into(),
            user_type,
            company: "Analytical Engines".into(),
            phone: String::new(),
            basic_info: BasicInfo::default(),
        }
    }

    #[test]
    fn new_user_is_pending_and_cannot_sign_in_until_approved() {
        let fx = fixture();
        let user = fx
            .market
            .register(registration("ada@example.com", UserType::Investor))
            .unwrap();
        assert_eq!(user.status, ReviewStatus::Pending);
        assert!(!user.is_active);
        assert_eq!(user.unique_id, "INV-001");

        match fx.market.login("ada@example.com", "password123") {
            Err(MarketError::Forbidden(msg)) => assert_eq!(msg, "Account pending admin approval"),
            other => panic!("expected pending rejection, got {other:?}"),
        }

        fx.market.approve_user(&fx.admin, &user.id).unwrap();
        let session = fx.market.login("ada@example.com", "password123").unwrap();
        assert!(session.user.is_active);
        assert_eq!(fx.market.verify(&session.token).unwrap().id, user.id);
    }

    #[test]
    fn email_is_normalized_and_unique() {
        let fx = fixture();
        fx.market
            .register(registration("  Ada@Example.com ", UserType::Founder))
            .unwrap();
        match fx
            .market
            .register(registration("ada@example.com", UserType::Mentor))
        {
            Err(MarketError::Conflict(msg)) => {
                assert_eq!(msg, "User already exists with this email")
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn registration_reports_every_problem() {
        let fx = fixture();
        let err = fx
            .market
            .register(Registration {
                email: "not-an-email".into(),
                password: "short".into(),
                name: " ".into(),
                ..registration("x@example.com", UserType::Founder)
            })
            .unwrap_err();
        match err {
            MarketError::Invalid(errors) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn admin_roles_cannot_self_register() {
        let fx = fixture();
        assert!(matches!(
            fx.market
                .register(registration("sneaky@example.com", UserType::Admin)),
            Err(MarketError::Invalid(_))
        ));
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let fx = fixture();
        let a = fx.market.login("root@metavertex.io", "wrong-password");
        let b = fx.market.login("nobody@metavertex.io", "root-password");
        for result in [a, b] {
            match result {
                Err(MarketError::Unauthorized(msg)) => assert_eq!(msg, "Invalid email or password"),
                other => panic!("expected unauthorized, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejected_user_cannot_sign_in() {
        let fx = fixture();
        let user = fx
            .market
            .register(registration("ada@example.com", UserType::Investor))
            .unwrap();
        fx.market.reject_user(&fx.admin, &user.id).unwrap();
        assert!(matches!(
            fx.market.login("ada@example.com", "password123"),
            Err(MarketError::Forbidden(msg)) if msg == "Account has been rejected"
        ));
    }

    #[test]
    fn approving_one_user_leaves_others_pending() {
        let fx = fixture();
        let a = fx
            .market
            .register(registration("a@example.com", UserType::Founder))
            .unwrap();
        let b = fx
            .market
            .register(registration("b@example.com", UserType::Founder))
            .unwrap();
        fx.market.approve_user(&fx.admin, &a.id).unwrap();

        let pending = fx
            .market
            .list_users(&fx.admin, Some(ReviewStatus::Pending), None)
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b.id);

        // A second decision on the same account is a conflict.
        assert!(matches!(
            fx.market.reject_user(&fx.admin, &a.id),
            Err(MarketError::Conflict(_))
        ));
    }

    #[test]
    fn only_admins_review_and_only_superadmin_creates_admins() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        assert!(matches!(
            fx.market.list_users(&founder, None, None),
            Err(MarketError::Forbidden(_))
        ));
        assert!(matches!(
            fx.market.create_admin(
                &fx.admin,
                NewAdmin {
                    email: "second@metavertex.io".into(),
                    password: "admin-password".into(),
                    name: "Second".into(),
                }
            ),
            Err(MarketError::Forbidden(_))
        ));
        assert_eq!(fx.admin.unique_id, "ADM-001");
        assert_eq!(fx.superadmin.unique_id, "SA-001");
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let fx = fixture();
        let again = fx
            .market
            .bootstrap_superadmin(&SuperadminSeed {
                email: "ROOT@metavertex.io".into(),
                password: "root-password".into(),
                name: "Root".into(),
            })
            .unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn authenticate_requires_existing_approved_account() {
        let fx = fixture();
        let session = fx.market.login("root@metavertex.io", "root-password").unwrap();
        assert_eq!(
            fx.market.authenticate(&session.token).unwrap().user_type,
            UserType::Superadmin
        );
        assert!(matches!(
            fx.market.authenticate("not-a-token"),
            Err(MarketError::Unauthorized(_))
        ));
    }

    #[test]
    fn logout_clears_presence() {
        let fx = fixture();
        let session = fx.market.login("root@metavertex.io", "root-password").unwrap();
        let actor = Actor::from(&session.user);
        fx.market.logout(&actor).unwrap();
        assert!(!fx.market.verify(&session.token).unwrap().is_active);
    }

    #[test]
    fn profile_update_changes_only_given_fields() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let updated = fx
            .market
            .update_profile(
                &founder,
                ProfileUpdate {
                    phone: Some(" +44 7700 900123 ".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.phone, "+44 7700 900123");
        assert_eq!(updated.name, "f");

        assert!(matches!(
            fx.market.update_profile(
                &founder,
                ProfileUpdate {
                    name: Some("  ".into()),
                    ..Default::default()
                }
            ),
            Err(MarketError::Invalid(_))
        ));
    }
}
