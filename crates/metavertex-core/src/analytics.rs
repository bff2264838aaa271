// Platform statistics computed from stored records.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::error::{MarketError, MarketResult};
use crate::market::{require_admin, Marketplace};
use crate::model::audit::AdminAction;
use crate::model::interest::Interest;
use crate::model::product::{Product, ProductFilter};
use crate::model::request::{Request, RequestStatus};
use crate::model::user::{Actor, User, UserType};
use crate::model::ReviewStatus;

/// Months covered by the registration series, current month included.
pub const REGISTRATION_MONTHS: usize = 12;
pub const RECENT_ACTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCount {
    /// `YYYY-MM`.
    pub month: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_users: usize,
    pub total_products: usize,
    pub total_interests: usize,
    pub total_requests: usize,
    pub approved_users: usize,
    pub pending_users: usize,
    pub approved_products: usize,
    pub pending_products: usize,
    pub active_users: usize,
    pub total_funding_required: u64,
    pub users_by_type: BTreeMap<String, usize>,
    pub products_by_category: BTreeMap<String, usize>,
    pub monthly_registrations: Vec<MonthCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub category: String,
    pub products: usize,
    pub views: u64,
    pub interests: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCounts {
    pub users: usize,
    pub products: usize,
    pub interests: usize,
    pub requests: usize,
    pub queries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub users: usize,
    pub products: usize,
    pub interests: usize,
    pub requests: usize,
    pub meetings: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub user_stats: BTreeMap<String, usize>,
    pub monthly_registrations: Vec<MonthCount>,
    pub product_stats: Vec<CategoryStats>,
    pub recent_actions: Vec<AdminAction>,
    pub totals: Totals,
    pub pending_approvals: PendingCounts,
}

/// What `/api/dashboard` shows, per role.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum RoleDashboard {
    Founder {
        products: Vec<Product>,
        released_interests: Vec<Interest>,
        total_views: u64,
        total_interests: u64,
    },
    Investor {
        interests: Vec<Interest>,
        approved_products: usize,
    },
    Admin {
        pending: PendingCounts,
    },
    Member {
        requests: Vec<Request>,
        approved_products: usize,
    },
}

/// Registrations per month for the `REGISTRATION_MONTHS` months ending with
/// the month of `now`, oldest first. Months without registrations are zero.
pub fn monthly_registrations(users: &[User], now: DateTime<Utc>) -> Vec<MonthCount> {
    let month_index = |at: DateTime<Utc>| at.year() as i64 * 12 + at.month0() as i64;
    let current = month_index(now);
    let first = current - (REGISTRATION_MONTHS as i64 - 1);

    let mut counts = vec![0usize; REGISTRATION_MONTHS];
    for user in users {
        let idx = month_index(user.created_at);
        if (first..=current).contains(&idx) {
            counts[(idx - first) as usize] += 1;
        }
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(offset, count)| {
            let idx = first + offset as i64;
            MonthCount {
                month: format!("{:04}-{:02}", idx.div_euclid(12), idx.rem_euclid(12) + 1),
                count,
            }
        })
        .collect()
}

pub fn users_by_type(users: &[User]) -> BTreeMap<String, usize> {
    let mut by_type: BTreeMap<String, usize> = UserType::ALL
        .iter()
        .map(|t| (t.as_str().to_string(), 0))
        .collect();
    for user in users {
        *by_type.entry(user.user_type.as_str().to_string()).or_default() += 1;
    }
    by_type
}

fn saturating_total(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0, u64::saturating_add)
}

pub fn category_stats(products: &[Product]) -> Vec<CategoryStats> {
    let mut by_category: BTreeMap<&str, CategoryStats> = BTreeMap::new();
    for product in products {
        let stats = by_category
            .entry(product.category.as_str())
            .or_insert_with(|| CategoryStats {
                category: product.category.clone(),
                products: 0,
                views: 0,
                interests: 0,
            });
        stats.products += 1;
        stats.views = stats.views.saturating_add(product.views);
        stats.interests = stats.interests.saturating_add(product.interests);
    }
    by_category.into_values().collect()
}

pub fn summarize(
    users: &[User],
    products: &[Product],
    interests: usize,
    requests: usize,
    now: DateTime<Utc>,
) -> Summary {
    let count_users = |status| users.iter().filter(|u| u.status == status).count();
    let count_products = |status| products.iter().filter(|p| p.status == status).count();
    Summary {
        total_users: users.len(),
        total_products: products.len(),
        total_interests: interests,
        total_requests: requests,
        approved_users: count_users(ReviewStatus::Approved),
        pending_users: count_users(ReviewStatus::Pending),
        approved_products: count_products(ReviewStatus::Approved),
        pending_products: count_products(ReviewStatus::Pending),
        active_users: users.iter().filter(|u| u.is_active).count(),
        total_funding_required: saturating_total(products.iter().map(|p| p.funding_required)),
        users_by_type: users_by_type(users),
        products_by_category: category_stats(products)
            .into_iter()
            .map(|c| (c.category, c.products))
            .collect(),
        monthly_registrations: monthly_registrations(users, now),
    }
}

impl Marketplace {
    pub fn analytics_summary(&self, actor: &Actor) -> MarketResult<Summary> {
        require_admin(actor)?;
        let db = self.db();
        let users = db.list_users(None, None)?;
        let products = db.list_products(None)?;
        Ok(summarize(
            &users,
            &products,
            db.list_interests()?.len(),
            db.list_requests(None)?.len(),
            Utc::now(),
        ))
    }

    /// Full platform view. Superadmin only.
    pub fn analytics_dashboard(&self, actor: &Actor) -> MarketResult<Dashboard> {
        if actor.user_type != UserType::Superadmin {
            return Err(MarketError::Forbidden("Superadmin access required".into()));
        }
        let db = self.db();
        let users = db.list_users(None, None)?;
        let products = db.list_products(None)?;
        let interests = db.list_interests()?;
        let requests = db.list_requests(None)?;
        let meetings = db.list_meetings()?;

        Ok(Dashboard {
            user_stats: users_by_type(&users),
            monthly_registrations: monthly_registrations(&users, Utc::now()),
            product_stats: category_stats(&products),
            recent_actions: db.recent_actions(RECENT_ACTIONS)?,
            totals: Totals {
                users: users.len(),
                products: products.len(),
                interests: interests.len(),
                requests: requests.len(),
                meetings: meetings.len(),
            },
            pending_approvals: self.pending_counts()?,
        })
    }

    fn pending_counts(&self) -> MarketResult<PendingCounts> {
        let db = self.db();
        Ok(PendingCounts {
            users: db.list_users(Some(ReviewStatus::Pending), None)?.len(),
            products: db
                .list_products(None)?
                .iter()
                .filter(|p| p.status == ReviewStatus::Pending)
                .count(),
            interests: db
                .list_interests()?
                .iter()
                .filter(|i| i.status == ReviewStatus::Pending)
                .count(),
            requests: db
                .list_requests(None)?
                .iter()
                .filter(|r| r.status == RequestStatus::Pending)
                .count(),
            queries: db
                .list_queries()?
                .iter()
                .filter(|q| q.status == ReviewStatus::Pending)
                .count(),
        })
    }

    pub fn role_dashboard(&self, actor: &Actor) -> MarketResult<RoleDashboard> {
        let approved_products = || -> MarketResult<usize> {
            Ok(self
                .list_products(
                    actor,
                    &ProductFilter {
                        status: Some(ReviewStatus::Approved),
                        ..Default::default()
                    },
                )?
                .len())
        };

        Ok(match actor.user_type {
            UserType::Founder => {
                let products = self.my_products(actor)?;
                RoleDashboard::Founder {
                    total_views: saturating_total(products.iter().map(|p| p.views)),
                    total_interests: saturating_total(products.iter().map(|p| p.interests)),
                    released_interests: self.list_interests(actor)?,
                    products,
                }
            }
            UserType::Investor => RoleDashboard::Investor {
                interests: self.list_interests(actor)?,
                approved_products: approved_products()?,
            },
            UserType::Admin | UserType::Superadmin => RoleDashboard::Admin {
                pending: self.pending_counts()?,
            },
            UserType::Organization | UserType::Mentor => RoleDashboard::Member {
                requests: self.list_requests(actor)?,
                approved_products: approved_products()?,
            },
        })
    }
}
