// CSV exports of users and products for admins.

use std::borrow::Cow;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::error::MarketResult;
use crate::market::{require_admin, Marketplace};
use crate::model::product::Product;
use crate::model::user::{Actor, User};

/// Free text that a spreadsheet would run as a formula gets a leading quote.
fn cell(value: &str) -> Cow<'_, str> {
    match value.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => Cow::Owned(format!("'{value}")),
        _ => Cow::Borrowed(value),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserRow<'a> {
    unique_id: &'a str,
    name: Cow<'a, str>,
    email: Cow<'a, str>,
    user_type: &'a str,
    status: &'a str,
    company: Cow<'a, str>,
    phone: Cow<'a, str>,
    industry: Cow<'a, str>,
    location: Cow<'a, str>,
    created_at: String,
    last_active: String,
    is_active: bool,
}

impl<'a> From<&'a User> for UserRow<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            unique_id: &user.unique_id,
            name: cell(&user.name),
            email: cell(&user.email),
            user_type: user.user_type.as_str(),
            status: user.status.as_str(),
            company: cell(&user.company),
            phone: cell(&user.phone),
            industry: cell(&user.basic_info.industry),
            location: cell(&user.basic_info.location),
            created_at: user.created_at.to_rfc3339(),
            last_active: user.last_active.to_rfc3339(),
            is_active: user.is_active,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductRow<'a> {
    id: &'a str,
    product_name: Cow<'a, str>,
    category: Cow<'a, str>,
    founder_unique_id: &'a str,
    current_stage: Cow<'a, str>,
    funding_required: u64,
    status: &'a str,
    views: u64,
    interests: u64,
    submitted_at: String,
}

impl<'a> From<&'a Product> for ProductRow<'a> {
    fn from(product: &'a Product) -> Self {
        Self {
            id: &product.id,
            product_name: cell(&product.product_name),
            category: cell(&product.category),
            founder_unique_id: &product.founder_unique_id,
            current_stage: cell(&product.current_stage),
            funding_required: product.funding_required,
            status: product.status.as_str(),
            views: product.views,
            interests: product.interests,
            submitted_at: product.submitted_at.to_rfc3339(),
        }
    }
}

fn write_rows<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).context("failed to write CSV row")?;
    }
    let bytes = writer.into_inner().context("failed to flush CSV")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Header row first, one row per user. Password hashes never leave the
/// database layer, so they cannot appear here.
pub fn users_csv(users: &[User]) -> Result<String> {
    write_rows(users.iter().map(UserRow::from))
}

pub fn products_csv(products: &[Product]) -> Result<String> {
    write_rows(products.iter().map(ProductRow::from))
}

impl Marketplace {
    pub fn export_users(&self, actor: &Actor) -> MarketResult<String> {
        require_admin(actor)?;
        Ok(users_csv(&self.db().list_users(None, None)?)?)
    }

    pub fn export_products(&self, actor: &Actor) -> MarketResult<String> {
        require_admin(actor)?;
        Ok(products_csv(&self.db().list_products(None)?)?)
    }
}
