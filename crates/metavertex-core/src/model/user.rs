// User accounts and roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ReviewStatus;

/// Marketplace roles. Admin and superadmin mediate; the rest participate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Founder,
    Investor,
    Organization,
    Mentor,
    Admin,
    Superadmin,
}

impl UserType {
    pub const ALL: [UserType; 6] = [
        UserType::Founder,
        UserType::Investor,
        UserType::Organization,
        UserType::Mentor,
        UserType::Admin,
        UserType::Superadmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Founder => "founder",
            UserType::Investor => "investor",
            UserType::Organization => "organization",
            UserType::Mentor => "mentor",
            UserType::Admin => "admin",
            UserType::Superadmin => "superadmin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        UserType::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Prefix of the human-readable unique id (`FNB-001`, `INV-002`, ...).
    pub fn id_prefix(&self) -> &'static str {
        match self {
            UserType::Founder => "FNB",
            UserType::Investor => "INV",
            UserType::Organization => "ORG",
            UserType::Mentor => "MNT",
            UserType::Admin => "ADM",
            UserType::Superadmin => "SA",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserType::Admin | UserType::Superadmin)
    }

    /// Roles that may be chosen at public registration.
    pub fn is_self_service(&self) -> bool {
        !self.is_admin()
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format the unique id for the `ordinal`-th user of a type (1-based).
pub fn format_unique_id(user_type: UserType, ordinal: usize) -> String {
    format!("{}-{:03}", user_type.id_prefix(), ordinal)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BasicInfo {
    pub industry: String,
    pub experience: String,
    pub location: String,
    pub bio: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub user_type: UserType,
    pub unique_id: String,
    pub status: ReviewStatus,
    pub company: String,
    pub phone: String,
    pub basic_info: BasicInfo,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub is_active: bool,
}

/// Public registration payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub user_type: UserType,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub basic_info: BasicInfo,
}

/// Partial update of the caller's own profile. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub basic_info: Option<BasicInfo>,
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: String,
    pub user_type: UserType,
    pub unique_id: String,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.user_type.is_admin()
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor {
            id: user.id.clone(),
            user_type: user.user_type,
            unique_id: user.unique_id.clone(),
        }
    }
}
