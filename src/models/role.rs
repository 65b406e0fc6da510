//! Role domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role (authorization subject)
///
/// A principal may hold several roles; the effective capability is the
/// union across them (see the resolver).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create role request
#[derive(Debug, Deserialize, validator::Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
}

/// Update role request
#[derive(Debug, Deserialize, validator::Validate)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
}
