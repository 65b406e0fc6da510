//! Entity catalog domain models
//! Applications, areas and data access tiers are reference data
//! owned by their admin screens; everything else keys off their ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application (top-level product/module)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Application {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Area (feature within exactly one application)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Area {
    pub id: i32,
    pub name: String,
    pub application_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data access tier (ordered row-level visibility enumeration)
///
/// Tiers are seeded by migration and referenced by id, never embedded.
/// The id ordering is the tier ordering used by the multi-role union.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DataAccessTier {
    pub id: i32,
    pub name: String,
}

/// Create application request
#[derive(Debug, Deserialize, validator::Validate)]
pub struct CreateApplicationRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 500))]
    pub url: String,
}

/// Update application request
#[derive(Debug, Deserialize, validator::Validate)]
pub struct UpdateApplicationRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub url: Option<String>,
}

/// Create area request
#[derive(Debug, Deserialize, validator::Validate)]
pub struct CreateAreaRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub application_id: i32,
}

/// Update area request
#[derive(Debug, Deserialize, validator::Validate)]
pub struct UpdateAreaRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
}

/// Query filter for area listings
#[derive(Debug, Deserialize)]
pub struct AreaListQuery {
    pub application_id: Option<i32>,
}
