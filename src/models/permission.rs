//! Permission matrix and capability domain models
//!
//! The matrix stores one `AreaPermission` row per role × area and one
//! `ApplicationPermission` row per role × application. Rows are created
//! lazily on first save; an absent row means denial with the default
//! data access tier. The resolved, per-principal view of the matrix is
//! the `CapabilityMap` every protected screen consumes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::catalog::Area;

/// Data access tier applied when a grant has no explicit tier.
///
/// Tier id 7 ("User Level") is a stable, system-wide constant; tests and
/// external consumers depend on it.
pub const DEFAULT_DATA_ACCESS_TIER_ID: i32 = 7;

/// One role × area authorization record.
///
/// `permission` is the area gate: when false the area is invisible to the
/// role no matter what the CRUD flags say.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AreaPermission {
    pub role_id: i32,
    pub area_id: i32,
    pub permission: bool,
    pub data_access_id: i32,
    #[sqlx(rename = "can_read")]
    pub read: bool,
    #[sqlx(rename = "can_create")]
    pub create: bool,
    #[sqlx(rename = "can_update")]
    pub update: bool,
    #[sqlx(rename = "can_delete")]
    pub delete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One role × application gate record. AND semantics with area gates:
/// when false, no area inside the application is reachable.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApplicationPermission {
    pub role_id: i32,
    pub application_id: i32,
    pub permission: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Gate state reported for a (role, application) pair that may have no
/// stored row yet (absent row reads as `permission = false`).
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationPermissionState {
    pub role_id: i32,
    pub application_id: i32,
    pub permission: bool,
}

/// Partial update for a single `AreaPermission` row.
///
/// The matrix editor saves one cell at a time; a field that is absent from
/// the payload keeps its stored value (or the documented default when the
/// row is created by this save). An explicit JSON `null` is rejected at
/// deserialization instead of being conflated with "absent".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AreaPermissionPatch {
    #[serde(default, deserialize_with = "reject_null", skip_serializing_if = "Option::is_none")]
    pub permission: Option<bool>,
    #[serde(default, deserialize_with = "reject_null", skip_serializing_if = "Option::is_none")]
    pub data_access_id: Option<i32>,
    #[serde(default, deserialize_with = "reject_null", skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    #[serde(default, deserialize_with = "reject_null", skip_serializing_if = "Option::is_none")]
    pub create: Option<bool>,
    #[serde(default, deserialize_with = "reject_null", skip_serializing_if = "Option::is_none")]
    pub update: Option<bool>,
    #[serde(default, deserialize_with = "reject_null", skip_serializing_if = "Option::is_none")]
    pub delete: Option<bool>,
}

impl AreaPermissionPatch {
    /// True when the patch would not change any field.
    pub fn is_empty(&self) -> bool {
        self.permission.is_none()
            && self.data_access_id.is_none()
            && self.read.is_none()
            && self.create.is_none()
            && self.update.is_none()
            && self.delete.is_none()
    }
}

fn reject_null<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Application gate save payload
#[derive(Debug, Deserialize)]
pub struct SaveApplicationPermissionRequest {
    pub permission: bool,
}

/// CRUD action gated per area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudAction {
    Read,
    Create,
    Update,
    Delete,
}

impl CrudAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrudAction::Read => "read",
            CrudAction::Create => "create",
            CrudAction::Update => "update",
            CrudAction::Delete => "delete",
        }
    }
}

/// Effective per-area capability after the multi-role union.
///
/// This is the `{permission, data_access_id, read, create, update, delete}`
/// record threaded through every consuming screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaCapability {
    pub permission: bool,
    pub data_access_id: i32,
    pub read: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl Default for AreaCapability {
    /// The no-row default: fully denied, default tier.
    fn default() -> Self {
        Self {
            permission: false,
            data_access_id: DEFAULT_DATA_ACCESS_TIER_ID,
            read: false,
            create: false,
            update: false,
            delete: false,
        }
    }
}

impl AreaCapability {
    /// Fold one stored row into the capability. Boolean fields OR,
    /// the data access tier takes the highest id. Holding an extra role
    /// can only ever widen access.
    pub fn merge_row(&mut self, row: &AreaPermission) {
        self.permission |= row.permission;
        self.data_access_id = self.data_access_id.max(row.data_access_id);
        self.read |= row.read;
        self.create |= row.create;
        self.update |= row.update;
        self.delete |= row.delete;
    }

    /// Returns whether an action is allowed by this capability.
    /// The area gate dominates the individual CRUD flags.
    pub fn allows(&self, action: CrudAction) -> bool {
        if !self.permission {
            return false;
        }
        match action {
            CrudAction::Read => self.read,
            CrudAction::Create => self.create,
            CrudAction::Update => self.update,
            CrudAction::Delete => self.delete,
        }
    }
}

impl From<&AreaPermission> for AreaCapability {
    fn from(row: &AreaPermission) -> Self {
        Self {
            permission: row.permission,
            data_access_id: row.data_access_id,
            read: row.read,
            create: row.create,
            update: row.update,
            delete: row.delete,
        }
    }
}

/// Effective per-application capability: the application gate plus the
/// navigable areas inside it (areas whose own gate resolved true).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationCapability {
    pub permission: bool,
    pub areas: BTreeMap<i32, AreaCapability>,
}

/// Resolved capability set for one principal, keyed by application id.
/// Applications whose gate resolved false are absent entirely.
pub type CapabilityMap = BTreeMap<i32, ApplicationCapability>;

/// One area row in the matrix editor, with the role's stored permission
/// fields or the documented defaults when no row exists yet.
#[derive(Debug, Clone, Serialize)]
pub struct AreaPermissionEntry {
    pub area_id: i32,
    pub area_name: String,
    pub permission: bool,
    pub data_access_id: i32,
    pub read: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl AreaPermissionEntry {
    pub fn new(area: &Area, row: Option<&AreaPermission>) -> Self {
        match row {
            Some(p) => Self {
                area_id: area.id,
                area_name: area.name.clone(),
                permission: p.permission,
                data_access_id: p.data_access_id,
                read: p.read,
                create: p.create,
                update: p.update,
                delete: p.delete,
            },
            None => Self {
                area_id: area.id,
                area_name: area.name.clone(),
                permission: false,
                data_access_id: DEFAULT_DATA_ACCESS_TIER_ID,
                read: false,
                create: false,
                update: false,
                delete: false,
            },
        }
    }
}

/// Areas grouped by application for the matrix editor, each carrying the
/// role's area permissions plus the role's application gate.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationAreaList {
    pub application_id: i32,
    pub application_name: String,
    pub permission: bool,
    pub areas: Vec<AreaPermissionEntry>,
}
