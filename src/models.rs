use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};

use crate::json::{serialize_bson, serialize_optional_bson};

pub const EMAIL_FIELD: &str = "email";
pub const CATEGORY_FIELD: &str = "category";
pub const CARE_LEVEL_FIELD: &str = "careLevel";
pub const NEXT_WATERING_FIELD: &str = "nextWatering";
pub const CREATED_AT_FIELD: &str = "createdAt";

/// How demanding a plant is to keep alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CareLevel {
    Easy,
    Moderate,
    Difficult,
}

impl CareLevel {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "easy" => Some(Self::Easy),
            "moderate" => Some(Self::Moderate),
            "difficult" => Some(Self::Difficult),
            _ => None,
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Self::Easy => 1,
            Self::Moderate => 2,
            Self::Difficult => 3,
        }
    }
}

/// Ordering requested by `GET /plants?sortBy=...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlantSort {
    #[default]
    Unsorted,
    /// Sorted by the store, ascending.
    NextWatering,
    /// Sorted in memory after retrieval.
    CareLevel,
}

impl PlantSort {
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some(NEXT_WATERING_FIELD) => Self::NextWatering,
            Some(CARE_LEVEL_FIELD) => Self::CareLevel,
            _ => Self::Unsorted,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PlantListParams {
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub category: Option<String>,
}

impl PlantListParams {
    pub fn sort(&self) -> PlantSort {
        PlantSort::from_param(self.sort_by.as_deref())
    }

    /// Empty categories do not filter.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOutcome {
    pub acknowledged: bool,
    #[serde(serialize_with = "serialize_bson")]
    pub inserted_id: Bson,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    #[serde(serialize_with = "serialize_optional_bson")]
    pub upserted_id: Option<Bson>,
}

impl UpdateOutcome {
    pub fn new(matched_count: u64, modified_count: u64, upserted_id: Option<Bson>) -> Self {
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
            upserted_count: u64::from(upserted_id.is_some()),
            upserted_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateResponse {
    pub success: bool,
    pub modified_count: u64,
    pub message: &'static str,
}

impl UserUpdateResponse {
    pub fn from_outcome(outcome: &UpdateOutcome) -> Self {
        let success = outcome.modified_count > 0;
        Self {
            success,
            modified_count: outcome.modified_count,
            message: if success {
                "User updated successfully"
            } else {
                "No changes were made"
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactReceipt {
    pub success: bool,
    #[serde(serialize_with = "serialize_bson")]
    pub inserted_id: Bson,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub plants: u64,
    pub feedbacks: u64,
}
