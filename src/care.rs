//! Care-level ordering and the upcoming-watering window.
//!
//! The store cannot express the care-level ranking, so `GET /plants?sortBy=careLevel`
//! sorts in memory after retrieval. Date fields are sorted by the store.

use chrono::{Days, NaiveDate, Utc};
use mongodb::bson::Document;

use crate::models::{CareLevel, CARE_LEVEL_FIELD};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn care_rank(plant: &Document) -> Option<u8> {
    plant
        .get_str(CARE_LEVEL_FIELD)
        .ok()
        .and_then(CareLevel::from_label)
        .map(CareLevel::rank)
}

/// Stable sort by care rank. Plants with a missing or unknown care level keep
/// their relative order and land after every ranked plant.
pub fn sort_by_care_level(plants: &mut [Document]) {
    plants.sort_by_key(|plant| care_rank(plant).unwrap_or(u8::MAX));
}

/// Closed range of calendar days `[first_day, last_day]`.
///
/// `nextWatering` values are compared as strings, so anything starting with a
/// date inside the range matches, whether it carries a time suffix or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WateringWindow {
    first_day: NaiveDate,
    last_day: NaiveDate,
}

impl WateringWindow {
    pub fn starting(today: NaiveDate, days: u32) -> Self {
        let last_day = today
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        Self {
            first_day: today,
            last_day,
        }
    }

    pub fn from_today(days: u32) -> Self {
        Self::starting(Utc::now().date_naive(), days)
    }

    /// Inclusive lower bound, `YYYY-MM-DD`.
    pub fn lower_bound(&self) -> String {
        self.first_day.format(DATE_FORMAT).to_string()
    }

    /// Exclusive upper bound: the day after `last_day`.
    pub fn upper_bound(&self) -> String {
        self.last_day
            .succ_opt()
            .unwrap_or(NaiveDate::MAX)
            .format(DATE_FORMAT)
            .to_string()
    }

    pub fn contains(&self, next_watering: &str) -> bool {
        next_watering >= self.lower_bound().as_str() && next_watering < self.upper_bound().as_str()
    }
}
