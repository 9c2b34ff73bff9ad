//! In-process [`PlantCareStore`] used by tests and for running the gateway
//! without a MongoDB deployment.
//!
//! Ordering and matching follow MongoDB where the gateway depends on them:
//! missing sort fields come first, range filters only match strings, and a
//! `$set` that changes nothing reports `modifiedCount: 0`.

use std::{
    cmp::Ordering,
    sync::atomic::{AtomicBool, Ordering as AtomicOrdering},
};

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use tokio::sync::RwLock;

use crate::{
    care::WateringWindow,
    db::PlantCareStore,
    error::StoreError,
    models::{
        DeleteOutcome, InsertOutcome, PlantSort, UpdateOutcome, CATEGORY_FIELD,
        CREATED_AT_FIELD, EMAIL_FIELD, NEXT_WATERING_FIELD,
    },
};

#[derive(Default)]
struct Collections {
    users: Vec<Document>,
    plants: Vec<Document>,
    feedback: Vec<Document>,
    contact: Vec<Document>,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails like a lost connection would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    pub async fn user_count(&self, email: &str) -> usize {
        let collections = self.collections.read().await;
        collections
            .users
            .iter()
            .filter(|u| field_str(u, EMAIL_FIELD) == Some(email))
            .count()
    }

    pub async fn contact_count(&self) -> usize {
        self.collections.read().await.contact.len()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }
}

fn field_str<'a>(doc: &'a Document, key: &str) -> Option<&'a str> {
    doc.get_str(key).ok()
}

fn has_id(doc: &Document, id: ObjectId) -> bool {
    doc.get_object_id("_id").is_ok_and(|oid| oid == id)
}

/// Inserts with `_id` first, generating one when the document has none.
fn insert_into(collection: &mut Vec<Document>, doc: Document) -> InsertOutcome {
    let id = doc
        .get("_id")
        .cloned()
        .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));

    let mut stored = Document::new();
    stored.insert("_id", id.clone());
    for (key, value) in doc {
        if key != "_id" {
            stored.insert(key, value);
        }
    }
    collection.push(stored);

    InsertOutcome {
        acknowledged: true,
        inserted_id: id,
    }
}

/// Applies a `$set`, returning whether any field changed.
fn apply_set(target: &mut Document, fields: Document) -> bool {
    let mut changed = false;
    for (key, value) in fields {
        if target.get(&key) != Some(&value) {
            target.insert(key, value);
            changed = true;
        }
    }
    changed
}

fn type_order(value: Option<&Bson>) -> u8 {
    match value {
        None | Some(Bson::Null) | Some(Bson::Undefined) => 0,
        Some(Bson::Int32(_)) | Some(Bson::Int64(_)) | Some(Bson::Double(_)) => 1,
        Some(Bson::String(_)) => 2,
        Some(Bson::Document(_)) => 3,
        Some(Bson::Array(_)) => 4,
        Some(Bson::ObjectId(_)) => 5,
        Some(Bson::Boolean(_)) => 6,
        Some(Bson::DateTime(_)) => 7,
        Some(_) => 8,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Ascending sort order of two field values across BSON types.
fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    type_order(a).cmp(&type_order(b)).then_with(|| match (a, b) {
        (Some(Bson::String(x)), Some(Bson::String(y))) => x.cmp(y),
        (Some(Bson::DateTime(x)), Some(Bson::DateTime(y))) => x.cmp(y),
        (Some(Bson::ObjectId(x)), Some(Bson::ObjectId(y))) => x.cmp(y),
        (Some(Bson::Boolean(x)), Some(Bson::Boolean(y))) => x.cmp(y),
        (Some(x), Some(y)) => match (as_f64(x), as_f64(y)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
        _ => Ordering::Equal,
    })
}

fn sort_ascending(docs: &mut [Document], field: &str) {
    docs.sort_by(|a, b| compare_values(a.get(field), b.get(field)));
}

#[async_trait]
impl PlantCareStore for MemoryStore {
    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        self.check()
    }

    async fn find_user(&self, email: &str) -> Result<Option<Document>, StoreError> {
        self.check()?;
        let collections = self.collections.read().await;
        Ok(collections
            .users
            .iter()
            .find(|u| field_str(u, EMAIL_FIELD) == Some(email))
            .cloned())
    }

    async fn insert_user(&self, user: Document) -> Result<InsertOutcome, StoreError> {
        self.check()?;
        Ok(insert_into(&mut self.collections.write().await.users, user))
    }

    async fn update_user(&self, email: &str, fields: Document) -> Result<UpdateOutcome, StoreError> {
        self.check()?;
        let mut collections = self.collections.write().await;
        let outcome = match collections
            .users
            .iter_mut()
            .find(|u| field_str(u, EMAIL_FIELD) == Some(email))
        {
            Some(user) => UpdateOutcome::new(1, u64::from(apply_set(user, fields)), None),
            None => UpdateOutcome::new(0, 0, None),
        };
        Ok(outcome)
    }

    async fn find_plant(&self, id: ObjectId) -> Result<Option<Document>, StoreError> {
        self.check()?;
        let collections = self.collections.read().await;
        Ok(collections.plants.iter().find(|p| has_id(p, id)).cloned())
    }

    async fn plants_for_owner(&self, email: &str) -> Result<Vec<Document>, StoreError> {
        self.check()?;
        let collections = self.collections.read().await;
        Ok(collections
            .plants
            .iter()
            .filter(|p| field_str(p, EMAIL_FIELD) == Some(email))
            .cloned()
            .collect())
    }

    async fn list_plants(
        &self,
        category: Option<&str>,
        sort: PlantSort,
    ) -> Result<Vec<Document>, StoreError> {
        self.check()?;
        let collections = self.collections.read().await;
        let mut plants: Vec<Document> = collections
            .plants
            .iter()
            .filter(|p| category.is_none_or(|c| field_str(p, CATEGORY_FIELD) == Some(c)))
            .cloned()
            .collect();
        if sort == PlantSort::NextWatering {
            sort_ascending(&mut plants, NEXT_WATERING_FIELD);
        }
        Ok(plants)
    }

    async fn newest_plants(&self, limit: i64) -> Result<Vec<Document>, StoreError> {
        self.check()?;
        let collections = self.collections.read().await;
        let mut plants = collections.plants.clone();
        plants.sort_by(|a, b| compare_values(b.get(CREATED_AT_FIELD), a.get(CREATED_AT_FIELD)));
        // MongoDB treats a zero limit as "no limit".
        if limit != 0 {
            plants.truncate(usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX));
        }
        Ok(plants)
    }

    async fn insert_plant(&self, plant: Document) -> Result<InsertOutcome, StoreError> {
        self.check()?;
        Ok(insert_into(&mut self.collections.write().await.plants, plant))
    }

    async fn upsert_plant(&self, id: ObjectId, fields: Document) -> Result<UpdateOutcome, StoreError> {
        self.check()?;
        let mut collections = self.collections.write().await;
        if let Some(plant) = collections.plants.iter_mut().find(|p| has_id(p, id)) {
            let changed = apply_set(plant, fields);
            return Ok(UpdateOutcome::new(1, u64::from(changed), None));
        }

        let mut plant = Document::new();
        plant.insert("_id", id);
        for (key, value) in fields {
            plant.insert(key, value);
        }
        collections.plants.push(plant);
        Ok(UpdateOutcome::new(0, 0, Some(Bson::ObjectId(id))))
    }

    async fn delete_plant(&self, id: ObjectId) -> Result<DeleteOutcome, StoreError> {
        self.check()?;
        let mut collections = self.collections.write().await;
        let deleted_count = match collections.plants.iter().position(|p| has_id(p, id)) {
            Some(index) => {
                collections.plants.remove(index);
                1
            }
            None => 0,
        };
        Ok(DeleteOutcome {
            acknowledged: true,
            deleted_count,
        })
    }

    async fn upcoming_plants(
        &self,
        email: &str,
        window: &WateringWindow,
    ) -> Result<Vec<Document>, StoreError> {
        self.check()?;
        let collections = self.collections.read().await;
        let mut plants: Vec<Document> = collections
            .plants
            .iter()
            .filter(|p| field_str(p, EMAIL_FIELD) == Some(email))
            .filter(|p| field_str(p, NEXT_WATERING_FIELD).is_some_and(|d| window.contains(d)))
            .cloned()
            .collect();
        sort_ascending(&mut plants, NEXT_WATERING_FIELD);
        Ok(plants)
    }

    async fn list_feedback(&self) -> Result<Vec<Document>, StoreError> {
        self.check()?;
        Ok(self.collections.read().await.feedback.clone())
    }

    async fn insert_feedback(&self, feedback: Document) -> Result<InsertOutcome, StoreError> {
        self.check()?;
        Ok(insert_into(&mut self.collections.write().await.feedback, feedback))
    }

    async fn insert_contact(&self, message: Document) -> Result<InsertOutcome, StoreError> {
        self.check()?;
        Ok(insert_into(&mut self.collections.write().await.contact, message))
    }

    async fn count_plants(&self) -> Result<u64, StoreError> {
        self.check()?;
        Ok(self.collections.read().await.plants.len() as u64)
    }

    async fn count_feedback(&self) -> Result<u64, StoreError> {
        self.check()?;
        Ok(self.collections.read().await.feedback.len() as u64)
    }
}
