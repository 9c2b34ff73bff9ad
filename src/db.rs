use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::{ClientOptions, ServerApi, ServerApiVersion},
    results::{DeleteResult, InsertOneResult, UpdateResult},
    Client, Collection, Database, IndexModel,
};
use tracing::info;

use crate::{
    care::WateringWindow,
    error::StoreError,
    models::{
        DeleteOutcome, InsertOutcome, PlantSort, UpdateOutcome, CATEGORY_FIELD,
        CREATED_AT_FIELD, EMAIL_FIELD, NEXT_WATERING_FIELD,
    },
};

pub const PLANTS: &str = "plants";
pub const USERS: &str = "users";
pub const FEEDBACK: &str = "feedback";
pub const CONTACT: &str = "contact";

/// Every gateway route maps onto exactly one of these calls.
#[async_trait]
pub trait PlantCareStore: Send + Sync {
    /// Declares the lookup indexes on `users.email` and `plants.email`.
    async fn ensure_indexes(&self) -> Result<(), StoreError>;

    async fn find_user(&self, email: &str) -> Result<Option<Document>, StoreError>;
    async fn insert_user(&self, user: Document) -> Result<InsertOutcome, StoreError>;
    /// `$set` without upsert.
    async fn update_user(&self, email: &str, fields: Document) -> Result<UpdateOutcome, StoreError>;

    async fn find_plant(&self, id: ObjectId) -> Result<Option<Document>, StoreError>;
    async fn plants_for_owner(&self, email: &str) -> Result<Vec<Document>, StoreError>;
    /// Only [`PlantSort::NextWatering`] is applied here; care-level ordering
    /// happens after retrieval.
    async fn list_plants(
        &self,
        category: Option<&str>,
        sort: PlantSort,
    ) -> Result<Vec<Document>, StoreError>;
    async fn newest_plants(&self, limit: i64) -> Result<Vec<Document>, StoreError>;
    async fn insert_plant(&self, plant: Document) -> Result<InsertOutcome, StoreError>;
    /// `$set` with upsert: a missing plant is created under `id`.
    async fn upsert_plant(&self, id: ObjectId, fields: Document) -> Result<UpdateOutcome, StoreError>;
    async fn delete_plant(&self, id: ObjectId) -> Result<DeleteOutcome, StoreError>;
    async fn upcoming_plants(
        &self,
        email: &str,
        window: &WateringWindow,
    ) -> Result<Vec<Document>, StoreError>;

    async fn list_feedback(&self) -> Result<Vec<Document>, StoreError>;
    async fn insert_feedback(&self, feedback: Document) -> Result<InsertOutcome, StoreError>;

    async fn insert_contact(&self, message: Document) -> Result<InsertOutcome, StoreError>;

    async fn count_plants(&self) -> Result<u64, StoreError>;
    async fn count_feedback(&self) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct MongoStore {
    plants: Collection<Document>,
    users: Collection<Document>,
    feedback: Collection<Document>,
    contact: Collection<Document>,
}

impl MongoStore {
    /// Connects and pings the deployment so a bad URI fails at startup rather
    /// than on the first request.
    pub async fn connect(
        uri: &str,
        db_name: &str,
        server_selection_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut client_options = ClientOptions::parse(uri).await?;
        client_options.server_selection_timeout = Some(server_selection_timeout);
        client_options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        client_options.server_api = Some(stable_api());

        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 }).await?;
        info!(db_name, "Connected to MongoDB");

        Ok(Self::new(&db))
    }

    pub fn new(db: &Database) -> Self {
        Self {
            plants: db.collection(PLANTS),
            users: db.collection(USERS),
            feedback: db.collection(FEEDBACK),
            contact: db.collection(CONTACT),
        }
    }
}

/// Pins Stable API v1, rejecting commands and options outside it.
fn stable_api() -> ServerApi {
    ServerApi::builder()
        .version(ServerApiVersion::V1)
        .strict(true)
        .deprecation_errors(true)
        .build()
}

fn email_index() -> IndexModel {
    IndexModel::builder().keys(doc! { EMAIL_FIELD: 1 }).build()
}

fn plant_filter(category: Option<&str>) -> Document {
    match category {
        Some(category) => doc! { CATEGORY_FIELD: category },
        None => doc! {},
    }
}

impl From<InsertOneResult> for InsertOutcome {
    fn from(result: InsertOneResult) -> Self {
        Self {
            acknowledged: true,
            inserted_id: result.inserted_id,
        }
    }
}

impl From<UpdateResult> for UpdateOutcome {
    fn from(result: UpdateResult) -> Self {
        UpdateOutcome::new(result.matched_count, result.modified_count, result.upserted_id)
    }
}

impl From<DeleteResult> for DeleteOutcome {
    fn from(result: DeleteResult) -> Self {
        Self {
            acknowledged: true,
            deleted_count: result.deleted_count,
        }
    }
}

#[async_trait]
impl PlantCareStore for MongoStore {
    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        self.users.create_index(email_index()).await?;
        self.plants.create_index(email_index()).await?;
        info!("Ensured email indexes on {USERS} and {PLANTS}");
        Ok(())
    }

    async fn find_user(&self, email: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.users.find_one(doc! { EMAIL_FIELD: email }).await?)
    }

    async fn insert_user(&self, user: Document) -> Result<InsertOutcome, StoreError> {
        Ok(self.users.insert_one(user).await?.into())
    }

    async fn update_user(&self, email: &str, fields: Document) -> Result<UpdateOutcome, StoreError> {
        let result = self
            .users
            .update_one(doc! { EMAIL_FIELD: email }, doc! { "$set": fields })
            .await?;
        Ok(result.into())
    }

    async fn find_plant(&self, id: ObjectId) -> Result<Option<Document>, StoreError> {
        Ok(self.plants.find_one(doc! { "_id": id }).await?)
    }

    async fn plants_for_owner(&self, email: &str) -> Result<Vec<Document>, StoreError> {
        let cursor = self.plants.find(doc! { EMAIL_FIELD: email }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_plants(
        &self,
        category: Option<&str>,
        sort: PlantSort,
    ) -> Result<Vec<Document>, StoreError> {
        let mut find = self.plants.find(plant_filter(category));
        if sort == PlantSort::NextWatering {
            find = find.sort(doc! { NEXT_WATERING_FIELD: 1 });
        }
        Ok(find.await?.try_collect().await?)
    }

    async fn newest_plants(&self, limit: i64) -> Result<Vec<Document>, StoreError> {
        let cursor = self
            .plants
            .find(doc! {})
            .sort(doc! { CREATED_AT_FIELD: -1 })
            .limit(limit)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_plant(&self, plant: Document) -> Result<InsertOutcome, StoreError> {
        Ok(self.plants.insert_one(plant).await?.into())
    }

    async fn upsert_plant(&self, id: ObjectId, fields: Document) -> Result<UpdateOutcome, StoreError> {
        let result = self
            .plants
            .update_one(doc! { "_id": id }, doc! { "$set": fields })
            .upsert(true)
            .await?;
        Ok(result.into())
    }

    async fn delete_plant(&self, id: ObjectId) -> Result<DeleteOutcome, StoreError> {
        Ok(self.plants.delete_one(doc! { "_id": id }).await?.into())
    }

    async fn upcoming_plants(
        &self,
        email: &str,
        window: &WateringWindow,
    ) -> Result<Vec<Document>, StoreError> {
        let filter = doc! {
            EMAIL_FIELD: email,
            NEXT_WATERING_FIELD: {
                "$gte": window.lower_bound(),
                "$lt": window.upper_bound(),
            },
        };
        let cursor = self
            .plants
            .find(filter)
            .sort(doc! { NEXT_WATERING_FIELD: 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_feedback(&self) -> Result<Vec<Document>, StoreError> {
        Ok(self.feedback.find(doc! {}).await?.try_collect().await?)
    }

    async fn insert_feedback(&self, feedback: Document) -> Result<InsertOutcome, StoreError> {
        Ok(self.feedback.insert_one(feedback).await?.into())
    }

    async fn insert_contact(&self, message: Document) -> Result<InsertOutcome, StoreError> {
        Ok(self.contact.insert_one(message).await?.into())
    }

    async fn count_plants(&self) -> Result<u64, StoreError> {
        Ok(self.plants.count_documents(doc! {}).await?)
    }

    async fn count_feedback(&self) -> Result<u64, StoreError> {
        Ok(self.feedback.count_documents(doc! {}).await?)
    }
}
