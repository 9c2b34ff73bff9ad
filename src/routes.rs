//! One handler per gateway endpoint. Each performs a single logical store
//! operation and returns either JSON or an [`AppError`].

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    Json,
};
use mongodb::bson::{oid::ObjectId, Bson, DateTime, Document};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    care::{sort_by_care_level, WateringWindow},
    error::AppError,
    json::{document_to_json, documents_to_json, json_to_document},
    models::{
        ContactReceipt, DashboardStats, PlantListParams, PlantSort, UserUpdateResponse,
        CREATED_AT_FIELD, EMAIL_FIELD,
    },
    state::AppState,
};

pub const LIVENESS_MESSAGE: &str = "plant-care-tracker-server is running";

const CONTACT_FIELDS: [&str; 3] = ["name", "email", "message"];

type JsonBody = Result<Json<Value>, JsonRejection>;

fn body_document(body: JsonBody) -> Result<Document, AppError> {
    let Json(value) = body.map_err(|_| AppError::MalformedPayload)?;
    json_to_document(value)
}

/// `$set` payloads never touch `_id` and must change something.
fn update_fields(body: JsonBody) -> Result<Document, AppError> {
    let mut fields = body_document(body)?;
    fields.remove("_id");
    if fields.is_empty() {
        return Err(AppError::EmptyUpdate);
    }
    Ok(fields)
}

fn parse_plant_id(id: String) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(&id).map_err(|_| AppError::InvalidId(id))
}

/// Mirrors a JavaScript truthiness check on a required field.
fn is_present(doc: &Document, field: &str) -> bool {
    match doc.get(field) {
        None | Some(Bson::Null) | Some(Bson::Undefined) => false,
        Some(Bson::String(s)) => !s.is_empty(),
        Some(Bson::Boolean(b)) => *b,
        Some(_) => true,
    }
}

pub async fn root_handler() -> &'static str {
    LIVENESS_MESSAGE
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    debug!(%email, "Requested user");
    let user = state.store.find_user(&email).await?;
    Ok(Json(user.map_or(Value::Null, document_to_json)))
}

/// Returns the stored user when the email is already known; the lookup and
/// insert are separate calls, so concurrent first sign-ins can both insert.
pub async fn create_user_handler(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<Response, AppError> {
    let user = body_document(body)?;
    let email = user
        .get_str(EMAIL_FIELD)
        .map_err(|_| AppError::MissingEmail)?
        .to_string();

    if let Some(existing) = state.store.find_user(&email).await? {
        debug!(%email, "User already exists");
        return Ok(Json(document_to_json(existing)).into_response());
    }

    let outcome = state.store.insert_user(user).await?;
    info!(%email, "Created user");
    Ok(Json(outcome).into_response())
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(email): Path<String>,
    body: JsonBody,
) -> Result<Json<UserUpdateResponse>, AppError> {
    let fields = update_fields(body)?;
    let outcome = state.store.update_user(&email, fields).await?;
    Ok(Json(UserUpdateResponse::from_outcome(&outcome)))
}

pub async fn get_plant_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_plant_id(id)?;
    debug!(%id, "Requested plant");
    let plant = state.store.find_plant(id).await?;
    Ok(Json(plant.map_or(Value::Null, document_to_json)))
}

pub async fn my_plants_handler(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    let plants = state.store.plants_for_owner(&email).await?;
    Ok(Json(documents_to_json(plants)))
}

pub async fn list_plants_handler(
    State(state): State<AppState>,
    params: Result<Query<PlantListParams>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = params.map_err(|_| AppError::MalformedPayload)?;
    let sort = params.sort();

    let mut plants = state.store.list_plants(params.category(), sort).await?;
    if sort == PlantSort::CareLevel {
        sort_by_care_level(&mut plants);
    }
    Ok(Json(documents_to_json(plants)))
}

pub async fn new_plants_handler(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let plants = state
        .store
        .newest_plants(state.settings.page_size_new_plants)
        .await?;
    Ok(Json(documents_to_json(plants)))
}

pub async fn create_plant_handler(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<Response, AppError> {
    let plant = body_document(body)?;
    let outcome = state.store.insert_plant(plant).await?;
    Ok(Json(outcome).into_response())
}

pub async fn update_plant_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody,
) -> Result<Response, AppError> {
    let id = parse_plant_id(id)?;
    let fields = update_fields(body)?;
    let outcome = state.store.upsert_plant(id, fields).await?;
    if outcome.upserted_id.is_some() {
        info!(%id, "Created plant through upsert");
    }
    Ok(Json(outcome).into_response())
}

pub async fn delete_plant_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_plant_id(id)?;
    let outcome = state.store.delete_plant(id).await?;
    info!(%id, deleted = outcome.deleted_count, "Deleted plant");
    Ok(Json(outcome).into_response())
}

pub async fn upcoming_plants_handler(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    let window = WateringWindow::from_today(state.settings.upcoming_window_days);
    debug!(
        %email,
        from = %window.lower_bound(),
        until = %window.upper_bound(),
        "Upcoming watering lookup"
    );
    let plants = state.store.upcoming_plants(&email, &window).await?;
    Ok(Json(documents_to_json(plants)))
}

pub async fn list_feedback_handler(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let feedback = state.store.list_feedback().await?;
    Ok(Json(documents_to_json(feedback)))
}

pub async fn create_feedback_handler(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<Response, AppError> {
    let feedback = body_document(body)?;
    let outcome = state.store.insert_feedback(feedback).await?;
    Ok(Json(outcome).into_response())
}

pub async fn contact_handler(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<Json<ContactReceipt>, AppError> {
    let submission = body_document(body)?;
    if !CONTACT_FIELDS.iter().all(|f| is_present(&submission, f)) {
        return Err(AppError::MissingContactFields);
    }

    let mut message = Document::new();
    for field in CONTACT_FIELDS {
        if let Some(value) = submission.get(field) {
            message.insert(field, value.clone());
        }
    }
    message.insert(CREATED_AT_FIELD, DateTime::now());

    let outcome = state.store.insert_contact(message).await?;
    info!("Stored contact message");
    Ok(Json(ContactReceipt {
        success: true,
        inserted_id: outcome.inserted_id,
    }))
}

pub async fn dashboard_stats_handler(
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    let (plants, feedbacks) =
        tokio::try_join!(state.store.count_plants(), state.store.count_feedback())?;
    Ok(Json(DashboardStats { plants, feedbacks }))
}
