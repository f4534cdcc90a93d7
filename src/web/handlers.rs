//! Request handlers
//!
//! Database work runs on the blocking pool with a cloned [`Database`] handle;
//! the pooled connection is returned when the closure finishes.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Html,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::error::ApiError;
use super::AppState;
use crate::services::days::{self, DayRecordsResponse, DoseInput, ReadingInput};

const INDEX_PAGE: &str = include_str!("../../static/index.html");
const EDIT_PAGE: &str = include_str!("../../static/edit.html");

/// Body of a day replace; both lists may be omitted
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DayPayload {
    #[serde(default)]
    pub bp_readings: Vec<ReadingInput>,
    #[serde(default)]
    pub medications: Vec<DoseInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ApiError::InvalidDate(raw.to_string()))
}

/// Viewer page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// Editor page
pub async fn edit() -> Html<&'static str> {
    Html(EDIT_PAGE)
}

/// Every reading and dose
#[instrument(skip(state))]
pub async fn get_all_data(State(state): State<AppState>) -> Result<Json<DayRecordsResponse>, ApiError> {
    let db = state.db.clone();
    let records = tokio::task::spawn_blocking(move || days::fetch_all(&db)).await??;
    debug!(readings = records.readings.len(), doses = records.doses.len(), "fetched all records");
    Ok(Json(records.into()))
}

/// Records of one date
#[instrument(skip(state))]
pub async fn get_day_data(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DayRecordsResponse>, ApiError> {
    let date = parse_date(&date)?;
    let db = state.db.clone();
    let records = tokio::task::spawn_blocking(move || days::fetch_day(&db, date)).await??;
    Ok(Json(records.into()))
}

/// Replace every record of one date with the submitted ones
#[instrument(skip(state, payload))]
pub async fn replace_day_data(
    State(state): State<AppState>,
    Path(date): Path<String>,
    payload: Result<Json<DayPayload>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let date = parse_date(&date)?;
    let Json(payload) = payload?;

    let db = state.db.clone();
    let summary = tokio::task::spawn_blocking(move || {
        days::replace_day(&db, date, &payload.bp_readings, &payload.medications)
    })
    .await??;

    debug!(?summary, "day replaced");
    Ok(Json(SuccessResponse { success: true }))
}
