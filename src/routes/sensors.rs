// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sensor reading and scheduler handlers.

use super::{callable, CallResult, Callable};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthPolicy;
use crate::models::{SensorKind, SensorReadingResponse};
use crate::AppState;
use axum::{extract::State, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_PAGE_LIMIT: u32 = 10;
const MAX_PAGE_LIMIT: u32 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/getSensorData", callable(get_sensor_data, AuthPolicy::Public))
        .route(
            "/getAllSensorData",
            callable(get_all_sensor_data, AuthPolicy::Public),
        )
        .route("/scheduler", callable(update_scheduler, AuthPolicy::AdminOnly))
}

// ─── Latest Readings ─────────────────────────────────────────

/// Most recent reading of every sensor kind.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestReadings {
    pub ec_level: Option<SensorReadingResponse>,
    pub humidity: Option<SensorReadingResponse>,
    pub light_resistance: Option<SensorReadingResponse>,
    pub ph_level: Option<SensorReadingResponse>,
    pub snap_a: Option<SensorReadingResponse>,
    pub snap_b: Option<SensorReadingResponse>,
    pub temperature: Option<SensorReadingResponse>,
    pub water_level: Option<SensorReadingResponse>,
}

async fn latest(state: &AppState, kind: SensorKind) -> Result<Option<SensorReadingResponse>> {
    Ok(state
        .db
        .latest_reading(kind)
        .await?
        .map(SensorReadingResponse::from))
}

async fn get_sensor_data(State(state): State<Arc<AppState>>) -> Result<CallResult<LatestReadings>> {
    let (ec_level, humidity, light_resistance, ph_level, snap_a, snap_b, temperature, water_level) =
        tokio::try_join!(
            latest(&state, SensorKind::EcLevel),
            latest(&state, SensorKind::Humidity),
            latest(&state, SensorKind::LightResistance),
            latest(&state, SensorKind::PhLevel),
            latest(&state, SensorKind::SnapA),
            latest(&state, SensorKind::SnapB),
            latest(&state, SensorKind::Temperature),
            latest(&state, SensorKind::WaterLevel),
        )?;

    Ok(CallResult(LatestReadings {
        ec_level,
        humidity,
        light_resistance,
        ph_level,
        snap_a,
        snap_b,
        temperature,
        water_level,
    }))
}

// ─── Reading History ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorPageRequest {
    #[serde(default)]
    pub collection_name: String,
    pub page_index: Option<u32>,
    pub limit: Option<u32>,
}

impl SensorPageRequest {
    /// Resolve `(kind, offset, limit)`; rejects unknown collections.
    fn resolve(&self) -> Result<(SensorKind, u32, u32)> {
        let kind = SensorKind::from_collection(self.collection_name.trim()).ok_or_else(|| {
            AppError::InvalidArgument(format!("Unknown collection: {}", self.collection_name))
        })?;

        let limit = match self.limit {
            None | Some(0) => DEFAULT_PAGE_LIMIT,
            Some(limit) => limit.min(MAX_PAGE_LIMIT),
        };
        let offset = self
            .page_index
            .unwrap_or(0)
            .checked_mul(limit)
            .ok_or_else(AppError::invalid_payload)?;

        Ok((kind, offset, limit))
    }
}

#[derive(Debug, Serialize)]
pub struct SensorPage {
    pub data: Vec<SensorReadingResponse>,
    pub count: usize,
}

/// One page of a sensor's readings, newest first, plus the total count.
async fn get_all_sensor_data(
    State(state): State<Arc<AppState>>,
    Callable(payload): Callable<SensorPageRequest>,
) -> Result<CallResult<SensorPage>> {
    let (kind, offset, limit) = payload.resolve()?;

    let (readings, count) = tokio::try_join!(
        state.db.readings_page(kind, offset, limit),
        state.db.count_readings(kind),
    )?;

    Ok(CallResult(SensorPage {
        data: readings.into_iter().map(SensorReadingResponse::from).collect(),
        count,
    }))
}

// ─── Scheduler ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerRequest {
    #[serde(default)]
    pub doc_name: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Merge fields into a scheduler document.
async fn update_scheduler(
    State(state): State<Arc<AppState>>,
    Callable(payload): Callable<SchedulerRequest>,
) -> Result<CallResult<()>> {
    let doc_name = payload.doc_name.trim();
    if doc_name.is_empty() || doc_name.contains('/') {
        return Err(AppError::invalid_payload());
    }

    let serde_json::Value::Object(fields) = payload.data else {
        return Err(AppError::invalid_payload());
    };

    state.db.update_scheduler(doc_name, &fields).await?;

    tracing::info!(doc = doc_name, fields = fields.len(), "Scheduler updated");
    Ok(CallResult(()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(collection: &str, page_index: Option<u32>, limit: Option<u32>) -> SensorPageRequest {
        SensorPageRequest {
            collection_name: collection.to_string(),
            page_index,
            limit,
        }
    }

    #[test]
    fn page_defaults() {
        let (kind, offset, limit) = request("ph_level", None, None).resolve().unwrap();
        assert_eq!(kind, SensorKind::PhLevel);
        assert_eq!((offset, limit), (0, 10));
    }

    #[test]
    fn page_offset_and_cap() {
        let (_, offset, limit) = request("humidity", Some(3), Some(20)).resolve().unwrap();
        assert_eq!((offset, limit), (60, 20));

        let (_, offset, limit) = request("humidity", Some(2), Some(5000)).resolve().unwrap();
        assert_eq!((offset, limit), (200, 100));
    }

    #[test]
    fn unknown_collection_rejected() {
        assert!(matches!(
            request("users", None, None).resolve(),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            request("", None, None).resolve(),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn latest_readings_use_camel_case_keys() {
        let json = serde_json::to_value(LatestReadings {
            ec_level: None,
            humidity: None,
            light_resistance: None,
            ph_level: None,
            snap_a: None,
            snap_b: None,
            temperature: None,
            water_level: None,
        })
        .unwrap();
        for key in [
            "ecLevel",
            "humidity",
            "lightResistance",
            "phLevel",
            "snapA",
            "snapB",
            "temperature",
            "waterLevel",
        ] {
            assert!(json[key].is_null(), "{key}");
            assert!(json.as_object().unwrap().contains_key(key));
        }
    }
}
