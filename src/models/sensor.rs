// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sensor readings, one Firestore collection per sensor kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Sensor kinds, each backed by its own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Temperature,
    EcLevel,
    Humidity,
    LightResistance,
    PhLevel,
    WaterLevel,
    SnapA,
    SnapB,
}

impl SensorKind {
    /// Every kind, in the order reports list them.
    pub const ALL: [SensorKind; 8] = [
        SensorKind::Temperature,
        SensorKind::EcLevel,
        SensorKind::Humidity,
        SensorKind::LightResistance,
        SensorKind::PhLevel,
        SensorKind::WaterLevel,
        SensorKind::SnapA,
        SensorKind::SnapB,
    ];

    /// Kinds covered by the per-sensor min/max daily report.
    pub const DAILY_REPORTED: [SensorKind; 6] = [
        SensorKind::Temperature,
        SensorKind::EcLevel,
        SensorKind::Humidity,
        SensorKind::LightResistance,
        SensorKind::PhLevel,
        SensorKind::WaterLevel,
    ];

    /// Firestore collection name (also the report folder name).
    pub fn collection(self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::EcLevel => "ec_level",
            SensorKind::Humidity => "humidity",
            SensorKind::LightResistance => "light_resistance",
            SensorKind::PhLevel => "ph_level",
            SensorKind::WaterLevel => "water_level",
            SensorKind::SnapA => "snap_a",
            SensorKind::SnapB => "snap_b",
        }
    }

    /// Human-readable label used in report titles.
    pub fn label(self) -> &'static str {
        match self {
            SensorKind::Temperature => "Temperature",
            SensorKind::EcLevel => "EC Level",
            SensorKind::Humidity => "Humidity",
            SensorKind::LightResistance => "Light Resistance",
            SensorKind::PhLevel => "PH Level",
            SensorKind::WaterLevel => "Water Level",
            SensorKind::SnapA => "Snap A",
            SensorKind::SnapB => "Snap B",
        }
    }

    pub fn from_collection(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.collection() == name)
    }
}

/// A stored sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Numeric value, string-encoded. Numeric documents are stringified on read.
    #[serde(deserialize_with = "string_or_number")]
    pub value: String,
    /// When the reading was taken
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub datetime: DateTime<Utc>,
}

impl SensorReading {
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

/// Timestamp in the shape callable clients already read (`datetime._seconds`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WireTimestamp {
    #[serde(rename = "_seconds")]
    pub seconds: i64,
    #[serde(rename = "_nanoseconds")]
    pub nanoseconds: u32,
}

impl From<DateTime<Utc>> for WireTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self {
            seconds: value.timestamp(),
            nanoseconds: value.timestamp_subsec_nanos(),
        }
    }
}

/// Reading as returned to callable clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReadingResponse {
    pub value: String,
    pub datetime: WireTimestamp,
}

impl From<SensorReading> for SensorReadingResponse {
    fn from(reading: SensorReading) -> Self {
        Self {
            value: reading.value,
            datetime: reading.datetime.into(),
        }
    }
}

/// One sensor's readings for one day, newest first.
#[derive(Debug, Clone)]
pub struct SensorDay {
    pub kind: SensorKind,
    pub readings: Vec<SensorReading>,
}

impl SensorDay {
    /// Numeric values sorted highest first; non-numeric values are skipped.
    pub fn values_descending(&self) -> Vec<f64> {
        let mut values: Vec<f64> = self
            .readings
            .iter()
            .filter_map(SensorReading::numeric_value)
            .collect();
        values.sort_by(|a, b| b.total_cmp(a));
        values
    }

    /// `(lowest, highest)` of the day's numeric values.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let values = self.values_descending();
        match (values.last(), values.first()) {
            (Some(&min), Some(&max)) => Some((min, max)),
            _ => None,
        }
    }
}
