//! Typed survey report with a fallback for every field.
//!
//! The model's JSON is never trusted to be complete or well-typed. This is the
//! one place that turns it into a fully populated [`SurveyReport`]; renderers
//! consume the report and never see a missing field.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FALLBACK_CUSTOMER: &str = "Valued Customer";
pub const FALLBACK_SURVEY_ID: &str = "GW-SURVEY";
pub const FALLBACK_LOCATION: &str = "Location not specified";
pub const FALLBACK_COORDINATE: &str = "N/A";
pub const FALLBACK_DATE: &str = "Not specified";
pub const FALLBACK_DEPTH: &str = "To be determined on site";
pub const FALLBACK_YIELD: &str = "Not estimated";
pub const FALLBACK_ROCK_TYPE: &str = "Not identified";
pub const FALLBACK_WATER_QUALITY: &str = "Not assessed";
pub const FALLBACK_ANALYSIS: &str = "No detailed analysis was returned for this survey.";
pub const FALLBACK_RECOMMENDATIONS: &str = "Consult a local hydrogeologist before drilling.";
pub const UNKNOWN_CHANCE_LEVEL: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillingPoint {
    pub point_id: String,
    pub latitude: String,
    pub longitude: String,
    pub depth: String,
    pub chance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyReport {
    pub customer_name: String,
    pub survey_id: String,
    pub location: String,
    pub latitude: String,
    pub longitude: String,
    pub survey_date: String,
    /// Always within `0.0..=100.0`.
    pub percentage_chance: f64,
    pub chance_level: String,
    pub recommended_depth: String,
    pub expected_yield: String,
    pub rock_type: String,
    pub water_quality: String,
    pub analysis: String,
    pub recommendations: String,
    pub points: Vec<DrillingPoint>,
}

/// Qualitative label for a water-probability percentage.
pub fn chance_level_for(percentage: f64) -> &'static str {
    if percentage >= 70.0 {
        "High"
    } else if percentage >= 40.0 {
        "Moderate"
    } else {
        "Low"
    }
}

/// Look a field up under its camelCase name, then its snake_case alias.
fn field<'a>(obj: &'a Map<String, Value>, camel: &str, snake: &str) -> Option<&'a Value> {
    obj.get(camel).or_else(|| obj.get(snake)).filter(|v| !v.is_null())
}

fn text(obj: &Map<String, Value>, camel: &str, snake: &str, fallback: &str) -> String {
    match field(obj, camel, snake) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => fallback.to_string(),
    }
}

/// Numbers, numeric strings, and `"78%"` become a percentage clamped to 0..=100.
fn percentage(value: Option<&Value>) -> Option<f64> {
    let raw = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    raw.is_finite().then(|| raw.clamp(0.0, 100.0))
}

impl DrillingPoint {
    fn from_value(index: usize, value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);
        Self {
            point_id: text(obj, "pointId", "point_id", &format!("P{}", index + 1)),
            latitude: text(obj, "latitude", "lat", FALLBACK_COORDINATE),
            longitude: text(obj, "longitude", "lng", FALLBACK_COORDINATE),
            depth: text(obj, "depth", "recommended_depth", FALLBACK_COORDINATE),
            chance: percentage(field(obj, "chance", "percentage_chance")).unwrap_or(0.0),
        }
    }
}

impl SurveyReport {
    /// Build a report from whatever the model returned. Never fails.
    pub fn from_value(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        let reported = percentage(field(obj, "percentageChance", "percentage_chance"));
        let chance_level = match field(obj, "chanceLevel", "chance_level") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => reported
                .map(|p| chance_level_for(p).to_string())
                .unwrap_or_else(|| UNKNOWN_CHANCE_LEVEL.to_string()),
        };

        let points = field(obj, "points", "drilling_points")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .enumerate()
                    .map(|(i, p)| DrillingPoint::from_value(i, p))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            customer_name: text(obj, "customerName", "customer_name", FALLBACK_CUSTOMER),
            survey_id: text(obj, "surveyId", "survey_id", FALLBACK_SURVEY_ID),
            location: text(obj, "location", "address", FALLBACK_LOCATION),
            latitude: text(obj, "latitude", "lat", FALLBACK_COORDINATE),
            longitude: text(obj, "longitude", "lng", FALLBACK_COORDINATE),
            survey_date: text(obj, "surveyDate", "survey_date", FALLBACK_DATE),
            percentage_chance: reported.unwrap_or(0.0),
            chance_level,
            recommended_depth: text(obj, "recommendedDepth", "recommended_depth", FALLBACK_DEPTH),
            expected_yield: text(obj, "expectedYield", "expected_yield", FALLBACK_YIELD),
            rock_type: text(obj, "rockType", "rock_type", FALLBACK_ROCK_TYPE),
            water_quality: text(obj, "waterQuality", "water_quality", FALLBACK_WATER_QUALITY),
            analysis: text(obj, "analysis", "summary", FALLBACK_ANALYSIS),
            recommendations: text(
                obj,
                "recommendations",
                "recommendation",
                FALLBACK_RECOMMENDATIONS,
            ),
            points,
        }
    }

    /// Fixed plain-text layout of the report.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(60);

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "GROUNDWATER SURVEY REPORT  {}", self.survey_id);
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Customer        : {}", self.customer_name);
        let _ = writeln!(out, "Location        : {}", self.location);
        let _ = writeln!(out, "Coordinates     : {}, {}", self.latitude, self.longitude);
        let _ = writeln!(out, "Survey date     : {}", self.survey_date);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Chance of water : {:.0}% ({})",
            self.percentage_chance, self.chance_level
        );
        let _ = writeln!(out, "Drilling depth  : {}", self.recommended_depth);
        let _ = writeln!(out, "Expected yield  : {}", self.expected_yield);
        let _ = writeln!(out, "Rock type       : {}", self.rock_type);
        let _ = writeln!(out, "Water quality   : {}", self.water_quality);
        let _ = writeln!(out);
        let _ = writeln!(out, "Analysis");
        let _ = writeln!(out, "{}", self.analysis);
        let _ = writeln!(out);
        let _ = writeln!(out, "Recommendations");
        let _ = writeln!(out, "{}", self.recommendations);

        if !self.points.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "{:<8} {:<14} {:<14} {:<16} {:>6}",
                "Point", "Latitude", "Longitude", "Depth", "Chance"
            );
            for p in &self.points {
                let _ = writeln!(
                    out,
                    "{:<8} {:<14} {:<14} {:<16} {:>5.0}%",
                    p.point_id, p.latitude, p.longitude, p.depth, p.chance
                );
            }
        }
        let _ = writeln!(out, "{rule}");
        out
    }
}
