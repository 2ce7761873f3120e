//! Read models derived from snapshot data for the chart, map, home and
//! model gallery screens. Pure functions over records.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Map center used before any location has been reported
pub const DEFAULT_MAP_CENTER: (f64, f64) = (43.945969, -78.8938948);

const SKETCHFAB_EMBED: &str = "https://sketchfab.com/models";

/// Detections of one species on one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Count detections of `species` per day, oldest day first.
///
/// Matches `name` exactly; records without a parseable `date` are skipped.
pub fn daily_counts(records: &[Record], species: &str) -> Vec<DailyCount> {
    let mut by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for record in records {
        if record.str_field("name") != Some(species) {
            continue;
        }
        if let Some(date) = record.str_field("date").and_then(parse_day) {
            *by_day.entry(date).or_insert(0) += 1;
        }
    }
    by_day
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

/// Accepts `YYYY-MM-DD...`, RFC 3339 and RFC 2822 (Flask's default datetime format)
fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Species names offered by the chart picker, server order, no repeats
pub fn species_names(info: &[Record]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in info.iter().filter_map(|r| r.str_field("name")) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Fact sheet for the species currently on screen
pub fn facts_for<'a>(facts: &'a [Record], species_name: &str) -> Option<&'a Record> {
    facts
        .iter()
        .find(|r| r.str_field("speciesName") == Some(species_name))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub count: u64,
    pub intensity: f64,
}

pub fn intensity_for(count: u64) -> f64 {
    if count >= 10 {
        1.0
    } else if count >= 5 {
        0.5
    } else {
        0.1
    }
}

/// Weighted heatmap points; locations without coordinates are dropped
pub fn heat_points(locations: &[Record]) -> Vec<HeatPoint> {
    locations
        .iter()
        .filter_map(|r| {
            let latitude = r.f64_field("latitude")?;
            let longitude = r.f64_field("longitude")?;
            let count = r.f64_field("count").unwrap_or(0.0).max(0.0) as u64;
            Some(HeatPoint {
                latitude,
                longitude,
                count,
                intensity: intensity_for(count),
            })
        })
        .collect()
}

/// Center the map on the most recently reported location
pub fn map_center(locations: &[Record]) -> (f64, f64) {
    heat_points(locations)
        .last()
        .map(|p| (p.latitude, p.longitude))
        .unwrap_or(DEFAULT_MAP_CENTER)
}

/// A 3D model in the gallery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLink {
    pub name: String,
    pub model_id: String,
}

impl ModelLink {
    pub fn new(name: &str, model_id: &str) -> Self {
        Self {
            name: name.to_string(),
            model_id: model_id.to_string(),
        }
    }

    pub fn embed_url(&self) -> String {
        format!("{}/{}/embed", SKETCHFAB_EMBED, self.model_id)
    }
}

pub fn default_models() -> Vec<ModelLink> {
    vec![
        ModelLink::new("Box Tree Moth", "2949ae402083404ca44d0443b4304790"),
        ModelLink::new("Northern Hornet", "4115611dc93443099e8ecf17623aa533"),
        ModelLink::new("Spotted Lanternfly", "59121bc98ec04bd6a7b735180b6c6a76"),
        ModelLink::new("Japanese Beetle", "4dbca70bdfde4408ab0ab7adcbf6b74a"),
        ModelLink::new("Stink Bugs", "111a0a13b8cd45e286055b9c8f5fd883"),
        ModelLink::new("Ant", "7e72cde969c34b6b8a25d840bd5c9a6f"),
        ModelLink::new("Bumble Bee", "95f06a2ac6184acc808db8aba10fb65b"),
        ModelLink::new("Ladybug", "7ab6a0f4e41746fb92963d1d135e698d"),
        ModelLink::new("Monarch Butterfly", "d642db74a3fa491a8143bd088b408094"),
        ModelLink::new("Wolf Spider", "6392e4cfb64d407182fdad2cea9e0abe"),
    ]
}
