//! Normalizers from raw SerpApi payloads into the canonical travel records.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use tracing::warn;
use voyage_core::{FlightRecord, HotelRecord, NOT_AVAILABLE};

pub const CRATE_NAME: &str = "voyage-adapters";

/// Trip-type tag that suppresses the return date.
const ONE_WAY: &str = "oneway";

const PREFERRED_FLIGHTS: &str = "best_flights";
const REMAINING_FLIGHTS: &str = "other_flights";

/// Loads a saved provider response (for offline normalization and fixtures).
pub fn load_raw_response(path: impl AsRef<Path>) -> Result<JsonValue> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

fn json_get<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let mut cur = value;
    for segment in path {
        cur = cur.get(*segment)?;
    }
    Some(cur)
}

fn json_str<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a str> {
    json_get(value, path)?.as_str()
}

fn json_array<'a>(value: &'a JsonValue, path: &[&str]) -> &'a [JsonValue] {
    json_get(value, path)
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Scalar rendered the way it reads in the payload: strings verbatim, numbers as JSON text.
fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn truthy_f64(value: Option<&JsonValue>) -> Option<f64> {
    value.and_then(JsonValue::as_f64).filter(|v| *v != 0.0)
}

fn non_empty_str<'a>(value: &'a JsonValue, key: &str) -> Option<&'a str> {
    value.get(key).and_then(JsonValue::as_str).filter(|s| !s.is_empty())
}

fn airport_label(leg: &JsonValue, key: &str) -> String {
    match leg.get(key) {
        Some(airport) if airport.is_object() => format!(
            "{} - {}",
            json_str(airport, &["id"]).unwrap_or(NOT_AVAILABLE),
            json_str(airport, &["name"]).unwrap_or(NOT_AVAILABLE)
        ),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn stops_label(layover_count: usize) -> String {
    if layover_count == 0 {
        "Non-stop".to_string()
    } else {
        format!("{layover_count} stop(s)")
    }
}

/// Whole sums print without a fraction; fractional leg durations are kept.
fn minutes_label(total: f64) -> String {
    if total.fract() == 0.0 {
        format!("{total:.0}")
    } else {
        total.to_string()
    }
}

/// Maps one flight option (`best_flights[i]` / `other_flights[i]`) into a record.
pub fn normalize_flight(raw_entry: &JsonValue, return_date: &str) -> FlightRecord {
    let legs = json_array(raw_entry, &["flights"]);
    let layovers = json_array(raw_entry, &["layovers"]);
    let first = legs.first();
    let last = legs.last();

    let airline = first
        .and_then(|leg| json_str(leg, &["airline"]))
        .unwrap_or(NOT_AVAILABLE)
        .to_string();
    let airline_logo = first
        .and_then(|leg| json_str(leg, &["airline_logo"]))
        .unwrap_or_default()
        .to_string();
    let travel_class = first
        .and_then(|leg| json_str(leg, &["travel_class"]))
        .unwrap_or(NOT_AVAILABLE)
        .to_string();

    let price = raw_entry
        .get("price")
        .and_then(scalar_text)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let total_minutes: f64 = legs
        .iter()
        .map(|leg| leg.get("duration").and_then(JsonValue::as_f64).unwrap_or(0.0))
        .fold(0.0, |acc, minutes| acc + minutes);

    let (departure, arrival) = match (first, last) {
        (Some(first), Some(last)) => (
            airport_label(first, "departure_airport"),
            airport_label(last, "arrival_airport"),
        ),
        _ => (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()),
    };

    let trip_type = json_str(raw_entry, &["type"]).unwrap_or(ONE_WAY);
    let return_date = if trip_type.eq_ignore_ascii_case(ONE_WAY) {
        NOT_AVAILABLE.to_string()
    } else {
        return_date.to_string()
    };

    FlightRecord {
        airline,
        price: format!("${price}"),
        duration: format!("{} minutes", minutes_label(total_minutes)),
        stops: stops_label(layovers.len()),
        departure,
        arrival,
        travel_class,
        return_date,
        airline_logo,
    }
}

/// Preferred bucket first, then the remaining bucket, each in provider order.
pub fn normalize_all_flights(raw_response: &JsonValue, return_date: &str) -> Vec<FlightRecord> {
    [PREFERRED_FLIGHTS, REMAINING_FLIGHTS]
        .iter()
        .flat_map(|bucket| json_array(raw_response, &[*bucket]))
        .map(|entry| normalize_flight(entry, return_date))
        .collect()
}

/// The `properties` list of a google_hotels response; empty when absent.
pub fn hotel_properties(raw_response: &JsonValue) -> Vec<JsonValue> {
    json_array(raw_response, &["properties"]).to_vec()
}

fn normalize_hotel(hotel: &JsonValue, location: &str) -> HotelRecord {
    let link = non_empty_str(hotel, "link")
        .or_else(|| json_str(hotel, &["serpapi_property_details_link"]))
        .unwrap_or_default()
        .to_string();
    let price = json_get(hotel, &["rate_per_night", "extracted_lowest"])
        .and_then(scalar_text)
        .unwrap_or_else(|| "0".to_string());

    HotelRecord {
        name: json_str(hotel, &["name"]).unwrap_or("No name").to_string(),
        price,
        rating: truthy_f64(hotel.get("overall_rating")).unwrap_or(0.0),
        location: location.to_string(),
        link,
    }
}

/// Skips (and logs) entries that are not JSON objects; order is preserved.
pub fn normalize_hotels(raw_list: &[JsonValue], location: &str) -> Vec<HotelRecord> {
    raw_list
        .iter()
        .filter_map(|entry| {
            if entry.is_object() {
                Some(normalize_hotel(entry, location))
            } else {
                warn!(entry = %entry, "skipping non-object hotel entry");
                None
            }
        })
        .collect()
}
