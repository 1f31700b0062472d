//! Core travel records, request/response contracts and date helpers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CRATE_NAME: &str = "voyage-core";

/// Placeholder used for every flight field that cannot be derived.
pub const NOT_AVAILABLE: &str = "N/A";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One normalized flight option, ready for display and for the agent prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub airline: String,
    pub price: String,
    pub duration: String,
    pub stops: String,
    pub departure: String,
    pub arrival: String,
    pub travel_class: String,
    pub return_date: String,
    pub airline_logo: String,
}

/// One normalized hotel property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelRecord {
    pub name: String,
    pub price: String,
    pub rating: f64,
    pub location: String,
    pub link: String,
}

/// Single-line text rendering handed to the agent as analysis data.
pub trait PromptLine {
    fn to_prompt_line(&self) -> String;
}

impl PromptLine for FlightRecord {
    fn to_prompt_line(&self) -> String {
        format!(
            "airline={} price={} duration={} stops={} departure={} arrival={} travel_class={} return_date={}",
            self.airline,
            self.price,
            self.duration,
            self.stops,
            self.departure,
            self.arrival,
            self.travel_class,
            self.return_date
        )
    }
}

impl PromptLine for HotelRecord {
    fn to_prompt_line(&self) -> String {
        format!(
            "name={} price={} rating={} location={} link={}",
            self.name, self.price, self.rating, self.location, self.link
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRequest {
    pub origin: String,
    pub destination: String,
    pub outbound_date: String,
    pub return_date: String,
    /// Provider trip-type code ("1" round trip, "2" one way).
    #[serde(rename = "type")]
    pub trip_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelRequest {
    pub location: String,
    pub check_in_date: String,
    pub check_out_date: String,
}

/// Itinerary input; `flights` and `hotels` are pre-rendered text blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryRequest {
    pub destination: String,
    pub check_in_date: String,
    pub check_out_date: String,
    pub flights: String,
    pub hotels: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlightSearchResponse {
    pub flights: Vec<FlightRecord>,
    pub ai_flight_recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HotelSearchResponse {
    pub hotels: Vec<HotelRecord>,
    pub ai_hotel_recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ItineraryResponse {
    pub itinerary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date {input:?}: expected YYYY-MM-DD ({reason})")]
pub struct DateParseError {
    pub input: String,
    pub reason: String,
}

pub fn parse_date(input: &str) -> Result<NaiveDate, DateParseError> {
    NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|err| DateParseError {
        input: input.to_string(),
        reason: err.to_string(),
    })
}

/// Whole days between check-in and check-out; negative when reversed.
pub fn day_count(check_in: &str, check_out: &str) -> Result<i64, DateParseError> {
    let check_in = parse_date(check_in)?;
    let check_out = parse_date(check_out)?;
    Ok((check_out - check_in).num_days())
}
