//! Agent tasks for flight/hotel recommendations and itinerary planning.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};
use voyage_core::{day_count, DateParseError, ItineraryRequest, PromptLine};

mod gemini;

pub use gemini::{shared_llm, GeminiAgent, GeminiConfig, DEFAULT_GEMINI_BASE_URL, DEFAULT_MODEL};

pub const CRATE_NAME: &str = "voyage-agent";

/// Role/goal/task description handed to the agent-execution service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTask {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub description: String,
    pub expected_output: String,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent request failed: {0}")]
    Request(reqwest::Error),
    #[error("agent returned http status {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("agent response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("agent returned an empty response")]
    EmptyResponse,
    #[error("invalid data type for AI recommendation: {0:?}")]
    InvalidKind(String),
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::Request(err.without_url())
    }
}

#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn kickoff(&self, task: &AgentTask) -> Result<String, AgentError>;
}

#[async_trait]
impl<'a, T: AgentExecutor + ?Sized> AgentExecutor for &'a T {
    async fn kickoff(&self, task: &AgentTask) -> Result<String, AgentError> {
        (**self).kickoff(task).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationKind {
    Flights,
    Hotels,
}

impl RecommendationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flights => "flights",
            Self::Hotels => "hotels",
        }
    }
}

impl fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommendationKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flights" => Ok(Self::Flights),
            "hotels" => Ok(Self::Hotels),
            other => Err(AgentError::InvalidKind(other.to_string())),
        }
    }
}

const FLIGHT_ANALYSIS: &str = "Recommend the best flight from the available options, based on the details provided below:

**Reasoning for Recommendation:**
- **Price:** Provide a detailed explanation about why this flight offers the best value compared to others.
- **Duration:** Explain why this flight has the best duration in comparison to others.
- **Stops:** Discuss why this flight has minimal or optimal stops.
- **Travel Class:** Describe why this flight provides the best comfort and amenities.

Use the provided flight data as the basis for your recommendation. Be sure to justify your choice using clear reasoning for each attribute. Do not repeat the flight details in your response.";

const HOTEL_ANALYSIS: &str = "Based on the following analysis, generate a detailed recommendation for the best hotel. Your response should include clear reasoning based on price, rating, location, and amenities.

**AI Hotel Recommendation**
We recommend the best hotel based on the following analysis:

**Reasoning for Recommendation**:
- **Price:** The recommended hotel is the best option for the price compared to others, offering the best value for the amenities and services provided.
- **Rating:** With a higher rating compared to the alternatives, it ensures a better overall guest experience. Explain why this makes it the best choice.
- **Location:** The hotel is in a prime location, close to important attractions, making it convenient for travelers.
- **Amenities:** The hotel offers amenities like Wi-Fi, pool, fitness center, free breakfast, etc. Discuss how these amenities enhance the experience, making it suitable for different types of travelers.

**Reasoning Requirements**:
- Ensure that each section clearly explains why this hotel is the best option based on the factors of price, rating, location, and amenities.
- Compare it against the other options and explain why this one stands out.
- Provide concise, well-structured reasoning to make the recommendation clear to the traveler.
- Your recommendation should help a traveler make an informed decision based on multiple factors, not just one.";

/// One record per line, in the order given.
pub fn format_records<T: PromptLine>(records: &[T]) -> String {
    records
        .iter()
        .map(PromptLine::to_prompt_line)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn recommendation_task(kind: RecommendationKind, formatted_records: &str) -> AgentTask {
    let (role, goal, backstory, description) = match kind {
        RecommendationKind::Flights => (
            "AI Flight Analyst",
            "Analyze flight options and recommend the best one considering price, duration, stops, and overall convenience.",
            "AI expert that provides in-depth analysis comparing flight options based on multiple factors.",
            FLIGHT_ANALYSIS,
        ),
        RecommendationKind::Hotels => (
            "AI Hotel Analyst",
            "Analyze hotel options and recommend the best one considering price, rating, location, and amenities.",
            "AI expert that provides in-depth analysis comparing hotel options based on multiple factors.",
            HOTEL_ANALYSIS,
        ),
    };

    AgentTask {
        role: role.to_string(),
        goal: goal.to_string(),
        backstory: backstory.to_string(),
        description: format!("{description}\n\nData to analyze:\n{formatted_records}"),
        expected_output: format!(
            "A structured recommendation explaining the best {kind} choice based on the analysis of provided details."
        ),
    }
}

pub async fn get_recommendation(
    executor: &dyn AgentExecutor,
    kind: RecommendationKind,
    formatted_records: &str,
) -> Result<String, AgentError> {
    info!(%kind, "requesting AI analysis");
    debug!(data = formatted_records, "analysis input");
    let task = recommendation_task(kind, formatted_records);
    executor.kickoff(&task).await
}

#[derive(Debug, Error)]
pub enum ItineraryError {
    #[error(transparent)]
    Date(#[from] DateParseError),
    #[error(transparent)]
    Agent(#[from] AgentError),
}

pub fn itinerary_task(request: &ItineraryRequest, days: i64) -> AgentTask {
    let description = format!(
        "Based on the following details, create a {days}-day itinerary for the user:

**Flight Details**:
{flights}

**Hotel Details**:
{hotels}

**Destination**: {destination}

**Travel Dates**: {check_in} to {check_out} ({days} days)

The itinerary should include:
- Flight arrival and departure information
- Hotel check-in and check-out details
- Day-by-day breakdown of activities
- Must-visit attractions and estimated visit times
- Restaurant recommendations for meals
- Tips for local transportation

**Format Requirements**:
- Use markdown formatting with clear headings (# for main headings, ## for days, ### for sections)
- Include emojis for different types of activities (🏛️ for landmarks, 🍽️ for restaurants, etc.)
- Use bullet points for listing activities
- Include estimated timings for each activity
- Format the itinerary to be visually appealing and easy to read",
        flights = request.flights,
        hotels = request.hotels,
        destination = request.destination,
        check_in = request.check_in_date,
        check_out = request.check_out_date,
    );

    AgentTask {
        role: "AI Travel Planner".to_string(),
        goal: "Create a detailed itinerary for the user based on flight and hotel information".to_string(),
        backstory: "AI travel expert generating a day-by-day itinerary including flight details, hotel stays, and must-visit locations in the destination.".to_string(),
        description,
        expected_output: "A well-structured, visually appealing itinerary in markdown format, including flight, hotel, and day-wise breakdown with emojis, headers, and bullet points.".to_string(),
    }
}

pub async fn try_generate_itinerary(
    executor: &dyn AgentExecutor,
    request: &ItineraryRequest,
) -> Result<String, ItineraryError> {
    let days = day_count(&request.check_in_date, &request.check_out_date)?;
    info!(destination = %request.destination, days, "generating itinerary");
    Ok(executor.kickoff(&itinerary_task(request, days)).await?)
}

/// Never fails: errors become the returned itinerary text.
pub async fn generate_itinerary(executor: &dyn AgentExecutor, request: &ItineraryRequest) -> String {
    match try_generate_itinerary(executor, request).await {
        Ok(itinerary) => itinerary,
        Err(err) => {
            warn!(error = %err, "itinerary generation failed");
            format!("An error occurred: {err}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use voyage_core::{FlightRecord, HotelRecord};

    #[derive(Default)]
    struct RecordingAgent {
        tasks: Mutex<Vec<AgentTask>>,
        fail: bool,
    }

    #[async_trait]
    impl AgentExecutor for RecordingAgent {
        async fn kickoff(&self, task: &AgentTask) -> Result<String, AgentError> {
            self.tasks.lock().unwrap().push(task.clone());
            if self.fail {
                Err(AgentError::EmptyResponse)
            } else {
                Ok(format!("done: {}", task.role))
            }
        }
    }

    fn itinerary_request(check_in: &str, check_out: &str) -> ItineraryRequest {
        ItineraryRequest {
            destination: "Hyderabad".into(),
            check_in_date: check_in.into(),
            check_out_date: check_out.into(),
            flights: "IndiGo BLR -> HYD".into(),
            hotels: "Taj Krishna".into(),
        }
    }

    #[test]
    fn kind_parses_only_known_values() {
        assert_eq!("flights".parse::<RecommendationKind>().unwrap(), RecommendationKind::Flights);
        assert_eq!("hotels".parse::<RecommendationKind>().unwrap(), RecommendationKind::Hotels);
        let err = "cars".parse::<RecommendationKind>().unwrap_err();
        assert!(matches!(err, AgentError::InvalidKind(ref k) if k == "cars"));
    }

    #[test]
    fn recommendation_task_appends_data_block() {
        let task = recommendation_task(RecommendationKind::Hotels, "name=Taj");
        assert_eq!(task.role, "AI Hotel Analyst");
        assert!(task.description.ends_with("\n\nData to analyze:\nname=Taj"));
        assert!(task.expected_output.contains("best hotels choice"));

        let task = recommendation_task(RecommendationKind::Flights, "");
        assert_eq!(task.role, "AI Flight Analyst");
        assert!(task.description.starts_with("Recommend the best flight"));
    }

    #[test]
    fn records_format_one_per_line() {
        let hotels = vec![
            HotelRecord {
                name: "A".into(),
                price: "10".into(),
                rating: 4.0,
                location: "Goa".into(),
                link: String::new(),
            },
            HotelRecord {
                name: "B".into(),
                price: "0".into(),
                rating: 0.0,
                location: "Goa".into(),
                link: "l".into(),
            },
        ];
        let text = format_records(&hotels);
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("name=A "));
        assert!(lines[1].starts_with("name=B "));
        assert_eq!(format_records::<FlightRecord>(&[]), "");
    }

    #[tokio::test]
    async fn recommendation_delegates_to_executor() {
        let agent = RecordingAgent::default();
        let out = get_recommendation(&agent, RecommendationKind::Flights, "airline=IndiGo")
            .await
            .unwrap();
        assert_eq!(out, "done: AI Flight Analyst");
        let tasks = agent.tasks.lock().unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].description.contains("airline=IndiGo"));
    }

    #[tokio::test]
    async fn recommendation_failure_propagates() {
        let agent = RecordingAgent {
            fail: true,
            ..RecordingAgent::default()
        };
        let err = get_recommendation(&agent, RecommendationKind::Hotels, "")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::EmptyResponse));
    }

    #[tokio::test]
    async fn itinerary_uses_day_count() {
        let agent = RecordingAgent::default();
        let out = generate_itinerary(&agent, &itinerary_request("2025-03-10", "2025-03-17")).await;
        assert_eq!(out, "done: AI Travel Planner");
        let tasks = agent.tasks.lock().unwrap();
        assert!(tasks[0].description.starts_with("Based on the following details, create a 7-day itinerary"));
        assert!(tasks[0].description.contains("2025-03-10 to 2025-03-17 (7 days)"));
        assert!(tasks[0].description.contains("**Destination**: Hyderabad"));
    }

    #[tokio::test]
    async fn itinerary_errors_become_text() {
        let agent = RecordingAgent::default();
        let out = generate_itinerary(&agent, &itinerary_request("10/03/2025", "2025-03-17")).await;
        assert!(out.contains("error"));
        assert!(out.contains("10/03/2025"));
        assert!(agent.tasks.lock().unwrap().is_empty());

        let failing = RecordingAgent {
            fail: true,
            ..RecordingAgent::default()
        };
        let out = generate_itinerary(&failing, &itinerary_request("2025-03-10", "2025-03-17")).await;
        assert_eq!(out, "An error occurred: agent returned an empty response");
    }
}
