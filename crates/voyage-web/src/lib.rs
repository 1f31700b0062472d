//! Axum JSON API + Askama dashboard for the travel planner.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use askama::Template;
use axum::{
    extract::{Form, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use voyage_adapters::{hotel_properties, normalize_all_flights, normalize_hotels};
use voyage_agent::{
    format_records, generate_itinerary, get_recommendation, shared_llm, AgentError, AgentExecutor, GeminiConfig,
    RecommendationKind, DEFAULT_GEMINI_BASE_URL, DEFAULT_MODEL,
};
use voyage_core::{
    FlightRecord, FlightRequest, FlightSearchResponse, HotelRecord, HotelRequest, HotelSearchResponse,
    ItineraryRequest, ItineraryResponse,
};
use voyage_search::{
    flight_search_params, hotel_search_params, SearchClientConfig, SearchError, SearchProvider, SerpApiClient,
    DEFAULT_BASE_URL as DEFAULT_SERPAPI_BASE_URL,
};

pub const CRATE_NAME: &str = "voyage-web";

/// Round-trip code the dashboard sends for every flight search.
const DASHBOARD_TRIP_TYPE: &str = "1";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub serpapi_api_key: String,
    pub port: u16,
    pub llm_model: String,
    pub gemini_base_url: String,
    pub serpapi_base_url: String,
    pub http_timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl AppConfig {
    /// Missing API keys are passed through empty; the providers reject them.
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: std::env::var("GOOGLE_API_KEY").unwrap_or_default(),
            serpapi_api_key: std::env::var("SERPER_API_KEY").unwrap_or_default(),
            port: std::env::var("VOYAGE_WEB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            llm_model: std::env::var("VOYAGE_LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            gemini_base_url: std::env::var("VOYAGE_GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            serpapi_base_url: std::env::var("VOYAGE_SERPAPI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_SERPAPI_BASE_URL.to_string()),
            http_timeout_secs: std::env::var("VOYAGE_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            user_agent: std::env::var("VOYAGE_USER_AGENT").ok(),
        }
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.gemini_api_key.clone(),
            model: self.llm_model.clone(),
            base_url: self.gemini_base_url.clone(),
            timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }

    pub fn search_config(&self) -> SearchClientConfig {
        SearchClientConfig {
            base_url: self.serpapi_base_url.clone(),
            timeout: Duration::from_secs(self.http_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<dyn SearchProvider>,
    pub agent: Arc<dyn AgentExecutor>,
    pub serpapi_api_key: String,
    pub workspace_root: PathBuf,
}

impl AppState {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        agent: Arc<dyn AgentExecutor>,
        serpapi_api_key: impl Into<String>,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            search,
            agent,
            serpapi_api_key: serpapi_api_key.into(),
            workspace_root: workspace_root.into(),
        }
    }

    /// Live SerpApi client plus the process-wide Gemini handle.
    pub fn from_config(config: &AppConfig, workspace_root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let search = SerpApiClient::new(config.search_config())?;
        let agent = shared_llm(&config.gemini_config())?;
        Ok(Self::new(
            Arc::new(search),
            Arc::new(agent),
            config.serpapi_api_key.clone(),
            workspace_root,
        ))
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Search API error: {0}")]
    Search(#[from] SearchError),
    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = match &self {
            ApiError::Search(err) => {
                error!(error = %err, "search provider call failed");
                self.to_string()
            }
            ApiError::Agent(err) => {
                error!(error = %err, "agent execution failed");
                "Internal Server Error".to_string()
            }
        };
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "detail": detail })),
        )
            .into_response()
    }
}

pub async fn search_flights(state: &AppState, request: &FlightRequest) -> Result<FlightSearchResponse, ApiError> {
    info!(origin = %request.origin, destination = %request.destination, "searching flights");
    let raw = state
        .search
        .search(&flight_search_params(request, &state.serpapi_api_key))
        .await?;
    let flights = normalize_all_flights(&raw, &request.return_date);
    let ai_flight_recommendation =
        get_recommendation(state.agent.as_ref(), RecommendationKind::Flights, &format_records(&flights)).await?;
    Ok(FlightSearchResponse {
        flights,
        ai_flight_recommendation,
    })
}

pub async fn search_hotels(state: &AppState, request: &HotelRequest) -> Result<HotelSearchResponse, ApiError> {
    info!(location = %request.location, "searching hotels");
    let raw = state
        .search
        .search(&hotel_search_params(request, &state.serpapi_api_key))
        .await?;
    let hotels = normalize_hotels(&hotel_properties(&raw), &request.location);
    let ai_hotel_recommendation =
        get_recommendation(state.agent.as_ref(), RecommendationKind::Hotels, &format_records(&hotels)).await?;
    Ok(HotelSearchResponse {
        hotels,
        ai_hotel_recommendation,
    })
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/search_flights/", post(search_flights_handler))
        .route("/search_flights", post(search_flights_handler))
        .route("/search_hotels/", post(search_hotels_handler))
        .route("/search_hotels", post(search_hotels_handler))
        .route("/generate_itinerary/", post(generate_itinerary_handler))
        .route("/generate_itinerary", post(generate_itinerary_handler))
        .route("/dashboard/flights", post(dashboard_flights_handler))
        .route("/dashboard/hotels", post(dashboard_hotels_handler))
        .route("/dashboard/itinerary", post(dashboard_itinerary_handler))
        .route("/assets/static/app.css", get(app_css_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "starting travel planning API server");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn search_flights_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FlightRequest>,
) -> Result<Json<FlightSearchResponse>, ApiError> {
    search_flights(&state, &request).await.map(Json)
}

async fn search_hotels_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HotelRequest>,
) -> Result<Json<HotelSearchResponse>, ApiError> {
    search_hotels(&state, &request).await.map(Json)
}

async fn generate_itinerary_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ItineraryRequest>,
) -> Json<ItineraryResponse> {
    let itinerary = generate_itinerary(state.agent.as_ref(), &request).await;
    Json(ItineraryResponse { itinerary })
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    flight_form: FlightForm,
    hotel_form: HotelForm,
}

#[derive(Template)]
#[template(path = "flights.html")]
struct FlightResultsTemplate {
    flight_form: FlightForm,
    flights: Vec<FlightRecord>,
    recommendation: String,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "hotels.html")]
struct HotelResultsTemplate {
    hotel_form: HotelForm,
    hotels: Vec<HotelRecord>,
    recommendation: String,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "itinerary.html")]
struct ItineraryTemplate {
    destination: String,
    itinerary: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FlightForm {
    origin: String,
    destination: String,
    outbound_date: String,
    return_date: String,
}

impl Default for FlightForm {
    fn default() -> Self {
        Self {
            origin: "BLR".to_string(),
            destination: "HYD".to_string(),
            outbound_date: "2025-03-10".to_string(),
            return_date: "2025-03-17".to_string(),
        }
    }
}

impl FlightForm {
    fn to_request(&self) -> FlightRequest {
        FlightRequest {
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            outbound_date: self.outbound_date.clone(),
            return_date: self.return_date.clone(),
            trip_type: DASHBOARD_TRIP_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct HotelForm {
    location: String,
    check_in_date: String,
    check_out_date: String,
}

impl Default for HotelForm {
    fn default() -> Self {
        Self {
            location: "Bangalore".to_string(),
            check_in_date: "2025-03-10".to_string(),
            check_out_date: "2025-03-17".to_string(),
        }
    }
}

impl HotelForm {
    fn to_request(&self) -> HotelRequest {
        HotelRequest {
            location: self.location.clone(),
            check_in_date: self.check_in_date.clone(),
            check_out_date: self.check_out_date.clone(),
        }
    }
}

fn or_no_recommendation(text: String) -> String {
    if text.trim().is_empty() {
        "No recommendation available.".to_string()
    } else {
        text
    }
}

async fn index_handler() -> Response {
    render_html(IndexTemplate {
        flight_form: FlightForm::default(),
        hotel_form: HotelForm::default(),
    })
}

async fn dashboard_flights_handler(State(state): State<Arc<AppState>>, Form(form): Form<FlightForm>) -> Response {
    let tpl = match search_flights(&state, &form.to_request()).await {
        Ok(resp) => FlightResultsTemplate {
            flight_form: form,
            flights: resp.flights,
            recommendation: or_no_recommendation(resp.ai_flight_recommendation),
            error: None,
        },
        Err(err) => FlightResultsTemplate {
            flight_form: form,
            flights: vec![],
            recommendation: String::new(),
            error: Some(format!("Error searching flights: {err}")),
        },
    };
    render_html(tpl)
}

async fn dashboard_hotels_handler(State(state): State<Arc<AppState>>, Form(form): Form<HotelForm>) -> Response {
    let tpl = match search_hotels(&state, &form.to_request()).await {
        Ok(resp) => HotelResultsTemplate {
            hotel_form: form,
            hotels: resp.hotels,
            recommendation: or_no_recommendation(resp.ai_hotel_recommendation),
            error: None,
        },
        Err(err) => HotelResultsTemplate {
            hotel_form: form,
            hotels: vec![],
            recommendation: String::new(),
            error: Some(format!("Error searching hotels: {err}")),
        },
    };
    render_html(tpl)
}

async fn dashboard_itinerary_handler(
    State(state): State<Arc<AppState>>,
    Form(request): Form<ItineraryRequest>,
) -> Response {
    let itinerary = generate_itinerary(state.agent.as_ref(), &request).await;
    render_html(ItineraryTemplate {
        destination: request.destination,
        itinerary,
    })
}

async fn app_css_handler(State(state): State<Arc<AppState>>) -> Response {
    let css_path = state.workspace_root.join("assets/static/app.css");
    match tokio::fs::read_to_string(&css_path).await {
        Ok(css) => ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, Html("/* missing app.css */".to_string())).into_response(),
    }
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {}", err)),
    )
        .into_response()
}
