use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voyage_adapters::{hotel_properties, load_raw_response, normalize_all_flights, normalize_hotels};
use voyage_core::{FlightRequest, HotelRequest, ItineraryRequest};
use voyage_web::{AppConfig, AppState};

#[derive(Debug, Parser)]
#[command(name = "voyage-cli")]
#[command(about = "Travel planner: flight/hotel search with AI recommendations")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP API and dashboard.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Search flights and print normalized records as JSON.
    Flights(FlightArgs),
    /// Search hotels and print normalized records as JSON.
    Hotels(HotelArgs),
    /// Generate a day-by-day itinerary.
    Itinerary(ItineraryArgs),
}

#[derive(Debug, Args)]
struct FlightArgs {
    #[arg(long, default_value = "BLR")]
    origin: String,
    #[arg(long, default_value = "HYD")]
    destination: String,
    #[arg(long, default_value = "2025-03-10")]
    outbound_date: String,
    #[arg(long, default_value = "2025-03-17")]
    return_date: String,
    /// Provider trip-type code ("1" round trip, "2" one way).
    #[arg(long = "type", default_value = "1")]
    trip_type: String,
    /// Normalize a saved google_flights response instead of calling the API.
    #[arg(long)]
    from_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct HotelArgs {
    #[arg(long, default_value = "Bangalore")]
    location: String,
    #[arg(long, default_value = "2025-03-10")]
    check_in_date: String,
    #[arg(long, default_value = "2025-03-17")]
    check_out_date: String,
    /// Normalize a saved google_hotels response instead of calling the API.
    #[arg(long)]
    from_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ItineraryArgs {
    #[arg(long)]
    destination: String,
    #[arg(long)]
    check_in_date: String,
    #[arg(long)]
    check_out_date: String,
    #[arg(long, default_value = "")]
    flights: String,
    #[arg(long, default_value = "")]
    hotels: String,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voyage=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            let state = AppState::from_config(&config, ".")?;
            voyage_web::serve(state, port.unwrap_or(config.port)).await?;
        }
        Commands::Flights(args) => {
            if let Some(path) = args.from_file {
                let raw = load_raw_response(&path)?;
                let flights = normalize_all_flights(&raw, &args.return_date);
                println!("{}", serde_json::to_string_pretty(&flights)?);
                return Ok(());
            }
            let request = FlightRequest {
                origin: args.origin,
                destination: args.destination,
                outbound_date: args.outbound_date,
                return_date: args.return_date,
                trip_type: args.trip_type,
            };
            let state = AppState::from_config(&config, ".")?;
            let resp = voyage_web::search_flights(&state, &request).await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        Commands::Hotels(args) => {
            if let Some(path) = args.from_file {
                let raw = load_raw_response(&path)?;
                let hotels = normalize_hotels(&hotel_properties(&raw), &args.location);
                println!("{}", serde_json::to_string_pretty(&hotels)?);
                return Ok(());
            }
            let request = HotelRequest {
                location: args.location,
                check_in_date: args.check_in_date,
                check_out_date: args.check_out_date,
            };
            let state = AppState::from_config(&config, ".")?;
            let resp = voyage_web::search_hotels(&state, &request).await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        Commands::Itinerary(args) => {
            let request = ItineraryRequest {
                destination: args.destination,
                check_in_date: args.check_in_date,
                check_out_date: args.check_out_date,
                flights: args.flights,
                hotels: args.hotels,
            };
            let state = AppState::from_config(&config, ".")?;
            println!("{}", voyage_agent::generate_itinerary(state.agent.as_ref(), &request).await);
        }
    }

    Ok(())
}
