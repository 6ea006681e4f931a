//!  Slotscout Facility Client
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Slotscout CLI
//!
//! Diagnostic front-end over the facility service.
//!
//! # Examples
//!
//! ```bash
//! slotscout centers
//! slotscout facilities --center "Central Library" --bookable
//! slotscout daily 2143 2026-02-15
//! slotscout weekly 2143 2026-02-15 2026-02-21 --open 08:00 --close 22:00
//! slotscout refresh-cookies
//! slotscout sync-resources --output data/all_facilities.json
//! slotscout open 2143
//! ```
//!
//! `--json` prints the raw `{success, data | error}` outcome instead of tables.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use slotscout_facility_client::{
    AvailabilityResponse, ClientConfig, Facility, FacilityService, Outcome, parse_time,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "slotscout")]
#[command(author, version, about = "Browse municipal facility availability")]
struct Args {
    /// JSON file overriding the built-in client configuration
    #[arg(long, env = "SLOTSCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Catalog document (center -> facilities)
    #[arg(long, env = "SLOTSCOUT_CATALOG")]
    catalog: Option<PathBuf>,

    /// Backend scheme and host, e.g. https://anc.ca.apm.activecommunities.com
    #[arg(long, env = "SLOTSCOUT_BASE_URL")]
    base_url: Option<String>,

    /// Tenant path segment, e.g. activemississauga
    #[arg(long, env = "SLOTSCOUT_ORGANIZATION")]
    organization: Option<String>,

    /// chromedriver endpoint used to mint session cookies
    #[arg(long, env = "SLOTSCOUT_WEBDRIVER_URL")]
    webdriver_url: Option<String>,

    /// Refresh cookies and retry once when the backend answers 401/403
    #[arg(long)]
    refresh_on_auth_failure: bool,

    /// Print raw JSON outcomes
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List center names
    Centers,

    /// List facilities, optionally for one center
    Facilities {
        #[arg(short, long)]
        center: Option<String>,

        /// Only facilities that accept online permits
        #[arg(short, long)]
        bookable: bool,
    },

    /// Booked slots for one day
    Daily { facility_id: String, date: String },

    /// Booked and free slots over a date range
    Weekly {
        facility_id: String,
        start_date: String,
        end_date: String,

        /// Opening time used to derive free slots (HH:MM)
        #[arg(long, default_value = "08:00")]
        open: String,

        /// Closing time used to derive free slots (HH:MM)
        #[arg(long, default_value = "22:00")]
        close: String,
    },

    /// Launch the headless browser and harvest fresh session cookies
    RefreshCookies,

    /// Page the backend resource listing and merge it into the catalog
    SyncResources {
        /// Defaults to the configured catalog path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Open a facility's booking page in the default browser
    Open { facility_id: String },
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_writer(std::io::stderr),
        )
        .init();
}

fn build_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_json_file(path)?,
        None => ClientConfig::default(),
    };
    if let Some(catalog) = &args.catalog {
        config.catalog_path = catalog.clone();
    }
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(organization) = &args.organization {
        config.organization = organization.clone();
    }
    if let Some(webdriver_url) = &args.webdriver_url {
        config.webdriver_url = webdriver_url.clone();
    }
    if args.refresh_on_auth_failure {
        config.refresh_on_auth_failure = true;
    }
    Ok(config)
}

/// Get terminal width for responsive tables
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(100)
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let kept: String = s.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", kept)
}

fn print_json<T: Serialize>(outcome: &Outcome<T>) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(outcome).context("Failed to serialize outcome")?
    );
    Ok(())
}

fn into_data<T>(outcome: Outcome<T>) -> Result<T> {
    match (outcome.success, outcome.data) {
        (true, Some(data)) => Ok(data),
        _ => bail!(outcome.error.unwrap_or_else(|| "operation failed".to_string())),
    }
}

fn render_facilities(facilities: &[Facility]) {
    let width = get_terminal_width();
    let name_width = width.saturating_sub(8 + 28 + 18 + 6 + 8 + 10).max(20);

    println!(
        "{:<8}  {:<28}  {:<nw$}  {:<18}  {:>4}  {}",
        "ID",
        "CENTER",
        "NAME",
        "TYPE",
        "CAP",
        "ONLINE",
        nw = name_width
    );
    println!("{}", "-".repeat(width.min(140)));
    for f in facilities {
        println!(
            "{:<8}  {:<28}  {:<nw$}  {:<18}  {:>4}  {}",
            f.id,
            truncate(&f.center_name, 28),
            truncate(&f.name, name_width),
            truncate(&f.type_name, 18),
            f.max_capacity,
            if f.is_bookable_online() { "yes" } else { "no" },
            nw = name_width
        );
    }
    println!("\n{} facilities", facilities.len());
}

fn render_availability(payload: Value, window: Option<(&str, &str)>) -> Result<()> {
    let window = match window {
        Some((open, close)) => Some((
            parse_time(open).with_context(|| format!("Invalid opening time: {}", open))?,
            parse_time(close).with_context(|| format!("Invalid closing time: {}", close))?,
        )),
        None => None,
    };

    let days = AvailabilityResponse::new(payload).daily_bookings();
    if days.is_empty() {
        println!("No daily details in response.");
        return Ok(());
    }

    for day in &days {
        let label = day
            .parsed_date()
            .map(|d| d.format("%a %b %d, %Y").to_string())
            .unwrap_or_else(|| day.date.clone());
        println!("{}", label);

        if day.booked.is_empty() {
            println!("  booked: none");
        } else {
            let booked: Vec<String> = day.booked.iter().map(ToString::to_string).collect();
            println!("  booked: {}", booked.join(", "));
        }

        if let Some((open, close)) = window {
            let free: Vec<String> = day
                .free_ranges(open, close)
                .iter()
                .map(ToString::to_string)
                .collect();
            if free.is_empty() {
                println!("  free:   none");
            } else {
                println!("  free:   {}", free.join(", "));
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);
    tracing::debug!("Parsed args: {:?}", args);

    let config = build_config(&args)?;
    let catalog_path = config.catalog_path.clone();
    let service = FacilityService::from_config(config).context("Failed to create facility service")?;

    match args.command {
        Command::Centers => {
            let outcome = service.get_unique_centers().await;
            if args.json {
                return print_json(&outcome);
            }
            for center in into_data(outcome)? {
                println!("{}", center);
            }
        }
        Command::Facilities { center, bookable } => {
            let mut outcome = match center.as_deref() {
                Some(center) => service.get_facilities_by_center(center).await,
                None => service.get_facilities().await,
            };
            if bookable {
                if let Some(list) = outcome.data.as_mut() {
                    list.retain(Facility::is_bookable_online);
                }
            }
            if args.json {
                return print_json(&outcome);
            }
            render_facilities(&into_data(outcome)?);
        }
        Command::Daily { facility_id, date } => {
            let outcome = service.get_facility_availability(&facility_id, &date).await;
            if args.json {
                return print_json(&outcome);
            }
            println!("Facility {} on {}\n", facility_id, date);
            render_availability(into_data(outcome)?, None)?;
            println!("\nBook at: {}", service.booking_url(&facility_id));
        }
        Command::Weekly {
            facility_id,
            start_date,
            end_date,
            open,
            close,
        } => {
            let outcome = service
                .get_facility_weekly_availability(&facility_id, &start_date, &end_date)
                .await;
            if args.json {
                return print_json(&outcome);
            }
            println!("Facility {} from {} to {}\n", facility_id, start_date, end_date);
            render_availability(into_data(outcome)?, Some((open.as_str(), close.as_str())))?;
            println!("\nBook at: {}", service.booking_url(&facility_id));
        }
        Command::RefreshCookies => {
            let outcome = service.refresh_cookies().await;
            if args.json {
                return print_json(&outcome);
            }
            println!("Session refreshed: {} cookies", into_data(outcome)?);
        }
        Command::SyncResources { output } => {
            let output = output.unwrap_or(catalog_path);
            let outcome = service.sync_resources(Some(&output)).await;
            if args.json {
                return print_json(&outcome);
            }
            let summary = into_data(outcome).context("Resource sync failed")?;
            println!(
                "Added {} new facilities to {} existing: {} facilities in {} centers saved to {}",
                summary.added,
                summary.existing,
                summary.total,
                summary.centers,
                summary.path.display()
            );
        }
        Command::Open { facility_id } => {
            let url = service.booking_url(&facility_id);
            service.open_external(&url).await;
            println!("{}", url);
        }
    }

    Ok(())
}
