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

//! Live end-to-end checks against the Mississauga reservation portal.
//!
//! Needs chromedriver listening on the configured WebDriver URL
//! (`chromedriver --port=9515`) and network access.
//!
//! ============================================================================
//! CI SAFETY: All live tests are IGNORED by default
//! ============================================================================
//! To run manually:
//!     cargo test --test t_availability_integration_live -- --ignored --nocapture

use anyhow::{Result, ensure};
use chrono::{Duration, Local};
use slotscout_facility_client::{AvailabilityResponse, ClientConfig, FacilityService};
use tokio::time::sleep;

const LIVE_FACILITY_ID: &str = "2143";

fn live_service() -> Result<FacilityService> {
    let mut config = ClientConfig::default();
    if let Ok(url) = std::env::var("SLOTSCOUT_WEBDRIVER_URL") {
        config.webdriver_url = url;
    }
    Ok(FacilityService::from_config(config)?)
}

#[tokio::test]
#[ignore]
async fn live_cookie_harvest() -> Result<()> {
    let service = live_service()?;
    let outcome = service.refresh_cookies().await;
    println!("refresh_cookies: {:?}", outcome);
    ensure!(outcome.success, "refresh failed: {:?}", outcome.error);

    let jar = service.client().session().jar().await;
    println!("cookies: {:?}", jar.names().collect::<Vec<_>>());
    Ok(())
}

#[tokio::test]
#[ignore]
async fn live_weekly_availability() -> Result<()> {
    let service = live_service()?;
    let start = Local::now().date_naive() + Duration::days(1);
    let end = start + Duration::days(6);

    let outcome = service
        .get_facility_weekly_availability(
            LIVE_FACILITY_ID,
            &start.format("%Y-%m-%d").to_string(),
            &end.format("%Y-%m-%d").to_string(),
        )
        .await;
    ensure!(outcome.success, "weekly lookup failed: {:?}", outcome.error);

    let days = AvailabilityResponse::new(outcome.data.unwrap_or_default()).daily_bookings();
    println!("{} days in response", days.len());
    for day in &days {
        println!("  {} booked: {:?}", day.date, day.booked);
    }

    // Be polite between live requests.
    sleep(std::time::Duration::from_secs(1)).await;

    let daily = service
        .get_facility_availability(LIVE_FACILITY_ID, &start.format("%Y-%m-%d").to_string())
        .await;
    ensure!(daily.success, "daily lookup failed: {:?}", daily.error);
    Ok(())
}
