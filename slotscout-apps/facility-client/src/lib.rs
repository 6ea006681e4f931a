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

// Library for slotscout-facility-client
// Catalog, session and availability client for municipal facility bookings

mod availability_parser;
mod availability_query;
mod catalog;
mod config;
mod cookie_jar;
mod error;
mod external_open;
mod facade;
mod facility_client;
mod session;

pub use availability_parser::{AvailabilityResponse, DailyBookings, TimeRange, parse_time};
pub use availability_query::{
    AvailabilityQuery, QuerySpan, RESOURCES_PER_PAGE, facility_detail_url, page_info_header,
    resource_listing_url,
};
pub use catalog::{Catalog, CatalogLoader, CenterEntry, Facility, FacilityRecord, UNKNOWN_CENTER};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_ORGANIZATION, DEFAULT_USER_AGENT};
pub use cookie_jar::CookieJar;
pub use error::{ClientError, Result};
pub use external_open::{is_openable, open_external};
pub use facade::{FacilityAvailability, FacilityService, Outcome, SyncSummary};
pub use facility_client::{BatchItem, FacilityClient, ResourcePage};
pub use session::{BrowserCookieSource, CookieSource, HarvestFuture, Session};
