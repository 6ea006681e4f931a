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

//! # Availability Query Builder
//!
//! Side-effect free URL construction for the reservation backend. The caller
//! supplies the cache-busting token so these functions stay deterministic.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed query parameters every availability call carries.
const FIXED_PARAMS: [(&str, &str); 3] = [("customer_id", "0"), ("company_id", "0"), ("locale", "en-US")];

pub const RESOURCES_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySpan {
    Daily,
    Weekly,
}

/// One availability lookup. Dates are `YYYY-MM-DD` and forwarded as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub facility_id: String,
    pub start_date: String,
    pub end_date: String,
    pub span: QuerySpan,
}

impl AvailabilityQuery {
    pub fn daily(facility_id: impl Into<String>, date: impl Into<String>) -> Self {
        let date = date.into();
        Self {
            facility_id: facility_id.into(),
            start_date: date.clone(),
            end_date: date,
            span: QuerySpan::Daily,
        }
    }

    pub fn weekly(
        facility_id: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            facility_id: facility_id.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            span: QuerySpan::Weekly,
        }
    }

    /// Picks the daily or weekly budget from the two configured timeouts.
    pub fn timeout(&self, daily: Duration, weekly: Duration) -> Duration {
        match self.span {
            QuerySpan::Daily => daily,
            QuerySpan::Weekly => weekly,
        }
    }

    /// Full request URL under `tenant_root` (`{base}/{organization}`).
    pub fn url(&self, tenant_root: &str, ui_random: u64) -> String {
        let mut params = vec![
            ("start_date", self.start_date.as_str()),
            ("end_date", self.end_date.as_str()),
        ];
        params.extend(FIXED_PARAMS);
        let ui_random = ui_random.to_string();
        params.push(("ui_random", ui_random.as_str()));

        format!(
            "{}/rest/reservation/resource/availability/daily/{}?{}",
            tenant_root,
            urlencoding::encode(&self.facility_id),
            encode_query(&params)
        )
    }
}

/// Landing page for one facility: the booking hand-off target and the Referer
/// the portal itself sends.
pub fn facility_detail_url(tenant_root: &str, facility_id: &str) -> String {
    format!(
        "{}/reservation/landing/search/detail/{}",
        tenant_root,
        urlencoding::encode(facility_id)
    )
}

pub fn resource_listing_url(tenant_root: &str) -> String {
    format!("{}/rest/reservation/resource?locale=en-US", tenant_root)
}

/// Value of the `page_info` header used to page the resource listing.
pub fn page_info_header(page_number: u32) -> String {
    serde_json::json!({
        "page_number": page_number,
        "total_records_per_page": RESOURCES_PER_PAGE,
    })
    .to_string()
}

fn encode_query(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
