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

//! # Facility Service
//!
//! The boundary the presentation layer calls. Every operation returns an
//! [`Outcome`], serialized as `{"success": true, "data": ...}` or
//! `{"success": false, "error": "..."}`. Nothing here panics or propagates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::availability_query::{AvailabilityQuery, facility_detail_url};
use crate::catalog::{Catalog, CatalogLoader, Facility};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::external_open;
use crate::facility_client::FacilityClient;
use crate::session::{CookieSource, Session};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Outcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    fn from_result(operation: &str, result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                tracing::error!("{} failed: {}", operation, e);
                Self::fail(e.to_string())
            }
        }
    }
}

/// Batch entry as the presentation layer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityAvailability {
    pub facility_id: String,
    #[serde(flatten)]
    pub outcome: Outcome<Value>,
}

/// What a resource sync changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub path: PathBuf,
    /// Records found in the catalog before the sync.
    pub existing: usize,
    /// Listing records whose id was new.
    pub added: usize,
    pub total: usize,
    pub centers: usize,
}

#[derive(Clone)]
pub struct FacilityService {
    catalog: CatalogLoader,
    client: FacilityClient,
}

impl FacilityService {
    pub fn new(catalog: CatalogLoader, client: FacilityClient) -> Self {
        Self { catalog, client }
    }

    /// Service with a headless-browser session, as used by the desktop app.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let session = Arc::new(Session::with_browser(&config));
        Self::with_session(config, session)
    }

    pub fn with_cookie_source(config: ClientConfig, source: Arc<dyn CookieSource>) -> Result<Self> {
        Self::with_session(config, Arc::new(Session::new(source)))
    }

    fn with_session(config: ClientConfig, session: Arc<Session>) -> Result<Self> {
        let catalog = CatalogLoader::new(config.catalog_path.clone());
        let client = FacilityClient::new(config, session)?;
        Ok(Self::new(catalog, client))
    }

    pub fn client(&self) -> &FacilityClient {
        &self.client
    }

    pub fn catalog(&self) -> &CatalogLoader {
        &self.catalog
    }

    pub async fn get_facilities(&self) -> Outcome<Vec<Facility>> {
        Outcome::from_result("get_facilities", self.catalog.load_all().await)
    }

    pub async fn get_facilities_by_center(&self, center_name: &str) -> Outcome<Vec<Facility>> {
        Outcome::from_result(
            "get_facilities_by_center",
            self.catalog.load_by_center(center_name).await,
        )
    }

    pub async fn get_unique_centers(&self) -> Outcome<Vec<String>> {
        Outcome::from_result("get_unique_centers", self.catalog.list_centers().await)
    }

    pub async fn get_facility_availability(&self, facility_id: &str, date: &str) -> Outcome<Value> {
        let result = self
            .client
            .get_daily(facility_id, date)
            .await
            .map(|r| r.into_raw());
        Outcome::from_result("get_facility_availability", result)
    }

    pub async fn get_facility_weekly_availability(
        &self,
        facility_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> Outcome<Value> {
        let result = self
            .client
            .get_weekly(facility_id, start_date, end_date)
            .await
            .map(|r| r.into_raw());
        Outcome::from_result("get_facility_weekly_availability", result)
    }

    /// Weekly lookups for many facilities at once, the way a calendar view
    /// fills its visible rows. Failed rows carry their own error.
    pub async fn get_batch_weekly_availability(
        &self,
        facility_ids: &[String],
        start_date: &str,
        end_date: &str,
    ) -> Vec<FacilityAvailability> {
        let queries = facility_ids
            .iter()
            .map(|id| AvailabilityQuery::weekly(id.as_str(), start_date, end_date))
            .collect();
        self.client
            .get_batch(queries)
            .await
            .into_iter()
            .map(|item| FacilityAvailability {
                outcome: Outcome::from_result(
                    "get_batch_weekly_availability",
                    item.result.map(|r| r.into_raw()),
                ),
                facility_id: item.query.facility_id,
            })
            .collect()
    }

    /// Cookie count of the new session.
    pub async fn refresh_cookies(&self) -> Outcome<usize> {
        Outcome::from_result("refresh_cookies", self.client.session().refresh().await)
    }

    /// Page the resource listing and merge it into the catalog at `output`
    /// (the configured catalog by default). Known ids keep their stored
    /// record. Nothing is written if any page fails.
    pub async fn sync_resources(&self, output: Option<&Path>) -> Outcome<SyncSummary> {
        Outcome::from_result("sync_resources", self.sync_into(output).await)
    }

    async fn sync_into(&self, output: Option<&Path>) -> Result<SyncSummary> {
        let target = match output {
            Some(path) => CatalogLoader::new(path),
            None => self.catalog.clone(),
        };
        let existing = target.existing_records().await?;
        let existing_count = existing.len();

        let fresh = self.client.fetch_all_resources().await?;
        let (catalog, added) = Catalog::merge_listing(existing, fresh);
        catalog.write_to(target.path()).await?;

        tracing::info!(
            "Catalog {}: {} existing, {} added, {} centers",
            target.path().display(),
            existing_count,
            added,
            catalog.centers.len()
        );
        Ok(SyncSummary {
            path: target.path().to_path_buf(),
            existing: existing_count,
            added,
            total: catalog.total_facilities(),
            centers: catalog.centers.len(),
        })
    }

    pub fn booking_url(&self, facility_id: &str) -> String {
        facility_detail_url(&self.client.config().tenant_root(), facility_id)
    }

    /// Fire-and-forget. Failures are logged and otherwise ignored.
    pub async fn open_external(&self, url: &str) {
        if let Err(e) = external_open::open_external(url) {
            tracing::error!("open_external failed: {}", e);
        }
    }
}
