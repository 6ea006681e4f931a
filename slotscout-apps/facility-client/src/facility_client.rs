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

//! # Reservation Backend Client
//!
//! Effectful (time, network) operations against the reservation REST API:
//! availability lookups and the paged resource listing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use slotscout_request_pacer::RequestPacer;
use wreq::redirect::Policy;
use wreq_util::Emulation;

use crate::availability_parser::AvailabilityResponse;
use crate::availability_query::{
    AvailabilityQuery, facility_detail_url, page_info_header, resource_listing_url,
};
use crate::catalog::FacilityRecord;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::session::Session;

const AVAILABILITY_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const LISTING_TIMEOUT: Duration = Duration::from_secs(15);

/// One entry of a batch lookup, correlated by its query.
#[derive(Debug)]
pub struct BatchItem {
    pub query: AvailabilityQuery,
    pub result: Result<AvailabilityResponse>,
}

/// One page of the resource listing.
#[derive(Debug, Clone, Default)]
pub struct ResourcePage {
    pub items: Vec<FacilityRecord>,
    /// Entries the backend sent, malformed ones included.
    pub listed: usize,
    pub total: Option<u64>,
}

#[derive(Clone)]
pub struct FacilityClient {
    client: Arc<wreq::Client>,
    session: Arc<Session>,
    config: Arc<ClientConfig>,
    batch_pacer: RequestPacer,
    listing_pacer: RequestPacer,
}

impl FacilityClient {
    pub fn new(config: ClientConfig, session: Arc<Session>) -> Result<Self> {
        let client = wreq::Client::builder()
            .emulation(Emulation::Safari18_5)
            .redirect(Policy::default())
            .build()
            .map_err(|e| ClientError::transport(format!("failed to build HTTP client: {e}")))?;
        let batch_pacer = RequestPacer::with_concurrency_limit(config.max_concurrent);
        let listing_pacer = RequestPacer::with_concurrency_limit(1)
            .min_interval(config.min_request_interval())
            .jitter_factor(0.5);
        Ok(Self {
            client: Arc::new(client),
            session,
            config: Arc::new(config),
            batch_pacer,
            listing_pacer,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn get_daily(&self, facility_id: &str, date: &str) -> Result<AvailabilityResponse> {
        self.query(&AvailabilityQuery::daily(facility_id, date)).await
    }

    pub async fn get_weekly(
        &self,
        facility_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<AvailabilityResponse> {
        self.query(&AvailabilityQuery::weekly(facility_id, start_date, end_date))
            .await
    }

    /// Run one availability lookup.
    ///
    /// An empty jar triggers one refresh first; if that refresh fails the
    /// request still goes out, without cookies.
    pub async fn query(&self, query: &AvailabilityQuery) -> Result<AvailabilityResponse> {
        match self.session.ensure_cookies().await {
            Ok(true) => tracing::debug!("Session cookies acquired lazily"),
            Ok(false) => {}
            Err(e) => tracing::warn!("Cookie refresh failed, continuing without cookies: {}", e),
        }

        let generation = self.session.generation();
        match self.fetch_availability(query).await {
            Err(e) if e.is_auth_rejection() && self.config.refresh_on_auth_failure => {
                tracing::warn!(
                    "Facility {} rejected our session ({}), refreshing cookies once",
                    query.facility_id,
                    e
                );
                match self.session.refresh_after_rejection(generation).await {
                    Ok(_) => self.fetch_availability(query).await,
                    Err(refresh_err) => {
                        tracing::warn!("Cookie refresh after rejection failed: {}", refresh_err);
                        Err(e)
                    }
                }
            }
            other => other,
        }
    }

    async fn fetch_availability(&self, query: &AvailabilityQuery) -> Result<AvailabilityResponse> {
        let tenant_root = self.config.tenant_root();
        let url = query.url(&tenant_root, cache_buster());
        let timeout = query.timeout(self.config.daily_timeout(), self.config.weekly_timeout());

        let mut request = self
            .client
            .get(&url)
            .header("User-Agent", self.config.user_agent.as_str())
            .header("Accept", AVAILABILITY_ACCEPT)
            .header("Accept-Language", self.config.accept_language.as_str())
            .header("Referer", facility_detail_url(&tenant_root, &query.facility_id));
        if let Some(cookie) = self.session.cookie_header().await {
            request = request.header("Cookie", cookie);
        }

        tracing::info!("Fetching availability: {}", url);
        let http_start = Instant::now();
        let (status, body) = tokio::time::timeout(timeout, async move {
            let response = request.send().await.map_err(ClientError::transport)?;
            let status = response.status();
            let body = response.text().await.map_err(ClientError::transport)?;
            Ok::<_, ClientError>((status, body))
        })
        .await
        .map_err(|_| ClientError::transport(format!("request timed out after {:?}", timeout)))??;

        tracing::debug!(
            "[fetch_availability] HTTP {} {} for facility {} in {:?}, {} bytes",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            query.facility_id,
            http_start.elapsed(),
            body.len()
        );

        let payload = decode_json(status, &body)?;
        Ok(AvailabilityResponse::new(payload))
    }

    /// Run many lookups concurrently under the batch concurrency limit.
    ///
    /// One failure never cancels the others. Items come back in input order.
    pub async fn get_batch(&self, queries: Vec<AvailabilityQuery>) -> Vec<BatchItem> {
        let handles: Vec<_> = queries
            .into_iter()
            .map(|query| {
                let client = self.clone();
                let task_query = query.clone();
                let handle = tokio::spawn(async move {
                    match client.batch_pacer.run(|| client.query(&task_query)).await {
                        Ok(result) => result,
                        Err(e) => Err(ClientError::transport(e)),
                    }
                });
                (query, handle)
            })
            .collect();

        let mut items = Vec::with_capacity(handles.len());
        for (query, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(ClientError::transport(format!("lookup task failed: {e}"))),
            };
            items.push(BatchItem { query, result });
        }
        items
    }

    /// Fetch one page (1-based) of the resource listing.
    pub async fn fetch_resource_page(&self, page_number: u32) -> Result<ResourcePage> {
        let tenant_root = self.config.tenant_root();
        let url = resource_listing_url(&tenant_root);

        let mut request = self
            .client
            .post(&url)
            .header("User-Agent", self.config.user_agent.as_str())
            .header("Accept", "*/*")
            .header("Accept-Language", self.config.accept_language.as_str())
            .header("Content-Type", "application/json;charset=utf-8")
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Origin", self.config.base_url.trim_end_matches('/'))
            .header("Referer", self.config.landing_url())
            .header("page_info", page_info_header(page_number))
            .body("{}");
        if let Some(cookie) = self.session.cookie_header().await {
            request = request.header("Cookie", cookie);
        }

        tracing::info!("Fetching resource listing page {}", page_number);
        let (status, body) = tokio::time::timeout(LISTING_TIMEOUT, async move {
            let response = request.send().await.map_err(ClientError::transport)?;
            let status = response.status();
            let body = response.text().await.map_err(ClientError::transport)?;
            Ok::<_, ClientError>((status, body))
        })
        .await
        .map_err(|_| ClientError::transport("resource listing timed out"))??;

        let payload = decode_json(status, &body)?;
        Ok(parse_resource_page(&payload))
    }

    /// Page through the whole listing, spacing pages by the configured interval.
    pub async fn fetch_all_resources(&self) -> Result<Vec<FacilityRecord>> {
        let first = self.fetch_resource_page(1).await?;
        let per_page = first.listed as u64;
        let total = first.total.unwrap_or(per_page);
        let pages = if per_page == 0 { 1 } else { total.div_ceil(per_page) };
        tracing::info!(
            "Resource listing: {} total, {} per page, {} pages",
            total,
            per_page,
            pages
        );

        let mut records = first.items;
        for page in 2..=pages {
            let page = page as u32;
            let next = self
                .listing_pacer
                .run(|| self.fetch_resource_page(page))
                .await
                .map_err(ClientError::transport)??;
            if next.listed == 0 {
                tracing::info!("Empty page {}, stopping", page);
                break;
            }
            tracing::debug!("Page {}: {} resources", page, next.items.len());
            records.extend(next.items);
        }

        tracing::info!("Collected {} resources", records.len());
        Ok(records)
    }
}

fn cache_buster() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

fn decode_json(status: wreq::StatusCode, body: &str) -> Result<Value> {
    if !status.is_success() {
        let preview = body.chars().take(200).collect::<String>();
        return Err(ClientError::UpstreamRequest {
            status: Some(status.as_u16()),
            message: format!(
                "{} {}",
                status.canonical_reason().unwrap_or("Unknown"),
                preview
            )
            .trim_end()
            .to_string(),
        });
    }

    serde_json::from_str(body).map_err(|e| {
        let preview = body.chars().take(200).collect::<String>();
        ClientError::UpstreamRequest {
            status: Some(status.as_u16()),
            message: format!("response body is not JSON ({e}): {preview}"),
        }
    })
}

fn parse_resource_page(payload: &Value) -> ResourcePage {
    let body = payload.get("body");
    let raw_items = body.and_then(|b| b.get("items")).and_then(Value::as_array);
    let listed = raw_items.map_or(0, Vec::len);
    let items = raw_items
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    serde_json::from_value::<FacilityRecord>(item.clone())
                        .map_err(|e| {
                            tracing::warn!(error = %e, "skipping malformed resource record");
                        })
                        .ok()
                })
                .collect()
        })
        .unwrap_or_default();
    let total = body.and_then(|b| b.get("total")).and_then(Value::as_u64);
    ResourcePage {
        items,
        listed,
        total,
    }
}
