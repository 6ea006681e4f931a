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

//! # Facility Catalog
//!
//! The catalog document maps a center name to the resources bookable there:
//!
//! ```json
//! { "Central Library": { "center_id": 12, "facilities": [ { "id": 2143, "name": "..." } ] } }
//! ```
//!
//! The loader re-reads the document on every call and stamps `center_name`
//! onto each resource while flattening.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{ClientError, Result};

pub const UNKNOWN_CENTER: &str = "Unknown Center";

/// Listing fields kept besides the typed ones. The center pair is moved up
/// to the center entry when grouping.
const SYNCED_EXTRA_FIELDS: [&str; 4] = ["type_id", "site_id", "center_id", "center_name"];

/// A resource as stored in the catalog document or returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    #[serde(deserialize_with = "facility_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub type_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub max_capacity: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub no_internet_permits: bool,
    /// Upstream fields the client does not interpret (`type_id`, `site_id`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A resource after flattening, addressable on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub name: String,
    pub type_name: String,
    pub max_capacity: String,
    pub center_name: String,
    pub no_internet_permits: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FacilityRecord {
    fn into_facility(mut self, center_name: &str) -> Facility {
        self.extra.remove("center_name");
        Facility {
            id: self.id,
            name: self.name,
            type_name: self.type_name,
            max_capacity: self.max_capacity,
            center_name: center_name.to_string(),
            no_internet_permits: self.no_internet_permits,
            extra: self.extra,
        }
    }

    /// Drop upstream fields a synced catalog does not store.
    pub fn retain_synced_fields(mut self) -> Self {
        self.extra
            .retain(|key, _| SYNCED_EXTRA_FIELDS.contains(&key.as_str()));
        self
    }
}

impl Facility {
    pub fn is_bookable_online(&self) -> bool {
        !self.no_internet_permits
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CenterEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_id: Option<Value>,
    #[serde(default)]
    pub facilities: Vec<FacilityRecord>,
}

/// Center name to center entry. Keys iterate in byte order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub centers: BTreeMap<String, CenterEntry>,
}

impl Catalog {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn flatten(&self) -> Vec<Facility> {
        self.centers
            .iter()
            .flat_map(|(center, entry)| {
                entry
                    .facilities
                    .iter()
                    .cloned()
                    .map(move |record| record.into_facility(center))
            })
            .collect()
    }

    pub fn facilities_of(&self, center: &str) -> Vec<Facility> {
        if center.is_empty() {
            return Vec::new();
        }
        self.centers
            .get(center)
            .map(|entry| {
                entry
                    .facilities
                    .iter()
                    .cloned()
                    .map(|record| record.into_facility(center))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn center_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.centers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn total_facilities(&self) -> usize {
        self.centers.values().map(|e| e.facilities.len()).sum()
    }

    /// Build a catalog from flat listing records carrying `center_name`/`center_id`.
    ///
    /// Duplicate ids keep their first occurrence. Both center fields are moved
    /// up to the center entry.
    pub fn group(records: impl IntoIterator<Item = FacilityRecord>) -> Self {
        let mut seen = HashSet::new();
        let mut centers: BTreeMap<String, CenterEntry> = BTreeMap::new();

        for mut record in records {
            if !seen.insert(record.id.clone()) {
                continue;
            }
            let center_name = match record.extra.remove("center_name") {
                Some(Value::String(s)) if !s.is_empty() => s,
                _ => UNKNOWN_CENTER.to_string(),
            };
            let center_id = record.extra.remove("center_id").filter(|v| !v.is_null());

            let entry = centers.entry(center_name).or_default();
            if entry.center_id.is_none() {
                entry.center_id = center_id;
            }
            entry.facilities.push(record);
        }

        Self { centers }
    }

    /// Records of a catalog document in either layout: the nested center map,
    /// or the older flat list of records. Center fields are stamped back onto
    /// each record so the result can be regrouped.
    pub fn records_from_json(text: &str) -> serde_json::Result<Vec<FacilityRecord>> {
        let value: Value = serde_json::from_str(text)?;
        if value.is_array() {
            return serde_json::from_value(value);
        }
        Ok(serde_json::from_value::<Catalog>(value)?.into_records())
    }

    fn into_records(self) -> Vec<FacilityRecord> {
        let mut records = Vec::with_capacity(self.total_facilities());
        for (center_name, entry) in self.centers {
            for mut record in entry.facilities {
                record
                    .extra
                    .insert("center_name".to_string(), Value::String(center_name.clone()));
                if let Some(center_id) = &entry.center_id {
                    record.extra.insert("center_id".to_string(), center_id.clone());
                }
                records.push(record);
            }
        }
        records
    }

    /// Add listing records whose id is not already known to `existing`, then
    /// regroup. Added records keep only the synced field set. Returns the
    /// catalog and how many records were added.
    pub fn merge_listing(
        existing: Vec<FacilityRecord>,
        fresh: impl IntoIterator<Item = FacilityRecord>,
    ) -> (Self, usize) {
        let mut known: HashSet<String> = existing.iter().map(|r| r.id.clone()).collect();
        let added: Vec<FacilityRecord> = fresh
            .into_iter()
            .filter(|r| known.insert(r.id.clone()))
            .map(FacilityRecord::retain_synced_fields)
            .collect();
        let count = added.len();
        (Self::group(existing.into_iter().chain(added)), count)
    }

    /// Write the nested document, creating the parent directory if needed.
    pub async fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::catalog(path, e))?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|e| ClientError::catalog(path, e))?;
        tokio::fs::write(path, text)
            .await
            .map_err(|e| ClientError::catalog(path, e))
    }
}

/// Reads the catalog document fresh on every query.
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    path: PathBuf,
}

impl CatalogLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read_catalog(&self) -> Result<Catalog> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ClientError::catalog(&self.path, e))?;
        let catalog = Catalog::from_json(&text).map_err(|e| ClientError::catalog(&self.path, e))?;
        tracing::debug!(
            "Read catalog {}: {} centers, {} facilities",
            self.path.display(),
            catalog.centers.len(),
            catalog.total_facilities()
        );
        Ok(catalog)
    }

    pub async fn load_all(&self) -> Result<Vec<Facility>> {
        Ok(self.read_catalog().await?.flatten())
    }

    /// An unknown or empty center name yields an empty list, not an error.
    pub async fn load_by_center(&self, center: &str) -> Result<Vec<Facility>> {
        Ok(self.read_catalog().await?.facilities_of(center))
    }

    pub async fn list_centers(&self) -> Result<Vec<String>> {
        Ok(self.read_catalog().await?.center_names())
    }

    /// Records already in the document, in either layout, for merging a fresh
    /// listing into. A missing file is an empty catalog.
    pub async fn existing_records(&self) -> Result<Vec<FacilityRecord>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => {
                Catalog::records_from_json(&text).map_err(|e| ClientError::catalog(&self.path, e))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No catalog at {}, starting empty", self.path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(ClientError::catalog(&self.path, e)),
        }
    }

    /// Facilities that accept online permits.
    pub async fn bookable(&self) -> Result<Vec<Facility>> {
        let mut all = self.load_all().await?;
        all.retain(Facility::is_bookable_online);
        Ok(all)
    }
}

// Upstream mixes numbers, strings and nulls for the same field.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

// Ids become a path segment upstream, so only non-empty strings and numbers pass.
fn facility_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "facility id must be a non-empty string or a number, got {other}"
        ))),
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}
