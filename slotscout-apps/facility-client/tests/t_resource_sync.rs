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

//! Paged resource listing, grouped into a catalog and read back.


use std::sync::Arc;

use anyhow::Result;
use mock_backend::{MockBackend, MockReply, RecordedRequest, ScriptedSource, scratch_path, write_catalog};
use serde_json::{Value, json};
use slotscout_facility_client::FacilityService;

const RESOURCES: [(u64, &str, &str); 5] = [
    (2143, "Meeting Room 201", "Central Library"),
    (2144, "Creative Studio", "Central Library"),
    (77, "Gym A", "Burnhamthorpe CC"),
    (78, "Gym B", "Burnhamthorpe CC"),
    (900, "Outdoor Pad", ""),
];

fn page_number(req: &RecordedRequest) -> u64 {
    req.header("page_info")
        .and_then(|h| serde_json::from_str::<Value>(h).ok())
        .and_then(|v| v["page_number"].as_u64())
        .unwrap_or(0)
}

// Two records per page, `total` as advertised.
fn listing(total: u64, pages_served: u64) -> impl Fn(&RecordedRequest) -> MockReply + Send + Sync + 'static {
    move |req| {
        let page = page_number(req);
        if page == 0 || page > pages_served {
            return MockReply::json(200, json!({"body": {"total": total, "items": []}}));
        }
        let start = ((page - 1) * 2) as usize;
        let items: Vec<Value> = RESOURCES
            .iter()
            .skip(start)
            .take(2)
            .map(|(id, name, center)| {
                json!({
                    "id": id,
                    "name": name,
                    "type_name": "Room",
                    "max_capacity": 20,
                    "center_name": center,
                    "center_id": if center.is_empty() { Value::Null } else { json!(center.len()) },
                    "no_internet_permits": false,
                    "type_id": 4,
                    "site_id": 11,
                    "reservation_notes": "Bring your own equipment",
                    "photo_url": "https://example.com/room.jpg"
                })
            })
            .collect();
        MockReply::json(200, json!({"headers": {"response_code": "0000"}, "body": {"total": total, "items": items}}))
    }
}

fn service(backend: &MockBackend) -> Result<FacilityService> {
    Ok(FacilityService::with_cookie_source(
        backend.config(scratch_path("catalog.json")),
        Arc::new(ScriptedSource::default()),
    )?)
}

#[tokio::test]
async fn all_pages_are_collected() -> Result<()> {
    let backend = MockBackend::spawn(listing(5, 3)).await;
    let service = service(&backend)?;

    let records = service.client().fetch_all_resources().await?;
    assert_eq!(records.len(), 5);

    let pages: Vec<u64> = backend.requests().iter().map(page_number).collect();
    assert_eq!(pages, vec![1, 2, 3]);
    for req in backend.requests() {
        let page_info: Value = serde_json::from_str(req.header("page_info").expect("page_info"))?;
        assert_eq!(page_info["total_records_per_page"], 100);
        assert_eq!(req.query.get("locale").map(String::as_str), Some("en-US"));
    }
    Ok(())
}

#[tokio::test]
async fn empty_page_stops_paging_early() -> Result<()> {
    // Claims 10 resources but only serves two pages.
    let backend = MockBackend::spawn(listing(10, 2)).await;
    let service = service(&backend)?;

    let records = service.client().fetch_all_resources().await?;
    assert_eq!(records.len(), 4);
    assert_eq!(backend.request_count(), 3);
    Ok(())
}

#[tokio::test]
async fn listing_failure_is_an_error() -> Result<()> {
    let backend = MockBackend::spawn(|req| {
        if page_number(req) == 2 {
            MockReply::text(502, "Bad Gateway")
        } else {
            listing(5, 3)(req)
        }
    })
    .await;
    let service = service(&backend)?;

    let err = service
        .client()
        .fetch_all_resources()
        .await
        .expect_err("page 2 fails");
    assert_eq!(err.status(), Some(502));
    Ok(())
}

#[tokio::test]
async fn synced_catalog_reads_back_through_the_loader() -> Result<()> {
    let backend = MockBackend::spawn(listing(5, 3)).await;
    let service = service(&backend)?;

    let summary = service.sync_resources(None).await.data.expect("summary");
    assert_eq!((summary.existing, summary.added, summary.total), (0, 5, 5));
    assert_eq!(summary.centers, 3);

    let centers = service.get_unique_centers().await.data.expect("centers");
    assert_eq!(
        centers,
        vec!["Burnhamthorpe CC", "Central Library", "Unknown Center"]
    );

    let library = service
        .get_facilities_by_center("Central Library")
        .await
        .data
        .expect("facilities");
    let ids: Vec<&str> = library.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["2143", "2144"]);
    assert!(library.iter().all(|f| f.max_capacity == "20"));

    let doc: Value = serde_json::from_str(&std::fs::read_to_string(service.catalog().path())?)?;
    assert_eq!(doc["Central Library"]["center_id"], 15);
    assert!(doc["Unknown Center"].get("center_id").is_none());
    assert!(doc["Central Library"]["facilities"][0].get("center_name").is_none());
    Ok(())
}

#[tokio::test]
async fn synced_records_keep_only_catalog_fields() -> Result<()> {
    let backend = MockBackend::spawn(listing(5, 3)).await;
    let service = service(&backend)?;
    assert!(service.sync_resources(None).await.success);

    let doc: Value = serde_json::from_str(&std::fs::read_to_string(service.catalog().path())?)?;
    let room = doc["Central Library"]["facilities"][0]
        .as_object()
        .expect("record");
    let mut keys: Vec<&str> = room.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(
        keys,
        vec!["id", "max_capacity", "name", "no_internet_permits", "site_id", "type_id", "type_name"]
    );

    let facilities = service.get_facilities().await.data.expect("facilities");
    assert!(facilities.iter().all(|f| !f.extra.contains_key("reservation_notes")));
    assert!(facilities.iter().all(|f| !f.extra.contains_key("photo_url")));
    Ok(())
}

#[tokio::test]
async fn sync_merges_into_existing_catalog() -> Result<()> {
    let backend = MockBackend::spawn(listing(5, 3)).await;
    let path = write_catalog(
        "existing_nested.json",
        &json!({
            "Central Library": {
                "center_id": 15,
                "facilities": [
                    {"id": 2143, "name": "Meeting Room 201 (renovated)", "type_name": "Room", "max_capacity": "45", "local_note": "curated"}
                ]
            },
            "Retired Annex": {
                "center_id": 99,
                "facilities": [{"id": 1, "name": "Old Hall", "type_name": "Hall"}]
            }
        }),
    );
    let service = FacilityService::with_cookie_source(
        backend.config(path.clone()),
        Arc::new(ScriptedSource::default()),
    )?;

    let summary = service.sync_resources(None).await.data.expect("summary");
    assert_eq!((summary.existing, summary.added, summary.total), (2, 4, 6));

    let library = service
        .get_facilities_by_center("Central Library")
        .await
        .data
        .expect("library");
    assert_eq!(library.len(), 2);
    let curated = library.iter().find(|f| f.id == "2143").expect("curated room");
    assert_eq!(curated.name, "Meeting Room 201 (renovated)");
    assert_eq!(curated.max_capacity, "45");
    assert_eq!(curated.extra.get("local_note"), Some(&json!("curated")));

    let annex = service.get_facilities_by_center("Retired Annex").await.data.expect("annex");
    assert_eq!(annex.len(), 1);

    let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(doc["Retired Annex"]["center_id"], 99);
    Ok(())
}

#[tokio::test]
async fn sync_accepts_legacy_flat_catalog() -> Result<()> {
    let backend = MockBackend::spawn(listing(5, 3)).await;
    let path = write_catalog(
        "existing_flat.json",
        &json!([
            {"id": 77, "name": "Gym A (legacy)", "type_name": "Gymnasium", "center_name": "Burnhamthorpe CC", "center_id": 31},
            {"id": 5000, "name": "Portable", "type_name": "Room"}
        ]),
    );
    let service = FacilityService::with_cookie_source(
        backend.config(path.clone()),
        Arc::new(ScriptedSource::default()),
    )?;

    let summary = service.sync_resources(None).await.data.expect("summary");
    assert_eq!((summary.existing, summary.added, summary.total), (2, 4, 6));

    // The document is rewritten in the nested layout.
    let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert!(doc.is_object());
    assert_eq!(doc["Burnhamthorpe CC"]["center_id"], 31);
    let gyms = service
        .get_facilities_by_center("Burnhamthorpe CC")
        .await
        .data
        .expect("gyms");
    assert!(gyms.iter().any(|f| f.name == "Gym A (legacy)"));
    assert!(!gyms.iter().any(|f| f.name == "Gym A"));
    let unknown = service.get_facilities_by_center("Unknown Center").await.data.expect("unknown");
    let ids: Vec<&str> = unknown.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["5000", "900"]);
    Ok(())
}

#[tokio::test]
async fn failed_sync_leaves_catalog_untouched() -> Result<()> {
    let backend = MockBackend::spawn(|req| {
        if page_number(req) == 3 {
            MockReply::text(503, "Service Unavailable")
        } else {
            listing(5, 3)(req)
        }
    })
    .await;
    let original = json!({"Central Library": {"facilities": [{"id": 2143, "name": "Room"}]}});
    let path = write_catalog("untouched.json", &original);
    let service = FacilityService::with_cookie_source(
        backend.config(path.clone()),
        Arc::new(ScriptedSource::default()),
    )?;

    let outcome = service.sync_resources(None).await;
    assert!(!outcome.success);
    assert!(outcome.error.expect("error").contains("503"));

    let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(doc, original);
    Ok(())
}

#[tokio::test]
async fn page_count_uses_listed_entries() -> Result<()> {
    // Page 1 lists two entries, one without an id. Five in total means three pages.
    let backend = MockBackend::spawn(|req| match page_number(req) {
        1 => MockReply::json(
            200,
            json!({"body": {"total": 5, "items": [
                {"id": 1, "name": "Pool", "center_name": "Square One"},
                {"name": "broken entry"}
            ]}}),
        ),
        page @ 2..=3 => MockReply::json(
            200,
            json!({"body": {"total": 5, "items": [
                {"id": page * 10, "name": "Room", "center_name": "Square One"}
            ]}}),
        ),
        _ => MockReply::json(
            200,
            json!({"body": {"total": 5, "items": [
                {"id": 999, "name": "Beyond the computed pages", "center_name": "Square One"}
            ]}}),
        ),
    })
    .await;
    let service = service(&backend)?;

    let records = service.client().fetch_all_resources().await?;
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "20", "30"]);
    assert_eq!(backend.request_count(), 3);
    Ok(())
}
