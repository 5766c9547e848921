use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Json;
use serde_json::{Value, json};

use super::*;

// =========================================================================
// Mock feature store
// =========================================================================

#[derive(Clone, Default)]
struct Recorded {
    patches: Arc<Mutex<Vec<(i64, Value)>>>,
    bulk: Arc<Mutex<Vec<Value>>>,
}

async fn geojson() -> Json<Value> {
    Json(json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": { "type": "Polygon", "coordinates": [[[0.0, 0.0], [4.0, 0.0], [4.0, 2.0], [0.0, 2.0], [0.0, 0.0]]] },
            "properties": { "id": 7, "level": "polje", "name": "Hall 7", "max_capacity": 12 }
        }]
    }))
}

async fn patch_feature(State(rec): State<Recorded>, Path(id): Path<i64>, Json(body): Json<Value>) -> StatusCode {
    if id == 404 {
        return StatusCode::NOT_FOUND;
    }
    rec.patches.lock().unwrap().push((id, body));
    StatusCode::OK
}

async fn bulk_update(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    let count = body["features"].as_array().map_or(0, Vec::len);
    rec.bulk.lock().unwrap().push(body);
    Json(json!({ "updated_count": count, "failed_ids": [] }))
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

async fn mock_store() -> (HttpFeatureStore, Recorded) {
    let rec = Recorded::default();
    let router = Router::new()
        .route("/features/geojson", get(geojson))
        .route("/features/bulk_update", post(bulk_update))
        .route("/features/{id}", patch(patch_feature))
        .with_state(rec.clone());
    let base = serve(router).await;
    // Trailing slash is trimmed.
    let store = HttpFeatureStore::new(format!("{base}/"), StoreTimeouts::default()).unwrap();
    (store, rec)
}

fn update(remote_id: i64) -> GeometryUpdate {
    let coordinates = vec![Point::new(1.0, 2.0), Point::new(3.0, 2.0), Point::new(3.0, 4.0), Point::new(1.0, 2.0)];
    GeometryUpdate { node_id: format!("backend_{remote_id}"), remote_id, coordinates, x_coord: 1.0, y_coord: 2.0 }
}

// =========================================================================
// Requests
// =========================================================================

#[tokio::test]
async fn load_geojson_parses_store_features() {
    let (store, _) = mock_store().await;
    let fc = store.load_geojson().await.unwrap();
    assert_eq!(fc.features.len(), 1);
    assert_eq!(fc.features[0].properties.id, 7);
    assert_eq!(fc.features[0].properties.max_capacity, Some(12));
}

#[tokio::test]
async fn patch_geometry_sends_ring_and_anchor() {
    let (store, rec) = mock_store().await;
    store.patch_geometry(&update(12)).await.unwrap();
    let patches = rec.patches.lock().unwrap().clone();
    assert_eq!(patches.len(), 1);
    let (id, body) = &patches[0];
    assert_eq!(*id, 12);
    assert_eq!(body["coordinates"][1], json!([3.0, 2.0]));
    assert_eq!(body["x_coord"], 1.0);
    assert_eq!(body["y_coord"], 2.0);
    assert!(body.get("id").is_none());
}

#[tokio::test]
async fn patch_field_sends_single_field() {
    let (store, rec) = mock_store().await;
    store.patch_field(3, &AttributeEdit::TakenCapacity(9)).await.unwrap();
    let patches = rec.patches.lock().unwrap().clone();
    assert_eq!(patches, vec![(3, json!({ "taken_capacity": 9 }))]);
}

#[tokio::test]
async fn bulk_update_posts_every_feature_once() {
    let (store, rec) = mock_store().await;
    let result = store.bulk_update(&[update(12), update(13), update(14)]).await.unwrap();
    assert_eq!(result, BulkUpdateResult { updated_count: 3, failed_ids: vec![] });
    let bulk = rec.bulk.lock().unwrap().clone();
    assert_eq!(bulk.len(), 1);
    let ids: Vec<i64> = bulk[0]["features"].as_array().unwrap().iter().map(|f| f["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![12, 13, 14]);
}

// =========================================================================
// Failures
// =========================================================================

#[tokio::test]
async fn error_status_is_reported() {
    let (store, _) = mock_store().await;
    let err = store.patch_geometry(&update(404)).await.unwrap_err();
    assert!(matches!(err, StoreError::Status { status: 404, .. }));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let router = Router::new().route("/features/geojson", get(|| async { "not json" }));
    let store = HttpFeatureStore::new(serve(router).await, StoreTimeouts::default()).unwrap();
    let err = store.load_geojson().await.unwrap_err();
    assert!(matches!(err, StoreError::Decode(_)));
}

#[tokio::test]
async fn unreachable_store_is_a_request_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let store = HttpFeatureStore::new(format!("http://{addr}"), StoreTimeouts::default()).unwrap();
    let err = store.patch_field(1, &AttributeEdit::Locked(true)).await.unwrap_err();
    assert!(matches!(err, StoreError::Request(_)));
}
