use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use canvas::convert::StoreFeatureCollection;
use canvas::doc::AttributeEdit;
use canvas::engine::GeometryUpdate;
use canvas::geom::Point;

use super::*;
use crate::store::{BulkUpdateResult, StoreError};

// =========================================================================
// Mock store
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Geometry(i64),
    Field(i64, &'static str),
    Bulk(Vec<i64>),
}

#[derive(Default)]
struct MockStore {
    calls: StdMutex<Vec<Call>>,
    fail: bool,
    rejected: Vec<i64>,
}

impl MockStore {
    fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    fn rejecting(ids: &[i64]) -> Self {
        Self { rejected: ids.to_vec(), ..Self::default() }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn outcome(&self) -> Result<(), StoreError> {
        if self.fail { Err(StoreError::Status { status: 500, body: "boom".into() }) } else { Ok(()) }
    }
}

#[async_trait]
impl FeatureStore for MockStore {
    async fn load_geojson(&self) -> Result<StoreFeatureCollection, StoreError> {
        Ok(StoreFeatureCollection::default())
    }

    async fn patch_geometry(&self, update: &GeometryUpdate) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(Call::Geometry(update.remote_id));
        self.outcome()
    }

    async fn patch_field(&self, remote_id: i64, edit: &AttributeEdit) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(Call::Field(remote_id, edit.field()));
        self.outcome()
    }

    async fn bulk_update(&self, updates: &[GeometryUpdate]) -> Result<BulkUpdateResult, StoreError> {
        self.calls.lock().unwrap().push(Call::Bulk(updates.iter().map(|u| u.remote_id).collect()));
        self.outcome()?;
        let failed_ids: Vec<i64> = updates.iter().map(|u| u.remote_id).filter(|id| self.rejected.contains(id)).collect();
        Ok(BulkUpdateResult { updated_count: updates.len() - failed_ids.len(), failed_ids })
    }
}

fn update(remote_id: i64) -> GeometryUpdate {
    GeometryUpdate {
        node_id: format!("backend_{remote_id}"),
        remote_id,
        coordinates: vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0), Point::new(0.0, 0.0)],
        x_coord: 0.0,
        y_coord: 0.0,
    }
}

// =========================================================================
// Bridge
// =========================================================================

#[tokio::test]
async fn geometry_commit_issues_one_patch() {
    let store = Arc::new(MockStore::default());
    let bridge = PersistenceBridge::new(Arc::clone(&store));
    let report = bridge.handle(Action::GeometryCommitted(update(5))).unwrap().await.unwrap();
    assert_eq!(store.calls(), vec![Call::Geometry(5)]);
    assert!(report.is_none());
}

#[tokio::test]
async fn bulk_reposition_issues_one_request_with_every_update() {
    let store = Arc::new(MockStore::default());
    let bridge = PersistenceBridge::new(Arc::clone(&store));
    let action = Action::BulkRepositioned(vec![update(1), update(2), update(3)]);
    let report = bridge.handle(action).unwrap().await.unwrap();
    assert_eq!(store.calls(), vec![Call::Bulk(vec![1, 2, 3])]);
    assert_eq!(report, Some(BulkUpdateResult { updated_count: 3, failed_ids: vec![] }));
}

#[tokio::test]
async fn bulk_report_carries_rejected_ids() {
    let store = Arc::new(MockStore::rejecting(&[7]));
    let bridge = PersistenceBridge::new(Arc::clone(&store));
    let action = Action::BulkRepositioned(vec![update(6), update(7)]);
    let report = bridge.handle(action).unwrap().await.unwrap();
    assert_eq!(report, Some(BulkUpdateResult { updated_count: 1, failed_ids: vec![7] }));
}

#[tokio::test]
async fn failed_bulk_request_reports_every_id() {
    let store = Arc::new(MockStore::failing());
    let bridge = PersistenceBridge::new(Arc::clone(&store));
    let action = Action::BulkRepositioned(vec![update(4), update(5)]);
    let report = bridge.handle(action).unwrap().await.unwrap();
    assert_eq!(report, Some(BulkUpdateResult { updated_count: 0, failed_ids: vec![4, 5] }));
}

#[tokio::test]
async fn non_persisting_actions_spawn_nothing() {
    let store = Arc::new(MockStore::default());
    let bridge = PersistenceBridge::new(Arc::clone(&store));
    assert!(bridge.handle(Action::RequestFrame).is_none());
    assert!(bridge.handle(Action::SelectionChanged(None)).is_none());
    assert!(bridge.handle(Action::EditAttributesRequested { id: "a".into() }).is_none());
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn failed_geometry_write_is_contained() {
    let store = Arc::new(MockStore::failing());
    let bridge = PersistenceBridge::new(Arc::clone(&store));
    bridge.handle(Action::GeometryCommitted(update(5))).unwrap().await.unwrap();
    assert_eq!(store.calls().len(), 1);
}

#[tokio::test]
async fn attribute_save_flashes_success() {
    let store = Arc::new(MockStore::default());
    let bridge = PersistenceBridge::new(Arc::clone(&store));
    let action = Action::AttributeEdited { id: "a".into(), remote_id: 9, edit: AttributeEdit::Cona("B".into()) };
    bridge.handle(action).unwrap().await.unwrap();
    assert_eq!(store.calls(), vec![Call::Field(9, "cona")]);
    assert_eq!(bridge.flash_color("a", "cona").await, FLASH_SUCCESS);
    assert_eq!(bridge.flash_color("a", "name").await, FLASH_NEUTRAL);
}

#[tokio::test]
async fn attribute_failure_flashes_red() {
    let store = Arc::new(MockStore::failing());
    let bridge = PersistenceBridge::new(Arc::clone(&store));
    let action = Action::AttributeEdited { id: "a".into(), remote_id: 9, edit: AttributeEdit::MaxCapacity(3) };
    bridge.handle(action).unwrap().await.unwrap();
    assert_eq!(bridge.flash_color("a", "max_capacity").await, FLASH_FAILURE);
}

// =========================================================================
// Flash board
// =========================================================================

#[test]
fn flash_fades_to_neutral_after_two_seconds() {
    let t0 = Instant::now();
    let mut board = FlashBoard::new();
    board.record("a", "name", FlashOutcome::Success, t0);
    assert_eq!(board.color("a", "name", t0 + Duration::from_millis(1999)), FLASH_SUCCESS);
    assert_eq!(board.color("a", "name", t0 + FLASH_DURATION), FLASH_NEUTRAL);
}

#[test]
fn newer_flash_replaces_older() {
    let t0 = Instant::now();
    let mut board = FlashBoard::new();
    board.record("a", "name", FlashOutcome::Failure, t0);
    board.record("a", "name", FlashOutcome::Success, t0 + Duration::from_secs(1));
    assert_eq!(board.color("a", "name", t0 + Duration::from_millis(2500)), FLASH_SUCCESS);
}

#[test]
fn expired_flashes_are_pruned_on_record() {
    let t0 = Instant::now();
    let mut board = FlashBoard::new();
    board.record("a", "name", FlashOutcome::Success, t0);
    board.record("b", "cona", FlashOutcome::Success, t0 + Duration::from_secs(3));
    assert_eq!(board.entries.len(), 1);
}
