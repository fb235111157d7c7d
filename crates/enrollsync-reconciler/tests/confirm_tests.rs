//! Confirm flow tests.

mod common;

use std::sync::atomic::Ordering;

use common::{latitude, macbook, not_syncing, synced, Harness};
use enrollsync_core::{Device, DeviceStatus, OsKind, Tag};
use enrollsync_reconciler::{ReconcilerError, SyncSettings};

#[tokio::test]
async fn test_disabled_tag_removes_identifier() {
    let tag = Tag::new("Corporate", false);
    let device = synced(latitude().with_tag(tag.id), "dir-7", 48);
    let (id, before) = (device.id, device.last_sync_at);
    let h = Harness::new(vec![device.clone()], vec![tag], SyncSettings::enabled(24));
    h.directory
        .seed("dir-7", &device.canonical_identifier().unwrap());

    let summary = h.reconciler.run_confirm().await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(h.log.count("directory.delete:dir-7"), 1);
    assert!(!h.directory.contains_id("dir-7"));

    let device = h.device(id).await.unwrap();
    assert_eq!(device.status, DeviceStatus::NotSyncing);
    assert!(device.identifier_id.is_none());
    assert!(device.identifier_value.is_none());
    assert!(device.identifier_type.is_none());
    assert!(device.last_sync_at > before);
}

#[tokio::test]
async fn test_missing_identifier_is_re_registered() {
    let tag = Tag::new("Corporate", true);
    let device = synced(latitude().with_tag(tag.id), "X", 48);
    let (id, before) = (device.id, device.last_sync_at);
    let h = Harness::new(vec![device], vec![tag], SyncSettings::enabled(24));

    let summary = h.reconciler.run_confirm().await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(h.log.count("directory.exists:X"), 1);
    assert_eq!(h.log.count("directory.add"), 1);

    let device = h.device(id).await.unwrap();
    assert_eq!(device.status, DeviceStatus::Synced);
    assert_eq!(device.identifier_id.as_deref(), Some("dir-1"));
    assert!(device.last_sync_at > before);
}

#[tokio::test]
async fn test_present_identifier_only_refreshes_timestamp() {
    let tag = Tag::new("Corporate", true);
    let device = synced(macbook().with_tag(tag.id), "dir-3", 48);
    let (id, before) = (device.id, device.last_sync_at);
    let h = Harness::new(vec![device.clone()], vec![tag], SyncSettings::enabled(24));
    h.directory
        .seed("dir-3", &device.canonical_identifier().unwrap());

    h.reconciler.run_confirm().await.unwrap();

    assert_eq!(h.log.count("directory.add"), 0);
    let device = h.device(id).await.unwrap();
    assert_eq!(device.status, DeviceStatus::Synced);
    assert_eq!(device.identifier_id.as_deref(), Some("dir-3"));
    assert!(device.last_sync_at > before);
}

#[tokio::test]
async fn test_recently_synced_devices_are_not_due() {
    let tag = Tag::new("Corporate", false);
    let device = synced(latitude().with_tag(tag.id), "dir-7", 2);
    let h = Harness::new(vec![device], vec![tag], SyncSettings::enabled(24));

    let summary = h.reconciler.run_confirm().await.unwrap();

    assert_eq!(summary.total(), 0);
    assert!(h.log.calls().is_empty());
}

#[tokio::test]
async fn test_not_syncing_device_with_disabled_tag_is_settled() {
    let tag = Tag::new("Lab", false);
    let device = not_syncing(latitude().with_tag(tag.id), 48);
    let (id, before) = (device.id, device.last_sync_at);
    let h = Harness::new(vec![device], vec![tag], SyncSettings::enabled(24));

    let summary = h.reconciler.run_confirm().await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(h.log.count("directory."), 0);
    let device = h.device(id).await.unwrap();
    assert_eq!(device.status, DeviceStatus::NotSyncing);
    assert!(device.last_sync_at > before);
}

#[tokio::test]
async fn test_re_enabled_tag_syncs_parked_device() {
    let tag = Tag::new("Lab", true);
    let device = not_syncing(macbook().with_tag(tag.id), 48);
    let id = device.id;
    let h = Harness::new(vec![device], vec![tag], SyncSettings::enabled(24));

    h.reconciler.run_confirm().await.unwrap();

    let device = h.device(id).await.unwrap();
    assert_eq!(device.status, DeviceStatus::Synced);
    assert_eq!(device.identifier_value.as_deref(), Some("C02XYZ"));
    assert!(h.directory.contains_value("C02XYZ"));
}

#[tokio::test]
async fn test_untagged_device_is_treated_as_disabled() {
    let device = synced(latitude(), "dir-5", 48);
    let id = device.id;
    let h = Harness::new(vec![device], vec![], SyncSettings::enabled(24));

    h.reconciler.run_confirm().await.unwrap();

    assert_eq!(h.log.count("directory.delete:dir-5"), 1);
    let device = h.device(id).await.unwrap();
    assert_eq!(device.status, DeviceStatus::NotSyncing);
    assert!(device.identifier_id.is_none());
}

#[tokio::test]
async fn test_failed_call_leaves_timestamp_untouched() {
    let enabled = Tag::new("Corporate", true);
    let disabled = Tag::new("Lab", false);
    let checked = synced(latitude().with_tag(enabled.id), "dir-1", 48);
    let removed = synced(macbook().with_tag(disabled.id), "dir-2", 48);
    let before = vec![checked.clone(), removed.clone()];
    let h = Harness::new(
        vec![checked, removed],
        vec![enabled, disabled],
        SyncSettings::enabled(24),
    );
    h.directory.fail_exists.store(true, Ordering::SeqCst);
    h.directory.fail_delete.store(true, Ordering::SeqCst);

    let summary = h.reconciler.run_confirm().await.unwrap();

    assert_eq!(summary.processed, 0);
    assert_eq!(summary.failed, 2);
    for original in before {
        assert_eq!(h.device(original.id).await.unwrap(), original);
    }
}

#[tokio::test]
async fn test_refused_delete_is_a_failure() {
    let tag = Tag::new("Lab", false);
    let device = synced(latitude().with_tag(tag.id), "dir-7", 48);
    let id = device.id;
    let h = Harness::new(vec![device], vec![tag], SyncSettings::enabled(24));
    h.directory.delete_refused.store(true, Ordering::SeqCst);

    let summary = h.reconciler.run_confirm().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.transient_failures, 0);
    let device = h.device(id).await.unwrap();
    assert_eq!(device.status, DeviceStatus::Synced);
    assert_eq!(device.identifier_id.as_deref(), Some("dir-7"));
}

#[tokio::test]
async fn test_invalid_interval_aborts_before_reading() {
    for interval in [
        None,
        Some(""),
        Some("abc"),
        Some("0"),
        Some("-4"),
        Some("3000000000"),
        Some("9223372036854775807"),
    ] {
        let tag = Tag::new("Lab", false);
        let device = synced(latitude().with_tag(tag.id), "dir-7", 48);
        let original = device.clone();
        let settings = SyncSettings::new(Some("true".into()), interval.map(str::to_string));
        let h = Harness::new(vec![device], vec![tag], settings);
        h.registry.fail_query.store(true, Ordering::SeqCst);

        let err = h.reconciler.run_confirm().await.unwrap_err();

        assert!(
            matches!(err, ReconcilerError::InvalidConfiguration { .. }),
            "interval {interval:?} gave {err:?}"
        );
        assert!(h.log.calls().is_empty());
        assert_eq!(h.device(original.id).await.unwrap(), original);
    }
}

#[tokio::test]
async fn test_disabled_switch_skips_confirm() {
    let tag = Tag::new("Lab", false);
    let device = synced(latitude().with_tag(tag.id), "dir-7", 48);
    let h = Harness::new(vec![device], vec![tag], SyncSettings::disabled());

    let summary = h.reconciler.run_confirm().await.unwrap();

    assert!(summary.sync_disabled);
    assert!(h.log.calls().is_empty());
}

#[tokio::test]
async fn test_tag_store_failure_aborts_run() {
    let h = Harness::new(vec![], vec![], SyncSettings::enabled(24));
    h.tags.fail.store(true, Ordering::SeqCst);

    let err = h.reconciler.run_confirm().await.unwrap_err();

    assert!(matches!(err, ReconcilerError::TagPolicy(_)));
}

#[tokio::test]
async fn test_confirm_ignores_added_and_deleting_devices() {
    let tag = Tag::new("Corporate", true);
    let added = latitude().with_tag(tag.id);
    let deleting = common::deleting(macbook().with_tag(tag.id), Some("dir-2"));
    let h = Harness::new(vec![added, deleting], vec![tag], SyncSettings::enabled(24));

    let summary = h.reconciler.run_confirm().await.unwrap();

    assert_eq!(summary.total(), 0);
    assert!(h.log.calls().is_empty());
}

#[tokio::test]
async fn test_re_registration_stores_value_returned_by_directory() {
    let tag = Tag::new("Corporate", true);
    let device = Device::new("Apple", "MacBook Pro", "c02xyz")
        .with_os(OsKind::MacOs)
        .with_tag(tag.id);
    let device = synced(device, "X", 48);
    let id = device.id;
    let h = Harness::new(vec![device], vec![tag], SyncSettings::enabled(24));
    h.directory.uppercase_values.store(true, Ordering::SeqCst);

    h.reconciler.run_confirm().await.unwrap();

    let device = h.device(id).await.unwrap();
    assert_eq!(device.identifier_id.as_deref(), Some("dir-1"));
    assert_eq!(device.identifier_value.as_deref(), Some("C02XYZ"));
}

#[tokio::test]
async fn test_re_registration_reuses_existing_directory_record() {
    let tag = Tag::new("Corporate", true);
    let device = synced(macbook().with_tag(tag.id), "stale", 48);
    let id = device.id;
    let h = Harness::new(vec![device.clone()], vec![tag], SyncSettings::enabled(24));
    // Registered under another id, unknown to the registry.
    h.directory
        .seed("dir-4", &device.canonical_identifier().unwrap());

    h.reconciler.run_confirm().await.unwrap();

    assert_eq!(h.log.count("directory.add:C02XYZ"), 1);
    assert_eq!(h.directory.len(), 1);
    let device = h.device(id).await.unwrap();
    assert_eq!(device.status, DeviceStatus::Synced);
    assert_eq!(device.identifier_id.as_deref(), Some("dir-4"));
}
