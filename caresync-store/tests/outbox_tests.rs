use caresync_store::{ClientStore, ConflictLog, Outbox, StorePolicy, SyncMeta};
use caresync_types::{ChangeOperation, ConflictRecord, EntityKind, QueueEntry};
use serde_json::json;

fn store() -> ClientStore {
    ClientStore::open_in_memory(StorePolicy::clinical_default()).unwrap()
}

fn entry(entity_id: &str, operation: ChangeOperation) -> QueueEntry {
    QueueEntry::new(
        EntityKind::Patient,
        entity_id.to_string(),
        operation,
        json!({"id": entity_id, "last_name": "Okafor"}),
        "device-a".to_string(),
    )
}

#[test]
fn entries_come_back_in_enqueue_order() {
    let outbox = Outbox::new(&store());

    let first = entry("p1", ChangeOperation::Create);
    let second = entry("p2", ChangeOperation::Create);
    let third = entry("p1", ChangeOperation::Update);
    for e in [&first, &second, &third] {
        outbox.enqueue(e).unwrap();
    }

    let pending = outbox.list_pending().unwrap();
    let ids: Vec<_> = pending.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![first.id, second.id, third.id]);
}

#[test]
fn round_trips_entry_fields() {
    let outbox = Outbox::new(&store());
    let original = entry("p1", ChangeOperation::Update);
    outbox.enqueue(&original).unwrap();

    let restored = outbox.list_pending().unwrap().remove(0);
    assert_eq!(restored.id, original.id);
    assert_eq!(restored.entity_type, EntityKind::Patient);
    assert_eq!(restored.entity_id, "p1");
    assert_eq!(restored.operation, ChangeOperation::Update);
    assert_eq!(restored.payload, original.payload);
    assert_eq!(restored.device_id, "device-a");
}

#[test]
fn retire_removes_only_the_acknowledged_entry() {
    let outbox = Outbox::new(&store());
    let a = entry("p1", ChangeOperation::Create);
    let b = entry("p2", ChangeOperation::Create);
    outbox.enqueue(&a).unwrap();
    outbox.enqueue(&b).unwrap();

    outbox.retire(a.id).unwrap();

    let pending = outbox.list_pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, b.id);
}

#[test]
fn retire_is_idempotent() {
    let outbox = Outbox::new(&store());
    let a = entry("p1", ChangeOperation::Create);
    outbox.enqueue(&a).unwrap();

    outbox.retire(a.id).unwrap();
    outbox.retire(a.id).unwrap();
    assert_eq!(outbox.pending_count().unwrap(), 0);
}

#[test]
fn pending_for_entity_filters_by_kind_and_id() {
    let outbox = Outbox::new(&store());
    outbox.enqueue(&entry("p1", ChangeOperation::Create)).unwrap();
    outbox.enqueue(&entry("p1", ChangeOperation::Update)).unwrap();
    outbox.enqueue(&entry("p2", ChangeOperation::Create)).unwrap();

    let for_p1 = outbox
        .pending_for_entity(EntityKind::Patient, "p1")
        .unwrap();
    assert_eq!(for_p1.len(), 2);
    assert!(outbox
        .pending_for_entity(EntityKind::Appointment, "p1")
        .unwrap()
        .is_empty());
}

#[test]
fn queue_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("care.db");

    let a = entry("p1", ChangeOperation::Create);
    {
        let store = ClientStore::open(&db, StorePolicy::clinical_default()).unwrap();
        Outbox::new(&store).enqueue(&a).unwrap();
    }

    let store = ClientStore::open(&db, StorePolicy::clinical_default()).unwrap();
    let pending = Outbox::new(&store).list_pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, a.id);
}

// ── Checkpoint ───────────────────────────────────────────────────

#[test]
fn checkpoint_starts_unset_and_advances() {
    let meta = SyncMeta::new(&store());
    assert!(meta.checkpoint().unwrap().is_none());

    let t1 = chrono::Utc::now();
    meta.set_checkpoint(t1).unwrap();
    assert_eq!(meta.checkpoint().unwrap().unwrap().timestamp(), t1.timestamp());
}

#[test]
fn checkpoint_never_moves_backwards() {
    let meta = SyncMeta::new(&store());
    let later = chrono::Utc::now();
    let earlier = later - chrono::Duration::minutes(5);

    meta.set_checkpoint(later).unwrap();
    meta.set_checkpoint(earlier).unwrap();

    assert_eq!(
        meta.checkpoint().unwrap().unwrap().timestamp(),
        later.timestamp()
    );
}

// ── Conflict log ─────────────────────────────────────────────────

fn conflict(entity_id: &str) -> ConflictRecord {
    ConflictRecord::new(
        EntityKind::Patient,
        entity_id.to_string(),
        json!({"last_name": "Okafor", "phone": "111"}),
        json!({"last_name": "Okafor", "phone": "222"}),
    )
}

#[test]
fn conflicts_are_recorded_unresolved() {
    let log = ConflictLog::new(&store());
    let c = conflict("p1");
    log.record(&c).unwrap();

    let unresolved = log.list_unresolved().unwrap();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].id, c.id);
    assert!(!unresolved[0].resolved);
    assert!(unresolved[0].resolution_payload.is_none());
}

#[test]
fn resolving_keeps_the_record_for_audit() {
    let log = ConflictLog::new(&store());
    let c = conflict("p1");
    log.record(&c).unwrap();

    let resolution = json!({"last_name": "Okafor", "phone": "222"});
    assert!(log.resolve(c.id, &resolution).unwrap());
    // A second resolve is a no-op.
    assert!(!log.resolve(c.id, &resolution).unwrap());

    assert!(log.list_unresolved().unwrap().is_empty());
    let all = log.list_for_entity(EntityKind::Patient, "p1").unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].resolved);
    assert_eq!(all[0].resolution_payload.as_ref().unwrap(), &resolution);
}
