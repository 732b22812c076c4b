//! Transactional behaviour of the certificate store against both engines.

use std::sync::Arc;

use eduvault_certificates::{CertificateError, CertificateStore};
use eduvault_ledger::{
    audit_statistics, provision_section, provision_student, section_statistics,
    student_statistics, Table,
};
use eduvault_nullables::{NullClock, NullStore};
use eduvault_store::{StorageEngine, StoreError};
use eduvault_store_lmdb::LmdbEnvironment;
use eduvault_types::{CertificateInput, Counters, FacultyDecision, MlStatus, Timestamp};

fn input(reg_no: &str, section: &str, n: u32) -> CertificateInput {
    CertificateInput {
        evidence_link: format!("https://drive.google.com/file/d/{reg_no}-{n}"),
        register_number: reg_no.into(),
        section: section.into(),
        student_name: "Student".into(),
        uploaded_by: "prof".into(),
        uploaded_at: None,
    }
}

fn provision<E: StorageEngine>(engine: &E) {
    provision_student(engine, "RA1", Timestamp::EPOCH).unwrap();
    provision_student(engine, "RA2", Timestamp::EPOCH).unwrap();
    provision_section(engine, "A", Timestamp::EPOCH).unwrap();
}

fn null_store() -> CertificateStore<NullStore> {
    let engine = Arc::new(NullStore::new());
    provision(engine.as_ref());
    CertificateStore::new(engine, Arc::new(NullClock::new(1_000)))
}

#[test]
fn batch_counts_every_certificate() {
    let store = null_store();
    let ids = store
        .create(vec![input("RA1", "A", 1), input("RA2", "A", 2), input("RA1", "A", 3)])
        .unwrap();
    assert_eq!(ids.len(), 3);

    let engine = store.engine().as_ref();
    let ra1 = student_statistics(engine, "RA1").unwrap();
    assert_eq!(ra1.counters.total_uploaded, 2);
    assert_eq!(ra1.counters.pending, 2);
    assert_eq!(ra1.last_updated, Timestamp::new(1_000));
    let section = section_statistics(engine, "A").unwrap();
    assert_eq!(section.counters.total_uploaded, 3);
    assert!(audit_statistics(engine).unwrap().is_healthy());
}

#[test]
fn oversized_batch_is_rejected_before_storage() {
    let store = null_store();
    let inputs = (0..11).map(|n| input("RA1", "A", n)).collect();
    let err = store.create(inputs).unwrap_err();
    assert!(matches!(err, CertificateError::BatchTooLarge { count: 11, max: 10 }));
    assert_eq!(store.engine().certificate_count(), 0);
}

#[test]
fn missing_statistics_row_rolls_back_the_batch() {
    let store = null_store();
    let err = store
        .create(vec![input("RA1", "A", 1), input("RA9", "A", 2)])
        .unwrap_err();
    match &err {
        CertificateError::StatisticsNotFound { table, key } => {
            assert_eq!(*table, Table::Students);
            assert_eq!(key, "RA9");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("statistics record not found"));

    let engine = store.engine().as_ref();
    assert_eq!(store.engine().certificate_count(), 0);
    assert_eq!(
        student_statistics(engine, "RA1").unwrap().counters,
        Counters::default()
    );
    assert_eq!(
        section_statistics(engine, "A").unwrap().counters,
        Counters::default()
    );
}

#[test]
fn missing_section_row_rolls_back_the_batch() {
    let store = null_store();
    let err = store.create(vec![input("RA1", "Z", 1)]).unwrap_err();
    assert!(matches!(
        err,
        CertificateError::StatisticsNotFound { table: Table::Sections, .. }
    ));
    assert_eq!(store.engine().certificate_count(), 0);
}

#[test]
fn failed_commit_leaves_no_partial_statistics() {
    let store = null_store();
    let id = store.create(vec![input("RA1", "A", 1)]).unwrap()[0];
    let before = student_statistics(store.engine().as_ref(), "RA1").unwrap();

    store.engine().fail_next_commit();
    let err = store
        .update_machine_status(&id, MlStatus::Verified, Some(95.0))
        .unwrap_err();
    assert!(matches!(err, CertificateError::Store(StoreError::Backend(_))));

    let after = student_statistics(store.engine().as_ref(), "RA1").unwrap();
    assert_eq!(before, after);
    assert_eq!(store.get_by_id(&id).unwrap().ml_status, MlStatus::Pending);
}

#[test]
fn lifecycle_updates_counters() {
    let store = null_store();
    let ids = store
        .create(vec![input("RA1", "A", 1), input("RA1", "A", 2)])
        .unwrap();
    for id in &ids {
        store
            .update_machine_status(id, MlStatus::Verified, Some(95.0))
            .unwrap();
    }
    store
        .update_faculty_decision(&ids[0], FacultyDecision::Legit, true)
        .unwrap();
    store
        .update_faculty_decision(&ids[1], FacultyDecision::NotLegit, false)
        .unwrap();

    let engine = store.engine().as_ref();
    let student = student_statistics(engine, "RA1").unwrap().counters;
    assert_eq!(
        student,
        Counters {
            total_uploaded: 2,
            legit: 1,
            not_legit: 1,
            pending: 0,
            ml_verified: 2,
        }
    );
    let section = section_statistics(engine, "A").unwrap().counters;
    assert_eq!(section.legit, 1);
    assert_eq!(section.not_legit, 0);
    assert_eq!(section.pending, 0);
    assert!(audit_statistics(engine).unwrap().is_healthy());
}

#[test]
fn lmdb_engine_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let engine = Arc::new(LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).unwrap());
        provision(engine.as_ref());
        let store = CertificateStore::new(engine, Arc::new(NullClock::new(2_000)));
        let id = store.create(vec![input("RA1", "A", 1)]).unwrap()[0];
        store
            .update_machine_status(&id, MlStatus::Verified, Some(95.0))
            .unwrap();
        store
            .update_faculty_decision(&id, FacultyDecision::Legit, true)
            .unwrap();
        id
    };

    let engine = Arc::new(LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).unwrap());
    let store = CertificateStore::new(engine, Arc::new(NullClock::new(3_000)));
    let cert = store.get_by_id(&id).unwrap();
    assert_eq!(cert.is_legit, Some(true));
    assert_eq!(cert.uploaded_at, Timestamp::new(2_000));

    let stats = student_statistics(store.engine().as_ref(), "RA1").unwrap();
    assert_eq!(stats.counters.legit, 1);
    assert_eq!(stats.counters.ml_verified, 1);

    let err = store
        .create(vec![input("RA1", "A", 2), input("RA7", "A", 3)])
        .unwrap_err();
    assert!(matches!(err, CertificateError::StatisticsNotFound { .. }));
    assert_eq!(store.list_by_student("RA1").unwrap().len(), 1);
}
