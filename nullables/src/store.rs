//! Nullable store: thread-safe in-memory storage engine for testing.
//!
//! Write transactions stage their changes privately and publish them in one
//! step on commit. Rows touched through a write transaction are locked until
//! it ends; a second transaction asking for the same row waits, up to the
//! configured lock timeout.

use eduvault_store::{ReadTxn, StorageEngine, StoreError, WriteTxn};
use eduvault_types::{Certificate, CertificateId, SectionStatistics, StudentStatistics};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// How long a transaction waits for a row lock before giving up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
struct Tables {
    certificates: HashMap<CertificateId, Certificate>,
    students: HashMap<String, StudentStatistics>,
    sections: HashMap<String, SectionStatistics>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum RowKey {
    Certificate(CertificateId),
    Student(String),
    Section(String),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Certificate(id) => write!(f, "certificates/{id}"),
            Self::Student(reg_no) => write!(f, "student_statistics/{reg_no}"),
            Self::Section(section) => write!(f, "section_statistics/{section}"),
        }
    }
}

/// Per-row exclusive locks.
#[derive(Default)]
struct RowLocks {
    held: Mutex<HashSet<RowKey>>,
    released: Condvar,
}

impl RowLocks {
    fn acquire(&self, key: &RowKey, timeout: Duration) -> Result<(), StoreError> {
        let deadline = Instant::now() + timeout;
        let mut held = lock(&self.held);
        while held.contains(key) {
            let now = Instant::now();
            if now >= deadline {
                return Err(StoreError::LockTimeout(key.to_string()));
            }
            held = self
                .released
                .wait_timeout(held, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        held.insert(key.clone());
        Ok(())
    }

    fn release_all(&self, keys: &HashSet<RowKey>) {
        if keys.is_empty() {
            return;
        }
        let mut held = lock(&self.held);
        for key in keys {
            held.remove(key);
        }
        self.released.notify_all();
    }
}

/// An in-memory storage engine with row-level locking.
/// Thread-safe for use with multi-threaded callers.
pub struct NullStore {
    tables: Mutex<Tables>,
    locks: RowLocks,
    sequence: AtomicU64,
    lock_timeout: Duration,
    fail_next_commit: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            locks: RowLocks::default(),
            sequence: AtomicU64::new(0),
            lock_timeout,
            fail_next_commit: AtomicBool::new(false),
        }
    }

    /// Make the next commit fail with a backend error after the transaction
    /// body succeeded. Nothing staged by that transaction is published.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of committed certificates.
    pub fn certificate_count(&self) -> usize {
        lock(&self.tables).certificates.len()
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Committed rows overlaid with staged ones; staged rows win.
fn overlay<K, V>(committed: &HashMap<K, V>, staged: &HashMap<K, V>) -> Vec<V>
where
    K: Eq + Hash,
    V: Clone,
{
    committed
        .iter()
        .map(|(k, v)| staged.get(k).unwrap_or(v).clone())
        .chain(
            staged
                .iter()
                .filter(|(k, _)| !committed.contains_key(*k))
                .map(|(_, v)| v.clone()),
        )
        .collect()
}

struct NullReadTxn<'a> {
    tables: MutexGuard<'a, Tables>,
}

impl ReadTxn for NullReadTxn<'_> {
    fn get_certificate(&self, id: &CertificateId) -> Result<Option<Certificate>, StoreError> {
        Ok(self.tables.certificates.get(id).cloned())
    }

    fn scan_certificates(
        &self,
        filter: &mut dyn FnMut(&Certificate) -> bool,
    ) -> Result<Vec<Certificate>, StoreError> {
        Ok(self
            .tables
            .certificates
            .values()
            .filter(|c| filter(*c))
            .cloned()
            .collect())
    }

    fn get_student_statistics(
        &self,
        register_number: &str,
    ) -> Result<Option<StudentStatistics>, StoreError> {
        Ok(self.tables.students.get(register_number).cloned())
    }

    fn get_section_statistics(
        &self,
        section: &str,
    ) -> Result<Option<SectionStatistics>, StoreError> {
        Ok(self.tables.sections.get(section).cloned())
    }

    fn iter_student_statistics(&self) -> Result<Vec<StudentStatistics>, StoreError> {
        Ok(self.tables.students.values().cloned().collect())
    }

    fn iter_section_statistics(&self) -> Result<Vec<SectionStatistics>, StoreError> {
        Ok(self.tables.sections.values().cloned().collect())
    }
}

struct NullWriteTxn<'a> {
    store: &'a NullStore,
    held: HashSet<RowKey>,
    staged: Tables,
}

impl<'a> NullWriteTxn<'a> {
    fn new(store: &'a NullStore) -> Self {
        Self {
            store,
            held: HashSet::new(),
            staged: Tables::default(),
        }
    }

    fn lock_row(&mut self, key: RowKey) -> Result<(), StoreError> {
        if self.held.contains(&key) {
            return Ok(());
        }
        self.store.locks.acquire(&key, self.store.lock_timeout)?;
        self.held.insert(key);
        Ok(())
    }

    fn committed(&self) -> MutexGuard<'a, Tables> {
        lock(&self.store.tables)
    }

    /// Publish staged rows; row locks are released when `self` drops.
    fn commit(mut self) {
        let staged = std::mem::take(&mut self.staged);
        let mut tables = self.committed();
        tables.certificates.extend(staged.certificates);
        tables.students.extend(staged.students);
        tables.sections.extend(staged.sections);
    }
}

impl Drop for NullWriteTxn<'_> {
    fn drop(&mut self) {
        self.store.locks.release_all(&self.held);
    }
}

impl ReadTxn for NullWriteTxn<'_> {
    fn get_certificate(&self, id: &CertificateId) -> Result<Option<Certificate>, StoreError> {
        if let Some(cert) = self.staged.certificates.get(id) {
            return Ok(Some(cert.clone()));
        }
        Ok(self.committed().certificates.get(id).cloned())
    }

    fn scan_certificates(
        &self,
        filter: &mut dyn FnMut(&Certificate) -> bool,
    ) -> Result<Vec<Certificate>, StoreError> {
        let committed = self.committed();
        Ok(overlay(&committed.certificates, &self.staged.certificates)
            .into_iter()
            .filter(|c| filter(c))
            .collect())
    }

    fn get_student_statistics(
        &self,
        register_number: &str,
    ) -> Result<Option<StudentStatistics>, StoreError> {
        if let Some(stats) = self.staged.students.get(register_number) {
            return Ok(Some(stats.clone()));
        }
        Ok(self.committed().students.get(register_number).cloned())
    }

    fn get_section_statistics(
        &self,
        section: &str,
    ) -> Result<Option<SectionStatistics>, StoreError> {
        if let Some(stats) = self.staged.sections.get(section) {
            return Ok(Some(stats.clone()));
        }
        Ok(self.committed().sections.get(section).cloned())
    }

    fn iter_student_statistics(&self) -> Result<Vec<StudentStatistics>, StoreError> {
        Ok(overlay(&self.committed().students, &self.staged.students))
    }

    fn iter_section_statistics(&self) -> Result<Vec<SectionStatistics>, StoreError> {
        Ok(overlay(&self.committed().sections, &self.staged.sections))
    }
}

impl WriteTxn for NullWriteTxn<'_> {
    fn certificate_for_update(
        &mut self,
        id: &CertificateId,
    ) -> Result<Option<Certificate>, StoreError> {
        self.lock_row(RowKey::Certificate(*id))?;
        self.get_certificate(id)
    }

    fn insert_certificate(&mut self, cert: &Certificate) -> Result<(), StoreError> {
        self.lock_row(RowKey::Certificate(cert.id))?;
        if self.get_certificate(&cert.id)?.is_some() {
            return Err(StoreError::Duplicate(cert.id.to_string()));
        }
        self.staged.certificates.insert(cert.id, cert.clone());
        Ok(())
    }

    fn update_certificate(&mut self, cert: &Certificate) -> Result<(), StoreError> {
        self.lock_row(RowKey::Certificate(cert.id))?;
        if self.get_certificate(&cert.id)?.is_none() {
            return Err(StoreError::NotFound(cert.id.to_string()));
        }
        self.staged.certificates.insert(cert.id, cert.clone());
        Ok(())
    }

    fn student_statistics_for_update(
        &mut self,
        register_number: &str,
    ) -> Result<Option<StudentStatistics>, StoreError> {
        self.lock_row(RowKey::Student(register_number.to_string()))?;
        self.get_student_statistics(register_number)
    }

    fn put_student_statistics(&mut self, stats: &StudentStatistics) -> Result<(), StoreError> {
        self.lock_row(RowKey::Student(stats.register_number.clone()))?;
        self.staged
            .students
            .insert(stats.register_number.clone(), stats.clone());
        Ok(())
    }

    fn section_statistics_for_update(
        &mut self,
        section: &str,
    ) -> Result<Option<SectionStatistics>, StoreError> {
        self.lock_row(RowKey::Section(section.to_string()))?;
        self.get_section_statistics(section)
    }

    fn put_section_statistics(&mut self, stats: &SectionStatistics) -> Result<(), StoreError> {
        self.lock_row(RowKey::Section(stats.section.clone()))?;
        self.staged
            .sections
            .insert(stats.section.clone(), stats.clone());
        Ok(())
    }

    fn next_sequence(&mut self) -> Result<u64, StoreError> {
        // Like a database sequence: never rolled back, never reused.
        Ok(self.store.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl StorageEngine for NullStore {
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&dyn ReadTxn) -> Result<T, E>,
    {
        let view = NullReadTxn {
            tables: lock(&self.tables),
        };
        f(&view)
    }

    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, E>,
    {
        let mut txn = NullWriteTxn::new(self);
        let out = f(&mut txn)?;
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected commit failure".to_string()).into());
        }
        txn.commit();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eduvault_types::{CertificateInput, Timestamp};
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;

    fn test_cert(seq: u64) -> Certificate {
        Certificate::from_input(
            CertificateInput {
                evidence_link: format!("https://drive.google.com/file/d/{seq}"),
                register_number: "RA1".into(),
                section: "A".into(),
                student_name: "Student".into(),
                uploaded_by: "faculty".into(),
                uploaded_at: None,
            },
            Timestamp::new(1000),
            seq,
        )
    }

    #[test]
    fn committed_writes_are_visible() {
        let store = NullStore::new();
        let cert = test_cert(1);
        store
            .write(|txn| txn.insert_certificate(&cert))
            .unwrap();
        let got = store
            .read(|r| r.get_certificate(&cert.id))
            .unwrap()
            .unwrap();
        assert_eq!(got, cert);
        assert_eq!(store.certificate_count(), 1);
    }

    #[test]
    fn failed_body_rolls_back() {
        let store = NullStore::new();
        let cert = test_cert(1);
        let result: Result<(), StoreError> = store.write(|txn| {
            txn.insert_certificate(&cert)?;
            txn.put_student_statistics(&StudentStatistics::new("RA1", Timestamp::EPOCH))?;
            Err(StoreError::Backend("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.certificate_count(), 0);
        assert!(store
            .read(|r| r.get_student_statistics("RA1"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn injected_commit_failure_publishes_nothing() {
        let store = NullStore::new();
        store.fail_next_commit();
        let cert = test_cert(1);
        let result = store.write(|txn| txn.insert_certificate(&cert));
        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert_eq!(store.certificate_count(), 0);
        // The switch is one-shot.
        store.write(|txn| txn.insert_certificate(&cert)).unwrap();
        assert_eq!(store.certificate_count(), 1);
    }

    #[test]
    fn reads_inside_txn_see_staged_rows() {
        let store = NullStore::new();
        let cert = test_cert(1);
        store
            .write(|txn| {
                txn.insert_certificate(&cert)?;
                assert!(txn.get_certificate(&cert.id)?.is_some());
                let all = txn.scan_certificates(&mut |_| true)?;
                assert_eq!(all.len(), 1);
                Ok::<_, StoreError>(())
            })
            .unwrap();
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = NullStore::new();
        let cert = test_cert(1);
        store.write(|txn| txn.insert_certificate(&cert)).unwrap();
        let again = store.write(|txn| txn.insert_certificate(&cert));
        assert!(matches!(again, Err(StoreError::Duplicate(_))));
    }

    #[test]
    fn update_of_missing_row_fails() {
        let store = NullStore::new();
        let result = store.write(|txn| txn.update_certificate(&test_cert(9)));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn sequence_is_monotonic() {
        let store = NullStore::new();
        let (a, b) = store
            .write(|txn| Ok::<_, StoreError>((txn.next_sequence()?, txn.next_sequence()?)))
            .unwrap();
        assert_eq!((a, b), (1, 2));
    }

    #[test]
    fn row_lock_blocks_second_writer_until_timeout() {
        let store = Arc::new(NullStore::with_lock_timeout(Duration::from_millis(50)));
        let cert = test_cert(1);
        store.write(|txn| txn.insert_certificate(&cert)).unwrap();

        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let holder = {
            let store = Arc::clone(&store);
            let id = cert.id;
            thread::spawn(move || {
                store
                    .write(|txn| {
                        txn.certificate_for_update(&id)?;
                        locked_tx.send(()).ok();
                        release_rx.recv().ok();
                        Ok::<_, StoreError>(())
                    })
                    .unwrap();
            })
        };

        locked_rx.recv().unwrap();
        let contender = store.write(|txn| txn.certificate_for_update(&cert.id));
        assert!(matches!(contender, Err(StoreError::LockTimeout(_))));

        release_tx.send(()).unwrap();
        holder.join().unwrap();
        // Lock released on commit.
        assert!(store
            .write(|txn| txn.certificate_for_update(&cert.id))
            .unwrap()
            .is_some());
    }

    #[test]
    fn locks_are_reentrant_within_a_txn() {
        let store = NullStore::with_lock_timeout(Duration::from_millis(10));
        let cert = test_cert(1);
        store
            .write(|txn| {
                txn.insert_certificate(&cert)?;
                txn.certificate_for_update(&cert.id)?;
                txn.update_certificate(&cert)
            })
            .unwrap();
    }
}
