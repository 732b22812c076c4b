//! Read and write transactions over the LMDB databases.

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use eduvault_store::{ReadTxn, StoreError, WriteTxn};
use eduvault_types::{Certificate, CertificateId, SectionStatistics, StudentStatistics};

use crate::environment::Databases;
use crate::LmdbError;

const SEQUENCE_KEY: &[u8] = b"certificate_sequence";

fn get_decoded<T: DeserializeOwned>(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn,
    key: &[u8],
) -> Result<Option<T>, LmdbError> {
    match db.get(txn, key)? {
        Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
        None => Ok(None),
    }
}

fn scan_decoded<T: DeserializeOwned>(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn,
    filter: &mut dyn FnMut(&T) -> bool,
) -> Result<Vec<T>, LmdbError> {
    let mut out = Vec::new();
    for entry in db.iter(txn)? {
        let (_key, bytes) = entry?;
        let value: T = bincode::deserialize(bytes)?;
        if filter(&value) {
            out.push(value);
        }
    }
    Ok(out)
}

fn put_encoded<T: Serialize>(
    db: &Database<Bytes, Bytes>,
    txn: &mut RwTxn,
    key: &[u8],
    value: &T,
) -> Result<(), LmdbError> {
    let bytes = bincode::serialize(value)?;
    db.put(txn, key, &bytes)?;
    Ok(())
}

/// Row reads shared by both transaction kinds.
fn read_certificate(
    dbs: &Databases,
    txn: &RoTxn,
    id: &CertificateId,
) -> Result<Option<Certificate>, StoreError> {
    Ok(get_decoded(&dbs.certificates, txn, id.as_bytes().as_slice())?)
}

fn read_student(
    dbs: &Databases,
    txn: &RoTxn,
    register_number: &str,
) -> Result<Option<StudentStatistics>, StoreError> {
    Ok(get_decoded(&dbs.students, txn, register_number.as_bytes())?)
}

fn read_section(
    dbs: &Databases,
    txn: &RoTxn,
    section: &str,
) -> Result<Option<SectionStatistics>, StoreError> {
    Ok(get_decoded(&dbs.sections, txn, section.as_bytes())?)
}

/// A read-only snapshot.
pub struct LmdbReadTxn<'a> {
    txn: RoTxn<'a>,
    dbs: Databases,
}

impl<'a> LmdbReadTxn<'a> {
    pub(crate) fn new(txn: RoTxn<'a>, dbs: Databases) -> Self {
        Self { txn, dbs }
    }
}

impl ReadTxn for LmdbReadTxn<'_> {
    fn get_certificate(&self, id: &CertificateId) -> Result<Option<Certificate>, StoreError> {
        read_certificate(&self.dbs, &self.txn, id)
    }

    fn scan_certificates(
        &self,
        filter: &mut dyn FnMut(&Certificate) -> bool,
    ) -> Result<Vec<Certificate>, StoreError> {
        Ok(scan_decoded(&self.dbs.certificates, &self.txn, filter)?)
    }

    fn get_student_statistics(
        &self,
        register_number: &str,
    ) -> Result<Option<StudentStatistics>, StoreError> {
        read_student(&self.dbs, &self.txn, register_number)
    }

    fn get_section_statistics(
        &self,
        section: &str,
    ) -> Result<Option<SectionStatistics>, StoreError> {
        read_section(&self.dbs, &self.txn, section)
    }

    fn iter_student_statistics(&self) -> Result<Vec<StudentStatistics>, StoreError> {
        Ok(scan_decoded(&self.dbs.students, &self.txn, &mut |_| true)?)
    }

    fn iter_section_statistics(&self) -> Result<Vec<SectionStatistics>, StoreError> {
        Ok(scan_decoded(&self.dbs.sections, &self.txn, &mut |_| true)?)
    }
}

/// The single LMDB writer. Changes become visible only on commit.
pub struct LmdbWriteTxn<'a> {
    txn: RwTxn<'a>,
    dbs: Databases,
}

impl<'a> LmdbWriteTxn<'a> {
    pub(crate) fn new(txn: RwTxn<'a>, dbs: Databases) -> Self {
        Self { txn, dbs }
    }

    pub(crate) fn commit(self) -> Result<(), LmdbError> {
        self.txn.commit()?;
        Ok(())
    }
}

impl ReadTxn for LmdbWriteTxn<'_> {
    fn get_certificate(&self, id: &CertificateId) -> Result<Option<Certificate>, StoreError> {
        read_certificate(&self.dbs, &self.txn, id)
    }

    fn scan_certificates(
        &self,
        filter: &mut dyn FnMut(&Certificate) -> bool,
    ) -> Result<Vec<Certificate>, StoreError> {
        Ok(scan_decoded(&self.dbs.certificates, &self.txn, filter)?)
    }

    fn get_student_statistics(
        &self,
        register_number: &str,
    ) -> Result<Option<StudentStatistics>, StoreError> {
        read_student(&self.dbs, &self.txn, register_number)
    }

    fn get_section_statistics(
        &self,
        section: &str,
    ) -> Result<Option<SectionStatistics>, StoreError> {
        read_section(&self.dbs, &self.txn, section)
    }

    fn iter_student_statistics(&self) -> Result<Vec<StudentStatistics>, StoreError> {
        Ok(scan_decoded(&self.dbs.students, &self.txn, &mut |_| true)?)
    }

    fn iter_section_statistics(&self) -> Result<Vec<SectionStatistics>, StoreError> {
        Ok(scan_decoded(&self.dbs.sections, &self.txn, &mut |_| true)?)
    }
}

impl WriteTxn for LmdbWriteTxn<'_> {
    fn certificate_for_update(
        &mut self,
        id: &CertificateId,
    ) -> Result<Option<Certificate>, StoreError> {
        self.get_certificate(id)
    }

    fn insert_certificate(&mut self, cert: &Certificate) -> Result<(), StoreError> {
        if self.get_certificate(&cert.id)?.is_some() {
            return Err(StoreError::Duplicate(cert.id.to_string()));
        }
        put_encoded(
            &self.dbs.certificates,
            &mut self.txn,
            cert.id.as_bytes().as_slice(),
            cert,
        )?;
        Ok(())
    }

    fn update_certificate(&mut self, cert: &Certificate) -> Result<(), StoreError> {
        if self.get_certificate(&cert.id)?.is_none() {
            return Err(LmdbError::NotFound(cert.id.to_string()).into());
        }
        put_encoded(
            &self.dbs.certificates,
            &mut self.txn,
            cert.id.as_bytes().as_slice(),
            cert,
        )?;
        Ok(())
    }

    fn student_statistics_for_update(
        &mut self,
        register_number: &str,
    ) -> Result<Option<StudentStatistics>, StoreError> {
        self.get_student_statistics(register_number)
    }

    fn put_student_statistics(&mut self, stats: &StudentStatistics) -> Result<(), StoreError> {
        put_encoded(
            &self.dbs.students,
            &mut self.txn,
            stats.register_number.as_bytes(),
            stats,
        )?;
        Ok(())
    }

    fn section_statistics_for_update(
        &mut self,
        section: &str,
    ) -> Result<Option<SectionStatistics>, StoreError> {
        self.get_section_statistics(section)
    }

    fn put_section_statistics(&mut self, stats: &SectionStatistics) -> Result<(), StoreError> {
        put_encoded(
            &self.dbs.sections,
            &mut self.txn,
            stats.section.as_bytes(),
            stats,
        )?;
        Ok(())
    }

    fn next_sequence(&mut self) -> Result<u64, StoreError> {
        let current = match self
            .dbs
            .meta
            .get(&self.txn, SEQUENCE_KEY)
            .map_err(LmdbError::from)?
        {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.try_into().map_err(|_| {
                    StoreError::Corruption("certificate_sequence has unexpected length".into())
                })?;
                u64::from_be_bytes(arr)
            }
            None => 0,
        };
        let next = current + 1;
        self.dbs
            .meta
            .put(&mut self.txn, SEQUENCE_KEY, &next.to_be_bytes())
            .map_err(LmdbError::from)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use crate::LmdbEnvironment;
    use eduvault_store::{StorageEngine, StoreError};
    use eduvault_types::{
        Certificate, CertificateInput, SectionStatistics, StudentStatistics, Timestamp,
    };

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).expect("open env");
        (dir, env)
    }

    fn test_cert(seq: u64) -> Certificate {
        Certificate::from_input(
            CertificateInput {
                evidence_link: format!("https://drive.google.com/file/d/{seq}"),
                register_number: "RA1".into(),
                section: "A".into(),
                student_name: "Student".into(),
                uploaded_by: "faculty".into(),
                uploaded_at: Some(Timestamp::new(100 + seq)),
            },
            Timestamp::new(0),
            seq,
        )
    }

    #[test]
    fn certificate_write_read_roundtrip() {
        let (_dir, env) = temp_env();
        let cert = test_cert(1);
        env.write(|txn| txn.insert_certificate(&cert)).unwrap();
        let got = env.read(|r| r.get_certificate(&cert.id)).unwrap();
        assert_eq!(got, Some(cert));
    }

    #[test]
    fn aborted_write_leaves_no_trace() {
        let (_dir, env) = temp_env();
        let cert = test_cert(1);
        let result: Result<(), StoreError> = env.write(|txn| {
            txn.insert_certificate(&cert)?;
            txn.put_section_statistics(&SectionStatistics::new("A", Timestamp::EPOCH))?;
            Err(StoreError::Backend("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(env.read(|r| r.get_certificate(&cert.id)).unwrap(), None);
        assert_eq!(env.read(|r| r.get_section_statistics("A")).unwrap(), None);
    }

    #[test]
    fn scan_filters_rows() {
        let (_dir, env) = temp_env();
        env.write(|txn| {
            for seq in 1..=4 {
                let mut cert = test_cert(seq);
                cert.archived = seq % 2 == 0;
                txn.insert_certificate(&cert)?;
            }
            Ok::<_, StoreError>(())
        })
        .unwrap();
        let live = env
            .read(|r| r.scan_certificates(&mut |c| !c.archived))
            .unwrap();
        assert_eq!(live.len(), 2);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let (_dir, env) = temp_env();
        let cert = test_cert(1);
        env.write(|txn| txn.insert_certificate(&cert)).unwrap();
        let again = env.write(|txn| txn.insert_certificate(&cert));
        assert!(matches!(again, Err(StoreError::Duplicate(_))));
    }

    #[test]
    fn statistics_and_sequence_survive_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        {
            let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).unwrap();
            env.write(|txn| {
                txn.put_student_statistics(&StudentStatistics::new("RA1", Timestamp::new(5)))?;
                txn.next_sequence()?;
                txn.next_sequence()
            })
            .unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).unwrap();
        let stats = env.read(|r| r.iter_student_statistics()).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].register_number, "RA1");
        assert_eq!(env.write(|txn| txn.next_sequence()).unwrap(), 3);
    }
}
