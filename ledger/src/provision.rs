//! Creating statistics rows ahead of the certificates that reference them.

use eduvault_store::StorageEngine;
use eduvault_types::{SectionStatistics, StudentStatistics, Timestamp};
use tracing::info;

use crate::LedgerError;

/// Insert a zeroed student row unless one already exists.
///
/// Returns `true` when a row was created.
pub fn provision_student<E: StorageEngine>(
    engine: &E,
    register_number: &str,
    at: Timestamp,
) -> Result<bool, LedgerError> {
    if register_number.trim().is_empty() {
        return Err(LedgerError::InvalidKey("empty register number".into()));
    }
    let created = engine.write(|txn| {
        if txn.student_statistics_for_update(register_number)?.is_some() {
            return Ok::<_, LedgerError>(false);
        }
        txn.put_student_statistics(&StudentStatistics::new(register_number, at))?;
        Ok(true)
    })?;
    if created {
        info!(register_number, "student statistics provisioned");
    }
    Ok(created)
}

/// Insert a zeroed section row unless one already exists.
pub fn provision_section<E: StorageEngine>(
    engine: &E,
    section: &str,
    at: Timestamp,
) -> Result<bool, LedgerError> {
    if section.trim().is_empty() {
        return Err(LedgerError::InvalidKey("empty section".into()));
    }
    let created = engine.write(|txn| {
        if txn.section_statistics_for_update(section)?.is_some() {
            return Ok::<_, LedgerError>(false);
        }
        txn.put_section_statistics(&SectionStatistics::new(section, at))?;
        Ok(true)
    })?;
    if created {
        info!(section, "section statistics provisioned");
    }
    Ok(created)
}
