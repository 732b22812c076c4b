//! Counter updates and reads over the statistics tables.

use eduvault_store::{ReadTxn, StorageEngine, WriteTxn};
use eduvault_types::{CounterDelta, SectionStatistics, StudentStatistics, Timestamp};
use tracing::trace;

use crate::error::{LedgerError, Table};

/// Add `delta` to the student row `register_number`, holding the row lock
/// until the surrounding transaction ends.
pub fn apply_student(
    txn: &mut dyn WriteTxn,
    register_number: &str,
    delta: CounterDelta,
    at: Timestamp,
) -> Result<StudentStatistics, LedgerError> {
    let mut row = txn
        .student_statistics_for_update(register_number)?
        .ok_or_else(|| LedgerError::NotFound {
            table: Table::Students,
            key: register_number.to_string(),
        })?;
    row.counters = row
        .counters
        .apply(&delta)
        .ok_or_else(|| LedgerError::Underflow {
            table: Table::Students,
            key: register_number.to_string(),
        })?;
    row.last_updated = at;
    txn.put_student_statistics(&row)?;
    trace!(register_number, ?delta, "student statistics updated");
    Ok(row)
}

/// Add `delta` to the section row `section`.
pub fn apply_section(
    txn: &mut dyn WriteTxn,
    section: &str,
    delta: CounterDelta,
    at: Timestamp,
) -> Result<SectionStatistics, LedgerError> {
    let mut row = txn
        .section_statistics_for_update(section)?
        .ok_or_else(|| LedgerError::NotFound {
            table: Table::Sections,
            key: section.to_string(),
        })?;
    row.counters = row
        .counters
        .apply(&delta)
        .ok_or_else(|| LedgerError::Underflow {
            table: Table::Sections,
            key: section.to_string(),
        })?;
    row.last_updated = at;
    txn.put_section_statistics(&row)?;
    trace!(section, ?delta, "section statistics updated");
    Ok(row)
}

pub fn student_statistics<E: StorageEngine>(
    engine: &E,
    register_number: &str,
) -> Result<StudentStatistics, LedgerError> {
    engine.read(|r: &dyn ReadTxn| {
        r.get_student_statistics(register_number)?
            .ok_or_else(|| LedgerError::NotFound {
                table: Table::Students,
                key: register_number.to_string(),
            })
    })
}

pub fn section_statistics<E: StorageEngine>(
    engine: &E,
    section: &str,
) -> Result<SectionStatistics, LedgerError> {
    engine.read(|r: &dyn ReadTxn| {
        r.get_section_statistics(section)?
            .ok_or_else(|| LedgerError::NotFound {
                table: Table::Sections,
                key: section.to_string(),
            })
    })
}

/// Every student row, ordered by register number.
pub fn all_students<E: StorageEngine>(engine: &E) -> Result<Vec<StudentStatistics>, LedgerError> {
    let mut rows =
        engine.read(|r: &dyn ReadTxn| Ok::<_, LedgerError>(r.iter_student_statistics()?))?;
    rows.sort_by(|a, b| a.register_number.cmp(&b.register_number));
    Ok(rows)
}

/// Every section row, ordered by section label.
pub fn all_sections<E: StorageEngine>(engine: &E) -> Result<Vec<SectionStatistics>, LedgerError> {
    let mut rows =
        engine.read(|r: &dyn ReadTxn| Ok::<_, LedgerError>(r.iter_section_statistics()?))?;
    rows.sort_by(|a, b| a.section.cmp(&b.section));
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::{provision_section, provision_student};
    use eduvault_nullables::NullStore;
    use eduvault_types::FacultyDecision;

    fn provisioned() -> NullStore {
        let store = NullStore::new();
        provision_student(&store, "RA1", Timestamp::new(1)).unwrap();
        provision_section(&store, "A", Timestamp::new(1)).unwrap();
        store
    }

    #[test]
    fn apply_updates_counters_and_timestamp() {
        let store = provisioned();
        store
            .write(|txn| {
                apply_student(txn, "RA1", CounterDelta::UPLOADED, Timestamp::new(10))?;
                apply_section(txn, "A", CounterDelta::UPLOADED, Timestamp::new(10))?;
                Ok::<_, LedgerError>(())
            })
            .unwrap();

        let student = student_statistics(&store, "RA1").unwrap();
        assert_eq!(student.counters.total_uploaded, 1);
        assert_eq!(student.counters.pending, 1);
        assert_eq!(student.last_updated, Timestamp::new(10));
        let section = section_statistics(&store, "A").unwrap();
        assert_eq!(section.counters.total_uploaded, 1);
    }

    #[test]
    fn missing_row_is_not_found() {
        let store = provisioned();
        let err = store
            .write(|txn| apply_student(txn, "RA404", CounterDelta::UPLOADED, Timestamp::new(2)))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::NotFound { table: Table::Students, ref key } if key == "RA404"
        ));
        assert!(err.to_string().contains("statistics record not found"));
    }

    #[test]
    fn underflow_aborts_the_transaction() {
        let store = provisioned();
        let result = store.write(|txn| {
            apply_section(txn, "A", CounterDelta::UPLOADED, Timestamp::new(2))?;
            apply_student(
                txn,
                "RA1",
                CounterDelta::student_decision(FacultyDecision::Legit),
                Timestamp::new(2),
            )
        });
        assert!(matches!(result, Err(LedgerError::Underflow { .. })));
        // The section change made earlier in the same transaction is gone too.
        let section = section_statistics(&store, "A").unwrap();
        assert_eq!(section.counters.total_uploaded, 0);
    }

    #[test]
    fn listings_are_sorted() {
        let store = NullStore::new();
        for section in ["C", "A", "B"] {
            provision_section(&store, section, Timestamp::EPOCH).unwrap();
        }
        let labels: Vec<_> = all_sections(&store)
            .unwrap()
            .into_iter()
            .map(|s| s.section)
            .collect();
        assert_eq!(labels, ["A", "B", "C"]);
    }
}
