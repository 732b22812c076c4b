//! Statistics ledger.
//!
//! Two aggregate tables, one row per student register number and one per
//! section, hold running certificate counters. Every change is a signed
//! [`CounterDelta`](eduvault_types::CounterDelta) applied inside the
//! caller's write transaction, so counters move together with the
//! certificate rows that caused them.

pub mod audit;
pub mod error;
pub mod ledger;
pub mod provision;

pub use audit::{audit_statistics, AuditReport};
pub use error::{LedgerError, Table};
pub use ledger::{
    all_sections, all_students, apply_section, apply_student, section_statistics,
    student_statistics,
};
pub use provision::{provision_section, provision_student};
