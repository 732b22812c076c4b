use proptest::prelude::*;

use eduvault_types::{
    CertificateId, CounterDelta, Counters, FacultyDecision, MlStatus, Timestamp,
};

fn decision() -> impl Strategy<Value = FacultyDecision> {
    prop_oneof![Just(FacultyDecision::Legit), Just(FacultyDecision::NotLegit)]
}

fn ml_status() -> impl Strategy<Value = MlStatus> {
    prop_oneof![
        Just(MlStatus::Pending),
        Just(MlStatus::Verified),
        Just(MlStatus::Duplicate)
    ]
}

proptest! {
    /// Deciding at most as many certificates as were uploaded never underflows,
    /// and the pending counter always equals uploads minus decisions.
    #[test]
    fn decisions_never_underflow(uploads in 0usize..20, decisions in prop::collection::vec(decision(), 0..20)) {
        let mut counters = Counters::default();
        for _ in 0..uploads {
            counters = counters.apply(&CounterDelta::UPLOADED).unwrap();
        }
        let decided = decisions.len().min(uploads);
        for d in decisions.iter().take(decided) {
            counters = counters.apply(&CounterDelta::student_decision(*d)).unwrap();
        }
        prop_assert_eq!(counters.total_uploaded, uploads as u64);
        prop_assert_eq!(counters.pending, (uploads - decided) as u64);
        prop_assert_eq!(counters.legit + counters.not_legit, decided as u64);
    }

    /// An id's display form always parses back to the same id.
    #[test]
    fn certificate_id_display_parses(bytes in prop::array::uniform16(0u8..)) {
        let id = CertificateId::new(bytes);
        let parsed: CertificateId = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// Distinct sequence numbers always yield distinct ids.
    #[test]
    fn derived_ids_are_unique_per_sequence(
        link in "https://drive\\.google\\.com/[a-z0-9]{1,12}",
        secs in 0u64..2_000_000_000,
        a in 0u64..1_000_000,
        b in 0u64..1_000_000,
    ) {
        prop_assume!(a != b);
        let at = Timestamp::new(secs);
        prop_assert_ne!(
            CertificateId::derive(&link, "RA1", at, a),
            CertificateId::derive(&link, "RA1", at, b)
        );
    }

    /// Machine status only leaves pending, and only verified may be rescored.
    #[test]
    fn machine_status_monotonic(from in ml_status(), to in ml_status()) {
        let allowed = (from == MlStatus::Pending && to != MlStatus::Pending)
            || (from == MlStatus::Verified && to == MlStatus::Verified);
        prop_assert_eq!(from.can_become(to), allowed);
    }
}
