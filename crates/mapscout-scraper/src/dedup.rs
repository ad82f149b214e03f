use std::collections::HashMap;

use mapscout_core::BusinessRecord;

/// What [`ResultSet::offer`] did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// New name; appended.
    Inserted,
    /// Known name whose entry lacked a schedule; the schedule was copied over.
    ScheduleFilled,
    /// Known name; nothing to gain, discarded.
    Duplicate,
    /// Blank name; never stored.
    Rejected,
    /// New name but the set already holds `limit` records.
    Full,
}

/// Insertion-ordered records keyed by trimmed name, capped at `limit`.
///
/// The first record for a name wins. A later duplicate may only fill an
/// empty schedule on that entry.
#[derive(Debug, Clone)]
pub struct ResultSet {
    limit: usize,
    records: Vec<BusinessRecord>,
    positions: HashMap<String, usize>,
}

impl ResultSet {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            records: Vec::with_capacity(limit.min(256)),
            positions: HashMap::new(),
        }
    }

    pub fn offer(&mut self, record: BusinessRecord) -> MergeOutcome {
        let key = record.name_key();
        if key.is_empty() {
            return MergeOutcome::Rejected;
        }

        if let Some(&position) = self.positions.get(key) {
            let existing = &mut self.records[position];
            if !existing.has_schedule() && record.has_schedule() {
                existing.schedule = record.schedule;
                return MergeOutcome::ScheduleFilled;
            }
            return MergeOutcome::Duplicate;
        }

        if self.is_full() {
            return MergeOutcome::Full;
        }
        self.positions.insert(key.to_string(), self.records.len());
        self.records.push(record);
        MergeOutcome::Inserted
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.limit
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn into_records(self) -> Vec<BusinessRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, address: &str, schedule: &str) -> BusinessRecord {
        BusinessRecord {
            name: name.to_string(),
            address: address.to_string(),
            schedule: schedule.to_string(),
            ..BusinessRecord::default()
        }
    }

    #[test]
    fn duplicate_fills_missing_schedule_only() {
        let mut set = ResultSet::new(5);
        assert_eq!(set.offer(record("Café Luna", "Av. 1", "")), MergeOutcome::Inserted);
        assert_eq!(
            set.offer(record("Café Luna", "Av. 2", "Mon 9–17")),
            MergeOutcome::ScheduleFilled
        );

        let records = set.into_records();
        assert_eq!(records, vec![record("Café Luna", "Av. 1", "Mon 9–17")]);
    }

    #[test]
    fn schedule_fill_is_idempotent() {
        let mut set = ResultSet::new(5);
        set.offer(record("Café Luna", "Av. 1", ""));
        let filler = record("Café Luna", "Av. 2", "Mon 9–17");
        assert_eq!(set.offer(filler.clone()), MergeOutcome::ScheduleFilled);
        let once = set.clone().into_records();
        assert_eq!(set.offer(filler), MergeOutcome::Duplicate);
        assert_eq!(set.into_records(), once);
    }

    #[test]
    fn existing_schedule_is_never_replaced() {
        let mut set = ResultSet::new(5);
        set.offer(record("Bar Sur", "", "Open 24 hours"));
        assert_eq!(
            set.offer(record("Bar Sur", "", "Closed")),
            MergeOutcome::Duplicate
        );
        assert_eq!(set.into_records()[0].schedule, "Open 24 hours");
    }

    #[test]
    fn names_compare_after_trimming() {
        let mut set = ResultSet::new(5);
        set.offer(record("Bar Sur", "", ""));
        assert_eq!(set.offer(record("  Bar Sur ", "", "")), MergeOutcome::Duplicate);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn blank_names_are_rejected() {
        let mut set = ResultSet::new(5);
        assert_eq!(set.offer(record("   ", "Av. 1", "")), MergeOutcome::Rejected);
        assert!(set.is_empty());
    }

    #[test]
    fn full_set_rejects_new_names_but_still_merges() {
        let mut set = ResultSet::new(1);
        set.offer(record("A", "", ""));
        assert!(set.is_full());
        assert_eq!(set.offer(record("B", "", "")), MergeOutcome::Full);
        assert_eq!(set.offer(record("A", "", "Mon")), MergeOutcome::ScheduleFilled);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut set = ResultSet::new(5);
        for name in ["C", "A", "B", "A"] {
            set.offer(record(name, "", ""));
        }
        let names: Vec<_> = set.into_records().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["C", "A", "B"]);
    }
}
