//! Roster aggregator: the in-memory collection of every student record,
//! backing the teacher roster view and the leaderboard ordering.

use crate::cache::CacheStore;
use crate::catalog;
use crate::models::StudentRecord;

pub struct RosterAggregator {
    students: Vec<StudentRecord>,
}

impl RosterAggregator {
    pub fn new(students: Vec<StudentRecord>) -> Self {
        RosterAggregator { students }
    }

    /// Initial roster: the cache snapshot when present, else the static
    /// seed roster.
    pub fn from_cache_or_seed(cache: &CacheStore) -> Self {
        let students = cache
            .roster_snapshot()
            .unwrap_or_else(catalog::seed_roster);
        RosterAggregator { students }
    }

    pub fn students(&self) -> &[StudentRecord] {
        &self.students
    }

    /// Replaces the entry with a matching id, or appends a new one.
    pub fn upsert(&mut self, record: StudentRecord) {
        match self.students.iter_mut().find(|s| s.id == record.id) {
            Some(existing) => *existing = record,
            None => self.students.push(record),
        }
    }

    /// Folds another set of records in, keeping the fresher copy per id
    /// (ties go to the incoming record, matching reconciliation where the
    /// durable copy wins).
    pub fn merge(&mut self, records: Vec<StudentRecord>) {
        for record in records {
            match self.students.iter_mut().find(|s| s.id == record.id) {
                Some(existing) if record.last_updated >= existing.last_updated => {
                    *existing = record;
                }
                Some(_) => {}
                None => self.students.push(record),
            }
        }
    }

    /// Leaderboard ordering: descending by coins. The sort is stable, so
    /// equal-coin entries keep their relative order.
    pub fn leaderboard(&self) -> Vec<StudentRecord> {
        let mut sorted = self.students.clone();
        sorted.sort_by(|a, b| b.coins.cmp(&a.coins));
        sorted
    }
}
