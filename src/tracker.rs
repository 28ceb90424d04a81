//! Progress tracker: reconciles the durable and cache copies of a student
//! record into one authoritative in-memory value, applies domain mutations
//! to it, and writes every accepted mutation through to both stores.
//!
//! Store failures inside this module are logged and degrade to "absent"
//! semantics; they never escape to the caller. The durable store is always
//! written; the cache store only while online.

use anyhow::Context;
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::catalog::Catalog;
use crate::connectivity::{Connectivity, Transition};
use crate::db::DurableStore;
use crate::models::{Completion, SessionUser, StudentRecord};
use crate::roster::RosterAggregator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionResult {
    Completed {
        coins_earned: i64,
        completion_percentage: u8,
    },
    /// The content id was already recorded for this subject; nothing
    /// changed, nothing was re-rewarded.
    AlreadyCompleted,
}

pub struct ProgressTracker {
    durable: DurableStore,
    cache: CacheStore,
    catalog: Catalog,
    connectivity: Connectivity,
    roster: RosterAggregator,
    active: Option<StudentRecord>,
}

impl ProgressTracker {
    pub fn new(
        durable: DurableStore,
        cache: CacheStore,
        catalog: Catalog,
        connectivity: Connectivity,
    ) -> Self {
        let roster = RosterAggregator::from_cache_or_seed(&cache);
        ProgressTracker {
            durable,
            cache,
            catalog,
            connectivity,
            roster,
            active: None,
        }
    }

    pub fn active(&self) -> Option<&StudentRecord> {
        self.active.as_ref()
    }

    pub fn leaderboard(&self) -> Vec<StudentRecord> {
        self.roster.leaderboard()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn students(&self) -> &[StudentRecord] {
        self.roster.students()
    }

    /// Folds every durable-store record into the roster, so imported
    /// students and offline mutations show up in the teacher views even
    /// without a cache snapshot.
    pub async fn load_full_roster(&mut self) {
        match self.durable.all().await {
            Ok(records) => self.roster.merge(records),
            Err(err) => {
                warn!(%err, "durable roster read failed, showing cached entries only");
            }
        }
    }

    /// Merges two candidate records by recency. On an exact timestamp tie
    /// the durable copy wins; the rule is arbitrary but must be
    /// deterministic, so it is fixed here rather than left to store order.
    fn reconcile(
        from_durable: Option<StudentRecord>,
        from_cache: Option<StudentRecord>,
        user: &SessionUser,
    ) -> StudentRecord {
        match (from_durable, from_cache) {
            (Some(d), Some(c)) => {
                if d.last_updated >= c.last_updated {
                    d
                } else {
                    c
                }
            }
            (Some(d), None) => d,
            (None, Some(c)) => c,
            (None, None) => crate::catalog::seed_record_by_name(&user.name)
                .unwrap_or_else(|| StudentRecord::fresh(&user.id, &user.name, user.grade)),
        }
    }

    /// Loads the authoritative record for a student session and makes it
    /// the active one. Always yields a usable record: store read failures
    /// degrade to the remaining source or to seed construction.
    pub async fn start_session(&mut self, user: &SessionUser) -> &StudentRecord {
        let from_durable = match self.durable.get(&user.id).await {
            Ok(found) => found,
            Err(err) => {
                warn!(student_id = %user.id, %err, "durable store read failed, treating as absent");
                None
            }
        };
        let from_cache = self.cache.student_record(&user.id);

        let record = Self::reconcile(from_durable, from_cache, user);
        if record.id != user.id {
            // Adopted a seed-roster record under its own id; point the
            // stored session at it so the next command reconciles against
            // the same row instead of re-seeding.
            let adopted = SessionUser {
                id: record.id.clone(),
                ..user.clone()
            };
            if let Err(err) = self.cache.set_session_user(&adopted) {
                warn!(student_id = %record.id, %err, "session id update failed");
            }
        }
        self.write_through(&record).await;
        self.active.insert(record)
    }

    /// Durable store unconditionally; cache store only while online. A
    /// failed write is logged and tolerated: the next reconciliation picks
    /// the freshest surviving copy by timestamp.
    async fn write_through(&mut self, record: &StudentRecord) {
        if let Err(err) = self.durable.put(record).await {
            warn!(student_id = %record.id, %err, "durable store write failed");
        }
        if self.connectivity.is_online() {
            if let Err(err) = self.cache.set_student_record(record) {
                warn!(student_id = %record.id, %err, "cache store write failed");
            }
        }
    }

    /// Shared tail of every accepted mutation: persist the record and
    /// refresh this student's roster entry.
    async fn commit_active(&mut self) {
        let Some(record) = self.active.clone() else {
            return;
        };
        self.write_through(&record).await;
        self.roster.upsert(record);
        if self.connectivity.is_online() {
            if let Err(err) = self.cache.set_roster_snapshot(self.roster.students()) {
                warn!(%err, "roster snapshot write failed");
            }
        }
    }

    /// Records a completed content item for the active student. Idempotent:
    /// a repeat completion leaves the record byte-for-byte unchanged.
    pub async fn complete_content(
        &mut self,
        subject_id: &str,
        content_id: &str,
        completion: Completion,
    ) -> anyhow::Result<CompletionResult> {
        if let Some(score) = completion.score() {
            anyhow::ensure!(score >= 0, "score cannot be negative");
        }
        let record = self
            .active
            .as_mut()
            .context("no active student session")?;

        if record
            .progress
            .get(subject_id)
            .is_some_and(|p| p.is_completed(content_id))
        {
            return Ok(CompletionResult::AlreadyCompleted);
        }

        let coins_earned = completion.coins_earned();
        // Floor of 1 covers subjects missing from the catalog and subjects
        // with no content yet.
        let total = self.catalog.total_content_count(subject_id).max(1);

        let progress = record.progress.entry(subject_id.to_string()).or_default();
        progress.completed_content.push(content_id.to_string());
        if let Some(score) = completion.score() {
            progress.quiz_scores.insert(content_id.to_string(), score);
        }
        let percentage =
            (progress.completed_content.len() as f64 / total as f64 * 100.0).round();
        progress.completion_percentage = percentage.min(100.0) as u8;
        let completion_percentage = progress.completion_percentage;

        record.coins += coins_earned;
        record.touch();

        self.commit_active().await;
        Ok(CompletionResult::Completed {
            coins_earned,
            completion_percentage,
        })
    }

    /// Grants coins outside of any content completion. Progress is
    /// untouched; the stamp still advances.
    pub async fn add_coins(&mut self, amount: i64) -> anyhow::Result<i64> {
        anyhow::ensure!(amount >= 0, "coin amount cannot be negative");
        let record = self
            .active
            .as_mut()
            .context("no active student session")?;
        record.coins += amount;
        record.touch();
        let total = record.coins;

        self.commit_active().await;
        Ok(total)
    }

    /// Flips the connectivity flag. The offline-to-online edge triggers a
    /// one-shot sync: the durable copy of the active student overwrites the
    /// cache copy, the durable store being the stronger source of truth
    /// once connectivity resumes.
    pub async fn set_online(&mut self, online: bool) {
        if self.connectivity.set_online(online) != Transition::CameOnline {
            return;
        }
        let Some(active_id) = self.active.as_ref().map(|r| r.id.clone()) else {
            return;
        };
        match self.durable.get(&active_id).await {
            Ok(Some(record)) => {
                if let Err(err) = self.cache.set_student_record(&record) {
                    warn!(student_id = %active_id, %err, "post-reconnect cache sync failed");
                } else {
                    info!(student_id = %active_id, "came online: synced durable record to cache");
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(student_id = %active_id, %err, "post-reconnect durable read failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::standard_catalog;
    use crate::models::Role;

    fn student_user(id: &str, name: &str) -> SessionUser {
        SessionUser {
            id: id.to_string(),
            name: name.to_string(),
            role: Role::Student,
            grade: Some(7),
        }
    }

    async fn tracker(online: bool) -> (tempfile::TempDir, ProgressTracker) {
        let dir = tempfile::tempdir().unwrap();
        let durable = DurableStore::in_memory().await.unwrap();
        let cache = CacheStore::open(&dir.path().join("cache.json"));
        let tracker = ProgressTracker::new(
            durable,
            cache,
            standard_catalog(),
            Connectivity::new(online),
        );
        (dir, tracker)
    }

    #[tokio::test]
    async fn new_student_gets_zeroed_seed_record() {
        let (_dir, mut tracker) = tracker(true).await;
        let record = tracker.start_session(&student_user("u9", "Priya")).await;
        assert_eq!(record.coins, 0);
        assert!(record.badges.is_empty());
        assert_eq!(record.grade, 7);
        assert!(record.progress.is_empty());
    }

    #[tokio::test]
    async fn seed_defaults_apply_without_a_grade() {
        let (_dir, mut tracker) = tracker(true).await;
        let user = SessionUser {
            id: "u9".to_string(),
            name: "Ravi".to_string(),
            role: Role::Student,
            grade: None,
        };
        let record = tracker.start_session(&user).await;
        assert_eq!(record.grade, 6);
        assert_eq!(record.level, crate::models::Level::Bronze);
        assert_eq!(record.coins, 0);
    }

    #[tokio::test]
    async fn seed_roster_name_match_is_case_insensitive() {
        let (_dir, mut tracker) = tracker(true).await;
        let record = tracker.start_session(&student_user("u1", "alice")).await;
        assert_eq!(record.coins, 1250);
        assert_eq!(record.id, "s1");
    }

    #[tokio::test]
    async fn seed_student_progress_survives_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let durable = DurableStore::in_memory().await.unwrap();
        let cache_path = dir.path().join("cache.json");

        let mut first = ProgressTracker::new(
            durable.clone(),
            CacheStore::open(&cache_path),
            standard_catalog(),
            Connectivity::new(true),
        );
        first.start_session(&student_user("login-uuid", "Alice")).await;
        first
            .complete_content("math", "m1l1", Completion::Lecture)
            .await
            .unwrap();
        let coins_after = first.active().unwrap().coins;
        drop(first);

        // A later command loads the stored session, which now points at
        // the adopted seed record, and must find the same row.
        let mut cache = CacheStore::open(&cache_path);
        let stored = cache.session_user().unwrap();
        assert_eq!(stored.id, "s1");
        assert_eq!(stored.name, "Alice");

        let mut second = ProgressTracker::new(
            durable,
            cache,
            standard_catalog(),
            Connectivity::new(true),
        );
        second.start_session(&stored).await;
        assert_eq!(second.active().unwrap().coins, coins_after);
        let result = second
            .complete_content("math", "m1l1", Completion::Lecture)
            .await
            .unwrap();
        assert_eq!(result, CompletionResult::AlreadyCompleted);
    }

    #[tokio::test]
    async fn full_roster_includes_durable_only_records() {
        let (_dir, mut tracker) = tracker(true).await;
        let mut imported = StudentRecord::fresh("imp1", "Meera", Some(9));
        imported.coins = 9000;
        tracker.durable.put(&imported).await.unwrap();

        tracker.load_full_roster().await;
        let board = tracker.leaderboard();
        assert_eq!(board[0].name, "Meera");
        assert_eq!(board[0].coins, 9000);
        // Seed roster entries remain behind the imported leader.
        assert_eq!(board.len(), 5);
    }

    #[tokio::test]
    async fn negative_awards_are_rejected() {
        let (_dir, mut tracker) = tracker(true).await;
        tracker.start_session(&student_user("u1", "Priya")).await;

        assert!(tracker.add_coins(-5).await.is_err());
        assert!(tracker
            .complete_content("math", "m1q1", Completion::Quiz { score: Some(-10) })
            .await
            .is_err());

        let record = tracker.active().unwrap();
        assert_eq!(record.coins, 0);
        assert!(record.progress.is_empty());
    }

    #[tokio::test]
    async fn reconcile_picks_larger_timestamp_regardless_of_source() {
        let user = student_user("u1", "Priya");
        let mut older = StudentRecord::fresh("u1", "Priya", None);
        older.last_updated = 100;
        let mut newer = older.clone();
        newer.coins = 42;
        newer.last_updated = 200;

        let a = ProgressTracker::reconcile(Some(older.clone()), Some(newer.clone()), &user);
        let b = ProgressTracker::reconcile(Some(newer.clone()), Some(older.clone()), &user);
        assert_eq!(a.coins, 42);
        assert_eq!(b.coins, 42);
    }

    #[tokio::test]
    async fn timestamp_tie_always_prefers_durable() {
        let user = student_user("u1", "Priya");
        let mut durable_copy = StudentRecord::fresh("u1", "Priya", None);
        durable_copy.coins = 10;
        durable_copy.last_updated = 5;
        let mut cache_copy = durable_copy.clone();
        cache_copy.coins = 20;

        for _ in 0..10 {
            let winner = ProgressTracker::reconcile(
                Some(durable_copy.clone()),
                Some(cache_copy.clone()),
                &user,
            );
            assert_eq!(winner.coins, 10);
        }
    }

    #[tokio::test]
    async fn single_surviving_copy_wins() {
        let user = student_user("u1", "Priya");
        let mut record = StudentRecord::fresh("u1", "Priya", None);
        record.coins = 7;

        let from_cache_only = ProgressTracker::reconcile(None, Some(record.clone()), &user);
        assert_eq!(from_cache_only.coins, 7);
        let from_durable_only = ProgressTracker::reconcile(Some(record), None, &user);
        assert_eq!(from_durable_only.coins, 7);
    }

    #[tokio::test]
    async fn quiz_completion_awards_base_plus_score() {
        let (_dir, mut tracker) = tracker(true).await;
        tracker.start_session(&student_user("u1", "Priya")).await;

        let result = tracker
            .complete_content("math", "m1q1", Completion::Quiz { score: Some(80) })
            .await
            .unwrap();
        assert!(matches!(
            result,
            CompletionResult::Completed { coins_earned: 130, .. }
        ));

        let record = tracker.active().unwrap();
        assert_eq!(record.coins, 130);
        let progress = &record.progress["math"];
        assert_eq!(progress.quiz_scores["m1q1"], 80);
        assert_eq!(
            progress
                .completed_content
                .iter()
                .filter(|c| *c == "m1q1")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn recompletion_is_a_full_noop() {
        let (_dir, mut tracker) = tracker(true).await;
        tracker.start_session(&student_user("u1", "Priya")).await;
        tracker
            .complete_content("math", "m1l1", Completion::Lecture)
            .await
            .unwrap();
        let before = tracker.active().unwrap().clone();

        let result = tracker
            .complete_content("math", "m1l1", Completion::Lecture)
            .await
            .unwrap();
        assert_eq!(result, CompletionResult::AlreadyCompleted);
        assert_eq!(tracker.active().unwrap(), &before);
    }

    #[tokio::test]
    async fn completing_every_item_reaches_100_percent() {
        let (_dir, mut tracker) = tracker(true).await;
        tracker.start_session(&student_user("u1", "Priya")).await;

        // "social" has exactly four content items.
        for (id, completion) in [
            ("ss1l1", Completion::Lecture),
            ("ss1p1", Completion::Pdf),
            ("ss2l1", Completion::Lecture),
            ("ss2q1", Completion::Quiz { score: Some(100) }),
        ] {
            tracker
                .complete_content("social", id, completion)
                .await
                .unwrap();
        }

        let progress = &tracker.active().unwrap().progress["social"];
        assert_eq!(progress.completion_percentage, 100);
    }

    #[tokio::test]
    async fn unknown_subject_floors_total_at_one() {
        let (_dir, mut tracker) = tracker(true).await;
        tracker.start_session(&student_user("u1", "Priya")).await;
        tracker
            .complete_content("history", "h1l1", Completion::Lecture)
            .await
            .unwrap();
        let progress = &tracker.active().unwrap().progress["history"];
        assert_eq!(progress.completion_percentage, 100);
    }

    #[tokio::test]
    async fn add_coins_increments_exactly_and_advances_stamp() {
        let (_dir, mut tracker) = tracker(true).await;
        tracker.start_session(&student_user("u1", "Priya")).await;
        let before = tracker.active().unwrap().last_updated;

        let total = tracker.add_coins(35).await.unwrap();
        assert_eq!(total, 35);
        let record = tracker.active().unwrap();
        assert_eq!(record.coins, 35);
        assert!(record.last_updated > before);
        assert!(record.progress.is_empty());
    }

    #[tokio::test]
    async fn offline_mutation_lands_in_durable_but_not_cache() {
        let (_dir, mut tracker) = tracker(false).await;
        tracker.start_session(&student_user("u1", "Priya")).await;
        tracker.add_coins(10).await.unwrap();

        let in_durable = tracker.durable.get("u1").await.unwrap().unwrap();
        assert_eq!(in_durable.coins, 10);
        assert!(tracker.cache.student_record("u1").is_none());
    }

    #[tokio::test]
    async fn coming_online_syncs_durable_copy_into_cache() {
        let (_dir, mut tracker) = tracker(false).await;
        tracker.start_session(&student_user("u1", "Priya")).await;
        tracker.add_coins(10).await.unwrap();

        tracker.set_online(true).await;
        let cached = tracker.cache.student_record("u1").unwrap();
        assert_eq!(cached.coins, 10);
    }

    #[tokio::test]
    async fn session_start_writes_chosen_record_through() {
        let (_dir, mut tracker) = tracker(true).await;
        let mut record = StudentRecord::fresh("u1", "Priya", None);
        record.coins = 64;
        tracker.cache.set_student_record(&record).unwrap();

        tracker.start_session(&student_user("u1", "Priya")).await;
        let in_durable = tracker.durable.get("u1").await.unwrap().unwrap();
        assert_eq!(in_durable.coins, 64);
    }

    #[tokio::test]
    async fn mutations_update_the_roster_entry() {
        let (_dir, mut tracker) = tracker(true).await;
        tracker.start_session(&student_user("u1", "Priya")).await;
        tracker.add_coins(5000).await.unwrap();

        let board = tracker.leaderboard();
        assert_eq!(board[0].id, "u1");
        assert_eq!(board[0].coins, 5000);
        // Seed roster entries are still present behind the new leader.
        assert_eq!(board.len(), 5);
    }
}
