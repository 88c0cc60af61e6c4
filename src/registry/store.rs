use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Days, NaiveDate, Timelike as _};
use chrono_tz::Tz;
use itertools::Itertools as _;
use serde::Serialize;

use crate::phone::PhoneAnalysis;
use crate::types::{HistoryEntry, PhoneRecord, UserProfile, UserRecord, local_date};

const RATE_WINDOW: i64 = 60;
const DAILY_KEEP_DAYS: u64 = 30;
const BASE_POINTS: u64 = 10;
const NEW_DAY_BONUS: u64 = 5;
const MAX_STREAK_BONUS: u64 = 10;
const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Clone, Debug)]
pub struct RegistryOptions {
    pub max_records: usize,
    pub max_users: usize,
    pub retention_days: u64,
    pub history_size: usize,
    pub rate_limit: usize,
    pub timezone: Tz,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            max_records: 10000,
            max_users: 5000,
            retention_days: 30,
            history_size: 20,
            rate_limit: 15,
            timezone: chrono_tz::Asia::Kuala_Lumpur,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RegisterOutcome {
    pub is_duplicate: bool,
    pub count: i64,
    pub total_users: usize,
    pub first_seen: i64,
    pub first_user: i64,
    pub first_user_name: String,
    pub current_user_name: String,
}

impl RegisterOutcome {
    fn from_record(record: &PhoneRecord, is_duplicate: bool, current_user_name: String) -> Self {
        Self {
            is_duplicate,
            count: record.count(),
            total_users: record.users().len(),
            first_seen: record.first_seen(),
            first_user: record.first_user(),
            first_user_name: record.first_user_name().to_string(),
            current_user_name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PointsAward {
    pub gained: u64,
    pub bonus: u64,
    pub points: u64,
    pub level: u64,
    pub level_up: bool,
    pub streak: u64,
}

#[derive(Clone, Debug)]
pub struct SubmitEntry {
    pub analysis: PhoneAnalysis,
    pub outcome: RegisterOutcome,
}

#[derive(Clone, Debug, Default)]
pub struct SubmitReport {
    pub entries: Vec<SubmitEntry>,
    pub award: Option<PointsAward>,
    pub evicted: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CleanupReport {
    pub phones_removed: usize,
    pub users_removed: usize,
    pub phones_left: usize,
    pub users_left: usize,
    #[serde(skip)]
    pub removed: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct UserStats {
    pub display_name: String,
    pub first_seen: i64,
    pub last_seen: i64,
    pub query_count: u64,
    pub numbers_found: u64,
    pub queries_today: u64,
    pub points: u64,
    pub level: u64,
    pub streak: u64,
    pub checks_today: u64,
    pub total_checks: u64,
    pub busiest_hour: Option<usize>,
    pub top_carriers: Vec<(String, u64)>,
    pub history: Vec<HistoryEntry>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GlobalStats {
    pub total_queries: u64,
    pub total_numbers: u64,
    pub total_duplicates: u64,
    pub phone_records: usize,
    pub users: usize,
    pub today: u64,
    pub busiest_hour: Option<usize>,
    pub countries: Vec<(String, u64)>,
    pub carriers: Vec<(String, u64)>,
    pub daily: Vec<(NaiveDate, u64)>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SystemStatus {
    pub start_time: i64,
    pub uptime: i64,
    pub message_count: u64,
    pub heartbeat_count: u64,
    pub last_heartbeat: Option<i64>,
    pub cleanup_count: u64,
    pub restart_count: u64,
    pub phone_records: usize,
    pub max_records: usize,
    pub users: usize,
    pub max_users: usize,
}

#[derive(Clone, Debug, Default)]
struct Counters {
    total_queries: u64,
    total_numbers: u64,
    total_duplicates: u64,
    message_count: u64,
    carriers: HashMap<String, u64>,
    countries: HashMap<String, u64>,
    hourly: [u64; 24],
    daily: BTreeMap<NaiveDate, u64>,
}

/// Owner of every phone and user record. Not synchronized; the registry
/// actor is the only caller.
pub struct Registry {
    options: RegistryOptions,
    phones: HashMap<String, PhoneRecord>,
    users: HashMap<i64, UserRecord>,
    rate: HashMap<i64, VecDeque<i64>>,
    counters: Counters,
    start_time: i64,
    heartbeat_count: u64,
    last_heartbeat: Option<i64>,
    cleanup_count: u64,
    restart_count: u64,
}

fn sorted_counts(counts: &HashMap<String, u64>) -> Vec<(String, u64)> {
    counts
        .iter()
        .sorted_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, v)| (k.clone(), *v))
        .collect()
}

fn busiest_hour(hourly: &[u64; 24]) -> Option<usize> {
    hourly
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(hour, _)| hour)
}

/// How many records leave when `len` exceeds `cap`: a fifth of the table,
/// or more if that is still not enough.
fn eviction_size(len: usize, cap: usize) -> usize {
    (len / 5).max(len.saturating_sub(cap))
}

fn award_points(record: &mut UserRecord, today: NaiveDate) -> PointsAward {
    let new_day = record.last_check_day != Some(today);
    if new_day {
        record.streak = if record.last_check_day.and_then(|day| day.succ_opt()) == Some(today) {
            record.streak + 1
        } else {
            1
        };
        record.checks_today = 0;
        record.last_check_day = Some(today);
    }

    let mut bonus = 0;
    if record.streak > 1 {
        bonus += record.streak.min(MAX_STREAK_BONUS);
    }
    if new_day {
        bonus += NEW_DAY_BONUS;
    }

    let gained = BASE_POINTS + bonus;
    record.points += gained;
    record.checks_today += 1;
    record.total_checks += 1;

    let level = record.points / 100 + 1;
    let level_up = level > record.level;
    record.level = level;

    PointsAward {
        gained,
        bonus,
        points: record.points,
        level,
        level_up,
        streak: record.streak,
    }
}

impl Registry {
    pub fn new(options: RegistryOptions, now: i64) -> Self {
        Self {
            options,
            phones: HashMap::new(),
            users: HashMap::new(),
            rate: HashMap::new(),
            counters: Counters::default(),
            start_time: now,
            heartbeat_count: 0,
            last_heartbeat: None,
            cleanup_count: 0,
            restart_count: 0,
        }
    }

    pub fn load(&mut self, records: Vec<PhoneRecord>) {
        self.phones
            .extend(records.into_iter().map(|r| (r.number().to_string(), r)));
    }

    pub fn record(&self, number: &str) -> Option<&PhoneRecord> {
        self.phones.get(number)
    }

    pub fn len(&self) -> usize {
        self.phones.len()
    }

    fn local_hour(&self, now: i64) -> usize {
        DateTime::from_timestamp(now, 0)
            .unwrap_or_default()
            .with_timezone(&self.options.timezone)
            .hour() as usize
    }

    fn user_mut(&mut self, user: &UserProfile, now: i64, today: NaiveDate) -> &mut UserRecord {
        let record = self
            .users
            .entry(user.id())
            .or_insert_with(|| UserRecord::new(user.display_name(), now, today));
        record.display_name = user.display_name();
        record.last_seen = now;
        if record.today != today {
            record.today = today;
            record.queries_today = 0;
        }
        record
    }

    pub fn register(&mut self, number: &str, user: &UserProfile, now: i64) -> RegisterOutcome {
        let current_user_name = user.display_name();
        if let Some(record) = self.phones.get_mut(number) {
            record.sighted(now, user.id());
            return RegisterOutcome::from_record(record, true, current_user_name);
        }
        let record = PhoneRecord::new(number.to_string(), now, user);
        let outcome = RegisterOutcome::from_record(&record, false, current_user_name);
        self.phones.insert(number.to_string(), record);
        outcome
    }

    pub fn submit(
        &mut self,
        user: &UserProfile,
        numbers: Vec<PhoneAnalysis>,
        now: i64,
    ) -> SubmitReport {
        let timezone = self.options.timezone;
        let today = local_date(now, timezone);
        let hour = self.local_hour(now);

        self.counters.message_count += 1;
        self.counters.total_queries += 1;
        self.counters.hourly[hour] += 1;
        *self.counters.daily.entry(today).or_default() += 1;
        if let Some(oldest) = today.checked_sub_days(Days::new(DAILY_KEEP_DAYS)) {
            self.counters.daily.retain(|day, _| *day > oldest);
        }

        let mut entries = Vec::with_capacity(numbers.len());
        for analysis in numbers {
            let outcome = self.register(analysis.normalized(), user, now);
            if outcome.is_duplicate {
                self.counters.total_duplicates += 1;
            }
            self.counters.total_numbers += 1;
            *self
                .counters
                .carriers
                .entry(analysis.carrier().unwrap_or(UNKNOWN_LABEL).to_string())
                .or_default() += 1;
            *self
                .counters
                .countries
                .entry(analysis.country().name().to_string())
                .or_default() += 1;
            entries.push(SubmitEntry { analysis, outcome });
        }

        let history_size = self.options.history_size;
        let record = self.user_mut(user, now, today);
        record.query_count += 1;
        record.queries_today += 1;
        record.hourly[hour] += 1;
        for entry in &entries {
            let carrier = entry.analysis.carrier().unwrap_or(UNKNOWN_LABEL);
            record.numbers_found += 1;
            *record.carriers.entry(carrier.to_string()).or_default() += 1;
            record.history.push_back(HistoryEntry {
                number: entry.analysis.normalized().to_string(),
                carrier: carrier.to_string(),
                timestamp: now,
            });
        }
        while record.history.len() > history_size {
            record.history.pop_front();
        }
        let award = (!entries.is_empty()).then(|| award_points(record, today));

        self.evict_users();
        let evicted = self.evict_phones();

        SubmitReport {
            entries,
            award,
            evicted,
        }
    }

    pub fn touch(&mut self, user: &UserProfile, now: i64) {
        let today = local_date(now, self.options.timezone);
        self.counters.message_count += 1;
        self.user_mut(user, now, today);
        self.evict_users();
    }

    /// Sliding window limiter, true when the user may proceed.
    pub fn check_rate(&mut self, user: i64, now: i64) -> bool {
        if self.options.rate_limit == 0 {
            return true;
        }
        let window = self.rate.entry(user).or_default();
        while window.front().is_some_and(|t| *t <= now - RATE_WINDOW) {
            window.pop_front();
        }
        if window.len() >= self.options.rate_limit {
            return false;
        }
        window.push_back(now);
        true
    }

    fn evict_phones(&mut self) -> Vec<String> {
        if self.phones.len() <= self.options.max_records {
            return Vec::new();
        }
        let size = eviction_size(self.phones.len(), self.options.max_records);
        let victims = self
            .phones
            .values()
            .sorted_by(|a, b| {
                a.last_seen()
                    .cmp(&b.last_seen())
                    .then_with(|| a.number().cmp(b.number()))
            })
            .take(size)
            .map(|r| r.number().to_string())
            .collect_vec();
        for key in &victims {
            self.phones.remove(key);
        }
        log::info!(
            "Evicted {} phone records, {} left",
            victims.len(),
            self.phones.len()
        );
        victims
    }

    fn evict_users(&mut self) -> usize {
        if self.users.len() <= self.options.max_users {
            return 0;
        }
        let size = eviction_size(self.users.len(), self.options.max_users);
        let victims = self
            .users
            .iter()
            .sorted_by_key(|(id, r)| (r.last_seen, **id))
            .take(size)
            .map(|(id, _)| *id)
            .collect_vec();
        for id in &victims {
            self.users.remove(id);
            self.rate.remove(id);
        }
        log::info!("Evicted {} user records", victims.len());
        victims.len()
    }

    pub fn cleanup(&mut self, now: i64) -> CleanupReport {
        let cutoff = now - (self.options.retention_days * 86400) as i64;

        let mut removed = self
            .phones
            .values()
            .filter(|r| r.last_seen() < cutoff)
            .map(|r| r.number().to_string())
            .collect_vec();
        for key in &removed {
            self.phones.remove(key);
        }
        let phones_removed = removed.len();

        let before = self.users.len();
        self.users.retain(|_, r| r.last_seen >= cutoff);
        let mut users_removed = before - self.users.len();

        self.rate.retain(|id, window| {
            window.back().is_some_and(|t| *t > now - RATE_WINDOW) && self.users.contains_key(id)
        });

        users_removed += self.evict_users();
        let evicted = self.evict_phones();
        let phones_removed = phones_removed + evicted.len();
        removed.extend(evicted);

        self.cleanup_count += 1;
        CleanupReport {
            phones_removed,
            users_removed,
            phones_left: self.phones.len(),
            users_left: self.users.len(),
            removed,
        }
    }

    /// Drop every record and statistic. Uptime, heartbeat, cleanup and
    /// restart counters survive.
    pub fn clear(&mut self) -> usize {
        let removed = self.phones.len();
        self.phones.clear();
        self.users.clear();
        self.rate.clear();
        self.counters = Counters::default();
        removed
    }

    pub fn heartbeat(&mut self, now: i64) -> u64 {
        self.heartbeat_count += 1;
        self.last_heartbeat = Some(now);
        self.heartbeat_count
    }

    pub fn restarted(&mut self) {
        self.restart_count += 1;
    }

    pub fn user_stats(&self, user: i64) -> Option<UserStats> {
        let record = self.users.get(&user)?;
        Some(UserStats {
            display_name: record.display_name.clone(),
            first_seen: record.first_seen,
            last_seen: record.last_seen,
            query_count: record.query_count,
            numbers_found: record.numbers_found,
            queries_today: record.queries_today,
            points: record.points,
            level: record.level,
            streak: record.streak,
            checks_today: record.checks_today,
            total_checks: record.total_checks,
            busiest_hour: busiest_hour(&record.hourly),
            top_carriers: sorted_counts(&record.carriers),
            history: record.history.iter().rev().cloned().collect(),
        })
    }

    pub fn global_stats(&self, now: i64) -> GlobalStats {
        let today = local_date(now, self.options.timezone);
        GlobalStats {
            total_queries: self.counters.total_queries,
            total_numbers: self.counters.total_numbers,
            total_duplicates: self.counters.total_duplicates,
            phone_records: self.phones.len(),
            users: self.users.len(),
            today: self.counters.daily.get(&today).copied().unwrap_or_default(),
            busiest_hour: busiest_hour(&self.counters.hourly),
            countries: sorted_counts(&self.counters.countries),
            carriers: sorted_counts(&self.counters.carriers),
            daily: self
                .counters
                .daily
                .iter()
                .rev()
                .map(|(day, count)| (*day, *count))
                .collect(),
        }
    }

    pub fn system_status(&self, now: i64) -> SystemStatus {
        SystemStatus {
            start_time: self.start_time,
            uptime: now - self.start_time,
            message_count: self.counters.message_count,
            heartbeat_count: self.heartbeat_count,
            last_heartbeat: self.last_heartbeat,
            cleanup_count: self.cleanup_count,
            restart_count: self.restart_count,
            phone_records: self.phones.len(),
            max_records: self.options.max_records,
            users: self.users.len(),
            max_users: self.options.max_users,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::phone::{Ruleset, analyze};

    const NOW: i64 = 1_700_000_000;

    fn user(id: i64) -> UserProfile {
        UserProfile::new(id, Some(format!("user{id}")), format!("User Number {id}"))
    }

    fn options(max_records: usize) -> RegistryOptions {
        RegistryOptions {
            max_records,
            ..Default::default()
        }
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = Registry::new(RegistryOptions::default(), NOW);
        let first = registry.register("60123456789", &user(1), NOW);
        assert!(!first.is_duplicate);
        assert_eq!(first.count, 1);

        let second = registry.register("60123456789", &user(2), NOW + 10);
        assert!(second.is_duplicate);
        assert_eq!(second.count, 2);
        assert_eq!(second.total_users, 2);
        assert_eq!(second.first_seen, NOW);
        assert_eq!(second.first_user_name, "@user1 (User Number 1)");
        assert_eq!(second.current_user_name, "@user2 (User Number 2)");

        let third = registry.register("60123456789", &user(1), NOW + 20);
        assert_eq!(third.count, 3);
        assert_eq!(third.total_users, 2);
        assert_eq!(registry.record("60123456789").unwrap().last_seen(), NOW + 20);
    }

    #[test]
    fn test_submit_counts() {
        let mut registry = Registry::new(RegistryOptions::default(), NOW);
        let numbers = vec![
            analyze(Ruleset::International, "13800138000").unwrap(),
            analyze(Ruleset::International, "+44 7911 123456").unwrap(),
        ];
        let report = registry.submit(&user(1), numbers.clone(), NOW);
        assert_eq!(report.entries.len(), 2);
        assert!(report.entries.iter().all(|e| !e.outcome.is_duplicate));
        assert_eq!(report.award.as_ref().unwrap().gained, 15);

        let report = registry.submit(&user(2), numbers, NOW + 1);
        assert!(report.entries.iter().all(|e| e.outcome.is_duplicate));

        let stats = registry.global_stats(NOW + 2);
        assert_eq!(stats.total_queries, 2);
        assert_eq!(stats.total_numbers, 4);
        assert_eq!(stats.total_duplicates, 2);
        assert_eq!(stats.phone_records, 2);
        assert_eq!(stats.countries[0].1, 2);
        assert_eq!(stats.today, 2);

        let mine = registry.user_stats(1).unwrap();
        assert_eq!(mine.numbers_found, 2);
        assert_eq!(mine.history[0].number, "447911123456");
        assert!(registry.user_stats(3).is_none());
    }

    #[test]
    fn test_submit_without_numbers_has_no_award() {
        let mut registry = Registry::new(RegistryOptions::default(), NOW);
        let report = registry.submit(&user(1), vec![], NOW);
        assert!(report.award.is_none());
    }

    #[test]
    fn test_eviction_oldest_fifth() {
        let mut registry = Registry::new(options(10), NOW);
        for i in 0..10 {
            registry.register(&format!("6012345678{i}"), &user(1), NOW + i);
        }
        assert!(registry.evict_phones().is_empty());

        registry.register("60199999999", &user(1), NOW + 100);
        let evicted = registry.evict_phones();
        assert_eq!(evicted, vec!["60123456780", "60123456781"]);
        assert_eq!(registry.len(), 9);
        assert!(registry.record("60199999999").is_some());
    }

    #[test]
    fn test_eviction_through_submit() {
        let mut registry = Registry::new(options(1), NOW);
        registry.submit(
            &user(1),
            vec![analyze(Ruleset::Malaysia, "0123456789").unwrap()],
            NOW,
        );
        let report = registry.submit(
            &user(1),
            vec![analyze(Ruleset::Malaysia, "0133456789").unwrap()],
            NOW + 5,
        );
        assert_eq!(report.evicted, vec!["60123456789"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_user_eviction() {
        let mut registry = Registry::new(
            RegistryOptions {
                max_users: 5,
                ..Default::default()
            },
            NOW,
        );
        for id in 1..=5 {
            registry.touch(&user(id), NOW + id);
            assert!(registry.check_rate(id, NOW + id));
        }
        assert_eq!(registry.evict_users(), 0);

        registry.touch(&user(6), NOW + 10);
        assert_eq!(registry.users.len(), 5);
        assert!(!registry.users.contains_key(&1));
        assert!(!registry.rate.contains_key(&1));
        assert!(registry.users.contains_key(&6));
        assert!(registry.rate.contains_key(&2));

        // Refreshing user 2 makes user 3 the oldest.
        registry.touch(&user(2), NOW + 20);
        registry.touch(&user(7), NOW + 21);
        assert!(registry.users.contains_key(&2));
        assert!(!registry.users.contains_key(&3));
        assert!(registry.user_stats(3).is_none());
    }

    #[test]
    fn test_rate_limit() {
        let mut registry = Registry::new(
            RegistryOptions {
                rate_limit: 2,
                ..Default::default()
            },
            NOW,
        );
        assert!(registry.check_rate(1, NOW));
        assert!(registry.check_rate(1, NOW + 1));
        assert!(!registry.check_rate(1, NOW + 2));
        assert!(registry.check_rate(2, NOW + 2));
        assert!(registry.check_rate(1, NOW + 61));
    }

    #[test]
    fn test_points_and_streak() {
        let day = 86400;
        let mut registry = Registry::new(RegistryOptions::default(), NOW);
        let number = || vec![analyze(Ruleset::International, "13800138000").unwrap()];

        let award = registry.submit(&user(1), number(), NOW).award.unwrap();
        assert_eq!((award.gained, award.streak, award.points), (15, 1, 15));

        let award = registry.submit(&user(1), number(), NOW + 60).award.unwrap();
        assert_eq!((award.gained, award.bonus), (10, 0));

        let award = registry.submit(&user(1), number(), NOW + day).award.unwrap();
        assert_eq!(award.streak, 2);
        assert_eq!(award.gained, 10 + 2 + 5);

        let award = registry.submit(&user(1), number(), NOW + 3 * day).award.unwrap();
        assert_eq!(award.streak, 1);
        assert_eq!(award.points, 15 + 10 + 17 + 15);
        assert_eq!(award.level, 1);
    }

    #[test]
    fn test_level_up() {
        let mut registry = Registry::new(RegistryOptions::default(), NOW);
        let mut last = None;
        for i in 0..10 {
            last = registry
                .submit(
                    &user(1),
                    vec![analyze(Ruleset::International, "13800138000").unwrap()],
                    NOW + i,
                )
                .award;
        }
        let award = last.unwrap();
        assert_eq!(award.points, 105);
        assert_eq!(award.level, 2);
        assert!(award.level_up);
    }

    #[test]
    fn test_cleanup_expired() {
        let mut registry = Registry::new(RegistryOptions::default(), NOW);
        registry.register("8613800138000", &user(1), NOW);
        registry.touch(&user(1), NOW);
        let later = NOW + 31 * 86400;
        registry.register("447911123456", &user(2), later);
        registry.touch(&user(2), later);

        let report = registry.cleanup(later);
        assert_eq!(report.phones_removed, 1);
        assert_eq!(report.users_removed, 1);
        assert_eq!(report.removed, vec!["8613800138000"]);
        assert_eq!(report.phones_left, 1);
        assert_eq!(registry.system_status(later).cleanup_count, 1);
    }

    #[test]
    fn test_clear_keeps_counters() {
        let mut registry = Registry::new(RegistryOptions::default(), NOW);
        registry.heartbeat(NOW + 1);
        registry.restarted();
        registry.submit(
            &user(1),
            vec![analyze(Ruleset::International, "13800138000").unwrap()],
            NOW,
        );
        assert_eq!(registry.clear(), 1);
        let status = registry.system_status(NOW + 10);
        assert_eq!(status.phone_records, 0);
        assert_eq!(status.heartbeat_count, 1);
        assert_eq!(status.restart_count, 1);
        assert_eq!(status.uptime, 10);
        assert_eq!(registry.global_stats(NOW).total_queries, 0);
    }

    #[test]
    fn test_eviction_size() {
        assert_eq!(eviction_size(11, 10), 2);
        assert_eq!(eviction_size(3, 1), 2);
        assert_eq!(eviction_size(100, 50), 50);
    }
}
