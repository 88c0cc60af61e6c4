use std::collections::{BTreeSet, HashMap, VecDeque};

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use itertools::Itertools as _;
use serde::Serialize;
use sqlx::{Row, prelude::FromRow, sqlite::SqliteRow};

pub fn timestamp_to_string(timestamp: i64, timezone: Tz) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|time| {
            time.with_timezone(&timezone)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| timestamp.to_string())
}

pub fn local_date(timestamp: i64, timezone: Tz) -> NaiveDate {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .with_timezone(&timezone)
        .date_naive()
}

pub fn return_tf_emoji(input: bool) -> &'static str {
    if input { "✅" } else { "❌" }
}

/// Who sent an update, as far as the registry cares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    id: i64,
    username: Option<String>,
    full_name: String,
}

impl UserProfile {
    pub fn new(id: i64, username: Option<String>, full_name: String) -> Self {
        Self {
            id,
            username,
            full_name,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn display_name(&self) -> String {
        let full_name = self.full_name.trim();
        match (&self.username, full_name.is_empty()) {
            (Some(username), false) => format!("@{username} ({full_name})"),
            (Some(username), true) => format!("@{username}"),
            (None, false) => full_name.to_string(),
            (None, true) => format!("User {}", self.id),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PhoneRecord {
    number: String,
    first_seen: i64,
    last_seen: i64,
    count: i64,
    first_user: i64,
    first_user_name: String,
    users: BTreeSet<i64>,
}

impl PhoneRecord {
    pub fn new(number: String, now: i64, user: &UserProfile) -> Self {
        Self {
            number,
            first_seen: now,
            last_seen: now,
            count: 1,
            first_user: user.id(),
            first_user_name: user.display_name(),
            users: BTreeSet::from([user.id()]),
        }
    }

    pub fn sighted(&mut self, now: i64, user: i64) {
        self.count += 1;
        self.last_seen = now;
        self.users.insert(user);
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn first_seen(&self) -> i64 {
        self.first_seen
    }

    pub fn last_seen(&self) -> i64 {
        self.last_seen
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn first_user(&self) -> i64 {
        self.first_user
    }

    pub fn first_user_name(&self) -> &str {
        &self.first_user_name
    }

    pub fn users(&self) -> &BTreeSet<i64> {
        &self.users
    }

    pub fn users_to_str(&self) -> String {
        self.users.iter().map(|s| s.to_string()).join(",")
    }
}

impl FromRow<'_, SqliteRow> for PhoneRecord {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let first_user = row.try_get("first_user")?;
        Ok(Self {
            number: row.try_get("number")?,
            first_seen: row.try_get("first_seen")?,
            last_seen: row.try_get("last_seen")?,
            count: row.try_get("count")?,
            first_user,
            first_user_name: row.try_get("first_user_name")?,
            users: {
                let row = row.try_get::<String, _>("users")?;
                row.split(',')
                    .filter(|s| !s.is_empty())
                    .filter_map(|s| {
                        s.parse()
                            .inspect_err(|e| log::warn!("Parse {s:?} failure: {e:?}"))
                            .ok()
                    })
                    .chain(std::iter::once(first_user))
                    .collect()
            },
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HistoryEntry {
    pub number: String,
    pub carrier: String,
    pub timestamp: i64,
}

#[derive(Clone, Debug)]
pub struct UserRecord {
    pub display_name: String,
    pub first_seen: i64,
    pub last_seen: i64,
    pub query_count: u64,
    pub numbers_found: u64,
    pub queries_today: u64,
    pub today: NaiveDate,
    pub hourly: [u64; 24],
    pub carriers: HashMap<String, u64>,
    pub history: VecDeque<HistoryEntry>,
    pub points: u64,
    pub level: u64,
    pub streak: u64,
    pub last_check_day: Option<NaiveDate>,
    pub checks_today: u64,
    pub total_checks: u64,
}

impl UserRecord {
    pub fn new(display_name: String, now: i64, today: NaiveDate) -> Self {
        Self {
            display_name,
            first_seen: now,
            last_seen: now,
            query_count: 0,
            numbers_found: 0,
            queries_today: 0,
            today,
            hourly: [0; 24],
            carriers: HashMap::new(),
            history: VecDeque::new(),
            points: 0,
            level: 1,
            streak: 0,
            last_check_day: None,
            checks_today: 0,
            total_checks: 0,
        }
    }
}

pub fn level_title(level: u64) -> &'static str {
    match level {
        50.. => "Legend 👑",
        20.. => "Master 💎",
        10.. => "Analyst 🏆",
        5.. => "Skilled ⭐",
        _ => "Explorer 🌱",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display_name() {
        let name = |username: Option<&str>, full: &str| {
            UserProfile::new(42, username.map(ToString::to_string), full.to_string()).display_name()
        };
        assert_eq!(name(Some("alice"), "Alice A"), "@alice (Alice A)");
        assert_eq!(name(None, "Alice A"), "Alice A");
        assert_eq!(name(None, " "), "User 42");
    }

    #[test]
    fn test_timestamp() {
        assert_eq!(
            timestamp_to_string(1_700_000_000, chrono_tz::Asia::Kuala_Lumpur),
            "2023-11-15 06:13:20"
        );
        assert_eq!(
            local_date(1_700_000_000, chrono_tz::Asia::Kuala_Lumpur),
            NaiveDate::from_ymd_opt(2023, 11, 15).unwrap()
        );
    }

    #[test]
    fn test_phone_record() {
        let alice = UserProfile::new(1, None, "Alice".into());
        let mut record = PhoneRecord::new("60123456789".into(), 100, &alice);
        record.sighted(200, 2);
        record.sighted(300, 1);
        assert_eq!(record.count(), 3);
        assert_eq!(record.last_seen(), 300);
        assert_eq!(record.users_to_str(), "1,2");
        assert_eq!(record.first_user_name(), "Alice");
    }

    #[test]
    fn test_level_title() {
        assert_eq!(level_title(1), "Explorer 🌱");
        assert_eq!(level_title(12), "Analyst 🏆");
    }
}
