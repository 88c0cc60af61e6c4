//! MarkdownV2 renderers for every reply the bot sends. Dynamic text always
//! goes through [`replace_all`].

use chrono_tz::Tz;
use itertools::Itertools as _;

use super::replace_all;
use crate::{
    phone::{PhoneAnalysis, Ruleset, mask},
    registry::{GlobalStats, PointsAward, SubmitEntry, SubmitReport, SystemStatus, UserStats},
    types::{level_title, return_tf_emoji, timestamp_to_string},
};

pub(super) const TOP_COUNTRIES: usize = 15;
pub(super) const TOP_CARRIERS: usize = 10;

fn field(icon: &str, label: &str, value: impl AsRef<str>) -> String {
    format!("{icon} *{label}:* {}", replace_all(value.as_ref()))
}

fn shown_number(analysis: &PhoneAnalysis, redact: bool) -> String {
    if redact {
        format!("+{}", mask(analysis.normalized()))
    } else {
        analysis.display().to_string()
    }
}

fn format_duration(seconds: i64) -> String {
    let (days, rest) = (seconds / 86400, seconds % 86400);
    let (hours, rest) = (rest / 3600, rest % 3600);
    let minutes = rest / 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m {}s", rest % 60)
    }
}

fn award_lines(award: &PointsAward) -> Vec<String> {
    let mut lines = Vec::with_capacity(3);
    if award.bonus > 0 {
        lines.push(field(
            "⭐",
            "Points",
            format!("+{} (bonus +{})", award.gained, award.bonus),
        ));
    } else {
        lines.push(field("⭐", "Points", format!("+{}", award.gained)));
    }
    lines.push(field(
        "🏆",
        "Level",
        format!("{} | {} points", award.level, award.points),
    ));
    if award.level_up {
        lines.push(format!(
            "🎉 *Level up\\!* You reached level {} \\- {}",
            award.level,
            replace_all(level_title(award.level))
        ));
    }
    lines
}

pub(super) fn welcome(name: &str, ruleset: Ruleset) -> String {
    format!(
        "👋 Welcome, *{}*\\!\n\n\
        Send me any text containing phone numbers and I will tell you the country, \
        carrier and type of each one, and whether somebody has sent it before\\.\n\n\
        Numbering rules: *{}*\n\
        Use /help to list all commands\\.",
        replace_all(name),
        ruleset.name()
    )
}

pub(super) fn help(ruleset: Ruleset) -> String {
    let examples = match ruleset {
        Ruleset::International => "`+86 138 0013 8000`\n`+1 (555) 123-4567`\n`13800138000`",
        Ruleset::Malaysia => "`+60 12-345 6789`\n`012-345 6789`\n`03-1234 5678`",
    };
    format!(
        "*Usage:*\n\
        Send a message containing one or more phone numbers\\.\n\n\
        *Examples:*\n{examples}\n\n\
        *Commands:*\n\
        /start Welcome message\n\
        /help Show this message\n\
        /stats Your statistics and level\n\
        /global Global statistics\n\
        /countries Top {TOP_COUNTRIES} countries\n\
        /carriers Top {TOP_CARRIERS} carriers\n\
        /status System status\n\
        /ping Check the bot is alive\n\
        /cleanup Remove expired records \\(admin\\)\n\
        /clear Remove all records \\(admin\\)"
    )
}

pub(super) fn no_number(ruleset: Ruleset) -> String {
    let hint = match ruleset {
        Ruleset::International => "`+86 138 0013 8000` or `+44 7911 123456`",
        Ruleset::Malaysia => "`012-345 6789` or `+60 3-1234 5678`",
    };
    format!("❌ No valid phone number found\\.\n💡 Try a format like {hint}")
}

pub(super) fn rate_limited() -> &'static str {
    "⏳ You are sending too fast, please wait a minute\\."
}

pub(super) fn retry_later() -> &'static str {
    "⚠️ Something went wrong, please try again later\\."
}

pub(super) fn single(
    entry: &SubmitEntry,
    award: Option<&PointsAward>,
    user: i64,
    redact: bool,
    timezone: Tz,
) -> String {
    let SubmitEntry { analysis, outcome } = entry;
    let mut lines = Vec::new();

    if outcome.is_duplicate {
        lines.push(format!(
            "🚨 *Duplicate number*, seen {} times",
            outcome.count
        ));
    } else {
        lines.push("✅ *New number*, first time seen".to_string());
    }
    lines.push(String::new());
    lines.push(field("📱", "Number", shown_number(analysis, redact)));
    if !redact {
        lines.push(field("☎️", "National format", analysis.national_format()));
        lines.push(field("🌍", "International", analysis.international_format()));
    }
    lines.push(field(
        analysis.kind().icon(),
        "Type",
        analysis.kind().to_string(),
    ));
    lines.push(field("📍", "Location", analysis.location()));
    if let Some(carrier) = analysis.carrier() {
        lines.push(field("📡", "Carrier", carrier));
    }
    if let Some(timezone) = analysis.country().timezone() {
        lines.push(field("🕐", "Timezone", timezone));
    }
    lines.push(String::new());
    lines.push(field("👤", "Current user", &outcome.current_user_name));
    if outcome.first_user != user {
        lines.push(field("👥", "First user", &outcome.first_user_name));
    }
    if outcome.is_duplicate {
        lines.push(field(
            "📅",
            "First seen",
            timestamp_to_string(outcome.first_seen, timezone),
        ));
    }
    lines.push(field("🔢", "Occurrences", outcome.count.to_string()));
    lines.push(field("👥", "Users involved", outcome.total_users.to_string()));

    if let Some(award) = award {
        lines.push(String::new());
        lines.extend(award_lines(award));
    }
    lines.join("\n")
}

pub(super) fn multiple(report: &SubmitReport, redact: bool) -> String {
    let mut lines = vec![format!(
        "🔍 *Found {} numbers*",
        report.entries.len()
    )];
    lines.push(String::new());
    for (index, entry) in report.entries.iter().enumerate() {
        let status = if entry.outcome.is_duplicate {
            format!("🚨 x{}", entry.outcome.count)
        } else {
            "✅ new".to_string()
        };
        lines.push(format!(
            "{}\\. {} {} {} {} {}",
            index + 1,
            replace_all(&shown_number(&entry.analysis, redact)),
            entry.analysis.kind().icon(),
            entry.analysis.country().flag(),
            replace_all(entry.analysis.carrier().unwrap_or("")),
            status
        ));
    }
    let duplicates = report
        .entries
        .iter()
        .filter(|e| e.outcome.is_duplicate)
        .count();
    lines.push(String::new());
    lines.push(field(
        "📊",
        "Summary",
        format!(
            "{} new, {duplicates} duplicate",
            report.entries.len() - duplicates
        ),
    ));
    if let Some(award) = &report.award {
        lines.extend(award_lines(award));
    }
    lines.join("\n")
}

pub(super) fn user_stats(stats: &UserStats, redact: bool, timezone: Tz) -> String {
    let progress = stats.points % 100;
    let mut lines = vec![
        format!("📊 *Statistics for {}*", replace_all(&stats.display_name)),
        String::new(),
        field(
            "🏆",
            "Level",
            format!("{} - {}", stats.level, level_title(stats.level)),
        ),
        field("⭐", "Points", stats.points.to_string()),
        field("📈", "Progress", format!("{progress}/100")),
        field("🔥", "Streak", format!("{} days", stats.streak)),
        String::new(),
        field("🔍", "Queries", stats.query_count.to_string()),
        field("📱", "Numbers found", stats.numbers_found.to_string()),
        field("🗓️", "Queries today", stats.queries_today.to_string()),
        field("✔️", "Checks today", stats.checks_today.to_string()),
        field(
            "📅",
            "First seen",
            timestamp_to_string(stats.first_seen, timezone),
        ),
    ];
    if let Some(hour) = stats.busiest_hour {
        lines.push(field("⏰", "Most active hour", format!("{hour:02}:00")));
    }
    if !stats.top_carriers.is_empty() {
        lines.push(String::new());
        lines.push("📡 *Top carriers:*".to_string());
        for (carrier, count) in stats.top_carriers.iter().take(5) {
            lines.push(format!("• {} \\- {count}", replace_all(carrier)));
        }
    }
    if !stats.history.is_empty() {
        lines.push(String::new());
        lines.push("🕘 *Recent numbers:*".to_string());
        for entry in stats.history.iter().take(5) {
            let number = if redact {
                mask(&entry.number)
            } else {
                entry.number.clone()
            };
            lines.push(format!(
                "• \\+{} {} {}",
                replace_all(&number),
                replace_all(&entry.carrier),
                replace_all(&timestamp_to_string(entry.timestamp, timezone))
            ));
        }
    }
    lines.join("\n")
}

pub(super) fn no_user_stats() -> &'static str {
    "📊 No statistics yet, send me a phone number first\\."
}

pub(super) fn global(stats: &GlobalStats) -> String {
    let rate = if stats.total_numbers > 0 {
        stats.total_duplicates as f64 * 100.0 / stats.total_numbers as f64
    } else {
        0.0
    };
    let mut lines = vec![
        "🌍 *Global statistics*".to_string(),
        String::new(),
        field("🔍", "Total queries", stats.total_queries.to_string()),
        field("📱", "Numbers checked", stats.total_numbers.to_string()),
        field(
            "🚨",
            "Duplicates",
            format!("{} ({rate:.1}%)", stats.total_duplicates),
        ),
        field("🗂️", "Stored numbers", stats.phone_records.to_string()),
        field("👥", "Users", stats.users.to_string()),
        field("🗓️", "Queries today", stats.today.to_string()),
    ];
    if let Some(hour) = stats.busiest_hour {
        lines.push(field("⏰", "Busiest hour", format!("{hour:02}:00")));
    }
    if !stats.daily.is_empty() {
        lines.push(String::new());
        lines.push("📅 *Last 7 days:*".to_string());
        for (day, count) in stats.daily.iter().take(7) {
            lines.push(format!("• {} \\- {count}", replace_all(&day.to_string())));
        }
    }
    lines.join("\n")
}

fn ranking(title: &str, items: &[(String, u64)], limit: usize) -> String {
    if items.is_empty() {
        return format!("{title}\n\nNo data yet\\.");
    }
    let total: u64 = items.iter().map(|(_, count)| count).sum();
    let body = items
        .iter()
        .take(limit)
        .enumerate()
        .map(|(index, (name, count))| {
            format!(
                "{}\\. {} \\- {count} \\({}\\)",
                index + 1,
                replace_all(name),
                replace_all(&format!("{:.1}%", *count as f64 * 100.0 / total as f64))
            )
        })
        .join("\n");
    format!("{title}\n\n{body}")
}

pub(super) fn countries(stats: &GlobalStats) -> String {
    ranking("🌍 *Top countries*", &stats.countries, TOP_COUNTRIES)
}

pub(super) fn carriers(stats: &GlobalStats) -> String {
    ranking("📡 *Top carriers*", &stats.carriers, TOP_CARRIERS)
}

pub(super) fn status(
    status: &SystemStatus,
    ruleset: Ruleset,
    redact: bool,
    timezone: Tz,
) -> String {
    let mut lines = vec![
        "🖥️ *System status*".to_string(),
        String::new(),
        field("🟢", "Version", env!("CARGO_PKG_VERSION")),
        field("📐", "Ruleset", ruleset.name()),
        field("🔒", "Privacy redaction", return_tf_emoji(redact)),
        field(
            "🚀",
            "Started",
            timestamp_to_string(status.start_time, timezone),
        ),
        field("⏱️", "Uptime", format_duration(status.uptime)),
        field("🔁", "Restarts", status.restart_count.to_string()),
        field("💬", "Messages", status.message_count.to_string()),
        field("💓", "Heartbeats", status.heartbeat_count.to_string()),
    ];
    if let Some(last) = status.last_heartbeat {
        lines.push(field(
            "💓",
            "Last heartbeat",
            timestamp_to_string(last, timezone),
        ));
    }
    lines.push(field("🧹", "Cleanups", status.cleanup_count.to_string()));
    lines.push(field(
        "🗂️",
        "Stored numbers",
        format!("{}/{}", status.phone_records, status.max_records),
    ));
    lines.push(field(
        "👥",
        "Users",
        format!("{}/{}", status.users, status.max_users),
    ));
    lines.join("\n")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{phone::analyze, registry::RegisterOutcome};

    fn entry(duplicate: bool) -> SubmitEntry {
        SubmitEntry {
            analysis: analyze(Ruleset::Malaysia, "012-345 6789").unwrap(),
            outcome: RegisterOutcome {
                is_duplicate: duplicate,
                count: if duplicate { 3 } else { 1 },
                total_users: 2,
                first_seen: 1_700_000_000,
                first_user: 1,
                first_user_name: "@first (First)".into(),
                current_user_name: "Second".into(),
            },
        }
    }

    #[test]
    fn test_single_duplicate() {
        let text = single(&entry(true), None, 2, false, chrono_tz::Asia::Kuala_Lumpur);
        assert!(text.starts_with("🚨 *Duplicate number*, seen 3 times"));
        assert!(text.contains("\\+60 12\\-345 6789"));
        assert!(text.contains("*First user:* @first \\(First\\)"));
        assert!(text.contains("*First seen:* 2023\\-11\\-15 06:13:20"));
        assert!(text.contains("*Carrier:* Maxis"));
    }

    #[test]
    fn test_single_redacted() {
        let text = single(&entry(false), None, 1, true, chrono_tz::Asia::Kuala_Lumpur);
        assert!(text.contains("\\+601\\*\\*\\*\\*\\*789"));
        assert!(!text.contains("345"));
        assert!(!text.contains("First user"));
    }

    #[test]
    fn test_multiple() {
        let report = SubmitReport {
            entries: vec![entry(false), entry(true)],
            award: Some(PointsAward {
                gained: 15,
                bonus: 5,
                points: 95,
                level: 1,
                level_up: false,
                streak: 1,
            }),
            ..Default::default()
        };
        let text = multiple(&report, false);
        assert!(text.contains("*Found 2 numbers*"));
        assert!(text.contains("*Summary:* 1 new, 1 duplicate"));
        assert!(text.contains("*Points:* \\+15 \\(bonus \\+5\\)"));
    }

    #[test]
    fn test_ranking() {
        let items = vec![("China".to_string(), 3), ("Malaysia".to_string(), 1)];
        let text = ranking("*Top*", &items, 1);
        assert_eq!(text, "*Top*\n\n1\\. China \\- 3 \\(75\\.0%\\)");
    }

    #[test]
    fn test_duration() {
        assert_eq!(format_duration(59), "0m 59s");
        assert_eq!(format_duration(3 * 86400 + 3600 + 120), "3d 1h 2m");
    }
}
