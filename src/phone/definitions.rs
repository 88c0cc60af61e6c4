use std::{collections::HashMap, sync::LazyLock};

#[derive(Clone, Copy, Debug)]
pub struct Country {
    code: &'static str,
    name: &'static str,
    flag: &'static str,
    timezone: Option<&'static str>,
    mobile_lengths: &'static [usize],
    mobile_prefixes: &'static [&'static str],
}

impl Country {
    const fn new(
        code: &'static str,
        name: &'static str,
        flag: &'static str,
        timezone: Option<&'static str>,
        mobile_lengths: &'static [usize],
        mobile_prefixes: &'static [&'static str],
    ) -> Self {
        Self {
            code,
            name,
            flag,
            timezone,
            mobile_lengths,
            mobile_prefixes,
        }
    }

    const fn flag_only(code: &'static str, name: &'static str, flag: &'static str) -> Self {
        Self::new(code, name, flag, None, &[], &[])
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn flag(&self) -> &'static str {
        self.flag
    }

    pub fn timezone(&self) -> Option<&'static str> {
        self.timezone
    }

    pub fn mobile_lengths(&self) -> &'static [usize] {
        self.mobile_lengths
    }

    pub fn mobile_prefixes(&self) -> &'static [&'static str] {
        self.mobile_prefixes
    }
}

pub(super) const MALAYSIA_CODE: &str = "60";
pub(super) const CHINA_CODE: &str = "86";
pub(super) const NANP_CODE: &str = "1";

pub(super) const COUNTRIES: &[Country] = &[
    Country::new(
        "86",
        "China",
        "🇨🇳",
        Some("UTC+8"),
        &[11],
        &["13", "14", "15", "16", "17", "18", "19"],
    ),
    Country::new(
        "1",
        "United States/Canada",
        "🇺🇸",
        Some("UTC-5/-8"),
        &[10],
        &["2", "3", "4", "5", "6", "7", "8", "9"],
    ),
    Country::new("44", "United Kingdom", "🇬🇧", Some("UTC+0"), &[10], &["7"]),
    Country::new(
        "81",
        "Japan",
        "🇯🇵",
        Some("UTC+9"),
        &[10],
        &["70", "80", "90"],
    ),
    Country::new(
        "82",
        "South Korea",
        "🇰🇷",
        Some("UTC+9"),
        &[9, 10],
        &["10", "11"],
    ),
    Country::new("33", "France", "🇫🇷", Some("UTC+1"), &[9], &["6", "7"]),
    Country::new(
        "49",
        "Germany",
        "🇩🇪",
        Some("UTC+1"),
        &[10, 11],
        &["15", "16", "17"],
    ),
    Country::new(
        "852",
        "Hong Kong",
        "🇭🇰",
        Some("UTC+8"),
        &[8],
        &["5", "6", "9"],
    ),
    Country::new("886", "Taiwan", "🇹🇼", Some("UTC+8"), &[9], &["9"]),
    Country::new("65", "Singapore", "🇸🇬", Some("UTC+8"), &[8], &["8", "9"]),
    Country::new(
        "91",
        "India",
        "🇮🇳",
        Some("UTC+5:30"),
        &[10],
        &["6", "7", "8", "9"],
    ),
    Country::new("7", "Russia", "🇷🇺", Some("UTC+3/+12"), &[10], &["9"]),
    Country::new("61", "Australia", "🇦🇺", Some("UTC+10"), &[9], &["4"]),
    Country::new("55", "Brazil", "🇧🇷", Some("UTC-3"), &[10, 11], &[]),
    Country::new("60", "Malaysia", "🇲🇾", Some("UTC+8"), &[], &["1"]),
    Country::flag_only("39", "Italy", "🇮🇹"),
    Country::flag_only("34", "Spain", "🇪🇸"),
    Country::flag_only("853", "Macau", "🇲🇴"),
    Country::flag_only("66", "Thailand", "🇹🇭"),
    Country::flag_only("84", "Vietnam", "🇻🇳"),
    Country::flag_only("62", "Indonesia", "🇮🇩"),
    Country::flag_only("63", "Philippines", "🇵🇭"),
    Country::flag_only("92", "Pakistan", "🇵🇰"),
    Country::flag_only("880", "Bangladesh", "🇧🇩"),
    Country::flag_only("94", "Sri Lanka", "🇱🇰"),
    Country::flag_only("95", "Myanmar", "🇲🇲"),
    Country::flag_only("90", "Turkey", "🇹🇷"),
    Country::flag_only("98", "Iran", "🇮🇷"),
    Country::flag_only("966", "Saudi Arabia", "🇸🇦"),
    Country::flag_only("971", "United Arab Emirates", "🇦🇪"),
    Country::flag_only("972", "Israel", "🇮🇱"),
    Country::flag_only("20", "Egypt", "🇪🇬"),
    Country::flag_only("27", "South Africa", "🇿🇦"),
    Country::flag_only("234", "Nigeria", "🇳🇬"),
    Country::flag_only("254", "Kenya", "🇰🇪"),
    Country::flag_only("256", "Uganda", "🇺🇬"),
    Country::flag_only("233", "Ghana", "🇬🇭"),
    Country::flag_only("213", "Algeria", "🇩🇿"),
    Country::flag_only("212", "Morocco", "🇲🇦"),
    Country::flag_only("54", "Argentina", "🇦🇷"),
    Country::flag_only("52", "Mexico", "🇲🇽"),
    Country::flag_only("56", "Chile", "🇨🇱"),
    Country::flag_only("57", "Colombia", "🇨🇴"),
    Country::flag_only("51", "Peru", "🇵🇪"),
    Country::flag_only("64", "New Zealand", "🇳🇿"),
];

pub(super) static COUNTRY_MAP: LazyLock<HashMap<&'static str, &'static Country>> =
    LazyLock::new(|| COUNTRIES.iter().map(|c| (c.code(), c)).collect());

pub(super) const CHINA_MOBILE: &str = "China Mobile";
pub(super) const CHINA_UNICOM: &str = "China Unicom";
pub(super) const CHINA_TELECOM: &str = "China Telecom";
pub(super) const CHINA_OTHER_CARRIER: &str = "Other carrier";
pub(super) const NANP_CARRIER: &str = "North American carrier";
pub(super) const UNKNOWN_CARRIER: &str = "Unknown carrier";

pub(super) const CHINA_CARRIERS: &[(&str, &str)] = &[
    ("130", CHINA_UNICOM),
    ("131", CHINA_UNICOM),
    ("132", CHINA_UNICOM),
    ("145", CHINA_UNICOM),
    ("155", CHINA_UNICOM),
    ("156", CHINA_UNICOM),
    ("175", CHINA_UNICOM),
    ("176", CHINA_UNICOM),
    ("185", CHINA_UNICOM),
    ("186", CHINA_UNICOM),
    ("134", CHINA_MOBILE),
    ("135", CHINA_MOBILE),
    ("136", CHINA_MOBILE),
    ("137", CHINA_MOBILE),
    ("138", CHINA_MOBILE),
    ("139", CHINA_MOBILE),
    ("147", CHINA_MOBILE),
    ("150", CHINA_MOBILE),
    ("151", CHINA_MOBILE),
    ("152", CHINA_MOBILE),
    ("157", CHINA_MOBILE),
    ("158", CHINA_MOBILE),
    ("159", CHINA_MOBILE),
    ("178", CHINA_MOBILE),
    ("182", CHINA_MOBILE),
    ("183", CHINA_MOBILE),
    ("184", CHINA_MOBILE),
    ("187", CHINA_MOBILE),
    ("188", CHINA_MOBILE),
    ("133", CHINA_TELECOM),
    ("149", CHINA_TELECOM),
    ("153", CHINA_TELECOM),
    ("173", CHINA_TELECOM),
    ("177", CHINA_TELECOM),
    ("180", CHINA_TELECOM),
    ("181", CHINA_TELECOM),
    ("189", CHINA_TELECOM),
    ("199", CHINA_TELECOM),
];

pub(super) const MALAYSIA_LANDLINE_CARRIER: &str = "Telekom Malaysia";

/// Keyed by the second and third digit of the trunk form (`012` -> `12`).
pub(super) const MALAYSIA_MOBILE_CARRIERS: &[(&str, &str)] = &[
    ("10", "DiGi"),
    ("11", "DiGi / U Mobile"),
    ("12", "Maxis"),
    ("13", "Celcom"),
    ("14", "Maxis / Celcom / DiGi / Tune Talk"),
    ("15", "Yes / Altel"),
    ("16", "Maxis / DiGi / XOX / redONE"),
    ("17", "Maxis"),
    ("18", "DiGi / U Mobile / XOX / redONE"),
    ("19", "Maxis / Celcom"),
];

/// Area codes without the trunk `0`; longer codes must be matched first.
pub(super) const MALAYSIA_AREA_CODES: &[(&str, &str)] = &[
    ("82", "Sarawak (Kuching)"),
    ("83", "Sarawak (Sri Aman)"),
    ("84", "Sarawak (Sarikei)"),
    ("85", "Sarawak (Miri)"),
    ("86", "Sarawak (Sibu)"),
    ("87", "Sabah (Kota Kinabalu)"),
    ("88", "Sabah (Tawau)"),
    ("89", "Sabah (Lahad Datu)"),
    ("3", "Selangor/Kuala Lumpur/Putrajaya"),
    ("4", "Kedah/Penang"),
    ("5", "Perak"),
    ("6", "Malacca/Negeri Sembilan"),
    ("7", "Johor"),
    ("8", "Sabah"),
    ("9", "Kelantan/Terengganu"),
];
