mod definitions;
mod extract;
mod international;
mod malaysia;

use std::collections::HashSet;

use serde::Deserialize;

pub use definitions::Country;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Ruleset {
    #[default]
    International,
    Malaysia,
}

impl Ruleset {
    pub fn name(&self) -> &'static str {
        match self {
            Ruleset::International => "international",
            Ruleset::Malaysia => "malaysia",
        }
    }
}

impl TryFrom<&str> for Ruleset {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "international" | "intl" => Ok(Self::International),
            "malaysia" | "my" => Ok(Self::Malaysia),
            _ => Err("Unknown ruleset"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumberKind {
    Mobile,
    Landline,
    MobileOrLandline,
    Unknown,
}

impl NumberKind {
    pub fn icon(&self) -> &'static str {
        match self {
            NumberKind::Mobile => "📱",
            NumberKind::Landline => "📞",
            NumberKind::MobileOrLandline => "📱📞",
            NumberKind::Unknown => "❓",
        }
    }
}

impl std::fmt::Display for NumberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            NumberKind::Mobile => "Mobile",
            NumberKind::Landline => "Landline",
            NumberKind::MobileOrLandline => "Mobile/Landline",
            NumberKind::Unknown => "Unknown type",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhoneAnalysis {
    original: String,
    normalized: String,
    country: &'static Country,
    national: String,
    carrier: Option<&'static str>,
    region: Option<&'static str>,
    kind: NumberKind,
    national_format: String,
    display: String,
}

impl PartialEq for Country {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for Country {}

impl PhoneAnalysis {
    #[allow(clippy::too_many_arguments)]
    fn new(
        original: &str,
        country: &'static Country,
        national: &str,
        kind: NumberKind,
        carrier: Option<&'static str>,
        region: Option<&'static str>,
        national_format: String,
        display: String,
    ) -> Self {
        Self {
            original: original.trim().to_string(),
            normalized: format!("{}{national}", country.code()),
            country,
            national: national.to_string(),
            carrier,
            region,
            kind,
            national_format,
            display,
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    /// Digit-only key used by the registry, always country code prefixed.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn country(&self) -> &'static Country {
        self.country
    }

    pub fn carrier(&self) -> Option<&'static str> {
        self.carrier
    }

    pub fn region(&self) -> Option<&'static str> {
        self.region
    }

    pub fn kind(&self) -> NumberKind {
        self.kind
    }

    pub fn national_format(&self) -> &str {
        &self.national_format
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn international_format(&self) -> String {
        format!("+{} {}", self.country.code(), self.national)
    }

    pub fn e164(&self) -> String {
        format!("+{}", self.normalized)
    }

    /// Human readable location, region when known, otherwise the carrier.
    pub fn location(&self) -> String {
        match (self.region, self.carrier) {
            (Some(region), _) => format!("{} {region}", self.country.flag()),
            (None, Some(carrier)) => format!(
                "{} {}, {carrier}",
                self.country.flag(),
                self.country.name()
            ),
            (None, None) => format!("{} {}", self.country.flag(), self.country.name()),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Scan {
    valid: Vec<PhoneAnalysis>,
    rejected: Vec<String>,
}

impl Scan {
    pub fn valid(&self) -> &[PhoneAnalysis] {
        &self.valid
    }

    pub fn into_valid(self) -> Vec<PhoneAnalysis> {
        self.valid
    }

    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }
}

pub fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

pub fn analyze(ruleset: Ruleset, raw: &str) -> Option<PhoneAnalysis> {
    match ruleset {
        Ruleset::International => international::analyze(raw),
        Ruleset::Malaysia => malaysia::analyze(raw),
    }
}

pub fn normalize(ruleset: Ruleset, raw: &str) -> Option<String> {
    match ruleset {
        Ruleset::International => {
            international::analyze(raw).map(|analysis| analysis.normalized)
        }
        Ruleset::Malaysia => {
            let digits = digits_only(raw);
            (!digits.is_empty()).then(|| malaysia::normalize(&digits))
        }
    }
}

/// Extract every candidate in `text`, classify it and drop repeats of the
/// same normalized number. Valid numbers keep their order of appearance.
pub fn scan(ruleset: Ruleset, text: &str) -> Scan {
    let candidates = match ruleset {
        Ruleset::International => extract::extract(&extract::INTERNATIONAL_PATTERNS, text),
        Ruleset::Malaysia => extract::extract(&extract::MALAYSIA_PATTERNS, text),
    };

    let mut seen = HashSet::new();
    let mut scan = Scan::default();
    for raw in candidates {
        match analyze(ruleset, raw) {
            Some(analysis) => {
                if seen.insert(analysis.normalized.clone()) {
                    scan.valid.push(analysis);
                }
            }
            None => scan.rejected.push(raw.to_string()),
        }
    }
    scan
}

/// Keep the first and last three digits, hide everything in between.
pub fn mask(number: &str) -> String {
    let digits = digits_only(number);
    let len = digits.len();
    if len <= 6 {
        return "*".repeat(len);
    }
    format!("{}{}{}", &digits[..3], "*".repeat(len - 6), &digits[len - 3..])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_china_mobile() {
        let analysis = analyze(Ruleset::International, "13800138000").unwrap();
        assert_eq!(analysis.country().name(), "China");
        assert_eq!(analysis.carrier(), Some("China Mobile"));
        assert_eq!(analysis.kind(), NumberKind::Mobile);
        assert_eq!(analysis.normalized(), "8613800138000");
        assert_eq!(analysis.national_format(), "138-0013-8000");
        assert_eq!(analysis.e164(), "+8613800138000");
    }

    #[test]
    fn test_china_carriers() {
        let carrier = |s| {
            analyze(Ruleset::International, s)
                .and_then(|a| a.carrier())
                .unwrap()
        };
        assert_eq!(carrier("+86 130 1234 5678"), "China Unicom");
        assert_eq!(carrier("18912345678"), "China Telecom");
        assert_eq!(carrier("16612345678"), "Other carrier");
    }

    #[test]
    fn test_nanp() {
        let analysis = analyze(Ruleset::International, "(555) 123-4567").unwrap();
        assert_eq!(analysis.country().code(), "1");
        assert_eq!(analysis.kind(), NumberKind::MobileOrLandline);
        assert_eq!(analysis.national_format(), "(555) 123-4567");
        assert_eq!(analysis.normalized(), "15551234567");
    }

    #[test]
    fn test_international_prefix() {
        let analysis = analyze(Ruleset::International, "+44 7911 123456").unwrap();
        assert_eq!(analysis.country().name(), "United Kingdom");
        assert_eq!(analysis.kind(), NumberKind::Mobile);

        let analysis = analyze(Ruleset::International, "+852 9123 4567").unwrap();
        assert_eq!(analysis.country().name(), "Hong Kong");

        // Wrong length for a country with known mobile lengths.
        assert!(analyze(Ruleset::International, "+44 7911 12345").is_none());
        // Too short.
        assert!(analyze(Ruleset::International, "12345").is_none());
    }

    #[test]
    fn test_international_delegates_malaysia() {
        let analysis = analyze(Ruleset::International, "+60 12-345 6789").unwrap();
        assert_eq!(analysis.country().name(), "Malaysia");
        assert_eq!(analysis.carrier(), Some("Maxis"));
        assert_eq!(analysis.normalized(), "60123456789");

        let analysis = analyze(Ruleset::International, "60123456789").unwrap();
        assert_eq!(analysis.normalized(), "60123456789");
    }

    #[test]
    fn test_malaysia_normalize() {
        for raw in ["+60 12-345 6789", "012-345 6789", "60123456789", "123456789"] {
            assert_eq!(
                normalize(Ruleset::Malaysia, raw).as_deref(),
                Some("60123456789"),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_malaysia_mobile() {
        let analysis = analyze(Ruleset::Malaysia, "011-2345 6789").unwrap();
        assert_eq!(analysis.kind(), NumberKind::Mobile);
        assert_eq!(analysis.carrier(), Some("DiGi / U Mobile"));
        assert_eq!(analysis.display(), "+60 11-2345 6789");
        assert_eq!(analysis.national_format(), "011-2345 6789");

        let analysis = analyze(Ruleset::Malaysia, "0133456789").unwrap();
        assert_eq!(analysis.carrier(), Some("Celcom"));
        assert_eq!(analysis.display(), "+60 13-345 6789");
    }

    #[test]
    fn test_malaysia_landline() {
        let analysis = analyze(Ruleset::Malaysia, "03-1234 5678").unwrap();
        assert_eq!(analysis.kind(), NumberKind::Landline);
        assert_eq!(analysis.region(), Some("Selangor/Kuala Lumpur/Putrajaya"));
        assert_eq!(analysis.carrier(), Some("Telekom Malaysia"));
        assert_eq!(analysis.display(), "+60 3-1234 5678");
        assert_eq!(analysis.national_format(), "03-1234 5678");

        let analysis = analyze(Ruleset::Malaysia, "082-123 456").unwrap();
        assert_eq!(analysis.region(), Some("Sarawak (Kuching)"));
        assert_eq!(analysis.normalized(), "6082123456");
    }

    #[test]
    fn test_malaysia_fallback() {
        let analysis = analyze(Ruleset::Malaysia, "12345678").unwrap();
        assert_eq!(analysis.kind(), NumberKind::Unknown);
        assert_eq!(analysis.carrier(), Some("Unknown carrier"));
        let short = analyze(Ruleset::Malaysia, "1234567").unwrap();
        assert_eq!(short.kind(), NumberKind::Unknown);
        assert_eq!(short.normalized(), "601234567");
        assert_eq!(
            normalize(Ruleset::Malaysia, "1234567").as_deref(),
            Some(short.normalized())
        );
        assert_eq!(
            analyze(Ruleset::Malaysia, "601234567").unwrap().normalized(),
            "601234567"
        );
        assert!(analyze(Ruleset::Malaysia, "123456").is_none());
        assert!(analyze(Ruleset::Malaysia, "600123456789").is_none());
    }

    #[test]
    fn test_scan_dedup() {
        let scan = scan(
            Ruleset::Malaysia,
            "call +60 12-345 6789 or 012-345 6789, office 03-1234 5678",
        );
        assert_eq!(scan.valid().len(), 2);
        assert_eq!(scan.valid()[0].normalized(), "60123456789");
        assert_eq!(scan.valid()[1].normalized(), "60312345678");
    }

    #[test]
    fn test_scan_international() {
        let scan = scan(
            Ruleset::International,
            "mine is +86 138-0013-8000, hers is (555) 123-4567",
        );
        let numbers = scan
            .valid()
            .iter()
            .map(|a| a.normalized())
            .collect::<Vec<_>>();
        assert_eq!(numbers, vec!["8613800138000", "15551234567"]);
        assert!(scan.rejected().is_empty());
    }

    #[test]
    fn test_scan_nothing() {
        assert!(scan(Ruleset::International, "hello world").is_empty());
        assert!(scan(Ruleset::Malaysia, "no number 42 here").is_empty());
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("60123456789"), "601*****789");
        assert_eq!(mask("+60 12-345 6789"), "601*****789");
        assert_eq!(mask("12345"), "*****");
    }

    #[test]
    fn test_ruleset_parse() {
        assert_eq!(Ruleset::try_from("my"), Ok(Ruleset::Malaysia));
        assert!(Ruleset::try_from("mars").is_err());
    }
}
