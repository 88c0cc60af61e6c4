use super::definitions::{
    CHINA_CARRIERS, CHINA_CODE, CHINA_OTHER_CARRIER, COUNTRY_MAP, Country, MALAYSIA_CODE,
    NANP_CARRIER, NANP_CODE,
};
use super::{NumberKind, PhoneAnalysis, digits_only, malaysia};

/// Longest known country code prefix, four digits down to one.
fn split_country_code(digits: &str) -> Option<(&'static Country, &str)> {
    (1..=4).rev().find_map(|n| {
        if digits.len() <= n {
            return None;
        }
        COUNTRY_MAP
            .get(&digits[..n])
            .map(|country| (*country, &digits[n..]))
    })
}

fn infer_country(digits: &str) -> Option<(&'static Country, &str)> {
    let first = digits.chars().next()?;
    if digits.len() == 11 && first == '1' {
        return Some((COUNTRY_MAP[CHINA_CODE], digits));
    }
    if digits.len() == 10 && ('2'..='9').contains(&first) {
        return Some((COUNTRY_MAP[NANP_CODE], digits));
    }
    if digits.len() >= 12 && digits.starts_with(CHINA_CODE) {
        return Some((COUNTRY_MAP[CHINA_CODE], &digits[CHINA_CODE.len()..]));
    }
    if digits.len() >= 11 {
        return split_country_code(digits);
    }
    None
}

fn national_format(country: &Country, national: &str) -> String {
    match (country.code(), national.len()) {
        (CHINA_CODE, 11) => format!("{}-{}-{}", &national[..3], &national[3..7], &national[7..]),
        (NANP_CODE, 10) => format!("({}) {}-{}", &national[..3], &national[3..6], &national[6..]),
        _ => national.to_string(),
    }
}

pub(super) fn analyze(raw: &str) -> Option<PhoneAnalysis> {
    let digits = digits_only(raw);
    if !(7..=15).contains(&digits.len()) {
        return None;
    }

    let (country, national) = if raw.trim_start().starts_with('+') {
        split_country_code(&digits)?
    } else {
        infer_country(&digits)?
    };

    if country.code() == MALAYSIA_CODE {
        let number = malaysia::classify_local(national)?;
        return Some(malaysia::build(raw, national, number));
    }

    let lengths = country.mobile_lengths();
    if lengths.is_empty() {
        if !(6..=12).contains(&national.len()) {
            return None;
        }
    } else if !lengths.contains(&national.len()) {
        return None;
    }

    let (kind, carrier) = match country.code() {
        CHINA_CODE => {
            let carrier = CHINA_CARRIERS
                .iter()
                .find(|(prefix, _)| national.starts_with(prefix))
                .map(|(_, carrier)| *carrier)
                .unwrap_or(CHINA_OTHER_CARRIER);
            let kind = if national.starts_with('1') {
                NumberKind::Mobile
            } else {
                NumberKind::Unknown
            };
            (kind, Some(carrier))
        }
        NANP_CODE => (NumberKind::MobileOrLandline, Some(NANP_CARRIER)),
        _ if country
            .mobile_prefixes()
            .iter()
            .any(|prefix| national.starts_with(prefix)) =>
        {
            (NumberKind::Mobile, None)
        }
        _ => (NumberKind::Unknown, None),
    };

    let formatted = national_format(country, national);
    let display = format!("+{} {formatted}", country.code());
    Some(PhoneAnalysis::new(
        raw, country, national, kind, carrier, None, formatted, display,
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split_prefers_longest() {
        let (country, national) = split_country_code("85291234567").unwrap();
        assert_eq!(country.code(), "852");
        assert_eq!(national, "91234567");
    }

    #[test]
    fn test_infer_china_with_code() {
        let (country, national) = infer_country("8613800138000").unwrap();
        assert_eq!(country.code(), "86");
        assert_eq!(national, "13800138000");
    }

    #[test]
    fn test_unknown_length_country() {
        let analysis = analyze("+39 06 1234 5678").unwrap();
        assert_eq!(analysis.country().name(), "Italy");
        assert_eq!(analysis.kind(), NumberKind::Unknown);
        assert!(analyze("+39 12345").is_none());
    }
}
