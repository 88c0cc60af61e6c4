use super::definitions::{
    COUNTRY_MAP, MALAYSIA_AREA_CODES, MALAYSIA_CODE, MALAYSIA_LANDLINE_CARRIER,
    MALAYSIA_MOBILE_CARRIERS, UNKNOWN_CARRIER,
};
use super::{NumberKind, PhoneAnalysis, digits_only};

pub(super) struct LocalNumber {
    pub(super) kind: NumberKind,
    pub(super) carrier: Option<&'static str>,
    pub(super) region: Option<&'static str>,
    pub(super) national_format: String,
    pub(super) display: String,
}

impl LocalNumber {
    fn grouped(
        kind: NumberKind,
        carrier: &'static str,
        region: Option<&'static str>,
        head: &str,
        tail: &str,
    ) -> Self {
        let split = tail.len().saturating_sub(4);
        let (middle, last) = tail.split_at(split);
        Self {
            kind,
            carrier: Some(carrier),
            region,
            national_format: format!("0{head}-{middle} {last}"),
            display: format!("+{MALAYSIA_CODE} {head}-{middle} {last}"),
        }
    }
}

fn lookup(
    table: &'static [(&'static str, &'static str)],
    number: &str,
) -> Option<(&'static str, &'static str)> {
    table
        .iter()
        .find(|(prefix, _)| number.starts_with(prefix))
        .copied()
}

/// Classify the part after the `60` country code.
pub(super) fn classify_local(local: &str) -> Option<LocalNumber> {
    if !(7..=10).contains(&local.len()) || local.starts_with('0') {
        return None;
    }

    if local.starts_with('1') && (9..=10).contains(&local.len()) {
        let carrier = lookup(MALAYSIA_MOBILE_CARRIERS, local)
            .map(|(_, carrier)| carrier)
            .unwrap_or(UNKNOWN_CARRIER);
        let (head, tail) = local.split_at(2);
        return Some(LocalNumber::grouped(
            NumberKind::Mobile,
            carrier,
            None,
            head,
            tail,
        ));
    }

    if !local.starts_with('1') && (8..=9).contains(&local.len()) {
        if let Some((area, region)) = lookup(MALAYSIA_AREA_CODES, local) {
            let (head, tail) = local.split_at(area.len());
            return Some(LocalNumber::grouped(
                NumberKind::Landline,
                MALAYSIA_LANDLINE_CARRIER,
                Some(region),
                head,
                tail,
            ));
        }
    }

    Some(LocalNumber {
        kind: NumberKind::Unknown,
        carrier: Some(UNKNOWN_CARRIER),
        region: None,
        national_format: format!("0{local}"),
        display: format!("+{MALAYSIA_CODE} {local}"),
    })
}

pub(super) fn normalize(digits: &str) -> String {
    if digits.starts_with(MALAYSIA_CODE) {
        digits.to_string()
    } else if let Some(rest) = digits.strip_prefix('0') {
        format!("{MALAYSIA_CODE}{rest}")
    } else {
        format!("{MALAYSIA_CODE}{digits}")
    }
}

pub(super) fn build(original: &str, local: &str, number: LocalNumber) -> PhoneAnalysis {
    PhoneAnalysis::new(
        original,
        COUNTRY_MAP[MALAYSIA_CODE],
        local,
        number.kind,
        number.carrier,
        number.region,
        number.national_format,
        number.display,
    )
}

pub(super) fn analyze(raw: &str) -> Option<PhoneAnalysis> {
    let digits = digits_only(raw);
    if !(7..=12).contains(&digits.len()) {
        return None;
    }
    let normalized = normalize(&digits);
    let local = &normalized[MALAYSIA_CODE.len()..];
    let number = classify_local(local)?;
    Some(build(raw, local, number))
}
