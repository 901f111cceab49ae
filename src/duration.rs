//! Textual durations: `1h30m`, `1.5s`, `250ms`, `10us`, `5ns`.
//!
//! A duration is one or more `<number><unit>` terms. Numbers may carry a
//! decimal fraction; units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`.
//! A bare `0` is accepted as zero.

use std::time::Duration;

const NANOS_PER: [(&str, u128); 7] = [
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 3_600 * 1_000_000_000),
];

pub fn parse(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty duration".into());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.starts_with('-') {
        return Err("negative durations are not supported".into());
    }
    let s = s.strip_prefix('+').unwrap_or(s);

    let mut nanos: u128 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration {input:?}"))?;
        if number_len == 0 {
            return Err(format!("expected a number in duration {input:?}"));
        }
        let (number, tail) = rest.split_at(number_len);

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let per = NANOS_PER
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, n)| *n)
            .ok_or_else(|| format!("unknown unit {unit:?} in duration {input:?}"))?;

        nanos = nanos
            .checked_add(term_nanos(number, per, input)?)
            .ok_or_else(|| format!("duration {input:?} overflows"))?;
        rest = next;
    }

    let secs = u64::try_from(nanos / 1_000_000_000)
        .map_err(|_| format!("duration {input:?} overflows"))?;
    // The remainder is always below one billion.
    Ok(Duration::new(secs, (nanos % 1_000_000_000) as u32))
}

fn term_nanos(number: &str, per: u128, input: &str) -> Result<u128, String> {
    let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(format!("expected a number in duration {input:?}"));
    }
    if frac.contains('.') {
        return Err(format!("malformed number {number:?} in duration {input:?}"));
    }
    let overflow = || format!("duration {input:?} overflows");

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let mut total = whole.checked_mul(per).ok_or_else(overflow)?;

    // Digits beyond nanosecond precision are dropped.
    let frac = &frac[..frac.len().min(18)];
    if !frac.is_empty() {
        let digits: u128 = frac.parse().map_err(|_| overflow())?;
        let scale = 10u128.pow(frac.len() as u32);
        total = total
            .checked_add(digits * per / scale)
            .ok_or_else(overflow)?;
    }
    Ok(total)
}

/// Render `d` with the largest units first, omitting zero terms.
pub fn format(d: Duration) -> String {
    if d.is_zero() {
        return "0s".into();
    }
    let mut nanos = d.as_nanos();
    let mut out = String::new();
    for (unit, per) in [
        ("h", 3_600 * 1_000_000_000u128),
        ("m", 60 * 1_000_000_000),
        ("s", 1_000_000_000),
        ("ms", 1_000_000),
        ("us", 1_000),
        ("ns", 1),
    ] {
        let n = nanos / per;
        if n > 0 {
            out.push_str(&format!("{n}{unit}"));
            nanos %= per;
        }
    }
    out
}
