use chrono::{Local, NaiveDate, NaiveTime};

/// Floating local time: no zone suffix, whole seconds.
pub const FLOATING_LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Today's local date at the given `HH:MM` wall time, e.g.
/// `2026-10-17T18:00:00`. The gateway reads this as local time.
#[must_use]
pub fn iso_today_at(hhmm: &str) -> String {
    iso_on_date_at(Local::now().date_naive(), hhmm)
}

#[must_use]
pub fn iso_on_date_at(date: NaiveDate, hhmm: &str) -> String {
    let (hour, minute) = parse_wall_clock(hhmm);
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time).format(FLOATING_LOCAL_FORMAT).to_string()
}

/// Comma-separated times, keeping only exact `HH:MM` entries.
#[must_use]
pub fn parse_times(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|entry| is_hh_mm(entry))
        .map(ToString::to_string)
        .collect()
}

#[must_use]
pub fn is_hh_mm(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == 5
        && bytes[2] == b':'
        && [0, 1, 3, 4]
            .into_iter()
            .all(|index| bytes[index].is_ascii_digit())
}

// Unparseable parts read as zero; out-of-range parts clamp to the last valid value.
fn parse_wall_clock(raw: &str) -> (u32, u32) {
    let mut parts = raw.trim().splitn(2, ':');
    let mut component = |max: u32| {
        parts
            .next()
            .and_then(|part| part.trim().parse::<u32>().ok())
            .map_or(0, |value| value.min(max))
    };
    let hour = component(23);
    let minute = component(59);
    (hour, minute)
}
