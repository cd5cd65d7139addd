use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// How much of the instant the raw text actually specified.
/// Drives the canonical string form: day precision renders as a bare
/// date, second precision as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Day,
    Second,
}

/// A timestamp normalized to UTC, plus the precision it was parsed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedInstant {
    pub instant: DateTime<Utc>,
    pub precision: Precision,
}

impl NormalizedInstant {
    fn second(instant: DateTime<Utc>) -> Self {
        Self {
            instant,
            precision: Precision::Second,
        }
    }

    fn day(date: NaiveDate) -> Self {
        Self {
            instant: Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)),
            precision: Precision::Day,
        }
    }

    /// Canonical string form: `YYYY-MM-DD` at day precision, RFC 3339
    /// with a `Z` suffix at second precision.
    pub fn to_iso_string(&self) -> String {
        match self.precision {
            Precision::Day => self.instant.format("%Y-%m-%d").to_string(),
            Precision::Second => self.instant.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

impl Serialize for NormalizedInstant {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso_string())
    }
}

/// Why a raw time failed to normalize. Callers see one outcome; the
/// reason exists for diagnostics and tests.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unparseable {
    #[error("empty time input")]
    EmptyInput,

    #[error("unrecognized time format")]
    UnrecognizedFormat,

    #[error("relative phrase with invalid magnitude")]
    InvalidRelativeMagnitude,
}

/// Raw time value as it arrives from a page or API: scraped text, or
/// epoch seconds from a platform API.
#[derive(Debug, Clone, Copy)]
pub enum RawTime<'a> {
    Text(&'a str),
    Epoch(i64),
}

/// Convert epoch seconds to a normalized instant. Independent of any
/// reference time; fails only outside chrono's representable range.
pub fn normalize_epoch(secs: i64) -> Result<NormalizedInstant, Unparseable> {
    DateTime::from_timestamp(secs, 0)
        .map(NormalizedInstant::second)
        .ok_or(Unparseable::UnrecognizedFormat)
}

/// One relative-phrase unit: substring gates, a magnitude pattern, and
/// the fixed day width it converts to.
struct RelativeUnit {
    needles: &'static [&'static str],
    magnitude: Regex,
    days_per_unit: i64,
}

struct RelativeLabels {
    today: &'static str,
    yesterday: &'static str,
    day_suffix: &'static str,
    week_suffix: &'static str,
    month_suffix: &'static str,
    year_suffix: &'static str,
}

/// Relative-phrase vocabulary for one locale. The phrase tables are
/// data; adding a locale means adding a table, not new control flow.
pub struct Vocabulary {
    now_phrases: &'static [&'static str],
    yesterday_phrases: &'static [&'static str],
    units: Vec<RelativeUnit>,
    labels: RelativeLabels,
}

static CHINESE: Lazy<Vocabulary> = Lazy::new(|| Vocabulary {
    now_phrases: &["刚刚", "今天"],
    yesterday_phrases: &["昨天"],
    units: vec![
        RelativeUnit {
            needles: &["天前"],
            magnitude: Regex::new(r"(\d+)\s*天前").unwrap(),
            days_per_unit: 1,
        },
        RelativeUnit {
            needles: &["周前"],
            magnitude: Regex::new(r"(\d+)\s*周前").unwrap(),
            days_per_unit: 7,
        },
        RelativeUnit {
            needles: &["月前"],
            magnitude: Regex::new(r"(\d+)\s*个?月前").unwrap(),
            days_per_unit: 30,
        },
        RelativeUnit {
            needles: &["年前"],
            magnitude: Regex::new(r"(\d+)\s*年前").unwrap(),
            days_per_unit: 365,
        },
    ],
    labels: RelativeLabels {
        today: "今天",
        yesterday: "昨天",
        day_suffix: "天前",
        week_suffix: "周前",
        month_suffix: "个月前",
        year_suffix: "年前",
    },
});

static ENGLISH: Lazy<Vocabulary> = Lazy::new(|| Vocabulary {
    now_phrases: &["just now", "today"],
    yesterday_phrases: &["yesterday"],
    units: vec![
        RelativeUnit {
            // Gate on the full "N day(s) ago" shape; a bare "day" would
            // also hit weekday names in feed-style timestamps
            needles: &["days ago", "day ago"],
            magnitude: Regex::new(r"(?i)(\d+)\s*days?\s+ago").unwrap(),
            days_per_unit: 1,
        },
        RelativeUnit {
            needles: &["weeks ago", "week ago"],
            magnitude: Regex::new(r"(?i)(\d+)\s*weeks?\s+ago").unwrap(),
            days_per_unit: 7,
        },
        RelativeUnit {
            needles: &["months ago", "month ago"],
            magnitude: Regex::new(r"(?i)(\d+)\s*months?\s+ago").unwrap(),
            days_per_unit: 30,
        },
        RelativeUnit {
            needles: &["years ago", "year ago"],
            magnitude: Regex::new(r"(?i)(\d+)\s*years?\s+ago").unwrap(),
            days_per_unit: 365,
        },
    ],
    labels: RelativeLabels {
        today: "today",
        yesterday: "yesterday",
        day_suffix: " days ago",
        week_suffix: " weeks ago",
        month_suffix: " months ago",
        year_suffix: " years ago",
    },
});

impl Vocabulary {
    /// Vocabulary for Chinese platform pages (今天/昨天/N天前/N个月前...).
    pub fn chinese() -> &'static Vocabulary {
        &CHINESE
    }

    /// Vocabulary for English pages (today/yesterday/N days ago...).
    pub fn english() -> &'static Vocabulary {
        &ENGLISH
    }

    /// Normalize a raw time value against the reference instant `now`.
    ///
    /// Precedence: relative phrases from this vocabulary first, then the
    /// ordered absolute-format battery, then `Unparseable`. Relative
    /// results are a function of `now`; absolute and epoch results are
    /// not. Pure: no I/O, no global state, never panics.
    pub fn normalize(
        &self,
        raw: Option<RawTime<'_>>,
        now: DateTime<Utc>,
    ) -> Result<NormalizedInstant, Unparseable> {
        match raw {
            None => Err(Unparseable::EmptyInput),
            Some(RawTime::Epoch(secs)) => normalize_epoch(secs),
            Some(RawTime::Text(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(Unparseable::EmptyInput);
                }
                if let Some(relative) = self.match_relative(text, now) {
                    return relative;
                }
                parse_absolute(text, now).ok_or(Unparseable::UnrecognizedFormat)
            }
        }
    }

    /// Normalize scraped text. See [`Vocabulary::normalize`].
    pub fn normalize_str(
        &self,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<NormalizedInstant, Unparseable> {
        self.normalize(Some(RawTime::Text(text)), now)
    }

    /// Normalize optional scraped text; `None` is `EmptyInput`.
    pub fn normalize_opt(
        &self,
        text: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<NormalizedInstant, Unparseable> {
        self.normalize(text.map(RawTime::Text), now)
    }

    /// Check the text against the relative-phrase tables. `None` means
    /// no phrase matched and the absolute battery should run. A matched
    /// phrase with a bad magnitude is an error here and does not fall
    /// through.
    fn match_relative(
        &self,
        text: &str,
        now: DateTime<Utc>,
    ) -> Option<Result<NormalizedInstant, Unparseable>> {
        let haystack = text.to_lowercase();

        if self.now_phrases.iter().any(|p| haystack.contains(p)) {
            return Some(Ok(NormalizedInstant::second(now)));
        }

        if self.yesterday_phrases.iter().any(|p| haystack.contains(p)) {
            return Some(shift_back(now, 1));
        }

        for unit in &self.units {
            if !unit.needles.iter().any(|n| haystack.contains(n)) {
                continue;
            }
            let magnitude = match unit.magnitude.captures(text) {
                Some(captures) => captures[1].parse::<i64>().ok(),
                None => None,
            };
            return Some(match magnitude {
                Some(n) => match n.checked_mul(unit.days_per_unit) {
                    Some(days) => shift_back(now, days),
                    None => Err(Unparseable::InvalidRelativeMagnitude),
                },
                None => Err(Unparseable::InvalidRelativeMagnitude),
            });
        }

        None
    }

    /// Render the elapsed time between `instant` and `now` as a relative
    /// label. Buckets over whole elapsed days: 0 today, 1 yesterday,
    /// 2-6 days, 7-29 weeks (/7), 30-364 months (/30), 365+ years
    /// (/365). Same fixed 30/365-day widths as the phrase rules. Future
    /// instants clamp to today. Never fails.
    pub fn format_relative(&self, instant: DateTime<Utc>, now: DateTime<Utc>) -> String {
        let days = (now - instant).num_days().max(0);
        if days == 0 {
            self.labels.today.to_string()
        } else if days == 1 {
            self.labels.yesterday.to_string()
        } else if days < 7 {
            format!("{}{}", days, self.labels.day_suffix)
        } else if days < 30 {
            format!("{}{}", days / 7, self.labels.week_suffix)
        } else if days < 365 {
            format!("{}{}", days / 30, self.labels.month_suffix)
        } else {
            format!("{}{}", days / 365, self.labels.year_suffix)
        }
    }
}

fn shift_back(now: DateTime<Utc>, days: i64) -> Result<NormalizedInstant, Unparseable> {
    Duration::try_days(days)
        .and_then(|delta| now.checked_sub_signed(delta))
        .map(NormalizedInstant::second)
        .ok_or(Unparseable::InvalidRelativeMagnitude)
}

type AbsoluteParser = fn(&str, DateTime<Utc>) -> Option<NormalizedInstant>;

// Ordered battery; first success wins. Feed style before ISO before
// plain dates before the CJK textual form.
const ABSOLUTE_PARSERS: &[AbsoluteParser] = &[
    parse_rfc822,
    parse_iso8601,
    parse_plain_date,
    parse_cjk_date,
];

fn parse_absolute(text: &str, now: DateTime<Utc>) -> Option<NormalizedInstant> {
    ABSOLUTE_PARSERS.iter().find_map(|parse| parse(text, now))
}

/// RFC 822 feed timestamps: named zones (GMT, UT, EST...), numeric
/// offsets, optional weekday and seconds are all covered by chrono's
/// RFC 2822 parser. Zoneless feed strings are taken as UTC.
fn parse_rfc822(text: &str, _now: DateTime<Utc>) -> Option<NormalizedInstant> {
    if let Ok(parsed) = DateTime::parse_from_rfc2822(text) {
        return Some(NormalizedInstant::second(parsed.with_timezone(&Utc)));
    }
    let zoneless_formats = [
        "%a, %d %b %Y %H:%M:%S",
        "%a, %d %b %Y %H:%M",
        "%d %b %Y %H:%M:%S",
        "%d %b %Y %H:%M",
    ];
    for format in &zoneless_formats {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(NormalizedInstant::second(Utc.from_utc_datetime(&parsed)));
        }
    }
    None
}

/// ISO 8601: offset or Z forms first, then naive forms. Naive times are
/// taken as UTC. `%.f` accepts both fractional and whole seconds.
fn parse_iso8601(text: &str, _now: DateTime<Utc>) -> Option<NormalizedInstant> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(NormalizedInstant::second(parsed.with_timezone(&Utc)));
    }
    if let Ok(parsed) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(NormalizedInstant::second(parsed.with_timezone(&Utc)));
    }
    let naive_formats = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
    for format in &naive_formats {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(NormalizedInstant::second(Utc.from_utc_datetime(&parsed)));
        }
    }
    None
}

/// Plain `date[ time]` forms in descending specificity. Month-day forms
/// default the year to the reference instant's year.
fn parse_plain_date(text: &str, now: DateTime<Utc>) -> Option<NormalizedInstant> {
    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
    for format in &datetime_formats {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(NormalizedInstant::second(Utc.from_utc_datetime(&parsed)));
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d"];
    for format in &date_formats {
        if let Ok(parsed) = NaiveDate::parse_from_str(text, format) {
            return Some(NormalizedInstant::day(parsed));
        }
    }

    let month_day_separators = ["-", "/"];
    for separator in &month_day_separators {
        if !text.contains(separator) {
            continue;
        }
        let candidate = format!("{}{}{}", now.year(), separator, text);
        let format = format!("%Y{separator}%m{separator}%d");
        if let Ok(parsed) = NaiveDate::parse_from_str(&candidate, &format) {
            return Some(NormalizedInstant::day(parsed));
        }
    }

    None
}

static CJK_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})年(\d{1,2})月(\d{1,2})日").unwrap());
static HOUR_MINUTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2}):(\d{1,2})").unwrap());

/// Chinese textual dates: `YYYY年M月D日`, optionally followed by an
/// `H:MM` pair anywhere in the trailing text.
fn parse_cjk_date(text: &str, _now: DateTime<Utc>) -> Option<NormalizedInstant> {
    let captures = CJK_DATE.captures(text)?;
    let year: i32 = captures[1].parse().ok()?;
    let month: u32 = captures[2].parse().ok()?;
    let day: u32 = captures[3].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let rest = &text[captures.get(0)?.end()..];
    if let Some(time) = HOUR_MINUTE.captures(rest) {
        let hour: u32 = time[1].parse().ok()?;
        let minute: u32 = time[2].parse().ok()?;
        let datetime = date.and_hms_opt(hour, minute, 0)?;
        return Some(NormalizedInstant::second(Utc.from_utc_datetime(&datetime)));
    }

    Some(NormalizedInstant::day(date))
}
