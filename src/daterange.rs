use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use regex::Regex;
use std::sync::OnceLock;

/// 解析后的时间区间 (含起点，终点为最后一个需要统计的时刻)
#[derive(Debug, Clone, PartialEq)]
pub struct DateRange<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl<Tz: TimeZone> DateRange<Tz> {
    pub fn seconds(&self) -> i64 {
        (self.end.clone() - self.start.clone()).num_seconds()
    }
}

static REGEX_RELATIVE: OnceLock<Regex> = OnceLock::new();

fn get_regex_relative() -> &'static Regex {
    REGEX_RELATIVE.get_or_init(|| {
        Regex::new(r"^(?:近|最近|过去|last\s*|past\s*)(\d+)\s*(天|日|小时|个小时|days?|hours?)$")
            .expect("relative range regex")
    })
}

/// 区间分隔符，按优先级尝试
const SEPARATORS: [&str; 6] = ["~", "～", " to ", "至", "到", " - "];

/// 解析用户输入的时间区间
///
/// 支持：空输入 (今日)、今日/昨日/本周/上周/本月/上月/今年/去年 及英文等价写法、
/// 近N天/近N小时、`YYYY-MM-DD`、`YYYY-MM`，以及 `A ~ B` 形式的显式区间。
pub fn parse_range<Tz: TimeZone>(input: &str, now: &DateTime<Tz>) -> Result<DateRange<Tz>, String> {
    let text = input.trim();
    let lower = text.to_lowercase();
    let tz = now.timezone();

    if text.is_empty() {
        return keyword_range("今日", now);
    }

    if let Some(range) = keyword_range_opt(&lower, now)? {
        return Ok(range);
    }

    if let Some(caps) = get_regex_relative().captures(&lower) {
        let n: i64 = caps[1].parse().map_err(|_| format!("无效的数字: {}", &caps[1]))?;
        if n == 0 {
            return Err("时间跨度必须大于 0".to_string());
        }
        let span = if caps[2].starts_with('天') || caps[2].starts_with('日') || caps[2].starts_with('d') {
            Duration::try_days(n)
        } else {
            Duration::try_hours(n)
        }
        .ok_or_else(|| "时间跨度过大".to_string())?;
        let start = now
            .clone()
            .checked_sub_signed(span)
            .ok_or_else(|| "时间跨度过大".to_string())?;
        return Ok(DateRange {
            start,
            end: now.clone(),
        });
    }

    for sep in SEPARATORS {
        if let Some((a, b)) = text.split_once(sep) {
            let start = parse_point(a.trim()).ok_or_else(|| format!("无法识别的起始时间: {}", a.trim()))?;
            let end = parse_point(b.trim()).ok_or_else(|| format!("无法识别的结束时间: {}", b.trim()))?;
            let range = DateRange {
                start: localize(&tz, start.first_instant())?,
                end: localize(&tz, end.last_instant())?,
            };
            return check_order(range);
        }
    }

    if let Some(point) = parse_point(text) {
        return check_order(DateRange {
            start: localize(&tz, point.first_instant())?,
            end: localize(&tz, point.last_instant())?,
        });
    }

    Err(format!("无法识别的时间范围: {}", text))
}

fn check_order<Tz: TimeZone>(range: DateRange<Tz>) -> Result<DateRange<Tz>, String> {
    if range.start >= range.end {
        return Err("起始时间必须早于结束时间".to_string());
    }
    Ok(range)
}

fn keyword_range<Tz: TimeZone>(key: &str, now: &DateTime<Tz>) -> Result<DateRange<Tz>, String> {
    keyword_range_opt(key, now)?.ok_or_else(|| format!("未知关键字: {}", key))
}

fn keyword_range_opt<Tz: TimeZone>(
    key: &str,
    now: &DateTime<Tz>,
) -> Result<Option<DateRange<Tz>>, String> {
    let tz = now.timezone();
    let today = now.date_naive();
    let day_start = |d: NaiveDate| localize(&tz, d.and_time(NaiveTime::MIN));

    let today_start = day_start(today)?;
    let week_start_date = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    let month_start_date = first_of_month(today.year(), today.month())?;
    let year_start_date = first_of_month(today.year(), 1)?;

    // 截至当前的区间在起点时刻至少覆盖 1 秒
    let until_now = |start: &DateTime<Tz>| {
        let min_end = start.clone().checked_add_signed(Duration::seconds(1));
        match min_end {
            Some(min_end) if *now < min_end => min_end,
            _ => now.clone(),
        }
    };

    let range = match key {
        "今日" | "今天" | "today" => (today_start.clone(), until_now(&today_start)),
        "昨日" | "昨天" | "yesterday" => (day_start(today - Duration::days(1))?, today_start),
        "本周" | "this week" => {
            let start = day_start(week_start_date)?;
            let end = until_now(&start);
            (start, end)
        }
        "上周" | "last week" => (
            day_start(week_start_date - Duration::days(7))?,
            day_start(week_start_date)?,
        ),
        "本月" | "this month" => {
            let start = day_start(month_start_date)?;
            let end = until_now(&start);
            (start, end)
        }
        "上月" | "last month" => {
            let (y, m) = if today.month() == 1 {
                (today.year() - 1, 12)
            } else {
                (today.year(), today.month() - 1)
            };
            (day_start(first_of_month(y, m)?)?, day_start(month_start_date)?)
        }
        "今年" | "this year" => {
            let start = day_start(year_start_date)?;
            let end = until_now(&start);
            (start, end)
        }
        "去年" | "last year" => (
            day_start(first_of_month(today.year() - 1, 1)?)?,
            day_start(year_start_date)?,
        ),
        _ => return Ok(None),
    };

    check_order(DateRange {
        start: range.0,
        end: range.1,
    })
    .map(Some)
}

/// 单个时间点的粒度
#[derive(Debug, Clone, Copy, PartialEq)]
enum Point {
    Instant(NaiveDateTime),
    Day(NaiveDate),
    Month(NaiveDate),
}

impl Point {
    fn first_instant(&self) -> NaiveDateTime {
        match self {
            Point::Instant(t) => *t,
            Point::Day(d) | Point::Month(d) => d.and_time(NaiveTime::MIN),
        }
    }

    /// 日期/月份作为终点时包含整天 (至 23:59:59)
    fn last_instant(&self) -> NaiveDateTime {
        let end_of = |d: NaiveDate| d.and_hms_opt(23, 59, 59).unwrap_or(d.and_time(NaiveTime::MIN));
        match self {
            Point::Instant(t) => *t,
            Point::Day(d) => end_of(*d),
            Point::Month(d) => end_of(last_day_of_month(*d)),
        }
    }
}

fn parse_point(s: &str) -> Option<Point> {
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

    for fmt in DATETIME_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Point::Instant(t));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(Point::Day(d));
        }
    }

    // YYYY-MM / YYYY/MM
    let (y, m) = s.split_once(['-', '/'])?;
    if y.len() != 4 {
        return None;
    }
    let year: i32 = y.parse().ok()?;
    let month: u32 = m.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1).map(Point::Month)
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, String> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| format!("无效的月份: {}-{}", year, month))
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (y, m) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(first)
}

fn localize<Tz: TimeZone>(tz: &Tz, t: NaiveDateTime) -> Result<DateTime<Tz>, String> {
    tz.from_local_datetime(&t)
        .earliest()
        .ok_or_else(|| format!("无效的本地时间: {}", t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn now() -> DateTime<Utc> {
        // 2024-03-14 (周四) 15:30:00
        Utc.with_ymd_and_hms(2024, 3, 14, 15, 30, 0).unwrap()
    }

    fn ymd_hms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn empty_input_is_today() {
        let r = parse_range("  ", &now()).unwrap();
        assert_eq!(r.start, ymd_hms(2024, 3, 14, 0, 0, 0));
        assert_eq!(r.end, now());
    }

    #[test]
    fn keywords() {
        let r = parse_range("昨日", &now()).unwrap();
        assert_eq!(r.start, ymd_hms(2024, 3, 13, 0, 0, 0));
        assert_eq!(r.end, ymd_hms(2024, 3, 14, 0, 0, 0));

        let r = parse_range("本周", &now()).unwrap();
        assert_eq!(r.start, ymd_hms(2024, 3, 11, 0, 0, 0));

        let r = parse_range("Last Week", &now()).unwrap();
        assert_eq!(r.start, ymd_hms(2024, 3, 4, 0, 0, 0));
        assert_eq!(r.end, ymd_hms(2024, 3, 11, 0, 0, 0));

        let r = parse_range("上月", &now()).unwrap();
        assert_eq!(r.start, ymd_hms(2024, 2, 1, 0, 0, 0));
        assert_eq!(r.end, ymd_hms(2024, 3, 1, 0, 0, 0));

        let r = parse_range("去年", &now()).unwrap();
        assert_eq!(r.start, ymd_hms(2023, 1, 1, 0, 0, 0));
        assert_eq!(r.end, ymd_hms(2024, 1, 1, 0, 0, 0));
    }

    #[test]
    fn last_month_wraps_year() {
        let jan = ymd_hms(2024, 1, 10, 8, 0, 0);
        let r = parse_range("上月", &jan).unwrap();
        assert_eq!(r.start, ymd_hms(2023, 12, 1, 0, 0, 0));
        assert_eq!(r.end, ymd_hms(2024, 1, 1, 0, 0, 0));
    }

    #[test]
    fn relative_spans() {
        let r = parse_range("近7天", &now()).unwrap();
        assert_eq!(r.start, ymd_hms(2024, 3, 7, 15, 30, 0));
        assert_eq!(r.end, now());

        let r = parse_range("last 12 hours", &now()).unwrap();
        assert_eq!(r.start, ymd_hms(2024, 3, 14, 3, 30, 0));

        assert!(parse_range("近0天", &now()).is_err());
    }

    #[test]
    fn oversized_span_is_rejected() {
        assert_eq!(
            parse_range("近100000000天", &now()),
            Err("时间跨度过大".to_string())
        );
        assert!(parse_range("last 99999999999999 hours", &now()).is_err());
    }

    #[test]
    fn today_at_midnight_covers_one_second() {
        let midnight = ymd_hms(2024, 3, 11, 0, 0, 0);
        let r = parse_range("", &midnight).unwrap();
        assert_eq!(r.start, midnight);
        assert_eq!(r.end, ymd_hms(2024, 3, 11, 0, 0, 1));

        // 2024-03-11 是周一
        let r = parse_range("本周", &midnight).unwrap();
        assert_eq!(r.seconds(), 1);
    }

    #[test]
    fn explicit_ranges() {
        let r = parse_range("2024-01-01 ~ 2024-01-07", &now()).unwrap();
        assert_eq!(r.start, ymd_hms(2024, 1, 1, 0, 0, 0));
        assert_eq!(r.end, ymd_hms(2024, 1, 7, 23, 59, 59));

        let r = parse_range("2024-01-01 10:00 - 2024-01-01 12:30", &now()).unwrap();
        assert_eq!(r.start, ymd_hms(2024, 1, 1, 10, 0, 0));
        assert_eq!(r.end, ymd_hms(2024, 1, 1, 12, 30, 0));

        let r = parse_range("2024/02/01 to 2024/02/03", &now()).unwrap();
        assert_eq!(r.seconds(), 3 * 86400 - 1);
    }

    #[test]
    fn single_day_and_month() {
        let r = parse_range("2024-02-29", &now()).unwrap();
        assert_eq!(r.start, ymd_hms(2024, 2, 29, 0, 0, 0));
        assert_eq!(r.end, ymd_hms(2024, 2, 29, 23, 59, 59));

        let r = parse_range("2023-12", &now()).unwrap();
        assert_eq!(r.start, ymd_hms(2023, 12, 1, 0, 0, 0));
        assert_eq!(r.end, ymd_hms(2023, 12, 31, 23, 59, 59));
    }

    #[test]
    fn rejects_garbage_and_reversed() {
        assert!(parse_range("rangeInput", &now()).is_err());
        assert!(parse_range("2024-13", &now()).is_err());
        assert!(parse_range("2024-01-07 ~ 2024-01-01", &now()).is_err());
        assert!(parse_range("2024-01-01 ~ soon", &now()).is_err());
    }
}
