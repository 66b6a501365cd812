use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// 某个自然月的 UTC 毫秒区间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthRange {
    /// 当月第一天 00:00:00.000
    pub start: i64,
    /// 当月最后一天 23:59:59.000
    pub end: i64,
    /// `yyyy-MM`
    pub label: String,
}

/// 计算月份区间 (月份从 1 开始)
///
/// 未指定的年/月取 `now` 所在的年/月。月份越界时不做跨年换算，直接返回 `None`，
/// 由调用方负责校验。
pub fn month_range(year: Option<i32>, month: Option<u32>, now: DateTime<Utc>) -> Option<MonthRange> {
    let year = year.unwrap_or_else(|| now.year());
    let month = month.unwrap_or_else(|| now.month());

    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = next_first.pred_opt()?;

    let start = first.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis();
    let end = last.and_hms_opt(23, 59, 59)?.and_utc().timestamp_millis();

    Some(MonthRange {
        start,
        end,
        label: format!("{:04}-{:02}", year, month),
    })
}

impl MonthRange {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn explicit_month() {
        let r = month_range(Some(2024), Some(5), now()).unwrap();
        assert_eq!(r.start, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap().timestamp_millis());
        assert_eq!(r.end, Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap().timestamp_millis());
        assert_eq!(r.label, "2024-05");
    }

    #[test]
    fn defaults_to_current_month() {
        let r = month_range(None, None, now()).unwrap();
        assert_eq!(r.label, "2024-02");
        // 闰年二月
        assert_eq!(r.end, Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap().timestamp_millis());

        let r = month_range(Some(2023), None, now()).unwrap();
        assert_eq!(r.label, "2023-02");
        assert_eq!(r.end, Utc.with_ymd_and_hms(2023, 2, 28, 23, 59, 59).unwrap().timestamp_millis());
    }

    #[test]
    fn december_ends_on_31st() {
        let r = month_range(Some(2023), Some(12), now()).unwrap();
        assert_eq!(r.end_time().unwrap(), Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap());
        assert_eq!(r.start_time().unwrap(), Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn out_of_range_month_is_not_wrapped() {
        assert_eq!(month_range(Some(2024), Some(13), now()), None);
        assert_eq!(month_range(Some(2024), Some(0), now()), None);
    }
}
