// ==========================================
// 冷链仓储入库收货系统 - 扫码日期解析
// ==========================================
// 日历日期: MMDDYYYY（RF 终端键入格式）
// 儒略日期: YYYYDDD
// ==========================================

use chrono::{Datelike, NaiveDate};

/// 日期窗口校验结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateCheck {
    Ok,
    Invalid,
    TooOld,
    Future,
}

/// 解析 MMDDYYYY
pub fn parse_code_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.len() != 8 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%m%d%Y").ok()
}

/// 解析 YYYYDDD
pub fn parse_julian_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.len() != 7 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: i32 = s[..4].parse().ok()?;
    let day: u32 = s[4..].parse().ok()?;
    NaiveDate::from_yo_opt(year, day)
}

/// 日期 -> MMDDYYYY
pub fn to_code_date(date: NaiveDate) -> String {
    date.format("%m%d%Y").to_string()
}

/// 日期 -> YYYYDDD
pub fn to_julian_date(date: NaiveDate) -> String {
    format!("{:04}{:03}", date.year(), date.ordinal())
}

/// 校验收货日期窗口
///
/// # 参数
/// - years_back: 允许回溯的年数（客户配置 1 或 2）
/// - future_allowed: 是否允许未来日期
pub fn check_window(
    date: NaiveDate,
    today: NaiveDate,
    years_back: i32,
    future_allowed: bool,
) -> DateCheck {
    if !future_allowed && date > today {
        return DateCheck::Future;
    }
    let earliest = NaiveDate::from_ymd_opt(today.year() - years_back, 1, 1);
    match earliest {
        Some(earliest) if date < earliest => DateCheck::TooOld,
        _ => DateCheck::Ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_date() {
        assert_eq!(
            parse_code_date("02282025"),
            NaiveDate::from_ymd_opt(2025, 2, 28)
        );
        assert_eq!(parse_code_date("13012025"), None);
        assert_eq!(parse_code_date("0228202"), None);
        assert_eq!(parse_code_date("0228202A"), None);
    }

    #[test]
    fn test_julian_roundtrip() {
        let d = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        let j = to_julian_date(d);
        assert_eq!(j, "2025059");
        assert_eq!(parse_julian_date(&j), Some(d));
    }

    #[test]
    fn test_check_window() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let ok = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let old = NaiveDate::from_ymd_opt(2022, 12, 31).unwrap();
        let future = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();

        assert_eq!(check_window(ok, today, 1, false), DateCheck::Ok);
        assert_eq!(check_window(old, today, 2, false), DateCheck::TooOld);
        assert_eq!(check_window(future, today, 1, false), DateCheck::Future);
        assert_eq!(check_window(future, today, 1, true), DateCheck::Ok);
    }
}
