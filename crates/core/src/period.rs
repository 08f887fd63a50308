use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Calendar month used as the grouping key for monthly reports.
///
/// Field order gives the derived `Ord` its (year, month) ordering. `month`
/// is always in `1..=12`, deserialization included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMonthKey")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

#[derive(Deserialize)]
struct RawMonthKey {
    year: i32,
    month: u32,
}

impl TryFrom<RawMonthKey> for MonthKey {
    type Error = String;

    fn try_from(raw: RawMonthKey) -> Result<Self, Self::Error> {
        MonthKey::new(raw.year, raw.month)
            .ok_or_else(|| format!("Month out of range: {}", raw.month))
    }
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(MonthKey { year, month })
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn from_date(date: NaiveDate) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Short human label, e.g. `Jan 2024`.
    pub fn label(self) -> String {
        let name = (self.month as usize)
            .checked_sub(1)
            .and_then(|i| MONTH_ABBREVIATIONS.get(i))
            .copied()
            .unwrap_or("???");
        format!("{name} {}", self.year)
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid month key: '{s}'"))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| format!("Invalid year in month key: '{s}'"))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| format!("Invalid month in month key: '{s}'"))?;
        MonthKey::new(year, month).ok_or_else(|| format!("Month out of range: '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Smallest range covering every date yielded, or `None` if there are none.
    pub fn spanning<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Option<Self> {
        dates.into_iter().fold(None, |range, date| match range {
            None => Some(DateRange::new(date, date)),
            Some(r) => Some(DateRange::new(r.start.min(date), r.end.max(date))),
        })
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_key_from_date() {
        let key = MonthKey::from_date(date(2024, 1, 20));
        assert_eq!((key.year(), key.month()), (2024, 1));
    }

    #[test]
    fn month_key_rejects_out_of_range() {
        assert!(MonthKey::new(2024, 0).is_none());
        assert!(MonthKey::new(2024, 13).is_none());
        assert!(MonthKey::new(2024, 12).is_some());
    }

    #[test]
    fn month_key_orders_by_year_then_month() {
        let mut keys = vec![
            MonthKey::new(2024, 2).unwrap(),
            MonthKey::new(2023, 12).unwrap(),
            MonthKey::new(2024, 1).unwrap(),
        ];
        keys.sort();
        assert_eq!(
            keys.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
            vec!["2023-12", "2024-01", "2024-02"]
        );
    }

    #[test]
    fn month_key_label() {
        assert_eq!(MonthKey::new(2024, 1).unwrap().label(), "Jan 2024");
        assert_eq!(MonthKey::new(2025, 12).unwrap().label(), "Dec 2025");
    }

    #[test]
    fn month_key_parse() {
        assert_eq!("2024-03".parse::<MonthKey>().unwrap(), MonthKey::new(2024, 3).unwrap());
        assert!("2024-13".parse::<MonthKey>().is_err());
        assert!("march".parse::<MonthKey>().is_err());
    }

    #[test]
    fn month_key_serde_shape() {
        let key = MonthKey::new(2024, 3).unwrap();
        let json = serde_json::to_value(key).unwrap();
        assert_eq!(json, serde_json::json!({"year": 2024, "month": 3}));
        assert_eq!(serde_json::from_value::<MonthKey>(json).unwrap(), key);
    }

    #[test]
    fn month_key_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<MonthKey>(r#"{"year": 2024, "month": 0}"#).is_err());
        assert!(serde_json::from_str::<MonthKey>(r#"{"year": 2024, "month": 13}"#).is_err());
    }

    #[test]
    fn month_key_first_day() {
        assert_eq!(MonthKey::new(2024, 2).unwrap().first_day(), date(2024, 2, 1));
    }

    #[test]
    fn date_range_spanning() {
        let range = DateRange::spanning([date(2024, 2, 1), date(2024, 1, 5), date(2024, 1, 20)]).unwrap();
        assert_eq!(range, DateRange::new(date(2024, 1, 5), date(2024, 2, 1)));
        assert!(DateRange::spanning(std::iter::empty()).is_none());
    }

    #[test]
    fn date_range_contains() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 12, 31));
        assert!(range.contains(date(2024, 6, 15)));
        assert!(range.contains(date(2024, 1, 1)));
        assert!(range.contains(date(2024, 12, 31)));
        assert!(!range.contains(date(2023, 12, 31)));
        assert!(!range.contains(date(2025, 1, 1)));
    }

    #[test]
    fn date_range_display() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 12, 31));
        assert_eq!(range.to_string(), "2024-01-01 to 2024-12-31");
    }
}
