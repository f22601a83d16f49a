//! Run-eligibility calendar.
//!
//! Detection only runs on business days. The weekend is fixed to Saturday and
//! Sunday; exchange holidays are not modelled, so a holiday run behaves like
//! any weekday run against an unchanged dataset.

use chrono::{Datelike, NaiveDate, Weekday};

/// True for Monday through Friday.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
