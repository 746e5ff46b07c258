/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Calendar dates with no time component (licence windows, landing dates).
pub type CalendarDate = chrono::NaiveDate;
