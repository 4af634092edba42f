use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Source of "now". Calculators never read the system clock themselves;
/// only the store asks a clock, and tests hand it a fixed one.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self, tz: Tz) -> NaiveDate {
        self.now().with_timezone(&tz).date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn today_uses_calendar_zone() {
        let clock = FixedClock(
            Utc.with_ymd_and_hms(2024, 1, 10, 3, 0, 0)
                .single()
                .expect("valid now"),
        );
        assert_eq!(
            clock.today(chrono_tz::UTC),
            NaiveDate::from_ymd_opt(2024, 1, 10).expect("valid date")
        );
        assert_eq!(
            clock.today(chrono_tz::America::Mexico_City),
            NaiveDate::from_ymd_opt(2024, 1, 9).expect("valid date")
        );
    }
}
