use chrono::{
  DateTime,
  Datelike,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

use crate::error::{
  CalendarError,
  CalendarResult
};

pub const TIMEZONE_ENV_VAR: &str =
  "TASKTIDE_TIMEZONE";

/// Resolves the calendar zone: env var, then the configured id, then UTC.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "config")
  {
    return tz;
  }

  tracing::debug!(
    "no calendar timezone configured; \
     using UTC"
  );
  chrono_tz::UTC
}

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured calendar timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Calendar day a timestamp falls on in `tz`. This is the date-key used
/// for binning.
#[must_use]
pub fn local_date(
  dt: DateTime<Utc>,
  tz: Tz
) -> NaiveDate {
  dt.with_timezone(&tz).date_naive()
}

#[must_use]
pub fn local_naive(
  dt: DateTime<Utc>,
  tz: Tz
) -> NaiveDateTime {
  dt.with_timezone(&tz).naive_local()
}

#[must_use]
pub fn start_of_day(
  date: NaiveDate
) -> NaiveDateTime {
  date.and_time(NaiveTime::MIN)
}

/// 23:59:59.999 on `date`.
#[must_use]
pub fn end_of_day(
  date: NaiveDate
) -> NaiveDateTime {
  let last_ms = NaiveTime::from_hms_milli_opt(
    23, 59, 59, 999
  )
  .unwrap_or(NaiveTime::MIN);
  date.and_time(last_ms)
}

pub fn add_days(
  date: NaiveDate,
  days: i64
) -> CalendarResult<NaiveDate> {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .ok_or(CalendarError::DateOutOfRange(
      date
    ))
}

/// Maps a local wall-clock time to UTC. Ambiguous times (DST fall-back)
/// take the earlier instant; times inside a DST gap are rejected.
pub fn to_utc_from_local(
  local_naive: NaiveDateTime,
  tz: Tz,
  context: &str
) -> CalendarResult<DateTime<Utc>> {
  match tz.from_local_datetime(
    &local_naive
  ) {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        context,
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Ok(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      Err(
        CalendarError::NonexistentLocalTime(
          format!(
            "{local_naive} ({context})"
          )
        )
      )
    }
  }
}

/// Parses a user-facing date: `today`, `tomorrow`, `yesterday`, weekday
/// and month names, `+Nd`/`-Nw`, a 4-digit year, or `YYYY-MM-DD`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_anchor_date(
  input: &str,
  today: NaiveDate
) -> CalendarResult<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return add_days(today, 1);
    }
    | "yesterday" => {
      return add_days(today, -1);
    }
    | _ => {}
  }

  if token.len() == 4
    && token
      .chars()
      .all(|c| c.is_ascii_digit())
  {
    let year: i32 =
      token.parse().map_err(|_| {
        CalendarError::InvalidDate(
          input.to_string()
        )
      })?;
    return NaiveDate::from_ymd_opt(
      year, 1, 1
    )
    .ok_or_else(|| {
      CalendarError::InvalidDate(
        input.to_string()
      )
    });
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  if let Some(month) =
    parse_month_name(&lower)
  {
    let mut year = today.year();
    if month <= today.month() {
      year = year.saturating_add(1);
    }
    return NaiveDate::from_ymd_opt(
      year, month, 1
    )
    .ok_or_else(|| {
      CalendarError::InvalidDate(
        input.to_string()
      )
    });
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$"
  )
  .map_err(|e| {
    CalendarError::InvalidDate(format!(
      "internal regex compile failure: {e}"
    ))
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps["num"]
      .parse()
      .map_err(|_| {
        CalendarError::InvalidDate(
          input.to_string()
        )
      })?;
    let days = match &caps["unit"] {
      | "w" => num.saturating_mul(7),
      | _ => num
    };
    let signed = if &caps["sign"] == "-"
    {
      -days
    } else {
      days
    };
    return add_days(today, signed);
  }

  NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .map_err(|_| {
    CalendarError::InvalidDate(format!(
      "unrecognized date expression \
       '{input}'; expected today, \
       tomorrow, yesterday, a weekday \
       or month name, +Nd/+Nw, a \
       4-digit year or YYYY-MM-DD"
    ))
  })
}

pub fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

/// Next strictly-later date falling on `target`.
fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_signed(Duration::days(
      delta
    ))
    .unwrap_or(from)
}

/// `15:23`, `3:23pm`, `12:00 AM`.
pub fn parse_clock_time(
  token: &str
) -> Option<(u32, u32)> {
  let clock_re = Regex::new(
    r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]m)?$",
  )
  .ok()?;
  let captures =
    clock_re.captures(token.trim())?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = captures
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  if minute > 59 {
    return None;
  }

  let hour = if let Some(ampm_match) =
    captures.name("ampm")
  {
    if raw_hour == 0 || raw_hour > 12 {
      return None;
    }
    let pm = ampm_match
      .as_str()
      .eq_ignore_ascii_case("pm");
    match (pm, raw_hour) {
      | (false, 12) => 0,
      | (true, 12) => 12,
      | (true, h) => h + 12,
      | (false, h) => h
    }
  } else {
    if raw_hour > 23 {
      return None;
    }
    raw_hour
  };

  Some((hour, minute))
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::*;

  fn day(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn relative_and_named_dates() {
    let today = day(2024, 1, 10);
    assert_eq!(
      parse_anchor_date("tomorrow", today)
        .expect("parse"),
      day(2024, 1, 11)
    );
    assert_eq!(
      parse_anchor_date("-2w", today)
        .expect("parse"),
      day(2023, 12, 27)
    );
    assert_eq!(
      parse_anchor_date("friday", today)
        .expect("parse"),
      day(2024, 1, 12)
    );
    assert_eq!(
      parse_anchor_date("wed", today)
        .expect("parse"),
      day(2024, 1, 17)
    );
    assert_eq!(
      parse_anchor_date("jan", today)
        .expect("parse"),
      day(2025, 1, 1)
    );
    assert_eq!(
      parse_anchor_date(
        "2024-02-29",
        today
      )
      .expect("parse"),
      day(2024, 2, 29)
    );
  }

  #[test]
  fn malformed_dates_are_rejected() {
    let today = day(2024, 1, 10);
    for bad in
      ["2024-02-30", "someday", "+3x"]
    {
      let err =
        parse_anchor_date(bad, today)
          .expect_err("should reject");
      assert!(matches!(
        err,
        CalendarError::InvalidDate(_)
      ));
    }
  }

  #[test]
  fn clock_time_accepts_twelve_hour_forms()
  {
    assert_eq!(
      parse_clock_time("3:23pm"),
      Some((15, 23))
    );
    assert_eq!(
      parse_clock_time("12:05 AM"),
      Some((0, 5))
    );
    assert_eq!(
      parse_clock_time("14:30"),
      Some((14, 30))
    );
    assert_eq!(
      parse_clock_time("24:00"),
      None
    );
    assert_eq!(
      parse_clock_time("13:00pm"),
      None
    );
  }

  #[test]
  fn dst_gap_is_rejected_and_overlap_takes_earliest()
  {
    let tz = chrono_tz::America::New_York;
    let gap = day(2024, 3, 10)
      .and_hms_opt(2, 30, 0)
      .expect("valid time");
    assert!(matches!(
      to_utc_from_local(gap, tz, "test"),
      Err(
        CalendarError::NonexistentLocalTime(
          _
        )
      )
    ));

    let overlap = day(2024, 11, 3)
      .and_hms_opt(1, 30, 0)
      .expect("valid time");
    let utc =
      to_utc_from_local(overlap, tz, "test")
        .expect("resolve overlap");
    assert_eq!(
      utc,
      Utc
        .with_ymd_and_hms(
          2024, 11, 3, 5, 30, 0
        )
        .single()
        .expect("valid utc")
    );
  }

  #[test]
  fn end_of_day_is_last_millisecond() {
    let end = end_of_day(day(2024, 1, 5));
    assert_eq!(
      end.to_string(),
      "2024-01-05 23:59:59.999"
    );
  }
}
