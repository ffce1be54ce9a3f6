use std::convert::TryFrom;
use std::thread;
use std::time::{Duration, Instant};

use chrono::prelude::*;

use crate::error::{Error, Result};

/// The `[start, end]` interval every query in a run is issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(Error::Argument("end time is before start time".into()));
        }
        Ok(Self { start, end })
    }

    /// Window ending at `end` and reaching `seconds` into the past.
    pub fn lookback(end: DateTime<Utc>, seconds: u64) -> Result<Self> {
        let start = i64::try_from(seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|d| end.checked_sub_signed(d))
            .ok_or_else(|| Error::Argument(format!("look-back of {}s is out of range", seconds)))?;
        Self::new(start, end)
    }

    #[inline]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[inline]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Converts epoch seconds as sent by the monitoring service.
pub fn from_epoch_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    Utc.timestamp_opt(whole as i64, nanos).single()
}

pub fn to_epoch_secs(ts: DateTime<Utc>) -> f64 {
    ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_micros()) / 1e6
}

/// Source of monotonic time for anything that has to wait.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, d: Duration) {
        thread::sleep(d);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookback() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let end = Utc.with_ymd_and_hms(2021, 1, 1, 0, 5, 0).unwrap();
        let window = TimeWindow::lookback(end, 300)?;
        assert_eq!(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(), window.start());
        assert_eq!(end, window.end());

        let window = TimeWindow::lookback(end, 0)?;
        assert_eq!(window.start(), window.end());

        assert!(TimeWindow::lookback(end, u64::MAX).is_err());
        Ok(())
    }

    #[test]
    fn test_window_rejects_reversed_bounds() {
        let a = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 1).unwrap();
        assert!(TimeWindow::new(a, b).is_ok());
        assert!(TimeWindow::new(b, a).is_err());
    }

    #[test]
    fn test_epoch_secs() {
        #[rustfmt::skip]
        let tests = [
            (1609459200.0, Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()),
            (1609459200.5, Utc.timestamp_opt(1609459200, 500_000_000).unwrap()),
        ];

        for (secs, expected) in &tests {
            assert_eq!(Some(*expected), from_epoch_secs(*secs));
            assert_eq!(*secs, to_epoch_secs(*expected));
        }
        assert_eq!(None, from_epoch_secs(f64::NAN));
    }
}
