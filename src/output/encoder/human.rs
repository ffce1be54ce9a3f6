use std::fmt::Display;

use chrono::prelude::*;

use super::encoder::{Encodable, Encoder};
use crate::error::Result;
use crate::model::{AlarmEvent, DataPoint, Series, StatisticValue};

const UTC_FORMAT: &str = "%m/%d/%Y %H:%M:%S";
const LOCAL_FORMAT: &str = "%m/%d/%y %I:%M:%S.000 %p";
const ALARM_UTC_FORMAT: &str = "%m/%d/%Y %H:%M:%S%.6f";
const ALARM_LOCAL_FORMAT: &str = "%m/%d/%y %I:%M:%S%.6f %p";

/// Fixed-width text blocks, each timestamp shown in UTC and in `tz`.
pub struct HumanReadableEncoder<Tz> {
    region: String,
    tz: Tz,
}

impl HumanReadableEncoder<Local> {
    pub fn new<R: Into<String>>(region: R) -> Self {
        Self::with_timezone(region, Local)
    }
}

impl<Tz: TimeZone> HumanReadableEncoder<Tz>
where
    Tz::Offset: Display,
{
    pub fn with_timezone<R: Into<String>>(region: R, tz: Tz) -> Self {
        Self {
            region: region.into(),
            tz,
        }
    }

    fn local(&self, ts: DateTime<Utc>, format: &str) -> String {
        ts.with_timezone(&self.tz).format(format).to_string()
    }

    fn encode_series(&self, series: &Series, points: &[DataPoint]) -> Result<Vec<u8>> {
        let descriptor = series.descriptor();
        let mut lines = vec![
            String::new(),
            format!(
                "Group: {} -- Metric: {} -- Type: {} -- Region: {}",
                series.group(),
                descriptor.name(),
                series.key().as_str(),
                self.region
            ),
        ];

        let header = descriptor.statistics().iter().fold(
            format!("{:<25}{:<35}", "Timestamp-UTC", "Timestamp-Local"),
            |mut header, stat| {
                header.push_str(&format!("{:<25}", stat.as_str()));
                header
            },
        );
        lines.push(header.trim_end().to_string());

        for point in points {
            let mut row = format!(
                "{:<25}{:<35}",
                point.timestamp().format(UTC_FORMAT).to_string(),
                self.local(point.timestamp(), LOCAL_FORMAT)
            );
            for stat in descriptor.statistics() {
                let value = point.value(*stat).map(format_value);
                row.push_str(&format!("{:<25}", value.as_deref().unwrap_or("-")));
            }
            lines.push(row.trim_end().to_string());
        }

        Ok(lines.join("\n").into_bytes())
    }

    fn encode_alarm(&self, alarm: &AlarmEvent) -> Result<Vec<u8>> {
        let lines = vec![
            String::new(),
            format!(
                "Alarm Name: {} -- Item Type: {}",
                alarm.name(),
                alarm.item_type()
            ),
            format!("{:<35}{:<35} {}", "Timestamp-UTC", "Timestamp-Local", "Summary"),
            format!(
                "{:<35}{:<35} {}",
                alarm.timestamp().format(ALARM_UTC_FORMAT).to_string(),
                self.local(alarm.timestamp(), ALARM_LOCAL_FORMAT),
                alarm.summary()
            ),
            format!("Raw Data: {}", alarm.data()),
            String::new(),
        ];

        Ok(lines.join("\n").into_bytes())
    }
}

// Whole numbers keep one decimal so counters and gauges read alike.
fn format_value(v: StatisticValue) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

impl<Tz: TimeZone> Encoder for HumanReadableEncoder<Tz>
where
    Tz::Offset: Display,
{
    fn encode(&self, value: &Encodable) -> Result<Vec<u8>> {
        match value {
            Encodable::Series { series, points } => self.encode_series(series, points),
            Encodable::Alarm(alarm) => self.encode_alarm(alarm),
        }
    }
}
