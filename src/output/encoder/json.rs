use std::collections::BTreeMap;

use serde::Serialize;

use super::encoder::{Encodable, Encoder};
use crate::error::{Error, Result};
use crate::model::{AlarmEvent, DataPoint, Series, StatisticValue};

// One event per line, e.g.
// {"timestamp":"2021-01-01T00:00:00Z","region":"us-east-1","namespace":"AWS/EC2",
//  "metric":"NetworkIn","dimension":"InstanceId","group":"i-123",
//  "values":{"Average":1.5}}
#[derive(Serialize)]
struct PointEvent<'a> {
    timestamp: String,
    region: &'a str,
    namespace: &'a str,
    metric: &'a str,
    dimension: &'a str,
    group: &'a str,
    values: BTreeMap<&'static str, StatisticValue>,
}

#[derive(Serialize)]
struct AlarmEventLine<'a> {
    timestamp: String,
    region: &'a str,
    alarm: &'a str,
    item_type: &'a str,
    summary: &'a str,
    data: &'a str,
}

/// Newline-delimited JSON, one object per data point or alarm.
pub struct JsonEncoder {
    region: String,
}

impl JsonEncoder {
    pub fn new<R: Into<String>>(region: R) -> Self {
        Self {
            region: region.into(),
        }
    }

    fn encode_series(&self, series: &Series, points: &[DataPoint]) -> Result<Vec<u8>> {
        let descriptor = series.descriptor();
        let mut lines = Vec::with_capacity(points.len());
        for point in points {
            let event = PointEvent {
                timestamp: point.timestamp().to_rfc3339(),
                region: &self.region,
                namespace: descriptor.namespace(),
                metric: descriptor.name(),
                dimension: series.key().as_str(),
                group: series.group(),
                values: point
                    .values()
                    .iter()
                    .map(|(stat, value)| (stat.as_str(), *value))
                    .collect(),
            };
            lines.push(to_json(&event)?);
        }
        Ok(lines.join("\n").into_bytes())
    }

    fn encode_alarm(&self, alarm: &AlarmEvent) -> Result<Vec<u8>> {
        let line = to_json(&AlarmEventLine {
            timestamp: alarm.timestamp().to_rfc3339(),
            region: &self.region,
            alarm: alarm.name(),
            item_type: alarm.item_type(),
            summary: alarm.summary(),
            data: alarm.data(),
        })?;
        Ok(line.into_bytes())
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|source| Error::Encode {
        what: "json line",
        source,
    })
}

impl Encoder for JsonEncoder {
    fn encode(&self, value: &Encodable) -> Result<Vec<u8>> {
        match value {
            Encodable::Series { series, points } => self.encode_series(series, points),
            Encodable::Alarm(alarm) => self.encode_alarm(alarm),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::prelude::*;

    use super::*;
    use crate::model::{DimensionKey, MetricDescriptor, MetricQuery, Statistic};

    #[test]
    fn test_encode_series() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let query = MetricQuery::new("AWS/EC2", None, Some(DimensionKey::Aggregate));
        let series = Series::select(
            MetricDescriptor::new("NetworkIn", "AWS/EC2", BTreeMap::new()),
            &query,
        )
        .unwrap();

        let points = (0..2)
            .map(|i| {
                let mut values = BTreeMap::new();
                values.insert(Statistic::Sum, i as f64);
                DataPoint::new(Utc.timestamp_opt(60 * i, 0).unwrap(), values)
            })
            .collect::<Vec<_>>();

        let out = String::from_utf8(JsonEncoder::new("eu-west-1").encode(&Encodable::Series {
            series: &series,
            points: &points,
        })?)?;
        let lines = out.lines().collect::<Vec<_>>();
        assert_eq!(2, lines.len());

        let second: serde_json::Value = serde_json::from_str(lines[1])?;
        assert_eq!(
            serde_json::json!({
                "timestamp": "1970-01-01T00:01:00+00:00",
                "region": "eu-west-1",
                "namespace": "AWS/EC2",
                "metric": "NetworkIn",
                "dimension": "MetricName",
                "group": "Total",
                "values": {"Sum": 1.0}
            }),
            second
        );
        Ok(())
    }

    #[test]
    fn test_encode_alarm() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let alarm = AlarmEvent::new(
            "HighCPU",
            "StateUpdate",
            Utc.timestamp_opt(0, 0).unwrap(),
            "OK to ALARM",
            "{}",
        );
        let out = JsonEncoder::new("us-east-1").encode(&Encodable::Alarm(&alarm))?;
        let value: serde_json::Value = serde_json::from_slice(&out)?;
        assert_eq!("HighCPU", value["alarm"]);
        assert_eq!("{}", value["data"]);
        Ok(())
    }
}
