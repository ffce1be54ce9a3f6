use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type StatisticValue = f64;

/// Aggregate computed by the monitoring service over each period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Statistic {
    SampleCount,
    Average,
    Sum,
    Minimum,
    Maximum,
}

impl Statistic {
    pub const ALL: [Statistic; 5] = [
        Statistic::SampleCount,
        Statistic::Average,
        Statistic::Sum,
        Statistic::Minimum,
        Statistic::Maximum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::SampleCount => "SampleCount",
            Statistic::Average => "Average",
            Statistic::Sum => "Sum",
            Statistic::Minimum => "Minimum",
            Statistic::Maximum => "Maximum",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Statistic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Statistic::ALL
            .iter()
            .find(|stat| stat.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| Error::Argument(format!("unknown statistic '{}'", s)))
    }
}

pub type StatisticList = Vec<Statistic>;

/// Parses a comma-separated statistic list, keeping the given order.
pub fn parse_statistics(s: &str) -> Result<StatisticList> {
    let mut stats = Vec::new();
    for part in s.split(',').filter(|p| !p.trim().is_empty()) {
        let stat = part.parse::<Statistic>()?;
        if !stats.contains(&stat) {
            stats.push(stat);
        }
    }
    if stats.is_empty() {
        return Err(Error::Argument("at least one statistic is required".into()));
    }
    Ok(stats)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    timestamp: DateTime<Utc>,
    values: BTreeMap<Statistic, StatisticValue>,
}

impl DataPoint {
    pub fn new(timestamp: DateTime<Utc>, values: BTreeMap<Statistic, StatisticValue>) -> Self {
        Self { timestamp, values }
    }

    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[inline]
    pub fn values(&self) -> &BTreeMap<Statistic, StatisticValue> {
        &self.values
    }

    pub fn value(&self, stat: Statistic) -> Option<StatisticValue> {
        self.values.get(&stat).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statistics() -> std::result::Result<(), Box<dyn std::error::Error>> {
        assert_eq!(
            vec![Statistic::Average, Statistic::Maximum],
            parse_statistics("Average,maximum")?
        );
        assert_eq!(vec![Statistic::Sum], parse_statistics("Sum, Sum,")?);
        assert!(parse_statistics("Median").is_err());
        assert!(parse_statistics(" , ").is_err());
        Ok(())
    }
}
