use chrono::prelude::*;

/// One alarm history record.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmEvent {
    name: String,
    item_type: String,
    timestamp: DateTime<Utc>,
    summary: String,
    data: String,
}

impl AlarmEvent {
    pub fn new<N, T, S, D>(name: N, item_type: T, timestamp: DateTime<Utc>, summary: S, data: D) -> Self
    where
        N: Into<String>,
        T: Into<String>,
        S: Into<String>,
        D: Into<String>,
    {
        Self {
            name: name.into(),
            item_type: item_type.into(),
            timestamp,
            summary: summary.into(),
            data: data.into(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[inline]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    #[inline]
    pub fn data(&self) -> &str {
        &self.data
    }
}
