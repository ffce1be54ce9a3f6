mod cloudwatch;
mod sigv4;

pub use cloudwatch::CloudWatch;
pub use sigv4::SigV4Signer;

use crate::error::Result;
use crate::model::{AlarmEvent, DataPoint, MetricDescriptor, Statistic};
use crate::utils::time::TimeWindow;

/// Opaque continuation token handed out by paged calls.
pub type Cursor = String;

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<Cursor>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<Cursor>) -> Self {
        Self { items, next }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsRequest<'a> {
    pub namespace: &'a str,
    pub metric_name: &'a str,
    pub window: TimeWindow,
    pub period_secs: u32,
    pub statistics: &'a [Statistic],
    pub dimension: Option<(&'a str, &'a str)>,
}

/// The subset of the monitoring API the poller consumes.
pub trait MetricsService {
    fn list_metrics(
        &self,
        namespace: &str,
        metric_name: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<Page<MetricDescriptor>>;

    fn get_metric_statistics(&self, request: &StatisticsRequest) -> Result<Vec<DataPoint>>;

    fn describe_alarm_history(
        &self,
        window: &TimeWindow,
        cursor: Option<&str>,
    ) -> Result<Page<AlarmEvent>>;
}

impl<S: MetricsService + ?Sized> MetricsService for &S {
    fn list_metrics(
        &self,
        namespace: &str,
        metric_name: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<Page<MetricDescriptor>> {
        (**self).list_metrics(namespace, metric_name, cursor)
    }

    fn get_metric_statistics(&self, request: &StatisticsRequest) -> Result<Vec<DataPoint>> {
        (**self).get_metric_statistics(request)
    }

    fn describe_alarm_history(
        &self,
        window: &TimeWindow,
        cursor: Option<&str>,
    ) -> Result<Page<AlarmEvent>> {
        (**self).describe_alarm_history(window, cursor)
    }
}
