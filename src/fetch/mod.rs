mod pages;
mod retry;
mod throttle;

pub use pages::Pages;
pub use retry::RetryPolicy;
pub use throttle::{RateLimiter, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};

use std::cell::RefCell;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;
use crate::model::{AlarmEvent, DataPoint, MetricDescriptor, MetricQuery, Series};
use crate::service::{MetricsService, StatisticsRequest};
use crate::utils::time::{Clock, SystemClock, TimeWindow};

pub const DEFAULT_PERIOD_SECS: u32 = 60;

/// Retrieves complete result sets from a `MetricsService`, keeping the
/// statistics calls within the rate limiter's budget.
pub struct Fetcher<S, C = SystemClock> {
    service: S,
    clock: C,
    limiter: RefCell<RateLimiter<C>>,
    retry: RetryPolicy,
    period_secs: u32,
}

impl<S: MetricsService> Fetcher<S, SystemClock> {
    pub fn new(service: S) -> Self {
        Self::with_clock(service, SystemClock)
    }
}

impl<S, C> Fetcher<S, C>
where
    S: MetricsService,
    C: Clock + Clone,
{
    pub fn with_clock(service: S, clock: C) -> Self {
        let limiter = RateLimiter::new(clock.clone(), DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW);
        Self {
            service,
            clock,
            limiter: RefCell::new(limiter),
            retry: RetryPolicy::none(),
            period_secs: DEFAULT_PERIOD_SECS,
        }
    }

    pub fn rate_limit(mut self, max_requests: u32, window: Duration) -> Self {
        self.limiter = RefCell::new(RateLimiter::new(self.clock.clone(), max_requests, window));
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn period(mut self, period_secs: u32) -> Self {
        self.period_secs = period_secs;
        self
    }

    /// Every descriptor in the query's namespace, across all pages.
    pub fn list_all<'a>(
        &'a self,
        query: &'a MetricQuery,
    ) -> impl Iterator<Item = Result<MetricDescriptor>> + 'a {
        Pages::new(move |cursor: Option<&str>| {
            self.retry.run(&self.clock, "ListMetrics", || {
                self.service.list_metrics(query.namespace(), None, cursor)
            })
        })
    }

    /// Descriptors that pass the query's dimension and name filters.
    pub fn series<'a>(
        &'a self,
        query: &'a MetricQuery,
    ) -> impl Iterator<Item = Result<Series>> + 'a {
        self.list_all(query).filter_map(move |item| match item {
            Ok(descriptor) => Series::select(descriptor, query).map(Ok),
            Err(e) => Some(Err(e)),
        })
    }

    /// Data points of one series within `window`, oldest first.
    pub fn fetch_statistics(&self, series: &Series, window: &TimeWindow) -> Result<Vec<DataPoint>> {
        let descriptor = series.descriptor();
        let request = StatisticsRequest {
            namespace: descriptor.namespace(),
            metric_name: descriptor.name(),
            window: *window,
            period_secs: self.period_secs,
            statistics: descriptor.statistics(),
            dimension: series.dimension(),
        };

        let mut points = self.retry.run(&self.clock, "GetMetricStatistics", || {
            self.limiter.borrow_mut().throttle();
            self.service.get_metric_statistics(&request)
        })?;
        points.sort_by_key(|p| p.timestamp());

        debug!(
            metric = descriptor.name(),
            group = series.group(),
            points = points.len(),
            "fetched statistics"
        );
        Ok(points)
    }

    /// Alarm history within `window`, across all pages. Not rate limited.
    pub fn list_alarm_history<'a>(
        &'a self,
        window: &'a TimeWindow,
    ) -> impl Iterator<Item = Result<AlarmEvent>> + 'a {
        Pages::new(move |cursor: Option<&str>| {
            self.retry.run(&self.clock, "DescribeAlarmHistory", || {
                self.service.describe_alarm_history(window, cursor)
            })
        })
    }
}
