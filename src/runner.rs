use std::io::Write;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::fetch::Fetcher;
use crate::model::MetricQuery;
use crate::output::encoder::Encodable;
use crate::output::Output;
use crate::service::MetricsService;
use crate::utils::time::{Clock, TimeWindow};

// Metrics:  ListMetrics pages -> filter -> Series -> GetMetricStatistics -> Encoder -> Writer
// Alarms:   DescribeAlarmHistory pages -> AlarmEvent -> Encoder -> Writer
//
// Every block is written as soon as it is fetched, so a failure part way
// through leaves the earlier blocks on the output.

pub enum Target {
    Metrics(MetricQuery),
    AlarmHistory,
}

pub struct Runner<S, C, W> {
    fetcher: Fetcher<S, C>,
    output: Output<W>,
    window: TimeWindow,
    keep_going: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub series: usize,
    pub blocks: usize,
    pub failures: usize,
}

impl<S, C, W> Runner<S, C, W>
where
    S: MetricsService,
    C: Clock + Clone,
    W: Write,
{
    pub fn new(fetcher: Fetcher<S, C>, output: Output<W>, window: TimeWindow) -> Self {
        Self {
            fetcher,
            output,
            window,
            keep_going: false,
        }
    }

    /// Skip series whose statistics cannot be fetched instead of aborting.
    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    pub fn run(&mut self, target: &Target) -> Result<Summary> {
        let summary = match target {
            Target::Metrics(query) => self.run_metrics(query)?,
            Target::AlarmHistory => self.run_alarms()?,
        };
        self.output.flush()?;

        info!(
            series = summary.series,
            blocks = summary.blocks,
            failures = summary.failures,
            "run complete"
        );
        Ok(summary)
    }

    fn run_metrics(&mut self, query: &MetricQuery) -> Result<Summary> {
        if query.dimension().is_none() {
            warn!(
                namespace = query.namespace(),
                "no dimension configured, no series will be selected"
            );
        }

        let mut summary = Summary::default();
        let fetcher = &self.fetcher;
        let output = &mut self.output;

        for series in fetcher.series(query) {
            let series = series?;
            summary.series += 1;

            let points = match fetcher.fetch_statistics(&series, &self.window) {
                Ok(points) => points,
                Err(e) if self.keep_going => {
                    warn!(
                        metric = series.descriptor().name(),
                        group = series.group(),
                        error = %e,
                        "skipping series"
                    );
                    summary.failures += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if points.is_empty() {
                debug!(
                    metric = series.descriptor().name(),
                    group = series.group(),
                    "no data points in window"
                );
                continue;
            }

            output.write(&Encodable::Series {
                series: &series,
                points: &points,
            })?;
            summary.blocks += 1;
        }

        Ok(summary)
    }

    fn run_alarms(&mut self) -> Result<Summary> {
        let mut summary = Summary::default();
        let output = &mut self.output;

        for alarm in self.fetcher.list_alarm_history(&self.window) {
            output.write(&Encodable::Alarm(&alarm?))?;
            summary.blocks += 1;
        }

        Ok(summary)
    }

    pub fn into_output(self) -> Output<W> {
        self.output
    }
}
