use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::Duration;

use chrono::prelude::*;

use cwgrab::error::{Error, Result};
use cwgrab::fetch::Fetcher;
use cwgrab::model::{
    AlarmEvent, DataPoint, DimensionKey, Dimensions, MetricDescriptor, MetricQuery, Statistic,
};
use cwgrab::output::{encoder::HumanReadableEncoder, writer::LineWriter, Output};
use cwgrab::runner::{Runner, Summary, Target};
use cwgrab::service::{MetricsService, Page, StatisticsRequest};
use cwgrab::utils::time::{SystemClock, TimeWindow};

// In-memory service. Cursors are page indexes.
#[derive(Default)]
struct Scenario {
    metrics: Vec<Page<MetricDescriptor>>,
    alarms: Vec<Page<AlarmEvent>>,
    points: BTreeMap<(String, String), Vec<DataPoint>>,
    failing: Vec<String>,
    stats_calls: RefCell<usize>,
}

fn index(cursor: Option<&str>) -> usize {
    cursor.map(|c| c.parse().unwrap()).unwrap_or(0)
}

impl MetricsService for Scenario {
    fn list_metrics(
        &self,
        _namespace: &str,
        _metric_name: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<Page<MetricDescriptor>> {
        Ok(self.metrics[index(cursor)].clone())
    }

    fn get_metric_statistics(&self, request: &StatisticsRequest) -> Result<Vec<DataPoint>> {
        *self.stats_calls.borrow_mut() += 1;
        let group = request.dimension.map(|(_, v)| v).unwrap_or("Total");
        if self.failing.iter().any(|g| g == group) {
            return Err(Error::transport("GetMetricStatistics", "AccessDenied"));
        }
        Ok(self
            .points
            .get(&(request.metric_name.to_string(), group.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn describe_alarm_history(
        &self,
        _window: &TimeWindow,
        cursor: Option<&str>,
    ) -> Result<Page<AlarmEvent>> {
        Ok(self.alarms[index(cursor)].clone())
    }
}

fn window() -> TimeWindow {
    TimeWindow::lookback(Utc.with_ymd_and_hms(2021, 1, 1, 0, 5, 0).unwrap(), 300).unwrap()
}

fn descriptor(name: &str, dims: &[(&str, &str)]) -> MetricDescriptor {
    let dims: Dimensions = dims
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    MetricDescriptor::new(name, "AWS/EC2", dims).with_statistics(vec![Statistic::Average])
}

fn point(minute: u32, avg: f64) -> DataPoint {
    let mut values = BTreeMap::new();
    values.insert(Statistic::Average, avg);
    DataPoint::new(Utc.with_ymd_and_hms(2021, 1, 1, 0, minute, 0).unwrap(), values)
}

fn run(scenario: &Scenario, target: Target, keep_going: bool) -> (Result<Summary>, String) {
    let fetcher = Fetcher::with_clock(scenario, SystemClock)
        .rate_limit(1000, Duration::from_secs(1));
    let output = Output::new(
        Box::new(LineWriter::new(Vec::new())),
        Box::new(HumanReadableEncoder::with_timezone(
            "us-east-1",
            FixedOffset::east_opt(2 * 3600).unwrap(),
        )),
    );

    let mut runner = Runner::new(fetcher, output, window()).keep_going(keep_going);
    let result = runner.run(&target);
    let text = String::from_utf8(runner.into_output().into_inner()).unwrap();
    (result, text)
}

fn metrics_scenario() -> Scenario {
    let mut points = BTreeMap::new();
    points.insert(
        ("NetworkIn".to_string(), "i-1".to_string()),
        vec![point(2, 20.0), point(1, 10.5)],
    );
    points.insert(
        ("NetworkOut".to_string(), "i-2".to_string()),
        vec![point(3, 7.0)],
    );

    Scenario {
        metrics: vec![
            Page::new(
                vec![
                    descriptor("NetworkIn", &[("InstanceId", "i-1")]),
                    descriptor("NetworkIn", &[]),
                    descriptor("DiskReadOps", &[("InstanceId", "i-1")]),
                ],
                Some("1".into()),
            ),
            Page::last(vec![
                descriptor("NetworkOut", &[("InstanceId", "i-bad")]),
                descriptor("NetworkOut", &[("InstanceId", "i-2")]),
                descriptor("NetworkOut", &[("InstanceId", "i-empty")]),
            ]),
        ],
        points,
        failing: vec!["i-bad".into()],
        ..Default::default()
    }
}

fn header(group: &str, metric: &str) -> String {
    format!(
        "Group: {} -- Metric: {} -- Type: InstanceId -- Region: us-east-1",
        group, metric
    )
}

fn columns() -> String {
    format!("{:<25}{:<35}Average", "Timestamp-UTC", "Timestamp-Local")
}

fn row(utc: &str, local: &str, value: &str) -> String {
    format!("{:<25}{:<35}{}", utc, local, value)
}

#[test]
fn e2e_metrics_keep_going() {
    let scenario = metrics_scenario();
    let query = MetricQuery::new(
        "AWS/EC2",
        Some("Network".into()),
        Some(DimensionKey::from("InstanceId")),
    );

    let (result, text) = run(&scenario, Target::Metrics(query), true);

    assert_eq!(
        Summary {
            series: 4,
            blocks: 2,
            failures: 1
        },
        result.unwrap()
    );
    assert_eq!(4, *scenario.stats_calls.borrow());

    let expected = vec![
        String::new(),
        header("i-1", "NetworkIn"),
        columns(),
        row("01/01/2021 00:01:00", "01/01/21 02:01:00.000 AM", "10.5"),
        row("01/01/2021 00:02:00", "01/01/21 02:02:00.000 AM", "20.0"),
        String::new(),
        header("i-2", "NetworkOut"),
        columns(),
        row("01/01/2021 00:03:00", "01/01/21 02:03:00.000 AM", "7.0"),
    ]
    .into_iter()
    .map(|line| line + "\n")
    .collect::<String>();

    assert_eq!(
        expected, text,
        "\nExpected:\n{}\nActual:\n{}",
        expected, text
    );
}

#[test]
fn e2e_metrics_fail_fast_keeps_earlier_blocks() {
    let scenario = metrics_scenario();
    let query = MetricQuery::new(
        "AWS/EC2",
        Some("Network".into()),
        Some(DimensionKey::from("InstanceId")),
    );

    let (result, text) = run(&scenario, Target::Metrics(query), false);

    assert!(matches!(result, Err(Error::Transport { .. })));
    assert!(text.contains(&header("i-1", "NetworkIn")));
    assert!(!text.contains("NetworkOut"));
}

#[test]
fn e2e_aggregate_totals() {
    let mut scenario = metrics_scenario();
    scenario
        .points
        .insert(("NetworkIn".to_string(), "Total".to_string()), vec![point(4, 1.0)]);
    let query = MetricQuery::new("AWS/EC2", None, Some(DimensionKey::Aggregate));

    let (result, text) = run(&scenario, Target::Metrics(query), false);

    assert_eq!(1, result.unwrap().blocks);
    assert!(text.contains("Group: Total -- Metric: NetworkIn -- Type: MetricName -- Region: us-east-1"));
}

#[test]
fn e2e_alarm_history_across_pages() {
    let alarm = |name: &str, second: u32, summary: &str| {
        AlarmEvent::new(
            name,
            "StateUpdate",
            Utc.with_ymd_and_hms(2021, 1, 1, 23, 30, second).unwrap(),
            summary,
            "{}",
        )
    };
    let scenario = Scenario {
        alarms: vec![
            Page::new(
                vec![alarm("HighCPU", 1, "OK to ALARM"), alarm("LowDisk", 2, "ALARM to OK")],
                Some("1".into()),
            ),
            Page::last(vec![alarm("HighCPU", 3, "ALARM to OK")]),
        ],
        ..Default::default()
    };

    let (result, text) = run(&scenario, Target::AlarmHistory, false);

    assert_eq!(3, result.unwrap().blocks);
    assert_eq!(0, *scenario.stats_calls.borrow());

    let blocks = text
        .split("Alarm Name: ")
        .skip(1)
        .collect::<Vec<_>>();
    assert_eq!(3, blocks.len());
    assert!(blocks[0].starts_with("HighCPU -- Item Type: StateUpdate"));
    assert!(blocks[1].starts_with("LowDisk"));
    assert!(blocks[2].contains("ALARM to OK"));

    // Local time is two hours ahead, which rolls over to the next day.
    assert!(blocks[0].contains("01/01/2021 23:30:01.000000"));
    assert!(blocks[0].contains("01/02/21 01:30:01.000000 AM"));
    assert!(blocks[0].contains("Raw Data: {}"));
}
