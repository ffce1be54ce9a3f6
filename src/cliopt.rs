use chrono::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;
use structopt::StructOpt;

use crate::error::{Error, Result};
use crate::model::{parse_statistics, DimensionKey, MetricQuery, StatisticList};
use crate::utils::time::TimeWindow;

pub const DEFAULT_REGION: &str = "us-east-1";

pub const DEFAULT_LOOKBACK_SECS: u64 = 300;

/// Namespace value that switches from metrics to alarm history.
pub const ALARM_HISTORY: &str = "AlarmHistory";

#[derive(Debug, StructOpt)]
#[structopt(
    name = "cwgrab",
    about = "Poll CloudWatch metrics and alarm history as text",
    after_help = "A session key is read from the first line of stdin unless \
                  AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY are set."
)]
pub struct CliOpt {
    /// Region and/or look-back seconds, in any order (e.g. `us-west-2 120`).
    pub tokens: Vec<String>,

    /// Metric namespace (AWS/EC2, AWS/ELB, ...) or `AlarmHistory`.
    #[structopt(long, short = "n", env = "CWGRAB_NAMESPACE", default_value = "AWS/EC2")]
    pub namespace: String,

    /// Only metrics whose name starts with this prefix.
    #[structopt(long = "metric", short = "m", env = "CWGRAB_METRIC")]
    pub metric: Option<String>,

    /// Dimension to group by (InstanceId, DBClass, ...). `MetricName` selects
    /// namespace-wide totals.
    #[structopt(long, short = "d", env = "CWGRAB_DIMENSION")]
    pub dimension: Option<String>,

    /// Comma-separated statistics to request.
    #[structopt(
        long,
        default_value = "SampleCount,Average,Sum,Minimum,Maximum",
        parse(try_from_str = parse_statistics)
    )]
    pub statistics: StatisticList,

    /// Granularity of returned data points, in seconds.
    #[structopt(long, default_value = "60")]
    pub period: u32,

    /// Statistics requests allowed per throttle window.
    #[structopt(long, env = "CWGRAB_MAX_REQUESTS", default_value = "2")]
    pub max_requests: u32,

    /// Length of the throttle window (and of each forced pause), in seconds.
    #[structopt(long, env = "CWGRAB_THROTTLE_SECS", default_value = "1")]
    pub throttle_secs: u64,

    /// Extra attempts for throttled or failed-over requests.
    #[structopt(long, default_value = "0")]
    pub retries: u32,

    #[structopt(long, default_value = "500")]
    pub retry_backoff_ms: u64,

    /// Report a failing series and continue with the next one.
    #[structopt(long)]
    pub keep_going: bool,

    /// Output format: `text` or `json`.
    #[structopt(long, short = "e", default_value = "text")]
    pub encode: String,

    /// Monitoring endpoint override (defaults to the regional endpoint).
    #[structopt(long, env = "CWGRAB_ENDPOINT")]
    pub endpoint: Option<String>,

    #[structopt(long, env = "SPLUNKD_URI", default_value = "https://127.0.0.1:8089")]
    pub splunkd_uri: String,

    /// App whose password store holds the AWS key pair.
    #[structopt(long, default_value = "pulse_for_aws_cloudwatch")]
    pub app: String,

    #[structopt(long)]
    pub verify_splunkd_tls: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[structopt(long, short = "v", parse(from_occurrences))]
    pub verbose: u8,
}

impl CliOpt {
    pub fn query(&self) -> MetricQuery {
        MetricQuery::new(
            self.namespace.as_str(),
            self.metric.clone(),
            self.dimension.as_deref().map(DimensionKey::from),
        )
    }

    pub fn is_alarm_history(&self) -> bool {
        self.namespace == ALARM_HISTORY
    }
}

/// Resolves the free-form positional tokens into a region and a window
/// ending at `now`.
pub fn resolve(tokens: &[String], now: DateTime<Utc>) -> Result<(String, TimeWindow)> {
    let (region, lookback) = match tokens {
        [] => (DEFAULT_REGION.to_string(), DEFAULT_LOOKBACK_SECS),
        [one] if is_numeric(one) => (DEFAULT_REGION.to_string(), parse_lookback(one)?),
        [one] => (parse_region(one)?, DEFAULT_LOOKBACK_SECS),
        [a, b] => match (is_numeric(a), is_numeric(b)) {
            (true, false) => (parse_region(b)?, parse_lookback(a)?),
            (false, true) => (parse_region(a)?, parse_lookback(b)?),
            (true, true) => {
                return Err(Error::Argument(format!(
                    "two look-back values given ({} and {})",
                    a, b
                )))
            }
            (false, false) => {
                return Err(Error::Argument(format!(
                    "two regions given ({} and {})",
                    a, b
                )))
            }
        },
        _ => {
            return Err(Error::Argument(format!(
                "expected at most a region and a look-back, got {} arguments",
                tokens.len()
            )))
        }
    };

    Ok((region, TimeWindow::lookback(now, lookback)?))
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_lookback(s: &str) -> Result<u64> {
    s.parse::<u64>()
        .map_err(|e| Error::Argument(format!("bad look-back '{}': {}", s, e)))
}

fn parse_region(s: &str) -> Result<String> {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"^[a-z]{2}(-[a-z]+)+-[0-9]+$").unwrap();
    }

    if RE.is_match(s) {
        Ok(s.to_string())
    } else {
        Err(Error::Argument(format!(
            "'{}' is neither a number of seconds nor a region",
            s
        )))
    }
}
