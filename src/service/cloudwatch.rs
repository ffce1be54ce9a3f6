use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::sigv4::SigV4Signer;
use super::{MetricsService, Page, StatisticsRequest};
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::model::{AlarmEvent, DataPoint, Dimensions, MetricDescriptor, Statistic};
use crate::utils::time::{from_epoch_secs, to_epoch_secs, TimeWindow};

const SERVICE: &str = "monitoring";
const TARGET_PREFIX: &str = "GraniteServiceVersion20100801";
const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// Blocking CloudWatch client speaking the AWS JSON 1.0 protocol.
pub struct CloudWatch {
    client: Client,
    endpoint: url::Url,
    signer: SigV4Signer,
    statistics: Vec<Statistic>,
}

impl CloudWatch {
    pub fn new(region: &str, credentials: Credentials, endpoint: Option<&str>) -> Result<Self> {
        let endpoint = match endpoint {
            Some(e) => e.to_string(),
            None => format!("https://{}.{}.amazonaws.com/", SERVICE, region),
        };
        let endpoint = url::Url::parse(&endpoint).map_err(|e| ("endpoint parsing", e))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            signer: SigV4Signer::new(credentials, region, SERVICE),
            statistics: Statistic::ALL.to_vec(),
        })
    }

    /// Statistic kinds attached to every listed descriptor.
    pub fn with_statistics(mut self, statistics: Vec<Statistic>) -> Self {
        self.statistics = statistics;
        self
    }

    fn call<Req, Resp>(&self, operation: &'static str, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(request).map_err(|source| Error::Encode {
            what: operation,
            source,
        })?;

        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), CONTENT_TYPE.to_string());
        headers.insert(
            "x-amz-target".to_string(),
            format!("{}.{}", TARGET_PREFIX, operation),
        );
        let headers = self
            .signer
            .sign_request("POST", &self.endpoint, &headers, &body, Utc::now())?;

        debug!(operation, endpoint = %self.endpoint, "calling monitoring service");

        let mut builder = self.client.post(self.endpoint.clone()).body(body);
        for (name, value) in headers.iter().filter(|(name, _)| name.as_str() != "host") {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send()?;
        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            return Err(service_error(operation, status, &text));
        }

        serde_json::from_str(&text).map_err(|source| Error::Decode { operation, source })
    }
}

fn service_error(operation: &'static str, status: StatusCode, body: &str) -> Error {
    let (code, message) = match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => {
            let code = err
                .kind
                .as_deref()
                .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
                .unwrap_or_default();
            (code, err.message.unwrap_or_default())
        }
        Err(_) => (String::new(), body.trim().to_string()),
    };

    let status_code = status.as_u16().to_string();
    let detail = [status_code.as_str(), code.as_str(), message.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let err = Error::transport(operation, detail);

    if status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
        || code.contains("Throttling")
    {
        err.into_transient()
    } else {
        err
    }
}

impl MetricsService for CloudWatch {
    fn list_metrics(
        &self,
        namespace: &str,
        metric_name: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<Page<MetricDescriptor>> {
        let resp: ListMetricsOutput = self.call(
            "ListMetrics",
            &ListMetricsInput {
                namespace,
                metric_name,
                next_token: cursor,
            },
        )?;

        let items = resp
            .metrics
            .into_iter()
            .map(|m| {
                let dimensions: Dimensions =
                    m.dimensions.into_iter().map(|d| (d.name, d.value)).collect();
                MetricDescriptor::new(m.metric_name, m.namespace, dimensions)
                    .with_statistics(self.statistics.clone())
            })
            .collect();
        Ok(Page::new(items, resp.next_token))
    }

    fn get_metric_statistics(&self, request: &StatisticsRequest) -> Result<Vec<DataPoint>> {
        let dimensions = request
            .dimension
            .map(|(name, value)| vec![DimensionInput { name, value }])
            .unwrap_or_default();

        let resp: GetMetricStatisticsOutput = self.call(
            "GetMetricStatistics",
            &GetMetricStatisticsInput {
                namespace: request.namespace,
                metric_name: request.metric_name,
                dimensions,
                start_time: to_epoch_secs(request.window.start()),
                end_time: to_epoch_secs(request.window.end()),
                period: request.period_secs,
                statistics: request.statistics,
            },
        )?;

        resp.datapoints
            .into_iter()
            .map(|dp| dp.into_data_point("GetMetricStatistics"))
            .collect()
    }

    fn describe_alarm_history(
        &self,
        window: &TimeWindow,
        cursor: Option<&str>,
    ) -> Result<Page<AlarmEvent>> {
        let resp: DescribeAlarmHistoryOutput = self.call(
            "DescribeAlarmHistory",
            &DescribeAlarmHistoryInput {
                start_date: to_epoch_secs(window.start()),
                end_date: to_epoch_secs(window.end()),
                next_token: cursor,
            },
        )?;

        let items = resp
            .alarm_history_items
            .into_iter()
            .map(|item| {
                let timestamp = from_epoch_secs(item.timestamp).ok_or_else(|| {
                    Error::transport("DescribeAlarmHistory", "alarm timestamp out of range")
                })?;
                Ok(AlarmEvent::new(
                    item.alarm_name,
                    item.history_item_type,
                    timestamp,
                    item.history_summary,
                    item.history_data,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, resp.next_token))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListMetricsInput<'a> {
    namespace: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    metric_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListMetricsOutput {
    #[serde(default)]
    metrics: Vec<MetricOutput>,
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetricOutput {
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    metric_name: String,
    #[serde(default)]
    dimensions: Vec<DimensionOutput>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DimensionOutput {
    name: String,
    value: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DimensionInput<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetMetricStatisticsInput<'a> {
    namespace: &'a str,
    metric_name: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dimensions: Vec<DimensionInput<'a>>,
    start_time: f64,
    end_time: f64,
    period: u32,
    statistics: &'a [Statistic],
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetMetricStatisticsOutput {
    #[serde(default)]
    datapoints: Vec<DatapointOutput>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DatapointOutput {
    timestamp: f64,
    sample_count: Option<f64>,
    average: Option<f64>,
    sum: Option<f64>,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

impl DatapointOutput {
    fn into_data_point(self, operation: &'static str) -> Result<DataPoint> {
        let timestamp = from_epoch_secs(self.timestamp)
            .ok_or_else(|| Error::transport(operation, "datapoint timestamp out of range"))?;

        let values = [
            (Statistic::SampleCount, self.sample_count),
            (Statistic::Average, self.average),
            (Statistic::Sum, self.sum),
            (Statistic::Minimum, self.minimum),
            (Statistic::Maximum, self.maximum),
        ]
        .iter()
        .filter_map(|(stat, value)| value.map(|v| (*stat, v)))
        .collect();

        Ok(DataPoint::new(timestamp, values))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeAlarmHistoryInput<'a> {
    start_date: f64,
    end_date: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeAlarmHistoryOutput {
    #[serde(default)]
    alarm_history_items: Vec<AlarmHistoryItemOutput>,
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AlarmHistoryItemOutput {
    #[serde(default)]
    alarm_name: String,
    timestamp: f64,
    #[serde(default)]
    history_item_type: String,
    #[serde(default)]
    history_summary: String,
    #[serde(default)]
    history_data: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}
