use std::io;
use std::process;
use std::time::Duration;

use chrono::Utc;
use structopt::StructOpt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cwgrab::cliopt::{self, CliOpt};
use cwgrab::credentials::{self, CredentialProvider, Credentials, SplunkPasswords};
use cwgrab::error::{Error, Result};
use cwgrab::fetch::{Fetcher, RetryPolicy};
use cwgrab::output::{
    encoder::{Encoder, HumanReadableEncoder, JsonEncoder},
    writer::LineWriter,
    Output,
};
use cwgrab::runner::{Runner, Target};
use cwgrab::service::CloudWatch;

fn main() {
    let opt = CliOpt::from_args();
    init_logging(opt.verbose);

    if let Err(e) = run(&opt) {
        debug!(error = ?e, "run failed");
        eprintln!("{}", e);
        process::exit(e.exit_code());
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(opt: &CliOpt) -> Result<()> {
    let (region, window) = cliopt::resolve(&opt.tokens, Utc::now())?;

    let encoder: Box<dyn Encoder> = match opt.encode.as_str() {
        "text" | "h" => Box::new(HumanReadableEncoder::new(region.as_str())),
        "json" => Box::new(JsonEncoder::new(region.as_str())),
        other => return Err(Error::Argument(format!("unknown output format '{}'", other))),
    };

    info!(
        %region,
        start = %window.start(),
        end = %window.end(),
        namespace = %opt.namespace,
        "polling"
    );

    let credentials = match Credentials::from_env() {
        Some(credentials) => credentials,
        None => {
            let session_key = credentials::read_session_key(io::stdin().lock())?;
            SplunkPasswords::new(opt.splunkd_uri.as_str(), opt.app.as_str(), opt.verify_splunkd_tls)?
                .credentials(&session_key)?
        }
    };

    let service = CloudWatch::new(&region, credentials, opt.endpoint.as_deref())?
        .with_statistics(opt.statistics.clone());

    let fetcher = Fetcher::new(service)
        .rate_limit(opt.max_requests, Duration::from_secs(opt.throttle_secs))
        .retry(RetryPolicy::new(
            opt.retries,
            Duration::from_millis(opt.retry_backoff_ms),
        ))
        .period(opt.period);

    let output = Output::new(
        Box::new(LineWriter::new(io::BufWriter::new(io::stdout()))),
        encoder,
    );

    let target = if opt.is_alarm_history() {
        Target::AlarmHistory
    } else {
        Target::Metrics(opt.query())
    };

    Runner::new(fetcher, output, window)
        .keep_going(opt.keep_going)
        .run(&target)?;

    Ok(())
}
