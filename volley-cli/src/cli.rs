use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use argh::FromArgs;
use tokio_util::sync::CancellationToken;
use volley_engine::Summary;

use crate::config::{Config, OutputFormat, Overrides};
use crate::{observability, progress, report};

/// Send a fixed number of HTTP requests to a URL and report status codes and latencies.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    /// URL of the endpoint under test
    #[argh(option, short = 'u')]
    pub url: Option<String>,

    /// total number of requests to send (default: 100)
    #[argh(option, short = 'n')]
    pub requests: Option<u64>,

    /// number of requests in flight at the same time (default: 10)
    #[argh(option)]
    pub concurrency: Option<usize>,

    /// timeout of a single request, for example `500ms` or `30s` (default: 30s)
    #[argh(option, from_str_fn(parse_duration))]
    pub timeout: Option<Duration>,

    /// HTTP method of every request (default: GET)
    #[argh(option, short = 'X')]
    pub method: Option<String>,

    /// show a live progress bar on stderr
    #[argh(switch)]
    pub progress: bool,

    /// format of the report on stdout, `text` or `json` (default: text)
    #[argh(option)]
    pub format: Option<OutputFormat>,

    /// print the version and exit
    #[argh(switch, short = 'V')]
    pub version: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            url: self.url.clone(),
            requests: self.requests,
            concurrency: self.concurrency,
            timeout: self.timeout,
            method: self.method.clone(),
            // A switch can only turn the progress bar on.
            progress: self.progress.then_some(true),
            format: self.format,
        }
    }
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|err| err.to_string())
}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    // Special switch to just print the version and exit.
    if args.version {
        println!("volley {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::load(args.config.as_deref(), args.overrides())
        .context("failed to load configuration")?;
    config.validate()?;

    yansi::whenever(yansi::Condition::TTY_AND_COLOR);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("volley-rt")
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    observability::init_tracing(&config);
    tracing::debug!(?config);

    let summary = runtime.block_on(run(&config))?;

    let output = match config.format {
        OutputFormat::Text => report::render_text(&config, &summary),
        OutputFormat::Json => {
            report::render_json(&config, &summary).context("failed to serialize report")?
        }
    };
    println!("{output}");

    Ok(())
}

async fn run(config: &Config) -> Result<Summary> {
    let cancel = CancellationToken::new();

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            elegant_departure::tokio::depart()
                .on_termination()
                .on_sigint()
                .await;
            tracing::info!("Stopping load test ...");
            cancel.cancel();
        }
    });

    let engine_config = config.engine_config();
    if config.progress {
        progress::run_with_progress(cancel, engine_config).await
    } else {
        Ok(volley_engine::run(cancel, engine_config).await?)
    }
}
