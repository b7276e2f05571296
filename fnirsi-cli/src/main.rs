use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use fnirsi_lib::{
    JsonLinesSink, SampleSink, Session, SessionConfig, SessionSummary, StopRequest, TextSink,
    UsbTransport,
};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Space-separated columns with a header line
    Text,
    /// One JSON object per sample
    Json,
}

/// Stream voltage, current and temperature from a FNIRSI USB power meter.
///
/// Samples go to stdout, logs go to stderr. Stop with Ctrl+C or by creating the stop file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Validate the checksum of each data report and drop reports that fail.
    ///
    /// On by default; pass `--crc false` to keep every report as received.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    crc: bool,
    /// Temperature smoothing factor in [0, 1]; higher is smoother.
    #[arg(long, default_value_t = fnirsi_lib::constants::DEFAULT_TEMPERATURE_ALPHA)]
    alpha: f64,
    /// Read timeout while streaming, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    read_timeout_ms: u64,
    /// Read timeout while draining, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    drain_timeout_ms: u64,
    /// Do not reset the USB device before claiming it.
    #[arg(long)]
    no_reset: bool,
    /// Stop streaming once this file exists.
    #[arg(long, default_value = "fnirsi_stop")]
    stop_file: PathBuf,
    /// Output format for samples.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Log the device's USB configurations before claiming it.
    #[arg(long)]
    describe: bool,
    /// Also write logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        let config = SessionConfig::default()
            .with_crc(self.crc)
            .with_alpha(self.alpha)
            .with_read_timeout(Duration::from_millis(self.read_timeout_ms))
            .with_drain_timeout(Duration::from_millis(self.drain_timeout_ms))
            .describe(self.describe);
        if self.no_reset { config.skip_reset() } else { config }
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(cli.verbose.tracing_level_filter().into())
        .from_env_lossy();

    let file_layer = match &cli.log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().context("--log-file must name a file")?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(name.to_string_lossy())
                .build(dir)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .context("Failed to install the log subscriber")?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let stop = StopRequest::new().with_sentinel(&cli.stop_file);
    let interrupt = stop.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => interrupt.request(),
            Err(e) => warn!("Could not listen for Ctrl+C: {}", e),
        }
    });

    if let Err(e) = run(cli, stop).await {
        error!("Application failed: {:?}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli, mut stop: StopRequest) -> Result<()> {
    if cli.stop_file.exists() {
        warn!(path = %cli.stop_file.display(), "Stop file already exists, the session will end immediately");
    }

    let mut session = Session::connect(cli.session_config())
        .await
        .context("Failed to connect to a FNIRSI meter. Is it plugged in?")?;

    let stdout = io::stdout();
    let summary = match cli.format {
        OutputFormat::Text => stream(&mut session, &mut TextSink::new(stdout), &mut stop).await?,
        OutputFormat::Json => stream(&mut session, &mut JsonLinesSink::new(stdout), &mut stop).await?,
    };

    info!(
        "Totals: {:.6} Wh, {:.3} mAh",
        summary.energy_wh(),
        summary.charge_mah()
    );
    Ok(())
}

async fn stream<S: SampleSink>(
    session: &mut Session<UsbTransport>,
    sink: &mut S,
    stop: &mut StopRequest,
) -> Result<SessionSummary> {
    session.run(sink, stop).await.context("Session ended with an error")
}
