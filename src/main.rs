use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use log::error;

use rtc_send::config::{Config, ConfigOverrides};

#[derive(Debug, Parser)]
#[command(name = "rtc-send", version, about = "Offer local video to a WebRTC peer")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, default_value_os_t = Config::default_path())]
    config: PathBuf,

    /// Signaling server, e.g. ws://0.0.0.0:8765
    #[arg(long, env = "RTC_SEND_SERVER")]
    server: Option<String>,

    /// STUN server, e.g. stun://stun.l.google.com:19302
    #[arg(long, env = "RTC_SEND_STUN")]
    stun: Option<String>,

    /// Seconds to wait for the answer (0 = forever)
    #[arg(long)]
    answer_timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    rtc_send::logger::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load_from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.apply(ConfigOverrides {
        server_url: cli.server,
        stun_server: cli.stun,
        answer_timeout_secs: cli.answer_timeout,
    });
    config.validate()?;

    rtc_send::run(config).await?;
    Ok(())
}
