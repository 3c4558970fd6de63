use anyhow::{Context as _, Result};
use clap::Parser;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

use kbgpd::config;
use kbgpd::speaker::{self, Context, NoopSink};

#[derive(Parser)]
#[command(author, version, about = "A passive BGP-4 speaker that collects routes per peer.", long_about = None)]
struct Opt {
    #[arg(short, long, value_parser, default_value = "kbgpd.conf")]
    config: PathBuf,
    /// Local autonomous system number
    #[arg(short, long)]
    asn: Option<u16>,
    /// BGP identifier
    #[arg(short, long)]
    rid: Option<Ipv4Addr>,
    #[arg(short = 'o', long)]
    hold_time: Option<u16>,
    #[arg(short, long)]
    port: Option<u16>,
    /// Log table statistics periodically
    #[arg(short, long)]
    statistics: bool,
    #[arg(short, long)]
    verbose: bool,
}

impl Opt {
    fn apply(&self, config: &mut config::Config) {
        if let Some(asn) = self.asn {
            config.asn = asn;
        }
        if let Some(rid) = self.rid {
            config.rid = rid;
        }
        if let Some(hold_time) = self.hold_time {
            config.hold_time = Some(hold_time);
        }
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        if self.statistics {
            config.statistics = Some(true);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    let default_filter = if opt.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = config::read_config(&opt.config)
        .with_context(|| format!("Failed to load {}", opt.config.display()))?;
    opt.apply(&mut config);
    config.validate().context("Invalid configuration after command line overrides")?;
    log::info!("config: {:?}", config);

    let ctx = Arc::new(Context::new(config));
    speaker::listen(ctx, Arc::new(NoopSink)).await
}
