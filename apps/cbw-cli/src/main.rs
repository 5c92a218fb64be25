use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use controlboard_wrapper::{
    load_config_file, Bottle, CommandMessage, ControlBoardWrapper, DriverFactory, DriverHandle,
    LatestSnapshots, Layout, RpcParser, StreamingParser, WrapperConfig,
};
use motion_device::{SharedCalibrator, SharedDevice, SimBoard, SimCalibrator};

#[derive(Parser, Debug)]
#[command(
    name = "cbw",
    version,
    about = "Control-board wrapper over simulated boards",
    disable_help_subcommand = true
)]
struct Cli {
    /// Wrapper configuration (YAML)
    #[arg(long, short, global = true, default_value = "configs/wrapper/two_part.yaml")]
    config: PathBuf,

    /// Axes of the simulated board opened by an owning wrapper
    #[arg(long, global = true, default_value_t = 6)]
    axes: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a configuration and print the joint layout
    CheckConfig,
    /// Publish joint state until Ctrl-C or the duration elapses
    Run {
        /// Stop after this many seconds
        #[arg(long)]
        duration_s: Option<u64>,
        /// Interval between printed snapshots
        #[arg(long, default_value_t = 1000)]
        report_ms: u64,
        /// Print the full extended state instead of positions only
        #[arg(long, action = ArgAction::SetTrue)]
        extended: bool,
        /// Dump Prometheus metrics on exit
        #[arg(long, action = ArgAction::SetTrue)]
        metrics: bool,
    },
    /// Answer RPC requests, e.g. "[get] [encs]"; reads stdin when none are given
    Rpc {
        requests: Vec<String>,
    },
    /// Send one streaming command, e.g. --head "[poss]" 1 2 3
    Stream {
        #[arg(long)]
        head: String,
        #[arg(allow_hyphen_values = true)]
        values: Vec<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig => check_config(&cli.config),
        Commands::Run {
            duration_s,
            report_ms,
            extended,
            metrics,
        } => run(&cli.config, cli.axes, duration_s, report_ms, extended, metrics).await,
        Commands::Rpc { requests } => rpc(&cli.config, cli.axes, requests),
        Commands::Stream { head, values } => stream(&cli.config, cli.axes, &head, values),
    }
}

fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn check_config(path: &Path) -> Result<()> {
    let cfg = load_config_file(path)?;
    let settings = cfg.validate()?;
    println!("part:     {}", settings.part_name);
    println!("period:   {} ms", settings.period.as_millis());
    println!("output:   {:?}", settings.output_mode);
    match &settings.layout {
        Layout::Owned { kind } => println!("layout:   owns one '{kind}' subdevice"),
        Layout::Deferred { joints, networks } => {
            println!("layout:   {joints} joints over {} networks", networks.len());
            for (name, r) in networks {
                println!(
                    "  {name:<12} joints {}..={} -> axes {}..={}",
                    r.wrapper_base, r.wrapper_top, r.device_base, r.device_top
                );
            }
        }
    }
    if let Some(ros) = &settings.ros {
        println!("ros:      node {} topic {}", ros.node_name, ros.topic_name);
    }
    Ok(())
}

/// Open the wrapper described by `path` and bind simulated boards to it.
fn open_wrapper(
    path: &Path,
    axes: usize,
) -> Result<(Arc<ControlBoardWrapper>, Arc<LatestSnapshots>)> {
    let cfg = load_config_file(path)?;
    let settings = cfg.validate()?;
    let sink = Arc::new(LatestSnapshots::new());

    let wrapper = match settings.layout {
        Layout::Owned { .. } => {
            let factory =
                move |kind: &str, _: &WrapperConfig| -> motion_device::Result<SharedDevice> {
                    info!(kind, axes, "opening simulated board");
                    let dev: SharedDevice = SimBoard::new(kind, axes).shared();
                    Ok(dev)
                };
            let factory: &dyn DriverFactory = &factory;
            ControlBoardWrapper::open(&cfg, sink.clone(), Some(factory))?
        }
        Layout::Deferred { networks, .. } => {
            let wrapper = ControlBoardWrapper::open(&cfg, sink.clone(), None)?;
            let mut drivers: Vec<(String, DriverHandle)> = networks
                .iter()
                .map(|(name, r)| {
                    let dev: SharedDevice = SimBoard::new(name, r.device_top + 1).shared();
                    (name.clone(), DriverHandle::Motion(dev))
                })
                .collect();
            let calibrator: SharedCalibrator = SimCalibrator::shared();
            drivers.push(("calibrator".to_string(), DriverHandle::Calibrator(calibrator)));
            wrapper
                .attach_all(drivers)
                .with_context(|| format!("attaching simulated boards for {}", path.display()))?;
            wrapper
        }
    };
    Ok((wrapper, sink))
}

async fn run(
    path: &Path,
    axes: usize,
    duration_s: Option<u64>,
    report_ms: u64,
    extended: bool,
    metrics: bool,
) -> Result<()> {
    let (wrapper, sink) = open_wrapper(path, axes)?;
    info!(
        part = wrapper.part_name(),
        joints = wrapper.controlled_joints(),
        period_ms = wrapper.period().as_millis() as u64,
        "wrapper running"
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(report_ms.max(1)));
    let deadline = async {
        match duration_s {
            Some(s) => tokio::time::sleep(Duration::from_secs(s)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let line = if extended {
                    sink.state().map(|(state, stamp)| {
                        serde_json::json!({ "stamp": stamp, "state": state })
                    })
                } else {
                    sink.positions().map(|(positions, stamp)| {
                        serde_json::json!({ "stamp": stamp, "positions": positions })
                    })
                };
                match line {
                    Some(v) => println!("{v}"),
                    None => warn!("no snapshot published yet"),
                }
                if let Some(ros) = sink.ros() {
                    tracing::debug!(seq = ros.seq, names = ros.name.len(), "ros joint state");
                }
            }
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    wrapper.close()?;
    if metrics {
        print!("{}", wrapper.metrics().encode_text());
    }
    Ok(())
}

fn rpc(path: &Path, axes: usize, requests: Vec<String>) -> Result<()> {
    let (wrapper, _sink) = open_wrapper(path, axes)?;
    let mut parser = RpcParser::new(wrapper.clone());
    let mut out = std::io::stdout().lock();

    let mut answer = |line: &str, out: &mut dyn Write| -> Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        match line.parse::<Bottle>() {
            Ok(cmd) => {
                let reply = parser.respond(&cmd);
                writeln!(out, "{}", reply.response)?;
            }
            Err(e) => writeln!(out, "error: {e}")?,
        }
        Ok(())
    };

    if requests.is_empty() {
        for line in std::io::stdin().lock().lines() {
            answer(&line?, &mut out)?;
        }
    } else {
        for r in &requests {
            answer(r, &mut out)?;
        }
    }
    wrapper.close()?;
    Ok(())
}

fn stream(path: &Path, axes: usize, head: &str, values: Vec<f64>) -> Result<()> {
    let (wrapper, _sink) = open_wrapper(path, axes)?;
    let head: Bottle = head.parse().context("parsing stream header")?;
    let parser = StreamingParser::new(wrapper.clone());
    parser.on_read(&CommandMessage::new(head, values));
    let positions = wrapper.encoders()?;
    println!("{}", serde_json::json!({ "encoders": positions }));
    wrapper.close()?;
    Ok(())
}
