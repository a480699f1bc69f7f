//! mocap-console - Connect to a Motive server and print incoming frames.
//!
//! Runs the full session sequence:
//! 1. Load settings (config file, then command-line overrides)
//! 2. Register the message handler, then connect and report the server
//! 3. Register the frame handler
//! 4. Fetch the scene description
//! 5. Idle until Ctrl+C, then shut down
//!
//! Frames come from a synthetic scene pushed through the mock client, so the
//! program runs without a capture server on the network.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, debug, error, info, trace, warn};
use tracing_subscriber::EnvFilter;

use mocap_harness::providers::{MockClient, SyntheticFeed, SyntheticScene};
use mocap_harness::types::{ServerDescription, TransportMode};
use mocap_harness::{HarnessConfig, HarnessError, Session, ShutdownSignal};

#[derive(Parser, Debug)]
#[command(author, version, about = "Stream motion capture frames from a Motive server")]
struct Args {
    /// Address of the Motive host.
    #[arg(env = "MOCAP_SERVER_ADDRESS")]
    server_address: Option<String>,

    /// Address of the local interface to receive on.
    #[arg(env = "MOCAP_LOCAL_ADDRESS")]
    local_address: Option<String>,

    /// YAML config file. Command-line values override it.
    #[arg(long, env = "MOCAP_CONFIG")]
    config: Option<PathBuf>,

    /// Multicast group for frame data.
    #[arg(long, env = "MOCAP_MULTICAST_ADDRESS")]
    multicast: Option<String>,

    #[arg(long)]
    command_port: Option<u32>,

    #[arg(long)]
    data_port: Option<u32>,

    /// 'multicast' or 'unicast'.
    #[arg(long)]
    transport: Option<TransportMode>,

    /// How often the idle loop checks for Ctrl+C.
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Skip fetching the scene description after connecting.
    #[arg(long)]
    no_descriptions: bool,

    /// Print a frame summary every N frames.
    #[arg(long, default_value_t = 100)]
    print_every: u64,

    /// Rate of the synthetic frame feed.
    #[arg(long, default_value_t = 120.0)]
    simulate_hz: f64,
}

impl Args {
    fn apply(&self, config: &mut HarnessConfig) {
        let connection = &mut config.connection;
        if let Some(server) = &self.server_address {
            connection.server_address = server.clone();
        }
        if let Some(local) = &self.local_address {
            connection.local_address = local.clone();
        }
        if let Some(group) = &self.multicast {
            connection.multicast_address = Some(group.clone());
        }
        if let Some(port) = self.command_port {
            connection.command_port = port;
        }
        if let Some(port) = self.data_port {
            connection.data_port = port;
        }
        if let Some(transport) = self.transport {
            connection.transport = transport;
        }
        if let Some(poll) = self.poll_interval_ms {
            config.poll_interval_ms = poll;
        }
        if self.no_descriptions {
            config.fetch_descriptions = false;
        }
    }

    fn harness_config(&self) -> Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load(path)?,
            None => HarnessConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            match err.downcast_ref::<HarnessError>() {
                Some(harness) => {
                    for suggestion in harness.recovery_suggestions() {
                        info!("Hint: {suggestion}");
                    }
                    ExitCode::from(harness.exit_code().max(1))
                }
                None => ExitCode::FAILURE,
            }
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = args.harness_config()?;
    let connection = config.connection_config()?;

    let signal = ShutdownSignal::new();
    signal.listen_for_interrupt();

    let scene = SyntheticScene::default();
    let client = MockClient::new()
        .with_server(ServerDescription::present("Motive (simulated)", (3, 1, 0), (4, 1, 0)))
        .with_descriptions(scene.descriptions());

    let mut session = Session::configure_with(connection, client.clone(), config.session_options())?;

    session.register_verbosity_handler(|verbosity, text| {
        let label = verbosity.label();
        match verbosity.severity().level() {
            Level::ERROR => error!("{label}: {text}"),
            Level::WARN => warn!("{label}: {text}"),
            Level::INFO => info!("{label}: {text}"),
            Level::DEBUG => debug!("{label}: {text}"),
            _ => trace!("{label}: {text}"),
        }
        Ok(())
    })?;

    if let Err(err) = session.connect() {
        error!("Unable to connect to Motive server. Exiting.");
        return Err(err.into());
    }

    let print_every = args.print_every.max(1);
    let mut delivered = 0u64;
    session.register_frame_handler(move |frame| {
        delivered += 1;
        if (delivered - 1) % print_every != 0 {
            return Ok(());
        }

        info!("{}", frame.summary());
        for body in &frame.rigid_bodies {
            let [x, y, z] = body.position;
            debug!("Rigid Body ID: {}  Position: ({x:.3}, {y:.3}, {z:.3})", body.id);
        }
        for skeleton in &frame.skeletons {
            debug!("Skeleton ID: {}", skeleton.id);
            for joint in &skeleton.rigid_bodies {
                let [x, y, z] = joint.position;
                debug!("  Joint ID: {}  Position: ({x:.3}, {y:.3}, {z:.3})", joint.id);
            }
        }
        Ok(())
    })?;

    if config.fetch_descriptions {
        match session.fetch_data_descriptions() {
            Ok(descriptions) => {
                for description in &descriptions {
                    debug!("  {}", description.name());
                }
            }
            Err(err) => warn!("Continuing without scene descriptions: {err}"),
        }
    }

    let mut feed = SyntheticFeed::spawn(client, scene, args.simulate_hz)
        .context("failed to start the synthetic frame feed")?;

    session.run_until_signaled(&signal, config.poll_interval()).await;

    feed.stop();
    let stats = session.stats();
    info!(
        frames_received = stats.frames_received,
        frames_dropped = stats.frames_dropped,
        handler_failures = stats.handler_failures,
        "Session statistics"
    );

    if let Err(err) = session.shutdown() {
        warn!("{err}");
    }
    Ok(())
}
