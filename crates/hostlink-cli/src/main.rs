//! Control CLI for a running application host.
//!
//! Connects to the host's backchannel socket (the launcher that spawned the
//! host knows the path) and exposes one subcommand per operation. Ctrl-C
//! cancels whatever is in flight instead of killing the process mid-write.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use hostlink_channel::{CancellationToken, Channel, HostProcess, NullDispatcher};

/// Talk to an application host over its backchannel socket
#[derive(Parser, Debug)]
#[command(name = "hostlink")]
#[command(version, about, long_about = None)]
struct Args {
    /// Unix socket the application host is listening on
    #[arg(long, value_name = "PATH")]
    socket: PathBuf,

    /// Pid of the host process, recorded for diagnostics only
    #[arg(long)]
    pid: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Measure a round trip to the host
    Ping,
    /// Ask the host to shut down gracefully
    Stop,
    /// Print the dashboard URLs
    Urls,
    /// List the publishers the host knows about
    Publishers,
    /// Follow resource-state snapshots until the host stops emitting
    Resources,
    /// Follow publishing-activity updates until the host stops emitting
    Activities,
}

fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hostlink=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| i64::try_from(elapsed.as_millis()).ok())
        .unwrap_or(0)
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let args = Args::parse();

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("ctrl-c received, cancelling");
                token.cancel();
            }
        }
    });

    let channel = Channel::new();
    channel
        .connect(
            args.pid.map(|pid| HostProcess { pid }),
            &args.socket,
            Arc::new(NullDispatcher),
            &token,
        )
        .await
        .with_context(|| format!("failed to connect to host at {}", args.socket.display()))?;

    match run(&channel, args.command, &token).await {
        Ok(()) => Ok(()),
        // A fired token is abandonment, not failure.
        Err(e) if e.is_cancelled() => {
            eprintln!("cancelled");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn run(
    channel: &Channel,
    command: Command,
    token: &CancellationToken,
) -> hostlink_channel::Result<()> {
    match command {
        Command::Ping => {
            let sent = now_millis();
            let echoed = channel.ping(sent, token).await?;
            println!("pong: sent {sent}, echoed {echoed}, rtt {}ms", now_millis() - sent);
        }
        Command::Stop => {
            channel.request_stop(token).await?;
            println!("stop requested");
        }
        Command::Urls => {
            let urls = channel.dashboard_urls(token).await?;
            println!("{}", urls.base_url);
            if let Some(alt_url) = urls.alt_url {
                println!("{alt_url}");
            }
        }
        Command::Publishers => {
            for publisher in channel.publishers(token).await? {
                println!("{publisher}");
            }
        }
        Command::Resources => {
            let mut states = channel.resource_states(token).await?;
            while let Some(state) = states.next(token).await {
                let state = state?;
                println!(
                    "{}\t{}\t{}\t[{}]",
                    state.resource,
                    state.resource_type,
                    state.state,
                    state.endpoints.join(", ")
                );
            }
        }
        Command::Activities => {
            let mut activities = channel.publishing_activities(token).await?;
            while let Some(activity) = activities.next(token).await {
                let activity = activity?;
                let marker = if activity.is_error {
                    "error"
                } else if activity.is_complete {
                    "done"
                } else {
                    "…"
                };
                println!("{}\t{}\t{}", activity.id, marker, activity.status_text);
            }
        }
    }

    Ok(())
}
