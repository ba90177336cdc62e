//! Wires the daemon components together.

use std::net::UdpSocket as StdUdpSocket;
use std::sync::Arc;
use std::time::Instant;

use dltrouter_dlt_channel::{ChannelStats, DltLogChannel, connect_udp};
use dltrouter_protocol::{DltId, FileTransferEntry, encode_entry};
use dltrouter_router::{
    FileTransfer, MAX_FRAME_LEN, Router, RouterStats, TracingLogHandler, TransferTrigger,
    UdpRecordSink,
};
use dltrouter_transfer::{StreamHandler, TransferReport, create_handler};
use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Counters reported when the daemon stops.
#[derive(Debug, Clone, Copy)]
pub struct ServeSummary {
    pub router: RouterStats,
    pub channel: ChannelStats,
}

fn open_channel(config: &Config) -> anyhow::Result<Arc<DltLogChannel<StdUdpSocket>>> {
    let socket = connect_udp(config.udp_target)?;
    Ok(Arc::new(DltLogChannel::new(socket, config.channel_config())))
}

/// Runs the daemon until `cancel` fires.
pub async fn serve(config: Config, cancel: CancellationToken) -> anyhow::Result<ServeSummary> {
    let ingress = UdpSocket::bind(config.ingress).await?;
    serve_on(config, ingress, cancel).await
}

/// Same as [`serve`] with an already bound ingress socket.
pub async fn serve_on(
    config: Config,
    ingress: UdpSocket,
    cancel: CancellationToken,
) -> anyhow::Result<ServeSummary> {
    let channel = open_channel(&config)?;
    let handler = create_handler(&config.transfer_config(), channel.clone(), Handle::current());
    let router = Router::new(handler).with_log_handler(Box::new(TracingLogHandler));

    tracing::info!(
        ingress = %ingress.local_addr()?,
        target = %config.udp_target,
        ecu = %config.ecu_id,
        file_transfer = config.file_transfer.enabled,
        "DLT router listening"
    );

    let mut buf = vec![0u8; MAX_FRAME_LEN];
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::info!("DLT router shutting down");
                break;
            }

            received = ingress.recv_from(&mut buf) => {
                match received {
                    Ok((n, peer)) => {
                        if let Err(err) = router.route_frame(Instant::now(), &buf[..n]) {
                            tracing::debug!(%peer, error = %err, "dropping frame");
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "ingress receive failed"),
                }
            }
        }
    }

    let summary = ServeSummary {
        router: router.stats(),
        channel: channel.stats(),
    };
    tracing::info!(
        records = summary.router.file_transfer_records + summary.router.log_records,
        unknown = summary.router.unknown_records,
        messages = summary.channel.messages,
        send_failures = summary.channel.send_failures,
        "DLT router stopped"
    );
    Ok(summary)
}

/// Asks a running daemon to stream `file`.
pub fn trigger(config: &Config, file: &str, delete: bool, appid: DltId, ctxid: DltId) -> anyhow::Result<()> {
    let sink = UdpRecordSink::connect(config.ingress)?;
    FileTransfer::new(sink, appid, ctxid).transfer_file(file, delete)?;
    tracing::info!(ingress = %config.ingress, file, "file transfer requested");
    Ok(())
}

/// Streams `file` from this process and waits for the result.
pub async fn transfer_local(
    config: &Config,
    file: &str,
    delete: bool,
    appid: DltId,
    ctxid: DltId,
) -> anyhow::Result<TransferReport> {
    anyhow::ensure!(
        config.file_transfer.enabled,
        "file transfer is disabled in the configuration"
    );

    let channel = open_channel(config)?;
    let handler = StreamHandler::new(&config.transfer_config(), channel.clone(), Handle::current());
    let record = encode_entry(&FileTransferEntry::new(appid, ctxid, file, delete))?;

    let report = handler.submit(Instant::now(), &record)?.join().await?;
    tracing::debug!(stats = ?channel.stats(), "DLT channel stats");
    Ok(report)
}
