//! # Raw TCP Interface
//!
//! A line-oriented front end for devices and people with `nc`. Each client
//! is prompted for a reading, every line it sends is submitted to the chain,
//! and every `broadcast_interval` it is sent the whole chain as JSON.
//!
//! ```text
//! $ nc localhost 9000
//! Enter a new BPM:72
//!
//! Enter a new BPM:
//! ```
//!
//! Lines that do not parse, including lines that are not UTF-8, are logged
//! and skipped; the connection stays open. A line longer than
//! [`MAX_LINE_LENGTH`] closes it, and no more than that is ever buffered.
//! One task per connection, all sharing one [`Arbitrator`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpListener;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use pulse_protocol::config::{MAX_LINE_LENGTH, TCP_PROMPT};
use pulse_protocol::{Arbitrator, SubmitError};

use crate::metrics::SharedMetrics;

/// Everything a connection task needs. Cheap to clone.
#[derive(Clone)]
pub struct TcpContext {
    pub chain: Arc<Arbitrator>,
    pub metrics: SharedMetrics,
    pub broadcast_interval: Duration,
}

/// Accept connections forever, spawning one task per client.
///
/// Accept errors (e.g. running out of file descriptors) are logged and the
/// loop continues after a short pause; they are not fatal to the node.
pub async fn serve(listener: TcpListener, ctx: TcpContext) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("tcp accept failed: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let ctx = ctx.clone();
        let span = info_span!("tcp_conn", id = %Uuid::new_v4(), %peer);
        tokio::spawn(
            async move {
                if let Err(e) = handle_connection(stream, peer, ctx).await {
                    debug!("connection ended with error: {}", e);
                }
            }
            .instrument(span),
        );
    }
}

/// Drive one client until it disconnects.
pub async fn handle_connection<S>(stream: S, peer: SocketAddr, ctx: TcpContext) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    info!(%peer, "client connected");
    ctx.metrics.connected_clients.inc();
    let result = run_session(stream, &ctx).await;
    ctx.metrics.connected_clients.dec();
    info!(%peer, "client disconnected");
    result
}

async fn run_session<S>(stream: S, ctx: &TcpContext) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(64);

    writer.write_all(TCP_PROMPT.as_bytes()).await?;

    let period = ctx.broadcast_interval;
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            read = read_bounded_line(&mut reader, &mut buf) => {
                let n = read?;
                let terminated = buf.ends_with(b"\n");
                if !terminated && buf.len() > MAX_LINE_LENGTH {
                    warn!(len = buf.len(), "line too long, dropping client");
                    break;
                }
                if n == 0 || !terminated {
                    // EOF. A final unterminated line still counts.
                    if !buf.is_empty() {
                        submit_line(ctx, &decode_line(&buf));
                    }
                    break;
                }
                submit_line(ctx, &decode_line(&buf));
                buf.clear();
                writer.write_all(format!("\n{}", TCP_PROMPT).as_bytes()).await?;
            }
            _ = ticker.tick() => {
                let chain = serde_json::to_string(&ctx.chain.snapshot())?;
                writer.write_all(chain.as_bytes()).await?;
            }
        }
    }

    Ok(())
}

/// Read into `buf` up to and including the next `\n`, never holding more
/// than `MAX_LINE_LENGTH + 1` bytes. Cancel safe: bytes read before a
/// cancellation stay in `buf` and the next call picks up where it left off.
async fn read_bounded_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let budget = (MAX_LINE_LENGTH + 1).saturating_sub(buf.len()) as u64;
    let mut limited = (&mut *reader).take(budget);
    limited.read_until(b'\n', buf).await
}

/// Raw bytes to text. Invalid UTF-8 is replaced rather than rejected here,
/// so it fails payload parsing like any other garbage.
fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// Submit one raw line. Rejections are per-line outcomes: logged, counted,
/// and otherwise ignored.
fn submit_line(ctx: &TcpContext, line: &str) {
    let started = Instant::now();
    let outcome = ctx.chain.append_raw(line);
    ctx.metrics.record_outcome(started, &outcome);

    match outcome {
        Ok(block) => debug!(index = block.index(), "tcp submission accepted"),
        Err(SubmitError::PayloadParse(e)) => warn!("{} is not a number: {}", e.input.trim(), e.reason),
        Err(e) => warn!(reason = e.reason(), error = %e, "tcp submission rejected"),
    }
}
