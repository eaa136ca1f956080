// ABOUTME: Drains response records in arbitrary order, writes them strictly in req_num order
// ABOUTME: A write/flush failure is treated exactly like an observed client-gone marker

use bytes::Bytes;
use std::collections::HashMap;
use tokio::io::{self, AsyncWriteExt, BufWriter};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;

/// A response submitted by the dispatcher, in arbitrary arrival order.
#[derive(Debug)]
pub(crate) enum ResponseRecord {
    Normal { req_num: u64, payload: Bytes },
    ClientGone { req_num: u64 },
}

/// Runs the reorderer's unit to completion: drains `responses`, writing each
/// payload to `write_half` strictly in ascending `req_num`, until the
/// client-gone marker has been drained past or the channel closes.
///
/// This owns the write half of the connection for its entire lifetime; it
/// is the sole writer to the socket once the connection engine splits the
/// stream.
pub(crate) async fn run(write_half: OwnedWriteHalf, mut responses: mpsc::Receiver<ResponseRecord>) {
    let mut writer = BufWriter::new(write_half);
    let mut pending: HashMap<u64, Bytes> = HashMap::new();
    let mut next_expected: u64 = 0;
    let mut gone_at: Option<u64> = None;

    while let Some(record) = responses.recv().await {
        match record {
            ResponseRecord::Normal { req_num, payload } => {
                pending.insert(req_num, payload);
            }
            ResponseRecord::ClientGone { req_num } => {
                gone_at.get_or_insert(req_num);
            }
        }

        while let Some(payload) = pending.remove(&next_expected) {
            if gone_at.is_none() {
                if let Err(err) = write_and_flush(&mut writer, &payload).await {
                    tracing::debug!(
                        req_num = next_expected,
                        error = %err,
                        "write failed; treating the connection as gone from here on"
                    );
                    gone_at = Some(next_expected);
                }
            }
            next_expected += 1;
        }

        if let Some(observed_gone_at) = gone_at {
            if next_expected > observed_gone_at {
                break;
            }
        }
    }
}

async fn write_and_flush(
    writer: &mut BufWriter<OwnedWriteHalf>,
    payload: &[u8],
) -> io::Result<()> {
    writer.write_all(payload).await?;
    writer.flush().await
}
