// Drains a shared tag queue and writes a framed FLV byte stream

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::log::Logger;

use super::{encode_tag, flv_file_header, FlvQueueItem, FlvTagQueue};

/// Consumes `queue` for as long as `sink` accepts writes, emitting one FLV
/// file header per logical stream (the initial one, then one more after
/// every `Reset` item) followed by each tag in order.
///
/// Runs until the sink returns a write error, at which point the task exits;
/// it does not drain or close the queue, since other sessions may still be
/// producing into it.
pub async fn run_egress_writer<W: AsyncWrite + Unpin>(
    queue: Arc<FlvTagQueue>,
    mut sink: W,
    logger: Arc<Logger>,
) {
    let mut stream_open = false;

    loop {
        match queue.pop().await {
            FlvQueueItem::Tag(tag) => {
                if !stream_open {
                    if let Err(e) = sink.write_all(&flv_file_header(true, true)).await {
                        logger.log_error(&format!("egress writer stopped: {}", e));
                        return;
                    }
                    stream_open = true;
                }

                if let Err(e) = sink.write_all(&encode_tag(&tag)).await {
                    logger.log_error(&format!("egress writer stopped: {}", e));
                    return;
                }
            }
            FlvQueueItem::EndOfStream => {
                stream_open = false;
            }
            FlvQueueItem::Reset => {
                stream_open = false;
            }
        }

        if let Err(e) = sink.flush().await {
            logger.log_error(&format!("egress writer stopped: {}", e));
            return;
        }
    }
}
