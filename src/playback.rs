//! Playback pacer: drains a block sequence into an output channel, priming
//! the remote buffer with a few blocks and then staying slightly ahead of
//! real time.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::constants::{HANDOFF_CAPACITY, PACING_FACTOR};
use crate::error::{Result, SpeakerError};
use crate::output::{BlockSink, OutputChannel};
use crate::sample::{BlockStream, StreamDescriptor};

/// State of one play invocation.
#[derive(Debug)]
pub struct PlaybackSession {
    descriptor: StreamDescriptor,
    blocks_sent: u64,
}

impl PlaybackSession {
    pub fn new(descriptor: StreamDescriptor) -> Self {
        Self {
            descriptor,
            blocks_sent: 0,
        }
    }

    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    pub fn blocks_sent(&self) -> u64 {
        self.blocks_sent
    }

    /// Wait after each push once the preload blocks are out.
    pub fn pace(&self) -> Duration {
        Duration::from_secs_f64(self.descriptor.block_duration() * PACING_FACTOR)
    }
}

/// Stream `blocks` through a freshly opened sink of `output`.
///
/// Blocks are produced on a worker thread and handed over through a bounded
/// queue, so decoding never stalls the pacing loop. The first `preload`
/// blocks go out back-to-back, every later push is followed by a wait of
/// [`PlaybackSession::pace`]. The sink is dropped (closed) on every exit path.
pub async fn stream<O: OutputChannel>(
    output: &O,
    session: &mut PlaybackSession,
    blocks: BlockStream,
    preload: usize,
) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(HANDOFF_CAPACITY);

    let producer = tokio::task::spawn_blocking(move || {
        for block in blocks {
            // Consumer gone: the session ended early
            if tx.blocking_send(block).is_err() {
                break;
            }
        }
    });

    let mut sink = output.open(session.descriptor).await?;
    let expected_len = session.descriptor.block_bytes();
    let pace = session.pace();

    while let Some(block) = rx.recv().await {
        if block.len() != expected_len {
            return Err(SpeakerError::invalid(format!(
                "block of {} bytes in a session of {expected_len}-byte blocks",
                block.len()
            )));
        }

        sink.send(block).await?;
        session.blocks_sent += 1;

        if session.blocks_sent > preload as u64 {
            trace!("Sent block {}, waiting {pace:?}", session.blocks_sent);
            tokio::time::sleep(pace).await;
        } else {
            trace!("Sent preload block {}", session.blocks_sent);
        }
    }

    drop(sink);
    producer.await?;

    Ok(())
}
