//! Output channel seam.
//!
//! An output channel is opened once per playback session with the session's
//! stream format and hands back a sink. A sink accepts whole blocks only and
//! is closed by dropping it, which also covers errors and cancellation.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{Result, SpeakerError};
use crate::sample::{AudioBlock, StreamDescriptor};

#[async_trait]
pub trait OutputChannel: Send + Sync {
    type Sink: BlockSink;

    async fn open(&self, descriptor: StreamDescriptor) -> Result<Self::Sink>;
}

#[async_trait]
pub trait BlockSink: Send {
    async fn send(&mut self, block: AudioBlock) -> Result<()>;
}

/// What happened on a [`ChannelOutput`], in order.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputEvent {
    Opened(StreamDescriptor),
    Block(AudioBlock),
    Closed,
}

/// In-process output that forwards session events over a channel, e.g. to
/// an RPC transport that talks to the device.
#[derive(Clone)]
pub struct ChannelOutput {
    tx: mpsc::UnboundedSender<OutputEvent>,
}

impl ChannelOutput {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutputEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl OutputChannel for ChannelOutput {
    type Sink = ChannelSink;

    async fn open(&self, descriptor: StreamDescriptor) -> Result<ChannelSink> {
        self.tx
            .send(OutputEvent::Opened(descriptor))
            .map_err(|_| SpeakerError::Output("output receiver dropped".to_string()))?;

        Ok(ChannelSink {
            tx: self.tx.clone(),
        })
    }
}

pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OutputEvent>,
}

#[async_trait]
impl BlockSink for ChannelSink {
    async fn send(&mut self, block: AudioBlock) -> Result<()> {
        self.tx
            .send(OutputEvent::Block(block))
            .map_err(|_| SpeakerError::Output("output receiver dropped".to_string()))
    }
}

impl Drop for ChannelSink {
    fn drop(&mut self) {
        // Nobody left to tell if the receiver is gone
        let _ = self.tx.send(OutputEvent::Closed);
    }
}
