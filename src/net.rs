//! Streams sessions to a remote TCP listener as an endless WAV file, so any
//! player that understands WAV can act as the speaker
//! (e.g. `nc -l 7878 | aplay`).

use async_trait::async_trait;
use byteorder::{LittleEndian, WriteBytesExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::error::{Result, SpeakerError};
use crate::output::{BlockSink, OutputChannel};
use crate::sample::{AudioBlock, StreamDescriptor};

// Blocks queued for the writer task; pacing keeps this mostly empty
const WRITER_QUEUE_LEN: usize = 8;

const WAVE_FORMAT_PCM: u16 = 1;
const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;

#[derive(Clone, Debug)]
pub struct TcpWavOutput {
    address: String,
}

impl TcpWavOutput {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl OutputChannel for TcpWavOutput {
    type Sink = TcpWavSink;

    async fn open(&self, descriptor: StreamDescriptor) -> Result<TcpWavSink> {
        // byteorder's WriteBytesExt has the same method names
        use tokio::io::AsyncWriteExt;

        let mut stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| SpeakerError::Output(format!("connect to {}: {e}", self.address)))?;

        // The WAV header lets players recognize the stream format
        stream.write_all(&wav_header(&descriptor)?).await?;
        info!("Streaming {descriptor:?} to {}", self.address);

        let (tx, mut rx) = mpsc::channel::<AudioBlock>(WRITER_QUEUE_LEN);
        let address = self.address.clone();

        // Blocks are written whole by this task even if the session is dropped
        // mid-send; the connection closes once the queue drains.
        tokio::spawn(async move {
            while let Some(block) = rx.recv().await {
                if let Err(e) = stream.write_all(block.as_bytes()).await {
                    error!("Failed to write block to {address}: {e}");
                    break;
                }
            }

            if let Err(e) = stream.shutdown().await {
                debug!("Error while closing stream to {address}: {e}");
            }
            info!("Closed stream to {address}");
        });

        Ok(TcpWavSink { tx })
    }
}

pub struct TcpWavSink {
    tx: mpsc::Sender<AudioBlock>,
}

#[async_trait]
impl BlockSink for TcpWavSink {
    async fn send(&mut self, block: AudioBlock) -> Result<()> {
        self.tx
            .send(block)
            .await
            .map_err(|_| SpeakerError::Output("connection closed".to_string()))
    }
}

/// RIFF/WAVE header for a mono stream of unknown length.
pub fn wav_header(descriptor: &StreamDescriptor) -> Result<Vec<u8>> {
    let width = descriptor.sample_type.width() as u16;
    let format = if descriptor.sample_type.is_float() {
        WAVE_FORMAT_IEEE_FLOAT
    } else {
        WAVE_FORMAT_PCM
    };

    let mut header = Vec::with_capacity(44);
    header.extend_from_slice(b"RIFF");
    header.write_u32::<LittleEndian>(u32::MAX)?;
    header.extend_from_slice(b"WAVE");

    header.extend_from_slice(b"fmt ");
    header.write_u32::<LittleEndian>(16)?;
    header.write_u16::<LittleEndian>(format)?;
    header.write_u16::<LittleEndian>(1)?; // mono
    header.write_u32::<LittleEndian>(descriptor.sample_rate)?;
    header.write_u32::<LittleEndian>(descriptor.sample_rate * width as u32)?; // byte rate
    header.write_u16::<LittleEndian>(width)?; // block align
    header.write_u16::<LittleEndian>(width * 8)?;

    header.extend_from_slice(b"data");
    header.write_u32::<LittleEndian>(u32::MAX)?;

    Ok(header)
}
