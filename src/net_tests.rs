//! Unit tests for the TCP WAV output

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use crate::net::{wav_header, TcpWavOutput};
    use crate::output::{BlockSink, OutputChannel};
    use crate::sample::{AudioBlock, SampleType, StreamDescriptor};

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn descriptor(sample_rate: u32, sample_type: SampleType) -> StreamDescriptor {
        StreamDescriptor {
            sample_rate,
            sample_type,
            block_size: 160,
        }
    }

    #[test]
    fn test_int16_header() {
        let header = wav_header(&descriptor(16000, SampleType::Int16)).unwrap();

        assert_eq!(header.len(), 44);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..16], b"WAVEfmt ");
        assert_eq!(u32_at(&header, 16), 16);
        assert_eq!(u16_at(&header, 20), 1); // PCM
        assert_eq!(u16_at(&header, 22), 1); // mono
        assert_eq!(u32_at(&header, 24), 16000);
        assert_eq!(u32_at(&header, 28), 32000);
        assert_eq!(u16_at(&header, 32), 2);
        assert_eq!(u16_at(&header, 34), 16);
        assert_eq!(&header[36..40], b"data");
        assert_eq!(u32_at(&header, 40), u32::MAX);
    }

    #[test]
    fn test_float32_header() {
        let header = wav_header(&descriptor(44100, SampleType::Float32)).unwrap();

        assert_eq!(header.len(), 44);
        assert_eq!(u16_at(&header, 20), 3); // IEEE float
        assert_eq!(u32_at(&header, 24), 44100);
        assert_eq!(u32_at(&header, 28), 44100 * 4);
        assert_eq!(u16_at(&header, 32), 4);
        assert_eq!(u16_at(&header, 34), 32);
    }

    #[tokio::test]
    async fn test_session_streams_header_then_blocks() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let output = TcpWavOutput::new(listener.local_addr().unwrap().to_string());
        let descriptor = descriptor(8000, SampleType::Int16);

        let mut sink = output.open(descriptor).await.unwrap();
        let (mut socket, _) = listener.accept().await.unwrap();

        sink.send(AudioBlock::new(vec![1u8, 2, 3, 4])).await.unwrap();
        sink.send(AudioBlock::new(vec![5u8, 6])).await.unwrap();
        drop(sink);

        let mut received = Vec::new();
        socket.read_to_end(&mut received).await.unwrap();

        assert_eq!(&received[..44], wav_header(&descriptor).unwrap().as_slice());
        assert_eq!(&received[44..], &[1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_unreachable_address_is_output_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = TcpWavOutput::new(address)
            .open(descriptor(8000, SampleType::Int16))
            .await;
        assert!(matches!(result, Err(crate::error::SpeakerError::Output(_))));
    }
}
