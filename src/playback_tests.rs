//! Unit tests for the playback pacer

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::Instant;

    use crate::error::SpeakerError;
    use crate::output::{ChannelOutput, OutputEvent};
    use crate::playback::{stream, PlaybackSession};
    use crate::sample::{AudioBlock, BlockStream, SampleType, StreamDescriptor};

    // 100 samples of int16 at 1 kHz: 0.1s per block
    const DESCRIPTOR: StreamDescriptor = StreamDescriptor {
        sample_rate: 1000,
        sample_type: SampleType::Int16,
        block_size: 100,
    };

    fn blocks(count: usize, bytes: usize) -> BlockStream {
        Box::new((0..count).map(move |i| AudioBlock::new(vec![i as u8; bytes])))
    }

    fn drain(rx: &mut UnboundedReceiver<OutputEvent>) -> Vec<OutputEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_pace_is_slightly_faster_than_real_time() {
        let session = PlaybackSession::new(DESCRIPTOR);
        let pace = session.pace().as_secs_f64();
        assert!((pace - 0.095).abs() < 1e-6, "{pace}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_preload_blocks_are_not_paced() {
        let (output, mut rx) = ChannelOutput::new();
        let mut session = PlaybackSession::new(DESCRIPTOR);

        let start = Instant::now();
        stream(&output, &mut session, blocks(5, 200), 2).await.unwrap();
        let elapsed = start.elapsed();

        // Three paced pushes after two preloaded ones
        assert!(elapsed >= Duration::from_millis(284), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(300), "{elapsed:?}");
        assert_eq!(session.blocks_sent(), 5);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 7);
        assert_eq!(events[0], OutputEvent::Opened(DESCRIPTOR));
        assert_eq!(events[6], OutputEvent::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preload_covering_everything_never_waits() {
        let (output, _rx) = ChannelOutput::new();
        let mut session = PlaybackSession::new(DESCRIPTOR);

        let start = Instant::now();
        stream(&output, &mut session, blocks(3, 200), 3).await.unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocks_arrive_in_order() {
        let (output, mut rx) = ChannelOutput::new();
        let mut session = PlaybackSession::new(DESCRIPTOR);

        stream(&output, &mut session, blocks(4, 200), 1).await.unwrap();

        let sent: Vec<u8> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                OutputEvent::Block(block) => Some(block.as_bytes()[0]),
                _ => None,
            })
            .collect();
        assert_eq!(sent, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_sequence_opens_and_closes() {
        let (output, mut rx) = ChannelOutput::new();
        let mut session = PlaybackSession::new(DESCRIPTOR);

        stream(&output, &mut session, blocks(0, 200), 1).await.unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![OutputEvent::Opened(DESCRIPTOR), OutputEvent::Closed]
        );
    }

    #[tokio::test]
    async fn test_wrong_block_size_fails_and_closes_sink() {
        let (output, mut rx) = ChannelOutput::new();
        let mut session = PlaybackSession::new(DESCRIPTOR);

        let result = stream(&output, &mut session, blocks(3, 150), 1).await;

        assert!(matches!(result, Err(SpeakerError::InvalidParameter(_))));
        assert_eq!(session.blocks_sent(), 0);
        assert_eq!(drain(&mut rx).last(), Some(&OutputEvent::Closed));
    }
}
