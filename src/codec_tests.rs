//! Unit tests for the codec module

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use crate::codec::{convert_sample, encode_blocks, raw_blocks};
    use crate::sample::{AudioBlock, SampleBuffer, SampleData, SampleType};

    fn concat(blocks: impl Iterator<Item = AudioBlock>) -> Vec<u8> {
        blocks.flat_map(|b| b.as_bytes().to_vec()).collect()
    }

    fn i16_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_encode_pads_final_block() {
        let samples: Vec<i16> = (1..=10).collect();
        let blocks: Vec<AudioBlock> =
            encode_blocks(samples.clone().into(), SampleType::Int16, 4).collect();

        assert_eq!(blocks.len(), 3);
        assert!(blocks.iter().all(|b| b.len() == 8));

        let mut expected = samples;
        expected.extend([0, 0]);
        assert_eq!(concat(blocks.into_iter()), i16_bytes(&expected));
    }

    #[test]
    fn test_encode_exact_multiple_has_no_padding_block() {
        let samples: Vec<i16> = vec![7; 12];
        let blocks = encode_blocks(samples.into(), SampleType::Int16, 4);

        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn test_encode_empty_buffer_yields_nothing() {
        let mut blocks = encode_blocks(Vec::<i16>::new().into(), SampleType::Int16, 4);

        assert_eq!(blocks.len(), 0);
        assert_eq!(blocks.next(), None);
    }

    #[test]
    fn test_size_hint_tracks_progress() {
        let mut blocks = encode_blocks(vec![1i16; 9].into(), SampleType::Int8, 4);

        assert_eq!(blocks.len(), 3);
        blocks.next();
        assert_eq!(blocks.len(), 2);
        blocks.next();
        blocks.next();
        assert_eq!(blocks.len(), 0);
    }

    #[test]
    fn test_int16_float32_round_trip_within_one_lsb() {
        let original: Vec<i16> = vec![i16::MIN + 1, -12345, -1, 0, 1, 12345, i16::MAX];

        let floats: Vec<f32> = original
            .iter()
            .map(|&s| {
                convert_sample(s as f64, SampleType::Int16, SampleType::Float32) as f32
            })
            .collect();
        let encoded = concat(encode_blocks(
            floats.into(),
            SampleType::Int16,
            original.len(),
        ));

        let decoded: Vec<i16> = encoded
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();

        for (a, b) in original.iter().zip(decoded.iter()) {
            assert!((*a as i32 - *b as i32).abs() <= 1, "{a} vs {b}");
        }
    }

    #[test]
    fn test_float_to_int_saturates() {
        let blocks = concat(encode_blocks(
            vec![2.0f32, -2.0].into(),
            SampleType::Int16,
            2,
        ));

        assert_eq!(blocks, i16_bytes(&[i16::MAX, i16::MIN]));
    }

    #[test]
    fn test_same_family_conversion_is_plain_cast() {
        assert_eq!(convert_sample(300.0, SampleType::Int16, SampleType::Int32), 300.0);
        assert_eq!(convert_sample(0.25, SampleType::Float64, SampleType::Float32), 0.25);
    }

    #[test]
    fn test_int_to_float_scales_by_source() {
        let value = convert_sample(i8::MAX as f64, SampleType::Int8, SampleType::Float64);
        assert_eq!(value, 1.0);
    }

    #[test]
    fn test_stereo_is_downmixed_by_averaging() {
        let stereo = SampleBuffer::new(SampleData::I16(vec![100, 300, -50, -150]), 2).unwrap();
        let bytes = concat(encode_blocks(stereo, SampleType::Int16, 2));

        assert_eq!(bytes, i16_bytes(&[200, -100]));
    }

    #[test]
    fn test_float32_output_is_little_endian() {
        let bytes = concat(encode_blocks(vec![0.5f32].into(), SampleType::Float32, 1));
        assert_eq!(bytes, 0.5f32.to_le_bytes().to_vec());
    }

    #[test]
    fn test_raw_blocks_pads_with_zeros() {
        let data = Bytes::from(vec![1u8, 2, 3, 4, 5, 6]);
        let blocks: Vec<AudioBlock> = raw_blocks(data, SampleType::Int16, 2).collect();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].as_bytes(), &[1, 2, 3, 4]);
        assert_eq!(blocks[1].as_bytes(), &[5, 6, 0, 0]);
    }

    #[test]
    fn test_raw_blocks_empty_input() {
        let mut blocks = raw_blocks(Bytes::new(), SampleType::Int32, 16);
        assert_eq!(blocks.next(), None);
    }
}
