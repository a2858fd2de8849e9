#![cfg(all(feature = "encoder", feature = "decoder"))]

use image::{imageops, Luma};
use mono_video::{
    decode, pack, unpack, BinaryMask, CodecError, CodecHeader, RawFrame, StreamInfo,
    VideoDecoder, VideoEncoder,
};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rstest::rstest;

use pretty_assertions::assert_eq;

fn save_test_image(scope: &str, label: &str, frame: &BinaryMask) {
    // Usually the folder with the Cargo.toml
    let out_dir = "./target/test-images";
    std::fs::create_dir_all(out_dir).unwrap();
    let out_path = format!("{out_dir}/{scope}_{label}.png");
    eprintln!(
        "+ Saving to {out_path} ({}x{})",
        frame.width(),
        frame.height()
    );

    // Foreground was dark, so draw it dark
    let mut img = image::GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        if frame.get(x, y) {
            Luma([0x00])
        } else {
            Luma([0xFF])
        }
    });

    let max_dim = u32::max(frame.width(), frame.height()) as f32;
    if max_dim < 500. {
        let nw = (img.width() as f32 * (500. / max_dim)) as u32;
        let nh = (img.height() as f32 * (500. / max_dim)) as u32;
        img = imageops::resize(&img, nw, nh, imageops::FilterType::Nearest);
    }

    img.save(out_path).unwrap();
}

fn random_mask(rng: &mut SmallRng, width: u32, height: u32) -> BinaryMask {
    let bits = (0..width * height).map(|_| rng.random_bool(0.5)).collect();
    BinaryMask::from_bits(width, height, bits).unwrap()
}

/// A 9x4 mask with a glider in the top left
fn glider() -> BinaryMask {
    let mut mask = BinaryMask::new(9, 4);
    for (x, y) in [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)] {
        mask.set(x, y, true);
    }
    mask
}

fn stream(header: CodecHeader, payload: &[u8]) -> Vec<u8> {
    let mut bytes = header.to_bytes().to_vec();
    bytes.extend_from_slice(payload);
    bytes
}

#[test]
fn check_zero_frames() {
    // ## Encode
    let encoder = VideoEncoder::new(Vec::<u8>::new(), 16, 8, 0).expect("Failed to encode");
    let bytes = encoder.finish().unwrap();

    // ## Decode
    let mut decoder = VideoDecoder::new(bytes.as_slice()).unwrap();

    let header = decoder.header();
    dbg!(header);
    assert_eq!(header, CodecHeader::new(16, 8, 0));

    // Decoding zero frames should result in no frames
    assert!(decoder.next().is_none());
    assert!(decoder.next().is_none());
    assert!(decoder.is_finished());
}

#[test]
fn check_one_frame() {
    let left = glider();
    save_test_image("check_one_frame", "left_good", &left);

    // ## Encode
    let mut encoder = VideoEncoder::new(Vec::<u8>::new(), 9, 4, 1).unwrap();
    encoder.push_mask(&left).unwrap();
    let bytes = encoder.finish().unwrap();

    // 36 bits: 4 whole bytes and a half-padded fifth
    assert_eq!(bytes.len(), CodecHeader::SIZE + 5);

    // ## Decode
    let mut decoder = VideoDecoder::new(bytes.as_slice()).unwrap();
    dbg!(&decoder);

    let frame = decoder.next().unwrap().unwrap();
    save_test_image("check_one_frame", "left", &frame.to_mask());
    assert_eq!(frame.id(), 1);
    assert_eq!(frame.points(), &[(1, 4), (2, 3), (0, 2), (1, 2), (2, 2)]);
    assert_eq!(frame.to_mask(), left);

    // No more frames: the 4 padding bits aren't enough for another
    assert!(decoder.next().is_none());
    assert!(decoder.next().is_none());
}

#[test]
fn check_two_frames_on_disk_with_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two.bin");

    let mut rng = SmallRng::seed_from_u64(0xBAD_A991E);
    let first = random_mask(&mut rng, 16, 10);
    let second = random_mask(&mut rng, 16, 10);

    // ## Encode
    let mut encoder = VideoEncoder::create(&path, 16, 10, 2).unwrap();
    encoder.push_mask(&first).unwrap();
    encoder.push_mask(&second).unwrap();
    encoder.finish().unwrap();

    assert_eq!(
        std::fs::metadata(&path).unwrap().len(),
        StreamInfo::encoded_len(&CodecHeader::new(16, 10, 2), 2)
    );

    // ## Decode
    let mut decoder = VideoDecoder::open(&path).unwrap();
    for i in 0..2 {
        println!("i={i}");

        let frames: Vec<_> = decoder.by_ref().map(|f| f.unwrap()).collect();
        let masks: Vec<_> = frames.iter().map(|f| f.to_mask()).collect();
        assert_eq!(masks, vec![first.clone(), second.clone()]);
        assert_eq!(frames[1].id(), 2);

        decoder.reset().unwrap();
    }
}

#[test]
fn check_concrete_two_by_two() {
    let pixels = [0_u8, 255, 0, 0];
    let frame = RawFrame::gray(2, 2, &pixels).unwrap();
    let bytes = mono_video::encode([frame], 2, 2, 1).unwrap();
    assert_eq!(&bytes[CodecHeader::SIZE..], &[0xB0]);

    let frames = decode(&bytes).unwrap();
    let mut points = frames[0].points().to_vec();
    points.sort();
    assert_eq!(points, vec![(0, 1), (0, 2), (1, 1)]);
}

#[rstest]
#[case(1, 1)]
#[case(2, 2)]
#[case(3, 3)]
#[case(9, 4)]
#[case(17, 3)]
#[case(64, 48)]
#[case(121, 67)]
fn check_pack_round_trip(#[case] width: u32, #[case] height: u32) {
    let mut rng = SmallRng::seed_from_u64(u64::from(width * 1_000 + height));
    for _ in 0..8 {
        let mask = random_mask(&mut rng, width, height);
        let packed = pack(&mask);
        assert_eq!(packed.len(), (width * height).div_ceil(8) as usize);
        assert_eq!(unpack(&packed, width, height).unwrap(), mask);
    }
}

#[rstest]
#[case(8, 1)]
#[case(4, 4)]
#[case(16, 9)]
#[case(32, 24)]
fn check_stream_round_trip(#[case] width: u32, #[case] height: u32) {
    // Whole-byte frames, so every frame starts on a byte boundary
    let mut rng = SmallRng::seed_from_u64(u64::from(width + height));
    let masks: Vec<_> = (0..5).map(|_| random_mask(&mut rng, width, height)).collect();

    let mut encoder = VideoEncoder::new(Vec::<u8>::new(), width, height, 5).unwrap();
    for mask in &masks {
        encoder.push_mask(mask).unwrap();
    }
    let bytes = encoder.finish().unwrap();

    let decoded: Vec<_> = decode(&bytes).unwrap().iter().map(|f| f.to_mask()).collect();
    assert_eq!(decoded, masks);
}

#[rstest]
#[case(2, 2, 1, 2)]
#[case(4, 4, 1, 0)]
#[case(4, 4, 2, 1)]
#[case(4, 4, 3, 1)]
#[case(3, 3, 9, 8)]
#[case(5, 7, 100, 22)]
fn check_frame_boundary_arithmetic(
    #[case] width: u32,
    #[case] height: u32,
    #[case] payload_len: usize,
    #[case] expected: usize,
) {
    assert_eq!(payload_len * 8 / (width * height) as usize, expected);

    let bytes = stream(CodecHeader::new(width, height, 1), &vec![0xA5_u8; payload_len]);
    assert_eq!(decode(&bytes).unwrap().len(), expected);
    assert_eq!(
        StreamInfo::from_bytes(&bytes).unwrap().decodable_frames(),
        expected as u64
    );
}

#[test]
fn check_frame_count_is_ignored() {
    let payload = [0x12_u8, 0x34, 0x56, 0x78, 0x9A];

    let counts: Vec<_> = [0, 1, 999_999, u32::MAX]
        .into_iter()
        .map(|frame_count| {
            let bytes = stream(CodecHeader::new(4, 2, frame_count), &payload);
            decode(&bytes).unwrap()
        })
        .collect();

    assert_eq!(counts[0].len(), 5);
    for frames in &counts[1..] {
        assert_eq!(frames, &counts[0]);
    }
}

#[test]
fn check_truncated_frame_is_not_an_error() {
    let bytes = stream(CodecHeader::new(4, 4, 1), &[0xFF]);
    let mut decoder = VideoDecoder::new(bytes.as_slice()).unwrap();
    assert!(decoder.next().is_none());
    assert_eq!(decoder.frames_decoded(), 0);
}

#[test]
fn check_encoder_stops_early() {
    // Promised 10 frames, delivered 3: still decodes the 3
    let mut encoder = VideoEncoder::new(Vec::<u8>::new(), 8, 2, 10).unwrap();
    for _ in 0..3 {
        encoder.push_mask(&BinaryMask::new(8, 2)).unwrap();
    }
    let bytes = encoder.finish().unwrap();

    let info = StreamInfo::from_bytes(&bytes).unwrap();
    assert_eq!(info.header().frame_count, 10);
    assert!(!info.frame_count_matches());
    assert_eq!(decode(&bytes).unwrap().len(), 3);
}

#[test]
fn check_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = VideoDecoder::open(dir.path().join("nope.bin")).unwrap_err();
    assert!(matches!(err, CodecError::Unavailable { .. }), "{err:?}");
}
