use model_compare::streaming::{Event, FrameDecoder, StreamState, StreamStatus, parse_event};

const STREAM: &str = concat!(
    "data: {\"chunk\":\"Rust \"}\n\n",
    ": keep-alive\n\n",
    "data: {\"chunk\":\"is \"}\n\n",
    "data: {broken json\n\n",
    "data: {\"chunk\":\"fast — and ünïcödé safe\"}\n\n",
    "data: {\"model\":\"gpt-4o\"}\n\n",
    "data: {\"chunk\":\".\"}\n\n",
);

fn decode_in_chunks(bytes: &[u8], boundaries: &[usize]) -> Vec<String> {
    let mut decoder = FrameDecoder::new();
    let mut frames = Vec::new();
    let mut start = 0;
    let total = bytes.len();

    for &end in boundaries.iter().chain(std::iter::once(&total)) {
        frames.extend(
            decoder
                .feed(&bytes[start..end])
                .map(|f| f.payload().to_string()),
        );
        start = end;
    }

    frames
}

fn reference_frames() -> Vec<String> {
    decode_in_chunks(STREAM.as_bytes(), &[])
}

/// Small deterministic generator so split patterns are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

#[test]
fn test_reference_decoding() {
    let frames = reference_frames();

    assert_eq!(frames.len(), 7);
    assert_eq!(frames[0], "data: {\"chunk\":\"Rust \"}");
    assert_eq!(frames[1], ": keep-alive");
}

#[test]
fn test_every_single_split_point_gives_same_frames() {
    let bytes = STREAM.as_bytes();
    let expected = reference_frames();

    for split in 0..=bytes.len() {
        assert_eq!(
            decode_in_chunks(bytes, &[split]),
            expected,
            "split at byte {}",
            split
        );
    }
}

#[test]
fn test_fixed_chunk_sizes_give_same_frames() {
    let bytes = STREAM.as_bytes();
    let expected = reference_frames();

    for size in 1..=bytes.len() {
        let boundaries: Vec<usize> = (size..bytes.len()).step_by(size).collect();
        assert_eq!(
            decode_in_chunks(bytes, &boundaries),
            expected,
            "chunk size {}",
            size
        );
    }
}

#[test]
fn test_random_splits_give_same_frames() {
    let bytes = STREAM.as_bytes();
    let expected = reference_frames();
    let mut rng = Lcg(0x5eed);

    for _ in 0..500 {
        let cuts = rng.next(12);
        let mut boundaries: Vec<usize> = (0..cuts).map(|_| rng.next(bytes.len() + 1)).collect();
        boundaries.sort_unstable();

        assert_eq!(
            decode_in_chunks(bytes, &boundaries),
            expected,
            "boundaries {:?}",
            boundaries
        );
    }
}

#[test]
fn test_frame_not_emitted_before_delimiter_completes() {
    let mut decoder = FrameDecoder::new();

    assert_eq!(decoder.feed(b"data: {\"chunk\":\"x\"}\n").count(), 0);

    let frames: Vec<_> = decoder.feed(b"\n").collect();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].payload(), "data: {\"chunk\":\"x\"}");
    assert_eq!(
        frames[0].event(),
        &Event::TextDelta {
            text: "x".to_string()
        }
    );
}

#[test]
fn test_parsed_stream_accumulates_valid_deltas_only() {
    let mut state = StreamState::new();
    for payload in reference_frames() {
        state.apply(&parse_event(&payload));
    }

    assert_eq!(state.text(), "Rust is fast — and ünïcödé safe.");
    assert_eq!(state.status(), StreamStatus::Active);
}

#[test]
fn test_truncated_stream_loses_only_the_last_frame() {
    let truncated = format!("{}data: {{\"chunk\":\" Unfinished", STREAM);
    let mut decoder = FrameDecoder::new();

    let frames: Vec<String> = decoder
        .feed(truncated.as_bytes())
        .map(|f| f.payload().to_string())
        .collect();

    assert_eq!(frames, reference_frames());
    assert_eq!(
        decoder.finish(),
        Some("data: {\"chunk\":\" Unfinished".len())
    );
}
