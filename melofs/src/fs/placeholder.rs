use crate::config;

// MPEG-1 layer III, 128 kbit/s @ 44.1 kHz, no padding: 417-byte frames.
const FRAME_HEADER: [u8; 4] = [0xff, 0xfb, 0x90, 0x00];
const FRAME_LEN: usize = 417;

/// Synthetic audio-like byte stream served in place of a track that has not
/// been fetched yet.
///
/// The buffer is a run of identical minimal MPEG frames, long enough that
/// format sniffers find a valid frame sequence wherever they land. Its real
/// length (bytes actually synthesized) is independent of the length reported
/// through attribute queries, so windowed reads wrap around the buffer
/// instead of running out: players parse trailing bytes near the reported
/// end as additional frames.
pub struct PlaceholderStream {
    frames: Vec<u8>,
    reported_len: u64,
}

impl PlaceholderStream {
    pub fn new(min_len: usize, reported_len: u64) -> Self {
        let mut frame = vec![0u8; FRAME_LEN];
        frame[..FRAME_HEADER.len()].copy_from_slice(&FRAME_HEADER);

        let mut frames = Vec::with_capacity(min_len + FRAME_LEN);
        while frames.len() < min_len {
            frames.extend_from_slice(&frame);
        }

        Self {
            frames,
            reported_len,
        }
    }

    /// Bytes actually synthesized; the period of the looped stream.
    pub fn real_len(&self) -> u64 {
        self.frames.len() as u64
    }

    /// Size advertised for an unfetched track, independent of `real_len`.
    pub fn reported_len(&self) -> u64 {
        self.reported_len
    }

    /// Read `length` bytes starting at `offset`, wrapping modulo the real
    /// length. Offsets past the real length are valid; probe reads request
    /// windows near the reported length.
    pub fn read_at(&self, offset: u64, length: usize) -> Vec<u8> {
        let period = self.frames.len() as u64;
        let mut out = Vec::with_capacity(length);

        for i in 0..length as u64 {
            out.push(self.frames[((offset + i) % period) as usize]);
        }

        out
    }
}

impl Default for PlaceholderStream {
    fn default() -> Self {
        Self::new(config::PLACEHOLDER_MIN_LEN, config::PLACEHOLDER_REPORTED_LEN)
    }
}
