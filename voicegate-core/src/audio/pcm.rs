//! PCM format helpers.
//!
//! The engine's wire format is little-endian 16-bit mono PCM; capture
//! backends and resamplers work in f32. These conversions are the only
//! place the crate crosses between the two.

/// Decode little-endian i16 bytes into `out`, replacing its contents.
///
/// A trailing odd byte is ignored; the engine only ever passes whole
/// frames, which are always even-sized.
pub fn bytes_to_samples(bytes: &[u8], out: &mut Vec<i16>) {
    out.clear();
    out.reserve(bytes.len() / 2);
    for pair in bytes.chunks_exact(2) {
        out.push(i16::from_le_bytes([pair[0], pair[1]]));
    }
}

/// Encode samples as little-endian bytes into `out`, replacing its
/// contents.
pub fn samples_to_bytes(samples: &[i16], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(samples.len() * 2);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
}

/// Normalize i16 samples to f32 in [-1, 1], replacing `out`'s
/// contents. The resampler works in f32.
pub fn samples_to_f32(samples: &[i16], out: &mut Vec<f32>) {
    out.clear();
    out.reserve(samples.len());
    for &sample in samples {
        out.push(f32::from(sample) / 32768.0);
    }
}

/// Convert one normalized f32 sample to i16, clamping out-of-range
/// input instead of wrapping.
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// Convert normalized f32 samples straight to little-endian i16 bytes,
/// replacing the contents of `out`.
pub fn f32_to_bytes(samples: &[f32], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(samples.len() * 2);
    for &sample in samples {
        out.extend_from_slice(&f32_to_i16(sample).to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_and_samples_round_trip() {
        let samples = vec![0i16, 1, -1, i16::MAX, i16::MIN, 12345, -12345];
        let mut bytes = Vec::new();
        samples_to_bytes(&samples, &mut bytes);
        assert_eq!(bytes.len(), samples.len() * 2);

        let mut decoded = Vec::new();
        bytes_to_samples(&bytes, &mut decoded);
        assert_eq!(decoded, samples);
    }

    #[test]
    fn trailing_odd_byte_is_ignored() {
        let mut out = Vec::new();
        bytes_to_samples(&[0x34, 0x12, 0xff], &mut out);
        assert_eq!(out, vec![0x1234]);
    }

    #[test]
    fn conversions_replace_previous_contents() {
        let mut out = vec![9i16; 4];
        bytes_to_samples(&[0x01, 0x00], &mut out);
        assert_eq!(out, vec![1]);

        let mut bytes = vec![7u8; 4];
        samples_to_bytes(&[1], &mut bytes);
        assert_eq!(bytes, vec![0x01, 0x00]);
    }

    #[test]
    fn f32_conversion_clamps() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), 32767);
        assert_eq!(f32_to_i16(-1.0), -32767);
        assert_eq!(f32_to_i16(2.5), 32767);
        assert_eq!(f32_to_i16(-2.5), -32767);
    }

    #[test]
    fn samples_to_f32_normalizes() {
        let mut out = vec![9.0f32; 2];
        samples_to_f32(&[0, 16384, -16384, i16::MIN], &mut out);
        assert_eq!(out, vec![0.0, 0.5, -0.5, -1.0]);
    }

    #[test]
    fn f32_to_bytes_matches_manual_conversion() {
        let mut bytes = Vec::new();
        f32_to_bytes(&[0.0, 0.5, -0.5], &mut bytes);

        let mut decoded = Vec::new();
        bytes_to_samples(&bytes, &mut decoded);
        assert_eq!(decoded, vec![0, 16383, -16383]);
    }
}
