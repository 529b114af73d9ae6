//! Wrap raw 16-bit PCM in a WAV container.

pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const HEADER_LEN: usize = 44;

/// Sample rate from an `audio/L16;codec=pcm;rate=24000` style mime type.
pub fn sample_rate_from_mime(mime: &str) -> u32 {
    mime.split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
        .unwrap_or(DEFAULT_SAMPLE_RATE)
}

/// Build a mono 16-bit WAV file from little-endian PCM bytes.
///
/// A trailing odd byte is dropped.
pub fn pcm16_to_wav(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    let data = &pcm[..pcm.len() - pcm.len() % 2];
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let byte_rate = sample_rate * u32::from(block_align);
    let data_len = data.len() as u32;

    let mut wav = Vec::with_capacity(HEADER_LEN + data.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(data);
    wav
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(buf: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
    }

    fn u16_at(buf: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(buf[offset..offset + 2].try_into().unwrap())
    }

    #[test]
    fn header_describes_mono_pcm16() {
        let pcm = [0x01, 0x00, 0xff, 0x7f];
        let wav = pcm16_to_wav(&pcm, 24_000);

        assert_eq!(wav.len(), 44 + 4);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4), 40);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u16_at(&wav, 20), 1);
        assert_eq!(u16_at(&wav, 22), 1);
        assert_eq!(u32_at(&wav, 24), 24_000);
        assert_eq!(u32_at(&wav, 28), 48_000);
        assert_eq!(u16_at(&wav, 32), 2);
        assert_eq!(u16_at(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), 4);
        assert_eq!(&wav[44..], &pcm);
    }

    #[test]
    fn odd_trailing_byte_is_dropped() {
        let wav = pcm16_to_wav(&[1, 2, 3], 16_000);
        assert_eq!(u32_at(&wav, 40), 2);
        assert_eq!(wav.len(), 46);
    }

    #[test]
    fn sample_rate_parsing() {
        assert_eq!(sample_rate_from_mime("audio/L16;codec=pcm;rate=16000"), 16_000);
        assert_eq!(sample_rate_from_mime("audio/L16; rate=8000"), 8_000);
        assert_eq!(sample_rate_from_mime("audio/L16"), DEFAULT_SAMPLE_RATE);
        assert_eq!(sample_rate_from_mime("audio/L16;rate=abc"), DEFAULT_SAMPLE_RATE);
    }
}
