use std::time::Duration;

use crate::error::EncodeError;

/// Output format of the speech models: 24 kHz mono signed 16-bit little-endian.
pub const PCM_SAMPLE_RATE: u32 = 24_000;
pub const PCM_CHANNELS: u16 = 1;
pub const PCM_BITS_PER_SAMPLE: u16 = 16;

pub const WAV_HEADER_LEN: usize = 44;

/// Wrap raw PCM samples in a canonical 44-byte RIFF/WAVE header.
///
/// The output is a pure function of the arguments.
pub fn encode_wav(
    pcm: &[u8],
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
) -> Result<Vec<u8>, EncodeError> {
    if pcm.is_empty() {
        return Err(EncodeError::Empty);
    }
    if channels == 0 {
        return Err(EncodeError::NoChannels);
    }
    if bits_per_sample == 0 || bits_per_sample % 8 != 0 {
        return Err(EncodeError::BitDepth(bits_per_sample));
    }

    let bytes_per_sample = u32::from(bits_per_sample / 8);
    let block_align = u32::from(channels) * bytes_per_sample;
    if pcm.len() % block_align as usize != 0 {
        return Err(EncodeError::Misaligned {
            len: pcm.len(),
            block_align: block_align as usize,
        });
    }
    let data_len = u32::try_from(pcm.len())
        .ok()
        .filter(|len| len.checked_add(36).is_some())
        .ok_or(EncodeError::TooLarge(pcm.len()))?;
    let byte_rate = sample_rate
        .checked_mul(block_align)
        .ok_or(EncodeError::TooLarge(pcm.len()))?;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&(block_align as u16).to_le_bytes());
    out.extend_from_slice(&bits_per_sample.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(pcm);
    Ok(out)
}

/// `encode_wav` with the speech model's fixed format.
pub fn encode_speech_pcm(pcm: &[u8]) -> Result<Vec<u8>, EncodeError> {
    encode_wav(pcm, PCM_SAMPLE_RATE, PCM_CHANNELS, PCM_BITS_PER_SAMPLE)
}

/// Sample rate announced in a raw PCM MIME type such as
/// `audio/L16;codec=pcm;rate=24000`, or the speech model default.
pub fn pcm_rate_from_mime(mime_type: &str) -> u32 {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.trim().parse::<u32>().ok())
        .filter(|rate| *rate > 0)
        .unwrap_or(PCM_SAMPLE_RATE)
}

/// Playback length of `pcm_len` bytes, or `None` when the format is degenerate.
pub fn pcm_duration(pcm_len: usize, sample_rate: u32, channels: u16, bits_per_sample: u16) -> Option<Duration> {
    let bytes_per_second =
        u64::from(sample_rate) * u64::from(channels) * u64::from(bits_per_sample / 8);
    if bytes_per_second == 0 {
        return None;
    }
    let millis = (pcm_len as u64).saturating_mul(1_000) / bytes_per_second;
    Some(Duration::from_millis(millis))
}
