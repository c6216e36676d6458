mod wav;

pub use wav::{
    encode_speech_pcm, encode_wav, pcm_duration, pcm_rate_from_mime, PCM_BITS_PER_SAMPLE, PCM_CHANNELS,
    PCM_SAMPLE_RATE, WAV_HEADER_LEN,
};
