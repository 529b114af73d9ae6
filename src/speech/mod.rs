//! Spoken feedback.
//!
//! The controller only pushes [`Utterance`]s into a channel. A background
//! worker drains it and hands each one to a [`Speaker`]; failures are logged
//! and dropped so the session never waits on audio.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

mod backoff;
mod tts;
mod wav;

pub use backoff::{Attempt, Backoff};
pub use tts::{DEFAULT_ENDPOINT, TtsClient, TtsOptions};
pub use wav::{DEFAULT_SAMPLE_RATE, pcm16_to_wav, sample_rate_from_mime};

/// Text to be spoken with a given voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub voice: &'static str,
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("tts request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tts service returned status {0}")]
    Status(u16),

    #[error("tts service still rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("tts response has no candidate")]
    NoCandidate,

    #[error("tts response has no audio data")]
    MissingAudio,

    #[error("unsupported audio format '{0}'")]
    UnsupportedFormat(String),

    #[error("invalid base64 audio: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("failed to save clip: {0}")]
    Io(#[from] std::io::Error),

    #[error("player '{player}' exited with {status}")]
    Player {
        player: String,
        status: std::process::ExitStatus,
    },
}

#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError>;
}

/// Speaker used when feedback is disabled or not configured.
pub struct Muted;

#[async_trait]
impl Speaker for Muted {
    async fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        debug!(voice = utterance.voice, text = %utterance.text, "speech muted");
        Ok(())
    }
}

/// Start the feedback worker. Utterances are spoken one at a time, in order.
///
/// The worker stops once every sender is dropped.
pub fn spawn_worker(
    speaker: Arc<dyn Speaker>,
) -> (mpsc::UnboundedSender<Utterance>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Utterance>();
    let handle = tokio::spawn(async move {
        while let Some(utterance) = rx.recv().await {
            if let Err(e) = speaker.speak(&utterance).await {
                warn!(voice = utterance.voice, error = %e, "spoken feedback failed");
            }
        }
    });
    (tx, handle)
}
