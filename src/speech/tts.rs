use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use super::backoff::{Attempt, Backoff};
use super::wav::{pcm16_to_wav, sample_rate_from_mime};
use super::{Speaker, SpeechError, Utterance};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-tts:generateContent";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct TtsOptions {
    pub endpoint: String,
    pub api_key: String,
    pub backoff: Backoff,
    /// Where clips are kept. Without it clips go to the temp dir and are removed after playback.
    pub clip_dir: Option<PathBuf>,
    /// Command run with the clip path as its only argument, e.g. `aplay`.
    pub player: Option<String>,
}

impl TtsOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            backoff: Backoff::default(),
            clip_dir: None,
            player: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'static str; 1],
    speech_config: SpeechConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoice<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoice<'a> {
    voice_name: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn new(utterance: &'a Utterance) -> Self {
        Self {
            contents: [RequestContent {
                parts: [TextPart {
                    text: &utterance.text,
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["AUDIO"],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoice {
                            voice_name: utterance.voice,
                        },
                    },
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

/// Pull the first audio part out of a response and turn it into a WAV clip.
fn clip_from_response(response: GenerateResponse) -> Result<Vec<u8>, SpeechError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(SpeechError::NoCandidate)?;
    let audio = candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.inline_data)
        .ok_or(SpeechError::MissingAudio)?;

    if !audio.mime_type.starts_with("audio/L16") {
        return Err(SpeechError::UnsupportedFormat(audio.mime_type));
    }

    let pcm = STANDARD.decode(audio.data.as_bytes())?;
    Ok(pcm16_to_wav(&pcm, sample_rate_from_mime(&audio.mime_type)))
}

fn clip_name(n: u64) -> String {
    format!("atm-{}-{n}.wav", std::process::id())
}

/// Text-to-speech over the Gemini `generateContent` API.
pub struct TtsClient {
    http: reqwest::Client,
    options: TtsOptions,
    clips: AtomicU64,
}

impl TtsClient {
    pub fn new(options: TtsOptions) -> Result<Self, SpeechError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            options,
            clips: AtomicU64::new(0),
        })
    }

    /// Request audio for `utterance`, retrying while rate limited.
    pub async fn synthesize(&self, utterance: &Utterance) -> Result<Vec<u8>, SpeechError> {
        let body = GenerateRequest::new(utterance);
        let response = self
            .options
            .backoff
            .retry(|attempt| {
                let request = self
                    .http
                    .post(&self.options.endpoint)
                    .header(API_KEY_HEADER, self.options.api_key.as_str())
                    .json(&body);
                async move {
                    let response = match request.send().await {
                        Ok(response) => response,
                        Err(e) if e.is_timeout() || e.is_connect() => {
                            return Err(Attempt::Retry(SpeechError::Http(e.without_url())));
                        }
                        Err(e) => return Err(Attempt::Fail(SpeechError::Http(e.without_url()))),
                    };
                    let status = response.status();
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        return Err(Attempt::Retry(SpeechError::RateLimited {
                            attempts: attempt + 1,
                        }));
                    }
                    if !status.is_success() {
                        return Err(Attempt::Fail(SpeechError::Status(status.as_u16())));
                    }
                    response
                        .json::<GenerateResponse>()
                        .await
                        .map_err(|e| Attempt::Fail(SpeechError::Http(e.without_url())))
                }
            })
            .await?;

        clip_from_response(response)
    }

    /// Save the clip and hand it to the player, if one is configured.
    pub async fn play(&self, wav: &[u8]) -> Result<(), SpeechError> {
        let (dir, keep) = match (&self.options.clip_dir, &self.options.player) {
            (Some(dir), _) => (dir.clone(), true),
            (None, Some(_)) => (std::env::temp_dir(), false),
            (None, None) => {
                debug!(bytes = wav.len(), "no player or clip dir configured, clip dropped");
                return Ok(());
            }
        };

        let n = self.clips.fetch_add(1, Ordering::Relaxed);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(clip_name(n));
        tokio::fs::write(&path, wav).await?;

        let played = match &self.options.player {
            Some(player) => match Command::new(player).arg(&path).status().await {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(SpeechError::Player {
                    player: player.clone(),
                    status,
                }),
                Err(e) => Err(SpeechError::Io(e)),
            },
            None => {
                info!(path = %path.display(), "clip saved");
                Ok(())
            }
        };

        if !keep {
            let _ = tokio::fs::remove_file(&path).await;
        }
        played
    }
}

#[async_trait]
impl Speaker for TtsClient {
    async fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        let wav = self.synthesize(utterance).await?;
        self.play(&wav).await
    }
}
