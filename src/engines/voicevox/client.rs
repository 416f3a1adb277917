use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;

use crate::{EngineError, Speaker, SynthesisEngine, VoiceParams};

use super::speakers::parse_speakers;

/// Client for a VOICEVOX-compatible engine.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Clone)]
pub struct VoicevoxEngine {
    http: Client,
    base_url: String,
}

impl VoicevoxEngine {
    /// Create a client for the engine at `base_url` (e.g. `http://127.0.0.1:50021`).
    pub fn new(base_url: &str) -> Result<Self, EngineError> {
        let http = Client::builder()
            .build()
            .map_err(|e| EngineError::Transport(e.to_string()))?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client that reuses an existing `reqwest` client.
    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Engine version string. Succeeds only when the engine is up and answering.
    pub async fn version(&self) -> Result<String, EngineError> {
        let response = self
            .http
            .get(self.url("version"))
            .send()
            .await
            .map_err(transport)?;
        let body = check_status(response).await?.text().await.map_err(transport)?;
        Ok(body.trim().trim_matches('"').to_string())
    }

    async fn audio_query(&self, text: &str, speaker_id: u32) -> Result<Value, EngineError> {
        let speaker = speaker_id.to_string();
        let response = self
            .http
            .post(self.url("audio_query"))
            .query(&[("text", text), ("speaker", speaker.as_str())])
            .send()
            .await
            .map_err(transport)?;
        check_status(response)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| EngineError::InvalidResponse(format!("audio_query: {e}")))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

#[async_trait]
impl SynthesisEngine for VoicevoxEngine {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<Vec<u8>, EngineError> {
        let mut query = self.audio_query(text, voice.speaker_id).await?;
        apply_voice(&mut query, voice)?;

        let speaker = voice.speaker_id.to_string();
        let response = self
            .http
            .post(self.url("synthesis"))
            .query(&[("speaker", speaker.as_str())])
            .json(&query)
            .send()
            .await
            .map_err(transport)?;
        let audio = check_status(response).await?.bytes().await.map_err(transport)?;

        if audio.is_empty() {
            return Err(EngineError::InvalidResponse(
                "synthesis returned an empty body".to_string(),
            ));
        }
        Ok(audio.to_vec())
    }

    async fn speakers(&self) -> Result<Vec<Speaker>, EngineError> {
        let response = self
            .http
            .get(self.url("speakers"))
            .send()
            .await
            .map_err(transport)?;
        let body = check_status(response).await?.bytes().await.map_err(transport)?;
        parse_speakers(&body)
    }
}

/// Write the voice parameters into an `audio_query` result.
fn apply_voice(query: &mut Value, voice: &VoiceParams) -> Result<(), EngineError> {
    let fields = query.as_object_mut().ok_or_else(|| {
        EngineError::InvalidResponse("audio_query did not return a JSON object".to_string())
    })?;
    fields.insert("pitchScale".to_string(), Value::from(voice.pitch));
    fields.insert(
        "intonationScale".to_string(),
        Value::from(voice.intonation_scale),
    );
    fields.insert("speedScale".to_string(), Value::from(voice.speed));
    Ok(())
}

async fn check_status(response: Response) -> Result<Response, EngineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(EngineError::Status {
        status: status.as_u16(),
        body,
    })
}

fn transport(e: reqwest::Error) -> EngineError {
    EngineError::Transport(e.to_string())
}
