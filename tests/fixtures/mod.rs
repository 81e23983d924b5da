//! Shared test fixtures: a scriptable model runner and canned payloads.

use async_trait::async_trait;
use std::time::Duration;

use video_compare::services::gemini::{ModelError, ModelRunner};

/// A judge verdict that parses into two evaluation scores.
pub const JUDGE_VERDICT_JSON: &str = r#"{
    "evaluations": [
        {
            "model_name": "gemini-2.5-flash",
            "score": 8,
            "reasoning": "Accurate and well organized.",
            "strengths": ["accuracy", "structure"],
            "weaknesses": ["little detail on audio"]
        },
        {
            "model_name": "gemini-2.5-pro",
            "score": 6,
            "reasoning": "Thorough but slow to the point.",
            "strengths": ["depth"],
            "weaknesses": ["verbosity"]
        }
    ],
    "overall_summary": "Flash answered more directly; Pro gave more depth."
}"#;

/// A judge reply that is not parseable as structured JSON.
pub const BROKEN_JUDGE_REPLY: &str = "As a language model, here are my thoughts in prose...";

/// Scriptable stand-in for the Gemini API so tests never touch the network.
pub struct ScriptedRunner {
    pub failing_models: Vec<String>,
    pub judge_reply: Option<String>,
    pub call_delay: Duration,
}

impl ScriptedRunner {
    /// Every model succeeds and the judge returns a valid verdict.
    pub fn healthy() -> Self {
        Self {
            failing_models: Vec::new(),
            judge_reply: Some(JUDGE_VERDICT_JSON.to_string()),
            call_delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    pub fn with_failing_model(mut self, model_id: &str) -> Self {
        self.failing_models.push(model_id.to_string());
        self
    }

    pub fn with_judge_reply(mut self, reply: &str) -> Self {
        self.judge_reply = Some(reply.to_string());
        self
    }
}

#[async_trait]
impl ModelRunner for ScriptedRunner {
    async fn run_video_prompt(
        &self,
        model_id: &str,
        _video: &[u8],
        _mime_type: &str,
        prompt: &str,
    ) -> Result<String, ModelError> {
        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
        if self.failing_models.iter().any(|m| m == model_id) {
            return Err(ModelError::Api {
                status: 503,
                detail: "model overloaded".to_string(),
            });
        }
        Ok(format!("{model_id} response to: {prompt}"))
    }

    async fn run_judge(&self, _prompt: &str) -> Result<String, ModelError> {
        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
        match &self.judge_reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(ModelError::EmptyResponse),
        }
    }
}

/// A few KB of bytes that look vaguely like an MP4 container.
pub fn sample_video_bytes() -> Vec<u8> {
    let mut bytes = b"\x00\x00\x00\x20ftypisom".to_vec();
    bytes.extend(std::iter::repeat(0xAB).take(4096));
    bytes
}
