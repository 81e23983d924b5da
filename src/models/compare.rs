use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to compare models on a single video and prompt.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompareRequest {
    #[garde(skip)]
    pub video_id: Uuid,

    #[garde(length(min = 1, max = 4000))]
    pub prompt: String,

    /// Subset of supported models to run; all of them when omitted.
    #[garde(skip)]
    pub models: Option<Vec<String>>,
}

/// Request to compare models across every video x prompt combination.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchCompareRequest {
    #[garde(length(min = 1, max = 20))]
    pub video_ids: Vec<Uuid>,

    #[garde(length(min = 1, max = 20), inner(length(min = 1, max = 4000)))]
    pub prompts: Vec<String>,

    #[garde(skip)]
    pub models: Option<Vec<String>>,
}

/// Outcome of one model invocation. Exactly one of a non-empty `response`
/// or a non-empty `error` holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResult {
    pub model_name: String,
    pub model_id: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: u64,
}

/// Per-model judgement produced by the evaluation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationScore {
    pub model_name: String,
    pub score: u8,
    pub reasoning: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

/// Assembled output for one (video, prompt) combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareReport {
    pub video_id: Uuid,
    pub prompt: String,
    pub results: Vec<ModelResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Vec<EvaluationScore>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_summary: Option<String>,
}

/// Assembled output for a batch job: one report per combination plus totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCompareReport {
    pub comparisons: Vec<CompareReport>,
    pub total_videos: usize,
    pub total_prompts: usize,
    pub total_combinations: usize,
}

/// Response after a comparison job has been created and queued.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobAccepted {
    pub job_id: Uuid,
    pub status: String,
    pub message: String,
}
