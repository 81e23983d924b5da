use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::compare::{
    BatchCompareReport, BatchCompareRequest, CompareReport, CompareRequest, ModelResult,
};
use crate::models::job::JobStatus;
use crate::services::evaluation;
use crate::services::gemini::{select_models, ModelError, ModelRunner, SelectedModel};
use crate::services::progress::ProgressReporter;
use crate::services::queue::{JobQueue, JobUpdate, QueueError};
use crate::services::storage::{mime_for_path, StorageError, VideoStorage};

// Fixed duration estimate the progress extrapolation runs against. A
// cosmetic heuristic with no accuracy guarantee.
const MODEL_STAGE_ESTIMATE: Duration = Duration::from_secs(60);

/// Drives a comparison job from PENDING to a terminal state.
///
/// Stages are strictly ordered per job: validate, run models, evaluate,
/// persist result. Cancellation is checked between stages and between batch
/// combinations, never mid-request.
pub struct ComparisonPipeline {
    queue: Arc<JobQueue>,
    videos: Arc<VideoStorage>,
    runner: Arc<dyn ModelRunner>,
}

impl ComparisonPipeline {
    pub fn new(
        queue: Arc<JobQueue>,
        videos: Arc<VideoStorage>,
        runner: Arc<dyn ModelRunner>,
    ) -> Self {
        Self {
            queue,
            videos,
            runner,
        }
    }

    /// Run a single-comparison job to completion.
    pub async fn run_single(
        &self,
        job_id: Uuid,
        request: CompareRequest,
        token: CancellationToken,
    ) -> Result<(), PipelineError> {
        let started = Instant::now();
        self.queue
            .update(
                job_id,
                JobUpdate::status(JobStatus::Running)
                    .with_progress(5)
                    .with_message("Validating request"),
            )
            .await?;

        let models = select_models(request.models.as_deref())?;
        let path = self
            .videos
            .resolve(request.video_id)
            .await?
            .ok_or(PipelineError::VideoNotFound(request.video_id))?;

        self.queue
            .update(job_id, JobUpdate::progress(10, "Loading video"))
            .await?;
        let video = tokio::fs::read(&path).await?;
        let mime_type = mime_for_path(&path);

        if token.is_cancelled() {
            return Ok(());
        }

        let Some(report) = self
            .run_combination(
                job_id,
                request.video_id,
                &video,
                mime_type,
                &request.prompt,
                &models,
                10,
                85,
                &token,
            )
            .await
        else {
            return Ok(());
        };

        self.queue
            .update(job_id, JobUpdate::completed(serde_json::to_value(&report)?))
            .await?;
        record_completion(started);
        tracing::info!(job_id = %job_id, models = models.len(), "Comparison job completed");
        Ok(())
    }

    /// Run a batch job: the cartesian product of videos and prompts,
    /// sequentially combination by combination to bound load on the model
    /// API, with the selected models in parallel inside each combination.
    pub async fn run_batch(
        &self,
        job_id: Uuid,
        request: BatchCompareRequest,
        token: CancellationToken,
    ) -> Result<(), PipelineError> {
        let started = Instant::now();
        self.queue
            .update(
                job_id,
                JobUpdate::status(JobStatus::Running)
                    .with_progress(5)
                    .with_message("Validating request"),
            )
            .await?;

        let models = select_models(request.models.as_deref())?;

        let mut resolved = Vec::with_capacity(request.video_ids.len());
        for video_id in &request.video_ids {
            let path = self
                .videos
                .resolve(*video_id)
                .await?
                .ok_or(PipelineError::VideoNotFound(*video_id))?;
            resolved.push((*video_id, path));
        }

        let total = request.video_ids.len() * request.prompts.len();
        // Combinations share the 10..95 band, each getting a sub-range
        // proportional to 1 / total.
        let combo_span = 85.0 / total as f64;

        let mut comparisons = Vec::with_capacity(total);
        for (video_index, (video_id, path)) in resolved.iter().enumerate() {
            let video = tokio::fs::read(path).await?;
            let mime_type = mime_for_path(path);

            for (prompt_index, prompt) in request.prompts.iter().enumerate() {
                if token.is_cancelled() {
                    return Ok(());
                }

                let combo_index = video_index * request.prompts.len() + prompt_index;
                let base = (10.0 + combo_span * combo_index as f64) as u8;
                let span = combo_span.max(1.0) as u8;

                tracing::info!(
                    job_id = %job_id,
                    combination = combo_index + 1,
                    total,
                    video_id = %video_id,
                    "Processing batch combination"
                );

                let Some(report) = self
                    .run_combination(
                        job_id, *video_id, &video, mime_type, prompt, &models, base, span, &token,
                    )
                    .await
                else {
                    return Ok(());
                };
                comparisons.push(report);

                let done = (10.0 + combo_span * (combo_index + 1) as f64) as u8;
                self.queue
                    .update(
                        job_id,
                        JobUpdate::progress(
                            done,
                            format!("Completed combination {}/{}", combo_index + 1, total),
                        ),
                    )
                    .await?;
            }
        }

        let report = BatchCompareReport {
            comparisons,
            total_videos: request.video_ids.len(),
            total_prompts: request.prompts.len(),
            total_combinations: total,
        };
        self.queue
            .update(job_id, JobUpdate::completed(serde_json::to_value(&report)?))
            .await?;
        record_completion(started);
        tracing::info!(job_id = %job_id, combinations = total, "Batch comparison job completed");
        Ok(())
    }

    /// Run one (video, prompt) combination: models in parallel, then one
    /// judge call over the collected results. Returns `None` when the job
    /// was cancelled between stages.
    #[allow(clippy::too_many_arguments)]
    async fn run_combination(
        &self,
        job_id: Uuid,
        video_id: Uuid,
        video: &[u8],
        mime_type: &str,
        prompt: &str,
        models: &[SelectedModel],
        base: u8,
        span: u8,
        token: &CancellationToken,
    ) -> Option<CompareReport> {
        // Leave headroom below the evaluation phase: the estimator may not
        // pass 3/4 of this combination's sub-range while models run.
        let models_cap = base + (span as f64 * 0.75) as u8;

        let reporter = ProgressReporter::spawn(
            Arc::clone(&self.queue),
            job_id,
            base,
            models_cap - base,
            MODEL_STAGE_ESTIMATE,
            format!("Running {} models", models.len()),
        );

        let calls = models
            .iter()
            .map(|model| self.run_model(model, video, mime_type, prompt));
        let results: Vec<ModelResult> = join_all(calls).await;

        // Join the estimator before the authoritative write so a stale
        // estimate cannot land after it.
        reporter.finish().await;
        let _ = self
            .queue
            .update(
                job_id,
                JobUpdate::progress(models_cap, "Collecting model responses"),
            )
            .await;

        if token.is_cancelled() {
            return None;
        }

        let eval_pct = base + (span as f64 * 0.9) as u8;
        let _ = self
            .queue
            .update(
                job_id,
                JobUpdate::progress(eval_pct, "Evaluating responses"),
            )
            .await;

        let (evaluation, summary) =
            evaluation::evaluate_results(self.runner.as_ref(), prompt, &results).await;

        Some(CompareReport {
            video_id,
            prompt: prompt.to_string(),
            results,
            evaluation: (!evaluation.is_empty()).then_some(evaluation),
            overall_summary: (!summary.is_empty()).then_some(summary),
        })
    }

    /// Invoke one model; failures become that model's result entry and
    /// never abort sibling calls or the job.
    async fn run_model(
        &self,
        model: &SelectedModel,
        video: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> ModelResult {
        let started = Instant::now();
        match self
            .runner
            .run_video_prompt(&model.id, video, mime_type, prompt)
            .await
        {
            Ok(response) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                tracing::info!(model = %model.name, latency_ms, "Model call completed");
                ModelResult {
                    model_name: model.name.clone(),
                    model_id: model.id.clone(),
                    response,
                    error: None,
                    latency_ms,
                }
            }
            Err(e) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(model = %model.name, latency_ms, error = %e, "Model call failed");
                ModelResult {
                    model_name: model.name.clone(),
                    model_id: model.id.clone(),
                    response: String::new(),
                    error: Some(e.to_string()),
                    latency_ms,
                }
            }
        }
    }
}

fn record_completion(started: Instant) {
    metrics::counter!("comparison_jobs_completed").increment(1);
    metrics::histogram!("comparison_job_duration_seconds").record(started.elapsed().as_secs_f64());
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Video not found: {0}")]
    VideoNotFound(Uuid),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to read video file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize result payload: {0}")]
    Serialize(#[from] serde_json::Error),
}
