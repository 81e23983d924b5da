use serde::Deserialize;

use crate::models::compare::{EvaluationScore, ModelResult};
use crate::services::gemini::ModelRunner;

/// Structured verdict expected back from the judge model.
#[derive(Debug, Deserialize)]
struct JudgeVerdict {
    evaluations: Vec<EvaluationScore>,
    #[serde(default)]
    overall_summary: String,
}

/// Build the evaluation prompt embedding every model's output.
///
/// Failed models are included as `[ERROR: …]` placeholders so the judge can
/// account for them rather than scoring an incomplete field.
pub fn build_judge_prompt(prompt: &str, results: &[ModelResult]) -> String {
    let mut eval_prompt = format!(
        "You are an expert evaluator of AI video understanding capabilities.\n\n\
         The user asked the following question about a video:\n\"{prompt}\"\n\n\
         Here are the responses from different AI models:\n\n"
    );

    for result in results {
        match &result.error {
            Some(error) => {
                eval_prompt.push_str(&format!(
                    "### {}\n[ERROR: {}]\n\n",
                    result.model_name, error
                ));
            }
            None => {
                eval_prompt.push_str(&format!(
                    "### {}\n{}\n\n",
                    result.model_name, result.response
                ));
            }
        }
    }

    eval_prompt.push_str(
        "Evaluate each model's response based on how well it addresses the user's \
         specific question. Consider relevance and accuracy, completeness, \
         specificity, timestamp quality where requested, technical insight, \
         actionability, and organization. Weight the criteria based on the \
         prompt's focus.\n\n",
    );

    eval_prompt.push_str(
        r#"Provide your evaluation in the following JSON format:
{
    "evaluations": [
        {
            "model_name": "model name",
            "score": 8,
            "reasoning": "Brief explanation of the score",
            "strengths": ["strength 1", "strength 2"],
            "weaknesses": ["weakness 1", "weakness 2"]
        }
    ],
    "overall_summary": "A brief comparison summary of all models"
}

Respond ONLY with the JSON, no additional text."#,
    );

    eval_prompt
}

/// Parse the judge's reply, tolerating a markdown code fence around the JSON.
pub fn parse_judge_reply(
    reply: &str,
) -> Result<(Vec<EvaluationScore>, String), serde_json::Error> {
    let cleaned = strip_code_fence(reply.trim());
    let verdict: JudgeVerdict = serde_json::from_str(cleaned)?;
    Ok((verdict.evaluations, verdict.overall_summary))
}

/// Run the judge once over one combination's results.
///
/// Degrades instead of failing: a judge call error or unparseable reply
/// yields an empty evaluation list and an explanatory summary, because
/// partial comparison results without scores are still useful.
pub async fn evaluate_results(
    runner: &dyn ModelRunner,
    prompt: &str,
    results: &[ModelResult],
) -> (Vec<EvaluationScore>, String) {
    let judge_prompt = build_judge_prompt(prompt, results);

    match runner.run_judge(&judge_prompt).await {
        Ok(reply) => match parse_judge_reply(&reply) {
            Ok((evaluations, summary)) => (evaluations, summary),
            Err(e) => {
                tracing::warn!(error = %e, "Judge reply was not valid JSON, skipping evaluation");
                (
                    Vec::new(),
                    format!("Evaluation failed: judge reply was not valid JSON: {e}"),
                )
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Judge call failed, skipping evaluation");
            (Vec::new(), format!("Evaluation failed: {e}"))
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
