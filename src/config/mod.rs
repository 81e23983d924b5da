use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Gemini API key used for all model and judge calls.
    pub gemini_api_key: String,

    /// Directory for uploaded video files.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Directory for persisted job records (one JSON file per job).
    #[serde(default = "default_jobs_dir")]
    pub jobs_dir: String,

    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Model used for the cross-model evaluation step.
    #[serde(default = "default_judge_model")]
    pub judge_model: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_upload_dir() -> String {
    "./uploads".to_string()
}

fn default_jobs_dir() -> String {
    "./jobs".to_string()
}

fn default_max_upload_bytes() -> usize {
    500 * 1024 * 1024 // 500 MB
}

fn default_judge_model() -> String {
    "gemini-3-pro-preview".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
