use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    pub workflows: WorkflowsConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
}

/// Remote service connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Timeout for JSON API calls in seconds (default: 30)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Timeout for file uploads in seconds (default: 120)
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,
    /// Timeout for artifact downloads in seconds (default: 300)
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            request_timeout_secs: default_request_timeout(),
            upload_timeout_secs: default_upload_timeout(),
            download_timeout_secs: default_download_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.runninghub.cn".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_upload_timeout() -> u64 {
    120
}

fn default_download_timeout() -> u64 {
    300
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    5000
}

/// Local directories
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("Input")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("Output")
}

/// Status polling budget
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_secs: default_interval(),
        }
    }
}

fn default_max_attempts() -> u32 {
    60
}

fn default_interval() -> u64 {
    10
}

/// Batch orchestration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Pipelines allowed in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Whole-pipeline re-runs after a failure (0 = none).
    #[serde(default)]
    pub pipeline_retries: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            pipeline_retries: 0,
        }
    }
}

fn default_max_concurrent() -> usize {
    3
}

/// Workflow ids and node bindings. Node and field names are opaque
/// per-workflow values; nothing here is inferred.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowsConfig {
    pub video: VideoWorkflowConfig,
    #[serde(default)]
    pub image: Option<ImageWorkflowConfig>,
    #[serde(default)]
    pub pose: Option<PoseWorkflowConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoWorkflowConfig {
    pub landscape: String,
    pub portrait: String,
    pub node_id: String,
    #[serde(default = "default_video_field")]
    pub field_name: String,
}

fn default_video_field() -> String {
    "video".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageWorkflowConfig {
    pub workflow_id: String,
    pub node_id: String,
    #[serde(default = "default_image_field")]
    pub field_name: String,
}

fn default_image_field() -> String {
    "image".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoseWorkflowConfig {
    pub workflow_id: String,
    #[serde(default = "default_pose_source_node")]
    pub source_image_node_id: String,
    #[serde(default = "default_pose_pose_node")]
    pub pose_image_node_id: String,
    #[serde(default = "default_pose_prompt1_node")]
    pub prompt1_node_id: String,
    #[serde(default = "default_pose_prompt2_node")]
    pub prompt2_node_id: String,
    /// EmptyLatentImage node controlling output width/height.
    #[serde(default = "default_pose_latent_node")]
    pub latent_node_id: String,
    #[serde(default)]
    pub default_prompt1: String,
    #[serde(default)]
    pub default_prompt2: String,
}

fn default_pose_source_node() -> String {
    "24".to_string()
}

fn default_pose_pose_node() -> String {
    "21".to_string()
}

fn default_pose_prompt1_node() -> String {
    "25".to_string()
}

fn default_pose_prompt2_node() -> String {
    "35".to_string()
}

fn default_pose_latent_node() -> String {
    "38".to_string()
}

/// Local media probing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: default_ffprobe_path(),
        }
    }
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub api: SanitizedApiConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub poll: PollConfig,
    pub batch: BatchConfig,
    pub workflows: WorkflowsConfig,
}

/// Api config with the key hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedApiConfig {
    pub base_url: String,
    pub api_key_configured: bool,
    pub request_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub download_timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            api: SanitizedApiConfig {
                base_url: config.api.base_url.clone(),
                api_key_configured: !config.api.api_key.is_empty(),
                request_timeout_secs: config.api.request_timeout_secs,
                upload_timeout_secs: config.api.upload_timeout_secs,
                download_timeout_secs: config.api.download_timeout_secs,
            },
            server: config.server.clone(),
            storage: config.storage.clone(),
            poll: config.poll.clone(),
            batch: config.batch.clone(),
            workflows: config.workflows.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[api]
api_key = "k"

[workflows.video]
landscape = "111"
portrait = "222"
node_id = "184"
"#;

    #[test]
    fn test_deserialize_minimal_config() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.api.base_url, "https://www.runninghub.cn");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.poll.max_attempts, 60);
        assert_eq!(config.poll.interval(), Duration::from_secs(10));
        assert_eq!(config.batch.max_concurrent, 3);
        assert_eq!(config.batch.pipeline_retries, 0);
        assert_eq!(config.workflows.video.field_name, "video");
        assert!(config.workflows.image.is_none());
        assert!(config.workflows.pose.is_none());
        assert_eq!(config.storage.output_dir, PathBuf::from("Output"));
    }

    #[test]
    fn test_deserialize_missing_workflows_fails() {
        let toml = r#"
[api]
api_key = "k"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_pose_defaults() {
        let toml = format!(
            "{}\n[workflows.pose]\nworkflow_id = \"333\"\ndefault_prompt1 = \"swap pose\"\n",
            MINIMAL
        );
        let config: Config = toml::from_str(&toml).unwrap();
        let pose = config.workflows.pose.unwrap();
        assert_eq!(pose.workflow_id, "333");
        assert_eq!(pose.source_image_node_id, "24");
        assert_eq!(pose.pose_image_node_id, "21");
        assert_eq!(pose.prompt1_node_id, "25");
        assert_eq!(pose.prompt2_node_id, "35");
        assert_eq!(pose.latent_node_id, "38");
        assert_eq!(pose.default_prompt1, "swap pose");
        assert!(pose.default_prompt2.is_empty());
    }

    #[test]
    fn test_sanitized_config_hides_key() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.api.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("\"api_key\""));
    }
}
