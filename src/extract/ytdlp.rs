//! YtDlpExtractor: metadata extraction through the yt-dlp binary.
//!
//! Runs `yt-dlp --dump-single-json` under a timeout. When the first attempt
//! fails for a reason a simpler invocation might avoid, one fallback attempt
//! is made without the configured extra arguments and cookies.

use crate::core::config::ExtractorConfig;
use crate::core::error::AppError;
use crate::extract::raw::ExtractedMedia;
use crate::extract::ytdlp_errors::{analyze_ytdlp_error, error_line};
use crate::extract::MediaExtractor;
use async_trait::async_trait;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tokio::time::timeout;
use url::Url;

/// Arguments shared by both attempts.
const BASE_ARGS: &[&str] = &["--dump-single-json", "--flat-playlist", "--no-warnings", "--no-progress"];

pub struct YtDlpExtractor {
    config: ExtractorConfig,
}

impl YtDlpExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Full invocation: socket timeout, cookies and configured extras.
    pub(crate) fn primary_args(&self, url: &Url) -> Vec<String> {
        let mut args: Vec<String> = BASE_ARGS.iter().map(|s| s.to_string()).collect();
        args.push("--socket-timeout".to_string());
        args.push(self.config.timeout_secs.max(1).to_string());
        if let Some(cookies) = self.config.cookies_file.as_deref().filter(|c| !c.is_empty()) {
            args.push("--cookies".to_string());
            args.push(cookies.to_string());
        }
        args.extend(self.config.extra_args.iter().cloned());
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Reduced invocation used by the fallback attempt.
    pub(crate) fn fallback_args(&self, url: &Url) -> Vec<String> {
        let mut args: Vec<String> = BASE_ARGS.iter().map(|s| s.to_string()).collect();
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    async fn run(&self, args: &[String]) -> Result<Output, AppError> {
        let mut command = Command::new(&self.config.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match timeout(self.config.timeout(), command.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => {
                tracing::error!(binary = %self.config.binary, error = %e, "Failed to execute yt-dlp");
                Err(AppError::Io(e))
            }
            Err(_) => Err(AppError::Timeout(format!(
                "yt-dlp timed out after {}s",
                self.config.timeout_secs
            ))),
        }
    }

    async fn attempt(&self, args: &[String]) -> Result<Option<ExtractedMedia>, AppError> {
        let output = self.run(args).await?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Ok(ExtractedMedia::from_json_str(&stdout)?);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let kind = analyze_ytdlp_error(&stderr);
        let message = error_line(&stderr)
            .map(|line| line.trim_start_matches("ERROR:").trim().to_string())
            .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status));

        tracing::debug!(%kind, stderr = %stderr, "yt-dlp attempt failed");
        Err(AppError::Extraction { kind, message })
    }

    fn should_fall_back(&self, err: &AppError) -> bool {
        self.config.fallback && matches!(err, AppError::Extraction { kind, .. } if !kind.is_final())
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn extract(&self, url: &Url) -> Result<Option<ExtractedMedia>, AppError> {
        tracing::info!(%url, "Extracting metadata");

        match self.attempt(&self.primary_args(url)).await {
            Ok(media) => Ok(media),
            Err(err) if self.should_fall_back(&err) => {
                tracing::warn!(%url, error = %err, "yt-dlp failed, retrying with reduced options");
                self.attempt(&self.fallback_args(url)).await
            }
            Err(err) => Err(err),
        }
    }

    async fn version(&self) -> Result<String, AppError> {
        let output = self.run(&["--version".to_string()]).await?;
        if !output.status.success() {
            return Err(AppError::Internal(format!("yt-dlp --version exited with {}", output.status)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
