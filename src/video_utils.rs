use std::path::Path;

use log::{error, info};
use serde_json::Value;
use tokio::process::Command;

use crate::media::MediaError;

/// Reads the container duration in seconds with `ffprobe`, falling back to the
/// first video stream when the format block has none.
pub async fn probe_duration(file_path: &Path) -> Result<f64, MediaError> {
    info!("Extracting duration from video: {}", file_path.display());

    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(file_path)
        .output()
        .await?;

    if !output.status.success() {
        let message = String::from_utf8_lossy(&output.stderr).to_string();
        error!("ffprobe failed: {}", message);
        return Err(MediaError::Probe(message));
    }

    let parsed: Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| MediaError::Probe(e.to_string()))?;

    duration_from_probe(&parsed)
        .ok_or_else(|| MediaError::Probe("Could not extract duration from video metadata".into()))
}

fn duration_from_probe(parsed: &Value) -> Option<f64> {
    let parse = |v: &Value| v.get("duration")?.as_str()?.parse::<f64>().ok();

    if let Some(duration) = parsed.get("format").and_then(parse) {
        return Some(duration);
    }

    parsed
        .get("streams")?
        .as_array()?
        .iter()
        .filter(|s| s.get("codec_type").and_then(Value::as_str) == Some("video"))
        .find_map(parse)
}
