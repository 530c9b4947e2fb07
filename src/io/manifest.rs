use crate::types::{PipelineError, PipelineResult};
use regex::Regex;
use std::path::Path;

/// The manifest is the single authoritative source of the relative
/// orbit (track) number, shared by every swath and polarisation of a
/// product.
///
/// The field lives in the `measurementOrbitReference` metadata record
/// as a `relativeOrbitNumber` element qualified by `type="stop"`. The
/// manifest is heavily namespaced, so the one field is pulled out with
/// a targeted pattern instead of a full deserialization.
pub fn extract_track(manifest_content: &str) -> PipelineResult<i32> {
    let re = Regex::new(r#"relativeOrbitNumber\s+type="stop"\s*>\s*(\d+)\s*<"#)
        .map_err(|e| PipelineError::Metadata(format!("Track pattern: {}", e)))?;
    let caps = re.captures(manifest_content).ok_or_else(|| {
        PipelineError::Metadata("No stop relativeOrbitNumber in manifest".to_string())
    })?;
    caps[1]
        .parse::<i32>()
        .map_err(|e| PipelineError::Metadata(format!("Invalid relative orbit number: {}", e)))
}

/// Read the track number from `manifest.safe` inside a .SAFE directory.
pub fn read_track(safe_dir: &Path) -> PipelineResult<i32> {
    let manifest_path = safe_dir.join("manifest.safe");
    let content = std::fs::read_to_string(&manifest_path).map_err(|e| {
        PipelineError::Metadata(format!(
            "Could not read manifest {}: {}",
            manifest_path.display(),
            e
        ))
    })?;
    extract_track(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_track() {
        let manifest = r#"
        <safe:orbitReference>
            <safe:relativeOrbitNumber type="start">103</safe:relativeOrbitNumber>
            <safe:relativeOrbitNumber type="stop">104</safe:relativeOrbitNumber>
        </safe:orbitReference>"#;
        assert_eq!(extract_track(manifest).unwrap(), 104);
    }

    #[test]
    fn test_extract_track_missing() {
        assert!(extract_track("<manifest/>").is_err());
    }
}
