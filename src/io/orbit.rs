use crate::types::{PipelineError, PipelineResult};
use chrono::NaiveDateTime;

/// Orbit ephemerides come in two flavors; precise files are preferred
/// over restituted ones whenever both cover an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitKind {
    Precise,
    Restituted,
}

/// Validity interval of one orbit file, derived from its filename.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitFileInfo {
    pub kind: OrbitKind,
    pub begin: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Parse a Sentinel orbit filename, e.g.
/// `S1A_OPER_AUX_POEORB_OPOD_20150527T122640_V20150505T225944_20150507T005944.EOF`.
///
/// The fourth underscore-separated field names the orbit type and the
/// two trailing timestamps give the validity interval. Files of other
/// types return None and are ignored.
pub fn parse_orbit_filename(filename: &str) -> PipelineResult<Option<OrbitFileInfo>> {
    let stem = filename.strip_suffix(".EOF").unwrap_or(filename);
    let fields: Vec<&str> = stem.split('_').collect();

    let kind = match fields.get(3) {
        Some(&"POEORB") => OrbitKind::Precise,
        Some(&"RESORB") => OrbitKind::Restituted,
        _ => return Ok(None),
    };

    if fields.len() < 3 {
        return Err(PipelineError::Metadata(format!(
            "Orbit filename too short: {}",
            filename
        )));
    }
    let begin_str = fields[fields.len() - 2]
        .strip_prefix('V')
        .unwrap_or(fields[fields.len() - 2]);
    let end_str = fields[fields.len() - 1];

    let parse = |s: &str| {
        NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S").map_err(|e| {
            PipelineError::Metadata(format!(
                "Invalid validity timestamp '{}' in {}: {}",
                s, filename, e
            ))
        })
    };

    Ok(Some(OrbitFileInfo {
        kind,
        begin: parse(begin_str)?,
        end: parse(end_str)?,
    }))
}
