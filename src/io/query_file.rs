use crate::types::{BoundingBox, DateRange, OrbitDirection, PipelineError, PipelineResult};
use chrono::NaiveDate;
use std::path::Path;

/// A declarative data query: a conjunction of predicates over the
/// catalog. Every query is implicitly restricted to Sentinel-1.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub product: Option<String>,
    pub date_range: Option<DateRange>,
    pub polygon: Option<BoundingBox>,
    pub track: Option<i32>,
    pub orbit_direction: Option<OrbitDirection>,
}

fn parse_date(s: &str) -> PipelineResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .map_err(|e| PipelineError::Config(format!("Invalid date '{}': {}", s, e)))
}

/// Parse a .qry file: line-oriented `KEY: value` pairs, `#` starts a
/// comment line. Recognized keys are PRODUCT, DATERANGE (one date or
/// two space-separated dates), POLYGON (lon1 lat1 lon2 lat2 as
/// opposing corners), TRACK and ORBITDIR.
pub fn parse_query(content: &str) -> PipelineResult<SearchQuery> {
    let mut query = SearchQuery::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            return Err(PipelineError::Config(format!(
                "Malformed query line '{}'",
                line
            )));
        };
        let value = value.trim();

        match key.trim() {
            "PRODUCT" => query.product = Some(value.to_string()),
            "DATERANGE" => {
                let dates: Vec<&str> = value.split_whitespace().collect();
                query.date_range = Some(match dates.as_slice() {
                    [single] => DateRange::single(parse_date(single)?),
                    [start, end] => DateRange {
                        start: parse_date(start)?,
                        end: parse_date(end)?,
                    },
                    _ => {
                        return Err(PipelineError::Config(format!(
                            "DATERANGE expects one or two dates, got '{}'",
                            value
                        )))
                    }
                });
            }
            "POLYGON" => {
                let coords: Vec<f64> = value
                    .split_whitespace()
                    .map(|c| {
                        c.parse::<f64>().map_err(|e| {
                            PipelineError::Config(format!("Invalid coordinate '{}': {}", c, e))
                        })
                    })
                    .collect::<PipelineResult<_>>()?;
                if coords.len() != 4 {
                    return Err(PipelineError::Config(format!(
                        "POLYGON expects four coordinates, got {}",
                        coords.len()
                    )));
                }
                query.polygon = Some(BoundingBox::from_corners(
                    coords[0], coords[1], coords[2], coords[3],
                ));
            }
            "TRACK" => {
                let track = value
                    .split_whitespace()
                    .next()
                    .unwrap_or(value)
                    .parse::<i32>()
                    .map_err(|e| PipelineError::Config(format!("Invalid track '{}': {}", value, e)))?;
                query.track = Some(track);
            }
            "ORBITDIR" => {
                let dir = value.split_whitespace().next().unwrap_or(value);
                query.orbit_direction =
                    Some(dir.parse().map_err(|_| {
                        PipelineError::Config(format!("Invalid orbit direction '{}'", dir))
                    })?);
            }
            other => log::warn!("Ignoring unknown query key '{}'", other),
        }
    }

    Ok(query)
}

/// Parse a .qry file from disk.
pub fn read_query(path: &Path) -> PipelineResult<SearchQuery> {
    if !path.exists() {
        return Err(PipelineError::Config(format!(
            "Query file {} does not exist",
            path.display()
        )));
    }
    parse_query(&std::fs::read_to_string(path)?)
}
