use crate::types::{OrbitDirection, PipelineError, PipelineResult, Polarization};
use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::collections::HashMap;

/// Annotation structures for Sentinel-1 measurement files.
/// This represents the root <product> element directly; only the
/// elements the catalog needs are deserialized.
#[derive(Debug, Deserialize)]
pub struct Annotation {
    #[serde(rename = "adsHeader")]
    pub ads_header: AdsHeader,
    #[serde(rename = "generalAnnotation")]
    pub general_annotation: GeneralAnnotation,
    #[serde(rename = "swathTiming")]
    pub swath_timing: SwathTiming,
    #[serde(rename = "geolocationGrid")]
    pub geolocation_grid: GeolocationGrid,
}

#[derive(Debug, Deserialize)]
pub struct AdsHeader {
    #[serde(rename = "polarisation")]
    pub polarisation: String,
    #[serde(rename = "swath")]
    pub swath: String,
    #[serde(rename = "startTime")]
    pub start_time: String,
}

#[derive(Debug, Deserialize)]
pub struct GeneralAnnotation {
    #[serde(rename = "productInformation")]
    pub product_information: ProductInformation,
}

#[derive(Debug, Deserialize)]
pub struct ProductInformation {
    #[serde(rename = "pass")]
    pub pass: String,
}

#[derive(Debug, Deserialize)]
pub struct SwathTiming {
    #[serde(rename = "linesPerBurst")]
    pub lines_per_burst: i64,
    #[serde(rename = "samplesPerBurst")]
    pub samples_per_burst: i64,
    #[serde(rename = "burstList")]
    pub burst_list: BurstList,
}

#[derive(Debug, Deserialize)]
pub struct BurstList {
    #[serde(rename = "burst", default)]
    pub bursts: Vec<Burst>,
}

#[derive(Debug, Deserialize)]
pub struct Burst {
    #[serde(rename = "azimuthAnxTime")]
    pub azimuth_anx_time: f64,
}

#[derive(Debug, Deserialize)]
pub struct GeolocationGrid {
    #[serde(rename = "geolocationGridPointList")]
    pub point_list: GeolocationGridPointList,
}

#[derive(Debug, Deserialize)]
pub struct GeolocationGridPointList {
    #[serde(rename = "geolocationGridPoint", default)]
    pub points: Vec<GeolocationGridPoint>,
}

#[derive(Debug, Deserialize)]
pub struct GeolocationGridPoint {
    #[serde(rename = "line")]
    pub line: i64,
    #[serde(rename = "pixel")]
    pub pixel: i64,
    #[serde(rename = "latitude")]
    pub latitude: f64,
    #[serde(rename = "longitude")]
    pub longitude: f64,
}

/// Corner and center geolocation of one burst, derived from the sparse
/// geolocation grid. Corners are numbered in order of increasing
/// longitude; the center is the midpoint of the two longitude-extreme
/// corners.
#[derive(Debug, Clone, PartialEq)]
pub struct BurstGeolocation {
    pub center: (f64, f64),
    /// (lat, lon) per corner, sorted by longitude.
    pub corners: [(f64, f64); 4],
}

impl Annotation {
    /// Parse annotation XML content
    pub fn parse(xml_content: &str) -> PipelineResult<Annotation> {
        from_str::<Annotation>(xml_content)
            .map_err(|e| PipelineError::XmlParsing(format!("Failed to parse annotation: {}", e)))
    }

    pub fn polarisation(&self) -> PipelineResult<Polarization> {
        self.ads_header.polarisation.parse()
    }

    pub fn orbit_direction(&self) -> PipelineResult<OrbitDirection> {
        self.general_annotation.product_information.pass.parse()
    }

    /// Swath number (1-3) from the swath identifier, e.g. "IW2" -> 2.
    pub fn swath_number(&self) -> PipelineResult<i32> {
        self.ads_header
            .swath
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .map(|d| d as i32)
            .ok_or_else(|| {
                PipelineError::Metadata(format!("Invalid swath id: {}", self.ads_header.swath))
            })
    }

    pub fn start_datetime(&self) -> PipelineResult<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.ads_header.start_time, "%Y-%m-%dT%H:%M:%S%.f").map_err(
            |e| {
                PipelineError::Metadata(format!(
                    "Could not parse start time '{}': {}",
                    self.ads_header.start_time, e
                ))
            },
        )
    }

    pub fn acquisition_date(&self) -> PipelineResult<NaiveDate> {
        Ok(self.start_datetime()?.date())
    }
}

/// Quantize an azimuth ANX time into the burst timing signature used
/// for burst identity (tenths of a second, rounded).
pub fn burst_signature(azimuth_anx_time: f64) -> i32 {
    (azimuth_anx_time * 10.0).round() as i32
}

/// Near-range and far-range geolocation grid entries, keyed by line.
/// "First" holds the pixel-0 corners, "last" the corners at the final
/// pixel of the burst.
#[derive(Debug)]
pub struct CornerIndex {
    first: HashMap<i64, (f64, f64)>,
    last: HashMap<i64, (f64, f64)>,
    lines_per_burst: i64,
}

impl CornerIndex {
    pub fn build(annotation: &Annotation) -> Self {
        let last_pixel = annotation.swath_timing.samples_per_burst - 1;
        let mut first = HashMap::new();
        let mut last = HashMap::new();
        for p in &annotation.geolocation_grid.point_list.points {
            if p.pixel == 0 {
                first.insert(p.line, (p.latitude, p.longitude));
            } else if p.pixel == last_pixel {
                last.insert(p.line, (p.latitude, p.longitude));
            }
        }
        Self {
            first,
            last,
            lines_per_burst: annotation.swath_timing.lines_per_burst,
        }
    }

    /// Grid lines occasionally sit one line before the nominal burst
    /// boundary, so a miss is retried once at line - 1 and never more.
    fn lookup(map: &HashMap<i64, (f64, f64)>, line: i64) -> Option<(f64, f64)> {
        map.get(&line).or_else(|| map.get(&(line - 1))).copied()
    }

    /// Corner and center coordinates for burst `index` (0-based), or
    /// None when the geolocation grid is missing either boundary line.
    pub fn burst_geolocation(&self, index: usize) -> Option<BurstGeolocation> {
        let first_line = index as i64 * self.lines_per_burst;
        let last_line = (index as i64 + 1) * self.lines_per_burst;

        let near_first = Self::lookup(&self.first, first_line)?;
        let far_first = Self::lookup(&self.last, first_line)?;
        let near_last = Self::lookup(&self.first, last_line)?;
        let far_last = Self::lookup(&self.last, last_line)?;

        let mut corners = [near_first, far_first, far_last, near_last];
        corners.sort_by(|a, b| a.1.total_cmp(&b.1));
        let center = (
            (corners[0].0 + corners[3].0) / 2.0,
            (corners[0].1 + corners[3].1) / 2.0,
        );
        Some(BurstGeolocation { center, corners })
    }
}
