//! Per-date mosaic planning and assembly. For each acquisition date
//! the planner checks that every required burst is present, groups the
//! coverage by sub-swath and source file, and emits the toolchain
//! operations that extract, concatenate and mosaic the burst ranges
//! into one co-registered-ready SLC per date.

use crate::catalog::store::{self, PolFilter};
use crate::core::toolchain::{ToolchainAdapter, ToolchainOp};
use crate::io::lists;
use crate::types::{PipelineParams, PipelineResult, Polarization};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::sqlite::SqliteConnection;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A contiguous 1-based burst range taken from one measurement file.
#[derive(Debug, Clone, PartialEq)]
pub struct SwathSegment {
    pub file_id: String,
    pub directory: String,
    pub first_burst: i32,
    pub last_burst: i32,
}

/// All segments contributing to one sub-swath, ordered by file id so
/// consecutive products concatenate in acquisition order.
#[derive(Debug, Clone, PartialEq)]
pub struct SwathPlan {
    pub swath: i32,
    pub segments: Vec<SwathSegment>,
}

/// The complete extraction plan for one acquisition date.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicPlan {
    pub date: NaiveDate,
    pub polarisation: Polarization,
    pub swaths: Vec<SwathPlan>,
}

/// Resolve the required burst ids against one acquisition date.
/// Returns `None` when any burst is missing on that date; a partially
/// covered date is never assembled.
pub fn plan_date(
    conn: &mut SqliteConnection,
    date: NaiveDate,
    burst_ids: &[String],
    pol: Polarization,
) -> PipelineResult<Option<MosaicPlan>> {
    // swath -> file id -> (directory, burst ordinals)
    let mut coverage: BTreeMap<i32, BTreeMap<String, (String, Vec<i32>)>> = BTreeMap::new();

    for burst_id in burst_ids {
        let memberships = store::memberships_for_date(conn, date, PolFilter::Exact(pol), burst_id)?;
        // A boundary burst sits in two consecutive slices of the same
        // pass; it is extracted from the first slice only, so the
        // concatenated swath carries it once.
        let Some((file, burst_no)) = memberships
            .into_iter()
            .min_by(|a, b| a.0.id.cmp(&b.0.id))
        else {
            log::warn!(
                "Date {} is missing burst {}, skipping this date",
                date.format("%Y%m%d"),
                burst_id
            );
            return Ok(None);
        };
        coverage
            .entry(file.swath)
            .or_default()
            .entry(file.id.clone())
            .or_insert_with(|| (file.directory.clone(), Vec::new()))
            .1
            .push(burst_no);
    }

    let swaths = coverage
        .into_iter()
        .map(|(swath, files)| SwathPlan {
            swath,
            segments: files
                .into_iter()
                .map(|(file_id, (directory, ordinals))| SwathSegment {
                    file_id,
                    directory,
                    // Ordinals of a single file are contiguous; the
                    // extraction range is their envelope.
                    first_burst: *ordinals.iter().min().unwrap_or(&1),
                    last_burst: *ordinals.iter().max().unwrap_or(&1),
                })
                .collect(),
        })
        .collect();

    Ok(Some(MosaicPlan {
        date,
        polarisation: pol,
        swaths,
    }))
}

impl MosaicPlan {
    /// Output file basename for this date, without extension.
    pub fn base_name(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }

    /// Sub-swath numbers covered by this plan.
    pub fn swath_numbers(&self) -> Vec<i32> {
        self.swaths.iter().map(|s| s.swath).collect()
    }

    /// Expand the plan into the toolchain operations that build the
    /// per-date mosaic under `date_dir`. Per swath: import each source
    /// SLC, copy its burst range out, and fold the segments together
    /// pairwise; then mosaic and multilook across swaths.
    pub fn emit_ops(&self, date_dir: &Path, params: &PipelineParams) -> Vec<ToolchainOp> {
        let base = date_dir.join(self.base_name());
        let pol = self.polarisation.to_string().to_lowercase();
        let mut ops = Vec::new();

        for swath_plan in &self.swaths {
            let swath = swath_plan.swath;
            let final_tab = tab_path(&base, swath, &pol);
            let mut segment_tabs = Vec::new();

            for segment in &swath_plan.segments {
                let safe_dir = PathBuf::from(&segment.directory);
                let stem = segment.file_id.trim_end_matches(".tiff");
                let import_base = date_dir.join(format!("{}.iw{}.{}", stem, swath, pol));
                ops.push(ToolchainOp::ImportSlc {
                    tiff: safe_dir.join("measurement").join(&segment.file_id),
                    annotation: safe_dir.join("annotation").join(format!("{}.xml", stem)),
                    calibration: safe_dir
                        .join("annotation/calibration")
                        .join(format!("calibration-{}.xml", stem)),
                    noise: safe_dir
                        .join("annotation/calibration")
                        .join(format!("noise-{}.xml", stem)),
                    output_base: import_base.clone(),
                });

                let segment_base: PathBuf = if swath_plan.segments.len() == 1 {
                    base.clone()
                } else {
                    date_dir.join(format!("{}.{}", self.base_name(), segment.file_id))
                };
                let segment_tab = tab_path(&segment_base, swath, &pol);
                ops.push(ToolchainOp::CopyBursts {
                    source_tab: PathBuf::from(format!("{}.slc_tab", import_base.display())),
                    dest_tab: segment_tab.clone(),
                    first_burst: segment.first_burst,
                    last_burst: segment.last_burst,
                });
                segment_tabs.push(segment_tab);
            }

            // Fold consecutive segments into one swath-level SLC.
            if segment_tabs.len() > 1 {
                let mut acc = segment_tabs[0].clone();
                for (i, next) in segment_tabs.iter().enumerate().skip(1) {
                    let out = if i == segment_tabs.len() - 1 {
                        final_tab.clone()
                    } else {
                        date_dir.join(format!("{}.cat{}.iw{}.slc_tab", self.base_name(), i, swath))
                    };
                    ops.push(ToolchainOp::ConcatenateSlc {
                        first_tab: acc,
                        second_tab: next.clone(),
                        output_tab: out.clone(),
                    });
                    acc = out;
                }
            }
        }

        let mosaic_tab = date_dir.join(format!("{}.slc_tab", self.base_name()));
        let (azimuth_looks, range_looks) = params.mli_looks;
        ops.push(ToolchainOp::MultilookMosaic {
            tab: mosaic_tab.clone(),
            output_base: base.clone(),
            azimuth_looks,
            range_looks,
        });
        let (slc_az, slc_rg) = params.slc_looks;
        ops.push(ToolchainOp::MosaicSlc {
            tab: mosaic_tab,
            output_base: base,
            azimuth_looks: slc_az,
            range_looks: slc_rg,
        });
        ops
    }
}

fn tab_path(base: &Path, swath: i32, pol: &str) -> PathBuf {
    PathBuf::from(format!("{}.iw{}.{}.slc_tab", base.display(), swath, pol))
}

/// Acquisition timestamp of a measurement file, taken from the
/// `YYYYMMDDtHHMMSS` token in its name.
pub fn measurement_timestamp(file_id: &str) -> Option<NaiveDateTime> {
    // Filenames are lowercase, so the date/time separator is a 't'.
    let re = Regex::new(r"(\d{8})t(\d{6})").ok()?;
    let caps = re.captures(file_id)?;
    NaiveDateTime::parse_from_str(&format!("{}T{}", &caps[1], &caps[2]), "%Y%m%dT%H%M%S").ok()
}

/// Emit the orbit-correction operations for one assembled date: the
/// ephemerides from the matching orbit file replace the annotated
/// state vectors in the mosaic parameter sets. A missing orbit file is
/// logged and the date keeps its annotated orbit.
pub fn orbit_correction_ops(
    conn: &mut SqliteConnection,
    plan: &MosaicPlan,
    date_dir: &Path,
) -> PipelineResult<Vec<ToolchainOp>> {
    let first_file = match plan
        .swaths
        .first()
        .and_then(|s| s.segments.first())
        .map(|seg| seg.file_id.as_str())
    {
        Some(id) => id,
        None => return Ok(Vec::new()),
    };
    let timestamp = match measurement_timestamp(first_file) {
        Some(t) => t,
        None => {
            log::warn!("No acquisition timestamp in {}, skipping orbit correction", first_file);
            return Ok(Vec::new());
        }
    };
    let (filename, directory) = match store::find_orbit_file(conn, timestamp)? {
        Some(found) => found,
        None => {
            log::warn!(
                "No orbit file covers {}, keeping annotated state vectors",
                timestamp
            );
            return Ok(Vec::new());
        }
    };
    let orbit_file = Path::new(&directory).join(filename);
    let base = date_dir.join(plan.base_name());
    Ok(vec![
        ToolchainOp::ApplyOrbitFile {
            par_file: base.with_extension("mli.par"),
            orbit_file: orbit_file.clone(),
        },
        ToolchainOp::ApplyOrbitFile {
            par_file: base.with_extension("slc.par"),
            orbit_file,
        },
    ])
}

/// Assemble one acquisition date under `work_dir/YYYYMMDD`. Returns
/// false when the date lacks full burst coverage; its directory is
/// removed again so no partial artifacts survive.
pub fn assemble_date(
    conn: &mut SqliteConnection,
    date: NaiveDate,
    burst_ids: &[String],
    pol: Polarization,
    work_dir: &Path,
    params: &PipelineParams,
    adapter: &mut dyn ToolchainAdapter,
) -> PipelineResult<bool> {
    let date_dir = work_dir.join(date.format("%Y%m%d").to_string());
    std::fs::create_dir_all(&date_dir)?;

    let plan = match plan_date(conn, date, burst_ids, pol)? {
        Some(plan) => plan,
        None => {
            std::fs::remove_dir_all(&date_dir)?;
            return Ok(false);
        }
    };

    lists::write_slc_tab(
        &date_dir.join(format!("{}.slc_tab", plan.base_name())),
        &date_dir.join(plan.base_name()),
        &plan.swath_numbers(),
        pol,
    )?;

    for op in plan.emit_ops(&date_dir, params) {
        adapter.execute(&op)?;
    }
    for op in orbit_correction_ops(conn, &plan, &date_dir)? {
        adapter.execute(&op)?;
    }
    log::info!("Assembled date {}", plan.base_name());
    Ok(true)
}

/// Assemble every date in the selection list, skipping the ones
/// without full coverage. Returns the dates actually assembled.
pub fn assemble_all(
    conn: &mut SqliteConnection,
    dates: &[NaiveDate],
    burst_ids: &[String],
    pol: Polarization,
    work_dir: &Path,
    params: &PipelineParams,
    adapter: &mut dyn ToolchainAdapter,
) -> PipelineResult<Vec<NaiveDate>> {
    let mut assembled = Vec::new();
    for &date in dates {
        if assemble_date(conn, date, burst_ids, pol, work_dir, params, adapter)? {
            assembled.push(date);
        }
    }
    log::info!("Assembled {} of {} dates", assembled.len(), dates.len());
    Ok(assembled)
}
