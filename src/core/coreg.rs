//! Coregistration scheduling. Slaves are resampled onto the master
//! geometry in ascending temporal-baseline order; once a slave drifts
//! more than the auxiliary threshold away from the master, the nearest
//! already-processed slave supports the spectral-diversity refinement.

use crate::core::toolchain::{ToolchainAdapter, ToolchainOp};
use crate::io::lists;
use crate::types::{PipelineParams, PipelineResult, Polarization};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// One scheduled master/slave pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoregPlan {
    pub slave: NaiveDate,
    /// Temporal baseline to the master, in days.
    pub baseline: i64,
    /// Near-date processed slave supporting the refinement, when the
    /// baseline exceeds the threshold and a closer one exists.
    pub auxiliary: Option<NaiveDate>,
}

/// Orders the slave dates by temporal baseline and tracks which have
/// been coregistered, so auxiliary selection only ever considers
/// completed slaves.
#[derive(Debug)]
pub struct CoregScheduler {
    master: NaiveDate,
    /// (baseline, slave), ascending.
    queue: Vec<(i64, NaiveDate)>,
    cursor: usize,
    processed: BTreeSet<NaiveDate>,
    aux_threshold_days: i64,
}

impl CoregScheduler {
    pub fn new(master: NaiveDate, slaves: &[NaiveDate], params: &PipelineParams) -> Self {
        let mut queue: Vec<(i64, NaiveDate)> = slaves
            .iter()
            .filter(|&&d| d != master)
            .map(|&d| ((d - master).num_days().abs(), d))
            .collect();
        queue.sort();
        CoregScheduler {
            master,
            queue,
            cursor: 0,
            processed: BTreeSet::new(),
            aux_threshold_days: params.aux_baseline_days,
        }
    }

    pub fn master(&self) -> NaiveDate {
        self.master
    }

    /// The plan for the next pending slave, computed against the
    /// slaves completed so far. Returns `None` when all are done.
    pub fn next_plan(&self) -> Option<CoregPlan> {
        let &(baseline, slave) = self.queue.get(self.cursor)?;
        let auxiliary = if baseline <= self.aux_threshold_days {
            None
        } else {
            // Nearest processed slave, used only when it is strictly
            // closer than the master itself.
            self.processed
                .iter()
                .map(|&p| ((slave - p).num_days().abs(), p))
                .min()
                .filter(|&(aux_baseline, _)| aux_baseline < baseline)
                .map(|(_, p)| p)
        };
        Some(CoregPlan {
            slave,
            baseline,
            auxiliary,
        })
    }

    /// Record the pending slave as coregistered and advance.
    pub fn mark_complete(&mut self) {
        if let Some(&(_, slave)) = self.queue.get(self.cursor) {
            self.processed.insert(slave);
            self.cursor += 1;
        }
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.queue.len()
    }

    /// The full schedule, assuming every slave completes in order.
    pub fn schedule(mut self) -> Vec<CoregPlan> {
        let mut plans = Vec::new();
        while let Some(plan) = self.next_plan() {
            plans.push(plan);
            self.mark_complete();
        }
        plans
    }
}

fn date_str(d: NaiveDate) -> String {
    d.format("%Y%m%d").to_string()
}

/// Emit the operations resampling one slave onto the master geometry:
/// geometric lookup table from the master height map, intensity offset
/// refinement, two spectral-diversity passes and the differential
/// interferogram.
#[allow(clippy::too_many_arguments)]
pub fn coregister_slave(
    work_dir: &Path,
    master: NaiveDate,
    plan: &CoregPlan,
    swaths: &[i32],
    pol: Polarization,
    height_map: &Path,
    params: &PipelineParams,
    adapter: &mut dyn ToolchainAdapter,
) -> PipelineResult<()> {
    let master_s = date_str(master);
    let slave_s = date_str(plan.slave);
    let pair = format!("{}_{}", master_s, slave_s);
    let master_dir = work_dir.join(&master_s);
    let slave_dir = work_dir.join(&slave_s);
    let pair_dir = work_dir.join(&pair);
    std::fs::create_dir_all(&pair_dir)?;

    let master_base = master_dir.join(&master_s);
    let slave_base = slave_dir.join(&slave_s);
    let rslc_base = pair_dir.join(&slave_s);

    let master_tab = master_dir.join(format!("{}.slc_tab", master_s));
    let slave_tab = slave_dir.join(format!("{}.slc_tab", slave_s));
    let rslc_tab = pair_dir.join(format!("{}.rslc_tab", slave_s));
    lists::write_slc_tab(&rslc_tab, &rslc_base, swaths, pol)?;

    let lut = pair_dir.join(format!("{}.lt", pair));
    let offset_file = pair_dir.join(format!("{}.off", pair));
    let master_par = ext(&master_base, "slc.par");
    let master_mli_par = ext(&master_base, "mli.par");
    let slave_par = ext(&slave_base, "slc.par");
    let slave_mli_par = ext(&slave_base, "mli.par");
    let rslc_par = ext(&rslc_base, "rslc.par");

    let mut ops = vec![
        ToolchainOp::DeriveLookupTable {
            master_mli_par: master_mli_par.clone(),
            height_map: height_map.to_path_buf(),
            slave_mli_par: slave_mli_par.clone(),
            output_lut: lut.clone(),
        },
        ToolchainOp::ResampleSlc {
            slave_tab: slave_tab.clone(),
            slave_par: slave_par.clone(),
            master_tab: master_tab.clone(),
            master_par: master_par.clone(),
            lut: lut.clone(),
            master_mli_par: master_mli_par.clone(),
            slave_mli_par: slave_mli_par.clone(),
            offset_file: None,
            output_tab: rslc_tab.clone(),
            output_base: rslc_base.clone(),
        },
        ToolchainOp::InitOffsets {
            master_par: master_par.clone(),
            slave_par: rslc_par.clone(),
            offset_file: offset_file.clone(),
        },
        ToolchainOp::EstimateOffsets {
            master_slc: ext(&master_base, "slc"),
            slave_rslc: ext(&rslc_base, "rslc"),
            master_par: master_par.clone(),
            slave_rslc_par: rslc_par.clone(),
            offset_file: offset_file.clone(),
            offsets_file: pair_dir.join(format!("{}.offs", pair)),
            snr_file: pair_dir.join(format!("{}.snr", pair)),
            patch: params.offset_patch,
            grid: params.offset_grid,
            snr_threshold: params.offset_snr_threshold,
        },
        ToolchainOp::FitOffsets {
            offsets_file: pair_dir.join(format!("{}.offs", pair)),
            snr_file: pair_dir.join(format!("{}.snr", pair)),
            offset_file: offset_file.clone(),
            snr_threshold: params.offset_snr_threshold,
        },
        ToolchainOp::ResampleSlc {
            slave_tab: slave_tab.clone(),
            slave_par: slave_par.clone(),
            master_tab: master_tab.clone(),
            master_par: master_par.clone(),
            lut: lut.clone(),
            master_mli_par: master_mli_par.clone(),
            slave_mli_par: slave_mli_par.clone(),
            offset_file: Some(offset_file.clone()),
            output_tab: rslc_tab.clone(),
            output_base: rslc_base.clone(),
        },
    ];

    // Two refinement passes; the second may lean on the auxiliary
    // slave when the baseline to the master is long.
    let auxiliary_tab = match plan.auxiliary {
        Some(aux) => {
            let aux_s = date_str(aux);
            let aux_pair_dir = work_dir.join(format!("{}_{}", master_s, aux_s));
            let aux_tab = pair_dir.join(format!("{}.rslc3_tab", slave_s));
            lists::write_slc_tab(&aux_tab, &aux_pair_dir.join(&aux_s), swaths, pol)?;
            Some(aux_tab)
        }
        None => None,
    };
    for pass in 0..2 {
        ops.push(ToolchainOp::RefineSpectralDiversity {
            master_tab: master_tab.clone(),
            slave_rslc_tab: rslc_tab.clone(),
            pair: pair.clone(),
            offset_in: offset_file.clone(),
            offset_out: pair_dir.join(format!("{}.off.sd{}", pair, pass + 1)),
            auxiliary_tab: auxiliary_tab.clone(),
            coherence_threshold: params.sd_coherence_threshold,
            phase_stdev: params.sd_phase_stdev,
            fraction: params.sd_fraction,
        });
    }

    ops.push(ToolchainOp::SimulatePhase {
        master_par: master_par.clone(),
        slave_par: rslc_par.clone(),
        offset_file: offset_file.clone(),
        height_map: height_map.to_path_buf(),
        output: pair_dir.join(format!("{}.sim_unw", pair)),
    });
    let (azimuth_looks, range_looks) = params.mli_looks;
    ops.push(ToolchainOp::FormInterferogram {
        master_slc: ext(&master_base, "slc"),
        slave_rslc: ext(&rslc_base, "rslc"),
        master_par,
        slave_rslc_par: rslc_par,
        offset_file,
        simulated_phase: pair_dir.join(format!("{}.sim_unw", pair)),
        output: pair_dir.join(format!("{}.diff", pair)),
        range_looks,
        azimuth_looks,
    });

    for op in &ops {
        adapter.execute(op)?;
    }
    log::info!(
        "Coregistered {} onto {} (baseline {} days{})",
        slave_s,
        master_s,
        plan.baseline,
        match plan.auxiliary {
            Some(aux) => format!(", auxiliary {}", date_str(aux)),
            None => String::new(),
        }
    );
    Ok(())
}

fn ext(base: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", base.display(), suffix))
}

/// Coregister every slave in baseline order. An operation failure
/// aborts the run before the failing slave is marked processed, so a
/// re-run resumes from it.
#[allow(clippy::too_many_arguments)]
pub fn coregister_all(
    work_dir: &Path,
    master: NaiveDate,
    dates: &[NaiveDate],
    swaths: &[i32],
    pol: Polarization,
    height_map: &Path,
    params: &PipelineParams,
    adapter: &mut dyn ToolchainAdapter,
) -> PipelineResult<Vec<CoregPlan>> {
    let mut scheduler = CoregScheduler::new(master, dates, params);
    let mut completed = Vec::new();
    while let Some(plan) = scheduler.next_plan() {
        coregister_slave(work_dir, master, &plan, swaths, pol, height_map, params, adapter)?;
        scheduler.mark_complete();
        completed.push(plan);
    }
    Ok(completed)
}
