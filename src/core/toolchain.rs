//! The boundary to the external SAR processing toolchain. The core
//! only emits logical operation descriptors; translating them into
//! command invocations is the job of whatever adapter sits behind
//! [`ToolchainAdapter`].

use crate::types::PipelineResult;
use std::path::PathBuf;

/// One logical operation for the external toolchain. Burst ranges are
/// 1-based and inclusive, matching the membership ordinals.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolchainOp {
    /// Generate an SLC image and parameter set from one measurement
    /// file and its annotation/calibration companions.
    ImportSlc {
        tiff: PathBuf,
        annotation: PathBuf,
        calibration: PathBuf,
        noise: PathBuf,
        output_base: PathBuf,
    },
    /// Extract a contiguous burst sub-range from an SLC.
    CopyBursts {
        source_tab: PathBuf,
        dest_tab: PathBuf,
        first_burst: i32,
        last_burst: i32,
    },
    /// Concatenate two SLC segments along the acquisition direction.
    ConcatenateSlc {
        first_tab: PathBuf,
        second_tab: PathBuf,
        output_tab: PathBuf,
    },
    /// Mosaic per-swath SLCs into one image.
    MosaicSlc {
        tab: PathBuf,
        output_base: PathBuf,
        azimuth_looks: u32,
        range_looks: u32,
    },
    /// Multilook per-swath SLCs into one intensity mosaic.
    MultilookMosaic {
        tab: PathBuf,
        output_base: PathBuf,
        azimuth_looks: u32,
        range_looks: u32,
    },
    /// Replace annotated orbit state vectors with the ephemerides from
    /// an orbit file.
    ApplyOrbitFile { par_file: PathBuf, orbit_file: PathBuf },
    /// Derive the master-to-slave resampling lookup table from the
    /// master height map.
    DeriveLookupTable {
        master_mli_par: PathBuf,
        height_map: PathBuf,
        slave_mli_par: PathBuf,
        output_lut: PathBuf,
    },
    /// Create an empty offset parameter set for a master/slave pair.
    InitOffsets {
        master_par: PathBuf,
        slave_par: PathBuf,
        offset_file: PathBuf,
    },
    /// Estimate offsets by intensity cross-correlation.
    EstimateOffsets {
        master_slc: PathBuf,
        slave_rslc: PathBuf,
        master_par: PathBuf,
        slave_rslc_par: PathBuf,
        offset_file: PathBuf,
        offsets_file: PathBuf,
        snr_file: PathBuf,
        patch: (u32, u32),
        grid: (u32, u32),
        snr_threshold: f64,
    },
    /// Fit the offset polynomial from the estimates.
    FitOffsets {
        offsets_file: PathBuf,
        snr_file: PathBuf,
        offset_file: PathBuf,
        snr_threshold: f64,
    },
    /// Resample the slave onto the master geometry through the lookup
    /// table, optionally refined by an offset file.
    ResampleSlc {
        slave_tab: PathBuf,
        slave_par: PathBuf,
        master_tab: PathBuf,
        master_par: PathBuf,
        lut: PathBuf,
        master_mli_par: PathBuf,
        slave_mli_par: PathBuf,
        offset_file: Option<PathBuf>,
        output_tab: PathBuf,
        output_base: PathBuf,
    },
    /// Refine the azimuth offset from burst-overlap spectral
    /// diversity, optionally supported by an auxiliary image.
    RefineSpectralDiversity {
        master_tab: PathBuf,
        slave_rslc_tab: PathBuf,
        pair: String,
        offset_in: PathBuf,
        offset_out: PathBuf,
        auxiliary_tab: Option<PathBuf>,
        coherence_threshold: f64,
        phase_stdev: f64,
        fraction: f64,
    },
    /// Simulate the topographic/orbital interferometric phase.
    SimulatePhase {
        master_par: PathBuf,
        slave_par: PathBuf,
        offset_file: PathBuf,
        height_map: PathBuf,
        output: PathBuf,
    },
    /// Form the differential interferogram.
    FormInterferogram {
        master_slc: PathBuf,
        slave_rslc: PathBuf,
        master_par: PathBuf,
        slave_rslc_par: PathBuf,
        offset_file: PathBuf,
        simulated_phase: PathBuf,
        output: PathBuf,
        range_looks: u32,
        azimuth_looks: u32,
    },
}

impl ToolchainOp {
    /// Short operation name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolchainOp::ImportSlc { .. } => "import_slc",
            ToolchainOp::CopyBursts { .. } => "copy_bursts",
            ToolchainOp::ConcatenateSlc { .. } => "concatenate_slc",
            ToolchainOp::MosaicSlc { .. } => "mosaic_slc",
            ToolchainOp::MultilookMosaic { .. } => "multilook_mosaic",
            ToolchainOp::ApplyOrbitFile { .. } => "apply_orbit_file",
            ToolchainOp::DeriveLookupTable { .. } => "derive_lookup_table",
            ToolchainOp::InitOffsets { .. } => "init_offsets",
            ToolchainOp::EstimateOffsets { .. } => "estimate_offsets",
            ToolchainOp::FitOffsets { .. } => "fit_offsets",
            ToolchainOp::ResampleSlc { .. } => "resample_slc",
            ToolchainOp::RefineSpectralDiversity { .. } => "refine_spectral_diversity",
            ToolchainOp::SimulatePhase { .. } => "simulate_phase",
            ToolchainOp::FormInterferogram { .. } => "form_interferogram",
        }
    }
}

/// Executes toolchain operations. A failed operation must return an
/// error; the planners never continue past a failed step.
pub trait ToolchainAdapter {
    fn execute(&mut self, op: &ToolchainOp) -> PipelineResult<()>;
}

/// Records every operation and reports success. The programmatic
/// adapter used by tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingAdapter {
    pub ops: Vec<ToolchainOp>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operation kinds in execution order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.ops.iter().map(|op| op.kind()).collect()
    }
}

impl ToolchainAdapter for RecordingAdapter {
    fn execute(&mut self, op: &ToolchainOp) -> PipelineResult<()> {
        self.ops.push(op.clone());
        Ok(())
    }
}

/// Logs each operation descriptor without running anything. Stands in
/// for the external orchestration layer in dry runs.
#[derive(Debug, Default)]
pub struct LoggingAdapter;

impl ToolchainAdapter for LoggingAdapter {
    fn execute(&mut self, op: &ToolchainOp) -> PipelineResult<()> {
        log::info!("toolchain {}: {:?}", op.kind(), op);
        Ok(())
    }
}
