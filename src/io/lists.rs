use crate::types::{PipelineError, PipelineResult, Polarization};
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Filenames of the hand-off artifacts between the query engine and
/// the mosaic assembly step.
pub const BURSTID_LIST: &str = "burstid.list";
pub const DATE_LIST: &str = "date.list";

const DATE_FORMAT: &str = "%Y%m%d";

/// Write a newline-separated burst-id list.
pub fn write_burstid_list(path: &Path, burst_ids: &[String]) -> PipelineResult<()> {
    let mut f = File::create(path)?;
    for id in burst_ids {
        writeln!(f, "{}", id)?;
    }
    Ok(())
}

/// Read a burst-id list, preserving order.
pub fn read_burstid_list(path: &Path) -> PipelineResult<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut ids = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            ids.push(line.to_string());
        }
    }
    Ok(ids)
}

/// Write a newline-separated acquisition date list (yyyymmdd).
pub fn write_date_list(path: &Path, dates: &[NaiveDate]) -> PipelineResult<()> {
    let mut f = File::create(path)?;
    for d in dates {
        writeln!(f, "{}", d.format(DATE_FORMAT))?;
    }
    Ok(())
}

/// Read an acquisition date list, preserving order and duplicates.
pub fn read_date_list(path: &Path) -> PipelineResult<Vec<NaiveDate>> {
    let reader = BufReader::new(File::open(path)?);
    let mut dates = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        dates.push(NaiveDate::parse_from_str(line, DATE_FORMAT).map_err(|e| {
            PipelineError::Config(format!("Invalid date '{}' in {}: {}", line, path.display(), e))
        })?);
    }
    Ok(dates)
}

/// Write an SLC tab file: one `slc slc.par TOPS_par` triple per swath,
/// with the conventional `<base>.iw<swath>.<pol>` naming.
pub fn write_slc_tab(
    tab_path: &Path,
    base: &Path,
    swaths: &[i32],
    pol: Polarization,
) -> PipelineResult<()> {
    let mut f = File::create(tab_path)?;
    let base = base.display();
    let pol = pol.to_string().to_lowercase();
    for s in swaths {
        writeln!(
            f,
            "{base}.iw{s}.{pol}.slc {base}.iw{s}.{pol}.slc.par {base}.iw{s}.{pol}.TOPS_par"
        )?;
    }
    Ok(())
}
