//! Command-line frontend for the catalog and planning pipeline.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sarchive::catalog::store;
use sarchive::core::query::{ConsolePicker, PresetPicker, TrackPicker};
use sarchive::core::toolchain::LoggingAdapter;
use sarchive::core::{coreg, ingest, mosaic, query};
use sarchive::io::{lists, query_file};
use sarchive::types::{PipelineParams, Polarization};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sarchive", version, about = "Sentinel-1 burst catalog and stack planning")]
struct Cli {
    /// Path to the catalog database.
    #[arg(long, global = true, default_value = "catalog.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a directory of .SAFE products into the catalog.
    Ingest {
        /// Directory holding the unzipped .SAFE products.
        data_dir: PathBuf,
    },
    /// Scan a directory of .EOF orbit files into the catalog.
    IngestOrbits {
        /// Directory holding the orbit files.
        orbit_dir: PathBuf,
    },
    /// Run a query file and select a track; writes burstid.list and
    /// date.list into the output directory.
    Query {
        /// The .qry query definition.
        query_file: PathBuf,
        /// Where the selection lists are written.
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
        /// Skip the interactive prompt and take this track.
        #[arg(long)]
        track: Option<i32>,
    },
    /// Assemble the per-date burst mosaics for a selection.
    Assemble {
        /// Directory holding burstid.list and date.list, and the
        /// per-date output directories.
        work_dir: PathBuf,
        /// Output polarisation of the selection.
        #[arg(long)]
        pol: Polarization,
    },
    /// Plan and run the coregistration of a stack onto its master.
    Coregister {
        /// Directory holding the assembled per-date mosaics.
        work_dir: PathBuf,
        /// Master acquisition date, YYYYMMDD.
        #[arg(long, value_parser = parse_date)]
        master: NaiveDate,
        /// Height map in the master MLI geometry.
        #[arg(long)]
        dem: PathBuf,
        /// Output polarisation of the stack.
        #[arg(long)]
        pol: Polarization,
        /// Sub-swaths covered by the mosaics.
        #[arg(long, num_args = 1.., default_values_t = [1, 2, 3])]
        swaths: Vec<i32>,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| format!("'{}' is not a YYYYMMDD date", s))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let params = PipelineParams::default();

    let db = cli.db.display().to_string();
    let mut conn = store::establish_connection(&db)
        .with_context(|| format!("opening catalog {}", db))?;
    store::init_schema(&mut conn)?;

    match cli.command {
        Command::Ingest { data_dir } => {
            let count = ingest::ingest_directory(&mut conn, &data_dir, &params)?;
            println!("Ingested {} products", count);
        }
        Command::IngestOrbits { orbit_dir } => {
            let count = ingest::ingest_orbit_directory(&mut conn, &orbit_dir)?;
            println!("Ingested {} orbit files", count);
        }
        Command::Query {
            query_file,
            output_dir,
            track,
        } => {
            let search = query_file::read_query(&query_file)?;
            let mut picker: Box<dyn TrackPicker> = match track {
                Some(track) => Box::new(PresetPicker { track }),
                None => Box::new(ConsolePicker),
            };
            let selection =
                query::query_and_select(&mut conn, &search, picker.as_mut(), &output_dir)?;
            println!(
                "Track {}: {} bursts, {} dates, polarisation {}",
                selection.track,
                selection.burst_ids.len(),
                selection.dates.len(),
                selection.polarisation
            );
        }
        Command::Assemble { work_dir, pol } => {
            let burst_ids = lists::read_burstid_list(&work_dir.join(lists::BURSTID_LIST))?;
            let dates = lists::read_date_list(&work_dir.join(lists::DATE_LIST))?;
            let mut adapter = LoggingAdapter;
            let assembled = mosaic::assemble_all(
                &mut conn, &dates, &burst_ids, pol, &work_dir, &params, &mut adapter,
            )?;
            // Skipped dates must not reach the coregistration stage.
            lists::write_date_list(&work_dir.join(lists::DATE_LIST), &assembled)?;
            println!("Assembled {} of {} dates", assembled.len(), dates.len());
        }
        Command::Coregister {
            work_dir,
            master,
            dem,
            pol,
            swaths,
        } => {
            let dates = lists::read_date_list(&work_dir.join(lists::DATE_LIST))?;
            let mut adapter = LoggingAdapter;
            let plans = coreg::coregister_all(
                &work_dir, master, &dates, &swaths, pol, &dem, &params, &mut adapter,
            )?;
            println!("Coregistered {} slaves onto {}", plans.len(), master.format("%Y%m%d"));
        }
    }
    Ok(())
}
