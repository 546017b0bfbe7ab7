/*
Copyright 2021 Jakub Lewandowski

This file is part of Pressure Level Interpolator (pinterp).

Pressure Level Interpolator (pinterp) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

Pressure Level Interpolator (pinterp) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with Pressure Level Interpolator (pinterp). If not, see https://www.gnu.org/licenses/.
*/

//! Module containing the processing engine.
//!
//! The run is done in explicit stages:
//!
//! 1. Input files are discovered in the input directory with a glob pattern.
//! 2. Every input file is validated: its grid description and timestamps
//! must be readable and consistent. Files failing validation are reported
//! and skipped.
//! 3. Valid files are deployed onto the threadpool and processed independently
//! (see [`processing`]). Failure of one file does not stop the others,
//! all failures are reported at the end of the run.
//!
//! For each input file the native pressure (`P + PB`) and requested fields
//! are read, optionally destaggered and then interpolated column-by-column
//! onto the requested pressure levels (see [`interpolation`]).

pub mod configuration;
pub mod destagger;
pub mod diagnostics;
pub mod fields;
pub mod grid;
pub mod interpolation;
pub mod levels;
pub mod output;
pub mod processing;
pub mod time;

use self::configuration::Settings;
use crate::dataset::Backend;
use crate::errors::{DiscoveryError, ProcessingError, RunError};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use rayon::ThreadPoolBuilder;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
};

/// Flag shared between the caller and workers
/// to stop processing at the next checkpoint.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a run that was not stopped by a fatal error.
#[derive(Debug, Default)]
pub struct RunReport {
    pub total: usize,
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, ProcessingError)>,
}

impl RunReport {
    /// Converts the report into an error when any input file failed.
    pub fn into_result(self) -> Result<Vec<PathBuf>, RunError> {
        if self.failed.is_empty() {
            return Ok(self.written);
        }

        for (path, err) in &self.failed {
            error!("{} failed: {}", path.display(), err);
        }

        Err(RunError::FilesFailed(self.failed.len(), self.total))
    }
}

/// Finds input files matching `pattern` in `directory`, sorted by name.
pub fn discover(directory: &Path, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let full_pattern = directory.join(pattern).to_string_lossy().to_string();
    let mut paths = vec![];

    for entry in glob::glob(&full_pattern)? {
        let path = entry?;
        if path.is_file() {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(DiscoveryError::NoMatches(full_pattern));
    }

    paths.sort();
    Ok(paths)
}

/// Creates the output directory when it does not exist.
fn prepare_output_dir(directory: &Path) -> Result<(), RunError> {
    if directory.is_dir() {
        debug!("Output directory {} exists", directory.display());
    } else {
        debug!("Creating output directory {}", directory.display());
        fs::create_dir_all(directory)?;
    }

    Ok(())
}

/// Main engine function, running all stages for every input file.
///
/// The caller owns `cancel`: the engine only polls it and never sets it,
/// so a front end that wants to stop a run early keeps a clone and
/// calls [`CancelToken::cancel`]. The command line binary passes a token
/// that is never cancelled.
pub fn run<B: Backend + 'static>(
    backend: Arc<B>,
    settings: Arc<Settings>,
    threads: usize,
    cancel: CancelToken,
) -> Result<RunReport, RunError> {
    info!("Discovering input files");
    let inputs = discover(&settings.input_directory, &settings.pattern)?;
    info!("Found {} input file(s)", inputs.len());

    prepare_output_dir(&settings.output_directory)?;

    debug!("Setting up ThreadPool");
    let threadpool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .stack_size(2 * 1024 * 1024)
        .build()?;

    let mut report = RunReport {
        total: inputs.len(),
        ..RunReport::default()
    };

    info!("Validating input files");
    let mut valid = Vec::with_capacity(inputs.len());

    for path in inputs {
        match processing::validate_file(backend.as_ref(), &path, &settings) {
            Ok(()) => valid.push(path),
            Err(err) => {
                warn!("Skipping invalid input {}: {}", path.display(), err);
                report.failed.push((path, err));
            }
        }
    }

    info!("Processing {} input file(s)", valid.len());

    let files_bar = ProgressBar::new(valid.len() as u64);
    files_bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .progress_chars("#>-"),
    );
    files_bar.set_prefix("Processed files");

    let (tx, rx) = mpsc::channel();

    for path in valid {
        let tx = tx.clone();
        let backend = Arc::clone(&backend);
        let settings = Arc::clone(&settings);
        let cancel = cancel.clone();

        threadpool.spawn(move || {
            let result = processing::process_file(backend.as_ref(), &path, &settings, &cancel);
            // receiver outlives all workers
            tx.send((path, result)).ok();
        });
    }

    // channel closes when the last worker finishes
    drop(tx);

    for (path, result) in rx {
        match result {
            Ok(written) => report.written.extend(written),
            Err(ProcessingError::Cancelled) => {
                debug!("Processing of {} cancelled", path.display())
            }
            Err(err) => {
                error!(
                    "Processing of {} failed due to an error, check the details and rerun: {}",
                    path.display(),
                    err
                );
                // make sure the message is not overwritten by the progress bar
                println!();
                report.failed.push((path, err));
            }
        }
        files_bar.inc(1);
    }

    if cancel.is_cancelled() {
        files_bar.abandon_with_message("Cancelled");
        return Err(RunError::Cancelled);
    }

    files_bar.finish_with_message("All files processed");

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{discover, run, CancelToken};
    use crate::dataset::memory::MemoryBackend;
    use crate::engine::configuration::{Config, Settings};
    use crate::errors::{DiscoveryError, InputError, ProcessingError, RunError};
    use crate::test_support::WrfFixture;
    use std::{path::Path, sync::Arc};

    fn settings(input: &Path, output: &Path) -> Arc<Settings> {
        let yaml = format!(
            "input:\n  directory: {}\n  pattern: wrfout_d0*\noutput:\n  directory: {}\nprocessing:\n  levels: [925, 850]\n",
            input.display(),
            output.display()
        );

        Arc::new(Settings::derive(&Config::new_from_slice(yaml.as_bytes()).unwrap()).unwrap())
    }

    #[test]
    fn discovery() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = WrfFixture::default();
        fixture.save_in(dir.path(), "wrfout_d02_2017-01-02_06:00:00");
        fixture.save_in(dir.path(), "wrfout_d01_2017-01-02_06:00:00");
        fixture.save_in(dir.path(), "met_em.d01.2017-01-02_06:00:00.nc");

        let found = discover(dir.path(), "wrfout_d0*").unwrap();
        assert_eq!(
            found,
            vec![
                dir.path().join("wrfout_d01_2017-01-02_06:00:00"),
                dir.path().join("wrfout_d02_2017-01-02_06:00:00")
            ]
        );

        assert!(matches!(
            discover(dir.path(), "wrfinput_*"),
            Err(DiscoveryError::NoMatches(_))
        ));
        assert!(matches!(
            discover(dir.path(), "wrfout_[d0*"),
            Err(DiscoveryError::Pattern(_))
        ));
    }

    #[test]
    fn failures_are_aggregated() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        let good = WrfFixture {
            grid_id: 1,
            ..WrfFixture::default()
        };
        good.save_in(input.path(), "wrfout_d01_2017-01-02_06:00:00");

        let bad = WrfFixture {
            grid_id: 120,
            ..WrfFixture::default()
        };
        bad.save_in(input.path(), "wrfout_d02_2017-01-02_06:00:00");

        let report = run(
            Arc::new(MemoryBackend),
            settings(input.path(), &output.path().join("nested")),
            2,
            CancelToken::default(),
        )
        .unwrap();

        assert_eq!(report.total, 2);
        assert_eq!(
            report.written,
            vec![output
                .path()
                .join("nested")
                .join("wrfout_d01_2017-01-02_06:00:00")]
        );
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(
            report.failed[0].1,
            ProcessingError::Input(InputError::GridId(120))
        ));

        assert!(matches!(
            report.into_result(),
            Err(RunError::FilesFailed(1, 2))
        ));
    }

    #[test]
    fn cancelled_run() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        WrfFixture::default().save_in(input.path(), "wrfout_d03_2017-01-02_06:00:00");

        let cancel = CancelToken::default();
        cancel.cancel();

        let result = run(
            Arc::new(MemoryBackend),
            settings(input.path(), output.path()),
            1,
            cancel,
        );

        assert!(matches!(result, Err(RunError::Cancelled)));
        assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_inputs_stop_the_run() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        assert!(matches!(
            run(
                Arc::new(MemoryBackend),
                settings(input.path(), output.path()),
                1,
                CancelToken::default()
            ),
            Err(RunError::Discovery(DiscoveryError::NoMatches(_)))
        ));
    }
}
