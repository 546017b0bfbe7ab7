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

//! Module handling scoped creation of output files.
//!
//! Output is written to a hidden temporary file in the output
//! directory and renamed onto its final name only after it has
//! been completely written. Until then the temporary file is
//! removed whenever the [`StagedOutput`] is dropped.

use crate::errors::OutputError;
use log::debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

#[derive(Debug)]
pub struct StagedOutput {
    temp: TempPath,
    target: PathBuf,
    overwrite: bool,
}

impl StagedOutput {
    /// Reserves a temporary file for output that will be named `filename`.
    ///
    /// Fails early when the target exists and cannot be overwritten.
    pub fn new(directory: &Path, filename: &str, overwrite: bool) -> Result<Self, OutputError> {
        let target = directory.join(filename);

        if !overwrite && target.exists() {
            return Err(OutputError::Exists(target));
        }

        let temp = tempfile::Builder::new()
            .prefix(".pinterp-")
            .suffix(".tmp")
            .tempfile_in(directory)?
            .into_temp_path();

        debug!("Staging {} in {}", target.display(), temp.display());

        Ok(StagedOutput {
            temp,
            target,
            overwrite,
        })
    }

    /// Path the backend should write to.
    pub fn path(&self) -> &Path {
        &self.temp
    }

    /// Atomically moves the finished file onto its final name.
    pub fn commit(self) -> Result<PathBuf, OutputError> {
        let StagedOutput {
            temp,
            target,
            overwrite,
        } = self;

        if overwrite {
            temp.persist(&target)?;
        } else {
            temp.persist_noclobber(&target).map_err(|err| {
                if err.error.kind() == ErrorKind::AlreadyExists {
                    OutputError::Exists(target.clone())
                } else {
                    OutputError::Persist(err)
                }
            })?;
        }

        Ok(target)
    }
}
