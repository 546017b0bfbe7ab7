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

//! Module responsible for parsing and checking the configuration file.
//!
//! The configuration file uses [YAML](https://en.wikipedia.org/wiki/YAML)
//! and `serde` to enforce strong typing and automatic type checking.
//!
//! The structures and their fields in this module directly correspond to
//! the fields inside `config.yaml` so you can check this documentation
//! for more details how to set the config file.
//!
//! [`Config`] is only checked against simple bounds. Everything the
//! engine actually uses is derived from it into immutable [`Settings`].

use crate::dataset::OutputFormat;
use crate::engine::fields::FieldSelection;
use crate::engine::interpolation::{InterpolationLaw, Scheme};
use crate::engine::levels::PressureLevels;
use crate::{constants::MET_EM_MIN_SURFACE_LEVEL, errors::ConfigError, Float};
use log::warn;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Fields describing where to look for input files.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Input {
    /// Directory with WRF output files.
    pub directory: PathBuf,

    /// Glob pattern of input filenames, eg. `wrfout_d01_2017-01-02_*`.
    pub pattern: String,
}

/// Fields describing how and where output is written.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Output {
    /// Directory for output files. Created if it does not exist.
    pub directory: PathBuf,

    /// _(Optional)_ Explicit prefix of output filenames. When not set
    /// the prefix is chosen from the input filename.
    #[serde(default)]
    pub prefix: Option<String>,

    /// _(Optional)_ Output file format, `netcdf4` (default) or `classic64`.
    #[serde(default)]
    pub format: OutputFormat,

    /// _(Optional)_ Write one output file per timestep. Defaults to `false`.
    #[serde(default)]
    pub split: bool,

    /// _(Optional)_ Replace existing output files. Defaults to `false`.
    #[serde(default)]
    pub overwrite: bool,
}

/// Which fields are processed.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize)]
pub enum Mode {
    #[serde(rename = "all")]
    All,
    #[serde(rename = "list")]
    List,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::All
    }
}

/// Fields controlling the interpolation itself.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Processing {
    /// _(Optional)_ `all` (default) or `list` of fields in [`Processing::fields`].
    #[serde(default)]
    pub mode: Mode,

    /// _(Optional)_ Field names used in `list` mode.
    ///
    /// Available fields: `PRES`, `TT`, `GHT`, `RH`, `UU`, `VV`.
    #[serde(default)]
    pub fields: Vec<String>,

    /// Target pressure levels (in hPa), in any order.
    pub levels: Vec<Float>,

    /// _(Optional)_ Produce `met_em` files for WRF `real.exe`.
    ///
    /// Forces `all` mode, split output, no destaggering and extrapolation.
    /// The highest pressure level must be at least 950 hPa.
    #[serde(default)]
    pub met_em: bool,

    /// _(Optional)_ Average staggered fields onto mass points.
    /// Defaults to `true`.
    #[serde(default = "Processing::default_destagger")]
    pub destagger: bool,

    /// _(Optional)_ Extrapolate below the ground and hold the model top
    /// value above it, instead of writing the fill value. Defaults to `false`.
    #[serde(default)]
    pub extrapolate: bool,

    /// _(Optional)_ `linear` (default) in pressure or `log` (linear in log-pressure).
    #[serde(default)]
    pub method: InterpolationLaw,
}

impl Processing {
    fn default_destagger() -> bool {
        true
    }

    /// Checks if processing options are within limits.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.levels.is_empty() {
            return Err(ConfigError::OutOfBounds(
                "At least one pressure level must be requested",
            ));
        }

        if self.mode == Mode::List && self.fields.is_empty() && !self.met_em {
            return Err(ConfigError::OutOfBounds(
                "Fields list cannot be empty in list mode",
            ));
        }

        Ok(())
    }
}

/// _(Optional)_ Fields with information about
/// resources available for the program.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Resources {
    /// _(Optional)_ Thread count used for processing input files.
    ///
    /// Cannot be less than `1`. Defaults to `1`.
    #[serde(default = "Resources::default_threads")]
    pub threads: u16,

    /// _(Optional)_ Heap memory limit in MB.
    /// Useful for enabling meaningful Out-of-memory error messages.
    ///
    /// Cannot be less than `128`. Defaults to whole addressable-space.
    ///
    /// Whole input files are read into memory, so with many threads
    /// and large domains the system may kill the process without
    /// any message. With the limit set the allocator aborts with
    /// an OOM error instead.
    #[serde(default = "Resources::default_memory")]
    pub memory: usize,
}

impl Resources {
    fn default_threads() -> u16 {
        1
    }

    fn default_memory() -> usize {
        usize::MAX / (1024 * 1024)
    }

    /// Checks if thread count and memory limit are
    /// above limits.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.threads < 1 {
            return Err(ConfigError::OutOfBounds(
                "Available threads cannot be less than 1",
            ));
        }

        if self.memory < 128 {
            return Err(ConfigError::OutOfBounds(
                "Available memory cannot be less than 128 MB",
            ));
        }

        Ok(())
    }
}

impl Default for Resources {
    fn default() -> Self {
        Resources {
            threads: Resources::default_threads(),
            memory: Resources::default_memory(),
        }
    }
}

/// Main config structure representing the fields in
/// configuration file.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Config {
    pub input: Input,

    pub output: Output,

    pub processing: Processing,

    #[serde(default)]
    pub resources: Resources,

    /// _(Optional)_ Verbose logging. Defaults to `false`.
    #[serde(default)]
    pub debug: bool,
}

impl Config {
    /// Config structure constructor, responsible for
    /// deserializing configuration and checking it.
    pub fn new_from_file(file_path: &Path) -> Result<Config, ConfigError> {
        let data = fs::read(file_path)?;
        Config::new_from_slice(&data)
    }

    pub fn new_from_slice(data: &[u8]) -> Result<Config, ConfigError> {
        let config: Config = serde_yaml::from_slice(data)?;

        config.processing.check_bounds()?;
        config.resources.check_bounds()?;

        Ok(config)
    }
}

/// Immutable options the engine runs with,
/// resolved from [`Config`].
#[derive(Clone, PartialEq, Debug)]
pub struct Settings {
    pub input_directory: PathBuf,
    pub pattern: String,
    pub output_directory: PathBuf,
    pub prefix: Option<String>,
    pub format: OutputFormat,
    pub split: bool,
    pub overwrite: bool,
    pub fields: FieldSelection,
    pub levels: PressureLevels,
    pub met_em: bool,
    pub destagger: bool,
    pub scheme: Scheme,
}

impl Settings {
    /// Resolves field names and pressure levels, and applies
    /// the options implied by `met_em` output.
    pub fn derive(config: &Config) -> Result<Self, ConfigError> {
        let processing = &config.processing;
        let levels = PressureLevels::new(&processing.levels)?;

        // names are checked in every mode, even when the list is not used
        let listed = FieldSelection::from_names(&processing.fields)?;

        let prefix = config
            .output
            .prefix
            .as_ref()
            .map(|prefix| prefix.trim().to_string())
            .filter(|prefix| !prefix.is_empty());

        if processing.met_em {
            if levels.highest_pressure() < MET_EM_MIN_SURFACE_LEVEL {
                return Err(ConfigError::Incompatible(
                    "met_em output needs surface data, include a level of at least 950 hPa",
                ));
            }

            if processing.mode == Mode::List {
                warn!("met_em output processes all fields, ignoring the fields list");
            }

            if prefix.is_some() {
                warn!("met_em output files have fixed names, ignoring the output prefix");
            }

            return Ok(Settings {
                input_directory: config.input.directory.clone(),
                pattern: config.input.pattern.trim().to_string(),
                output_directory: config.output.directory.clone(),
                prefix: None,
                format: config.output.format,
                split: true,
                overwrite: config.output.overwrite,
                fields: FieldSelection::all(true),
                levels: levels.with_surface_level(),
                met_em: true,
                destagger: false,
                scheme: Scheme {
                    law: processing.method,
                    extrapolate: true,
                },
            });
        }

        let fields = match processing.mode {
            Mode::All => FieldSelection::all(false),
            Mode::List => listed,
        };

        Ok(Settings {
            input_directory: config.input.directory.clone(),
            pattern: config.input.pattern.trim().to_string(),
            output_directory: config.output.directory.clone(),
            prefix,
            format: config.output.format,
            split: config.output.split,
            overwrite: config.output.overwrite,
            fields,
            levels,
            met_em: false,
            destagger: processing.destagger,
            scheme: Scheme {
                law: processing.method,
                extrapolate: processing.extrapolate,
            },
        })
    }
}
