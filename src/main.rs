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

//! Pressure Level Interpolator (pinterp) command line program.
//!
//! Reads the configuration from `config.yaml` in the working directory,
//! or from the path given as the first argument, and interpolates all
//! matching WRF output files onto pressure levels.

use cap::Cap;
use env_logger::Env;
use log::{debug, error, info};
use pinterp::dataset::nc::NetcdfBackend;
use pinterp::engine::{
    self,
    configuration::{Config, Settings},
    CancelToken,
};
use pinterp::errors::RunError;
use std::{alloc, env, path::PathBuf, process, sync::Arc};

/// Global allocator used by the program.
///
/// Use of static global allocator allows for capping the memory to the limit set by user
/// in configuration file and in effect provide better [OOM error](https://en.wikipedia.org/wiki/Out_of_memory) handling.
#[global_allocator]
static ALLOCATOR: Cap<alloc::System> = Cap::new(alloc::System, usize::MAX);

/// The main program function.
/// Reads configuration, prepares the runtime environment and calls the [`engine::run`].
///
/// Log level depends on the `debug` option in configuration, so the
/// configuration is read before `env_logger` is initiated and its errors
/// are reported only after that.
fn main() {
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yaml"));

    let config = Config::new_from_file(&config_path);

    let default_level = match &config {
        Ok(config) if config.debug => "debug",
        _ => "info",
    };

    let logger_env = Env::new().filter_or("PINTERP_LOG_LEVEL", default_level);

    env_logger::Builder::from_env(logger_env)
        .format_timestamp_millis()
        .init();

    let result = config.map_err(RunError::from).and_then(run);

    match result {
        Ok(_) => info!("Interpolation finished. Check the output directory and log."),
        Err(err) => {
            error!("Interpolation failed with error: {}", err);
            process::exit(1);
        }
    }
}

fn run(config: Config) -> Result<(), RunError> {
    debug!("Setting memory limit");
    let memory = config.resources.memory;
    ALLOCATOR
        .set_limit(memory.saturating_mul(1024 * 1024))
        .map_err(|_| RunError::MemoryLimit(memory))?;

    let settings = Settings::derive(&config)?;

    let report = engine::run(
        Arc::new(NetcdfBackend),
        Arc::new(settings),
        usize::from(config.resources.threads),
        CancelToken::default(),
    )?;

    let written = report.into_result()?;
    info!("Written {} output file(s)", written.len());

    Ok(())
}
