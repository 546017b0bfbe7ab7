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

//! Module containing constants used by the program.

use crate::Float;

/// Value written wherever a target level could not be computed,
/// i.e. outside of the native profile with extrapolation disabled.
pub const FILL_VALUE: Float = 1.0e36;

/// Offset (in hPa) of the synthetic near-surface level
/// prepended to target levels in `met_em` output.
pub const SURFACE_LEVEL_OFFSET: Float = 5.0;

/// `met_em` output needs surface data, so the highest
/// configured pressure level (in hPa) cannot be lower than this.
pub const MET_EM_MIN_SURFACE_LEVEL: Float = 950.0;

/// Base potential temperature (in K) of WRF perturbation
/// potential temperature `T`.
pub const WRF_BASE_THETA: Float = 300.0;

/// Reference pressure (in Pa) of potential temperature.
pub const REFERENCE_PRESSURE: Float = 100_000.0;

/// Gas constant of dry air (J kg^-1 K^-1).
pub const R_D: Float = 287.04;

/// Specific heat of dry air at constant pressure (J kg^-1 K^-1).
pub const C_P: Float = 1004.0;

/// Ratio of molecular weights of water vapour and dry air.
pub const EPSILON: Float = 0.622;

/// Standard atmosphere temperature lapse rate (K m^-1).
pub const LAPSE_RATE: Float = 0.0065;

/// Reference epoch of the `Time` variable in output files.
pub const TIME_EPOCH: &str = "1997-01-01 00:00:00";

/// Format of WRF `Times` strings.
pub const WRF_TIME_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Lenght of WRF `Times` strings.
pub const WRF_TIME_LENGTH: usize = 19;

/// Name of the vertical dimension in output files.
pub const LEVELS_DIM: &str = "num_metgrid_levels";

/// Name of the (unlimited) time dimension.
pub const TIME_DIM: &str = "Time";
