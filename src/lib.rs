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

//! Pressure Level Interpolator (pinterp) converts WRF model output
//! from native, terrain-following model levels onto a fixed set of
//! pressure levels.
//!
//! Output can be written either as plain pressure level files for
//! analysis and visualisation, or as `met_em` files that WRF `real.exe`
//! can use as initial and boundary conditions for a nested run.
//!
//! The processing engine lives in [`engine`] and talks to files
//! only through traits in [`dataset`].

pub mod constants;
pub mod dataset;
pub mod engine;
pub mod errors;

#[cfg(test)]
mod test_support;

pub type Float = f64;
