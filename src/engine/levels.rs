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

//! Module with the set of target pressure levels.

use crate::constants::SURFACE_LEVEL_OFFSET;
use crate::{errors::ConfigError, Float};
use float_cmp::approx_eq;
use std::cmp::Ordering;

/// Target pressure levels (in hPa), always
/// strictly descending (surface-most first).
#[derive(Clone, PartialEq, Debug)]
pub struct PressureLevels {
    hpa: Vec<Float>,
}

impl PressureLevels {
    /// Builds the level set from levels given in any order.
    pub fn new(levels: &[Float]) -> Result<Self, ConfigError> {
        if levels.is_empty() {
            return Err(ConfigError::OutOfBounds(
                "At least one pressure level must be requested",
            ));
        }

        if levels.iter().any(|p| !p.is_finite() || *p <= 0.0 || *p > 1100.0) {
            return Err(ConfigError::OutOfBounds(
                "Pressure levels must be within (0, 1100] hPa",
            ));
        }

        let mut hpa = levels.to_vec();
        hpa.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

        for pair in hpa.windows(2) {
            if approx_eq!(Float, pair[0], pair[1], ulps = 4) {
                return Err(ConfigError::DuplicateLevel(pair[0]));
            }
        }

        Ok(PressureLevels { hpa })
    }

    /// Prepends the synthetic near-surface level
    /// `SURFACE_LEVEL_OFFSET` hPa below the highest requested pressure.
    pub fn with_surface_level(self) -> Self {
        let mut hpa = Vec::with_capacity(self.hpa.len() + 1);
        hpa.push(self.hpa[0] + SURFACE_LEVEL_OFFSET);
        hpa.extend_from_slice(&self.hpa);

        PressureLevels { hpa }
    }

    pub fn hpa(&self) -> &[Float] {
        &self.hpa
    }

    pub fn pascals(&self) -> Vec<Float> {
        self.hpa.iter().map(|p| p * 100.0).collect()
    }

    pub fn len(&self) -> usize {
        self.hpa.len()
    }

    /// Level closest to the surface, in hPa.
    pub fn highest_pressure(&self) -> Float {
        self.hpa[0]
    }

    /// Level closest to the model top, in hPa.
    pub fn lowest_pressure(&self) -> Float {
        self.hpa[self.hpa.len() - 1]
    }
}
