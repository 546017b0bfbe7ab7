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

//! Module containing vertical interpolation methods,
//! resampling native-level profiles onto pressure levels.
//!
//! Every column is a pair of native pressures (strictly decreasing
//! with height, surface-most first) and field values. Targets inside
//! the native range are interpolated linearly in pressure or in
//! log-pressure. Below the surface the line through two lowest
//! samples is extended, above the model top the top value is held,
//! both only when extrapolation is enabled. Otherwise [`FILL_VALUE`]
//! is returned.

pub mod bisection;

use crate::constants::FILL_VALUE;
use crate::{errors::InterpolationError, Float};
use ndarray::{Array3, ArrayView1, ArrayView3, ArrayViewMut1, Axis, Zip};
use serde::Deserialize;

/// Coordinate in which values are assumed to vary linearly.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize)]
pub enum InterpolationLaw {
    /// Linear in pressure.
    #[serde(rename = "linear")]
    Linear,

    /// Linear in natural logarithm of pressure.
    #[serde(rename = "log")]
    LogLinear,
}

impl Default for InterpolationLaw {
    fn default() -> Self {
        InterpolationLaw::Linear
    }
}

impl InterpolationLaw {
    fn coordinate(self, pressure: Float) -> Float {
        match self {
            InterpolationLaw::Linear => pressure,
            InterpolationLaw::LogLinear => pressure.ln(),
        }
    }
}

/// Interpolation law with extrapolation policy.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Scheme {
    pub law: InterpolationLaw,
    pub extrapolate: bool,
}

/// Position of a target pressure relative to the native profile.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Bracket {
    Exact(usize),
    Between(usize),
    BelowSurface,
    AboveTop,
}

/// Checks that a native pressure profile can be bracketed unambiguously.
pub fn check_profile(pressure: ArrayView1<Float>) -> Result<(), InterpolationError> {
    if pressure.is_empty() {
        return Err(InterpolationError::EmptyColumn);
    }

    for (level, &p) in pressure.iter().enumerate() {
        if !p.is_finite() || (level > 0 && p >= pressure[level - 1]) {
            return Err(InterpolationError::NonMonotonic { level });
        }
    }

    Ok(())
}

/// Locates the target with bisection, used for single values.
fn locate(pressure: &[Float], target: Float) -> Bracket {
    let n = pressure.len();

    if target > pressure[0] {
        return Bracket::BelowSurface;
    }

    if target < pressure[n - 1] {
        return Bracket::AboveTop;
    }

    // in-range targets cannot fail the search
    match bisection::find_left_closest(pressure, &target) {
        Ok(k) if pressure[k] == target => Bracket::Exact(k),
        Ok(k) => Bracket::Between(k),
        Err(_) => Bracket::AboveTop,
    }
}

fn linear(law: InterpolationLaw, p: (Float, Float), v: (Float, Float), target: Float) -> Float {
    let c_0 = law.coordinate(p.0);
    let c_1 = law.coordinate(p.1);
    let c_t = law.coordinate(target);

    v.0 + (v.1 - v.0) * (c_t - c_0) / (c_1 - c_0)
}

fn evaluate(
    pressure: ArrayView1<Float>,
    values: ArrayView1<Float>,
    target: Float,
    bracket: Bracket,
    scheme: Scheme,
) -> Float {
    let n = pressure.len();

    match bracket {
        Bracket::Exact(k) => values[k],
        Bracket::Between(k) => linear(
            scheme.law,
            (pressure[k], pressure[k + 1]),
            (values[k], values[k + 1]),
            target,
        ),
        Bracket::BelowSurface if !scheme.extrapolate => FILL_VALUE,
        Bracket::BelowSurface if n == 1 => values[0],
        Bracket::BelowSurface => linear(
            scheme.law,
            (pressure[0], pressure[1]),
            (values[0], values[1]),
            target,
        ),
        Bracket::AboveTop if !scheme.extrapolate => FILL_VALUE,
        Bracket::AboveTop => values[n - 1],
    }
}

/// Resamples one native profile at one target pressure.
///
/// Pressures and target must be in the same units.
pub fn resample_value(
    pressure: &[Float],
    values: &[Float],
    target: Float,
    scheme: Scheme,
) -> Result<Float, InterpolationError> {
    if pressure.len() != values.len() {
        return Err(InterpolationError::LengthMismatch(
            pressure.len(),
            values.len(),
        ));
    }

    let pressure_view = ArrayView1::from(pressure);
    check_profile(pressure_view)?;

    let bracket = locate(pressure, target);

    Ok(evaluate(
        pressure_view,
        ArrayView1::from(values),
        target,
        bracket,
        scheme,
    ))
}

/// Resamples a checked column at all targets.
///
/// Instead of searching for every target separately the cursor
/// moves up the column together with (descending) targets.
/// When targets are not descending the cursor restarts at the surface.
fn resample_column(
    pressure: ArrayView1<Float>,
    values: ArrayView1<Float>,
    targets: &[Float],
    scheme: Scheme,
    mut out: ArrayViewMut1<Float>,
) {
    let n = pressure.len();
    let mut k = 0;

    for (result, &target) in out.iter_mut().zip(targets) {
        let bracket = if target > pressure[0] {
            Bracket::BelowSurface
        } else if target < pressure[n - 1] {
            Bracket::AboveTop
        } else {
            if pressure[k] < target {
                k = 0;
            }

            while k + 1 < n && pressure[k + 1] >= target {
                k += 1;
            }

            if pressure[k] == target {
                Bracket::Exact(k)
            } else {
                Bracket::Between(k)
            }
        };

        *result = evaluate(pressure, values, target, bracket, scheme);
    }
}

/// Resamples a 3D field `(level, south_north, west_east)` onto target
/// pressures, returning an array `(target, south_north, west_east)`.
///
/// All columns are checked first, so that the error can point to
/// the offending column, and then interpolated in parallel.
pub fn resample_columns(
    pressure: ArrayView3<Float>,
    values: ArrayView3<Float>,
    targets: &[Float],
    scheme: Scheme,
) -> Result<Array3<Float>, InterpolationError> {
    if pressure.dim() != values.dim() {
        return Err(InterpolationError::LengthMismatch(
            pressure.len(),
            values.len(),
        ));
    }

    let (_, ny, nx) = pressure.dim();

    for j in 0..ny {
        for i in 0..nx {
            check_profile(pressure.slice(ndarray::s![.., j, i]))
                .map_err(|err| InterpolationError::Column(j, i, Box::new(err)))?;
        }
    }

    let mut resampled = Array3::from_elem((targets.len(), ny, nx), FILL_VALUE);

    Zip::from(resampled.lanes_mut(Axis(0)))
        .and(pressure.lanes(Axis(0)))
        .and(values.lanes(Axis(0)))
        .par_for_each(|out, p, v| resample_column(p, v, targets, scheme, out));

    Ok(resampled)
}

/// Whether the requested levels reach above the model top,
/// where data should be used with caution.
pub fn reaches_above_top(model_top: Float, targets: &[Float]) -> bool {
    targets.iter().any(|&target| target < model_top)
}
