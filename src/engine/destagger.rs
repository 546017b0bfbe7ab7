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

//! Module with operations moving fields between
//! mass points and staggered (cell face) points of WRF grid.

use crate::{errors::ValidationError, Float};
use ndarray::{ArrayD, ArrayViewD, Axis, Slice};

/// Averages a field staggered along `axis` onto mass points:
/// `out[i] = (in[i] + in[i+1]) / 2`. Other axes are unchanged.
///
/// Staggered axis must be exactly one longer than `mass_len`.
pub fn destagger(
    field: ArrayViewD<Float>,
    axis: usize,
    mass_len: usize,
) -> Result<ArrayD<Float>, ValidationError> {
    check_axis(&field, axis)?;

    let found = field.len_of(Axis(axis));
    if found != mass_len + 1 {
        return Err(ValidationError::StaggerMismatch {
            axis,
            expected: mass_len + 1,
            found,
        });
    }

    let lower = field.slice_axis(Axis(axis), Slice::from(..mass_len));
    let upper = field.slice_axis(Axis(axis), Slice::from(1..));

    Ok((&lower + &upper) * 0.5)
}

/// Moves a mass-point field onto points staggered along `axis`.
///
/// Interior points are the average of two neighbouring mass points,
/// the edge points repeat the nearest mass value. The result is one
/// element longer along `axis`.
pub fn stagger(field: ArrayViewD<Float>, axis: usize) -> Result<ArrayD<Float>, ValidationError> {
    check_axis(&field, axis)?;

    let mass_len = field.len_of(Axis(axis));
    if mass_len == 0 {
        return Err(ValidationError::StaggerMismatch {
            axis,
            expected: 1,
            found: 0,
        });
    }

    let mut shape = field.shape().to_vec();
    shape[axis] = mass_len + 1;
    let mut staggered = ArrayD::zeros(shape);

    let lower = field.slice_axis(Axis(axis), Slice::from(..mass_len - 1));
    let upper = field.slice_axis(Axis(axis), Slice::from(1..));
    staggered
        .slice_axis_mut(Axis(axis), Slice::from(1..mass_len))
        .assign(&((&lower + &upper) * 0.5));

    staggered
        .index_axis_mut(Axis(axis), 0)
        .assign(&field.index_axis(Axis(axis), 0));
    staggered
        .index_axis_mut(Axis(axis), mass_len)
        .assign(&field.index_axis(Axis(axis), mass_len - 1));

    Ok(staggered)
}

fn check_axis(field: &ArrayViewD<Float>, axis: usize) -> Result<(), ValidationError> {
    if axis >= field.ndim() {
        return Err(ValidationError::NoSuchAxis {
            axis,
            ndim: field.ndim(),
        });
    }

    Ok(())
}
