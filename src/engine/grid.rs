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

//! Module reading and validating horizontal and vertical
//! grid description of WRF input files.
//!
//! WRF global attributes `*_GRID_DIMENSION` hold the staggered
//! lengths, so every mass dimension is one shorter than its attribute.

use crate::dataset::DatasetReader;
use crate::{
    errors::{InputError, ValidationError},
    Float,
};
use log::debug;

/// Map projection of the model domain as encoded in `MAP_PROJ`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ProjectionKind {
    LambertConformal,
    PolarStereographic,
    Mercator,
    LatLon,
    Other(i64),
}

impl From<i64> for ProjectionKind {
    fn from(code: i64) -> Self {
        match code {
            1 => ProjectionKind::LambertConformal,
            2 => ProjectionKind::PolarStereographic,
            3 => ProjectionKind::Mercator,
            6 => ProjectionKind::LatLon,
            other => ProjectionKind::Other(other),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Projection {
    pub kind: ProjectionKind,
    pub truelat1: Float,
    pub truelat2: Float,
    pub stand_lon: Float,
}

impl Projection {
    /// Projection constructor checking that parameters
    /// are valid geographic coordinates.
    pub fn new(
        kind: ProjectionKind,
        truelat1: Float,
        truelat2: Float,
        stand_lon: Float,
    ) -> Result<Self, InputError> {
        if !truelat1.is_finite() || !truelat2.is_finite() || !stand_lon.is_finite() {
            return Err(InputError::Projection("one of params is not finite"));
        }

        if !(-90.0..=90.0).contains(&truelat1) || !(-90.0..=90.0).contains(&truelat2) {
            return Err(InputError::Projection("true latitude out of bounds"));
        }

        if !(-180.0..=180.0).contains(&stand_lon) {
            return Err(InputError::Projection("standard longitude out of bounds"));
        }

        Ok(Projection {
            kind,
            truelat1,
            truelat2,
            stand_lon,
        })
    }
}

/// Grid of one input file. Lengths are of mass points,
/// staggered lengths are always one more.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct GridGeometry {
    pub grid_id: u8,
    pub west_east: usize,
    pub south_north: usize,
    pub bottom_top: usize,
    pub projection: Option<Projection>,
    pub surface_physics: Option<i64>,
}

impl GridGeometry {
    /// Reads the grid from global attributes and checks it
    /// against the file dimensions.
    ///
    /// `SF_SURFACE_PHYSICS` is required only when `needs_surface_physics` is set.
    pub fn from_reader<R: DatasetReader>(
        reader: &R,
        needs_surface_physics: bool,
    ) -> Result<Self, InputError> {
        let grid_id = match int_attribute(reader, "GRID_ID")? {
            Some(id) => id,
            None => required_int(reader, "grid_id")?,
        };

        if !(0..=99).contains(&grid_id) {
            return Err(InputError::GridId(grid_id));
        }

        let west_east = checked_axis(reader, "WEST-EAST_GRID_DIMENSION", "west_east", 2)?;
        let south_north = checked_axis(reader, "SOUTH-NORTH_GRID_DIMENSION", "south_north", 1)?;
        let bottom_top = checked_axis(reader, "BOTTOM-TOP_GRID_DIMENSION", "bottom_top", 0)?;

        let surface_physics = if needs_surface_physics {
            Some(required_int(reader, "SF_SURFACE_PHYSICS")?)
        } else {
            int_attribute(reader, "SF_SURFACE_PHYSICS")?
        };

        let projection = read_projection(reader)?;

        let grid = GridGeometry {
            grid_id: grid_id as u8,
            west_east,
            south_north,
            bottom_top,
            projection,
            surface_physics,
        };

        debug!(
            "Grid d{:02}: {}x{}x{} mass points, projection {:?}",
            grid.grid_id, grid.west_east, grid.south_north, grid.bottom_top, grid.projection
        );

        Ok(grid)
    }
}

fn int_attribute<R: DatasetReader>(reader: &R, name: &str) -> Result<Option<i64>, InputError> {
    match reader.global_attribute(name)? {
        Some(value) => value
            .as_int()
            .map(Some)
            .ok_or_else(|| InputError::IncorrectAttributeType(name.to_string())),
        None => Ok(None),
    }
}

fn required_int<R: DatasetReader>(reader: &R, name: &str) -> Result<i64, InputError> {
    int_attribute(reader, name)?.ok_or_else(|| InputError::MissingAttribute(name.to_string()))
}

fn float_attribute<R: DatasetReader>(reader: &R, name: &str) -> Result<Option<Float>, InputError> {
    match reader.global_attribute(name)? {
        Some(value) => value
            .as_float()
            .map(Some)
            .ok_or_else(|| InputError::IncorrectAttributeType(name.to_string())),
        None => Ok(None),
    }
}

/// Returns the mass length of one axis after checking that
/// the attribute, the mass dimension and (if present) the
/// staggered dimension agree.
fn checked_axis<R: DatasetReader>(
    reader: &R,
    attribute: &str,
    dim_name: &str,
    axis: usize,
) -> Result<usize, InputError> {
    let staggered = required_int(reader, attribute)?;

    if staggered < 2 {
        return Err(InputError::IncorrectAttributeType(attribute.to_string()));
    }

    let staggered = staggered as usize;
    let mass = staggered - 1;

    let found = reader
        .dimension(dim_name)
        .ok_or_else(|| InputError::MissingDimension(dim_name.to_string()))?
        .len;

    if found != mass {
        return Err(InputError::GridMismatch {
            name: dim_name.to_string(),
            expected: mass,
            found,
        });
    }

    if let Some(stag) = reader.dimension(&format!("{}_stag", dim_name)) {
        if stag.len != staggered {
            return Err(ValidationError::StaggerMismatch {
                axis,
                expected: staggered,
                found: stag.len,
            }
            .into());
        }
    }

    Ok(mass)
}

/// Projection is optional, but when all its attributes
/// are present they must be valid.
fn read_projection<R: DatasetReader>(reader: &R) -> Result<Option<Projection>, InputError> {
    let kind = int_attribute(reader, "MAP_PROJ")?;
    let truelat1 = float_attribute(reader, "TRUELAT1")?;
    let truelat2 = float_attribute(reader, "TRUELAT2")?;
    let stand_lon = float_attribute(reader, "STAND_LON")?;

    match (kind, truelat1, truelat2, stand_lon) {
        (Some(kind), Some(lat_1), Some(lat_2), Some(lon_0)) => Ok(Some(Projection::new(
            kind.into(),
            lat_1,
            lat_2,
            lon_0,
        )?)),
        _ => Ok(None),
    }
}
