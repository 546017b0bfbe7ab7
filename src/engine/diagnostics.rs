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

//! Module computing static and diagnostic fields
//! added to `met_em` output on top of interpolated fields.
//!
//! Sources of those fields are optional in WRF output, so
//! a diagnostic that cannot be computed is skipped with a warning
//! and the rest of the output is unaffected.

use super::fields::{temperature, NativeInputs};
use crate::constants::{LAPSE_RATE, R_D};
use crate::{errors::InputError, Float};
use floccus::constants::G;
use log::{debug, warn};
use ndarray::{azip, Array3, Array4, ArrayD, ArrayView, Axis, Dimension, Ix2, Ix3};

/// Extra fields of `met_em` files.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Diagnostic {
    LandUse,
    SoilType,
    SoilLayers,
    SoilHeight,
    SeaLevelPressure,
}

impl Diagnostic {
    pub const ALL: [Diagnostic; 5] = [
        Diagnostic::LandUse,
        Diagnostic::SoilType,
        Diagnostic::SoilLayers,
        Diagnostic::SoilHeight,
        Diagnostic::SeaLevelPressure,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Diagnostic::LandUse => "LANDUSEF",
            Diagnostic::SoilType => "SOILCTOP",
            Diagnostic::SoilLayers => "SOIL_LAYERS",
            Diagnostic::SoilHeight => "SOILHGT",
            Diagnostic::SeaLevelPressure => "PMSL",
        }
    }

    pub fn units(self) -> &'static str {
        match self {
            Diagnostic::LandUse | Diagnostic::SoilType => "category",
            Diagnostic::SoilLayers => "cm",
            Diagnostic::SoilHeight => "m",
            Diagnostic::SeaLevelPressure => "Pa",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Diagnostic::LandUse => "24-category USGS landuse",
            Diagnostic::SoilType => "16-category top-layer soil type",
            Diagnostic::SoilLayers => "",
            Diagnostic::SoilHeight => "Terrain field of source analysis",
            Diagnostic::SeaLevelPressure => "Sea-level Pressure",
        }
    }

    pub fn memory_order(self) -> &'static str {
        match self {
            Diagnostic::SoilHeight | Diagnostic::SeaLevelPressure => "XY",
            _ => "XYZ",
        }
    }

    /// Output dimensions, with horizontal ones on mass points.
    pub fn dims(self) -> Vec<&'static str> {
        let vertical = match self {
            Diagnostic::LandUse => Some("z-dimension0024"),
            Diagnostic::SoilType => Some("z-dimension0016"),
            Diagnostic::SoilLayers => Some("num_st_layers"),
            Diagnostic::SoilHeight | Diagnostic::SeaLevelPressure => None,
        };

        let mut dims = vec!["Time"];
        dims.extend(vertical);
        dims.extend(["south_north", "west_east"]);
        dims
    }

    /// Raw WRF variables the diagnostic is computed from.
    pub fn sources(self) -> &'static [&'static str] {
        match self {
            Diagnostic::LandUse => &["LANDUSEF"],
            Diagnostic::SoilType => &["SOILCTOP"],
            Diagnostic::SoilLayers => &["ZS"],
            Diagnostic::SoilHeight => &["HGT"],
            Diagnostic::SeaLevelPressure => &["PSFC", "HGT", "T", "P", "PB"],
        }
    }

    /// Computes the diagnostic for all timesteps. `horizontal` is
    /// the `(south_north, west_east)` mass grid shape.
    pub fn compute(
        self,
        inputs: &NativeInputs,
        horizontal: (usize, usize),
    ) -> Result<ArrayD<Float>, InputError> {
        let values = match self {
            Diagnostic::LandUse => categories(inputs, "LANDUSEF", 24)?,
            Diagnostic::SoilType => categories(inputs, "SOILCTOP", 16)?,
            Diagnostic::SoilLayers => soil_layers(inputs, horizontal)?.into_dyn(),
            Diagnostic::SoilHeight => surface(inputs, "HGT")?.to_owned().into_dyn(),
            Diagnostic::SeaLevelPressure => sea_level_pressure(inputs)?.into_dyn(),
        };

        Ok(values)
    }
}

/// All diagnostics that can be computed from the input,
/// in their canonical order.
pub fn compute_available(
    inputs: &NativeInputs,
    horizontal: (usize, usize),
) -> Vec<(Diagnostic, ArrayD<Float>)> {
    let mut computed = vec![];

    for diagnostic in Diagnostic::ALL {
        match diagnostic.compute(inputs, horizontal) {
            Ok(values) => {
                debug!("Computed {} diagnostic", diagnostic.name());
                computed.push((diagnostic, values));
            }
            Err(err) => warn!(
                "Skipping {} in met_em output, cannot compute it: {}",
                diagnostic.name(),
                err
            ),
        }
    }

    computed
}

/// Sources of all diagnostics, read when present.
pub fn all_sources() -> Vec<&'static str> {
    let mut sources = vec![];

    for source in Diagnostic::ALL.iter().flat_map(|diag| diag.sources()) {
        if !sources.contains(source) {
            sources.push(source);
        }
    }

    sources
}

fn view_of<'a, D: Dimension>(
    inputs: &'a NativeInputs,
    name: &str,
) -> Result<ArrayView<'a, Float, D>, InputError> {
    let array = inputs
        .get(name)
        .ok_or_else(|| InputError::MissingVariable(name.to_string()))?;

    array
        .view()
        .into_dimensionality::<D>()
        .map_err(|_| InputError::Shape {
            name: name.to_string(),
            shape: array.shape().to_vec(),
        })
}

fn surface<'a>(
    inputs: &'a NativeInputs,
    name: &str,
) -> Result<ArrayView<'a, Float, Ix3>, InputError> {
    view_of::<Ix3>(inputs, name)
}

/// Category fractions `(Time, category, south_north, west_east)`.
fn categories(
    inputs: &NativeInputs,
    name: &str,
    count: usize,
) -> Result<ArrayD<Float>, InputError> {
    let field = inputs.field(name)?;

    if field.len_of(Axis(1)) != count {
        return Err(InputError::Shape {
            name: name.to_string(),
            shape: field.shape().to_vec(),
        });
    }

    Ok(field.to_owned().into_dyn())
}

/// Soil layer depths (m) converted to cm and spread over the horizontal grid.
fn soil_layers(
    inputs: &NativeInputs,
    horizontal: (usize, usize),
) -> Result<Array4<Float>, InputError> {
    let depths = view_of::<Ix2>(inputs, "ZS")?;
    let (times, layers) = depths.dim();

    let mut soil_layers = Array4::zeros((times, layers, horizontal.0, horizontal.1));

    for ((t, l, _, _), value) in soil_layers.indexed_iter_mut() {
        *value = depths[[t, l]] * 100.0;
    }

    Ok(soil_layers)
}

/// Mean sea level pressure from surface pressure assuming
/// standard lapse rate below the lowest model level.
fn sea_level_pressure(inputs: &NativeInputs) -> Result<Array3<Float>, InputError> {
    let surface_pressure = surface(inputs, "PSFC")?;
    let height = surface(inputs, "HGT")?;

    let pressure = inputs.pressure()?;
    let temperature = temperature(inputs.field_like("T", &pressure)?, pressure.view());
    let lowest_temperature = temperature.index_axis(Axis(1), 0);

    if surface_pressure.shape() != height.shape()
        || surface_pressure.shape() != lowest_temperature.shape()
    {
        return Err(InputError::Shape {
            name: "PSFC".to_string(),
            shape: surface_pressure.shape().to_vec(),
        });
    }

    let exponent = G / (R_D * LAPSE_RATE);
    let mut sea_level = Array3::zeros(surface_pressure.raw_dim());

    azip!((slp in &mut sea_level, &ps in &surface_pressure, &z in &height, &t in &lowest_temperature)
        *slp = ps * (1.0 + LAPSE_RATE * z / t).powf(exponent));

    Ok(sea_level)
}
