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

//! Module with the vocabulary of fields that can be
//! interpolated onto pressure levels, and the recipes
//! computing them on native model levels.
//!
//! The vocabulary is fixed. Which fields are produced
//! in a run is decided by [`FieldSelection`].

use crate::constants::{C_P, EPSILON, R_D, REFERENCE_PRESSURE, WRF_BASE_THETA};
use crate::dataset::DatasetReader;
use crate::{
    errors::{ConfigError, InputError},
    Float,
};
use floccus::constants::G;
use ndarray::{azip, Array4, ArrayD, ArrayView4, Ix4};
use rustc_hash::FxHashMap;

/// Grid positions on which a field is defined.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Stagger {
    Mass,
    X,
    Y,
    Z,
}

impl Stagger {
    /// Staggered axis in `(Time, bottom_top, south_north, west_east)` arrays.
    pub fn axis(self) -> Option<usize> {
        match self {
            Stagger::Mass => None,
            Stagger::Z => Some(1),
            Stagger::Y => Some(2),
            Stagger::X => Some(3),
        }
    }

    /// Value of WRF `stagger` variable attribute.
    pub fn label(self) -> &'static str {
        match self {
            Stagger::Mass => "",
            Stagger::X => "X",
            Stagger::Y => "Y",
            Stagger::Z => "Z",
        }
    }
}

/// Fields that can be interpolated onto pressure levels.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum FieldKind {
    Pressure,
    Temperature,
    GeopotentialHeight,
    RelativeHumidity,
    UWind,
    VWind,
}

impl FieldKind {
    /// Whole vocabulary in its canonical order.
    pub const VOCABULARY: [FieldKind; 6] = [
        FieldKind::Pressure,
        FieldKind::Temperature,
        FieldKind::GeopotentialHeight,
        FieldKind::RelativeHumidity,
        FieldKind::UWind,
        FieldKind::VWind,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Pressure => "PRES",
            FieldKind::Temperature => "TT",
            FieldKind::GeopotentialHeight => "GHT",
            FieldKind::RelativeHumidity => "RH",
            FieldKind::UWind => "UU",
            FieldKind::VWind => "VV",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        FieldKind::VOCABULARY
            .iter()
            .copied()
            .find(|kind| kind.name() == name.trim())
    }

    pub fn units(self) -> &'static str {
        match self {
            FieldKind::Pressure => "Pa",
            FieldKind::Temperature => "K",
            FieldKind::GeopotentialHeight => "m",
            FieldKind::RelativeHumidity => "%",
            FieldKind::UWind | FieldKind::VWind => "m s-1",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FieldKind::Pressure => "Pressure",
            FieldKind::Temperature => "Temperature",
            FieldKind::GeopotentialHeight => "Height",
            FieldKind::RelativeHumidity => "Relative Humidity",
            FieldKind::UWind => "U",
            FieldKind::VWind => "V",
        }
    }

    pub fn stagger(self) -> Stagger {
        match self {
            FieldKind::GeopotentialHeight => Stagger::Z,
            FieldKind::UWind => Stagger::X,
            FieldKind::VWind => Stagger::Y,
            _ => Stagger::Mass,
        }
    }

    /// Raw WRF variables the recipe reads, apart from `P` and `PB`.
    pub fn sources(self) -> &'static [&'static str] {
        match self {
            FieldKind::Pressure => &[],
            FieldKind::Temperature => &["T"],
            FieldKind::GeopotentialHeight => &["PH", "PHB"],
            FieldKind::RelativeHumidity => &["T", "QVAPOR"],
            FieldKind::UWind => &["U"],
            FieldKind::VWind => &["V"],
        }
    }

    /// Computes the field on native levels, on its own (possibly staggered) grid.
    pub fn native(self, inputs: &NativeInputs) -> Result<Array4<Float>, InputError> {
        let field = match self {
            FieldKind::Pressure => inputs.pressure()?,
            FieldKind::Temperature => {
                let pressure = inputs.pressure()?;
                temperature(inputs.field_like("T", &pressure)?, pressure.view())
            }
            FieldKind::GeopotentialHeight => inputs.sum("PH", "PHB")? / G,
            FieldKind::RelativeHumidity => {
                let pressure = inputs.pressure()?;
                let temperature = temperature(inputs.field_like("T", &pressure)?, pressure.view());
                let mixing_ratio = inputs.field_like("QVAPOR", &pressure)?;
                relative_humidity(temperature.view(), mixing_ratio, pressure.view())
            }
            FieldKind::UWind => inputs.field("U")?.to_owned(),
            FieldKind::VWind => inputs.field("V")?.to_owned(),
        };

        Ok(field)
    }
}

/// Temperature (K) from WRF perturbation potential temperature.
pub fn temperature(theta: ArrayView4<Float>, pressure: ArrayView4<Float>) -> Array4<Float> {
    let mut temperature = Array4::zeros(theta.raw_dim());

    azip!((t in &mut temperature, &th in &theta, &p in &pressure)
        *t = (th + WRF_BASE_THETA) * (p / REFERENCE_PRESSURE).powf(R_D / C_P));

    temperature
}

/// Saturation mixing ratio using the Bolton (1980) vapour pressure.
pub fn saturation_mixing_ratio(temperature: Float, pressure: Float) -> Float {
    let vapour_pressure =
        611.2 * (17.67 * (temperature - 273.15) / (temperature - 29.65)).exp();

    EPSILON * vapour_pressure / (pressure - vapour_pressure)
}

fn relative_humidity(
    temperature: ArrayView4<Float>,
    mixing_ratio: ArrayView4<Float>,
    pressure: ArrayView4<Float>,
) -> Array4<Float> {
    let mut humidity = Array4::zeros(temperature.raw_dim());

    azip!((rh in &mut humidity, &t in &temperature, &q in &mixing_ratio, &p in &pressure)
        *rh = 100.0 * (q / saturation_mixing_ratio(t, p)).max(0.0).min(1.0));

    humidity
}

/// Fields requested for one run, kept in vocabulary order.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FieldSelection {
    fields: Vec<FieldKind>,
}

impl FieldSelection {
    /// Base fields, with winds added for `met_em` output.
    pub fn all(met_em: bool) -> Self {
        let mut fields = vec![
            FieldKind::Pressure,
            FieldKind::Temperature,
            FieldKind::GeopotentialHeight,
            FieldKind::RelativeHumidity,
        ];

        if met_em {
            fields.extend([FieldKind::UWind, FieldKind::VWind]);
        }

        FieldSelection { fields }
    }

    /// Validates names against the vocabulary, dropping repetitions.
    pub fn from_names(names: &[String]) -> Result<Self, ConfigError> {
        let mut requested = vec![];

        for name in names {
            let kind = FieldKind::from_name(name)
                .ok_or_else(|| ConfigError::UnknownField(name.clone()))?;
            requested.push(kind);
        }

        let fields = FieldKind::VOCABULARY
            .iter()
            .copied()
            .filter(|kind| requested.contains(kind))
            .collect();

        Ok(FieldSelection { fields })
    }

    pub fn iter(&self) -> impl Iterator<Item = FieldKind> + '_ {
        self.fields.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Raw WRF variables needed by all selected fields.
    pub fn sources(&self) -> Vec<&'static str> {
        let mut sources = vec!["P", "PB"];

        for source in self.fields.iter().flat_map(|kind| kind.sources()) {
            if !sources.contains(source) {
                sources.push(source);
            }
        }

        sources
    }
}

/// Raw input variables read in one pass before any computation.
#[derive(Clone, Debug, Default)]
pub struct NativeInputs {
    arrays: FxHashMap<&'static str, ArrayD<Float>>,
}

impl NativeInputs {
    /// Reads `required` variables (failing if any is missing)
    /// and those `optional` ones that are present in the file.
    pub fn read<R: DatasetReader>(
        reader: &R,
        required: &[&'static str],
        optional: &[&'static str],
    ) -> Result<Self, InputError> {
        let mut arrays = FxHashMap::default();

        for &name in required {
            if !arrays.contains_key(name) {
                arrays.insert(name, reader.read_values(name)?);
            }
        }

        for &name in optional {
            if !arrays.contains_key(name) && reader.has_variable(name) {
                arrays.insert(name, reader.read_values(name)?);
            }
        }

        Ok(NativeInputs { arrays })
    }

    pub fn get(&self, name: &str) -> Option<&ArrayD<Float>> {
        self.arrays.get(name)
    }

    /// Returns a 4D `(Time, bottom_top, south_north, west_east)` variable.
    pub fn field(&self, name: &str) -> Result<ArrayView4<Float>, InputError> {
        let array = self
            .get(name)
            .ok_or_else(|| InputError::MissingVariable(name.to_string()))?;

        array
            .view()
            .into_dimensionality::<Ix4>()
            .map_err(|_| InputError::Shape {
                name: name.to_string(),
                shape: array.shape().to_vec(),
            })
    }

    /// Returns a 4D variable checking that it has the same shape as `other`.
    pub fn field_like(
        &self,
        name: &str,
        other: &Array4<Float>,
    ) -> Result<ArrayView4<Float>, InputError> {
        let field = self.field(name)?;

        if field.shape() != other.shape() {
            return Err(InputError::Shape {
                name: name.to_string(),
                shape: field.shape().to_vec(),
            });
        }

        Ok(field)
    }

    /// Sum of WRF perturbation and base state variables.
    pub fn sum(&self, perturbation: &str, base: &str) -> Result<Array4<Float>, InputError> {
        let perturbation = self.field(perturbation)?.to_owned();
        let base = self.field_like(base, &perturbation)?;

        Ok(perturbation + base)
    }

    /// Full pressure `P + PB` (Pa) on mass points.
    pub fn pressure(&self) -> Result<Array4<Float>, InputError> {
        self.sum("P", "PB")
    }

    #[cfg(test)]
    pub fn insert(&mut self, name: &'static str, array: ArrayD<Float>) {
        self.arrays.insert(name, array);
    }

    #[cfg(test)]
    pub fn remove(&mut self, name: &str) {
        self.arrays.remove(name);
    }
}
