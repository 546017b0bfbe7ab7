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

//! Module assembling output datasets: how input timesteps
//! are split between files, how files are named and which
//! dimensions, attributes and variables each file holds.

pub mod attributes;
pub mod staging;

use super::diagnostics::Diagnostic;
use super::fields::{FieldKind, Stagger};
use super::levels::PressureLevels;
use super::time::TimeRecord;
use crate::constants::{FILL_VALUE, LEVELS_DIM, TIME_DIM, TIME_EPOCH};
use crate::dataset::{AttrValue, DatasetWriter, Dimension, VarData, VarType, VariableSpec};
use crate::errors::{InputError, OutputError};
use ndarray::{Array1, ArrayD};

/// Splits timestep indices between output files:
/// one file per timestep, or all timesteps in one file.
pub fn plan_partitions(timesteps: usize, split: bool) -> Vec<Vec<usize>> {
    if split {
        (0..timesteps).map(|t| vec![t]).collect()
    } else if timesteps == 0 {
        vec![]
    } else {
        vec![(0..timesteps).collect()]
    }
}

/// Name of the output file holding a partition starting at `first`.
pub fn output_filename(
    met_em: bool,
    prefix: Option<&str>,
    input_name: &str,
    grid_id: u8,
    first: &TimeRecord,
) -> String {
    if met_em {
        return format!("met_em.d{:02}.{}.nc", grid_id, first.stamp());
    }

    let prefix = match prefix {
        Some(prefix) => prefix.to_string(),
        None if input_name.starts_with("wrfout") => "wrfout_d".to_string(),
        None if input_name.starts_with("wrfinp") => "wrfinput_d".to_string(),
        None => "p_interp_d".to_string(),
    };

    format!("{}{:02}_{}", prefix, grid_id, first.stamp())
}

/// Dimensions, attributes and variables of one output file.
#[derive(Clone, PartialEq, Debug)]
pub struct OutputSchema {
    pub dimensions: Vec<Dimension>,
    pub attributes: Vec<(String, AttrValue)>,
    pub variables: Vec<VariableSpec>,
}

/// Everything that shapes the schema, apart from the
/// number of timesteps in the partition.
#[derive(Clone, Debug)]
pub struct SchemaLayout<'a> {
    pub input_dimensions: &'a [Dimension],
    pub attributes: &'a [(String, AttrValue)],
    pub levels: &'a PressureLevels,
    pub fields: &'a [FieldKind],
    pub diagnostics: &'a [Diagnostic],
    pub destagger: bool,
    pub met_em: bool,
}

impl OutputSchema {
    pub fn build(layout: &SchemaLayout, timesteps: usize) -> Result<Self, InputError> {
        let mut dimensions = vec![
            Dimension::unlimited(TIME_DIM, timesteps),
            Dimension::fixed(LEVELS_DIM, layout.levels.len()),
        ];

        for name in [
            "west_east",
            "south_north",
            "west_east_stag",
            "south_north_stag",
        ] {
            if let Some(dim) = layout
                .input_dimensions
                .iter()
                .find(|dim| dim.name == name)
            {
                dimensions.push(Dimension::fixed(name, dim.len));
            }
        }

        if layout.met_em {
            let soil_layers = layout
                .input_dimensions
                .iter()
                .find(|dim| dim.name == "soil_layers_stag")
                .ok_or_else(|| InputError::MissingDimension("soil_layers_stag".to_string()))?;

            dimensions.push(Dimension::fixed("z-dimension0024", 24));
            dimensions.push(Dimension::fixed("z-dimension0016", 16));
            dimensions.push(Dimension::fixed("z-dimension0012", 12));
            dimensions.push(Dimension::fixed("num_st_layers", soil_layers.len));
        }

        let mut variables = coordinate_specs();
        variables.extend(layout.fields.iter().map(|kind| field_spec(*kind, layout.destagger)));
        variables.extend(layout.diagnostics.iter().map(|diag| diagnostic_spec(*diag)));

        Ok(OutputSchema {
            dimensions,
            attributes: layout.attributes.to_vec(),
            variables,
        })
    }

    /// Defines all dimensions, attributes and variables in the output file.
    pub fn define<W: DatasetWriter>(&self, writer: &mut W) -> Result<(), OutputError> {
        for dim in &self.dimensions {
            writer.add_dimension(dim)?;
        }

        for (name, value) in &self.attributes {
            writer.add_attribute(name, value)?;
        }

        for var in &self.variables {
            writer.add_variable(var)?;
        }

        Ok(())
    }
}

fn coordinate_specs() -> Vec<VariableSpec> {
    let mut specs = vec![
        VariableSpec::new("Time", VarType::Double, &[TIME_DIM])
            .with_attribute("long_name", "Time")
            .with_attribute("units", format!("hours since {}", TIME_EPOCH))
            .with_attribute("calendar", "standard"),
        VariableSpec::new("DateTime", VarType::Int, &[TIME_DIM])
            .with_attribute("long_name", "Date and Time"),
    ];

    for name in ["year", "month", "day", "hour", "minute", "second"] {
        specs.push(VariableSpec::new(name, VarType::Int, &[TIME_DIM]).with_attribute("long_name", name));
    }

    specs.push(
        VariableSpec::new("pressures", VarType::Float, &[LEVELS_DIM])
            .with_attribute("long_name", "Pressure levels")
            .with_attribute("standard_name", "air_pressure")
            .with_attribute("units", "hPa")
            .with_attribute("positive", "down"),
    );

    specs
}

/// Output dimensions of an interpolated field.
pub fn field_dims(kind: FieldKind, destagger: bool) -> [&'static str; 4] {
    let stagger = if destagger { Stagger::Mass } else { kind.stagger() };

    let south_north = match stagger {
        Stagger::Y => "south_north_stag",
        _ => "south_north",
    };

    let west_east = match stagger {
        Stagger::X => "west_east_stag",
        _ => "west_east",
    };

    [TIME_DIM, LEVELS_DIM, south_north, west_east]
}

fn field_spec(kind: FieldKind, destagger: bool) -> VariableSpec {
    // vertical staggering does not survive interpolation
    let stagger = match kind.stagger() {
        Stagger::X | Stagger::Y if !destagger => kind.stagger(),
        _ => Stagger::Mass,
    };

    VariableSpec::new(kind.name(), VarType::Float, &field_dims(kind, destagger))
        .with_attribute("units", kind.units())
        .with_attribute("description", kind.description())
        .with_attribute("MemoryOrder", "XYZ")
        .with_attribute("stagger", stagger.label())
        .with_attribute("_FillValue", FILL_VALUE as f32)
        .with_attribute("missing_value", FILL_VALUE as f32)
}

fn diagnostic_spec(diagnostic: Diagnostic) -> VariableSpec {
    VariableSpec::new(diagnostic.name(), VarType::Float, &diagnostic.dims())
        .with_attribute("units", diagnostic.units())
        .with_attribute("description", diagnostic.description())
        .with_attribute("MemoryOrder", diagnostic.memory_order())
        .with_attribute("stagger", "")
        .with_attribute("_FillValue", FILL_VALUE as f32)
        .with_attribute("missing_value", FILL_VALUE as f32)
}

/// Values of time and coordinate variables of a partition.
pub fn coordinate_values(
    records: &[&TimeRecord],
    levels: &PressureLevels,
) -> Vec<(&'static str, VarData)> {
    let hours: Array1<f64> = records.iter().map(|record| record.hours_since_epoch()).collect();
    let pressures: Array1<f32> = levels.hpa().iter().map(|p| *p as f32).collect();

    vec![
        ("Time", VarData::Double(hours.into_dyn())),
        ("DateTime", int_values(records, TimeRecord::date_key)),
        ("year", int_values(records, |record| record.year)),
        ("month", int_values(records, |record| record.month)),
        ("day", int_values(records, |record| record.day)),
        ("hour", int_values(records, |record| record.hour)),
        ("minute", int_values(records, |record| record.minute)),
        ("second", int_values(records, |record| record.second)),
        ("pressures", VarData::Float(pressures.into_dyn())),
    ]
}

fn int_values(records: &[&TimeRecord], get: fn(&TimeRecord) -> i32) -> VarData {
    let values: Array1<i32> = records.iter().map(|record| get(record)).collect();
    VarData::Int(values.into_dyn())
}

/// Converts computed values to the type of output variables.
pub fn to_output(values: &ArrayD<f64>) -> VarData {
    VarData::Float(values.mapv(|v| v as f32))
}

#[cfg(test)]
mod tests {
    use super::{
        coordinate_values, field_dims, output_filename, plan_partitions, OutputSchema,
        SchemaLayout,
    };
    use crate::dataset::{AttrValue, Dimension, VarData};
    use crate::engine::diagnostics::Diagnostic;
    use crate::engine::fields::FieldKind;
    use crate::engine::levels::PressureLevels;
    use crate::engine::time::TimeRecord;
    use crate::errors::InputError;
    use float_cmp::approx_eq;

    fn record(stamp: &str) -> TimeRecord {
        TimeRecord::parse(stamp).unwrap()
    }

    #[test]
    fn partitions() {
        assert_eq!(plan_partitions(3, false), vec![vec![0, 1, 2]]);
        assert_eq!(plan_partitions(3, true), vec![vec![0], vec![1], vec![2]]);
        assert!(plan_partitions(0, false).is_empty());
    }

    #[test]
    fn filenames() {
        let first = record("2017-01-02_06:00:00");

        assert_eq!(
            output_filename(true, None, "wrfout_d03_2017-01-02_00:00:00", 3, &first),
            "met_em.d03.2017-01-02_06:00:00.nc"
        );
        assert_eq!(
            output_filename(false, None, "wrfout_d01_2017-01-02_00:00:00", 1, &first),
            "wrfout_d01_2017-01-02_06:00:00"
        );
        assert_eq!(
            output_filename(false, None, "wrfinput_d02", 2, &first),
            "wrfinput_d02_2017-01-02_06:00:00"
        );
        assert_eq!(
            output_filename(false, None, "custom.nc", 12, &first),
            "p_interp_d12_2017-01-02_06:00:00"
        );
        assert_eq!(
            output_filename(false, Some("plev_"), "wrfout_d01", 1, &first),
            "plev_01_2017-01-02_06:00:00"
        );
    }

    #[test]
    fn staggered_dims() {
        assert_eq!(
            field_dims(FieldKind::UWind, false),
            ["Time", "num_metgrid_levels", "south_north", "west_east_stag"]
        );
        assert_eq!(
            field_dims(FieldKind::VWind, false),
            ["Time", "num_metgrid_levels", "south_north_stag", "west_east"]
        );
        assert_eq!(
            field_dims(FieldKind::UWind, true),
            ["Time", "num_metgrid_levels", "south_north", "west_east"]
        );
        assert_eq!(
            field_dims(FieldKind::GeopotentialHeight, false),
            ["Time", "num_metgrid_levels", "south_north", "west_east"]
        );
    }

    #[test]
    fn met_em_schema() {
        let input_dimensions = vec![
            Dimension::unlimited("Time", 2),
            Dimension::fixed("west_east", 4),
            Dimension::fixed("west_east_stag", 5),
            Dimension::fixed("south_north", 3),
            Dimension::fixed("south_north_stag", 4),
            Dimension::fixed("bottom_top", 5),
            Dimension::fixed("soil_layers_stag", 4),
        ];
        let attributes = vec![("FLAG_METGRID".to_string(), AttrValue::Int(1))];
        let levels = PressureLevels::new(&[1000.0, 850.0]).unwrap().with_surface_level();
        let fields = [FieldKind::Pressure, FieldKind::UWind];
        let diagnostics = [Diagnostic::SoilHeight];

        let mut layout = SchemaLayout {
            input_dimensions: &input_dimensions,
            attributes: &attributes,
            levels: &levels,
            fields: &fields,
            diagnostics: &diagnostics,
            destagger: false,
            met_em: true,
        };

        let schema = OutputSchema::build(&layout, 1).unwrap();
        let dims: Vec<(&str, usize)> = schema
            .dimensions
            .iter()
            .map(|dim| (dim.name.as_str(), dim.len))
            .collect();

        assert_eq!(
            dims,
            vec![
                ("Time", 1),
                ("num_metgrid_levels", 3),
                ("west_east", 4),
                ("south_north", 3),
                ("west_east_stag", 5),
                ("south_north_stag", 4),
                ("z-dimension0024", 24),
                ("z-dimension0016", 16),
                ("z-dimension0012", 12),
                ("num_st_layers", 4),
            ]
        );
        assert!(schema.dimensions[0].unlimited);

        let names: Vec<&str> = schema.variables.iter().map(|var| var.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Time", "DateTime", "year", "month", "day", "hour", "minute", "second",
                "pressures", "PRES", "UU", "SOILHGT"
            ]
        );

        let no_soil = [Dimension::fixed("west_east", 4)];
        layout.input_dimensions = &no_soil;
        assert!(matches!(
            OutputSchema::build(&layout, 1),
            Err(InputError::MissingDimension(_))
        ));
    }

    #[test]
    fn coordinates() {
        let first = record("2017-01-02_06:00:00");
        let second = record("2017-01-02_09:30:00");
        let levels = PressureLevels::new(&[850.0, 1000.0]).unwrap();

        let values = coordinate_values(&[&first, &second], &levels);
        let get = |name: &str| {
            values
                .iter()
                .find(|(var, _)| *var == name)
                .map(|(_, data)| data.clone())
                .unwrap()
        };

        match get("DateTime") {
            VarData::Int(keys) => assert_eq!(keys.as_slice().unwrap(), &[2017010206, 2017010209]),
            other => panic!("unexpected {:?}", other),
        }
        match get("minute") {
            VarData::Int(minutes) => assert_eq!(minutes.as_slice().unwrap(), &[0, 30]),
            other => panic!("unexpected {:?}", other),
        }
        match get("pressures") {
            VarData::Float(p) => assert_eq!(p.as_slice().unwrap(), &[1000.0, 850.0]),
            other => panic!("unexpected {:?}", other),
        }
        match get("Time") {
            VarData::Double(hours) => {
                assert!(approx_eq!(f64, hours[[1]] - hours[[0]], 3.5, epsilon = 1e-9))
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
