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

//! netCDF backend reading WRF output files and writing
//! pressure level files through the `netcdf` crate.

use super::{
    AttrValue, Backend, DatasetReader, DatasetWriter, Dimension, OutputFormat, VarData, VarType,
    VariableSpec,
};
use crate::{
    errors::{InputError, OutputError},
    Float,
};
use log::debug;
use ndarray::{ArrayD, IxDyn};
use netcdf::{AttributeValue, Extents, Options};
use std::path::Path;

impl From<netcdf::Error> for InputError {
    fn from(err: netcdf::Error) -> Self {
        InputError::Backend(err.to_string())
    }
}

impl From<netcdf::Error> for OutputError {
    fn from(err: netcdf::Error) -> Self {
        OutputError::Backend(err.to_string())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct NetcdfBackend;

impl Backend for NetcdfBackend {
    type Reader = NetcdfReader;
    type Writer = NetcdfWriter;

    fn open(&self, path: &Path) -> Result<NetcdfReader, InputError> {
        let file = netcdf::open(path)?;
        Ok(NetcdfReader { file })
    }

    fn create(&self, path: &Path, format: OutputFormat) -> Result<NetcdfWriter, OutputError> {
        let options = match format {
            OutputFormat::Netcdf4 => Options::NETCDF4,
            OutputFormat::Classic64 => Options::_64BIT_OFFSET,
        };

        let file = netcdf::create_with(path, options)?;
        Ok(NetcdfWriter { file })
    }
}

pub struct NetcdfReader {
    file: netcdf::File,
}

impl NetcdfReader {
    fn variable(&self, name: &str) -> Result<netcdf::Variable<'_>, InputError> {
        self.file
            .variable(name)
            .ok_or_else(|| InputError::MissingVariable(name.to_string()))
    }
}

impl DatasetReader for NetcdfReader {
    fn dimensions(&self) -> Vec<Dimension> {
        self.file
            .dimensions()
            .map(|dim| Dimension {
                name: dim.name(),
                len: dim.len(),
                unlimited: dim.is_unlimited(),
            })
            .collect()
    }

    fn global_attributes(&self) -> Result<Vec<(String, AttrValue)>, InputError> {
        let mut attributes = vec![];

        for attr in self.file.attributes() {
            match convert_attribute(attr.value()?) {
                Some(value) => attributes.push((attr.name().to_string(), value)),
                None => debug!("Skipping global attribute {} of unsupported type", attr.name()),
            }
        }

        Ok(attributes)
    }

    fn has_variable(&self, name: &str) -> bool {
        self.file.variable(name).is_some()
    }

    fn read_values(&self, name: &str) -> Result<ArrayD<Float>, InputError> {
        let var = self.variable(name)?;
        let shape: Vec<usize> = var.dimensions().iter().map(|dim| dim.len()).collect();
        let values = var.get_values::<Float, _>(..)?;

        Ok(ArrayD::from_shape_vec(IxDyn(&shape), values)?)
    }

    fn read_text(&self, name: &str) -> Result<Vec<String>, InputError> {
        let var = self.variable(name)?;
        let shape: Vec<usize> = var.dimensions().iter().map(|dim| dim.len()).collect();

        if shape.len() != 2 || shape[1] == 0 {
            return Err(InputError::Shape {
                name: name.to_string(),
                shape,
            });
        }

        let raw = var.get_raw_values(..)?;

        let rows = raw
            .chunks(shape[1])
            .map(|row| {
                String::from_utf8_lossy(row)
                    .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
                    .to_string()
            })
            .collect();

        Ok(rows)
    }
}

/// Maps netCDF attribute values onto [`AttrValue`],
/// widening short integers.
fn convert_attribute(value: AttributeValue) -> Option<AttrValue> {
    let converted = match value {
        AttributeValue::Str(v) => AttrValue::Text(v),
        AttributeValue::Strs(v) => AttrValue::Text(v.join(",")),
        AttributeValue::Int(v) => AttrValue::Int(v),
        AttributeValue::Ints(v) => AttrValue::Ints(v),
        AttributeValue::Short(v) => AttrValue::Int(i32::from(v)),
        AttributeValue::Shorts(v) => AttrValue::Ints(v.into_iter().map(i32::from).collect()),
        AttributeValue::Float(v) => AttrValue::Float(v),
        AttributeValue::Floats(v) => AttrValue::Floats(v),
        AttributeValue::Double(v) => AttrValue::Double(v),
        AttributeValue::Doubles(v) => AttrValue::Doubles(v),
        _ => return None,
    };

    Some(converted)
}

fn to_netcdf_attribute(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::Text(v) => AttributeValue::Str(v.clone()),
        AttrValue::Int(v) => AttributeValue::Int(*v),
        AttrValue::Ints(v) => AttributeValue::Ints(v.clone()),
        AttrValue::Float(v) => AttributeValue::Float(*v),
        AttrValue::Floats(v) => AttributeValue::Floats(v.clone()),
        AttrValue::Double(v) => AttributeValue::Double(*v),
        AttrValue::Doubles(v) => AttributeValue::Doubles(v.clone()),
    }
}

/// Explicit extents are needed because `Extents::All`
/// resolves unlimited dimensions to their current (zero) length.
fn extents_for(shape: &[usize]) -> Result<Extents, OutputError> {
    let extents: Extents = match *shape {
        [] => Extents::All,
        [a] => [0..a].into(),
        [a, b] => [0..a, 0..b].into(),
        [a, b, c] => [0..a, 0..b, 0..c].into(),
        [a, b, c, d] => [0..a, 0..b, 0..c, 0..d].into(),
        _ => {
            return Err(OutputError::Backend(format!(
                "variables of rank {} are not supported",
                shape.len()
            )))
        }
    };

    Ok(extents)
}

pub struct NetcdfWriter {
    file: netcdf::FileMut,
}

impl DatasetWriter for NetcdfWriter {
    fn add_dimension(&mut self, dimension: &Dimension) -> Result<(), OutputError> {
        if dimension.unlimited {
            self.file.add_unlimited_dimension(&dimension.name)?;
        } else {
            self.file.add_dimension(&dimension.name, dimension.len)?;
        }

        Ok(())
    }

    fn add_attribute(&mut self, name: &str, value: &AttrValue) -> Result<(), OutputError> {
        self.file.add_attribute(name, to_netcdf_attribute(value))?;
        Ok(())
    }

    fn add_variable(&mut self, spec: &VariableSpec) -> Result<(), OutputError> {
        let dims: Vec<&str> = spec.dims.iter().map(String::as_str).collect();

        let mut var = match spec.vartype {
            VarType::Float => self.file.add_variable::<f32>(&spec.name, &dims)?,
            VarType::Double => self.file.add_variable::<f64>(&spec.name, &dims)?,
            VarType::Int => self.file.add_variable::<i32>(&spec.name, &dims)?,
        };

        for (name, value) in &spec.attributes {
            var.put_attribute(name, to_netcdf_attribute(value))?;
        }

        Ok(())
    }

    fn put_values(&mut self, name: &str, data: &VarData) -> Result<(), OutputError> {
        let extents = extents_for(data.shape())?;

        let mut var = self
            .file
            .variable_mut(name)
            .ok_or_else(|| OutputError::UnknownVariable(name.to_string()))?;

        match data {
            VarData::Float(arr) => {
                let values: Vec<f32> = arr.iter().copied().collect();
                var.put_values(&values, extents)?;
            }
            VarData::Double(arr) => {
                let values: Vec<f64> = arr.iter().copied().collect();
                var.put_values(&values, extents)?;
            }
            VarData::Int(arr) => {
                let values: Vec<i32> = arr.iter().copied().collect();
                var.put_values(&values, extents)?;
            }
        }

        Ok(())
    }

    fn finish(self) -> Result<(), OutputError> {
        // netCDF flushes and closes the file when the handle is dropped
        drop(self.file);
        Ok(())
    }
}
