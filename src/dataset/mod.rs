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

//! Module describing how the processing engine talks to
//! the files it reads and writes.
//!
//! The engine never touches a file format directly. It consumes
//! arrays and metadata through [`DatasetReader`] and emits them through
//! [`DatasetWriter`], both provided by a [`Backend`]. The netCDF backend
//! used by the program lives in the [`nc`] sub-module.

#[cfg(feature = "netcdf")]
pub mod nc;

#[cfg(test)]
pub(crate) mod memory;

use crate::{
    errors::{InputError, OutputError},
    Float,
};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Value of a global or variable attribute.
///
/// Narrower numeric types found in input files are widened
/// to the closest variant by the backend.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum AttrValue {
    Text(String),
    Int(i32),
    Ints(Vec<i32>),
    Float(f32),
    Floats(Vec<f32>),
    Double(f64),
    Doubles(Vec<f64>),
}

impl AttrValue {
    /// Returns the value as integer if it holds exactly one
    /// integral number.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(i64::from(*v)),
            AttrValue::Ints(v) if v.len() == 1 => Some(i64::from(v[0])),
            AttrValue::Float(_)
            | AttrValue::Floats(_)
            | AttrValue::Double(_)
            | AttrValue::Doubles(_) => {
                let value = self.as_float()?;
                if value.fract() == 0.0 {
                    Some(value as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Returns the value as float if it holds exactly one number.
    pub fn as_float(&self) -> Option<Float> {
        match self {
            AttrValue::Int(v) => Some(Float::from(*v)),
            AttrValue::Ints(v) if v.len() == 1 => Some(Float::from(v[0])),
            AttrValue::Float(v) => Some(Float::from(*v)),
            AttrValue::Floats(v) if v.len() == 1 => Some(Float::from(v[0])),
            AttrValue::Double(v) => Some(*v),
            AttrValue::Doubles(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f32> for AttrValue {
    fn from(value: f32) -> Self {
        AttrValue::Float(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Double(value)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
    pub unlimited: bool,
}

impl Dimension {
    pub fn fixed(name: &str, len: usize) -> Self {
        Dimension {
            name: name.to_string(),
            len,
            unlimited: false,
        }
    }

    pub fn unlimited(name: &str, len: usize) -> Self {
        Dimension {
            name: name.to_string(),
            len,
            unlimited: true,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum VarType {
    Float,
    Double,
    Int,
}

/// Definition of an output variable, created before
/// any data is written.
#[derive(Clone, PartialEq, Debug)]
pub struct VariableSpec {
    pub name: String,
    pub vartype: VarType,
    pub dims: Vec<String>,
    pub attributes: Vec<(String, AttrValue)>,
}

impl VariableSpec {
    pub fn new(name: &str, vartype: VarType, dims: &[&str]) -> Self {
        VariableSpec {
            name: name.to_string(),
            vartype,
            dims: dims.iter().map(|d| (*d).to_string()).collect(),
            attributes: vec![],
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.push((name.to_string(), value.into()));
        self
    }
}

/// Typed data of one output variable.
#[derive(Clone, PartialEq, Debug)]
pub enum VarData {
    Float(ArrayD<f32>),
    Double(ArrayD<f64>),
    Int(ArrayD<i32>),
}

impl VarData {
    pub fn shape(&self) -> &[usize] {
        match self {
            VarData::Float(arr) => arr.shape(),
            VarData::Double(arr) => arr.shape(),
            VarData::Int(arr) => arr.shape(),
        }
    }

    pub fn vartype(&self) -> VarType {
        match self {
            VarData::Float(_) => VarType::Float,
            VarData::Double(_) => VarType::Double,
            VarData::Int(_) => VarType::Int,
        }
    }
}

/// Variant of the output file format.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Modern default format (netCDF-4).
    #[serde(rename = "netcdf4")]
    Netcdf4,

    /// Widely portable classic format with 64-bit offsets.
    #[serde(rename = "classic64")]
    Classic64,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Netcdf4
    }
}

/// Read access to one input file.
pub trait DatasetReader {
    fn dimensions(&self) -> Vec<Dimension>;

    fn global_attributes(&self) -> Result<Vec<(String, AttrValue)>, InputError>;

    fn has_variable(&self, name: &str) -> bool;

    /// Reads whole numeric variable converted to [`Float`].
    fn read_values(&self, name: &str) -> Result<ArrayD<Float>, InputError>;

    /// Reads a 2D character variable as one string per row,
    /// with trailing padding removed.
    fn read_text(&self, name: &str) -> Result<Vec<String>, InputError>;

    fn dimension(&self, name: &str) -> Option<Dimension> {
        self.dimensions().into_iter().find(|dim| dim.name == name)
    }

    fn global_attribute(&self, name: &str) -> Result<Option<AttrValue>, InputError> {
        Ok(self
            .global_attributes()?
            .into_iter()
            .find(|(attr_name, _)| attr_name == name)
            .map(|(_, value)| value))
    }
}

/// Write access to one output file.
///
/// All dimensions, attributes and variables are defined
/// before the first call to [`DatasetWriter::put_values`].
pub trait DatasetWriter {
    fn add_dimension(&mut self, dimension: &Dimension) -> Result<(), OutputError>;

    fn add_attribute(&mut self, name: &str, value: &AttrValue) -> Result<(), OutputError>;

    fn add_variable(&mut self, spec: &VariableSpec) -> Result<(), OutputError>;

    fn put_values(&mut self, name: &str, data: &VarData) -> Result<(), OutputError>;

    /// Flushes and closes the file.
    fn finish(self) -> Result<(), OutputError>
    where
        Self: Sized;
}

/// Opens readers and creates writers for given paths.
pub trait Backend: Send + Sync {
    type Reader: DatasetReader;
    type Writer: DatasetWriter;

    fn open(&self, path: &Path) -> Result<Self::Reader, InputError>;

    /// Creates a new file at `path`, replacing any existing file there.
    fn create(&self, path: &Path, format: OutputFormat) -> Result<Self::Writer, OutputError>;
}
