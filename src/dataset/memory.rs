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

//! In-memory dataset backend used by tests.
//!
//! Datasets are kept as plain structures and persisted as JSON,
//! so the whole pipeline (including staging and atomic renames)
//! can be exercised without the netCDF library.

use super::{
    AttrValue, Backend, DatasetReader, DatasetWriter, Dimension, OutputFormat, VarData, VarType,
    VariableSpec,
};
use crate::{
    errors::{InputError, OutputError},
    Float,
};
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path, path::PathBuf};

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MemoryVariable {
    pub dims: Vec<String>,
    pub vartype: VarType,
    pub attributes: Vec<(String, AttrValue)>,
    pub values: Vec<f64>,
    pub text: Vec<String>,
}

#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct MemoryDataset {
    pub format: Option<OutputFormat>,
    pub dimensions: Vec<Dimension>,
    pub attributes: Vec<(String, AttrValue)>,
    pub variables: BTreeMap<String, MemoryVariable>,
}

impl MemoryDataset {
    pub fn with_dimension(mut self, name: &str, len: usize) -> Self {
        let dim = if name == "Time" {
            Dimension::unlimited(name, len)
        } else {
            Dimension::fixed(name, len)
        };
        self.dimensions.push(dim);
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.push((name.to_string(), value.into()));
        self
    }

    pub fn without_attribute(mut self, name: &str) -> Self {
        self.attributes.retain(|(attr_name, _)| attr_name != name);
        self
    }

    pub fn with_values(mut self, name: &str, dims: &[&str], values: ArrayD<Float>) -> Self {
        self.variables.insert(
            name.to_string(),
            MemoryVariable {
                dims: dims.iter().map(|d| (*d).to_string()).collect(),
                vartype: VarType::Float,
                attributes: vec![],
                values: values.iter().copied().collect(),
                text: vec![],
            },
        );
        self
    }

    pub fn with_text(mut self, name: &str, dims: &[&str], rows: &[&str]) -> Self {
        self.variables.insert(
            name.to_string(),
            MemoryVariable {
                dims: dims.iter().map(|d| (*d).to_string()).collect(),
                vartype: VarType::Int,
                attributes: vec![],
                values: vec![],
                text: rows.iter().map(|r| (*r).to_string()).collect(),
            },
        );
        self
    }

    pub fn save(&self, path: &Path) {
        fs::write(path, serde_json::to_vec(self).unwrap()).unwrap();
    }

    pub fn load(path: &Path) -> Self {
        serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
    }

    fn variable(&self, name: &str) -> Result<&MemoryVariable, InputError> {
        self.variables
            .get(name)
            .ok_or_else(|| InputError::MissingVariable(name.to_string()))
    }

    pub fn variable_attribute(&self, var: &str, attr: &str) -> Option<&AttrValue> {
        self.variables
            .get(var)?
            .attributes
            .iter()
            .find(|(name, _)| name == attr)
            .map(|(_, value)| value)
    }
}

impl DatasetReader for MemoryDataset {
    fn dimensions(&self) -> Vec<Dimension> {
        self.dimensions.clone()
    }

    fn global_attributes(&self) -> Result<Vec<(String, AttrValue)>, InputError> {
        Ok(self.attributes.clone())
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    fn read_values(&self, name: &str) -> Result<ArrayD<Float>, InputError> {
        let var = self.variable(name)?;

        let mut shape = vec![];
        for dim_name in &var.dims {
            let dim = self
                .dimension(dim_name)
                .ok_or_else(|| InputError::MissingDimension(dim_name.clone()))?;
            shape.push(dim.len);
        }

        Ok(ArrayD::from_shape_vec(IxDyn(&shape), var.values.clone())?)
    }

    fn read_text(&self, name: &str) -> Result<Vec<String>, InputError> {
        Ok(self.variable(name)?.text.clone())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct MemoryBackend;

pub struct MemoryWriter {
    path: PathBuf,
    dataset: MemoryDataset,
}

impl Backend for MemoryBackend {
    type Reader = MemoryDataset;
    type Writer = MemoryWriter;

    fn open(&self, path: &Path) -> Result<MemoryDataset, InputError> {
        let data = fs::read(path).map_err(|err| InputError::Backend(err.to_string()))?;
        serde_json::from_slice(&data).map_err(|err| InputError::Backend(err.to_string()))
    }

    fn create(&self, path: &Path, format: OutputFormat) -> Result<MemoryWriter, OutputError> {
        fs::write(path, b"")?;

        Ok(MemoryWriter {
            path: path.to_path_buf(),
            dataset: MemoryDataset {
                format: Some(format),
                ..MemoryDataset::default()
            },
        })
    }
}

impl DatasetWriter for MemoryWriter {
    fn add_dimension(&mut self, dimension: &Dimension) -> Result<(), OutputError> {
        self.dataset.dimensions.push(dimension.clone());
        Ok(())
    }

    fn add_attribute(&mut self, name: &str, value: &AttrValue) -> Result<(), OutputError> {
        self.dataset
            .attributes
            .push((name.to_string(), value.clone()));
        Ok(())
    }

    fn add_variable(&mut self, spec: &VariableSpec) -> Result<(), OutputError> {
        self.dataset.variables.insert(
            spec.name.clone(),
            MemoryVariable {
                dims: spec.dims.clone(),
                vartype: spec.vartype,
                attributes: spec.attributes.clone(),
                values: vec![],
                text: vec![],
            },
        );
        Ok(())
    }

    fn put_values(&mut self, name: &str, data: &VarData) -> Result<(), OutputError> {
        let var = self
            .dataset
            .variables
            .get_mut(name)
            .ok_or_else(|| OutputError::UnknownVariable(name.to_string()))?;

        if var.dims.len() != data.shape().len() || var.vartype != data.vartype() {
            return Err(OutputError::Backend(format!(
                "data of {} does not match its definition",
                name
            )));
        }

        var.values = match data {
            VarData::Float(arr) => arr.iter().map(|v| f64::from(*v)).collect(),
            VarData::Double(arr) => arr.iter().copied().collect(),
            VarData::Int(arr) => arr.iter().map(|v| f64::from(*v)).collect(),
        };

        Ok(())
    }

    fn finish(self) -> Result<(), OutputError> {
        let data = serde_json::to_vec(&self.dataset)
            .map_err(|err| OutputError::Backend(err.to_string()))?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
