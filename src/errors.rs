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

//! Module containing errors returned by the program.
//!
//! Errors are layered in the same way as the processing:
//! configuration and discovery errors stop the whole run,
//! while input, interpolation and output errors stop
//! only the input file during which they occured.

use crate::Float;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Error while reading configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Error while discovering input files: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Cannot prepare output directory: {0}")]
    OutputDirectory(#[from] std::io::Error),

    #[error("Error while creating ThreadPool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Cannot set the memory limit of {0} MB")]
    MemoryLimit(usize),

    #[error("Processing of {0} out of {1} input files failed, check the log for details")]
    FilesFailed(usize, usize),

    #[error("Processing has been cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot open configuration file: {0}")]
    CantOpenFile(#[from] std::io::Error),

    #[error("Cannot deserialize configuration file: {0}")]
    CantDeserialize(#[from] serde_yaml::Error),

    #[error("Configuration component is out of bounds: {0}")]
    OutOfBounds(&'static str),

    #[error("Field {0} is not supported, check the list of available fields")]
    UnknownField(String),

    #[error("Pressure level {0} hPa is listed more than once")]
    DuplicateLevel(Float),

    #[error("Incompatible configuration options: {0}")]
    Incompatible(&'static str),
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Input file pattern is incorrect: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Cannot access matched input path: {0}")]
    Unreadable(#[from] glob::GlobError),

    #[error("No input files match the pattern {0}")]
    NoMatches(String),
}

/// Errors caused by input files not following
/// the expected schema or not being readable.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Dimension {0} is missing in the input file")]
    MissingDimension(String),

    #[error("Variable {0} is missing in the input file")]
    MissingVariable(String),

    #[error("Global attribute {0} is missing in the input file")]
    MissingAttribute(String),

    #[error("Global attribute {0} has incorrect type")]
    IncorrectAttributeType(String),

    #[error("Grid identifier {0} is out of the 0-99 range")]
    GridId(i64),

    #[error("Grid dimension {name} is {found} in the file but {expected} in attributes")]
    GridMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Grid is not correctly staggered: {0}")]
    Stagger(#[from] ValidationError),

    #[error("Cannot decode timestamp '{0}'")]
    Timestamp(String),

    #[error("Map projection parameter is out of bounds: {0}")]
    Projection(&'static str),

    #[error("Variable {name} has unexpected shape {shape:?}")]
    Shape { name: String, shape: Vec<usize> },

    #[error("Array shape error: {0}")]
    Array(#[from] ndarray::ShapeError),

    #[error("Input backend error: {0}")]
    Backend(String),
}

/// Error of destaggering when the declared
/// staggered axis is not one longer than the mass axis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Axis {axis} has length {found}, expected mass length + 1 = {expected}")]
    StaggerMismatch {
        axis: usize,
        expected: usize,
        found: usize,
    },

    #[error("Axis {axis} does not exist in {ndim}-dimensional array")]
    NoSuchAxis { axis: usize, ndim: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    #[error("Native column is empty")]
    EmptyColumn,

    #[error("Native pressure and values have different lengths ({0} and {1})")]
    LengthMismatch(usize, usize),

    #[error("Native pressure is not strictly decreasing at level {level}")]
    NonMonotonic { level: usize },

    #[error("Column at south_north {0}, west_east {1}: {2}")]
    Column(usize, usize, Box<InterpolationError>),
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Output directory error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output file {0} already exists and overwriting is not allowed")]
    Exists(PathBuf),

    #[error("Cannot move finished output into place: {0}")]
    Persist(#[from] tempfile::PathPersistError),

    #[error("Variable {0} has not been defined in the output")]
    UnknownVariable(String),

    #[error("Array shape error: {0}")]
    Array(#[from] ndarray::ShapeError),

    #[error("Output backend error: {0}")]
    Backend(String),
}

/// Errors that stop processing of a single input file.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Processing has been cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    #[error("Searched array is empty")]
    EmptyArray,

    #[error("Searched value is out of array bounds")]
    OutOfBounds,
}
