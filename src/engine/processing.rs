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

//! Module processing one input file into its output files.
//!
//! The input file is read completely first (grid, timestamps and all
//! raw variables), then every output partition is built independently
//! of others: schema, coordinates, interpolated fields and diagnostics.

use super::configuration::Settings;
use super::destagger::{destagger, stagger};
use super::diagnostics::{self, Diagnostic};
use super::fields::{FieldKind, NativeInputs, Stagger};
use super::grid::GridGeometry;
use super::interpolation::{reaches_above_top, resample_columns};
use super::output::{
    self, attributes::output_attributes, staging::StagedOutput, OutputSchema, SchemaLayout,
};
use super::time::{self, TimeRecord};
use super::CancelToken;
use crate::constants::TIME_DIM;
use crate::dataset::{AttrValue, Backend, DatasetReader, DatasetWriter, Dimension};
use crate::errors::{InputError, InterpolationError, ProcessingError};
use crate::Float;
use log::{debug, info, warn};
use ndarray::{Array4, ArrayD, Axis, Ix3, Ix4};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// Field on native levels, defined on the same points as
/// the native pressure stored for its `position`.
#[derive(Debug)]
struct NativeField {
    kind: FieldKind,
    values: Array4<Float>,
    position: Stagger,
}

/// Everything read and derived from one input file.
#[derive(Debug)]
struct PreparedInput {
    grid: GridGeometry,
    records: Vec<TimeRecord>,
    dimensions: Vec<Dimension>,
    attributes: Vec<(String, AttrValue)>,
    fields: Vec<NativeField>,
    pressures: FxHashMap<Stagger, Array4<Float>>,
    diagnostics: Vec<(Diagnostic, ArrayD<Float>)>,
}

/// Processes one input file, returning paths of written outputs.
///
/// Output files are written only when complete, so on error
/// or cancellation nothing is left in the output directory
/// for the partitions that did not finish.
pub fn process_file<B: Backend>(
    backend: &B,
    path: &Path,
    settings: &Settings,
    cancel: &CancelToken,
) -> Result<Vec<PathBuf>, ProcessingError> {
    if cancel.is_cancelled() {
        return Err(ProcessingError::Cancelled);
    }

    debug!("Reading input file {}", path.display());

    let prepared = {
        let reader = backend.open(path)?;
        prepare(&reader, settings)?
    };

    let input_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let fields: Vec<FieldKind> = prepared.fields.iter().map(|field| field.kind).collect();
    let diagnostics: Vec<Diagnostic> = prepared.diagnostics.iter().map(|(diag, _)| *diag).collect();

    let layout = SchemaLayout {
        input_dimensions: &prepared.dimensions,
        attributes: &prepared.attributes,
        levels: &settings.levels,
        fields: &fields,
        diagnostics: &diagnostics,
        destagger: settings.destagger,
        met_em: settings.met_em,
    };

    let writer = PartitionWriter {
        backend,
        settings,
        prepared: &prepared,
        layout: &layout,
        input_name: &input_name,
        targets: settings.levels.pascals(),
        cancel,
    };

    let partitions = output::plan_partitions(prepared.records.len(), settings.split);
    debug!(
        "Writing {} output file(s) from {}",
        partitions.len(),
        input_name
    );

    partitions
        .par_iter()
        .map(|times| writer.write(times))
        .collect()
}

/// Checks that the input file has a valid grid and timestamps,
/// without reading any of its fields.
pub fn validate_file<B: Backend>(
    backend: &B,
    path: &Path,
    settings: &Settings,
) -> Result<(), ProcessingError> {
    let reader = backend.open(path)?;
    let grid = GridGeometry::from_reader(&reader, settings.met_em)?;
    let records = time::parse_all(&reader.read_text("Times")?)?;

    debug!(
        "Input {} is valid: domain d{:02} with {} timestep(s)",
        path.display(),
        grid.grid_id,
        records.len()
    );

    Ok(())
}

/// Read-only pass over the input file.
fn prepare<R: DatasetReader>(reader: &R, settings: &Settings) -> Result<PreparedInput, InputError> {
    let grid = GridGeometry::from_reader(reader, settings.met_em)?;

    if reader.dimension(TIME_DIM).is_none() {
        return Err(InputError::MissingDimension(TIME_DIM.to_string()));
    }

    let records = time::parse_all(&reader.read_text("Times")?)?;
    if records.is_empty() {
        return Err(InputError::Shape {
            name: "Times".to_string(),
            shape: vec![0],
        });
    }

    let model_top: Vec<Float> = reader.read_values("P_TOP")?.iter().copied().collect();
    if model_top.is_empty() {
        return Err(InputError::Shape {
            name: "P_TOP".to_string(),
            shape: vec![0],
        });
    }

    if let Some(advisory) = model_top_advisory(model_top[0], settings) {
        warn!("{}", advisory);
    }

    let mut optional = vec!["PSFC"];
    if settings.met_em {
        optional.extend(diagnostics::all_sources());
    }

    let inputs = NativeInputs::read(reader, &settings.fields.sources(), &optional)?;

    let mass_pressure = inputs.pressure()?;
    let expected_shape = [
        records.len(),
        grid.bottom_top,
        grid.south_north,
        grid.west_east,
    ];

    if mass_pressure.shape() != expected_shape {
        return Err(InputError::Shape {
            name: "P".to_string(),
            shape: mass_pressure.shape().to_vec(),
        });
    }

    let mut pressures = FxHashMap::default();
    pressures.insert(Stagger::Mass, mass_pressure);

    let mut fields = Vec::with_capacity(settings.fields.len());

    for kind in settings.fields.iter() {
        let mut values = kind.native(&inputs)?;
        let mut position = kind.stagger();

        if let Some(axis) = position.axis() {
            if settings.destagger {
                values = destagger(values.view().into_dyn(), axis, mass_len(&grid, position))?
                    .into_dimensionality::<Ix4>()?;
                position = Stagger::Mass;
            } else if !pressures.contains_key(&position) {
                let staggered =
                    staggered_pressure(&pressures[&Stagger::Mass], position, &inputs, &model_top)?;
                pressures.insert(position, staggered);
            }
        }

        if values.shape() != pressures[&position].shape() {
            return Err(InputError::Shape {
                name: kind.name().to_string(),
                shape: values.shape().to_vec(),
            });
        }

        fields.push(NativeField {
            kind,
            values,
            position,
        });
    }

    let diagnostics = if settings.met_em {
        let horizontal = (grid.south_north, grid.west_east);
        let soil_layers = reader.dimension("soil_layers_stag").map(|dim| dim.len);

        diagnostics::compute_available(&inputs, horizontal)
            .into_iter()
            .filter(|(diag, values)| {
                let shape = values.shape();
                let fits = shape[0] == records.len()
                    && shape[shape.len() - 2..] == [horizontal.0, horizontal.1]
                    && (*diag != Diagnostic::SoilLayers || Some(shape[1]) == soil_layers);

                if !fits {
                    warn!(
                        "Skipping {} in met_em output, its shape {:?} does not match the grid",
                        diag.name(),
                        shape
                    );
                }

                fits
            })
            .collect()
    } else {
        vec![]
    };

    let attributes = output_attributes(
        &reader.global_attributes()?,
        settings.levels.len(),
        if settings.met_em {
            grid.surface_physics
        } else {
            None
        },
    );

    Ok(PreparedInput {
        grid,
        records,
        dimensions: reader.dimensions(),
        attributes,
        fields,
        pressures,
        diagnostics,
    })
}

/// Message about extrapolated values above the model top,
/// when any requested level lies above `P_TOP`.
fn model_top_advisory(model_top: Float, settings: &Settings) -> Option<String> {
    if !settings.scheme.extrapolate || !reaches_above_top(model_top, &settings.levels.pascals()) {
        return None;
    }

    Some(format!(
        "Model top (P_TOP = {:.1} hPa) is below the lowest requested level ({:.1} hPa), values above the model top are copied from the top level and should be used with caution",
        model_top / 100.0,
        settings.levels.lowest_pressure()
    ))
}

fn mass_len(grid: &GridGeometry, position: Stagger) -> usize {
    match position {
        Stagger::X => grid.west_east,
        Stagger::Y => grid.south_north,
        Stagger::Z | Stagger::Mass => grid.bottom_top,
    }
}

/// Native pressure moved onto staggered points. Vertically the
/// bottom and top faces are the surface pressure and the model top.
fn staggered_pressure(
    mass: &Array4<Float>,
    position: Stagger,
    inputs: &NativeInputs,
    model_top: &[Float],
) -> Result<Array4<Float>, InputError> {
    let axis = match position.axis() {
        Some(axis) => axis,
        None => return Ok(mass.clone()),
    };

    let mut staggered = stagger(mass.view().into_dyn(), axis)?.into_dimensionality::<Ix4>()?;

    if position == Stagger::Z {
        let top = staggered.len_of(Axis(1)) - 1;
        let mut top_face = staggered.index_axis_mut(Axis(1), top);

        for (t, mut face) in top_face.outer_iter_mut().enumerate() {
            face.fill(model_top[t.min(model_top.len() - 1)]);
        }

        if let Some(surface_pressure) = inputs.get("PSFC") {
            let mut bottom_face = staggered.index_axis_mut(Axis(1), 0);

            let surface_pressure = surface_pressure
                .view()
                .into_dimensionality::<Ix3>()
                .ok()
                .filter(|psfc| psfc.shape() == bottom_face.shape())
                .ok_or_else(|| InputError::Shape {
                    name: "PSFC".to_string(),
                    shape: surface_pressure.shape().to_vec(),
                })?;

            bottom_face.assign(&surface_pressure);
        }
    }

    Ok(staggered)
}

/// Writes output partitions of one prepared input file.
struct PartitionWriter<'a, B: Backend> {
    backend: &'a B,
    settings: &'a Settings,
    prepared: &'a PreparedInput,
    layout: &'a SchemaLayout<'a>,
    input_name: &'a str,
    targets: Vec<Float>,
    cancel: &'a CancelToken,
}

impl<'a, B: Backend> PartitionWriter<'a, B> {
    fn write(&self, times: &[usize]) -> Result<PathBuf, ProcessingError> {
        if self.cancel.is_cancelled() {
            return Err(ProcessingError::Cancelled);
        }

        let settings = self.settings;
        let records: Vec<&TimeRecord> = times.iter().map(|&t| &self.prepared.records[t]).collect();

        let filename = output::output_filename(
            settings.met_em,
            settings.prefix.as_deref(),
            self.input_name,
            self.prepared.grid.grid_id,
            records[0],
        );

        let staged = StagedOutput::new(&settings.output_directory, &filename, settings.overwrite)?;
        let mut writer = self.backend.create(staged.path(), settings.format)?;

        OutputSchema::build(self.layout, times.len())?.define(&mut writer)?;

        for (name, data) in output::coordinate_values(&records, &settings.levels) {
            writer.put_values(name, &data)?;
        }

        for field in &self.prepared.fields {
            if self.cancel.is_cancelled() {
                return Err(ProcessingError::Cancelled);
            }

            let interpolated = self.interpolate(field, times).map_err(|err| {
                debug!("Interpolation of {} failed", field.kind.name());
                err
            })?;

            writer.put_values(field.kind.name(), &output::to_output(&interpolated.into_dyn()))?;
        }

        for (diagnostic, values) in &self.prepared.diagnostics {
            let selected = values.select(Axis(0), times);
            writer.put_values(diagnostic.name(), &output::to_output(&selected))?;
        }

        writer.finish()?;

        if self.cancel.is_cancelled() {
            return Err(ProcessingError::Cancelled);
        }

        let path = staged.commit()?;
        info!("Written {}", path.display());

        Ok(path)
    }

    fn interpolate(
        &self,
        field: &NativeField,
        times: &[usize],
    ) -> Result<Array4<Float>, InterpolationError> {
        let pressure = &self.prepared.pressures[&field.position];
        let (_, _, ny, nx) = field.values.dim();

        let mut interpolated = Array4::zeros((times.len(), self.targets.len(), ny, nx));

        for (i, &t) in times.iter().enumerate() {
            let resampled = resample_columns(
                pressure.index_axis(Axis(0), t),
                field.values.index_axis(Axis(0), t),
                &self.targets,
                self.settings.scheme,
            )?;

            interpolated.index_axis_mut(Axis(0), i).assign(&resampled);
        }

        Ok(interpolated)
    }
}
