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

//! Synthetic WRF output used by tests.
//!
//! Pressure decreases by 90 hPa per model level from 1000 hPa at the
//! first level, with a small horizontal gradient. Potential temperature
//! is 300 K everywhere, geopotential height grows by 1000 m per level
//! and terrain rises towards the east.

use crate::dataset::memory::MemoryDataset;
use crate::Float;
use floccus::constants::G;
use ndarray::{Array, ArrayD, Dimension};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct WrfFixture {
    pub grid_id: i32,
    pub times: Vec<&'static str>,
    pub bottom_top: usize,
    pub south_north: usize,
    pub west_east: usize,
}

impl Default for WrfFixture {
    fn default() -> Self {
        WrfFixture {
            grid_id: 3,
            times: vec!["2017-01-02_06:00:00", "2017-01-02_09:00:00"],
            bottom_top: 5,
            south_north: 3,
            west_east: 4,
        }
    }
}

pub const SOIL_DEPTHS: [Float; 4] = [0.05, 0.25, 0.7, 1.5];

fn field<Sh, F>(shape: Sh, f: F) -> ArrayD<Float>
where
    Sh: ndarray::ShapeBuilder,
    Sh::Dim: Dimension,
    F: FnMut(<Sh::Dim as Dimension>::Pattern) -> Float,
{
    Array::from_shape_fn(shape, f).into_dyn()
}

impl WrfFixture {
    /// Full pressure (Pa) at mass point.
    pub fn pressure(t: usize, k: usize, j: usize, i: usize) -> Float {
        100_000.0 - 9_000.0 * k as Float + 100.0 * t as Float - 50.0 * (i + j) as Float
    }

    pub fn build(&self) -> MemoryDataset {
        let nt = self.times.len();
        let (nz, ny, nx) = (self.bottom_top, self.south_north, self.west_east);

        let mass = ["Time", "bottom_top", "south_north", "west_east"];
        let surface = ["Time", "south_north", "west_east"];

        MemoryDataset::default()
            .with_dimension("Time", nt)
            .with_dimension("DateStrLen", 19)
            .with_dimension("west_east", nx)
            .with_dimension("south_north", ny)
            .with_dimension("bottom_top", nz)
            .with_dimension("bottom_top_stag", nz + 1)
            .with_dimension("soil_layers_stag", SOIL_DEPTHS.len())
            .with_dimension("west_east_stag", nx + 1)
            .with_dimension("south_north_stag", ny + 1)
            .with_dimension("land_cat", 24)
            .with_dimension("soil_cat", 16)
            .with_attribute("TITLE", " OUTPUT FROM WRF V4.1 MODEL")
            .with_attribute("START_DATE", self.times[0])
            .with_attribute("WEST-EAST_GRID_DIMENSION", (nx + 1) as i32)
            .with_attribute("SOUTH-NORTH_GRID_DIMENSION", (ny + 1) as i32)
            .with_attribute("BOTTOM-TOP_GRID_DIMENSION", (nz + 1) as i32)
            .with_attribute("BOTTOM-TOP_PATCH", nz as i32)
            .with_attribute("DX", 3000.0f32)
            .with_attribute("GRID_ID", self.grid_id)
            .with_attribute("SF_SURFACE_PHYSICS", 2)
            .with_attribute("MAP_PROJ", 1)
            .with_attribute("TRUELAT1", 30.0f32)
            .with_attribute("TRUELAT2", 60.0f32)
            .with_attribute("STAND_LON", -98.0f32)
            .with_text("Times", &["Time", "DateStrLen"], &self.times)
            .with_values("P_TOP", &["Time"], field(nt, |_| 5_000.0))
            .with_values(
                "P",
                &mass,
                field((nt, nz, ny, nx), |(t, k, j, i)| {
                    WrfFixture::pressure(t, k, j, i) - (100_000.0 - 9_000.0 * k as Float)
                }),
            )
            .with_values(
                "PB",
                &mass,
                field((nt, nz, ny, nx), |(_, k, _, _)| 100_000.0 - 9_000.0 * k as Float),
            )
            .with_values("T", &mass, field((nt, nz, ny, nx), |_| 0.0))
            .with_values("QVAPOR", &mass, field((nt, nz, ny, nx), |_| 0.005))
            .with_values(
                "PH",
                &["Time", "bottom_top_stag", "south_north", "west_east"],
                field((nt, nz + 1, ny, nx), |_| 0.0),
            )
            .with_values(
                "PHB",
                &["Time", "bottom_top_stag", "south_north", "west_east"],
                field((nt, nz + 1, ny, nx), |(_, k, _, _)| G * 1000.0 * k as Float),
            )
            .with_values(
                "U",
                &["Time", "bottom_top", "south_north", "west_east_stag"],
                field((nt, nz, ny, nx + 1), |(_, _, _, i)| 10.0 + i as Float),
            )
            .with_values(
                "V",
                &["Time", "bottom_top", "south_north_stag", "west_east"],
                field((nt, nz, ny + 1, nx), |_| -5.0),
            )
            .with_values(
                "PSFC",
                &surface,
                field((nt, ny, nx), |(t, j, i)| WrfFixture::pressure(t, 0, j, i) + 500.0),
            )
            .with_values(
                "HGT",
                &surface,
                field((nt, ny, nx), |(_, _, i)| 100.0 * i as Float),
            )
            .with_values(
                "ZS",
                &["Time", "soil_layers_stag"],
                field((nt, SOIL_DEPTHS.len()), |(_, l)| SOIL_DEPTHS[l]),
            )
            .with_values(
                "LANDUSEF",
                &["Time", "land_cat", "south_north", "west_east"],
                field((nt, 24, ny, nx), |_| 1.0 / 24.0),
            )
            .with_values(
                "SOILCTOP",
                &["Time", "soil_cat", "south_north", "west_east"],
                field((nt, 16, ny, nx), |_| 1.0 / 16.0),
            )
    }

    /// Builds the dataset and saves it in `directory`.
    pub fn save_in(&self, directory: &Path, filename: &str) -> PathBuf {
        let path = directory.join(filename);
        self.build().save(&path);
        path
    }
}
