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

//! Module building global attributes of output files.

use crate::dataset::AttrValue;

/// Input attribute that is not carried to output files.
const EXCLUDED_ATTRIBUTE: &str = "BOTTOM-TOP_PATCH";

const TITLE_SUFFIX: &str = " - ON PRES LEVELS";

/// Flags set in every `met_em` file.
pub const MET_EM_FLAGS: [&str; 6] = [
    "FLAG_SLP",
    "FLAG_PSFC",
    "FLAG_SOILHGT",
    "FLAG_MF_XY",
    "FLAG_METGRID",
    "FLAG_P_INTERP",
];

/// Soil data flags of `met_em` files for given
/// land surface scheme (`SF_SURFACE_PHYSICS`).
pub fn soil_flags(surface_physics: i64) -> &'static [(&'static str, i32)] {
    match surface_physics {
        1 | 2 | 7 => &[("FLAG_SOIL_LAYERS", 1)],
        3 => &[("FLAG_SOIL_LEVELS", 1)],
        0 => &[("FLAG_SOIL_LAYERS", 0), ("FLAG_SOIL_LEVELS", 0)],
        _ => &[],
    }
}

/// Global attributes of an output file, derived from input attributes.
///
/// `surface_physics` is given only for `met_em` output and adds its flags.
pub fn output_attributes(
    input: &[(String, AttrValue)],
    level_count: usize,
    surface_physics: Option<i64>,
) -> Vec<(String, AttrValue)> {
    let mut attributes = Vec::with_capacity(input.len() + MET_EM_FLAGS.len() + 2);

    for (name, value) in input {
        let value = match (name.as_str(), value) {
            (EXCLUDED_ATTRIBUTE, _) => continue,
            ("TITLE", AttrValue::Text(title)) => AttrValue::Text(format!("{}{}", title, TITLE_SUFFIX)),
            ("BOTTOM-TOP_GRID_DIMENSION", _) => AttrValue::Int(level_count as i32),
            _ => value.clone(),
        };

        attributes.push((name.clone(), value));
    }

    if let Some(surface_physics) = surface_physics {
        for flag in MET_EM_FLAGS {
            set_attribute(&mut attributes, flag, AttrValue::Int(1));
        }

        for (flag, value) in soil_flags(surface_physics) {
            set_attribute(&mut attributes, flag, AttrValue::Int(*value));
        }
    }

    attributes
}

/// Replaces the attribute if it is already present, appends it otherwise.
fn set_attribute(attributes: &mut Vec<(String, AttrValue)>, name: &str, value: AttrValue) {
    match attributes.iter_mut().find(|(attr_name, _)| attr_name == name) {
        Some((_, existing)) => *existing = value,
        None => attributes.push((name.to_string(), value)),
    }
}
