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

//! Module containg methods for conducting
//! binary search (bisection) of elements closests
//! to searched values in native profiles.

use crate::errors::SearchError;

/// Core bisection function, simply an implementation
/// of binary search algorithm adapted to searching values
/// in-between the set items.
///
/// Works on both ascending and descending arrays, which
/// is why `binary_search()` of slice cannot be used here.
fn binary_search<T: PartialOrd>(array: &[T], x: &T) -> Result<usize, SearchError> {
    let (first, last) = match (array.first(), array.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(SearchError::EmptyArray),
    };

    if x < first && x < last || x > first && x > last {
        return Err(SearchError::OutOfBounds);
    }

    let mut lo = 0;
    let mut hi = array.len() - 1;

    // if the array is sorted descendingly we use a function with reversed signs
    if first < last {
        while lo < hi {
            let mid = (lo + hi) / 2;

            if array[mid] >= *x {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
    } else {
        while lo < hi {
            let mid = (lo + hi) / 2;

            if array[mid] <= *x {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
    }

    Ok(lo)
}

/// Finds the index of the item closest to `x` from the "left",
/// that is the last item not greater (ascending array)
/// or not smaller (descending array) than `x`.
///
/// For descending pressure profiles this returns the
/// lower (higher pressure) level of the bracketing pair.
pub fn find_left_closest<T: PartialOrd>(array: &[T], x: &T) -> Result<usize, SearchError> {
    let found_index = binary_search(array, x)?;

    if array[0] < array[array.len() - 1] {
        if array[found_index] <= *x {
            Ok(found_index)
        } else {
            Ok(found_index - 1)
        }
    } else if array[found_index] >= *x {
        Ok(found_index)
    } else {
        Ok(found_index - 1)
    }
}
