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

//! Module decoding WRF timestamps (`YYYY-MM-DD_HH:MM:SS`)
//! into calendar components and derived time keys.

#[cfg(doc)]
use crate::constants::TIME_EPOCH;
use crate::constants::{WRF_TIME_FORMAT, WRF_TIME_LENGTH};
use crate::{errors::InputError, Float};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// One decoded input timestep.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TimeRecord {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
    date_key: i32,
    stamp: String,
    datetime: NaiveDateTime,
}

impl TimeRecord {
    /// Decodes a fixed-width timestamp.
    /// Padding after the 19 significant characters is ignored.
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let stamp = raw.trim_end_matches(|c: char| c == '\0' || c.is_whitespace());

        if stamp.len() != WRF_TIME_LENGTH || !stamp.is_ascii() {
            return Err(InputError::Timestamp(raw.to_string()));
        }

        let datetime = NaiveDateTime::parse_from_str(stamp, WRF_TIME_FORMAT)
            .map_err(|_| InputError::Timestamp(raw.to_string()))?;

        // key of years past 2147 does not fit in the output integer type
        let date_key = i64::from(datetime.year()) * 1_000_000
            + i64::from(datetime.month()) * 10_000
            + i64::from(datetime.day()) * 100
            + i64::from(datetime.hour());
        let date_key =
            i32::try_from(date_key).map_err(|_| InputError::Timestamp(raw.to_string()))?;

        // components always fit, chrono keeps them in calendar ranges
        Ok(TimeRecord {
            year: datetime.year(),
            month: datetime.month() as i32,
            day: datetime.day() as i32,
            hour: datetime.hour() as i32,
            minute: datetime.minute() as i32,
            second: datetime.second() as i32,
            date_key,
            stamp: stamp.to_string(),
            datetime,
        })
    }

    /// Integer key `YYYYMMDDHH`.
    pub fn date_key(&self) -> i32 {
        self.date_key
    }

    /// Hours elapsed since 1997-01-01 00:00:00, without leap seconds.
    pub fn hours_since_epoch(&self) -> Float {
        let seconds = (self.datetime - epoch()).num_seconds();
        seconds as Float / 3600.0
    }

    /// Timestamp as found in the input, used in output filenames.
    pub fn stamp(&self) -> &str {
        &self.stamp
    }
}

/// Reference time of [`TIME_EPOCH`].
fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd(1997, 1, 1).and_hms(0, 0, 0)
}

/// Decodes all timestamps of an input file.
pub fn parse_all(raw: &[String]) -> Result<Vec<TimeRecord>, InputError> {
    raw.iter().map(|stamp| TimeRecord::parse(stamp)).collect()
}

#[cfg(test)]
mod tests {
    use super::{epoch, parse_all, TimeRecord};
    use crate::constants::TIME_EPOCH;
    use crate::errors::InputError;
    use crate::Float;
    use chrono::NaiveDateTime;
    use float_cmp::approx_eq;

    #[test]
    fn components_and_key() {
        let record = TimeRecord::parse("2017-01-02_06:00:00").unwrap();

        assert_eq!(
            (record.year, record.month, record.day),
            (2017, 1, 2)
        );
        assert_eq!((record.hour, record.minute, record.second), (6, 0, 0));
        assert_eq!(record.date_key(), 2017010206);
        assert_eq!(record.stamp(), "2017-01-02_06:00:00");

        let late = TimeRecord::parse("2020-12-31_23:30:15").unwrap();
        assert_eq!(late.date_key(), 2020123123);
    }

    #[test]
    fn hours_since_epoch() {
        // 7306 days from 1997-01-01 to 2017-01-02
        let record = TimeRecord::parse("2017-01-02_06:00:00").unwrap();
        assert!(approx_eq!(
            Float,
            record.hours_since_epoch(),
            7306.0 * 24.0 + 6.0,
            ulps = 2
        ));

        let record = TimeRecord::parse("1997-01-01_00:30:00").unwrap();
        assert!(approx_eq!(Float, record.hours_since_epoch(), 0.5, ulps = 2));
    }

    #[test]
    fn epoch_matches_units() {
        let units_epoch =
            NaiveDateTime::parse_from_str(TIME_EPOCH, "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(epoch(), units_epoch);
    }

    #[test]
    fn padded_and_malformed() {
        let record = TimeRecord::parse("2017-01-02_06:00:00\0\0").unwrap();
        assert_eq!(record.stamp(), "2017-01-02_06:00:00");

        for bad in ["2017-01-02 06:00:00", "2017-13-02_06:00:00", "2017-01-02_06", ""] {
            assert!(matches!(
                TimeRecord::parse(bad),
                Err(InputError::Timestamp(_))
            ));
        }

        assert!(parse_all(&["2017-01-02_06:00:00".to_string(), "x".to_string()]).is_err());
    }

    #[test]
    fn key_out_of_range() {
        let last = TimeRecord::parse("2147-12-31_23:00:00").unwrap();
        assert_eq!(last.date_key(), 2147123123);

        assert!(matches!(
            TimeRecord::parse("2150-01-01_00:00:00"),
            Err(InputError::Timestamp(_))
        ));
    }
}
