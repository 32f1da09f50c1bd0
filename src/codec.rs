use crate::constants::{MAX_CHANNELS, MIN_CHANNELS, MINUTES_PER_DAY};
use crate::error::{Error, Result};
use crate::scheduler::LedScheduler;
use crate::types::{SchedulePoint, TimeType};

const HEADER_LEN: usize = 3;
const OFFSET_BIAS: i32 = MINUTES_PER_DAY;

/// Compact binary form of a schedule: a point/channel header and the packed records.
///
/// Each record is a type tag, a little-endian u16 holding the fixed time or the
/// offset biased by +1440, then a count-prefixed run of f32 PWM values and a
/// count-prefixed run of f32 currents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SerializedSchedule {
    pub num_points: u16,
    pub num_channels: u8,
    pub data: Vec<u8>,
}

impl SerializedSchedule {
    /// Header followed by the records, as written to persistent storage.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len());
        bytes.extend_from_slice(&self.num_points.to_le_bytes());
        bytes.push(self.num_channels);
        bytes.extend_from_slice(&self.data);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::CorruptData(format!(
                "header needs {} bytes, got {}",
                HEADER_LEN,
                bytes.len()
            )));
        }
        Ok(Self {
            num_points: u16::from_le_bytes([bytes[0], bytes[1]]),
            num_channels: bytes[2],
            data: bytes[HEADER_LEN..].to_vec(),
        })
    }
}

fn write_values(out: &mut Vec<u8>, values: &[f32]) {
    out.push(values.len() as u8);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let slice = self.data.get(self.pos..end).ok_or_else(|| {
            Error::CorruptData(format!("truncated at byte {} of {}", self.pos, self.data.len()))
        })?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        self.pos = end;
        Ok(buf)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take::<2>()?))
    }

    fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take::<4>()?))
    }

    fn read_values(&mut self) -> Result<Vec<f32>> {
        let count = self.read_u8()?;
        (0..count).map(|_| self.read_f32()).collect()
    }
}

fn read_point(reader: &mut ByteReader<'_>) -> Result<SchedulePoint> {
    let tag = reader.read_u8()?;
    let time_type = TimeType::from_tag(tag)
        .ok_or_else(|| Error::CorruptData(format!("unknown time type tag {}", tag)))?;
    let field = reader.read_u16()?;
    let pwm_values = reader.read_values()?;
    let current_values = reader.read_values()?;

    if time_type.is_fixed() {
        Ok(SchedulePoint::fixed(field, pwm_values, current_values))
    } else {
        let offset = field as i32 - OFFSET_BIAS;
        let offset = i16::try_from(offset)
            .map_err(|_| Error::CorruptData(format!("offset {} out of range", offset)))?;
        Ok(SchedulePoint::dynamic(time_type, offset, pwm_values, current_values))
    }
}

impl LedScheduler {
    pub fn serialize(&self) -> SerializedSchedule {
        let mut data = Vec::new();
        for point in self.schedule_points() {
            data.push(point.time_type.tag());
            let field = if point.time_type.is_fixed() {
                point.time_minutes
            } else {
                (point.offset_minutes as i32 + OFFSET_BIAS) as u16
            };
            data.extend_from_slice(&field.to_le_bytes());
            write_values(&mut data, &point.pwm_values);
            write_values(&mut data, &point.current_values);
        }
        SerializedSchedule {
            num_points: self.len() as u16,
            num_channels: self.num_channels(),
            data,
        }
    }

    /// Replaces channel count and points from `serialized`. Any structural or range
    /// problem fails the whole load and leaves the current schedule untouched.
    /// Bytes past the last declared record are ignored.
    pub fn deserialize(&mut self, serialized: &SerializedSchedule) -> Result<()> {
        let num_channels = serialized.num_channels;
        if !(MIN_CHANNELS..=MAX_CHANNELS).contains(&num_channels) {
            return Err(Error::InvalidChannelCount(num_channels as usize));
        }

        let validator = LedScheduler::new(num_channels);
        let mut reader = ByteReader::new(&serialized.data);
        let mut points = Vec::with_capacity(serialized.num_points as usize);
        for _ in 0..serialized.num_points {
            let point = read_point(&mut reader)?;
            validator.validate_point(&point)?;
            points.push(point);
        }

        self.replace_schedule(num_channels, points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_biased_on_the_wire() {
        let mut s = LedScheduler::new(1);
        s.add_dynamic_schedule_point(TimeType::SunsetRelative, -30, vec![5.0], vec![0.1])
            .unwrap();
        let ser = s.serialize();
        assert_eq!(ser.data[0], 2);
        assert_eq!(u16::from_le_bytes([ser.data[1], ser.data[2]]), 1410);
        assert_eq!(ser.data[3], 1);
        assert_eq!(&ser.data[4..8], &5.0f32.to_le_bytes());
    }

    #[test]
    fn reader_reports_truncation() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        assert_eq!(r.read_u16().unwrap(), 0x0201);
        assert!(matches!(r.read_u16(), Err(Error::CorruptData(_))));
    }

    #[test]
    fn header_framing() {
        let ser = SerializedSchedule {
            num_points: 258,
            num_channels: 4,
            data: vec![9, 9],
        };
        let bytes = ser.to_bytes();
        assert_eq!(bytes, vec![2, 1, 4, 9, 9]);
        assert_eq!(SerializedSchedule::from_bytes(&bytes).unwrap(), ser);
        assert!(SerializedSchedule::from_bytes(&[1, 0]).is_err());
    }
}
