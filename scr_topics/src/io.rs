//! Little-endian binary primitives for the model file payload.

use std::io::{Read, Write};

use snafu::ResultExt;

use crate::{IoError, ModelFileInvalidError, Result};

pub(crate) fn read_u8<T: Read>(from: &mut T) -> Result<u8> {
    let mut buffer = [0; 1];

    from.read_exact(&mut buffer).context(IoError)?;

    Ok(buffer[0])
}

pub(crate) fn read_u32<T: Read>(from: &mut T) -> Result<u32> {
    let mut buffer = [0; 4];

    from.read_exact(&mut buffer).context(IoError)?;

    Ok(u32::from_le_bytes(buffer))
}

pub(crate) fn read_u64<T: Read>(from: &mut T) -> Result<u64> {
    let mut buffer = [0; 8];

    from.read_exact(&mut buffer).context(IoError)?;

    Ok(u64::from_le_bytes(buffer))
}

pub(crate) fn read_f32<T: Read>(from: &mut T) -> Result<f32> {
    let mut buffer = [0; 4];

    from.read_exact(&mut buffer).context(IoError)?;

    Ok(f32::from_le_bytes(buffer))
}

pub(crate) fn read_string<T: Read>(from: &mut T) -> Result<String> {
    let len = read_u32(from)? as usize;
    let mut buffer = vec![0; len];

    from.read_exact(&mut buffer).context(IoError)?;

    String::from_utf8(buffer).map_err(|_| {
        ModelFileInvalidError {
            reason: "invalid UTF-8 in string field",
        }
        .build()
    })
}

pub(crate) fn write_u8<T: Write>(to: &mut T, value: u8) -> Result<()> {
    to.write_all(&[value]).context(IoError)
}

pub(crate) fn write_u32<T: Write>(to: &mut T, value: u32) -> Result<()> {
    to.write_all(&value.to_le_bytes()).context(IoError)
}

pub(crate) fn write_u64<T: Write>(to: &mut T, value: u64) -> Result<()> {
    to.write_all(&value.to_le_bytes()).context(IoError)
}

pub(crate) fn write_f32<T: Write>(to: &mut T, value: f32) -> Result<()> {
    to.write_all(&value.to_le_bytes()).context(IoError)
}

pub(crate) fn write_string<T: Write>(to: &mut T, value: &str) -> Result<()> {
    write_u32(to, value.len() as u32)?;

    to.write_all(value.as_bytes()).context(IoError)
}
