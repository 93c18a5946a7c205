use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, Copy)]
pub enum Format {
    Json,
    JsonPretty,
}

pub fn serialize<T: Serialize>(data: &T, format: Format) -> Result<Vec<u8>> {
    let bytes = match format {
        Format::Json => serde_json::to_vec(data)?,
        Format::JsonPretty => serde_json::to_vec_pretty(data)?,
    };
    Ok(bytes)
}

pub fn deserialize<T: DeserializeOwned>(bytes: &[u8], format: Format) -> Result<T> {
    match format {
        Format::Json | Format::JsonPretty => Ok(serde_json::from_slice(bytes)?),
    }
}

pub fn save<T: Serialize, P: AsRef<Path>>(data: &T, path: P, format: Format) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&serialize(data, format)?)?;
    writer.flush()?;
    Ok(())
}

pub fn load<T: DeserializeOwned, P: AsRef<Path>>(path: P, format: Format) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    match format {
        Format::Json | Format::JsonPretty => Ok(serde_json::from_reader(reader)?),
    }
}
