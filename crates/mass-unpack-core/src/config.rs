use crate::decoder::FilenameDecoder;
use crate::error::Error;
use crate::fingerprint::Strategy;
use crate::preflight::Reserve;
use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub collision: Strategy,
    /// WHATWG labels tried after UTF-8 for entry names, in order.
    pub legacy_encodings: Vec<String>,
    pub reserve_percent: u8,
    pub reserve_bytes: u64,
    pub ok_dir: PathBuf,
    pub err_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            collision: Strategy::default(),
            legacy_encodings: vec!["ibm866".to_string(), "windows-1251".to_string()],
            reserve_percent: 5,
            reserve_bytes: 0,
            ok_dir: PathBuf::from("OK"),
            err_dir: PathBuf::from("ERR"),
        }
    }
}

impl AppConfig {
    pub fn decoder(&self) -> Result<FilenameDecoder, Error> {
        FilenameDecoder::from_labels(&self.legacy_encodings)
    }

    pub fn reserve(&self) -> Reserve {
        Reserve {
            percent: self.reserve_percent,
            bytes: self.reserve_bytes,
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("MASS_UNPACK")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("legacy_encodings")
}

/// `MassUnpack.toml` (optional) overlaid with `MASS_UNPACK_*` variables.
pub fn load_configuration() -> Result<AppConfig, Error> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("MassUnpack").required(false))
        .add_source(environment())
        .build()?;
    Ok(builder.try_deserialize::<AppConfig>()?)
}
