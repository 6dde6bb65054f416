//! Pluggable registry serialization.
//!
//! Every mapper must round-trip: reading what it wrote yields a structurally
//! equal [`Application`]. Malformed input fails as a whole with
//! [`Error::InvalidRegistry`]; nothing is partially loaded.

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use crate::{Application, Error, Result};

/// Serialization formats with a built-in mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Toml,
    Yaml,
}

impl Format {
    /// Detect the format from a file extension (`json`, `toml`, `yaml`/`yml`).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_extension(&extension).ok_or(Error::UnsupportedFormat { extension })
    }

    /// The built-in mapper for this format.
    pub fn mapper(&self) -> Box<dyn Mapper> {
        match self {
            Self::Json => Box::new(JsonMapper),
            Self::Toml => Box::new(TomlMapper),
            Self::Yaml => Box::new(YamlMapper),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "JSON",
            Self::Toml => "TOML",
            Self::Yaml => "YAML",
        })
    }
}

/// Reads and writes [`Application`] records in one format.
pub trait Mapper: Send + Sync {
    fn format(&self) -> Format;

    fn read(&self, reader: &mut dyn Read) -> Result<Application>;

    fn write(&self, application: &Application, writer: &mut dyn Write) -> Result<()>;
}

fn read_text(format: Format, reader: &mut dyn Read) -> Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| Error::invalid(format, e))
}

/// Reject structurally parsed records that break the ordered-set rule.
fn checked(format: Format, application: Application) -> Result<Application> {
    application
        .check_unique()
        .map_err(|e| Error::invalid(format, e))?;
    Ok(application)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMapper;

impl Mapper for JsonMapper {
    fn format(&self) -> Format {
        Format::Json
    }

    fn read(&self, reader: &mut dyn Read) -> Result<Application> {
        let text = read_text(Format::Json, reader)?;
        let application =
            serde_json::from_str(&text).map_err(|e| Error::invalid(Format::Json, e))?;
        checked(Format::Json, application)
    }

    fn write(&self, application: &Application, writer: &mut dyn Write) -> Result<()> {
        let text = serde_json::to_string_pretty(application).map_err(|e| Error::Serialize {
            format: Format::Json,
            message: e.to_string(),
        })?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlMapper;

impl Mapper for TomlMapper {
    fn format(&self) -> Format {
        Format::Toml
    }

    fn read(&self, reader: &mut dyn Read) -> Result<Application> {
        let text = read_text(Format::Toml, reader)?;
        let application = toml::from_str(&text).map_err(|e| Error::invalid(Format::Toml, e))?;
        checked(Format::Toml, application)
    }

    fn write(&self, application: &Application, writer: &mut dyn Write) -> Result<()> {
        let text = toml::to_string_pretty(application).map_err(|e| Error::Serialize {
            format: Format::Toml,
            message: e.to_string(),
        })?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlMapper;

impl Mapper for YamlMapper {
    fn format(&self) -> Format {
        Format::Yaml
    }

    fn read(&self, reader: &mut dyn Read) -> Result<Application> {
        let text = read_text(Format::Yaml, reader)?;
        let application =
            serde_yaml::from_str(&text).map_err(|e| Error::invalid(Format::Yaml, e))?;
        checked(Format::Yaml, application)
    }

    fn write(&self, application: &Application, writer: &mut dyn Write) -> Result<()> {
        let text = serde_yaml::to_string(application).map_err(|e| Error::Serialize {
            format: Format::Yaml,
            message: e.to_string(),
        })?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("json", Some(Format::Json))]
    #[case("TOML", Some(Format::Toml))]
    #[case("yml", Some(Format::Yaml))]
    #[case("yaml", Some(Format::Yaml))]
    #[case("xml", None)]
    fn test_format_from_extension(#[case] extension: &str, #[case] expected: Option<Format>) {
        assert_eq!(Format::from_extension(extension), expected);
    }

    #[test]
    fn test_from_path_without_extension() {
        let err = Format::from_path(Path::new("registry")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { extension } if extension.is_empty()));
    }

    #[rstest]
    #[case(Format::Json, "{ \"id\": ")]
    #[case(Format::Toml, "id = ")]
    #[case(Format::Yaml, "id: [")]
    fn test_truncated_input_is_invalid(#[case] format: Format, #[case] input: &str) {
        let err = format.mapper().read(&mut input.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidRegistry { format: f, .. } if f == format));
    }

    #[test]
    fn test_invalid_registry_keeps_parse_cause() {
        let err = JsonMapper.read(&mut "[1, 2]".as_bytes()).unwrap_err();
        let source = std::error::Error::source(&err).expect("parse cause");
        assert!(source.downcast_ref::<serde_json::Error>().is_some());
    }

    #[test]
    fn test_non_utf8_is_invalid() {
        let bytes: &[u8] = &[0xff, 0xfe, 0x00];
        let err = TomlMapper.read(&mut &bytes[..]).unwrap_err();
        assert!(matches!(err, Error::InvalidRegistry { .. }));
    }
}
