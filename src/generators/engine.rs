//! Engine selection.

use std::fmt;
use std::str::FromStr;

use super::GeneratorError;

/// The two rendering paths a template can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// One bound template printed as a whole document.
    Html,
    /// Per-page SVG artwork with coordinate-mapped text overlays.
    Svg,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Svg => "svg",
        }
    }

    /// Whether a missing `templatePath` is tolerated (falls back to the
    /// default template directory) for this engine.
    pub fn tolerates_missing_path(&self) -> bool {
        matches!(self, Self::Svg)
    }
}

impl FromStr for EngineKind {
    type Err = GeneratorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "svg" => Ok(Self::Svg),
            other => Err(GeneratorError::configuration(format!(
                "unknown engine type: '{other}'"
            ))),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_engine() {
        assert_eq!("html".parse::<EngineKind>().unwrap(), EngineKind::Html);
        assert_eq!(" SVG ".parse::<EngineKind>().unwrap(), EngineKind::Svg);
    }

    #[test]
    fn test_unknown_engine_is_configuration_error() {
        let err = "pdfkit".parse::<EngineKind>().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("pdfkit"));
    }
}
