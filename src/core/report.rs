use crate::utils::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

/// Renders one dashboard payload for stdout.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.serialize(value)?;
            let bytes = writer
                .into_inner()
                .map_err(|e| DashboardError::IoError(e.into_error()))?;
            String::from_utf8(bytes).map_err(|e| DashboardError::InvalidResult {
                column: "csv".to_string(),
                message: e.to_string(),
            })
        }
    }
}
