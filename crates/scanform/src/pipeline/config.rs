use crate::config::Config;

/// Settings a pipeline run needs that are fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub pdf_dpi: u32,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pdf_dpi: config.ocr.pdf_dpi,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { pdf_dpi: 300 }
    }
}
