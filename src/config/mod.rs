use std::path::PathBuf;

use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

/// Configuration for the application
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// URL or path of the docx invoice template
    pub invoice_template_path: Option<String>,
    /// Directory the rendered invoices are written to
    pub invoice_output_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables from a `.env` file are loaded first if one exists. A missing
    /// template location is not an error here; it is reported when a
    /// document is generated.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    /// Command line values take precedence over the environment.
    pub fn with_overrides(mut self, template: Option<String>, output_dir: Option<PathBuf>) -> Self {
        if template.is_some() {
            self.invoice_template_path = template;
        }
        if output_dir.is_some() {
            self.invoice_output_dir = output_dir;
        }
        self
    }

    pub fn template(&self) -> Option<&str> {
        self.invoice_template_path.as_deref()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.invoice_output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    let config = Config::load()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_from_variables() {
        let vars = vec![
            (
                "INVOICE_TEMPLATE_PATH".to_string(),
                "https://example.com/vorlage.docx".to_string(),
            ),
            ("INVOICE_OUTPUT_DIR".to_string(), "out".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.template(), Some("https://example.com/vorlage.docx"));
        assert_eq!(config.output_dir(), PathBuf::from("out"));
    }

    #[test]
    fn test_missing_variables_are_none() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.template(), None);
        assert_eq!(config.output_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_overrides_win() {
        let config = Config {
            invoice_template_path: Some("env.docx".to_string()),
            invoice_output_dir: None,
        }
        .with_overrides(Some("cli.docx".to_string()), None);

        assert_eq!(config.template(), Some("cli.docx"));
        assert_eq!(config.output_dir(), PathBuf::from("."));
    }
}
