// ⚙️ Configuration
// Optional JSON file; every field has a default so a partial file (or none)
// is fine. Command-line flags override what the file says.

use crate::entry::IncomeBasis;
use crate::error::Result;
use crate::summary::GroupMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Chart shown on the analytics page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Pie,
}

impl ChartKind {
    pub fn next(&self) -> Self {
        match self {
            ChartKind::Line => ChartKind::Bar,
            ChartKind::Bar => ChartKind::Pie,
            ChartKind::Pie => ChartKind::Line,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ChartKind::Line => "Line Chart",
            ChartKind::Bar => "Bar Chart",
            ChartKind::Pie => "Expense Breakdown",
        }
    }
}

/// Business identity printed on the spreadsheet export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branding {
    pub business_name: String,
    pub subtitle: String,
    pub owner: String,
    pub contact: String,
}

impl Default for Branding {
    fn default() -> Self {
        Branding {
            business_name: "Capital Ledger".to_string(),
            subtitle: "Expense & Income Tracker".to_string(),
            owner: String::new(),
            contact: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub branding: Branding,
    pub currency_symbol: String,
    pub income_basis: IncomeBasis,
    pub default_view: GroupMode,
    pub default_chart: ChartKind,
    pub export_dir: PathBuf,
    /// Leading part of export file names, e.g. `ACME` → `ACME_ExpenseTracker_...`
    pub export_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            branding: Branding::default(),
            currency_symbol: "₱".to_string(),
            income_basis: IncomeBasis::Production,
            default_view: GroupMode::Daily,
            default_chart: ChartKind::Line,
            export_dir: PathBuf::from("."),
            export_prefix: "LEDGER".to_string(),
        }
    }
}

impl Config {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(p) => Config::load(p),
            None => Ok(Config::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "currency_symbol": "$", "income_basis": "gross-income", "branding": {{ "owner": "Jo" }} }}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.income_basis, IncomeBasis::GrossIncome);
        assert_eq!(config.branding.owner, "Jo");
        assert_eq!(config.branding.business_name, "Capital Ledger");
        assert_eq!(config.default_view, GroupMode::Daily);
        assert_eq!(config.export_prefix, "LEDGER");
    }

    #[test]
    fn test_bad_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_path_uses_defaults() {
        assert_eq!(Config::load_or_default(None).unwrap(), Config::default());
    }

    #[test]
    fn test_chart_kind_cycles() {
        assert_eq!(ChartKind::Line.next(), ChartKind::Bar);
        assert_eq!(ChartKind::Bar.next(), ChartKind::Pie);
        assert_eq!(ChartKind::Pie.next(), ChartKind::Line);
    }
}
