// 📤 Export - CSV and spreadsheet markup
//
// Two pure formatting passes over the entry list:
//   1. CSV: header row + one row per entry, EVERY field double-quoted
//   2. Spreadsheet: HTML with the Excel namespace (opens in Excel / Calc),
//      a detail table plus a totals table
//
// Both write to any `io::Write`; `export_to_dir` wraps them with file naming.

use crate::config::{Branding, Config};
use crate::entry::{LedgerEntry, DATE_FORMAT};
use crate::error::Result;
use crate::summary::{self, Totals};
use chrono::NaiveDateTime;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Header row of the CSV export (also accepted by the batch loader)
pub const CSV_HEADERS: [&str; 10] = [
    "Date",
    "Capital",
    "Factory Expenses",
    "Personal Expenses",
    "Loans",
    "Rejects",
    "Production",
    "Gross Income",
    "Net Income",
    "Total Capital Remaining",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Spreadsheet,
}

impl ExportFormat {
    pub fn extension(&self) -> &str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Spreadsheet => "xls",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xls" | "excel" | "spreadsheet" => Ok(ExportFormat::Spreadsheet),
            other => Err(format!("unknown export format '{}' (expected csv or xls)", other)),
        }
    }
}

// ============================================================================
// NUMBER FORMATTING
// ============================================================================

/// Plain number for CSV cells: `1000`, `350.5`, `-12.25`
fn plain(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Grouped number with 2 to 3 fraction digits: `1,234.50`, `0.125`, `-7.00`
pub fn format_grouped(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = rounded.abs().to_string();

    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (text.as_str(), ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let mut frac = frac_part.to_string();
    while frac.len() < 2 {
        frac.push('0');
    }

    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, frac)
}

/// Currency amount: symbol followed by the grouped number
pub fn format_money(value: Decimal, symbol: &str) -> String {
    format!("{}{}", symbol, format_grouped(value))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

// ============================================================================
// CSV
// ============================================================================

pub fn write_csv<W: Write>(writer: W, entries: &[LedgerEntry]) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    wtr.write_record(CSV_HEADERS)?;

    for e in entries {
        wtr.write_record([
            e.date.format(DATE_FORMAT).to_string(),
            plain(e.capital),
            plain(e.factory_expenses),
            plain(e.personal_expenses),
            plain(e.loans),
            plain(e.rejects),
            plain(e.production),
            plain(e.gross_income),
            plain(e.net_income),
            plain(e.capital_remaining),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

// ============================================================================
// SPREADSHEET MARKUP
// ============================================================================

const SPREADSHEET_STYLE: &str = r#"    body { font-family: Arial, sans-serif; margin: 20px; }
    h2 { color: #C41E3A; margin-top: 20px; }
    h3 { color: #333; margin-top: 15px; margin-bottom: 10px; }
    p { margin: 5px 0; }
    table { border-collapse: collapse; width: 100%; margin-bottom: 20px; }
    th, td { border: 1px solid #999; padding: 10px; text-align: left; }
    th { background-color: #C41E3A; color: white; font-weight: bold; }
    tr:nth-child(even) { background-color: #f9f9f9; }
    .total { background-color: #fff2cc; font-weight: bold; }
"#;

const DETAIL_HEADERS: [&str; 10] = [
    "Date",
    "Capital",
    "Factory Exp",
    "Personal Exp",
    "Loans",
    "Rejects",
    "Production",
    "Gross Income",
    "Net Income",
    "Capital Remaining",
];

fn write_branding<W: Write>(w: &mut W, branding: &Branding, generated_at: NaiveDateTime) -> Result<()> {
    writeln!(w, "  <h1 style=\"color: #C41E3A;\">{}</h1>", escape_html(&branding.business_name))?;
    writeln!(w, "  <p><strong>{}</strong></p>", escape_html(&branding.subtitle))?;
    writeln!(w, "  <p>Generated: {}</p>", generated_at.format("%B %d, %Y %H:%M:%S"))?;
    if !branding.owner.is_empty() {
        writeln!(w, "  <p>Owner: <strong>{}</strong></p>", escape_html(&branding.owner))?;
    }
    if !branding.contact.is_empty() {
        writeln!(w, "  <p>Contact: {}</p>", escape_html(&branding.contact))?;
    }
    Ok(())
}

fn write_totals_table<W: Write>(w: &mut W, totals: &Totals, symbol: &str) -> Result<()> {
    let symbol = escape_html(symbol);
    let rows = [
        ("Total Capital", totals.total_capital),
        ("Total Gross Income", totals.total_gross_income),
        ("Total Expenses", totals.total_expenses()),
        ("Total Net Income", totals.total_net_income),
    ];

    writeln!(w, "  <h3>Summary</h3>")?;
    writeln!(w, "  <table>")?;
    for (label, value) in rows {
        writeln!(
            w,
            "    <tr class=\"total\"><td><strong>{}</strong></td><td><strong>{}</strong></td></tr>",
            label,
            format_money(value, &symbol)
        )?;
    }
    writeln!(
        w,
        "    <tr style=\"background-color: #e2efda;\"><td><strong>Final Capital Remaining</strong></td><td><strong style=\"color: #C41E3A;\">{}</strong></td></tr>",
        format_money(totals.final_capital_remaining, &symbol)
    )?;
    writeln!(w, "  </table>")?;
    Ok(())
}

/// Write the spreadsheet-markup document: branding, detail table, totals table
pub fn write_spreadsheet<W: Write>(
    mut w: W,
    entries: &[LedgerEntry],
    config: &Config,
    generated_at: NaiveDateTime,
) -> Result<()> {
    let symbol = escape_html(&config.currency_symbol);
    let totals = summary::totals(entries);

    writeln!(w, "<html xmlns:x=\"urn:schemas-microsoft-com:office:excel\">")?;
    writeln!(w, "<head>")?;
    writeln!(w, "  <meta charset=\"UTF-8\">")?;
    writeln!(w, "  <style>\n{}  </style>", SPREADSHEET_STYLE)?;
    writeln!(w, "</head>")?;
    writeln!(w, "<body>")?;

    write_branding(&mut w, &config.branding, generated_at)?;

    writeln!(w, "  <h3>Detailed Records</h3>")?;
    writeln!(w, "  <table>")?;
    write!(w, "    <tr>")?;
    for h in DETAIL_HEADERS {
        write!(w, "<th>{}</th>", h)?;
    }
    writeln!(w, "</tr>")?;

    for e in entries {
        writeln!(
            w,
            "    <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td style=\"color: green; font-weight: bold;\">{}</td>\
             <td style=\"color: #C41E3A; font-weight: bold;\">{}</td></tr>",
            e.date.format(DATE_FORMAT),
            format_money(e.capital, &symbol),
            format_money(e.factory_expenses, &symbol),
            format_money(e.personal_expenses, &symbol),
            format_money(e.loans, &symbol),
            format_money(e.rejects, &symbol),
            // Production is a quantity, not money
            format_grouped(e.production),
            format_money(e.gross_income, &symbol),
            format_money(e.net_income, &symbol),
            format_money(e.capital_remaining, &symbol),
        )?;
    }
    writeln!(w, "  </table>")?;

    write_totals_table(&mut w, &totals, &config.currency_symbol)?;

    writeln!(w, "</body>")?;
    writeln!(w, "</html>")?;
    w.flush()?;
    Ok(())
}

// ============================================================================
// FILES
// ============================================================================

/// `<prefix>_ExpenseTracker_<yyyy-MM-dd_HHmmss>.<ext>`
pub fn export_file_name(prefix: &str, format: ExportFormat, at: NaiveDateTime) -> String {
    format!(
        "{}_ExpenseTracker_{}.{}",
        prefix,
        at.format("%Y-%m-%d_%H%M%S"),
        format.extension()
    )
}

/// Write an export to `path`
pub fn export_to_path(
    path: &Path,
    format: ExportFormat,
    entries: &[LedgerEntry],
    config: &Config,
    at: NaiveDateTime,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = BufWriter::new(File::create(path)?);
    match format {
        ExportFormat::Csv => write_csv(file, entries)?,
        ExportFormat::Spreadsheet => write_spreadsheet(file, entries, config, at)?,
    }

    tracing::info!(path = %path.display(), format = %format, entries = entries.len(), "export written");
    Ok(())
}

/// Write an export into the configured export directory with a timestamped name
pub fn export_to_dir(
    format: ExportFormat,
    entries: &[LedgerEntry],
    config: &Config,
    at: NaiveDateTime,
) -> Result<PathBuf> {
    let path = config
        .export_dir
        .join(export_file_name(&config.export_prefix, format, at));
    export_to_path(&path, format, entries, config, at)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryInput, IncomeBasis};
    use chrono::NaiveDate;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    fn sample_entries() -> Vec<LedgerEntry> {
        let first = EntryInput {
            capital: d("1000"),
            production: d("500"),
            gross_income: d("500"),
            factory_expenses: d("100"),
            personal_expenses: d("50"),
            ..EntryInput::zeroed(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
        };
        let second = EntryInput {
            capital: d("1350"),
            production: d("1234.5"),
            rejects: d("0.25"),
            ..EntryInput::zeroed(NaiveDate::from_ymd_opt(2025, 3, 2).unwrap())
        };
        vec![
            LedgerEntry::derive("a".to_string(), &first, IncomeBasis::Production),
            LedgerEntry::derive("b".to_string(), &second, IncomeBasis::Production),
        ]
    }

    #[test]
    fn test_csv_every_field_quoted() {
        let mut out = Vec::new();
        write_csv(&mut out, &sample_entries()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "\"Date\",\"Capital\",\"Factory Expenses\",\"Personal Expenses\",\"Loans\",\"Rejects\",\"Production\",\"Gross Income\",\"Net Income\",\"Total Capital Remaining\""
        );
        assert_eq!(
            lines[1],
            "\"2025-03-01\",\"1000\",\"100\",\"50\",\"0\",\"0\",\"500\",\"500\",\"350\",\"1350\""
        );
        assert_eq!(
            lines[2],
            "\"2025-03-02\",\"1350\",\"0\",\"0\",\"0\",\"0.25\",\"1234.5\",\"0\",\"1234.25\",\"2584.25\""
        );
    }

    #[test]
    fn test_csv_empty_ledger_has_header_only() {
        let mut out = Vec::new();
        write_csv(&mut out, &[]).unwrap();

        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_format_grouped() {
        assert_eq!(format_grouped(d("1234.5")), "1,234.50");
        assert_eq!(format_grouped(d("1234567")), "1,234,567.00");
        assert_eq!(format_grouped(d("0")), "0.00");
        assert_eq!(format_grouped(d("0.125")), "0.125");
        assert_eq!(format_grouped(d("2.0005")), "2.001");
        assert_eq!(format_grouped(d("-150.75")), "-150.75");
        assert_eq!(format_grouped(d("999")), "999.00");
        assert_eq!(format_money(d("1350"), "₱"), "₱1,350.00");
    }

    #[test]
    fn test_spreadsheet_contains_tables_and_labels() {
        let config = Config::default();
        let mut out = Vec::new();
        write_spreadsheet(&mut out, &sample_entries(), &config, at()).unwrap();
        let html = String::from_utf8(out).unwrap();

        assert!(html.starts_with("<html xmlns:x=\"urn:schemas-microsoft-com:office:excel\">"));
        assert!(html.contains("<h3>Detailed Records</h3>"));
        assert!(html.contains("Generated: March 09, 2025 14:05:07"));
        assert!(html.contains("<strong>Total Capital</strong></td><td><strong>₱2,350.00</strong>"));
        assert!(html.contains("<strong>Total Expenses</strong></td><td><strong>₱150.25</strong>"));
        assert!(html.contains("<strong>Total Net Income</strong></td><td><strong>₱1,584.25</strong>"));
        assert!(html.contains("Final Capital Remaining"));
        assert!(html.contains("₱2,584.25"));
        // Production has no currency symbol
        assert!(html.contains("<td>1,234.50</td>"));
        assert_eq!(html.matches("<tr><td>2025-03-0").count(), 2);
        // No owner configured
        assert!(!html.contains("Owner:"));
    }

    #[test]
    fn test_spreadsheet_escapes_branding() {
        let mut config = Config::default();
        config.branding.business_name = "Tom & Jerry <Bakery>".to_string();
        config.branding.owner = "Jo".to_string();
        let mut out = Vec::new();
        write_spreadsheet(&mut out, &[], &config, at()).unwrap();
        let html = String::from_utf8(out).unwrap();

        assert!(html.contains("Tom &amp; Jerry &lt;Bakery&gt;"));
        assert!(html.contains("Owner: <strong>Jo</strong>"));
        assert!(html.contains("Final Capital Remaining</strong></td><td><strong style=\"color: #C41E3A;\">₱0.00"));
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name("ACME", ExportFormat::Csv, at()),
            "ACME_ExpenseTracker_2025-03-09_140507.csv"
        );
        assert_eq!(
            export_file_name("ACME", ExportFormat::Spreadsheet, at()),
            "ACME_ExpenseTracker_2025-03-09_140507.xls"
        );
    }

    #[test]
    fn test_export_to_dir_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            export_dir: dir.path().join("exports"),
            ..Config::default()
        };

        let path = export_to_dir(ExportFormat::Csv, &sample_entries(), &config, at()).unwrap();

        assert!(path.starts_with(dir.path()));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"1234.25\""));
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!("excel".parse::<ExportFormat>(), Ok(ExportFormat::Spreadsheet));
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
