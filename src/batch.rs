// 📥 Batch input - form rows from CSV
// Headers follow the CSV export, so an export can be loaded straight back.
// Every column is optional. Derived columns (Net Income, Total Capital
// Remaining) are ignored: entries are always re-derived from their inputs.

use crate::entry::{today, EntryForm, EntryInput};
use crate::error::Result;
use crate::ledger::Ledger;
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct FormRow {
    #[serde(rename = "Date", default)]
    date: String,

    #[serde(rename = "Capital", default)]
    capital: String,

    #[serde(rename = "Factory Expenses", default)]
    factory_expenses: String,

    #[serde(rename = "Personal Expenses", default)]
    personal_expenses: String,

    #[serde(rename = "Loans", default)]
    loans: String,

    #[serde(rename = "Rejects", default)]
    rejects: String,

    #[serde(rename = "Production", default)]
    production: String,

    #[serde(rename = "Gross Income", default)]
    gross_income: String,
}

impl From<FormRow> for EntryForm {
    fn from(row: FormRow) -> Self {
        EntryForm {
            date: row.date,
            capital: row.capital,
            factory_expenses: row.factory_expenses,
            personal_expenses: row.personal_expenses,
            loans: row.loans,
            rejects: row.rejects,
            production: row.production,
            gross_income: row.gross_income,
        }
    }
}

/// Read raw form rows from any CSV source
pub fn read_form_rows<R: Read>(reader: R) -> Result<Vec<EntryForm>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut forms: Vec<EntryForm> = Vec::new();
    for result in rdr.deserialize::<FormRow>() {
        forms.push(EntryForm::from(result?));
    }
    Ok(forms)
}

/// Read form rows and coerce them; rows with a bad date get `fallback_date`
pub fn read_inputs<R: Read>(reader: R, fallback_date: NaiveDate) -> Result<Vec<EntryInput>> {
    Ok(read_form_rows(reader)?
        .iter()
        .map(|form| form.coerce(fallback_date))
        .collect())
}

/// Load a CSV file of form rows (bad dates fall back to today)
pub fn load_form_rows(path: &Path) -> Result<Vec<EntryInput>> {
    let file = std::fs::File::open(path)?;
    let inputs = read_inputs(file, today())?;
    tracing::info!(path = %path.display(), rows = inputs.len(), "form rows loaded");
    Ok(inputs)
}

/// Add every input to the ledger in file order
pub fn seed_ledger(ledger: &mut Ledger, inputs: &[EntryInput]) {
    for input in inputs {
        ledger.add(input);
    }
}
