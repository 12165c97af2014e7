// 🧾 Ledger Entry & Derivation
// One entry per form submission. The two derived fields are computed once,
// when the entry is created or replaced, and never touched afterwards:
//
//   net_income        = income − (factory + personal + loans + rejects)
//   capital_remaining = capital + net_income
//
// `income` is production by default, or gross income under the variant basis.

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Date format used by the form, the exports and the daily summary key
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// INCOME BASIS
// ============================================================================

/// Which income figure net income is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IncomeBasis {
    #[default]
    Production,
    GrossIncome,
}

impl fmt::Display for IncomeBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncomeBasis::Production => write!(f, "production"),
            IncomeBasis::GrossIncome => write!(f, "gross-income"),
        }
    }
}

impl FromStr for IncomeBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" => Ok(IncomeBasis::Production),
            "gross-income" | "gross_income" | "gross" => Ok(IncomeBasis::GrossIncome),
            other => Err(format!("unknown income basis '{}' (expected production or gross-income)", other)),
        }
    }
}

// ============================================================================
// NUMERIC COERCION
// ============================================================================

/// Most significant digits a `Decimal` mantissa holds
const MAX_DIGITS: usize = 29;
/// Largest `Decimal` scale
const MAX_SCALE: i64 = 28;
/// Exponents past this are out of range either way
const EXPONENT_LIMIT: i64 = 10_000;

/// Parse a form amount the way a lenient number field does: skip leading
/// whitespace, take the longest numeric prefix, and fall back to zero.
///
/// `"12.5"` → 12.5, `"12abc"` → 12, `"  -3"` → -3, `"abc"` / `""` → 0.
/// Values beyond the `Decimal` range saturate at `Decimal::MAX` / `MIN`;
/// values too small to represent become zero.
pub fn parse_amount(raw: &str) -> Decimal {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut pos = 0;

    let mut negative = false;
    if let Some(&sign) = bytes.first() {
        if sign == b'-' || sign == b'+' {
            negative = sign == b'-';
            pos += 1;
        }
    }

    let int_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let int_digits = &s[int_start..pos];

    let mut frac_digits = "";
    if pos < bytes.len() && bytes[pos] == b'.' {
        let frac_start = pos + 1;
        let mut end = frac_start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end > frac_start || !int_digits.is_empty() {
            frac_digits = &s[frac_start..end];
            pos = end;
        }
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return Decimal::ZERO;
    }

    // Power of ten applied to the concatenated digits
    let mut exponent = -(frac_digits.len() as i64);

    // Optional exponent: e / E, optional sign, at least one digit
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut end = pos + 1;
        let mut exp_negative = false;
        if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
            exp_negative = bytes[end] == b'-';
            end += 1;
        }
        let digits_start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end > digits_start {
            let magnitude = s[digits_start..end]
                .parse::<i64>()
                .unwrap_or(EXPONENT_LIMIT)
                .min(EXPONENT_LIMIT);
            exponent += if exp_negative { -magnitude } else { magnitude };
        }
    }

    let digits = format!("{}{}", int_digits, frac_digits);
    scaled_decimal(&digits, exponent, negative)
}

/// `digits × 10^exponent` as a `Decimal`. Saturates past the type's range and
/// drops the least significant digits it has no room for.
fn scaled_decimal(digits: &str, mut exponent: i64, negative: bool) -> Decimal {
    let mut digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Decimal::ZERO;
    }
    let saturated = if negative { Decimal::MIN } else { Decimal::MAX };

    if digits.len() > MAX_DIGITS {
        exponent += (digits.len() - MAX_DIGITS) as i64;
        digits = &digits[..MAX_DIGITS];
    }

    if exponent < -MAX_SCALE {
        let excess = (-MAX_SCALE - exponent) as usize;
        if excess >= digits.len() {
            return Decimal::ZERO;
        }
        digits = &digits[..digits.len() - excess];
        exponent = -MAX_SCALE;
    }

    if exponent > 0 && digits.len() as i64 + exponent > MAX_DIGITS as i64 {
        return saturated;
    }

    let mut mantissa: i128 = match digits.parse() {
        Ok(m) => m,
        Err(_) => return Decimal::ZERO,
    };
    if exponent > 0 {
        mantissa = match 10_i128.checked_pow(exponent as u32).and_then(|p| mantissa.checked_mul(p)) {
            Some(m) => m,
            None => return saturated,
        };
        exponent = 0;
    }
    if negative {
        mantissa = -mantissa;
    }

    let mut scale = (-exponent) as u32;
    loop {
        match Decimal::try_from_i128_with_scale(mantissa, scale) {
            Ok(value) => return value,
            // Mantissa wider than 96 bits: give up a fraction digit
            Err(_) if scale > 0 => {
                mantissa /= 10;
                scale -= 1;
            }
            Err(_) => return saturated,
        }
    }
}

/// Parse a form date, falling back when empty or malformed
pub fn parse_date(raw: &str, fallback: NaiveDate) -> NaiveDate {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).unwrap_or(fallback)
}

/// Today in local time (the form's default date)
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Render an amount for a form field; zero shows as an empty field
pub fn amount_to_field(value: Decimal) -> String {
    if value.is_zero() {
        String::new()
    } else {
        value.normalize().to_string()
    }
}

// ============================================================================
// FORM
// ============================================================================

/// The form fields, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Date,
    Capital,
    FactoryExpenses,
    PersonalExpenses,
    Loans,
    Rejects,
    Production,
    GrossIncome,
}

impl FormField {
    pub const ALL: [FormField; 8] = [
        FormField::Date,
        FormField::Capital,
        FormField::FactoryExpenses,
        FormField::PersonalExpenses,
        FormField::Loans,
        FormField::Rejects,
        FormField::Production,
        FormField::GrossIncome,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Date => "Date",
            FormField::Capital => "Capital",
            FormField::FactoryExpenses => "Factory Expenses",
            FormField::PersonalExpenses => "Personal Expenses",
            FormField::Loans => "Loans",
            FormField::Rejects => "Rejects",
            FormField::Production => "Production",
            FormField::GrossIncome => "Gross Income",
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, FormField::Date)
    }
}

/// Raw text of the entry form, exactly as typed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryForm {
    pub date: String,
    pub capital: String,
    pub factory_expenses: String,
    pub personal_expenses: String,
    pub loans: String,
    pub rejects: String,
    pub production: String,
    pub gross_income: String,
}

impl EntryForm {
    /// Blank form dated `date`
    pub fn new(date: NaiveDate) -> Self {
        EntryForm {
            date: date.format(DATE_FORMAT).to_string(),
            ..Default::default()
        }
    }

    /// Pre-fill the form from an existing entry (edit mode)
    pub fn from_entry(entry: &LedgerEntry) -> Self {
        EntryForm {
            date: entry.date.format(DATE_FORMAT).to_string(),
            capital: amount_to_field(entry.capital),
            factory_expenses: amount_to_field(entry.factory_expenses),
            personal_expenses: amount_to_field(entry.personal_expenses),
            loans: amount_to_field(entry.loans),
            rejects: amount_to_field(entry.rejects),
            production: amount_to_field(entry.production),
            gross_income: amount_to_field(entry.gross_income),
        }
    }

    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::Date => &self.date,
            FormField::Capital => &self.capital,
            FormField::FactoryExpenses => &self.factory_expenses,
            FormField::PersonalExpenses => &self.personal_expenses,
            FormField::Loans => &self.loans,
            FormField::Rejects => &self.rejects,
            FormField::Production => &self.production,
            FormField::GrossIncome => &self.gross_income,
        }
    }

    pub fn field_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Date => &mut self.date,
            FormField::Capital => &mut self.capital,
            FormField::FactoryExpenses => &mut self.factory_expenses,
            FormField::PersonalExpenses => &mut self.personal_expenses,
            FormField::Loans => &mut self.loans,
            FormField::Rejects => &mut self.rejects,
            FormField::Production => &mut self.production,
            FormField::GrossIncome => &mut self.gross_income,
        }
    }

    /// Coerce every field; bad numbers become zero, a bad date becomes `fallback_date`
    pub fn coerce(&self, fallback_date: NaiveDate) -> EntryInput {
        EntryInput {
            date: parse_date(&self.date, fallback_date),
            capital: parse_amount(&self.capital),
            factory_expenses: parse_amount(&self.factory_expenses),
            personal_expenses: parse_amount(&self.personal_expenses),
            loans: parse_amount(&self.loans),
            rejects: parse_amount(&self.rejects),
            production: parse_amount(&self.production),
            gross_income: parse_amount(&self.gross_income),
        }
    }
}

/// Typed form input, ready for derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInput {
    pub date: NaiveDate,
    pub capital: Decimal,
    pub factory_expenses: Decimal,
    pub personal_expenses: Decimal,
    pub loans: Decimal,
    pub rejects: Decimal,
    pub production: Decimal,
    pub gross_income: Decimal,
}

impl EntryInput {
    /// All-zero input for `date`
    pub fn zeroed(date: NaiveDate) -> Self {
        EntryInput {
            date,
            capital: Decimal::ZERO,
            factory_expenses: Decimal::ZERO,
            personal_expenses: Decimal::ZERO,
            loans: Decimal::ZERO,
            rejects: Decimal::ZERO,
            production: Decimal::ZERO,
            gross_income: Decimal::ZERO,
        }
    }

    pub fn total_expenses(&self) -> Decimal {
        self.factory_expenses
            .saturating_add(self.personal_expenses)
            .saturating_add(self.loans)
            .saturating_add(self.rejects)
    }

    pub fn income(&self, basis: IncomeBasis) -> Decimal {
        match basis {
            IncomeBasis::Production => self.production,
            IncomeBasis::GrossIncome => self.gross_income,
        }
    }
}

// ============================================================================
// DERIVATION
// ============================================================================

/// The two derived scalars of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derived {
    pub net_income: Decimal,
    pub capital_remaining: Decimal,
}

/// Compute net income and capital remaining from form input. Pure.
/// Sums saturate at the `Decimal` range instead of overflowing.
pub fn derive(input: &EntryInput, basis: IncomeBasis) -> Derived {
    let net_income = input.income(basis).saturating_sub(input.total_expenses());
    Derived {
        net_income,
        capital_remaining: input.capital.saturating_add(net_income),
    }
}

// ============================================================================
// LEDGER ENTRY
// ============================================================================

/// One ledger record with its derived fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Stable identity, kept across edits
    pub id: String,
    pub date: NaiveDate,
    pub capital: Decimal,
    pub factory_expenses: Decimal,
    pub personal_expenses: Decimal,
    pub loans: Decimal,
    pub rejects: Decimal,
    pub production: Decimal,
    pub gross_income: Decimal,
    pub net_income: Decimal,
    pub capital_remaining: Decimal,
}

impl LedgerEntry {
    /// Build an entry from input, deriving net income and capital remaining
    pub fn derive(id: String, input: &EntryInput, basis: IncomeBasis) -> Self {
        let derived = derive(input, basis);
        LedgerEntry {
            id,
            date: input.date,
            capital: input.capital,
            factory_expenses: input.factory_expenses,
            personal_expenses: input.personal_expenses,
            loans: input.loans,
            rejects: input.rejects,
            production: input.production,
            gross_income: input.gross_income,
            net_income: derived.net_income,
            capital_remaining: derived.capital_remaining,
        }
    }

    pub fn total_expenses(&self) -> Decimal {
        self.factory_expenses
            .saturating_add(self.personal_expenses)
            .saturating_add(self.loans)
            .saturating_add(self.rejects)
    }

    /// The input this entry was derived from
    pub fn input(&self) -> EntryInput {
        EntryInput {
            date: self.date,
            capital: self.capital,
            factory_expenses: self.factory_expenses,
            personal_expenses: self.personal_expenses,
            loans: self.loans,
            rejects: self.rejects,
            production: self.production,
            gross_income: self.gross_income,
        }
    }

    pub fn date_key(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}
