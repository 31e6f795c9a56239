//! Currency, date and unit formatting shared by the renderer and the CLI.

use chrono::NaiveDate;

use crate::invoice::Jurisdiction;

const POINTS_PER_MM: f32 = 2.83465;

/// Millimetres to PDF points
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

/// Format an amount with the jurisdiction's grouping and decimal rules,
/// optionally prefixed with its currency symbol.
pub fn format_currency(amount: f64, jurisdiction: &Jurisdiction, with_symbol: bool) -> String {
    let formatted = format_amount(amount, jurisdiction);
    if with_symbol {
        format!("{} {}", jurisdiction.currency_symbol, formatted)
    } else {
        formatted
    }
}

/// Grouped number without any symbol
pub fn format_amount(amount: f64, jurisdiction: &Jurisdiction) -> String {
    let decimals = if jurisdiction.drop_zero_decimals && amount.fract() == 0.0 {
        0
    } else {
        2
    };
    group_decimal(
        amount,
        decimals,
        jurisdiction.group_separator,
        jurisdiction.decimal_separator,
    )
}

fn group_decimal(amount: f64, decimals: usize, group: char, decimal: char) -> String {
    let scale = 10f64.powi(decimals as i32);
    let scaled = (amount.abs() * scale).round();
    let negative = amount < 0.0 && scaled > 0.0;

    let scaled = scaled as u128;
    let whole = scaled / scale as u128;
    let frac = scaled % scale as u128;

    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + decimals + 2);
    if negative {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(group);
        }
        out.push(ch);
    }
    if decimals > 0 {
        out.push(decimal);
        out.push_str(&format!("{:0width$}", frac, width = decimals));
    }
    out
}

/// `2024-03-05` → `March 05, 2024`. Anything that does not start with a
/// `YYYY-MM-DD` date is returned unchanged.
pub fn format_date(value: &str) -> String {
    match NaiveDate::parse_and_remainder(value.trim(), "%Y-%m-%d") {
        Ok((date, _)) => date.format("%B %d, %Y").to_string(),
        Err(_) => value.to_string(),
    }
}

/// Quantities always print with two decimals, ties rounded away from zero
pub fn format_hours(hours: f64) -> String {
    format!("{:.2}", (hours * 100.0).round() / 100.0)
}

/// Tax percentage as shown in the totals label, without decimals. Ties
/// round away from zero.
pub fn format_percent(rate: f64) -> String {
    format!("{:.0}", rate.round())
}
