//! Currency display, German locale style: `1.234,56 €`.

use rust_decimal::{Decimal, RoundingStrategy};

fn symbol(code: &str) -> &str {
    match code {
        "EUR" => "€",
        "USD" => "$",
        "GBP" => "£",
        "CHF" => "CHF",
        other => other,
    }
}

/// Format `amount` with two decimals, `.` grouping and `,` decimal mark.
pub fn format_currency(amount: Decimal, currency: &str) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let digits = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{sign}{grouped},{frac_part} {}", symbol(currency))
}

/// Like `format_currency`, with an explicit `+` for non-negative values.
pub fn format_signed(amount: Decimal, currency: &str) -> String {
    let formatted = format_currency(amount, currency);
    if formatted.starts_with('-') {
        formatted
    } else {
        format!("+{formatted}")
    }
}
