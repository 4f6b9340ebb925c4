use crate::config::CurrencyFormat;

/// Renders an amount the way `toLocaleString` does for the configured locale:
/// grouped thousands, trailing fractional zeros dropped.
pub fn format_amount(amount: f64, format: &CurrencyFormat) -> String {
    if !amount.is_finite() {
        let sign = if amount.is_sign_negative() { "-" } else { "" };
        return format!("{} {sign}\u{221e}", format.symbol);
    }

    let scale = 10f64.powi(format.max_fraction_digits as i32);
    let rounded = (amount.abs() * scale).round() / scale;
    let rendered = format!("{:.*}", format.max_fraction_digits, rounded);
    let (integer, fraction) = rendered.split_once('.').unwrap_or((rendered.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let digits: Vec<char> = integer.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.iter().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push_str(&format.grouping);
        }
        grouped.push(*digit);
    }

    let negative = amount < 0.0 && (grouped.chars().any(|c| c != '0') || !fraction.is_empty());
    let mut out = format!("{} ", format.symbol);
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !fraction.is_empty() {
        out.push_str(&format.decimal);
        out.push_str(fraction);
    }
    out
}
