//! Display formatting for amounts, rates and addresses.

use crate::core::currency::FiatCurrency;

/// Number formatting conventions of the locale a currency is displayed in.
struct LocaleFormat {
    symbol: &'static str,
    symbol_gap: &'static str,
    group: &'static str,
    decimal: char,
    minor_digits: usize,
}

fn locale_for(currency: FiatCurrency) -> LocaleFormat {
    match currency {
        FiatCurrency::Ngn => LocaleFormat {
            symbol: "₦",
            symbol_gap: "",
            group: ",",
            decimal: '.',
            minor_digits: 2,
        },
        FiatCurrency::Kes => LocaleFormat {
            symbol: "Ksh",
            symbol_gap: "\u{a0}",
            group: ",",
            decimal: '.',
            minor_digits: 2,
        },
        FiatCurrency::Ghs => LocaleFormat {
            symbol: "GH₵",
            symbol_gap: "",
            group: ",",
            decimal: '.',
            minor_digits: 2,
        },
        FiatCurrency::Zar => LocaleFormat {
            symbol: "R",
            symbol_gap: "\u{a0}",
            group: "\u{a0}",
            decimal: ',',
            minor_digits: 2,
        },
        FiatCurrency::Ugx => LocaleFormat {
            symbol: "USh",
            symbol_gap: "\u{a0}",
            group: ",",
            decimal: '.',
            minor_digits: 0,
        },
    }
}

fn group_thousands(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3 * separator.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push_str(separator);
        }
        grouped.push(ch);
    }
    grouped
}

/// Formats `value` with grouped integer digits and between `min_fraction` and
/// `max_fraction` fraction digits. Returns the sign separately so currency
/// symbols can be placed after it.
fn format_decimal(
    value: f64,
    min_fraction: usize,
    max_fraction: usize,
    group: &str,
    decimal: char,
) -> (bool, String) {
    if !value.is_finite() {
        return (false, value.to_string());
    }

    let fixed = format!("{:.*}", max_fraction, value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut fraction = fraction.trim_end_matches('0').to_string();
    while fraction.len() < min_fraction {
        fraction.push('0');
    }

    let is_zero = whole.chars().all(|c| c == '0') && fraction.chars().all(|c| c == '0');
    let negative = value < 0.0 && !is_zero;

    let mut formatted = group_thousands(whole, group);
    if !fraction.is_empty() {
        formatted.push(decimal);
        formatted.push_str(&fraction);
    }
    (negative, formatted)
}

/// Formats an amount in the currency's own locale, e.g. `₦1,500.75`.
pub fn format_currency(amount: f64, currency: FiatCurrency, maximum_fraction_digits: usize) -> String {
    let locale = locale_for(currency);
    let min_fraction = locale.minor_digits.min(maximum_fraction_digits);
    let (negative, number) = format_decimal(
        amount,
        min_fraction,
        maximum_fraction_digits,
        locale.group,
        locale.decimal,
    );
    let sign = if negative { "-" } else { "" };
    format!("{sign}{}{}{number}", locale.symbol, locale.symbol_gap)
}

/// Formats a plain number using en-US grouping.
pub fn format_number(amount: f64, maximum_fraction_digits: usize) -> String {
    let (negative, number) = format_decimal(amount, 0, maximum_fraction_digits, ",", '.');
    if negative { format!("-{number}") } else { number }
}

/// Formats an exchange rate; callers usually allow 8 fraction digits.
pub fn format_rate(rate: f64, maximum_fraction_digits: usize) -> String {
    format_number(rate, maximum_fraction_digits)
}

pub fn format_usd(amount: f64) -> String {
    let (negative, number) = format_decimal(amount, 2, 2, ",", '.');
    let sign = if negative { "-" } else { "" };
    format!("{sign}${number}")
}

/// Re-inserts thousands separators into a raw amount string while leaving the
/// decimal part exactly as typed.
pub fn format_amount_input(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let normalized = raw.replace(',', "");
    let mut parts = normalized.split('.');
    let whole = parts.next().unwrap_or_default();
    let decimal = parts.next();

    let whole_formatted = if whole.is_empty() {
        String::new()
    } else if whole.chars().all(|c| c.is_ascii_digit()) {
        let trimmed = whole.trim_start_matches('0');
        group_thousands(if trimmed.is_empty() { "0" } else { trimmed }, ",")
    } else {
        match whole.parse::<f64>() {
            Ok(value) => format_number(value.trunc(), 0),
            Err(_) => String::from("NaN"),
        }
    };

    match decimal {
        Some(decimal) => format!("{whole_formatted}.{decimal}"),
        None => whole_formatted,
    }
}

/// Parses a displayed amount back into a number; anything unparseable is 0.
pub fn parse_amount_input(raw: &str) -> f64 {
    if raw.is_empty() {
        return 0.0;
    }
    raw.replace(',', "")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Shortens a long address to `GABCD...WXYZ1` form.
pub fn truncate_address(address: &str, size: usize) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= size * 2 + 3 {
        return address.to_string();
    }
    let head: String = chars[..size].iter().collect();
    let tail: String = chars[chars.len() - size..].iter().collect();
    format!("{head}...{tail}")
}

/// Formats a countdown in seconds as `m:ss`.
pub fn format_rate_countdown(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency_by_locale() {
        assert_eq!(format_currency(1000.0, FiatCurrency::Ngn, 0), "₦1,000");
        assert_eq!(format_currency(1500.5, FiatCurrency::Ngn, 2), "₦1,500.50");
        assert_eq!(
            format_currency(50000.0, FiatCurrency::Kes, 0),
            "Ksh\u{a0}50,000"
        );
        assert_eq!(
            format_currency(1234.5, FiatCurrency::Zar, 2),
            "R\u{a0}1\u{a0}234,50"
        );
        assert_eq!(
            format_currency(1000000.0, FiatCurrency::Ugx, 2),
            "USh\u{a0}1,000,000"
        );
        assert_eq!(format_currency(-5.0, FiatCurrency::Ghs, 2), "-GH₵5.00");
    }

    #[test]
    fn test_format_number_and_rate() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(42.5, 6), "42.5");
        assert_eq!(format_number(0.0, 4), "0");
        assert_eq!(format_rate(0.000632911392405, 8), "0.00063291");
        assert_eq!(format_usd(1234.5), "$1,234.50");
    }

    #[test]
    fn test_amount_input_formatting() {
        assert_eq!(format_amount_input(""), "");
        assert_eq!(format_amount_input("1000000"), "1,000,000");
        assert_eq!(format_amount_input("1,000.5"), "1,000.5");
        assert_eq!(format_amount_input("0012"), "12");
        assert_eq!(format_amount_input("1000."), "1,000.");
        assert_eq!(format_amount_input(".25"), ".25");
    }

    #[test]
    fn test_parse_amount_input() {
        assert_eq!(parse_amount_input(""), 0.0);
        assert_eq!(parse_amount_input("1,000,000.25"), 1000000.25);
        assert_eq!(parse_amount_input("abc"), 0.0);
        assert_eq!(parse_amount_input("1000."), 1000.0);
    }

    #[test]
    fn test_truncate_address() {
        let address = "GBRPYHIL2CI3FNQ4BXLFMNDLFJUNPU2HY3ZMFSHONUCEOASW7QC7OX2H";
        assert_eq!(truncate_address(address, 5), "GBRPY...7OX2H");
        assert_eq!(truncate_address(address, 4), "GBRP...OX2H");
        assert_eq!(truncate_address("GABC", 5), "GABC");
        assert_eq!(truncate_address("", 5), "");
    }

    #[test]
    fn test_format_rate_countdown() {
        assert_eq!(format_rate_countdown(30), "0:30");
        assert_eq!(format_rate_countdown(75), "1:15");
        assert_eq!(format_rate_countdown(5), "0:05");
    }
}
