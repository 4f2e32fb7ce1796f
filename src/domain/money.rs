/// Money is represented as integer minor units to avoid floating-point precision issues.
/// For EUR/USD, 1 unit = 100 cents, so €50.00 = 5000. For JPY, 1 unit = 1.
pub type Cents = i64;

/// Currencies the processor settles without a minor unit.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];

/// Normalize a provider currency code ("eur") to its display form ("EUR").
pub fn normalize_currency(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Number of decimal digits in the currency's minor unit.
pub fn currency_exponent(currency: &str) -> u32 {
    let code = normalize_currency(currency);
    if ZERO_DECIMAL_CURRENCIES.contains(&code.as_str()) {
        0
    } else {
        2
    }
}

/// Display symbol for a currency, falling back to the ISO code.
pub fn currency_symbol(currency: &str) -> String {
    let code = normalize_currency(currency);
    match code.as_str() {
        "EUR" => "€".to_string(),
        "USD" => "$".to_string(),
        "GBP" => "£".to_string(),
        "JPY" => "¥".to_string(),
        "CAD" => "$ CA".to_string(),
        "AUD" => "$ AU".to_string(),
        _ => code,
    }
}

/// Split minor units into sign, whole units and fractional digits for a currency.
pub fn split_minor(amount: Cents, currency: &str) -> (bool, u64, Option<String>) {
    let exponent = currency_exponent(currency);
    let negative = amount < 0;
    let abs = amount.unsigned_abs();
    if exponent == 0 {
        return (negative, abs, None);
    }
    let divisor = 10u64.pow(exponent);
    let units = abs / divisor;
    let remainder = abs % divisor;
    (
        negative,
        units,
        Some(format!("{:0width$}", remainder, width = exponent as usize)),
    )
}

/// Format minor units as a plain decimal string for the given currency.
/// Example: (5000, "EUR") -> "50.00", (-1234, "usd") -> "-12.34", (500, "JPY") -> "500"
pub fn format_cents(amount: Cents, currency: &str) -> String {
    let (negative, units, fraction) = split_minor(amount, currency);
    let sign = if negative { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, units, fraction),
        None => format!("{}{}", sign, units),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000, "EUR"), "50.00");
        assert_eq!(format_cents(1234, "eur"), "12.34");
        assert_eq!(format_cents(1, "USD"), "0.01");
        assert_eq!(format_cents(0, "EUR"), "0.00");
        assert_eq!(format_cents(-5000, "EUR"), "-50.00");
        assert_eq!(format_cents(-1, "EUR"), "-0.01");
    }

    #[test]
    fn test_format_zero_decimal_currency() {
        assert_eq!(format_cents(500, "JPY"), "500");
        assert_eq!(format_cents(-12, "krw"), "-12");
    }

    #[test]
    fn test_currency_symbol_fallback() {
        assert_eq!(currency_symbol("eur"), "€");
        assert_eq!(currency_symbol("sek"), "SEK");
    }
}
