use chrono::NaiveDate;

/// Candidate layouts tried, in order, when a title date is not already `dd/mm/yyyy`.
pub const DATE_INPUT_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%Y/%m/%d"];

pub const DATE_OUTPUT_FORMAT: &str = "%d/%m/%Y";

const UNITS: [&str; 20] = [
    "Zero", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten",
    "Eleven", "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen",
    "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

/// Lenient numeric coercion: anything that is not a finite number becomes 0.0.
pub fn safe_float(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Normalises a date string to `dd/mm/yyyy`.
///
/// Values already shaped like `dd/mm/yyyy` pass through untouched. Otherwise each
/// layout in [`DATE_INPUT_FORMATS`] is tried in order and the first match is
/// reformatted. Unparseable input is returned trimmed but otherwise unchanged.
pub fn normalize_date(raw: &str) -> String {
    let date_str = raw.trim();
    if date_str.is_empty() {
        return String::new();
    }

    if is_dd_mm_yyyy(date_str) {
        return date_str.to_string();
    }

    for fmt in DATE_INPUT_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_str, fmt) {
            return date.format(DATE_OUTPUT_FORMAT).to_string();
        }
    }

    date_str.to_string()
}

fn is_dd_mm_yyyy(value: &str) -> bool {
    let parts: Vec<&str> = value.split('/').collect();
    parts.len() == 3 && parts[0].len() == 2 && parts[1].len() == 2 && parts[2].len() == 4
}

/// Ceiling to the next even integer: `ceil(value)`, plus one when that is odd.
pub fn round_up_to_even(value: f64) -> f64 {
    let rounded = value.ceil();
    if rounded % 2.0 != 0.0 {
        rounded + 1.0
    } else {
        rounded
    }
}

/// `part / whole * 100`, or 0.0 when the base is not positive.
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Formats an amount with two decimals and Indian digit grouping (`12,34,567.89`).
pub fn format_indian_amount(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let grouped = group_indian(int_part);
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, last_three) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), last_three)
}

/// Formats a quantity with at most three decimals, dropping trailing zeros.
pub fn format_quantity(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let fixed = format!("{:.3}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Rupee amount in words using the Indian numbering system.
///
/// Only the integer part is spelled out; paise are truncated.
pub fn amount_in_words(amount: f64) -> String {
    if !amount.is_finite() {
        return "Rupees Zero Only".to_string();
    }

    let rupees = amount.trunc();
    let words = integer_to_words(rupees.abs() as u64);
    if rupees < 0.0 {
        format!("Minus Rupees {} Only", words)
    } else {
        format!("Rupees {} Only", words)
    }
}

pub fn integer_to_words(n: u64) -> String {
    if n == 0 {
        return UNITS[0].to_string();
    }

    let mut parts: Vec<String> = Vec::new();

    let crore = n / 10_000_000;
    let rest = n % 10_000_000;
    if crore > 0 {
        parts.push(format!("{} Crore", integer_to_words(crore)));
    }

    let lakh = rest / 100_000;
    let thousand = (rest % 100_000) / 1_000;
    let hundred = (rest % 1_000) / 100;
    let below_hundred = rest % 100;

    if lakh > 0 {
        parts.push(format!("{} Lakh", below_hundred_words(lakh)));
    }
    if thousand > 0 {
        parts.push(format!("{} Thousand", below_hundred_words(thousand)));
    }
    if hundred > 0 {
        parts.push(format!("{} Hundred", UNITS[hundred as usize]));
    }
    if below_hundred > 0 {
        parts.push(below_hundred_words(below_hundred));
    }

    parts.join(" ")
}

fn below_hundred_words(n: u64) -> String {
    debug_assert!(n < 100);
    if n < 20 {
        UNITS[n as usize].to_string()
    } else if n % 10 == 0 {
        TENS[(n / 10) as usize].to_string()
    } else {
        format!("{} {}", TENS[(n / 10) as usize], UNITS[(n % 10) as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_float() {
        assert_eq!(safe_float("12.5"), 12.5);
        assert_eq!(safe_float("  7 "), 7.0);
        assert_eq!(safe_float("abc"), 0.0);
        assert_eq!(safe_float(""), 0.0);
        assert_eq!(safe_float("NaN"), 0.0);
        assert_eq!(safe_float("inf"), 0.0);
    }

    #[test]
    fn test_normalize_date_passthrough_and_formats() {
        assert_eq!(normalize_date("05/03/2024"), "05/03/2024");
        assert_eq!(normalize_date("2024-03-05"), "05/03/2024");
        assert_eq!(normalize_date("05-03-2024"), "05/03/2024");
        // mm/dd/yyyy is tried before yyyy/mm/dd
        assert_eq!(normalize_date("3/5/2024"), "05/03/2024");
        assert_eq!(normalize_date("2024/03/05"), "05/03/2024");
    }

    #[test]
    fn test_normalize_date_never_fails() {
        assert_eq!(normalize_date("sometime in March"), "sometime in March");
        assert_eq!(normalize_date("2024-03-05 00:00:00"), "2024-03-05 00:00:00");
        assert_eq!(normalize_date("   "), "");
    }

    #[test]
    fn test_round_up_to_even() {
        assert_eq!(round_up_to_even(2000.0), 2000.0);
        assert_eq!(round_up_to_even(1999.0), 2000.0);
        assert_eq!(round_up_to_even(1998.2), 2000.0);
        assert_eq!(round_up_to_even(1997.5), 1998.0);
        assert_eq!(round_up_to_even(0.0), 0.0);
    }

    #[test]
    fn test_percent_of_zero_base() {
        assert_eq!(percent_of(50.0, 0.0), 0.0);
        assert_eq!(percent_of(50.0, 200.0), 25.0);
    }

    #[test]
    fn test_format_indian_amount() {
        assert_eq!(format_indian_amount(0.0), "0.00");
        assert_eq!(format_indian_amount(999.5), "999.50");
        assert_eq!(format_indian_amount(1000.0), "1,000.00");
        assert_eq!(format_indian_amount(123456.789), "1,23,456.79");
        assert_eq!(format_indian_amount(12345678.0), "1,23,45,678.00");
        assert_eq!(format_indian_amount(-85000.0), "-85,000.00");
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(10.0), "10");
        assert_eq!(format_quantity(2.5), "2.5");
        assert_eq!(format_quantity(1.23456), "1.235");
        assert_eq!(format_quantity(-0.0001), "0");
    }

    #[test]
    fn test_amount_in_words() {
        assert_eq!(amount_in_words(0.0), "Rupees Zero Only");
        assert_eq!(amount_in_words(85000.0), "Rupees Eighty Five Thousand Only");
        assert_eq!(
            amount_in_words(123456.99),
            "Rupees One Lakh Twenty Three Thousand Four Hundred Fifty Six Only"
        );
        assert_eq!(
            amount_in_words(10_000_015.0),
            "Rupees One Crore Fifteen Only"
        );
    }

    #[test]
    fn test_integer_to_words_large() {
        assert_eq!(
            integer_to_words(1_250_000_000),
            "One Hundred Twenty Five Crore"
        );
        assert_eq!(integer_to_words(40), "Forty");
    }
}
