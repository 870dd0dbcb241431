//! Significant-digit rounding for values with uncertainties.
//!
//! The [`Rounder`] formats a primary number together with zero, one or two
//! error values so that all of them share one decimal exponent. The retained
//! precision is driven by the smallest-magnitude nonzero input: its
//! `sig_digits` leading digits are kept, and every other number is rounded to
//! the same decimal place.
//!
//! Numbers whose smallest magnitude lies between `10^-neg_digits` and
//! `10^pos_digits` (inclusive, measured as `floor(log10(|x|))`) print as plain
//! decimals. Anything outside that window switches to scientific notation.
//!
//! ```rust
//! use textablelib::rounding::Rounder;
//!
//! let rounder = Rounder::new(3, 3, 2);
//! assert_eq!(rounder.latex_value(12.345), "12.3");
//! assert_eq!(rounder.latex_value(1000.0), "$1.00\\cdot10^{3}$");
//! assert_eq!(rounder.latex_value_error(1.23456, 0.0123), "$1.2346\\pm0.0123$");
//! ```

use serde::{Deserialize, Serialize};

/// Output markup dialect for rounded values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// LaTeX math markup (`$1.2\pm0.3$`)
    #[default]
    Latex,
    /// HTML entities and tags (`1.2&plusmn;0.3`)
    Html,
}

/// Errors attached to a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Errors {
    /// Bare value
    None,
    /// One symmetric error, rendered as `value ± error`
    Symmetric(f64),
    /// Separate upward and downward errors
    Asymmetric { up: f64, down: f64 },
}

/// Numbers rounded to a shared decimal exponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rounded {
    /// Formatted mantissas, one per input number, in input order
    pub values: Vec<String>,
    /// Display exponent; `0` means plain decimal notation
    pub exponent: i32,
}

/// Significant-digit rounder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rounder {
    /// Number of significant digits kept for the smallest-magnitude input
    pub sig_digits: u32,
    /// Lowest decimal exponent still printed as a plain decimal (negated)
    pub neg_digits: i32,
    /// Highest decimal exponent still printed as a plain decimal
    pub pos_digits: i32,
}

impl Default for Rounder {
    fn default() -> Self {
        Self {
            sig_digits: 2,
            neg_digits: 3,
            pos_digits: 3,
        }
    }
}

impl Rounder {
    /// Create a rounder with explicit digit settings.
    pub fn new(sig_digits: u32, neg_digits: i32, pos_digits: i32) -> Self {
        Self {
            sig_digits,
            neg_digits,
            pos_digits,
        }
    }

    /// Rounder used for table cells: plain decimals from `1e-3` up to `999`.
    pub fn for_cells(sig_digits: u32) -> Self {
        Self::new(sig_digits, 3, 2)
    }

    /// Round all numbers to a shared exponent and decimal place.
    ///
    /// If no number is nonzero every output is `"0"` and the exponent is `0`.
    pub fn sdr(&self, numbers: &[f64]) -> Rounded {
        let smallest = numbers
            .iter()
            .filter(|n| **n != 0.0 && n.is_finite())
            .map(|n| decimal_exponent(*n))
            .min();

        let Some(x) = smallest else {
            return Rounded {
                values: numbers.iter().map(|n| format_at_place(*n, 0)).collect(),
                exponent: 0,
            };
        };

        let mut exponent = if x < -self.neg_digits || x > self.pos_digits {
            x
        } else {
            0
        };
        let mut place = x - exponent - self.sig_digits as i32 + 1;

        // 9.996e5 at three digits would print as 10.00e5
        let rounds_to_ten =
            |n: f64| n != 0.0 && round_to_place(shift(n, exponent), place).abs() == 10.0;
        if exponent != 0 && numbers.iter().any(|n| rounds_to_ten(*n)) {
            // Values that did not round up keep their last digit
            if !numbers.iter().filter(|n| **n != 0.0).all(|n| rounds_to_ten(*n)) {
                place -= 1;
            }
            exponent += 1;
        }

        Rounded {
            values: numbers
                .iter()
                .map(|n| format_scaled(*n, exponent, place))
                .collect(),
            exponent,
        }
    }

    /// Render a value with optional errors in the given dialect.
    pub fn render(&self, dialect: Dialect, value: f64, errors: Errors) -> String {
        match dialect {
            Dialect::Latex => self.latex(value, errors),
            Dialect::Html => self.html(value, errors),
        }
    }

    /// Render a value with optional errors as LaTeX.
    pub fn latex(&self, value: f64, errors: Errors) -> String {
        match errors {
            Errors::None => self.latex_value(value),
            Errors::Symmetric(error) => self.latex_value_error(value, error),
            Errors::Asymmetric { up, down } => self.latex_value_up_down_error(value, up, down),
        }
    }

    /// Render a value with optional errors as HTML.
    pub fn html(&self, value: f64, errors: Errors) -> String {
        match errors {
            Errors::None => self.html_value(value),
            Errors::Symmetric(error) => self.html_value_error(value, error),
            Errors::Asymmetric { up, down } => self.html_value_up_down_error(value, up, down),
        }
    }

    pub fn latex_value(&self, value: f64) -> String {
        let Rounded { values, exponent } = self.sdr(&[value]);
        if exponent != 0 {
            format!("${}\\cdot10^{{{}}}$", values[0], exponent)
        } else {
            values[0].clone()
        }
    }

    pub fn latex_value_error(&self, value: f64, error: f64) -> String {
        let Rounded { values, exponent } = self.sdr(&[value, error]);
        if exponent != 0 {
            format!(
                "${}\\pm{}\\cdot10^{{{}}}$",
                values[0], values[1], exponent
            )
        } else {
            format!("${}\\pm{}$", values[0], values[1])
        }
    }

    /// Render only the value, rounded as if its error were shown.
    pub fn latex_value_significantly(&self, value: f64, error: f64) -> String {
        let Rounded { values, exponent } = self.sdr(&[value, error]);
        if exponent != 0 {
            format!("${}\\cdot10^{{{}}}$", values[0], exponent)
        } else {
            values[0].clone()
        }
    }

    pub fn latex_value_up_down_error(&self, value: f64, up: f64, down: f64) -> String {
        let Rounded { values, exponent } = self.sdr(&[value, up, down]);
        if exponent != 0 {
            format!(
                "${}^{{+{}}}_{{-{}}}\\cdot10^{{{}}}$",
                values[0], values[1], values[2], exponent
            )
        } else {
            format!("${}^{{+{}}}_{{-{}}}$", values[0], values[1], values[2])
        }
    }

    pub fn html_value(&self, value: f64) -> String {
        let Rounded { values, exponent } = self.sdr(&[value]);
        if exponent != 0 {
            format!("{}&sdot;10<sup>{}</sup>", values[0], exponent)
        } else {
            values[0].clone()
        }
    }

    pub fn html_value_error(&self, value: f64, error: f64) -> String {
        let Rounded { values, exponent } = self.sdr(&[value, error]);
        if exponent != 0 {
            format!(
                "{}&plusmn;{}&sdot;10<sup>{}</sup>",
                values[0], values[1], exponent
            )
        } else {
            format!("{}&plusmn;{}", values[0], values[1])
        }
    }

    pub fn html_value_up_down_error(&self, value: f64, up: f64, down: f64) -> String {
        let Rounded { values, exponent } = self.sdr(&[value, up, down]);
        let stacked = format!(
            concat!(
                "{} <span style=\"position: relative; display: inline-block; line-height: 1; ",
                "margin-right: .3em\">&nbsp;",
                "<sup style=\"display: block; font-size: .5em; line-height: 1\">+{}</sup>",
                "<sub style=\"display: block; font-size: .5em; line-height: 1\">-{}</sub></span>",
            ),
            values[0], values[1], values[2]
        );
        if exponent != 0 {
            format!("{}&sdot;10<sup>{}</sup>", stacked, exponent)
        } else {
            stacked
        }
    }
}

/// `floor(log10(|n|))`, read from the shortest decimal form so exact powers of
/// ten and subnormals come out right.
fn decimal_exponent(n: f64) -> i32 {
    format!("{:e}", n.abs())
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0)
}

/// `n / 10^exponent`, multiplying for negative exponents so small powers stay exact.
fn shift(n: f64, exponent: i32) -> f64 {
    // 10^309 and beyond overflow, so large shifts go in two steps
    if exponent.abs() > 300 {
        let half = exponent / 2;
        return shift(shift(n, half), exponent - half);
    }
    if exponent >= 0 {
        n / 10f64.powi(exponent)
    } else {
        n * 10f64.powi(-exponent)
    }
}

/// Format `n / 10^exponent` rounded to `place`.
///
/// When the scaled value does not fit in an `f64` the digits are taken from
/// the decimal expansion of `n` itself.
fn format_scaled(n: f64, exponent: i32, place: i32) -> String {
    let g = shift(n, exponent);
    if g.is_finite() || !n.is_finite() {
        return format_at_place(g, place);
    }

    let digits = (decimal_exponent(n) - exponent - place + 1).max(1) as usize;
    let sci = format!("{:.*e}", digits - 1, n.abs());
    let Some((mantissa, e)) = sci.split_once('e') else {
        return sci;
    };
    let e: i32 = e.parse().unwrap_or(0);
    let mut text: String = mantissa.chars().filter(|c| *c != '.').collect();

    let width = (e - exponent - place + 1).max(1) as usize;
    while text.len() < width {
        text.push('0');
    }
    if place < 0 {
        let split = text.len() - (-place) as usize;
        text.insert(split, '.');
    } else {
        text.push_str(&"0".repeat(place as usize));
    }
    if n < 0.0 {
        text.insert(0, '-');
    }
    text
}

/// Round to the decimal place `place` (`-2` is hundredths, `1` is tens).
fn round_to_place(g: f64, place: i32) -> f64 {
    if place < 0 {
        let factor = 10f64.powi(-place);
        (g * factor).round() / factor
    } else {
        let factor = 10f64.powi(place);
        (g / factor).round() * factor
    }
}

fn format_at_place(g: f64, place: i32) -> String {
    if g == 0.0 {
        return "0".to_string();
    }
    if !g.is_finite() {
        return g.to_string();
    }
    if place < 0 {
        format!("{:.*}", (-place) as usize, g)
    } else {
        let rounded = round_to_place(g, place);
        if rounded == 0.0 {
            "0".to_string()
        } else {
            format!("{:.0}", rounded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_rounder() -> Rounder {
        Rounder::new(3, 3, 2)
    }

    #[test]
    fn test_all_zero_inputs() {
        let rounded = Rounder::default().sdr(&[0.0, 0.0, 0.0]);
        assert_eq!(rounded.values, vec!["0", "0", "0"]);
        assert_eq!(rounded.exponent, 0);
    }

    #[test]
    fn test_plain_value() {
        let rounder = table_rounder();
        assert_eq!(rounder.latex_value(12.345), "12.3");
        assert_eq!(rounder.latex_value(0.5), "0.500");
        assert_eq!(rounder.latex_value(-42.42), "-42.4");
    }

    #[test]
    fn test_integer_place_rounds_to_tens() {
        // x = 2, place = 2 - 0 - 2 + 1 = 1
        let rounder = Rounder::new(2, 3, 3);
        let rounded = rounder.sdr(&[456.0]);
        assert_eq!(rounded.values, vec!["460"]);
        assert_eq!(rounded.exponent, 0);
    }

    #[test]
    fn test_scientific_above_threshold() {
        let rounder = table_rounder();
        assert_eq!(rounder.latex_value(1000.0), "$1.00\\cdot10^{3}$");
        assert_eq!(rounder.html_value(1000.0), "1.00&sdot;10<sup>3</sup>");
    }

    #[test]
    fn test_scientific_below_threshold() {
        let rounder = Rounder::new(2, 3, 3);
        let rounded = rounder.sdr(&[0.000_123_4]);
        assert_eq!(rounded.exponent, -4);
        assert_eq!(rounded.values, vec!["1.2"]);
    }

    #[test]
    fn test_exponent_threshold_is_inclusive() {
        let rounder = Rounder::new(3, 3, 3);
        for n in [0.001, 0.0099, 0.5, 1.0, 9.9, 123.0, 999.0, 1000.0, 9999.0] {
            assert_eq!(rounder.sdr(&[n]).exponent, 0, "n = {n}");
        }
        assert_eq!(rounder.sdr(&[10_000.0]).exponent, 4);
        assert_eq!(rounder.sdr(&[0.000_99]).exponent, -4);
    }

    #[test]
    fn test_smallest_value_drives_precision() {
        let rounder = Rounder::new(2, 3, 3);
        let rounded = rounder.sdr(&[1.23456, 0.0123]);
        assert_eq!(rounded.values, vec!["1.235", "0.012"]);
        assert_eq!(rounded.exponent, 0);
    }

    #[test]
    fn test_zero_error_prints_zero() {
        let rounder = table_rounder();
        let rounded = rounder.sdr(&[3.14159, 0.0]);
        assert_eq!(rounded.values, vec!["3.14", "0"]);
    }

    #[test]
    fn test_renormalizes_ten_in_scientific_mode() {
        let rounder = table_rounder();
        let rounded = rounder.sdr(&[999_600.0]);
        assert_eq!(rounded.values, vec!["1.00"]);
        assert_eq!(rounded.exponent, 6);
    }

    #[test]
    fn test_value_error_formats() {
        let rounder = Rounder::new(2, 3, 3);
        assert_eq!(rounder.latex_value_error(10.234, 0.56), "$10.23\\pm0.56$");
        assert_eq!(rounder.html_value_error(10.234, 0.56), "10.23&plusmn;0.56");
        assert_eq!(
            rounder.latex_value_error(523_400.0, 12_000.0),
            "$52.3\\pm1.2\\cdot10^{4}$"
        );
        assert_eq!(rounder.latex_value_significantly(10.234, 0.56), "10.23");
    }

    #[test]
    fn test_up_down_error_formats() {
        let rounder = Rounder::new(2, 3, 3);
        assert_eq!(
            rounder.latex_value_up_down_error(5.678, 0.12, 0.34),
            "$5.68^{+0.12}_{-0.34}$"
        );
        let html = rounder.html_value_up_down_error(5.678, 0.12, 0.34);
        assert!(html.starts_with("5.68 <span"));
        assert!(html.contains(">+0.12</sup>"));
        assert!(html.contains(">-0.34</sub>"));
    }

    #[test]
    fn test_render_dispatch() {
        let rounder = Rounder::new(2, 3, 3);
        assert_eq!(
            rounder.render(Dialect::Latex, 10.234, Errors::Symmetric(0.56)),
            rounder.latex_value_error(10.234, 0.56)
        );
        assert_eq!(
            rounder.render(Dialect::Html, 10.234, Errors::None),
            rounder.html_value(10.234)
        );
        assert_eq!(
            rounder.render(
                Dialect::Latex,
                5.678,
                Errors::Asymmetric {
                    up: 0.12,
                    down: 0.34
                }
            ),
            rounder.latex_value_up_down_error(5.678, 0.12, 0.34)
        );
    }

    #[test]
    fn test_round_trip_within_precision() {
        let rounder = Rounder::new(3, 3, 3);
        let sets: [&[f64]; 13] = [
            &[1234.5],
            &[0.0123],
            &[5.0],
            &[-42.42],
            &[9.87e-7],
            &[3.3e9],
            &[0.1],
            &[271_828.0],
            &[-0.000_456],
            &[1234.5, 0.0123],
            &[523_400.0, 12_000.0],
            &[999_600.0, 123_400.0],
            &[9.996e-5, 1.234e-5, -3.21e-5],
        ];
        for numbers in sets {
            let rounded = rounder.sdr(numbers);
            let smallest = numbers.iter().map(|n| decimal_exponent(*n)).min().unwrap();
            let last_digit = 10f64.powi(smallest - 3 + 1);
            for (n, value) in numbers.iter().zip(&rounded.values) {
                let mantissa: f64 = value.parse().unwrap();
                let restored = mantissa * 10f64.powi(rounded.exponent);
                assert!(
                    (restored - n).abs() <= 0.51 * last_digit,
                    "numbers = {numbers:?}, n = {n}, restored = {restored}"
                );
            }
        }
    }

    #[test]
    fn test_renormalization_keeps_smaller_values_precise() {
        let rounder = table_rounder();
        let rounded = rounder.sdr(&[999_600.0, 123_400.0]);
        assert_eq!(rounded.values, vec!["1.000", "0.123"]);
        assert_eq!(rounded.exponent, 6);

        assert_eq!(
            rounder.latex_value_error(1_234_000.0, 999_600.0),
            "$1.234\\pm1.000\\cdot10^{6}$"
        );
    }

    #[test]
    fn test_extreme_magnitudes_stay_finite() {
        let rounder = table_rounder();
        let tiny = rounder.sdr(&[5e-324]);
        assert_eq!(tiny.values, vec!["4.94"]);
        assert_eq!(tiny.exponent, -324);

        let wide = rounder.sdr(&[1e300, 1e-300]);
        assert_eq!(wide.exponent, -300);
        assert_eq!(wide.values[1], "1.00");
        assert!(wide.values[0].starts_with("1000000000000000"));
        assert!(wide.values[0].ends_with(".00"));
        assert_eq!(wide.values[0].len(), 601 + 3);
        assert!(wide.values.iter().all(|v| !v.contains("inf")));

        let negative = rounder.sdr(&[-1e300, 1e-300]);
        assert!(negative.values[0].starts_with("-1000"));
    }

    #[test]
    fn test_decimal_exponent_exact_powers() {
        assert_eq!(decimal_exponent(1000.0), 3);
        assert_eq!(decimal_exponent(0.001), -3);
        assert_eq!(decimal_exponent(999.999), 2);
        assert_eq!(decimal_exponent(-1.0), 0);
        assert_eq!(decimal_exponent(1e-300), -300);
        assert_eq!(decimal_exponent(5e-324), -324);
    }
}
