use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Divisor -> suffix. A `BTreeMap` keeps the keys ascending, which the
/// "largest qualifying divisor" scan relies on.
pub type Divisors = BTreeMap<u64, String>;

pub fn default_divisors() -> Divisors {
    BTreeMap::from([
        (1, String::new()),
        (1_000, "K".to_string()),
        (1_000_000, "M".to_string()),
        (1_000_000_000, "B".to_string()),
        (1_000_000_000_000, "T".to_string()),
    ])
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Ties round away from zero.
    #[default]
    HalfUp,
    /// Ties round towards zero.
    HalfDown,
    HalfEven,
    HalfOdd,
}

impl RoundingMode {
    fn round(self, value: Decimal, precision: u32) -> Decimal {
        match self {
            RoundingMode::HalfUp => {
                value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
            }
            RoundingMode::HalfDown => {
                value.round_dp_with_strategy(precision, RoundingStrategy::MidpointTowardZero)
            }
            RoundingMode::HalfEven => {
                value.round_dp_with_strategy(precision, RoundingStrategy::MidpointNearestEven)
            }
            RoundingMode::HalfOdd => {
                let toward = value.round_dp_with_strategy(precision, RoundingStrategy::ToZero);
                let away = value.round_dp_with_strategy(precision, RoundingStrategy::AwayFromZero);
                if toward == away {
                    return toward;
                }

                // Not a tie: plain nearest rounding.
                let half = Decimal::new(5, precision + 1);
                let distance = (value - toward).abs();
                if distance != half {
                    return value
                        .round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
                }

                let even = value.round_dp_with_strategy(precision, RoundingStrategy::MidpointNearestEven);
                if even == toward { away } else { toward }
            }
        }
    }
}

/// Presentation options for the `*_count_for_humans` helpers.
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions<'a> {
    pub precision: u32,
    pub mode: RoundingMode,
    /// Falls back to the configured divisors when `None`.
    pub divisors: Option<&'a Divisors>,
}

impl Default for FormatOptions<'_> {
    fn default() -> Self {
        Self {
            precision: 1,
            mode: RoundingMode::HalfUp,
            divisors: None,
        }
    }
}

impl<'a> FormatOptions<'a> {
    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn mode(mut self, mode: RoundingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn divisors(mut self, divisors: &'a Divisors) -> Self {
        self.divisors = Some(divisors);
        self
    }
}

/// Formats `number` with the suffix of the largest divisor not above its
/// magnitude, e.g. `1500` with `{1000: "k"}` becomes `1.5k`.
pub fn count_for_humans(
    number: i64,
    precision: u32,
    mode: RoundingMode,
    divisors: &Divisors,
) -> String {
    let magnitude = number.unsigned_abs();
    let chosen = divisors
        .iter()
        .rev()
        .find(|(divisor, _)| **divisor <= magnitude);

    let Some((&divisor, suffix)) = chosen else {
        return number.to_string();
    };

    if divisor <= 1 {
        return number.to_string();
    }

    let scaled = Decimal::from(number) / Decimal::from(divisor);
    let rounded = mode.round(scaled, precision);

    format!("{}{}", format_fixed(rounded, precision), suffix)
}

// Fixed decimals with `,` grouping on the integer part.
fn format_fixed(value: Decimal, precision: u32) -> String {
    let rendered = format!("{:.*}", precision as usize, value.abs());
    let (integer, fraction) = match rendered.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (rendered.as_str(), None),
    };

    let mut grouped = String::with_capacity(rendered.len() + integer.len() / 3 + 1);
    if value.is_sign_negative() && !value.is_zero() {
        grouped.push('-');
    }
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }

    grouped
}
