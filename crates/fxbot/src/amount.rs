//! Amount parsing and fixed-precision money arithmetic
//!
//! Every amount the bot works with is a [`Decimal`] quantized to six
//! fractional digits with round-half-up (midpoint away from zero).

use crate::error::{BotError, Result};
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use std::sync::LazyLock;

/// Fractional digits kept for amounts, rates and results
pub const SCALE: u32 = 6;

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([0-9., ]+)\s*$").expect("amount pattern is valid"));

/// Parse user-typed amount text.
///
/// Spaces are thousands separators. When both `.` and `,` appear the rightmost
/// one is the decimal separator and the other a thousands separator; a lone
/// `,` is a decimal separator.
///
/// ```
/// use fxbot::amount::parse_amount;
///
/// assert_eq!(parse_amount("1 234,56").unwrap().to_string(), "1234.560000");
/// assert_eq!(parse_amount("1,234.56").unwrap().to_string(), "1234.560000");
/// ```
pub fn parse_amount(text: &str) -> Result<Decimal> {
    let invalid = || BotError::InvalidAmount(text.trim().to_string());

    let captures = AMOUNT_RE.captures(text).ok_or_else(invalid)?;
    let mut s: String = captures[1].chars().filter(|c| *c != ' ').collect();

    if !s.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    match (s.rfind('.'), s.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => {
            s = s.replace('.', "").replace(',', ".");
        }
        (Some(_), Some(_)) => {
            s = s.replace(',', "");
        }
        (None, Some(_)) => {
            s = s.replace(',', ".");
        }
        _ => {}
    }

    if s.matches('.').count() > 1 {
        return Err(invalid());
    }
    if s.starts_with('.') {
        s.insert(0, '0');
    }
    if s.ends_with('.') {
        s.pop();
    }

    let value = Decimal::from_str(&s).map_err(|_| invalid())?;
    checked_quantize(value).ok_or_else(invalid)
}

/// Round half-up to [`SCALE`] digits and pin the scale.
///
/// Values above roughly 7.9e22 cannot hold six fractional digits in a
/// [`Decimal`] mantissa and keep a smaller scale; [`checked_quantize`]
/// rejects them instead.
pub fn quantize(value: Decimal) -> Decimal {
    let mut quantized = value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
    quantized.rescale(SCALE);
    quantized
}

/// [`quantize`], or `None` when the result would not display with exactly
/// six decimals
pub fn checked_quantize(value: Decimal) -> Option<Decimal> {
    let quantized = quantize(value);
    (quantized.scale() == SCALE).then_some(quantized)
}

/// `amount * rate`, quantized
pub fn apply_rate(amount: Decimal, rate: Decimal) -> Result<Decimal> {
    amount
        .checked_mul(rate)
        .and_then(checked_quantize)
        .ok_or_else(|| BotError::InvalidAmount(format!("{amount} is too large to convert")))
}
