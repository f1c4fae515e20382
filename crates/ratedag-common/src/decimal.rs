//! Fixed-precision decimal arithmetic with explicit rounding modes.
//!
//! `Decimal` is a thin re-export of `rust_decimal::Decimal`: a 96-bit
//! signed fixed-point number with up to 28-29 significant digits. No
//! repository in this project's lineage depends on a true
//! arbitrary-precision decimal crate, so `rust_decimal` stands in for
//! "arbitrary precision" — comfortably enough range and scale for tariff
//! rates, factors, and currency amounts (see `SPEC_FULL.md` §3).

use std::fmt;

pub use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rounding modes recognized by ROUND nodes (`spec.md` §3).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundingMode {
    /// Round half away from zero ("HALF_UP" in the declaration vocabulary).
    HalfUp,
    /// Round half to even ("HALF_EVEN", a.k.a. banker's rounding).
    HalfEven,
}

impl RoundingMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HALF_UP" => Some(Self::HalfUp),
            "HALF_EVEN" => Some(Self::HalfEven),
            _ => None,
        }
    }

    fn strategy(self) -> RoundingStrategy {
        match self {
            Self::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            Self::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HalfUp => "HALF_UP",
            Self::HalfEven => "HALF_EVEN",
        })
    }
}

/// Round `value` to `decimals` fractional digits under `mode`.
///
/// This is the only place rounding happens in the engine (`spec.md` §4.4
/// "Rounding is explicit and confined to ROUND nodes").
pub fn round(value: Decimal, decimals: u32, mode: RoundingMode) -> Decimal {
    value.round_dp_with_strategy(decimals, mode.strategy())
}
