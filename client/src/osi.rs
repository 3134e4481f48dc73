//! OSI option symbols: `ROOT` + `YYMMDD` + `C|P` + strike × 1000 in 8 digits.
//!
//! `AAPL250117C00175000` is the AAPL call expiring 2025-01-17 with a 175 strike.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SUFFIX_LEN: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionRight {
    Call,
    Put,
}

impl OptionRight {
    pub fn letter(self) -> char {
        match self {
            OptionRight::Call => 'C',
            OptionRight::Put => 'P',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OsiParseError {
    #[error("symbol too short for an OSI option symbol")]
    TooShort,
    #[error("missing underlying root")]
    MissingRoot,
    #[error("invalid expiration date {0:?}")]
    Expiration(String),
    #[error("invalid option right {0:?}")]
    Right(char),
    #[error("invalid strike {0:?}")]
    Strike(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsiSymbol {
    pub root: String,
    pub expiration: NaiveDate,
    pub right: OptionRight,
    pub strike: BigDecimal,
}

impl FromStr for OsiSymbol {
    type Err = OsiParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        if !s.is_ascii() || s.len() <= SUFFIX_LEN {
            return Err(OsiParseError::TooShort);
        }
        let (root, suffix) = s.split_at(s.len() - SUFFIX_LEN);
        let root = root.trim();
        if root.is_empty() {
            return Err(OsiParseError::MissingRoot);
        }

        let date = &suffix[0..6];
        let expiration = NaiveDate::parse_from_str(date, "%y%m%d")
            .map_err(|_| OsiParseError::Expiration(date.to_string()))?;

        let right = match suffix.as_bytes()[6] {
            b'C' | b'c' => OptionRight::Call,
            b'P' | b'p' => OptionRight::Put,
            other => return Err(OsiParseError::Right(other as char)),
        };

        let digits = &suffix[7..];
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OsiParseError::Strike(digits.to_string()));
        }
        let milli: u64 = digits
            .parse()
            .map_err(|_| OsiParseError::Strike(digits.to_string()))?;
        let strike = BigDecimal::from_str(&format!("{}.{:03}", milli / 1000, milli % 1000))
            .map_err(|_| OsiParseError::Strike(digits.to_string()))?;

        Ok(OsiSymbol {
            root: root.to_string(),
            expiration,
            right,
            strike,
        })
    }
}

impl fmt::Display for OsiSymbol {
    /// Human label, e.g. `AAPL 2025-01-17 175 C`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.root,
            self.expiration,
            trim_strike(&self.strike),
            self.right.letter()
        )
    }
}

fn trim_strike(strike: &BigDecimal) -> String {
    let s = strike.to_string();
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Strike of an OSI symbol, or `None` when the symbol does not parse.
pub fn strike_of(symbol: &str) -> Option<BigDecimal> {
    symbol.parse::<OsiSymbol>().ok().map(|o| o.strike)
}
