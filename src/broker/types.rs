//! Typed records for the gateway's account, snapshot and position payloads.
//!
//! Every display figure the gateway may omit is an `Option`; the session
//! layer substitutes the `N/A` placeholder in one place before rendering.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trading environment an account lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrdEnv {
    Real,
    Simulate,
}

impl fmt::Display for TrdEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrdEnv::Real => write!(f, "REAL"),
            TrdEnv::Simulate => write!(f, "SIMULATE"),
        }
    }
}

/// One listed account. Identity is the id/environment pair; the list never
/// changes after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub acc_id: u64,
    pub trd_env: TrdEnv,
}

/// Point-in-time aggregate figures for one account, fetched fresh on every
/// summary request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountSnapshot {
    #[serde(default)]
    pub total_assets: Option<Decimal>,
    #[serde(default)]
    pub cash: Option<Decimal>,
    #[serde(default)]
    pub market_val: Option<Decimal>,
    #[serde(default)]
    pub unrealized_pl: Option<Decimal>,
    #[serde(default)]
    pub realized_pl: Option<Decimal>,
}

/// One held security line item under an account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub stock_name: Option<String>,
    #[serde(default)]
    pub qty: Option<Decimal>,
    #[serde(default)]
    pub can_sell_qty: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    #[serde(default)]
    pub market_val: Option<Decimal>,
    #[serde(default)]
    pub pl_ratio: Option<Decimal>,
    #[serde(default)]
    pub pl_val: Option<Decimal>,
}
