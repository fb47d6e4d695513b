//! Builders that normalize gateway records into renderable table specs.
//!
//! This is the single place where an absent figure becomes the `N/A`
//! placeholder; every spec leaving here carries a cell for every declared
//! column, so the renderer has no missing-value handling.

use rust_decimal::Decimal;

use crate::broker::types::{AccountSnapshot, Position};
use crate::table::{Column, TableSpec, NA};

fn cell(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| NA.to_string())
}

fn text_cell(value: Option<&str>) -> String {
    value.unwrap_or(NA).to_string()
}

/// Account summary table: the five aggregate figures, all numeric.
pub fn summary_spec(snapshot: &AccountSnapshot) -> TableSpec {
    let mut spec = TableSpec::new(vec![
        Column::numeric("total_assets"),
        Column::numeric("cash"),
        Column::numeric("market_val"),
        Column::numeric("unrealized_pl"),
        Column::numeric("realized_pl"),
    ]);
    spec.push_row(vec![
        cell(snapshot.total_assets),
        cell(snapshot.cash),
        cell(snapshot.market_val),
        cell(snapshot.unrealized_pl),
        cell(snapshot.realized_pl),
    ]);
    spec
}

/// Positions table: code and name as text, every other column numeric.
pub fn positions_spec(positions: &[Position]) -> TableSpec {
    let mut spec = TableSpec::new(vec![
        Column::text("code"),
        Column::text("stock_name"),
        Column::numeric("qty"),
        Column::numeric("can_sell_qty"),
        Column::numeric("price"),
        Column::numeric("cost_price"),
        Column::numeric("market_val"),
        Column::numeric("pl_ratio"),
        Column::numeric("pl_val"),
    ]);
    for position in positions {
        spec.push_row(vec![
            text_cell(position.code.as_deref()),
            text_cell(position.stock_name.as_deref()),
            cell(position.qty),
            cell(position.can_sell_qty),
            cell(position.price),
            cell(position.cost_price),
            cell(position.market_val),
            cell(position.pl_ratio),
            cell(position.pl_val),
        ]);
    }
    spec
}
