//! Assembles the context document sent alongside the user's question.

/// Literal standing in for the positions table when the account holds
/// nothing.
pub const NO_POSITIONS_MARKER: &str = "No positions.";

/// Builds the advisory context from the tables exactly as they were shown
/// to the user. `positions_table` is `None` when the position list was
/// empty.
pub fn build_context(summary_table: &str, positions_table: Option<&str>) -> String {
    let positions = positions_table.unwrap_or(NO_POSITIONS_MARKER);
    format!(
        "You are a professional financial assistant. Based on the following \
         real-time account information, please answer the user's question.\n\
         \n\
         ### Account Summary\n\
         {summary_table}\n\
         \n\
         ### Current Positions\n\
         {positions}\n"
    )
}
