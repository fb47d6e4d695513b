//! The provider seam between the session controller and the gateway.

use async_trait::async_trait;

use crate::errors::GatewayError;

use super::types::{Account, AccountSnapshot, Position, TrdEnv};

/// Supplies the account list, per-account snapshots and position lists.
///
/// Each query stands on its own: a failure is scoped to that one call and
/// the caller decides whether it is fatal. `close` releases the underlying
/// connection resource and must be safe to call more than once.
#[async_trait]
pub trait AccountProvider {
    async fn list_accounts(&self) -> Result<Vec<Account>, GatewayError>;

    /// Fetches the aggregate snapshot for one account. `Ok(None)` means the
    /// gateway answered but had no figures for the account.
    async fn account_info(
        &self,
        trd_env: TrdEnv,
        acc_id: u64,
    ) -> Result<Option<AccountSnapshot>, GatewayError>;

    /// Fetches the position list for one account. An empty list is a valid
    /// result, distinct from a failed fetch.
    async fn position_list(
        &self,
        trd_env: TrdEnv,
        acc_id: u64,
    ) -> Result<Vec<Position>, GatewayError>;

    /// Releases the gateway session. Idempotent; failures are logged, not
    /// surfaced, so shutdown proceeds on every exit path.
    async fn close(&self);
}
