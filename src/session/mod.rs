//! The interactive session: console seam, table-spec builders and the
//! menu state machine.

pub mod console;
pub mod controller;
pub mod view;

pub use console::{Console, StdConsole};
pub use controller::{SessionController, SessionState};

use crate::advisor::AdvisoryService;
use crate::broker::provider::AccountProvider;

/// Runs a full session and releases the provider's connection resource on
/// every exit path, including the unrecoverable startup failure.
pub async fn run_with_cleanup(
    provider: &dyn AccountProvider,
    advisor: Option<&dyn AdvisoryService>,
    console: &mut dyn Console,
) -> anyhow::Result<()> {
    let result = {
        let mut controller = SessionController::new(provider, advisor, &mut *console);
        controller.run().await
    };
    console.write_line("Closing connection.");
    provider.close().await;
    result
}
