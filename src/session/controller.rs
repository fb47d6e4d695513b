//! The interactive session state machine.
//!
//! One state is active at a time and transitions are the only mutation.
//! Each step reads a single input line; every provider failure after
//! startup is reported on one line and the loop continues.

use futures::StreamExt;
use tracing::{info, warn};

use crate::advisor::{build_context, AdvisoryService};
use crate::broker::provider::AccountProvider;
use crate::broker::types::{Account, TrdEnv};
use crate::table;

use super::console::Console;
use super::view;

/// Where the session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AccountListing,
    AccountMenu { acc_id: u64, trd_env: TrdEnv },
    Exit,
}

pub struct SessionController<'a> {
    provider: &'a dyn AccountProvider,
    advisor: Option<&'a dyn AdvisoryService>,
    console: &'a mut dyn Console,
    accounts: Vec<Account>,
    state: SessionState,
    disabled_notice_shown: bool,
}

impl<'a> SessionController<'a> {
    pub fn new(
        provider: &'a dyn AccountProvider,
        advisor: Option<&'a dyn AdvisoryService>,
        console: &'a mut dyn Console,
    ) -> Self {
        Self {
            provider,
            advisor,
            console,
            accounts: Vec::new(),
            state: SessionState::AccountListing,
            disabled_notice_shown: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Fetches the account list once, then drives the menu loop until exit.
    /// A failed fetch or an empty list is the one unrecoverable condition.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.console.write_line("\nFetching account list...");
        let accounts = match self.provider.list_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                self.console
                    .write_line(&format!("Error fetching account list: {e}"));
                return Err(e.into());
            }
        };
        if accounts.is_empty() {
            self.console.write_line("No accounts found.");
            return Ok(());
        }
        self.console
            .write_line(&format!("Found {} accounts.\n", accounts.len()));
        info!(count = accounts.len(), "Account list fetched");
        self.accounts = accounts;

        loop {
            match self.state {
                SessionState::AccountListing => self.listing_step().await?,
                SessionState::AccountMenu { acc_id, trd_env } => {
                    self.menu_step(acc_id, trd_env).await?
                }
                SessionState::Exit => return Ok(()),
            }
        }
    }

    /// One step of the account-listing state: show the numbered list, read
    /// a choice, transition or report one error line.
    async fn listing_step(&mut self) -> anyhow::Result<()> {
        self.console
            .write_line("Please select an account to view details:");
        for (idx, account) in self.accounts.iter().enumerate() {
            self.console.write_line(&format!(
                "  {}: Account ID {} ({})",
                idx + 1,
                account.acc_id,
                account.trd_env
            ));
        }
        self.console.write_line("  0: Exit");

        let Some(input) = self.console.read_line("Enter your choice: ")? else {
            // End of input ends the session.
            self.state = SessionState::Exit;
            return Ok(());
        };
        let choice: i64 = match input.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                self.console
                    .write_line("Invalid input. Please enter a number.\n");
                return Ok(());
            }
        };
        if choice == 0 {
            self.state = SessionState::Exit;
            return Ok(());
        }
        if choice < 1 || choice as usize > self.accounts.len() {
            self.console
                .write_line("Invalid choice, please try again.\n");
            return Ok(());
        }

        let account = self.accounts[(choice - 1) as usize];
        info!(acc_id = account.acc_id, env = %account.trd_env, "Account selected");
        self.console.write_line(&format!(
            "\n--- Processing Account ID: {} (Env: {}) ---",
            account.acc_id, account.trd_env
        ));
        self.state = SessionState::AccountMenu {
            acc_id: account.acc_id,
            trd_env: account.trd_env,
        };
        // The summary is always shown once on arrival at the menu.
        self.show_account_detail(account.acc_id, account.trd_env).await;

        if self.advisor.is_none() && !self.disabled_notice_shown {
            self.console.write_line(
                "\n[AI Assistant is disabled. Set ADVISOR_API_KEY and ADVISOR_BASE_URL to enable it.]",
            );
            self.disabled_notice_shown = true;
        }
        Ok(())
    }

    /// One step of the account-menu state.
    async fn menu_step(&mut self, acc_id: u64, trd_env: TrdEnv) -> anyhow::Result<()> {
        self.console
            .write_line(&format!("\n--- Account Menu for {} ---", acc_id));
        self.console
            .write_line("1: View Account Summary & Positions");
        if self.advisor.is_some() {
            self.console.write_line("2: Ask AI Assistant");
        }
        self.console.write_line("0: Go back to account list");

        let Some(input) = self.console.read_line("Select an action: ")? else {
            self.state = SessionState::Exit;
            return Ok(());
        };
        match input.trim() {
            "1" => self.show_account_detail(acc_id, trd_env).await,
            "2" => {
                // Without credentials the option is not listed, and the
                // input is treated like any other unrecognized choice.
                if let Some(advisor) = self.advisor {
                    self.advisory_step(advisor, acc_id, trd_env).await?;
                } else {
                    self.console.write_line("Invalid choice, please try again.");
                }
            }
            "0" => self.state = SessionState::AccountListing,
            _ => self.console.write_line("Invalid choice, please try again."),
        }
        Ok(())
    }

    /// Fetches and renders the snapshot and the position list. The two
    /// queries are independent; each failure is reported on its own line
    /// and neither aborts the menu loop.
    async fn show_account_detail(&mut self, acc_id: u64, trd_env: TrdEnv) {
        match self.provider.account_info(trd_env, acc_id).await {
            Ok(Some(snapshot)) => {
                self.console.write_line("  Account Summary:");
                self.console
                    .write(&table::render(&view::summary_spec(&snapshot)));
            }
            Ok(None) => {
                self.console.write_line(&format!(
                    "  No account information found for account {}.",
                    acc_id
                ));
            }
            Err(e) => {
                warn!(acc_id, "Snapshot fetch failed: {}", e);
                self.console.write_line(&format!(
                    "  Error fetching account info for {}: {}",
                    acc_id, e
                ));
            }
        }

        match self.provider.position_list(trd_env, acc_id).await {
            Ok(positions) if positions.is_empty() => {
                self.console
                    .write_line(&format!("  No positions found for account {}.", acc_id));
            }
            Ok(positions) => {
                self.console.write_line("\n  Positions:");
                self.console
                    .write(&table::render(&view::positions_spec(&positions)));
            }
            Err(e) => {
                warn!(acc_id, "Position fetch failed: {}", e);
                self.console.write_line(&format!(
                    "  Error fetching positions for account {}: {}",
                    acc_id, e
                ));
            }
        }
        self.console
            .write_line("----------------------------------------------------------\n");
    }

    /// The advisory flow: refetch both queries, prompt for a question,
    /// stream the reply. Any failure is displayed and control returns to
    /// the menu with the state unchanged.
    async fn advisory_step(
        &mut self,
        advisor: &dyn AdvisoryService,
        acc_id: u64,
        trd_env: TrdEnv,
    ) -> anyhow::Result<()> {
        // The advisory context must reflect this turn's data, so both
        // queries are issued fresh and both must succeed.
        let snapshot = self.provider.account_info(trd_env, acc_id).await;
        let positions = self.provider.position_list(trd_env, acc_id).await;
        let (snapshot, positions) = match (snapshot, positions) {
            (Ok(snapshot), Ok(positions)) => (snapshot.unwrap_or_default(), positions),
            (snapshot, positions) => {
                self.console
                    .write_line("Could not fetch latest account data to provide to AI.");
                if let Err(e) = snapshot {
                    self.console
                        .write_line(&format!("  Error fetching account info: {}", e));
                }
                if let Err(e) = positions {
                    self.console
                        .write_line(&format!("  Error fetching positions: {}", e));
                }
                return Ok(());
            }
        };

        self.console
            .write_line("\nAsk a question about your account to the AI assistant.");
        self.console
            .write_line("Type 'quit' or 'q' to return to the previous menu.");
        let Some(question) = self.console.read_line("Your question: ")? else {
            return Ok(());
        };
        let question = question.trim().to_string();
        if question.eq_ignore_ascii_case("quit") || question.eq_ignore_ascii_case("q") {
            return Ok(());
        }

        let summary_table = table::render(&view::summary_spec(&snapshot));
        let positions_table = if positions.is_empty() {
            None
        } else {
            Some(table::render(&view::positions_spec(&positions)))
        };
        let context = build_context(&summary_table, positions_table.as_deref());

        self.console.write_line("\n🤖 Thinking...");
        match advisor.stream_reply(&context, &question).await {
            Ok(mut stream) => {
                self.console.write_line("✅ AI Response:");
                while let Some(fragment) = stream.next().await {
                    match fragment {
                        Ok(text) => self.console.write(&text),
                        Err(e) => {
                            self.console.write_line(&format!(
                                "\nAn error occurred while communicating with the AI service: {}",
                                e
                            ));
                            return Ok(());
                        }
                    }
                }
                self.console.write_line("\n");
            }
            Err(e) => {
                self.console.write_line(&format!(
                    "\nAn error occurred while communicating with the AI service: {}",
                    e
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use crate::advisor::ReplyStream;
    use crate::broker::types::{AccountSnapshot, Position};
    use crate::errors::{AdvisorError, GatewayError};
    use crate::session::console::ScriptedConsole;
    use crate::session::run_with_cleanup;

    fn api_error() -> GatewayError {
        GatewayError::Api {
            status: 500,
            message: "gateway unavailable".to_string(),
        }
    }

    #[derive(Default)]
    struct StubProvider {
        accounts: Vec<Account>,
        fail_accounts: bool,
        snapshot: Option<AccountSnapshot>,
        fail_snapshot: bool,
        positions: Vec<Position>,
        fail_positions: bool,
        close_calls: AtomicUsize,
    }

    impl StubProvider {
        fn with_account() -> Self {
            Self {
                accounts: vec![Account {
                    acc_id: 1001,
                    trd_env: TrdEnv::Real,
                }],
                snapshot: Some(AccountSnapshot {
                    total_assets: Some(dec!(100000)),
                    cash: Some(dec!(5000)),
                    market_val: Some(dec!(95000)),
                    unrealized_pl: Some(dec!(0)),
                    realized_pl: Some(dec!(0)),
                }),
                ..Default::default()
            }
        }

        fn with_position(mut self) -> Self {
            self.positions = vec![Position {
                code: Some("HK.00700".to_string()),
                stock_name: Some("Tencent".to_string()),
                qty: Some(dec!(100)),
                can_sell_qty: Some(dec!(100)),
                price: Some(dec!(316.2)),
                cost_price: Some(dec!(300)),
                market_val: Some(dec!(31620)),
                pl_ratio: Some(dec!(0.054)),
                pl_val: Some(dec!(1620)),
            }];
            self
        }
    }

    #[async_trait]
    impl AccountProvider for StubProvider {
        async fn list_accounts(&self) -> Result<Vec<Account>, GatewayError> {
            if self.fail_accounts {
                return Err(api_error());
            }
            Ok(self.accounts.clone())
        }

        async fn account_info(
            &self,
            _trd_env: TrdEnv,
            _acc_id: u64,
        ) -> Result<Option<AccountSnapshot>, GatewayError> {
            if self.fail_snapshot {
                return Err(api_error());
            }
            Ok(self.snapshot.clone())
        }

        async fn position_list(
            &self,
            _trd_env: TrdEnv,
            _acc_id: u64,
        ) -> Result<Vec<Position>, GatewayError> {
            if self.fail_positions {
                return Err(api_error());
            }
            Ok(self.positions.clone())
        }

        async fn close(&self) {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct StubAdvisor {
        calls: AtomicUsize,
        last_context: std::sync::Mutex<String>,
    }

    #[async_trait]
    impl AdvisoryService for StubAdvisor {
        async fn stream_reply(
            &self,
            context: &str,
            _question: &str,
        ) -> Result<ReplyStream, AdvisorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_context.lock().unwrap() = context.to_string();
            let fragments: Vec<Result<String, AdvisorError>> = vec![
                Ok("Your cash ".to_string()),
                Ok("is 5000.".to_string()),
            ];
            Ok(Box::pin(futures::stream::iter(fragments)))
        }
    }

    struct FailingAdvisor;

    #[async_trait]
    impl AdvisoryService for FailingAdvisor {
        async fn stream_reply(
            &self,
            _context: &str,
            _question: &str,
        ) -> Result<ReplyStream, AdvisorError> {
            Err(AdvisorError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            })
        }
    }

    async fn run(
        provider: &StubProvider,
        advisor: Option<&dyn AdvisoryService>,
        inputs: &[&str],
    ) -> (anyhow::Result<()>, ScriptedConsole) {
        let mut console = ScriptedConsole::with_inputs(inputs);
        let result = {
            let mut controller = SessionController::new(provider, advisor, &mut console);
            controller.run().await
        };
        (result, console)
    }

    #[tokio::test]
    async fn test_zero_exits_from_listing_with_single_account() {
        let provider = StubProvider::with_account();
        let mut console = ScriptedConsole::with_inputs(&["0"]);
        {
            let mut controller = SessionController::new(&provider, None, &mut console);
            assert_eq!(controller.state(), SessionState::AccountListing);
            controller.run().await.unwrap();
            assert_eq!(controller.state(), SessionState::Exit);
        }
        assert!(console.output.contains("1: Account ID 1001 (REAL)"));
        assert_eq!(console.count_lines_containing("Invalid"), 0);
    }

    #[tokio::test]
    async fn test_selection_transitions_to_account_menu() {
        let provider = StubProvider::with_account();
        let mut console = ScriptedConsole::with_inputs(&["1"]);
        let mut controller = SessionController::new(&provider, None, &mut console);
        controller.accounts = provider.accounts.clone();
        controller.listing_step().await.unwrap();
        assert_eq!(
            controller.state(),
            SessionState::AccountMenu {
                acc_id: 1001,
                trd_env: TrdEnv::Real
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_input_leaves_state_unchanged() {
        let provider = StubProvider::with_account();
        let mut console = ScriptedConsole::with_inputs(&["7"]);
        let mut controller = SessionController::new(&provider, None, &mut console);
        controller.accounts = provider.accounts.clone();
        controller.listing_step().await.unwrap();
        assert_eq!(controller.state(), SessionState::AccountListing);
    }

    #[tokio::test]
    async fn test_out_of_range_choice_reports_exactly_one_error_line() {
        let provider = StubProvider::with_account();
        let (result, console) = run(&provider, None, &["5", "0"]).await;
        assert!(result.is_ok());
        assert_eq!(
            console.count_lines_containing("Invalid choice, please try again."),
            1
        );
    }

    #[tokio::test]
    async fn test_negative_choice_reports_exactly_one_error_line() {
        let provider = StubProvider::with_account();
        let (result, console) = run(&provider, None, &["-1", "0"]).await;
        assert!(result.is_ok());
        assert_eq!(
            console.count_lines_containing("Invalid choice, please try again."),
            1
        );
    }

    #[tokio::test]
    async fn test_non_numeric_input_reports_exactly_one_error_line() {
        let provider = StubProvider::with_account();
        let (result, console) = run(&provider, None, &["abc", "0"]).await;
        assert!(result.is_ok());
        assert_eq!(
            console.count_lines_containing("Invalid input. Please enter a number."),
            1
        );
    }

    #[tokio::test]
    async fn test_selecting_account_renders_summary_immediately() {
        let provider = StubProvider::with_account().with_position();
        let (result, console) = run(&provider, None, &["1", "0", "0"]).await;
        assert!(result.is_ok());
        assert!(console
            .output
            .contains("--- Processing Account ID: 1001 (Env: REAL) ---"));
        assert!(console.output.contains("Account Summary:"));
        assert!(console.output.contains("total_assets"));
        assert!(console.output.contains("100000"));
        assert!(console.output.contains("Positions:"));
        assert!(console.output.contains("HK.00700"));
        // Entry render happens before any menu action is chosen.
        let summary_at = console.output.find("Account Summary:").unwrap();
        let menu_at = console.output.find("--- Account Menu for 1001 ---").unwrap();
        assert!(summary_at < menu_at);
    }

    #[tokio::test]
    async fn test_menu_option_one_renders_again() {
        let provider = StubProvider::with_account().with_position();
        let (result, console) = run(&provider, None, &["1", "1", "0", "0"]).await;
        assert!(result.is_ok());
        assert_eq!(console.count_lines_containing("Account Summary:"), 2);
    }

    #[tokio::test]
    async fn test_empty_positions_show_explicit_marker() {
        let provider = StubProvider::with_account();
        let (result, console) = run(&provider, None, &["1", "0", "0"]).await;
        assert!(result.is_ok());
        assert!(console.output.contains("Account Summary:"));
        assert!(console
            .output
            .contains("No positions found for account 1001."));
    }

    #[tokio::test]
    async fn test_snapshot_error_does_not_abort_menu_loop() {
        let mut provider = StubProvider::with_account().with_position();
        provider.fail_snapshot = true;
        let (result, console) = run(&provider, None, &["1", "1", "0", "0"]).await;
        assert!(result.is_ok());
        // Entry render plus one explicit re-render, each reporting the
        // snapshot failure while positions still display.
        assert_eq!(
            console.count_lines_containing("Error fetching account info for 1001:"),
            2
        );
        assert_eq!(console.count_lines_containing("Positions:"), 2);
    }

    #[tokio::test]
    async fn test_disabled_advisory_hides_option_and_rejects_input() {
        let provider = StubProvider::with_account();
        let (result, console) = run(&provider, None, &["1", "2", "0", "0"]).await;
        assert!(result.is_ok());
        assert!(!console.output.contains("2: Ask AI Assistant"));
        assert!(console.output.contains("[AI Assistant is disabled."));
        assert_eq!(
            console.count_lines_containing("Invalid choice, please try again."),
            1
        );
    }

    #[tokio::test]
    async fn test_quit_at_question_prompt_makes_no_advisory_call() {
        let provider = StubProvider::with_account();
        let advisor = StubAdvisor::default();
        let (result, console) = run(&provider, Some(&advisor), &["1", "2", "q", "0", "0"]).await;
        assert!(result.is_ok());
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 0);
        assert!(console.output.contains("Your question: "));
        assert!(!console.output.contains("AI Response"));
    }

    #[tokio::test]
    async fn test_advisory_reply_printed_incrementally() {
        let provider = StubProvider::with_account().with_position();
        let advisor = StubAdvisor::default();
        let (result, console) = run(
            &provider,
            Some(&advisor),
            &["1", "2", "How much cash do I have?", "0", "0"],
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 1);
        assert!(console.output.contains("2: Ask AI Assistant"));
        assert!(console.output.contains("✅ AI Response:"));
        assert!(console.output.contains("Your cash is 5000."));
        // The context document carries the same rendered tables the user saw.
        let context = advisor.last_context.lock().unwrap().clone();
        assert!(context.contains("### Account Summary"));
        assert!(context.contains("total_assets"));
        assert!(context.contains("### Current Positions"));
        assert!(context.contains("HK.00700"));
    }

    #[tokio::test]
    async fn test_advisory_context_marks_empty_positions() {
        let provider = StubProvider::with_account();
        let advisor = StubAdvisor::default();
        let (result, _console) =
            run(&provider, Some(&advisor), &["1", "2", "Anything held?", "0", "0"]).await;
        assert!(result.is_ok());
        let context = advisor.last_context.lock().unwrap().clone();
        assert!(context.contains("No positions."));
    }

    #[tokio::test]
    async fn test_position_error_reported_alongside_summary() {
        let mut provider = StubProvider::with_account();
        provider.fail_positions = true;
        let (result, console) = run(&provider, None, &["1", "0", "0"]).await;
        assert!(result.is_ok());
        assert!(console.output.contains("Account Summary:"));
        assert_eq!(
            console.count_lines_containing("Error fetching positions for account 1001:"),
            1
        );
    }

    #[tokio::test]
    async fn test_advisory_service_error_returns_to_menu() {
        let provider = StubProvider::with_account();
        let advisor = FailingAdvisor;
        let (result, console) =
            run(&provider, Some(&advisor), &["1", "2", "Should I sell?", "0", "0"]).await;
        assert!(result.is_ok());
        assert_eq!(
            console.count_lines_containing(
                "An error occurred while communicating with the AI service:"
            ),
            1
        );
        // The menu is shown again after the failure.
        assert!(console.count_lines_containing("--- Account Menu for 1001 ---") >= 2);
    }

    #[tokio::test]
    async fn test_advisory_refetch_failure_blocks_question_prompt() {
        let mut provider = StubProvider::with_account();
        let advisor = StubAdvisor::default();
        provider.fail_snapshot = true;
        let (result, console) = run(&provider, Some(&advisor), &["1", "2", "0", "0"]).await;
        assert!(result.is_ok());
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 0);
        assert!(console
            .output
            .contains("Could not fetch latest account data to provide to AI."));
        assert!(!console.output.contains("Your question: "));
    }

    #[tokio::test]
    async fn test_startup_fetch_failure_is_fatal() {
        let provider = StubProvider {
            fail_accounts: true,
            ..Default::default()
        };
        let (result, console) = run(&provider, None, &[]).await;
        assert!(result.is_err());
        assert_eq!(
            console.count_lines_containing("Error fetching account list:"),
            1
        );
    }

    #[tokio::test]
    async fn test_empty_account_list_terminates_with_message() {
        let provider = StubProvider::default();
        let (result, console) = run(&provider, None, &["should never be read"]).await;
        assert!(result.is_ok());
        assert!(console.output.contains("No accounts found."));
        assert!(!console.output.contains("Enter your choice"));
    }

    #[tokio::test]
    async fn test_cleanup_closes_provider_once_on_normal_exit() {
        let provider = StubProvider::with_account();
        let mut console = ScriptedConsole::with_inputs(&["0"]);
        run_with_cleanup(&provider, None, &mut console).await.unwrap();
        assert_eq!(provider.close_calls.load(Ordering::SeqCst), 1);
        assert!(console.output.contains("Closing connection."));
    }

    #[tokio::test]
    async fn test_cleanup_closes_provider_once_on_startup_failure() {
        let provider = StubProvider {
            fail_accounts: true,
            ..Default::default()
        };
        let mut console = ScriptedConsole::with_inputs(&[]);
        let result = run_with_cleanup(&provider, None, &mut console).await;
        assert!(result.is_err());
        assert_eq!(provider.close_calls.load(Ordering::SeqCst), 1);
        assert!(console.output.contains("Closing connection."));
    }
}
