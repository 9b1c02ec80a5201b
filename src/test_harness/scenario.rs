//! Lottery flow scenario framework.
//!
//! `LotteryScenario` seeds the fake chain, runs a list of feature actions in order and
//! checks each one against its expected result.

use std::fmt;

use alloy::primitives::{Address, U256};
use anyhow::{anyhow, Result};

use super::TestEnv;
use crate::{features::Lottery, LotteryError, LotteryResult, TxOutcome};

// ============================================================================
// Action
// ============================================================================

/// A user or operator action taken during the scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Approve(U256),
    Buy(U256),
    BuyWithApproval(U256),
    ClaimPrize,
    ClaimPrincipal,
    StartRound(u64),
    PerformClose,
    Register,
}

impl Action {
    async fn run(&self, lottery: &Lottery) -> LotteryResult<TxOutcome> {
        match self {
            Action::Approve(amount) => lottery.approval.approve(*amount).await,
            Action::Buy(amount) => lottery.tickets.buy_ticket(*amount).await,
            Action::BuyWithApproval(amount) => lottery.tickets.buy_with_approval(*amount).await,
            Action::ClaimPrize => lottery.claims.claim_prize().await,
            Action::ClaimPrincipal => lottery.claims.claim_principal().await,
            Action::StartRound(secs) => lottery.rounds.start_round(*secs).await,
            Action::PerformClose => lottery.rounds.perform_close().await,
            Action::Register => lottery.registration.register().await,
        }
    }
}

// ============================================================================
// Expected
// ============================================================================

/// Expected result of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    /// Mined with success status
    Confirmed,
    /// Stopped before anything was sent
    Precondition,
    /// Mined and reverted with a reason containing the text
    Reverted(&'static str),
    /// Declined in the wallet
    Rejected,
}

impl Expected {
    fn matches(&self, result: &LotteryResult<TxOutcome>) -> bool {
        match (self, result) {
            (Expected::Confirmed, Ok(outcome)) => outcome.success,
            (Expected::Precondition, Err(e)) => e.is_precondition(),
            (Expected::Reverted(text), Err(LotteryError::Reverted { reason, .. })) => {
                reason.contains(text)
            }
            (Expected::Rejected, Err(LotteryError::SignatureRejected(_))) => true,
            _ => false,
        }
    }
}

/// One step of a scenario.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    pub action: Action,
    pub expected: Expected,
}

impl Step {
    pub fn new(name: impl Into<String>, action: Action, expected: Expected) -> Self {
        Self {
            name: name.into(),
            action,
            expected,
        }
    }

    pub fn confirm(name: impl Into<String>, action: Action) -> Self {
        Self::new(name, action, Expected::Confirmed)
    }
}

// ============================================================================
// RoundSeed
// ============================================================================

/// On-chain round state written before the first step.
#[derive(Debug, Clone, Default)]
pub struct RoundSeed {
    pub active: bool,
    pub round_id: u64,
    pub end_timestamp: u64,
    pub winner: Option<Address>,
    /// Expected refund of the test user
    pub refund: U256,
    /// Allowance of the test user
    pub allowance: U256,
}

impl RoundSeed {
    pub fn active(round_id: u64) -> Self {
        Self {
            active: true,
            round_id,
            ..Default::default()
        }
    }

    pub fn finished(round_id: u64, winner: Address) -> Self {
        Self {
            active: false,
            round_id,
            winner: Some(winner),
            ..Default::default()
        }
    }

    pub fn refund(mut self, refund: U256) -> Self {
        self.refund = refund;
        self
    }

    pub fn allowance(mut self, allowance: U256) -> Self {
        self.allowance = allowance;
        self
    }

    pub fn apply(&self, env: &TestEnv) {
        env.chain.set_round_active(self.active);
        env.chain.set_round_id(U256::from(self.round_id));
        env.chain.set_round_end(U256::from(self.end_timestamp));
        if let Some(winner) = self.winner {
            env.chain.set_winner(winner);
        }
        env.chain.set_expected_refund(env.user, self.refund);
        env.chain.set_allowance(env.user, self.allowance);
    }
}

// ============================================================================
// LotteryScenario
// ============================================================================

/// A configurable lottery flow.
///
/// # Example
///
/// ```ignore
/// LotteryScenario::new("Buy after approval")
///     .seed(RoundSeed::active(1))
///     .step(Step::confirm("approve", Action::Approve(U256::from(100))))
///     .step(Step::confirm("buy", Action::Buy(U256::from(100))))
///     .run(&env)
///     .await
///     .unwrap();
/// ```
pub struct LotteryScenario {
    name: String,
    description: Option<String>,
    seed: Option<RoundSeed>,
    steps: Vec<Step>,
}

impl LotteryScenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            seed: None,
            steps: Vec::new(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn seed(mut self, seed: RoundSeed) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Run every step and fail on the first mismatch.
    pub async fn run(self, env: &TestEnv) -> Result<ScenarioResult> {
        println!("\n{}", "=".repeat(60));
        println!("Scenario: {}", self.name);
        if let Some(desc) = &self.description {
            println!("Description: {}", desc);
        }
        println!("{}\n", "=".repeat(60));

        if let Some(seed) = &self.seed {
            seed.apply(env);
        }
        let lottery = Lottery::new(env.ctx.clone());

        let mut results = Vec::with_capacity(self.steps.len());
        for (i, step) in self.steps.into_iter().enumerate() {
            let sent_before = env.chain.sent_count();
            let result = step.action.run(&lottery).await;
            let sent = env.chain.sent_count() - sent_before;
            let passed = step.expected.matches(&result);

            println!(
                "  [{}] '{}' {:?} -> {} (sent {})",
                i,
                step.name,
                step.action,
                describe(&result),
                sent
            );

            results.push(StepResult {
                name: step.name,
                expected: step.expected,
                outcome: describe(&result),
                sent,
                passed,
            });
        }

        let result = ScenarioResult { steps: results };
        println!("\n{}", result);
        if !result.all_passed() {
            return Err(anyhow!("scenario '{}' failed:\n{}", self.name, result));
        }
        Ok(result)
    }
}

fn describe(result: &LotteryResult<TxOutcome>) -> String {
    match result {
        Ok(outcome) => format!("confirmed in block {:?}", outcome.block_number),
        Err(e) => format!("error: {e}"),
    }
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone)]
pub struct StepResult {
    pub name: String,
    pub expected: Expected,
    pub outcome: String,
    /// Transactions that left the wallet during this step
    pub sent: usize,
    pub passed: bool,
}

#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub steps: Vec<StepResult>,
}

impl ScenarioResult {
    pub fn all_passed(&self) -> bool {
        self.steps.iter().all(|s| s.passed)
    }

    pub fn step(&self, name: &str) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.name == name)
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            let mark = if step.passed { "PASS" } else { "FAIL" };
            writeln!(
                f,
                "  {} '{}': expected {:?}, got {}",
                mark, step.name, step.expected, step.outcome
            )?;
        }
        Ok(())
    }
}
