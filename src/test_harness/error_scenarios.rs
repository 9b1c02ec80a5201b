//! Error scenario tests for the write flow.
//!
//! Organized by where the attempt stops:
//!
//! - Phase 1: preconditions (nothing reaches the wallet)
//! - Phase 2: wallet errors (rejected signature)
//! - Phase 3: confirmation errors (revert, receipt timeout)
//! - Phase 4: read errors and allowance polling
//!
//! Test naming convention:
//! - `test_e{N}_{error_name}` - Single error scenario
//! - `test_{compound_scenario}` - Compound scenarios

use std::time::Duration;

use alloy::primitives::{Address, U256};

use super::{Action, Expected, LotteryScenario, RoundSeed, Step, TestEnv};
use crate::{features::Lottery, FailureStage, LotteryError, PollPolicy, TxPhase};

// ============================================================================
// Phase 1: Preconditions
// ============================================================================

/// E1: Purchase with an allowance below the price
///
/// Expected: rejected locally with one notification, no approval is attempted
#[tokio::test]
async fn test_e1_insufficient_allowance() {
    let env = TestEnv::new();
    RoundSeed::active(1).allowance(U256::from(99)).apply(&env);
    let lottery = Lottery::new(env.ctx.clone());

    let err = lottery.tickets.buy_ticket(U256::from(100)).await.unwrap_err();
    assert!(err.is_precondition());
    assert_eq!(env.chain.sent_count(), 0);
    assert_eq!(
        env.sink.errors(),
        vec!["Error buying ticket: allowance 99 is below the required 100".to_string()]
    );
    assert_eq!(lottery.tickets.binding().phase(), TxPhase::Idle);
}

/// E2: Keeper start while a round is running
#[tokio::test]
async fn test_e2_perform_start_during_active_round() {
    let env = TestEnv::new();
    RoundSeed::active(2).apply(&env);
    let lottery = Lottery::new(env.ctx.clone());

    let err = lottery.rounds.perform_start().await.unwrap_err();
    assert!(matches!(
        err,
        LotteryError::RoundStateMismatch {
            expected_active: false
        }
    ));
    assert_eq!(env.chain.sent_count(), 0);
    assert_eq!(env.sink.errors(), vec!["Error: round is still active".to_string()]);
}

// ============================================================================
// Phase 2: Wallet errors
// ============================================================================

/// E3: User declines the approval in the wallet
///
/// Expected: buy_with_approval stops after the approval, the purchase is never sent
#[tokio::test]
async fn test_e3_rejected_approval_stops_purchase() {
    let env = TestEnv::new();
    RoundSeed::active(1).apply(&env);
    env.chain.reject_next_signature();
    let lottery = Lottery::new(env.ctx.clone());

    let err = lottery
        .tickets
        .buy_with_approval(U256::from(100))
        .await
        .unwrap_err();
    assert!(matches!(err, LotteryError::SignatureRejected(_)));
    assert_eq!(env.chain.sent_count(), 0);
    assert!(matches!(
        lottery.approval.binding().phase(),
        TxPhase::Failed {
            stage: FailureStage::BeforeSignature,
            ..
        }
    ));
    assert_eq!(
        env.sink.errors(),
        vec!["Error approving USDC: User rejected the request.".to_string()]
    );
    assert_eq!(lottery.tickets.binding().phase(), TxPhase::Idle);
}

/// E4: A rejected attempt does not block the next one
#[tokio::test]
async fn test_e4_retry_after_rejection() {
    let env = TestEnv::new();
    env.chain.reject_next_signature();

    LotteryScenario::new("Retry after rejection")
        .seed(RoundSeed::active(1).allowance(U256::from(1_000)))
        .step(Step::new(
            "declined",
            Action::Buy(U256::from(100)),
            Expected::Rejected,
        ))
        .step(Step::confirm("accepted", Action::Buy(U256::from(100))))
        .run(&env)
        .await
        .unwrap();

    assert_eq!(env.chain.tickets_of(env.user).len(), 1);
    assert_eq!(env.sink.errors().len(), 1);
}

// ============================================================================
// Phase 3: Confirmation errors
// ============================================================================

/// E5: Transaction mined with a failed status and no revert data
#[tokio::test]
async fn test_e5_bare_revert() {
    let env = TestEnv::new();
    RoundSeed::active(1).allowance(U256::from(100)).apply(&env);
    env.chain.revert_next_tx();
    let lottery = Lottery::new(env.ctx.clone());

    let err = lottery.tickets.buy_ticket(U256::from(100)).await.unwrap_err();
    assert!(matches!(err, LotteryError::Reverted { ref reason, .. } if reason == "execution reverted"));
    assert_eq!(env.chain.sent_count(), 1);
    assert_eq!(
        env.sink.errors(),
        vec!["Error confirming ticket purchase: execution reverted".to_string()]
    );
    // Nothing bought, nothing refreshed
    assert!(env.chain.tickets_of(env.user).is_empty());
}

/// E6: Custom errors from every contract are decoded into the notification
#[tokio::test]
async fn test_e6_custom_errors_are_decoded() {
    let env = TestEnv::new();
    env.chain.set_owner(Address::repeat_byte(0x01));
    env.chain.set_vault_owner(Address::repeat_byte(0x02));
    env.chain.set_registered(env.user, true);
    let lottery = Lottery::new(env.ctx.clone());

    let err = lottery.rounds.start_round(60).await.unwrap_err();
    assert!(err.reason().contains("LotteryManager::OwnableUnauthorizedAccount"));
    let err = lottery.vault.earn_and_harvest().await.unwrap_err();
    assert!(err.reason().contains("TokenVault::VaultUnauthorized"));
    let err = lottery.registration.register().await.unwrap_err();
    assert!(err.reason().contains("UserRegistry::AlreadyRegistered"));

    let errors = env.sink.errors();
    assert_eq!(errors.len(), 3);
    assert!(errors[0].starts_with("Transaction failed during confirmation: LotteryManager::"));
    assert!(errors[1].starts_with("Error confirming transaction: TokenVault::"));
    assert!(errors[2].starts_with("Transaction failed during confirmation: UserRegistry::"));
}

/// E7: Receipt never arrives
///
/// Expected: ReceiptTimeout after the configured wait, attempt fails after submission
#[tokio::test(start_paused = true)]
async fn test_e7_receipt_never_arrives() {
    let env = TestEnv::with_config(|c| c.with_receipt_timeout(Duration::from_secs(30)));
    RoundSeed::finished(1, Address::ZERO)
        .refund(U256::from(100))
        .apply(&env);
    env.chain.drop_receipts(true);
    let lottery = Lottery::new(env.ctx.clone());

    let started = tokio::time::Instant::now();
    let err = lottery.claims.claim_principal().await.unwrap_err();
    assert!(matches!(err, LotteryError::ReceiptTimeout { .. }));
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert!(matches!(
        lottery.claims.principal_binding().phase(),
        TxPhase::Failed {
            stage: FailureStage::AfterSubmission,
            ..
        }
    ));
    assert!(!lottery.claims.principal_binding().is_busy());
}

// ============================================================================
// Phase 4: Reads and polling
// ============================================================================

/// E8: RPC down while the purchase needs the allowance
///
/// Expected: read error returned, nothing sent, the binding records the error
#[tokio::test]
async fn test_e8_allowance_read_failure() {
    let env = TestEnv::new();
    RoundSeed::active(1).allowance(U256::from(100)).apply(&env);
    env.chain.fail_reads(true);
    let lottery = Lottery::new(env.ctx.clone());

    let err = lottery.tickets.buy_ticket(U256::from(100)).await.unwrap_err();
    assert!(matches!(err, LotteryError::Read { function, .. } if function == "allowance(address,address)"));
    assert_eq!(env.chain.sent_count(), 0);

    let snapshot = lottery.reads.snapshot().await;
    assert!(snapshot.active.is_error);
    assert!(snapshot.active.error.is_some());
}

/// E9: Approval confirmed but never becomes visible
///
/// Expected: polling stops at the attempt cap, the purchase is never sent
#[tokio::test(start_paused = true)]
async fn test_e9_allowance_never_visible() {
    let env = TestEnv::with_config(|c| {
        c.with_allowance_poll(
            PollPolicy::default()
                .with_max_attempts(3)
                .with_base_delay(Duration::from_millis(100)),
        )
    });
    RoundSeed::active(1).apply(&env);
    env.chain.never_update_allowance(true);
    let lottery = Lottery::new(env.ctx.clone());

    let err = lottery
        .tickets
        .buy_with_approval(U256::from(100))
        .await
        .unwrap_err();
    assert!(matches!(err, LotteryError::AllowanceTimeout { attempts: 3, .. }));
    // Only the approval went out
    assert_eq!(env.chain.sent_count(), 1);
    assert_eq!(lottery.tickets.binding().phase(), TxPhase::Idle);
    assert!(env
        .sink
        .errors()
        .iter()
        .any(|m| m.starts_with("Approval not visible yet: ")));
}

/// Registration rejected during onboarding leaves the wallet disconnected and a retry works
#[tokio::test]
async fn test_onboarding_retry_after_failure() {
    let env = TestEnv::disconnected();
    env.chain.reject_next_signature();
    let lottery = Lottery::new(env.ctx.clone());

    assert!(lottery.registration.onboard().await.is_err());
    assert_eq!(env.ctx.connected_address(), None);

    let result = lottery.registration.onboard().await.unwrap();
    assert!(matches!(result, crate::features::Onboarding::Registered(_)));
    assert_eq!(env.ctx.connected_address(), Some(env.user));
    assert_eq!(env.chain.sent_count(), 1);
}
