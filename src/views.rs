//! View models derived from feature state.
//!
//! Everything here is a pure function of its arguments. Wall-clock time is always
//! passed in as unix seconds.

use alloy::primitives::{Address, U256};
use chrono::DateTime;

use crate::{contracts::Ticket, ReadState, RoundSnapshot, USDC_DECIMALS};

// ============================================================================
// Formatting
// ============================================================================

/// Format a token amount with four decimals, rounding half up.
///
/// ```
/// use alloy::primitives::U256;
/// use xyra_client::views::format_token;
///
/// assert_eq!(format_token(U256::from(150_000u64), 6), "0.1500");
/// assert_eq!(format_token(U256::from(1_234_567_890u64), 6), "1234.5679");
/// ```
pub fn format_token(amount: U256, decimals: u8) -> String {
    const SHOWN: u8 = 4;
    let ten = U256::from(10u64);

    let scaled = if decimals >= SHOWN {
        let divisor = ten.pow(U256::from(decimals - SHOWN));
        let (q, r) = amount.div_rem(divisor);
        if r * U256::from(2u64) >= divisor && !r.is_zero() {
            q + U256::from(1u64)
        } else {
            q
        }
    } else {
        amount.saturating_mul(ten.pow(U256::from(SHOWN - decimals)))
    };

    let (whole, frac) = scaled.div_rem(ten.pow(U256::from(SHOWN)));
    format!("{whole}.{:0>4}", frac.to::<u64>())
}

/// `0x123456...abcd` style shortening. `head` counts the `0x` prefix.
pub fn short_address(address: Address, head: usize, tail: usize) -> String {
    let full = address.to_string();
    if head + tail >= full.len() {
        return full;
    }
    format!("{}...{}", &full[..head], &full[full.len() - tail..])
}

/// `"{h}h {m}m {s}s"` until `end_ts`; `"0h 0m 0s"` once it has passed.
pub fn countdown(end_ts: u64, now: u64) -> String {
    if end_ts <= now {
        return "0h 0m 0s".to_string();
    }
    let diff = end_ts - now;
    format!("{}h {}m {}s", diff / 3_600, (diff / 60) % 60, diff % 60)
}

/// Human date for a unix timestamp, `"..."` when out of range.
pub fn format_timestamp(ts: u64) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "...".to_string())
}

fn as_secs(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

// ============================================================================
// Tickets
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketCard {
    pub id: U256,
    /// Formatted principal
    pub principal: String,
    pub ends_at: u64,
    pub redeemable: bool,
    /// `"Redeem Now"`, `"{d}d {h}h"` or `"{h}h {m}m {s}s"`
    pub remaining: String,
}

/// Card for one ticket. A ticket whose round ends exactly at `now` is redeemable.
pub fn ticket_card(ticket: &Ticket, now: u64) -> TicketCard {
    let ends_at = as_secs(ticket.roundEndTimestamp);
    let redeemable = ends_at <= now;

    let remaining = if redeemable {
        "Redeem Now".to_string()
    } else {
        let diff = ends_at - now;
        let days = diff / 86_400;
        if days >= 1 {
            format!("{days}d {}h", (diff / 3_600) % 24)
        } else {
            countdown(ends_at, now)
        }
    };

    TicketCard {
        id: ticket.ticketId,
        principal: format_token(ticket.principal, USDC_DECIMALS),
        ends_at,
        redeemable,
        remaining,
    }
}

// ============================================================================
// Round panel
// ============================================================================

pub const BETTER_LUCK: &str = "Better luck next time!";
pub const NO_PRINCIPAL: &str = "No principal to claim.";

/// What the round section shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundPanel {
    Loading,
    Active {
        ends_at: Option<u64>,
    },
    Winner {
        address: Address,
        claim_enabled: bool,
    },
    /// Not the winner and a principal refund is (or may be) available
    BetterLuck {
        refund: Option<String>,
        claim_enabled: bool,
    },
    /// Not the winner and nothing to refund
    NoPrincipal,
    ResultsUnavailable,
}

impl RoundPanel {
    pub fn message(&self) -> &'static str {
        match self {
            RoundPanel::Loading => "Loading round results...",
            RoundPanel::Active { .. } => "Round is Active",
            RoundPanel::Winner { .. } => "You won this round!",
            RoundPanel::BetterLuck { .. } => BETTER_LUCK,
            RoundPanel::NoPrincipal => BETTER_LUCK,
            RoundPanel::ResultsUnavailable => "Round results not yet available.",
        }
    }

    /// Second line under the message, if any.
    pub fn detail(&self) -> Option<&'static str> {
        match self {
            RoundPanel::NoPrincipal => Some(NO_PRINCIPAL),
            _ => None,
        }
    }
}

/// Inputs for `round_panel`.
#[derive(Debug, Clone, Copy)]
pub struct RoundPanelInputs<'a> {
    pub connected: Option<Address>,
    pub round: &'a RoundSnapshot,
    pub expected_refund: &'a ReadState<U256>,
    pub claim_prize_busy: bool,
    pub claim_principal_busy: bool,
    pub decimals: u8,
}

pub fn round_panel(inputs: RoundPanelInputs<'_>) -> RoundPanel {
    let round = inputs.round;

    if round.active.data == Some(true) {
        return RoundPanel::Active {
            ends_at: round.end_timestamp.data.map(as_secs),
        };
    }
    if round.active.data.is_none() && round.active.is_loading {
        return RoundPanel::Loading;
    }
    if round.winner.is_loading
        || round.prize_amount.is_loading
        || round.round_id.is_loading
        || inputs.expected_refund.is_loading
    {
        return RoundPanel::Loading;
    }

    let winner = match round.winner.data {
        Some(winner) if !winner.is_zero() => winner,
        _ => return RoundPanel::ResultsUnavailable,
    };

    if inputs.connected == Some(winner) {
        return RoundPanel::Winner {
            address: winner,
            claim_enabled: !inputs.claim_prize_busy,
        };
    }

    match inputs.expected_refund.data {
        Some(refund) if refund.is_zero() => RoundPanel::NoPrincipal,
        Some(refund) => RoundPanel::BetterLuck {
            refund: Some(format_token(refund, inputs.decimals)),
            claim_enabled: !inputs.claim_principal_busy,
        },
        None => RoundPanel::BetterLuck {
            refund: None,
            claim_enabled: false,
        },
    }
}

/// `"Round #3"`, `"Round #..."` before the id is known, with a winner suffix.
pub fn round_title(round_id: Option<U256>, is_winner: bool) -> String {
    let id = round_id.map_or_else(|| "...".to_string(), |id| id.to_string());
    let suffix = if is_winner { " Winner!" } else { "" };
    format!("Round #{id}{suffix}")
}

// ============================================================================
// Buy button
// ============================================================================

pub const FINALIZING_NOTICE: &str =
    "Lottery is currently finalizing the previous round. Please wait for the next round to start.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyButton {
    pub label: &'static str,
    pub enabled: bool,
    pub notice: Option<&'static str>,
}

pub fn buy_button(round_active: bool, loading: bool, pending: bool) -> BuyButton {
    let finalizing = !round_active && !loading;
    let label = if pending {
        "Buying..."
    } else if finalizing {
        "Finalizing previous round!"
    } else {
        "Buy"
    };

    BuyButton {
        label,
        enabled: round_active && !loading && !pending,
        notice: finalizing.then_some(FINALIZING_NOTICE),
    }
}

// ============================================================================
// Admin gating
// ============================================================================

/// Decides whether to show admin controls.
///
/// This only hides buttons. The contracts enforce ownership themselves, and anyone can
/// send the transactions directly.
#[derive(Debug, Clone, Copy)]
pub struct AdminGate;

impl AdminGate {
    pub fn controls_visible(connected: Option<Address>, owner: Option<Address>) -> bool {
        matches!((connected, owner), (Some(c), Some(o)) if c == o)
    }
}

// ============================================================================
// Page configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// One parameterized page in place of per-variant copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    pub brand: String,
    pub token_symbol: String,
    pub decimals: u8,
    pub ticket_price: U256,
    pub theme: Theme,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            brand: "Xyra".to_string(),
            token_symbol: "USDC".to_string(),
            decimals: USDC_DECIMALS,
            ticket_price: U256::from(100u64),
            theme: Theme::Dark,
        }
    }
}

impl PageConfig {
    pub fn with_ticket_price(mut self, price: U256) -> Self {
        self.ticket_price = price;
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// `"0.1500 USDC"`
    pub fn amount(&self, amount: U256) -> String {
        format!("{} {}", format_token(amount, self.decimals), self.token_symbol)
    }

    pub fn ticket_price_display(&self) -> String {
        self.amount(self.ticket_price)
    }
}
