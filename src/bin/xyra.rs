//! xyra: terminal client for the Xyra no-loss lottery.
//!
//! Configuration comes from `XYRA_*` environment variables (see `ClientConfig`).
//! Without `XYRA_PRIVATE_KEY` only the read commands work.

use std::sync::Arc;

use alloy::primitives::U256;
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use xyra_client::{
    features::Lottery,
    views::{
        buy_button, countdown, format_timestamp, round_panel, round_title, short_address,
        ticket_card, AdminGate, PageConfig, RoundPanel, RoundPanelInputs,
    },
    ChannelSink, ClientConfig, LotteryContext, NetworkProvider, NotificationLevel, SinkEvent,
    WalletProvider,
};

/// Terminal client for the Xyra no-loss lottery
#[derive(Parser, Debug)]
#[command(name = "xyra")]
#[command(about = "Buy tickets, claim prizes and run rounds of the Xyra lottery")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the current round and your position
    Status,
    /// List your tickets
    Tickets,
    /// Buy a ticket, approving the stablecoin first when needed
    Buy {
        /// Amount in token base units (defaults to the ticket price)
        #[arg(long)]
        amount: Option<u64>,
    },
    /// Approve the lottery manager to spend `amount` base units
    Approve { amount: u64 },
    /// Claim the prize of the last round
    ClaimPrize,
    /// Claim back your principal
    ClaimPrincipal,
    /// Register the wallet
    Register,
    /// Owner operations
    Admin {
        #[command(subcommand)]
        action: AdminCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Open a round lasting `seconds`
    StartRound { seconds: u64 },
    PerformStart,
    PerformClose,
    /// Harvest strategy yield
    Harvest,
    EmergencyWithdraw,
    ResetFlags,
    /// Move `amount` base units into the strategy
    Earn { amount: u64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = ClientConfig::from_env()?;
    let page = PageConfig::default().with_ticket_price(config.ticket_price);
    let provider = Arc::new(NetworkProvider::from_config(&config).await?);
    if config.private_key.is_some() {
        let address = provider.connect().await?;
        tracing::info!(%address, chain_id = provider.chain_id(), "wallet connected");
    }

    let (sink, mut events) = ChannelSink::new();
    let ctx = LotteryContext::new(config, provider.clone(), provider, Arc::new(sink));

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(event);
        }
    });

    let lottery = Lottery::new(ctx.clone());
    let result = run(args.command, &lottery, &ctx, &page).await;

    // Dropping every sender ends the printer once the queue is drained.
    drop(lottery);
    drop(ctx);
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "notification printer failed");
    }
    result
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(std::env::var("XYRA_LOG_LEVEL").unwrap_or_else(|_| "info".into()))
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_event(event: SinkEvent) {
    match event {
        SinkEvent::Show(notification) => {
            let tag = match notification.level {
                NotificationLevel::Info => "..",
                NotificationLevel::Success => "ok",
                NotificationLevel::Error => "!!",
            };
            println!("[{tag}] {}", notification.message);
        }
        SinkEvent::DismissAll => {}
    }
}

async fn run(
    command: Command,
    lottery: &Lottery,
    ctx: &LotteryContext,
    page: &PageConfig,
) -> Result<()> {
    match command {
        Command::Status => status(lottery, page).await,
        Command::Tickets => tickets(lottery, page).await,
        Command::Buy { amount } => {
            let amount = amount.map(U256::from).unwrap_or(page.ticket_price);
            lottery.tickets.buy_with_approval(amount).await?;
            Ok(())
        }
        Command::Approve { amount } => {
            lottery.approval.approve(U256::from(amount)).await?;
            Ok(())
        }
        Command::ClaimPrize => {
            lottery.claims.claim_prize().await?;
            Ok(())
        }
        Command::ClaimPrincipal => {
            lottery.claims.claim_principal().await?;
            Ok(())
        }
        Command::Register => {
            match lottery.registration.is_registered().await? {
                Some(true) => println!("Already registered."),
                _ => {
                    lottery.registration.register().await?;
                }
            }
            Ok(())
        }
        Command::Admin { action } => admin(action, lottery, ctx).await,
    }
}

async fn status(lottery: &Lottery, page: &PageConfig) -> Result<()> {
    let now = now_secs();
    let round = lottery.reads.snapshot().await;
    let user = lottery.reads.user_snapshot().await;

    let is_winner = matches!((user.address, round.winner.data), (Some(a), Some(w)) if a == w);
    println!("{} | {}", page.brand, round_title(round.round_id.data, is_winner));
    match user.address {
        Some(address) => println!("Wallet: {}", short_address(address, 6, 4)),
        None => println!("Wallet: not connected"),
    }
    if let Some(count) = round.entry_count.data {
        println!("Entries: {count}");
    }

    let panel = round_panel(RoundPanelInputs {
        connected: user.address,
        round: &round,
        expected_refund: &user.expected_refund,
        claim_prize_busy: lottery.claims.prize_binding().is_busy(),
        claim_principal_busy: lottery.claims.principal_binding().is_busy(),
        decimals: page.decimals,
    });
    println!("{}", panel.message());
    if let Some(detail) = panel.detail() {
        println!("{detail}");
    }
    match &panel {
        RoundPanel::Active { ends_at: Some(end) } => {
            println!("Round ends: {} ({})", format_timestamp(*end), countdown(*end, now));
        }
        RoundPanel::Winner { claim_enabled, .. } if *claim_enabled => {
            println!("Run `xyra claim-prize` to collect.");
        }
        RoundPanel::BetterLuck {
            refund: Some(refund),
            claim_enabled,
        } => {
            println!("Expected refund: {refund} {}", page.token_symbol);
            if *claim_enabled {
                println!("Run `xyra claim-principal` to collect.");
            }
        }
        _ => {}
    }

    let loading = round.active.is_loading;
    let button = buy_button(
        round.active.data.unwrap_or_default(),
        loading,
        lottery.tickets.binding().is_busy(),
    );
    println!("Ticket price: {} [{}]", page.ticket_price_display(), button.label);
    if let Some(notice) = button.notice {
        println!("{notice}");
    }
    if round.active.is_error {
        println!("Round state: N/A");
    }
    Ok(())
}

async fn tickets(lottery: &Lottery, page: &PageConfig) -> Result<()> {
    let now = now_secs();
    let tickets = lottery.tickets.tickets().await?;
    if tickets.is_empty() {
        println!("No tickets.");
        return Ok(());
    }
    for ticket in &tickets {
        let card = ticket_card(ticket, now);
        println!(
            "#{} {} {} | ends {} | {}",
            card.id,
            card.principal,
            page.token_symbol,
            format_timestamp(card.ends_at),
            card.remaining
        );
    }
    Ok(())
}

async fn admin(action: AdminCommand, lottery: &Lottery, ctx: &LotteryContext) -> Result<()> {
    let connected = ctx.connected_address();
    let owner = match &action {
        AdminCommand::StartRound { .. } => lottery.reads.owner.fetch().await?,
        AdminCommand::PerformStart | AdminCommand::PerformClose => None,
        _ => lottery.vault.owner().await?,
    };
    if owner.is_some() && !AdminGate::controls_visible(connected, owner) {
        tracing::warn!(?connected, ?owner, "connected wallet is not the contract owner");
    }

    match action {
        AdminCommand::StartRound { seconds } => {
            lottery.rounds.start_round(seconds).await?;
        }
        AdminCommand::PerformStart => {
            lottery.rounds.perform_start().await?;
        }
        AdminCommand::PerformClose => {
            lottery.rounds.perform_close().await?;
        }
        AdminCommand::Harvest => {
            lottery.vault.earn_and_harvest().await?;
        }
        AdminCommand::EmergencyWithdraw => {
            lottery.vault.emergency_withdraw_all().await?;
            if lottery.vault.is_withdraw_successful() {
                println!("All funds withdrawn from the strategy.");
            }
        }
        AdminCommand::ResetFlags => {
            lottery.vault.reset_flags().await?;
        }
        AdminCommand::Earn { amount } => {
            lottery.vault.earn_to_strategy(U256::from(amount)).await?;
        }
    }
    Ok(())
}

fn now_secs() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}
