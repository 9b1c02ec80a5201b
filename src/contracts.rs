//! ABI bindings for the lottery contracts.
//!
//! These must match the deployed contracts exactly; a mismatch shows up as a decode
//! failure on the read or write binding and is not recoverable here.

use alloy::sol;

sol! {
    /// Round lifecycle, ticket accounting and prize claims.
    #[sol(all_derives)]
    interface LotteryManager {
        struct Ticket {
            uint256 ticketId;
            uint256 roundEndTimestamp;
            uint256 principal;
            address owner;
        }

        error RoundNotActive();
        error RoundStillActive();
        error InvalidTicketAmount(uint256 amount);
        error NotRoundWinner(address caller);
        error PrizeAlreadyClaimed();
        error NothingToClaim();
        error OwnableUnauthorizedAccount(address account);

        function roundActive() external view returns (bool);
        function roundId() external view returns (uint256);
        function roundEndTimestamp() external view returns (uint256);
        function entryCount() external view returns (uint256);
        function winner() external view returns (address);
        function prizeAmountRedeemed() external view returns (uint256);
        function prizeClaimed() external view returns (bool);
        function expectedRefund(address user) external view returns (uint256);
        function getUserTickets(address user) external view returns (Ticket[] memory);
        function getTicketById(uint256 ticketId) external view returns (Ticket memory);
        function owner() external view returns (address);

        function buyTicket(uint256 amount) external;
        function claimPrize() external;
        function claimPrincipal() external;
        function startRound(uint256 durationSeconds) external;
        function performStart() external;
        function performClose() external;
    }

    /// Holds deposits and moves them in and out of the yield strategy.
    #[sol(all_derives)]
    interface TokenVault {
        error VaultUnauthorized(address account);
        error StrategyNotSet();
        error NothingToHarvest();

        function owner() external view returns (address);

        function earnAndHarvest() external;
        function emergencyWithdrawAllFromStrategy() external;
        function resetFlags() external;
        function earnToStrategy(uint256 amount) external;
    }

    /// The stablecoin used for tickets (6 decimals).
    #[sol(all_derives)]
    interface IERC20 {
        error ERC20InsufficientAllowance(address spender, uint256 allowance, uint256 needed);
        error ERC20InsufficientBalance(address sender, uint256 balance, uint256 needed);

        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);

        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Tracks which wallets have onboarded.
    #[sol(all_derives)]
    interface UserRegistry {
        error AlreadyRegistered(address user);

        function isRegistered(address user) external view returns (bool);

        function register() external;
    }
}

crate::register_contract_errors!(LotteryManager, TokenVault, IERC20, UserRegistry);

/// A ticket as returned by `getUserTickets` / `getTicketById`.
pub type Ticket = LotteryManager::Ticket;

/// Decimals of the ticket stablecoin.
pub const USDC_DECIMALS: u8 = 6;
