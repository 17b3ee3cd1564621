//! Payout of the native pool.
//!
//! Shares are `floor(base * share_bps / 10000)` where `base` is the pool
//! balance when the pass starts. Truncation dust is never redistributed and
//! stays in the pool.
//!
//! Each payout persists `claimed = true` and the pool debit before calling
//! out to [`ValueTransfer`], so a transfer hook that calls back into the
//! contract already sees the share as paid. A failed transfer restores both
//! and the pass moves on to the next beneficiary.

use soroban_sdk::{log, token::TokenClient, Address, Env};

use crate::audit::{self, AuditEntry};
use crate::confirmation;
use crate::{storage, AssetKind, DistributionSummary, Error, ExecutionState, MAX_SHARE_BPS};

const BPS_DENOMINATOR: i128 = MAX_SHARE_BPS as i128;

/// Moves value out of the contract to a beneficiary
pub trait ValueTransfer {
    fn transfer(&self, to: &Address, amount: i128) -> Result<(), Error>;
}

/// [`ValueTransfer`] backed by a Stellar token contract balance held by this
/// contract.
pub struct TokenTransfer {
    env: Env,
    token: Address,
}

impl TokenTransfer {
    pub fn new(env: &Env, token: Address) -> Self {
        TokenTransfer {
            env: env.clone(),
            token,
        }
    }
}

impl ValueTransfer for TokenTransfer {
    fn transfer(&self, to: &Address, amount: i128) -> Result<(), Error> {
        let client = TokenClient::new(&self.env, &self.token);
        match client.try_transfer(&self.env.current_contract_address(), to, &amount) {
            Ok(Ok(())) => Ok(()),
            _ => Err(Error::TransferFailed),
        }
    }
}

/// `floor(pool * share_bps / 10000)` without overflowing for any
/// non-negative `pool`. `share_bps <= 10000` is enforced by `add_beneficiary`.
pub fn share_of(pool: i128, share_bps: u32) -> i128 {
    debug_assert!(share_bps <= MAX_SHARE_BPS);
    if pool <= 0 {
        return 0;
    }
    let share = share_bps as i128;
    (pool / BPS_DENOMINATOR) * share + (pool % BPS_DENOMINATOR) * share / BPS_DENOMINATOR
}

/// Run the single distribution pass and close the will.
pub fn distribute<T: ValueTransfer>(
    env: &Env,
    caller: &Address,
    transfer: &T,
) -> Result<DistributionSummary, Error> {
    confirmation::require_released(env)?;
    if storage::execution_state(env) == ExecutionState::Executed {
        return Err(Error::AlreadyExecuted);
    }

    let base = storage::pool(env);
    storage::set_distribution_base(env, base);

    let mut summary = DistributionSummary {
        paid_count: 0,
        failed_count: 0,
        total_paid: 0,
        remainder: 0,
    };

    for (index, beneficiary) in storage::beneficiaries(env).iter().enumerate() {
        if beneficiary.claimed {
            continue;
        }
        let amount = share_of(base, beneficiary.share_bps);
        if amount == 0 {
            continue;
        }
        match pay_beneficiary(env, caller, index as u32, amount, transfer) {
            Ok(()) => {
                summary.paid_count += 1;
                summary.total_paid += amount;
            }
            Err(Error::TransferFailed) => summary.failed_count += 1,
            Err(err) => return Err(err),
        }
    }

    summary.remainder = storage::pool(env);
    storage::set_execution_state(env, ExecutionState::Executed);

    let mut assets = storage::tracked_assets(env);
    for index in 0..assets.len() {
        if let Some(mut asset) = assets.get(index) {
            if asset.kind == AssetKind::Native {
                asset.distributed = true;
                assets.set(index, asset);
            }
        }
    }
    storage::set_tracked_assets(env, &assets);

    audit::record(
        env,
        caller,
        AuditEntry::ExecutionClosed(base, summary.remainder),
    );
    Ok(summary)
}

/// Pay a share that failed during the pass. Only valid once executed.
pub fn retry<T: ValueTransfer>(
    env: &Env,
    caller: &Address,
    index: u32,
    transfer: &T,
) -> Result<i128, Error> {
    confirmation::require_released(env)?;
    if storage::execution_state(env) != ExecutionState::Executed {
        return Err(Error::NotExecuted);
    }

    let beneficiary = storage::beneficiaries(env)
        .get(index)
        .ok_or(Error::IndexOutOfBounds)?;
    if beneficiary.claimed {
        return Err(Error::AlreadyClaimed);
    }
    let amount = share_of(storage::distribution_base(env), beneficiary.share_bps);
    if amount == 0 {
        return Err(Error::NothingToClaim);
    }

    pay_beneficiary(env, caller, index, amount, transfer)?;
    Ok(amount)
}

fn pay_beneficiary<T: ValueTransfer>(
    env: &Env,
    caller: &Address,
    index: u32,
    amount: i128,
    transfer: &T,
) -> Result<(), Error> {
    let mut beneficiaries = storage::beneficiaries(env);
    let mut beneficiary = beneficiaries.get(index).ok_or(Error::IndexOutOfBounds)?;
    if beneficiary.claimed {
        return Err(Error::AlreadyClaimed);
    }
    let pool = storage::pool(env);
    if amount > pool {
        return Err(Error::InsufficientPool);
    }

    beneficiary.claimed = true;
    beneficiaries.set(index, beneficiary.clone());
    storage::set_beneficiaries(env, &beneficiaries);
    storage::set_pool(env, pool - amount);

    if transfer.transfer(&beneficiary.address, amount).is_err() {
        beneficiary.claimed = false;
        beneficiaries.set(index, beneficiary.clone());
        storage::set_beneficiaries(env, &beneficiaries);
        storage::set_pool(env, pool);

        log!(env, "payout to beneficiary {} failed", index);
        audit::record(
            env,
            caller,
            AuditEntry::TransferFailed(beneficiary.address, amount),
        );
        return Err(Error::TransferFailed);
    }

    audit::record(
        env,
        caller,
        AuditEntry::DistributionExecuted(beneficiary.address, amount),
    );
    Ok(())
}
