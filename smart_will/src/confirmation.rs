//! Death confirmation and the release time-lock.
//!
//! Two independent paths lead to the single `Unconfirmed -> Confirmed`
//! transition: a quorum of validator attestations, or the owner's silence
//! exceeding `inactivity_threshold`. Whichever fires first wins; [`confirm`]
//! is a no-op for the other.

use soroban_sdk::{log, Address, Env};

use crate::audit::{self, AuditEntry};
use crate::{storage, ConfirmationPath, ConfirmationState, ConfirmationStatus, Error};

/// Move to `Confirmed` if not already there. Returns whether this call did it.
pub fn confirm(env: &Env, actor: &Address, path: ConfirmationPath) -> Result<bool, Error> {
    if storage::confirmation(env).state == ConfirmationState::Confirmed {
        return Ok(false);
    }
    let config = storage::config(env)?;
    let now = env.ledger().timestamp();

    storage::set_confirmation(
        env,
        &ConfirmationStatus {
            state: ConfirmationState::Confirmed,
            confirmed_at: now,
            path,
        },
    );

    let unlock_at = now.saturating_add(config.lock_duration);
    log!(env, "will confirmed at {}, unlocks at {}", now, unlock_at);
    audit::record(env, actor, AuditEntry::Confirmed(path, unlock_at));
    Ok(true)
}

/// Count one attestation from an active validator. Caller authorization is
/// the entry point's job.
pub fn attest(env: &Env, validator: &Address) -> Result<u32, Error> {
    if storage::confirmation(env).state == ConfirmationState::Confirmed {
        return Err(Error::AlreadyConfirmed);
    }

    let mut validators = storage::validators(env);
    let mut record = match validators.get(validator.clone()) {
        Some(record) if record.active => record,
        _ => return Err(Error::NotValidator),
    };
    if record.attested {
        return Err(Error::AlreadyAttested);
    }

    record.attested = true;
    validators.set(validator.clone(), record);
    storage::set_validators(env, &validators);

    let count = storage::attestation_count(env) + 1;
    storage::set_attestation_count(env, count);
    audit::record(env, validator, AuditEntry::Attested(count));

    let config = storage::config(env)?;
    if count >= config.required_confirmations {
        confirm(env, validator, ConfirmationPath::Attestation)?;
    }
    Ok(count)
}

pub fn trigger_by_inactivity(env: &Env, caller: &Address) -> Result<(), Error> {
    if storage::confirmation(env).state == ConfirmationState::Confirmed {
        return Err(Error::AlreadyConfirmed);
    }
    let config = storage::config(env)?;
    if inactive_duration(env) < config.inactivity_threshold {
        return Err(Error::StillActive);
    }
    confirm(env, caller, ConfirmationPath::Inactivity)?;
    Ok(())
}

pub fn inactive_duration(env: &Env) -> u64 {
    env.ledger()
        .timestamp()
        .saturating_sub(storage::last_activity(env))
}

/// Timestamp at which release opens, if confirmed
pub fn unlock_at(env: &Env) -> Result<Option<u64>, Error> {
    let status = storage::confirmation(env);
    if status.state != ConfirmationState::Confirmed {
        return Ok(None);
    }
    let config = storage::config(env)?;
    Ok(Some(status.confirmed_at.saturating_add(config.lock_duration)))
}

pub fn time_lock_remaining(env: &Env) -> Result<u64, Error> {
    storage::owner(env)?;
    Ok(match unlock_at(env)? {
        Some(at) => at.saturating_sub(env.ledger().timestamp()),
        None => 0,
    })
}

/// Release gate shared by every payout and claim path.
/// Open once confirmed and `now >= confirmed_at + lock_duration`.
pub fn require_released(env: &Env) -> Result<(), Error> {
    match unlock_at(env)? {
        None => Err(Error::NotConfirmed),
        Some(at) if env.ledger().timestamp() < at => Err(Error::TimeLockActive),
        Some(_) => Ok(()),
    }
}
