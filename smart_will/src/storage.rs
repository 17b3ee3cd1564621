use soroban_sdk::{symbol_short, Address, Env, Map, Vec};

use crate::{
    Beneficiary, ConfirmationPath, ConfirmationState, ConfirmationStatus, Error, ExecutionState,
    TrackedAsset, ValidatorRecord, WillConfig, WillSnapshot,
};

// Storage TTL constants
pub const DAY_IN_LEDGERS: u32 = 17280; // ~1 day at 5s per ledger
const LEDGER_CLOSE_SECONDS: u64 = 5;

/// Ledgers the instance must survive without any call: one full inactivity
/// window plus the release lock and a day of slack, capped at the network
/// maximum.
pub fn lifecycle_ttl(env: &Env, config: &WillConfig) -> u32 {
    let seconds = config
        .inactivity_threshold
        .saturating_add(config.lock_duration);
    let ledgers = (seconds / LEDGER_CLOSE_SECONDS).saturating_add(DAY_IN_LEDGERS as u64);
    u32::try_from(ledgers)
        .unwrap_or(u32::MAX)
        .min(env.storage().max_ttl())
}

/// Threshold paired with `extend_to`: refresh once a day's worth has elapsed.
pub fn ttl_threshold(extend_to: u32) -> u32 {
    extend_to.saturating_sub(DAY_IN_LEDGERS).max(extend_to / 2)
}

/// Extend the instance to its lifecycle TTL. No-op before `init`.
pub fn extend_instance_ttl(env: &Env) {
    let config = match config(env) {
        Ok(config) => config,
        Err(_) => return,
    };
    let extend_to = lifecycle_ttl(env, &config);
    env.storage()
        .instance()
        .extend_ttl(ttl_threshold(extend_to), extend_to);
}

pub fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&symbol_short!("OWNER"))
}

pub fn owner(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&symbol_short!("OWNER"))
        .ok_or(Error::NotInitialized)
}

pub fn set_owner(env: &Env, owner: &Address) {
    env.storage().instance().set(&symbol_short!("OWNER"), owner);
}

pub fn token(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&symbol_short!("TOKEN"))
        .ok_or(Error::NotInitialized)
}

pub fn set_token(env: &Env, token: &Address) {
    env.storage().instance().set(&symbol_short!("TOKEN"), token);
}

pub fn config(env: &Env) -> Result<WillConfig, Error> {
    env.storage()
        .instance()
        .get(&symbol_short!("CONFIG"))
        .ok_or(Error::NotInitialized)
}

pub fn set_config(env: &Env, config: &WillConfig) {
    env.storage()
        .instance()
        .set(&symbol_short!("CONFIG"), config);
}

pub fn beneficiaries(env: &Env) -> Vec<Beneficiary> {
    env.storage()
        .instance()
        .get(&symbol_short!("BENEFS"))
        .unwrap_or_else(|| Vec::new(env))
}

pub fn set_beneficiaries(env: &Env, beneficiaries: &Vec<Beneficiary>) {
    env.storage()
        .instance()
        .set(&symbol_short!("BENEFS"), beneficiaries);
}

pub fn validators(env: &Env) -> Map<Address, ValidatorRecord> {
    env.storage()
        .instance()
        .get(&symbol_short!("VALIDS"))
        .unwrap_or_else(|| Map::new(env))
}

pub fn set_validators(env: &Env, validators: &Map<Address, ValidatorRecord>) {
    env.storage()
        .instance()
        .set(&symbol_short!("VALIDS"), validators);
}

pub fn attestation_count(env: &Env) -> u32 {
    env.storage()
        .instance()
        .get(&symbol_short!("ATT_CNT"))
        .unwrap_or(0)
}

pub fn set_attestation_count(env: &Env, count: u32) {
    env.storage()
        .instance()
        .set(&symbol_short!("ATT_CNT"), &count);
}

pub fn tracked_assets(env: &Env) -> Vec<TrackedAsset> {
    env.storage()
        .instance()
        .get(&symbol_short!("ASSETS"))
        .unwrap_or_else(|| Vec::new(env))
}

pub fn set_tracked_assets(env: &Env, assets: &Vec<TrackedAsset>) {
    env.storage()
        .instance()
        .set(&symbol_short!("ASSETS"), assets);
}

pub fn pool(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&symbol_short!("POOL"))
        .unwrap_or(0)
}

pub fn set_pool(env: &Env, pool: i128) {
    env.storage().instance().set(&symbol_short!("POOL"), &pool);
}

pub fn last_activity(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&symbol_short!("LAST_ACT"))
        .unwrap_or(0)
}

pub fn set_last_activity(env: &Env, timestamp: u64) {
    env.storage()
        .instance()
        .set(&symbol_short!("LAST_ACT"), &timestamp);
}

pub fn unconfirmed() -> ConfirmationStatus {
    ConfirmationStatus {
        state: ConfirmationState::Unconfirmed,
        confirmed_at: 0,
        path: ConfirmationPath::Pending,
    }
}

pub fn confirmation(env: &Env) -> ConfirmationStatus {
    env.storage()
        .instance()
        .get(&symbol_short!("CONF_ST"))
        .unwrap_or_else(unconfirmed)
}

pub fn set_confirmation(env: &Env, status: &ConfirmationStatus) {
    env.storage()
        .instance()
        .set(&symbol_short!("CONF_ST"), status);
}

pub fn execution_state(env: &Env) -> ExecutionState {
    env.storage()
        .instance()
        .get(&symbol_short!("EXEC_ST"))
        .unwrap_or(ExecutionState::Open)
}

pub fn set_execution_state(env: &Env, state: ExecutionState) {
    env.storage()
        .instance()
        .set(&symbol_short!("EXEC_ST"), &state);
}

/// Pool balance captured at the start of the distribution pass
pub fn distribution_base(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&symbol_short!("DIST_BASE"))
        .unwrap_or(0)
}

pub fn set_distribution_base(env: &Env, base: i128) {
    env.storage()
        .instance()
        .set(&symbol_short!("DIST_BASE"), &base);
}

pub fn snapshot(env: &Env) -> Result<WillSnapshot, Error> {
    Ok(WillSnapshot {
        owner: owner(env)?,
        token: token(env)?,
        config: config(env)?,
        beneficiaries: beneficiaries(env),
        validators: validators(env),
        attestation_count: attestation_count(env),
        assets: tracked_assets(env),
        pool: pool(env),
        last_activity: last_activity(env),
        confirmation: confirmation(env),
        execution: execution_state(env),
        distribution_base: distribution_base(env),
    })
}
