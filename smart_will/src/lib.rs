#![no_std]

//! # Smart Will
//!
//! A conditional asset-release contract. An owner registers validators,
//! beneficiaries and an inventory of tracked assets, and funds a pool of a
//! single token. The pool is released to the beneficiaries only after the
//! owner's death has been confirmed and a mandatory time-lock has elapsed.
//!
//! ## Lifecycle
//!
//! 1. `init` fixes the owner, the pool token, the initial validator set and
//!    the [`WillConfig`].
//! 2. While unconfirmed the owner edits the registry and checks in with
//!    `record_activity`. Anyone may `deposit_value` at any time.
//! 3. Confirmation happens exactly once, either when `required_confirmations`
//!    distinct validators call `attest_trigger`, or when anyone calls
//!    `trigger_by_inactivity` after the owner has been silent for
//!    `inactivity_threshold` seconds. Confirmation cannot be undone.
//! 4. Once `lock_duration` seconds have passed since confirmation anyone may
//!    call `execute_distribution`, which pays every beneficiary
//!    `floor(pool * share_bps / 10000)` at most once. Rounding dust stays in
//!    the pool.
//!
//! Every state transition appends an [`audit::AuditRecord`] and publishes it
//! as an event. `rebuild_from_audit` replays that log into the same
//! [`WillSnapshot`] that `get_snapshot` reads from live storage.

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, token::TokenClient, Address, Env,
    Map, String, Vec,
};

mod access;
pub mod audit;
pub mod confirmation;
pub mod distribution;
mod events;
mod storage;

use access::Role;
use audit::{AuditEntry, AuditRecord};
use distribution::TokenTransfer;

pub use events::{EventCategory, EventPriority};

/// Default silence after which the dead-man switch may fire (90 days).
pub const DEFAULT_INACTIVITY_THRESHOLD: u64 = 90 * 86400;
/// Default delay between confirmation and release (30 days).
pub const DEFAULT_LOCK_DURATION: u64 = 30 * 86400;
/// Shares are expressed in parts per ten thousand.
pub const MAX_SHARE_BPS: u32 = 10_000;
/// Smallest quorum accepted at `init`.
pub const MIN_REQUIRED_CONFIRMATIONS: u32 = 2;

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum AssetKind {
    Native = 1,
    Fungible = 2,
    NonFungible = 3,
    ExternalReference = 4,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ConfirmationState {
    Unconfirmed = 0,
    Confirmed = 1,
}

/// Which trigger path confirmed the will. `Pending` until confirmed.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ConfirmationPath {
    Pending = 0,
    Attestation = 1,
    Inactivity = 2,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ExecutionState {
    Open = 0,
    Executed = 1,
}

/// Parameters fixed at `init`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WillConfig {
    pub required_confirmations: u32,
    /// Seconds of owner silence before `trigger_by_inactivity` is allowed
    pub inactivity_threshold: u64,
    /// Seconds between confirmation and release
    pub lock_duration: u64,
}

impl WillConfig {
    pub fn with_defaults(required_confirmations: u32) -> Self {
        WillConfig {
            required_confirmations,
            inactivity_threshold: DEFAULT_INACTIVITY_THRESHOLD,
            lock_duration: DEFAULT_LOCK_DURATION,
        }
    }
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Beneficiary {
    pub address: Address,
    pub share_bps: u32,
    pub claimed: bool,
}

/// Validator membership. Removal only clears `active`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidatorRecord {
    pub address: Address,
    pub active: bool,
    pub attested: bool,
    pub added_at: u64,
}

/// Inventory entry for an asset outside the native pool.
///
/// Non-native assets are assigned to one beneficiary by index; claiming one
/// only marks it distributed; the actual transfer is carried out off-contract
/// by whoever watches the `asset_clm` event.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrackedAsset {
    pub kind: AssetKind,
    pub locator: String,
    pub beneficiary: Option<u32>,
    pub distributed: bool,
    pub added_at: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfirmationStatus {
    pub state: ConfirmationState,
    pub confirmed_at: u64,
    pub path: ConfirmationPath,
}

/// Outcome of one distribution pass
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DistributionSummary {
    pub paid_count: u32,
    pub failed_count: u32,
    pub total_paid: i128,
    pub remainder: i128,
}

/// Full contract state, as read from storage or rebuilt from the audit log
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WillSnapshot {
    pub owner: Address,
    pub token: Address,
    pub config: WillConfig,
    pub beneficiaries: Vec<Beneficiary>,
    pub validators: Map<Address, ValidatorRecord>,
    pub attestation_count: u32,
    pub assets: Vec<TrackedAsset>,
    pub pool: i128,
    pub last_activity: u64,
    pub confirmation: ConfirmationStatus,
    pub execution: ExecutionState,
    pub distribution_base: i128,
}

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    NotOwner = 1,
    NotValidator = 2,
    NotAssignedBeneficiary = 3,

    NotInitialized = 10,
    AlreadyInitialized = 11,
    AlreadyConfirmed = 12,
    NotConfirmed = 13,
    TimeLockActive = 14,
    StillActive = 15,
    AlreadyExecuted = 16,
    NotExecuted = 17,
    AlreadyClaimed = 18,
    AssetAlreadyDistributed = 19,

    InvalidIdentity = 20,
    InvalidShare = 21,
    ShareTotalExceeded = 22,
    DuplicateBeneficiary = 23,
    DuplicateValidator = 24,
    UnknownValidator = 25,
    AlreadyAttested = 26,
    IndexOutOfBounds = 27,
    InvalidAmount = 28,
    InvalidConfig = 29,
    InvalidAssetAssignment = 30,
    AssetNotClaimable = 31,
    NothingToClaim = 32,
    InvalidLocator = 33,

    QuorumViolation = 40,
    ArithmeticOverflow = 41,
    InsufficientPool = 42,
    CorruptAuditLog = 43,

    TransferFailed = 50,
}

/// Coarse classification of [`Error`] codes
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Unauthorized,
    InvalidState,
    InvalidArgument,
    InvariantViolation,
    TransferFailure,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotOwner | Error::NotValidator | Error::NotAssignedBeneficiary => {
                ErrorKind::Unauthorized
            }
            Error::NotInitialized
            | Error::AlreadyInitialized
            | Error::AlreadyConfirmed
            | Error::NotConfirmed
            | Error::TimeLockActive
            | Error::StillActive
            | Error::AlreadyExecuted
            | Error::NotExecuted
            | Error::AlreadyClaimed
            | Error::AssetAlreadyDistributed => ErrorKind::InvalidState,
            Error::InvalidIdentity
            | Error::InvalidShare
            | Error::ShareTotalExceeded
            | Error::DuplicateBeneficiary
            | Error::DuplicateValidator
            | Error::UnknownValidator
            | Error::AlreadyAttested
            | Error::IndexOutOfBounds
            | Error::InvalidAmount
            | Error::InvalidConfig
            | Error::InvalidAssetAssignment
            | Error::AssetNotClaimable
            | Error::NothingToClaim
            | Error::InvalidLocator => ErrorKind::InvalidArgument,
            Error::QuorumViolation
            | Error::ArithmeticOverflow
            | Error::InsufficientPool
            | Error::CorruptAuditLog => ErrorKind::InvariantViolation,
            Error::TransferFailed => ErrorKind::TransferFailure,
        }
    }
}

#[contract]
pub struct SmartWill;

#[contractimpl]
impl SmartWill {
    /// Initialize the will with its owner, pool token and validator set
    pub fn init(
        env: Env,
        owner: Address,
        token: Address,
        validators: Vec<Address>,
        config: WillConfig,
    ) -> Result<(), Error> {
        owner.require_auth();

        if storage::is_initialized(&env) {
            return Err(Error::AlreadyInitialized);
        }
        if config.required_confirmations < MIN_REQUIRED_CONFIRMATIONS
            || config.inactivity_threshold == 0
            || config.lock_duration == 0
        {
            return Err(Error::InvalidConfig);
        }
        if owner == env.current_contract_address() {
            return Err(Error::InvalidIdentity);
        }

        let timestamp = env.ledger().timestamp();
        let mut members: Map<Address, ValidatorRecord> = Map::new(&env);
        for validator in validators.iter() {
            if validator == owner || validator == env.current_contract_address() {
                return Err(Error::InvalidIdentity);
            }
            if members.contains_key(validator.clone()) {
                return Err(Error::DuplicateValidator);
            }
            members.set(
                validator.clone(),
                ValidatorRecord {
                    address: validator,
                    active: true,
                    attested: false,
                    added_at: timestamp,
                },
            );
        }
        if members.len() < config.required_confirmations {
            return Err(Error::QuorumViolation);
        }

        storage::set_owner(&env, &owner);
        storage::set_token(&env, &token);
        storage::set_config(&env, &config);
        storage::extend_instance_ttl(&env);
        storage::set_validators(&env, &members);
        storage::set_beneficiaries(&env, &Vec::new(&env));
        storage::set_tracked_assets(&env, &Vec::new(&env));
        storage::set_attestation_count(&env, 0);
        storage::set_pool(&env, 0);
        storage::set_last_activity(&env, timestamp);
        storage::set_confirmation(&env, &storage::unconfirmed());
        storage::set_execution_state(&env, ExecutionState::Open);
        storage::set_distribution_base(&env, 0);

        audit::record(&env, &owner, AuditEntry::Created(token, config, validators));
        Ok(())
    }

    // --- Registry (owner only, before confirmation) ---

    /// Append a beneficiary; returns its index
    pub fn add_beneficiary(
        env: Env,
        caller: Address,
        beneficiary: Address,
        share_bps: u32,
    ) -> Result<u32, Error> {
        access::authorize(&env, &caller, Role::Owner)?;
        Self::require_unconfirmed(&env)?;

        if share_bps == 0 || share_bps > MAX_SHARE_BPS {
            return Err(Error::InvalidShare);
        }
        Self::require_free_principal(&env, &caller, &beneficiary)?;

        let mut beneficiaries = storage::beneficiaries(&env);
        let mut total: u32 = 0;
        for existing in beneficiaries.iter() {
            if existing.address == beneficiary {
                return Err(Error::DuplicateBeneficiary);
            }
            total += existing.share_bps;
        }
        if total + share_bps > MAX_SHARE_BPS {
            return Err(Error::ShareTotalExceeded);
        }

        storage::extend_instance_ttl(&env);
        let index = beneficiaries.len();
        beneficiaries.push_back(Beneficiary {
            address: beneficiary.clone(),
            share_bps,
            claimed: false,
        });
        storage::set_beneficiaries(&env, &beneficiaries);

        audit::record(
            &env,
            &caller,
            AuditEntry::BeneficiaryAdded(beneficiary, share_bps),
        );
        Ok(index)
    }

    /// Record an asset in the inventory; returns its index.
    ///
    /// `beneficiary` must name an existing beneficiary for every kind except
    /// `Native`, which is paid out by the distribution pass and takes `None`.
    pub fn add_tracked_asset(
        env: Env,
        caller: Address,
        kind: AssetKind,
        locator: String,
        beneficiary: Option<u32>,
    ) -> Result<u32, Error> {
        access::authorize(&env, &caller, Role::Owner)?;
        Self::require_unconfirmed(&env)?;

        if locator.len() == 0 {
            return Err(Error::InvalidLocator);
        }
        match (kind, beneficiary) {
            (AssetKind::Native, None) => {}
            (AssetKind::Native, Some(_)) | (_, None) => {
                return Err(Error::InvalidAssetAssignment)
            }
            (_, Some(index)) => {
                if index >= storage::beneficiaries(&env).len() {
                    return Err(Error::IndexOutOfBounds);
                }
            }
        }

        storage::extend_instance_ttl(&env);
        let mut assets = storage::tracked_assets(&env);
        let index = assets.len();
        assets.push_back(TrackedAsset {
            kind,
            locator: locator.clone(),
            beneficiary,
            distributed: false,
            added_at: env.ledger().timestamp(),
        });
        storage::set_tracked_assets(&env, &assets);

        audit::record(
            &env,
            &caller,
            AuditEntry::AssetAdded(kind, locator, beneficiary),
        );
        Ok(index)
    }

    pub fn add_validator(env: Env, caller: Address, validator: Address) -> Result<(), Error> {
        access::authorize(&env, &caller, Role::Owner)?;
        Self::require_unconfirmed(&env)?;

        let mut validators = storage::validators(&env);
        if let Some(existing) = validators.get(validator.clone()) {
            if existing.active {
                return Err(Error::DuplicateValidator);
            }
        }
        Self::require_free_principal(&env, &caller, &validator)?;
        for beneficiary in storage::beneficiaries(&env).iter() {
            if beneficiary.address == validator {
                return Err(Error::InvalidIdentity);
            }
        }

        storage::extend_instance_ttl(&env);
        // A re-added validator starts over without its earlier attestation.
        validators.set(
            validator.clone(),
            ValidatorRecord {
                address: validator.clone(),
                active: true,
                attested: false,
                added_at: env.ledger().timestamp(),
            },
        );
        storage::set_validators(&env, &validators);

        audit::record(&env, &caller, AuditEntry::ValidatorAdded(validator));
        Ok(())
    }

    /// Deactivate a validator. Fails if the active set would drop below quorum.
    pub fn remove_validator(env: Env, caller: Address, validator: Address) -> Result<(), Error> {
        access::authorize(&env, &caller, Role::Owner)?;
        Self::require_unconfirmed(&env)?;

        let mut validators = storage::validators(&env);
        let mut record = match validators.get(validator.clone()) {
            Some(record) if record.active => record,
            _ => return Err(Error::UnknownValidator),
        };

        let config = storage::config(&env)?;
        if access::active_validator_count(&validators) - 1 < config.required_confirmations {
            return Err(Error::QuorumViolation);
        }

        storage::extend_instance_ttl(&env);
        if record.attested {
            let count = storage::attestation_count(&env);
            storage::set_attestation_count(&env, count.saturating_sub(1));
        }
        record.active = false;
        record.attested = false;
        validators.set(validator.clone(), record);
        storage::set_validators(&env, &validators);

        audit::record(&env, &caller, AuditEntry::ValidatorRemoved(validator));
        Ok(())
    }

    /// Move `amount` of the pool token from `from` into the will. Allowed in
    /// every state; funds arriving after execution stay in the pool.
    pub fn deposit_value(env: Env, from: Address, amount: i128) -> Result<i128, Error> {
        access::authorize(&env, &from, Role::Anyone)?;

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        let pool = storage::pool(&env)
            .checked_add(amount)
            .ok_or(Error::ArithmeticOverflow)?;

        storage::extend_instance_ttl(&env);
        let token = storage::token(&env)?;
        TokenClient::new(&env, &token).transfer(&from, &env.current_contract_address(), &amount);
        storage::set_pool(&env, pool);

        audit::record(&env, &from, AuditEntry::Deposited(amount));
        Ok(pool)
    }

    // --- Activity tracker ---

    /// Owner check-in; resets the inactivity clock
    pub fn record_activity(env: Env, caller: Address) -> Result<(), Error> {
        access::authorize(&env, &caller, Role::Owner)?;

        storage::extend_instance_ttl(&env);
        storage::set_last_activity(&env, env.ledger().timestamp());

        audit::record(&env, &caller, AuditEntry::ActivityRecorded);
        Ok(())
    }

    /// Seconds since the owner's last check-in
    pub fn get_inactive_duration(env: Env) -> Result<u64, Error> {
        storage::owner(&env)?;
        Ok(confirmation::inactive_duration(&env))
    }

    pub fn get_inactive_days(env: Env) -> Result<u64, Error> {
        Ok(Self::get_inactive_duration(env)? / 86400)
    }

    // --- Confirmation engine ---

    /// Validator attestation; returns the attestation count after this call
    pub fn attest_trigger(env: Env, caller: Address) -> Result<u32, Error> {
        access::authorize(&env, &caller, Role::Validator)?;
        storage::extend_instance_ttl(&env);
        confirmation::attest(&env, &caller)
    }

    /// Dead-man switch, callable by anyone once the owner has gone silent
    pub fn trigger_by_inactivity(env: Env, caller: Address) -> Result<(), Error> {
        access::authorize(&env, &caller, Role::Anyone)?;
        storage::extend_instance_ttl(&env);
        confirmation::trigger_by_inactivity(&env, &caller)
    }

    // --- Release gate ---

    /// Seconds until release is allowed; 0 while unconfirmed or once elapsed
    pub fn get_time_lock_remaining(env: Env) -> Result<u64, Error> {
        confirmation::time_lock_remaining(&env)
    }

    // --- Distribution engine ---

    /// Pay every unclaimed beneficiary its share of the pool and close the will
    pub fn execute_distribution(env: Env, caller: Address) -> Result<DistributionSummary, Error> {
        access::authorize(&env, &caller, Role::Anyone)?;
        storage::extend_instance_ttl(&env);
        let token = storage::token(&env)?;
        let summary =
            distribution::distribute(&env, &caller, &TokenTransfer::new(&env, token))?;
        log!(
            &env,
            "distribution closed: paid {} failed {}",
            summary.paid_count,
            summary.failed_count
        );
        Ok(summary)
    }

    /// Re-attempt a payout that failed during the distribution pass
    pub fn retry_share(env: Env, caller: Address, index: u32) -> Result<i128, Error> {
        access::authorize(&env, &caller, Role::Anyone)?;
        storage::extend_instance_ttl(&env);
        let token = storage::token(&env)?;
        distribution::retry(&env, &caller, index, &TokenTransfer::new(&env, token))
    }

    /// Mark a non-native asset as released to its assigned beneficiary
    pub fn claim_tracked_asset(env: Env, caller: Address, index: u32) -> Result<(), Error> {
        access::authorize(&env, &caller, Role::Anyone)?;
        confirmation::require_released(&env)?;

        let mut assets = storage::tracked_assets(&env);
        let mut asset = assets.get(index).ok_or(Error::IndexOutOfBounds)?;
        let assigned = match (asset.kind, asset.beneficiary) {
            (AssetKind::Native, _) | (_, None) => return Err(Error::AssetNotClaimable),
            (_, Some(assigned)) => assigned,
        };
        let beneficiary = storage::beneficiaries(&env)
            .get(assigned)
            .ok_or(Error::IndexOutOfBounds)?;
        if beneficiary.address != caller {
            return Err(Error::NotAssignedBeneficiary);
        }
        if asset.distributed {
            return Err(Error::AssetAlreadyDistributed);
        }

        storage::extend_instance_ttl(&env);
        asset.distributed = true;
        assets.set(index, asset);
        storage::set_tracked_assets(&env, &assets);

        audit::record(&env, &caller, AuditEntry::AssetClaimed(index, caller.clone()));
        Ok(())
    }

    // --- Queries ---

    pub fn get_owner(env: Env) -> Result<Address, Error> {
        storage::owner(&env)
    }

    pub fn get_token(env: Env) -> Result<Address, Error> {
        storage::token(&env)
    }

    pub fn get_config(env: Env) -> Result<WillConfig, Error> {
        storage::config(&env)
    }

    pub fn is_confirmed(env: Env) -> bool {
        storage::confirmation(&env).state == ConfirmationState::Confirmed
    }

    pub fn is_executed(env: Env) -> bool {
        storage::execution_state(&env) == ExecutionState::Executed
    }

    pub fn get_confirmation(env: Env) -> ConfirmationStatus {
        storage::confirmation(&env)
    }

    pub fn get_pool_balance(env: Env) -> i128 {
        storage::pool(&env)
    }

    pub fn get_beneficiary(env: Env, index: u32) -> Result<Beneficiary, Error> {
        storage::beneficiaries(&env)
            .get(index)
            .ok_or(Error::IndexOutOfBounds)
    }

    pub fn get_beneficiary_count(env: Env) -> u32 {
        storage::beneficiaries(&env).len()
    }

    pub fn get_beneficiaries(env: Env) -> Vec<Beneficiary> {
        storage::beneficiaries(&env)
    }

    pub fn get_validators(env: Env) -> Vec<ValidatorRecord> {
        storage::validators(&env).values()
    }

    pub fn get_attestation_count(env: Env) -> u32 {
        storage::attestation_count(&env)
    }

    pub fn get_tracked_asset(env: Env, index: u32) -> Result<TrackedAsset, Error> {
        storage::tracked_assets(&env)
            .get(index)
            .ok_or(Error::IndexOutOfBounds)
    }

    pub fn get_tracked_asset_count(env: Env) -> u32 {
        storage::tracked_assets(&env).len()
    }

    // --- Audit log ---

    pub fn get_audit_len(env: Env) -> u32 {
        audit::len(&env)
    }

    /// Page through the audit log, at most `audit::MAX_PAGE_SIZE` records
    pub fn get_audit_log(env: Env, from: u32, limit: u32) -> Vec<AuditRecord> {
        audit::page(&env, from, limit)
    }

    /// Current state read directly from storage
    pub fn get_snapshot(env: Env) -> Result<WillSnapshot, Error> {
        storage::snapshot(&env)
    }

    /// State reconstructed purely from the audit log.
    ///
    /// Reads the whole log in one invocation, so its cost grows with the
    /// history. For long-lived wills, page through `get_audit_log` off-chain
    /// and fold the pages with [`audit::Replay`] instead.
    pub fn rebuild_from_audit(env: Env) -> Result<WillSnapshot, Error> {
        let len = audit::len(&env);
        let mut replay = audit::Replay::new();
        let mut from = 0;
        while from < len {
            replay.feed(&env, &audit::page(&env, from, audit::MAX_PAGE_SIZE))?;
            from += audit::MAX_PAGE_SIZE;
        }
        replay.finish()
    }

    // Internal helpers

    fn require_unconfirmed(env: &Env) -> Result<(), Error> {
        if storage::confirmation(env).state == ConfirmationState::Confirmed {
            return Err(Error::AlreadyConfirmed);
        }
        Ok(())
    }

    /// Rejects the contract's own address, the owner and active validators
    fn require_free_principal(env: &Env, owner: &Address, candidate: &Address) -> Result<(), Error> {
        if *candidate == env.current_contract_address() || candidate == owner {
            return Err(Error::InvalidIdentity);
        }
        if let Some(record) = storage::validators(env).get(candidate.clone()) {
            if record.active {
                return Err(Error::InvalidIdentity);
            }
        }
        Ok(())
    }
}
