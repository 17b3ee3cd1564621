//! Append-only audit log.
//!
//! Each state transition writes one [`AuditRecord`] to persistent storage
//! under `("AUDIT", seq)` and publishes the same record as a contract event.
//! Sequence numbers are dense and start at 0; ledger timestamps never go
//! backwards, so the log is totally ordered. [`Replay`] folds the log back
//! into a [`WillSnapshot`], one page at a time if needed.
//!
//! Records are written with the network's maximum TTL and refreshed whenever
//! they are read. Every append also refreshes [`TTL_SWEEP`] older records,
//! cycling through the log, so a will that keeps receiving calls keeps its
//! whole history live.

use soroban_sdk::{contracttype, symbol_short, Address, Env, Map, String, Symbol, Vec};

use crate::events::{EventCategory, EventPriority, WillEvents};
use crate::storage;
use crate::{
    AssetKind, Beneficiary, ConfirmationPath, ConfirmationState, ConfirmationStatus, Error,
    ExecutionState, TrackedAsset, ValidatorRecord, WillConfig, WillSnapshot,
};

pub const MAX_PAGE_SIZE: u32 = 50;
/// Older records refreshed per append
pub const TTL_SWEEP: u32 = 4;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AuditEntry {
    /// (token, config, initial validators)
    Created(Address, WillConfig, Vec<Address>),
    /// (beneficiary, share_bps)
    BeneficiaryAdded(Address, u32),
    ValidatorAdded(Address),
    ValidatorRemoved(Address),
    /// (kind, locator, assigned beneficiary index)
    AssetAdded(AssetKind, String, Option<u32>),
    Deposited(i128),
    ActivityRecorded,
    /// attestation count after this attestation
    Attested(u32),
    /// (path, unlock timestamp)
    Confirmed(ConfirmationPath, u64),
    DistributionExecuted(Address, i128),
    TransferFailed(Address, i128),
    /// (distribution base, remainder left in pool)
    ExecutionClosed(i128, i128),
    /// (asset index, beneficiary)
    AssetClaimed(u32, Address),
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuditRecord {
    pub seq: u32,
    pub timestamp: u64,
    pub actor: Address,
    pub entry: AuditEntry,
}

impl AuditEntry {
    fn topic(&self) -> (EventCategory, EventPriority, Symbol) {
        match self {
            AuditEntry::Created(..) => (
                EventCategory::System,
                EventPriority::Medium,
                symbol_short!("created"),
            ),
            AuditEntry::BeneficiaryAdded(..) => (
                EventCategory::State,
                EventPriority::Medium,
                symbol_short!("benef_add"),
            ),
            AuditEntry::ValidatorAdded(..) => (
                EventCategory::Access,
                EventPriority::Medium,
                symbol_short!("val_add"),
            ),
            AuditEntry::ValidatorRemoved(..) => (
                EventCategory::Access,
                EventPriority::Medium,
                symbol_short!("val_rm"),
            ),
            AuditEntry::AssetAdded(..) => (
                EventCategory::State,
                EventPriority::Low,
                symbol_short!("asset_add"),
            ),
            AuditEntry::Deposited(..) => (
                EventCategory::Transaction,
                EventPriority::Medium,
                symbol_short!("deposit"),
            ),
            AuditEntry::ActivityRecorded => (
                EventCategory::Access,
                EventPriority::Low,
                symbol_short!("activity"),
            ),
            AuditEntry::Attested(..) => (
                EventCategory::Alert,
                EventPriority::Medium,
                symbol_short!("attested"),
            ),
            AuditEntry::Confirmed(..) => (
                EventCategory::Alert,
                EventPriority::High,
                symbol_short!("confirmed"),
            ),
            AuditEntry::DistributionExecuted(..) => (
                EventCategory::Transaction,
                EventPriority::High,
                symbol_short!("paid"),
            ),
            AuditEntry::TransferFailed(..) => (
                EventCategory::Alert,
                EventPriority::High,
                symbol_short!("pay_fail"),
            ),
            AuditEntry::ExecutionClosed(..) => (
                EventCategory::State,
                EventPriority::High,
                symbol_short!("closed"),
            ),
            AuditEntry::AssetClaimed(..) => (
                EventCategory::Transaction,
                EventPriority::High,
                symbol_short!("asset_clm"),
            ),
        }
    }
}

fn record_key(seq: u32) -> (Symbol, u32) {
    (symbol_short!("AUDIT"), seq)
}

fn extend_record_ttl(env: &Env, seq: u32) {
    let key = record_key(seq);
    if env.storage().persistent().has(&key) {
        let extend_to = env.storage().max_ttl();
        env.storage()
            .persistent()
            .extend_ttl(&key, storage::ttl_threshold(extend_to), extend_to);
    }
}

/// Refresh the next `TTL_SWEEP` records after the stored cursor, wrapping
/// around at `len`.
fn sweep_ttl(env: &Env, len: u32) {
    let mut cursor: u32 = env
        .storage()
        .instance()
        .get(&symbol_short!("AUD_SWP"))
        .unwrap_or(0);
    for _ in 0..TTL_SWEEP.min(len) {
        if cursor >= len {
            cursor = 0;
        }
        extend_record_ttl(env, cursor);
        cursor += 1;
    }
    env.storage()
        .instance()
        .set(&symbol_short!("AUD_SWP"), &cursor);
}

pub fn len(env: &Env) -> u32 {
    env.storage()
        .instance()
        .get(&symbol_short!("AUD_LEN"))
        .unwrap_or(0)
}

/// Append a record and publish it.
pub fn record(env: &Env, actor: &Address, entry: AuditEntry) {
    let seq = len(env);
    let (category, priority, action) = entry.topic();
    let record = AuditRecord {
        seq,
        timestamp: env.ledger().timestamp(),
        actor: actor.clone(),
        entry,
    };

    env.storage().persistent().set(&record_key(seq), &record);
    extend_record_ttl(env, seq);
    env.storage()
        .instance()
        .set(&symbol_short!("AUD_LEN"), &(seq + 1));
    sweep_ttl(env, seq + 1);

    WillEvents::emit(env, category, priority, action, record);
}

pub fn get(env: &Env, seq: u32) -> Option<AuditRecord> {
    let record = env.storage().persistent().get(&record_key(seq));
    if record.is_some() {
        extend_record_ttl(env, seq);
    }
    record
}

pub fn page(env: &Env, from: u32, limit: u32) -> Vec<AuditRecord> {
    let end = from
        .saturating_add(limit.min(MAX_PAGE_SIZE))
        .min(len(env));
    let mut result = Vec::new(env);
    for seq in from..end {
        if let Some(record) = get(env, seq) {
            result.push_back(record);
        }
    }
    result
}

/// Incremental fold of the audit log into a [`WillSnapshot`].
///
/// Feed pages from `get_audit_log` in order; each page is checked against
/// the previous one, so a gap or reordering anywhere is `CorruptAuditLog`.
/// The first record must be `Created` with `seq == 0`.
pub struct Replay {
    snapshot: Option<WillSnapshot>,
    next_seq: u32,
    last_timestamp: u64,
}

impl Replay {
    pub fn new() -> Self {
        Replay {
            snapshot: None,
            next_seq: 0,
            last_timestamp: 0,
        }
    }

    pub fn feed(&mut self, env: &Env, records: &Vec<AuditRecord>) -> Result<(), Error> {
        for record in records.iter() {
            if record.seq != self.next_seq || record.timestamp < self.last_timestamp {
                return Err(Error::CorruptAuditLog);
            }
            self.next_seq += 1;
            self.last_timestamp = record.timestamp;
            match self.snapshot.as_mut() {
                Some(snapshot) => apply(snapshot, record)?,
                None => self.snapshot = Some(genesis(env, record)?),
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Result<WillSnapshot, Error> {
        self.snapshot.ok_or(Error::CorruptAuditLog)
    }
}

impl Default for Replay {
    fn default() -> Self {
        Self::new()
    }
}

/// Rebuild contract state from a complete, ordered log.
pub fn replay(env: &Env, records: &Vec<AuditRecord>) -> Result<WillSnapshot, Error> {
    let mut replay = Replay::new();
    replay.feed(env, records)?;
    replay.finish()
}

fn genesis(env: &Env, first: AuditRecord) -> Result<WillSnapshot, Error> {
    let (token, config, initial) = match first.entry {
        AuditEntry::Created(token, config, validators) => (token, config, validators),
        _ => return Err(Error::CorruptAuditLog),
    };

    let mut validators: Map<Address, ValidatorRecord> = Map::new(env);
    for address in initial.iter() {
        validators.set(
            address.clone(),
            ValidatorRecord {
                address,
                active: true,
                attested: false,
                added_at: first.timestamp,
            },
        );
    }

    Ok(WillSnapshot {
        owner: first.actor,
        token,
        config,
        beneficiaries: Vec::new(env),
        validators,
        attestation_count: 0,
        assets: Vec::new(env),
        pool: 0,
        last_activity: first.timestamp,
        confirmation: ConfirmationStatus {
            state: ConfirmationState::Unconfirmed,
            confirmed_at: 0,
            path: ConfirmationPath::Pending,
        },
        execution: ExecutionState::Open,
        distribution_base: 0,
    })
}

fn apply(snapshot: &mut WillSnapshot, record: AuditRecord) -> Result<(), Error> {
    match record.entry {
        AuditEntry::Created(..) => return Err(Error::CorruptAuditLog),
        AuditEntry::BeneficiaryAdded(address, share_bps) => {
            snapshot.beneficiaries.push_back(Beneficiary {
                address,
                share_bps,
                claimed: false,
            });
        }
        AuditEntry::ValidatorAdded(address) => {
            snapshot.validators.set(
                address.clone(),
                ValidatorRecord {
                    address,
                    active: true,
                    attested: false,
                    added_at: record.timestamp,
                },
            );
        }
        AuditEntry::ValidatorRemoved(address) => {
            let mut validator = snapshot
                .validators
                .get(address.clone())
                .ok_or(Error::CorruptAuditLog)?;
            if validator.attested {
                snapshot.attestation_count = snapshot.attestation_count.saturating_sub(1);
            }
            validator.active = false;
            validator.attested = false;
            snapshot.validators.set(address, validator);
        }
        AuditEntry::AssetAdded(kind, locator, beneficiary) => {
            snapshot.assets.push_back(TrackedAsset {
                kind,
                locator,
                beneficiary,
                distributed: false,
                added_at: record.timestamp,
            });
        }
        AuditEntry::Deposited(amount) => {
            snapshot.pool = snapshot
                .pool
                .checked_add(amount)
                .ok_or(Error::CorruptAuditLog)?;
        }
        AuditEntry::ActivityRecorded => {
            snapshot.last_activity = record.timestamp;
        }
        AuditEntry::Attested(count) => {
            let mut validator = snapshot
                .validators
                .get(record.actor.clone())
                .ok_or(Error::CorruptAuditLog)?;
            if snapshot.attestation_count + 1 != count {
                return Err(Error::CorruptAuditLog);
            }
            validator.attested = true;
            snapshot.validators.set(record.actor, validator);
            snapshot.attestation_count = count;
        }
        AuditEntry::Confirmed(ConfirmationPath::Pending, _) => {
            return Err(Error::CorruptAuditLog)
        }
        AuditEntry::Confirmed(path, _) => {
            snapshot.confirmation = ConfirmationStatus {
                state: ConfirmationState::Confirmed,
                confirmed_at: record.timestamp,
                path,
            };
        }
        AuditEntry::DistributionExecuted(address, amount) => {
            let index = snapshot
                .beneficiaries
                .iter()
                .position(|b| b.address == address)
                .ok_or(Error::CorruptAuditLog)? as u32;
            let mut beneficiary = snapshot
                .beneficiaries
                .get(index)
                .ok_or(Error::CorruptAuditLog)?;
            beneficiary.claimed = true;
            snapshot.beneficiaries.set(index, beneficiary);
            snapshot.pool = snapshot
                .pool
                .checked_sub(amount)
                .ok_or(Error::CorruptAuditLog)?;
        }
        AuditEntry::TransferFailed(..) => {}
        AuditEntry::ExecutionClosed(base, _) => {
            snapshot.execution = ExecutionState::Executed;
            snapshot.distribution_base = base;
            for index in 0..snapshot.assets.len() {
                if let Some(mut asset) = snapshot.assets.get(index) {
                    if asset.kind == AssetKind::Native {
                        asset.distributed = true;
                        snapshot.assets.set(index, asset);
                    }
                }
            }
        }
        AuditEntry::AssetClaimed(index, _) => {
            let mut asset = snapshot.assets.get(index).ok_or(Error::CorruptAuditLog)?;
            asset.distributed = true;
            snapshot.assets.set(index, asset);
        }
    }
    Ok(())
}
