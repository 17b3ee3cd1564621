use soroban_sdk::{Address, Env, Map};

use crate::{storage, Error, ValidatorRecord};

/// Caller roles checked at the top of every state-changing entry point
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Owner,
    Validator,
    /// Any authenticated address. Still requires an initialized will.
    Anyone,
}

/// Authenticate `caller` and check it holds `role`.
pub fn authorize(env: &Env, caller: &Address, role: Role) -> Result<(), Error> {
    caller.require_auth();
    let owner = storage::owner(env)?;

    match role {
        Role::Owner => {
            if *caller != owner {
                return Err(Error::NotOwner);
            }
        }
        Role::Validator => match storage::validators(env).get(caller.clone()) {
            Some(record) if record.active => {}
            _ => return Err(Error::NotValidator),
        },
        Role::Anyone => {}
    }
    Ok(())
}

pub fn active_validator_count(validators: &Map<Address, ValidatorRecord>) -> u32 {
    let mut count = 0;
    for record in validators.values().iter() {
        if record.active {
            count += 1;
        }
    }
    count
}
