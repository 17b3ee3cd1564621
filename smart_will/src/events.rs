use soroban_sdk::{symbol_short, Env, IntoVal, Symbol, Val};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum EventCategory {
    Transaction = 0,
    State = 1,
    Alert = 2,
    System = 3,
    Access = 4,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum EventPriority {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl EventCategory {
    pub fn to_u32(self) -> u32 {
        self as u32
    }
}
impl EventPriority {
    pub fn to_u32(self) -> u32 {
        self as u32
    }
}

/// Publishes contract events under the `SmartWill` namespace.
///
/// Topic layout is `(namespace, category, priority, action)` so off-chain
/// subscribers can filter on category or priority without decoding data.
pub struct WillEvents;

impl WillEvents {
    pub fn emit<T: IntoVal<Env, Val>>(
        e: &Env,
        category: EventCategory,
        priority: EventPriority,
        action: Symbol,
        data: T,
    ) {
        let topics = (
            symbol_short!("SmartWill"),
            category.to_u32(),
            priority.to_u32(),
            action,
        );
        e.events().publish(topics, data);
    }
}
