use serde::Serialize;

use crate::identity::IdentityState;
use crate::pending::PendingSlot;
use crate::types::HookStatus;
use crate::usage::UsageSnapshot;

// ---------------------------------------------------------------------------
// BusyFlags
// ---------------------------------------------------------------------------

/// One flag per logical operation. A flag is set for the duration of its
/// operation and cleared on every return path, so the UI never sticks in a
/// loading state after an error.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BusyFlags {
    pub identity_reset: bool,
    pub account_switch: bool,
    pub quick_change: bool,
    pub hook: bool,
    pub entry_select: bool,
    pub usage: bool,
}

impl BusyFlags {
    pub fn any(&self) -> bool {
        self.identity_reset
            || self.account_switch
            || self.quick_change
            || self.hook
            || self.entry_select
            || self.usage
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Process-scoped reactive state, constructed once at startup and injected
/// into the presentation layer. Mutated exclusively by session operations;
/// on error, data fields keep their last-known values.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Store {
    pub identity: IdentityState,
    pub usage: UsageSnapshot,
    pub hook_status: HookStatus,
    pub pending: PendingSlot,
    pub busy: BusyFlags,
}

impl Store {
    pub fn new() -> Self {
        Self {
            hook_status: HookStatus::Unknown,
            ..Default::default()
        }
    }
}
