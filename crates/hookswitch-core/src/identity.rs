use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// IdentityState
// ---------------------------------------------------------------------------

/// The locally persisted machine/account credentials the target application
/// uses to identify the user.
///
/// Owned by the store and refreshed wholesale from the backend after every
/// mutating call — never patched field by field, so the store can't drift
/// from the target's authoritative state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityState {
    /// Primary machine id (64-char hex in the target's storage file).
    pub machine_code: String,
    /// Email of the account currently signed in, empty when signed out.
    pub current_account: String,
    /// Access token for the account, empty when signed out.
    pub auth_token: String,
}

impl IdentityState {
    pub fn is_signed_in(&self) -> bool {
        !self.current_account.is_empty() && !self.auth_token.is_empty()
    }

    /// Short display form of the machine code for logs and tables.
    pub fn machine_code_short(&self) -> &str {
        let end = self.machine_code.len().min(12);
        &self.machine_code[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_in_requires_account_and_token() {
        let mut id = IdentityState::default();
        assert!(!id.is_signed_in());
        id.current_account = "dev@example.com".into();
        assert!(!id.is_signed_in());
        id.auth_token = "tok".into();
        assert!(id.is_signed_in());
    }

    #[test]
    fn machine_code_short_handles_short_codes() {
        let id = IdentityState {
            machine_code: "abc".into(),
            ..Default::default()
        };
        assert_eq!(id.machine_code_short(), "abc");
    }
}
