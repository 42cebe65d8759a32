//! Access gate: decides whether a classified command may run.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. verification (skipped for exempt commands and elevated group callers)
//! 2. shield
//! 3. missing arguments
//! 4. elevated permission (group context only)
//! 5. cooldown admission (group context only, non-elevated callers)
//!
//! The order is observable: it decides which message a caller sees.

use std::sync::Arc;

use tracing::debug;

use crate::cooldown::CooldownSet;
use crate::error::Result;
use crate::registry::CommandDescriptor;
use crate::store::AccountStore;
use crate::types::Identity;

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Run the command.
    Allowed,
    /// Caller has not linked their account.
    DeniedUnverified,
    /// Shield is on and the command is shield-sensitive.
    DeniedShielded,
    /// Arguments are required; carries the usage hint.
    DeniedMissingArgs(String),
    /// Caller ran a command too recently.
    DeniedCooldown,
    /// Command needs elevated rights the caller lacks.
    DeniedInsufficientPermission,
}

impl AccessDecision {
    /// Whether the command may run.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Short label for logs and counters.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::DeniedUnverified => "unverified",
            Self::DeniedShielded => "shielded",
            Self::DeniedMissingArgs(_) => "missing_args",
            Self::DeniedCooldown => "cooldown",
            Self::DeniedInsufficientPermission => "permission",
        }
    }
}

/// Who is asking, and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Identity checked against the account store.
    pub identity: Identity,
    /// Key used in the cooldown set (a stable member id on the group side).
    pub cooldown_key: String,
    /// Whether the caller holds elevated rights in the group context.
    pub elevated: bool,
}

impl Caller {
    /// A game-side player; never elevated, keyed by name.
    #[must_use]
    pub fn player(name: &str) -> Self {
        Self {
            identity: Identity::player(name),
            cooldown_key: name.to_string(),
            elevated: false,
        }
    }

    /// A group-side member.
    #[must_use]
    pub fn member(tag: &str, id: &str, elevated: bool) -> Self {
        Self {
            identity: Identity::member(tag),
            cooldown_key: id.to_string(),
            elevated,
        }
    }

    fn is_privileged_elevated(&self) -> bool {
        self.elevated && self.identity.origin.is_privileged()
    }
}

/// Sequential verification, shield, argument, permission and cooldown checks.
pub struct AccessGate {
    store: Arc<dyn AccountStore>,
    cooldowns: CooldownSet,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("cooldowns", &self.cooldowns)
            .finish_non_exhaustive()
    }
}

impl AccessGate {
    /// Gate over `store` with its own cooldown set.
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>, cooldowns: CooldownSet) -> Self {
        Self { store, cooldowns }
    }

    /// The cooldown set this gate admits into.
    #[must_use]
    pub fn cooldowns(&self) -> &CooldownSet {
        &self.cooldowns
    }

    /// Evaluate one command for one caller.
    ///
    /// A caller admitted past the cooldown check is inserted into the cooldown
    /// set before `Allowed` is returned.
    ///
    /// # Errors
    /// Returns an error if the account store cannot be read.
    pub fn evaluate(
        &self,
        descriptor: &CommandDescriptor,
        args: &str,
        caller: &Caller,
        prefix: &str,
    ) -> Result<AccessDecision> {
        let decision = self.decide(descriptor, args, caller, prefix)?;
        debug!(
            keyword = descriptor.keyword,
            caller = %caller.identity,
            decision = decision.label(),
            "Access evaluated"
        );
        Ok(decision)
    }

    fn decide(
        &self,
        descriptor: &CommandDescriptor,
        args: &str,
        caller: &Caller,
        prefix: &str,
    ) -> Result<AccessDecision> {
        let bypass = caller.is_privileged_elevated();

        if descriptor.requires_verification && !bypass && !self.store.is_verified(&caller.identity)? {
            return Ok(AccessDecision::DeniedUnverified);
        }

        if descriptor.blocked_by_shield && self.store.is_shield_active()? {
            return Ok(AccessDecision::DeniedShielded);
        }

        if descriptor.requires_args && args.trim().is_empty() {
            return Ok(AccessDecision::DeniedMissingArgs(descriptor.usage(prefix)));
        }

        if caller.identity.origin.is_privileged() && !caller.elevated {
            if descriptor.requires_elevated_permission {
                return Ok(AccessDecision::DeniedInsufficientPermission);
            }
            if descriptor.applies_cooldown && !self.cooldowns.try_admit(&caller.cooldown_key) {
                return Ok(AccessDecision::DeniedCooldown);
            }
        }

        Ok(AccessDecision::Allowed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::registry::CommandKind;
    use crate::store::MemoryAccountStore;

    fn gate_with(store: Arc<MemoryAccountStore>) -> AccessGate {
        AccessGate::new(store, CooldownSet::new(Duration::from_secs(10)))
    }

    #[tokio::test(start_paused = true)]
    async fn verified_member_admitted_then_cooled_down() {
        let store = Arc::new(MemoryAccountStore::new());
        store.insert_verified("alice#0001", "Alice");
        let gate = gate_with(store);
        let alice = Caller::member("alice#0001", "100", false);
        let ftop = CommandKind::Ftop.descriptor();

        assert_eq!(gate.evaluate(&ftop, "", &alice, "!").expect("eval"), AccessDecision::Allowed);
        assert!(gate.cooldowns().contains("100"));
        assert_eq!(
            gate.evaluate(&ftop, "", &alice, "!").expect("eval"),
            AccessDecision::DeniedCooldown
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unverified_beats_every_other_denial() {
        let store = Arc::new(MemoryAccountStore::new());
        store.set_shield(true).expect("shield");
        let gate = gate_with(store);
        let stranger = Caller::member("eve#6666", "666", false);

        for kind in [CommandKind::Say, CommandKind::Shield, CommandKind::Ftop] {
            assert_eq!(
                gate.evaluate(&kind.descriptor(), "", &stranger, "!").expect("eval"),
                AccessDecision::DeniedUnverified
            );
        }
        assert!(gate.cooldowns().is_empty(), "denied callers are never admitted");
    }

    #[tokio::test(start_paused = true)]
    async fn verify_is_exempt_but_still_needs_args() {
        let gate = gate_with(Arc::new(MemoryAccountStore::new()));
        let stranger = Caller::member("eve#6666", "666", false);
        let verify = CommandKind::Verify.descriptor();

        assert_eq!(
            gate.evaluate(&verify, "  ", &stranger, "!").expect("eval"),
            AccessDecision::DeniedMissingArgs("!verify <player>".into())
        );
        assert_eq!(
            gate.evaluate(&verify, "Eve", &stranger, "!").expect("eval"),
            AccessDecision::Allowed
        );
        assert!(!gate.cooldowns().contains("666"), "exempt commands skip the cooldown");
    }

    #[tokio::test(start_paused = true)]
    async fn shield_checked_before_arguments() {
        let store = Arc::new(MemoryAccountStore::new());
        store.insert_verified("bob#0002", "Bob");
        store.set_shield(true).expect("shield");
        let gate = gate_with(store);

        assert_eq!(
            gate.evaluate(&CommandKind::Checked.descriptor(), "", &Caller::player("bob"), "!")
                .expect("eval"),
            AccessDecision::DeniedShielded
        );
    }

    #[tokio::test(start_paused = true)]
    async fn permission_checked_before_cooldown() {
        let store = Arc::new(MemoryAccountStore::new());
        store.insert_verified("alice#0001", "Alice");
        let gate = gate_with(store);
        let alice = Caller::member("alice#0001", "100", false);

        assert_eq!(
            gate.evaluate(&CommandKind::Shield.descriptor(), "on", &alice, "!").expect("eval"),
            AccessDecision::DeniedInsufficientPermission
        );
        assert!(!gate.cooldowns().contains("100"));
    }

    #[tokio::test(start_paused = true)]
    async fn elevated_members_bypass_verification_and_cooldown() {
        let gate = gate_with(Arc::new(MemoryAccountStore::new()));
        let admin = Caller::member("root#0000", "1", true);
        let say = CommandKind::Say.descriptor();

        for _ in 0..3 {
            assert_eq!(
                gate.evaluate(&say, "hello", &admin, "!").expect("eval"),
                AccessDecision::Allowed
            );
        }
        assert!(gate.cooldowns().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn game_side_has_no_cooldown() {
        let store = Arc::new(MemoryAccountStore::new());
        store.insert_verified("bob#0002", "Bob");
        let gate = gate_with(store);
        let bob = Caller::player("Bob");
        let checked = CommandKind::Checked.descriptor();

        for _ in 0..3 {
            assert_eq!(
                gate.evaluate(&checked, "walls", &bob, "!").expect("eval"),
                AccessDecision::Allowed
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_expires_after_ttl() {
        let store = Arc::new(MemoryAccountStore::new());
        store.insert_verified("alice#0001", "Alice");
        let gate = gate_with(store);
        let alice = Caller::member("alice#0001", "100", false);
        let flist = CommandKind::Flist.descriptor();

        assert!(gate.evaluate(&flist, "", &alice, "!").expect("eval").is_allowed());
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(gate.evaluate(&flist, "", &alice, "!").expect("eval").is_allowed());
        assert_eq!(
            gate.evaluate(&flist, "", &alice, "!").expect("eval"),
            AccessDecision::DeniedCooldown
        );
    }
}
