//! Property-based tests for the core invariants.
//!
//! Uses `proptest` to check the classifier, gate and cooldown set under
//! arbitrary input rather than hand-picked lines.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use chatbridge_core::classifier::{classify, Classification};
use chatbridge_core::{
    AccessDecision, AccessGate, Caller, CommandKind, CommandRegistry, CooldownSet,
    MemoryAccountStore, Origin,
};

fn arb_kind() -> impl Strategy<Value = CommandKind> {
    prop::sample::select(CommandKind::ALL.to_vec())
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn lines_without_prefix_are_chat(line in "[^!][ -~]{0,40}") {
        prop_assert_eq!(classify(&line, "alice", "Bot", "!"), Classification::NotACommand);
    }

    #[test]
    fn own_lines_are_never_commands(line in "[ -~]{0,40}", me in "[A-Za-z0-9_]{3,16}") {
        prop_assert_eq!(classify(&line, &me, &me, "!"), Classification::NotACommand);
    }

    #[test]
    fn keyword_is_lowercase_single_token(keyword in "[A-Za-z]{1,12}", args in "[ -~]{0,30}") {
        let line = format!("!{keyword} {args}");
        let Classification::Classified(cmd) = classify(&line, "alice", "Bot", "!") else {
            return Err(TestCaseError::fail("prefixed word must classify"));
        };
        prop_assert_eq!(cmd.keyword, keyword.to_lowercase());
        prop_assert!(!cmd.args.starts_with(char::is_whitespace));
        prop_assert_eq!(cmd.args.trim_end(), args.trim());
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn unverified_callers_only_reach_exempt_commands(
        kind in arb_kind(),
        args in "[a-z]{0,8}",
        id in "[0-9]{1,6}",
    ) {
        let gate = AccessGate::new(
            Arc::new(MemoryAccountStore::new()),
            CooldownSet::new(Duration::from_secs(10)),
        );
        let descriptor = kind.descriptor();
        let caller = match descriptor.origin {
            Origin::Group => Caller::member("stranger#9999", &id, false),
            Origin::Game => Caller::player("Stranger"),
        };
        let decision = gate.evaluate(&descriptor, &args, &caller, "!").expect("evaluate");
        if descriptor.requires_verification {
            prop_assert_eq!(decision, AccessDecision::DeniedUnverified);
        } else {
            prop_assert_ne!(decision, AccessDecision::DeniedUnverified);
        }
    }

    #[test]
    fn elevated_members_are_never_throttled(kind in arb_kind(), repeats in 1usize..6) {
        let gate = AccessGate::new(
            Arc::new(MemoryAccountStore::new()),
            CooldownSet::new(Duration::from_secs(10)),
        );
        let descriptor = kind.descriptor();
        prop_assume!(descriptor.origin == Origin::Group);
        let admin = Caller::member("admin#0000", "1", true);
        for _ in 0..repeats {
            let decision = gate.evaluate(&descriptor, "arg", &admin, "!").expect("evaluate");
            prop_assert_eq!(decision, AccessDecision::Allowed);
        }
        prop_assert!(gate.cooldowns().is_empty());
    }

    #[test]
    fn cooldown_admits_each_key_once_per_ttl(keys in prop::collection::vec("[a-d]{1,2}", 1..40)) {
        let set = CooldownSet::new(Duration::from_secs(60));
        let mut seen = HashSet::new();
        for key in &keys {
            prop_assert_eq!(set.try_admit(key), seen.insert(key.clone()));
        }
        prop_assert_eq!(set.len(), seen.len());
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn every_kind_is_found_under_its_own_origin(kind in arb_kind()) {
        let registry = CommandRegistry::builtin().expect("builtin");
        let descriptor = kind.descriptor();
        prop_assert_eq!(registry.lookup(descriptor.origin, descriptor.keyword), Some(kind));
        let other = match descriptor.origin {
            Origin::Group => Origin::Game,
            Origin::Game => Origin::Group,
        };
        prop_assert_eq!(registry.lookup(other, descriptor.keyword), None);
    }
}
