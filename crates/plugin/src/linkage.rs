use crate::naming::NamingConvention;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::sync::Arc;
use symdex_api::models::{DeclRole, EntityKind, FunctionTraits, LinkageId};
use xxhash_rust::xxh3::Xxh3;

/// How a scope stores its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStorage {
    /// The scope has no members of its own.
    None,
    /// Intrusive singly linked list anchored at the owner (small scopes).
    List,
    /// Ordered B-tree anchored at the owner (large scopes).
    BTree,
}

/// What is known about a binding from one or more observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedState {
    pub role: DeclRole,
    /// Only ever seen through a friend declaration.
    pub friend_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    Keep,
    Update,
}

/// Identity and storage rules of one source language.
///
/// Injected into the index when a linkage is registered; the core never
/// special-cases a language itself.
pub trait LinkageRules: Send + Sync + Debug {
    fn linkage_id(&self) -> LinkageId;

    fn naming_convention(&self) -> Arc<dyn NamingConvention>;

    /// Order of member names inside a scope.
    fn compare_names(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    /// Whether entities of this kind may share a name within one scope.
    fn is_overloadable(&self, kind: EntityKind) -> bool;

    fn supports_templates(&self) -> bool {
        true
    }

    fn supports_kind(&self, _kind: EntityKind) -> bool {
        true
    }

    /// Members of unnamed namespaces are hoisted into the enclosing scope.
    fn skip_unnamed_namespaces(&self) -> bool {
        true
    }

    fn member_storage(&self, kind: EntityKind) -> MemberStorage;

    /// Hash identifying an overload from its canonical parameter type keys.
    fn signature_memento(&self, parameter_keys: &[String], traits: FunctionTraits) -> u64 {
        let mut hasher = Xxh3::new();
        for key in parameter_keys {
            hasher.update(key.as_bytes());
            hasher.update(b",");
        }
        if traits.is_variadic {
            hasher.update(b"...");
        }
        if traits.is_const {
            hasher.update(b"#const");
        }
        hasher.digest()
    }

    /// Decide whether a new observation updates an already stored binding.
    fn merge_decision(&self, stored: ObservedState, incoming: ObservedState) -> MergeDecision {
        if incoming.role == DeclRole::Reference {
            return MergeDecision::Keep;
        }
        if incoming.role == DeclRole::Definition && stored.role != DeclRole::Definition {
            return MergeDecision::Update;
        }
        if stored.friend_only && !incoming.friend_only {
            return MergeDecision::Update;
        }
        if stored.role == DeclRole::Reference {
            return MergeDecision::Update;
        }
        MergeDecision::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::ScopePathConvention;

    #[derive(Debug)]
    struct PlainRules;

    impl LinkageRules for PlainRules {
        fn linkage_id(&self) -> LinkageId {
            LinkageId::new("plain")
        }

        fn naming_convention(&self) -> Arc<dyn NamingConvention> {
            Arc::new(ScopePathConvention::new("."))
        }

        fn is_overloadable(&self, kind: EntityKind) -> bool {
            kind.is_function_like()
        }

        fn member_storage(&self, _kind: EntityKind) -> MemberStorage {
            MemberStorage::List
        }
    }

    fn state(role: DeclRole, friend_only: bool) -> ObservedState {
        ObservedState { role, friend_only }
    }

    #[test]
    fn test_reference_never_updates() {
        let rules = PlainRules;
        for stored in [DeclRole::Reference, DeclRole::Declaration, DeclRole::Definition] {
            assert_eq!(
                rules.merge_decision(state(stored, true), state(DeclRole::Reference, false)),
                MergeDecision::Keep
            );
        }
    }

    #[test]
    fn test_definition_wins_over_declaration() {
        let rules = PlainRules;
        assert_eq!(
            rules.merge_decision(
                state(DeclRole::Declaration, false),
                state(DeclRole::Definition, false)
            ),
            MergeDecision::Update
        );
        assert_eq!(
            rules.merge_decision(
                state(DeclRole::Definition, false),
                state(DeclRole::Definition, false)
            ),
            MergeDecision::Keep
        );
    }

    #[test]
    fn test_member_context_replaces_friend() {
        let rules = PlainRules;
        assert_eq!(
            rules.merge_decision(
                state(DeclRole::Declaration, true),
                state(DeclRole::Declaration, false)
            ),
            MergeDecision::Update
        );
        assert_eq!(
            rules.merge_decision(
                state(DeclRole::Declaration, false),
                state(DeclRole::Declaration, true)
            ),
            MergeDecision::Keep
        );
    }

    #[test]
    fn test_signature_memento_distinguishes_const() {
        let rules = PlainRules;
        let keys = vec!["int".to_string()];
        let plain = rules.signature_memento(&keys, FunctionTraits::default());
        let constant = rules.signature_memento(
            &keys,
            FunctionTraits {
                is_const: true,
                ..Default::default()
            },
        );
        assert_ne!(plain, constant);
        assert_eq!(plain, rules.signature_memento(&keys, FunctionTraits::default()));
    }
}
