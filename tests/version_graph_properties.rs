//! Property-based tests for the version graph and access checks.
//!
//! These tests use proptest to drive documents through random operation
//! sequences and check that the graph invariants hold after every step.

use proptest::prelude::*;

use collabdoc::core::access::has_permission;
use collabdoc::core::graph::{BranchPolicy, Document};
use collabdoc::core::types::{
    BranchName, ContentRef, DocumentId, Permission, PermissionSet, UserId, VersionId,
};
use collabdoc::core::verify::verify;

const NAMES: &[&str] = &["master", "feature", "draft", "review"];

#[derive(Debug, Clone)]
enum Op {
    Save,
    Branch { name: usize, from: Option<u64> },
    Switch { name: usize },
    Merge { name: usize },
}

fn op() -> impl Strategy<Value = Op> {
    let name = 0..NAMES.len();
    prop_oneof![
        3 => Just(Op::Save),
        2 => (name.clone(), prop::option::of(0u64..20)).prop_map(|(name, from)| Op::Branch { name, from }),
        2 => name.clone().prop_map(|name| Op::Switch { name }),
        1 => name.prop_map(|name| Op::Merge { name }),
    ]
}

fn permission() -> impl Strategy<Value = Permission> {
    prop::sample::select(Permission::ALL.to_vec())
}

fn owner() -> UserId {
    UserId::new("owner").unwrap()
}

fn new_doc() -> Document {
    Document::new(DocumentId::generate(), "doc", ContentRef::new("c0"), owner())
}

fn name(i: usize) -> BranchName {
    BranchName::new(NAMES[i]).unwrap()
}

proptest! {
    /// The graph stays valid and the current branch always resolves.
    #[test]
    fn invariants_hold_after_any_sequence(ops in prop::collection::vec(op(), 0..60), overwrite in any::<bool>()) {
        let policy = if overwrite { BranchPolicy::Overwrite } else { BranchPolicy::Reject };
        let mut doc = new_doc();

        for (step, op) in ops.into_iter().enumerate() {
            match op {
                Op::Save => {
                    let before = doc.versions().len();
                    let v = doc.add_version(ContentRef::new(format!("c{step}")), owner(), "save");
                    prop_assert_eq!(doc.versions().len(), before + 1);
                    prop_assert_eq!(doc.current_branch().head(), v.id());
                    prop_assert_eq!(doc.content_ref(), v.content_ref());
                }
                Op::Branch { name: i, from } => {
                    let from = from.map(VersionId::new);
                    let existed = doc.branch(&name(i)).is_some();
                    match doc.create_branch(name(i), from, policy) {
                        Ok(branch) => {
                            prop_assert!(!existed || overwrite);
                            prop_assert_eq!(branch.version_ids().last().copied(), Some(branch.head()));
                        }
                        Err(err) => {
                            let out_of_range = from.is_some_and(|v| doc.version(v).is_none());
                            prop_assert!(out_of_range || (existed && !overwrite), "unexpected {err:?}");
                        }
                    }
                }
                Op::Switch { name: i } => {
                    let target = doc.branch(&name(i)).map(|b| b.head());
                    match doc.switch_branch(&name(i)) {
                        Ok(head) => {
                            prop_assert_eq!(Some(head.id()), target);
                            prop_assert_eq!(doc.current_branch().name(), &name(i));
                        }
                        Err(_) => prop_assert!(target.is_none()),
                    }
                }
                Op::Merge { name: i } => {
                    let before = doc.versions().len();
                    let source = doc.branch(&name(i)).cloned();
                    match doc.merge(&name(i), owner()) {
                        Ok(v) => {
                            let source = source.unwrap();
                            prop_assert_eq!(doc.versions().len(), before + 1);
                            prop_assert_eq!(v.content_ref(), doc.version(source.head()).unwrap().content_ref());
                            if source.name() != doc.current_branch().name() {
                                prop_assert_eq!(doc.branch(&name(i)).unwrap(), &source);
                            }
                        }
                        Err(_) => prop_assert!(source.is_none()),
                    }
                }
            }
            prop_assert!(verify(&doc).is_ok());
            prop_assert!(doc.branch(doc.current_branch().name()).is_some());
        }
    }

    /// Branching from `v` then switching lands on `v`.
    #[test]
    fn create_then_switch_returns_source(saves in 0usize..10, pick in any::<prop::sample::Index>()) {
        let mut doc = new_doc();
        for n in 0..saves {
            doc.add_version(ContentRef::new(format!("c{n}")), owner(), "save");
        }
        let from = VersionId::new(pick.index(doc.versions().len()) as u64);
        let feature = name(1);

        doc.create_branch(feature.clone(), Some(from), BranchPolicy::Reject).unwrap();
        let head = doc.switch_branch(&feature).unwrap();
        prop_assert_eq!(head.id(), from);
    }

    /// A -> B -> A returns to A's head untouched.
    #[test]
    fn switch_round_trip_preserves_head(saves_a in 0usize..5, saves_b in 0usize..5) {
        let mut doc = new_doc();
        for n in 0..saves_a {
            doc.add_version(ContentRef::new(format!("a{n}")), owner(), "a");
        }
        doc.create_branch(name(1), None, BranchPolicy::Reject).unwrap();
        doc.switch_branch(&name(1)).unwrap();
        for n in 0..saves_b {
            doc.add_version(ContentRef::new(format!("b{n}")), owner(), "b");
        }
        let a_head = doc.branch(&BranchName::master()).unwrap().head();

        doc.switch_branch(&BranchName::master()).unwrap();
        doc.switch_branch(&name(1)).unwrap();
        let back = doc.switch_branch(&BranchName::master()).unwrap();
        prop_assert_eq!(back.id(), a_head);
    }

    /// Granting admin never revokes anything.
    #[test]
    fn admin_grant_is_monotonic(grant in prop::collection::btree_set(permission(), 0..3)) {
        let mut doc = new_doc();
        let user = UserId::new("someone").unwrap();
        doc.add_collaborator(user.clone(), grant.iter().copied().collect());
        let before: Vec<bool> = Permission::ALL.iter().map(|p| has_permission(&doc, &user, *p)).collect();

        let mut widened: PermissionSet = grant.iter().copied().collect();
        widened.insert(Permission::Admin);
        doc.add_collaborator(user.clone(), widened);

        for (p, had) in Permission::ALL.iter().zip(before) {
            prop_assert!(has_permission(&doc, &user, *p) || !had);
            prop_assert!(has_permission(&doc, &user, *p));
        }
    }

    /// The owner holds every permission whatever the collaborator list says.
    #[test]
    fn owner_always_has_every_permission(grant in prop::collection::btree_set(permission(), 0..3)) {
        let mut doc = new_doc();
        doc.add_collaborator(owner(), grant.into_iter().collect());
        for p in Permission::ALL {
            prop_assert!(has_permission(&doc, &owner(), p));
        }
    }
}
