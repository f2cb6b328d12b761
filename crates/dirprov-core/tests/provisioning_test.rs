#![allow(clippy::unwrap_used)]
// End-to-end tests for the provisioning engine over an in-memory directory.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use secrecy::SecretString;

use dirprov_api::{
    Attributes, DirectoryClient, Error as DirError, MemoryDirectory, Modification, Operation,
};
use dirprov_core::{
    AccountStatus, AliasState, Aliasable, CacheType, CoreError, DomainStatus, DomainType,
    EngineConfig, EntryKind, GroupMember, Nameable, Provisioning,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn engine_with(config: EngineConfig) -> (Arc<MemoryDirectory>, Provisioning) {
    let dir = Arc::new(MemoryDirectory::new());
    let prov = Provisioning::new(dir.clone(), config);
    (dir, prov)
}

fn engine() -> (Arc<MemoryDirectory>, Provisioning) {
    engine_with(EngineConfig::default())
}

fn with_domains(prov: &Provisioning, names: &[&str]) {
    for name in names {
        prov.create_domain(name, DomainType::Local, Attributes::new())
            .unwrap();
    }
}

fn secret(raw: &str) -> SecretString {
    raw.to_string().into()
}

fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}

// ── Naming ──────────────────────────────────────────────────────────

#[test]
fn test_location_is_pure_and_round_trips() {
    let (_dir, prov) = engine();
    let layout = prov.layout();

    let first = layout
        .location_for(EntryKind::Account, "alice", Some("a.com"))
        .unwrap();
    let second = layout
        .location_for(EntryKind::Account, "alice", Some("a.com"))
        .unwrap();
    assert_eq!(first, second);
    insta::assert_snapshot!(first.to_string(), @"uid=alice,ou=people,dc=a,dc=com");
    assert_eq!(layout.address_from_location(&first, None).unwrap(), "alice@a.com");

    let group = layout
        .location_for(EntryKind::DynamicGroup, "team", Some("a.com"))
        .unwrap();
    assert_eq!(
        layout.address_from_location(&group, Some("cn")).unwrap(),
        "team@a.com"
    );
}

// ── Domains and caches ──────────────────────────────────────────────

#[test]
fn test_negative_domain_lookup_is_superseded_by_create() {
    let (_dir, prov) = engine();
    let missing = prov.get_domain_by_name("bogus.com").unwrap_err();
    assert!(missing.is_not_found());

    prov.create_domain("bogus.com", DomainType::Local, Attributes::new())
        .unwrap();
    let found = prov.get_domain_by_name("bogus.com").unwrap();
    assert_eq!(found.name(), "bogus.com");
}

#[test]
fn test_cached_lookups_return_the_same_instance() {
    let (dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let created = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();

    dir.reset_stats();
    let by_name = prov.get_account_by_name("alice@a.com").unwrap();
    let by_id = prov.get_account_by_id(created.id()).unwrap();

    assert!(Arc::ptr_eq(by_name.entry(), created.entry()));
    assert!(Arc::ptr_eq(by_id.entry(), created.entry()));
    assert_eq!(dir.stats().gets, 0, "cache hits must not touch the directory");
}

#[test]
fn test_flush_forces_a_reload() {
    let (dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let created = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();

    prov.flush_cache(CacheType::Account, &["alice@a.com".into()]);
    dir.reset_stats();
    let reloaded = prov.get_account_by_name("alice@a.com").unwrap();

    assert!(!Arc::ptr_eq(reloaded.entry(), created.entry()));
    assert_eq!(reloaded.id(), created.id());
    assert!(dir.stats().gets > 0);
}

#[test]
fn test_uncached_engine_always_reads_the_directory() {
    let (dir, prov) = engine_with(EngineConfig::uncached());
    with_domains(&prov, &["a.com"]);
    prov.create_account("alice@a.com", None, Attributes::new()).unwrap();

    dir.reset_stats();
    prov.get_account_by_name("alice@a.com").unwrap();
    prov.get_account_by_name("alice@a.com").unwrap();
    assert!(dir.stats().gets >= 2);
}

#[test]
fn test_delete_domain_requires_it_to_be_empty() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    let domain = prov.get_domain_by_name("a.com").unwrap();

    assert!(prov.delete_domain(&domain).is_err());

    prov.delete_account(&alice).unwrap();
    prov.delete_domain(&domain).unwrap();
    assert!(prov.get_domain_by_name("a.com").unwrap_err().is_not_found());
}

#[test]
fn test_objects_need_a_local_domain() {
    let (_dir, prov) = engine();
    let err = prov
        .create_account("alice@nowhere.com", None, Attributes::new())
        .unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");
}

// ── Membership ──────────────────────────────────────────────────────

#[test]
fn test_nested_static_and_dynamic_membership() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    let g1 = prov.create_group("g1@a.com", Attributes::new()).unwrap();
    let g2 = prov
        .create_dynamic_group("g2@a.com", None, Attributes::new())
        .unwrap();

    prov.add_group_members(&g1, &["alice@a.com".into()]).unwrap();
    prov.add_group_members(&g2, &["g1@a.com".into()]).unwrap();

    let all = prov.group_membership(&alice, false).unwrap();
    assert_eq!(sorted(all.names()), ["g1@a.com", "g2@a.com"]);
    let via_g1 = all.get(g2.id()).unwrap();
    assert_eq!(via_g1.via.as_ref(), Some(g1.id()));

    let direct = prov.direct_group_membership(&alice).unwrap();
    assert_eq!(direct.names(), ["g1@a.com"]);

    assert_eq!(prov.group_members(&g2).unwrap(), ["g1@a.com"]);
}

#[test]
fn test_membership_cycles_terminate() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    let g1 = prov.create_group("g1@a.com", Attributes::new()).unwrap();
    let g2 = prov.create_group("g2@a.com", Attributes::new()).unwrap();

    prov.add_group_members(&g1, &["alice@a.com".into(), "g2@a.com".into()])
        .unwrap();
    prov.add_group_members(&g2, &["g1@a.com".into()]).unwrap();

    let all = prov.group_membership(&alice, false).unwrap();
    assert_eq!(sorted(all.names()), ["g1@a.com", "g2@a.com"]);
}

#[test]
fn test_membership_follows_member_changes() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    let g1 = prov.create_group("g1@a.com", Attributes::new()).unwrap();

    assert!(prov.group_membership(&alice, false).unwrap().is_empty());
    prov.add_group_members(&g1, &["alice@a.com".into()]).unwrap();
    assert_eq!(prov.group_membership(&alice, false).unwrap().len(), 1);

    prov.remove_group_members(&g1, &["alice@a.com".into()]).unwrap();
    assert!(prov.group_membership(&alice, false).unwrap().is_empty());
}

#[test]
fn test_removing_an_unlisted_static_member_fails() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let g1 = prov.create_group("g1@a.com", Attributes::new()).unwrap();

    let err = prov
        .remove_group_members(&g1, &["nobody@a.com".into()])
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_admin_groups_grant_admin_rights() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    let admins = prov
        .create_group(
            "admins@a.com",
            Attributes::new().with("isAdminGroup", "TRUE"),
        )
        .unwrap();

    assert!(!prov.is_admin(&alice).unwrap());
    prov.add_group_members(&admins, &["alice@a.com".into()]).unwrap();
    assert!(prov.is_admin(&alice).unwrap());
    assert_eq!(prov.group_membership(&alice, true).unwrap().names(), ["admins@a.com"]);
}

// ── Aliases ─────────────────────────────────────────────────────────

#[test]
fn test_alias_add_is_not_repeatable() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();

    prov.add_alias(&alice, "al@a.com").unwrap();
    let err = prov.add_alias(&alice, "al@a.com").unwrap_err();
    assert!(err.is_collision());

    let via_alias = prov.get_account_by_name("al@a.com").unwrap();
    assert_eq!(via_alias.id(), alice.id());
    assert_eq!(
        prov.alias_state("al@a.com").unwrap(),
        AliasState::Bound { target: alice.id().clone() }
    );
}

#[test]
fn test_removing_an_unknown_alias_is_not_found() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();

    let err = prov.remove_alias(Some(&alice), "nope@a.com").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(prov.alias_state("nope@a.com").unwrap(), AliasState::Absent);
}

#[test]
fn test_alias_removal_cleans_up_everywhere() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    let g1 = prov.create_group("g1@a.com", Attributes::new()).unwrap();
    prov.add_alias(&alice, "al@a.com").unwrap();
    prov.add_group_members(&g1, &["al@a.com".into()]).unwrap();
    assert_eq!(prov.group_membership(&alice, false).unwrap().len(), 1);

    let report = prov.remove_alias(Some(&alice), "al@a.com").unwrap();
    assert!(report.is_clean());

    assert_eq!(prov.alias_state("al@a.com").unwrap(), AliasState::Absent);
    assert!(alice.alias_addresses().is_empty());
    assert!(prov.group_members(&g1).unwrap().is_empty());
    assert!(prov.group_membership(&alice, false).unwrap().is_empty());
}

#[test]
fn test_dangling_alias_is_repaired_on_add() {
    let (dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    let bob = prov.create_account("bob@a.com", None, Attributes::new()).unwrap();
    prov.add_alias(&bob, "x@a.com").unwrap();

    // Remove bob behind the engine's back.
    dir.delete(&bob.entry().dn()).unwrap();
    prov.flush_cache(CacheType::All, &[]);

    assert_eq!(
        prov.alias_state("x@a.com").unwrap(),
        AliasState::Dangling { target: Some(bob.id().clone()) }
    );

    prov.add_alias(&alice, "x@a.com").unwrap();
    assert_eq!(
        prov.alias_state("x@a.com").unwrap(),
        AliasState::Bound { target: alice.id().clone() }
    );
}

#[test]
fn test_alias_state_serializes_with_a_tag() {
    let value = serde_json::to_value(AliasState::Absent).unwrap();
    assert_eq!(value, serde_json::json!({ "state": "absent" }));
}

// ── Dynamic groups ──────────────────────────────────────────────────

#[test]
fn test_external_member_blocks_account_creation() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let team = prov
        .create_dynamic_group("team@a.com", None, Attributes::new())
        .unwrap();
    prov.add_group_members(&team, &["ext@a.com".into()]).unwrap();
    assert_eq!(prov.group_members(&team).unwrap(), ["ext@a.com"]);

    let err = prov
        .create_account("ext@a.com", None, Attributes::new())
        .unwrap_err();
    assert!(err.is_collision());
}

#[test]
fn test_alias_becoming_local_leaves_external_lists() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    let team = prov
        .create_dynamic_group("team@a.com", None, Attributes::new())
        .unwrap();
    prov.add_group_members(&team, &["al@a.com".into()]).unwrap();

    prov.add_alias(&alice, "al@a.com").unwrap();
    assert!(prov.group_members(&team).unwrap().is_empty());
}

#[test]
fn test_dynamic_group_delete_strips_back_references() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    let team = prov
        .create_dynamic_group("team@a.com", None, Attributes::new())
        .unwrap();
    prov.add_group_members(&team, &["alice@a.com".into(), "ext@other.com".into()])
        .unwrap();
    assert_eq!(alice.back_reference_ids(), [team.id().clone()]);

    let report = prov.delete_group(&team).unwrap();
    assert!(report.is_clean());

    let alice = prov.get_account_by_name("alice@a.com").unwrap();
    assert!(alice.back_reference_ids().is_empty());
    assert!(prov.group_membership(&alice, false).unwrap().is_empty());
    assert!(prov.get_group_by_name("team@a.com").unwrap_err().is_not_found());
}

#[test]
fn test_dynamic_add_with_a_dangling_alias_is_rejected_whole() {
    let (dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    let bob = prov.create_account("bob@a.com", None, Attributes::new()).unwrap();
    prov.add_alias(&bob, "x@a.com").unwrap();
    let team = prov
        .create_dynamic_group("team@a.com", None, Attributes::new())
        .unwrap();

    // x@a.com is left pointing at nothing.
    dir.delete(&bob.entry().dn()).unwrap();
    prov.flush_cache(CacheType::All, &[]);

    let err = prov
        .add_group_members(&team, &["alice@a.com".into(), "x@a.com".into()])
        .unwrap_err();
    assert!(err.is_collision(), "got {err:?}");

    let alice = prov.get_account_by_name("alice@a.com").unwrap();
    assert!(alice.back_reference_ids().is_empty());
    assert!(prov.group_members(&team).unwrap().is_empty());
}

#[test]
fn test_custom_filter_groups_refuse_member_edits() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    prov.create_account("alice@a.com", None, Attributes::new().with("ou", "sales"))
        .unwrap();
    prov.create_account("bob@a.com", None, Attributes::new()).unwrap();
    let sales = prov
        .create_dynamic_group("sales@a.com", Some("(ou=sales)"), Attributes::new())
        .unwrap();

    assert!(sales.is_custom());
    assert_eq!(prov.group_members(&sales).unwrap(), ["alice@a.com"]);
    let err = prov
        .add_group_members(&sales, &["bob@a.com".into()])
        .unwrap_err();
    assert!(matches!(err, CoreError::Unsupported { .. }), "got {err:?}");
}

// ── Renames ─────────────────────────────────────────────────────────

#[test]
fn test_account_rename_updates_references() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com", "b.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    let g1 = prov.create_group("g1@a.com", Attributes::new()).unwrap();
    prov.add_alias(&alice, "al@a.com").unwrap();
    prov.add_group_members(&g1, &["alice@a.com".into()]).unwrap();

    let report = prov.rename_account(&alice, "alice@b.com").unwrap();
    assert_eq!(report.new_name, "alice@b.com");
    assert!(report.cascade.is_clean());

    assert!(prov.get_account_by_name("alice@a.com").unwrap_err().is_not_found());
    let renamed = prov.get_account_by_name("alice@b.com").unwrap();
    assert_eq!(renamed.id(), alice.id());
    assert_eq!(renamed.alias_addresses(), ["al@b.com"]);
    assert_eq!(prov.group_members(&g1).unwrap(), ["alice@b.com"]);
    assert_eq!(
        prov.alias_state("al@b.com").unwrap(),
        AliasState::Bound { target: alice.id().clone() }
    );
}

#[test]
fn test_rename_to_a_taken_address_collides() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    prov.create_account("bob@a.com", None, Attributes::new()).unwrap();

    let err = prov.rename_account(&alice, "bob@a.com").unwrap_err();
    assert!(err.is_collision());
    assert_eq!(prov.get_account_by_name("alice@a.com").unwrap().id(), alice.id());
}

#[test]
fn test_alias_collision_after_the_move_leaves_caches_coherent() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com", "b.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    prov.add_alias(&alice, "al@a.com").unwrap();
    prov.create_account("al@b.com", None, Attributes::new()).unwrap();

    let err = prov.rename_account(&alice, "alice@b.com").unwrap_err();
    assert!(err.is_collision(), "got {err:?}");

    // The move itself is not rolled back.
    assert!(prov.get_account_by_name("alice@a.com").unwrap_err().is_not_found());
    let moved = prov.get_account_by_name("alice@b.com").unwrap();
    assert_eq!(moved.id(), alice.id());
    assert_eq!(moved.name(), "alice@b.com");
    assert_eq!(
        moved.entry().dn().to_string(),
        "uid=alice,ou=people,dc=b,dc=com"
    );
    prov.modify_account(&moved, &[Modification::replace("description", ["moved"])])
        .unwrap();
    assert_eq!(
        prov.get_account_by_name("alice@b.com")
            .unwrap()
            .entry()
            .attr("description")
            .as_deref(),
        Some("moved")
    );
}

#[test]
fn test_rename_survives_a_failed_group_update() {
    let (dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    let g1 = prov.create_group("g1@a.com", Attributes::new()).unwrap();
    prov.add_group_members(&g1, &["alice@a.com".into()]).unwrap();

    dir.fail_next(
        Operation::Modify,
        "uid=g1,",
        DirError::Unavailable { reason: "replica down".into() },
    );
    let report = prov.rename_account(&alice, "alicia@a.com").unwrap();
    assert_eq!(report.cascade.failed_count(), 1);

    assert_eq!(prov.get_account_by_name("alicia@a.com").unwrap().id(), alice.id());
    // The group still lists the old address.
    let g1 = prov.get_group_by_name("g1@a.com").unwrap();
    assert_eq!(prov.group_members(&g1).unwrap(), ["alice@a.com"]);
}

#[test]
fn test_domain_rename_moves_everything() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com", "c.com"]);
    let domain_id = prov.get_domain_by_name("a.com").unwrap().id().clone();
    let alice = prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    let carol = prov.create_account("carol@c.com", None, Attributes::new()).unwrap();
    let list = prov.create_group("list@c.com", Attributes::new()).unwrap();
    prov.add_alias(&alice, "al@a.com").unwrap();
    prov.add_alias(&carol, "carol@a.com").unwrap();
    prov.add_group_members(&list, &["alice@a.com".into()]).unwrap();

    let report = prov.rename_domain("a.com", "b.com").unwrap();
    assert!(report.cascade.is_clean());

    assert!(prov.get_domain_by_name("a.com").unwrap_err().is_not_found());
    let renamed = prov.get_domain_by_name("b.com").unwrap();
    assert_eq!(renamed.id(), &domain_id);
    assert_eq!(renamed.status(), DomainStatus::Active);
    assert!(renamed.rename_info().is_none());

    assert!(prov.get_account_by_name("alice@a.com").unwrap_err().is_not_found());
    let alice = prov.get_account_by_name("alice@b.com").unwrap();
    assert_eq!(alice.alias_addresses(), ["al@b.com"]);
    assert_eq!(prov.get_account_by_name("al@b.com").unwrap().id(), alice.id());

    let carol = prov.get_account_by_name("carol@c.com").unwrap();
    assert_eq!(carol.alias_addresses(), ["carol@b.com"]);

    let list = prov.get_group_by_name("list@c.com").unwrap();
    assert_eq!(prov.group_members(&list).unwrap(), ["alice@b.com"]);
}

#[test]
fn test_interrupted_domain_rename_resumes() {
    let (dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    prov.create_account("alice@a.com", None, Attributes::new()).unwrap();

    dir.fail_next(
        Operation::Modify,
        "dc=b,dc=com",
        DirError::Unavailable { reason: "replica down".into() },
    );
    let err = prov.rename_domain("a.com", "b.com").unwrap_err();
    assert!(err.is_transient(), "got {err:?}");

    prov.rename_domain("a.com", "b.com").unwrap();
    let domain = prov.get_domain_by_name("b.com").unwrap();
    assert_eq!(domain.status(), DomainStatus::Active);
    assert!(prov.get_account_by_name("alice@b.com").is_ok());
}

#[test]
fn test_domain_rename_onto_an_existing_domain_collides() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com", "b.com"]);

    let err = prov.rename_domain("a.com", "b.com").unwrap_err();
    assert!(err.is_collision());
    assert_eq!(
        prov.get_domain_by_name("a.com").unwrap().status(),
        DomainStatus::Active
    );
}

// ── Authentication ──────────────────────────────────────────────────

#[test]
fn test_failed_logins_lock_the_account() {
    let mut config = EngineConfig::default();
    config.lockout.max_failures = 3;
    let (_dir, prov) = engine_with(config);
    with_domains(&prov, &["a.com"]);
    prov.create_account("alice@a.com", Some(&secret("hunter2")), Attributes::new())
        .unwrap();

    prov.authenticate("alice@a.com", &secret("hunter2")).unwrap();
    for _ in 0..3 {
        let err = prov.authenticate("alice@a.com", &secret("wrong")).unwrap_err();
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    }

    let alice = prov.get_account_by_name("alice@a.com").unwrap();
    assert_eq!(alice.status(), AccountStatus::Lockout);
    assert_eq!(alice.failed_login_count(), 3);
    assert!(prov.authenticate("alice@a.com", &secret("hunter2")).is_err());

    prov.set_account_status(&alice, AccountStatus::Active).unwrap();
    prov.authenticate("alice@a.com", &secret("hunter2")).unwrap();
}

#[test]
fn test_success_resets_the_failure_count() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com"]);
    prov.create_account("alice@a.com", Some(&secret("hunter2")), Attributes::new())
        .unwrap();

    assert!(prov.authenticate("alice@a.com", &secret("nope")).is_err());
    let account = prov.authenticate("alice@a.com", &secret("hunter2")).unwrap();
    assert_eq!(account.failed_login_count(), 0);
}

#[test]
fn test_unknown_accounts_fail_authentication() {
    let (_dir, prov) = engine();
    let err = prov
        .authenticate("ghost@a.com", &secret("x"))
        .unwrap_err();
    assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
}

// ── Search ──────────────────────────────────────────────────────────

#[test]
fn test_search_by_kind_and_domain() {
    let (_dir, prov) = engine();
    with_domains(&prov, &["a.com", "b.com"]);
    prov.create_account("alice@a.com", None, Attributes::new()).unwrap();
    prov.create_account("bob@b.com", None, Attributes::new()).unwrap();
    prov.create_group("g1@a.com", Attributes::new()).unwrap();

    let names: Vec<String> = prov
        .search(&[EntryKind::Account, EntryKind::StaticGroup], Some("a.com"), None)
        .unwrap()
        .iter()
        .map(|e| e.name())
        .collect();
    assert_eq!(names, ["alice@a.com", "g1@a.com"]);
}
