use super::*;
use crate::combat::{DamageOutcome, DamageRejection, SlotKey};
use crate::command::Command;
use crate::replication::{FieldFilter, FieldUpdate};
use std::sync::Mutex;

fn committed(event: &BroadcastEvent) -> bool {
    matches!(event, BroadcastEvent::AttackCommitted { .. })
}

fn remaining(authority: &Authority, entity: EntityId) -> f64 {
    authority
        .entity(entity)
        .expect("entity is live")
        .combat
        .ledger()
        .remaining(SlotKey::Attack(0))
}

#[test]
fn test_two_second_cooldown_rejects_at_one_and_accepts_after() {
    let mut authority = authority_with_loadout(
        CharacterVariant::MeleeSingle,
        vec![melee("strike", 10.0, 2.0, Activation::Trigger)],
    );
    let (session, knight) = join(&mut authority, "knight", CharacterVariant::MeleeSingle, -1);
    let press = Command::AttackPrimary { pressed: true, aim: None };

    authority.submit(session, press.clone());
    let at_zero = authority.tick(0.0);
    assert_eq!(count_events(&[at_zero], committed), 1);
    assert_eq!(remaining(&authority, knight), 2.0);

    authority.submit(session, press.clone());
    let at_one = authority.tick(1.0);
    assert_eq!(authority.now(), 1.0);
    assert_eq!(count_events(&[at_one], committed), 0, "ledger still at 1.0");
    assert_eq!(remaining(&authority, knight), 1.0);

    authority.submit(session, press);
    let at_two = authority.tick(1.1);
    assert!((authority.now() - 2.1).abs() < 1e-9);
    assert_eq!(count_events(&[at_two], committed), 1);
    assert_eq!(remaining(&authority, knight), 2.0);
}

#[test]
fn test_teammate_damage_is_rejected_without_events() {
    let mut authority = authority();
    let (_, attacker) = join(&mut authority, "a", CharacterVariant::RangedSingle, 1);
    let (_, mate) = join(&mut authority, "b", CharacterVariant::RangedSingle, 1);
    authority.tick(0.0);

    let outcome = authority.apply_damage(mate, 20.0, attacker);
    assert_eq!(outcome, DamageOutcome::Rejected(DamageRejection::FriendlyFire));

    let output = authority.tick(0.0);
    assert!(health_updates(&output, mate).is_empty());
    assert!(output.events.is_empty());
    assert_eq!(authority.read(mate, FieldKey::CurrentHealth), Some(&FieldValue::Float(100.0)));
}

#[test]
fn test_teammate_inside_a_swing_is_not_hit() {
    let mut authority = authority();
    let (session, knight) = join(&mut authority, "a", CharacterVariant::MeleeSingle, 1);
    let (_, mate) = join(&mut authority, "b", CharacterVariant::MeleeSingle, 1);
    place(&mut authority, knight, Vec2::new(0.0, 0.0));
    place(&mut authority, mate, Vec2::new(1.0, 0.0));
    authority.tick(0.0);

    authority.submit(session, Command::AttackPrimary { pressed: true, aim: None });
    let outputs = run(&mut authority, 30, STEP);

    assert_eq!(count_events(&outputs, committed), 1);
    assert!(outputs.iter().all(|o| health_updates(o, mate).is_empty()));
    assert_eq!(authority.entity(mate).map(|e| e.health.current()), Some(150.0));
}

#[test]
fn test_overkill_clamps_to_zero_with_one_death_and_one_kill() {
    let mut authority = authority();
    let (_, attacker) = join(&mut authority, "a", CharacterVariant::MeleeSingle, 0);
    let (_, target) = join(&mut authority, "t", CharacterVariant::RangedSingle, 1);
    authority.tick(0.0);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    authority.subscribe(FieldFilter::entity(target, FieldKey::CurrentHealth), move |u: &FieldUpdate| {
        sink.lock().expect("lock").push((u.old.clone(), u.new.clone()));
    });

    assert_eq!(authority.apply_damage(target, 150.0, attacker), DamageOutcome::Killed { old: 100.0 });
    assert_eq!(
        authority.apply_damage(target, 150.0, attacker),
        DamageOutcome::Rejected(DamageRejection::UnknownTarget)
    );

    let output = authority.tick(0.0);
    assert_eq!(health_updates(&output, target), vec![FieldValue::Float(0.0)]);
    assert_eq!(
        *seen.lock().expect("lock"),
        vec![(Some(FieldValue::Float(100.0)), FieldValue::Float(0.0))]
    );

    let deaths: Vec<_> = output
        .events
        .iter()
        .filter_map(|e| match e {
            BroadcastEvent::Death { entity, killer, .. } => Some((*entity, *killer)),
            _ => None,
        })
        .collect();
    assert_eq!(deaths, vec![(target, Some(attacker))]);

    let killer = authority.entity(attacker).expect("attacker alive");
    assert_eq!(killer.kills, 1);
    assert_eq!(authority.read(attacker, FieldKey::KillCount), Some(&FieldValue::Int(1)));
    assert_eq!(
        authority.read(attacker, FieldKey::CoinCount),
        Some(&FieldValue::Int(authority.config().kill_reward_coins as i64))
    );
    assert!(authority.entity(target).is_none());
    assert!(authority.read(target, FieldKey::CurrentHealth).is_none());
}
