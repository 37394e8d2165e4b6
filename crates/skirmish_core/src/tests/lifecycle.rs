use super::*;
use crate::combat::LaunchOrder;
use crate::command::Command;
use crate::error::LifecycleError;

fn respawned(outputs: &[TickOutput]) -> Vec<(SessionId, EntityId, Vec2, u64)> {
    outputs
        .iter()
        .flat_map(|o| o.events.iter())
        .filter_map(|e| match e {
            BroadcastEvent::Respawned {
                session,
                entity,
                position,
                coins,
            } => Some((*session, *entity, *position, *coins)),
            _ => None,
        })
        .collect()
}

fn area_effects(outputs: &[TickOutput]) -> usize {
    count_events(outputs, |e| matches!(e, BroadcastEvent::AreaEffect { .. }))
}

/// Knight on team 0 and archer on team 1.
fn duel(authority: &mut Authority) -> ((SessionId, EntityId), (SessionId, EntityId)) {
    let knight = join(authority, "knight", CharacterVariant::MeleeSingle, 0);
    let archer = join(authority, "archer", CharacterVariant::RangedSingle, 1);
    (knight, archer)
}

#[test]
fn test_respawn_keeps_two_thirds_of_the_wallet_at_the_nearest_point() {
    let mut authority = authority();
    let ((_, knight), (session, archer)) = duel(&mut authority);
    authority.entity_mut(archer).expect("live").coins = 100;
    place(&mut authority, archer, Vec2::new(17.0, 2.0));

    authority.apply_damage(archer, 500.0, knight);
    let death = authority.tick(0.0);
    assert_eq!(count_events(&[death], |e| matches!(e, BroadcastEvent::Despawned { entity } if *entity == archer)), 1);
    assert_eq!(authority.entity_for_session(session), None);
    assert_eq!(authority.pending_respawns(), 1);

    let early = authority.tick(4.9);
    assert!(respawned(&[early]).is_empty());

    let late = authority.tick(0.2);
    let rows = respawned(&[late]);
    assert_eq!(rows.len(), 1);
    let (who, fresh, position, coins) = rows[0];
    assert_eq!(who, session);
    assert_ne!(fresh, archer);
    assert_eq!(position, Vec2::new(20.0, 0.0));
    assert_eq!(coins, 66);

    assert!(authority.entity(archer).is_none());
    assert!(authority.read(archer, FieldKey::CoinCount).is_none());
    assert_eq!(authority.entity_for_session(session), Some(fresh));
    assert_eq!(authority.read(fresh, FieldKey::CoinCount), Some(&FieldValue::Int(66)));
    assert_eq!(authority.read(fresh, FieldKey::CurrentHealth), Some(&FieldValue::Float(100.0)));
    assert_eq!(authority.pending_respawns(), 0);
}

#[test]
fn test_kills_survive_respawn() {
    let mut authority = authority();
    let ((_, knight), (session, archer)) = duel(&mut authority);
    authority.entity_mut(archer).expect("live").kills = 3;

    authority.apply_damage(archer, 500.0, knight);
    authority.tick(authority.config().respawn_delay_secs + 0.1);

    let fresh = authority.entity_for_session(session).expect("respawned");
    assert_eq!(authority.entity(fresh).map(|e| e.kills), Some(3));
    assert_eq!(authority.read(fresh, FieldKey::KillCount), Some(&FieldValue::Int(3)));
}

#[test]
fn test_arrow_landing_after_its_archer_died_credits_the_respawn() {
    let mut authority = authority();
    let ((_, knight), (session, archer)) = duel(&mut authority);
    place(&mut authority, archer, Vec2::ZERO);
    place(&mut authority, knight, Vec2::new(5.0, 0.0));
    authority.entity_mut(archer).expect("live").coins = 30;

    authority
        .launch_projectile(LaunchOrder {
            spawn: Vec2::new(1.0, 0.0),
            direction: Vec2::RIGHT,
            key: ProjectileKey::new("arrow"),
            attacker: archer,
            team: TeamIndex(1),
            damage: 500.0,
        })
        .expect("arrow is registered");
    authority.apply_damage(archer, 500.0, knight);

    let outputs = run(&mut authority, 30, STEP);
    assert_eq!(count_events(&outputs, |e| matches!(e, BroadcastEvent::Death { .. })), 2);
    assert!(authority.entity(knight).is_none(), "the arrow outlived its archer");

    let late = authority.tick(authority.config().respawn_delay_secs);
    let fresh = authority.entity_for_session(session).expect("respawned");
    let rows = respawned(&[late]);
    assert!(rows.iter().any(|(who, _, _, coins)| *who == session && *coins == 19 + 10));
    assert_eq!(authority.entity(fresh).map(|e| e.kills), Some(1));
    assert_eq!(authority.read(fresh, FieldKey::KillCount), Some(&FieldValue::Int(1)));
}

#[test]
fn test_arrow_from_a_previous_life_credits_the_current_entity() {
    let mut authority = authority();
    let ((_, knight), (session, archer)) = duel(&mut authority);
    authority.apply_damage(archer, 500.0, knight);
    authority.tick(authority.config().respawn_delay_secs + 0.1);
    let fresh = authority.entity_for_session(session).expect("respawned");
    place(&mut authority, fresh, Vec2::new(-20.0, 0.0));
    place(&mut authority, knight, Vec2::new(5.0, 0.0));

    // Launched in the name of the archer's first, already despawned life.
    authority.launch_projectile(LaunchOrder {
        spawn: Vec2::new(1.0, 0.0),
        direction: Vec2::RIGHT,
        key: ProjectileKey::new("arrow"),
        attacker: archer,
        team: TeamIndex(1),
        damage: 500.0,
    });
    run(&mut authority, 30, STEP);

    assert!(authority.entity(knight).is_none());
    assert_eq!(authority.entity(fresh).map(|e| e.kills), Some(1));
    assert_eq!(authority.entity(fresh).map(|e| e.coins), Some(10));
}

#[test]
fn test_meteor_lands_after_its_cast_time() {
    let mut authority = authority();
    let (_, knight) = join(&mut authority, "knight", CharacterVariant::MeleeSingle, 0);
    let (session, mage) = join(&mut authority, "mage", CharacterVariant::RangedCaster, 1);
    place(&mut authority, mage, Vec2::ZERO);
    place(&mut authority, knight, Vec2::new(9.0, 0.0));

    authority.submit(session, Command::ChangeAttackSlot { index: 1 });
    authority.submit(session, Command::AttackPrimary { pressed: true, aim: None });
    let commit = authority.tick(0.05);
    assert_eq!(count_events(&[commit], |e| matches!(e, BroadcastEvent::AttackCommitted { slot: 1, .. })), 1);

    let outputs = run(&mut authority, 30, 0.05);
    assert_eq!(area_effects(&outputs), 1);
    assert_eq!(authority.entity(knight).map(|e| e.health.current()), Some(110.0));
}

#[test]
fn test_cast_is_dropped_when_the_caster_dies() {
    let mut authority = authority();
    let (_, knight) = join(&mut authority, "knight", CharacterVariant::MeleeSingle, 0);
    let (session, mage) = join(&mut authority, "mage", CharacterVariant::RangedCaster, 1);
    place(&mut authority, mage, Vec2::ZERO);
    place(&mut authority, knight, Vec2::new(9.0, 0.0));

    authority.submit(session, Command::ChangeAttackSlot { index: 1 });
    authority.submit(session, Command::AttackPrimary { pressed: true, aim: None });
    authority.tick(0.05);

    authority.apply_damage(mage, 500.0, knight);
    let outputs = run(&mut authority, 30, 0.05);
    assert_eq!(area_effects(&outputs), 0);
    assert_eq!(authority.entity(knight).map(|e| e.health.current()), Some(150.0));
}

#[test]
fn test_disconnect_cancels_queued_commands_and_despawns() {
    let mut authority = authority();
    let (session, archer) = join(&mut authority, "archer", CharacterVariant::RangedSingle, -1);
    authority.tick(0.0);

    authority.submit(session, Command::Move { vector: Vec2::RIGHT });
    authority.submit(session, Command::AttackPrimary { pressed: true, aim: None });
    assert_eq!(authority.queued_commands(), 2);

    authority.disconnect(session).expect("registered");
    assert_eq!(authority.queued_commands(), 0);
    assert!(!authority.is_session_registered(session));

    let output = authority.tick(0.05);
    assert_eq!(count_events(&[output.clone()], |e| matches!(e, BroadcastEvent::AttackCommitted { .. })), 0);
    assert_eq!(count_events(&[output], |e| matches!(e, BroadcastEvent::Despawned { entity } if *entity == archer)), 1);
    assert_eq!(authority.entity_count(), 0);
    assert_eq!(authority.projectile_count(), 0);
}

#[test]
fn test_respawn_after_disconnect_is_discarded() {
    let mut authority = authority();
    let ((_, knight), (session, archer)) = duel(&mut authority);

    authority.apply_damage(archer, 500.0, knight);
    authority.tick(0.0);
    authority.disconnect(session).expect("still registered while dead");
    assert_eq!(authority.pending_respawns(), 1);

    let output = authority.tick(authority.config().respawn_delay_secs + 1.0);
    assert!(respawned(&[output]).is_empty());
    assert_eq!(authority.pending_respawns(), 0);
    assert_eq!(authority.entity_count(), 1);
}

#[test]
fn test_rejoin_cancels_the_stale_respawn() {
    let mut authority = authority();
    let ((_, knight), (session, archer)) = duel(&mut authority);

    authority.apply_damage(archer, 500.0, knight);
    authority.tick(0.0);
    authority.disconnect(session).expect("registered");

    let rejoined = authority
        .join(session, SpawnProfile::new("archer", CharacterVariant::RangedSingle, TeamIndex(1)))
        .expect("session is free again");
    assert_eq!(authority.pending_respawns(), 0);

    let output = authority.tick(authority.config().respawn_delay_secs + 1.0);
    assert!(respawned(&[output]).is_empty());
    assert_eq!(authority.entity_for_session(session), Some(rejoined));
    assert_eq!(authority.entity_count(), 2);
}

fn authority_with_only(variant: CharacterVariant) -> Authority {
    let mut registry = AttackRegistry::new();
    registry.register(variant, crate::combat::default_loadout(variant));
    Authority::with_registries(
        CombatConfig::default(),
        Arc::new(registry),
        Arc::new(ProjectileRegistry::with_defaults()),
    )
    .expect("default config is valid")
}

#[test]
fn test_missing_loadout_falls_back_to_the_default_variant() {
    let mut authority = authority_with_only(CharacterVariant::MeleeSingle);
    let (_, entity) = join(&mut authority, "a", CharacterVariant::RangedSingle, -1);
    assert_eq!(authority.entity(entity).map(|e| e.variant()), Some(CharacterVariant::MeleeSingle));
}

#[test]
fn test_join_and_disconnect_report_lifecycle_codes() {
    let mut authority = authority_with_only(CharacterVariant::RangedSingle);

    let session = SessionId::new();
    let err = authority
        .join(session, SpawnProfile::new("m", CharacterVariant::RangedCaster, TeamIndex::NONE))
        .expect_err("neither the mage nor the fallback has a loadout");
    assert_eq!(err, LifecycleError::UnknownVariant(CharacterVariant::RangedCaster));
    assert_eq!(err.code(), "unknown_variant");
    assert!(!authority.is_session_registered(session));

    let (archer_session, _) = join(&mut authority, "a", CharacterVariant::RangedSingle, -1);
    assert_eq!(
        authority.join(archer_session, SpawnProfile::new("a", CharacterVariant::RangedSingle, TeamIndex::NONE)),
        Err(LifecycleError::AlreadyRegistered(archer_session))
    );
    assert_eq!(
        authority.disconnect(session),
        Err(LifecycleError::SessionNotRegistered(session))
    );
}

#[test]
fn test_leaderboard_ranks_kills_then_coins() {
    let mut authority = authority();
    let (_, ada) = join(&mut authority, "ada", CharacterVariant::MeleeSingle, 0);
    let (_, bo) = join(&mut authority, "bo", CharacterVariant::MeleeSingle, 1);
    let (_, cy) = join(&mut authority, "cy", CharacterVariant::RangedSingle, 2);
    authority.entity_mut(bo).expect("live").coins = 50;

    authority.apply_damage(cy, 500.0, ada);
    authority.tick(0.0);

    let names: Vec<String> = authority.leaderboard().into_iter().map(|row| row.name).collect();
    assert_eq!(names, vec!["ada", "bo"]);
}
