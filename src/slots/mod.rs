//! Ability hotbar: N slots, each holding an optional shared ability and its
//! own cooldown.
//!
//! Per tick the order is fixed: cooldowns are decremented for every slot
//! first, then trigger requests are processed, so a slot that reaches zero
//! this tick can fire this tick. The slot manager alone assigns cooldowns;
//! abilities never see them.

use bevy::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use crate::abilities::{Ability, AbilityContext, AbilityLibrary, CommandsAbilityContext, SpawnPoint, SpawnTransform};
use crate::config::CombatConfig;
use crate::projectile::ProjectileVisuals;
use crate::rng::CombatRng;
use crate::CombatSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("invalid slot index {index} (slot count {slot_count})")]
    InvalidSlot { index: usize, slot_count: usize },
}

/// Input bound to a slot. Owned by the input layer, never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotBinding {
    Key(KeyCode),
    Mouse(MouseButton),
}

/// Left mouse, then Q E R F T; any further slots are unbound
pub fn default_bindings(slot_count: usize) -> Vec<Option<SlotBinding>> {
    let defaults = [
        SlotBinding::Mouse(MouseButton::Left),
        SlotBinding::Key(KeyCode::KeyQ),
        SlotBinding::Key(KeyCode::KeyE),
        SlotBinding::Key(KeyCode::KeyR),
        SlotBinding::Key(KeyCode::KeyF),
        SlotBinding::Key(KeyCode::KeyT),
    ];
    (0..slot_count).map(|i| defaults.get(i).copied()).collect()
}

/// Whether this process simulates input for the actor. Read once when the
/// slots are built.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalAuthority(pub bool);

impl Default for LocalAuthority {
    fn default() -> Self {
        Self(true)
    }
}

#[derive(Debug, Clone)]
pub struct AbilitySlot {
    pub index: usize,
    pub ability: Option<Arc<Ability>>,
    pub binding: Option<SlotBinding>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cooldown {
    pub remaining: f32,
    pub total: f32,
}

/// One-way notifications for whatever draws the hotbar
pub trait SlotDisplay {
    fn on_slot_assigned(&mut self, index: usize, ability: Option<&Ability>);
    fn on_cooldown_progress(&mut self, index: usize, remaining: f32, total: f32);
    fn on_keys_assigned(&mut self, _bindings: &[Option<SlotBinding>]) {}
}

/// Display that ignores everything
impl SlotDisplay for () {
    fn on_slot_assigned(&mut self, _index: usize, _ability: Option<&Ability>) {}
    fn on_cooldown_progress(&mut self, _index: usize, _remaining: f32, _total: f32) {}
}

#[derive(Component, Debug, Clone)]
pub struct AbilitySlots {
    slots: Vec<AbilitySlot>,
    /// Present only for slots that have fired since their last (un)equip
    cooldowns: HashMap<usize, Cooldown>,
    simulates_input: bool,
}

impl AbilitySlots {
    pub fn new(slot_count: usize, authority: LocalAuthority) -> Self {
        let slots = (0..slot_count)
            .map(|index| AbilitySlot {
                index,
                ability: None,
                binding: None,
            })
            .collect();
        Self {
            slots,
            cooldowns: HashMap::new(),
            simulates_input: authority.0,
        }
    }

    /// Slots filled from the configured loadout with default bindings
    pub fn from_config(config: &CombatConfig, library: &AbilityLibrary, authority: LocalAuthority) -> Self {
        let mut slots = Self::new(config.slot_count, authority);
        let loadout = library.resolve_loadout(&config.loadout);
        let bindings = default_bindings(config.slot_count);
        for (slot, binding) in slots.slots.iter_mut().zip(bindings) {
            slot.binding = binding;
        }
        for (slot, ability) in slots.slots.iter_mut().zip(loadout) {
            slot.ability = ability;
        }
        slots
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn simulates_input(&self) -> bool {
        self.simulates_input
    }

    pub fn slots(&self) -> &[AbilitySlot] {
        &self.slots
    }

    pub fn ability(&self, index: usize) -> Option<&Arc<Ability>> {
        self.slots.get(index).and_then(|s| s.ability.as_ref())
    }

    pub fn cooldown(&self, index: usize) -> Option<Cooldown> {
        self.cooldowns.get(&index).copied()
    }

    pub fn remaining_cooldown(&self, index: usize) -> f32 {
        self.cooldowns.get(&index).map_or(0.0, |c| c.remaining)
    }

    pub fn is_ready(&self, index: usize) -> bool {
        self.ability(index).is_some() && self.remaining_cooldown(index) <= 0.0
    }

    pub fn bindings(&self) -> Vec<Option<SlotBinding>> {
        self.slots.iter().map(|s| s.binding).collect()
    }

    fn check(&self, index: usize) -> Result<(), SlotError> {
        if index >= self.slots.len() {
            return Err(SlotError::InvalidSlot {
                index,
                slot_count: self.slots.len(),
            });
        }
        Ok(())
    }

    pub fn try_equip(
        &mut self,
        index: usize,
        ability: Arc<Ability>,
        display: &mut dyn SlotDisplay,
    ) -> Result<(), SlotError> {
        self.check(index)?;
        display.on_slot_assigned(index, Some(&ability));
        self.slots[index].ability = Some(ability);
        self.cooldowns.remove(&index);
        Ok(())
    }

    /// Equip, logging and ignoring a bad index
    pub fn equip(&mut self, index: usize, ability: Arc<Ability>, display: &mut dyn SlotDisplay) {
        if let Err(err) = self.try_equip(index, ability, display) {
            error!("equip failed: {}", err);
        }
    }

    pub fn try_unequip(&mut self, index: usize, display: &mut dyn SlotDisplay) -> Result<(), SlotError> {
        self.check(index)?;
        self.slots[index].ability = None;
        self.cooldowns.remove(&index);
        display.on_slot_assigned(index, None);
        Ok(())
    }

    pub fn unequip(&mut self, index: usize, display: &mut dyn SlotDisplay) {
        if let Err(err) = self.try_unequip(index, display) {
            error!("unequip failed: {}", err);
        }
    }

    pub fn try_set_binding(&mut self, index: usize, binding: Option<SlotBinding>) -> Result<(), SlotError> {
        self.check(index)?;
        self.slots[index].binding = binding;
        Ok(())
    }

    /// Count every running cooldown down by `dt`, clamped at zero
    pub fn tick(&mut self, dt: f32, display: &mut dyn SlotDisplay) {
        if !self.simulates_input {
            return;
        }
        for index in 0..self.slots.len() {
            let Some(cooldown) = self.cooldowns.get_mut(&index) else {
                continue;
            };
            if cooldown.remaining <= 0.0 {
                continue;
            }
            cooldown.remaining = (cooldown.remaining - dt).max(0.0);
            display.on_cooldown_progress(index, cooldown.remaining, cooldown.total);
        }
    }

    /// Fire the slot's ability if it has one and is off cooldown.
    ///
    /// `Ok(false)` means the request was rejected without side effects.
    pub fn try_trigger(&mut self, index: usize, ctx: &mut dyn AbilityContext) -> Result<bool, SlotError> {
        self.check(index)?;
        if !self.simulates_input {
            return Ok(false);
        }
        let Some(ability) = self.slots[index].ability.clone() else {
            return Ok(false);
        };
        let remaining = self.remaining_cooldown(index);
        if remaining > 0.0 {
            debug!("{} on cooldown ({:.2}s left)", ability.name, remaining);
            return Ok(false);
        }

        ability.trigger(ctx);
        self.cooldowns.insert(
            index,
            Cooldown {
                remaining: ability.base_cooldown,
                total: ability.base_cooldown,
            },
        );
        Ok(true)
    }

    pub fn trigger(&mut self, index: usize, ctx: &mut dyn AbilityContext) -> bool {
        match self.try_trigger(index, ctx) {
            Ok(fired) => fired,
            Err(err) => {
                error!("trigger failed: {}", err);
                false
            }
        }
    }
}

// =====================================================
// ECS surface
// =====================================================

#[derive(Event, Debug, Clone)]
pub struct TriggerSlotRequest {
    pub actor: Entity,
    pub slot: usize,
}

/// Equip a library ability by name, or clear the slot with `None`
#[derive(Event, Debug, Clone)]
pub struct EquipSlotRequest {
    pub actor: Entity,
    pub slot: usize,
    pub ability: Option<String>,
}

#[derive(Event, Debug, Clone, PartialEq)]
pub enum SlotDisplayEvent {
    Assigned {
        actor: Entity,
        index: usize,
        ability: Option<String>,
    },
    CooldownProgress {
        actor: Entity,
        index: usize,
        remaining: f32,
        total: f32,
    },
    KeysAssigned {
        actor: Entity,
        bindings: Vec<Option<SlotBinding>>,
    },
}

/// Forwards display notifications as [`SlotDisplayEvent`]s
pub struct DisplayEvents<'a, 'w> {
    pub actor: Entity,
    pub writer: &'a mut EventWriter<'w, SlotDisplayEvent>,
}

impl SlotDisplay for DisplayEvents<'_, '_> {
    fn on_slot_assigned(&mut self, index: usize, ability: Option<&Ability>) {
        self.writer.send(SlotDisplayEvent::Assigned {
            actor: self.actor,
            index,
            ability: ability.map(|a| a.name.clone()),
        });
    }

    fn on_cooldown_progress(&mut self, index: usize, remaining: f32, total: f32) {
        self.writer.send(SlotDisplayEvent::CooldownProgress {
            actor: self.actor,
            index,
            remaining,
            total,
        });
    }

    fn on_keys_assigned(&mut self, bindings: &[Option<SlotBinding>]) {
        self.writer.send(SlotDisplayEvent::KeysAssigned {
            actor: self.actor,
            bindings: bindings.to_vec(),
        });
    }
}

/// Push the initial hotbar state once for every locally simulated actor
pub fn announce_slots(
    query: Query<(Entity, &AbilitySlots), Added<AbilitySlots>>,
    mut writer: EventWriter<SlotDisplayEvent>,
) {
    for (actor, slots) in &query {
        if !slots.simulates_input() {
            continue;
        }
        let mut display = DisplayEvents {
            actor,
            writer: &mut writer,
        };
        display.on_keys_assigned(&slots.bindings());
        for slot in slots.slots() {
            display.on_slot_assigned(slot.index, slot.ability.as_deref());
        }
    }
}

pub fn apply_equip_requests(
    library: Res<AbilityLibrary>,
    mut requests: EventReader<EquipSlotRequest>,
    mut query: Query<&mut AbilitySlots>,
    mut writer: EventWriter<SlotDisplayEvent>,
) {
    for request in requests.read() {
        let Ok(mut slots) = query.get_mut(request.actor) else {
            warn!("equip request for {:?} which has no ability slots", request.actor);
            continue;
        };
        let mut display = DisplayEvents {
            actor: request.actor,
            writer: &mut writer,
        };
        match request.ability.as_deref() {
            Some(name) => match library.get(name) {
                Some(ability) => slots.equip(request.slot, ability, &mut display),
                None => warn!("unknown ability '{}'", name),
            },
            None => slots.unequip(request.slot, &mut display),
        }
    }
}

pub fn tick_slot_cooldowns(
    time: Res<Time>,
    mut query: Query<(Entity, &mut AbilitySlots)>,
    mut writer: EventWriter<SlotDisplayEvent>,
) {
    let dt = time.delta_secs();
    for (actor, mut slots) in &mut query {
        let mut display = DisplayEvents {
            actor,
            writer: &mut writer,
        };
        slots.tick(dt, &mut display);
    }
}

/// Turn presses of bound keys into trigger requests
pub fn read_slot_input(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mouse: Option<Res<ButtonInput<MouseButton>>>,
    query: Query<(Entity, &AbilitySlots)>,
    mut requests: EventWriter<TriggerSlotRequest>,
) {
    if keys.is_none() && mouse.is_none() {
        return;
    }
    for (actor, slots) in &query {
        if !slots.simulates_input() {
            continue;
        }
        for slot in slots.slots() {
            let pressed = match slot.binding {
                Some(SlotBinding::Key(key)) => keys.as_ref().is_some_and(|k| k.just_pressed(key)),
                Some(SlotBinding::Mouse(button)) => {
                    mouse.as_ref().is_some_and(|m| m.just_pressed(button))
                }
                None => false,
            };
            if pressed {
                requests.send(TriggerSlotRequest {
                    actor,
                    slot: slot.index,
                });
            }
        }
    }
}

pub fn process_trigger_requests(
    mut commands: Commands,
    config: Res<CombatConfig>,
    mut rng: ResMut<CombatRng>,
    visuals: Option<Res<ProjectileVisuals>>,
    mut requests: EventReader<TriggerSlotRequest>,
    mut query: Query<(&mut AbilitySlots, &Transform, Option<&SpawnPoint>)>,
) {
    for request in requests.read() {
        let Ok((mut slots, transform, spawn_point)) = query.get_mut(request.actor) else {
            warn!("trigger request for {:?} which has no ability slots", request.actor);
            continue;
        };
        let mut ctx = CommandsAbilityContext {
            commands: &mut commands,
            caster: request.actor,
            caster_position: transform.translation,
            spawn: SpawnTransform::from_caster(transform, spawn_point),
            rng: &mut *rng,
            projectile_settings: &config.projectile,
            projectile_visuals: visuals.as_deref(),
        };
        slots.trigger(request.slot, &mut ctx);
    }
}

pub struct SlotsPlugin;

impl Plugin for SlotsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CombatConfig>()
            .init_resource::<CombatRng>()
            .init_resource::<AbilityLibrary>()
            .add_event::<TriggerSlotRequest>()
            .add_event::<EquipSlotRequest>()
            .add_event::<SlotDisplayEvent>()
            .add_systems(
                Update,
                (
                    announce_slots,
                    apply_equip_requests,
                    tick_slot_cooldowns,
                    read_slot_input,
                    process_trigger_requests,
                )
                    .chain()
                    .in_set(CombatSet::Slots),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::testing::RecordingContext;
    use crate::abilities::{AbilityKind, FireballParams};

    #[derive(Default)]
    struct RecordingDisplay {
        assigned: Vec<(usize, Option<String>)>,
        progress: Vec<(usize, f32, f32)>,
    }

    impl SlotDisplay for RecordingDisplay {
        fn on_slot_assigned(&mut self, index: usize, ability: Option<&Ability>) {
            self.assigned.push((index, ability.map(|a| a.name.clone())));
        }
        fn on_cooldown_progress(&mut self, index: usize, remaining: f32, total: f32) {
            self.progress.push((index, remaining, total));
        }
    }

    fn fireball(cooldown: f32) -> Arc<Ability> {
        Arc::new(Ability::new(
            "Fireball",
            cooldown,
            AbilityKind::Fireball(FireballParams::default()),
        ))
    }

    fn slots() -> AbilitySlots {
        AbilitySlots::new(6, LocalAuthority(true))
    }

    #[test]
    fn test_trigger_sets_cooldown() {
        let mut slots = slots();
        let mut ctx = RecordingContext::new();
        slots.equip(0, fireball(2.0), &mut ());

        assert!(slots.trigger(0, &mut ctx));
        assert_eq!(slots.remaining_cooldown(0), 2.0);
        assert_eq!(ctx.projectiles.len(), 1);
    }

    #[test]
    fn test_trigger_gated_by_cooldown() {
        let mut slots = slots();
        let mut ctx = RecordingContext::new();
        slots.equip(0, fireball(2.0), &mut ());
        slots.trigger(0, &mut ctx);
        slots.tick(0.5, &mut ());

        assert!(!slots.trigger(0, &mut ctx));
        assert_eq!(ctx.projectiles.len(), 1);
        assert!((slots.remaining_cooldown(0) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_this_tick_fires_this_tick() {
        let mut slots = slots();
        let mut ctx = RecordingContext::new();
        slots.equip(0, fireball(1.0), &mut ());
        slots.trigger(0, &mut ctx);
        slots.tick(1.0, &mut ());
        assert_eq!(slots.remaining_cooldown(0), 0.0);
        assert!(slots.trigger(0, &mut ctx));
        assert_eq!(ctx.projectiles.len(), 2);
    }

    #[test]
    fn test_empty_slot_does_nothing() {
        let mut slots = slots();
        let mut ctx = RecordingContext::new();
        assert!(!slots.trigger(3, &mut ctx));
        assert!(slots.cooldown(3).is_none());
        assert!(ctx.projectiles.is_empty());
    }

    #[test]
    fn test_invalid_index_is_reported_not_fatal() {
        let mut slots = slots();
        let mut ctx = RecordingContext::new();
        assert_eq!(
            slots.try_trigger(6, &mut ctx),
            Err(SlotError::InvalidSlot {
                index: 6,
                slot_count: 6
            })
        );
        assert!(slots.try_equip(99, fireball(1.0), &mut ()).is_err());
        assert!(slots.try_unequip(6, &mut ()).is_err());
        // the logging wrappers swallow it
        slots.equip(99, fireball(1.0), &mut ());
        slots.unequip(99, &mut ());
        assert!(!slots.trigger(99, &mut ctx));
    }

    #[test]
    fn test_unequip_removes_cooldown_entry() {
        let mut slots = slots();
        let mut ctx = RecordingContext::new();
        slots.equip(2, fireball(4.0), &mut ());
        slots.trigger(2, &mut ctx);
        assert!(slots.cooldown(2).is_some());

        slots.unequip(2, &mut ());
        assert!(slots.cooldown(2).is_none());
        assert!(slots.ability(2).is_none());
    }

    #[test]
    fn test_equip_removes_cooldown_entry() {
        let mut slots = slots();
        let mut ctx = RecordingContext::new();
        slots.equip(1, fireball(4.0), &mut ());
        slots.trigger(1, &mut ctx);
        slots.equip(1, fireball(4.0), &mut ());
        assert!(slots.cooldown(1).is_none());
        assert!(slots.is_ready(1));
    }

    #[test]
    fn test_display_notifications() {
        let mut slots = slots();
        let mut display = RecordingDisplay::default();
        let mut ctx = RecordingContext::new();

        slots.equip(0, fireball(1.0), &mut display);
        slots.unequip(4, &mut display);
        assert_eq!(
            display.assigned,
            vec![(0, Some("Fireball".to_string())), (4, None)]
        );

        slots.trigger(0, &mut ctx);
        slots.tick(0.25, &mut display);
        slots.tick(1.0, &mut display);
        slots.tick(1.0, &mut display);
        assert_eq!(display.progress, vec![(0, 0.75, 1.0), (0, 0.0, 1.0)]);
    }

    #[test]
    fn test_without_authority_is_inert() {
        let mut slots = AbilitySlots::new(6, LocalAuthority(false));
        let mut ctx = RecordingContext::new();
        slots.equip(0, fireball(1.0), &mut ());
        assert!(!slots.trigger(0, &mut ctx));
        assert!(ctx.projectiles.is_empty());
    }

    #[test]
    fn test_shared_ability_independent_cooldowns() {
        let mut slots = slots();
        let mut ctx = RecordingContext::new();
        let shared = fireball(3.0);
        slots.equip(0, shared.clone(), &mut ());
        slots.equip(1, shared.clone(), &mut ());
        slots.trigger(0, &mut ctx);
        assert!(slots.is_ready(1));
        assert!(slots.trigger(1, &mut ctx));
        assert_eq!(Arc::strong_count(&shared), 3);
    }

    #[test]
    fn test_from_config() {
        let config = CombatConfig::default();
        let slots = AbilitySlots::from_config(&config, &AbilityLibrary::builtin(), LocalAuthority(true));
        assert_eq!(slots.slot_count(), 6);
        assert_eq!(slots.ability(0).map(|a| a.name.as_str()), Some("Slash"));
        assert_eq!(slots.ability(1).map(|a| a.name.as_str()), Some("Fireball"));
        assert!(slots.ability(5).is_none());
        assert_eq!(
            slots.slots()[1].binding,
            Some(SlotBinding::Key(KeyCode::KeyQ))
        );
    }
}
