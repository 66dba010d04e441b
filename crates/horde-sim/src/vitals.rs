//! Health, shield and the damage pipeline.
//!
//! Damage always flows shield-first: the shield absorbs what it can, the
//! remainder is taken from health, and the first time health reaches zero
//! the owner is marked dead. Every mutation reports what changed through a
//! [`DamageOutcome`] (or a `bool` for single-value changes) so the caller
//! can raise exactly one notification per change.

use serde::{Deserialize, Serialize};

use crate::config::ShieldConfig;

/// Health record. `current` stays within `[0, max]` and `max >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Health {
    /// Creates a full health record. `max` is raised to at least 1.
    #[must_use]
    pub fn new(max: f32) -> Self {
        let max = sanitize_max(max);
        Self { current: max, max }
    }

    /// Current health.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Current health as a fraction of max (0.0 to 1.0).
    #[must_use]
    pub fn fraction(&self) -> f32 {
        self.current / self.max
    }

    /// Whether health has reached zero.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }

    fn set(&mut self, value: f32) {
        self.current = clamp_value(value, self.max);
    }
}

/// Shield record that absorbs damage before health and recharges after a
/// quiet period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shield {
    current: f32,
    max: f32,
    recharge_delay: f32,
    recharge_rate: f32,
    recharge_enabled: bool,
}

impl Shield {
    /// Creates a full shield from its configuration.
    #[must_use]
    pub fn from_config(config: &ShieldConfig) -> Self {
        let config = config.clone().validated();
        Self {
            current: config.max,
            max: config.max,
            recharge_delay: config.recharge_delay,
            recharge_rate: config.recharge_rate,
            recharge_enabled: config.recharge_enabled,
        }
    }

    /// Current shield value.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Maximum shield value.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Seconds without damage before recharge starts.
    #[must_use]
    pub const fn recharge_delay(&self) -> f32 {
        self.recharge_delay
    }

    /// Whether automatic recharge is enabled.
    #[must_use]
    pub const fn recharge_enabled(&self) -> bool {
        self.recharge_enabled
    }

    /// Toggles automatic recharge.
    pub fn set_recharge_enabled(&mut self, enabled: bool) {
        self.recharge_enabled = enabled;
    }

    /// Absorbs up to `amount`, returning how much was absorbed.
    fn absorb(&mut self, amount: f32) -> f32 {
        let absorbed = self.current.min(amount);
        self.current -= absorbed;
        absorbed
    }
}

/// What a call into the damage pipeline changed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DamageOutcome {
    /// Damage soaked by the shield
    pub absorbed: f32,
    /// Health actually removed
    pub health_lost: f32,
    /// The shield value changed
    pub shield_changed: bool,
    /// The health value changed
    pub health_changed: bool,
    /// This call killed the owner
    pub died: bool,
}

impl DamageOutcome {
    /// True when nothing observable happened.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.shield_changed && !self.health_changed && !self.died
    }
}

/// Health plus optional shield, with the one-shot death guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    health: Health,
    shield: Option<Shield>,
    dead: bool,
    last_damage_time: Option<f64>,
}

impl Vitals {
    /// Creates full vitals.
    #[must_use]
    pub fn new(max_health: f32, shield: Option<&ShieldConfig>) -> Self {
        Self {
            health: Health::new(max_health),
            shield: shield.map(Shield::from_config),
            dead: false,
            last_damage_time: None,
        }
    }

    /// Health record.
    #[must_use]
    pub const fn health(&self) -> &Health {
        &self.health
    }

    /// Shield record, if any.
    #[must_use]
    pub const fn shield(&self) -> Option<&Shield> {
        self.shield.as_ref()
    }

    /// Mutable shield record, if any.
    pub fn shield_mut(&mut self) -> Option<&mut Shield> {
        self.shield.as_mut()
    }

    /// Whether the death notification has already fired.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// Time of the most recent damage, if any was ever taken.
    #[must_use]
    pub const fn last_damage_time(&self) -> Option<f64> {
        self.last_damage_time
    }

    /// Applies `amount` damage at time `now`.
    ///
    /// Negative and NaN amounts are treated as zero. Once dead, every call
    /// is a no-op, so the death flag in the outcome is set at most once over
    /// the lifetime of these vitals.
    pub fn apply_damage(&mut self, amount: f32, now: f64) -> DamageOutcome {
        let mut outcome = DamageOutcome::default();
        if self.dead {
            return outcome;
        }
        let amount = amount.max(0.0);
        if amount > 0.0 {
            self.last_damage_time = Some(now);
        }

        let mut remaining = amount;
        if let Some(shield) = self.shield.as_mut() {
            let absorbed = shield.absorb(amount);
            remaining = amount - absorbed;
            outcome.absorbed = absorbed;
            outcome.shield_changed = absorbed > 0.0;
        }

        if remaining > 0.0 {
            let before = self.health.current;
            self.health.set(before - remaining);
            outcome.health_lost = before - self.health.current;
            outcome.health_changed = true;
        }

        if self.health.is_depleted() {
            self.dead = true;
            outcome.died = true;
        }
        outcome
    }

    /// Restores `amount` health. Returns whether a health change fired.
    ///
    /// Dead owners cannot be healed.
    pub fn heal(&mut self, amount: f32) -> bool {
        if self.dead {
            return false;
        }
        let amount = amount.max(0.0);
        self.health.set(self.health.current + amount);
        true
    }

    /// Overwrites health (and optionally max health). Returns whether a
    /// health change fired. Ignored once dead.
    pub fn set_health(&mut self, value: f32, new_max: Option<f32>) -> bool {
        if self.dead {
            return false;
        }
        if let Some(max) = new_max {
            self.health.max = sanitize_max(max);
        }
        self.health.set(value);
        true
    }

    /// Whether `now` still falls inside the post-damage recharge cooldown.
    #[must_use]
    pub fn in_recharge_cooldown(&self, now: f64) -> bool {
        match (&self.shield, self.last_damage_time) {
            (Some(shield), Some(last)) => now - last < f64::from(shield.recharge_delay()),
            _ => false,
        }
    }

    /// Per-tick shield recharge. Returns whether the shield value changed.
    pub fn recharge_shield(&mut self, now: f64, dt: f32) -> bool {
        if self.dead || self.in_recharge_cooldown(now) {
            return false;
        }
        let Some(shield) = self.shield.as_mut() else {
            return false;
        };
        if !shield.recharge_enabled || shield.current >= shield.max || dt.is_nan() || dt <= 0.0 {
            return false;
        }
        let before = shield.current;
        shield.current = (shield.current + shield.recharge_rate * dt).min(shield.max);
        shield.current != before
    }

    /// Refills the shield instantly. Returns whether the value changed.
    pub fn recharge_shield_full(&mut self) -> bool {
        if self.dead {
            return false;
        }
        match self.shield.as_mut() {
            Some(shield) if shield.current < shield.max => {
                shield.current = shield.max;
                true
            },
            _ => false,
        }
    }
}

fn sanitize_max(max: f32) -> f32 {
    if max.is_finite() {
        max.max(1.0)
    } else {
        1.0
    }
}

fn clamp_value(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn shielded(max_health: f32) -> Vitals {
        Vitals::new(max_health, Some(&ShieldConfig::default()))
    }

    #[test]
    fn test_health_new_clamps_max() {
        assert_eq!(Health::new(0.0).max(), 1.0);
        assert_eq!(Health::new(f32::NAN).max(), 1.0);
        assert_eq!(Health::new(80.0).current(), 80.0);
    }

    #[test]
    fn test_damage_without_shield() {
        let mut vitals = Vitals::new(100.0, None);
        let outcome = vitals.apply_damage(30.0, 1.0);
        assert_eq!(vitals.health().current(), 70.0);
        assert_eq!(outcome.health_lost, 30.0);
        assert!(outcome.health_changed);
        assert!(!outcome.shield_changed);
        assert!(!outcome.died);
    }

    #[test]
    fn test_shield_absorbs_first() {
        let mut vitals = shielded(100.0);
        let outcome = vitals.apply_damage(60.0, 0.0);
        assert_eq!(outcome.absorbed, 50.0);
        assert_eq!(vitals.shield().map(Shield::current), Some(0.0));
        assert_eq!(vitals.health().current(), 90.0);
        assert!(outcome.shield_changed);
        assert!(outcome.health_changed);
    }

    #[test]
    fn test_fully_absorbed_damage_leaves_health() {
        let mut vitals = shielded(100.0);
        let outcome = vitals.apply_damage(20.0, 0.0);
        assert!(outcome.shield_changed);
        assert!(!outcome.health_changed);
        assert_eq!(vitals.health().current(), 100.0);
        assert_eq!(vitals.last_damage_time(), Some(0.0));
    }

    #[test]
    fn test_empty_shield_does_not_notify() {
        let mut vitals = shielded(100.0);
        vitals.apply_damage(50.0, 0.0);
        let outcome = vitals.apply_damage(5.0, 0.5);
        assert!(!outcome.shield_changed);
        assert!(outcome.health_changed);
    }

    #[test]
    fn test_negative_damage_does_not_heal() {
        let mut vitals = Vitals::new(100.0, None);
        vitals.apply_damage(40.0, 0.0);
        let outcome = vitals.apply_damage(-25.0, 1.0);
        assert!(outcome.is_noop());
        assert_eq!(vitals.health().current(), 60.0);
        assert_eq!(vitals.last_damage_time(), Some(0.0));
    }

    #[test]
    fn test_death_fires_once() {
        let mut vitals = Vitals::new(20.0, None);
        let first = vitals.apply_damage(25.0, 0.0);
        assert!(first.died);
        assert_eq!(vitals.health().current(), 0.0);
        assert!(vitals.is_dead());

        for amount in [0.0, 5.0, 100.0] {
            let again = vitals.apply_damage(amount, 1.0);
            assert!(again.is_noop());
        }
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut vitals = Vitals::new(100.0, None);
        vitals.apply_damage(30.0, 0.0);
        assert!(vitals.heal(50.0));
        assert_eq!(vitals.health().current(), 100.0);
        vitals.heal(-10.0);
        assert_eq!(vitals.health().current(), 100.0);
    }

    #[test]
    fn test_heal_does_not_touch_shield() {
        let mut vitals = shielded(100.0);
        vitals.apply_damage(70.0, 0.0);
        vitals.heal(100.0);
        assert_eq!(vitals.shield().map(Shield::current), Some(0.0));
    }

    #[test]
    fn test_dead_cannot_heal() {
        let mut vitals = Vitals::new(10.0, None);
        vitals.apply_damage(10.0, 0.0);
        assert!(!vitals.heal(5.0));
        assert_eq!(vitals.health().current(), 0.0);
    }

    #[test]
    fn test_set_health_with_max() {
        let mut vitals = Vitals::new(100.0, None);
        assert!(vitals.set_health(500.0, Some(200.0)));
        assert_eq!(vitals.health().max(), 200.0);
        assert_eq!(vitals.health().current(), 200.0);
        vitals.set_health(50.0, Some(0.0));
        assert_eq!(vitals.health().max(), 1.0);
        assert_eq!(vitals.health().current(), 1.0);
    }

    #[test]
    fn test_recharge_waits_for_cooldown() {
        let mut vitals = shielded(100.0);
        vitals.apply_damage(60.0, 0.0);

        for t in 1..5 {
            assert!(!vitals.recharge_shield(f64::from(t), 1.0));
        }
        assert!(vitals.recharge_shield(5.0, 1.0));
        assert_eq!(vitals.shield().map(Shield::current), Some(10.0));
    }

    #[test]
    fn test_recharge_scenario() {
        let mut vitals = shielded(100.0);
        vitals.apply_damage(60.0, 0.0);
        assert_eq!(vitals.health().current(), 90.0);

        let mut t = 0.0;
        let mut observed = Vec::new();
        for _ in 0..12 {
            t += 1.0;
            vitals.recharge_shield(t, 1.0);
            observed.push(vitals.shield().map_or(0.0, Shield::current));
        }
        assert_eq!(
            observed,
            vec![0.0, 0.0, 0.0, 0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 50.0, 50.0, 50.0]
        );
        assert_eq!(vitals.health().current(), 90.0);
    }

    #[test]
    fn test_damage_restarts_cooldown() {
        let mut vitals = shielded(100.0);
        vitals.apply_damage(60.0, 0.0);
        assert!(vitals.recharge_shield(6.0, 1.0));
        vitals.apply_damage(5.0, 6.5);
        assert!(vitals.in_recharge_cooldown(7.0));
        assert!(!vitals.recharge_shield(7.0, 1.0));
        assert!(vitals.recharge_shield(11.5, 1.0));
    }

    #[test]
    fn test_recharge_full_at_max_reports_no_change() {
        let mut vitals = shielded(100.0);
        assert!(!vitals.recharge_shield_full());
        assert!(!vitals.recharge_shield(100.0, 1.0));
        vitals.apply_damage(10.0, 0.0);
        assert!(vitals.recharge_shield_full());
        assert_eq!(vitals.shield().map(Shield::current), Some(50.0));
    }

    #[test]
    fn test_recharge_disabled() {
        let mut vitals = shielded(100.0);
        vitals.apply_damage(10.0, 0.0);
        if let Some(shield) = vitals.shield_mut() {
            shield.set_recharge_enabled(false);
        }
        assert!(!vitals.recharge_shield(60.0, 1.0));
    }

    #[test]
    fn test_no_shield_never_recharges() {
        let mut vitals = Vitals::new(100.0, None);
        assert!(!vitals.recharge_shield(10.0, 1.0));
        assert!(!vitals.in_recharge_cooldown(0.0));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Damage(f32),
        Heal(f32),
        Recharge(f32),
        SetHealth(f32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-20.0f32..200.0).prop_map(Op::Damage),
            (-20.0f32..200.0).prop_map(Op::Heal),
            (0.0f32..3.0).prop_map(Op::Recharge),
            (-50.0f32..300.0).prop_map(Op::SetHealth),
        ]
    }

    proptest! {
        #[test]
        fn proptest_single_damage_matches_formula(
            shield in 0.0f32..100.0,
            health in 1.0f32..200.0,
            damage in 0.0f32..400.0,
        ) {
            let config = ShieldConfig { max: shield, ..ShieldConfig::default() };
            let mut vitals = Vitals::new(health, Some(&config));
            vitals.apply_damage(damage, 0.0);

            let shield_after = vitals.shield().map_or(0.0, Shield::current);
            prop_assert!((shield_after - (shield - damage).max(0.0)).abs() < 1.0e-3);
            let expected_health = if damage > shield {
                (health - (damage - shield)).clamp(0.0, health)
            } else {
                health
            };
            prop_assert!((vitals.health().current() - expected_health).abs() < 1.0e-3);
        }

        #[test]
        fn proptest_values_stay_in_bounds(ops in proptest::collection::vec(op_strategy(), 1..60)) {
            let mut vitals = shielded(100.0);
            let mut now = 0.0f64;
            let mut deaths = 0;
            for op in ops {
                now += 0.5;
                match op {
                    Op::Damage(d) => {
                        if vitals.apply_damage(d, now).died {
                            deaths += 1;
                        }
                    },
                    Op::Heal(h) => {
                        vitals.heal(h);
                    },
                    Op::Recharge(dt) => {
                        vitals.recharge_shield(now, dt);
                    },
                    Op::SetHealth(v) => {
                        vitals.set_health(v, None);
                    },
                }
                let health = vitals.health();
                prop_assert!(health.current() >= 0.0 && health.current() <= health.max());
                if let Some(shield) = vitals.shield() {
                    prop_assert!(shield.current() >= 0.0 && shield.current() <= shield.max());
                }
            }
            prop_assert!(deaths <= 1);
            prop_assert_eq!(deaths == 1, vitals.is_dead());
        }
    }
}
