//! Fire: ignition, spread to neighbours, burn-out into ash, flame colouring.

use crate::api::{SandApi, CARDINALS};
use crate::cell::{Color, Element, Species};
use crate::elements::liquid;

/// Burn time numerator: a lit element burns for `BURN_TIME / flammability` ticks.
pub const BURN_TIME: f32 = 300.0;
/// Per-tick chance, per unit of flammability, that fire jumps to a neighbour.
pub const SPREAD_RATE: f32 = 0.02;
/// Per-tick chance that fire puffs smoke into an empty neighbour.
pub const SMOKE_CHANCE: f32 = 0.02;

const FLAME: Color = Color::rgb(1.0, 0.35, 0.0);
const EMBER: Color = Color::rgb(1.0, 0.85, 0.1);

/// What happened to an element that was set alight.
#[derive(Debug, PartialEq)]
pub enum Ignition {
    /// Already burning or incombustible.
    Ignored,
    Lit,
    /// Water never burns; it boils into this steam instead.
    Boiled(Element),
}

pub fn ignite(element: &mut Element) -> Ignition {
    if element.species() == Species::Water {
        if let Some(steam) = liquid::evaporated(element) {
            return Ignition::Boiled(steam);
        }
    }
    if element.burning || element.flammability <= 0.0 {
        return Ignition::Ignored;
    }
    element.burning = true;
    element.burning_lifetime = (BURN_TIME / element.flammability).round().max(1.0) as i32;
    Ignition::Lit
}

/// One tick of fire for the element under `api`: spread, smoke, burn-out.
pub fn burn(api: &mut SandApi) {
    if !api.me().burning {
        return;
    }
    for (dx, dy) in CARDINALS {
        if !api.in_bounds(dx, dy) {
            continue;
        }
        match api.live(dx, dy).map(|n| (n.burning, n.flammability)) {
            Some((false, flammability)) if flammability > 0.0 => {
                if api.chance((SPREAD_RATE * flammability).min(1.0)) {
                    if let Some(neighbor) = api.live_mut(dx, dy) {
                        ignite(neighbor);
                    }
                }
            }
            Some(_) => {}
            None => {
                if api.chance(SMOKE_CHANCE) {
                    let smoke = api.fresh(Species::Smoke);
                    api.spawn(dx, dy, smoke);
                }
            }
        }
    }

    let me = api.me_mut();
    me.burning_lifetime -= 1;
    if me.burning_lifetime <= 0 && api.holds_me() {
        api.replace_me(Element::new(Species::Ash));
    }
}

/// Recompute the displayed colour from the base colour captured on first use.
pub fn update_color(element: &mut Element, tick: u64) {
    let base = *element.base_color.get_or_insert(element.color);
    let mut color = base;
    if element.species().is_soil() {
        if let Some(nutrient) = element.nutrient() {
            let shade = (1.0 - 1.0 / (nutrient + 0.001)).clamp(0.15, 0.8);
            color = color.darkened(shade);
        }
    }
    if element.burning {
        let t = tick as f32;
        let flicker = 0.5 + 0.5 * (t * 0.35).sin();
        let flame = FLAME.lerp(EMBER, flicker);
        color = color.lerp(flame, 0.55 + 0.25 * (t * 0.2).sin());
    }
    element.color = color;
}
