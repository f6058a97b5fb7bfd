//! Worm: burrows through soil, carrying the cell it occupies, and turns
//! buried biomass into soil.

use rand::Rng;

use crate::api::SandApi;
use crate::cell::{named, Element, Species};
use crate::elements::activity_due;
use crate::error::FormatError;
use crate::persist::{FieldReader, FieldWriter, Persist};

pub const ACTIVITY_INTERVAL: u64 = 10;
/// Activity ticks before a random turn becomes possible.
pub const DIRECTION_INTERVAL: u32 = 10;
pub const TURN_CHANCE: f32 = 0.3;
/// Activity ticks after hitting an obstacle before turning again.
pub const COOLDOWN: u32 = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum WormPhase {
    #[default]
    Falling,
    Moving,
}

named!(WormPhase {
    Falling => "Falling",
    Moving => "Moving",
});

/// The soil cell a worm is inside of, put back when it moves on.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CarriedSoil {
    pub nutrient: f32,
    pub wetness: f32,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct WormState {
    pub phase: WormPhase,
    pub last_activity: u64,
    pub direction: (i32, i32),
    pub direction_timer: u32,
    pub cooldown: u32,
    /// Wetness from eaten biomass that did not fit into soil yet.
    pub overflow: f32,
    pub carried: Option<CarriedSoil>,
}

impl Default for WormState {
    fn default() -> Self {
        Self {
            phase: WormPhase::Falling,
            last_activity: 0,
            direction: (1, 0),
            direction_timer: 0,
            cooldown: 0,
            overflow: 0.0,
            carried: None,
        }
    }
}

impl Persist for WormState {
    fn write(&self, out: &mut FieldWriter) {
        let carried = self.carried.unwrap_or(CarriedSoil {
            nutrient: 0.0,
            wetness: 0.0,
        });
        out.value(self.phase.name())
            .value(self.last_activity)
            .coord(self.direction)
            .value(self.direction_timer)
            .value(self.cooldown)
            .value(self.overflow)
            .flag(self.carried.is_some())
            .value(carried.nutrient)
            .value(carried.wetness);
    }

    fn read(input: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        let phase = input.name(WormPhase::from_name)?;
        let last_activity = input.parse()?;
        let direction = input.coord()?;
        let direction_timer = input.parse()?;
        let cooldown = input.parse()?;
        let overflow = input.parse()?;
        let carrying = input.flag()?;
        let soil = CarriedSoil {
            nutrient: input.parse()?,
            wetness: input.parse()?,
        };
        Ok(Self {
            phase,
            last_activity,
            direction,
            direction_timer,
            cooldown,
            overflow,
            carried: carrying.then_some(soil),
        })
    }
}

/// New heading, leaning upward.
fn heading(rng: &mut impl Rng) -> (i32, i32) {
    match rng.gen::<f32>() {
        r if r < 0.4 => (0, -1),
        r if r < 0.6 => (-1, 0),
        r if r < 0.8 => (1, 0),
        _ => (0, 1),
    }
}

pub fn update_worm(api: &mut SandApi) {
    let Some(mut worm) = api.my_state::<WormState>() else {
        return;
    };
    if !activity_due(&mut worm.last_activity, api.tick, ACTIVITY_INTERVAL) {
        api.set_my_state(worm);
        return;
    }

    match worm.phase {
        WormPhase::Falling => {
            if api.in_bounds(0, 1) {
                match api.live_species(0, 1) {
                    None | Some(Species::Soil) => burrow(api, &mut worm, 0, 1),
                    Some(Species::Water) => api.swap_with(0, 1),
                    Some(_) => {}
                }
            }
            if worm.carried.is_some() {
                worm.phase = WormPhase::Moving;
            }
        }
        WormPhase::Moving => {
            worm.direction_timer += 1;
            worm.cooldown = worm.cooldown.saturating_sub(1);
            if worm.direction_timer >= DIRECTION_INTERVAL && api.chance(TURN_CHANCE) {
                worm.direction = heading(api.rng());
                worm.direction_timer = 0;
            }
            let (dx, dy) = worm.direction;
            if !advance(api, &mut worm, dx, dy) && worm.cooldown == 0 {
                worm.cooldown = COOLDOWN;
                worm.direction = heading(api.rng());
                worm.direction_timer = 0;
            }
        }
    }
    api.set_my_state(worm);
}

/// Eat biomass or dig into soil in the given direction.
fn advance(api: &mut SandApi, worm: &mut WormState, dx: i32, dy: i32) -> bool {
    if !api.in_bounds(dx, dy) {
        return false;
    }
    match api.live_species(dx, dy) {
        Some(Species::Biomass) => {
            eat(api, worm, dx, dy);
            true
        }
        Some(Species::Soil) => {
            burrow(api, worm, dx, dy);
            true
        }
        _ => false,
    }
}

/// Move into the target cell, dropping the soil we were in and picking up
/// the soil (if any) we move into.
fn burrow(api: &mut SandApi, worm: &mut WormState, dx: i32, dy: i32) {
    let picked = api
        .live(dx, dy)
        .filter(|e| e.species() == Species::Soil)
        .map(|soil| CarriedSoil {
            nutrient: soil.nutrient().unwrap_or(0.0),
            wetness: soil.wetness(),
        });
    let behind = worm.carried.take().map(|soil| drop_soil(worm, soil));
    api.relocate(dx, dy, behind);
    worm.carried = picked;
}

/// Biomass becomes the soil the worm now sits in. Wetness beyond what soil
/// holds goes into the overflow.
fn eat(api: &mut SandApi, worm: &mut WormState, dx: i32, dy: i32) {
    let Some(food) = api.live(dx, dy) else {
        return;
    };
    let nutrient = food.nutrient().unwrap_or(0.0);
    let wetness = food.wetness();
    worm.overflow += (wetness - 1.0).max(0.0);
    let behind = worm.carried.take().map(|soil| drop_soil(worm, soil));
    api.relocate(dx, dy, behind);
    worm.carried = Some(CarriedSoil {
        nutrient,
        wetness: wetness.min(1.0),
    });
}

/// Soil left behind, topped up from the overflow.
fn drop_soil(worm: &mut WormState, soil: CarriedSoil) -> Element {
    let top_up = worm.overflow.min(1.0 - soil.wetness).max(0.0);
    worm.overflow -= top_up;
    Element::soil(soil.nutrient, soil.wetness + top_up)
}
