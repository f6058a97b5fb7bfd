//! Snail: grazes surface biomass and composts it into the soil beneath.

use rand::seq::SliceRandom;

use crate::api::{SandApi, CARDINALS};
use crate::cell::{named, Species};
use crate::elements::{activity_due, is_solid, Trail};
use crate::error::FormatError;
use crate::persist::{FieldReader, FieldWriter, Persist};

pub const ACTIVITY_INTERVAL: u64 = 12;
/// Activity ticks spent idle before moving on.
pub const IDLE_TICKS: u32 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SnailPhase {
    #[default]
    Falling,
    Idle,
    Moving,
}

named!(SnailPhase {
    Falling => "Falling",
    Idle => "Idle",
    Moving => "Moving",
});

#[derive(Clone, PartialEq, Debug, Default)]
pub struct SnailState {
    pub phase: SnailPhase,
    pub last_activity: u64,
    pub idle_ticks: u32,
    /// Eaten but not yet composted.
    pub nutrient_buffer: f32,
    pub wetness_buffer: f32,
    pub history: Trail,
}

impl Persist for SnailState {
    fn write(&self, out: &mut FieldWriter) {
        out.value(self.phase.name())
            .value(self.last_activity)
            .value(self.idle_ticks)
            .value(self.nutrient_buffer)
            .value(self.wetness_buffer)
            .coords(self.history.cells());
    }

    fn read(input: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            phase: input.name(SnailPhase::from_name)?,
            last_activity: input.parse()?,
            idle_ticks: input.parse()?,
            nutrient_buffer: input.parse()?,
            wetness_buffer: input.parse()?,
            history: Trail::from_cells(input.coords()?),
        })
    }
}

pub fn update_snail(api: &mut SandApi) {
    let Some(mut snail) = api.my_state::<SnailState>() else {
        return;
    };
    if !activity_due(&mut snail.last_activity, api.tick, ACTIVITY_INTERVAL) {
        api.set_my_state(snail);
        return;
    }

    if snail.phase != SnailPhase::Falling && graze(api, &mut snail) {
        api.set_my_state(snail);
        return;
    }
    compost(api, &mut snail);

    match snail.phase {
        SnailPhase::Falling => {
            let sinks = api.in_bounds(0, 1)
                && matches!(api.live_species(0, 1), None | Some(Species::Water));
            if sinks {
                api.swap_with(0, 1);
            } else {
                snail.phase = SnailPhase::Idle;
                snail.idle_ticks = 0;
            }
        }
        SnailPhase::Idle => {
            snail.idle_ticks += 1;
            if snail.idle_ticks >= IDLE_TICKS {
                snail.phase = SnailPhase::Moving;
                snail.idle_ticks = 0;
            }
        }
        SnailPhase::Moving => {
            if !supported(api) {
                snail.phase = SnailPhase::Falling;
            } else if !crawl(api, &mut snail) {
                snail.phase = SnailPhase::Idle;
            }
        }
    }
    api.set_my_state(snail);
}

/// Eat one adjacent patch of surface biomass, taking its cell.
fn graze(api: &mut SandApi, snail: &mut SnailState) -> bool {
    let Some((dx, dy)) = CARDINALS
        .into_iter()
        .find(|&(dx, dy)| api.live_species(dx, dy) == Some(Species::SurfBiomass))
    else {
        return false;
    };
    let Some(food) = api.live(dx, dy) else {
        return false;
    };
    snail.nutrient_buffer += food.nutrient().unwrap_or(0.0);
    snail.wetness_buffer += food.wetness();
    snail.history.push((api.x, api.y));
    api.relocate(dx, dy, None);
    true
}

/// Empty the buffers into the soil directly below, as far as it takes them.
fn compost(api: &mut SandApi, snail: &mut SnailState) {
    let Some(soil) = api.live_mut(0, 1).filter(|e| e.species() == Species::Soil) else {
        return;
    };
    if let Some(n) = soil.nutrient_mut() {
        *n += snail.nutrient_buffer;
        snail.nutrient_buffer = 0.0;
    }
    let moved = snail.wetness_buffer.min(soil.wetness_room());
    soil.set_wetness(soil.wetness() + moved);
    snail.wetness_buffer -= moved;
}

fn supported(api: &SandApi) -> bool {
    CARDINALS
        .iter()
        .any(|&(dx, dy)| api.live_species(dx, dy).is_some_and(is_solid))
}

/// Step into a free cell that has solid ground under it, avoiding the cells
/// visited most recently.
fn crawl(api: &mut SandApi, snail: &mut SnailState) -> bool {
    let mut directions = CARDINALS;
    directions.shuffle(api.rng());
    let (x, y) = (api.x, api.y);
    let target = directions.into_iter().find(|&(dx, dy)| {
        let ground = (dx, dy + 1) != (0, 0)
            && api
                .live_species(dx, dy + 1)
                .is_some_and(|s| s != Species::Water && is_solid(s));
        api.is_empty(dx, dy) && ground && !snail.history.contains((x + dx, y + dy))
    });
    let Some((dx, dy)) = target else {
        return false;
    };
    snail.history.push((x, y));
    api.swap_with(dx, dy);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::World;

    fn snail_at(world: &World, x: i32, y: i32) -> SnailState {
        world
            .element_at(x, y)
            .and_then(|e| e.state::<SnailState>())
            .cloned()
            .unwrap()
    }

    #[test]
    fn snail_falls_then_settles() {
        let mut world = World::with_seed(1, 3, 0);
        world.place_element(0, 2, "Sand", None).unwrap();
        world.place_element(0, 0, "Snail", None).unwrap();
        for _ in 0..=ACTIVITY_INTERVAL {
            world.step();
        }
        assert_eq!(snail_at(&world, 0, 1).phase, SnailPhase::Falling);
        for _ in 0..ACTIVITY_INTERVAL {
            world.step();
        }
        assert_eq!(snail_at(&world, 0, 1).phase, SnailPhase::Idle);
    }

    #[test]
    fn snail_eats_surface_biomass() {
        let mut world = World::with_seed(3, 2, 0);
        for x in 0..3 {
            world.place_element(x, 1, "Sand", None).unwrap();
        }
        world.place_element(0, 0, "Snail", Some("0;0;0;Idle;0;0;0;0;_")).unwrap();
        world
            .place_element(1, 0, "SurfBiomass", Some("0;0;0.5;2"))
            .unwrap();
        let before = (world.total_nutrient(), world.total_wetness());
        for _ in 0..=ACTIVITY_INTERVAL {
            world.step();
        }
        let snail = snail_at(&world, 1, 0);
        assert_eq!(snail.nutrient_buffer, 2.0);
        assert_eq!(snail.wetness_buffer, 0.5);
        assert_eq!(world.species_at(0, 0), None);
        assert!((world.total_nutrient() - before.0).abs() < 1e-6);
        assert!((world.total_wetness() - before.1).abs() < 1e-6);
    }

    #[test]
    fn snail_composts_into_soil() {
        let mut world = World::with_seed(1, 2, 0);
        world.place_element(0, 1, "Soil", Some("0;0;0.25;1")).unwrap();
        world
            .place_element(0, 0, "Snail", Some("0;0;0;Idle;0;0;3;0.5;_"))
            .unwrap();
        for _ in 0..=ACTIVITY_INTERVAL {
            world.step();
        }
        let soil = world.element_at(0, 1).unwrap();
        assert_eq!(soil.nutrient(), Some(4.0));
        assert_eq!(soil.wetness(), 0.75);
        let snail = snail_at(&world, 0, 0);
        assert_eq!(snail.nutrient_buffer, 0.0);
        assert_eq!(snail.wetness_buffer, 0.0);
    }

    #[test]
    fn moving_snail_crawls_along_the_floor() {
        let mut world = World::with_seed(5, 2, 4);
        for x in 0..5 {
            world.place_element(x, 1, "Sand", None).unwrap();
        }
        world
            .place_element(2, 0, "Snail", Some("0;0;0;Moving;0;0;0;0;_"))
            .unwrap();
        for _ in 0..=ACTIVITY_INTERVAL {
            world.step();
        }
        assert_eq!(world.species_at(2, 0), None);
        let x = if world.species_at(1, 0).is_some() { 1 } else { 3 };
        assert!(snail_at(&world, x, 0).history.contains((2, 0)));
    }

    #[test]
    fn unsupported_snail_starts_falling() {
        let mut world = World::with_seed(3, 3, 0);
        world
            .place_element(1, 0, "Snail", Some("0;0;0;Moving;0;0;0;0;_"))
            .unwrap();
        for _ in 0..=ACTIVITY_INTERVAL {
            world.step();
        }
        assert_eq!(snail_at(&world, 1, 0).phase, SnailPhase::Falling);
    }
}
