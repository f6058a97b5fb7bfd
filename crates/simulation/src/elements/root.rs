//! Root: drinks from the surrounding soil, feeds its seed and branches out.

use rand::seq::SliceRandom;

use crate::api::{SandApi, CARDINALS, NEIGHBORS};
use crate::cell::{Element, Species};
use crate::elements::seed::{self, Lineage};
use crate::elements::{give_nutrient, give_wetness};
use crate::error::FormatError;
use crate::persist::{FieldReader, FieldWriter, Persist};

pub const ABSORB_INTERVAL: u32 = 60;
/// Most nutrient a single soil cell is drawn on per absorption.
pub const MAX_DRAW: f32 = 10.0;
/// Fraction of a soil cell's resources taken per absorption.
pub const DRAW_SHARE: f32 = 0.25;
/// Per-tick cap on resources passed up to the seed.
pub const FEED_RATE: f32 = 0.1;
/// Nutrient a root hands to each branch it grows.
pub const BRANCH_COST: f32 = 0.5;
/// A new root may touch at most this many roots.
pub const MAX_CROWD: usize = 2;
pub const WITHER_CHANCE: f32 = 0.01;

const BRANCH_DIRECTIONS: [(i32, i32); 5] = [(0, 1), (-1, 1), (1, 1), (-1, 0), (1, 0)];

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct RootState {
    /// Cell of the seed this root belongs to.
    pub parent: (i32, i32),
    pub nutrient: f32,
    pub dying: bool,
    pub absorb_timer: u32,
}

impl RootState {
    /// A root replacing `soil`, keeping the soil's resources.
    #[must_use]
    pub fn grown_from(parent: (i32, i32), soil: &Element) -> Element {
        let mut root = Element::new(Species::Root);
        if let Some(state) = root.state_mut::<RootState>() {
            state.parent = parent;
            state.nutrient = soil.nutrient().unwrap_or(0.0);
        }
        root.set_wetness(soil.wetness());
        root
    }
}

impl Persist for RootState {
    fn write(&self, out: &mut FieldWriter) {
        out.coord(self.parent)
            .value(self.nutrient)
            .flag(self.dying)
            .value(self.absorb_timer);
    }

    fn read(input: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            parent: input.coord()?,
            nutrient: input.parse()?,
            dying: input.flag()?,
            absorb_timer: input.parse()?,
        })
    }
}

pub fn update_root(api: &mut SandApi) {
    let Some(root) = api.my_state::<RootState>() else {
        return;
    };
    if root.dying {
        if api.chance(WITHER_CHANCE) {
            let wetness = api.me().wetness();
            api.replace_me(Element::biomass(false, root.nutrient, wetness));
        }
        return;
    }
    match seed::lineage(api, root.parent) {
        Lineage::Orphaned => {
            let wetness = api.me().wetness();
            api.replace_me(Element::soil(root.nutrient, wetness));
            return;
        }
        Lineage::Withering => {
            api.set_my_state(RootState {
                dying: true,
                ..root
            });
            return;
        }
        Lineage::Alive => {}
    }

    let mut timer = root.absorb_timer + 1;
    if timer >= ABSORB_INTERVAL {
        timer = 0;
        absorb(api);
        branch(api, root.parent);
    }
    let (px, py) = root.parent;
    api.with_cell_at(px, py, |me, seed| {
        give_nutrient(me, seed, FEED_RATE);
        give_wetness(me, seed, FEED_RATE);
    });
    if let Some(state) = api.me_mut().state_mut::<RootState>() {
        state.absorb_timer = timer;
    }
}

/// Draw a share of nutrient and wetness from each cardinal soil neighbour.
fn absorb(api: &mut SandApi) {
    for (dx, dy) in CARDINALS {
        api.with_neighbor(dx, dy, |me, soil| {
            if !soil.species().is_soil() {
                return;
            }
            let available = soil.nutrient().unwrap_or(0.0).min(MAX_DRAW);
            give_nutrient(soil, me, available * DRAW_SHARE);
            let wetness = soil.wetness();
            give_wetness(soil, me, wetness * DRAW_SHARE);
        });
    }
}

/// Grow a new root into adjacent soil, if the seed allows another and the
/// spot is not already crowded with roots.
fn branch(api: &mut SandApi, parent: (i32, i32)) {
    if api.me().nutrient().unwrap_or(0.0) < BRANCH_COST {
        return;
    }
    let room = seed::parent_mut(api, parent)
        .is_some_and(|seed| seed.root_count < seed.max_root_count);
    if !room {
        return;
    }

    let mut directions = BRANCH_DIRECTIONS;
    directions.shuffle(api.rng());
    let (x, y) = (api.x, api.y);
    let spot = directions.into_iter().find(|&(dx, dy)| {
        let (tx, ty) = (x + dx, y + dy);
        let crowd = NEIGHBORS
            .iter()
            .filter(|&&(nx, ny)| api.live_at(tx + nx, ty + ny).is_some_and(|e| e.species() == Species::Root))
            .count();
        api.live_species(dx, dy) == Some(Species::Soil) && crowd <= MAX_CROWD
    });
    let Some((dx, dy)) = spot else {
        return;
    };
    let Some(soil) = api.live(dx, dy) else {
        return;
    };
    let mut child = RootState::grown_from(parent, soil);
    if let Some(n) = child.nutrient_mut() {
        *n += BRANCH_COST;
    }
    api.spawn(dx, dy, child);
    if let Some(n) = api.me_mut().nutrient_mut() {
        *n -= BRANCH_COST;
    }
    if let Some(seed) = seed::parent_mut(api, parent) {
        seed.root_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::seed::SeedState;
    use crate::World;

    /// Seed resting on a root buried in a soil bed.
    fn planted() -> World {
        let mut world = World::with_seed(5, 5, 4);
        for x in 0..5 {
            for y in 2..5 {
                world.put(x, y, Element::soil(2.0, 0.8));
            }
        }
        world
            .place_element(2, 1, "Seed", Some("0;0;0;Seed;10;6;4;0;1;0;0;-1;-1"))
            .unwrap();
        world
            .place_element(2, 2, "Root", Some("0;0;0;2;1;0;0;58"))
            .unwrap();
        world
    }

    #[test]
    fn root_draws_from_soil_and_feeds_the_seed() {
        let mut world = planted();
        let before = world.total_nutrient();
        world.step();
        world.step();
        let seed = world.element_at(2, 1).unwrap();
        assert!(seed.wetness() > 0.0);
        assert!(seed.nutrient().unwrap() > 10.0);
        assert!((world.total_nutrient() - before).abs() < 1e-3);
    }

    #[test]
    fn root_branches_into_soil() {
        let mut world = planted();
        // Enough nutrient to pay for a branch.
        world
            .place_element(2, 2, "Root", Some("0;0;0;2;1;3;0;59"))
            .unwrap();
        world.step();
        let roots = (0..5)
            .flat_map(|x| (0..5).map(move |y| (x, y)))
            .filter(|&(x, y)| world.species_at(x, y) == Some(Species::Root))
            .count();
        assert_eq!(roots, 2);
        let seed = world
            .element_at(2, 1)
            .and_then(|e| e.state::<SeedState>())
            .unwrap();
        assert_eq!(seed.root_count, 2);
    }

    #[test]
    fn orphaned_root_returns_to_soil() {
        let mut world = planted();
        world.remove_element(2, 1);
        world.step();
        let soil = world.element_at(2, 2).unwrap();
        assert_eq!(soil.species(), Species::Soil);
    }

    #[test]
    fn root_of_dying_seed_withers_into_biomass() {
        let mut world = planted();
        world
            .place_element(2, 1, "Seed", Some("0;0;0;Dying;10;6;4;0;1;0;0;-1;-1"))
            .unwrap();
        for _ in 0..1500 {
            world.step();
        }
        let count = |species| {
            (0..5)
                .flat_map(|x| (0..5).map(move |y| (x, y)))
                .filter(|&(x, y)| world.species_at(x, y) == Some(species))
                .count()
        };
        assert_eq!(count(Species::Root), 0);
        assert!(count(Species::Biomass) >= 1);
    }
}
