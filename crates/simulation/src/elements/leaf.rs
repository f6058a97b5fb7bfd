//! Leaf: grows the canopy outward from the seed's first leaf, shares what it
//! gets with the leaves it grew and, on a mature plant, bears fruit.

use rand::seq::SliceRandom;

use crate::api::{SandApi, NEIGHBORS};
use crate::cell::{Element, Species};
use crate::elements::fruit::FruitState;
use crate::elements::seed::{self, Lineage, SeedPhase};
use crate::elements::{give_nutrient, give_wetness};
use crate::error::FormatError;
use crate::persist::{FieldReader, FieldWriter, Persist};

pub const GROW_INTERVAL: u32 = 60;
/// Nutrient handed to every new leaf; also the minimum a leaf needs to grow.
pub const GROWTH_NUTRIENT: f32 = 0.5;
pub const GROWTH_WETNESS: f32 = 0.02;
/// Per-tick cap on what flows into each child leaf.
pub const CHILD_FEED: f32 = 0.05;
/// A new leaf may touch at most this many leaves.
pub const MAX_CROWD: usize = 2;
pub const FRUIT_CHANCE: f32 = 0.005;
pub const FRUIT_COST: f32 = 1.0;
pub const WITHER_CHANCE: f32 = 0.01;

const GROWTH_DIRECTIONS: [(i32, i32); 5] = [(0, -1), (-1, -1), (1, -1), (-1, 0), (1, 0)];

#[derive(Clone, PartialEq, Debug, Default)]
pub struct LeafState {
    /// Cell of the seed this leaf belongs to.
    pub parent: (i32, i32),
    pub nutrient: f32,
    pub dying: bool,
    pub grow_timer: u32,
    /// Leaves this one grew, fed every tick while they last.
    pub children: Vec<(i32, i32)>,
}

impl Persist for LeafState {
    fn write(&self, out: &mut FieldWriter) {
        out.coord(self.parent)
            .value(self.nutrient)
            .flag(self.dying)
            .value(self.grow_timer)
            .coords(&self.children);
    }

    fn read(input: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            parent: input.coord()?,
            nutrient: input.parse()?,
            dying: input.flag()?,
            grow_timer: input.parse()?,
            children: input.coords()?,
        })
    }
}

pub fn update_leaf(api: &mut SandApi) {
    let Some(mut leaf) = api.my_state::<LeafState>() else {
        return;
    };
    if leaf.dying {
        if api.chance(WITHER_CHANCE) {
            let wetness = api.me().wetness();
            api.replace_me(Element::biomass(false, leaf.nutrient, wetness));
        }
        return;
    }
    match seed::lineage(api, leaf.parent) {
        Lineage::Orphaned => {
            let wetness = api.me().wetness();
            api.replace_me(Element::soil(leaf.nutrient, wetness));
            return;
        }
        Lineage::Withering => {
            api.set_my_state(LeafState { dying: true, ..leaf });
            return;
        }
        Lineage::Alive => {}
    }

    feed_children(api, &mut leaf);
    leaf.grow_timer += 1;
    if leaf.grow_timer >= GROW_INTERVAL {
        leaf.grow_timer = 0;
        grow(api, &mut leaf);
    }
    bear_fruit(api, leaf.parent);

    if let Some(state) = api.me_mut().state_mut::<LeafState>() {
        state.grow_timer = leaf.grow_timer;
        state.children = leaf.children;
    }
}

/// Pass resources down the canopy, half the gap at most, bounded per child.
/// Children that are gone or belong to another plant are forgotten.
fn feed_children(api: &mut SandApi, leaf: &mut LeafState) {
    let parent = leaf.parent;
    leaf.children.retain(|&(cx, cy)| {
        api.live_at(cx, cy)
            .and_then(|e| e.state::<LeafState>())
            .is_some_and(|child| child.parent == parent)
    });
    for &(cx, cy) in &leaf.children {
        api.with_cell_at(cx, cy, |me, child| {
            let gap = me.nutrient().unwrap_or(0.0) - child.nutrient().unwrap_or(0.0);
            if gap > 0.0 {
                give_nutrient(me, child, CHILD_FEED.min(gap / 2.0));
            }
            let gap = me.wetness() - child.wetness();
            if gap > 0.0 {
                give_wetness(me, child, CHILD_FEED.min(gap / 2.0));
            }
        });
    }
}

/// Grow one leaf into a free cell around this one, preferring upward spots
/// with few leaves around.
fn grow(api: &mut SandApi, leaf: &mut LeafState) {
    let room = seed::parent_mut(api, leaf.parent).is_some_and(|seed| {
        seed.phase == SeedPhase::Growing && seed.leaf_count < seed.max_leaf_count
    });
    let me = api.me();
    if !room || me.nutrient().unwrap_or(0.0) < GROWTH_NUTRIENT || me.wetness() < GROWTH_WETNESS {
        return;
    }

    let mut directions = GROWTH_DIRECTIONS;
    directions.shuffle(api.rng());
    let (x, y) = (api.x, api.y);
    let view: &SandApi = api;
    let crowd = |dx: i32, dy: i32| {
        NEIGHBORS
            .iter()
            .filter(|&&(nx, ny)| {
                view.live_at(x + dx + nx, y + dy + ny)
                    .is_some_and(|e| e.species() == Species::Leaf)
            })
            .count()
    };
    let spot = directions
        .into_iter()
        .filter(|&(dx, dy)| view.is_empty(dx, dy))
        .map(|(dx, dy)| ((dx, dy), crowd(dx, dy)))
        .filter(|&(_, crowd)| crowd <= MAX_CROWD)
        .max_by_key(|&((dx, dy), crowd)| -2 * dy - dx.abs() - crowd as i32);
    let Some(((dx, dy), _)) = spot else {
        return;
    };

    let mut child = Element::new(Species::Leaf);
    if let Some(state) = child.state_mut::<LeafState>() {
        state.parent = leaf.parent;
        state.nutrient = GROWTH_NUTRIENT;
    }
    child.set_wetness(GROWTH_WETNESS);
    let me = api.me_mut();
    if let Some(n) = me.nutrient_mut() {
        *n -= GROWTH_NUTRIENT;
    }
    me.set_wetness(me.wetness() - GROWTH_WETNESS);
    api.spawn(dx, dy, child);
    leaf.children.push((x + dx, y + dy));
    if let Some(seed) = seed::parent_mut(api, leaf.parent) {
        seed.leaf_count += 1;
    }
}

/// Leaves of a mature plant now and then drop a fruit into the cell below.
fn bear_fruit(api: &mut SandApi, parent: (i32, i32)) {
    let mature = api
        .live_at(parent.0, parent.1)
        .and_then(|e| e.state::<seed::SeedState>())
        .is_some_and(|seed| seed.phase == SeedPhase::Mature);
    if !mature
        || api.me().nutrient().unwrap_or(0.0) < FRUIT_COST
        || !api.is_empty(0, 1)
        || !api.chance(FRUIT_CHANCE)
    {
        return;
    }
    let mut fruit = Element::new(Species::Fruit);
    if let Some(state) = fruit.state_mut::<FruitState>() {
        state.nutrient = FRUIT_COST;
    }
    if let Some(n) = api.me_mut().nutrient_mut() {
        *n -= FRUIT_COST;
    }
    api.spawn(0, 1, fruit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::seed::SeedState;
    use crate::World;

    fn leaf_at(world: &World, x: i32, y: i32) -> LeafState {
        world
            .element_at(x, y)
            .and_then(|e| e.state::<LeafState>())
            .cloned()
            .unwrap()
    }

    /// A growing seed on a soil floor with its first leaf above it.
    fn sprouted(leaf_state: &str) -> World {
        let mut world = World::with_seed(5, 5, 2);
        for x in 0..5 {
            world.place_element(x, 4, "Soil", None).unwrap();
        }
        world
            .place_element(2, 3, "Seed", Some("0;0;0;Growing;10;6;4;1;0;0;0;2;2"))
            .unwrap();
        world.place_element(2, 2, "Leaf", Some(leaf_state)).unwrap();
        world
    }

    #[test]
    fn leaf_grows_upward_for_a_growing_seed() {
        let mut world = sprouted("0;0;0.5;2;3;2;0;59;_");
        world.step();
        assert_eq!(world.species_at(2, 1), Some(Species::Leaf));
        assert_eq!(leaf_at(&world, 2, 1).parent, (2, 3));
        assert_eq!(leaf_at(&world, 2, 2).children, vec![(2, 1)]);
        let seed = world
            .element_at(2, 3)
            .and_then(|e| e.state::<SeedState>())
            .unwrap();
        assert_eq!(seed.leaf_count, 2);
    }

    #[test]
    fn leaf_feeds_its_children() {
        let mut world = sprouted("0;0;0.5;2;3;2;0;0;2:1");
        world.place_element(2, 1, "Leaf", Some("0;0;0;2;3;0;0;0;_")).unwrap();
        let before = world.total_nutrient();
        world.step();
        let child = world.element_at(2, 1).unwrap();
        assert!((child.nutrient().unwrap() - CHILD_FEED).abs() < 1e-6);
        assert!(child.wetness() > 0.0);
        assert!((world.total_nutrient() - before).abs() < 1e-4);
    }

    #[test]
    fn stale_children_are_forgotten() {
        let mut world = sprouted("0;0;0.5;2;3;2;0;0;2:1,9:9");
        world.step();
        assert!(leaf_at(&world, 2, 2).children.is_empty());
    }

    #[test]
    fn orphaned_leaf_returns_to_soil() {
        let mut world = World::with_seed(3, 3, 0);
        world.place_element(1, 1, "Leaf", Some("0;0;0.25;1;2;0.5;0;0;_")).unwrap();
        world.step();
        let soil = world.element_at(1, 1).unwrap();
        assert_eq!(soil.species(), Species::Soil);
        assert_eq!(soil.nutrient(), Some(0.5));
        assert_eq!(soil.wetness(), 0.25);
    }

    #[test]
    fn dying_leaf_withers_into_biomass() {
        let mut world = World::with_seed(1, 1, 0);
        world.place_element(0, 0, "Leaf", Some("0;0;0.5;0;0;0.5;1;0;_")).unwrap();
        for _ in 0..2000 {
            world.step();
        }
        let biomass = world.element_at(0, 0).unwrap();
        assert_eq!(biomass.species(), Species::Biomass);
        assert_eq!(biomass.nutrient(), Some(0.5));
    }

    #[test]
    fn mature_plant_bears_fruit() {
        let mut world = sprouted("0;0;0.5;2;3;2;0;0;1:1");
        world
            .place_element(2, 3, "Seed", Some("0;0;0;Mature;10;6;4;6;0;0;0;2;2"))
            .unwrap();
        world.place_element(1, 1, "Leaf", Some("0;0;0.5;2;3;5;0;0;_")).unwrap();
        let fruit = (0..1500).any(|_| {
            world.step();
            (0..5)
                .flat_map(|x| (0..5).map(move |y| (x, y)))
                .any(|(x, y)| world.species_at(x, y) == Some(Species::Fruit))
        });
        assert!(fruit);
    }
}
