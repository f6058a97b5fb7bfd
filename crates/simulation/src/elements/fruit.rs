//! Fruit dropped by mature plants. Rots on soil unless a fly pollinates it,
//! in which case it may take root as a new seed.

use crate::api::SandApi;
use crate::cell::{Element, Species};
use crate::error::FormatError;
use crate::persist::{FieldReader, FieldWriter, Persist};

/// Ticks a fruit lasts once it rests on soil.
pub const LIFETIME_ON_SOIL: u32 = 18_000;
pub const SEED_CHANCE: f32 = 0.01;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct FruitState {
    pub nutrient: f32,
    pub pollinated: bool,
    pub lifetime_on_soil: u32,
}

impl Default for FruitState {
    fn default() -> Self {
        Self {
            nutrient: 0.0,
            pollinated: false,
            lifetime_on_soil: LIFETIME_ON_SOIL,
        }
    }
}

impl Persist for FruitState {
    fn write(&self, out: &mut FieldWriter) {
        out.value(self.nutrient)
            .flag(self.pollinated)
            .value(self.lifetime_on_soil);
    }

    fn read(input: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            nutrient: input.parse()?,
            pollinated: input.flag()?,
            lifetime_on_soil: input.parse()?,
        })
    }
}

pub fn update_fruit(api: &mut SandApi) {
    let Some(mut fruit) = api.my_state::<FruitState>() else {
        return;
    };
    let on_soil = api.prev_species(0, 1) == Some(Species::Soil);
    if on_soil {
        fruit.lifetime_on_soil = fruit.lifetime_on_soil.saturating_sub(1);
        if fruit.lifetime_on_soil == 0 {
            let wetness = api.me().wetness();
            api.replace_me(Element::biomass(true, fruit.nutrient, wetness));
            return;
        }
        if fruit.pollinated && api.chance(SEED_CHANCE) {
            let seed = api.fresh(Species::Seed);
            api.replace_me(seed);
            return;
        }
    }

    let falls = api.in_bounds(0, 1)
        && match api.live_species(0, 1) {
            None => true,
            Some(below) => below.is_gas() || below.is_liquid(),
        };
    if falls {
        api.swap_with(0, 1);
    }
    api.set_my_state(fruit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::World;

    #[test]
    fn fruit_sinks_through_water() {
        let mut world = World::with_seed(1, 3, 0);
        world.place_element(0, 0, "Fruit", None).unwrap();
        world.place_element(0, 1, "Water", None).unwrap();
        world.step();
        assert_eq!(world.species_at(0, 1), Some(Species::Fruit));
    }

    #[test]
    fn fruit_rots_on_soil() {
        let mut world = World::with_seed(1, 2, 0);
        world.place_element(0, 1, "Soil", None).unwrap();
        world.place_element(0, 0, "Fruit", Some("0;0;0.25;1.5;0;2")).unwrap();
        world.step();
        assert_eq!(world.species_at(0, 0), Some(Species::Fruit));
        world.step();
        let rotten = world.element_at(0, 0).unwrap();
        assert_eq!(rotten.species(), Species::SurfBiomass);
        assert_eq!(rotten.nutrient(), Some(1.5));
        assert_eq!(rotten.wetness(), 0.25);
    }

    #[test]
    fn pollinated_fruit_takes_root() {
        let mut world = World::with_seed(1, 2, 5);
        world.place_element(0, 1, "Soil", None).unwrap();
        world.place_element(0, 0, "Fruit", Some("0;0;0;1;1;18000")).unwrap();
        let seeded = (0..1500).any(|_| {
            world.step();
            world.species_at(0, 0) == Some(Species::Seed)
        });
        assert!(seeded);
    }

    #[test]
    fn unpollinated_fruit_never_seeds() {
        let mut world = World::with_seed(1, 2, 5);
        world.place_element(0, 1, "Soil", None).unwrap();
        world.place_element(0, 0, "Fruit", None).unwrap();
        for _ in 0..500 {
            world.step();
        }
        assert_eq!(world.species_at(0, 0), Some(Species::Fruit));
    }
}
