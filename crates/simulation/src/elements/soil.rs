//! Soil and ash: nutrient diffusion, wetness seepage, drinking from liquids.

use crate::api::{SandApi, CARDINALS, NEIGHBORS};
use crate::arena::Arena;
use crate::elements::{give_wetness, powder};
use crate::error::FormatError;
use crate::persist::{FieldReader, FieldWriter, Persist};
use crate::Grid;

/// Share of the nutrient difference that crosses each soil pair per tick.
pub const NUTRIENT_SHARE: f32 = 1.0 / 16.0;
/// Soil wetter than this seeps into its neighbours.
pub const WET_SOURCE: f32 = 0.3;
/// Minimum wetness gap for seepage.
pub const WET_GAP: f32 = 0.1;
/// Fraction of the gap that seeps per tick.
pub const WET_FLOW: f32 = 0.2;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct SoilState {
    pub nutrient: f32,
}

impl SoilState {
    /// Ash starts out rich.
    #[must_use]
    pub fn ash() -> Self {
        Self { nutrient: 5.0 }
    }
}

impl Persist for SoilState {
    fn write(&self, out: &mut FieldWriter) {
        out.value(self.nutrient);
    }

    fn read(input: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            nutrient: input.parse()?,
        })
    }
}

/// Exchange nutrient between every pair of 8-adjacent soil cells, all pairs
/// computed from the values at the start of the tick. Runs before any
/// element update.
pub fn diffuse_nutrients(prev: &Grid, arena: &mut Arena) {
    let nutrient_at = |x: i32, y: i32| -> Option<f32> {
        let element = arena.get(prev.get(x, y)?)?;
        if element.species().is_soil() {
            element.nutrient()
        } else {
            None
        }
    };

    let mut deltas = Vec::new();
    for (x, y) in prev.occupied() {
        let Some(mine) = nutrient_at(x, y) else {
            continue;
        };
        let delta: f32 = NEIGHBORS
            .iter()
            .filter_map(|&(dx, dy)| nutrient_at(x + dx, y + dy))
            .map(|theirs| (theirs - mine) * NUTRIENT_SHARE)
            .sum();
        if delta != 0.0 {
            deltas.push(((x, y), delta));
        }
    }

    for ((x, y), delta) in deltas {
        let Some(id) = prev.get(x, y) else {
            continue;
        };
        if let Some(nutrient) = arena.get_mut(id).and_then(|e| e.nutrient_mut()) {
            *nutrient = (*nutrient + delta).max(0.0);
        }
    }
}

pub fn update_soil(api: &mut SandApi) {
    seep(api);
    drink(api);
    powder::fall(api);
}

/// Pass wetness to drier cardinal soil neighbours.
fn seep(api: &mut SandApi) {
    for (dx, dy) in CARDINALS {
        let mine = api.me().wetness();
        if mine <= WET_SOURCE {
            return;
        }
        api.with_neighbor(dx, dy, |me, other| {
            if other.species().is_soil() && mine - other.wetness() > WET_GAP {
                give_wetness(me, other, (mine - other.wetness()) * WET_FLOW);
            }
        });
    }
}

/// Soak up adjacent liquid. A liquid left with no wetness is gone.
fn drink(api: &mut SandApi) {
    for (dx, dy) in CARDINALS {
        if api.me().wetness_room() <= 0.0 {
            return;
        }
        let emptied = api.with_neighbor(dx, dy, |me, other| {
            if !other.species().is_liquid() || other.wetness() <= 0.0 {
                return false;
            }
            give_wetness(other, me, other.wetness());
            other.wetness() <= 0.0
        });
        if emptied == Some(true) {
            api.clear(dx, dy);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cell::{Element, Species};
    use crate::World;

    #[test]
    fn soil_drinks_a_water_cell() {
        let mut world = World::with_seed(1, 2, 0);
        world.put(0, 1, Element::soil(0.0, 0.0));
        world.place_element(0, 0, "Water", None).unwrap();
        let before = world.total_wetness();
        world.step();
        world.step();
        assert_eq!(world.species_at(0, 0), None);
        assert_eq!(world.element_at(0, 1).unwrap().wetness(), 1.0);
        assert!((world.total_wetness() - before).abs() < 1e-6);
    }

    #[test]
    fn soil_sips_only_what_it_can_hold() {
        let mut world = World::with_seed(1, 2, 0);
        world.put(0, 1, Element::soil(0.0, 0.6));
        world.place_element(0, 0, "Water", None).unwrap();
        world.step();
        let water = world.element_at(0, 0).unwrap();
        assert_eq!(water.species(), Species::Water);
        assert!((water.wetness() - 0.6).abs() < 1e-6);
        assert_eq!(world.element_at(0, 1).unwrap().wetness(), 1.0);
    }

    #[test]
    fn oil_is_not_absorbed() {
        let mut world = World::with_seed(1, 2, 0);
        world.put(0, 1, Element::soil(0.0, 0.0));
        world.place_element(0, 0, "Oil", None).unwrap();
        world.step();
        assert_eq!(world.species_at(0, 0), Some(Species::Oil));
        assert_eq!(world.element_at(0, 1).unwrap().wetness(), 0.0);
    }

    #[test]
    fn wet_soil_seeps_into_dry_soil() {
        let mut world = World::with_seed(2, 1, 0);
        world.put(0, 0, Element::soil(0.0, 1.0));
        world.put(1, 0, Element::soil(0.0, 0.0));
        world.step();
        let dry = world.element_at(1, 0).unwrap().wetness();
        let wet = world.element_at(0, 0).unwrap().wetness();
        assert!(dry > 0.0 && dry <= 0.2 + 1e-6, "{dry}");
        assert!((wet + dry - 1.0).abs() < 1e-6);
    }

    #[test]
    fn damp_soil_below_threshold_holds_its_water() {
        let mut world = World::with_seed(2, 1, 0);
        world.put(0, 0, Element::soil(0.0, 0.3));
        world.put(1, 0, Element::soil(0.0, 0.0));
        world.step();
        assert_eq!(world.element_at(1, 0).unwrap().wetness(), 0.0);
    }

    #[test]
    fn ash_shares_its_nutrient() {
        let mut world = World::with_seed(2, 1, 0);
        world.place_element(0, 0, "Ash", None).unwrap();
        world.put(1, 0, Element::soil(0.0, 0.0));
        world.step();
        let soil = world.element_at(1, 0).unwrap().nutrient().unwrap();
        assert!((soil - 5.0 / 16.0).abs() < 1e-6);
        assert!((world.total_nutrient() - 5.0).abs() < 1e-6);
    }
}
