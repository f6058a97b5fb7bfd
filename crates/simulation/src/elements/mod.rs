//! Per-element update functions dispatched from the tick loop.

pub mod fly;
pub mod fruit;
pub mod gas;
pub mod inert;
pub mod leaf;
pub mod liquid;
pub mod powder;
pub mod root;
pub mod seed;
pub mod snail;
pub mod soil;
pub mod spider;
pub mod worm;


use crate::api::SandApi;
use crate::cell::{Element, Phase, Species};
use crate::combustion;

/// Run the element under `api` for one tick, then its fire and colour.
pub fn update_cell(api: &mut SandApi) {
    match api.me().species() {
        Species::Sand | Species::Biomass | Species::SurfBiomass => powder::update_powder(api),
        Species::Soil | Species::Ash => soil::update_soil(api),
        Species::Water | Species::Oil => liquid::update_liquid(api),
        Species::Smoke | Species::Steam => gas::update_gas(api),
        Species::Seed => seed::update_seed(api),
        Species::Root => root::update_root(api),
        Species::Leaf => leaf::update_leaf(api),
        Species::Fruit => fruit::update_fruit(api),
        Species::Fly => fly::update_fly(api),
        Species::Snail => snail::update_snail(api),
        Species::Spider => spider::update_spider(api),
        Species::Worm => worm::update_worm(api),
        Species::Web => inert::update_web(api),
        Species::Wood => {}
    }
    if api.holds_me() {
        combustion::burn(api);
    }
    if api.holds_me() {
        let tick = api.tick;
        combustion::update_color(api.me_mut(), tick);
    }
}

/// Something a creature can stand on or climb.
#[must_use]
pub fn is_solid(species: Species) -> bool {
    matches!(species.phase(), Phase::Powder | Phase::Life)
}

/// Creature throttle. True (and `last` advanced) once `interval` ticks have
/// passed since `last`. A `last` ahead of `tick` (a save loaded into a fresh
/// world) restarts the wait.
pub fn activity_due(last: &mut u64, tick: u64, interval: u64) -> bool {
    if *last > tick {
        *last = tick;
    }
    if tick - *last < interval {
        return false;
    }
    *last = tick;
    true
}

/// Move up to `amount` nutrient from `from` to `to`. Returns the amount moved.
pub fn give_nutrient(from: &mut Element, to: &mut Element, amount: f32) -> f32 {
    let Some(available) = from.nutrient_mut().map(|n| *n) else {
        return 0.0;
    };
    let moved = amount.min(available).max(0.0);
    let Some(sink) = to.nutrient_mut() else {
        return 0.0;
    };
    *sink += moved;
    if let Some(source) = from.nutrient_mut() {
        *source -= moved;
    }
    moved
}

/// Move up to `amount` wetness from `from` to `to`, bounded by what `from`
/// holds and what `to` can take. Returns the amount moved.
pub fn give_wetness(from: &mut Element, to: &mut Element, amount: f32) -> f32 {
    let moved = amount.min(from.wetness()).min(to.wetness_room()).max(0.0);
    from.set_wetness(from.wetness() - moved);
    to.set_wetness(to.wetness() + moved);
    moved
}

/// Short memory of recently visited cells.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Trail {
    cells: Vec<(i32, i32)>,
}

impl Trail {
    pub const LEN: usize = 6;

    #[must_use]
    pub fn from_cells(mut cells: Vec<(i32, i32)>) -> Self {
        let excess = cells.len().saturating_sub(Self::LEN);
        cells.drain(..excess);
        Self { cells }
    }

    pub fn push(&mut self, cell: (i32, i32)) {
        if self.cells.len() == Self::LEN {
            self.cells.remove(0);
        }
        self.cells.push(cell);
    }

    #[must_use]
    pub fn contains(&self, cell: (i32, i32)) -> bool {
        self.cells.contains(&cell)
    }

    #[must_use]
    pub fn cells(&self) -> &[(i32, i32)] {
        &self.cells
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
