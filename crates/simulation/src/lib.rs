//! Falling sand ecosystem engine.
//!
//! Every cell holds at most one [`Element`]. A tick snapshots the grid,
//! visits the occupied cells of the snapshot in shuffled order and lets each
//! element read the snapshot while writing the live grid.

pub mod api;
pub mod arena;
pub mod cell;
pub mod combustion;
pub mod config;
pub mod elements;
pub mod error;
pub mod persist;
pub mod universe;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use arena::{Arena, ElementId};
use cell::{Element, Species};
use combustion::Ignition;
use config::{ConfigError, SimConfig};
use error::{FormatError, SimError};

pub use universe::Universe;

/// 2D grid of element ids, indexed `y * width + x`. Out-of-bounds reads
/// return `None`, writes are no-ops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<Option<ElementId>>,
}

impl Grid {
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width * height],
        }
    }

    #[must_use]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && (x as usize) < self.width && y >= 0 && (y as usize) < self.height
    }

    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.width + x as usize
    }

    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<ElementId> {
        if self.in_bounds(x, y) {
            self.cells[self.index(x, y)]
        } else {
            None
        }
    }

    /// Store `id` at `(x, y)` and return what was there.
    pub fn set(&mut self, x: i32, y: i32, id: Option<ElementId>) -> Option<ElementId> {
        if self.in_bounds(x, y) {
            let index = self.index(x, y);
            std::mem::replace(&mut self.cells[index], id)
        } else {
            None
        }
    }

    pub fn swap(&mut self, a: (i32, i32), b: (i32, i32)) {
        if !self.in_bounds(a.0, a.1) || !self.in_bounds(b.0, b.1) {
            return;
        }
        let (i, j) = (self.index(a.0, a.1), self.index(b.0, b.1));
        debug_assert!(
            i == j || self.cells[i].is_none() || self.cells[i] != self.cells[j],
            "one element in two cells"
        );
        self.cells.swap(i, j);
    }

    /// Coordinates of every occupied cell, scanned column by column.
    #[must_use]
    pub fn occupied(&self) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        for x in 0..self.width as i32 {
            for y in 0..self.height as i32 {
                if self.get(x, y).is_some() {
                    out.push((x, y));
                }
            }
        }
        out
    }
}

/// The simulation: live grid, element arena, RNG and tick counter.
#[derive(Debug)]
pub struct World {
    grid: Grid,
    arena: Arena,
    rng: StdRng,
    config: SimConfig,
    tick: u64,
}

impl World {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            grid: Grid::new(config.width, config.height),
            arena: Arena::new(),
            rng,
            config,
            tick: 0,
        })
    }

    /// Reproducible world with default tuning.
    #[must_use]
    pub fn with_seed(width: usize, height: usize, seed: u64) -> Self {
        Self {
            grid: Grid::new(width, height),
            arena: Arena::new(),
            rng: StdRng::seed_from_u64(seed),
            config: SimConfig::sized(width, height).with_seed(seed),
            tick: 0,
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.grid.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.grid.height
    }

    #[must_use]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.grid.width, self.grid.height)
    }

    #[must_use]
    pub fn cell_size(&self) -> (u32, u32) {
        (self.config.cell_width, self.config.cell_height)
    }

    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn population(&self) -> usize {
        self.arena.len()
    }

    /// Execute exactly one simulation tick.
    pub fn step(&mut self) {
        let prev = self.grid.clone();
        elements::soil::diffuse_nutrients(&prev, &mut self.arena);

        let mut order = prev.occupied();
        order.shuffle(&mut self.rng);
        for &(x, y) in &order {
            let Some(id) = prev.get(x, y) else {
                continue;
            };
            if self.grid.get(x, y) != Some(id) {
                continue;
            }
            let api = api::SandApi::new(
                &prev,
                &mut self.grid,
                &mut self.arena,
                &mut self.rng,
                &self.config,
                x,
                y,
                self.tick,
            );
            if let Some(mut api) = api {
                elements::update_cell(&mut api);
            }
        }

        let dropped = self.arena.sweep(&self.grid);
        log::trace!(
            "tick {}: visited {} cells, {} elements ended",
            self.tick,
            order.len(),
            dropped
        );
        self.tick += 1;
    }

    /// Run `f` against the element at `(x, y)` as if it were being updated,
    /// with the current grid as the previous view.
    #[cfg(test)]
    pub(crate) fn with_api<R>(
        &mut self,
        x: i32,
        y: i32,
        f: impl FnOnce(&mut api::SandApi) -> R,
    ) -> Option<R> {
        let prev = self.grid.clone();
        let mut api = api::SandApi::new(
            &prev,
            &mut self.grid,
            &mut self.arena,
            &mut self.rng,
            &self.config,
            x,
            y,
            self.tick,
        )?;
        Some(f(&mut api))
    }

    /// One external frame: `game_speed` steps.
    pub fn advance(&mut self) {
        for _ in 0..self.config.game_speed {
            self.step();
        }
    }

    /// Construct an element from its type name and optional saved state and
    /// place it. Returns `Ok(false)` for out-of-bounds coordinates.
    pub fn place_element(
        &mut self,
        x: i32,
        y: i32,
        name: &str,
        state: Option<&str>,
    ) -> Result<bool, FormatError> {
        if !self.grid.in_bounds(x, y) {
            return Ok(false);
        }
        let species: Species = name.parse()?;
        let element = match state {
            Some(state) => persist::decode_element(species, Some(state))?,
            None => Element::spawn(species, &mut self.rng),
        };
        Ok(self.put(x, y, element))
    }

    /// Place a ready-made element, replacing the cell's occupant.
    pub fn put(&mut self, x: i32, y: i32, element: Element) -> bool {
        if !self.grid.in_bounds(x, y) {
            return false;
        }
        let id = self.arena.insert(element);
        if let Some(old) = self.grid.set(x, y, Some(id)) {
            self.arena.remove(old);
        }
        true
    }

    /// Clear a cell. Returns whether something was removed.
    pub fn remove_element(&mut self, x: i32, y: i32) -> bool {
        match self.grid.set(x, y, None) {
            Some(old) => self.arena.remove(old).is_some(),
            None => false,
        }
    }

    /// Set the element at `(x, y)` alight. Water boils into steam instead.
    pub fn ignite(&mut self, x: i32, y: i32) -> bool {
        let Some(id) = self.grid.get(x, y) else {
            return false;
        };
        match combustion::ignite(&mut self.arena[id]) {
            Ignition::Lit => true,
            Ignition::Ignored => false,
            Ignition::Boiled(steam) => self.put(x, y, steam),
        }
    }

    /// Fertilise a soil cell.
    pub fn add_nutrient(&mut self, x: i32, y: i32, amount: f32) -> bool {
        let Some(element) = self.element_at_mut(x, y) else {
            return false;
        };
        if !element.species().is_soil() {
            return false;
        }
        match element.nutrient_mut() {
            Some(nutrient) => {
                *nutrient = (*nutrient + amount).max(0.0);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn element_at(&self, x: i32, y: i32) -> Option<&Element> {
        self.grid.get(x, y).and_then(|id| self.arena.get(id))
    }

    pub fn element_at_mut(&mut self, x: i32, y: i32) -> Option<&mut Element> {
        let id = self.grid.get(x, y)?;
        self.arena.get_mut(id)
    }

    #[must_use]
    pub fn species_at(&self, x: i32, y: i32) -> Option<Species> {
        self.element_at(x, y).map(Element::species)
    }

    /// Human-readable dump of a cell. `None` outside the grid.
    #[must_use]
    pub fn inspect(&self, x: i32, y: i32) -> Option<String> {
        if !self.grid.in_bounds(x, y) {
            return None;
        }
        Some(match self.element_at(x, y) {
            Some(element) => format!("Position ({x}, {y}): {}", element.describe()),
            None => format!("Position ({x}, {y}): Empty cell"),
        })
    }

    /// Wetness held anywhere on the grid, creature buffers included.
    #[must_use]
    pub fn total_wetness(&self) -> f64 {
        self.elements().map(|e| f64::from(e.held_wetness())).sum()
    }

    /// Nutrient held anywhere on the grid, creature buffers included.
    #[must_use]
    pub fn total_nutrient(&self) -> f64 {
        self.elements()
            .filter_map(Element::nutrient)
            .map(f64::from)
            .sum()
    }

    fn elements(&self) -> impl Iterator<Item = &Element> {
        self.grid
            .cells
            .iter()
            .flatten()
            .filter_map(|&id| self.arena.get(id))
    }

    /// RGBA8 pixels, row-major by y, for the renderer.
    #[must_use]
    pub fn colors_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.grid.cells.len() * 4);
        for slot in &self.grid.cells {
            let rgba = slot
                .and_then(|id| self.arena.get(id))
                .map_or([0, 0, 0, 0], |e| e.color.to_rgba8());
            out.extend_from_slice(&rgba);
        }
        out
    }

    #[must_use]
    pub fn to_save_string(&self) -> String {
        persist::encode_world(
            &self.grid,
            &self.arena,
            self.config.cell_width,
            self.config.cell_height,
        )
    }

    /// Replace dimensions and contents from save text. On error the world
    /// is left exactly as it was.
    pub fn load_save_string(&mut self, text: &str) -> Result<(), FormatError> {
        let decoded = persist::decode_world(text).inspect_err(|e| {
            log::warn!("rejected save data: {e}");
        })?;
        log::debug!(
            "loaded {}x{} grid with {} elements",
            decoded.grid.width,
            decoded.grid.height,
            decoded.arena.len()
        );
        self.config.width = decoded.grid.width;
        self.config.height = decoded.grid.height;
        self.config.cell_width = decoded.cell_width;
        self.config.cell_height = decoded.cell_height;
        self.grid = decoded.grid;
        self.arena = decoded.arena;
        Ok(())
    }

    /// Write the world to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(self.to_save_string().as_bytes())?;
        writer.flush()?;
        log::debug!("saved world to {}", path.display());
        Ok(())
    }

    /// Replace the world with the contents of `path`.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let path = path.as_ref();
        let mut text = String::new();
        BufReader::new(File::open(path)?).read_to_string(&mut text)?;
        self.load_save_string(&text)?;
        log::debug!("loaded world from {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn arb_species() -> impl Strategy<Value = Species> {
        proptest::sample::select(Species::ALL.to_vec())
    }

    fn species_counts(world: &World) -> Vec<usize> {
        let mut counts = vec![0; Species::ALL.len()];
        for x in 0..world.width() as i32 {
            for y in 0..world.height() as i32 {
                if let Some(species) = world.species_at(x, y) {
                    counts[species as usize] += 1;
                }
            }
        }
        counts
    }

    #[test]
    fn grid_new_initializes_all_empty() {
        let grid = Grid::new(64, 32);
        assert_eq!(grid.cells.len(), 64 * 32);
        assert!(grid.cells.iter().all(Option::is_none));
        assert!(grid.occupied().is_empty());
    }

    #[test]
    fn grid_out_of_bounds_is_inert() {
        let mut world = World::with_seed(8, 8, 0);
        assert!(!world.put(-1, 0, Element::new(Species::Sand)));
        assert!(!world.put(0, 8, Element::new(Species::Sand)));
        assert_eq!(world.population(), 0);
        assert!(world.inspect(8, 0).is_none());
        assert!(!world.remove_element(100, 100));
        assert_eq!(world.place_element(-3, 2, "Sand", None), Ok(false));
    }

    #[test]
    fn step_advances_tick() {
        let mut world = World::with_seed(4, 4, 0);
        world.step();
        world.step();
        assert_eq!(world.tick(), 2);
    }

    #[test]
    fn advance_runs_game_speed_steps() {
        let mut config = SimConfig::sized(4, 4).with_seed(1);
        config.game_speed = 3;
        let mut world = World::new(config).unwrap();
        world.advance();
        assert_eq!(world.tick(), 3);
    }

    #[test]
    fn sand_falls_one_cell_per_tick() {
        let mut world = World::with_seed(5, 5, 9);
        world.place_element(2, 0, "Sand", None).unwrap();
        world.step();
        assert_eq!(world.species_at(2, 1), Some(Species::Sand));
        assert_eq!(world.species_at(2, 0), None);
    }

    #[test]
    fn unknown_type_name_is_rejected() {
        let mut world = World::with_seed(4, 4, 0);
        assert!(matches!(
            world.place_element(1, 1, "Plasma", None),
            Err(FormatError::UnknownElement(_))
        ));
        assert_eq!(world.population(), 0);
    }

    #[test]
    fn placing_over_an_element_replaces_it() {
        let mut world = World::with_seed(4, 4, 0);
        world.place_element(1, 1, "Sand", None).unwrap();
        world.place_element(1, 1, "Wood", None).unwrap();
        assert_eq!(world.population(), 1);
        assert_eq!(world.species_at(1, 1), Some(Species::Wood));
    }

    #[test]
    fn inspect_describes_cells() {
        let mut world = World::with_seed(4, 4, 0);
        world.put(1, 2, Element::soil(1.5, 0.0));
        let text = world.inspect(1, 2).unwrap();
        assert!(text.starts_with("Position (1, 2): Soil"));
        assert!(text.contains("Nutrient: 1.500"));
        assert_eq!(world.inspect(0, 0).unwrap(), "Position (0, 0): Empty cell");
    }

    #[test]
    fn add_nutrient_only_feeds_soil() {
        let mut world = World::with_seed(4, 4, 0);
        world.put(0, 3, Element::new(Species::Soil));
        world.put(1, 3, Element::new(Species::Sand));
        assert!(world.add_nutrient(0, 3, 1.0));
        assert!(!world.add_nutrient(1, 3, 1.0));
        assert!((world.total_nutrient() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn two_sands_racing_for_one_cell() {
        // Both sands can only reach (1, 1); whichever is visited first wins
        // and the other stays put.
        let mut world = World::with_seed(3, 2, 5);
        world.put(0, 1, Element::new(Species::Wood));
        world.put(2, 1, Element::new(Species::Wood));
        world.put(0, 0, Element::new(Species::Sand));
        world.put(2, 0, Element::new(Species::Sand));
        world.step();
        let counts = species_counts(&world);
        assert_eq!(counts[Species::Sand as usize], 2);
        assert_eq!(world.species_at(1, 1), Some(Species::Sand));
        let top = [world.species_at(0, 0), world.species_at(2, 0)];
        assert_eq!(top.iter().filter(|s| s.is_some()).count(), 1);
    }

    // Feature: shuffled scheduling, first writer wins
    // Elements are never duplicated or lost by movement, and no id is ever
    // referenced from two cells.
    proptest! {
        #[test]
        fn prop_movement_conserves_elements(
            cells in proptest::collection::vec(
                proptest::option::weighted(0.5, prop_oneof![
                    Just(Species::Sand),
                    Just(Species::Water),
                    Just(Species::Oil),
                    Just(Species::Wood),
                ]),
                12 * 12,
            ),
            seed in any::<u64>(),
        ) {
            let mut world = World::with_seed(12, 12, seed);
            for (i, species) in cells.iter().enumerate() {
                if let Some(species) = species {
                    world.put((i % 12) as i32, (i / 12) as i32, Element::new(*species));
                }
            }
            let before = species_counts(&world);
            world.step();
            prop_assert_eq!(species_counts(&world), before);

            let ids: Vec<_> = world.grid().cells.iter().flatten().collect();
            let unique: HashSet<_> = ids.iter().collect();
            prop_assert_eq!(ids.len(), unique.len());
            prop_assert_eq!(world.population(), ids.len());
        }
    }

    // Feature: resource clamps
    // Ordinary elements keep wetness in [0, 1] whatever the simulation does.
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]
        #[test]
        fn prop_wetness_stays_clamped(
            cells in proptest::collection::vec(proptest::option::of(arb_species()), 10 * 10),
            seed in any::<u64>(),
        ) {
            let mut world = World::with_seed(10, 10, seed);
            for (i, species) in cells.iter().enumerate() {
                if let Some(species) = species {
                    world.place_element((i % 10) as i32, (i / 10) as i32, species.name(), None).unwrap();
                }
            }
            for _ in 0..40 {
                world.step();
                for element in world.elements() {
                    if !element.species().accumulates_wetness() {
                        prop_assert!((0.0..=1.0).contains(&element.wetness()));
                    } else {
                        prop_assert!(element.wetness() >= 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn seeded_worlds_are_reproducible() {
        let build = || {
            let mut world = World::with_seed(16, 16, 42);
            for x in 0..16 {
                world.place_element(x, 15, "Soil", None).unwrap();
                world.place_element(x, 0, "Water", None).unwrap();
            }
            world.place_element(8, 5, "Seed", None).unwrap();
            world.place_element(3, 3, "Smoke", None).unwrap();
            for _ in 0..200 {
                world.step();
            }
            world.to_save_string()
        };
        assert_eq!(build(), build());
    }
}
