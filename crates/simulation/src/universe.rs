//! Browser facade. The renderer drives a [`World`] through these calls and
//! reads back one RGBA pixel per cell.

use wasm_bindgen::prelude::*;

use crate::World;

#[wasm_bindgen]
#[derive(Debug)]
pub struct Universe {
    world: World,
}

#[wasm_bindgen]
impl Universe {
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new(width: u32, height: u32, seed: u64) -> Universe {
        Universe {
            world: World::with_seed(width.max(1) as usize, height.max(1) as usize, seed),
        }
    }

    /// One frame: `game_speed` steps.
    pub fn tick(&mut self) {
        self.world.advance();
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.world.width() as u32
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.world.height() as u32
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.world.tick()
    }

    /// Brush stroke. Unknown names and off-grid cells are ignored.
    pub fn place(&mut self, x: i32, y: i32, name: &str) -> bool {
        self.world
            .place_element(x, y, name, None)
            .is_ok_and(|placed| placed)
    }

    pub fn remove(&mut self, x: i32, y: i32) -> bool {
        self.world.remove_element(x, y)
    }

    pub fn ignite(&mut self, x: i32, y: i32) -> bool {
        self.world.ignite(x, y)
    }

    pub fn fertilize(&mut self, x: i32, y: i32, amount: f32) -> bool {
        self.world.add_nutrient(x, y, amount)
    }

    #[must_use]
    pub fn inspect(&self, x: i32, y: i32) -> Option<String> {
        self.world.inspect(x, y)
    }

    #[must_use]
    pub fn save(&self) -> String {
        self.world.to_save_string()
    }

    /// Replace the world with `text`. On failure nothing changes.
    pub fn load(&mut self, text: &str) -> bool {
        self.world.load_save_string(text).is_ok()
    }

    #[must_use]
    pub fn colors(&self) -> Vec<u8> {
        self.world.colors_rgba()
    }

    #[must_use]
    pub fn total_wetness(&self) -> f64 {
        self.world.total_wetness()
    }

    #[must_use]
    pub fn total_nutrient(&self) -> f64 {
        self.world.total_nutrient()
    }
}
