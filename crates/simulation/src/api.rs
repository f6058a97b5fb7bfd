//! Relative-offset API for element update functions.
//!
//! Reads of the previous snapshot go through `prev*`, reads and writes of
//! the grid being built go through `live*`. Out-of-bounds reads return
//! `None`, writes are no-ops. Every move updates `x`/`y` so the caller keeps
//! addressing the element it is updating.

use rand::rngs::StdRng;
use rand::Rng;

use crate::arena::{Arena, ElementId};
use crate::cell::{Element, Species, VariantState};
use crate::config::SimConfig;
use crate::Grid;

pub const CARDINALS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

pub const NEIGHBORS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Direction-specific density rule: sinking needs a lighter target, rising
/// needs a heavier one, sideways moves push only lighter elements.
#[must_use]
pub fn density_allows(mover: f32, target: f32, dy: i32) -> bool {
    if dy < 0 {
        target > mover
    } else {
        target < mover
    }
}

#[derive(Debug)]
pub struct SandApi<'a> {
    prev: &'a Grid,
    grid: &'a mut Grid,
    arena: &'a mut Arena,
    rng: &'a mut StdRng,
    config: &'a SimConfig,
    me: ElementId,
    pub x: i32,
    pub y: i32,
    pub tick: u64,
}

impl<'a> SandApi<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        prev: &'a Grid,
        grid: &'a mut Grid,
        arena: &'a mut Arena,
        rng: &'a mut StdRng,
        config: &'a SimConfig,
        x: i32,
        y: i32,
        tick: u64,
    ) -> Option<Self> {
        let me = grid.get(x, y)?;
        Some(Self {
            prev,
            grid,
            arena,
            rng,
            config,
            me,
            x,
            y,
            tick,
        })
    }

    #[must_use]
    pub fn id(&self) -> ElementId {
        self.me
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        self.config
    }

    #[must_use]
    pub fn width(&self) -> i32 {
        self.grid.width as i32
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        self.grid.height as i32
    }

    #[must_use]
    pub fn in_bounds(&self, dx: i32, dy: i32) -> bool {
        self.grid.in_bounds(self.x + dx, self.y + dy)
    }

    #[must_use]
    pub fn me(&self) -> &Element {
        &self.arena[self.me]
    }

    pub fn me_mut(&mut self) -> &mut Element {
        &mut self.arena[self.me]
    }

    /// Copy of this element's variant state.
    #[must_use]
    pub fn my_state<T: VariantState>(&self) -> Option<T> {
        self.me().state::<T>().cloned()
    }

    pub fn set_my_state<T: VariantState>(&mut self, state: T) {
        if let Some(slot) = self.me_mut().state_mut::<T>() {
            *slot = state;
        }
    }

    /// First-writer-wins check: false once something else took our cell.
    #[must_use]
    pub fn holds_me(&self) -> bool {
        self.grid.get(self.x, self.y) == Some(self.me)
    }

    #[must_use]
    pub fn prev(&self, dx: i32, dy: i32) -> Option<&Element> {
        let id = self.prev.get(self.x + dx, self.y + dy)?;
        self.arena.get(id)
    }

    #[must_use]
    pub fn prev_species(&self, dx: i32, dy: i32) -> Option<Species> {
        self.prev(dx, dy).map(Element::species)
    }

    #[must_use]
    pub fn live(&self, dx: i32, dy: i32) -> Option<&Element> {
        self.live_at(self.x + dx, self.y + dy)
    }

    #[must_use]
    pub fn live_species(&self, dx: i32, dy: i32) -> Option<Species> {
        self.live(dx, dy).map(Element::species)
    }

    pub fn live_mut(&mut self, dx: i32, dy: i32) -> Option<&mut Element> {
        self.live_at_mut(self.x + dx, self.y + dy)
    }

    /// Absolute-coordinate read, used to resolve back-references.
    #[must_use]
    pub fn live_at(&self, x: i32, y: i32) -> Option<&Element> {
        let id = self.grid.get(x, y)?;
        self.arena.get(id)
    }

    pub fn live_at_mut(&mut self, x: i32, y: i32) -> Option<&mut Element> {
        let id = self.grid.get(x, y)?;
        self.arena.get_mut(id)
    }

    /// In bounds and unoccupied in the live grid.
    #[must_use]
    pub fn is_empty(&self, dx: i32, dy: i32) -> bool {
        self.in_bounds(dx, dy) && self.grid.get(self.x + dx, self.y + dy).is_none()
    }

    /// Run `f` with this element and the live element at `(x, y)` borrowed
    /// mutably. `None` when the cell is empty or is this element.
    pub fn with_cell_at<R>(
        &mut self,
        x: i32,
        y: i32,
        f: impl FnOnce(&mut Element, &mut Element) -> R,
    ) -> Option<R> {
        let other = self.grid.get(x, y)?;
        let (me, them) = self.arena.pair_mut(self.me, other)?;
        Some(f(me, them))
    }

    pub fn with_neighbor<R>(
        &mut self,
        dx: i32,
        dy: i32,
        f: impl FnOnce(&mut Element, &mut Element) -> R,
    ) -> Option<R> {
        self.with_cell_at(self.x + dx, self.y + dy, f)
    }

    /// Density-driven move. Swaps with the target when it is empty or a
    /// displaceable element the density rule lets us pass.
    pub fn try_move(&mut self, dx: i32, dy: i32) -> bool {
        if !self.in_bounds(dx, dy) {
            return false;
        }
        let mover = self.me().density;
        let allowed = match self.live(dx, dy) {
            None => true,
            Some(target) => {
                target.species().is_displaceable() && density_allows(mover, target.density, dy)
            }
        };
        if allowed {
            self.swap_with(dx, dy);
        }
        allowed
    }

    /// Unconditional swap with the target cell.
    pub fn swap_with(&mut self, dx: i32, dy: i32) {
        let (tx, ty) = (self.x + dx, self.y + dy);
        if !self.grid.in_bounds(tx, ty) {
            return;
        }
        self.grid.swap((self.x, self.y), (tx, ty));
        self.x = tx;
        self.y = ty;
    }

    /// Move onto the target cell, destroying whatever was there, and leave
    /// `behind` in the cell we came from.
    pub fn relocate(&mut self, dx: i32, dy: i32, behind: Option<Element>) {
        let (tx, ty) = (self.x + dx, self.y + dy);
        if !self.grid.in_bounds(tx, ty) {
            return;
        }
        self.grid.set(tx, ty, Some(self.me));
        let left = behind.map(|element| self.arena.insert(element));
        self.grid.set(self.x, self.y, left);
        self.x = tx;
        self.y = ty;
    }

    /// Put a new element at the offset, overwriting the cell.
    pub fn spawn(&mut self, dx: i32, dy: i32, element: Element) {
        self.spawn_at(self.x + dx, self.y + dy, element);
    }

    pub fn spawn_at(&mut self, x: i32, y: i32, element: Element) {
        if self.grid.in_bounds(x, y) {
            let id = self.arena.insert(element);
            self.grid.set(x, y, Some(id));
        }
    }

    /// Fresh randomised element of `species`.
    pub fn fresh(&mut self, species: Species) -> Element {
        Element::spawn(species, &mut *self.rng)
    }

    pub fn clear(&mut self, dx: i32, dy: i32) {
        self.grid.set(self.x + dx, self.y + dy, None);
    }

    /// Overwrite our own cell, ending this element.
    pub fn replace_me(&mut self, element: Element) {
        self.spawn(0, 0, element);
    }

    pub fn remove_me(&mut self) {
        self.clear(0, 0);
    }

    pub fn chance(&mut self, p: f32) -> bool {
        self.rng.gen::<f32>() < p
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut *self.rng
    }
}
