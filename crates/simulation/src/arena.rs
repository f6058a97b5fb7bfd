//! Owned element storage addressed by stable ids.
//!
//! The grid stores `ElementId`s, so snapshotting it for a tick copies ids
//! rather than elements. Slots are only recycled by `sweep`, after the tick
//! that orphaned them, so an id held by the previous snapshot never points at
//! a different element mid-tick.

use std::ops::{Index, IndexMut};

use crate::cell::Element;
use crate::Grid;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ElementId(u32);

impl ElementId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default, Clone)]
pub struct Arena {
    slots: Vec<Option<Element>>,
    free: Vec<u32>,
    len: usize,
}

impl Arena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, element: Element) -> ElementId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Some(element);
            ElementId(index)
        } else {
            self.slots.push(Some(element));
            ElementId((self.slots.len() - 1) as u32)
        }
    }

    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        let taken = self.slots.get_mut(id.index())?.take();
        if taken.is_some() {
            self.len -= 1;
            self.free.push(id.0);
        }
        taken
    }

    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.slots.get(id.index())?.as_ref()
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    /// Two distinct live elements at once.
    pub fn pair_mut(&mut self, a: ElementId, b: ElementId) -> Option<(&mut Element, &mut Element)> {
        let (i, j) = (a.index(), b.index());
        if i == j || i >= self.slots.len() || j >= self.slots.len() {
            return None;
        }
        let (first, second) = if i < j {
            let (lo, hi) = self.slots.split_at_mut(j);
            (&mut lo[i], &mut hi[0])
        } else {
            let (lo, hi) = self.slots.split_at_mut(i);
            (&mut hi[0], &mut lo[j])
        };
        Some((first.as_mut()?, second.as_mut()?))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every element the grid no longer references. Returns how many
    /// were dropped.
    pub fn sweep(&mut self, grid: &Grid) -> usize {
        let mut referenced = vec![false; self.slots.len()];
        for id in grid.cells.iter().flatten() {
            referenced[id.index()] = true;
        }
        let mut dropped = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_some() && !referenced[index] {
                *slot = None;
                self.free.push(index as u32);
                dropped += 1;
            }
        }
        self.len -= dropped;
        dropped
    }
}

impl Index<ElementId> for Arena {
    type Output = Element;

    fn index(&self, id: ElementId) -> &Element {
        match self.get(id) {
            Some(element) => element,
            None => panic!("grid references dead element {id:?}"),
        }
    }
}

impl IndexMut<ElementId> for Arena {
    fn index_mut(&mut self, id: ElementId) -> &mut Element {
        match self.get_mut(id) {
            Some(element) => element,
            None => panic!("grid references dead element {id:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Species;

    #[test]
    fn insert_get_remove() {
        let mut arena = Arena::new();
        let a = arena.insert(Element::new(Species::Sand));
        let b = arena.insert(Element::new(Species::Water));
        assert_eq!(arena.len(), 2);
        assert_eq!(arena[a].species(), Species::Sand);
        assert_eq!(arena.remove(b).unwrap().species(), Species::Water);
        assert!(arena.get(b).is_none());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut arena = Arena::new();
        let a = arena.insert(Element::new(Species::Sand));
        arena.remove(a);
        let b = arena.insert(Element::new(Species::Oil));
        assert_eq!(a, b);
        assert_eq!(arena[b].species(), Species::Oil);
    }

    #[test]
    fn pair_mut_rejects_aliasing() {
        let mut arena = Arena::new();
        let a = arena.insert(Element::new(Species::Sand));
        let b = arena.insert(Element::new(Species::Soil));
        assert!(arena.pair_mut(a, a).is_none());
        let (x, y) = arena.pair_mut(b, a).unwrap();
        assert_eq!(x.species(), Species::Soil);
        assert_eq!(y.species(), Species::Sand);
    }

    #[test]
    fn sweep_drops_unreferenced() {
        let mut arena = Arena::new();
        let mut grid = Grid::new(2, 1);
        let kept = arena.insert(Element::new(Species::Sand));
        arena.insert(Element::new(Species::Water));
        grid.set(0, 0, Some(kept));
        assert_eq!(arena.sweep(&grid), 1);
        assert_eq!(arena.len(), 1);
        assert!(arena.get(kept).is_some());
    }
}
