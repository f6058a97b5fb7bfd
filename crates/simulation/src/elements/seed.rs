//! Seed: falls, roots into soil, sprouts a first leaf, feeds it, matures and
//! finally rots into surface biomass.

use rand::Rng;

use crate::api::SandApi;
use crate::cell::{named, Element, Species};
use crate::elements::leaf::LeafState;
use crate::elements::root::RootState;
use crate::elements::{give_nutrient, give_wetness};
use crate::error::FormatError;
use crate::persist::{FieldReader, FieldWriter, Persist};

/// Ticks between growth attempts while sprouting.
pub const GROWTH_INTERVAL: u32 = 60;
/// Ticks a mature plant lives before dying.
pub const MATURE_LIFETIME: u32 = 3000;
/// Per-tick chance that a dying seed rots away.
pub const DECAY_CHANCE: f32 = 0.01;
/// Nutrient the seed hands to each root or leaf it grows itself.
pub const GROWTH_COST: f32 = 1.0;
/// Per-tick cap on what the seed pushes into its first leaf.
pub const FEED_RATE: f32 = 0.05;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SeedPhase {
    #[default]
    Falling,
    Seed,
    Growing,
    Mature,
    Dying,
}

named!(SeedPhase {
    Falling => "Falling",
    Seed => "Seed",
    Growing => "Growing",
    Mature => "Mature",
    Dying => "Dying",
});

#[derive(Clone, PartialEq, Debug)]
pub struct SeedState {
    pub phase: SeedPhase,
    pub nutrient: f32,
    pub max_leaf_count: u32,
    pub max_root_count: u32,
    pub leaf_count: u32,
    pub root_count: u32,
    pub growth_timer: u32,
    /// Ticks spent mature.
    pub age: u32,
    /// Where the first leaf grew; resources are routed through it.
    pub first_leaf: Option<(i32, i32)>,
}

impl Default for SeedState {
    fn default() -> Self {
        Self {
            phase: SeedPhase::Falling,
            nutrient: 10.0,
            max_leaf_count: 6,
            max_root_count: 4,
            leaf_count: 0,
            root_count: 0,
            growth_timer: 0,
            age: 0,
            first_leaf: None,
        }
    }
}

impl SeedState {
    /// A fresh seed with its own growth ceilings.
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            max_leaf_count: rng.gen_range(4..=8),
            max_root_count: rng.gen_range(3..=6),
            ..Self::default()
        }
    }

    /// Whether dependants should keep living off this seed.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.phase != SeedPhase::Dying
    }
}

impl Persist for SeedState {
    fn write(&self, out: &mut FieldWriter) {
        out.value(self.phase.name())
            .value(self.nutrient)
            .value(self.max_leaf_count)
            .value(self.max_root_count)
            .value(self.leaf_count)
            .value(self.root_count)
            .value(self.growth_timer)
            .value(self.age)
            .opt_coord(self.first_leaf);
    }

    fn read(input: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            phase: input.name(SeedPhase::from_name)?,
            nutrient: input.parse()?,
            max_leaf_count: input.parse()?,
            max_root_count: input.parse()?,
            leaf_count: input.parse()?,
            root_count: input.parse()?,
            growth_timer: input.parse()?,
            age: input.parse()?,
            first_leaf: input.opt_coord()?,
        })
    }
}

/// How a root or leaf's back-reference to its seed resolves this tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Lineage {
    /// No seed at the recorded cell.
    Orphaned,
    /// The seed is there but dying.
    Withering,
    Alive,
}

#[must_use]
pub fn lineage(api: &SandApi, parent: (i32, i32)) -> Lineage {
    match api
        .live_at(parent.0, parent.1)
        .and_then(|e| e.state::<SeedState>())
    {
        None => Lineage::Orphaned,
        Some(seed) if !seed.is_alive() => Lineage::Withering,
        Some(_) => Lineage::Alive,
    }
}

/// The seed a root or leaf belongs to, for bookkeeping.
pub fn parent_mut<'a>(api: &'a mut SandApi, parent: (i32, i32)) -> Option<&'a mut SeedState> {
    api.live_at_mut(parent.0, parent.1)?.state_mut::<SeedState>()
}

pub fn update_seed(api: &mut SandApi) {
    let Some(mut seed) = api.my_state::<SeedState>() else {
        return;
    };
    match seed.phase {
        SeedPhase::Falling => {
            if !api.try_move(0, 1) {
                seed.phase = SeedPhase::Seed;
                seed.growth_timer = GROWTH_INTERVAL - 1;
            }
        }
        SeedPhase::Seed => sprout(api, &mut seed),
        SeedPhase::Growing | SeedPhase::Mature => {
            if !feed_first_leaf(api, &mut seed) {
                seed.phase = SeedPhase::Dying;
            } else if seed.phase == SeedPhase::Growing {
                if seed.leaf_count >= seed.max_leaf_count {
                    seed.phase = SeedPhase::Mature;
                }
            } else {
                seed.age += 1;
                if seed.age >= MATURE_LIFETIME {
                    seed.phase = SeedPhase::Dying;
                }
            }
        }
        SeedPhase::Dying => {
            if api.chance(DECAY_CHANCE) {
                let me = api.me();
                let rotten = Element::biomass(true, seed.nutrient, me.wetness());
                api.replace_me(rotten);
                return;
            }
        }
    }
    if api.holds_me() {
        api.set_my_state(seed);
    }
}

/// Periodic growth attempt of a resting seed: root first, else the first
/// leaf, which starts the growing phase.
fn sprout(api: &mut SandApi, seed: &mut SeedState) {
    seed.growth_timer += 1;
    if seed.growth_timer < GROWTH_INTERVAL {
        return;
    }
    seed.growth_timer = 0;

    let below = api.live_species(0, 1);
    if !below.is_some_and(|s| s == Species::Soil || s == Species::Root) {
        seed.phase = SeedPhase::Dying;
        return;
    }
    if seed.nutrient <= 0.0 {
        return;
    }

    let home = (api.x, api.y);
    if below == Some(Species::Soil) && seed.root_count < seed.max_root_count {
        if let Some(soil) = api.live(0, 1) {
            let mut root = RootState::grown_from(home, soil);
            if let Some(n) = root.nutrient_mut() {
                *n += GROWTH_COST;
            }
            api.spawn(0, 1, root);
            seed.root_count += 1;
            seed.nutrient -= GROWTH_COST;
            return;
        }
    }

    if api.is_empty(0, -1) {
        let mut leaf = Element::new(Species::Leaf);
        if let Some(state) = leaf.state_mut::<LeafState>() {
            state.parent = home;
            state.nutrient = GROWTH_COST;
        }
        api.spawn(0, -1, leaf);
        seed.leaf_count += 1;
        seed.nutrient -= GROWTH_COST;
        seed.first_leaf = Some((api.x, api.y - 1));
        seed.phase = SeedPhase::Growing;
    }
}

/// Push nutrient and wetness into the first leaf. False once that leaf is
/// gone.
fn feed_first_leaf(api: &mut SandApi, seed: &mut SeedState) -> bool {
    let Some((lx, ly)) = seed.first_leaf else {
        return false;
    };
    let home = (api.x, api.y);
    let ours = api
        .live_at(lx, ly)
        .and_then(|e| e.state::<LeafState>())
        .is_some_and(|leaf| leaf.parent == home);
    if !ours {
        return false;
    }
    api.with_cell_at(lx, ly, |me, leaf| {
        give_nutrient(me, leaf, FEED_RATE);
        give_wetness(me, leaf, FEED_RATE);
    });
    seed.nutrient = api.me().nutrient().unwrap_or(seed.nutrient);
    true
}
