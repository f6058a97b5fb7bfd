//! Species tags, colours and the element value stored in every occupied cell.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::elements::fly::FlyState;
use crate::elements::fruit::FruitState;
use crate::elements::gas::GasState;
use crate::elements::inert::WebState;
use crate::elements::leaf::LeafState;
use crate::elements::liquid::LiquidState;
use crate::elements::powder::Store;
use crate::elements::root::RootState;
use crate::elements::seed::SeedState;
use crate::elements::snail::SnailState;
use crate::elements::soil::SoilState;
use crate::elements::spider::SpiderState;
use crate::elements::worm::WormState;
use crate::error::FormatError;

/// Implements `name()` / `from_name()` for a fieldless enum from a fixed
/// name table. The names are the on-disk spelling, so never rename them.
macro_rules! named {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }

            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}
pub(crate) use named;

/// Broad movement class of a species.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Phase {
    Powder,
    Liquid,
    Gas,
    Life,
}

/// Element type tag. The name table below doubles as the save-file spelling.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Species {
    Sand,
    Ash,
    Soil,
    Biomass,
    SurfBiomass,
    Water,
    Oil,
    Smoke,
    Steam,
    Seed,
    Root,
    Leaf,
    Fruit,
    Fly,
    Snail,
    Spider,
    Worm,
    Web,
    Wood,
}

named!(Species {
    Sand => "Sand",
    Ash => "Ash",
    Soil => "Soil",
    Biomass => "Biomass",
    SurfBiomass => "SurfBiomass",
    Water => "Water",
    Oil => "Oil",
    Smoke => "Smoke",
    Steam => "Steam",
    Seed => "Seed",
    Root => "Root",
    Leaf => "Leaf",
    Fruit => "Fruit",
    Fly => "Fly",
    Snail => "Snail",
    Spider => "Spider",
    Worm => "Worm",
    Web => "Web",
    Wood => "Wood",
});

impl Species {
    pub const ALL: [Species; 19] = [
        Self::Sand,
        Self::Ash,
        Self::Soil,
        Self::Biomass,
        Self::SurfBiomass,
        Self::Water,
        Self::Oil,
        Self::Smoke,
        Self::Steam,
        Self::Seed,
        Self::Root,
        Self::Leaf,
        Self::Fruit,
        Self::Fly,
        Self::Snail,
        Self::Spider,
        Self::Worm,
        Self::Web,
        Self::Wood,
    ];

    #[must_use]
    pub fn phase(self) -> Phase {
        match self {
            Self::Sand | Self::Ash | Self::Soil | Self::Biomass | Self::SurfBiomass => {
                Phase::Powder
            }
            Self::Water | Self::Oil => Phase::Liquid,
            Self::Smoke | Self::Steam => Phase::Gas,
            _ => Phase::Life,
        }
    }

    /// Soil and its nutrient-rich variant Ash.
    #[must_use]
    pub fn is_soil(self) -> bool {
        matches!(self, Self::Soil | Self::Ash)
    }

    #[must_use]
    pub fn is_liquid(self) -> bool {
        self.phase() == Phase::Liquid
    }

    #[must_use]
    pub fn is_gas(self) -> bool {
        self.phase() == Phase::Gas
    }

    /// Whether the density-driven move primitive may push this species
    /// around. Life forms only move under their own rules.
    #[must_use]
    pub fn is_displaceable(self) -> bool {
        self.phase() != Phase::Life
    }

    /// Biomass types hold wetness past 1.0 as a buffer.
    #[must_use]
    pub fn accumulates_wetness(self) -> bool {
        matches!(self, Self::Biomass | Self::SurfBiomass)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Species {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| FormatError::UnknownElement(s.to_string()))
    }
}

/// Linear RGBA colour, components in `[0, 1]`.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    #[must_use]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[must_use]
    pub fn lerp(self, to: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            r: self.r + (to.r - self.r) * t,
            g: self.g + (to.g - self.g) * t,
            b: self.b + (to.b - self.b) * t,
            a: self.a + (to.a - self.a) * t,
        }
    }

    #[must_use]
    pub fn lightened(self, amount: f32) -> Self {
        Self {
            r: self.r + (1.0 - self.r) * amount,
            g: self.g + (1.0 - self.g) * amount,
            b: self.b + (1.0 - self.b) * amount,
            a: self.a,
        }
    }

    #[must_use]
    pub fn darkened(self, amount: f32) -> Self {
        Self {
            r: self.r * (1.0 - amount),
            g: self.g * (1.0 - amount),
            b: self.b * (1.0 - amount),
            a: self.a,
        }
    }

    #[must_use]
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

/// Static per-species properties.
struct Traits {
    density: f32,
    flammability: f32,
    wetness: f32,
    color: Color,
}

fn traits(species: Species) -> Traits {
    let t = |density, flammability, wetness, color| Traits {
        density,
        flammability,
        wetness,
        color,
    };
    match species {
        Species::Sand => t(20.0, 0.0, 0.0, Color::rgb(1.0, 1.0, 0.0)),
        Species::Ash => t(19.0, 0.0, 0.0, Color::rgb(0.75, 0.75, 0.75)),
        Species::Soil => t(10.0, 0.0, 0.0, Color::rgb(0.74, 0.72, 0.42)),
        Species::Biomass => t(20.0, 2.0, 0.0, Color::rgb(0.94, 0.9, 0.55)),
        Species::SurfBiomass => t(20.0, 2.0, 0.0, Color::rgb(0.0, 0.39, 0.0)),
        Species::Water => t(5.0, 0.0, 1.0, Color::rgb(0.0, 0.0, 1.0)),
        Species::Oil => t(4.0, 5.0, 0.0, Color::rgb(1.0, 1.0, 0.88)),
        Species::Smoke => t(0.1, 0.0, 0.0, Color::rgb(0.66, 0.66, 0.66)),
        Species::Steam => t(1.0, 0.0, 1.0, Color::rgba(0.96, 0.96, 0.96, 0.3)),
        Species::Seed => t(3.0, 4.0, 0.0, Color::rgb(0.87, 0.72, 0.53)),
        Species::Root | Species::Wood => t(1500.0, 10.0, 0.0, Color::rgb(0.65, 0.16, 0.16)),
        Species::Leaf => t(10.0, 10.0, 0.0, Color::rgb(0.0, 0.5, 0.0)),
        Species::Fruit => t(3.0, 3.0, 0.0, Color::rgb(1.0, 0.0, 0.0)),
        Species::Fly => t(30.0, 3.0, 0.0, Color::rgb(0.0, 0.0, 0.0)),
        Species::Snail => t(3.0, 3.0, 0.0, Color::rgb(0.96, 0.96, 0.86)),
        Species::Spider => t(10.0, 0.5, 0.0, Color::rgb(0.93, 0.51, 0.93)),
        Species::Worm => t(30.0, 3.0, 0.0, Color::rgb(1.0, 0.75, 0.8)),
        Species::Web => t(3.0, 3.0, 0.0, Color::rgb(1.0, 1.0, 1.0)),
    }
}

/// Variant payload. Each arm carries only the fields its species needs.
#[derive(Clone, PartialEq, Debug)]
pub enum Kind {
    Sand,
    Ash(SoilState),
    Soil(SoilState),
    Biomass(Store),
    SurfBiomass(Store),
    Water(LiquidState),
    Oil(LiquidState),
    Smoke(GasState),
    Steam(GasState),
    Seed(SeedState),
    Root(RootState),
    Leaf(LeafState),
    Fruit(FruitState),
    Fly(FlyState),
    Snail(SnailState),
    Spider(SpiderState),
    Worm(WormState),
    Web(WebState),
    Wood,
}

impl Kind {
    /// Default payload for `species`.
    #[must_use]
    pub fn of(species: Species) -> Self {
        match species {
            Species::Sand => Self::Sand,
            Species::Ash => Self::Ash(SoilState::ash()),
            Species::Soil => Self::Soil(SoilState::default()),
            Species::Biomass => Self::Biomass(Store::default()),
            Species::SurfBiomass => Self::SurfBiomass(Store::default()),
            Species::Water => Self::Water(LiquidState::default()),
            Species::Oil => Self::Oil(LiquidState::default()),
            Species::Smoke => Self::Smoke(GasState::default()),
            Species::Steam => Self::Steam(GasState::default()),
            Species::Seed => Self::Seed(SeedState::default()),
            Species::Root => Self::Root(RootState::default()),
            Species::Leaf => Self::Leaf(LeafState::default()),
            Species::Fruit => Self::Fruit(FruitState::default()),
            Species::Fly => Self::Fly(FlyState::default()),
            Species::Snail => Self::Snail(SnailState::default()),
            Species::Spider => Self::Spider(SpiderState::default()),
            Species::Worm => Self::Worm(WormState::default()),
            Species::Web => Self::Web(WebState::default()),
            Species::Wood => Self::Wood,
        }
    }

    #[must_use]
    pub fn species(&self) -> Species {
        match self {
            Self::Sand => Species::Sand,
            Self::Ash(_) => Species::Ash,
            Self::Soil(_) => Species::Soil,
            Self::Biomass(_) => Species::Biomass,
            Self::SurfBiomass(_) => Species::SurfBiomass,
            Self::Water(_) => Species::Water,
            Self::Oil(_) => Species::Oil,
            Self::Smoke(_) => Species::Smoke,
            Self::Steam(_) => Species::Steam,
            Self::Seed(_) => Species::Seed,
            Self::Root(_) => Species::Root,
            Self::Leaf(_) => Species::Leaf,
            Self::Fruit(_) => Species::Fruit,
            Self::Fly(_) => Species::Fly,
            Self::Snail(_) => Species::Snail,
            Self::Spider(_) => Species::Spider,
            Self::Worm(_) => Species::Worm,
            Self::Web(_) => Species::Web,
            Self::Wood => Species::Wood,
        }
    }
}

/// Typed access to the payload shared by one or more `Kind` arms.
pub trait VariantState: Clone {
    fn of(kind: &Kind) -> Option<&Self>;
    fn of_mut(kind: &mut Kind) -> Option<&mut Self>;
}

macro_rules! variant_state {
    ($ty:ty => $($variant:ident)|+) => {
        impl VariantState for $ty {
            fn of(kind: &Kind) -> Option<&Self> {
                match kind {
                    $(Kind::$variant(s))|+ => Some(s),
                    _ => None,
                }
            }

            fn of_mut(kind: &mut Kind) -> Option<&mut Self> {
                match kind {
                    $(Kind::$variant(s))|+ => Some(s),
                    _ => None,
                }
            }
        }
    };
}

variant_state!(SoilState => Soil | Ash);
variant_state!(Store => Biomass | SurfBiomass);
variant_state!(LiquidState => Water | Oil);
variant_state!(GasState => Smoke | Steam);
variant_state!(SeedState => Seed);
variant_state!(RootState => Root);
variant_state!(LeafState => Leaf);
variant_state!(FruitState => Fruit);
variant_state!(FlyState => Fly);
variant_state!(SnailState => Snail);
variant_state!(SpiderState => Spider);
variant_state!(WormState => Worm);
variant_state!(WebState => Web);

/// A single particle. Owned by exactly one grid cell through the arena.
#[derive(Clone, PartialEq, Debug)]
pub struct Element {
    pub kind: Kind,
    pub color: Color,
    pub(crate) base_color: Option<Color>,
    pub density: f32,
    pub flammability: f32,
    pub burning: bool,
    pub burning_lifetime: i32,
    wetness: f32,
}

impl Element {
    /// Deterministic default element of `species`.
    #[must_use]
    pub fn new(species: Species) -> Self {
        let t = traits(species);
        Self {
            kind: Kind::of(species),
            color: t.color,
            base_color: None,
            density: t.density,
            flammability: t.flammability,
            burning: false,
            burning_lifetime: 0,
            wetness: t.wetness,
        }
    }

    /// Element as created by a brush or by another element: per-instance
    /// randomness (colour grain, flow direction, growth caps) applied.
    pub fn spawn(species: Species, rng: &mut impl Rng) -> Self {
        let mut element = Self::new(species);
        match species {
            Species::Sand => element.modulate(rng, 0.2),
            Species::Wood => element.modulate(rng, 0.05),
            _ => {}
        }
        if let Some(liquid) = element.state_mut::<LiquidState>() {
            liquid.direction_x = if rng.gen_bool(0.5) { 1 } else { -1 };
        }
        if let Some(seed) = element.state_mut::<SeedState>() {
            *seed = SeedState::random(rng);
        }
        element
    }

    /// Soil carrying the given resources.
    #[must_use]
    pub fn soil(nutrient: f32, wetness: f32) -> Self {
        let mut soil = Self::new(Species::Soil);
        soil.kind = Kind::Soil(SoilState { nutrient });
        soil.set_wetness(wetness);
        soil
    }

    /// Biomass (or surface biomass when `surface`) carrying the given resources.
    #[must_use]
    pub fn biomass(surface: bool, nutrient: f32, wetness: f32) -> Self {
        let species = if surface {
            Species::SurfBiomass
        } else {
            Species::Biomass
        };
        let mut biomass = Self::new(species);
        if let Some(store) = biomass.state_mut::<Store>() {
            store.nutrient = nutrient;
        }
        biomass.set_wetness(wetness);
        biomass
    }

    fn modulate(&mut self, rng: &mut impl Rng, intensity: f32) {
        let light = rng.gen_range(0.0..intensity);
        let dark = rng.gen_range(0.0..intensity);
        self.color = self.color.lightened(light).darkened(dark);
    }

    #[must_use]
    pub fn species(&self) -> Species {
        self.kind.species()
    }

    #[must_use]
    pub fn state<T: VariantState>(&self) -> Option<&T> {
        T::of(&self.kind)
    }

    pub fn state_mut<T: VariantState>(&mut self) -> Option<&mut T> {
        T::of_mut(&mut self.kind)
    }

    #[must_use]
    pub fn wetness(&self) -> f32 {
        self.wetness
    }

    /// Stores `value`, clamped to `[0, 1]` unless the species accumulates.
    pub fn set_wetness(&mut self, value: f32) {
        self.wetness = if self.species().accumulates_wetness() {
            value.max(0.0)
        } else {
            value.clamp(0.0, 1.0)
        };
    }

    /// How much more wetness this element can take.
    #[must_use]
    pub fn wetness_room(&self) -> f32 {
        if self.species().accumulates_wetness() {
            f32::INFINITY
        } else {
            (1.0 - self.wetness).max(0.0)
        }
    }

    #[must_use]
    pub(crate) fn default_wetness(&self) -> f32 {
        traits(self.species()).wetness
    }

    /// Nutrient held by this element, including creature buffers.
    #[must_use]
    pub fn nutrient(&self) -> Option<f32> {
        match &self.kind {
            Kind::Snail(snail) => Some(snail.nutrient_buffer),
            Kind::Worm(worm) => worm.carried.map(|soil| soil.nutrient),
            _ => self.store_nutrient(),
        }
    }

    fn store_nutrient(&self) -> Option<f32> {
        match &self.kind {
            Kind::Soil(s) | Kind::Ash(s) => Some(s.nutrient),
            Kind::Biomass(s) | Kind::SurfBiomass(s) => Some(s.nutrient),
            Kind::Seed(s) => Some(s.nutrient),
            Kind::Root(s) => Some(s.nutrient),
            Kind::Leaf(s) => Some(s.nutrient),
            Kind::Fruit(s) => Some(s.nutrient),
            _ => None,
        }
    }

    /// Mutable nutrient field of the resource-holding species.
    pub fn nutrient_mut(&mut self) -> Option<&mut f32> {
        match &mut self.kind {
            Kind::Soil(s) | Kind::Ash(s) => Some(&mut s.nutrient),
            Kind::Biomass(s) | Kind::SurfBiomass(s) => Some(&mut s.nutrient),
            Kind::Seed(s) => Some(&mut s.nutrient),
            Kind::Root(s) => Some(&mut s.nutrient),
            Kind::Leaf(s) => Some(&mut s.nutrient),
            Kind::Fruit(s) => Some(&mut s.nutrient),
            _ => None,
        }
    }

    /// Wetness held by this element, including creature buffers.
    #[must_use]
    pub fn held_wetness(&self) -> f32 {
        let buffered = match &self.kind {
            Kind::Snail(snail) => snail.wetness_buffer,
            Kind::Worm(worm) => worm.overflow + worm.carried.map_or(0.0, |soil| soil.wetness),
            _ => 0.0,
        };
        self.wetness + buffered
    }

    /// Multi-line human readable dump used by the inspect tool.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = format!("{}\n", self.species());
        out += &format!("  Flammability: {}\n", self.flammability);
        out += &format!("  Wetness: {:.3}\n", self.wetness);
        out += &format!("  Burning: {}\n", self.burning);
        if self.burning {
            out += &format!("  Burning Lifetime: {}\n", self.burning_lifetime);
        }
        if let Some(nutrient) = self.nutrient() {
            out += &format!("  Nutrient: {nutrient:.3}\n");
        }
        match &self.kind {
            Kind::Seed(s) => {
                out += &format!("  State: {}\n", s.phase.name());
                out += &format!("  Leaves: {}/{}\n", s.leaf_count, s.max_leaf_count);
                out += &format!("  Roots: {}/{}\n", s.root_count, s.max_root_count);
            }
            Kind::Root(s) => out += &format!("  Parent: {:?}\n  Dying: {}\n", s.parent, s.dying),
            Kind::Leaf(s) => {
                out += &format!("  Parent: {:?}\n  Dying: {}\n", s.parent, s.dying);
                out += &format!("  Children: {}\n", s.children.len());
            }
            Kind::Fruit(s) => out += &format!("  Pollinated: {}\n", s.pollinated),
            Kind::Fly(s) => out += &format!("  Direction: {:?}\n  Stuck: {}\n", s.direction, s.stuck),
            Kind::Snail(s) => out += &format!("  State: {}\n", s.phase.name()),
            Kind::Spider(s) => {
                out += &format!("  State: {}\n", s.phase.name());
                out += &format!("  Wandering Direction: {:?}\n", s.wander_dir);
                out += &format!("  On Web: {}\n", s.on_web);
            }
            Kind::Worm(s) => {
                out += &format!("  State: {}\n", s.phase.name());
                out += &format!("  Direction: {:?}\n", s.direction);
                out += &format!("  In Soil: {}\n", s.carried.is_some());
            }
            _ => {}
        }
        out.trim_end().to_string()
    }
}
