//! Water and oil.

use crate::api::SandApi;
use crate::cell::{Element, Species};
use crate::error::FormatError;
use crate::persist::{FieldReader, FieldWriter, Persist};

/// Ticks of sideways-only flow before an unsupported liquid evaporates.
pub const LIFETIME: u32 = 600;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct LiquidState {
    /// Current sideways flow direction, `-1` or `1`.
    pub direction_x: i32,
    pub lifetime: u32,
}

impl Default for LiquidState {
    fn default() -> Self {
        Self {
            direction_x: 1,
            lifetime: LIFETIME,
        }
    }
}

impl Persist for LiquidState {
    fn write(&self, out: &mut FieldWriter) {
        out.value(self.direction_x).value(self.lifetime);
    }

    fn read(input: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        let direction_x: i32 = input.parse()?;
        Ok(Self {
            direction_x: if direction_x < 0 { -1 } else { 1 },
            lifetime: input.parse()?,
        })
    }
}

/// What a liquid leaves behind when it evaporates: water turns to steam
/// holding its wetness, oil simply vanishes.
#[must_use]
pub fn evaporated(liquid: &Element) -> Option<Element> {
    match liquid.species() {
        Species::Water => {
            let mut steam = Element::new(Species::Steam);
            steam.set_wetness(liquid.wetness());
            Some(steam)
        }
        _ => None,
    }
}

pub fn update_liquid(api: &mut SandApi) {
    let Some(mut state) = api.my_state::<LiquidState>() else {
        return;
    };

    if state.lifetime == 0 && !api.prev_species(0, 1).is_some_and(Species::is_liquid) {
        match evaporated(api.me()) {
            Some(vapour) => api.replace_me(vapour),
            None => api.remove_me(),
        }
        return;
    }

    let first = if api.chance(0.5) { 1 } else { -1 };
    if api.try_move(0, 1) || api.try_move(first, 1) || api.try_move(-first, 1) {
        state.lifetime = LIFETIME;
    } else {
        let mut moved = api.try_move(state.direction_x, 0);
        if !moved {
            state.direction_x = -state.direction_x;
            moved = api.try_move(state.direction_x, 0);
        }
        if moved {
            state.lifetime = state.lifetime.saturating_sub(1);
        }
    }
    api.set_my_state(state);
}
