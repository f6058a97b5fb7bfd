//! Smoke and steam drifting around the cloud line.

use rand::Rng;

use crate::api::{SandApi, NEIGHBORS};
use crate::cell::Species;
use crate::error::FormatError;
use crate::persist::{FieldReader, FieldWriter, Persist};

pub const SMOKE_DISSIPATION: f32 = 0.005;
pub const CONDENSATION: f32 = 0.01;
/// Steam neighbours needed before a steam cell may condense.
pub const CONDENSATION_CROWD: usize = 3;
pub const RAIN_CHANCE: f32 = 0.1;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct GasState {
    /// Gases act every other tick.
    pub sleeping: bool,
}

impl Persist for GasState {
    fn write(&self, out: &mut FieldWriter) {
        out.flag(self.sleeping);
    }

    fn read(input: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            sleeping: input.flag()?,
        })
    }
}

pub fn update_gas(api: &mut SandApi) {
    let Some(mut state) = api.my_state::<GasState>() else {
        return;
    };
    let was_sleeping = state.sleeping;
    state.sleeping = !was_sleeping;
    api.set_my_state(state);
    if was_sleeping {
        return;
    }

    match api.me().species() {
        Species::Smoke if api.chance(SMOKE_DISSIPATION) => {
            api.remove_me();
            return;
        }
        Species::Steam if condense(api) => return,
        _ => {}
    }
    drift(api);
}

/// Crowded steam occasionally turns back into water, sometimes raining an
/// extra drop into the empty cell above.
fn condense(api: &mut SandApi) -> bool {
    if !api.chance(CONDENSATION) {
        return false;
    }
    let crowd = NEIGHBORS
        .iter()
        .filter(|&&(dx, dy)| api.prev_species(dx, dy) == Some(Species::Steam))
        .count();
    if crowd < CONDENSATION_CROWD {
        return false;
    }
    let mut water = api.fresh(Species::Water);
    water.set_wetness(api.me().wetness());
    api.replace_me(water);
    if api.is_empty(0, -1) && api.chance(RAIN_CHANCE) {
        let drop = api.fresh(Species::Water);
        api.spawn(0, -1, drop);
    }
    true
}

/// Random walk biased towards the cloud line: sideways half the time, else
/// vertically, heading for the line with probability `1 - 1/(d + 1)` where
/// `d` is the distance to it.
fn drift(api: &mut SandApi) {
    match api.rng().gen_range(0..4) {
        0 => {
            step(api, 1, 0);
        }
        1 => {
            step(api, -1, 0);
        }
        _ => {
            let line = api.config().cloud_line_y;
            let distance = (line - api.y).abs() + 1;
            let away = if api.y <= line { -1 } else { 1 };
            let dy = if api.chance(1.0 / distance as f32) {
                away
            } else {
                -away
            };
            step(api, 0, dy);
        }
    }
}

/// Density move, except that gas tears through web.
fn step(api: &mut SandApi, dx: i32, dy: i32) -> bool {
    if api.live_species(dx, dy) == Some(Species::Web) {
        api.relocate(dx, dy, None);
        return true;
    }
    api.try_move(dx, dy)
}
