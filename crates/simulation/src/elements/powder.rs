//! Granular fall shared by sand, soil, ash and biomass.

use crate::api::SandApi;
use crate::error::FormatError;
use crate::persist::{FieldReader, FieldWriter, Persist};

/// Nutrient store carried by biomass.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Store {
    pub nutrient: f32,
}

impl Persist for Store {
    fn write(&self, out: &mut FieldWriter) {
        out.value(self.nutrient);
    }

    fn read(input: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            nutrient: input.parse()?,
        })
    }
}

/// Straight down, else the two down-diagonals in an order that flips every
/// tick. Returns whether the element moved.
pub fn fall(api: &mut SandApi) -> bool {
    if api.try_move(0, 1) {
        return true;
    }
    let (first, second) = if api.tick % 2 == 0 { (1, -1) } else { (-1, 1) };
    api.try_move(first, 1) || api.try_move(second, 1)
}

pub fn update_powder(api: &mut SandApi) {
    fall(api);
}
