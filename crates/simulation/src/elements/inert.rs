//! Static life: wood and spider web.

use crate::api::SandApi;
use crate::error::FormatError;
use crate::persist::{FieldReader, FieldWriter, Persist};

/// Ticks a web strand lasts.
pub const WEB_LIFETIME: u32 = 6000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WebState {
    pub lifetime: u32,
}

impl Default for WebState {
    fn default() -> Self {
        Self {
            lifetime: WEB_LIFETIME,
        }
    }
}

impl Persist for WebState {
    fn write(&self, out: &mut FieldWriter) {
        out.value(self.lifetime);
    }

    fn read(input: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            lifetime: input.parse()?,
        })
    }
}

pub fn update_web(api: &mut SandApi) {
    let Some(mut web) = api.my_state::<WebState>() else {
        return;
    };
    web.lifetime = web.lifetime.saturating_sub(1);
    if web.lifetime == 0 {
        api.remove_me();
    } else {
        api.set_my_state(web);
    }
}
