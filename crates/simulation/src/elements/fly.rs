//! Fly: wanders the air with a downward lean, gets caught in webs and
//! pollinates fruit it brushes past.

use rand::Rng;

use crate::api::{SandApi, NEIGHBORS};
use crate::cell::Species;
use crate::elements::activity_due;
use crate::elements::fruit::FruitState;
use crate::error::FormatError;
use crate::persist::{FieldReader, FieldWriter, Persist};

pub const ACTIVITY_INTERVAL: u64 = 5;
/// Activity ticks between direction changes, on average.
pub const DIRECTION_INTERVAL: u32 = 6;
/// Ticks a fly stays caught after flying into a web.
pub const STUCK_DURATION: u64 = 3600;

/// Headings with their odds: down is the most likely, the rest even.
const HEADINGS: [((i32, i32), f32); 8] = [
    ((0, 1), 0.16),
    ((-1, 0), 0.12),
    ((1, 0), 0.12),
    ((0, -1), 0.12),
    ((-1, -1), 0.12),
    ((1, -1), 0.12),
    ((-1, 1), 0.12),
    ((1, 1), 0.12),
];

/// Offspring land in the first free cell in this order.
const BROOD_CELLS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FlyState {
    pub last_activity: u64,
    pub direction: (i32, i32),
    pub direction_timer: u32,
    pub stuck: bool,
    pub stuck_since: u64,
}

impl Default for FlyState {
    fn default() -> Self {
        Self {
            last_activity: 0,
            direction: (1, 0),
            direction_timer: 0,
            stuck: false,
            stuck_since: 0,
        }
    }
}

impl Persist for FlyState {
    fn write(&self, out: &mut FieldWriter) {
        out.value(self.last_activity)
            .coord(self.direction)
            .value(self.direction_timer)
            .flag(self.stuck)
            .value(self.stuck_since);
    }

    fn read(input: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            last_activity: input.parse()?,
            direction: input.coord()?,
            direction_timer: input.parse()?,
            stuck: input.flag()?,
            stuck_since: input.parse()?,
        })
    }
}

fn heading(rng: &mut impl Rng) -> (i32, i32) {
    let roll: f32 = rng.gen();
    let mut acc = 0.0;
    for (direction, odds) in HEADINGS {
        acc += odds;
        if roll < acc {
            return direction;
        }
    }
    (1, 1)
}

pub fn update_fly(api: &mut SandApi) {
    let Some(mut fly) = api.my_state::<FlyState>() else {
        return;
    };
    if !activity_due(&mut fly.last_activity, api.tick, ACTIVITY_INTERVAL) {
        api.set_my_state(fly);
        return;
    }

    if fly.stuck {
        if api.tick.saturating_sub(fly.stuck_since) > STUCK_DURATION {
            fly.stuck = false;
            fly_towards(api, &mut fly, 0, -1);
        }
        api.set_my_state(fly);
        return;
    }

    fly.direction_timer += 1;
    if fly.direction_timer >= DIRECTION_INTERVAL {
        fly.direction_timer = api.rng().gen_range(0..DIRECTION_INTERVAL);
        fly.direction = heading(api.rng());
    }
    let (dx, dy) = fly.direction;
    if !fly_towards(api, &mut fly, dx, dy) {
        fly.direction = heading(api.rng());
        let (dx, dy) = fly.direction;
        fly_towards(api, &mut fly, dx, dy);
    }

    pollinate(api);
    api.set_my_state(fly);
}

/// Fly into empty air or gas. A web catches the fly, which tears through the
/// strand and sits there stuck.
fn fly_towards(api: &mut SandApi, fly: &mut FlyState, dx: i32, dy: i32) -> bool {
    if !api.in_bounds(dx, dy) {
        return false;
    }
    match api.live_species(dx, dy) {
        Some(Species::Web) => {
            api.relocate(dx, dy, None);
            fly.stuck = true;
            fly.stuck_since = api.tick;
            true
        }
        None => {
            api.swap_with(dx, dy);
            true
        }
        Some(s) if s.is_gas() => {
            api.swap_with(dx, dy);
            true
        }
        Some(_) => false,
    }
}

/// Pollinate every fresh fruit around; each one breeds a new fly.
fn pollinate(api: &mut SandApi) {
    for (dx, dy) in NEIGHBORS {
        let Some(fruit) = api.live_mut(dx, dy).and_then(|e| e.state_mut::<FruitState>()) else {
            continue;
        };
        if fruit.pollinated {
            continue;
        }
        fruit.pollinated = true;
        reproduce(api);
    }
}

fn reproduce(api: &mut SandApi) {
    let Some((dx, dy)) = BROOD_CELLS.into_iter().find(|&(dx, dy)| api.is_empty(dx, dy)) else {
        return;
    };
    let young = api.fresh(Species::Fly);
    api.spawn(dx, dy, young);
}
