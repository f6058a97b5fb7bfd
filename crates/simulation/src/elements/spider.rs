//! Spider: scouts along solid ground for a spot to build, spins a web strand
//! across open air and then lives on its web.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::api::{SandApi, NEIGHBORS};
use crate::cell::{named, Element, Species};
use crate::elements::{activity_due, Trail};
use crate::error::FormatError;
use crate::persist::{FieldReader, FieldWriter, Persist};

pub const ACTIVITY_INTERVAL: u64 = 4;
/// Activity ticks of scouting before a build direction is chosen.
pub const SCOUT_TICKS: u32 = 20;
/// Longest strand a spider will plan.
pub const RAY_LENGTH: i32 = 16;
/// Anchor contacts a planned strand may brush per cell of its length.
pub const CLOSENESS_PER_CELL: usize = 1;
/// Ticks on a web before the spider may get restless.
pub const RESTLESS_AFTER: u64 = 360;
pub const RESTLESS_CHANCE: f32 = 0.01;
pub const WEB_STEP_CHANCE: f32 = 0.5;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SpiderPhase {
    #[default]
    Falling,
    WanderingOnWeb,
    WanderingToBuildSite,
    Building,
}

named!(SpiderPhase {
    Falling => "Falling",
    WanderingOnWeb => "WanderingOnWeb",
    WanderingToBuildSite => "WanderingToBuildSite",
    Building => "Building",
});

#[derive(Clone, PartialEq, Debug, Default)]
pub struct SpiderState {
    pub phase: SpiderPhase,
    pub last_state_change: u64,
    pub last_move: (i32, i32),
    /// Preferred heading while scouting.
    pub wander_dir: (i32, i32),
    pub build_dir: (i32, i32),
    /// Standing on a strand, which is put back when the spider leaves.
    pub on_web: bool,
    pub wander_ticks: u32,
    pub last_activity: u64,
    pub history: Trail,
}

impl Persist for SpiderState {
    fn write(&self, out: &mut FieldWriter) {
        out.value(self.phase.name())
            .value(self.last_state_change)
            .coord(self.last_move)
            .coord(self.wander_dir)
            .coord(self.build_dir)
            .flag(self.on_web)
            .value(self.wander_ticks)
            .value(self.last_activity)
            .coords(self.history.cells());
    }

    fn read(input: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            phase: input.name(SpiderPhase::from_name)?,
            last_state_change: input.parse()?,
            last_move: input.coord()?,
            wander_dir: input.coord()?,
            build_dir: input.coord()?,
            on_web: input.flag()?,
            wander_ticks: input.parse()?,
            last_activity: input.parse()?,
            history: Trail::from_cells(input.coords()?),
        })
    }
}

impl SpiderState {
    fn enter(&mut self, phase: SpiderPhase, tick: u64) {
        self.phase = phase;
        self.last_state_change = tick;
        self.wander_ticks = 0;
    }
}

/// Something a web can be anchored to: at least as heavy as the spider, and
/// not another spider.
fn is_anchor(element: &Element, spider: &Element) -> bool {
    element.density >= spider.density && element.species() != Species::Spider
}

pub fn update_spider(api: &mut SandApi) {
    let Some(mut spider) = api.my_state::<SpiderState>() else {
        return;
    };
    if !activity_due(&mut spider.last_activity, api.tick, ACTIVITY_INTERVAL) {
        api.set_my_state(spider);
        return;
    }

    match spider.phase {
        SpiderPhase::Falling => fall(api, &mut spider),
        SpiderPhase::WanderingOnWeb => roam_web(api, &mut spider),
        SpiderPhase::WanderingToBuildSite => scout(api, &mut spider),
        SpiderPhase::Building => build(api, &mut spider),
    }
    api.set_my_state(spider);
}

/// Anchors around `(x, y)` in the previous view, ignoring the spider's own cell.
fn anchors_around(api: &SandApi, x: i32, y: i32) -> usize {
    let (me_x, me_y) = (api.x, api.y);
    NEIGHBORS
        .iter()
        .map(|&(nx, ny)| (x + nx, y + ny))
        .filter(|&cell| cell != (me_x, me_y))
        .filter(|&(cx, cy)| {
            api.prev(cx - me_x, cy - me_y)
                .is_some_and(|e| is_anchor(e, api.me()))
        })
        .count()
}

fn fall(api: &mut SandApi, spider: &mut SpiderState) {
    let near_web = NEIGHBORS
        .iter()
        .any(|&(dx, dy)| api.prev_species(dx, dy) == Some(Species::Web));
    if near_web {
        spider.enter(SpiderPhase::WanderingOnWeb, api.tick);
        return;
    }
    if anchors_around(api, api.x, api.y) > 0 {
        spider.enter(SpiderPhase::WanderingToBuildSite, api.tick);
        let rng = api.rng();
        spider.wander_dir = (rng.gen_range(-1..=1), rng.gen_range(-1..=1));
        return;
    }
    api.try_move(0, 1);
}

/// Move one cell, leaving a strand behind when stepping off a web.
fn crawl(api: &mut SandApi, spider: &mut SpiderState, dx: i32, dy: i32) {
    let onto_web = api.live_species(dx, dy) == Some(Species::Web);
    let behind = spider.on_web.then(|| api.fresh(Species::Web));
    spider.history.push((api.x, api.y));
    api.relocate(dx, dy, behind);
    spider.on_web = onto_web;
    spider.last_move = (dx, dy);
}

fn roam_web(api: &mut SandApi, spider: &mut SpiderState) {
    if api.tick.saturating_sub(spider.last_state_change) > RESTLESS_AFTER
        && api.chance(RESTLESS_CHANCE)
    {
        spider.enter(SpiderPhase::WanderingToBuildSite, api.tick);
        return;
    }

    let back = (-spider.last_move.0, -spider.last_move.1);
    let mut strands: Vec<(i32, i32)> = NEIGHBORS
        .iter()
        .copied()
        .filter(|&(dx, dy)| {
            api.prev_species(dx, dy) == Some(Species::Web)
                && api.live_species(dx, dy) == Some(Species::Web)
        })
        .collect();
    if strands.is_empty() {
        if !spider.on_web {
            spider.enter(SpiderPhase::Falling, api.tick);
        }
        return;
    }
    strands.retain(|&dir| dir != back);
    strands.shuffle(api.rng());
    if let Some(&(dx, dy)) = strands.first() {
        if api.chance(WEB_STEP_CHANCE) {
            crawl(api, spider, dx, dy);
        }
    }
}

/// Explore cells that hug solid ground, drifting along the preferred heading,
/// and after a while pick a direction to spin a strand in.
fn scout(api: &mut SandApi, spider: &mut SpiderState) {
    spider.wander_ticks += 1;
    if spider.wander_ticks >= SCOUT_TICKS {
        spider.wander_ticks = 0;
        if let Some(dir) = plan_strand(api) {
            spider.build_dir = dir;
            spider.enter(SpiderPhase::Building, api.tick);
            return;
        }
    }

    let (x, y) = (api.x, api.y);
    let mut open: Vec<(i32, i32)> = NEIGHBORS
        .iter()
        .copied()
        .filter(|&(dx, dy)| match api.live_species(dx, dy) {
            Some(Species::Web) => true,
            None => api.in_bounds(dx, dy) && anchors_around(api, x + dx, y + dy) > 0,
            Some(_) => false,
        })
        .collect();
    if open.is_empty() {
        spider.enter(SpiderPhase::Falling, api.tick);
        return;
    }
    open.shuffle(api.rng());
    let fresh: Vec<(i32, i32)> = open
        .iter()
        .copied()
        .filter(|&(dx, dy)| !spider.history.contains((x + dx, y + dy)))
        .collect();
    let pool = if fresh.is_empty() { &open } else { &fresh };
    let (wx, wy) = spider.wander_dir;
    let best = pool
        .iter()
        .copied()
        .max_by_key(|&(dx, dy)| -(dx - wx).abs() - (dy - wy).abs());
    if let Some((dx, dy)) = best {
        crawl(api, spider, dx, dy);
    }
}

/// First of the eight directions (in random order) whose ray reaches an
/// anchor, a web or the edge of the world within `RAY_LENGTH` cells, without
/// brushing past more anchors than its length allows.
fn plan_strand(api: &mut SandApi) -> Option<(i32, i32)> {
    let mut directions = NEIGHBORS;
    directions.shuffle(api.rng());
    let view: &SandApi = api;
    directions.into_iter().find(|&dir| ray_reaches_anchor(view, dir))
}

fn ray_reaches_anchor(api: &SandApi, (dx, dy): (i32, i32)) -> bool {
    let mut closeness = 0;
    for step in 1..=RAY_LENGTH {
        let (ox, oy) = (dx * step, dy * step);
        if !api.in_bounds(ox, oy) {
            return step > 1;
        }
        match api.prev(ox, oy) {
            Some(e) if e.species() == Species::Web || is_anchor(e, api.me()) => return step > 1,
            Some(_) => return false,
            None => {
                closeness += anchors_around(api, api.x + ox, api.y + oy);
                if closeness > step as usize * CLOSENESS_PER_CELL {
                    return false;
                }
            }
        }
    }
    false
}

/// Spin a strand one cell ahead and climb onto it, until something blocks.
fn build(api: &mut SandApi, spider: &mut SpiderState) {
    let (dx, dy) = spider.build_dir;
    if (dx, dy) == (0, 0) || !api.is_empty(dx, dy) {
        spider.enter(SpiderPhase::WanderingOnWeb, api.tick);
        return;
    }
    let strand = api.fresh(Species::Web);
    api.spawn(dx, dy, strand);
    crawl(api, spider, dx, dy);
}
