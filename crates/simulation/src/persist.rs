//! Text save format.
//!
//! ```text
//! width height cell_width cell_height
//! <height tokens for x = 0>
//! <height tokens for x = 1>
//! ...
//! ```
//!
//! A token is `-` for an empty cell, a bare type name, or `Type|state` where
//! `state` is a `;`-separated field list: the shared base fields
//! (`burning;burning_lifetime;wetness`) followed by the variant's own fields.

use std::fmt::Display;
use std::str::FromStr;

use crate::arena::Arena;
use crate::cell::{Element, Kind, Species};
use crate::error::FormatError;
use crate::Grid;

/// Field-level encoding of a variant's state.
pub trait Persist: Sized {
    fn write(&self, out: &mut FieldWriter);
    fn read(input: &mut FieldReader<'_>) -> Result<Self, FormatError>;
}

/// Accumulates `;`-separated fields.
#[derive(Debug, Default)]
pub struct FieldWriter {
    fields: Vec<String>,
}

impl FieldWriter {
    /// Any scalar. Floats use the shortest representation that parses back
    /// to the same value.
    pub fn value(&mut self, value: impl Display) -> &mut Self {
        self.fields.push(value.to_string());
        self
    }

    pub fn flag(&mut self, value: bool) -> &mut Self {
        self.value(u8::from(value))
    }

    pub fn coord(&mut self, (x, y): (i32, i32)) -> &mut Self {
        self.value(x).value(y)
    }

    /// `-1;-1` stands for `None`.
    pub fn opt_coord(&mut self, coord: Option<(i32, i32)>) -> &mut Self {
        self.coord(coord.unwrap_or((-1, -1)))
    }

    /// Coordinate list as `x:y,x:y`, `_` when empty.
    pub fn coords(&mut self, coords: &[(i32, i32)]) -> &mut Self {
        if coords.is_empty() {
            return self.value("_");
        }
        let joined = coords
            .iter()
            .map(|(x, y)| format!("{x}:{y}"))
            .collect::<Vec<_>>()
            .join(",");
        self.value(joined)
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.fields.join(";")
    }
}

/// Cursor over the fields of one token's state.
#[derive(Debug)]
pub struct FieldReader<'a> {
    species: Species,
    fields: Vec<&'a str>,
    index: usize,
}

impl<'a> FieldReader<'a> {
    #[must_use]
    pub fn new(species: Species, state: &'a str) -> Self {
        Self {
            species,
            fields: state.split(';').collect(),
            index: 0,
        }
    }

    fn next(&mut self) -> Result<&'a str, FormatError> {
        let field = self
            .fields
            .get(self.index)
            .copied()
            .ok_or(FormatError::MissingField {
                species: self.species,
                index: self.index,
            })?;
        self.index += 1;
        Ok(field)
    }

    fn bad(&self, value: &str) -> FormatError {
        FormatError::BadField {
            species: self.species,
            index: self.index - 1,
            value: value.to_string(),
        }
    }

    pub fn parse<T: FromStr>(&mut self) -> Result<T, FormatError> {
        let field = self.next()?;
        field.trim().parse().map_err(|_| self.bad(field))
    }

    pub fn flag(&mut self) -> Result<bool, FormatError> {
        match self.next()? {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(self.bad(other)),
        }
    }

    /// A named enum value, looked up with `from_name`.
    pub fn name<T>(&mut self, from_name: impl Fn(&str) -> Option<T>) -> Result<T, FormatError> {
        let field = self.next()?;
        from_name(field).ok_or_else(|| self.bad(field))
    }

    pub fn coord(&mut self) -> Result<(i32, i32), FormatError> {
        Ok((self.parse()?, self.parse()?))
    }

    pub fn opt_coord(&mut self) -> Result<Option<(i32, i32)>, FormatError> {
        let coord = self.coord()?;
        Ok((coord != (-1, -1)).then_some(coord))
    }

    pub fn coords(&mut self) -> Result<Vec<(i32, i32)>, FormatError> {
        let field = self.next()?;
        if field == "_" {
            return Ok(Vec::new());
        }
        field
            .split(',')
            .map(|pair| {
                let (x, y) = pair.split_once(':')?;
                Some((x.parse().ok()?, y.parse().ok()?))
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| self.bad(field))
    }
}

fn write_kind(kind: &Kind, out: &mut FieldWriter) -> bool {
    match kind {
        Kind::Sand | Kind::Wood => return false,
        Kind::Ash(s) | Kind::Soil(s) => s.write(out),
        Kind::Biomass(s) | Kind::SurfBiomass(s) => s.write(out),
        Kind::Water(s) | Kind::Oil(s) => s.write(out),
        Kind::Smoke(s) | Kind::Steam(s) => s.write(out),
        Kind::Seed(s) => s.write(out),
        Kind::Root(s) => s.write(out),
        Kind::Leaf(s) => s.write(out),
        Kind::Fruit(s) => s.write(out),
        Kind::Fly(s) => s.write(out),
        Kind::Snail(s) => s.write(out),
        Kind::Spider(s) => s.write(out),
        Kind::Worm(s) => s.write(out),
        Kind::Web(s) => s.write(out),
    }
    true
}

fn read_kind(species: Species, input: &mut FieldReader<'_>) -> Result<Kind, FormatError> {
    Ok(match species {
        Species::Sand => Kind::Sand,
        Species::Wood => Kind::Wood,
        Species::Ash => Kind::Ash(Persist::read(input)?),
        Species::Soil => Kind::Soil(Persist::read(input)?),
        Species::Biomass => Kind::Biomass(Persist::read(input)?),
        Species::SurfBiomass => Kind::SurfBiomass(Persist::read(input)?),
        Species::Water => Kind::Water(Persist::read(input)?),
        Species::Oil => Kind::Oil(Persist::read(input)?),
        Species::Smoke => Kind::Smoke(Persist::read(input)?),
        Species::Steam => Kind::Steam(Persist::read(input)?),
        Species::Seed => Kind::Seed(Persist::read(input)?),
        Species::Root => Kind::Root(Persist::read(input)?),
        Species::Leaf => Kind::Leaf(Persist::read(input)?),
        Species::Fruit => Kind::Fruit(Persist::read(input)?),
        Species::Fly => Kind::Fly(Persist::read(input)?),
        Species::Snail => Kind::Snail(Persist::read(input)?),
        Species::Spider => Kind::Spider(Persist::read(input)?),
        Species::Worm => Kind::Worm(Persist::read(input)?),
        Species::Web => Kind::Web(Persist::read(input)?),
    })
}

/// One grid token for a non-empty cell.
#[must_use]
pub fn encode_element(element: &Element) -> String {
    let mut out = FieldWriter::default();
    out.flag(element.burning)
        .value(element.burning_lifetime)
        .value(element.wetness());
    let has_fields = write_kind(&element.kind, &mut out);
    let default_base = !element.burning
        && element.burning_lifetime == 0
        && element.wetness() == element.default_wetness();
    if !has_fields && default_base {
        element.species().name().to_string()
    } else {
        format!("{}|{}", element.species(), out.finish())
    }
}

/// Rebuild an element from its type and optional state string.
pub fn decode_element(species: Species, state: Option<&str>) -> Result<Element, FormatError> {
    let mut element = Element::new(species);
    let Some(state) = state else {
        return Ok(element);
    };
    let mut input = FieldReader::new(species, state);
    element.burning = input.flag()?;
    element.burning_lifetime = input.parse()?;
    let wetness: f32 = input.parse()?;
    element.kind = read_kind(species, &mut input)?;
    element.set_wetness(wetness);
    Ok(element)
}

fn decode_token(token: &str) -> Result<Option<Element>, FormatError> {
    if token == "-" {
        return Ok(None);
    }
    let (name, state) = match token.split_once('|') {
        Some((name, state)) => (name, Some(state)),
        None => (token, None),
    };
    let species: Species = name.parse()?;
    decode_element(species, state).map(Some)
}

/// Serialise a grid and the elements it references.
#[must_use]
pub fn encode_world(grid: &Grid, arena: &Arena, cell_width: u32, cell_height: u32) -> String {
    let mut out = format!("{} {} {cell_width} {cell_height}\n", grid.width, grid.height);
    for x in 0..grid.width as i32 {
        let row: Vec<String> = (0..grid.height as i32)
            .map(|y| {
                grid.get(x, y)
                    .and_then(|id| arena.get(id))
                    .map_or_else(|| "-".to_string(), encode_element)
            })
            .collect();
        out += &row.join(" ");
        out.push('\n');
    }
    out
}

/// A fully parsed save, ready to be swapped into a world.
#[derive(Debug)]
pub struct Decoded {
    pub grid: Grid,
    pub arena: Arena,
    pub cell_width: u32,
    pub cell_height: u32,
}

fn header_int<T: FromStr>(fields: &[&str], index: usize) -> Result<T, FormatError> {
    fields[index]
        .parse()
        .map_err(|_| FormatError::BadInteger {
            index,
            value: fields[index].to_string(),
        })
}

/// Parse a whole save. Nothing is returned unless every row and token parsed.
pub fn decode_world(text: &str) -> Result<Decoded, FormatError> {
    let mut lines = text.lines();
    let header = lines
        .next()
        .filter(|line| !line.trim().is_empty())
        .ok_or(FormatError::MissingHeader)?;
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(FormatError::BadHeader {
            found: fields.len(),
        });
    }
    let width: usize = header_int(&fields, 0)?;
    let height: usize = header_int(&fields, 1)?;
    let cell_width: u32 = header_int(&fields, 2)?;
    let cell_height: u32 = header_int(&fields, 3)?;

    if width.checked_mul(height).is_none() {
        return Err(FormatError::OversizedGrid { width, height });
    }

    // Every row is split and length-checked before the grid is allocated, so
    // the allocation never exceeds what the text actually holds.
    let mut rows = Vec::with_capacity(width.min(text.len()));
    for x in 0..width {
        let line = lines.next().ok_or(FormatError::MissingRows {
            expected: width,
            found: x,
        })?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < height {
            return Err(FormatError::ShortRow {
                row: x,
                expected: height,
                found: tokens.len(),
            });
        }
        rows.push(tokens);
    }

    let mut grid = Grid::new(width, height);
    let mut arena = Arena::new();
    for (x, tokens) in rows.iter().enumerate() {
        for (y, token) in tokens.iter().take(height).enumerate() {
            if let Some(element) = decode_token(token)? {
                let id = arena.insert(element);
                grid.set(x as i32, y as i32, Some(id));
            }
        }
    }
    Ok(Decoded {
        grid,
        arena,
        cell_width,
        cell_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::leaf::LeafState;
    use crate::elements::seed::{SeedPhase, SeedState};
    use crate::elements::soil::SoilState;
    use crate::World;

    #[test]
    fn bare_tokens_for_plain_elements() {
        assert_eq!(encode_element(&Element::new(Species::Sand)), "Sand");
        assert_eq!(encode_element(&Element::new(Species::Wood)), "Wood");
        assert_eq!(
            encode_element(&Element::soil(1.5, 0.25)),
            "Soil|0;0;0.25;1.5"
        );
    }

    #[test]
    fn burning_state_is_written_first() {
        let mut wood = Element::new(Species::Wood);
        wood.burning = true;
        wood.burning_lifetime = 30;
        assert_eq!(encode_element(&wood), "Wood|1;30;0");
        let back = decode_token("Wood|1;30;0").unwrap().unwrap();
        assert!(back.burning);
        assert_eq!(back.burning_lifetime, 30);
    }

    #[test]
    fn leaf_children_round_trip() {
        let mut leaf = Element::new(Species::Leaf);
        *leaf.state_mut::<LeafState>().unwrap() = LeafState {
            parent: (4, 9),
            nutrient: 0.75,
            dying: false,
            grow_timer: 12,
            children: vec![(3, 7), (5, 7)],
        };
        let token = encode_element(&leaf);
        assert_eq!(token, "Leaf|0;0;0;4;9;0.75;0;12;3:7,5:7");
        assert_eq!(decode_token(&token).unwrap().unwrap(), leaf);
    }

    #[test]
    fn seed_without_leaf_uses_sentinel() {
        let mut seed = Element::new(Species::Seed);
        let state = seed.state_mut::<SeedState>().unwrap();
        state.phase = SeedPhase::Seed;
        state.first_leaf = None;
        let token = encode_element(&seed);
        assert!(token.ends_with(";-1;-1"), "{token}");
        assert_eq!(decode_token(&token).unwrap().unwrap(), seed);
    }

    #[test]
    fn biomass_wetness_above_one_survives() {
        let biomass = Element::biomass(true, 2.0, 3.5);
        let back = decode_token(&encode_element(&biomass)).unwrap().unwrap();
        assert_eq!(back.wetness(), 3.5);
        assert_eq!(back.species(), Species::SurfBiomass);
    }

    #[test]
    fn header_errors() {
        assert_eq!(decode_world("").unwrap_err(), FormatError::MissingHeader);
        assert_eq!(
            decode_world("3 3 8\n").unwrap_err(),
            FormatError::BadHeader { found: 3 }
        );
        assert_eq!(
            decode_world("3 x 8 8\n").unwrap_err(),
            FormatError::BadInteger {
                index: 1,
                value: "x".into()
            }
        );
    }

    #[test]
    fn oversized_headers_are_rejected_without_allocating() {
        assert_eq!(
            decode_world("4294967296 4294967296 1 1\n").unwrap_err(),
            FormatError::OversizedGrid {
                width: 4_294_967_296,
                height: 4_294_967_296
            }
        );
        assert_eq!(
            decode_world(&format!("{} 2 1 1\n", usize::MAX)).unwrap_err(),
            FormatError::OversizedGrid {
                width: usize::MAX,
                height: 2
            }
        );
        assert_eq!(
            decode_world("100000 100000 1 1\n- -\n").unwrap_err(),
            FormatError::ShortRow {
                row: 0,
                expected: 100_000,
                found: 2
            }
        );
        assert_eq!(
            decode_world("100000 1 1 1\n-\n-\n").unwrap_err(),
            FormatError::MissingRows {
                expected: 100_000,
                found: 2
            }
        );
    }

    #[test]
    fn row_errors() {
        assert_eq!(
            decode_world("2 2 8 8\n- -\n").unwrap_err(),
            FormatError::MissingRows {
                expected: 2,
                found: 1
            }
        );
        assert_eq!(
            decode_world("2 2 8 8\n- -\n-\n").unwrap_err(),
            FormatError::ShortRow {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn token_errors() {
        assert_eq!(
            decode_world("1 1 8 8\nLava\n").unwrap_err(),
            FormatError::UnknownElement("Lava".into())
        );
        assert_eq!(
            decode_world("1 1 8 8\nSoil|0;0\n").unwrap_err(),
            FormatError::MissingField {
                species: Species::Soil,
                index: 2
            }
        );
        assert_eq!(
            decode_world("1 1 8 8\nSoil|0;0;0;lots\n").unwrap_err(),
            FormatError::BadField {
                species: Species::Soil,
                index: 3,
                value: "lots".into()
            }
        );
    }

    #[test]
    fn rows_are_columns_of_the_grid() {
        let decoded = decode_world("2 3 4 5\nSand - -\n- - Soil|0;0;0;2\n").unwrap();
        assert_eq!((decoded.cell_width, decoded.cell_height), (4, 5));
        let at = |x, y| {
            decoded
                .grid
                .get(x, y)
                .map(|id| decoded.arena[id].species())
        };
        assert_eq!(at(0, 0), Some(Species::Sand));
        assert_eq!(at(1, 2), Some(Species::Soil));
        assert_eq!(at(1, 0), None);
        let soil = &decoded.arena[decoded.grid.get(1, 2).unwrap()];
        assert_eq!(soil.state::<SoilState>().unwrap().nutrient, 2.0);
    }

    #[test]
    fn failed_load_keeps_previous_world() {
        let mut world = World::with_seed(3, 3, 1);
        world.place_element(1, 1, "Sand", None).unwrap();
        let before = world.to_save_string();
        assert!(world.load_save_string("5 5 8 8\n- - - - -\n").is_err());
        assert_eq!(world.to_save_string(), before);
        assert_eq!(world.dimensions(), (3, 3));
    }

    #[test]
    fn load_replaces_dimensions() {
        let mut world = World::with_seed(3, 3, 1);
        world.load_save_string("2 1 6 6\nWater|0;0;1;-1;600\nSand\n").unwrap();
        assert_eq!(world.dimensions(), (2, 1));
        assert_eq!(world.cell_size(), (6, 6));
        assert_eq!(world.species_at(0, 0), Some(Species::Water));
        assert_eq!(world.population(), 2);
    }

    #[test]
    fn simulated_world_round_trips() {
        let mut world = World::with_seed(24, 24, 11);
        for x in 0..24 {
            for y in 18..24 {
                world.place_element(x, y, "Soil", None).unwrap();
            }
            world.place_element(x, 0, "Water", None).unwrap();
        }
        for (x, name) in [
            (2, "Seed"),
            (6, "Snail"),
            (10, "Spider"),
            (14, "Worm"),
            (18, "Fly"),
            (20, "Fruit"),
            (22, "Oil"),
        ] {
            world.place_element(x, 10, name, None).unwrap();
        }
        world.place_element(4, 4, "Steam", None).unwrap();
        world.ignite(22, 10);
        for _ in 0..150 {
            world.step();
        }

        let saved = world.to_save_string();
        let mut restored = World::with_seed(1, 1, 0);
        restored.load_save_string(&saved).unwrap();
        assert_eq!(restored.to_save_string(), saved);
        assert_eq!(restored.population(), world.population());
        assert!((restored.total_wetness() - world.total_wetness()).abs() < 1e-6);
        assert!((restored.total_nutrient() - world.total_nutrient()).abs() < 1e-6);
    }

    #[test]
    fn save_and_load_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.txt");
        let mut world = World::with_seed(6, 4, 3);
        world.place_element(2, 3, "Soil", Some("0;0;0.5;3")).unwrap();
        world.place_element(4, 0, "Smoke", None).unwrap();
        world.save(&path).unwrap();

        let mut other = World::with_seed(2, 2, 0);
        other.load(&path).unwrap();
        assert_eq!(other.to_save_string(), world.to_save_string());
        assert!(other.load(dir.path().join("missing.txt")).is_err());
    }
}
