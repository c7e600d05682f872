//! WKT parsing: a token scanner over an advancing cursor plus a
//! recursive-descent geometry reader.

use crate::datatypes::GeometryType;
use crate::error::{GeoWireError, Result};
use crate::geometry::{Coord, Geometry};
use crate::io::MAX_NESTING_DEPTH;

/// Parse a complete WKT string; anything but whitespace after the geometry
/// is an error.
pub fn from_wkt(input: &str) -> Result<Geometry> {
    let mut pos = 0;
    let geom = from_wkt_cursor(input, &mut pos)?;
    let mut tok = Tokenizer {
        input,
        pos,
        token_start: pos,
    };
    if tok.next_token().is_some() {
        return Err(GeoWireError::CorruptData(format!(
            "unexpected trailing content at byte {} of WKT input",
            tok.token_start
        )));
    }
    Ok(geom)
}

/// Parse one geometry starting at `*pos`, advancing the cursor past the
/// consumed tokens. Callers embedding WKT in a larger grammar read several
/// geometries out of one buffer this way.
pub fn from_wkt_cursor(input: &str, pos: &mut usize) -> Result<Geometry> {
    let mut tok = Tokenizer {
        input,
        pos: *pos,
        token_start: *pos,
    };
    let geom = read_geometry(&mut tok, 0)?;
    *pos = tok.pos;
    Ok(geom)
}

#[derive(Clone, Copy)]
struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    /// Byte offset where the last returned token began, for diagnostics.
    token_start: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token<'a> {
    LParen,
    RParen,
    Comma,
    Word(&'a str),
}

impl<'a> Tokenizer<'a> {
    fn next_token(&mut self) -> Option<Token<'a>> {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        self.token_start = self.pos;
        if self.pos >= bytes.len() {
            return None;
        }
        match bytes[self.pos] {
            b'(' => {
                self.pos += 1;
                Some(Token::LParen)
            }
            b')' => {
                self.pos += 1;
                Some(Token::RParen)
            }
            b',' => {
                self.pos += 1;
                Some(Token::Comma)
            }
            _ => {
                let start = self.pos;
                while self.pos < bytes.len()
                    && !bytes[self.pos].is_ascii_whitespace()
                    && !matches!(bytes[self.pos], b'(' | b')' | b',')
                {
                    self.pos += 1;
                }
                Some(Token::Word(&self.input[start..self.pos]))
            }
        }
    }

    fn peek_token(&self) -> Option<Token<'a>> {
        let mut copy = *self;
        copy.next_token()
    }
}

fn unexpected(found: Option<Token>, wanted: &str, tok: &Tokenizer) -> GeoWireError {
    match found {
        Some(t) => GeoWireError::CorruptData(format!(
            "expected {wanted} at byte {} of WKT input, found {t:?}",
            tok.token_start
        )),
        None => GeoWireError::CorruptData(format!("expected {wanted}, found end of WKT input")),
    }
}

fn expect_lparen(tok: &mut Tokenizer) -> Result<()> {
    match tok.next_token() {
        Some(Token::LParen) => Ok(()),
        other => Err(unexpected(other, "'('", tok)),
    }
}

fn is_word(token: Option<Token>, word: &str) -> bool {
    matches!(token, Some(Token::Word(w)) if w.eq_ignore_ascii_case(word))
}

fn parse_number(tok: &mut Tokenizer) -> Result<f64> {
    match tok.next_token() {
        Some(Token::Word(w)) => w.parse::<f64>().map_err(|_| {
            GeoWireError::CorruptData(format!(
                "expected a number at byte {} of WKT input, found '{w}'",
                tok.token_start
            ))
        }),
        other => Err(unexpected(other, "a number", tok)),
    }
}

/// Read one coordinate tuple: two ordinates, plus a third when the `Z` tag
/// demands it or (legacy laxity) when one simply follows.
fn read_coord(tok: &mut Tokenizer, z_tagged: bool, saw_z: &mut bool) -> Result<Coord> {
    let x = parse_number(tok)?;
    let y = parse_number(tok)?;
    let mut z = 0.0;
    let third_present = matches!(
        tok.peek_token(),
        Some(Token::Word(w)) if w.parse::<f64>().is_ok()
    );
    if third_present {
        z = parse_number(tok)?;
        *saw_z = true;
    } else if z_tagged {
        return Err(unexpected(tok.peek_token(), "a Z ordinate", tok));
    }
    if matches!(tok.peek_token(), Some(Token::Word(_))) {
        return Err(GeoWireError::CorruptData(
            "more than 3 ordinates in a WKT coordinate".to_string(),
        ));
    }
    Ok(Coord::new_z(x, y, z))
}

/// Read `(c, c, ...)`, the opening paren included.
fn read_coord_list(tok: &mut Tokenizer, z_tagged: bool, saw_z: &mut bool) -> Result<Vec<Coord>> {
    expect_lparen(tok)?;
    let mut coords = Vec::new();
    loop {
        coords.push(read_coord(tok, z_tagged, saw_z)?);
        match tok.next_token() {
            Some(Token::Comma) => continue,
            Some(Token::RParen) => break,
            other => return Err(unexpected(other, "',' or ')'", tok)),
        }
    }
    Ok(coords)
}

/// Consume `EMPTY` or `(EMPTY)` if present. The parenthesized form is a
/// non-standard legacy spelling that must still be accepted.
fn take_empty(tok: &mut Tokenizer) -> bool {
    if is_word(tok.peek_token(), "EMPTY") {
        tok.next_token();
        return true;
    }
    let mut copy = *tok;
    if copy.next_token() == Some(Token::LParen)
        && is_word(copy.next_token(), "EMPTY")
        && copy.next_token() == Some(Token::RParen)
    {
        *tok = copy;
        return true;
    }
    false
}

fn read_geometry(tok: &mut Tokenizer, depth: u32) -> Result<Geometry> {
    let keyword = match tok.next_token() {
        Some(Token::Word(w)) => w,
        other => return Err(unexpected(other, "a geometry keyword", tok)),
    };
    let geometry_type = GeometryType::from_name(keyword).ok_or_else(|| {
        GeoWireError::CorruptData(format!("unrecognized WKT keyword '{keyword}'"))
    })?;
    if matches!(geometry_type, GeometryType::Unknown | GeometryType::NoGeometry) {
        return Err(GeoWireError::CorruptData(format!(
            "'{keyword}' is not an instantiable WKT type"
        )));
    }

    let mut z_tagged = false;
    match tok.peek_token() {
        Some(Token::Word(w)) if w.eq_ignore_ascii_case("Z") => {
            tok.next_token();
            z_tagged = true;
        }
        Some(Token::Word(w)) if w.eq_ignore_ascii_case("M") || w.eq_ignore_ascii_case("ZM") => {
            return Err(GeoWireError::CorruptData(
                "measured (M) WKT geometry is not supported".to_string(),
            ));
        }
        _ => {}
    }

    if take_empty(tok) {
        let mut geom = Geometry::empty_of_type(geometry_type)?;
        geom.set_3d(z_tagged);
        return Ok(geom);
    }

    if geometry_type.is_collection()
        || matches!(
            geometry_type,
            GeometryType::CompoundCurve | GeometryType::CurvePolygon
        )
    {
        if depth + 1 >= MAX_NESTING_DEPTH {
            return Err(GeoWireError::CorruptData(format!(
                "geometry containers nested {MAX_NESTING_DEPTH} levels or more"
            )));
        }
    }

    let mut saw_z = false;
    use GeometryType::*;
    let mut geom = match geometry_type {
        Point => {
            expect_lparen(tok)?;
            let c = read_coord(tok, z_tagged, &mut saw_z)?;
            match tok.next_token() {
                Some(Token::RParen) => {}
                other => return Err(unexpected(other, "')'", tok)),
            }
            if z_tagged || saw_z {
                Geometry::point_z(c.x, c.y, c.z)
            } else {
                Geometry::point(c.x, c.y)
            }
        }
        LineString | LinearRing | CircularString => {
            let coords = read_coord_list(tok, z_tagged, &mut saw_z)?;
            let has_z = z_tagged || saw_z;
            match geometry_type {
                LineString => Geometry::line_string(coords, has_z),
                LinearRing => Geometry::linear_ring(coords, has_z),
                _ => Geometry::circular_string(coords, has_z),
            }
        }
        Polygon => {
            expect_lparen(tok)?;
            let mut poly = Geometry::empty_of_type(Polygon)?;
            loop {
                let coords = read_coord_list(tok, z_tagged, &mut saw_z)?;
                poly.push_child_unchecked(Geometry::linear_ring(coords, z_tagged || saw_z));
                match tok.next_token() {
                    Some(Token::Comma) => continue,
                    Some(Token::RParen) => break,
                    other => return Err(unexpected(other, "',' or ')'", tok)),
                }
            }
            poly
        }
        MultiPoint => {
            expect_lparen(tok)?;
            let mut mp = Geometry::empty_of_type(MultiPoint)?;
            loop {
                if is_word(tok.peek_token(), "EMPTY") {
                    tok.next_token();
                    mp.push_child_unchecked(Geometry::point_empty());
                } else {
                    let parenthesized = tok.peek_token() == Some(Token::LParen);
                    if parenthesized {
                        tok.next_token();
                    }
                    let c = read_coord(tok, z_tagged, &mut saw_z)?;
                    if parenthesized {
                        match tok.next_token() {
                            Some(Token::RParen) => {}
                            other => return Err(unexpected(other, "')'", tok)),
                        }
                    }
                    let child = if z_tagged || saw_z {
                        Geometry::point_z(c.x, c.y, c.z)
                    } else {
                        Geometry::point(c.x, c.y)
                    };
                    mp.push_child_unchecked(child);
                }
                match tok.next_token() {
                    Some(Token::Comma) => continue,
                    Some(Token::RParen) => break,
                    other => return Err(unexpected(other, "',' or ')'", tok)),
                }
            }
            mp
        }
        MultiLineString | MultiPolygon | MultiCurve | MultiSurface | CompoundCurve
        | CurvePolygon => read_container(tok, geometry_type, z_tagged, depth)?,
        GeometryCollection => {
            expect_lparen(tok)?;
            let mut gc = Geometry::empty_of_type(GeometryCollection)?;
            loop {
                let child = read_geometry(tok, depth + 1)?;
                gc.add_child(child).map_err(|_| {
                    GeoWireError::CorruptData(
                        "invalid member geometry in GEOMETRYCOLLECTION".to_string(),
                    )
                })?;
                match tok.next_token() {
                    Some(Token::Comma) => continue,
                    Some(Token::RParen) => break,
                    other => return Err(unexpected(other, "',' or ')'", tok)),
                }
            }
            gc
        }
        Unknown | NoGeometry => unreachable!("rejected above"),
    };

    if z_tagged || saw_z {
        geom.set_3d(true);
    }
    Ok(geom)
}

/// Containers whose members are either bare parenthesized shapes (implying
/// the container's natural member type) or keyword-prefixed sub-geometries.
fn read_container(
    tok: &mut Tokenizer,
    container: GeometryType,
    z_tagged: bool,
    depth: u32,
) -> Result<Geometry> {
    use GeometryType::*;
    expect_lparen(tok)?;
    let mut out = Geometry::empty_of_type(container)?;
    loop {
        let mut saw_z = false;
        let child = if is_word(tok.peek_token(), "EMPTY") {
            tok.next_token();
            let bare = match container {
                MultiPolygon | MultiSurface => Polygon,
                _ => LineString,
            };
            Geometry::empty_of_type(bare)?
        } else if tok.peek_token() == Some(Token::LParen) {
            // A bare shape in the container's natural member type.
            match container {
                MultiPolygon | MultiSurface => {
                    expect_lparen(tok)?;
                    let mut poly = Geometry::empty_of_type(Polygon)?;
                    loop {
                        let coords = read_coord_list(tok, z_tagged, &mut saw_z)?;
                        poly.push_child_unchecked(Geometry::linear_ring(
                            coords,
                            z_tagged || saw_z,
                        ));
                        match tok.next_token() {
                            Some(Token::Comma) => continue,
                            Some(Token::RParen) => break,
                            other => return Err(unexpected(other, "',' or ')'", tok)),
                        }
                    }
                    poly
                }
                _ => {
                    let coords = read_coord_list(tok, z_tagged, &mut saw_z)?;
                    Geometry::line_string(coords, z_tagged || saw_z)
                }
            }
        } else {
            read_geometry(tok, depth + 1)?
        };

        let child_type = child.geometry_type();
        let compatible = match container {
            MultiLineString => matches!(child_type, LineString | LinearRing),
            MultiPolygon | MultiSurface => matches!(child_type, Polygon | CurvePolygon),
            MultiCurve | CurvePolygon => matches!(
                child_type,
                LineString | LinearRing | CircularString | CompoundCurve
            ),
            CompoundCurve => matches!(child_type, LineString | LinearRing | CircularString),
            _ => unreachable!("not a bare-member container"),
        };
        if !compatible {
            return Err(GeoWireError::CorruptData(format!(
                "{} is not a valid WKT member of {container}",
                child.geometry_type()
            )));
        }
        out.push_child_unchecked(child);
        match tok.next_token() {
            Some(Token::Comma) => continue,
            Some(Token::RParen) => break,
            other => return Err(unexpected(other, "',' or ')'", tok)),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn point_forms() {
        assert_eq!(from_wkt("POINT (1 2)").unwrap(), Geometry::point(1.0, 2.0));
        assert_eq!(from_wkt("point(1 2)").unwrap(), Geometry::point(1.0, 2.0));
        assert_eq!(
            from_wkt("POINT Z (1 2 3)").unwrap(),
            Geometry::point_z(1.0, 2.0, 3.0)
        );
        // Legacy laxity: a bare third ordinate without the Z tag.
        assert_eq!(
            from_wkt("POINT (1 2 3)").unwrap(),
            Geometry::point_z(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn empty_forms_including_legacy_parenthesized() {
        for text in ["POINT EMPTY", "POINT(EMPTY)", "point ( empty )"] {
            let geom = from_wkt(text).unwrap();
            assert!(geom.is_empty(), "{text}");
            assert_eq!(geom.geometry_type(), GeometryType::Point);
        }
        let geom = from_wkt("MULTIPOLYGON EMPTY").unwrap();
        assert!(geom.is_empty());
        assert_eq!(geom.geometry_type(), GeometryType::MultiPolygon);
        let geom = from_wkt("GEOMETRYCOLLECTION (EMPTY)");
        assert!(geom.unwrap().is_empty());
        assert!(from_wkt("LINESTRING Z EMPTY").unwrap().has_z());
    }

    #[test]
    fn measured_tags_are_rejected() {
        assert!(matches!(
            from_wkt("POINT M (1 2 3)"),
            Err(GeoWireError::CorruptData(_))
        ));
        assert!(matches!(
            from_wkt("LINESTRING ZM (1 2 3 4,5 6 7 8)"),
            Err(GeoWireError::CorruptData(_))
        ));
    }

    #[test]
    fn polygon_with_hole() {
        let geom = from_wkt(
            "POLYGON ((0 0,10 0,10 10,0 10,0 0),(1 1,2 1,2 2,1 1))",
        )
        .unwrap();
        assert_eq!(geom.geometry_type(), GeometryType::Polygon);
        assert_eq!(geom.num_interior_rings(), 1);
        assert_eq!(geom.exterior_ring().unwrap().coords().len(), 5);
    }

    #[test]
    fn multipoint_with_and_without_parens() {
        let bare = from_wkt("MULTIPOINT (1 2,3 4)").unwrap();
        let wrapped = from_wkt("MULTIPOINT ((1 2),(3 4))").unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare.num_children(), 2);
        assert_eq!(bare.children()[1], Geometry::point(3.0, 4.0));
    }

    #[test]
    fn curve_containers_mix_bare_and_keyword_members() {
        let cc = from_wkt("COMPOUNDCURVE ((0 0,1 0),CIRCULARSTRING (1 0,2 1,3 0))").unwrap();
        assert_eq!(cc.geometry_type(), GeometryType::CompoundCurve);
        assert_eq!(cc.children()[0].geometry_type(), GeometryType::LineString);
        assert_eq!(cc.children()[1].geometry_type(), GeometryType::CircularString);

        let cp = from_wkt(
            "CURVEPOLYGON (CIRCULARSTRING (0 0,1 1,2 0,1 -1,0 0),(0.2 0,0.5 0.2,0.8 0,0.2 0))",
        )
        .unwrap();
        assert_eq!(cp.geometry_type(), GeometryType::CurvePolygon);
        assert_eq!(cp.num_children(), 2);

        let ms = from_wkt("MULTISURFACE (((0 0,1 0,1 1,0 0)),CURVEPOLYGON (CIRCULARSTRING (0 0,1 1,2 0,1 -1,0 0)))").unwrap();
        assert_eq!(ms.children()[0].geometry_type(), GeometryType::Polygon);
        assert_eq!(ms.children()[1].geometry_type(), GeometryType::CurvePolygon);
    }

    #[test]
    fn nested_collections_and_the_recursion_guard() {
        let mut text = String::new();
        for _ in 0..31 {
            text.push_str("GEOMETRYCOLLECTION (");
        }
        text.push_str("POINT (1 2)");
        text.push_str(&")".repeat(31));
        assert!(from_wkt(&text).is_ok());

        let mut text = String::new();
        for _ in 0..32 {
            text.push_str("GEOMETRYCOLLECTION (");
        }
        text.push_str("POINT (1 2)");
        text.push_str(&")".repeat(32));
        assert!(matches!(
            from_wkt(&text),
            Err(GeoWireError::CorruptData(_))
        ));
    }

    #[test]
    fn malformed_inputs_are_corrupt() {
        for text in [
            "",
            "POINT",
            "POINT (1)",
            "POINT (1 2",
            "POINT (1 2))",
            "POINT (1 2 3 4)",
            "BANANA (1 2)",
            "LINESTRING (1 2,)",
            "POLYGON (0 0,1 0,1 1,0 0)",
            "MULTIPOLYGON ((0 0,1 0,1 1,0 0))",
        ] {
            let res = from_wkt(text);
            assert!(
                matches!(res, Err(GeoWireError::CorruptData(_))),
                "{text}: {res:?}"
            );
        }
    }

    #[test]
    fn cursor_advances_past_one_geometry() {
        let input = "POINT (1 2) LINESTRING (0 0,1 1)";
        let mut pos = 0;
        let first = from_wkt_cursor(input, &mut pos).unwrap();
        assert_eq!(first, Geometry::point(1.0, 2.0));
        let second = from_wkt_cursor(input, &mut pos).unwrap();
        assert_eq!(second.geometry_type(), GeometryType::LineString);
        assert_eq!(pos, input.len());
    }

    #[test]
    fn z_widening_is_collection_wide() {
        let geom = from_wkt("MULTIPOINT (1 2,3 4 5)").unwrap();
        assert!(geom.has_z());
        assert!(geom.children()[0].has_z());
    }
}
