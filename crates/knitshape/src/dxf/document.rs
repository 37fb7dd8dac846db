//! DXF document parser.
//!
//! Reads the HEADER (`$INSUNITS` only), ENTITIES and BLOCKS sections into
//! a [`DxfDocument`]. Every other section is skipped. Entities we have no
//! use for are skipped too, so real exports full of dimensions, viewports
//! and images still parse.

use std::collections::HashMap;

use tracing::trace;

use super::entity::{
    Arc, Block, Entity, Hatch, HatchEdge, HatchLoop, Insert, Line, Polyline, Spline, SplineCurve,
    Text, Vertex,
};
use super::reader::{DxfReader, invalid, parse_f64, parse_i32};
use crate::error::ConvertError;
use crate::geometry::Point;

type Pair = (i32, String);

/// Everything the extractor needs from a DXF file.
#[derive(Debug, Clone, Default)]
pub struct DxfDocument {
    /// `$INSUNITS` header value, when present
    pub insunits: Option<i32>,
    /// Model space entities, in file order
    pub entities: Vec<Entity>,
    /// Block definitions, in file order
    pub blocks: Vec<Block>,
    block_index: HashMap<String, usize>,
}

impl DxfDocument {
    /// Parse ASCII DXF text.
    pub fn parse(source: &str) -> Result<Self, ConvertError> {
        DxfParser {
            reader: DxfReader::new(source),
        }
        .parse()
    }

    /// Assemble a document from already-built parts.
    pub fn from_parts(insunits: Option<i32>, entities: Vec<Entity>, blocks: Vec<Block>) -> Self {
        let mut doc = Self {
            insunits,
            entities,
            ..Self::default()
        };
        for block in blocks {
            doc.add_block(block);
        }
        doc
    }

    /// Look up a block definition by name (DXF names are case-insensitive).
    pub fn block(&self, name: &str) -> Option<&Block> {
        self.block_index
            .get(&name.trim().to_ascii_uppercase())
            .map(|&i| &self.blocks[i])
    }

    fn add_block(&mut self, block: Block) {
        self.block_index
            .insert(block.name.to_ascii_uppercase(), self.blocks.len());
        self.blocks.push(block);
    }
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl DxfParser<'_> {
    fn parse(mut self) -> Result<DxfDocument, ConvertError> {
        let mut document = DxfDocument::default();
        while let Some((code, value)) = self.reader.next_pair()? {
            if code == 999 {
                // comment
                continue;
            }
            if code != 0 {
                return Err(invalid(format!(
                    "unexpected group code {code} (expected 0 for SECTION or EOF)"
                )));
            }
            match value.trim() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| invalid("SECTION is missing its name"))?;
                    if name_code != 2 {
                        return Err(invalid(format!(
                            "SECTION name uses group code {name_code} (expected 2)"
                        )));
                    }
                    match name.trim() {
                        "HEADER" => self.parse_header(&mut document)?,
                        "ENTITIES" => {
                            document.entities = self.parse_entity_list("ENDSEC")?;
                        }
                        "BLOCKS" => self.parse_blocks(&mut document)?,
                        _ => self.reader.skip_section()?,
                    }
                }
                "EOF" => break,
                other => {
                    return Err(invalid(format!(
                        "unexpected marker {other}, expected SECTION or EOF"
                    )));
                }
            }
        }
        Ok(document)
    }

    fn parse_header(&mut self, document: &mut DxfDocument) -> Result<(), ConvertError> {
        let mut current_var = String::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => return Ok(()),
                Some((9, name)) => current_var = name.trim().to_string(),
                Some((70, value)) if current_var == "$INSUNITS" => {
                    document.insunits = Some(parse_i32(&value, "$INSUNITS")?);
                }
                Some(_) => {}
                None => return Err(invalid("HEADER section is missing its ENDSEC marker")),
            }
        }
    }

    fn parse_blocks(&mut self, document: &mut DxfDocument) -> Result<(), ConvertError> {
        loop {
            let (code, value) = self
                .reader
                .next_pair()?
                .ok_or_else(|| invalid("BLOCKS section ended early"))?;
            if code != 0 {
                return Err(invalid(format!(
                    "BLOCKS section has group code {code} where an entity should start"
                )));
            }
            match value.trim() {
                "ENDSEC" => return Ok(()),
                "BLOCK" => {
                    let block = self.parse_block()?;
                    document.add_block(block);
                }
                _ => self.reader.skip_entity_body()?,
            }
        }
    }

    fn parse_block(&mut self) -> Result<Block, ConvertError> {
        let mut name = None;
        let mut base = Point::new(0.0, 0.0);
        for (code, value) in self.read_body("BLOCK")? {
            match code {
                2 => name = Some(value.trim().to_string()),
                10 => base.x = parse_f64(&value, "BLOCK base point X")?,
                20 => base.y = parse_f64(&value, "BLOCK base point Y")?,
                _ => {}
            }
        }
        let name = name.ok_or_else(|| invalid("BLOCK is missing its name (group code 2)"))?;
        let entities = self.parse_entity_list("ENDBLK")?;
        Ok(Block {
            name,
            base_point: base,
            entities,
        })
    }

    /// Parse entities until the `terminator` marker, which is consumed.
    fn parse_entity_list(&mut self, terminator: &str) -> Result<Vec<Entity>, ConvertError> {
        let mut entities = Vec::new();
        loop {
            let (code, value) = self
                .reader
                .next_pair()?
                .ok_or_else(|| invalid(format!("entity list ended before {terminator}")))?;
            if code != 0 {
                return Err(invalid(format!(
                    "group code {code} where an entity should start"
                )));
            }

            let kind = value.trim();
            if kind == terminator {
                // ENDBLK carries its own handle/layer pairs
                self.reader.skip_entity_body()?;
                return Ok(entities);
            }

            let parsed = match kind {
                "LWPOLYLINE" => Some(self.parse_lwpolyline()?),
                "POLYLINE" => self.parse_polyline()?,
                "HATCH" => Some(self.parse_hatch()?),
                "SPLINE" => Some(self.parse_spline()?),
                "LINE" => Some(self.parse_line()?),
                "ARC" => Some(self.parse_arc()?),
                "TEXT" => Some(Entity::Text(self.parse_text(kind)?)),
                "MTEXT" => Some(Entity::MText(self.parse_text(kind)?)),
                "INSERT" => Some(self.parse_insert()?),
                other => {
                    trace!(kind = other, "skipping entity");
                    self.reader.skip_entity_body()?;
                    None
                }
            };
            entities.extend(parsed);
        }
    }

    /// Collect the pairs of one entity, leaving the next `0` pair unread.
    fn read_body(&mut self, kind: &str) -> Result<Vec<Pair>, ConvertError> {
        let mut pairs = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    return Ok(pairs);
                }
                Some(pair) => pairs.push(pair),
                None => return Err(invalid(format!("{kind} entity is not terminated"))),
            }
        }
    }

    fn parse_lwpolyline(&mut self) -> Result<Entity, ConvertError> {
        let mut layer = default_layer();
        let mut closed = false;
        let mut vertices: Vec<Vertex> = Vec::new();
        for (code, value) in self.read_body("LWPOLYLINE")? {
            match code {
                8 => layer = value.trim().to_string(),
                70 => closed = parse_i32(&value, "LWPOLYLINE flags")? & 1 != 0,
                10 => vertices.push(Vertex::new(parse_f64(&value, "LWPOLYLINE vertex X")?, 0.0)),
                20 => {
                    if let Some(v) = vertices.last_mut() {
                        v.point.y = parse_f64(&value, "LWPOLYLINE vertex Y")?;
                    }
                }
                42 => {
                    if let Some(v) = vertices.last_mut() {
                        v.bulge = parse_f64(&value, "LWPOLYLINE bulge")?;
                    }
                }
                _ => {}
            }
        }
        Ok(Entity::Polyline(Polyline {
            vertices,
            closed,
            layer,
        }))
    }

    /// Legacy `POLYLINE` followed by `VERTEX` records and `SEQEND`.
    ///
    /// Polyface and polygon meshes are 3D surfaces, not outlines, and are
    /// skipped.
    fn parse_polyline(&mut self) -> Result<Option<Entity>, ConvertError> {
        let mut layer = default_layer();
        let mut flags = 0;
        for (code, value) in self.read_body("POLYLINE")? {
            match code {
                8 => layer = value.trim().to_string(),
                70 => flags = parse_i32(&value, "POLYLINE flags")?,
                _ => {}
            }
        }

        let mut vertices = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, kind)) if kind.trim() == "VERTEX" => {
                    let mut vertex = Vertex::new(0.0, 0.0);
                    let mut vertex_flags = 0;
                    for (code, value) in self.read_body("VERTEX")? {
                        match code {
                            10 => vertex.point.x = parse_f64(&value, "VERTEX X")?,
                            20 => vertex.point.y = parse_f64(&value, "VERTEX Y")?,
                            42 => vertex.bulge = parse_f64(&value, "VERTEX bulge")?,
                            70 => vertex_flags = parse_i32(&value, "VERTEX flags")?,
                            _ => {}
                        }
                    }
                    // 16 = spline frame control point, not on the curve
                    if vertex_flags & 16 == 0 {
                        vertices.push(vertex);
                    }
                }
                Some((0, kind)) if kind.trim() == "SEQEND" => {
                    self.reader.skip_entity_body()?;
                    break;
                }
                Some((0, kind)) => {
                    // Missing SEQEND: the next entity starts here
                    self.reader.put_back((0, kind));
                    break;
                }
                Some(_) => {}
                None => return Err(invalid("POLYLINE is missing its SEQEND")),
            }
        }

        if flags & (16 | 64) != 0 {
            trace!(flags, "skipping mesh POLYLINE");
            return Ok(None);
        }
        Ok(Some(Entity::Polyline(Polyline {
            vertices,
            closed: flags & 1 != 0,
            layer,
        })))
    }

    fn parse_spline(&mut self) -> Result<Entity, ConvertError> {
        let mut layer = default_layer();
        let mut curve = SplineCurve {
            degree: 3,
            ..SplineCurve::default()
        };
        for (code, value) in self.read_body("SPLINE")? {
            match code {
                8 => layer = value.trim().to_string(),
                71 => curve.degree = parse_i32(&value, "SPLINE degree")?.max(1) as usize,
                40 => curve.knots.push(parse_f64(&value, "SPLINE knot")?),
                41 => curve.weights.push(parse_f64(&value, "SPLINE weight")?),
                10 => curve
                    .control_points
                    .push(Point::new(parse_f64(&value, "SPLINE control X")?, 0.0)),
                20 => {
                    if let Some(p) = curve.control_points.last_mut() {
                        p.y = parse_f64(&value, "SPLINE control Y")?;
                    }
                }
                11 => curve
                    .fit_points
                    .push(Point::new(parse_f64(&value, "SPLINE fit X")?, 0.0)),
                21 => {
                    if let Some(p) = curve.fit_points.last_mut() {
                        p.y = parse_f64(&value, "SPLINE fit Y")?;
                    }
                }
                _ => {}
            }
        }
        Ok(Entity::Spline(Spline { curve, layer }))
    }

    fn parse_line(&mut self) -> Result<Entity, ConvertError> {
        let mut layer = default_layer();
        let mut start = Point::new(0.0, 0.0);
        let mut end = Point::new(0.0, 0.0);
        for (code, value) in self.read_body("LINE")? {
            match code {
                8 => layer = value.trim().to_string(),
                10 => start.x = parse_f64(&value, "LINE start X")?,
                20 => start.y = parse_f64(&value, "LINE start Y")?,
                11 => end.x = parse_f64(&value, "LINE end X")?,
                21 => end.y = parse_f64(&value, "LINE end Y")?,
                _ => {}
            }
        }
        Ok(Entity::Line(Line { start, end, layer }))
    }

    fn parse_arc(&mut self) -> Result<Entity, ConvertError> {
        let mut layer = default_layer();
        let mut center = Point::new(0.0, 0.0);
        let mut radius = 0.0;
        let mut start_angle = 0.0;
        let mut end_angle = 360.0;
        for (code, value) in self.read_body("ARC")? {
            match code {
                8 => layer = value.trim().to_string(),
                10 => center.x = parse_f64(&value, "ARC center X")?,
                20 => center.y = parse_f64(&value, "ARC center Y")?,
                40 => radius = parse_f64(&value, "ARC radius")?,
                50 => start_angle = parse_f64(&value, "ARC start angle")?,
                51 => end_angle = parse_f64(&value, "ARC end angle")?,
                _ => {}
            }
        }
        Ok(Entity::Arc(Arc {
            center,
            radius,
            start_angle,
            end_angle,
            layer,
        }))
    }

    /// `TEXT` keeps its string in code 1. `MTEXT` splits long strings into
    /// 250-character chunks under code 3, finished by code 1.
    fn parse_text(&mut self, kind: &str) -> Result<Text, ConvertError> {
        let mut layer = default_layer();
        let mut chunks = String::new();
        let mut last = String::new();
        for (code, value) in self.read_body(kind)? {
            match code {
                8 => layer = value.trim().to_string(),
                3 => chunks.push_str(&value),
                1 => last = value,
                _ => {}
            }
        }
        chunks.push_str(&last);
        Ok(Text {
            text: chunks,
            layer,
        })
    }

    fn parse_insert(&mut self) -> Result<Entity, ConvertError> {
        let mut insert = Insert {
            block: String::new(),
            position: Point::new(0.0, 0.0),
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            attributes: Vec::new(),
            layer: default_layer(),
        };
        let mut has_attributes = false;
        for (code, value) in self.read_body("INSERT")? {
            match code {
                2 => insert.block = value.trim().to_string(),
                8 => insert.layer = value.trim().to_string(),
                10 => insert.position.x = parse_f64(&value, "INSERT position X")?,
                20 => insert.position.y = parse_f64(&value, "INSERT position Y")?,
                41 => insert.scale_x = parse_f64(&value, "INSERT X scale")?,
                42 => insert.scale_y = parse_f64(&value, "INSERT Y scale")?,
                50 => insert.rotation = parse_f64(&value, "INSERT rotation")?,
                66 => has_attributes = parse_i32(&value, "INSERT attributes flag")? != 0,
                _ => {}
            }
        }

        if has_attributes {
            loop {
                match self.reader.next_pair()? {
                    Some((0, kind)) if kind.trim() == "ATTRIB" => {
                        let value = self
                            .read_body("ATTRIB")?
                            .into_iter()
                            .find(|(code, _)| *code == 1)
                            .map(|(_, v)| v);
                        insert.attributes.extend(value);
                    }
                    Some((0, kind)) if kind.trim() == "SEQEND" => {
                        self.reader.skip_entity_body()?;
                        break;
                    }
                    Some((0, kind)) => {
                        self.reader.put_back((0, kind));
                        break;
                    }
                    Some(_) => {}
                    None => return Err(invalid("INSERT attributes are missing their SEQEND")),
                }
            }
        }

        Ok(Entity::Insert(insert))
    }

    /// `HATCH` boundary paths.
    ///
    /// The boundary data starts at code 91 (path count). Each path starts
    /// at code 92; bit 2 of its flags marks a polyline path, otherwise the
    /// path is a list of typed edges introduced by code 72. Style, pattern
    /// and seed point data (codes 75, 76, 98 onwards) end the boundary.
    fn parse_hatch(&mut self) -> Result<Entity, ConvertError> {
        let mut layer = default_layer();
        let mut loops = Vec::new();
        let mut current: Option<HatchLoop> = None;
        let mut edge: Option<HatchEdge> = None;
        // A spline edge's first 97 counts its fit points; the next one
        // counts the path's source objects and closes the edge
        let mut fit_count_read = false;
        let mut in_boundary = false;
        let mut boundary_done = false;

        fn finish_edge(current: &mut Option<HatchLoop>, edge: &mut Option<HatchEdge>) {
            if let (Some(HatchLoop::Edges(edges)), Some(e)) = (current.as_mut(), edge.take()) {
                edges.push(e);
            }
        }

        fn finish_loop(
            current: &mut Option<HatchLoop>,
            edge: &mut Option<HatchEdge>,
            loops: &mut Vec<HatchLoop>,
        ) {
            finish_edge(current, edge);
            loops.extend(current.take());
        }

        for (code, value) in self.read_body("HATCH")? {
            if code == 8 {
                layer = value.trim().to_string();
                continue;
            }
            if boundary_done {
                continue;
            }
            match code {
                91 => in_boundary = true,
                92 if in_boundary => {
                    finish_loop(&mut current, &mut edge, &mut loops);
                    fit_count_read = false;
                    let flags = parse_i32(&value, "HATCH path flags")?;
                    current = Some(if flags & 2 != 0 {
                        HatchLoop::Polyline {
                            vertices: Vec::new(),
                            closed: true,
                        }
                    } else {
                        HatchLoop::Edges(Vec::new())
                    });
                }
                75 | 76 | 98 if in_boundary => {
                    finish_loop(&mut current, &mut edge, &mut loops);
                    boundary_done = true;
                }
                97 if matches!(edge, Some(HatchEdge::Spline(_))) && !fit_count_read => {
                    fit_count_read = true;
                }
                97 => finish_edge(&mut current, &mut edge),
                _ => match current.as_mut() {
                    None => {}
                    Some(HatchLoop::Polyline { vertices, closed }) => match code {
                        73 => *closed = parse_i32(&value, "HATCH polyline closed flag")? != 0,
                        10 => vertices.push(Vertex::new(parse_f64(&value, "HATCH vertex X")?, 0.0)),
                        20 => {
                            if let Some(v) = vertices.last_mut() {
                                v.point.y = parse_f64(&value, "HATCH vertex Y")?;
                            }
                        }
                        42 => {
                            if let Some(v) = vertices.last_mut() {
                                v.bulge = parse_f64(&value, "HATCH vertex bulge")?;
                            }
                        }
                        _ => {}
                    },
                    Some(HatchLoop::Edges(edges)) => {
                        if code == 72 {
                            if let Some(e) = edge.take() {
                                edges.push(e);
                            }
                            edge = Some(new_edge(parse_i32(&value, "HATCH edge type")?)?);
                            fit_count_read = false;
                        } else if let Some(e) = edge.as_mut() {
                            apply_edge_pair(e, code, &value)?;
                        }
                    }
                },
            }
        }
        finish_loop(&mut current, &mut edge, &mut loops);

        Ok(Entity::Hatch(Hatch { loops, layer }))
    }
}

fn default_layer() -> String {
    "0".to_string()
}

fn new_edge(edge_type: i32) -> Result<HatchEdge, ConvertError> {
    let origin = Point::new(0.0, 0.0);
    match edge_type {
        1 => Ok(HatchEdge::Line {
            start: origin,
            end: origin,
        }),
        2 => Ok(HatchEdge::Arc {
            center: origin,
            radius: 0.0,
            start_angle: 0.0,
            end_angle: 360.0,
            counter_clockwise: true,
        }),
        3 => Ok(HatchEdge::Ellipse {
            center: origin,
            major_axis: Point::new(1.0, 0.0),
            ratio: 1.0,
            start_angle: 0.0,
            end_angle: 360.0,
            counter_clockwise: true,
        }),
        4 => Ok(HatchEdge::Spline(SplineCurve {
            degree: 3,
            ..SplineCurve::default()
        })),
        other => Err(invalid(format!("unknown HATCH edge type {other}"))),
    }
}

fn apply_edge_pair(edge: &mut HatchEdge, code: i32, value: &str) -> Result<(), ConvertError> {
    match edge {
        HatchEdge::Line { start, end } => match code {
            10 => start.x = parse_f64(value, "HATCH line start X")?,
            20 => start.y = parse_f64(value, "HATCH line start Y")?,
            11 => end.x = parse_f64(value, "HATCH line end X")?,
            21 => end.y = parse_f64(value, "HATCH line end Y")?,
            _ => {}
        },
        HatchEdge::Arc {
            center,
            radius,
            start_angle,
            end_angle,
            counter_clockwise,
        } => match code {
            10 => center.x = parse_f64(value, "HATCH arc center X")?,
            20 => center.y = parse_f64(value, "HATCH arc center Y")?,
            40 => *radius = parse_f64(value, "HATCH arc radius")?,
            50 => *start_angle = parse_f64(value, "HATCH arc start angle")?,
            51 => *end_angle = parse_f64(value, "HATCH arc end angle")?,
            73 => *counter_clockwise = parse_i32(value, "HATCH arc direction")? != 0,
            _ => {}
        },
        HatchEdge::Ellipse {
            center,
            major_axis,
            ratio,
            start_angle,
            end_angle,
            counter_clockwise,
        } => match code {
            10 => center.x = parse_f64(value, "HATCH ellipse center X")?,
            20 => center.y = parse_f64(value, "HATCH ellipse center Y")?,
            11 => major_axis.x = parse_f64(value, "HATCH ellipse axis X")?,
            21 => major_axis.y = parse_f64(value, "HATCH ellipse axis Y")?,
            40 => *ratio = parse_f64(value, "HATCH ellipse ratio")?,
            50 => *start_angle = parse_f64(value, "HATCH ellipse start angle")?,
            51 => *end_angle = parse_f64(value, "HATCH ellipse end angle")?,
            73 => *counter_clockwise = parse_i32(value, "HATCH ellipse direction")? != 0,
            _ => {}
        },
        HatchEdge::Spline(curve) => match code {
            94 => curve.degree = parse_i32(value, "HATCH spline degree")?.max(1) as usize,
            40 => curve.knots.push(parse_f64(value, "HATCH spline knot")?),
            42 => curve.weights.push(parse_f64(value, "HATCH spline weight")?),
            10 => curve
                .control_points
                .push(Point::new(parse_f64(value, "HATCH spline control X")?, 0.0)),
            20 => {
                if let Some(p) = curve.control_points.last_mut() {
                    p.y = parse_f64(value, "HATCH spline control Y")?;
                }
            }
            11 => curve
                .fit_points
                .push(Point::new(parse_f64(value, "HATCH spline fit X")?, 0.0)),
            21 => {
                if let Some(p) = curve.fit_points.last_mut() {
                    p.y = parse_f64(value, "HATCH spline fit Y")?;
                }
            }
            _ => {}
        },
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dxf::flatten::flatten_edge;

    /// Render `(code, value)` pairs as DXF text.
    fn dxf(pairs: &[(i32, String)]) -> String {
        pairs.iter().map(|(c, v)| format!("{c}\n{v}\n")).collect()
    }

    fn section(name: &str, body: &[(i32, &str)]) -> Vec<(i32, String)> {
        let mut out = vec![(0, "SECTION".to_string()), (2, name.to_string())];
        out.extend(body.iter().map(|&(c, v)| (c, v.to_string())));
        out.push((0, "ENDSEC".to_string()));
        out
    }

    fn parse(mut pairs: Vec<(i32, String)>) -> DxfDocument {
        pairs.push((0, "EOF".to_string()));
        DxfDocument::parse(&dxf(&pairs)).expect("document should parse")
    }

    #[test]
    fn reads_insunits() {
        let doc = parse(section(
            "HEADER",
            &[(9, "$ACADVER"), (1, "AC1015"), (9, "$INSUNITS"), (70, "4")],
        ));
        assert_eq!(doc.insunits, Some(4));
    }

    #[test]
    fn parses_closed_lwpolyline_with_bulge() {
        let doc = parse(section(
            "ENTITIES",
            &[
                (0, "LWPOLYLINE"),
                (8, "FRONT"),
                (90, "3"),
                (70, "1"),
                (10, "0"),
                (20, "0"),
                (10, "10"),
                (20, "0"),
                (42, "1.0"),
                (10, "10"),
                (20, "10"),
            ],
        ));
        assert_eq!(doc.entities.len(), 1);
        match &doc.entities[0] {
            Entity::Polyline(p) => {
                assert!(p.closed);
                assert_eq!(p.layer, "FRONT");
                assert_eq!(p.vertices.len(), 3);
                assert_eq!(p.vertices[1].bulge, 1.0);
                assert_eq!(p.vertices[2].point, Point::new(10.0, 10.0));
            }
            other => panic!("expected polyline, got {other:?}"),
        }
    }

    #[test]
    fn parses_legacy_polyline_vertices() {
        let doc = parse(section(
            "ENTITIES",
            &[
                (0, "POLYLINE"),
                (8, "BACK"),
                (66, "1"),
                (70, "1"),
                (0, "VERTEX"),
                (10, "0"),
                (20, "0"),
                (0, "VERTEX"),
                (10, "5"),
                (20, "0"),
                (0, "VERTEX"),
                (10, "5"),
                (20, "5"),
                (0, "SEQEND"),
                (0, "LINE"),
                (10, "0"),
                (20, "0"),
                (11, "1"),
                (21, "1"),
            ],
        ));
        assert_eq!(doc.entities.len(), 2);
        match &doc.entities[0] {
            Entity::Polyline(p) => {
                assert_eq!(p.vertices.len(), 3);
                assert!(p.closed);
                assert_eq!(p.layer, "BACK");
            }
            other => panic!("expected polyline, got {other:?}"),
        }
        assert!(matches!(doc.entities[1], Entity::Line(_)));
    }

    #[test]
    fn unknown_entities_are_skipped() {
        let doc = parse(section(
            "ENTITIES",
            &[
                (0, "DIMENSION"),
                (8, "DIM"),
                (10, "1"),
                (0, "CIRCLE"),
                (10, "0"),
                (40, "3"),
                (0, "TEXT"),
                (1, "Piece Name: Sleeve"),
            ],
        ));
        assert_eq!(doc.entities.len(), 1);
        assert_eq!(doc.entities[0].text(), Some("Piece Name: Sleeve"));
    }

    #[test]
    fn parses_blocks_and_insert_attributes() {
        let mut pairs = section(
            "BLOCKS",
            &[
                (0, "BLOCK"),
                (2, "PIECE1"),
                (10, "1"),
                (20, "2"),
                (0, "LINE"),
                (10, "0"),
                (20, "0"),
                (11, "1"),
                (21, "0"),
                (0, "ENDBLK"),
                (8, "0"),
            ],
        );
        pairs.extend(section(
            "ENTITIES",
            &[
                (0, "INSERT"),
                (66, "1"),
                (2, "PIECE1"),
                (8, "CUT"),
                (10, "100"),
                (20, "50"),
                (41, "2"),
                (50, "90"),
                (0, "ATTRIB"),
                (1, "Piece Name: Collar"),
                (0, "SEQEND"),
            ],
        ));
        let doc = parse(pairs);

        let block = doc.block("piece1").expect("block lookup is case-insensitive");
        assert_eq!(block.base_point, Point::new(1.0, 2.0));
        assert_eq!(block.entities.len(), 1);

        match &doc.entities[0] {
            Entity::Insert(i) => {
                assert_eq!(i.block, "PIECE1");
                assert_eq!(i.layer, "CUT");
                assert_eq!(i.position, Point::new(100.0, 50.0));
                assert_eq!(i.scale_x, 2.0);
                assert_eq!(i.scale_y, 1.0);
                assert_eq!(i.rotation, 90.0);
                assert_eq!(i.attributes, vec!["Piece Name: Collar".to_string()]);
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn parses_hatch_polyline_and_edge_paths() {
        let doc = parse(section(
            "ENTITIES",
            &[
                (0, "HATCH"),
                (8, "H"),
                (10, "0"),
                (20, "0"),
                (2, "SOLID"),
                (70, "1"),
                (91, "2"),
                // polyline path
                (92, "2"),
                (72, "0"),
                (73, "1"),
                (93, "3"),
                (10, "0"),
                (20, "0"),
                (10, "4"),
                (20, "0"),
                (10, "4"),
                (20, "4"),
                (97, "0"),
                // edge path: line + arc
                (92, "1"),
                (93, "2"),
                (72, "1"),
                (10, "0"),
                (20, "0"),
                (11, "10"),
                (21, "0"),
                (72, "2"),
                (10, "5"),
                (20, "0"),
                (40, "5"),
                (50, "0"),
                (51, "180"),
                (73, "1"),
                (97, "0"),
                (75, "0"),
                (76, "1"),
                (98, "1"),
                (10, "2"),
                (20, "2"),
            ],
        ));
        let hatch = match &doc.entities[0] {
            Entity::Hatch(h) => h,
            other => panic!("expected hatch, got {other:?}"),
        };
        assert_eq!(hatch.layer, "H");
        assert_eq!(hatch.loops.len(), 2);
        match &hatch.loops[0] {
            HatchLoop::Polyline { vertices, closed } => {
                assert!(*closed);
                assert_eq!(vertices.len(), 3);
            }
            other => panic!("expected polyline path, got {other:?}"),
        }
        match &hatch.loops[1] {
            HatchLoop::Edges(edges) => {
                assert_eq!(edges.len(), 2);
                assert!(matches!(edges[1], HatchEdge::Arc { radius, .. } if radius == 5.0));
            }
            other => panic!("expected edge path, got {other:?}"),
        }
    }

    #[test]
    fn hatch_spline_edge_keeps_fit_points() {
        let doc = parse(section(
            "ENTITIES",
            &[
                (0, "HATCH"),
                (91, "1"),
                (92, "1"),
                (93, "2"),
                (72, "4"),
                (94, "3"),
                (73, "0"),
                (74, "0"),
                (95, "0"),
                (96, "0"),
                (97, "4"),
                (11, "0"),
                (21, "0"),
                (11, "10"),
                (21, "0"),
                (11, "10"),
                (21, "10"),
                (11, "0"),
                (21, "10"),
                (72, "1"),
                (10, "0"),
                (20, "10"),
                (11, "0"),
                (21, "0"),
                (97, "0"),
                (75, "0"),
            ],
        ));
        let Entity::Hatch(hatch) = &doc.entities[0] else {
            panic!("expected hatch");
        };
        let HatchLoop::Edges(edges) = &hatch.loops[0] else {
            panic!("expected edge path");
        };
        assert_eq!(edges.len(), 2);
        let HatchEdge::Spline(curve) = &edges[0] else {
            panic!("expected spline edge");
        };
        assert!(curve.control_points.is_empty());
        assert_eq!(curve.fit_points.len(), 4);
        assert_eq!(curve.fit_points[2], Point::new(10.0, 10.0));
        assert_eq!(flatten_edge(&edges[0], 0.05, 101).len(), 4);
    }

    #[test]
    fn hatch_spline_edge_closed_by_source_count() {
        // Last edge is a spline with fit data; the second 97 ends it
        let doc = parse(section(
            "ENTITIES",
            &[
                (0, "HATCH"),
                (91, "1"),
                (92, "1"),
                (93, "1"),
                (72, "4"),
                (94, "3"),
                (96, "0"),
                (97, "2"),
                (11, "0"),
                (21, "0"),
                (11, "5"),
                (21, "5"),
                (97, "1"),
                (330, "2F"),
                (75, "0"),
            ],
        ));
        let Entity::Hatch(hatch) = &doc.entities[0] else {
            panic!("expected hatch");
        };
        let HatchLoop::Edges(edges) = &hatch.loops[0] else {
            panic!("expected edge path");
        };
        assert_eq!(edges.len(), 1);
        assert!(matches!(&edges[0], HatchEdge::Spline(c) if c.fit_points.len() == 2));
    }

    #[test]
    fn parses_spline() {
        let doc = parse(section(
            "ENTITIES",
            &[
                (0, "SPLINE"),
                (70, "8"),
                (71, "2"),
                (40, "0"),
                (40, "0"),
                (40, "0"),
                (40, "1"),
                (40, "1"),
                (40, "1"),
                (10, "0"),
                (20, "0"),
                (10, "5"),
                (20, "10"),
                (10, "10"),
                (20, "0"),
            ],
        ));
        match &doc.entities[0] {
            Entity::Spline(s) => {
                assert_eq!(s.curve.degree, 2);
                assert_eq!(s.curve.knots.len(), 6);
                assert_eq!(s.curve.control_points[1], Point::new(5.0, 10.0));
            }
            other => panic!("expected spline, got {other:?}"),
        }
    }

    #[test]
    fn unknown_section_is_skipped() {
        let mut pairs = section("TABLES", &[(0, "TABLE"), (2, "LAYER"), (0, "ENDTAB")]);
        pairs.extend(section("ENTITIES", &[(0, "LINE"), (10, "1")]));
        let doc = parse(pairs);
        assert_eq!(doc.entities.len(), 1);
    }

    #[test]
    fn malformed_streams_are_errors() {
        assert!(DxfDocument::parse("0\nSECTION\n2\nENTITIES\n0\nLINE\n").is_err());
        assert!(DxfDocument::parse("0\nSECTION\n2\nENTITIES\nx\nLINE\n").is_err());
        assert!(DxfDocument::parse("0\nBOGUS\n").is_err());
    }

    #[test]
    fn empty_input_is_an_empty_document() {
        let doc = DxfDocument::parse("").unwrap();
        assert!(doc.entities.is_empty());
        assert!(doc.blocks.is_empty());
    }
}
