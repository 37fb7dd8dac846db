//! Outline recovery from a parsed DXF document.
//!
//! Two passes over model space:
//!
//! 1. Explicit outlines: polylines, hatch boundaries and splines become
//!    rings directly. Block references are expanded in place and their
//!    contents attributed to the block's piece name.
//! 2. Loose `LINE`/`ARC` pieces collected during pass 1 are chained per
//!    piece name; chains that close become rings.
//!
//! When model space yields nothing, the same two passes run over every
//! block definition instead. Every ring is healed before it leaves here.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::document::DxfDocument;
use super::entity::{Block, Entity, HatchLoop, Insert};
use super::flatten::{Affine, flatten_arc, flatten_edge, flatten_polyline, sample_spline};
use crate::assemble::RawFragment;
use crate::chain::{ChainConfig, ChainStats, chain_polylines, into_rings};
use crate::config::GeometrySettings;
use crate::geometry::{Point, close_ring, dedup_points};
use crate::heal::heal_ring;

/// Label prefix that names a piece inside a block.
pub const PIECE_LABEL: &str = "Piece Name:";

/// Guard against block reference cycles.
const MAX_INSERT_DEPTH: usize = 16;

/// Case-insensitive set of wanted layer (or piece) names. Empty = all.
#[derive(Debug, Clone, Default)]
pub struct LayerFilter {
    wanted: Vec<String>,
}

impl LayerFilter {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            wanted: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_uppercase())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.wanted.is_empty()
    }

    /// A fragment passes when either its layer or its piece name is wanted.
    pub fn matches(&self, layer: &str, piece: &str) -> bool {
        if self.wanted.is_empty() {
            return true;
        }
        let layer = layer.trim().to_uppercase();
        let piece = piece.trim().to_uppercase();
        self.wanted.iter().any(|w| *w == layer || *w == piece)
    }
}

/// Pull `X` out of a `Piece Name: X` label.
pub fn piece_label(text: &str) -> Option<String> {
    let start = text.find(PIECE_LABEL)? + PIECE_LABEL.len();
    let rest = &text[start..];
    // MTEXT paragraph breaks end the label
    let end = rest
        .find("\\P")
        .or_else(|| rest.find('\n'))
        .unwrap_or(rest.len());
    let label = rest[..end].trim();
    (!label.is_empty()).then(|| label.to_string())
}

/// Recover healed outline fragments, in drawing units.
pub fn extract_fragments(
    doc: &DxfDocument,
    filter: &LayerFilter,
    settings: &GeometrySettings,
) -> Vec<RawFragment> {
    let mut collector = Collector::new(doc, filter, settings);
    for entity in &doc.entities {
        collector.visit_model_entity(entity);
    }
    let mut fragments = collector.finish();

    if fragments.is_empty() && !doc.blocks.is_empty() {
        let mut fallback = Collector::new(doc, filter, settings);
        for block in doc.blocks.iter().filter(|b| !b.is_layout()) {
            fallback.visit_block_definition(block);
        }
        fragments = fallback.finish();
        if fragments.is_empty() {
            warn!("no outlines found in model space or block definitions");
        } else {
            info!(
                fragments = fragments.len(),
                "fallback detected outlines in block definitions"
            );
        }
    }

    fragments
}

/// Where an entity sits: its piece name, the layer it inherits and the
/// transform to world coordinates.
#[derive(Debug, Clone)]
struct Placement<'p> {
    piece: Option<&'p str>,
    layer: Option<&'p str>,
    transform: Affine,
}

impl Placement<'_> {
    const MODEL: Placement<'static> = Placement {
        piece: None,
        layer: None,
        transform: Affine::IDENTITY,
    };
}

struct Collector<'a> {
    doc: &'a DxfDocument,
    filter: &'a LayerFilter,
    settings: &'a GeometrySettings,
    fragments: Vec<RawFragment>,
    /// Loose line/arc pieces per piece name, in first-seen order
    segments: Vec<(String, String, Vec<Vec<Point>>)>,
    segment_index: HashMap<String, usize>,
}

impl<'a> Collector<'a> {
    fn new(doc: &'a DxfDocument, filter: &'a LayerFilter, settings: &'a GeometrySettings) -> Self {
        Self {
            doc,
            filter,
            settings,
            fragments: Vec::new(),
            segments: Vec::new(),
            segment_index: HashMap::new(),
        }
    }

    fn visit_model_entity(&mut self, entity: &Entity) {
        match entity {
            Entity::Insert(insert) => self.expand_insert(insert, &Placement::MODEL, 0),
            other => self.visit_entity(other, &Placement::MODEL),
        }
    }

    /// Fallback pass: a block's own entities, named by their layers.
    fn visit_block_definition(&mut self, block: &Block) {
        for entity in &block.entities {
            if !matches!(entity, Entity::Insert(_)) {
                self.visit_entity(entity, &Placement::MODEL);
            }
        }
    }

    fn expand_insert(&mut self, insert: &Insert, outer: &Placement<'_>, depth: usize) {
        if depth >= MAX_INSERT_DEPTH {
            warn!(block = %insert.block, depth, "block nesting too deep, skipping");
            return;
        }
        let doc = self.doc;
        let Some(block) = doc.block(&insert.block) else {
            debug!(block = %insert.block, "INSERT references a missing block");
            return;
        };

        // Nested references stay under the outermost piece name
        let label = match outer.piece {
            Some(_) => None,
            None => block_label(block, insert),
        };
        let piece = outer
            .piece
            .or(label.as_deref())
            .unwrap_or(block.name.as_str());
        let layer = inherit_layer(&insert.layer, outer.layer);

        let local = Affine::insert(
            block.base_point,
            insert.position,
            insert.scale_x,
            insert.scale_y,
            insert.rotation,
        );
        let placement = Placement {
            piece: Some(piece),
            layer: Some(layer),
            transform: outer.transform.then_inner(&local),
        };

        for entity in &block.entities {
            match entity {
                Entity::Insert(nested) => self.expand_insert(nested, &placement, depth + 1),
                other => self.visit_entity(other, &placement),
            }
        }
    }

    fn visit_entity(&mut self, entity: &Entity, placement: &Placement<'_>) {
        let layer = inherit_layer(entity.layer(), placement.layer).to_string();
        let piece = placement.piece.unwrap_or(&layer).to_string();
        if !self.filter.matches(&layer, &piece) {
            return;
        }

        let tol = self.settings.heal_tolerance;
        match entity {
            Entity::Polyline(poly) => {
                let pts = flatten_polyline(&poly.vertices, poly.closed, tol);
                self.push_ring(pts, &piece, &layer, placement, "polyline");
            }
            Entity::Hatch(hatch) => {
                for boundary in &hatch.loops {
                    let pts = match boundary {
                        HatchLoop::Polyline { vertices, closed } => {
                            flatten_polyline(vertices, *closed, tol)
                        }
                        HatchLoop::Edges(edges) => edges
                            .iter()
                            .flat_map(|e| flatten_edge(e, tol, self.settings.spline_samples))
                            .collect(),
                    };
                    self.push_ring(pts, &piece, &layer, placement, "hatch boundary");
                }
            }
            Entity::Spline(spline) => {
                let pts = sample_spline(&spline.curve, self.settings.spline_samples);
                self.push_ring(pts, &piece, &layer, placement, "spline");
            }
            Entity::Line(line) => {
                self.push_segment(vec![line.start, line.end], &piece, &layer, placement);
            }
            Entity::Arc(arc) => {
                let pts = flatten_arc(
                    arc.center,
                    arc.radius,
                    arc.start_angle,
                    arc.end_angle,
                    self.settings.arc_tolerance,
                );
                self.push_segment(pts, &piece, &layer, placement);
            }
            Entity::Insert(_) | Entity::Text(_) | Entity::MText(_) => {}
        }
    }

    /// Force-close, heal and keep a ring. Fewer than three points is not
    /// an outline.
    fn push_ring(
        &mut self,
        mut pts: Vec<Point>,
        piece: &str,
        layer: &str,
        placement: &Placement<'_>,
        kind: &str,
    ) {
        if !placement.transform.is_identity() {
            pts.iter_mut().for_each(|p| *p = placement.transform.apply(*p));
        }
        dedup_points(&mut pts, 1e-9);
        close_ring(&mut pts);
        if pts.len() < 4 {
            debug!(piece, kind, points = pts.len().saturating_sub(1), "dropping outline with fewer than 3 points");
            return;
        }

        match heal_ring(&pts, self.settings.heal_tolerance) {
            Some(shape) => self.fragments.push(RawFragment::new(piece, layer, shape)),
            None => debug!(piece, kind, "dropping outline that did not heal into a polygon"),
        }
    }

    fn push_segment(&mut self, mut pts: Vec<Point>, piece: &str, layer: &str, placement: &Placement<'_>) {
        if !placement.transform.is_identity() {
            pts.iter_mut().for_each(|p| *p = placement.transform.apply(*p));
        }
        let slot = match self.segment_index.get(piece) {
            Some(&i) => i,
            None => {
                self.segment_index.insert(piece.to_string(), self.segments.len());
                self.segments
                    .push((piece.to_string(), layer.to_string(), Vec::new()));
                self.segments.len() - 1
            }
        };
        self.segments[slot].2.push(pts);
    }

    /// Chain the collected line/arc pieces and return every fragment.
    fn finish(mut self) -> Vec<RawFragment> {
        let config = ChainConfig::with_tolerance(self.settings.heal_tolerance);
        for (piece, layer, pieces) in std::mem::take(&mut self.segments) {
            let chains = chain_polylines(&pieces, &config);
            let stats = ChainStats::from_chains(pieces.len(), &chains, config.tolerance);
            debug!(
                piece = %piece,
                segments = stats.input_pieces,
                chains = stats.output_chains,
                rings = stats.rings,
                "chained loose segments"
            );
            for ring in into_rings(chains, config.tolerance) {
                match heal_ring(&ring, self.settings.heal_tolerance) {
                    Some(shape) => self.fragments.push(RawFragment::new(&piece, &layer, shape)),
                    None => debug!(piece = %piece, "dropping chained ring that did not heal"),
                }
            }
        }
        self.fragments
    }
}

/// Entities on layer `0` take the layer of the reference that places them.
fn inherit_layer<'l>(own: &'l str, inherited: Option<&'l str>) -> &'l str {
    match inherited {
        Some(outer) if own.trim() == "0" => outer,
        _ => own,
    }
}

/// Label text from the block's TEXT/MTEXT entities or the reference's
/// attribute values.
fn block_label(block: &Block, insert: &Insert) -> Option<String> {
    block
        .entities
        .iter()
        .filter_map(Entity::text)
        .chain(insert.attributes.iter().map(String::as_str))
        .find_map(piece_label)
}

// ============================================================================
// TESTS
// ============================================================================
