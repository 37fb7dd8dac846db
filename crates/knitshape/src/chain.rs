//! Line chaining - join loose LINE/ARC pieces into closed outlines.
//!
//! Pattern-making exports (Gerber, Lectra) often draw a piece as dozens of
//! separate lines and arcs. This module links them endpoint to endpoint,
//! in either direction, and keeps the chains that come back to their
//! start.

use std::collections::HashMap;

use crate::geometry::Point;

/// A chain of connected points forming a polyline.
pub type Chain = Vec<Point>;

/// Configuration for chaining.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Maximum distance between endpoints to consider them connected.
    /// Default: 0.05 (the healing tolerance)
    pub tolerance: f64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self { tolerance: 0.05 }
    }
}

impl ChainConfig {
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

/// Endpoint index: grid cell -> (piece index, is_start_point).
type EndpointGrid = HashMap<(i64, i64), Vec<(usize, bool)>>;

/// Chain polylines into maximal connected sequences.
///
/// # Algorithm
///
/// 1. Build a spatial hash of all endpoints
/// 2. For each unvisited piece, start a new chain
/// 3. Extend the chain's end with any unused piece touching it at either
///    endpoint (reversing the piece when it touches at its end)
/// 4. Unless the chain already closed, extend its start the same way
///
/// Pieces with fewer than two points are ignored.
pub fn chain_polylines(pieces: &[Chain], config: &ChainConfig) -> Vec<Chain> {
    let tolerance = config.tolerance;
    let grid_size = tolerance.max(0.001); // Avoid division by zero

    let mut used: Vec<bool> = pieces.iter().map(|p| p.len() < 2).collect();
    let mut grid: EndpointGrid = HashMap::new();

    for (i, piece) in pieces.iter().enumerate() {
        if let (false, Some(first), Some(last)) = (used[i], piece.first(), piece.last()) {
            grid.entry(point_to_cell(*first, grid_size)).or_default().push((i, true));
            grid.entry(point_to_cell(*last, grid_size)).or_default().push((i, false));
        }
    }

    let mut chains = Vec::new();

    for start_idx in 0..pieces.len() {
        if used[start_idx] {
            continue;
        }
        used[start_idx] = true;
        let mut chain = pieces[start_idx].clone();

        // Extend forward from the chain's end
        while let Some(&end) = chain.last() {
            if is_closed(&chain, tolerance) {
                break;
            }
            let Some((idx, at_start)) = find_touching(end, &grid, &used, pieces, grid_size, tolerance)
            else {
                break;
            };
            used[idx] = true;
            if at_start {
                chain.extend(pieces[idx].iter().skip(1));
            } else {
                chain.extend(pieces[idx].iter().rev().skip(1));
            }
        }

        // Extend backward from the chain's start
        let mut prefix: Chain = Vec::new();
        while !is_closed(&chain, tolerance) {
            let head = prefix.last().or(chain.first()).copied();
            let Some(head) = head else { break };
            let Some((idx, at_start)) = find_touching(head, &grid, &used, pieces, grid_size, tolerance)
            else {
                break;
            };
            used[idx] = true;
            // Prefix is built back to front
            if at_start {
                prefix.extend(pieces[idx].iter().skip(1));
            } else {
                prefix.extend(pieces[idx].iter().rev().skip(1));
            }
            if let (Some(&p), Some(&end)) = (prefix.last(), chain.last()) {
                if p.is_near(end, tolerance) {
                    break;
                }
            }
        }
        if !prefix.is_empty() {
            prefix.reverse();
            prefix.extend(chain);
            chain = prefix;
        }

        chains.push(chain);
    }

    chains
}

/// Chain the pieces and keep only the chains that close into rings.
pub fn closed_rings(pieces: &[Chain], config: &ChainConfig) -> Vec<Chain> {
    into_rings(chain_polylines(pieces, config), config.tolerance)
}

/// Keep the already-built chains that close into rings.
///
/// A ring's last point is snapped onto its first, so the result is a
/// properly closed ring with at least four points.
pub fn into_rings(chains: Vec<Chain>, tolerance: f64) -> Vec<Chain> {
    chains
        .into_iter()
        .filter(|c| c.len() >= 4 && is_closed(c, tolerance))
        .map(|mut c| {
            if let Some(&first) = c.first() {
                if let Some(last) = c.last_mut() {
                    *last = first;
                }
            }
            c
        })
        .collect()
}

#[inline]
fn is_closed(chain: &[Point], tolerance: f64) -> bool {
    match (chain.first(), chain.last()) {
        (Some(first), Some(last)) => chain.len() > 2 && first.is_near(*last, tolerance),
        _ => false,
    }
}

/// Convert a point to a grid cell coordinate.
#[inline]
fn point_to_cell(p: Point, grid_size: f64) -> (i64, i64) {
    ((p.x / grid_size).floor() as i64, (p.y / grid_size).floor() as i64)
}

/// Find an unused piece with an endpoint within tolerance of `p`.
///
/// Returns the piece index and whether it touches at its start point.
fn find_touching(
    p: Point,
    grid: &EndpointGrid,
    used: &[bool],
    pieces: &[Chain],
    grid_size: f64,
    tolerance: f64,
) -> Option<(usize, bool)> {
    let cell = point_to_cell(p, grid_size);

    // Check this cell and all 8 neighbors (endpoints might be in adjacent cells)
    for dx in -1..=1 {
        for dy in -1..=1 {
            let Some(candidates) = grid.get(&(cell.0 + dx, cell.1 + dy)) else {
                continue;
            };
            for &(idx, is_start) in candidates {
                if used[idx] {
                    continue;
                }
                let endpoint = if is_start {
                    pieces[idx].first()
                } else {
                    pieces[idx].last()
                };
                if endpoint.is_some_and(|e| e.is_near(p, tolerance)) {
                    return Some((idx, is_start));
                }
            }
        }
    }

    None
}

/// Statistics about chaining results.
#[derive(Debug, Clone)]
pub struct ChainStats {
    /// Number of input pieces
    pub input_pieces: usize,
    /// Number of output chains
    pub output_chains: usize,
    /// Chains that closed into rings
    pub rings: usize,
}

impl ChainStats {
    pub fn from_chains(input_count: usize, chains: &[Chain], tolerance: f64) -> Self {
        Self {
            input_pieces: input_count,
            output_chains: chains.len(),
            rings: chains
                .iter()
                .filter(|c| c.len() >= 4 && is_closed(c, tolerance))
                .count(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
