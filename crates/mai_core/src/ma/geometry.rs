//! Mesh attribute stream → indexed geometry.
//!
//! A `mesh` node block stores its topology as flat `setAttr` payloads:
//! vertex triples, edge records, polyFaces records, uv/color/normal arrays and
//! material component lists. [`MeshGeometry::parse`] gathers them into one
//! structure; the remaining methods derive what a host needs to build it.

use std::collections::BTreeMap;

use mai_math::{Color, Vec2, Vec3};

use super::faces::{decode_edge, FaceStream, PolyFaces};
use super::parser::{command_of, parse_floats, parse_ints, parse_set_attr, unquote, ParseError, ParseResult};
use super::types::{AttrPath, NodeBlock, SetAttr};
use crate::backend::{FaceRange, MeshDescription};

const UV_SET: &[&str] = &["uvst", "uvSet"];
const UV_SET_NAME: &[&str] = &["uvsn", "uvSetName"];
const UV_SET_POINTS: &[&str] = &["uvsp", "uvSetPoints"];
const TWEAKS: &[&str] = &["pt", "pnts"];
const VERTICES: &[&str] = &["vt", "vrts"];
const EDGES: &[&str] = &["ed", "edge"];
const FACES: &[&str] = &["fc", "face"];
const NORMALS: &[&str] = &["n", "normals"];
const INST_OBJ_GROUPS: &[&str] = &["iog", "instObjGroups"];
const OBJECT_GROUPS: &[&str] = &["og", "objectGroups"];
const COMPONENT_LIST: &[&str] = &["gcl", "objectGrpCompList"];
const COLOR_SET: &[&str] = &["clst", "colorSet"];
const COLOR_NAME: &[&str] = &["clsn", "colorName"];
const COLOR_REPRESENTATION: &[&str] = &["rprt", "representation"];
const COLOR_POINTS: &[&str] = &["clsp", "colorSetPoints"];

/// Name of the uv set every new mesh already has.
pub const DEFAULT_UV_SET: &str = "map1";

/// Normal components at or above this magnitude mark an unset normal.
const UNSET_NORMAL: f32 = 1.0e19;

/// One edge: two vertex ids and its smoothing flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Edge {
    pub v0: u32,
    pub v1: u32,
    pub smooth: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UvSetData {
    pub name: Option<String>,
    pub points: Vec<Vec2>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColorSetData {
    pub name: Option<String>,

    /// Channels per color (3 or 4)
    pub channels: usize,

    /// Flat channel values
    pub values: Vec<f32>,
}

impl Default for ColorSetData {
    fn default() -> Self {
        Self {
            name: None,
            channels: 4,
            values: Vec::new(),
        }
    }
}

/// A vertex offset statement, applied once its mesh exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTweak {
    pub statement: String,
}

/// Material slot → face ranges. An empty range list means the whole mesh.
pub type MaterialMap = BTreeMap<usize, Vec<FaceRange>>;

/// Per-vertex normals ready for the host.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalAssignment {
    pub normals: Vec<Vec3>,
    pub vertices: Vec<u32>,

    /// (normal count, face-vertex count) when per-face-vertex data did not line up
    pub mismatch: Option<(usize, usize)>,
}

/// Face-vertex colors of one color set.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorAssignment {
    pub name: String,
    pub colors: Vec<Color>,
    pub faces: Vec<usize>,
    pub vertices: Vec<u32>,
}

/// Everything parsed out of one mesh block.
#[derive(Clone, Debug, Default)]
pub struct MeshGeometry {
    pub name: String,
    pub parent: Option<String>,
    pub vertices: Vec<Vec3>,
    pub edges: Vec<Edge>,
    pub faces: PolyFaces,
    pub normals: Vec<Vec3>,
    pub uv_sets: BTreeMap<usize, UvSetData>,
    pub color_sets: BTreeMap<usize, ColorSetData>,
    pub materials: MaterialMap,
    pub tweaks: Vec<PendingTweak>,

    /// Statements replayed once the mesh exists
    pub other: Vec<String>,

    declared_vertices: Option<usize>,
    declared_edges: Option<usize>,
    declared_faces: Option<usize>,
}

/// Write `items` into `target` starting at `start`. Without a start index
/// the items are appended. A chunk may overwrite or extend what is there
/// but never leave a gap, so `target` grows only by the items themselves.
fn place<T>(target: &mut Vec<T>, start: Option<usize>, items: Vec<T>) -> Result<(), String> {
    let start = start.unwrap_or(target.len());
    if start > target.len() {
        return Err(format!("chunk starts at index {} but only {} precede it", start, target.len()));
    }
    let overlap = (target.len() - start).min(items.len());
    let mut items = items.into_iter();
    for (slot, item) in target[start..start + overlap].iter_mut().zip(items.by_ref()) {
        *slot = item;
    }
    target.extend(items);
    Ok(())
}

fn max_size(current: Option<usize>, declared: Option<usize>) -> Option<usize> {
    match (current, declared) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

impl MeshGeometry {
    /// Parse a mesh block.
    ///
    /// Malformed numeric payloads are a [`ParseError::Format`] for the mesh.
    pub fn parse(block: &NodeBlock) -> ParseResult<Self> {
        let name = block.name();
        let mut geometry = MeshGeometry {
            name: name.clone(),
            parent: block.parent(),
            ..Default::default()
        };
        let mut faces = FaceStream::new(name.clone());

        for statement in block.body() {
            match command_of(statement) {
                "setAttr" => {}
                "addAttr" => {
                    geometry.other.push(statement.clone());
                    continue;
                }
                _ => continue,
            }

            let attr = parse_set_attr(statement).map_err(|e| ParseError::format(&name, e.to_string()))?;
            let path = attr.attr_path();
            if attr.is_count_only() {
                // `setAttr -s N ".vt";` announces a stream split over later chunks
                if path.node.is_empty() {
                    geometry.declare(&path, attr.size);
                }
                continue;
            }
            if !path.node.is_empty() {
                geometry.other.push(statement.clone());
                continue;
            }

            geometry
                .statement(statement, &attr, &path, &mut faces)
                .map_err(|e| match e {
                    ParseError::Format { .. } => e,
                    other => ParseError::format(&name, other.to_string()),
                })?;
        }

        geometry.faces = faces.finish()?;
        geometry.check_counts()?;

        log::debug!(
            "Parsed mesh {}: {} vertices, {} edges, {} faces, {} uv sets",
            geometry.name,
            geometry.vertices.len(),
            geometry.edges.len(),
            geometry.faces.faces.len(),
            geometry.uv_sets.len()
        );

        Ok(geometry)
    }

    fn statement(&mut self, statement: &str, attr: &SetAttr, path: &AttrPath, faces: &mut FaceStream) -> ParseResult<()> {
        let first = path.segment(0);
        let first_index = first.and_then(|s| s.index_start());

        if path.matches(&[UV_SET, UV_SET_NAME]) {
            let named = self.uv_sets.values().filter(|s| s.name.is_some()).count();
            let index = first.and_then(|s| s.index_value()).unwrap_or(named);
            let value = attr
                .values
                .first()
                .ok_or_else(|| ParseError::MissingValue(format!("uv set name in {}", self.name)))?;
            self.uv_sets.entry(index).or_default().name = Some(unquote(value).to_string());
        } else if path.matches(&[UV_SET, UV_SET_POINTS]) {
            let index = self.uv_set_index(first.and_then(|s| s.index_value()));
            let values = parse_floats(&attr.values)
                .map_err(|e| self.format(&format!("malformed uv points: {}", e)))?;
            if values.len() % 2 != 0 {
                return Err(self.format("uv point list has an odd number of values"));
            }
            let points: Vec<Vec2> = values.chunks_exact(2).map(|p| Vec2::new(p[0], p[1])).collect();
            let start = path.segment(1).and_then(|s| s.index_start());
            place(&mut self.uv_sets.entry(index).or_default().points, start, points)
                .map_err(|e| self.format(&format!("uv points: {}", e)))?;
        } else if path.matches(&[TWEAKS]) {
            self.tweaks.push(PendingTweak {
                statement: statement.to_string(),
            });
        } else if path.matches(&[VERTICES]) {
            let values = parse_floats(&attr.values)?;
            let points = self.triples(&values, "vertex")?;
            place(&mut self.vertices, first_index, points).map_err(|e| self.format(&format!("vertices: {}", e)))?;
            self.declared_vertices = max_size(self.declared_vertices, attr.size);
        } else if path.matches(&[EDGES]) {
            let values = parse_ints(&attr.values)?;
            if values.len() % 3 != 0 {
                return Err(self.format("edge list is not a multiple of three"));
            }
            let edges = values
                .chunks_exact(3)
                .map(|e| {
                    Ok(Edge {
                        v0: u32::try_from(e[0]).map_err(|_| self.format(&format!("negative vertex id {}", e[0])))?,
                        v1: u32::try_from(e[1]).map_err(|_| self.format(&format!("negative vertex id {}", e[1])))?,
                        smooth: e[2] != 0,
                    })
                })
                .collect::<ParseResult<Vec<Edge>>>()?;
            place(&mut self.edges, first_index, edges).map_err(|e| self.format(&format!("edges: {}", e)))?;
            self.declared_edges = max_size(self.declared_edges, attr.size);
        } else if path.matches(&[FACES]) {
            faces.feed(&attr.values)?;
            self.declared_faces = max_size(self.declared_faces, attr.size);
        } else if path.matches(&[NORMALS]) {
            let values = parse_floats(&attr.values)?;
            let normals = self.triples(&values, "normal")?;
            place(&mut self.normals, first_index, normals).map_err(|e| self.format(&format!("normals: {}", e)))?;
        } else if path.matches(&[INST_OBJ_GROUPS, OBJECT_GROUPS, COMPONENT_LIST]) {
            let slot = path
                .segment(1)
                .and_then(|s| s.index_value())
                .ok_or_else(|| self.format("material group without a slot index"))?;
            let ranges = attr
                .values
                .iter()
                .filter(|v| v.starts_with('"'))
                .filter_map(|v| {
                    let range = FaceRange::parse(v);
                    if range.is_none() {
                        log::debug!("{}: ignoring component {}", self.name, v);
                    }
                    range
                })
                .collect();
            self.materials.insert(slot, ranges);
        } else if path.matches(&[COLOR_SET, COLOR_NAME]) {
            let index = first.and_then(|s| s.index_value()).unwrap_or(0);
            if let Some(value) = attr.values.first() {
                self.color_sets.entry(index).or_default().name = Some(unquote(value).to_string());
            }
            self.other.push(statement.to_string());
        } else if path.matches(&[COLOR_SET, COLOR_REPRESENTATION]) {
            let index = first.and_then(|s| s.index_value()).unwrap_or(0);
            // Placeholder values appear when the set has construction history
            match attr.values.first().and_then(|v| v.parse::<usize>().ok()) {
                Some(channels) => self.color_sets.entry(index).or_default().channels = channels,
                None => log::debug!("{}: keeping default color representation", self.name),
            }
            self.other.push(statement.to_string());
        } else if path.matches(&[COLOR_SET, COLOR_POINTS]) {
            let index = first.and_then(|s| s.index_value()).unwrap_or(0);
            let values = parse_floats(&attr.values)?;
            self.color_sets.entry(index).or_default().values.extend(values);
            self.other.push(statement.to_string());
        } else {
            self.other.push(statement.to_string());
        }

        Ok(())
    }

    /// Record the total a count-only statement declares for a split stream.
    fn declare(&mut self, path: &AttrPath, size: Option<usize>) {
        if path.matches(&[VERTICES]) {
            self.declared_vertices = max_size(self.declared_vertices, size);
        } else if path.matches(&[EDGES]) {
            self.declared_edges = max_size(self.declared_edges, size);
        } else if path.matches(&[FACES]) {
            self.declared_faces = max_size(self.declared_faces, size);
        }
    }

    /// Target set of a uv point list. Without an explicit `uvst[i]` the list
    /// continues the last set once every named set has points, else it
    /// starts the next set.
    fn uv_set_index(&self, explicit: Option<usize>) -> usize {
        if let Some(index) = explicit {
            return index;
        }
        let named = self.uv_sets.values().filter(|s| s.name.is_some()).count();
        let filled = self.uv_sets.values().filter(|s| !s.points.is_empty()).count();
        if filled >= named && filled > 0 {
            filled - 1
        } else {
            filled
        }
    }

    fn triples(&self, values: &[f32], what: &str) -> ParseResult<Vec<Vec3>> {
        if values.len() % 3 != 0 {
            return Err(self.format(&format!("{} list is not a multiple of three", what)));
        }
        Ok(values.chunks_exact(3).map(|v| Vec3::new(v[0], v[1], v[2])).collect())
    }

    fn format(&self, message: &str) -> ParseError {
        ParseError::format(self.name.clone(), message)
    }

    fn check_counts(&self) -> ParseResult<()> {
        let checks = [
            ("vertex", self.declared_vertices, self.vertices.len()),
            ("edge", self.declared_edges, self.edges.len()),
            ("face", self.declared_faces, self.faces.faces.len()),
        ];
        for (what, declared, parsed) in checks {
            if let Some(declared) = declared {
                if declared != parsed {
                    return Err(self.format(&format!(
                        "declared {} {}s but parsed {}",
                        declared, what, parsed
                    )));
                }
            }
        }
        Ok(())
    }

    /// Resolve signed edge ids into a vertex loop.
    pub fn loop_vertices(&self, signed: &[i64]) -> ParseResult<Vec<u32>> {
        signed
            .iter()
            .map(|&id| {
                let (edge, flipped) = decode_edge(id);
                let edge = self.edges.get(edge).ok_or_else(|| {
                    self.format(&format!("edge id {} out of range ({} edges)", id, self.edges.len()))
                })?;
                Ok(if flipped { edge.v1 } else { edge.v0 })
            })
            .collect()
    }

    /// Vertex loop of every face.
    pub fn face_loops(&self) -> ParseResult<Vec<Vec<u32>>> {
        self.faces.faces.iter().map(|f| self.loop_vertices(&f.edges)).collect()
    }

    /// (owning face, vertex loop) of every hole.
    pub fn hole_loops(&self) -> ParseResult<Vec<(usize, Vec<u32>)>> {
        self.faces
            .holes
            .iter()
            .map(|h| Ok((h.face, self.loop_vertices(&h.edges)?)))
            .collect()
    }

    /// Build the host mesh description, validating every id.
    pub fn description(&self) -> ParseResult<MeshDescription> {
        let vertex_count = self.vertices.len();
        for (i, edge) in self.edges.iter().enumerate() {
            if edge.v0 as usize >= vertex_count || edge.v1 as usize >= vertex_count {
                return Err(self.format(&format!(
                    "edge {} references vertex out of range ({} vertices)",
                    i, vertex_count
                )));
            }
        }

        let mut description = MeshDescription {
            positions: self.vertices.clone(),
            edges: self.edges.iter().map(|e| [e.v0, e.v1]).collect(),
            ..Default::default()
        };
        for face in &self.faces.faces {
            description.face_counts.push(face.edges.len() as u32);
            for &signed in &face.edges {
                let (edge, flipped) = decode_edge(signed);
                if edge >= self.edges.len() {
                    return Err(self.format(&format!(
                        "edge id {} out of range ({} edges)",
                        signed,
                        self.edges.len()
                    )));
                }
                description.face_edges.push(edge as u32);
                description.face_flips.push(flipped);
            }
        }

        Ok(description)
    }

    /// Per-face uv counts and concatenated uv ids of one set, hole uvs
    /// following their face's own ids.
    pub fn uv_assignment(&self, set: usize) -> (Vec<u32>, Vec<u32>) {
        let mut counts = Vec::with_capacity(self.faces.faces.len());
        let mut ids = Vec::new();
        for (index, face) in self.faces.faces.iter().enumerate() {
            let before = ids.len();
            for record in face.uvs.iter().filter(|r| r.set == set) {
                ids.extend_from_slice(&record.ids);
            }
            if let Some(records) = self.faces.hole_uvs.get(&index) {
                for record in records.iter().filter(|r| r.set == set) {
                    ids.extend_from_slice(&record.ids);
                }
            }
            counts.push((ids.len() - before) as u32);
        }
        (counts, ids)
    }

    /// Normals reduced to per-vertex form.
    ///
    /// A normal count equal to the vertex count is per-vertex data; anything
    /// else pairs normals with the flattened face-vertex ids, dropping
    /// whatever does not line up. Each face contributes its outer loop and
    /// then the loops of its holes.
    pub fn normal_assignment(&self, loops: &[Vec<u32>], holes: &[(usize, Vec<u32>)]) -> Option<NormalAssignment> {
        if self.normals.is_empty() {
            return None;
        }

        let (vertices, mismatch): (Vec<u32>, _) = if self.normals.len() == self.vertices.len() {
            ((0..self.vertices.len() as u32).collect(), None)
        } else {
            let face_vertices: Vec<u32> = loops
                .iter()
                .enumerate()
                .flat_map(|(face, outer)| {
                    let inner = holes.iter().filter(move |(f, _)| *f == face).flat_map(|(_, hole)| hole.iter());
                    outer.iter().chain(inner)
                })
                .copied()
                .collect();
            let mismatch = (face_vertices.len() != self.normals.len())
                .then_some((self.normals.len(), face_vertices.len()));
            (face_vertices, mismatch)
        };

        let (normals, vertices): (Vec<Vec3>, Vec<u32>) = self
            .normals
            .iter()
            .zip(vertices)
            .filter(|(n, _)| n.abs().max_element() < UNSET_NORMAL)
            .map(|(n, v)| (*n, v))
            .unzip();

        Some(NormalAssignment {
            normals,
            vertices,
            mismatch,
        })
    }

    /// Absolute (color, face, vertex) triples of one color set.
    pub fn color_assignment(&self, set: usize, loops: &[Vec<u32>]) -> ParseResult<Option<ColorAssignment>> {
        let Some(data) = self.color_sets.get(&set) else {
            return Ok(None);
        };
        let Some(name) = data.name.clone() else {
            return Ok(None);
        };
        if data.channels != 3 && data.channels != 4 {
            return Err(self.format(&format!(
                "color set {} has unsupported channel count {}",
                name, data.channels
            )));
        }
        let palette = Color::unpack(&data.values, data.channels);

        let mut assignment = ColorAssignment {
            name,
            colors: Vec::new(),
            faces: Vec::new(),
            vertices: Vec::new(),
        };
        for (face, record) in self.faces.faces.iter().enumerate() {
            for colors in record.colors.iter().filter(|c| c.set == set) {
                for (corner, &id) in colors.ids.iter().enumerate() {
                    if id < 0 {
                        continue;
                    }
                    let vertex = loops
                        .get(face)
                        .and_then(|l| l.get(corner))
                        .ok_or_else(|| self.format(&format!("color id on missing corner {} of face {}", corner, face)))?;
                    let color = palette
                        .get(id as usize)
                        .ok_or_else(|| self.format(&format!("color id {} out of range ({} colors)", id, palette.len())))?;
                    assignment.colors.push(*color);
                    assignment.faces.push(face);
                    assignment.vertices.push(*vertex);
                }
            }
        }

        Ok(Some(assignment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ma::parser::segment;

    pub const QUAD: &str = r#"createNode mesh -n "pPlaneShape1" -p "pPlane1";
	setAttr -k off ".v";
	setAttr ".uvst[0].uvsn" -type "string" "map1";
	setAttr -s 4 ".uvst[0].uvsp[0:3]" -type "float2" 0 0 1 0 0 1 1 1;
	setAttr ".cuvs" -type "string" "map1";
	setAttr -s 4 ".vt[0:3]"  -0.5 -0.5 0 0.5 -0.5 0 -0.5 0.5 0 0.5 0.5 0;
	setAttr -s 4 ".ed[0:3]"  0 1 0 0 2 0 1 3 0 2 3 0;
	setAttr -s 4 ".n[0:3]" -type "float3"  0 0 1 0 0 1 0 0 1 0 0 1;
	setAttr -s 1 -ch 4 ".fc[0]" -type "polyFaces"
		f 4 0 2 -4 -2
		mu 0 4 0 1 3 2;
	setAttr ".pt[0]" -type "float3" 0 0 0.25;
"#;

    fn mesh(text: &str) -> ParseResult<MeshGeometry> {
        let doc = segment(text);
        MeshGeometry::parse(&doc.blocks[1])
    }

    #[test]
    fn test_parse_quad() {
        let geometry = mesh(QUAD).unwrap();

        assert_eq!(geometry.name, "pPlaneShape1");
        assert_eq!(geometry.parent.as_deref(), Some("pPlane1"));
        assert_eq!(geometry.vertices.len(), 4);
        assert_eq!(geometry.edges.len(), 4);
        assert_eq!(geometry.faces.faces.len(), 1);
        assert_eq!(geometry.uv_sets[&0].name.as_deref(), Some("map1"));
        assert_eq!(geometry.uv_sets[&0].points.len(), 4);
        assert_eq!(geometry.tweaks.len(), 1);
        // .v and .cuvs are replayed later
        assert_eq!(geometry.other.len(), 2);
    }

    #[test]
    fn test_face_loop_order() {
        let geometry = mesh(QUAD).unwrap();
        assert_eq!(geometry.face_loops().unwrap(), vec![vec![0, 1, 3, 2]]);

        let description = geometry.description().unwrap();
        assert_eq!(description.face_counts, vec![4]);
        assert_eq!(description.face_edges, vec![0, 2, 3, 1]);
        assert_eq!(description.face_flips, vec![false, false, true, true]);
        assert_eq!(description.face_loops().unwrap(), geometry.face_loops().unwrap());
    }

    #[test]
    fn test_positive_ids_use_first_vertices() {
        let geometry = MeshGeometry {
            edges: vec![
                Edge { v0: 4, v1: 7, smooth: false },
                Edge { v0: 7, v1: 9, smooth: false },
                Edge { v0: 9, v1: 4, smooth: false },
            ],
            ..Default::default()
        };
        assert_eq!(geometry.loop_vertices(&[0, 1, 2]).unwrap(), vec![4, 7, 9]);
        // Only the flipped position changes
        assert_eq!(geometry.loop_vertices(&[0, -2, 2]).unwrap(), vec![4, 9, 9]);
    }

    #[test]
    fn test_split_uv_points_concatenate() {
        let geometry = mesh(
            r#"createNode mesh -n "m";
	setAttr ".uvst[0].uvsn" -type "string" "map1";
	setAttr -s 4 ".uvst[0].uvsp[0:1]" -type "float2" 0 0 1 0;
	setAttr ".uvst[0].uvsp[2:3]" 0 1 1 1;
	setAttr ".uvst[1].uvsn" -type "string" "detail";
	setAttr ".uvst[1].uvsp[0]" -type "float2" 0.5 0.5;"#,
        )
        .unwrap();

        let points = &geometry.uv_sets[&0].points;
        assert_eq!(points.len(), 4);
        assert_eq!(points[2], Vec2::new(0.0, 1.0));
        assert_eq!(points[3], Vec2::new(1.0, 1.0));
        assert_eq!(geometry.uv_sets[&1].points, vec![Vec2::new(0.5, 0.5)]);
    }

    #[test]
    fn test_uv_residue_is_format_error() {
        let result = mesh(
            r#"createNode mesh -n "m";
	setAttr ".uvst[0].uvsp[0:1]" -type "float2" 0 0 1 oops;"#,
        );
        assert!(matches!(result, Err(ParseError::Format { node, .. }) if node == "m"));
    }

    #[test]
    fn test_edge_count_mismatch_is_format_error() {
        let result = mesh(
            r#"createNode mesh -n "m";
	setAttr -s 3 ".vt[0:2]" 0 0 0 1 0 0 0 1 0;
	setAttr -s 4 ".ed[0:2]" 0 1 0 1 2 0 2 0 0;"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_edge_is_format_error() {
        let geometry = mesh(
            r#"createNode mesh -n "m";
	setAttr ".vt[0:2]" 0 0 0 1 0 0 0 1 0;
	setAttr ".ed[0:2]" 0 1 0 1 2 0 2 0 0;
	setAttr ".fc[0]" -type "polyFaces" f 3 0 1 7;"#,
        )
        .unwrap();
        assert!(geometry.description().is_err());
    }

    #[test]
    fn test_chunk_past_parsed_data_is_format_error() {
        for statement in [
            r#"setAttr ".vt[18446744073709551615]" 0 0 0;"#,
            r#"setAttr -s 1 ".vt[18446744073709551615:18446744073709551615]" 0 0 0;"#,
            r#"setAttr ".ed[4294967296]" 0 1 0;"#,
            r#"setAttr ".n[9]" 0 0 1;"#,
            r#"setAttr ".uvst[0].uvsp[18446744073709551615]" -type "float2" 0 0;"#,
        ] {
            let result = mesh(&format!("createNode mesh -n \"m\";\n\t{}", statement));
            assert!(
                matches!(result, Err(ParseError::Format { ref node, .. }) if node == "m"),
                "{} gave {:?}",
                statement,
                result.map(|g| g.vertices.len())
            );
        }
    }

    #[test]
    fn test_chunk_may_overwrite_parsed_data() {
        let geometry = mesh(
            r#"createNode mesh -n "m";
	setAttr ".vt[0:2]" 0 0 0 1 0 0 0 1 0;
	setAttr ".vt[1]" 5 5 5;"#,
        )
        .unwrap();
        assert_eq!(geometry.vertices.len(), 3);
        assert_eq!(geometry.vertices[1], Vec3::splat(5.0));
    }

    #[test]
    fn test_count_only_statement_declares_split_total() {
        let split = r#"createNode mesh -n "m";
	setAttr -s 6 ".vt";
	setAttr ".vt[0:2]" 0 0 0 1 0 0 2 0 0;
	setAttr ".vt[3:5]" 0 1 0 1 1 0 2 1 0;
	setAttr -s 7 ".ed";
	setAttr ".ed[0:3]" 0 1 0 1 2 0 0 3 0 1 4 0;
	setAttr ".ed[4:6]" 2 5 0 3 4 0 4 5 0;
	setAttr -s 2 ".fc";
	setAttr ".fc[0]" -type "polyFaces" f 4 0 3 -6 -3;
	setAttr ".fc[1]" -type "polyFaces" f 4 1 4 -7 -4;"#;
        let geometry = mesh(split).unwrap();
        assert_eq!(geometry.declared_vertices, Some(6));
        assert_eq!(geometry.declared_edges, Some(7));
        assert_eq!(geometry.declared_faces, Some(2));
        assert_eq!(geometry.face_loops().unwrap(), vec![vec![0, 1, 4, 3], vec![1, 2, 5, 4]]);

        // A missing chunk fails the count check
        let truncated = split.replace(r#"setAttr ".vt[3:5]" 0 1 0 1 1 0 2 1 0;"#, "");
        assert!(matches!(mesh(&truncated), Err(ParseError::Format { .. })));
        let truncated = split.replace(r#"setAttr ".fc[1]" -type "polyFaces" f 4 1 4 -7 -4;"#, "");
        assert!(matches!(mesh(&truncated), Err(ParseError::Format { .. })));
    }

    #[test]
    fn test_material_groups() {
        let geometry = mesh(
            r#"createNode mesh -n "m";
	setAttr -s 2 ".iog[0].og";
	setAttr ".iog[0].og[0].gcl" -type "componentList" 1 "f[0:3]";
	setAttr ".instObjGroups[0].objectGroups[1].objectGrpCompList" -type "componentList" 2 "f[4]" "f[5:6]";"#,
        )
        .unwrap();

        assert_eq!(geometry.materials[&0], vec![FaceRange::new(0, 3)]);
        assert_eq!(
            geometry.materials[&1],
            vec![FaceRange::new(4, 4), FaceRange::new(5, 6)]
        );
    }

    #[test]
    fn test_per_vertex_normals() {
        let geometry = mesh(QUAD).unwrap();
        let loops = geometry.face_loops().unwrap();
        let normals = geometry.normal_assignment(&loops, &[]).unwrap();
        assert_eq!(normals.vertices, vec![0, 1, 2, 3]);
        assert!(normals.mismatch.is_none());
    }

    #[test]
    fn test_face_vertex_normals_reduce_and_report_mismatch() {
        let mut geometry = mesh(QUAD).unwrap();
        geometry.normals = vec![Vec3::Z, Vec3::Y, Vec3::X];
        let loops = vec![vec![0, 1, 3, 2]];

        let normals = geometry.normal_assignment(&loops, &[]).unwrap();
        assert_eq!(normals.vertices, vec![0, 1, 3]);
        assert_eq!(normals.normals, vec![Vec3::Z, Vec3::Y, Vec3::X]);
        assert_eq!(normals.mismatch, Some((3, 4)));
    }

    #[test]
    fn test_face_vertex_normals_include_holes() {
        // Vertex 7 is unused, so seven normals cannot be per-vertex data
        let geometry = mesh(
            r#"createNode mesh -n "m";
	setAttr ".vt[0:7]" 0 0 0 4 0 0 4 4 0 0 4 0 1 1 0 2 1 0 1 2 0 9 9 9;
	setAttr ".ed[0:6]" 0 1 0 1 2 0 2 3 0 3 0 0 4 5 0 5 6 0 6 4 0;
	setAttr ".fc[0]" -type "polyFaces" f 4 0 1 2 3 h 3 4 5 6;
	setAttr ".n[0:6]" 0 0 1 0 0 1 0 0 1 0 0 1 0 1 0 0 1 0 1e20 1e20 1e20;"#,
        )
        .unwrap();
        let loops = geometry.face_loops().unwrap();
        let holes = geometry.hole_loops().unwrap();
        assert_eq!(holes, vec![(0, vec![4, 5, 6])]);

        let normals = geometry.normal_assignment(&loops, &holes).unwrap();
        assert!(normals.mismatch.is_none());
        assert_eq!(normals.vertices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(normals.normals[4], Vec3::Y);

        // Without the hole loop the same normals no longer line up
        let normals = geometry.normal_assignment(&loops, &[]).unwrap();
        assert_eq!(normals.mismatch, Some((7, 4)));
    }

    #[test]
    fn test_unset_normals_are_dropped() {
        let mut geometry = mesh(QUAD).unwrap();
        geometry.normals[1] = Vec3::splat(1.0e20);
        let normals = geometry.normal_assignment(&[], &[]).unwrap();
        assert_eq!(normals.vertices, vec![0, 2, 3]);
    }

    #[test]
    fn test_uv_assignment_includes_holes() {
        let geometry = mesh(
            r#"createNode mesh -n "m";
	setAttr ".fc[0:1]" -type "polyFaces"
		f 3 0 1 2 mu 0 3 0 1 2
		h 3 3 4 5 mu 0 3 3 4 5
		f 3 6 7 8;"#,
        )
        .unwrap();

        let (counts, ids) = geometry.uv_assignment(0);
        assert_eq!(counts, vec![6, 0]);
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_color_assignment() {
        let geometry = mesh(
            r#"createNode mesh -n "m";
	setAttr ".clst[0].clsn" -type "string" "colorSet1";
	setAttr ".clst[0].rprt" 3;
	setAttr -s 2 ".clst[0].clsp[0:1]" 1 0 0 0 1 0;
	setAttr ".vt[0:2]" 0 0 0 1 0 0 0 1 0;
	setAttr ".ed[0:2]" 0 1 0 1 2 0 2 0 0;
	setAttr ".fc[0]" -type "polyFaces" f 3 0 1 2 mc 0 3 0 -1 1;"#,
        )
        .unwrap();

        let loops = geometry.face_loops().unwrap();
        let colors = geometry.color_assignment(0, &loops).unwrap().unwrap();
        assert_eq!(colors.name, "colorSet1");
        assert_eq!(colors.colors, vec![Color::rgb(1.0, 0.0, 0.0), Color::rgb(0.0, 1.0, 0.0)]);
        assert_eq!(colors.faces, vec![0, 0]);
        assert_eq!(colors.vertices, vec![0, 2]);
    }
}
