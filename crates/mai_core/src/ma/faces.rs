//! `polyFaces` record parsing.
//!
//! A face payload is a flat token stream of keyword records:
//!
//! ```text
//! f 4 0 5 -2 -5      face: edge count, signed edge ids
//! h 3 12 13 -15      hole in the most recent face
//! mu 0 4 0 1 3 2     uv set, count, uv ids (face or hole, by context)
//! mc 0 4 0 1 2 3     color set, count, color ids
//! ```
//!
//! Keyword-less tokens continue whichever record is open, so a record may be
//! split across lines or even across `setAttr` statements.

use std::collections::BTreeMap;

use super::parser::{ParseError, ParseResult};

/// Split a signed edge id into its real edge index and flip flag.
///
/// Negative ids encode a reversed edge as `-(id + 1)`.
pub fn decode_edge(signed: i64) -> (usize, bool) {
    if signed < 0 {
        ((!signed) as usize, true)
    } else {
        (signed as usize, false)
    }
}

/// Largest real edge index a face record may reference.
const MAX_EDGE: usize = u32::MAX as usize;

/// UV ids for one uv set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UvRecord {
    pub set: usize,
    pub ids: Vec<u32>,
}

/// Color ids for one color set; `-1` marks an uncolored face-vertex.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorRecord {
    pub set: usize,
    pub ids: Vec<i64>,
}

/// One face loop with its per-set uv and color records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FaceRecord {
    /// Signed edge ids
    pub edges: Vec<i64>,
    pub uvs: Vec<UvRecord>,
    pub colors: Vec<ColorRecord>,
}

/// A hole loop cut into `face`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HoleRecord {
    pub face: usize,

    /// Signed edge ids
    pub edges: Vec<i64>,
}

/// Parsed face payload of one mesh.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolyFaces {
    pub faces: Vec<FaceRecord>,
    pub holes: Vec<HoleRecord>,

    /// Hole uv records keyed by owning face
    pub hole_uvs: BTreeMap<usize, Vec<UvRecord>>,
}

impl PolyFaces {
    /// UV id count of `face` in `set`, hole uvs included.
    pub fn uv_count(&self, face: usize, set: usize) -> usize {
        let face_ids = self
            .faces
            .get(face)
            .map(|f| f.uvs.iter().filter(|r| r.set == set).map(|r| r.ids.len()).sum())
            .unwrap_or(0);
        let hole_ids: usize = self
            .hole_uvs
            .get(&face)
            .map(|records| records.iter().filter(|r| r.set == set).map(|r| r.ids.len()).sum())
            .unwrap_or(0);
        face_ids + hole_ids
    }
}

/// Which record the next keyword-less token belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Face,
    Hole,
    UvForFace,
    UvForHole,
    Color,
    /// Record kinds carried in the payload but not reconstructed (`fc`)
    Ignored,
}

/// Incremental polyFaces parser.
///
/// Feed every face statement's value tokens in order, then call
/// [`FaceStream::finish`].
#[derive(Debug)]
pub struct FaceStream {
    node: String,
    mode: Option<Mode>,

    /// Most recent face or hole, which decides where `mu` goes
    geometry_mode: Mode,

    /// Raw numbers of the open record (including its count prefix)
    open: Vec<i64>,
    result: PolyFaces,
}

impl FaceStream {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            mode: None,
            geometry_mode: Mode::Face,
            open: Vec::new(),
            result: PolyFaces::default(),
        }
    }

    pub fn feed<S: AsRef<str>>(&mut self, tokens: &[S]) -> ParseResult<()> {
        for token in tokens {
            self.token(token.as_ref())?;
        }
        Ok(())
    }

    fn token(&mut self, token: &str) -> ParseResult<()> {
        let keyword = match token {
            "f" => Some(Mode::Face),
            "h" => Some(Mode::Hole),
            "mu" => Some(if self.geometry_mode == Mode::Hole {
                Mode::UvForHole
            } else {
                Mode::UvForFace
            }),
            "mc" => Some(Mode::Color),
            t if t.starts_with(|c: char| c.is_ascii_alphabetic()) => Some(Mode::Ignored),
            _ => None,
        };

        match keyword {
            Some(mode) => {
                self.close()?;
                if mode == Mode::Hole && self.result.faces.is_empty() {
                    return Err(self.error("hole record before any face"));
                }
                if matches!(mode, Mode::Face | Mode::Hole) {
                    self.geometry_mode = mode;
                }
                if mode == Mode::Ignored {
                    log::debug!("{}: ignoring '{}' face record", self.node, token);
                }
                self.mode = Some(mode);
                Ok(())
            }
            None => {
                let value: i64 = token
                    .parse()
                    .map_err(|_| self.error(&format!("invalid face token '{}'", token)))?;
                match self.mode {
                    None => Err(self.error(&format!("value '{}' outside any record", token))),
                    Some(Mode::Ignored) => Ok(()),
                    Some(_) => {
                        self.open.push(value);
                        Ok(())
                    }
                }
            }
        }
    }

    /// Finalize the open record into the result.
    fn close(&mut self) -> ParseResult<()> {
        let Some(mode) = self.mode.take() else {
            return Ok(());
        };
        let raw = std::mem::take(&mut self.open);

        match mode {
            Mode::Face => {
                let edges = self.edges(&raw, "f")?;
                self.result.faces.push(FaceRecord {
                    edges,
                    ..Default::default()
                });
            }
            Mode::Hole => {
                let edges = self.edges(&raw, "h")?;
                let face = self.result.faces.len() - 1;
                self.result.holes.push(HoleRecord { face, edges });
            }
            Mode::UvForFace | Mode::UvForHole => {
                let set = self.set_index(&raw, "mu")?;
                let ids = self
                    .counted(&raw, 1, "mu")?
                    .into_iter()
                    .map(|id| u32::try_from(id).map_err(|_| self.error(&format!("negative uv id {}", id))))
                    .collect::<ParseResult<Vec<u32>>>()?;
                let face = self.current_face()?;
                let record = UvRecord { set, ids };
                if mode == Mode::UvForHole {
                    self.result.hole_uvs.entry(face).or_default().push(record);
                } else {
                    self.result.faces[face].uvs.push(record);
                }
            }
            Mode::Color => {
                let set = self.set_index(&raw, "mc")?;
                let ids = self.counted(&raw, 1, "mc")?;
                let face = self.current_face()?;
                self.result.faces[face].colors.push(ColorRecord { set, ids });
            }
            Mode::Ignored => {}
        }

        Ok(())
    }

    /// Ids after a count prefix at `count_at`, checked against the count.
    fn counted(&self, raw: &[i64], count_at: usize, kind: &str) -> ParseResult<Vec<i64>> {
        let count = *raw
            .get(count_at)
            .ok_or_else(|| self.error(&format!("'{}' record without a count", kind)))?;
        let ids = &raw[count_at + 1..];
        if count < 0 || ids.len() != count as usize {
            return Err(self.error(&format!(
                "'{}' record declares {} ids but has {}",
                kind,
                count,
                ids.len()
            )));
        }
        Ok(ids.to_vec())
    }

    /// Signed edge ids of a face or hole record, each within the u32 range.
    fn edges(&self, raw: &[i64], kind: &str) -> ParseResult<Vec<i64>> {
        let edges = self.counted(raw, 0, kind)?;
        if let Some(bad) = edges.iter().find(|&&id| decode_edge(id).0 > MAX_EDGE) {
            return Err(self.error(&format!("'{}' record edge id {} out of range", kind, bad)));
        }
        Ok(edges)
    }

    fn set_index(&self, raw: &[i64], kind: &str) -> ParseResult<usize> {
        raw.first()
            .and_then(|&s| usize::try_from(s).ok())
            .ok_or_else(|| self.error(&format!("'{}' record without a set index", kind)))
    }

    fn current_face(&self) -> ParseResult<usize> {
        self.result
            .faces
            .len()
            .checked_sub(1)
            .ok_or_else(|| self.error("uv or color record before any face"))
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError::format(self.node.clone(), message)
    }

    pub fn finish(mut self) -> ParseResult<PolyFaces> {
        self.close()?;
        Ok(self.result)
    }
}
