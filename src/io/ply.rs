//! PLY loader for Gaussian-splat scenes.
//!
//! Splat trainers write one `vertex` element with per-splat properties:
//!
//! ```text
//! x y z                  position (required)
//! scale_0..scale_2       log-space scale        → exp()
//! rot_0..rot_3           quaternion (w, x, y, z) → renormalized
//! f_dc_0..f_dc_2         SH DC color            → clamp(0.5 + c * C0, 0, 1)
//! opacity                logit-space opacity    → sigmoid()
//! ```
//!
//! Every group except the position is optional and falls back to a default
//! (see [`SplatRecord::to_splat`]). A group is used only if all of its
//! properties are present. Other properties (normals, higher SH bands) are
//! read and ignored.
//!
//! Format spec: http://paulbourke.net/dataformats/ply/

use crate::core::color::sh_dc_to_rgb;
use crate::core::math::normalize_quaternion;
use crate::core::{sigmoid, Splat, SplatCloud};
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use nalgebra::{Quaternion, Vector3};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when loading a splat PLY file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid PLY header: {0}")]
    InvalidHeader(String),

    #[error("Unsupported PLY feature: {0}")]
    Unsupported(String),

    #[error("Missing required vertex property: {0}")]
    MissingProperty(String),

    #[error("Truncated PLY data: expected {expected} vertices, read {read}")]
    Truncated { expected: usize, read: usize },

    #[error("Invalid PLY data: {0}")]
    InvalidData(String),
}

/// Scale used when a record has no `scale_*` properties.
pub const DEFAULT_SCALE: f32 = 0.01;

/// Body encoding declared by the `format` line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

/// PLY scalar types (both the classic and the sized spellings).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarType {
    fn parse(name: &str) -> Result<Self, LoadError> {
        Ok(match name {
            "char" | "int8" => Self::I8,
            "uchar" | "uint8" => Self::U8,
            "short" | "int16" => Self::I16,
            "ushort" | "uint16" => Self::U16,
            "int" | "int32" => Self::I32,
            "uint" | "uint32" => Self::U32,
            "float" | "float32" => Self::F32,
            "double" | "float64" => Self::F64,
            other => {
                return Err(LoadError::InvalidHeader(format!(
                    "unknown property type '{}'",
                    other
                )))
            }
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    Scalar(ScalarType),
    List { count: ScalarType, item: ScalarType },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub kind: PropertyKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub count: usize,
    pub properties: Vec<Property>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlyHeader {
    pub format: PlyFormat,
    pub elements: Vec<Element>,
}

impl PlyHeader {
    pub fn vertex(&self) -> Option<&Element> {
        self.elements.iter().find(|e| e.name == "vertex")
    }
}

/// Parse the header, leaving `reader` positioned at the first body byte.
pub fn read_header<R: BufRead>(reader: &mut R) -> Result<PlyHeader, LoadError> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim_end() != "ply" {
        return Err(LoadError::InvalidHeader("missing 'ply' magic".to_string()));
    }

    let mut format = None;
    let mut elements: Vec<Element> = Vec::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(LoadError::InvalidHeader("missing end_header".to_string()));
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["end_header"] => break,
            [] | ["comment", ..] | ["obj_info", ..] => {}
            ["format", fmt, _version] => {
                format = Some(match *fmt {
                    "ascii" => PlyFormat::Ascii,
                    "binary_little_endian" => PlyFormat::BinaryLittleEndian,
                    "binary_big_endian" => PlyFormat::BinaryBigEndian,
                    other => return Err(LoadError::Unsupported(format!("format '{}'", other))),
                });
            }
            ["element", name, count] => {
                let count = count.parse().map_err(|_| {
                    LoadError::InvalidHeader(format!("bad element count '{}'", count))
                })?;
                elements.push(Element {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            ["property", "list", count, item, name] => {
                let element = elements.last_mut().ok_or_else(|| {
                    LoadError::InvalidHeader("property before any element".to_string())
                })?;
                element.properties.push(Property {
                    name: name.to_string(),
                    kind: PropertyKind::List {
                        count: ScalarType::parse(count)?,
                        item: ScalarType::parse(item)?,
                    },
                });
            }
            ["property", ty, name] => {
                let element = elements.last_mut().ok_or_else(|| {
                    LoadError::InvalidHeader("property before any element".to_string())
                })?;
                element.properties.push(Property {
                    name: name.to_string(),
                    kind: PropertyKind::Scalar(ScalarType::parse(ty)?),
                });
            }
            _ => {
                return Err(LoadError::InvalidHeader(format!(
                    "unrecognized line '{}'",
                    line.trim_end()
                )))
            }
        }
    }

    let format = format.ok_or_else(|| LoadError::InvalidHeader("missing format line".to_string()))?;
    Ok(PlyHeader { format, elements })
}

/// One splat as stored in the file, before defaults and activations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplatRecord {
    pub position: [f32; 3],
    pub log_scale: Option<[f32; 3]>,
    /// `(w, x, y, z)`
    pub rotation: Option<[f32; 4]>,
    pub sh_dc: Option<[f32; 3]>,
    pub opacity_logit: Option<f32>,
}

impl SplatRecord {
    /// Apply activations, falling back to defaults for absent groups:
    /// scale 0.01, identity rotation, mid-gray color, opacity 1.0.
    pub fn to_splat(&self) -> Splat {
        let scale = match self.log_scale {
            Some([a, b, c]) => Vector3::new(a.exp(), b.exp(), c.exp()),
            None => Vector3::new(DEFAULT_SCALE, DEFAULT_SCALE, DEFAULT_SCALE),
        };
        let rotation = match self.rotation {
            Some([w, x, y, z]) => normalize_quaternion(&Quaternion::new(w, x, y, z)),
            None => Quaternion::identity(),
        };
        let color = match self.sh_dc {
            Some(dc) => sh_dc_to_rgb(dc),
            None => Vector3::new(0.5, 0.5, 0.5),
        };
        let opacity = self.opacity_logit.map(sigmoid).unwrap_or(1.0);

        Splat::new(
            Vector3::new(self.position[0], self.position[1], self.position[2]),
            scale,
            rotation,
            color,
            opacity,
        )
    }
}

/// Column indices of the splat properties within a vertex row.
struct VertexLayout {
    position: [usize; 3],
    scale: Option<[usize; 3]>,
    rotation: Option<[usize; 4]>,
    sh_dc: Option<[usize; 3]>,
    opacity: Option<usize>,
}

impl VertexLayout {
    fn from_element(vertex: &Element) -> Result<Self, LoadError> {
        if let Some(p) = vertex
            .properties
            .iter()
            .find(|p| matches!(p.kind, PropertyKind::List { .. }))
        {
            return Err(LoadError::Unsupported(format!(
                "list property '{}' on vertex element",
                p.name
            )));
        }

        let find = |name: &str| vertex.properties.iter().position(|p| p.name == name);
        let group = |names: &[&str]| -> Option<Vec<usize>> { names.iter().map(|n| find(*n)).collect() };

        let required = |name: &str| find(name).ok_or_else(|| LoadError::MissingProperty(name.to_string()));
        let position = [required("x")?, required("y")?, required("z")?];

        Ok(Self {
            position,
            scale: group(&["scale_0", "scale_1", "scale_2"]).map(|v| [v[0], v[1], v[2]]),
            rotation: group(&["rot_0", "rot_1", "rot_2", "rot_3"]).map(|v| [v[0], v[1], v[2], v[3]]),
            sh_dc: group(&["f_dc_0", "f_dc_1", "f_dc_2"]).map(|v| [v[0], v[1], v[2]]),
            opacity: find("opacity"),
        })
    }

    fn record(&self, row: &[f64]) -> SplatRecord {
        let f = |i: usize| row[i] as f32;
        SplatRecord {
            position: self.position.map(f),
            log_scale: self.scale.map(|idx| idx.map(f)),
            rotation: self.rotation.map(|idx| idx.map(f)),
            sh_dc: self.sh_dc.map(|idx| idx.map(f)),
            opacity_logit: self.opacity.map(f),
        }
    }
}

fn read_scalar<B: ByteOrder, R: Read>(reader: &mut R, ty: ScalarType) -> std::io::Result<f64> {
    Ok(match ty {
        ScalarType::I8 => reader.read_i8()? as f64,
        ScalarType::U8 => reader.read_u8()? as f64,
        ScalarType::I16 => reader.read_i16::<B>()? as f64,
        ScalarType::U16 => reader.read_u16::<B>()? as f64,
        ScalarType::I32 => reader.read_i32::<B>()? as f64,
        ScalarType::U32 => reader.read_u32::<B>()? as f64,
        ScalarType::F32 => reader.read_f32::<B>()? as f64,
        ScalarType::F64 => reader.read_f64::<B>()?,
    })
}

/// Source of property values, one row at a time.
trait RowSource {
    fn scalar(&mut self, ty: ScalarType) -> Result<f64, LoadError>;

    /// Read one row of `element`. Lists are consumed and reported as NaN.
    fn row(&mut self, element: &Element, out: &mut Vec<f64>) -> Result<(), LoadError> {
        out.clear();
        for property in &element.properties {
            match property.kind {
                PropertyKind::Scalar(ty) => out.push(self.scalar(ty)?),
                PropertyKind::List { count, item } => {
                    let n = self.scalar(count)?;
                    if !(n >= 0.0 && n.fract() == 0.0) {
                        return Err(LoadError::InvalidData(format!(
                            "bad list length {} for '{}'",
                            n, property.name
                        )));
                    }
                    for _ in 0..n as usize {
                        self.scalar(item)?;
                    }
                    out.push(f64::NAN);
                }
            }
        }
        Ok(())
    }
}

struct BinarySource<R, B> {
    reader: R,
    _order: std::marker::PhantomData<B>,
}

impl<R: Read, B: ByteOrder> RowSource for BinarySource<R, B> {
    fn scalar(&mut self, ty: ScalarType) -> Result<f64, LoadError> {
        Ok(read_scalar::<B, R>(&mut self.reader, ty)?)
    }
}

struct AsciiSource<'a> {
    tokens: std::str::SplitAsciiWhitespace<'a>,
}

impl RowSource for AsciiSource<'_> {
    fn scalar(&mut self, _ty: ScalarType) -> Result<f64, LoadError> {
        let token = self.tokens.next().ok_or_else(|| {
            LoadError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "ascii body ended early",
            ))
        })?;
        token
            .parse::<f64>()
            .map_err(|_| LoadError::InvalidData(format!("bad number '{}'", token)))
    }
}

fn is_eof(err: &LoadError) -> bool {
    matches!(err, LoadError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
}

/// Upper bound on the up-front allocation; the header count is untrusted.
const MAX_PREALLOCATED_VERTICES: usize = 1 << 20;

/// Walk elements in file order, skipping everything before `vertex` and
/// collecting vertex rows as splats. Elements after `vertex` are not read.
fn read_body<S: RowSource>(source: &mut S, header: &PlyHeader) -> Result<SplatCloud, LoadError> {
    let vertex = header
        .vertex()
        .ok_or_else(|| LoadError::InvalidHeader("no vertex element".to_string()))?;
    let layout = VertexLayout::from_element(vertex)?;

    let mut row = Vec::new();
    for element in header.elements.iter().take_while(|e| e.name != "vertex") {
        for _ in 0..element.count {
            source.row(element, &mut row)?;
        }
    }

    let mut splats = Vec::with_capacity(vertex.count.min(MAX_PREALLOCATED_VERTICES));
    for read in 0..vertex.count {
        match source.row(vertex, &mut row) {
            Ok(()) => splats.push(layout.record(&row).to_splat()),
            Err(e) if is_eof(&e) => {
                return Err(LoadError::Truncated {
                    expected: vertex.count,
                    read,
                })
            }
            Err(e) => return Err(e),
        }
    }
    Ok(SplatCloud::from_splats(splats))
}

/// Read a splat cloud from any buffered PLY source.
pub fn read_splat_ply<R: BufRead>(mut reader: R) -> Result<SplatCloud, LoadError> {
    let header = read_header(&mut reader)?;

    match header.format {
        PlyFormat::Ascii => {
            let mut body = String::new();
            reader.read_to_string(&mut body)?;
            let mut source = AsciiSource {
                tokens: body.split_ascii_whitespace(),
            };
            read_body(&mut source, &header)
        }
        PlyFormat::BinaryLittleEndian => {
            let mut source = BinarySource::<_, LittleEndian> {
                reader,
                _order: std::marker::PhantomData,
            };
            read_body(&mut source, &header)
        }
        PlyFormat::BinaryBigEndian => {
            let mut source = BinarySource::<_, BigEndian> {
                reader,
                _order: std::marker::PhantomData,
            };
            read_body(&mut source, &header)
        }
    }
}

/// Load a splat cloud from a `.ply` file.
pub fn load_splat_ply(path: &Path) -> Result<SplatCloud, LoadError> {
    let file = File::open(path)?;
    read_splat_ply(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use byteorder::WriteBytesExt;
    use std::io::Cursor;

    const FULL_HEADER: &str = "ply
format ascii 1.0
comment written by a trainer
element vertex 2
property float x
property float y
property float z
property float nx
property float ny
property float nz
property float f_dc_0
property float f_dc_1
property float f_dc_2
property float opacity
property float scale_0
property float scale_1
property float scale_2
property float rot_0
property float rot_1
property float rot_2
property float rot_3
end_header
";

    #[test]
    fn test_read_ascii_full_record() {
        let ply = format!(
            "{}{}\n{}\n",
            FULL_HEADER,
            "1 2 3 0 0 1 0 0 0 0 -2.302585 -2.302585 -2.302585 2 0 0 0",
            "4 5 6 0 0 1 1.7724539 0 -1.7724539 100 0 0 0 1 0 0 0"
        );
        let cloud = read_splat_ply(Cursor::new(ply)).unwrap();
        assert_eq!(cloud.len(), 2);

        let a = &cloud.splats[0];
        assert_eq!(a.position, Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(a.scale.x, 0.1, epsilon = 1e-5);
        assert_relative_eq!(a.opacity, 0.5, epsilon = 1e-6);
        assert_eq!(a.color, Vector3::new(0.5, 0.5, 0.5));
        // (2, 0, 0, 0) renormalizes to identity.
        assert_relative_eq!(a.rotation.w, 1.0, epsilon = 1e-6);

        let b = &cloud.splats[1];
        assert_relative_eq!(b.color.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(b.color.z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(b.opacity, 1.0, epsilon = 1e-6);
        assert_relative_eq!(b.scale.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_defaults_for_position_only_file() {
        let ply = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n0.5 -1 2\n";
        let cloud = read_splat_ply(Cursor::new(ply)).unwrap();
        let s = &cloud.splats[0];
        assert_eq!(s.scale, Vector3::new(DEFAULT_SCALE, DEFAULT_SCALE, DEFAULT_SCALE));
        assert_eq!(s.rotation, Quaternion::identity());
        assert_eq!(s.color, Vector3::new(0.5, 0.5, 0.5));
        assert_eq!(s.opacity, 1.0);
    }

    #[test]
    fn test_partial_group_falls_back_to_default() {
        let ply = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nproperty float scale_0\nproperty float scale_1\nend_header\n0 0 0 1 1\n";
        let cloud = read_splat_ply(Cursor::new(ply)).unwrap();
        assert_eq!(cloud.splats[0].scale, Vector3::new(DEFAULT_SCALE, DEFAULT_SCALE, DEFAULT_SCALE));
    }

    #[test]
    fn test_zero_quaternion_resolves_to_identity_matrix() {
        let record = SplatRecord {
            rotation: Some([0.0, 0.0, 0.0, 0.0]),
            ..Default::default()
        };
        let r = record.to_splat().rotation_matrix();
        assert!(r.iter().all(|v| v.is_finite()));
        assert_relative_eq!(r, nalgebra::Matrix3::identity(), epsilon = 1e-6);
    }

    fn binary_ply<B: ByteOrder>(format: &str, rows: &[[f32; 4]]) -> Vec<u8> {
        let header = format!(
            "ply\nformat {} 1.0\nelement face 1\nproperty list uchar int vertex_indices\nelement vertex {}\nproperty float x\nproperty float y\nproperty float z\nproperty uchar flag\nproperty float opacity\nend_header\n",
            format,
            rows.len()
        );
        let mut bytes = header.into_bytes();
        // One face with three indices, before the vertex element.
        bytes.write_u8(3).unwrap();
        for i in 0..3 {
            bytes.write_i32::<B>(i).unwrap();
        }
        for row in rows {
            bytes.write_f32::<B>(row[0]).unwrap();
            bytes.write_f32::<B>(row[1]).unwrap();
            bytes.write_f32::<B>(row[2]).unwrap();
            bytes.write_u8(7).unwrap();
            bytes.write_f32::<B>(row[3]).unwrap();
        }
        bytes
    }

    #[test]
    fn test_read_binary_little_endian() {
        let bytes = binary_ply::<LittleEndian>(
            "binary_little_endian",
            &[[1.0, 2.0, 3.0, 0.0], [-1.0, 0.5, 9.0, 50.0]],
        );
        let cloud = read_splat_ply(Cursor::new(bytes)).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.splats[1].position, Vector3::new(-1.0, 0.5, 9.0));
        assert_relative_eq!(cloud.splats[0].opacity, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_read_binary_big_endian() {
        let bytes = binary_ply::<BigEndian>("binary_big_endian", &[[4.0, 5.0, 6.0, 0.0]]);
        let cloud = read_splat_ply(Cursor::new(bytes)).unwrap();
        assert_eq!(cloud.splats[0].position, Vector3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_truncated_binary_body() {
        let mut bytes = binary_ply::<LittleEndian>(
            "binary_little_endian",
            &[[1.0, 2.0, 3.0, 0.0], [4.0, 5.0, 6.0, 0.0]],
        );
        bytes.truncate(bytes.len() - 6);
        match read_splat_ply(Cursor::new(bytes)) {
            Err(LoadError::Truncated { expected: 2, read: 1 }) => {}
            other => panic!("expected truncation error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_position_property() {
        let ply = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nend_header\n0 0\n";
        assert!(matches!(
            read_splat_ply(Cursor::new(ply)),
            Err(LoadError::MissingProperty(ref p)) if p == "z"
        ));
    }

    #[test]
    fn test_not_a_ply_file() {
        let result = read_splat_ply(Cursor::new("This is not a PLY file\n"));
        assert!(matches!(result, Err(LoadError::InvalidHeader(_))));
    }

    #[test]
    fn test_unknown_format() {
        let ply = "ply\nformat binary_middle_endian 1.0\nelement vertex 0\nend_header\n";
        assert!(matches!(
            read_splat_ply(Cursor::new(ply)),
            Err(LoadError::Unsupported(_))
        ));
    }

    #[test]
    fn test_header_parses_elements_and_types() {
        let mut cursor = Cursor::new(FULL_HEADER);
        let header = read_header(&mut cursor).unwrap();
        assert_eq!(header.format, PlyFormat::Ascii);
        let vertex = header.vertex().unwrap();
        assert_eq!(vertex.count, 2);
        assert_eq!(vertex.properties.len(), 17);
        assert_eq!(vertex.properties[0].kind, PropertyKind::Scalar(ScalarType::F32));
    }
}
