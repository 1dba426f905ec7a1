use std::io::{BufRead, Read};
use std::path::Path;

use super::{
    properties::{PlyDataType, PlyElement, PlyFormat, PlyPropertyDefinition, PlyPropertyKind},
    PlyError,
};
use crate::mesh::TriangleMesh;

/// The parsed header of a PLY file.
#[derive(Debug, Clone, PartialEq)]
pub struct PlyHeader {
    /// Body encoding.
    pub format: PlyFormat,
    /// Element declarations in body order.
    pub elements: Vec<PlyElement>,
}

impl PlyHeader {
    /// The element called `name`.
    pub fn element(&self, name: &str) -> Option<&PlyElement> {
        self.elements.iter().find(|e| e.name == name)
    }
}

/// Parse the header, leaving `reader` positioned at the first body byte.
pub fn parse_header<R: BufRead>(reader: &mut R) -> Result<PlyHeader, PlyError> {
    let mut line = String::new();
    let mut format = None;
    let mut elements: Vec<PlyElement> = Vec::new();

    reader.read_line(&mut line)?;
    if line.trim() != "ply" {
        return Err(PlyError::InvalidHeader("missing magic number".to_string()));
    }

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(PlyError::InvalidHeader("missing end_header".to_string()));
        }
        let parts = line.split_whitespace().collect::<Vec<_>>();

        match parts.as_slice() {
            ["end_header"] => break,
            [] | ["comment", ..] | ["obj_info", ..] => continue,
            ["format", kind, _version] => {
                format = Some(match *kind {
                    "ascii" => PlyFormat::Ascii,
                    "binary_little_endian" => PlyFormat::BinaryLittleEndian,
                    other => return Err(PlyError::UnsupportedFormat(other.to_string())),
                });
            }
            ["element", name, count] => {
                let count = count
                    .parse()
                    .map_err(|_| PlyError::InvalidHeader(format!("invalid count: {count}")))?;
                elements.push(PlyElement {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            ["property", "list", count, item, name] => {
                let element = elements.last_mut().ok_or_else(|| {
                    PlyError::InvalidHeader("property before element".to_string())
                })?;
                element.properties.push(PlyPropertyDefinition {
                    name: name.to_string(),
                    kind: PlyPropertyKind::List {
                        count: PlyDataType::parse(count)?,
                        item: PlyDataType::parse(item)?,
                    },
                });
            }
            ["property", data_type, name] => {
                let element = elements.last_mut().ok_or_else(|| {
                    PlyError::InvalidHeader("property before element".to_string())
                })?;
                element.properties.push(PlyPropertyDefinition {
                    name: name.to_string(),
                    kind: PlyPropertyKind::Scalar(PlyDataType::parse(data_type)?),
                });
            }
            _ => {
                return Err(PlyError::InvalidHeader(format!(
                    "unexpected line: {}",
                    line.trim()
                )))
            }
        }
    }

    let format = format.ok_or_else(|| PlyError::InvalidHeader("missing format".to_string()))?;
    Ok(PlyHeader { format, elements })
}

/// Supplies body values one row at a time.
trait ValueSource {
    fn begin_row(&mut self) -> Result<(), PlyError>;
    fn next_value(&mut self, data_type: PlyDataType) -> Result<f64, PlyError>;
}

struct BinarySource<'a, R> {
    reader: &'a mut R,
}

impl<R: Read> ValueSource for BinarySource<'_, R> {
    fn begin_row(&mut self) -> Result<(), PlyError> {
        Ok(())
    }

    fn next_value(&mut self, data_type: PlyDataType) -> Result<f64, PlyError> {
        data_type.read_le(&mut *self.reader)
    }
}

struct AsciiSource<'a, R> {
    reader: &'a mut R,
    line: String,
    cursor: usize,
}

impl<R: BufRead> AsciiSource<'_, R> {
    fn next_token(&mut self) -> Option<&str> {
        let rest = &self.line[self.cursor..];
        let start = rest.find(|c: char| !c.is_whitespace())?;
        let len = rest[start..]
            .find(char::is_whitespace)
            .unwrap_or(rest.len() - start);
        let begin = self.cursor + start;
        self.cursor = begin + len;
        Some(&self.line[begin..begin + len])
    }
}

impl<R: BufRead> ValueSource for AsciiSource<'_, R> {
    fn begin_row(&mut self) -> Result<(), PlyError> {
        loop {
            self.line.clear();
            self.cursor = 0;
            if self.reader.read_line(&mut self.line)? == 0 {
                return Err(PlyError::Parse("unexpected end of file".to_string()));
            }
            if !self.line.trim().is_empty() {
                return Ok(());
            }
        }
    }

    fn next_value(&mut self, data_type: PlyDataType) -> Result<f64, PlyError> {
        let token = self
            .next_token()
            .ok_or_else(|| PlyError::Parse("row has too few values".to_string()))?;
        data_type.parse_ascii(token)
    }
}

/// Read one row. Scalars land in `scalars` by property index; the items of the list
/// property at `keep_list` land in `list`, other lists are consumed and dropped.
fn read_row<S: ValueSource>(
    source: &mut S,
    element: &PlyElement,
    keep_list: Option<usize>,
    scalars: &mut [f64],
    list: &mut Vec<f64>,
) -> Result<(), PlyError> {
    source.begin_row()?;
    list.clear();
    for (i, prop) in element.properties.iter().enumerate() {
        match prop.kind {
            PlyPropertyKind::Scalar(data_type) => {
                scalars[i] = source.next_value(data_type)?;
            }
            PlyPropertyKind::List { count, item } => {
                let n = as_index(source.next_value(count)?)?;
                for _ in 0..n {
                    let value = source.next_value(item)?;
                    if keep_list == Some(i) {
                        list.push(value);
                    }
                }
            }
        }
    }
    Ok(())
}

fn as_index(value: f64) -> Result<usize, PlyError> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        Ok(value as usize)
    } else {
        Err(PlyError::Parse(format!("invalid index: {value}")))
    }
}

fn scalar_index(element: &PlyElement, name: &str) -> Result<usize, PlyError> {
    element
        .property_index(name)
        .filter(|&i| matches!(element.properties[i].kind, PlyPropertyKind::Scalar(_)))
        .ok_or_else(|| PlyError::Missing(format!("vertex property {name}")))
}

/// Upper bound for preallocation, element counts come from an untrusted header.
const MAX_RESERVE: usize = 1 << 16;

fn read_body<S: ValueSource>(source: &mut S, header: &PlyHeader) -> Result<TriangleMesh, PlyError> {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();
    let mut seen_vertices = false;
    let mut list = Vec::new();

    for element in &header.elements {
        let mut scalars = vec![0.0; element.properties.len()];

        match element.name.as_str() {
            "vertex" => {
                let (ix, iy, iz) = (
                    scalar_index(element, "x")?,
                    scalar_index(element, "y")?,
                    scalar_index(element, "z")?,
                );
                vertices.reserve(element.count.min(MAX_RESERVE));
                for _ in 0..element.count {
                    read_row(source, element, None, &mut scalars, &mut list)?;
                    vertices.push([scalars[ix], scalars[iy], scalars[iz]]);
                }
                seen_vertices = true;
            }
            "face" => {
                let il = element
                    .property_index("vertex_indices")
                    .or_else(|| element.property_index("vertex_index"))
                    .ok_or_else(|| PlyError::Missing("face property vertex_indices".to_string()))?;
                faces.reserve(element.count.min(MAX_RESERVE));
                for _ in 0..element.count {
                    read_row(source, element, Some(il), &mut scalars, &mut list)?;
                    // polygons are split into a triangle fan
                    if list.len() >= 3 {
                        let a = as_index(list[0])?;
                        for pair in list[1..].windows(2) {
                            faces.push([a, as_index(pair[0])?, as_index(pair[1])?]);
                        }
                    }
                }
            }
            _ => {
                for _ in 0..element.count {
                    read_row(source, element, None, &mut scalars, &mut list)?;
                }
            }
        }
    }

    if !seen_vertices {
        return Err(PlyError::Missing("element vertex".to_string()));
    }

    let num_vertices = vertices.len();
    if let Some(&index) = faces.iter().flatten().find(|&&i| i >= num_vertices) {
        return Err(PlyError::IndexOutOfRange {
            index,
            num_vertices,
        });
    }

    Ok(TriangleMesh::new(vertices, faces))
}

/// Read a triangle mesh from a PLY stream in ASCII or binary little endian format.
///
/// # Arguments
///
/// * `reader` - The buffered stream, positioned at the start of the file.
///
/// # Returns
///
/// The mesh with vertex positions and triangulated faces. A file without a face
/// element yields a mesh with no triangles.
pub fn read_ply_mesh_from_reader<R: BufRead>(reader: &mut R) -> Result<TriangleMesh, PlyError> {
    let header = parse_header(reader)?;
    match header.format {
        PlyFormat::Ascii => {
            let mut source = AsciiSource {
                reader,
                line: String::new(),
                cursor: 0,
            };
            read_body(&mut source, &header)
        }
        PlyFormat::BinaryLittleEndian => read_body(&mut BinarySource { reader }, &header),
    }
}

/// Read a triangle mesh from a PLY file.
pub fn read_ply_mesh(path: impl AsRef<Path>) -> Result<TriangleMesh, PlyError> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    read_ply_mesh_from_reader(&mut reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CUBE_ASCII: &str = "ply
format ascii 1.0
comment unit cube
element vertex 8
property float x
property float y
property float z
element face 6
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
1 1 0
0 1 0
0 0 1
1 0 1
1 1 1
0 1 1
4 0 3 2 1
4 4 5 6 7
4 0 1 5 4
4 1 2 6 5
4 2 3 7 6
4 3 0 4 7
";

    #[test]
    fn test_parse_header_basic() {
        let header_text = "ply\nformat binary_little_endian 1.0\nelement vertex 10\nproperty float x\nproperty float y\nproperty float z\nend_header\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        let header = parse_header(&mut reader).unwrap();
        assert_eq!(header.format, PlyFormat::BinaryLittleEndian);
        let vertex = header.element("vertex").unwrap();
        assert_eq!(vertex.count, 10);
        assert_eq!(vertex.properties.len(), 3);
        assert_eq!(vertex.properties[0].name, "x");
        assert_eq!(
            vertex.properties[0].kind,
            PlyPropertyKind::Scalar(PlyDataType::Float32)
        );
    }

    #[test]
    fn test_parse_header_rejects_big_endian() {
        let header_text = "ply\nformat binary_big_endian 1.0\nelement vertex 1\nend_header\n";
        let mut reader = std::io::BufReader::new(header_text.as_bytes());
        assert!(matches!(
            parse_header(&mut reader),
            Err(PlyError::UnsupportedFormat(_))
        ));

        let mut reader = std::io::BufReader::new("obj\n".as_bytes());
        assert!(matches!(
            parse_header(&mut reader),
            Err(PlyError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_read_ascii_cube() {
        let mut reader = std::io::BufReader::new(CUBE_ASCII.as_bytes());
        let mesh = read_ply_mesh_from_reader(&mut reader).unwrap();
        assert_eq!(mesh.vertices().len(), 8);
        // six quads, two triangles each
        assert_eq!(mesh.num_faces(), 12);
        assert_eq!(mesh.faces()[0], [0, 3, 2]);
        assert_eq!(mesh.faces()[1], [0, 2, 1]);
        assert_eq!(mesh.bounds(), Some(([0.0; 3], [1.0; 3])));
    }

    #[test]
    fn test_read_binary_with_extra_properties() -> Result<(), PlyError> {
        let mut file = NamedTempFile::new()?;
        let header = "ply\nformat binary_little_endian 1.0\nelement vertex 3\nproperty double x\nproperty double y\nproperty double z\nproperty float nx\nproperty float ny\nproperty float nz\nproperty uchar red\nproperty uchar green\nproperty uchar blue\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n";
        file.write_all(header.as_bytes())?;

        let mut data = Vec::new();
        for p in [[0.0f64, 0.0, 0.5], [1.0, 0.0, 0.5], [0.0, 1.0, 1.5]] {
            for c in p {
                data.extend_from_slice(&c.to_le_bytes());
            }
            for n in [0.0f32, 0.0, 1.0] {
                data.extend_from_slice(&n.to_le_bytes());
            }
            data.extend_from_slice(&[255, 128, 0]);
        }
        data.push(3);
        for i in [0i32, 1, 2] {
            data.extend_from_slice(&i.to_le_bytes());
        }
        file.write_all(&data)?;

        let mesh = read_ply_mesh(file.path())?;
        assert_eq!(mesh.vertices()[2], [0.0, 1.0, 1.5]);
        assert_eq!(mesh.faces(), &[[0, 1, 2]]);
        Ok(())
    }

    #[test]
    fn test_skips_unknown_elements() {
        let text = "ply\nformat ascii 1.0\nelement camera 1\nproperty float fx\nproperty list uchar float k\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uchar uint vertex_index\nend_header\n500 2 0.1 0.2\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n";
        let mut reader = std::io::BufReader::new(text.as_bytes());
        let mesh = read_ply_mesh_from_reader(&mut reader).unwrap();
        assert_eq!(mesh.num_faces(), 1);
    }

    #[test]
    fn test_point_cloud_has_no_faces() {
        let text = "ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n1 1 1\n";
        let mut reader = std::io::BufReader::new(text.as_bytes());
        let mesh = read_ply_mesh_from_reader(&mut reader).unwrap();
        assert_eq!(mesh.vertices().len(), 2);
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_invalid_bodies() {
        let out_of_range = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n0 0 0\n3 0 1 2\n";
        let mut reader = std::io::BufReader::new(out_of_range.as_bytes());
        assert!(matches!(
            read_ply_mesh_from_reader(&mut reader),
            Err(PlyError::IndexOutOfRange { index: 1, num_vertices: 1 })
        ));

        let truncated = "ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n";
        let mut reader = std::io::BufReader::new(truncated.as_bytes());
        assert!(matches!(
            read_ply_mesh_from_reader(&mut reader),
            Err(PlyError::Parse(_))
        ));

        let no_z = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nend_header\n0 0\n";
        let mut reader = std::io::BufReader::new(no_z.as_bytes());
        assert!(matches!(
            read_ply_mesh_from_reader(&mut reader),
            Err(PlyError::Missing(_))
        ));
    }

    #[test]
    fn test_count_larger_than_body() {
        let ascii = "ply\nformat ascii 1.0\nelement vertex 1000000000000000000\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n";
        let mut reader = std::io::BufReader::new(ascii.as_bytes());
        assert!(matches!(
            read_ply_mesh_from_reader(&mut reader),
            Err(PlyError::Parse(_))
        ));

        let mut binary = b"ply\nformat binary_little_endian 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nelement face 1000000000000000000\nproperty list uchar int vertex_indices\nend_header\n".to_vec();
        for v in [[0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                binary.extend_from_slice(&c.to_le_bytes());
            }
        }
        binary.push(3);
        for i in [0i32, 1, 2] {
            binary.extend_from_slice(&i.to_le_bytes());
        }
        let mut reader = std::io::BufReader::new(binary.as_slice());
        assert!(read_ply_mesh_from_reader(&mut reader).is_err());
    }
}
