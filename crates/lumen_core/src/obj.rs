//! Wavefront OBJ parsing.
//!
//! Line-by-line parser for the subset of OBJ this renderer consumes:
//! `v`, `vn`, `vt`, `f`, `mtllib`, `usemtl`. Faces may be triangles or
//! quads; quads are fanned into two triangles. Unknown directives log a
//! warning and are skipped.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use lumen_math::Vec3;
use thiserror::Error;

use crate::material::Material;
use crate::mtl;
use crate::scene::Scene;
use crate::triangle::Triangle;

/// Errors that can occur while parsing OBJ/MTL files.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}:{line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },
}

impl ParseError {
    fn at(path: &Path, line: usize, message: impl Into<String>) -> Self {
        ParseError::Parse {
            path: path.display().to_string(),
            line,
            message: message.into(),
        }
    }
}

/// Load an OBJ file (and the MTL libraries it references) into the scene.
///
/// Every face becomes one or two `Triangle`s added to the scene's octree,
/// each carrying its source line number and the material selected by the
/// most recent `usemtl`.
pub fn load_obj(scene: &mut Scene, path: &Path) -> Result<(), ParseError> {
    log::info!("reading OBJ file {}", path.display());
    let content = fs::read_to_string(path)?;

    let mut vertices: Vec<Vec3> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut texcoords: Vec<Vec3> = Vec::new();
    let mut current_material: Option<Arc<Material>> = None;

    for (line_no, raw_line) in content.lines().enumerate() {
        let line_no = line_no + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let directive = match tokens.next() {
            Some(d) => d,
            None => continue,
        };

        match directive {
            "v" => vertices.push(parse_vec3(path, line_no, &mut tokens)?),
            "vn" => normals.push(parse_vec3(path, line_no, &mut tokens)?),
            "vt" => texcoords.push(parse_uvw(path, line_no, &mut tokens)?),
            "f" => {
                read_face(
                    scene,
                    path,
                    line_no,
                    tokens,
                    &vertices,
                    &normals,
                    &texcoords,
                    current_material.clone(),
                )?;
            }
            "mtllib" => {
                let name = tokens.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    return Err(ParseError::at(path, line_no, "mtllib without a file name"));
                }
                let dir = path.parent().unwrap_or_else(|| Path::new("."));
                mtl::load_mtl(scene, &dir.join(&name))?;
            }
            "usemtl" => {
                let name = tokens.collect::<Vec<_>>().join(" ");
                current_material = scene.materials.get(&name).cloned();
                if current_material.is_none() {
                    log::warn!("{}:{}: unknown material \"{}\"", path.display(), line_no, name);
                }
            }
            // Smoothing groups, object and group names carry no geometry.
            "s" | "o" | "g" => {}
            other => {
                log::warn!(
                    "{}:{}: unsupported directive \"{}\"",
                    path.display(),
                    line_no,
                    other
                );
            }
        }
    }

    log::info!("loaded {} primitives from {}", scene.tree.len(), path.display());
    Ok(())
}

fn parse_f64(path: &Path, line: usize, token: Option<&str>) -> Result<f64, ParseError> {
    let token = token.ok_or_else(|| ParseError::at(path, line, "missing coordinate"))?;
    token
        .parse::<f64>()
        .map_err(|_| ParseError::at(path, line, format!("bad number \"{token}\"")))
}

fn parse_vec3<'a>(
    path: &Path,
    line: usize,
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Result<Vec3, ParseError> {
    Ok(Vec3::new(
        parse_f64(path, line, tokens.next())?,
        parse_f64(path, line, tokens.next())?,
        parse_f64(path, line, tokens.next())?,
    ))
}

/// Texture coordinates: `vt u [v [w]]` with v and w defaulting to zero.
fn parse_uvw<'a>(
    path: &Path,
    line: usize,
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Result<Vec3, ParseError> {
    let u = parse_f64(path, line, tokens.next())?;
    let v = match tokens.next() {
        Some(t) => parse_f64(path, line, Some(t))?,
        None => 0.0,
    };
    let w = match tokens.next() {
        Some(t) => parse_f64(path, line, Some(t))?,
        None => 0.0,
    };
    Ok(Vec3::new(u, v, w))
}

/// One `v`, `v/vt`, `v//vn` or `v/vt/vn` face corner. Indices are
/// 1-based in the file; zero marks "not given".
#[derive(Copy, Clone)]
struct FaceCorner {
    vertex: usize,
    texcoord: usize,
    normal: usize,
}

fn parse_corner(path: &Path, line: usize, token: &str) -> Result<FaceCorner, ParseError> {
    let mut parts = token.split('/');
    let vertex = parts
        .next()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ParseError::at(path, line, format!("bad face token \"{token}\"")))?;
    let vertex = vertex
        .parse::<usize>()
        .map_err(|_| ParseError::at(path, line, format!("bad face token \"{token}\"")))?;

    let parse_opt = |part: Option<&str>| -> Result<usize, ParseError> {
        match part {
            None => Ok(0),
            Some("") => Ok(0),
            Some(p) => p
                .parse::<usize>()
                .map_err(|_| ParseError::at(path, line, format!("bad face token \"{token}\""))),
        }
    };

    let texcoord = parse_opt(parts.next())?;
    let normal = parse_opt(parts.next())?;
    Ok(FaceCorner {
        vertex,
        texcoord,
        normal,
    })
}

#[allow(clippy::too_many_arguments)]
fn read_face<'a>(
    scene: &mut Scene,
    path: &Path,
    line: usize,
    tokens: impl Iterator<Item = &'a str>,
    vertices: &[Vec3],
    normals: &[Vec3],
    texcoords: &[Vec3],
    material: Option<Arc<Material>>,
) -> Result<(), ParseError> {
    let corners = tokens
        .map(|t| parse_corner(path, line, t))
        .collect::<Result<Vec<_>, _>>()?;

    if corners.len() != 3 && corners.len() != 4 {
        log::warn!(
            "{}:{}: unsupported face with {} vertices",
            path.display(),
            line,
            corners.len()
        );
        return Ok(());
    }

    // A quad becomes the fan (0, 1, 2), (2, 3, 0).
    let fans: &[[usize; 3]] = if corners.len() == 3 {
        &[[0, 1, 2]]
    } else {
        &[[0, 1, 2], [2, 3, 0]]
    };

    for fan in fans {
        let mut tri_vertices = [Vec3::ZERO; 3];
        let mut tri_normals = [Vec3::ZERO; 3];
        let mut tri_uvw = [Vec3::ZERO; 3];

        for (slot, &i) in fan.iter().enumerate() {
            let corner = corners[i];
            tri_vertices[slot] = *vertices.get(corner.vertex.wrapping_sub(1)).ok_or_else(|| {
                ParseError::at(path, line, format!("vertex index {} out of range", corner.vertex))
            })?;
            if corner.normal != 0 {
                tri_normals[slot] = *normals.get(corner.normal - 1).ok_or_else(|| {
                    ParseError::at(path, line, format!("normal index {} out of range", corner.normal))
                })?;
            }
            if corner.texcoord != 0 {
                tri_uvw[slot] = *texcoords.get(corner.texcoord - 1).ok_or_else(|| {
                    ParseError::at(
                        path,
                        line,
                        format!("texture index {} out of range", corner.texcoord),
                    )
                })?;
            }
        }

        let mut triangle = Triangle::new(tri_vertices)
            .with_normals(tri_normals)
            .with_uvw(tri_uvw)
            .with_source_line(line as u32);
        if let Some(ref mtl) = material {
            triangle = triangle.with_material(mtl.clone());
        }
        scene.tree.add_primitive(Box::new(triangle));
    }

    Ok(())
}
