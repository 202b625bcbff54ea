//! Wavefront MTL material library parsing.
//!
//! Recognized directives: `newmtl`, `Ka`, `Kd`, `Ks`, `Ns`, `Ni`, `Tr`,
//! `d` (dissolve, `Tr = 1 - d`), `Tf`, `Refl` (non-standard reflectance)
//! and `map_Ka` (texture path relative to the MTL file's directory).
//! Everything else is ignored.

use std::path::Path;
use std::sync::Arc;

use lumen_math::Vec3;

use crate::material::Material;
use crate::obj::ParseError;
use crate::scene::Scene;
use crate::texture::Texture;

/// Parse an MTL file and register its materials (and any textures they
/// reference) in the scene.
pub fn load_mtl(scene: &mut Scene, path: &Path) -> Result<(), ParseError> {
    log::info!("reading MTL file {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut current: Option<(String, Material)> = None;

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

        if directive == "newmtl" {
            finish_material(scene, current.take());
            let name = tokens.collect::<Vec<_>>().join(" ");
            if name.is_empty() {
                return Err(parse_error(path, line_no, "newmtl without a name"));
            }
            current = Some((name, Material::default()));
            continue;
        }

        // Everything else modifies the material being defined.
        let Some((_, material)) = current.as_mut() else {
            log::warn!(
                "{}:{}: \"{}\" before any newmtl",
                path.display(),
                line_no,
                directive
            );
            continue;
        };

        match directive {
            "Ka" => material.ambient = parse_color(path, line_no, &mut tokens)?,
            "Kd" => material.diffuse = parse_color(path, line_no, &mut tokens)?,
            "Ks" => material.specular = parse_color(path, line_no, &mut tokens)?,
            "Tf" => material.transmission_filter = parse_color(path, line_no, &mut tokens)?,
            "Ns" => material.specular_exp = parse_scalar(path, line_no, &mut tokens)?,
            "Ni" => material.refraction_index = parse_scalar(path, line_no, &mut tokens)?,
            "Tr" => material.transparency = parse_scalar(path, line_no, &mut tokens)?,
            // Dissolve is the complement of transparency.
            "d" => material.transparency = 1.0 - parse_scalar(path, line_no, &mut tokens)?,
            "Refl" => material.reflectance = parse_scalar(path, line_no, &mut tokens)?,
            "map_Ka" => {
                let name = tokens.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    return Err(parse_error(path, line_no, "map_Ka without a file name"));
                }
                match lookup_texture(scene, dir, &name) {
                    Some(texture) => material.texture = Some(texture),
                    None => log::warn!(
                        "{}:{}: texture \"{}\" could not be loaded, material stays untextured",
                        path.display(),
                        line_no,
                        name
                    ),
                }
            }
            _ => {}
        }
    }

    finish_material(scene, current.take());
    Ok(())
}

fn finish_material(scene: &mut Scene, material: Option<(String, Material)>) {
    if let Some((name, material)) = material {
        scene.materials.insert(name, Arc::new(material));
    }
}

/// Fetch a texture from the scene cache, loading it on first use.
fn lookup_texture(scene: &mut Scene, dir: &Path, name: &str) -> Option<Arc<Texture>> {
    if let Some(texture) = scene.textures.get(name) {
        return Some(texture.clone());
    }
    match Texture::load(&dir.join(name)) {
        Ok(texture) => {
            let texture = Arc::new(texture);
            scene.textures.insert(name.to_string(), texture.clone());
            Some(texture)
        }
        Err(err) => {
            log::warn!("{err}");
            None
        }
    }
}

fn parse_error(path: &Path, line: usize, message: &str) -> ParseError {
    ParseError::Parse {
        path: path.display().to_string(),
        line,
        message: message.to_string(),
    }
}

fn parse_scalar<'a>(
    path: &Path,
    line: usize,
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Result<f64, ParseError> {
    let token = tokens
        .next()
        .ok_or_else(|| parse_error(path, line, "missing value"))?;
    token
        .parse::<f64>()
        .map_err(|_| parse_error(path, line, &format!("bad number \"{token}\"")))
}

fn parse_color<'a>(
    path: &Path,
    line: usize,
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Result<Vec3, ParseError> {
    Ok(Vec3::new(
        parse_scalar(path, line, tokens)?,
        parse_scalar(path, line, tokens)?,
        parse_scalar(path, line, tokens)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_str(content: &str) -> Scene {
        let dir = std::env::temp_dir().join(format!(
            "lumen_mtl_test_{}_{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lib.mtl");
        std::fs::write(&path, content).unwrap();
        let mut scene = Scene::new();
        load_mtl(&mut scene, &path).unwrap();
        scene
    }

    #[test]
    fn test_material_fields() {
        let scene = load_str(
            "newmtl glass\n\
             Ka 0.1 0.2 0.3\n\
             Kd 0.4 0.5 0.6\n\
             Ks 1 1 1\n\
             Ns 96.0\n\
             Ni 1.5\n\
             Tr 0.75\n\
             Tf 1 1 0.5\n\
             Refl 0.25\n",
        );
        let mtl = scene.materials.get("glass").unwrap();
        assert_eq!(mtl.ambient, Vec3::new(0.1, 0.2, 0.3));
        assert_eq!(mtl.diffuse, Vec3::new(0.4, 0.5, 0.6));
        assert_eq!(mtl.specular, Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(mtl.specular_exp, 96.0);
        assert_eq!(mtl.refraction_index, 1.5);
        assert_eq!(mtl.transparency, 0.75);
        assert_eq!(mtl.transmission_filter, Vec3::new(1.0, 1.0, 0.5));
        assert_eq!(mtl.reflectance, 0.25);
        assert!(mtl.texture.is_none());
    }

    #[test]
    fn test_dissolve_is_complement_of_transparency() {
        let scene = load_str(
            "newmtl a\n\
             d 0.25\n",
        );
        let mtl = scene.materials.get("a").unwrap();
        assert!((mtl.transparency - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_multiple_materials() {
        let scene = load_str(
            "newmtl first\n\
             Kd 1 0 0\n\
             newmtl second\n\
             Kd 0 1 0\n\
             unknown_directive 1 2 3\n",
        );
        assert_eq!(scene.materials.len(), 2);
        assert_eq!(scene.materials.get("first").unwrap().diffuse, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(scene.materials.get("second").unwrap().diffuse, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_missing_texture_degrades_to_untextured() {
        let scene = load_str(
            "newmtl t\n\
             map_Ka does_not_exist.png\n",
        );
        assert!(scene.materials.get("t").unwrap().texture.is_none());
    }

    #[test]
    fn test_bad_number_is_an_error() {
        let dir = std::env::temp_dir().join(format!("lumen_mtl_err_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.mtl");
        std::fs::write(&path, "newmtl a\nKa 1 x 0\n").unwrap();
        let mut scene = Scene::new();
        assert!(load_mtl(&mut scene, &path).is_err());
    }
}
