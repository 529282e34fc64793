//! File export for the simulated host.
//!
//! STEP output is a minimal exchange-file skeleton listing each body's
//! bounding box; STL output is an ASCII mesh of those boxes.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::host::{BoundingBox, ExportFormat, HostError, HostResult};

use super::model::Model;

/// Writes `model` to `dir` and returns the written path.
pub fn write(dir: &Path, format: ExportFormat, name: &str, model: &Model) -> HostResult<PathBuf> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(HostError::invalid(
            "name",
            format!("'{name}' is not a usable file name"),
        ));
    }
    if model.bodies.is_empty() {
        return Err(HostError::feature(
            "Export",
            "the design has no bodies to export",
        ));
    }

    let ext = format.extension();
    let file_name = if name
        .to_ascii_lowercase()
        .ends_with(&format!(".{ext}"))
    {
        name.to_string()
    } else {
        format!("{name}.{ext}")
    };
    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name.as_str(), |(stem, _)| stem)
        .to_string();

    fs::create_dir_all(dir).map_err(|source| HostError::Export {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(&file_name);
    let content = match format {
        ExportFormat::Step => step(&file_name, model),
        ExportFormat::Stl => stl(&stem, model),
    };
    fs::write(&path, content).map_err(|source| HostError::Export {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), "Exported design");
    Ok(path)
}

fn step(file_name: &str, model: &Model) -> String {
    let mut out = String::new();
    out.push_str("ISO-10303-21;\nHEADER;\n");
    out.push_str("FILE_DESCRIPTION(('cad-bridge simulated design'),'2;1');\n");
    let _ = writeln!(out, "FILE_NAME('{file_name}','',(''),(''),'','','');");
    out.push_str("FILE_SCHEMA(('AUTOMOTIVE_DESIGN'));\nENDSEC;\nDATA;\n");
    let mut id = 1;
    for body in &model.bodies {
        let b = &body.bounds;
        let _ = writeln!(
            out,
            "#{id}=CARTESIAN_POINT('{} min',({:.6},{:.6},{:.6}));",
            body.name, b.min[0], b.min[1], b.min[2]
        );
        let _ = writeln!(
            out,
            "#{}=CARTESIAN_POINT('{} max',({:.6},{:.6},{:.6}));",
            id + 1,
            body.name,
            b.max[0],
            b.max[1],
            b.max[2]
        );
        let _ = writeln!(
            out,
            "#{}=MANIFOLD_SOLID_BREP('{}',#{id},#{});",
            id + 2,
            body.name,
            id + 1
        );
        id += 3;
    }
    out.push_str("ENDSEC;\nEND-ISO-10303-21;\n");
    out
}

fn stl(stem: &str, model: &Model) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "solid {stem}");
    for body in &model.bodies {
        box_facets(&mut out, &body.bounds);
    }
    let _ = writeln!(out, "endsolid {stem}");
    out
}

fn box_facets(out: &mut String, b: &BoundingBox) {
    for k in 0..3 {
        let (i, j) = ((k + 1) % 3, (k + 2) % 3);
        for (sign, level) in [(-1.0, b.min[k]), (1.0, b.max[k])] {
            let corner = |a: f64, c: f64| {
                let mut p = [0.0; 3];
                p[k] = level;
                p[i] = a;
                p[j] = c;
                p
            };
            let quad = [
                corner(b.min[i], b.min[j]),
                corner(b.max[i], b.min[j]),
                corner(b.max[i], b.max[j]),
                corner(b.min[i], b.max[j]),
            ];
            let mut normal = [0.0; 3];
            normal[k] = sign;
            for tri in [[quad[0], quad[1], quad[2]], [quad[0], quad[2], quad[3]]] {
                let _ = writeln!(
                    out,
                    "  facet normal {} {} {}\n    outer loop",
                    normal[0], normal[1], normal[2]
                );
                for v in tri {
                    let _ = writeln!(out, "      vertex {:.6} {:.6} {:.6}", v[0], v[1], v[2]);
                }
                out.push_str("    endloop\n  endfacet\n");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::sim::model::{AxisDir, Shape};
    use tempfile::TempDir;

    fn one_body() -> Model {
        let mut model = Model::default();
        model.push_body(
            BoundingBox {
                min: [0.0; 3],
                max: [1.0; 3],
            },
            1.0,
            Shape::Block {
                axis: AxisDir::new(2, 1.0),
            },
            12,
        );
        model
    }

    #[test]
    fn stl_has_twelve_facets_per_body() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), ExportFormat::Stl, "part", &one_body()).unwrap();
        assert_eq!(path.file_name().unwrap(), "part.stl");
        let text = fs::read_to_string(path).unwrap();
        assert!(text.starts_with("solid part"));
        assert_eq!(text.matches("facet normal").count(), 12);
    }

    #[test]
    fn step_keeps_given_extension() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), ExportFormat::Step, "part.STEP", &one_body()).unwrap();
        assert_eq!(path.file_name().unwrap(), "part.STEP");
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("MANIFOLD_SOLID_BREP('Body1'"));
    }

    #[test]
    fn rejects_bad_names_and_empty_designs() {
        let dir = TempDir::new().unwrap();
        assert!(write(dir.path(), ExportFormat::Stl, "../x", &one_body()).is_err());
        assert!(write(dir.path(), ExportFormat::Stl, " ", &one_body()).is_err());
        assert!(write(dir.path(), ExportFormat::Stl, "x", &Model::default()).is_err());
    }
}
