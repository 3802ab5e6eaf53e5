use crate::common::Mesh;
use anyhow::Context;
use std::io::Write;

/// Loads a wavefront OBJ file into a single `Mesh`, merging all objects
/// it contains. Polygons are already triangulated by the parser; point
/// and line primitives are ignored. Per-vertex normals are recomputed
/// from the triangulation rather than taken from the file, since OBJ
/// normals are indexed per corner and may not cover every vertex.
pub fn load_obj(log: &slog::Logger, path: &str) -> anyhow::Result<Mesh> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("could not read {}", path))?;
    let obj_set = wavefront_obj::obj::parse(contents)
        .map_err(|err| anyhow::anyhow!("could not parse {}: {}", path, err))?;

    let mut indices = Vec::new();
    let mut pos = Vec::new();
    for object in &obj_set.objects {
        let base = pos.len() as u32;
        for v in &object.vertices {
            pos.push(na::Point3::new(v.x as f32, v.y as f32, v.z as f32));
        }

        for geometry in &object.geometry {
            for shape in &geometry.shapes {
                if let wavefront_obj::obj::Primitive::Triangle(v0, v1, v2) = shape.primitive {
                    indices.push(base + v0.0 as u32);
                    indices.push(base + v1.0 as u32);
                    indices.push(base + v2.0 as u32);
                }
            }
        }
    }

    let mut mesh = Mesh::new(indices, pos, vec![]);
    mesh.recompute_normals();
    debug!(
        log,
        "loaded {}: {} vertices, {} triangles",
        path,
        mesh.pos.len(),
        mesh.triangle_count()
    );

    Ok(mesh)
}

/// Writes positions and a triangle list as a minimal OBJ file.
pub fn write_obj(path: &str, pos: &[na::Point3<f32>], indices: &[u32]) -> anyhow::Result<()> {
    let file =
        std::fs::File::create(path).with_context(|| format!("could not create {}", path))?;
    let mut writer = std::io::BufWriter::new(file);

    for p in pos {
        writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
    }
    // OBJ indices are 1-based
    for tri in indices.chunks_exact(3) {
        writeln!(writer, "f {} {} {}", tri[0] + 1, tri[1] + 1, tri[2] + 1)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obj_round_trip() {
        let dir = std::env::temp_dir();
        let path = dir.join("meshwrap_importer_test.obj");
        let path = path.to_str().unwrap();

        let pos = vec![
            na::Point3::origin(),
            na::Point3::new(1.0, 0.0, 0.0),
            na::Point3::new(0.0, 1.0, 0.0),
            na::Point3::new(0.0, 0.0, 1.0),
        ];
        let indices = vec![0, 1, 2, 0, 3, 1, 0, 2, 3, 1, 3, 2];
        write_obj(path, &pos, &indices).unwrap();

        let log = slog::Logger::root(slog::Discard, o!());
        let mesh = load_obj(&log, path).unwrap();

        assert_eq!(mesh.pos.len(), 4);
        assert_eq!(mesh.triangle_count(), 4);
        assert_eq!(mesh.normal.len(), 4);
        for (read, expected) in mesh.pos.iter().zip(pos.iter()) {
            approx::assert_relative_eq!(read, expected, epsilon = 0.000_001);
        }
    }
}
