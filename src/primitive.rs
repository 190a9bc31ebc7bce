use glam::DVec3;

use crate::{error::Error, mesh::TriMesh};

/// Platonic solids.
impl TriMesh {
    /// Create a tetrahedron centered at the origin, with the given
    /// circumradius. The vertices of the mesh will lie on the sphere.
    pub fn tetrahedron(radius: f64) -> Result<Self, Error> {
        let a = radius * (1.0f64 / 3.0);
        let b = radius * (8.0 / 9.0f64).sqrt();
        let c = radius * (2.0 / 9.0f64).sqrt();
        let d = radius * (2.0 / 3.0f64).sqrt();
        Self::from_buffers(
            vec![
                DVec3::new(0.0, 0.0, radius),
                DVec3::new(-c, d, -a),
                DVec3::new(-c, -d, -a),
                DVec3::new(b, 0.0, -a),
            ],
            vec![[0, 1, 2], [0, 2, 3], [0, 3, 1], [3, 2, 1]],
        )
    }

    /// Create an octahedron centered at the origin, with the given
    /// circumradius. The vertices of the mesh will lie on the sphere.
    pub fn octahedron(radius: f64) -> Result<Self, Error> {
        Self::from_buffers(
            vec![
                DVec3::new(radius, 0.0, 0.0),
                DVec3::new(0.0, radius, 0.0),
                DVec3::new(-radius, 0.0, 0.0),
                DVec3::new(0.0, -radius, 0.0),
                DVec3::new(0.0, 0.0, radius),
                DVec3::new(0.0, 0.0, -radius),
            ],
            vec![
                [0, 4, 3],
                [1, 4, 0],
                [2, 4, 1],
                [3, 4, 2],
                [3, 5, 0],
                [0, 5, 1],
                [1, 5, 2],
                [2, 5, 3],
            ],
        )
    }

    /// Create an icosahedron centered at the origin, with the given
    /// circumradius. The vertices of the mesh will lie on the sphere.
    pub fn icosahedron(radius: f64) -> Result<Self, Error> {
        const A: f64 = 0.5257311121191336;
        const B: f64 = 0.8506508083520399;
        const POS: [[f64; 3]; 12] = [
            [0.0, A, -B],
            [A, B, 0.0],
            [-A, B, 0.0],
            [0.0, A, B],
            [0.0, -A, B],
            [-B, 0.0, A],
            [0.0, -A, -B],
            [B, 0.0, -A],
            [B, 0.0, A],
            [-B, 0.0, -A],
            [A, -B, 0.0],
            [-A, -B, 0.0],
        ];
        Self::from_buffers(
            POS.iter().map(|&p| DVec3::from(p) * radius).collect(),
            vec![
                [2, 1, 0],
                [1, 2, 3],
                [5, 4, 3],
                [4, 8, 3],
                [7, 6, 0],
                [6, 9, 0],
                [11, 10, 4],
                [10, 11, 6],
                [9, 5, 2],
                [5, 9, 11],
                [8, 7, 1],
                [7, 8, 10],
                [2, 5, 3],
                [8, 1, 3],
                [9, 2, 0],
                [1, 7, 0],
                [11, 9, 6],
                [7, 10, 6],
                [5, 11, 4],
                [10, 8, 4],
            ],
        )
    }
}

impl TriMesh {
    /// Create a flat rectangular grid in the plane `z = min.z`, spanning from
    /// `min` to `max` in X and Y, with `nx` by `ny` quads each split into two
    /// triangles. The triangles face +Z.
    pub fn plane_grid(min: DVec3, max: DVec3, nx: u32, ny: u32) -> Result<Self, Error> {
        let (nx, ny) = (nx.max(1), ny.max(1));
        let step = (max - min) / DVec3::new(nx as f64, ny as f64, 1.0);
        let mut positions = Vec::with_capacity(((nx + 1) * (ny + 1)) as usize);
        for j in 0..=ny {
            for i in 0..=nx {
                positions.push(DVec3::new(
                    min.x + step.x * i as f64,
                    min.y + step.y * j as f64,
                    min.z,
                ));
            }
        }
        let vi = |i: u32, j: u32| i + (nx + 1) * j;
        let mut triangles = Vec::with_capacity((2 * nx * ny) as usize);
        for j in 0..ny {
            for i in 0..nx {
                let (v00, v10, v11, v01) = (vi(i, j), vi(i + 1, j), vi(i + 1, j + 1), vi(i, j + 1));
                triangles.push([v00, v10, v11]);
                triangles.push([v00, v11, v01]);
            }
        }
        Self::from_buffers(positions, triangles)
    }
}
