use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use glam::DVec3;
use isomesh::{AxisBox, MarchingCubes, Simplifier, TriMesh};
use std::hint::black_box;

fn sphere(p: DVec3) -> f64 {
    p.length() - 1.0
}

/// Sum of two overlapping spheres, which gives a surface with a saddle.
fn blobs(p: DVec3) -> f64 {
    let a = (p - DVec3::new(-0.5, 0.0, 0.0)).length_squared();
    let b = (p - DVec3::new(0.6, 0.1, 0.0)).length_squared();
    0.5 - (-2.0 * a).exp() - (-2.0 * b).exp()
}

fn sphere_mesh(cell_size: f64) -> TriMesh {
    MarchingCubes::new(AxisBox::cube(DVec3::ZERO, 1.5), cell_size)
        .generate(&sphere)
        .mesh
}

// Marching Cubes Benchmarks
fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");
    let bounds = AxisBox::cube(DVec3::ZERO, 1.5);

    for cell_size in [0.05, 0.02] {
        group.bench_function(format!("sphere_sequential_{cell_size}"), |b| {
            let mc = MarchingCubes::new(bounds, cell_size).with_parallel(false);
            b.iter(|| black_box(mc.generate(black_box(&sphere))));
        });

        group.bench_function(format!("sphere_parallel_{cell_size}"), |b| {
            let mc = MarchingCubes::new(bounds, cell_size).with_parallel(true);
            b.iter(|| black_box(mc.generate(black_box(&sphere))));
        });
    }

    // Continuation only visits the cells near the surface.
    group.bench_function("sphere_continuation_0.02", |b| {
        let mc = MarchingCubes::new(bounds, 0.02).with_parallel(false);
        let seeds = [DVec3::new(1.0, 0.0, 0.0)];
        b.iter(|| black_box(mc.generate_continuation(black_box(&sphere), &seeds)));
    });

    group.bench_function("blobs_parallel_0.02", |b| {
        let mc = MarchingCubes::new(bounds, 0.02).with_parallel(true);
        b.iter(|| black_box(mc.generate(black_box(&blobs))));
    });

    group.finish();
}

// Simplification Benchmarks
fn bench_simplification(c: &mut Criterion) {
    let mut group = c.benchmark_group("simplification");
    let dense = sphere_mesh(0.02);
    let target = dense.num_triangles() / 10;

    group.bench_function("sphere_quadric_10_percent", |b| {
        b.iter_batched(
            || Simplifier::new(&dense).expect("Cannot create simplifier"),
            |mut simplifier| black_box(simplifier.simplify_to_triangle_count(target)),
            BatchSize::LargeInput,
        );
    });

    group.bench_function("sphere_fast_pass", |b| {
        b.iter_batched(
            || Simplifier::new(&dense).expect("Cannot create simplifier"),
            |mut simplifier| black_box(simplifier.fast_collapse_pass(0.03, 4)),
            BatchSize::LargeInput,
        );
    });

    group.bench_function("sphere_setup", |b| {
        b.iter(|| black_box(Simplifier::new(black_box(&dense)).expect("Cannot create simplifier")));
    });

    group.finish();
}

criterion_group!(benches, bench_extraction, bench_simplification);
criterion_main!(benches);
