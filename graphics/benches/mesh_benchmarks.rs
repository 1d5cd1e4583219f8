//! Benchmarks for the incremental geometry path.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use larkspur_graphics::device::GraphicsDevice;
use larkspur_graphics::mesh::{Mesh, PrimitiveTopology};

/// Grid of (n+1)^2 vertices and 2*n^2 triangles.
fn grid(n: u32) -> (Vec<f32>, Vec<u32>) {
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    for y in 0..=n {
        for x in 0..=n {
            positions.extend_from_slice(&[x as f32, y as f32, 0.0]);
        }
    }
    let stride = n + 1;
    for y in 0..n {
        for x in 0..n {
            let i = y * stride + x;
            indices.extend_from_slice(&[i, i + 1, i + stride]);
            indices.extend_from_slice(&[i + 1, i + stride + 1, i + stride]);
        }
    }
    (positions, indices)
}

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("mesh_commit");
    for n in [16u32, 64, 128] {
        let (positions, indices) = grid(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            let device = GraphicsDevice::new("bench");
            let mut mesh = Mesh::new(device);
            b.iter(|| {
                mesh.set_positions(&positions);
                mesh.set_indices(&indices);
                mesh.update(PrimitiveTopology::TriangleList, true);
            });
        });
    }
    group.finish();
}

fn bench_wireframe(c: &mut Criterion) {
    let mut group = c.benchmark_group("mesh_wireframe");
    for n in [16u32, 64, 128] {
        let (positions, indices) = grid(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            let device = GraphicsDevice::new("bench");
            let mut mesh = Mesh::new(device);
            mesh.set_positions(&positions);
            mesh.set_indices(&indices);
            mesh.update(PrimitiveTopology::TriangleList, true);
            b.iter(|| mesh.generate_wireframe());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_commit, bench_wireframe);
criterion_main!(benches);
