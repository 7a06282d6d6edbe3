use criterion::{black_box, criterion_group, criterion_main, Criterion};
use marker_cloud::emulator::{SyntheticScene, VirtualDeviceSpec};
use marker_cloud::genicam::{Component, PixelFormat};
use marker_cloud::pointcloud::{AssemblyOptions, PointCloud};
use marker_cloud::transform::Transform;

fn assembly_benchmark(c: &mut Criterion) {
    let scene = SyntheticScene {
        width: 2064,
        height: 1544,
        intensity_format: PixelFormat::Mono12,
    };
    let range = Component::coord3d(scene.range());
    let intensity = Component::mono(PixelFormat::Mono12, scene.intensity());
    let transform = Transform::from_matrix4(&VirtualDeviceSpec::default().marker_matrix());

    c.bench_function("point cloud assembly", |b| {
        b.iter(|| {
            PointCloud::from_components(
                black_box(&range),
                black_box(&intensity),
                &AssemblyOptions::default(),
            )
        })
    });

    let skip_invalid = AssemblyOptions {
        skip_invalid_points: true,
        ..Default::default()
    };
    c.bench_function("point cloud assembly, skip invalid", |b| {
        b.iter(|| PointCloud::from_components(black_box(&range), black_box(&intensity), &skip_invalid))
    });

    c.bench_function("marker space transform", |b| {
        let cloud =
            PointCloud::from_components(&range, &intensity, &AssemblyOptions::default()).unwrap();
        b.iter(|| &transform * black_box(&cloud));
    });
}

criterion_group!(benches, assembly_benchmark);
criterion_main!(benches);
