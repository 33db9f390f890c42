use criterion::{criterion_group, criterion_main, Criterion, black_box};

use terralod::core::{ChunkPos, DimensionId, IVec3, RegionPos};
use terralod::lod::{ColorSource, ColorStyle, ColumnVolume, LodBuilder, LodRecord};
use terralod::streaming::{RegionGrid, DimensionCache, encode_region, decode_region};
use terralod::voxel::Voxel;

struct Palette;

impl ColorSource for Palette {
    fn face_color(&self, voxel: Voxel, pos: IVec3) -> u32 {
        if voxel.is_air() {
            0
        } else {
            0x404040 + (((pos.y as u32) & 0x3f) << 16)
        }
    }
}

/// Rolling hills column, 8 sections tall
fn hills_column(pos: ChunkPos) -> ColumnVolume {
    let mut column = ColumnVolume::empty(pos, 8);
    for z in 0..16 {
        for x in 0..16 {
            let surface = 40 + ((x * 3 + z * 5) % 24);
            for y in 0..=surface {
                column.set(x, y, z, Voxel::solid(1 + (y % 3) as u16));
            }
        }
    }
    column
}

fn bench_build_top(c: &mut Criterion) {
    let column = hills_column(ChunkPos::new(3, -7));
    let builder = LodBuilder::default();

    c.bench_function("lod_build_top_colors", |b| {
        b.iter(|| builder.build(black_box(Some(&column)), Some(&Palette)));
    });
}

fn bench_build_individual_sides(c: &mut Criterion) {
    let column = hills_column(ChunkPos::new(3, -7));
    let builder = LodBuilder::new(16, ColorStyle::IndividualSides);

    c.bench_function("lod_build_individual_sides", |b| {
        b.iter(|| builder.build(black_box(Some(&column)), Some(&Palette)));
    });
}

fn bench_region_codec(c: &mut Criterion) {
    let builder = LodBuilder::default();
    let mut region = RegionGrid::new(RegionPos::new(0, 0), 5);
    for x in 0..5 {
        for z in 0..5 {
            let record = builder
                .build(Some(&hills_column(ChunkPos::new(x, z))), Some(&Palette))
                .unwrap();
            region.put(record).unwrap();
        }
    }
    let encoded = encode_region(&region);

    c.bench_function("region_encode_25", |b| {
        b.iter(|| encode_region(black_box(&region)));
    });

    c.bench_function("region_decode_25", |b| {
        b.iter(|| decode_region(RegionPos::new(0, 0), 5, black_box(&encoded)));
    });
}

fn bench_window_recenter(c: &mut Criterion) {
    c.bench_function("dimension_recenter_32", |b| {
        let mut cache = DimensionCache::new(DimensionId::OVERWORLD, 5, 32, None);
        for x in -40..40 {
            for z in -40..40 {
                let pos = ChunkPos::new(x, z);
                cache.insert(LodRecord::placeholder(pos)).unwrap();
            }
        }
        let mut step = 0i32;
        b.iter(|| {
            step += 1;
            let dx = if step % 2 == 0 { 1 } else { -1 };
            black_box(cache.shift(dx, 0));
        });
    });
}

criterion_group!(
    benches,
    bench_build_top,
    bench_build_individual_sides,
    bench_region_codec,
    bench_window_recenter,
);
criterion_main!(benches);
