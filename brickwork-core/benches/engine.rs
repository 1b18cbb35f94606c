use brickwork_core::{
    blocks::{Block, Color, DrawingBlock, PathItem},
    classify::{
        assign::{hungarian, CostMatrix},
        dedup::cluster_duplicates,
    },
    entities::BBox,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn random_drawings(rng: &mut StdRng, count: u32) -> Vec<Block> {
    (0..count)
        .map(|id| {
            let x0 = rng.gen_range(0.0..450.0);
            let y0 = rng.gen_range(0.0..650.0);
            let bbox = BBox::new(
                x0,
                y0,
                x0 + rng.gen_range(5.0..50.0),
                y0 + rng.gen_range(5.0..50.0),
            );
            Block::Drawing(DrawingBlock {
                id,
                bbox,
                draw_order: id,
                fill_color: Some(Color([rng.gen_range(0..4), 0, 0])),
                stroke_color: None,
                items: vec![PathItem::Rect { bbox }],
            })
        })
        .collect()
}

fn bench_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_duplicates");
    let mut rng = StdRng::seed_from_u64(7);
    for count in [100u32, 500, 2000] {
        let blocks = random_drawings(&mut rng, count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &blocks, |b, blocks| {
            b.iter(|| cluster_duplicates(black_box(blocks.iter()), 0.9))
        });
    }
    group.finish();
}

fn bench_hungarian(c: &mut Criterion) {
    let mut group = c.benchmark_group("hungarian");
    let mut rng = StdRng::seed_from_u64(42);
    for (rows, cols) in [(10, 10), (40, 30), (100, 100)] {
        let costs = CostMatrix::from_fn(rows, cols, |_, _| rng.gen_range(0.0..1000.0));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{rows}x{cols}")),
            &costs,
            |b, costs| b.iter(|| hungarian(black_box(costs))),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_dedup, bench_hungarian);
criterion_main!(benches);
