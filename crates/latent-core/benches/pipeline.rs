//! Benchmarks for the Latent pipeline's CPU stages.
//!
//! Run with: cargo bench -p latent-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use latent_core::config::LimitsConfig;
use latent_core::math::l2_normalize;
use latent_core::reduce::{stack_rows, DimensionalityReducer, Pca, Tsne};
use latent_core::tagging::{LabelBank, Tagger, Vocabulary};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DIM: usize = 512;

fn random_unit_vectors(count: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let raw: Vec<f32> = (0..DIM).map(|_| rng.gen::<f32>() - 0.5).collect();
            l2_normalize(&raw).unwrap()
        })
        .collect()
}

fn benchmark_tsne(c: &mut Criterion) {
    let data = stack_rows(&random_unit_vectors(200, 1)).unwrap();
    let tsne = Tsne::new(30.0, 250, 200.0, 12.0, 42);

    let mut group = c.benchmark_group("tsne");
    group.sample_size(10);
    group.bench_function("tsne_200x512_250iter", |b| {
        b.iter(|| tsne.reduce(black_box(data.view())).unwrap())
    });
    group.finish();
}

fn benchmark_pca(c: &mut Criterion) {
    let data = stack_rows(&random_unit_vectors(500, 2)).unwrap();
    let pca = Pca::new(3, 42);

    c.bench_function("pca_500x512_3d", |b| {
        b.iter(|| pca.reduce(black_box(data.view())).unwrap())
    });
}

fn benchmark_tagger(c: &mut Criterion) {
    let labels: Vec<String> = (0..1000).map(|i| format!("label-{i}")).collect();
    let vocabulary = Vocabulary::from_labels(&labels);
    let bank = LabelBank::from_rows(random_unit_vectors(labels.len(), 3)).unwrap();
    let tagger = Tagger::new(vocabulary, bank, 5).unwrap();
    let image = random_unit_vectors(1, 4).remove(0);

    c.bench_function("tag_1000_labels_top5", |b| {
        b.iter(|| tagger.tag(black_box(&image)).unwrap())
    });
}

fn benchmark_decode(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.png");
    RgbImage::from_fn(1024, 768, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
        .save(&path)
        .unwrap();

    let decoder = latent_core::pipeline::ImageDecoder::new(LimitsConfig::default());
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("decode_png_1024x768", |b| {
        b.iter(|| rt.block_on(decoder.decode(black_box(&path))).unwrap())
    });
}

criterion_group!(
    benches,
    benchmark_tsne,
    benchmark_pca,
    benchmark_tagger,
    benchmark_decode,
);
criterion_main!(benches);
