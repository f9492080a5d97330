use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use featsel_core::classifier::{Classifier, RandomForestClassifier};
use featsel_core::energy::{CostTable, EnergyEstimator, EnergyModel};
use featsel_core::selection::mutual_info::histogram_mutual_information;
use featsel_core::selection::pso::{crowding_sort, nondominated_sort, truncate};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const POPULATION_SIZES: &[usize] = &[50, 100, 200, 400];
const ROW_COUNTS: &[usize] = &[256, 1024, 4096];

const FEATURES: &[&str] = &[
    "tBodyAcc-mean()",
    "tBodyAcc-std()",
    "tBodyAcc-correlation()",
    "tBodyAcc-iqr()",
    "tBodyAcc-median()",
    "tBodyAcc-max()",
    "tBodyAccMagSq-mean()",
    "tBodyAccMagSq-min()",
    "tBodyAccJerk-energy()",
    "tBodyAccJerkMagSq-iqr()",
    "tBodyAccL1Norm-std()",
    "tBodyAccJerkL1Norm-entropy()",
];

fn population(n: usize, rng: &mut StdRng) -> Vec<[f64; 2]> {
    (0..n)
        .map(|_| [rng.gen_range(200..500) as f64, -rng.gen_range(0.0..40.0)])
        .collect()
}

fn benchmark_energy_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("energy_model");
    let model = EnergyModel::new(&CostTable::default());

    for size in [1, 4, FEATURES.len()] {
        let names = &FEATURES[..size];
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("calc", size), &names, |b, names| {
            b.iter(|| model.calc(black_box(names)));
        });
    }

    group.bench_function("calc_raw", |b| b.iter(|| black_box(model.calc_raw())));
    group.finish();
}

fn benchmark_pareto(c: &mut Criterion) {
    let mut group = c.benchmark_group("pareto");
    let mut rng = StdRng::seed_from_u64(42);

    for &n in POPULATION_SIZES {
        let points = population(n, &mut rng);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("nondominated_sort", n), &points, |b, points| {
            b.iter(|| nondominated_sort(black_box(points.clone())));
        });

        group.bench_with_input(BenchmarkId::new("crowding_sort", n), &points, |b, points| {
            let (front, _) = nondominated_sort(points.clone());
            b.iter(|| crowding_sort(black_box(front.clone())));
        });

        // Generation step: union of old and moved particles cut back to size
        let union: Vec<[f64; 2]> = points.iter().chain(population(n, &mut rng).iter()).copied().collect();
        group.bench_with_input(BenchmarkId::new("truncate", n), &union, |b, union| {
            b.iter(|| truncate(black_box(union.clone()), n));
        });
    }

    group.finish();
}

fn benchmark_mutual_information(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutual_information");
    let mut rng = StdRng::seed_from_u64(7);

    for &rows in ROW_COUNTS {
        let labels: Vec<f64> = (0..rows).map(|i| (i % 6) as f64).collect();
        let column = Array1::from_iter(labels.iter().map(|&l| l + rng.gen_range(-1.0..1.0)));
        group.throughput(Throughput::Elements(rows as u64));

        group.bench_with_input(BenchmarkId::new("histogram_256", rows), &rows, |b, _| {
            b.iter(|| histogram_mutual_information(black_box(column.view()), black_box(&labels), 256));
        });
    }

    group.finish();
}

fn benchmark_forest(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_forest");
    group.sample_size(10);
    let mut rng = StdRng::seed_from_u64(3);

    for &rows in &ROW_COUNTS[..2] {
        let y: Vec<usize> = (0..rows).map(|i| i % 3).collect();
        let x = Array2::from_shape_fn((rows, 8), |(i, j)| {
            if j == 0 {
                y[i] as f64 + rng.gen_range(-0.6..0.6)
            } else {
                rng.gen_range(0.0..1.0)
            }
        });

        for parallel in [false, true] {
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(format!("fit_{}", label), rows), &rows, |b, _| {
                b.iter(|| {
                    let mut forest = RandomForestClassifier::new(20)
                        .with_random_state(0)
                        .with_balanced_class_weight(true)
                        .with_parallel(parallel);
                    forest.fit(x.view(), &y).map(|_| forest)
                });
            });
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_energy_model,
    benchmark_pareto,
    benchmark_mutual_information,
    benchmark_forest,
);

criterion_main!(benches);
