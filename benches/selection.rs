use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gmosrs::query::select;
use gmosrs::{compile, Category, Field, FieldType, FrameRecord, InMemoryStore, PipelineConfig, Value};

const OBJECTS: [&str; 4] = ["AM2306-721_a", "AM2306-72_b", "AM2306-721_c", "LTT9239"];

/// Synthetic obslog cycling through observation types, regions and dates.
fn observing_log(size: usize) -> InMemoryStore {
    let types = ["BIAS", "FLAT", "ARC", "OBJECT"];
    let dates = ["2007-06-10", "2007-06-23", "2007-08-01"];

    InMemoryStore::from_records((0..size).map(|i| {
        FrameRecord::new(format!("S20070623S{:05}", i))
            .with(Field::UseMe, Value::Flag(i % 17 != 0))
            .with(Field::Instrument, Value::text("GMOS-S"))
            .with(Field::ObsType, Value::text(types[i % types.len()]))
            .with(Field::ObsClass, Value::text(if i % 3 == 0 { "partnerCal" } else { "science" }))
            .with(Field::CcdBin, Value::text("2 4"))
            .with(Field::RoI, Value::text(if i % 5 == 0 { "CentSp" } else { "Full" }))
            .with(Field::Disperser, Value::text("B600+_G5323"))
            .with(Field::CentWave, Value::Real(485.0))
            .with(Field::AperMask, Value::text("1.0arcsec"))
            .with(Field::Object, Value::text(OBJECTS[i % OBJECTS.len()]))
            .with(
                Field::DateObs,
                Value::parse_as(FieldType::Date, dates[i % dates.len()]).unwrap(),
            )
    }))
}

fn bench_compile(c: &mut Criterion) {
    let regions = PipelineConfig::default().regions().unwrap();
    let full = regions.get("Full").unwrap().clone();

    c.bench_function("compile sciSpec", |b| {
        b.iter(|| compile(black_box(Category::SciSpec), black_box(&full)).unwrap())
    });
}

fn bench_select(c: &mut Criterion) {
    let regions = PipelineConfig::default().regions().unwrap();
    let full = regions.get("Full").unwrap().clone();
    let mut group = c.benchmark_group("select");

    for size in [1_000, 10_000, 100_000] {
        let store = observing_log(size);
        group.throughput(Throughput::Elements(size as u64));

        for category in [Category::Bias, Category::SciSpec] {
            let query = compile(category, &full).unwrap();
            group.bench_with_input(BenchmarkId::new(category.name(), size), &query, |b, q| {
                b.iter(|| select(&store, black_box(q)).unwrap())
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_select);
criterion_main!(benches);
