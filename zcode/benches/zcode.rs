use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};
use zcode::{Builder, Iter, codec};

fn build_record(b: &mut Builder, ints: &[i64], strings: &[String]) {
    b.reset();
    for (i, s) in ints.iter().zip(strings) {
        b.append_primitive(Some(&codec::encode_int(*i)));
        b.begin_container();
        b.append_primitive(Some(s.as_bytes()));
        b.append_primitive(None);
        b.end_container();
    }
}

fn bench_zcode(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let ints: Vec<i64> = (0..64).map(|_| rng.random_range(-1_000_000..1_000_000)).collect();
    let strings: Vec<String> = (0..64)
        .map(|_| {
            let len = rng.random_range(1..24);
            (0..len).map(|_| rng.random_range(b'a'..=b'z') as char).collect()
        })
        .collect();

    let mut builder = Builder::with_capacity(4096);
    c.bench_function("builder_64_fields", |bench| {
        bench.iter(|| {
            build_record(&mut builder, black_box(&ints), black_box(&strings));
            black_box(builder.bytes().len())
        })
    });

    build_record(&mut builder, &ints, &strings);
    let bytes = builder.bytes().to_vec();
    c.bench_function("iter_64_fields", |bench| {
        bench.iter(|| {
            let mut total = 0usize;
            for item in Iter::new(black_box(&bytes)) {
                let item = item.unwrap();
                total += item.body.map_or(0, |b| b.len());
            }
            black_box(total)
        })
    });

    let mut set = Vec::new();
    for s in &strings {
        zcode::append(&mut set, Some(s.as_bytes()), false);
    }
    c.bench_function("normalize_set_64", |bench| {
        bench.iter(|| black_box(zcode::normalize_set(black_box(&set)).unwrap()))
    });
}

criterion_group!(benches, bench_zcode);
criterion_main!(benches);
