//! Benchmarks for the CPU-bound pipeline steps.
//!
//! Run with: cargo bench
//!
//! Measures format detection, domain extraction, whitelist matching and
//! cross-category dedup on synthetic lists.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rulebundle::combiner::{combine_rules, CategoryRules};
use rulebundle::whitelist::filter_rules;
use rulebundle::{detect_format, extract_domains, SourceFormat, Whitelist};

/// Generate a hosts file with `count` entries.
fn generate_hosts(count: usize) -> String {
    let mut out = String::from("# synthetic hosts\n127.0.0.1 localhost\n");
    for i in 0..count {
        out.push_str(&format!("0.0.0.0 tracker{}.example{}.com\n", i, i % 100));
    }
    out
}

/// Generate an adblock list with `count` rules.
fn generate_adblock(count: usize) -> String {
    let mut out = String::from("! Title: synthetic\n");
    for i in 0..count {
        if i % 10 == 0 {
            out.push_str(&format!("||ads{}.example{}.net^$third-party\n", i, i % 100));
        } else {
            out.push_str(&format!("||ads{}.example{}.net^\n", i, i % 100));
        }
    }
    out
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_domains");

    for size in [1_000, 10_000, 100_000] {
        let hosts = generate_hosts(size);
        let adblock = generate_adblock(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("hosts", size), &hosts, |b, content| {
            b.iter(|| extract_domains(black_box(content), SourceFormat::Hosts))
        });
        group.bench_with_input(BenchmarkId::new("adblock", size), &adblock, |b, content| {
            b.iter(|| extract_domains(black_box(content), SourceFormat::Adblock))
        });
    }

    group.finish();
}

fn bench_detect(c: &mut Criterion) {
    let hosts = generate_hosts(10_000);
    let adblock = generate_adblock(10_000);

    let mut group = c.benchmark_group("detect_format");
    group.bench_function("hosts", |b| b.iter(|| detect_format(black_box(&hosts), 4096)));
    group.bench_function("adblock", |b| b.iter(|| detect_format(black_box(&adblock), 4096)));
    group.finish();
}

fn bench_whitelist(c: &mut Criterion) {
    let mut whitelist = Whitelist::new();
    for i in 0..1_000 {
        whitelist.add(&format!("example{}.com", i));
    }

    // Half of the generated domains fall under a whitelisted parent
    let mut blacklist = String::from("! header\n!\n");
    for i in 0..20_000 {
        blacklist.push_str(&format!("||a{}.b.example{}.{}^\n", i, i % 2_000, if i % 2 == 0 { "com" } else { "org" }));
    }

    let mut group = c.benchmark_group("whitelist");
    group.throughput(Throughput::Elements(20_000));
    group.bench_function("filter_rules", |b| {
        b.iter(|| filter_rules(black_box(&blacklist), &whitelist))
    });
    group.bench_function("single_lookup_miss", |b| {
        b.iter(|| whitelist.matches(black_box("deep.sub.domain.unlisted.org")))
    });
    group.finish();
}

fn bench_combine(c: &mut Criterion) {
    let lists: Vec<CategoryRules> = ["ads", "malware", "adult"]
        .iter()
        .enumerate()
        .map(|(n, category)| CategoryRules {
            category: category.to_string(),
            rules: Some(
                (0..50_000)
                    .map(|i| format!("||d{}.example.com^", i + n * 25_000))
                    .collect(),
            ),
        })
        .collect();

    let mut group = c.benchmark_group("combine");
    group.throughput(Throughput::Elements(150_000));
    group.bench_function("three_categories", |b| b.iter(|| combine_rules(black_box(&lists))));
    group.finish();
}

criterion_group!(benches, bench_extract, bench_detect, bench_whitelist, bench_combine);
criterion_main!(benches);
