//! Benchmarks for GeoJSON payload extraction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dify_client::extract_geo_payload;

fn bench_extraction(c: &mut Criterion) {
    let whole_json = r#"{"geom": {"type":"Point","coordinates":[116.4074,39.9042]}, "name":"x"}"#;

    let embedded = format!(
        "根据查询结果，该区域的位置如下: {} 其余说明文字在这里继续，{}",
        whole_json,
        "并且还有很多与几何无关的自然语言内容。".repeat(20)
    );

    let miss = "这段回答里没有任何几何数据，只有普通的文字说明。".repeat(50);

    c.bench_function("extract_whole_json", |b| {
        b.iter(|| extract_geo_payload(black_box(whole_json)))
    });

    c.bench_function("extract_embedded_in_prose", |b| {
        b.iter(|| extract_geo_payload(black_box(&embedded)))
    });

    c.bench_function("extract_miss", |b| {
        b.iter(|| extract_geo_payload(black_box(&miss)))
    });
}

criterion_group!(benches, bench_extraction);
criterion_main!(benches);
