use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use echoprobe::handler::render_echo;
use http::Request;

fn bench_render_echo(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_echo");

    let (parts, ()) = Request::post("/?first=value&second=a&second=b")
        .header("content-type", "application/json")
        .header("user-agent", "bench/1.0")
        .header("accept", "*/*")
        .body(())
        .unwrap()
        .into_parts();

    // Test different body sizes
    for size in [0usize, 64, 1024, 16384] {
        let body = Bytes::from(vec![b'x'; size]);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("body", size), &body, |b, body| {
            b.iter(|| render_echo(black_box(&parts), Ok(body.clone())))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_render_echo);
criterion_main!(benches);
