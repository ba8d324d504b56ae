use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use keepalived_conf::{Validator, parse_str};
use std::fmt::Write;
use std::hint::black_box;

/// Build a configuration with `instances` VRRP instances and one virtual server per VIP.
fn generate_config(instances: usize) -> String {
    let mut out = String::new();
    for i in 0..instances {
        let (a, b) = (i / 250, i % 250 + 1);
        writeln!(out, "vrrp_instance VI_{i} {{").unwrap();
        writeln!(out, "    state BACKUP  # generated").unwrap();
        writeln!(out, "    virtual_router_id {}", i % 255 + 1).unwrap();
        writeln!(out, "    priority {}", 50 + i % 100).unwrap();
        writeln!(out, "    virtual_ipaddress {{").unwrap();
        writeln!(out, "        10.{a}.{b}.1/32 dev eth0").unwrap();
        writeln!(out, "    }}").unwrap();
        writeln!(out, "}}").unwrap();
        writeln!(out, "virtual_server 10.{a}.{b}.1 80 {{").unwrap();
        writeln!(out, "    protocol TCP").unwrap();
        writeln!(out, "    real_server 192.168.0.{b} 80 {{").unwrap();
        writeln!(out, "        weight 1").unwrap();
        writeln!(out, "    }}").unwrap();
        writeln!(out, "}}").unwrap();
    }
    out
}

fn parse_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for instances in [10, 100, 1000] {
        let config = generate_config(instances);
        group.bench_with_input(BenchmarkId::from_parameter(instances), &config, |b, config| {
            b.iter(|| black_box(parse_str(config, "bench.conf")))
        });
    }

    group.finish();
}

fn validate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");

    for instances in [10, 100, 1000] {
        let parsed = parse_str(&generate_config(instances), "bench.conf");
        group.bench_with_input(BenchmarkId::from_parameter(instances), &parsed, |b, parsed| {
            b.iter(|| black_box(Validator::new(parsed).run()))
        });
    }

    group.finish();
}

criterion_group!(benches, parse_benchmark, validate_benchmark);
criterion_main!(benches);
