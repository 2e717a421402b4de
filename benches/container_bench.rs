#![allow(clippy::uninlined_format_args)]
//! 服务容器性能基准测试

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use service_container::{Arguments, Container, Factory, FactoryRegistry, Service};

/// 测试用的简单服务
struct SimpleService {
    value: i64,
}

impl Service for SimpleService {}

fn simple_factory() -> Factory {
    Factory::new(|args: &Arguments| {
        Ok(SimpleService {
            value: args.i64(0).unwrap_or_default(),
        })
    })
}

/// 构造一条长度为 `depth` 的依赖链：svc_0 <- svc_1 <- ... <- svc_{depth-1}
fn chain_container(depth: usize) -> Container {
    let mut container = Container::new();
    container
        .register("svc_0", simple_factory())
        .unwrap()
        .add_argument(0)
        .unwrap();
    for i in 1..depth {
        container
            .register(&format!("svc_{}", i), simple_factory())
            .unwrap()
            .add_argument(format!("@svc_{}", i - 1))
            .unwrap();
    }
    container
}

/// 基准测试：首次解析（包含编译和整条依赖链的构造）
fn bench_cold_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("cold_resolution");

    for depth in [1, 10, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, &depth| {
            b.iter_with_setup(
                || chain_container(depth),
                |mut container| {
                    let id = format!("svc_{}", depth - 1);
                    black_box(container.get(&id).unwrap())
                },
            );
        });
    }

    group.finish();
}

/// 基准测试：缓存命中
fn bench_cached_resolution(c: &mut Criterion) {
    let mut container = chain_container(10);
    container.get("svc_9").unwrap();

    c.bench_function("cached_resolution", |b| {
        b.iter(|| black_box(container.get("svc_9").unwrap()))
    });
}

/// 基准测试：参数解析
fn bench_parameter_resolution(c: &mut Criterion) {
    let mut container = Container::new();
    container.set_parameter("value", 42).unwrap();
    let spec = json!("%value%");

    c.bench_function("parameter_resolution", |b| {
        b.iter(|| black_box(container.resolve_parameter(black_box(&spec)).unwrap()))
    });
}

/// 基准测试：按点分路径查找工厂
fn bench_registry_lookup(c: &mut Criterion) {
    let mut registry = FactoryRegistry::new();
    for i in 0..100 {
        registry
            .insert(&format!("App.Module{}.Service", i), simple_factory())
            .unwrap();
    }

    c.bench_function("registry_lookup", |b| {
        b.iter(|| black_box(registry.resolve(black_box("App.Module50.Service")).unwrap()))
    });
}

/// 基准测试：标签查询
fn bench_tagged_lookup(c: &mut Criterion) {
    let mut container = Container::new();
    for i in 0..1000 {
        let definition = container
            .register(&format!("svc_{}", i), simple_factory())
            .unwrap();
        if i % 10 == 0 {
            definition.add_tag("listener", json!({ "priority": i })).unwrap();
        }
    }

    c.bench_function("find_tagged_service_ids", |b| {
        b.iter(|| black_box(container.find_tagged_service_ids("listener")))
    });
}

fn check_value(container: &mut Container) -> i64 {
    container
        .get_as::<SimpleService>("svc_0")
        .map(|service| service.value)
        .unwrap_or_default()
}

/// 基准测试：带类型转换的解析
fn bench_typed_resolution(c: &mut Criterion) {
    let mut container = chain_container(1);
    c.bench_function("typed_resolution", |b| {
        b.iter(|| black_box(check_value(&mut container)))
    });
}

criterion_group!(
    benches,
    bench_cold_resolution,
    bench_cached_resolution,
    bench_parameter_resolution,
    bench_registry_lookup,
    bench_tagged_lookup,
    bench_typed_resolution
);
criterion_main!(benches);
