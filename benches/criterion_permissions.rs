#![cfg(all(
    feature = "criterion-bench",
    feature = "memory-store",
    feature = "memory-cache"
))]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use futures::executor::block_on;
use treemap_perms::{
    EngineBuilder, FieldName, FieldPermission, FieldPermissionStore, InstanceId, MemoryCache,
    MemoryStore, ModelName, PermissionLevel, RoleId, UserId, UserRoleStore,
};

fn setup_store(models: usize, fields_per_model: usize) -> (MemoryStore, InstanceId, UserId) {
    let store = MemoryStore::new();
    let instance = InstanceId::try_from("instance_bench").unwrap();
    let role = RoleId::try_from("commander").unwrap();
    let user = UserId::try_from("user_bench").unwrap();

    store.add_instance(instance.clone(), RoleId::try_from("default").unwrap());
    for m in 0..models {
        let model = ModelName::try_from(format!("Model{m}").as_str()).unwrap();
        for f in 0..fields_per_model {
            let field = FieldName::try_from(format!("field_{f}").as_str()).unwrap();
            block_on(store.upsert_field_permission(FieldPermission::new(
                model.clone(),
                field,
                role.clone(),
                instance.clone(),
                PermissionLevel::WriteDirectly,
            )))
            .unwrap();
        }
    }
    block_on(store.set_user_role(instance.clone(), user.clone(), Some(role))).unwrap();

    (store, instance, user)
}

fn bench_cache_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("permissions");
    group.sample_size(30);
    group.throughput(Throughput::Elements(1));

    let model = ModelName::try_from("Model0").unwrap();

    let (store, instance, user) = setup_store(8, 10);
    let engine = EngineBuilder::new(store).build();
    group.bench_function("no_cache", |b| {
        b.iter(|| {
            let perms = block_on(engine.permissions(Some(&user), &instance, Some(&model))).unwrap();
            black_box(perms);
        });
    });

    let (store, instance, user) = setup_store(8, 10);
    let engine = EngineBuilder::new(store)
        .cache(MemoryCache::new(64))
        .build();
    block_on(engine.permissions(Some(&user), &instance, None)).unwrap();
    group.bench_function("hot_cache", |b| {
        b.iter(|| {
            let perms = block_on(engine.permissions(Some(&user), &instance, Some(&model))).unwrap();
            black_box(perms);
        });
    });

    group.bench_function("invalidate_then_query", |b| {
        b.iter(|| {
            block_on(engine.invalidate(&instance)).unwrap();
            let perms = block_on(engine.permissions(Some(&user), &instance, Some(&model))).unwrap();
            black_box(perms);
        });
    });

    group.finish();
}

fn bench_snapshot_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_reload");
    group.sample_size(30);
    group.throughput(Throughput::Elements(1));

    for models in [1usize, 8, 32, 128] {
        let (store, instance, user) = setup_store(models, 10);
        let engine = EngineBuilder::new(store)
            .cache(MemoryCache::new(64))
            .build();

        let id = BenchmarkId::from_parameter(models);
        group.bench_with_input(id, &models, |b, _| {
            b.iter(|| {
                block_on(engine.clear_caches());
                let perms = block_on(engine.permissions(Some(&user), &instance, None)).unwrap();
                black_box(perms);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cache_modes, bench_snapshot_size);
criterion_main!(benches);
