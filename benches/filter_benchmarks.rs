/*!
# Filter Benchmarks

Measures request parsing, filter dispatch and SQL rendering, then a full
filtered page against in-memory SQLite.

```bash
cargo bench --bench filter_benchmarks
cargo bench --bench filter_benchmarks -- "Filter Dispatch"
cargo bench --bench filter_benchmarks -- --quick
```

HTML reports are generated in `target/criterion/report/index.html`.
*/

use catalogcrate::{
    CrudRepository, FilterQuery, FilterRequest, Repository, Resource,
    entities::{Product, category, product},
    schema,
};
use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue, Database, DatabaseConnection, DbBackend, EntityTrait, QueryTrait};
use std::hint::black_box;
use tokio::runtime::Runtime;
use uuid::Uuid;

const QUERY: &str = "name=lamp&description=brass&createdAt=2024-01-01,2024-06-30&categoryId=6b1f4f0e-8d44-4c7e-9f55-2f3c1d2e0a11&sort=-price,name,createdAt&include=category&page=2&per_page=25";

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("Filter Dispatch");

    group.bench_function("parse_request", |b| {
        b.iter(|| FilterRequest::from_query(black_box(QUERY)));
    });

    let request = FilterRequest::from_query(QUERY);
    group.bench_function("apply", |b| {
        b.iter(|| {
            Product::query_filter(black_box(request.clone()))
                .apply(FilterQuery::new())
                .unwrap()
        });
    });

    let query = Product::query_filter(request)
        .apply(FilterQuery::new())
        .unwrap();
    group.bench_function("render_sql", |b| {
        b.iter(|| {
            black_box(&query)
                .apply_to(product::Entity::find())
                .build(DbBackend::Sqlite)
                .to_string()
        });
    });

    group.finish();
}

async fn seed(rows: u32) -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    schema::create_tables(&db).await.unwrap();

    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let lighting = category::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4()),
        name: ActiveValue::Set("Lighting".to_string()),
        description: ActiveValue::Set(None),
        created_at: ActiveValue::Set(start),
        updated_at: ActiveValue::Set(start),
        deleted_at: ActiveValue::Set(None),
    }
    .insert(&db)
    .await
    .unwrap();

    for n in 0..rows {
        let created_at = start + Duration::hours(i64::from(n));
        product::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            category_id: ActiveValue::Set(lighting.id),
            name: ActiveValue::Set(format!("Lamp {n:05}")),
            description: ActiveValue::Set(Some("Brushed brass".to_string())),
            price: ActiveValue::Set(Decimal::new(i64::from(n % 500) + 10, 0)),
            stock: ActiveValue::Set(i32::try_from(n % 40).unwrap()),
            created_at: ActiveValue::Set(created_at),
            updated_at: ActiveValue::Set(created_at),
            deleted_at: ActiveValue::Set(None),
        }
        .insert(&db)
        .await
        .unwrap();
    }
    db
}

fn bench_paginate(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("Paginate");
    group.sample_size(30);

    for rows in [100_u32, 1_000] {
        let db = rt.block_on(seed(rows));
        let repository = Repository::<Product>::new(db);
        let request = FilterRequest::from_query(
            "name=Lamp&createdAt=2024-01-01,2024-03-31&sort=-price,name&include=category",
        );

        group.bench_with_input(BenchmarkId::new("filtered_page", rows), &rows, |b, _| {
            b.iter(|| {
                let query = Product::query_filter(request.clone())
                    .apply(FilterQuery::new())
                    .unwrap();
                rt.block_on(repository.paginate(query, 25, 2)).unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch, bench_paginate);
criterion_main!(benches);
