//! Benchmarks for full row recalculation and incremental updates.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use pagegrid::layout::{PageSizeCache, RowLayoutCache};
use pagegrid::model::PageSize;
use std::hint::black_box;

const LETTER: PageSize = PageSize {
    width: 816.0,
    height: 1056.0,
};

fn completed_pages(count: usize) -> PageSizeCache {
    let mut pages = PageSizeCache::new(LETTER);
    pages.set_source(count);
    pages.pagination_completed(count);
    pages
}

fn bench_full_recalc(c: &mut Criterion) {
    let mut group = c.benchmark_group("recalc_rows");
    for page_count in [1_000usize, 10_000] {
        let pages = completed_pages(page_count);
        group.bench_function(format!("{page_count}_pages_3_columns"), |b| {
            b.iter_batched(
                || RowLayoutCache::new(10.0, 10.0, 32),
                |mut rows| {
                    rows.recalc_rows(black_box(0), black_box(3), &pages).unwrap();
                    rows
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_scale_recalc(c: &mut Criterion) {
    let pages = completed_pages(10_000);
    let mut rows = RowLayoutCache::new(10.0, 10.0, 32);
    rows.recalc_rows(0, 3, &pages).unwrap();

    let mut scale = 1.0;
    c.bench_function("recalc_for_scale_10k_pages", |b| {
        b.iter(|| {
            // Alternate scales so each call really re-derives geometry.
            scale = if scale == 1.0 { 1.5 } else { 1.0 };
            rows.recalc_for_scale_or_spacing(black_box(scale), 10.0, 10.0, &pages)
                .unwrap()
        });
    });
}

fn bench_incremental_update(c: &mut Criterion) {
    let mut pages = completed_pages(10_000);
    for page in 0..10_000 {
        pages.page_measured(page, LETTER).unwrap();
    }
    let mut rows = RowLayoutCache::new(10.0, 10.0, 32);
    rows.recalc_rows(0, 3, &pages).unwrap();

    let mut tall = false;
    c.bench_function("single_page_update_10k_pages", |b| {
        b.iter(|| {
            tall = !tall;
            let height = if tall { 1200.0 } else { 1056.0 };
            let batch = pages
                .page_measured(black_box(5_000), PageSize::new(816.0, height))
                .unwrap();
            rows.apply_page_changes(&batch, &pages).unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_full_recalc,
    bench_scale_recalc,
    bench_incremental_update
);
criterion_main!(benches);
