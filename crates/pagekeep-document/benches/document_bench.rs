// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the pagekeep-document crate: in-memory PDF
// assembly of a small synthetic scan, and the black-and-white filter.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use pagekeep_core::PageImage;
use pagekeep_document::{PageFilter, PageInput, PdfAssembler};

/// A 600x800 light page with a dark block standing in for text.
fn synthetic_page() -> DynamicImage {
    let mut img = RgbImage::from_pixel(600, 800, Rgb([240, 238, 230]));
    for y in 100..700 {
        for x in 80..520 {
            if (y / 12) % 2 == 0 {
                img.put_pixel(x, y, Rgb([30, 30, 35]));
            }
        }
    }
    DynamicImage::ImageRgb8(img)
}

fn bench_assembly(c: &mut Criterion) {
    let pages: Vec<PageInput> = (0..4)
        .map(|_| PageInput::Page(PageImage::new(synthetic_page())))
        .collect();
    let assembler = PdfAssembler::default();

    c.bench_function("render 4-page PDF (600x800)", |b| {
        b.iter(|| {
            let (bytes, count) = assembler
                .render(black_box(&pages), "bench")
                .expect("render");
            black_box((bytes, count));
        });
    });
}

fn bench_black_and_white(c: &mut Criterion) {
    let page = synthetic_page();
    c.bench_function("black-and-white filter (600x800)", |b| {
        b.iter(|| black_box(PageFilter::BlackAndWhite.apply(black_box(page.clone()))));
    });
}

criterion_group!(benches, bench_assembly, bench_black_and_white);
criterion_main!(benches);
