use std::hint::black_box;
use std::time::Instant;

use criterion::{Criterion, criterion_group, criterion_main};
use microlesson_engine::editing::{Cmd, Document, DropSide, Placeholders, Selection};
use microlesson_engine::interaction::{SlashRecognizer, default_palette};
use microlesson_engine::io::{parse_lesson, to_html};
use microlesson_engine::{Editor, EditorKey, EditorOptions};
mod common;

fn lesson(sections: usize) -> Document {
    parse_lesson(
        &common::generate_lesson_markdown(sections),
        &Placeholders::default(),
    )
    .unwrap()
}

fn bench_commands(c: &mut Criterion) {
    let mut group = c.benchmark_group("commands");
    group.sample_size(10);

    let doc = lesson(100);

    group.bench_function("insert_text", |b| {
        let mut d = doc.clone();
        let at = d.block_text_start(1);
        b.iter(|| {
            let patch = d.apply(Cmd::insert_text(black_box(at), black_box("x")));
            black_box(patch)
        });
    });

    group.bench_function("split_block", |b| {
        b.iter_batched(
            || doc.clone(),
            |mut d| {
                let at = d.block_text_end(50);
                black_box(d.apply(Cmd::SplitBlock { at }))
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function("move_block", |b| {
        b.iter_batched(
            || doc.clone(),
            |mut d| {
                let first = d.blocks()[1].id();
                let last = d.blocks()[d.block_count() - 1].id();
                black_box(d.apply(Cmd::MoveBlock {
                    block: first,
                    target: last,
                    side: DropSide::Below,
                }))
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");
    group.sample_size(10);

    let doc = lesson(100);

    group.bench_function("snapshot", |b| b.iter(|| black_box(doc.snapshot())));
    group.bench_function("to_html", |b| b.iter(|| black_box(to_html(&doc))));
    group.bench_function("parse_lesson", |b| {
        let markdown = common::generate_lesson_markdown(100);
        b.iter(|| black_box(parse_lesson(&markdown, &Placeholders::default())))
    });

    group.finish();
}

fn bench_typing(c: &mut Criterion) {
    let mut group = c.benchmark_group("typing");
    group.sample_size(10);

    group.bench_function("keystroke_with_slash_sync", |b| {
        let mut editor = Editor::with_document(lesson(20), EditorOptions::default());
        let now = Instant::now();
        let at = editor.document().block_text_end(1);
        editor.set_selection(Selection::cursor(at), now);
        b.iter(|| black_box(editor.handle_key(EditorKey::Char('a'), now)));
    });

    group.bench_function("slash_recognition", |b| {
        let doc = lesson(1);
        let block = doc.blocks()[0].id();
        let mut slash = SlashRecognizer::new(default_palette(None), 50);
        let text = "Some text before the trigger /quiz";
        b.iter(|| slash.on_document_change(black_box(100), block, black_box(text)));
    });

    group.finish();
}

criterion_group!(benches, bench_commands, bench_projection, bench_typing);
criterion_main!(benches);
