use std::collections::BTreeSet;
use std::path::PathBuf;

use proptest::prelude::*;

use super::*;

fn image(n: u32) -> ImageFile {
    ImageFile {
        number: n,
        path: PathBuf::from(format!("pics/{n}.jpg")),
        extension: "jpg",
        media_type: "image/jpeg",
    }
}

/// Image source holding exactly the given numbers.
fn pics(numbers: impl IntoIterator<Item = u32>) -> impl Fn(u32) -> Option<ImageFile> {
    let set: BTreeSet<u32> = numbers.into_iter().collect();
    move |n| set.contains(&n).then(|| image(n))
}

fn para(text: &str) -> Block {
    Block::Paragraph(text.to_string())
}

fn numbers(book: &CompiledBook) -> Vec<u32> {
    book.images.iter().map(|i| i.number).collect()
}

#[test]
fn test_plain_text_is_one_untitled_chapter() {
    let book = compile(["hello", "", "  world  "], &pics([]));

    assert_eq!(
        book.chapters,
        vec![Chapter {
            index: 1,
            title: None,
            blocks: vec![para("hello"), para("world")],
        }]
    );
    assert!(book.preface().is_none());
    assert!(book.cover.is_none());
    assert!(book.images.is_empty());
}

#[test]
fn test_empty_input() {
    let book = compile(Vec::<String>::new(), &pics([1, 2]));
    assert!(book.chapters.is_empty());
    assert_eq!(book.cover, Some(image(1)));
    assert!(book.images.is_empty());
}

#[test]
fn test_blank_lines_only() {
    let book = compile(["", "   ", "\t"], &pics([]));
    assert!(book.chapters.is_empty());
}

#[test]
fn test_headings_split_chapters() {
    let book = compile(
        ["第一卷 序", "a", "第二卷 本篇", "b", "c", "第三卷"],
        &pics([]),
    );

    let titles: Vec<_> = book.chapters.iter().map(|c| c.title.as_deref()).collect();
    assert_eq!(
        titles,
        vec![Some("第一卷 序"), Some("第二卷 本篇"), Some("第三卷")]
    );
    assert_eq!(book.chapters[0].blocks, vec![para("a")]);
    assert_eq!(book.chapters[1].blocks, vec![para("b"), para("c")]);
    // A heading with nothing after it is still a chapter
    assert!(book.chapters[2].blocks.is_empty());
    assert_eq!(
        book.chapters.iter().map(|c| c.index).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(book.heading_count(), 3);
}

#[test]
fn test_text_before_first_heading_is_kept() {
    let book = compile(["前言", "第一卷", "正文"], &pics([]));

    assert_eq!(book.chapters.len(), 2);
    assert_eq!(book.chapters[0].title, None);
    assert_eq!(book.chapters[0].blocks, vec![para("前言")]);
    assert_eq!(book.chapters[1].title.as_deref(), Some("第一卷"));
    assert_eq!(book.chapters[1].index, 2);
    assert_eq!(book.heading_count(), 1);
}

#[test]
fn test_end_to_end_scenario() {
    let book = compile(["第一卷 序", "插圖3", "hello"], &pics([1, 2, 3]));

    assert_eq!(
        book.chapters,
        vec![
            Chapter {
                index: 0,
                title: Some(PREFACE_TITLE.to_string()),
                blocks: vec![Block::Image(1), Block::Image(2)],
            },
            Chapter {
                index: 1,
                title: Some("第一卷 序".to_string()),
                blocks: vec![Block::Image(3), para("hello")],
            },
        ]
    );
    assert_eq!(numbers(&book), vec![1, 2, 3]);
    assert_eq!(book.cover, Some(image(1)));
}

#[test]
fn test_backfill_into_preface() {
    let book = compile(["插圖5"], &pics(1..=5));

    let preface = book.preface().unwrap();
    assert_eq!(
        preface.image_numbers().collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert_eq!(book.chapters[1].blocks, vec![Block::Image(5)]);
}

#[test]
fn test_backfill_skips_missing_and_used() {
    let book = compile(["第一卷", "插圖2", "插圖6"], &pics([1, 2, 4, 6]));

    // 1 backfilled by the first marker, 4 by the second; 3 and 5 are missing
    assert_eq!(
        book.preface().unwrap().image_numbers().collect::<Vec<_>>(),
        vec![1, 4]
    );
    assert_eq!(
        book.chapters[1].blocks,
        vec![Block::Image(2), Block::Image(6)]
    );
}

#[test]
fn test_missing_marker_image_is_skipped() {
    let book = compile(["第一卷", "插圖9", "text"], &pics([]));
    assert_eq!(book.chapters[0].blocks, vec![para("text")]);
    assert!(book.images.is_empty());
}

#[test]
fn test_repeated_marker_places_image_again() {
    let book = compile(["第一卷", "插圖1", "第二卷", "插圖1"], &pics([1]));

    assert_eq!(book.chapters[0].blocks, vec![Block::Image(1)]);
    assert_eq!(book.chapters[1].blocks, vec![Block::Image(1)]);
    // One resource however many times it is placed
    assert_eq!(numbers(&book), vec![1]);
}

#[test]
fn test_marker_for_backfilled_image_is_placed() {
    let book = compile(["第一卷", "插圖3", "插圖2"], &pics(1..=3));

    assert_eq!(
        book.preface().unwrap().image_numbers().collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(
        book.chapters[1].blocks,
        vec![Block::Image(3), Block::Image(2)]
    );
    assert_eq!(numbers(&book), vec![1, 2, 3]);
}

#[test]
fn test_out_of_order_marker_lands_in_its_chapter() {
    let book = compile(["第一卷", "插圖5", "第二卷", "插圖3"], &pics(1..=5));

    assert_eq!(
        book.preface().unwrap().image_numbers().collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert_eq!(book.chapters[1].blocks, vec![Block::Image(5)]);
    assert_eq!(book.chapters[2].blocks, vec![Block::Image(3)]);
    assert_eq!(numbers(&book), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_fullwidth_marker() {
    let book = compile(["第一卷", "插圖３"], &pics([3]));

    assert_eq!(book.chapters.last().unwrap().blocks, vec![Block::Image(3)]);
    assert_eq!(numbers(&book), vec![3]);
}

#[test]
fn test_trailing_images_fill_last_chapter() {
    let book = compile(
        ["第一卷", "插圖1", "第二卷", "插圖2", "end"],
        &pics([1, 2, 3, 4, 6]),
    );

    // 3 and 4 follow; the gap at 5 stops the scan before 6
    assert_eq!(
        book.chapters[1].blocks,
        vec![
            Block::Image(2),
            para("end"),
            Block::Rule,
            Block::Image(3),
            Block::Rule,
            Block::Image(4),
        ]
    );
    assert_eq!(book.chapters[0].blocks, vec![Block::Image(1)]);
    assert!(!book.images.contains(6));
}

#[test]
fn test_trailing_scan_starts_after_used_count() {
    let book = compile(["第一卷", "插圖5"], &pics(1..=7));

    // 1-4 backfilled plus 5 makes five used, so the scan begins at 6
    assert_eq!(
        book.chapters[1].blocks,
        vec![
            Block::Image(5),
            Block::Rule,
            Block::Image(6),
            Block::Rule,
            Block::Image(7),
        ]
    );
}

#[test]
fn test_trailing_scan_skips_used_numbers() {
    let book = compile(["第一卷", "插圖3"], &pics([2, 3, 4]));

    assert_eq!(
        book.preface().unwrap().image_numbers().collect::<Vec<_>>(),
        vec![2]
    );
    // Two used, so the scan starts at 3, steps over it and adds 4
    assert_eq!(
        book.chapters[1].blocks,
        vec![Block::Image(3), Block::Rule, Block::Image(4)]
    );
}

#[test]
fn test_trailing_images_never_go_to_preface() {
    let book = compile(["插圖2"], &pics([1, 2, 3]));

    assert_eq!(book.chapters.len(), 2);
    assert!(book.chapters[0].is_preface());
    assert_eq!(
        book.chapters[1].blocks,
        vec![Block::Image(2), Block::Rule, Block::Image(3)]
    );
}

#[test]
fn test_no_trailing_fill_without_chapters() {
    // Marker image is missing, so no chapter gets sealed
    let book = compile(["插圖3"], &pics([1, 2, 4, 5]));

    assert_eq!(book.chapters.len(), 1);
    assert!(book.chapters[0].is_preface());
    assert_eq!(numbers(&book), vec![1, 2]);
}

#[test]
fn test_cover_is_not_counted() {
    let book = compile(["第一卷", "text"], &pics([1]));

    assert_eq!(book.cover, Some(image(1)));
    assert!(book.images.is_empty());
    assert_eq!(book.chapters[0].blocks, vec![para("text")]);
}

#[test]
fn test_trailing_scan_steps_over_cover() {
    let book = compile(["第一卷", "text"], &pics([1, 2, 3]));

    assert_eq!(numbers(&book), vec![2, 3]);
    assert_eq!(
        book.chapters[0].blocks,
        vec![
            para("text"),
            Block::Rule,
            Block::Image(2),
            Block::Rule,
            Block::Image(3),
        ]
    );
}

#[test]
fn test_cover_counted_once_referenced() {
    let book = compile(["第一卷", "插圖1"], &pics([1]));
    assert_eq!(book.cover, Some(image(1)));
    assert_eq!(numbers(&book), vec![1]);
    assert_eq!(book.chapters[0].blocks, vec![Block::Image(1)]);

    // Backfill is a reference too
    let book = compile(["第一卷", "插圖2"], &pics([1, 2]));
    assert_eq!(
        book.preface().unwrap().image_numbers().collect::<Vec<_>>(),
        vec![1]
    );
}

#[test]
fn test_image_before_first_heading() {
    let book = compile(["插圖1", "第一卷", "text"], &pics([1]));

    assert_eq!(book.chapters[0].title, None);
    assert_eq!(book.chapters[0].blocks, vec![Block::Image(1)]);
    assert_eq!(book.chapters[1].blocks, vec![para("text")]);
}

#[test]
fn test_whole_line_digits_change_number() {
    // `第3話` contributes a 3, so the marker asks for image 31
    let book = compile(["第一卷", "第3話 插圖1"], &pics([1, 31]));

    assert_eq!(
        book.chapters
            .last()
            .unwrap()
            .image_numbers()
            .collect::<Vec<_>>(),
        vec![31]
    );
    assert_eq!(
        book.preface().unwrap().image_numbers().collect::<Vec<_>>(),
        vec![1]
    );
}

#[test]
fn test_feed_incrementally() {
    let images = pics([1]);
    let mut compiler = Compiler::new(&images);
    for line in "第一卷\n插圖1\nline\n".lines() {
        compiler.feed(line);
    }
    let book = compiler.finish();
    assert_eq!(book.chapters[0].blocks, vec![Block::Image(1), para("line")]);
}

fn line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("第一卷".to_string()),
        Just("第二卷 外傳".to_string()),
        (0u32..12).prop_map(|n| format!("插圖{n}")),
        "[a-z ]{1,8}",
    ]
}

proptest! {
    #[test]
    fn prop_every_placed_image_is_in_manifest(
        lines in prop::collection::vec(line_strategy(), 0..40),
        present in prop::collection::btree_set(1u32..12, 0..12),
    ) {
        let book = compile(&lines, &pics(present.iter().copied()));
        let manifest = numbers(&book);

        let mut deduped = manifest.clone();
        deduped.dedup();
        prop_assert_eq!(&manifest, &deduped);

        let referenced: BTreeSet<u32> = book
            .chapters
            .iter()
            .flat_map(|c| c.image_numbers())
            .collect();
        prop_assert_eq!(referenced.into_iter().collect::<Vec<_>>(), manifest.clone());
        for n in manifest {
            prop_assert!(present.contains(&n));
        }
    }

    #[test]
    fn prop_compile_is_deterministic(
        lines in prop::collection::vec(line_strategy(), 0..40),
        present in prop::collection::btree_set(1u32..12, 0..12),
    ) {
        let images = pics(present.iter().copied());
        prop_assert_eq!(compile(&lines, &images), compile(&lines, &images));
    }

    #[test]
    fn prop_text_only_has_no_images(
        lines in prop::collection::vec("[a-z]{0,6}", 0..20),
    ) {
        let book = compile(&lines, &pics([]));
        let has_text = lines.iter().any(|l| !l.trim().is_empty());
        prop_assert_eq!(book.chapters.len(), usize::from(has_text));
        for chapter in &book.chapters {
            prop_assert!(chapter.blocks.iter().all(|b| matches!(b, Block::Paragraph(_))));
        }
    }
}
