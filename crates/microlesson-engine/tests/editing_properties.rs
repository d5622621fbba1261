//! Behavioural guarantees of the editing core, exercised through the public API

use std::collections::HashSet;
use std::time::Instant;

use microlesson_engine::editing::{Block, BlockId, BlockKind, Cmd, Document, DropSide, EditError, Node, Selection};
use microlesson_engine::interaction::{SlashRecognizer, ToolbarPositioner, default_palette};
use microlesson_engine::{Editor, EditorKey, EditorOptions, ToolbarSettings};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn paragraph_block(text: &str) -> Block {
    Block::with_content(BlockKind::Content, "", vec![Node::paragraph(text)])
}

fn doc_of(texts: &[&str]) -> Document {
    Document::from_blocks(texts.iter().map(|text| paragraph_block(text)).collect()).unwrap()
}

fn ids(doc: &Document) -> Vec<BlockId> {
    doc.iter().map(Block::id).collect()
}

/// Cursor at the start of the first text node of block `index`
fn block_start(doc: &Document, index: usize) -> usize {
    doc.block_text_start(index)
}

// ============ Block count ============

#[test]
fn test_block_count_never_drops_below_one() {
    let mut doc = doc_of(&["only"]);
    // Deterministic mix of splits and deletes across the document
    for step in 0..200usize {
        let count = doc.block_count();
        let target = (step * 7) % count;
        let result = if step % 3 == 0 {
            doc.apply(Cmd::SplitBlock {
                at: block_start(&doc, target),
            })
        } else {
            doc.apply(Cmd::DeleteBlock {
                at: block_start(&doc, target),
            })
        };
        if result.is_err() {
            assert_eq!(doc.block_count(), count, "a rejected command changed the document");
        }
        assert!(doc.block_count() >= 1);
    }
}

#[test]
fn test_deleting_last_block_is_rejected() {
    let mut doc = doc_of(&[""]);
    let before = doc.version();
    assert_eq!(
        doc.apply(Cmd::DeleteBlock { at: block_start(&doc, 0) }),
        Err(EditError::LastBlock)
    );
    let only = ids(&doc)[0];
    assert_eq!(doc.apply(Cmd::RemoveBlock { block: only }), Err(EditError::LastBlock));
    assert_eq!(doc.block_count(), 1);
    assert_eq!(doc.version(), before);
}

// ============ Block identity ============

#[test]
fn test_ids_are_unique_and_never_reused() {
    let mut doc = doc_of(&["a", ""]);
    let mut seen: HashSet<BlockId> = ids(&doc).into_iter().collect();
    let mut removed: HashSet<BlockId> = HashSet::new();

    for _ in 0..20 {
        let last = doc.block_count() - 1;
        doc.apply(Cmd::SplitBlock {
            at: doc.block_text_end(last),
        })
        .unwrap();
        let current = ids(&doc);
        let unique: HashSet<BlockId> = current.iter().copied().collect();
        assert_eq!(unique.len(), current.len());

        let newest = *current.last().unwrap();
        assert!(!removed.contains(&newest));
        assert!(seen.insert(newest));

        doc.apply(Cmd::DeleteBlock {
            at: block_start(&doc, doc.block_count() - 1),
        })
        .unwrap();
        removed.insert(newest);
        assert!(doc.block(newest).is_none());
    }
}

// ============ Delete preconditions ============

#[rstest]
#[case::non_empty_block_at_start(2)]
#[case::non_empty_block_mid_text(4)]
#[case::non_empty_block_at_end(7)]
fn test_delete_block_on_non_empty_is_noop(#[case] at: usize) {
    let mut doc = doc_of(&["Hello", "World"]);
    let blocks_before = doc.blocks().to_vec();
    let version = doc.version();

    assert!(doc.apply(Cmd::DeleteBlock { at }).is_err());

    assert_eq!(doc.blocks(), &blocks_before[..]);
    assert_eq!(doc.version(), version);
}

#[test]
fn test_delete_block_outside_any_block_is_noop() {
    let mut doc = doc_of(&["Hello", ""]);
    // 9 is the boundary between the two blocks
    assert_eq!(
        doc.apply(Cmd::DeleteBlock { at: 9 }),
        Err(EditError::NotInBlock { pos: 9 })
    );
    assert_eq!(doc.block_count(), 2);
}

// ============ Split and merge back ============

#[rstest]
#[case::at_start(2)]
#[case::mid_text(4)]
#[case::at_end(7)]
fn test_split_then_backspace_round_trips(#[case] at: usize) {
    let mut doc = doc_of(&["Hello", "World"]);
    let before: Vec<String> = doc.iter().map(Block::plain_text).collect();

    let patch = doc.apply(Cmd::SplitBlock { at }).unwrap();
    assert_eq!(doc.block_count(), 3);
    let new_block = patch.focus.unwrap();
    assert_eq!(doc.index_of(new_block), Some(1));

    doc.apply(Cmd::DeleteBlock {
        at: patch.new_selection.from,
    })
    .unwrap();

    let after: Vec<String> = doc.iter().map(Block::plain_text).collect();
    assert_eq!(after, before);
    assert_eq!(doc.selection(), Selection::cursor(7));
}

// ============ Reorder ============

#[test]
fn test_drop_below_places_block_right_after_target() {
    let texts = ["A", "B", "C", "D", "E"];
    for dragged in 0..texts.len() {
        for target in 0..texts.len() {
            if dragged == target {
                continue;
            }
            let mut doc = doc_of(&texts);
            let original = ids(&doc);

            let result = doc.apply(Cmd::MoveBlock {
                block: original[dragged],
                target: original[target],
                side: DropSide::Below,
            });
            if target + 1 == dragged {
                // already directly below its target
                assert_eq!(result, Err(EditError::NoMovement));
                continue;
            }
            result.unwrap();

            let order = ids(&doc);
            let at = order.iter().position(|id| *id == original[dragged]).unwrap();
            assert_eq!(order[at - 1], original[target]);

            let others: Vec<BlockId> = order.iter().copied().filter(|id| *id != original[dragged]).collect();
            let expected: Vec<BlockId> = original
                .iter()
                .copied()
                .filter(|id| *id != original[dragged])
                .collect();
            assert_eq!(others, expected);
        }
    }
}

#[test]
fn test_drop_onto_self_is_rejected() {
    let mut doc = doc_of(&["A", "B"]);
    let a = ids(&doc)[0];
    assert_eq!(
        doc.apply(Cmd::MoveBlock {
            block: a,
            target: a,
            side: DropSide::Above,
        }),
        Err(EditError::MoveOntoSelf(a))
    );
}

// ============ Slash filtering ============

#[test]
fn test_quiz_query_finds_only_quiz_question() {
    let doc = doc_of(&[""]);
    let mut slash = SlashRecognizer::new(default_palette(None), 50);
    slash.on_document_change(7, ids(&doc)[0], "/quiz");

    let session = slash.session().unwrap();
    let titles: Vec<&str> = session
        .filtered_commands
        .iter()
        .map(|command| command.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Quiz Question"]);
    assert_eq!(session.trigger_range, 2..7);
}

// ============ Toolbar ============

#[rstest]
#[case(Selection::new(2, 9))]
#[case(Selection::new(5, 6))]
#[case(Selection::new(40, 120))]
fn test_collapsing_selection_hides_toolbar(#[case] selection: Selection) {
    let mut toolbar = ToolbarPositioner::new(ToolbarSettings::default());
    let now = Instant::now();
    toolbar.on_selection_change(selection, now);
    assert!(toolbar.is_open());
    assert_eq!(toolbar.on_selection_change(Selection::cursor(selection.to), now), None);
    assert!(!toolbar.is_open());
}

// ============ Editor scenarios ============

#[test]
fn test_enter_at_end_of_hello() {
    // Given a single block holding "Hello" with the cursor at its end
    let mut editor = Editor::with_document(doc_of(&["Hello"]), EditorOptions::default());
    let now = Instant::now();
    editor.set_selection(Selection::cursor(7), now);

    // When pressing Enter
    editor.handle_key(EditorKey::Enter, now);

    // Then a focused empty block follows the untouched first block
    let doc = editor.document();
    assert_eq!(doc.block_count(), 2);
    assert_eq!(doc.blocks()[0].plain_text(), "Hello");
    assert!(doc.blocks()[1].is_empty());
    assert_eq!(editor.focus(), Some(doc.blocks()[1].id()));
    assert_eq!(doc.selection(), Selection::cursor(block_start(doc, 1)));
}

#[test]
fn test_backspace_on_empty_second_block() {
    // Given "Hello" followed by an empty block, cursor in the empty one
    let mut editor = Editor::with_document(doc_of(&["Hello", ""]), EditorOptions::default());
    let now = Instant::now();
    let cursor = block_start(editor.document(), 1);
    editor.set_selection(Selection::cursor(cursor), now);

    // When pressing Backspace
    editor.handle_key(EditorKey::Backspace, now);

    // Then only the first block remains, cursor at its end
    let doc = editor.document();
    assert_eq!(doc.block_count(), 1);
    assert_eq!(doc.plain_text(), "Hello");
    assert_eq!(doc.selection(), Selection::cursor(7));
}

#[test]
fn test_drag_a_below_c() {
    struct Rows(Vec<BlockId>);

    impl microlesson_engine::interaction::BlockLayout for Rows {
        fn block_rect(&self, id: BlockId) -> Option<microlesson_engine::interaction::Rect> {
            let row = self.0.iter().position(|candidate| *candidate == id)?;
            Some(microlesson_engine::interaction::Rect::new(
                0.0,
                row as f32 * 40.0,
                400.0,
                40.0,
            ))
        }
    }

    let mut editor = Editor::with_document(doc_of(&["A", "B", "C"]), EditorOptions::default());
    let original = ids(editor.document());
    let layout = Rows(original.clone());

    assert!(editor.drag_start(original[0]));
    // lower half of C's row (80..120)
    assert_eq!(editor.drag_over(110.0, original[2], &layout), Some(DropSide::Below));
    editor.drop(Instant::now()).unwrap();

    let texts: Vec<String> = editor.document().iter().map(Block::plain_text).collect();
    assert_eq!(texts, vec!["B", "C", "A"]);
    assert!(!editor.drag().is_active());
}

#[test]
fn test_slash_qu_arrow_down_enter_inserts_quiz() {
    let mut editor = Editor::with_document(doc_of(&[""]), EditorOptions::default());
    let now = Instant::now();
    editor.set_selection(Selection::cursor(2), now);
    for c in "/qu".chars() {
        editor.handle_key(EditorKey::Char(c), now);
    }

    let menu = editor.snapshot().slash_menu.unwrap();
    assert!(menu.items.iter().any(|item| item.title == "Quiz Question"));
    assert_eq!(menu.query, "qu");

    editor.handle_key(EditorKey::Down, now);
    assert_eq!(editor.snapshot().slash_menu.unwrap().selected_index, 1);
    editor.handle_key(EditorKey::Enter, now);

    let doc = editor.document();
    assert_eq!(
        doc.blocks()[0].content(),
        &[
            Node::heading(3, "Question"),
            Node::list_item(true, "Option A"),
            Node::list_item(true, "Option B"),
            Node::list_item(true, "Option C"),
        ]
    );
    assert!(editor.snapshot().slash_menu.is_none());
}

#[test]
fn test_every_change_reaches_the_listener_as_html() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let received = Rc::new(RefCell::new(Vec::<String>::new()));
    let sink = Rc::clone(&received);
    let options = EditorOptions {
        on_change: Some(Box::new(move |html: &str| sink.borrow_mut().push(html.to_string()))),
        ..EditorOptions::default()
    };
    let mut editor = Editor::with_document(doc_of(&[""]), options);
    let now = Instant::now();
    editor.set_selection(Selection::cursor(2), now);

    for c in "Hi".chars() {
        editor.handle_key(EditorKey::Char(c), now);
    }
    editor.handle_key(EditorKey::Enter, now);
    editor.undo(now);

    let received = received.borrow();
    assert_eq!(received.len(), 4);
    assert!(received[1].contains("<p>Hi</p>"));
    assert_eq!(received[2].matches("<section").count(), 2);
    assert_eq!(received[3], editor.html());
}
