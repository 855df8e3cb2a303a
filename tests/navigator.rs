use md_blocktree::{Alignment, BlockId, BlockStore, Navigator, TreeNode};

/// quote > [p, list(3)], table(2x2), p
fn fixture() -> BlockStore {
    BlockStore::from_nodes(&[
        TreeNode::quote(vec![
            TreeNode::paragraph("q"),
            TreeNode::unordered_list(
                '*',
                ["1", "2", "3"]
                    .iter()
                    .map(|text| TreeNode::list_item(false, vec![TreeNode::paragraph(text)]))
                    .collect(),
            ),
        ]),
        TreeNode::table(
            &[Alignment::Left, Alignment::Right],
            &[&["h1", "h2"], &["b1", "b2"]],
        ),
        TreeNode::paragraph("end"),
    ])
    .unwrap()
}

fn by_text(store: &BlockStore, text: &str) -> BlockId {
    store
        .document_order()
        .into_iter()
        .find(|id| store.get(*id).is_some_and(|block| block.text == text))
        .unwrap()
}

#[test]
fn test_walk_forward_visits_every_caret_host_in_order() {
    let store = fixture();
    let nav = Navigator::new(&store);
    let mut seen = Vec::new();
    let mut current = nav.first_leaf_in_document();
    while let Some(leaf) = current {
        seen.push(store.get(leaf).unwrap().text.clone());
        current = nav.following_leaf_in_document(leaf);
    }
    assert_eq!(seen, ["q", "1", "2", "3", "h1", "h2", "b1", "b2", "end"]);
}

#[test]
fn test_walk_backward_mirrors_forward() {
    let store = fixture();
    let nav = Navigator::new(&store);
    let mut seen = Vec::new();
    let mut current = nav.last_leaf_in_document();
    while let Some(leaf) = current {
        seen.push(store.get(leaf).unwrap().text.clone());
        current = nav.preceding_leaf_in_document(leaf);
    }
    assert_eq!(seen, ["end", "b2", "b1", "h2", "h1", "3", "2", "1", "q"]);
}

#[test]
fn test_crossing_between_top_level_blocks() {
    let store = fixture();
    let nav = Navigator::new(&store);
    let last_item = by_text(&store, "3");
    let h1 = by_text(&store, "h1");
    let b2 = by_text(&store, "b2");
    let end = by_text(&store, "end");

    assert_eq!(nav.following_leaf_in_document(last_item), Some(h1));
    assert_eq!(nav.preceding_leaf_in_document(h1), Some(last_item));
    assert_eq!(nav.following_leaf_in_document(b2), Some(end));

    let quote = store.roots()[0];
    let figure = store.roots()[1];
    assert_eq!(nav.preceding_leaf_in_document(quote), None);
    assert_eq!(nav.following_leaf_in_document(quote), Some(h1));
    assert_eq!(nav.first_editable_leaf(figure), Some(h1));
    assert_eq!(nav.last_editable_leaf(figure), Some(b2));
}

#[test]
fn test_missing_block_yields_none() {
    let store = fixture();
    let nav = Navigator::new(&store);
    let ghost = BlockId::new_v4();
    assert_eq!(nav.preceding_leaf_in_document(ghost), None);
    assert_eq!(nav.following_leaf_in_document(ghost), None);
    assert_eq!(nav.first_editable_leaf(ghost), None);
    assert_eq!(nav.active_blocks(ghost), Vec::<BlockId>::new());
}

#[test]
fn test_non_editable_blocks_are_stepped_over() {
    let store = BlockStore::from_nodes(&[
        TreeNode::paragraph("a"),
        TreeNode::paragraph("locked").non_editable(),
        TreeNode::paragraph("b"),
    ])
    .unwrap();
    let nav = Navigator::new(&store);
    let a = by_text(&store, "a");
    let b = by_text(&store, "b");
    assert_eq!(nav.following_leaf_in_document(a), Some(b));
    assert_eq!(nav.preceding_leaf_in_document(b), Some(a));
}

#[test]
fn test_active_blocks_run_from_caret_to_root() {
    let store = fixture();
    let nav = Navigator::new(&store);
    let two = by_text(&store, "2");
    let active = nav.active_blocks(two);
    assert_eq!(active.first(), Some(&two));
    assert_eq!(active.last(), Some(&store.roots()[0]));
    // span, paragraph, item, list, quote
    assert_eq!(active.len(), 5);
}

#[test]
fn test_empty_document_has_no_leaves() {
    let store = BlockStore::new();
    let nav = Navigator::new(&store);
    assert_eq!(nav.first_leaf_in_document(), None);
    assert_eq!(nav.last_leaf_in_document(), None);
}
