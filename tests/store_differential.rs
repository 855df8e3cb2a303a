use md_blocktree::{BlockId, BlockKind, BlockStore, HeadingStyle, Navigator};
use md_blocktree_naive_oracle::Tree;
use proptest::collection::vec;
use proptest::prelude::*;
mod proptest_config;

#[derive(Clone, Debug)]
enum OpSpec {
    Create(usize),
    PushRoot(usize),
    InsertBefore(usize, usize),
    InsertAfter(usize, usize),
    Append(usize, usize),
    Prepend(usize, usize),
    Replace(usize, usize),
    Remove(usize),
}

fn kinds() -> Vec<BlockKind> {
    vec![
        BlockKind::Paragraph,
        BlockKind::BlockQuote,
        BlockKind::UnorderedList { bullet: '-' },
        BlockKind::ListItem { loose: false },
        BlockKind::TextSpan,
        BlockKind::Heading {
            level: 2,
            style: HeadingStyle::Atx,
        },
        BlockKind::TaskCheckbox { checked: false },
    ]
}

fn op_specs() -> impl Strategy<Value = Vec<OpSpec>> {
    let index = || any::<prop::sample::Index>().prop_map(|i| i.index(64));
    vec(
        prop_oneof![
            3 => index().prop_map(OpSpec::Create),
            2 => index().prop_map(OpSpec::PushRoot),
            2 => (index(), index()).prop_map(|(a, b)| OpSpec::InsertBefore(a, b)),
            2 => (index(), index()).prop_map(|(a, b)| OpSpec::InsertAfter(a, b)),
            3 => (index(), index()).prop_map(|(a, b)| OpSpec::Append(a, b)),
            2 => (index(), index()).prop_map(|(a, b)| OpSpec::Prepend(a, b)),
            1 => (index(), index()).prop_map(|(a, b)| OpSpec::Replace(a, b)),
            1 => index().prop_map(OpSpec::Remove),
        ],
        1..80,
    )
}

fn pick(ids: &[BlockId], index: usize) -> Option<BlockId> {
    if ids.is_empty() {
        None
    } else {
        Some(ids[index % ids.len()])
    }
}

/// Applies one op to both implementations and reports whether they agreed
/// on accepting it.
fn apply(
    store: &mut BlockStore,
    oracle: &mut Tree,
    ids: &mut Vec<BlockId>,
    spec: &OpSpec,
) -> Result<(), String> {
    let (ours, theirs) = match *spec {
        OpSpec::Create(kind) => {
            let kinds = kinds();
            let kind = kinds[kind % kinds.len()].clone();
            let id = store.create(kind.clone());
            oracle.create(id, kind);
            ids.push(id);
            return Ok(());
        }
        OpSpec::PushRoot(a) => {
            let Some(a) = pick(ids, a) else { return Ok(()) };
            (store.push_root(a).is_ok(), oracle.push_root(a).is_ok())
        }
        OpSpec::InsertBefore(a, b) => {
            let Some((a, b)) = pick(ids, a).zip(pick(ids, b)) else { return Ok(()) };
            (store.insert_before(a, b).is_ok(), oracle.insert_before(a, b).is_ok())
        }
        OpSpec::InsertAfter(a, b) => {
            let Some((a, b)) = pick(ids, a).zip(pick(ids, b)) else { return Ok(()) };
            (store.insert_after(a, b).is_ok(), oracle.insert_after(a, b).is_ok())
        }
        OpSpec::Append(a, b) => {
            let Some((a, b)) = pick(ids, a).zip(pick(ids, b)) else { return Ok(()) };
            (store.append_child(a, b).is_ok(), oracle.append_child(a, b).is_ok())
        }
        OpSpec::Prepend(a, b) => {
            let Some((a, b)) = pick(ids, a).zip(pick(ids, b)) else { return Ok(()) };
            (store.prepend_child(a, b).is_ok(), oracle.prepend_child(a, b).is_ok())
        }
        OpSpec::Replace(a, b) => {
            let Some((a, b)) = pick(ids, a).zip(pick(ids, b)) else { return Ok(()) };
            (store.replace_block(a, b).is_ok(), oracle.replace(a, b).is_ok())
        }
        OpSpec::Remove(a) => {
            let Some(a) = pick(ids, a) else { return Ok(()) };
            let ours = store.remove_block(a);
            let theirs = oracle.remove(a);
            if let (Ok(ours), Ok(theirs)) = (&ours, &theirs) {
                let mut ours = ours.removed.clone();
                let mut theirs = theirs.clone();
                ours.sort();
                theirs.sort();
                if ours != theirs {
                    return Err(format!("removed sets differ: {ours:?} vs {theirs:?}"));
                }
            }
            (ours.is_ok(), theirs.is_ok())
        }
    };
    if ours != theirs {
        return Err(format!("{spec:?}: store accepted={ours}, oracle accepted={theirs}"));
    }
    Ok(())
}

fn compare(store: &BlockStore, oracle: &Tree, ids: &[BlockId]) -> Result<(), TestCaseError> {
    prop_assert_eq!(store.verify(), Ok(()));
    prop_assert_eq!(store.document_order(), oracle.document_order());
    let nav = Navigator::new(store);
    for id in ids {
        let id = *id;
        prop_assert_eq!(store.contains(id), oracle.contains(id));
        if !store.contains(id) {
            continue;
        }
        prop_assert_eq!(store.parent(id).map(|block| block.id), oracle.parent(id));
        let children = store.get(id).map(|block| block.children().to_vec());
        prop_assert_eq!(children.unwrap_or_default(), oracle.children(id));
        prop_assert_eq!(
            store.preceding_sibling(id).map(|block| block.id),
            oracle.preceding(id)
        );
        prop_assert_eq!(
            store.following_sibling(id).map(|block| block.id),
            oracle.following(id)
        );
        prop_assert_eq!(nav.preceding_leaf_in_document(id), oracle.preceding_leaf(id));
        prop_assert_eq!(nav.following_leaf_in_document(id), oracle.following_leaf(id));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(proptest_config::cases()))]
    #[test]
    fn prop_store_matches_naive_tree(specs in op_specs()) {
        let mut store = BlockStore::new();
        let mut oracle = Tree::new();
        let mut ids = Vec::new();

        for spec in &specs {
            if let Err(message) = apply(&mut store, &mut oracle, &mut ids, spec) {
                return Err(TestCaseError::fail(message));
            }
        }
        compare(&store, &oracle, &ids)?;
    }

    #[test]
    fn prop_invariants_hold_after_every_op(specs in op_specs()) {
        let mut store = BlockStore::new();
        let mut oracle = Tree::new();
        let mut ids = Vec::new();

        for spec in &specs {
            if let Err(message) = apply(&mut store, &mut oracle, &mut ids, spec) {
                return Err(TestCaseError::fail(message));
            }
            prop_assert_eq!(store.verify(), Ok(()));
            prop_assert_eq!(store.document_order(), oracle.document_order());
        }
    }
}

#[test]
fn test_moving_a_subtree_keeps_both_views_aligned() {
    let mut store = BlockStore::new();
    let mut oracle = Tree::new();
    let quote = store.create(BlockKind::BlockQuote);
    let para = store.create(BlockKind::Paragraph);
    let span = store.create_with_text(BlockKind::TextSpan, "x");
    let tail = store.create_with_text(BlockKind::TextSpan, "y");
    oracle.create(quote, BlockKind::BlockQuote);
    oracle.create(para, BlockKind::Paragraph);
    oracle.create(span, BlockKind::TextSpan);
    oracle.create(tail, BlockKind::TextSpan);

    for (parent, child) in [(quote, para), (para, span)] {
        store.append_child(parent, child).unwrap();
        oracle.append_child(parent, child).unwrap();
    }
    store.push_root(quote).unwrap();
    oracle.push_root(quote).unwrap();
    store.push_root(tail).unwrap();
    oracle.push_root(tail).unwrap();

    store.insert_before(para, quote).unwrap();
    oracle.insert_before(para, quote).unwrap();

    assert_eq!(store.document_order(), oracle.document_order());
    assert_eq!(store.document_order(), vec![para, span, quote, tail]);
    let nav = Navigator::new(&store);
    assert_eq!(nav.following_leaf_in_document(span), oracle.following_leaf(span));
    assert_eq!(nav.following_leaf_in_document(span), Some(tail));
    assert_eq!(store.verify(), Ok(()));
}
