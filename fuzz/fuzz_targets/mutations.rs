#![no_main]

use libfuzzer_sys::fuzz_target;
use md_blocktree::{BlockId, BlockKind, BlockStore, Navigator, serialize};

const KINDS: usize = 6;
/// Keeps trees shallower than the traversal depth guard.
const MAX_OPS: usize = 256;

fn kind(byte: u8) -> BlockKind {
    match usize::from(byte) % KINDS {
        0 => BlockKind::Paragraph,
        1 => BlockKind::BlockQuote,
        2 => BlockKind::UnorderedList { bullet: '-' },
        3 => BlockKind::ListItem { loose: false },
        4 => BlockKind::TextSpan,
        _ => BlockKind::TableFigure,
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() > MAX_OPS * 3 {
        return;
    }
    let mut store = BlockStore::new();
    let mut ids: Vec<BlockId> = Vec::new();
    for chunk in data.chunks(3) {
        let [op, a, b] = chunk else {
            break;
        };
        let pick = |index: &u8| ids.get(usize::from(*index) % ids.len().max(1)).copied();
        match (op % 9, pick(a), pick(b)) {
            (0, _, _) | (_, None, _) => ids.push(store.create(kind(*a))),
            (1, Some(a), _) => {
                let _ = store.push_root(a);
            }
            (2, Some(a), Some(b)) => {
                let _ = store.insert_before(a, b);
            }
            (3, Some(a), Some(b)) => {
                let _ = store.insert_after(a, b);
            }
            (4, Some(a), Some(b)) => {
                let _ = store.append_child(a, b);
            }
            (5, Some(a), Some(b)) => {
                let _ = store.prepend_child(a, b);
            }
            (6, Some(a), Some(b)) => {
                let _ = store.replace_block(a, b);
            }
            (7, Some(a), _) => {
                let _ = store.remove_block(a);
            }
            (_, Some(a), Some(b)) => {
                let _ = store.remove_range(a, b, *op & 0x80 != 0);
            }
            _ => {}
        }
        store.verify().expect("store invariants hold");
    }

    let nav = Navigator::new(&store);
    for id in store.document_order() {
        let _ = nav.preceding_leaf_in_document(id);
        let _ = nav.following_leaf_in_document(id);
    }
    let _ = serialize(&store);
});
