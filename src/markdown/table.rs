use crate::store::{Alignment, Block, BlockKind, BlockStore, grapheme_len};

const MIN_COLUMN_WIDTH: usize = 5;

/// GFM pipe table. Column count follows the header row; cell text is
/// trimmed and padded to the widest cell of its column.
pub(super) fn render_table(store: &BlockStore, figure: &Block, indent: &str) -> String {
    let rows: Vec<Vec<&Block>> = figure
        .children()
        .iter()
        .filter_map(|row| store.get(*row))
        .map(|row| {
            row.children()
                .iter()
                .filter_map(|cell| store.get(*cell))
                .collect()
        })
        .collect();
    let Some(header) = rows.first() else {
        return String::new();
    };

    let columns: Vec<(usize, Alignment)> = header
        .iter()
        .enumerate()
        .map(|(column, cell)| {
            let width = rows
                .iter()
                .map(|row| cell_text(row, column))
                .map(|text| grapheme_len(text) + 2)
                .fold(MIN_COLUMN_WIDTH, usize::max);
            (width, alignment(cell))
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (index, row) in rows.iter().enumerate() {
        let cells: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(column, (width, _))| pad(cell_text(row, column), *width))
            .collect();
        lines.push(format!("{indent}|{}|", cells.join("|")));
        if index == 0 {
            let rule: Vec<String> = columns
                .iter()
                .map(|(width, align)| separator(*width, *align))
                .collect();
            lines.push(format!("{indent}|{}|", rule.join("|")));
        }
    }
    lines.join("\n") + "\n"
}

fn cell_text<'b>(row: &[&'b Block], column: usize) -> &'b str {
    row.get(column).map_or("", |cell| cell.text.trim())
}

fn alignment(cell: &Block) -> Alignment {
    match cell.kind {
        BlockKind::TableCellHeader { align } | BlockKind::TableCellBody { align } => align,
        _ => Alignment::None,
    }
}

fn pad(text: &str, width: usize) -> String {
    let mut cell = format!(" {text}");
    let used = grapheme_len(&cell);
    cell.push_str(&" ".repeat(width.saturating_sub(used)));
    cell
}

fn separator(width: usize, align: Alignment) -> String {
    let dashes = "-".repeat(width - 2);
    match align {
        Alignment::Left => format!(":{dashes} "),
        Alignment::Center => format!(":{dashes}:"),
        Alignment::Right => format!(" {dashes}:"),
        Alignment::None => format!(" {dashes} "),
    }
}
