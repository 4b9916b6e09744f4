//! Entity list rendering
//!
//! The controller only talks to a [`ListView`]; [`TerminalView`] draws the
//! panel on stdout.

use std::io::Write;

use tabled::{settings::Style, Table, Tabled};

/// One row of the entity list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub index: usize,
    pub name: String,
    /// Localized state shown to the user
    pub label: String,
}

pub trait ListView {
    /// Replace the list contents; the list length becomes `tiles.len()`
    fn render(&mut self, tiles: &[Tile]);

    /// Replace the status line (server name or API error)
    fn set_status(&mut self, text: &str);
}

#[derive(Tabled)]
struct TileRow<'a> {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Name")]
    name: &'a str,
    #[tabled(rename = "State")]
    state: &'a str,
}

/// Renders the panel as a table on a writer
pub struct TerminalView<W: Write> {
    out: W,
    status: String,
    tiles: Vec<Tile>,
}

impl TerminalView<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            status: String::new(),
            tiles: Vec::new(),
        }
    }

    fn draw(&mut self) {
        let frame = format_panel(&self.status, &self.tiles);
        if let Err(err) = writeln!(self.out, "{frame}").and_then(|()| self.out.flush()) {
            log::warn!("failed to draw panel: {err}");
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ListView for TerminalView<W> {
    fn render(&mut self, tiles: &[Tile]) {
        self.tiles = tiles.to_vec();
        self.draw();
    }

    fn set_status(&mut self, text: &str) {
        self.status = text.to_string();
        self.draw();
    }
}

fn format_panel(status: &str, tiles: &[Tile]) -> String {
    let header = format!("Server: {status}");
    if tiles.is_empty() {
        return format!("{header}\n(no entities)");
    }

    let rows: Vec<TileRow<'_>> = tiles
        .iter()
        .map(|tile| TileRow {
            index: tile.index + 1,
            name: &tile.name,
            state: &tile.label,
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    format!("{header}\n{table}")
}
