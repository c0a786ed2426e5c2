use ratatui::prelude::*;
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::color::Color as AppColor;
use crate::pipeline::{Accent, SwatchSet};

fn to_color(c: &AppColor) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

fn hex_to_color(hex: &str) -> Option<AppColor> {
    AppColor::from_hex(hex).ok()
}

/// One accent as a filled panel with its HSL components listed in a corner,
/// mirroring the "default" and "chilled" cards.
pub struct AccentPanel<'a> {
    label: &'a str,
    accent: Option<&'a Accent>,
}

impl<'a> AccentPanel<'a> {
    pub fn new(label: &'a str, accent: Option<&'a Accent>) -> Self {
        Self { label, accent }
    }
}

impl Widget for AccentPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let color = self.accent.and_then(|a| hex_to_color(&a.hex));
        let mut block = Block::bordered().title(self.label);
        if let Some(c) = color {
            block = block.style(Style::default().bg(to_color(&c)).fg(to_color(&c.text_color())));
        }
        let inner = block.inner(area);
        block.render(area, buf);

        let lines = match self.accent {
            Some(accent) => {
                let mut lines = vec![Line::from(accent.hex.clone()).bold()];
                lines.extend(
                    accent
                        .hsl
                        .to_array()
                        .iter()
                        .map(|v| Line::from(format!("{v:.2}"))),
                );
                lines
            }
            None => vec![Line::from("-").dim()],
        };
        Paragraph::new(lines).render(inner, buf);
    }
}

/// The full swatch set as a row of equally sized tiles, each labelled with its
/// role and hex in the swatch's title text color.
pub struct SwatchGrid<'a> {
    swatches: Option<&'a SwatchSet>,
}

impl<'a> SwatchGrid<'a> {
    pub fn new(swatches: Option<&'a SwatchSet>) -> Self {
        Self { swatches }
    }
}

impl Widget for SwatchGrid<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::bordered().title("Swatches");
        let inner = block.inner(area);
        block.render(area, buf);

        let Some(swatches) = self.swatches.filter(|s| !s.is_empty()) else {
            Paragraph::new(Line::from("  no swatches").dim()).render(inner, buf);
            return;
        };

        let cells = Layout::horizontal(vec![Constraint::Fill(1); swatches.len()]).split(inner);
        for (swatch, cell) in swatches.iter().zip(cells.iter()) {
            let style = Style::default()
                .bg(to_color(&swatch.color))
                .fg(to_color(&swatch.title_text_color));
            Paragraph::new(vec![
                Line::from(swatch.name.clone()).bold(),
                Line::from(swatch.hex()),
            ])
            .alignment(Alignment::Center)
            .style(style)
            .render(*cell, buf);
        }
    }
}

/// Recent chill colors, newest on the right.
pub struct HistoryStrip<'a> {
    history: &'a [String],
}

impl<'a> HistoryStrip<'a> {
    pub fn new(history: &'a [String]) -> Self {
        Self { history }
    }
}

const HISTORY_CELL_WIDTH: usize = 3;

impl Widget for HistoryStrip<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::bordered().title(format!("History ({})", self.history.len()));
        let inner = block.inner(area);
        block.render(area, buf);

        let fits = (inner.width as usize / HISTORY_CELL_WIDTH).max(1);
        let start = self.history.len().saturating_sub(fits);
        let spans: Vec<Span> = self.history[start..]
            .iter()
            .filter_map(|hex| hex_to_color(hex))
            .map(|c| Span::styled(" ".repeat(HISTORY_CELL_WIDTH), Style::default().bg(to_color(&c))))
            .collect();
        Paragraph::new(Line::from(spans)).render(inner, buf);
    }
}
