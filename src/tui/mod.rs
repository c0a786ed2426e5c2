mod fetch;
pub mod widgets;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Paragraph};
use ratatui::{DefaultTerminal, TerminalOptions, Viewport};

use crate::pipeline::{ImageLoader, LoadRequest, Orchestrator, Phase, PipelineState, SwatchSource};
use crate::storage::KeyValueStore;

use fetch::Fetcher;
use widgets::{AccentPanel, HistoryStrip, SwatchGrid};

const PREVIEW_HEIGHT: u16 = 15;
const TICK: Duration = Duration::from_millis(50);

/// Print the accents, swatches and history inline, below the cursor.
pub fn preview(state: &PipelineState) -> Result<()> {
    let mut terminal = ratatui::try_init_with_options(TerminalOptions {
        viewport: Viewport::Inline(PREVIEW_HEIGHT),
    })
    .context("failed to initialize terminal")?;
    let drawn = terminal.draw(|frame| {
        let area = frame.area();
        draw_palette(frame, area, state);
    });
    ratatui::try_restore().context("failed to restore terminal")?;
    drawn.context("failed to draw preview")?;
    println!();
    Ok(())
}

/// Launch the interactive TUI, starting with `initial`.
///
/// Images load on background threads; extraction runs on the UI thread once
/// an image arrives.
pub fn run<Src, St, L>(
    orchestrator: &mut Orchestrator<Src, St>,
    loader: Arc<L>,
    initial: LoadRequest,
) -> Result<()>
where
    Src: SwatchSource,
    St: KeyValueStore,
    L: ImageLoader + Send + Sync + 'static,
{
    let fetcher = Fetcher::new(loader);
    fetcher.spawn(initial);
    let mut terminal = ratatui::try_init().context("failed to initialize terminal")?;
    let result = event_loop(&mut terminal, orchestrator, &fetcher);
    ratatui::try_restore().context("failed to restore terminal")?;
    result
}

fn event_loop<Src, St, L>(
    terminal: &mut DefaultTerminal,
    orchestrator: &mut Orchestrator<Src, St>,
    fetcher: &Fetcher<L>,
) -> Result<()>
where
    Src: SwatchSource,
    St: KeyValueStore,
    L: ImageLoader + Send + Sync + 'static,
{
    let mut status: Option<String> = None;

    loop {
        while let Some((token, outcome)) = fetcher.try_next() {
            if let Some(retry) = orchestrator.on_image_loaded(token, outcome) {
                fetcher.spawn(retry);
            }
            if let Some(notification) = orchestrator.take_notifications().pop() {
                status = Some(notification.to_string());
            }
        }

        terminal.draw(|frame| {
            draw_app(
                frame,
                orchestrator.state(),
                orchestrator.query(),
                status.as_deref(),
            )
        })?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Esc => return Ok(()),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
            KeyCode::Enter => {
                status = None;
                fetcher.spawn(orchestrator.submit_query());
            }
            KeyCode::Backspace => {
                let mut query = orchestrator.query().to_string();
                query.pop();
                orchestrator.set_query(query);
            }
            KeyCode::Char(c) => {
                let mut query = orchestrator.query().to_string();
                query.push(c);
                orchestrator.set_query(query);
            }
            _ => {}
        }
    }
}

fn draw_app(frame: &mut Frame, state: &PipelineState, query: &str, status: Option<&str>) {
    let [input_area, palette_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(PREVIEW_HEIGHT),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let input = Paragraph::new(Line::from(vec![
        Span::raw(query.to_string()),
        Span::raw("_").slow_blink(),
    ]))
    .block(Block::bordered().title("Image url... (Enter to fetch, Esc to quit)"));
    frame.render_widget(input, input_area);

    draw_palette(frame, palette_area, state);

    let status_line = match (status, state.phase) {
        (Some(message), _) => Line::from(message.to_string()).red().bold(),
        (None, Phase::Loading) => Line::from(format!("loading {}", state.image_address)).dim(),
        (None, _) => match &state.last_error {
            Some(error) => Line::from(error.clone()).yellow(),
            None => Line::from(state.image_address.clone()).dim(),
        },
    };
    frame.render_widget(Paragraph::new(status_line), status_area);
}

fn draw_palette(frame: &mut Frame, area: Rect, state: &PipelineState) {
    let [accents_area, swatches_area, history_area] = Layout::vertical([
        Constraint::Length(8),
        Constraint::Length(4),
        Constraint::Length(3),
    ])
    .areas(area);

    let [image_area, default_area, chilled_area] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Fill(1),
    ])
    .areas(accents_area);

    let image_info = Paragraph::new(vec![
        Line::from(state.image_address.clone()),
        Line::from(format!("{:?}", state.phase).to_lowercase()).dim(),
    ])
    .block(Block::bordered().title("Image"));
    frame.render_widget(image_info, image_area);
    frame.render_widget(
        AccentPanel::new("default", state.accent_default.as_ref()),
        default_area,
    );
    frame.render_widget(
        AccentPanel::new("chilled", state.accent_chilled.as_ref()),
        chilled_area,
    );
    frame.render_widget(SwatchGrid::new(state.swatch_set.as_ref()), swatches_area);
    frame.render_widget(HistoryStrip::new(&state.history), history_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    #[test]
    fn app_shows_query_and_notification() {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let state = PipelineState {
            image_address: "https://picsum.photos/500/500".to_string(),
            phase: Phase::Error,
            ..PipelineState::default()
        };
        terminal
            .draw(|frame| {
                draw_app(
                    frame,
                    &state,
                    "https://bad.example",
                    Some("URL is not valid image"),
                )
            })
            .unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("https://bad.example"));
        assert!(text.contains("URL is not valid image"));
        assert!(text.contains("chilled"));
    }
}
