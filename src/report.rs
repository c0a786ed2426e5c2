use crate::pipeline::{Accent, PipelineState};

/// Render the published state as a plain-text report.
pub fn render_text(state: &PipelineState) -> String {
    let mut out = String::new();
    out.push_str(&format!("image    {}\n", state.image_address));
    out.push_str(&accent_line("default", state.accent_default.as_ref()));
    out.push_str(&accent_line("chilled", state.accent_chilled.as_ref()));

    if let Some(swatches) = &state.swatch_set {
        out.push_str("swatches\n");
        for swatch in swatches.iter() {
            out.push_str(&format!(
                "  {:<13} {}  text {}  population {}\n",
                swatch.name,
                swatch.hex(),
                swatch.title_text_color.to_hex(),
                swatch.population
            ));
        }
    }

    out.push_str(&format!("history  {} entries", state.history.len()));
    if let Some(last) = state.history.last() {
        out.push_str(&format!(", latest {last}"));
    }
    out.push('\n');

    if let Some(error) = &state.last_error {
        out.push_str(&format!("error    {error}\n"));
    }
    out
}

fn accent_line(label: &str, accent: Option<&Accent>) -> String {
    match accent {
        Some(accent) => format!("{label:<8} {}  hsl {}\n", accent.hex, accent.hsl),
        None => format!("{label:<8} -\n"),
    }
}
