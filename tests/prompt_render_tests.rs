//! Rendering checks for the prompt widgets against an in-memory backend.

use major_cli::prompt::{render_confirm_ui, render_input_ui, render_select_ui};
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::widgets::ListState;

fn screen(terminal: &Terminal<TestBackend>) -> String {
    let buffer = terminal.backend().buffer();
    let width = buffer.area.width as usize;
    buffer
        .content()
        .chunks(width)
        .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_select_highlights_current_option() {
    let mut terminal = Terminal::new(TestBackend::new(50, 10)).unwrap();
    let options = vec!["Acme".to_string(), "Globex".to_string()];
    let mut state = ListState::default();
    state.select(Some(1));

    terminal
        .draw(|f| render_select_ui(f, "Select an organization", &options, &mut state))
        .unwrap();

    let text = screen(&terminal);
    assert!(text.contains("Select an organization"));
    assert!(text.contains("> Globex"));
    assert!(!text.contains("> Acme"));
    assert!(text.contains("Enter: select"));
}

#[test]
fn test_input_shows_placeholder_then_value() {
    let mut terminal = Terminal::new(TestBackend::new(50, 8)).unwrap();

    terminal
        .draw(|f| render_input_ui(f, "Deploy URL", "Pick a slug", "my-app", "", ""))
        .unwrap();
    let text = screen(&terminal);
    assert!(text.contains("Deploy URL"));
    assert!(text.contains("Pick a slug"));
    assert!(text.contains("my-app"));

    terminal
        .draw(|f| {
            render_input_ui(
                f,
                "Deploy URL",
                "Pick a slug",
                "my-app",
                "Shop",
                "⚠️  slug must be lowercase",
            )
        })
        .unwrap();
    let text = screen(&terminal);
    assert!(text.contains("Shop"));
    assert!(text.contains("slug must be lowercase"));
}

#[test]
fn test_confirm_shows_both_choices() {
    let mut terminal = Terminal::new(TestBackend::new(40, 5)).unwrap();
    terminal
        .draw(|f| render_confirm_ui(f, "Use octocat?", "Detected from SSH", true))
        .unwrap();

    let text = screen(&terminal);
    assert!(text.contains("Use octocat?"));
    assert!(text.contains("Detected from SSH"));
    assert!(text.contains("Yes"));
    assert!(text.contains("No"));
}
