use ratatui::Frame;

use crate::app::{App, Mode};
use crate::ui::{render_help, render_summary};

/// A UI screen boundary: one per top-level mode
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Diagram, line table and input; prompts are drawn on top of it
pub struct MeasureScreen;

impl Screen for MeasureScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

pub struct SummaryScreen;

impl Screen for SummaryScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_summary(app, f);
    }
}

pub struct HelpScreen;

impl Screen for HelpScreen {
    fn render(&self, _app: &App, f: &mut Frame) {
        render_help(f);
    }
}

/// Helper to construct the appropriate screen for the current mode
pub fn current_screen(mode: Mode) -> Box<dyn Screen> {
    match mode {
        Mode::Measure | Mode::Prompt(_) => Box::new(MeasureScreen),
        Mode::Summary => Box::new(SummaryScreen),
        Mode::Help => Box::new(HelpScreen),
    }
}
