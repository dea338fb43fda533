//! A read-only terminal view of the driver loop: cycle count, average
//! reward, and a sparkline of recent rewards. No planning or modeling logic
//! lives here; it only renders what [`crate::driver::Driver`] reports.
//!
//! Grounded in the `ratatui`+`crossterm` combination
//! `examples/other_examples/manifests/benbaarber-rl/Cargo.toml` pulls in
//! behind its own optional visualization feature.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Sparkline};
use ratatui::Terminal;

use crate::driver::{CycleReport, Driver};

const HISTORY_LEN: usize = 200;

pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    rewards: VecDeque<u64>,
}

impl Tui {
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        io::stdout().execute(EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        Ok(Tui {
            terminal,
            rewards: VecDeque::with_capacity(HISTORY_LEN),
        })
    }

    /// Drive `driver` one cycle at a time, redrawing after each, until
    /// `terminate_age` is reached or the user presses `q`.
    pub fn run(&mut self, driver: &mut Driver, terminate_age: u64) -> io::Result<()> {
        while driver.agent().age() < terminate_age {
            let report = driver.run_cycle()?;
            self.push_reward(report.reward);
            self.draw(&report)?;
            if event::poll(Duration::from_millis(0))? {
                if let Event::Key(key) = event::read()? {
                    if key.code == KeyCode::Char('q') {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn push_reward(&mut self, reward: u64) {
        if self.rewards.len() == HISTORY_LEN {
            self.rewards.pop_front();
        }
        self.rewards.push_back(reward);
    }

    fn draw(&mut self, report: &CycleReport) -> io::Result<()> {
        let rewards: Vec<u64> = self.rewards.iter().copied().collect();
        let summary = format!(
            "cycle {}   action {}   observation {}   reward {}   average reward {:.4}{}",
            report.cycle,
            report.action,
            report.observation,
            report.reward,
            report.average_reward,
            if report.explored { "   (exploring)" } else { "" }
        );
        self.terminal.draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(3)])
                .split(frame.area());

            let header = Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title("agent"));
            frame.render_widget(header, chunks[0]);

            let sparkline = Sparkline::default()
                .block(Block::default().borders(Borders::ALL).title("recent rewards"))
                .data(&rewards)
                .style(Style::default().fg(Color::Green));
            frame.render_widget(sparkline, chunks[1]);
        })?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = io::stdout().execute(LeaveAlternateScreen);
    }
}
