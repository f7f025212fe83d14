//! Reusable widgets for the dashboard
//!
//! Every widget borrows what it renders; none of them keep state across frames.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::gate::ConfirmPrompt;
use crate::models::{Org, Repo, RepoActivity, ValidationInfo};

/// Color scheme for the TUI
pub struct ColorScheme {
    pub primary: Color,
    pub secondary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub text: Color,
    pub background: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            primary: Color::Blue,
            secondary: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Magenta,
            text: Color::White,
            background: Color::Black,
            border: Color::Gray,
        }
    }
}

fn panel<'a>(title: impl Into<Line<'a>>, border: Color) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

/// Organization switches, the user's own entry first
pub struct OrgList<'a> {
    orgs: &'a [Org],
    current: &'a str,
    colors: &'a ColorScheme,
}

impl<'a> OrgList<'a> {
    pub fn new(orgs: &'a [Org], current: &'a str, colors: &'a ColorScheme) -> Self {
        Self {
            orgs,
            current,
            colors,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, state: &mut ListState, border: Color) {
        let items: Vec<ListItem> = self
            .orgs
            .iter()
            .map(|org| {
                let (switch, color) = if org.enabled {
                    ("[x] ", self.colors.success)
                } else {
                    ("[ ] ", self.colors.border)
                };
                let mut name_style = Style::default().fg(self.colors.text);
                if org.login == self.current {
                    name_style = name_style.add_modifier(Modifier::BOLD);
                }

                ListItem::new(Line::from(vec![
                    Span::styled(switch, Style::default().fg(color)),
                    Span::styled(org.login.as_str(), name_style),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(panel("Organizations", border))
            .highlight_style(Style::default().bg(self.colors.secondary).fg(Color::Black))
            .highlight_symbol("> ");

        frame.render_stateful_widget(list, area, state);
    }
}

/// Repository switches for the selected organization
pub struct RepoList<'a> {
    repos: &'a [Repo],
    owner: &'a str,
    colors: &'a ColorScheme,
}

impl<'a> RepoList<'a> {
    pub fn new(repos: &'a [Repo], owner: &'a str, colors: &'a ColorScheme) -> Self {
        Self {
            repos,
            owner,
            colors,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, state: &mut ListState, border: Color) {
        let items: Vec<ListItem> = self
            .repos
            .iter()
            .map(|repo| {
                let (icon, color) = match repo.activity {
                    RepoActivity::Active(_) => ("●", self.colors.success),
                    RepoActivity::Activating => ("◐", self.colors.warning),
                    RepoActivity::Deactivating => ("◑", self.colors.warning),
                    RepoActivity::Inactive => ("○", self.colors.border),
                };
                let mut spans = vec![
                    Span::styled(format!("{} ", icon), Style::default().fg(color)),
                    Span::styled(repo.slug.as_str(), Style::default().fg(self.colors.text)),
                ];
                if repo.private {
                    spans.push(Span::styled(" (private)", Style::default().fg(self.colors.info)));
                }

                ListItem::new(Line::from(spans))
            })
            .collect();

        let active = self.repos.iter().filter(|r| r.id().is_some()).count();
        let title = format!("{} - {}/{} active", self.owner, active, self.repos.len());

        let list = List::new(items)
            .block(panel(title, border))
            .highlight_style(
                Style::default()
                    .bg(self.colors.primary)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        frame.render_stateful_widget(list, area, state);
    }
}

/// Log viewer widget, newest entries at the bottom
pub struct LogViewer<'a> {
    logs: &'a [String],
    colors: &'a ColorScheme,
}

impl<'a> LogViewer<'a> {
    pub fn new(logs: &'a [String], colors: &'a ColorScheme) -> Self {
        Self { logs, colors }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let visible_height = area.height.saturating_sub(2) as usize;
        let start_idx = self.logs.len().saturating_sub(visible_height);

        let items: Vec<ListItem> = self.logs[start_idx..]
            .iter()
            .map(|log| {
                let color = if log.contains("ERROR") {
                    self.colors.error
                } else if log.contains("WARN") {
                    self.colors.warning
                } else {
                    self.colors.text
                };
                ListItem::new(Line::from(Span::styled(log.as_str(), Style::default().fg(color))))
            })
            .collect();

        let list = List::new(items).block(panel(format!("Activity ({})", self.logs.len()), self.colors.border));

        frame.render_widget(list, area);
    }
}

/// Yes/no dialog backing the confirmation gate
pub struct ConfirmDialog<'a> {
    prompt: &'a ConfirmPrompt,
    colors: &'a ColorScheme,
}

impl<'a> ConfirmDialog<'a> {
    pub fn new(prompt: &'a ConfirmPrompt, colors: &'a ColorScheme) -> Self {
        Self { prompt, colors }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(50, 30, area);
        frame.render_widget(Clear, popup_area);

        let text = Text::from(vec![
            Line::from(self.prompt.to_string()),
            Line::from(""),
            Line::from(vec![
                Span::styled("[y] ", Style::default().fg(self.colors.success)),
                Span::raw("Confirm   "),
                Span::styled("[n] ", Style::default().fg(self.colors.error)),
                Span::raw("Cancel"),
            ]),
        ]);

        let paragraph = Paragraph::new(text)
            .block(panel(self.prompt.title(), self.colors.warning))
            .style(Style::default().fg(self.colors.text))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });

        frame.render_widget(paragraph, popup_area);
    }
}

/// Outcome of a configuration validation
pub struct ValidationDialog<'a> {
    info: &'a ValidationInfo,
    colors: &'a ColorScheme,
}

impl<'a> ValidationDialog<'a> {
    pub fn new(info: &'a ValidationInfo, colors: &'a ColorScheme) -> Self {
        Self { info, colors }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(70, 70, area);
        frame.render_widget(Clear, popup_area);

        let mut lines = vec![Line::from(self.info.message.as_str()), Line::from("")];
        if let Some(file) = &self.info.file_content {
            lines.push(Line::from(Span::styled(
                "Suggested configuration:",
                Style::default().fg(self.colors.secondary).add_modifier(Modifier::BOLD),
            )));
            lines.extend(file.lines().map(|l| Line::from(Span::styled(l, Style::default().fg(self.colors.info)))));
        }

        let paragraph = Paragraph::new(Text::from(lines))
            .block(panel(format!("Validation: {} (Esc to close)", self.info.slug), self.colors.primary))
            .style(Style::default().fg(self.colors.text))
            .wrap(Wrap { trim: false });

        frame.render_widget(paragraph, popup_area);
    }
}

/// Details of the repository opened with Enter
pub struct RepoDetails<'a> {
    repo: &'a Repo,
    colors: &'a ColorScheme,
}

impl<'a> RepoDetails<'a> {
    pub fn new(repo: &'a Repo, colors: &'a ColorScheme) -> Self {
        Self { repo, colors }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(50, 40, area);
        frame.render_widget(Clear, popup_area);

        let id = self
            .repo
            .id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let text = Text::from(vec![
            Line::from(format!("Owner:    {}", self.repo.owner)),
            Line::from(format!("Name:     {}", self.repo.name)),
            Line::from(format!("Status:   {}", self.repo.activity.label())),
            Line::from(format!("Id:       {}", id)),
            Line::from(format!("Private:  {}", if self.repo.private { "yes" } else { "no" })),
            Line::from(format!("Link:     {}", self.repo.link_url)),
            Line::from(""),
            Line::from(Span::styled(
                "[v] validate   [Space] toggle   [Esc] close",
                Style::default().fg(self.colors.secondary),
            )),
        ]);

        let paragraph = Paragraph::new(text)
            .block(panel(self.repo.slug.as_str(), self.colors.primary))
            .style(Style::default().fg(self.colors.text))
            .wrap(Wrap { trim: true });

        frame.render_widget(paragraph, popup_area);
    }
}

/// Help dialog widget
pub struct HelpDialog<'a> {
    colors: &'a ColorScheme,
    docs_url: Option<&'a str>,
}

impl<'a> HelpDialog<'a> {
    pub fn new(colors: &'a ColorScheme, docs_url: Option<&'a str>) -> Self {
        Self { colors, docs_url }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(60, 70, area);
        frame.render_widget(Clear, popup_area);

        let mut lines = vec![
            Line::from(vec![Span::styled(
                "Keyboard Shortcuts",
                Style::default()
                    .fg(self.colors.primary)
                    .add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from("  ↑/k ↓/j    Move"),
            Line::from("  Tab        Switch panel"),
            Line::from("  Space      Toggle repository / organization"),
            Line::from("  Enter      Show organization / repository details"),
            Line::from("  v          Validate repository configuration"),
            Line::from("  r          Refresh"),
            Line::from("  D D        Delete your account"),
            Line::from("  Esc        Close dialog"),
            Line::from("  ?          Show this help"),
            Line::from("  q          Quit"),
        ];
        if let Some(url) = self.docs_url {
            lines.push(Line::from(""));
            lines.push(Line::from(format!("Documentation: {}", url)));
        }

        let paragraph = Paragraph::new(Text::from(lines))
            .block(panel("Help", self.colors.border))
            .style(Style::default().fg(self.colors.text))
            .alignment(Alignment::Left);

        frame.render_widget(paragraph, popup_area);
    }
}

/// Helper to create a centered rectangle
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
