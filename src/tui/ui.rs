use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Wrap,
    },
    Frame,
};

use crate::flow::FlowState;
use crate::models::{Awards, Field, ScoreResult, LEAGUE_DAYS};
use crate::scoring::{FillPolicy, RuleKey, RuleTable};
use crate::tui::app::{App, FormField, InputMode};

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
        ])
        .split(frame.size());

    let title = Paragraph::new(format!("CWL Bonus Points - {}", app.flow.phase().as_str()))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, chunks[0]);

    match app.flow.state() {
        FlowState::AcquireRoster { .. } => draw_acquire(frame, app, chunks[1]),
        FlowState::ConfigureFillPolicy { raw, policy } => {
            draw_fill_policy(frame, raw.len(), *policy, chunks[1])
        }
        FlowState::CompleteData { .. } => draw_roster(frame, app, chunks[1]),
        FlowState::Results { results, awards, .. } => draw_results(frame, results, awards, chunks[1]),
        FlowState::EditRuleTable { draft } => draw_rules(frame, app, draft, chunks[1]),
    }

    draw_footer(frame, app, chunks[2]);

    if let Some(message) = &app.loading_message {
        draw_loading(frame, message);
    }
}

fn draw_acquire(frame: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let editing = |field: FormField| app.input_mode == InputMode::Editing && app.form_field == field;

    let tag_text = if editing(FormField::ClanTag) { &app.current_input } else { &app.clan_tag };
    let tag = Paragraph::new(tag_text.as_str())
        .style(input_style(editing(FormField::ClanTag)))
        .block(Block::default().borders(Borders::ALL).title("Clan tag [t]"));
    frame.render_widget(tag, rows[0]);

    let key_text = if editing(FormField::ApiKey) {
        "*".repeat(app.current_input.chars().count())
    } else {
        "*".repeat(app.api_key.chars().count())
    };
    let key = Paragraph::new(key_text)
        .style(input_style(editing(FormField::ApiKey)))
        .block(Block::default().borders(Borders::ALL).title("API key [k]"));
    frame.render_widget(key, rows[1]);

    if app.input_mode == InputMode::Editing {
        let row = if app.form_field == FormField::ClanTag { rows[0] } else { rows[1] };
        frame.set_cursor(row.x + app.current_input.chars().count() as u16 + 1, row.y + 1);
    }
}

fn draw_fill_policy(frame: &mut Frame, players: usize, policy: FillPolicy, area: Rect) {
    let checkbox = |on: bool| if on { "[x]" } else { "[ ]" };
    let lines = vec![
        Line::from(format!("Fetched {} players.", players)),
        Line::from(""),
        Line::from(format!(
            "{} [m] Manual entry only (start from an empty table)",
            checkbox(policy.manual_entry_only)
        )),
        Line::from(format!(
            "{} [o] Do not take over opponent town hall levels",
            checkbox(policy.skip_opponent_town_hall)
        )),
    ];
    let body = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Fill policy"));
    frame.render_widget(body, area);
}

fn draw_roster(frame: &mut Frame, app: &App, area: Rect) {
    let Some(roster) = app.flow.state().roster() else {
        return;
    };
    let selected_field = app.selected_field();

    let mut header = vec![Cell::from("Name"), Cell::from("TH")];
    header.extend((1..=LEAGUE_DAYS).map(|d| Cell::from(format!("Day {}", d))));

    let rows: Vec<Row> = roster
        .iter()
        .enumerate()
        .map(|(i, player)| {
            let cell_style = |field: Field| {
                if i == app.selected_player && field == selected_field {
                    Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                }
            };
            let show = |v: Option<i64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());

            let mut cells = vec![
                Cell::from(player.name.clone()),
                Cell::from(show(player.own_town_hall_level)).style(cell_style(Field::OwnTownHall)),
            ];
            for d in 1..=LEAGUE_DAYS {
                let text = format!(
                    "{}/{}/{}",
                    show(player.get(Field::OpponentTownHall(d))),
                    show(player.get(Field::Stars(d))),
                    show(player.get(Field::Destruction(d)))
                );
                let highlighted = selected_field.day() == Some(d);
                cells.push(Cell::from(text).style(if highlighted {
                    cell_style(selected_field)
                } else {
                    Style::default()
                }));
            }
            Row::new(cells)
        })
        .collect();

    let mut widths = vec![Constraint::Length(18), Constraint::Length(4)];
    widths.extend((1..=LEAGUE_DAYS).map(|_| Constraint::Length(10)));

    let title = match app.input_mode {
        InputMode::Editing => format!("Roster - {}: {}_", selected_field.label(), app.current_input),
        InputMode::Normal => format!("Roster (opp TH/stars/%) - {}", selected_field.label()),
    };
    let table = Table::new(rows, widths)
        .header(Row::new(header).style(Style::default().add_modifier(Modifier::BOLD)))
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(table, area);
}

fn draw_results(frame: &mut Frame, results: &[ScoreResult], awards: &Awards, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let mut lines = vec![
        award_line("Top scorer", &awards.top_scorer.winner_name, &awards.top_scorer.label),
        award_line("Underdog", &awards.underdog.winner_name, &awards.underdog.label),
        Line::from(""),
    ];
    lines.extend(results.iter().map(|r| {
        Line::from(vec![
            Span::styled(format!("{:<24}", r.name), Style::default().fg(Color::White)),
            Span::styled(r.total_points.to_string(), Style::default().fg(Color::Yellow)),
        ])
    }));
    let body = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Results"))
        .wrap(Wrap { trim: false });
    frame.render_widget(body, columns[0]);

    frame.render_widget(results_chart(results), columns[1]);
}

/// One horizontal bar per player. Bars cannot go below zero, so negative
/// totals draw empty but keep their number.
fn results_chart(results: &[ScoreResult]) -> BarChart<'static> {
    let bars: Vec<Bar> = results
        .iter()
        .map(|r| {
            Bar::default()
                .value(r.total_points.max(0) as u64)
                .label(Line::from(r.name.clone()))
                .text_value(r.total_points.to_string())
        })
        .collect();

    let top = results.iter().map(|r| r.total_points.max(0) as u64).max().unwrap_or(0);

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title("Points"))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .max(top.max(1))
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    if bars.is_empty() {
        chart
    } else {
        chart.data(BarGroup::default().bars(&bars))
    }
}

fn draw_rules(frame: &mut Frame, app: &App, draft: &RuleTable, area: Rect) {
    let items: Vec<ListItem> = RuleKey::ALL
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let selected = i == app.selected_rule;
            let value = if selected && app.input_mode == InputMode::Editing {
                format!("{}_", app.current_input)
            } else {
                draft.get(*key).to_string()
            };
            let style = if selected {
                Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("{:>5}  {}", value, key.description())).style(style)
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Point system (draft)"));
    frame.render_widget(list, area);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![help_line(app)];

    if let Some(error) = app.flow.state().error() {
        lines.push(Line::from(vec![
            Span::styled("Error: ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::styled(error, Style::default().fg(Color::Red)),
        ]));
    } else if let Some(status) = &app.status_message {
        lines.push(Line::from(Span::styled(status.as_str(), Style::default().fg(Color::Yellow))));
    }

    let footer = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

fn help_line(app: &App) -> Line<'static> {
    let keys: &[(&str, &str)] = if app.input_mode == InputMode::Editing {
        &[("Enter", "confirm"), ("Esc", "cancel")]
    } else {
        match app.flow.state() {
            FlowState::AcquireRoster { .. } => &[
                ("t", "clan tag"),
                ("k", "API key"),
                ("Enter", "fetch"),
                ("r", "point system"),
                ("q", "quit"),
            ],
            FlowState::ConfigureFillPolicy { .. } => {
                &[("m/o", "toggle"), ("Enter", "continue"), ("b", "back"), ("q", "quit")]
            }
            FlowState::CompleteData { .. } => &[
                ("arrows", "move"),
                ("Enter", "edit"),
                ("s", "calculate"),
                ("b", "back"),
                ("q", "quit"),
            ],
            FlowState::Results { .. } => &[
                ("x", "export CSV"),
                ("b", "back to data"),
                ("n", "new run"),
                ("q", "quit"),
            ],
            FlowState::EditRuleTable { .. } => &[
                ("Enter", "edit"),
                ("d", "defaults"),
                ("a", "apply"),
                ("s", "save"),
                ("Esc", "cancel"),
            ],
        }
    };

    let mut spans = Vec::new();
    for (i, (key, action)) in keys.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" | "));
        }
        spans.push(Span::styled(
            key.to_string(),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(format!(" {}", action)));
    }
    Line::from(spans)
}

fn award_line(title: &str, winner: &str, label: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", title), Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(winner.to_string(), Style::default().fg(Color::Green)),
        Span::raw(format!(" ({})", label)),
    ])
}

fn input_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn draw_loading(frame: &mut Frame, message: &str) {
    let area = centered_rect(50, 20, frame.size());
    frame.render_widget(Clear, area);
    let popup = Paragraph::new(message.to_string())
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Please wait"));
    frame.render_widget(popup, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
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
