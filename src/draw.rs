use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Paragraph, Tabs};
use tui::{Frame, Terminal};
use tui_logger::TuiLoggerWidget;

use crate::app::{App, MenuItem};
use crate::components::bracket::{
    BracketGrid, BracketView, CONNECTOR_WIDTH, format_participant_line, visible_scroll,
};
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use tourney_api::{Match, MatchStatus, ParticipantSlot};

static TABS: &[&str; 4] = &["Tournaments", "Bracket", "Matches", "Chat"];

const HELP_TEXT: &str = "\
Global
  1-4        switch tab
  ?          help (Esc to go back)
  f          toggle full screen
  \"          toggle log pane
  q, Ctrl-C  quit

Tournaments
  j/k        move selection
  Enter      open tournament
  r          reload list

Bracket
  h/l        previous/next round
  j/k        previous/next match
  r          refresh matches

Matches
  j/k        move selection
  r          refresh matches

Chat
  i, Enter   start typing (Enter sends, Esc cancels)
  j/k        scroll history";

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);

    let result = terminal.draw(|f| {
        layout.update(f.area(), app.settings.full_screen, app.state.show_logs);

        if !app.settings.full_screen {
            draw_tabs(f, layout.tab_bar, app);
        }

        match app.state.active_tab {
            MenuItem::Tournaments => draw_tournaments(f, layout.main, app),
            MenuItem::Bracket => draw_bracket(f, layout.main, app),
            MenuItem::Matches => draw_matches(f, layout.main, app),
            MenuItem::Chat => draw_chat(f, layout.main, app),
            MenuItem::Help => draw_help(f, layout.main),
        }

        if app.state.show_logs {
            draw_logs(f, layout.logs);
        }

        draw_status(f, layout.status, app, loading);
    });
    if let Err(e) = result {
        log::error!("draw failed: {e}");
    }
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_tabs(f: &mut Frame, tab_bar: [Rect; 2], app: &App) {
    let style = Style::default().fg(Color::White);
    let border_type = BorderType::Rounded;

    let tab_index = match app.state.active_tab {
        MenuItem::Tournaments => 0,
        MenuItem::Bracket => 1,
        MenuItem::Matches => 2,
        MenuItem::Chat => 3,
        MenuItem::Help => tab_index_of(app.state.previous_tab),
    };

    let titles: Vec<Line> = TABS.iter().map(|t| Line::from(*t)).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .highlight_style(Style::default().add_modifier(Modifier::UNDERLINED))
        .select(tab_index)
        .style(style);
    f.render_widget(tabs, tab_bar[0]);

    let help = Paragraph::new("Help: ? ")
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .style(style);
    f.render_widget(help, tab_bar[1]);
}

fn tab_index_of(tab: MenuItem) -> usize {
    match tab {
        MenuItem::Bracket => 1,
        MenuItem::Matches => 2,
        MenuItem::Chat => 3,
        MenuItem::Tournaments | MenuItem::Help => 0,
    }
}

fn draw_tournaments(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Tournaments ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let list = &app.state.tournaments;
    if list.items.is_empty() {
        let msg = if !list.loaded {
            "Loading tournaments...".to_string()
        } else if let Some(err) = app.state.last_error.as_deref() {
            format!("No tournaments available:\n{err}")
        } else {
            "No tournaments available. Press r to reload.".to_string()
        };
        f.render_widget(
            Paragraph::new(msg)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            inner,
        );
        return;
    }

    let mut lines = Vec::with_capacity(list.items.len() + 2);
    lines.push(Line::from(Span::styled(
        "j/k to move, Enter to open, r to reload",
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));

    for (idx, t) in list.items.iter().enumerate() {
        let selected = idx == list.selected;
        let marker = if selected { ">" } else { " " };
        let start = t
            .start_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());
        let sport = t.sport.as_deref().unwrap_or("-");
        let status = t.status.as_deref().unwrap_or("");
        let style = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(Span::styled(
            format!("{marker} {start}  {:<32} {sport:<12} {status}", t.name),
            style,
        )));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_bracket(f: &mut Frame, area: Rect, app: &mut App) {
    let block = default_border(Color::White).title(" Bracket ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(view) = app.state.bracket.view.as_ref() else {
        draw_centered_note(f, inner, "No tournament open. Pick one on the Tournaments tab.");
        return;
    };

    let [header, key_legend, content] =
        Layout::vertical([Constraint::Length(1), Constraint::Length(1), Constraint::Fill(1)]).areas(inner);

    let type_label = app
        .state
        .bracket
        .type_group()
        .map(|g| g.label().to_string())
        .unwrap_or_else(|| "no bracket".to_string());
    let total_rounds = app.state.bracket.rounds.len();
    let round_label = app
        .state
        .bracket
        .rounds
        .rounds
        .get(app.state.bracket.selected_round)
        .map(|r| r.label(total_rounds))
        .unwrap_or_default();
    f.render_widget(
        Paragraph::new(format!("{} | {} | {}", view.tournament.name, type_label, round_label)),
        header,
    );

    if let Some(group) = app.state.bracket.type_group()
        && !group.is_olympic()
    {
        draw_centered_note(
            f,
            content,
            &format!("{} tournaments have no elimination tree. See the Matches tab.", group.label()),
        );
        return;
    }
    if app.state.bracket.rounds.is_empty() {
        draw_centered_note(f, content, "Bracket unavailable");
        return;
    }

    f.render_widget(
        Paragraph::new("Keys: h/l=round  j/k=match  r=refresh  ?=help  q=quit")
            .style(Style::default().fg(Color::DarkGray)),
        key_legend,
    );

    let mut bracket_area = content;
    if !app.state.bracket.rounds.unplaced.is_empty() {
        let [warning, rest] = Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(content);
        f.render_widget(
            Paragraph::new(format!(
                "{} match(es) could not be placed in the bracket",
                app.state.bracket.rounds.unplaced.len()
            ))
            .style(Style::default().fg(Color::Yellow)),
            warning,
        );
        bracket_area = rest;
    }

    let mut detail_area = None;
    if bracket_area.width >= 100 {
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(72), Constraint::Percentage(28)]).areas(bracket_area);
        bracket_area = left;
        detail_area = Some(right);
    }

    let [labels_area, grid_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(bracket_area);

    let bracket = &mut app.state.bracket;
    let sizes: Vec<usize> = bracket.rounds.rounds.iter().map(|r| r.matches.len()).collect();
    let grid = BracketGrid::compute(&sizes, grid_area.width, bracket.selected_round);

    if let Some(cell) = grid.cell(bracket.selected_round, bracket.selected_match) {
        bracket.scroll_offset = visible_scroll(cell.center_row, bracket.scroll_offset, grid_area.height);
    }

    let stride = grid.cell_width + CONNECTOR_WIDTH;
    for column in 0..grid.visible_rounds {
        let round = grid.first_round + column;
        if !grid.is_visible(round) {
            break;
        }
        let Some(r) = bracket.rounds.rounds.get(round) else {
            continue;
        };
        let x = labels_area.x + stride * column as u16;
        if x >= labels_area.x + labels_area.width {
            break;
        }
        let style = if round == bracket.selected_round {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let width = grid.cell_width.min(labels_area.x + labels_area.width - x);
        f.render_widget(
            Paragraph::new(r.label(total_rounds)).style(style),
            Rect::new(x, labels_area.y, width, 1),
        );
    }

    f.render_widget(
        BracketView {
            rounds: &bracket.rounds.rounds,
            grid: &grid,
            selected_round: bracket.selected_round,
            selected_match: bracket.selected_match,
            scroll_offset: bracket.scroll_offset,
        },
        grid_area,
    );

    if let Some(detail) = detail_area {
        draw_match_detail(f, detail, app.state.bracket.selected_match());
    }
}

fn draw_match_detail(f: &mut Frame, area: Rect, selected: Option<&Match>) {
    let block = default_border(Color::DarkGray).title(" Match ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(m) = selected else {
        draw_centered_note(f, inner, "No match selected");
        return;
    };

    let label = Style::default().fg(Color::Gray);
    let mut lines = vec![
        Line::from(vec![Span::styled("id      ", label), Span::raw(m.id.as_str())]),
        Line::from(vec![Span::styled("status  ", label), Span::raw(m.status.label())]),
        Line::from(vec![
            Span::styled("start   ", label),
            Span::raw(
                m.planned_start_time
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "unscheduled".to_string()),
            ),
        ]),
        Line::from(""),
    ];

    let width = inner.width as usize;
    for slot in 0..2 {
        lines.push(Line::from(format_participant_line(m, slot, width)));
    }

    if let Some(winner) = m.winner_slot() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("winner: {}", winner.participant.display_name()),
            Style::default().fg(Color::Green),
        )));
    }

    if !m.parent_matches.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("fed by", label)));
        for parent in &m.parent_matches {
            lines.push(Line::from(format!("  {parent}")));
        }
    }

    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_matches(f: &mut Frame, area: Rect, app: &mut App) {
    let block = default_border(Color::White).title(" Matches ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let matches = app.state.bracket.match_list();
    if matches.is_empty() {
        let msg = if app.state.bracket.view.is_none() {
            "No tournament open. Pick one on the Tournaments tab."
        } else {
            "No matches in this tournament"
        };
        draw_centered_note(f, inner, msg);
        return;
    }

    let header_rows = 2u16;
    let visible = inner.height.saturating_sub(header_rows);
    let list = &mut app.state.match_list;
    list.selected = list.selected.min(matches.len() - 1);
    let selected_row = list.selected as u16;
    if selected_row < list.scroll_offset {
        list.scroll_offset = selected_row;
    } else if visible > 0 && selected_row >= list.scroll_offset + visible {
        list.scroll_offset = selected_row + 1 - visible;
    }

    let mut lines = Vec::with_capacity(visible as usize + 2);
    lines.push(Line::from(Span::styled(
        "j/k to move, r to refresh",
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));

    for (idx, m) in matches
        .iter()
        .enumerate()
        .skip(list.scroll_offset as usize)
        .take(visible as usize)
    {
        let marker = if idx == list.selected { ">" } else { " " };
        let status = match m.status {
            MatchStatus::Prepared => m
                .planned_start_time
                .map(|t| t.format("%m/%d %H:%M").to_string())
                .unwrap_or_else(|| "SCHEDULED".to_string()),
            status => status.label().to_uppercase(),
        };
        let top = format_slot(m.participants.first(), m);
        let bot = format_slot(m.participants.get(1), m);
        let style = match (idx == list.selected, m.status) {
            (true, _) => Style::default().fg(Color::Yellow),
            (false, MatchStatus::InProgress) => Style::default().fg(Color::Green),
            (false, MatchStatus::Cancelled) => Style::default().fg(Color::DarkGray),
            (false, _) => Style::default().fg(Color::White),
        };
        lines.push(Line::from(Span::styled(
            format!("{marker} {top} vs {bot}  [{status}]"),
            style,
        )));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

fn format_slot(slot: Option<&ParticipantSlot>, m: &Match) -> String {
    let Some(slot) = slot else {
        return "TBD".to_string();
    };
    let name = slot.participant.display_name();
    let score = slot.score.map_or("--".to_string(), |s| s.to_string());
    let winner = if m.winner.as_deref() == Some(slot.participant.id()) { "*" } else { "" };
    format!("{winner}{name} {score}")
}

fn draw_chat(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Chat ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.width == 0 || inner.height < 3 {
        return;
    }

    let [messages_area, input_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(3)]).areas(inner);

    let chat = &app.state.chat;
    let mut lines = Vec::new();
    let status = if chat.connected { "online" } else { "offline" };
    lines.push(Line::from(vec![
        Span::styled("room ", Style::default().fg(Color::DarkGray)),
        Span::styled(chat.room.as_str(), Style::default().fg(Color::Gray)),
        Span::styled("  as ", Style::default().fg(Color::DarkGray)),
        Span::styled(chat.username.as_str(), Style::default().fg(Color::Gray)),
        Span::styled("  status ", Style::default().fg(Color::DarkGray)),
        Span::styled(status, Style::default().fg(if chat.connected { Color::Green } else { Color::Red })),
    ]));
    lines.push(Line::from(""));

    for msg in &chat.messages {
        let prefix = format!("[{}] {}: ", msg.timestamp, msg.author);
        let style = if msg.is_system {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };
        let body_width = messages_area
            .width
            .saturating_sub(prefix.chars().count() as u16)
            .max(8) as usize;
        let clipped: String = msg.body.chars().take(body_width).collect();
        lines.push(Line::from(vec![Span::styled(prefix, style), Span::styled(clipped, style)]));
    }

    let visible = messages_area.height as usize;
    let total = lines.len();
    let offset = chat.scroll_offset as usize;
    let end = total.saturating_sub(offset);
    let start = end.saturating_sub(visible);
    let window = if start < end { lines[start..end].to_vec() } else { Vec::new() };
    f.render_widget(Paragraph::new(window), messages_area);

    let mode = if chat.composing { "typing" } else { "idle" };
    let input = if chat.composing {
        format!("> {}_", chat.input)
    } else {
        "Press Enter/i to type. Esc cancel. j/k scroll.".to_string()
    };
    let input_style = if chat.composing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input_block = default_border(Color::DarkGray).title(format!(" {mode} "));
    let input_inner = input_block.inner(input_area);
    f.render_widget(input_block, input_area);
    f.render_widget(Paragraph::new(input).style(input_style), input_inner);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let block = default_border(Color::DarkGray).title(" Help ");
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(Paragraph::new(HELP_TEXT).style(Style::default().fg(Color::Gray)), inner);
}

fn draw_logs(f: &mut Frame, area: Rect) {
    let logger = TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Logs "))
        .style_error(Style::default().fg(Color::Red))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_info(Style::default().fg(Color::Cyan))
        .style_debug(Style::default().fg(Color::DarkGray));
    f.render_widget(logger, area);
}

fn draw_status(f: &mut Frame, area: Rect, app: &App, loading: LoadingState) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let user = app.session.display_name().unwrap_or("anonymous");
    let mut spans = vec![Span::styled(format!(" {user} "), Style::default().fg(Color::DarkGray))];
    if let Some(err) = app.state.last_error.as_deref() {
        spans.push(Span::styled(format!("| {err}"), Style::default().fg(Color::Red)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);

    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner_area = Rect::new(area.x + area.width.saturating_sub(2), area.y, 1, 1);
    f.render_widget(Paragraph::new(loading.spinner_char.to_string()).style(style), spinner_area);
}

fn draw_centered_note(f: &mut Frame, area: Rect, msg: &str) {
    f.render_widget(
        Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        area,
    );
}
