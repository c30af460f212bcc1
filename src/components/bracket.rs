use tourney_api::bracket::slot_offset;
use tourney_api::{Match, MatchStatus, ParticipantSlot, Round};
use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Color, Modifier, Style};
use tui::widgets::Widget;

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

/// Rows per match cell: top participant, status line, bottom participant.
pub const GAME_HEIGHT: u16 = 3;

/// Distance between sibling cells in the leftmost visible column. Doubles
/// with every column to the right.
pub const BASE_GAP: u16 = GAME_HEIGHT + 1;

/// Width of the connector zone drawn between adjacent round columns.
pub const CONNECTOR_WIDTH: u16 = 3;

const CELL_W_FULL: u16 = 24;
const CELL_W_MIN: u16 = 16;

// ---------------------------------------------------------------------------
// GameCell: pre-computed position for one match
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GameCell {
    /// Row of the status line (center of the 3-row cell), relative to the
    /// bracket origin. Not scroll-adjusted.
    pub center_row: u16,
    /// Starting x-column within the grid (origin-relative).
    pub col: u16,
    pub round: usize,
    pub match_idx: usize,
}

// ---------------------------------------------------------------------------
// BracketGrid: layout engine for the visible window of rounds
// ---------------------------------------------------------------------------

/// Cell positions for the rounds that fit the terminal width.
///
/// Columns left → right: first_round | conn | first_round + 1 | conn | ...
/// Vertical spacing is `BASE_GAP * 2^column`, so each cell sits at the
/// midpoint of the two cells feeding it.
#[derive(Debug, Clone)]
pub struct BracketGrid {
    pub cells: Vec<GameCell>,
    pub first_round: usize,
    pub visible_rounds: usize,
    pub cell_width: u16,
    pub total_height: u16,
}

impl BracketGrid {
    /// `round_sizes[i]` is the match count of round `i`. The window of
    /// visible rounds always contains `focus_round`.
    pub fn compute(round_sizes: &[usize], width: u16, focus_round: usize) -> Self {
        if round_sizes.is_empty() {
            return Self { cells: Vec::new(), first_round: 0, visible_rounds: 0, cell_width: 0, total_height: 0 };
        }

        let fit = ((width + CONNECTOR_WIDTH) / (CELL_W_MIN + CONNECTOR_WIDTH)).max(1) as usize;
        let visible_rounds = fit.min(round_sizes.len());
        let focus_round = focus_round.min(round_sizes.len() - 1);
        let first_round = (focus_round + 1).saturating_sub(visible_rounds);

        let connector_total = CONNECTOR_WIDTH * (visible_rounds as u16 - 1);
        let cell_width = (width.saturating_sub(connector_total) / visible_rounds as u16)
            .clamp(1, CELL_W_FULL);
        let stride = cell_width + CONNECTOR_WIDTH;

        let mut cells = Vec::new();
        let mut total_height = 0;
        for column in 0..visible_rounds {
            let round = first_round + column;
            for match_idx in 0..round_sizes[round] {
                let center_row = slot_offset(BASE_GAP, column, match_idx);
                total_height = total_height.max(center_row.saturating_add(2));
                cells.push(GameCell { center_row, col: stride * column as u16, round, match_idx });
            }
        }

        Self { cells, first_round, visible_rounds, cell_width, total_height }
    }

    pub fn cell(&self, round: usize, match_idx: usize) -> Option<&GameCell> {
        self.cells.iter().find(|c| c.round == round && c.match_idx == match_idx)
    }

    pub fn is_visible(&self, round: usize) -> bool {
        round >= self.first_round && round < self.first_round + self.visible_rounds
    }
}

/// Scroll offset that keeps the 3-row cell centered at `center_row` inside a
/// viewport of `height` rows.
pub fn visible_scroll(center_row: u16, current: u16, height: u16) -> u16 {
    let top = center_row.saturating_sub(1);
    let bottom = center_row.saturating_add(1);
    if top < current {
        top
    } else if height > 0 && bottom >= current.saturating_add(height) {
        bottom.saturating_add(1).saturating_sub(height)
    } else {
        current
    }
}

// ---------------------------------------------------------------------------
// BracketView widget
// ---------------------------------------------------------------------------

pub struct BracketView<'a> {
    pub rounds: &'a [Round],
    /// Pre-computed layout. Rebuild on resize or when the focus round changes.
    pub grid: &'a BracketGrid,
    pub selected_round: usize,
    pub selected_match: usize,
    pub scroll_offset: u16,
}

impl Widget for BracketView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = self.grid.cell_width as usize;

        for cell in &self.grid.cells {
            let Some(m) = self.rounds.get(cell.round).and_then(|r| r.matches.get(cell.match_idx)) else {
                continue;
            };
            let x = area.x + cell.col;
            if x >= area.x + area.width {
                continue;
            }
            let selected = cell.round == self.selected_round && cell.match_idx == self.selected_match;
            let base = match_style(m, selected);

            let rows = [
                (cell.center_row.saturating_sub(1), format_participant_line(m, 0, width)),
                (cell.center_row, format_status_line(m, width)),
                (cell.center_row.saturating_add(1), format_participant_line(m, 1, width)),
            ];
            for (i, (row, text)) in rows.into_iter().enumerate() {
                if let Some(y) = screen_y(row, self.scroll_offset, area) {
                    let style = if i == 1 { base.add_modifier(Modifier::DIM) } else { base };
                    let max = (area.x + area.width - x) as usize;
                    buf.set_stringn(x, y, text, max.min(width), style);
                }
            }
        }

        // Connectors from each match back to the matches feeding it.
        for cell in self.grid.cells.iter().filter(|c| c.round > self.grid.first_round) {
            let Some(m) = self.rounds.get(cell.round).and_then(|r| r.matches.get(cell.match_idx)) else {
                continue;
            };
            let Some(previous) = self.rounds.get(cell.round - 1) else {
                continue;
            };
            let child_rows: Vec<u16> = previous
                .matches
                .iter()
                .enumerate()
                .filter(|(_, child)| m.parent_matches.contains(&child.id))
                .filter_map(|(idx, _)| self.grid.cell(cell.round - 1, idx))
                .map(|c| c.center_row)
                .collect();
            if child_rows.is_empty() {
                continue;
            }
            let conn_x = area.x + cell.col - CONNECTOR_WIDTH;
            draw_connector(&child_rows, cell.center_row, conn_x, area, self.scroll_offset, buf);
        }
    }
}

fn match_style(m: &Match, selected: bool) -> Style {
    let style = match m.status {
        MatchStatus::InProgress => Style::default().fg(Color::Green),
        MatchStatus::Finished => Style::default().fg(Color::White),
        MatchStatus::Cancelled => Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT),
        MatchStatus::Prepared => Style::default().fg(Color::Gray),
    };
    if selected { style.add_modifier(Modifier::REVERSED) } else { style }
}

fn screen_y(row: u16, scroll: u16, area: Rect) -> Option<u16> {
    let rel = row.checked_sub(scroll)?;
    (rel < area.height).then_some(area.y + rel)
}

/// Format one participant line: `"*[name            ] [score]"`.
/// The leading marker is `*` for the recorded winner.
pub fn format_participant_line(m: &Match, slot_idx: usize, width: usize) -> String {
    let slot: Option<&ParticipantSlot> = m.participants.get(slot_idx);
    let is_winner = slot.is_some_and(|s| m.winner.as_deref() == Some(s.participant.id()));
    let marker = if is_winner { '*' } else { ' ' };
    let name = slot.map(|s| s.participant.display_name()).unwrap_or("TBD");
    let score = match slot.and_then(|s| s.score) {
        Some(s) => format!("{s:>3}"),
        None => "   ".to_string(),
    };
    // 1 marker + name + 1 space + 3 score
    let name_w = width.saturating_sub(5);
    let name_trunc: String = name.chars().take(name_w).collect();
    let line = format!("{marker}{name_trunc:<name_w$} {score}");
    line.chars().take(width).collect()
}

/// Format the center status row.
pub fn format_status_line(m: &Match, width: usize) -> String {
    let raw = match m.status {
        MatchStatus::Prepared => m
            .planned_start_time
            .map(|t| format!(" {}", t.format("%b %d %H:%M")))
            .unwrap_or_else(|| " Scheduled".to_string()),
        status => format!(" {}", status.label()),
    };
    let padded = format!("{raw:<width$}");
    padded.chars().take(width).collect()
}

/// Box-drawing connector between a match and the matches feeding it.
///
/// ```text
///  child_top  ─┐
///              │
///              ├─ parent
///              │
///  child_bot  ─┘
/// ```
fn draw_connector(child_rows: &[u16], parent_row: u16, conn_x: u16, area: Rect, scroll: u16, buf: &mut Buffer) {
    let style = Style::default().fg(Color::DarkGray);
    let col_a = conn_x;
    let col_b = conn_x.saturating_add(1);
    let col_c = conn_x.saturating_add(2);
    let limit_x = area.x + area.width;

    let mut put = |x: u16, row: u16, ch: char| {
        if x < limit_x
            && let Some(sy) = screen_y(row, scroll, area)
            && let Some(cell) = buf.cell_mut((x, sy))
        {
            cell.set_char(ch);
            cell.set_style(style);
        }
    };

    let top = child_rows.iter().copied().chain([parent_row]).min().unwrap_or(parent_row);
    let bottom = child_rows.iter().copied().chain([parent_row]).max().unwrap_or(parent_row);

    for row in top..=bottom {
        put(col_b, row, '│');
    }
    for &row in child_rows {
        put(col_a, row, '─');
        let joint = if top == bottom {
            '─'
        } else if row == top {
            '┐'
        } else if row == bottom {
            '┘'
        } else {
            '┤'
        };
        put(col_b, row, joint);
    }
    let parent_joint = if top == bottom {
        '─'
    } else if parent_row == top {
        '┌'
    } else if parent_row == bottom {
        '└'
    } else if child_rows.contains(&parent_row) {
        '┼'
    } else {
        '├'
    };
    put(col_b, parent_row, parent_joint);
    put(col_c, parent_row, '─');
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tourney_api::{Participant, ParticipantRef};

    fn centers(grid: &BracketGrid, round: usize) -> Vec<u16> {
        grid.cells.iter().filter(|c| c.round == round).map(|c| c.center_row).collect()
    }

    #[test]
    fn cell_count_matches_round_sizes() {
        let grid = BracketGrid::compute(&[8, 4, 2, 1], 200, 0);
        assert_eq!(grid.cells.len(), 15);
        assert_eq!(grid.visible_rounds, 4);
    }

    #[test]
    fn centers_follow_doubling_gap() {
        let grid = BracketGrid::compute(&[8, 4, 2, 1], 200, 0);
        assert_eq!(centers(&grid, 0), vec![1, 5, 9, 13, 17, 21, 25, 29]);
        assert_eq!(centers(&grid, 1), vec![3, 11, 19, 27]);
        assert_eq!(centers(&grid, 2), vec![7, 23]);
        assert_eq!(centers(&grid, 3), vec![15]);
        assert_eq!(grid.total_height, 31);
    }

    #[test]
    fn parent_center_is_midpoint_of_children() {
        let grid = BracketGrid::compute(&[8, 4, 2, 1], 200, 0);
        for round in 0..3usize {
            let children = centers(&grid, round);
            let parents = centers(&grid, round + 1);
            for (j, parent) in parents.iter().enumerate() {
                let expected = (children[2 * j] + children[2 * j + 1]) / 2;
                assert_eq!(*parent, expected, "round={round} parent={j}");
            }
        }
    }

    #[test]
    fn narrow_terminal_windows_onto_focus_round() {
        // Room for two columns only.
        let grid = BracketGrid::compute(&[8, 4, 2, 1], 40, 3);
        assert_eq!(grid.visible_rounds, 2);
        assert_eq!(grid.first_round, 2);
        assert!(grid.is_visible(3));
        assert!(!grid.is_visible(1));
        // The leftmost visible column restarts at the base gap.
        assert_eq!(centers(&grid, 2), vec![1, 5]);
        assert_eq!(centers(&grid, 3), vec![3]);
    }

    #[test]
    fn cell_width_caps_at_full_width() {
        let grid = BracketGrid::compute(&[2, 1], 300, 0);
        assert_eq!(grid.cell_width, CELL_W_FULL);
    }

    #[test]
    fn empty_rounds_give_empty_grid() {
        let grid = BracketGrid::compute(&[], 80, 0);
        assert!(grid.cells.is_empty());
        assert_eq!(grid.total_height, 0);
    }

    #[test]
    fn focus_beyond_last_round_is_clamped() {
        let grid = BracketGrid::compute(&[2, 1], 300, 9);
        assert_eq!(grid.first_round, 0);
        assert!(grid.cell(1, 0).is_some());
    }

    #[test]
    fn scroll_follows_selection() {
        assert_eq!(visible_scroll(5, 0, 20), 0);
        assert_eq!(visible_scroll(29, 0, 20), 11);
        assert_eq!(visible_scroll(1, 10, 20), 0);
    }

    #[test]
    fn scroll_saturates_at_the_last_row() {
        assert_eq!(visible_scroll(u16::MAX, u16::MAX - 10, 20), u16::MAX - 20);
    }

    #[test]
    fn cell_at_the_last_row_renders() {
        let rounds = vec![Round { index: 0, matches: vec![Match { id: "m".into(), ..Default::default() }] }];
        let grid = BracketGrid {
            cells: vec![GameCell { center_row: u16::MAX, col: 0, round: 0, match_idx: 0 }],
            first_round: 0,
            visible_rounds: 1,
            cell_width: 16,
            total_height: u16::MAX,
        };
        let area = Rect::new(0, 0, 20, 10);
        let mut buf = Buffer::empty(area);
        BracketView { rounds: &rounds, grid: &grid, selected_round: 0, selected_match: 0, scroll_offset: u16::MAX - 5 }
            .render(area, &mut buf);
        assert_eq!(buf[(1, 4)].symbol(), "T");
    }

    #[test]
    fn participant_line_has_exact_width() {
        let m = Match {
            id: "m".into(),
            participants: vec![ParticipantSlot {
                participant: ParticipantRef::Resolved(Participant {
                    id: "p".into(),
                    name: "Northern Mountain Falcons Athletic Club".into(),
                    email: None,
                }),
                score: Some(12),
            }],
            winner: Some("p".into()),
            ..Default::default()
        };
        let line = format_participant_line(&m, 0, 20);
        assert_eq!(line.chars().count(), 20, "line: {line:?}");
        assert!(line.starts_with('*'));
        assert!(line.ends_with(" 12"));
    }

    #[test]
    fn empty_slot_reads_tbd() {
        let m = Match { id: "m".into(), ..Default::default() };
        let line = format_participant_line(&m, 1, 16);
        assert_eq!(line.chars().count(), 16);
        assert!(line.contains("TBD"));
    }

    #[test]
    fn status_line_has_exact_width() {
        let m = Match { id: "m".into(), status: MatchStatus::InProgress, ..Default::default() };
        assert_eq!(format_status_line(&m, 16).chars().count(), 16);
        assert!(format_status_line(&m, 16).contains("Live"));
    }
}
