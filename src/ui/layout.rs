use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Fixed width of the asset chat column on the left.
pub const ASSET_PANEL_WIDTH: u16 = 34;
/// Fixed width of the code chat column on the right.
pub const CODE_PANEL_WIDTH: u16 = 42;

/// The studio frame: two chat columns flanking a center column that
/// stacks the viewport above the tabbed workbench, with a one-line
/// header above and a one-line status bar below.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StudioLayout {
    pub header: Rect,
    pub asset_chat: Rect,
    pub asset_input: Rect,
    pub viewport: Rect,
    pub workbench: Rect,
    pub code_chat: Rect,
    pub code_input: Rect,
    pub status: Rect,
}

pub fn split_studio_layout(
    area: Rect,
    asset_input_rows: u16,
    code_input_rows: u16,
) -> StudioLayout {
    let frame = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(ASSET_PANEL_WIDTH),
            Constraint::Min(20),
            Constraint::Length(CODE_PANEL_WIDTH),
        ])
        .split(frame[1]);

    let asset_column = split_chat_column(columns[0], asset_input_rows);
    let code_column = split_chat_column(columns[2], code_input_rows);

    let center = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(columns[1]);

    StudioLayout {
        header: frame[0],
        asset_chat: asset_column.0,
        asset_input: asset_column.1,
        viewport: center[0],
        workbench: center[1],
        code_chat: code_column.0,
        code_input: code_column.1,
        status: frame[2],
    }
}

fn split_chat_column(area: Rect, input_rows: u16) -> (Rect, Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(input_rows.max(1))])
        .split(area);
    (rows[0], rows[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_splits_header_columns_and_status() {
        let area = Rect::new(0, 0, 160, 40);
        let layout = split_studio_layout(area, 1, 1);

        assert_eq!(layout.header.height, 1);
        assert_eq!(layout.header.y, 0);
        assert_eq!(layout.status.height, 1);
        assert_eq!(layout.status.y, 39);

        assert_eq!(layout.asset_chat.x, 0);
        assert_eq!(layout.asset_chat.width, ASSET_PANEL_WIDTH);
        assert_eq!(layout.code_chat.width, CODE_PANEL_WIDTH);
        assert_eq!(
            layout.code_chat.x + layout.code_chat.width,
            area.x + area.width
        );

        // Center column sits between the chat columns.
        assert_eq!(layout.viewport.x, ASSET_PANEL_WIDTH);
        assert_eq!(layout.viewport.width, 160 - ASSET_PANEL_WIDTH - CODE_PANEL_WIDTH);
        assert_eq!(layout.workbench.x, layout.viewport.x);
        assert_eq!(layout.viewport.y + layout.viewport.height, layout.workbench.y);
    }

    #[test]
    fn layout_grows_input_rows_at_the_chat_panes_expense() {
        let area = Rect::new(0, 0, 160, 40);
        let layout = split_studio_layout(area, 3, 5);

        assert_eq!(layout.asset_input.height, 3);
        assert_eq!(layout.code_input.height, 5);
        assert_eq!(
            layout.asset_chat.height + layout.asset_input.height,
            layout.code_chat.height + layout.code_input.height
        );
        assert_eq!(
            layout.asset_input.y,
            layout.asset_chat.y + layout.asset_chat.height
        );
    }
}
