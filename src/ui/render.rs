use crate::config::Settings;
use crate::state::assets::{AssetCategory, AssetRecord};
use crate::state::session::{ChatTurn, TurnRole};
use crate::util::format_byte_size;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthChar;

/// Fields of the settings overlay in cursor order. Provider rows cycle
/// with left/right; model and key rows take typed input.
pub const SETTINGS_ROWS: usize = 6;

const ACCENT: Color = Color::Cyan;
const PANEL_BG: Color = Color::Rgb(24, 24, 24);

// ---- input metrics -------------------------------------------------------

pub fn wrap_input_lines(input: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = vec![String::new()];
    let mut line_widths = vec![0usize];
    for ch in input.chars() {
        if ch == '\r' {
            continue;
        }
        if ch == '\n' {
            lines.push(String::new());
            line_widths.push(0);
            continue;
        }
        let ch_width = char_display_width(ch);
        let current_width = *line_widths.last().unwrap_or(&0);
        if current_width + ch_width > width && current_width > 0 {
            lines.push(String::new());
            line_widths.push(0);
        }
        if let Some(line) = lines.last_mut() {
            line.push(ch);
        }
        if let Some(line_width) = line_widths.last_mut() {
            *line_width += ch_width;
        }
    }
    lines
}

pub fn cursor_row_col(input: &str, cursor_byte: usize, width: usize) -> (usize, usize) {
    let width = width.max(1);
    let mut row = 0usize;
    let mut col = 0usize;
    let cursor_byte = clamp_to_char_boundary_left(input, cursor_byte);

    for (idx, ch) in input.char_indices() {
        if idx >= cursor_byte {
            break;
        }
        if ch == '\r' {
            continue;
        }
        if ch == '\n' {
            row += 1;
            col = 0;
            continue;
        }
        let ch_width = char_display_width(ch);
        if col + ch_width > width && col > 0 {
            row += 1;
            col = 0;
        }
        col += ch_width;
    }

    if col >= width {
        row += 1;
        col = 0;
    }

    (row, col)
}

pub fn truncate_to_display_width(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = char_display_width(ch);
        if used + ch_width > max_width && used > 0 {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out
}

pub fn char_display_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(char_display_width).sum()
}

pub fn clamp_to_char_boundary_left(input: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(input.len());
    while cursor > 0 && !input.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}

pub fn input_visual_rows(input: &str, width: usize) -> usize {
    wrap_input_lines(input, width).len().max(1)
}

// ---- frame chrome --------------------------------------------------------

pub fn render_header(frame: &mut Frame<'_>, area: Rect, provider_note: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let line = Line::from(vec![
        Span::styled(
            " GameGen Studio ",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {provider_note}"),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(PANEL_BG)),
        area,
    );
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let text = truncate_line(status, area.width as usize);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

// ---- chat panels ---------------------------------------------------------

pub fn render_chat_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    title: &str,
    turns: &[ChatTurn],
    scroll_back: usize,
) {
    if area.height < 2 || area.width < 4 {
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {title} "))
        .style(Style::default().fg(Color::Gray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = chat_turn_lines(turns);
    let total_rows = rendered_row_count(&lines, inner.width as usize);
    let scroll = follow_scroll(total_rows, inner.height as usize, scroll_back);

    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        inner,
    );
}

pub fn render_chat_input(
    frame: &mut Frame<'_>,
    area: Rect,
    input: &str,
    cursor_byte: usize,
    focused: bool,
) {
    if area.height == 0 || area.width <= 2 {
        return;
    }

    let input_width = area.width.saturating_sub(2).max(1) as usize;
    let lines = wrap_input_lines(input, input_width);
    let (cursor_row, cursor_col) = cursor_row_col(input, cursor_byte, input_width);
    let visible_rows = area.height as usize;
    let window_start = cursor_row.saturating_add(1).saturating_sub(visible_rows);

    let mut rendered = Vec::with_capacity(visible_rows);
    for offset in 0..visible_rows {
        let row_index = window_start + offset;
        let prefix = if row_index == 0 { "> " } else { "  " };
        let line = lines.get(row_index).cloned().unwrap_or_default();
        rendered.push(Line::from(format!("{prefix}{line}")));
    }

    let style = if focused {
        Style::default().fg(Color::White).bg(PANEL_BG)
    } else {
        Style::default()
            .fg(Color::Gray)
            .bg(PANEL_BG)
            .add_modifier(Modifier::DIM)
    };
    frame.render_widget(Paragraph::new(rendered).style(style), area);

    if focused {
        let cursor_y = area
            .y
            .saturating_add(cursor_row.saturating_sub(window_start) as u16);
        let cursor_x = area
            .x
            .saturating_add(2 + cursor_col as u16)
            .min(area.x.saturating_add(area.width.saturating_sub(1)));
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}

/// Flatten a session's turns into display lines: a speaker line, the
/// turn text, and a marker line per attached image.
pub fn chat_turn_lines(turns: &[ChatTurn]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for turn in turns {
        let (speaker, speaker_style) = match turn.role {
            TurnRole::User => (
                "You",
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ),
            TurnRole::Assistant => (
                "Assistant",
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
            TurnRole::System => ("System", Style::default().fg(Color::DarkGray)),
        };

        lines.push(Line::from(vec![
            Span::styled(speaker.to_string(), speaker_style),
            Span::styled(
                format!("  {}", turn.created_at.format("%H:%M")),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

        if turn.pending && turn.text.is_empty() {
            lines.push(Line::styled(
                "...".to_string(),
                Style::default().fg(Color::DarkGray),
            ));
        } else {
            for text_line in turn.text.lines() {
                lines.push(Line::from(text_line.to_string()));
            }
        }

        for _ in &turn.images {
            lines.push(Line::styled(
                "[image attached]".to_string(),
                Style::default().fg(Color::Green),
            ));
        }
        lines.push(Line::from(String::new()));
    }
    lines
}

// ---- center column -------------------------------------------------------

pub fn render_viewport(frame: &mut Frame<'_>, area: Rect, playing: bool) {
    if area.height < 3 || area.width < 10 {
        return;
    }

    let toolbar = if playing {
        "[#] Stop   2D [3D]   1920x1080 (16:9)"
    } else {
        "[>] Play   2D [3D]   1920x1080 (16:9)"
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Viewport  {toolbar} "))
        .style(Style::default().fg(Color::Gray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![Line::from(String::new()); inner.height.saturating_sub(3) as usize / 2];
    if playing {
        lines.push(Line::styled(
            "GAME RUNNING".to_string(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::styled(
            "FPS: 60.01".to_string(),
            Style::default().fg(ACCENT),
        ));
    } else {
        lines.push(Line::styled(
            "Scene View [Edit Mode]".to_string(),
            Style::default().fg(Color::DarkGray),
        ));
        lines.push(Line::styled(
            "+".to_string(),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let footer_row = inner.height.saturating_sub(1);
    let body = Rect {
        height: footer_row,
        ..inner
    };
    frame.render_widget(
        Paragraph::new(lines).alignment(ratatui::layout::Alignment::Center),
        body,
    );

    if footer_row > 0 {
        let footer = Rect {
            y: inner.y + footer_row,
            height: 1,
            ..inner
        };
        frame.render_widget(
            Paragraph::new("Objects: 14 | Lights: 2 | Cameras: 1    Baking: Idle")
                .style(Style::default().fg(Color::DarkGray)),
            footer,
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbenchTab {
    Code,
    Assets,
}

pub fn render_workbench(
    frame: &mut Frame<'_>,
    area: Rect,
    tab: WorkbenchTab,
    editor_text: &str,
    editor_scroll: u16,
    records: &[AssetRecord],
) {
    if area.height < 2 || area.width < 10 {
        return;
    }

    let tab_style = |active: bool| {
        if active {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };
    let title = Line::from(vec![
        Span::raw(" "),
        Span::styled("Code", tab_style(tab == WorkbenchTab::Code)),
        Span::raw(" | "),
        Span::styled("Assets", tab_style(tab == WorkbenchTab::Assets)),
        Span::raw(" "),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .style(Style::default().fg(Color::Gray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match tab {
        WorkbenchTab::Code => {
            frame.render_widget(
                Paragraph::new(editor_lines(editor_text)).scroll((editor_scroll, 0)),
                inner,
            );
        }
        WorkbenchTab::Assets => {
            frame.render_widget(
                Paragraph::new(asset_lines(records)).wrap(Wrap { trim: false }),
                inner,
            );
        }
    }
}

/// Editor buffer with line numbers, newest extraction shown from the top.
pub fn editor_lines(text: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (idx, source_line) in text.lines().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:>4} ", idx + 1),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw(source_line.to_string()),
        ]));
    }
    if lines.is_empty() {
        lines.push(Line::styled(
            "   1 ".to_string(),
            Style::default().fg(Color::DarkGray),
        ));
    }
    lines
}

/// Library records, newest first, under a strip counting every category:
/// each record gets a name line and an indented detail line with category,
/// capture time, and payload size when known.
pub fn asset_lines(records: &[AssetRecord]) -> Vec<Line<'static>> {
    let mut lines = vec![category_strip(records), Line::from(String::new())];
    if records.is_empty() {
        lines.push(Line::styled(
            "  No assets yet. Ask the Asset Architect for a sprite.".to_string(),
            Style::default().fg(Color::DarkGray),
        ));
        return lines;
    }

    for record in records {
        lines.push(Line::from(vec![
            Span::styled("> ".to_string(), Style::default().fg(ACCENT)),
            Span::styled(
                record.name.clone(),
                Style::default().fg(Color::White),
            ),
        ]));

        let mut detail = format!(
            "    {}  {}",
            record.category.label(),
            record.created_at.format("%H:%M:%S")
        );
        if let Some(byte_len) = record.payload_bytes {
            detail.push_str(&format!("  {}", format_byte_size(byte_len)));
        }
        lines.push(Line::styled(detail, Style::default().fg(Color::DarkGray)));
    }
    lines
}

/// One line across the top of the library tab mirroring the gallery's
/// category strip, populated categories highlighted.
fn category_strip(records: &[AssetRecord]) -> Line<'static> {
    let mut spans = Vec::new();
    for (idx, category) in AssetCategory::ALL.into_iter().enumerate() {
        if idx > 0 {
            spans.push(Span::raw("   ".to_string()));
        }
        let count = records
            .iter()
            .filter(|record| record.category == category)
            .count();
        let style = if count > 0 {
            Style::default().fg(ACCENT)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(
            format!("{} ({count})", category.label()),
            style,
        ));
    }
    Line::from(spans)
}

// ---- settings overlay ----------------------------------------------------

pub fn render_settings_modal(frame: &mut Frame<'_>, draft: &Settings, selected_row: usize) {
    let size = frame.area();
    let width = size.width.clamp(48, 74);
    let height = size.height.clamp(14, 20);
    let x = size.x + (size.width.saturating_sub(width)) / 2;
    let y = size.y + (size.height.saturating_sub(height)) / 2;
    let area = Rect::new(x, y, width, height);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Studio Configuration ")
        .style(Style::default().fg(ACCENT));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    lines.extend(settings_section_lines(
        "Code Assistant (Right Panel)",
        &draft.code,
        selected_row,
        0,
    ));
    lines.push(Line::from(String::new()));
    lines.extend(settings_section_lines(
        "Asset Architect (Left Panel)",
        &draft.asset,
        selected_row,
        3,
    ));
    lines.push(Line::from(String::new()));
    lines.push(Line::styled(
        "Up/Down select   Left/Right change provider   type to edit".to_string(),
        Style::default().fg(Color::DarkGray),
    ));
    lines.push(Line::styled(
        "Enter: Save Configuration   Esc: Cancel".to_string(),
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn settings_section_lines(
    title: &str,
    config: &crate::config::ProviderConfig,
    selected_row: usize,
    row_base: usize,
) -> Vec<Line<'static>> {
    let row_style = |row: usize| {
        if row == selected_row {
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::REVERSED)
        } else {
            Style::default().fg(Color::Gray)
        }
    };

    let key_note = if config.credential_editable() {
        String::new()
    } else {
        "  (managed via environment)".to_string()
    };

    vec![
        Line::styled(
            title.to_string(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Line::styled(
            format!("  AI Provider   < {} >", config.kind.label()),
            row_style(row_base),
        ),
        Line::styled(
            format!("  Model Name    {}", config.model),
            row_style(row_base + 1),
        ),
        Line::from(vec![
            Span::styled(
                format!("  API Key       {}", config.credential_display()),
                row_style(row_base + 2),
            ),
            Span::styled(key_note, Style::default().fg(Color::Green)),
        ]),
    ]
}

// ---- shared helpers ------------------------------------------------------

fn rendered_row_count(lines: &[Line<'_>], width: usize) -> usize {
    let width = width.max(1);
    lines
        .iter()
        .map(|line| {
            let line_width: usize = line
                .spans
                .iter()
                .map(|span| display_width(span.content.as_ref()))
                .sum();
            if line_width == 0 {
                1
            } else {
                (line_width + width - 1) / width
            }
        })
        .sum()
}

fn follow_scroll(total_rows: usize, visible_rows: usize, scroll_back: usize) -> u16 {
    total_rows
        .saturating_sub(visible_rows)
        .saturating_sub(scroll_back) as u16
}

fn truncate_line(input: &str, width: usize) -> String {
    let width = width.max(1);
    let mut out = String::new();
    let mut used = 0usize;
    let mut truncated = false;

    for ch in input.chars() {
        let ch_width = char_display_width(ch);
        if used + ch_width > width {
            truncated = true;
            break;
        }
        out.push(ch);
        used += ch_width;
    }

    if truncated && width >= 4 {
        out = truncate_to_display_width(&out, width - 3);
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::ChatTurn;

    #[test]
    fn test_wrap_input_lines_respects_width_and_newlines() {
        assert_eq!(wrap_input_lines("abcd", 2), vec!["ab", "cd"]);
        assert_eq!(wrap_input_lines("a\nb", 10), vec!["a", "b"]);
        assert_eq!(wrap_input_lines("", 10), vec![""]);
    }

    #[test]
    fn test_cursor_row_col_tracks_wrapping() {
        assert_eq!(cursor_row_col("abcd", 4, 2), (2, 0));
        assert_eq!(cursor_row_col("ab\ncd", 4, 10), (1, 1));
    }

    #[test]
    fn test_chat_turn_lines_mark_pending_and_images() {
        let mut turns = vec![ChatTurn::user("hello"), ChatTurn::assistant("")];
        turns[1].pending = true;
        let lines = chat_turn_lines(&turns);
        let rendered: Vec<String> = lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect();

        assert!(rendered.iter().any(|line| line.starts_with("You")));
        assert!(rendered.contains(&"hello".to_string()));
        assert!(rendered.contains(&"...".to_string()));

        let mut with_image = ChatTurn::assistant("Here is your generated asset.");
        with_image.images.push("data:image/png;base64,QUJD".to_string());
        let lines = chat_turn_lines(&[with_image]);
        let rendered: Vec<String> = lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect();
        assert!(rendered.contains(&"[image attached]".to_string()));
    }

    #[test]
    fn test_editor_lines_are_numbered() {
        let lines = editor_lines("let a = 1;\nlet b = 2;");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans[0].content.as_ref(), "   1 ");
        assert_eq!(lines[1].spans[1].content.as_ref(), "let b = 2;");
    }

    #[test]
    fn test_asset_lines_count_categories_in_the_strip() {
        let record = AssetRecord {
            id: uuid::Uuid::new_v4(),
            name: "Generated Asset 1".to_string(),
            category: AssetCategory::Sprite2d,
            content_uri: Some("data:image/png;base64,QUJD".to_string()),
            payload_bytes: Some(3),
            created_at: chrono::Utc::now(),
        };

        let lines = asset_lines(&[record]);
        let strip: String = lines[0]
            .spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect();
        assert_eq!(
            strip,
            "2D Assets (1)   3D Models (0)   Audio/SFX (0)   Particles (0)   Animations (0)"
        );
        let rendered: Vec<String> = lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect();
        assert!(rendered.iter().any(|line| line.contains("Generated Asset 1")));
        assert!(rendered.iter().any(|line| line.contains("3 B")));

        let empty = asset_lines(&[]);
        assert!(empty
            .iter()
            .flat_map(|line| line.spans.iter())
            .any(|span| span.content.contains("No assets yet")));
    }

    #[test]
    fn test_follow_scroll_pins_to_bottom() {
        assert_eq!(follow_scroll(30, 10, 0), 20);
        assert_eq!(follow_scroll(30, 10, 5), 15);
        assert_eq!(follow_scroll(5, 10, 0), 0);
        assert_eq!(follow_scroll(30, 10, 100), 0);
    }

    #[test]
    fn test_truncate_line_appends_ellipsis() {
        assert_eq!(truncate_line("short", 10), "short");
        assert_eq!(truncate_line("a much longer status line", 10), "a much...");
    }
}
