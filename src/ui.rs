use crate::app::InputMode;
use crate::controller::PlaybackState;
use crate::core::MuzicCore;
use crate::model::format_time;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use std::time::Duration;

const APP_TITLE_WITH_VERSION: &str = concat!("Muzic v", env!("CARGO_PKG_VERSION"), "  ");

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    panel_bg: Color,
    panel_alt_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    selected_bg: Color,
    popup_bg: Color,
}

const COLORS: Palette = Palette {
    bg: Color::Rgb(10, 15, 24),
    panel_bg: Color::Rgb(19, 29, 43),
    panel_alt_bg: Color::Rgb(24, 38, 58),
    border: Color::Rgb(69, 121, 176),
    text: Color::Rgb(214, 228, 248),
    muted: Color::Rgb(149, 173, 204),
    accent: Color::Rgb(100, 203, 184),
    alert: Color::Rgb(249, 174, 88),
    selected_bg: Color::Rgb(34, 55, 82),
    popup_bg: Color::Rgb(22, 33, 51),
};

pub fn draw(frame: &mut Frame, core: &MuzicCore, mode: &InputMode) {
    let colors = COLORS;
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, core, vertical[0], &colors);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(66), Constraint::Percentage(34)])
        .split(vertical[1]);

    draw_track_list(frame, core, body[0], &colors);
    draw_song_info(frame, core, body[1], &colors);

    let timeline = Paragraph::new(Span::styled(
        timeline_line(core.controller.position(), core.controller.duration(), 26),
        Style::default().fg(colors.text),
    ))
    .block(panel_block(
        "Timeline",
        colors.panel_bg,
        colors.text,
        colors.border,
    ))
    .wrap(Wrap { trim: true });
    frame.render_widget(timeline, vertical[2]);

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            "Keys: Enter play, Space pause, n/p skip, s shuffle, r repeat, / search, e rename, d delete, : command, q quit",
            Style::default().fg(colors.muted),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(core.status.as_str(), Style::default().fg(colors.text)),
    ]))
    .block(panel_block(
        "Message",
        colors.panel_bg,
        colors.text,
        colors.border,
    ));
    frame.render_widget(footer, vertical[3]);

    if let Some((title, body, hint)) = prompt_for(mode) {
        draw_prompt(frame, &title, &body, hint, &colors);
    }
}

fn draw_header(frame: &mut Frame, core: &MuzicCore, area: Rect, colors: &Palette) {
    frame.render_widget(
        panel_block("Status", colors.panel_bg, colors.text, colors.border),
        area,
    );
    let inner = area.inner(Margin {
        vertical: 0,
        horizontal: 1,
    });
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    let left = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE_WITH_VERSION,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("Songs {}", core.catalog.len()),
            Style::default().fg(colors.text),
        ),
    ]));
    frame.render_widget(left, chunks[0]);

    let shuffle = if core.controller.is_shuffled() {
        "on"
    } else {
        "off"
    };
    let right = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("Repeat {}", core.controller.repeat_mode().label()),
            Style::default().fg(colors.alert),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            format!("Shuffle {shuffle}"),
            Style::default().fg(colors.alert),
        ),
    ]))
    .alignment(Alignment::Right);
    frame.render_widget(right, chunks[1]);
}

fn draw_track_list(frame: &mut Frame, core: &MuzicCore, area: Rect, colors: &Palette) {
    let tracks = core.visible_tracks();
    let items: Vec<ListItem> = tracks
        .iter()
        .map(|track| {
            let active = core.is_active(&track.id);
            let marker = if active { "  > " } else { "    " };
            let style = if active {
                Style::default().fg(colors.accent)
            } else {
                Style::default().fg(colors.text)
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(colors.muted)),
                Span::styled(track.title.as_str(), style),
                Span::styled(
                    format!("  {}", track.artist),
                    Style::default().fg(colors.muted),
                ),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select((!tracks.is_empty()).then_some(core.selected));

    let title = match &core.search_query {
        Some(query) => format!("Songs / Search: {query}"),
        None if !core.has_library_access() => String::from("Songs / no access"),
        None => String::from("Songs"),
    };

    let list = List::new(items)
        .block(panel_block(&title, colors.panel_bg, colors.text, colors.border))
        .highlight_style(
            Style::default()
                .bg(colors.selected_bg)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("-> ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_song_info(frame: &mut Frame, core: &MuzicCore, area: Rect, colors: &Palette) {
    let active = core.active_track();
    let now_title = active.map(|track| track.title.as_str()).unwrap_or("-");
    let now_artist = active.map(|track| track.artist.as_str()).unwrap_or("-");
    let state = match core.controller.state() {
        PlaybackState::Idle => "Stopped",
        PlaybackState::Playing => "Playing",
        PlaybackState::Paused => "Paused",
    };
    let output = core
        .controller
        .output_name()
        .unwrap_or_else(|| String::from("-"));

    let selected = core.selected_track();
    let selected_title = selected.map(|track| track.title.as_str()).unwrap_or("-");
    let selected_artist = selected.map(|track| track.artist.as_str()).unwrap_or("-");

    let info_text = vec![
        Line::from(vec![
            Span::styled(
                "Now",
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {now_title}"), Style::default().fg(colors.text)),
        ]),
        Line::from(Span::styled(
            format!("Artist  {now_artist}"),
            Style::default().fg(colors.muted),
        )),
        Line::from(Span::styled(
            format!("State   {state}"),
            Style::default().fg(colors.alert),
        )),
        Line::from(Span::styled(
            format!("Output  {output}"),
            Style::default().fg(colors.muted),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "Selected",
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {selected_title}"),
                Style::default().fg(colors.text),
            ),
        ]),
        Line::from(Span::styled(
            format!("Artist  {selected_artist}"),
            Style::default().fg(colors.muted),
        )),
    ];
    let info = Paragraph::new(info_text)
        .block(panel_block(
            "Song Info",
            colors.panel_alt_bg,
            colors.text,
            colors.border,
        ))
        .wrap(Wrap { trim: true });
    frame.render_widget(info, area);
}

/// Title, body and hint for the modal prompt of `mode`, if it has one.
fn prompt_for(mode: &InputMode) -> Option<(String, String, &'static str)> {
    match mode {
        InputMode::Normal | InputMode::Search => None,
        InputMode::Rename { buffer, .. } => Some((
            String::from("Rename Song"),
            format!("{buffer}_"),
            "Enter save  Esc cancel",
        )),
        InputMode::ConfirmDelete { title, .. } => Some((
            String::from("Delete Song"),
            format!("Are you sure you want to delete \"{title}\"?"),
            "y delete  n cancel",
        )),
        InputMode::Command(buffer) => Some((
            String::from("Command"),
            format!(":{buffer}_"),
            "Enter run  Esc cancel  :help",
        )),
    }
}

fn draw_prompt(frame: &mut Frame, title: &str, body: &str, hint: &str, colors: &Palette) {
    let popup = centered_rect(frame.area(), 62, 30);
    frame.render_widget(Clear, popup);

    let text = vec![
        Line::from(Span::styled(body, Style::default().fg(colors.text))),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(colors.muted))),
    ];
    let paragraph = Paragraph::new(text)
        .block(panel_block(title, colors.popup_bg, colors.text, colors.border))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, popup);
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn progress_bar(ratio: Option<f64>, width: usize) -> String {
    let clamped = ratio.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}

fn timeline_line(position: Option<Duration>, total: Option<Duration>, width: usize) -> String {
    let elapsed = position.unwrap_or(Duration::ZERO);
    let ratio = total.and_then(|duration| {
        let total_secs = duration.as_secs_f64();
        (total_secs > 0.0).then_some((elapsed.as_secs_f64() / total_secs).clamp(0.0, 1.0))
    });

    format!(
        "{} / {} {}  Left/Right seek",
        format_time(millis(elapsed)),
        total
            .map(|total| format_time(millis(total)))
            .unwrap_or_else(|| String::from("-:--")),
        progress_bar(ratio, width),
    )
}
