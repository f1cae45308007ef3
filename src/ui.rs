use ratatui::{
    prelude::*,
    style::Style,
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::form::TextInput;
use crate::page::{Model, Page};

const COLOR_SAND: Color = Color::Rgb(0xEB, 0xDB, 0xB2);
const COLOR_OLIVE: Color = Color::Rgb(0x98, 0x97, 0x1A);
const COLOR_MOSS: Color = Color::Rgb(0x67, 0x67, 0x1C);
const COLOR_HELP: Color = Color::Rgb(0xAF, 0xAF, 0xAF);
const PAD_X: u16 = 4;
const PAD_Y: u16 = 2;
const BROWSE_HINT: &str = "j/k move | y copy password | o new entry | w save | Ctrl+C quit";
const FORM_HINT: &str = "Tab/Shift+Tab move | Enter save entry | Esc cancel";

pub fn draw(f: &mut Frame<'_>, model: &Model) {
    let (width, height) = model.viewport();
    let area = f.size().intersection(Rect::new(0, 0, width, height));
    let area = Layout::default()
        .horizontal_margin(PAD_X)
        .vertical_margin(PAD_Y)
        .constraints([Constraint::Min(0)])
        .split(area)[0];

    match model.page() {
        Page::Unlock => draw_unlock(f, area, model),
        Page::Browse => draw_browse(f, area, model),
        Page::CreateEntry => draw_create_entry(f, area, model),
    }
}

fn heading(text: &str) -> Paragraph<'_> {
    Paragraph::new(Span::styled(
        text,
        Style::default().fg(COLOR_SAND).add_modifier(Modifier::BOLD),
    ))
}

fn status_line(text: &str) -> Paragraph<'_> {
    Paragraph::new(Span::styled(text, Style::default().fg(COLOR_HELP)))
}

fn input_box<'a>(label: &'a str, input: &TextInput) -> Paragraph<'a> {
    let border = if input.is_focused() {
        Style::default().fg(COLOR_OLIVE).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(COLOR_MOSS)
    };
    let cursor = if input.is_focused() { "█" } else { "" };
    let body = if input.value().is_empty() && !input.is_focused() {
        Span::styled(label, Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(
            format!("{}{cursor}", input.display()),
            Style::default().fg(COLOR_SAND),
        )
    };
    Paragraph::new(Line::from(vec![Span::raw("> "), body])).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(if input.is_masked() {
                format!("{label} (hidden)")
            } else {
                label.to_string()
            }),
    )
}

fn draw_unlock(f: &mut Frame<'_>, area: Rect, model: &Model) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // heading
            Constraint::Length(3), // input
            Constraint::Length(1), // spacer
            Constraint::Length(1), // status
            Constraint::Min(0),
        ])
        .split(area);

    f.render_widget(heading("Type in your password"), layout[0]);
    f.render_widget(input_box("Password", model.unlock_input()), layout[1]);
    f.render_widget(status_line(model.status()), layout[3]);
}

fn draw_browse(f: &mut Frame<'_>, area: Rect, model: &Model) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // table
            Constraint::Length(1), // copy feedback
            Constraint::Length(1), // status
            Constraint::Length(1), // hint
        ])
        .split(area);

    let header = Row::new(["ID", "TITLE", "UserName", "PASS"]).style(
        Style::default()
            .fg(COLOR_SAND)
            .add_modifier(Modifier::BOLD),
    );
    let rows: Vec<Row> = model
        .rows()
        .iter()
        .map(|row| {
            Row::new(vec![
                Cell::from(row.index.to_string()),
                Cell::from(row.title.clone()),
                Cell::from(row.username.clone()),
                Cell::from(row.masked_password.clone()),
            ])
        })
        .collect();
    let widths = [
        Constraint::Length(4),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Length(model.settings().mask_len as u16 + 2),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(COLOR_MOSS))
                .title(Page::Browse.title()),
        )
        .highlight_symbol("▶ ")
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .bg(Color::Rgb(40, 40, 40))
                .add_modifier(Modifier::BOLD),
        );
    let mut state = TableState::default();
    state.select(model.selected());
    f.render_stateful_widget(table, layout[0], &mut state);

    let percent = model.copy_feedback_percent().clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(COLOR_OLIVE).bg(Color::Rgb(0x1D, 0x21, 0x10)))
        .ratio(percent)
        .label(format!("{:.0}%", percent * 100.0));
    f.render_widget(gauge, layout[1]);

    f.render_widget(status_line(model.status()), layout[2]);
    f.render_widget(
        Paragraph::new(BROWSE_HINT).style(Style::default().fg(Color::DarkGray)),
        layout[3],
    );
}

fn draw_create_entry(f: &mut Frame<'_>, area: Rect, model: &Model) {
    let mut constraints = vec![Constraint::Length(2)];
    constraints.extend(model.form().fields().map(|_| Constraint::Length(3)));
    constraints.push(Constraint::Min(0));
    constraints.push(Constraint::Length(1));
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    f.render_widget(heading(Page::CreateEntry.title()), layout[0]);
    for (idx, (label, input)) in model.form().fields().enumerate() {
        f.render_widget(input_box(label, input), layout[idx + 1]);
    }
    if let Some(hint_area) = layout.last() {
        f.render_widget(
            Paragraph::new(FORM_HINT).style(Style::default().fg(Color::DarkGray)),
            *hint_area,
        );
    }
}
