//! TUI rendering for the Guardian TUI
//!
//! This module handles all UI rendering logic using the `ratatui` crate:
//! the welcome form, the waiting screen, the map with its info panel, and the
//! emergency popup.

use crate::app::{App, Focus, Phase, LOADING};
use crate::geo::TravelTimes;
use crate::map::{MapStyle, MarkerKind, RouteTarget, ZoneKind};
use ratatui::{
    prelude::*,
    widgets::{canvas::*, *}, // Imports Circle, Map, etc.
};

use ratatui::text::Line;

const PINK: Color = Color::Rgb(255, 105, 180);
const STEEL_BLUE: Color = Color::Rgb(70, 130, 180);
const GOLD: Color = Color::Rgb(255, 215, 0);
const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

/// Renders one frame of the TUI based on the current phase.
///
/// # Arguments
///
/// * `f` - The ratatui frame to draw into (from `terminal.draw()`).
/// * `app` - Current application state.
pub fn render(f: &mut Frame, app: &App) {
    match app.phase {
        Phase::Onboarding => render_welcome(f, app),
        Phase::Acquiring => render_loading_screen(f, app),
        Phase::Active => render_location_page(f, app),
    }
}

fn render_welcome(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 14, f.size());
    let form = &app.form;

    let role = match form.role {
        Some(role) => Span::styled(
            format!("< {} >", capitalize(role.as_str())),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        None => Span::styled("< Select role >", Style::default().fg(Color::DarkGray)),
    };

    let mut lines = vec![
        Line::from(Span::styled(
            "Women's Safety Guardian",
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Empowering Your Safety with Confidence",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Name: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(format!("{}▏", form.name), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::styled("Role: ", Style::default().add_modifier(Modifier::BOLD)),
            role,
        ]),
        Line::from(""),
    ];

    if form.submitting {
        let frame = SPINNER[app.tick_count % SPINNER.len()];
        lines.push(Line::from(format!("{} Saving...", frame)));
    } else if let Some(msg) = &form.message {
        lines.push(Line::from(Span::styled(msg.as_str(), Style::default().fg(Color::Red))));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "type name · Tab/←/→ role · Enter Get Started · Esc quit",
        Style::default().fg(Color::DarkGray),
    )));

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .padding(Padding::new(2, 2, 1, 1)),
    );
    f.render_widget(p, area);
}

/// Waiting for the first coordinate. Stays here until one arrives.
fn render_loading_screen(f: &mut Frame, app: &App) {
    let area = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height / 2).saturating_sub(2)),
            Constraint::Length(1), // Headline
            Constraint::Length(1), // Status
            Constraint::Length(1),
            Constraint::Length(1), // Help
            Constraint::Min(0),
        ])
        .split(area);

    let frame = SPINNER[app.tick_count % SPINNER.len()];
    let headline = Paragraph::new(format!("{} {}", frame, LOADING))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    f.render_widget(headline, chunks[1]);

    let status = Paragraph::new(app.status.as_str())
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(status, chunks[2]);

    let help = Paragraph::new("r retry · q quit")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, chunks[4]);
}

/// Map (70%) + info panel (30%), or the map alone in fullscreen.
fn render_location_page(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
        .split(f.size());

    let title = Paragraph::new(" Women's Safety Guardian ")
        .style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(title, rows[0]);

    if app.fullscreen {
        render_map(f, app, rows[1]);
    } else {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(rows[1]);
        render_map(f, app, chunks[0]);
        render_info_panel(f, app, chunks[1]);
    }

    let mut help = String::from(" q quit · r refresh · m street/satellite · f fullscreen · l set location");
    if app.is_parent() {
        help.push_str(" · c find daughter");
    } else {
        help.push_str(" · e SOS");
    }
    let footer = Paragraph::new(help).style(Style::default().fg(Color::DarkGray));
    f.render_widget(footer, rows[2]);

    if let Some(alert) = &app.alert {
        render_alert(f, alert);
    }
}

/// Canvas on top, marker legend underneath.
fn render_map(f: &mut Frame, app: &App, area: Rect) {
    let Some(([x0, x1], [y0, y1])) = app.map.bounds() else {
        return;
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)])
        .split(area);
    let style = app.map.style();
    let tiles = style.tiles();
    let (land, background) = match style {
        MapStyle::Street => (Color::Rgb(80, 80, 80), Color::Reset),
        MapStyle::Satellite => (Color::Rgb(90, 140, 90), Color::Rgb(10, 30, 15)),
    };

    let canvas = Canvas::default()
        .block(
            Block::bordered()
                .title(format!(" {} Map ", style.label()))
                .title_bottom(
                    Line::from(format!(" {} · max zoom {} ", tiles.attribution, tiles.max_zoom))
                        .alignment(Alignment::Right),
                ),
        )
        .marker(symbols::Marker::Braille)
        .background_color(background)
        .x_bounds([x0, x1])
        .y_bounds([y0, y1])
        .paint(move |ctx| {
            ctx.draw(&Map {
                color: land,
                resolution: MapResolution::High,
            });

            for zone in app.map.zones() {
                let color = match zone.kind {
                    ZoneKind::Risk => Color::Red,
                    ZoneKind::Safe => Color::Blue,
                };
                ctx.draw(&Circle {
                    x: zone.center.lng,
                    y: zone.center.lat,
                    radius: zone.radius_deg(),
                    color,
                });
            }

            for (target, route) in app.map.routes() {
                let color = match target {
                    RouteTarget::Contact => PINK,
                    RouteTarget::Station => STEEL_BLUE,
                };
                for leg in route.path.windows(2) {
                    ctx.draw(&ratatui::widgets::canvas::Line {
                        x1: leg[0].lng,
                        y1: leg[0].lat,
                        x2: leg[1].lng,
                        y2: leg[1].lat,
                        color,
                    });
                }
            }

            // Markers go on top of everything else
            ctx.layer();
            for (kind, at, _) in app.map.markers() {
                let (symbol, color) = marker_symbol(kind);
                ctx.print(
                    at.lng,
                    at.lat,
                    Line::from(Span::styled(
                        format!(" {} ", symbol),
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    )),
                );
            }
        });

    f.render_widget(canvas, chunks[0]);

    let mut legend: Vec<Span> = Vec::new();
    for (kind, _, label) in app.map.markers() {
        let (symbol, color) = marker_symbol(kind);
        legend.push(Span::styled(format!("{} ", symbol), Style::default().fg(color)));
        legend.push(Span::raw(format!("{}   ", label)));
    }
    f.render_widget(Paragraph::new(Line::from(legend)).wrap(Wrap { trim: true }), chunks[1]);
}

fn marker_symbol(kind: MarkerKind) -> (&'static str, Color) {
    match kind {
        MarkerKind::User => ("⌖", Color::Green),
        MarkerKind::Contact => ("♥", PINK),
        MarkerKind::Station => ("★", GOLD),
    }
}

fn render_info_panel(f: &mut Frame, app: &App, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled("Your Location", bold.fg(Color::Cyan))));
    lines.push(Line::from(vec![
        Span::styled("Address: ", bold),
        Span::raw(app.details.full_address.as_str()),
    ]));
    if let Some(loc) = app.location {
        lines.push(Line::from(vec![
            Span::styled("Coordinates: ", bold),
            Span::raw(format!("{:.6}, {:.6}", loc.lat, loc.lng)),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled("Status: ", bold),
        Span::styled(app.status.as_str(), Style::default().fg(Color::Yellow)),
    ]));
    if let Some(at) = app.last_fix {
        lines.push(Line::from(vec![
            Span::styled("Updated: ", bold),
            Span::raw(at.format("%H:%M:%S").to_string()),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(input_line("Latitude:  ", &app.lat_input, app.focus == Focus::Latitude));
    lines.push(input_line("Longitude: ", &app.lng_input, app.focus == Focus::Longitude));

    if app.is_parent() {
        lines.push(Line::from(""));
        lines.push(input_line("Daughter:  ", &app.contact_input, app.focus == Focus::ContactName));
        if !app.contact_status.is_empty() {
            lines.push(Line::from(Span::styled(
                app.contact_status.as_str(),
                Style::default().fg(PINK),
            )));
        }
    }

    if let Some(station) = app.nearest_station() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Nearest Police Station", bold.fg(GOLD))));
        lines.push(Line::from(vec![Span::styled("Name: ", bold), Span::raw(station.name.as_str())]));
        lines.push(Line::from(vec![
            Span::styled("Address: ", bold),
            Span::raw(station.address.as_str()),
        ]));
        lines.push(Line::from(vec![
            Span::styled("Distance: ", bold),
            Span::raw(format!("{} m", station.distance_m().round() as i64)),
        ]));
        for (mode, minutes) in TravelTimes::for_distance(station.distance_km).entries() {
            lines.push(Line::from(vec![
                Span::styled(format!("  {}: ", mode), bold),
                Span::raw(format!("{:.1} min", minutes)),
            ]));
        }
    }

    if !app.is_parent() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            " [e] Emergency SOS ",
            Style::default().fg(Color::White).bg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }

    let p = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(" Info ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .padding(Padding::horizontal(1)),
    );
    f.render_widget(p, area);
}

fn input_line<'a>(label: &'a str, value: &'a str, focused: bool) -> Line<'a> {
    let style = if focused {
        Style::default()
            .fg(Color::Cyan)
            .bg(Color::Rgb(30, 30, 60))
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let cursor = if focused { "▏" } else { "" };
    Line::from(vec![
        Span::styled(label, Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!("[{}{}]", value, cursor), style),
    ])
}

fn render_alert(f: &mut Frame, alert: &str) {
    let area = centered_rect(60, alert.lines().count() as u16 + 4, f.size());
    f.render_widget(Clear, area);
    let p = Paragraph::new(alert)
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .title(" EMERGENCY ")
                .title_bottom(Line::from(" Enter to close ").alignment(Alignment::Center))
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(Color::Red))
                .padding(Padding::horizontal(1)),
        );
    f.render_widget(p, area);
}

/// A `width`% wide, `height` rows tall box centred in `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let height = height.min(area.height);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height - height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width) / 2),
            Constraint::Percentage(width),
            Constraint::Percentage((100 - width) / 2),
        ])
        .split(vertical[1])[1]
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
