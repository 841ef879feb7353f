use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use drillquiz::{count_words, Phase, QuizItem, QuizType, Session};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let session = self.engine.session();
        match session.phase {
            Phase::Idle => render_menu(self, area, buf),
            Phase::Playing | Phase::Feedback | Phase::Paused => {
                render_quiz(self, session, area, buf)
            }
            Phase::Ended => render_results(self, session, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn render_menu(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(QuizType::ALL.len() as u16),
            Constraint::Length(1),
        ])
        .split(area);

    Paragraph::new(Line::from(vec![
        Span::styled("drillquiz", bold().fg(Color::Magenta)),
        Span::styled(format!("   {} xp", app.profile.xp), dim()),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let lines: Vec<Line> = QuizType::ALL
        .iter()
        .enumerate()
        .map(|(idx, quiz_type)| {
            let marker = if app.profile.completed_games.contains(quiz_type) {
                " ✓"
            } else {
                ""
            };
            let label = format!("{quiz_type}{marker}");
            if idx == app.menu_cursor {
                Line::from(Span::styled(
                    format!("> {label}"),
                    bold().fg(Color::Yellow),
                ))
            } else {
                Line::from(Span::raw(format!("  {label}")))
            }
        })
        .collect();

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        "(↑/↓) choose / (enter) start / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[2], buf);
}

fn status_line(session: &Session) -> Line<'static> {
    let hearts = "♥".repeat(session.lives as usize);
    Line::from(vec![
        Span::styled(hearts, Style::default().fg(Color::Red)),
        Span::raw(format!(
            "   score {}   streak {}   {}/{}   ",
            session.score,
            session.streak,
            session.question_index + 1,
            session.total_questions
        )),
        Span::styled(
            format!("{}s", session.time_left),
            if session.time_left <= 10 {
                bold().fg(Color::Red)
            } else {
                bold()
            },
        ),
    ])
}

fn item_text(item: &QuizItem) -> Vec<Line<'static>> {
    match item {
        QuizItem::Vocabulary { term, choice } => vec![
            Line::from(Span::styled(term.clone(), bold().fg(Color::Cyan))),
            Line::from(choice.prompt.clone()),
        ],
        QuizItem::Listening {
            clip,
            transcript,
            choice,
        } => vec![
            Line::from(Span::styled(format!("♪ {clip}"), dim())),
            Line::from(Span::styled(
                transcript.clone(),
                Style::default().add_modifier(Modifier::ITALIC),
            )),
            Line::from(""),
            Line::from(choice.prompt.clone()),
        ],
        QuizItem::Grammar { choice } => vec![Line::from(choice.prompt.clone())],
        QuizItem::Reading {
            title,
            passage,
            choice,
        } => vec![
            Line::from(Span::styled(title.clone(), bold())),
            Line::from(passage.clone()),
            Line::from(""),
            Line::from(choice.prompt.clone()),
        ],
        QuizItem::Writing {
            title,
            instructions,
        } => vec![
            Line::from(Span::styled(title.clone(), bold())),
            Line::from(instructions.clone()),
        ],
    }
}

fn render_quiz(app: &App, session: &Session, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(4),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(area);

    Paragraph::new(status_line(session))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let Some(item) = app.engine.current_item() else {
        return;
    };

    Paragraph::new(item_text(item))
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);

    if let Some(choice) = item.choice() {
        let answer = session.last_answer;
        let lines: Vec<Line> = choice
            .options
            .iter()
            .enumerate()
            .map(|(idx, option)| {
                let style = match answer {
                    Some(_) if idx == choice.answer => bold().fg(Color::Green),
                    Some(a) if a.selected_index == Some(idx) => bold().fg(Color::Red),
                    _ => Style::default(),
                };
                Line::from(Span::styled(format!("({}) {option}", idx + 1), style))
            })
            .collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .render(chunks[2], buf);
    } else {
        let words = count_words(&app.essay);
        let floor = app.engine.rules().essay_min_words;
        Paragraph::new(app.essay.clone())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {words}/{floor} words ")),
            )
            .wrap(Wrap { trim: false })
            .render(chunks[2], buf);
    }

    let legend = match (session.phase, session.last_answer) {
        (Phase::Paused, _) => Span::styled(
            "PAUSED - (tab) resume / (esc) quit to menu",
            bold().fg(Color::Yellow),
        ),
        (Phase::Feedback, Some(a)) if a.is_correct => Span::styled(
            format!("correct! +{}", a.points_awarded),
            bold().fg(Color::Green),
        ),
        (Phase::Feedback, _) => Span::styled("incorrect", bold().fg(Color::Red)),
        _ if item.choice().is_none() => Span::styled(
            "(enter) submit / (tab) pause / (esc) quit to menu",
            Style::default().add_modifier(Modifier::ITALIC),
        ),
        _ => Span::styled(
            "(1-9) answer / (tab) pause / (esc) quit to menu",
            Style::default().add_modifier(Modifier::ITALIC),
        ),
    };
    Paragraph::new(legend).render(chunks[3], buf);
}

fn render_results(app: &App, session: &Session, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let headline = if session.lives == 0 {
        Span::styled("out of lives", bold().fg(Color::Red))
    } else {
        Span::styled("session complete", bold().fg(Color::Green))
    };
    Paragraph::new(headline)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} points   {} lives left   +{} xp",
            session.score, session.lives, session.score
        ),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    let totals = match app.best_score {
        Some(best) => format!("total {} xp   best {best}", app.profile.xp),
        None => format!("total {} xp", app.profile.xp),
    };
    Paragraph::new(Span::styled(totals, dim()))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        "(r)etry / (m)enu / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[5], buf);
}
