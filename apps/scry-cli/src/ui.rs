use std::{
    collections::VecDeque,
    sync::mpsc::{Receiver, TryRecvError},
    time::{Duration, Instant},
};

use anyhow::Result;
use crossterm::{
    event::{self, Event as CEvent, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc::Sender;

use scry_ops::SlowHint;
use scry_orchestrator::{PipelineCommand, PipelineSnapshot};
use scry_types::events::{EventPayload, MembershipTransition, StageOutcome, SystemEvent};
use scry_types::live::LiveGameMembership;
use scry_view::{MatchView, RosterSlot, TeamView};

const MAX_LOG_ENTRIES: usize = 120;

pub enum UiMessage {
    Snapshot(PipelineSnapshot),
    Event(SystemEvent),
    Shutdown,
}

pub fn run(
    receiver: Receiver<UiMessage>,
    commands: Sender<PipelineCommand>,
    slow_hint: SlowHint,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let res = run_loop(&mut terminal, receiver, commands, slow_hint);

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    res
}

fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    receiver: Receiver<UiMessage>,
    commands: Sender<PipelineCommand>,
    mut slow_hint: SlowHint,
) -> Result<()> {
    let mut snapshot = PipelineSnapshot::default();
    let mut logs: VecDeque<String> = VecDeque::with_capacity(MAX_LOG_ENTRIES);
    let mut should_close = false;

    loop {
        loop {
            match receiver.try_recv() {
                Ok(UiMessage::Snapshot(next)) => {
                    snapshot = next;
                    if snapshot.is_loading() {
                        slow_hint.arm(Instant::now());
                    } else {
                        slow_hint.disarm();
                    }
                }
                Ok(UiMessage::Event(event)) => {
                    if logs.len() == MAX_LOG_ENTRIES {
                        logs.pop_front();
                    }
                    logs.push_back(format_event(&event));
                }
                Ok(UiMessage::Shutdown) => should_close = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    should_close = true;
                    break;
                }
            }
        }

        let view = snapshot.analysis.data.as_ref().map(scry_view::render);
        let hint_active = slow_hint.triggered(Instant::now());

        terminal.draw(|frame| draw(frame, &snapshot, view.as_ref(), &logs, hint_active))?;

        if should_close {
            break;
        }

        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        let _ = commands.blocking_send(PipelineCommand::Shutdown);
                        break;
                    }
                    KeyCode::Char('r') => {
                        let _ = commands.blocking_send(PipelineCommand::Refresh);
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(())
}

fn draw(
    frame: &mut Frame,
    snapshot: &PipelineSnapshot,
    view: Option<&MatchView>,
    logs: &VecDeque<String>,
    hint_active: bool,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(9),
            Constraint::Length(8),
        ])
        .split(frame.size());

    frame.render_widget(header(snapshot, hint_active), chunks[0]);

    let teams = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    let placeholder = team_placeholder(snapshot);
    render_team(
        frame,
        teams[0],
        "Blue Team",
        view.map(|v| &v.blue),
        placeholder,
        Color::Blue,
    );
    render_team(
        frame,
        teams[1],
        "Red Team",
        view.map(|v| &v.red),
        placeholder,
        Color::Red,
    );

    let items: Vec<ListItem> = logs
        .iter()
        .rev()
        .map(|entry| ListItem::new(entry.clone()))
        .collect();
    let list =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Recent events"));
    frame.render_widget(list, chunks[2]);
}

fn header(snapshot: &PipelineSnapshot, hint_active: bool) -> Paragraph<'static> {
    let identity = snapshot
        .identity
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".into());

    let summoner_line = match snapshot.summoner.data.as_ref() {
        Some(summoner) => {
            let mut line = format!(
                "{}#{} (level {})",
                summoner.display_name, summoner.tag, summoner.level
            );
            if let Some(rank) = summoner.rank_line() {
                line.push_str(" | ");
                line.push_str(&rank);
            }
            line
        }
        None if snapshot.summoner.is_fetching => "resolving...".into(),
        None => match snapshot.summoner.error.as_ref() {
            Some(err) => format!("error: {err}"),
            None => "-".into(),
        },
    };

    let top = Line::from(vec![
        Span::styled(
            "Scry",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::raw(identity),
        Span::raw("  "),
        Span::styled("[q]", Style::default().fg(Color::Yellow)),
        Span::raw(" quit  "),
        Span::styled("[r]", Style::default().fg(Color::Yellow)),
        Span::raw(" refresh"),
    ]);

    let mut status_spans = vec![
        Span::raw(summoner_line),
        Span::raw("  "),
        Span::styled(
            membership_status(snapshot),
            Style::default().fg(Color::Yellow),
        ),
    ];
    if let Some(err) = snapshot.analysis.error.as_ref() {
        status_spans.push(Span::styled(
            format!("  analysis error: {err}"),
            Style::default().fg(Color::Red),
        ));
    }
    if hint_active {
        status_spans.push(Span::styled(
            "  backend waking up, the first response can take a moment",
            Style::default().fg(Color::DarkGray),
        ));
    }

    Paragraph::new(vec![top, Line::from(status_spans)])
        .block(Block::default().borders(Borders::ALL).title("Status"))
}

fn membership_status(snapshot: &PipelineSnapshot) -> String {
    match snapshot.membership.verdict.as_ref() {
        Some(LiveGameMembership::Present(game)) => {
            let mut status = format!("IN GAME ({})", game.game_mode);
            if snapshot.membership.is_checking {
                status.push_str(" checking...");
            } else if snapshot.membership.is_stale {
                status.push_str(" (stale)");
            }
            status
        }
        Some(LiveGameMembership::Absent) => "Player is not currently in a game".into(),
        None if snapshot.membership.is_checking => "checking live game...".into(),
        None => "live status unknown".into(),
    }
}

fn team_placeholder(snapshot: &PipelineSnapshot) -> &'static str {
    if snapshot.analysis.is_fetching {
        "Analyzing match..."
    } else if snapshot.membership.is_definitively_absent {
        "No active game"
    } else {
        "-"
    }
}

fn render_team(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    team: Option<&TeamView>,
    placeholder: &str,
    accent: Color,
) {
    let block = Block::default().borders(Borders::ALL).title(Span::styled(
        title.to_string(),
        Style::default().fg(accent).add_modifier(Modifier::BOLD),
    ));

    let lines: Vec<Line> = match team {
        None => vec![Line::from(placeholder.to_string())],
        Some(team) => {
            let mut lines = vec![Line::from(Span::styled(
                team.summary.label(),
                Style::default().add_modifier(Modifier::BOLD),
            ))];
            if team.is_empty() {
                lines.push(Line::from(scry_view::NO_PLAYER_DATA));
            } else {
                for slot in &team.slots {
                    lines.push(Line::from(format_slot(slot)));
                }
            }
            lines
        }
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

pub fn format_slot(slot: &RosterSlot) -> String {
    match slot {
        RosterSlot::Analyzed(player) => format!(
            "[{:>7}] {:<24} {:>5.1}  {}",
            player.position.label(),
            format!("{}#{}", player.riot_id_name, player.riot_id_tag),
            player.total_score,
            player.classification.label(),
        ),
        RosterSlot::Hidden(hidden) => {
            let champion = hidden
                .champion_id
                .map(|id| format!(" champion {id}"))
                .unwrap_or_default();
            format!(
                "[{:>7}] hidden by streamer mode{champion}",
                hidden.position.label()
            )
        }
    }
}

fn format_event(event: &SystemEvent) -> String {
    let timestamp = event.timestamp.format("%H:%M:%S");
    match &event.payload {
        EventPayload::Lifecycle(lifecycle) => format!(
            "[{}] Lifecycle::{:?} {}",
            timestamp,
            lifecycle.phase,
            lifecycle.details.clone().unwrap_or_default()
        ),
        EventPayload::Summoner(stage) => format!(
            "[{}] Summoner {} {}",
            timestamp,
            stage.key,
            outcome_label(&stage.outcome)
        ),
        EventPayload::Analysis(stage) => format!(
            "[{}] Analysis {} {}",
            timestamp,
            stage.key,
            outcome_label(&stage.outcome)
        ),
        EventPayload::Membership(membership) => format!(
            "[{}] Membership {} {}",
            timestamp,
            membership.puuid,
            transition_label(&membership.transition)
        ),
        EventPayload::Ops(ops) => format!(
            "[{}] Ops {} [{}]",
            timestamp,
            ops.message,
            ops.tags.join(", ")
        ),
    }
}

fn outcome_label(outcome: &StageOutcome) -> String {
    match outcome {
        StageOutcome::Started => "started".into(),
        StageOutcome::Succeeded => "succeeded".into(),
        StageOutcome::Failed(reason) => format!("failed: {reason}"),
    }
}

fn transition_label(transition: &MembershipTransition) -> String {
    match transition {
        MembershipTransition::Checking => "checking".into(),
        MembershipTransition::Present { game_id } => format!("present in game {game_id}"),
        MembershipTransition::Absent => "absent".into(),
        MembershipTransition::Held { reason } => format!("held ({reason})"),
    }
}
