use busboard::board::notice::NoticeKind;
use busboard::board::render::{AfternoonFrame, Column, Frame};
use busboard::board::{BoardKind, Notice, Notifier, Session, SessionError, Surface};
use busboard::link::proto::{Ident, Status};
use busboard::link::{Event as LinkEvent, Interface, LinkOutlet};
use busboard_tools::{board_opts, board_parseopts, describe_event};

use std::cell::RefCell;
use std::io::{stdout, Stdout, Write};
use std::rc::Rc;
use std::env;
use std::time::{Duration, Instant};

use futures::{future::FutureExt, select, StreamExt};
use futures_timer::Delay;

use crossterm::ExecutableCommand;
use crossterm::{
    cursor::*,
    event::{Event, EventStream, KeyCode},
    style::*,
    terminal::*,
};

/// Notice currently on screen and when it goes away.
type NoticeSlot = Rc<RefCell<Option<(Notice, Option<Instant>)>>>;

struct TermNotifier {
    slot: NoticeSlot,
}

impl Notifier for TermNotifier {
    fn notify(&mut self, notice: Notice) {
        let until = notice.dismiss_after.map(|d| Instant::now() + d);
        *self.slot.borrow_mut() = Some((notice, until));
    }
}

#[derive(Default)]
struct TermSurface {
    frame: Option<Frame>,
    dirty: bool,
}

impl Surface for TermSurface {
    fn present(&mut self, frame: &Frame) {
        self.frame = Some(frame.clone());
        self.dirty = true;
    }
}

fn color(name: &str) -> Color {
    match name {
        "green" => Color::Green,
        "blue" => Color::Blue,
        "red" => Color::Red,
        "orange" => Color::DarkYellow,
        _ => Color::White,
    }
}

/// Local editing state of the terminal board.
#[derive(Default)]
struct Ui {
    cursor: usize,
    /// Announcement being typed, admins only.
    draft: Option<String>,
    status_line: String,
}

fn line(stdout: &mut Stdout, text: &str) {
    _ = stdout.execute(Clear(ClearType::CurrentLine));
    print!("{}\r\n", text);
}

fn draw_column(stdout: &mut Stdout, col: &Column) {
    _ = stdout.execute(SetForegroundColor(color(&col.color)));
    line(stdout, &format!("[{}] {}", col.icon, col.title));
    _ = stdout.execute(SetForegroundColor(Color::White));
    match &col.empty {
        Some(text) => line(stdout, &format!("    {}", text)),
        None => {
            for route in &col.routes {
                let marker = if route.is_user { "*" } else { " " };
                let bus = match &route.bus_number {
                    Some(n) => format!(" (bus {})", n),
                    None => "".to_string(),
                };
                line(stdout, &format!("  {} {}{}", marker, route.name, bus));
            }
        }
    }
    line(stdout, "");
}

fn draw_afternoon(stdout: &mut Stdout, f: &AfternoonFrame, ui: &Ui) {
    _ = stdout.execute(SetForegroundColor(color(&f.personal.color)));
    line(
        stdout,
        &format!(
            "[{}] {}{}: {}",
            f.personal.icon,
            f.personal.route_name,
            match &f.personal.bus_number {
                Some(n) => format!(" (bus {})", n),
                None => "".to_string(),
            },
            f.personal.text
        ),
    );
    _ = stdout.execute(SetForegroundColor(Color::White));
    line(stdout, "");
    let cells: Vec<String> = f
        .seats
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = match &cell.occupant {
                Some(route) => format!("{}:{}", cell.space, route.name),
                None => format!("{}:-", cell.space),
            };
            let name = if cell.selected { format!("<{}>", name) } else { name };
            if i == ui.cursor {
                format!("[{}]", name)
            } else {
                format!(" {} ", name)
            }
        })
        .collect();
    line(stdout, &format!("Spaces: {}", cells.join("")));
    line(stdout, &format!("[{}] {}", f.action.icon(), f.action.label()));
}

fn draw(stdout: &mut Stdout, frame: &Frame, ui: &Ui, connected: bool, notice: Option<&Notice>) {
    _ = stdout.execute(MoveTo(0, 0));
    _ = stdout.execute(Clear(ClearType::All));
    line(
        stdout,
        &format!(
            "Bus board ({}){}",
            match frame {
                Frame::Morning(_) => "morning",
                Frame::Afternoon(_) => "afternoon",
            },
            if connected { "" } else { "  [offline]" }
        ),
    );
    if let Some(notice) = notice {
        _ = stdout.execute(SetForegroundColor(match notice.kind {
            NoticeKind::Restored => Color::Green,
            _ => Color::Red,
        }));
        line(stdout, &notice.text);
        _ = stdout.execute(SetForegroundColor(Color::White));
    }
    if let Some(banner) = frame.announcement() {
        let text = match &ui.draft {
            Some(draft) => format!("{}_", draft),
            None => banner.text.clone(),
        };
        if banner.alert {
            _ = stdout.execute(SetForegroundColor(Color::Red));
        }
        line(stdout, &format!("Announcement: {}", text));
        _ = stdout.execute(SetForegroundColor(Color::White));
    }
    line(stdout, "");
    for col in frame.columns() {
        draw_column(stdout, col);
    }
    if let Frame::Afternoon(f) = frame {
        draw_afternoon(stdout, f, ui);
    }
    line(stdout, "");
    line(stdout, &ui.status_line);
    _ = stdout.flush();
}

fn seat_count(frame: Option<&Frame>) -> usize {
    match frame {
        Some(Frame::Afternoon(f)) => f.seats.len(),
        _ => 0,
    }
}

fn cursor_space(frame: Option<&Frame>, cursor: usize) -> Option<Ident> {
    match frame {
        Some(Frame::Afternoon(f)) => f.seats.get(cursor).map(|c| c.space.clone()),
        _ => None,
    }
}

/// Route that status keys act on: the occupant of the selected space,
/// else the user's route.
fn status_target(session: &Session<TermSurface, LinkOutlet>) -> Option<Ident> {
    let state = session.state();
    session
        .seat_map()
        .selected()
        .and_then(|space| state.route_at(space))
        .or_else(|| state.user_route())
        .map(|r| r.id.clone())
}

fn report(ui: &mut Ui, res: Result<(), SessionError>, ok: &str) {
    ui.status_line = match res {
        Ok(()) => ok.to_string(),
        Err(err) => err.to_string(),
    };
}

async fn run_board(
    link: Interface,
    mut session: Session<TermSurface, LinkOutlet>,
    slot: NoticeSlot,
    verbose: bool,
) {
    let mut reader = EventStream::new();
    let mut stdout = stdout();
    let mut ui = Ui::default();
    session.redraw();

    'drawing: loop {
        let mut delay = Delay::new(Duration::from_millis(50)).fuse();
        let mut event = reader.next().fuse();

        select! {
            _ = delay => {
                for evt in link.try_iter() {
                    if let LinkEvent::Connected | LinkEvent::Disconnected = evt {
                        session.surface_mut().dirty = true;
                    }
                    if verbose {
                        if let Some(text) = describe_event(&evt, verbose) {
                            ui.status_line = text;
                            session.surface_mut().dirty = true;
                        }
                    }
                    if let LinkEvent::Exiting = evt {
                        break 'drawing;
                    }
                    session.handle(evt);
                }
            },
            some_event = event => {
                let key = match some_event {
                    Some(Ok(Event::Key(key))) => key.code,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        ui.status_line = format!("Error {}", e);
                        continue;
                    }
                    None => break 'drawing,
                };
                if let Some(draft) = ui.draft.as_mut() {
                    match key {
                        KeyCode::Char(c) => draft.push(c),
                        KeyCode::Backspace => {
                            draft.pop();
                        }
                        KeyCode::Enter => {
                            let text = draft.clone();
                            ui.draft = None;
                            let res = session.announce(&text);
                            report(&mut ui, res, "Announcement sent");
                        }
                        KeyCode::Esc => ui.draft = None,
                        _ => {}
                    }
                    session.surface_mut().dirty = true;
                    continue;
                }
                let seats = seat_count(session.surface().frame.as_ref());
                match key {
                    KeyCode::Char('q') | KeyCode::Esc => break 'drawing,
                    KeyCode::Char('r') => {
                        ui.status_line = match link.refresh() {
                            Ok(()) => "Refreshing".to_string(),
                            Err(_) => "Link is gone".to_string(),
                        };
                    }
                    KeyCode::Left if seats > 0 => ui.cursor = (ui.cursor + seats - 1) % seats,
                    KeyCode::Right if seats > 0 => ui.cursor = (ui.cursor + 1) % seats,
                    KeyCode::Enter => {
                        let space = cursor_space(session.surface().frame.as_ref(), ui.cursor);
                        if let Err(err) = session.click_seat(space.as_ref()) {
                            ui.status_line = err.to_string();
                        }
                    }
                    KeyCode::Char('x') => {
                        if let Err(err) = session.click_seat(None) {
                            ui.status_line = err.to_string();
                        }
                    }
                    KeyCode::Char(c @ ('a' | 'o' | 'd')) => {
                        let status = Status::from_code(&c.to_string());
                        match (status_target(&session), status) {
                            (Some(id), Some(status)) => {
                                let res = session.set_status(id, status);
                                report(&mut ui, res, "Status sent");
                            }
                            _ => ui.status_line = "No route to update".to_string(),
                        }
                    }
                    KeyCode::Char('n') => {
                        match session.state().user_route().map(|r| r.id.clone()) {
                            Some(id) => {
                                let res = session.assign_selected(id);
                                report(&mut ui, res, "Assignment sent");
                            }
                            None => ui.status_line = "No route assigned to you".to_string(),
                        }
                    }
                    KeyCode::Char('c') => {
                        let res = session.clear_selected();
                        report(&mut ui, res, "Removal sent");
                    }
                    KeyCode::Char('e') => {
                        if session.state().is_admin() {
                            let current = session.state().announcement().unwrap_or("");
                            ui.draft = Some(current.to_string());
                        } else {
                            ui.status_line = SessionError::NotPermitted.to_string();
                        }
                    }
                    _ => {}
                }
                session.surface_mut().dirty = true;
            }
        }

        let expired = match &*slot.borrow() {
            Some((_, Some(until))) => Instant::now() >= *until,
            _ => false,
        };
        if expired {
            *slot.borrow_mut() = None;
            session.surface_mut().dirty = true;
        }

        let connected = session.state().is_connected();
        let surface = session.surface_mut();
        if surface.dirty {
            surface.dirty = false;
            if let Some(frame) = &surface.frame {
                let notice = slot.borrow();
                draw(&mut stdout, frame, &ui, connected, notice.as_ref().map(|(n, _)| n));
            }
        }
    }
}

fn main() -> std::io::Result<()> {
    let opts = board_opts();
    let args: Vec<String> = env::args().collect();
    let parsed = match board_parseopts(&opts, &args[1..]) {
        Ok(parsed) => parsed,
        Err(err) => {
            let usage = format!(
                "Usage: {} [-c config] [-u url] [--morning | --afternoon] [--admin]",
                &args[0]
            );
            eprintln!("ERROR: {}\n{}", err, opts.usage(&usage));
            std::process::exit(1);
        }
    };
    if parsed.matches.opt_present("h") {
        println!("{}", opts.usage(&format!("Usage: {} [options]", &args[0])));
        println!("Keys: q quit, r refresh, Left/Right move, Enter select, x deselect");
        if parsed.config.board == BoardKind::Afternoon {
            println!("      a/o/d set status, n assign your route, c clear space, e announce");
        }
        return Ok(());
    }

    let link = Interface::with_config(&parsed.url, parsed.config.link.link_config());
    let slot: NoticeSlot = Rc::new(RefCell::new(None));
    let now = chrono::Local::now().naive_local();
    let session = Session::new(&parsed.config, now, TermSurface::default(), link.outlet())
        .with_notifier(Box::new(TermNotifier { slot: slot.clone() }));

    let mut stdout = stdout();

    //setup terminal
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(SetBackgroundColor(Color::Black))?;
    stdout.execute(SetForegroundColor(Color::White))?;
    stdout.execute(Clear(ClearType::All))?;
    stdout.execute(Hide)?;

    async_std::task::block_on(run_board(link, session, slot, parsed.verbose));

    //clean up terminal on end
    stdout.execute(LeaveAlternateScreen)?;
    stdout.execute(Show)?;
    disable_raw_mode()?;

    Ok(())
}
