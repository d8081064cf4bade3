//! bus-log
//!
//! Follows a bus status board headlessly, logging connectivity, server
//! errors and every route status change.

use busboard::board::render::Frame;
use busboard::board::{Notice, Notifier, Reconciled, Session, Surface};
use busboard::link::{Event, Interface};
use busboard_tools::{
    board_opts, board_parseopts, describe_event, describe_outcome, log, ToolError,
};

use crossbeam::channel;
use std::env;
use std::process::ExitCode;
use std::time::Duration;

struct LogSurface {
    tf: String,
    verbose: bool,
}

impl Surface for LogSurface {
    fn present(&mut self, frame: &Frame) {
        if !self.verbose {
            return;
        }
        let counts: Vec<String> = frame
            .columns()
            .iter()
            .map(|col| format!("{}: {}", col.title, col.routes.len()))
            .collect();
        log!(self.tf, "Board: {}", counts.join(", "));
        if let Some(banner) = frame.announcement() {
            if !banner.text.is_empty() {
                log!(
                    self.tf,
                    "Announcement{}: {}",
                    if banner.alert { " (your route)" } else { "" },
                    banner.text
                );
            }
        }
        if let Frame::Afternoon(f) = frame {
            log!(self.tf, "{}: {}", f.personal.route_name, f.personal.text);
        }
    }
}

struct LogNotifier {
    tf: String,
}

impl Notifier for LogNotifier {
    fn notify(&mut self, notice: Notice) {
        log!(self.tf, "NOTICE: {}", notice.text);
    }
}

fn main() -> ExitCode {
    let mut opts = board_opts();
    opts.optopt("T", "", "Exit after this many seconds", "seconds");

    let args: Vec<String> = env::args().collect();

    macro_rules! die{
        ($f:expr,$($a:tt)*)=>{
        {
            die!(format!($f, $($a)*));
        }
        };
        ($msg:expr)=>{
        {
            eprintln!("ERROR: {}", $msg);
            return ExitCode::FAILURE;
        }
        };
    }
    macro_rules! die_usage{
        ($msg:expr)=>{
        {
            let usage = format!(
                "Usage: {} [-c config] [-u url] [--morning | --afternoon] [-T seconds] [-v]",
                &args[0]
            );
            die!("{}\n{}", $msg, opts.usage(&usage));
        }
        };
    }

    let parsed = match board_parseopts(&opts, &args[1..]) {
        Ok(parsed) => parsed,
        Err(ToolError::Usage(msg)) => die_usage!(msg),
        Err(err) => die!(err),
    };
    if parsed.matches.opt_present("h") {
        println!("{}", opts.usage(&format!("Usage: {} [options]", &args[0])));
        return ExitCode::SUCCESS;
    }

    let deadline = match parsed.matches.opt_str("T") {
        Some(secs) => match secs.parse::<u64>() {
            Ok(secs) => channel::after(Duration::from_secs(secs)),
            Err(_) => die_usage!(format!("Invalid time limit '{}'", secs)),
        },
        None => channel::never(),
    };

    let tf = parsed.tf.clone();
    let verbose = parsed.verbose || parsed.debugging;
    log!(tf, "Following {}", parsed.url);

    let link = Interface::with_config(&parsed.url, parsed.config.link.link_config());
    let surface = LogSurface {
        tf: tf.clone(),
        verbose,
    };
    let now = chrono::Local::now().naive_local();
    let mut session = Session::new(&parsed.config, now, surface, link.outlet())
        .with_notifier(Box::new(LogNotifier { tf: tf.clone() }));

    use crossbeam::select;
    loop {
        select! {
            recv(link.receiver()) -> res => {
                let event = match res {
                    Ok(event) => event,
                    Err(_) => die!("Link thread died unexpectedly"),
                };
                let line = match &event {
                    Event::HeartbeatSent if parsed.debugging => Some("Heartbeat sent".to_string()),
                    Event::Message(snapshot) if parsed.debugging => Some(format!("{:?}", snapshot)),
                    other => describe_event(other, verbose),
                };
                if let Some(line) = line {
                    log!(tf, line);
                }
                if let Event::Exiting = event {
                    return ExitCode::FAILURE;
                }
                match session.handle(event) {
                    Some(outcome @ Reconciled::Applied { .. }) => {
                        for line in describe_outcome(&outcome) {
                            log!(tf, line);
                        }
                    }
                    // already reported through the notifier
                    Some(Reconciled::Rejected(_)) | None => {}
                }
            }
            recv(deadline) -> _ => {
                if verbose {
                    log!(tf, "Time limit reached");
                }
                return ExitCode::SUCCESS;
            }
        }
    }
}
