use super::backoff::Backoff;
use super::client::{Event, LinkConfig};
use super::liveness::{LivenessAction, LivenessMonitor};
use super::port::{Connector, RawPort, RecvError};
use super::proto::{Inbound, Outbound};

use std::time::{Duration, Instant};

use crossbeam::channel;

/// The communication to the link thread occurs over a single channel.
/// This enum is used to multiplex data and control messages.
pub(crate) enum Control {
    Send(Outbound),
    Refresh,
}

/// Frames handled per loop iteration before timers get looked at again.
static MAX_FRAMES_PER_ITERATION: usize = 16;

pub(crate) struct LinkCore {
    url: String,
    connector: Box<dyn Connector>,
    control: channel::Receiver<Control>,
    status_queue: channel::Sender<Event>,

    port: Option<Box<dyn RawPort>>,
    backoff: Backoff,
    liveness: LivenessMonitor,

    /// Earliest time for the next connection attempt while disconnected.
    retry_at: Instant,
    poll_interval: Duration,
}

impl LinkCore {
    pub fn new(
        url: String,
        connector: Box<dyn Connector>,
        config: LinkConfig,
        control: channel::Receiver<Control>,
        status_queue: channel::Sender<Event>,
    ) -> LinkCore {
        let now = Instant::now();
        LinkCore {
            url,
            connector,
            control,
            status_queue,
            port: None,
            backoff: Backoff::new(config.reconnect),
            liveness: LivenessMonitor::new(config.liveness, now),
            retry_at: now,
            poll_interval: config.poll_interval,
        }
    }

    /// Returns false once nobody listens anymore, which ends the thread.
    fn emit(&self, event: Event) -> bool {
        self.status_queue.send(event).is_ok()
    }

    fn schedule_retry(&mut self) -> bool {
        let delay = self.backoff.next_delay();
        self.retry_at = Instant::now() + delay;
        self.emit(Event::Reconnecting {
            attempt: self.backoff.attempts(),
            delay,
        })
    }

    fn try_connect(&mut self) -> bool {
        match self.connector.connect(&self.url) {
            Ok(port) => {
                self.port = Some(port);
                self.backoff.reset();
                self.liveness.connected(Instant::now());
                self.emit(Event::Connected)
            }
            Err(err) => self.emit(Event::ConnectFailed(err.to_string())) && self.schedule_retry(),
        }
    }

    /// Drops the current connection, if any. Clears the liveness deadline.
    fn teardown(&mut self) -> bool {
        if let Some(mut port) = self.port.take() {
            port.close();
            self.liveness.disconnected();
            self.emit(Event::Disconnected)
        } else {
            true
        }
    }

    /// Connection lost on its own: reconnect after the next backoff delay.
    fn connection_lost(&mut self) -> bool {
        self.teardown() && self.schedule_retry()
    }

    /// Forced refresh: reconnect right away.
    fn refresh(&mut self) -> bool {
        let ok = self.teardown();
        self.retry_at = Instant::now();
        ok
    }

    fn transmit(&mut self, msg: Outbound) -> bool {
        let res = match self.port.as_mut() {
            Some(port) => port.send(&msg.to_json()),
            None => {
                return self.emit(Event::SendDropped(msg));
            }
        };
        match res {
            Ok(()) => true,
            Err(_) => self.emit(Event::SendDropped(msg)) && self.connection_lost(),
        }
    }

    fn handle_control(&mut self, ctl: Control) -> bool {
        match ctl {
            Control::Send(msg) => self.transmit(msg),
            Control::Refresh => self.emit(Event::Refreshing) && self.refresh(),
        }
    }

    fn process_liveness(&mut self) -> bool {
        match self.liveness.poll(Instant::now()) {
            Some(LivenessAction::SendHeartbeat) => {
                self.emit(Event::HeartbeatSent) && self.transmit(Outbound::Keepalive)
            }
            Some(LivenessAction::ForceRefresh) => {
                self.emit(Event::HeartbeatTimeout) && self.refresh()
            }
            None => true,
        }
    }

    /// Receives from the connection until it has nothing more to say for
    /// one poll interval.
    fn service_port(&mut self) -> bool {
        for _ in 0..MAX_FRAMES_PER_ITERATION {
            let res = match self.port.as_mut() {
                Some(port) => port.recv(),
                None => return true,
            };
            let keep_going = match res {
                Ok(text) => match Inbound::parse(&text) {
                    Ok(Inbound::KeepaliveResponse) => {
                        self.liveness.response();
                        true
                    }
                    Ok(Inbound::Snapshot(snapshot)) => self.emit(Event::Message(snapshot)),
                    Err(perr) => self.emit(Event::ProtocolError(perr)),
                },
                Err(RecvError::NotReady) => return true,
                Err(_err) => {
                    #[cfg(debug_assertions)]
                    eprintln!("link: connection to {} lost: {:?}", self.url, _err);
                    return self.connection_lost();
                }
            };
            if !keep_going {
                return false;
            }
        }
        true
    }

    pub fn run(&mut self) {
        use crossbeam::channel::{RecvTimeoutError, TryRecvError};

        'mainloop: loop {
            if self.port.is_none() && Instant::now() >= self.retry_at {
                if !self.try_connect() {
                    break 'mainloop;
                }
            }

            if !self.process_liveness() {
                break 'mainloop;
            }

            loop {
                match self.control.try_recv() {
                    Ok(ctl) => {
                        if !self.handle_control(ctl) {
                            break 'mainloop;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => break 'mainloop,
                }
            }

            if self.port.is_some() {
                if !self.service_port() {
                    break 'mainloop;
                }
            } else {
                let now = Instant::now();
                let wait = std::cmp::min(
                    self.retry_at.saturating_duration_since(now),
                    std::cmp::max(self.liveness.next_wakeup(now), self.poll_interval),
                );
                match self.control.recv_timeout(wait) {
                    Ok(ctl) => {
                        if !self.handle_control(ctl) {
                            break 'mainloop;
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break 'mainloop,
                }
            }
        }
        if let Some(mut port) = self.port.take() {
            port.close();
        }
        let _ = self.status_queue.try_send(Event::Exiting);
    }
}
