// src/neighbor/timers.rs

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use super::types::Event;

/// Keepalive period for a local hold time, or `None` when the hold time is 0.
pub fn keepalive_period(hold_time: u16) -> Option<Duration> {
    match hold_time {
        0 => None,
        h => Some(Duration::from_millis(h as u64 * 1000 / 3)),
    }
}

pub async fn timer_keepalive(
    period: Duration,
    tx: mpsc::Sender<Event>,
    mut cancel: oneshot::Receiver<()>,
) {
    log::debug!("starting keepalive timer, period {:?}", period);
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = &mut cancel => break,
            _ = ticks.tick() => {
                if tx.send(Event::KeepaliveTimerExpires).await.is_err() {
                    break;
                }
            }
        }
    }
    log::debug!("keepalive timer stopped");
}

/// A running keepalive timer task.
#[derive(Debug)]
pub struct KeepaliveTimer {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl KeepaliveTimer {
    pub fn start(period: Duration, tx: mpsc::Sender<Event>) -> Self {
        let (cancel, receiver) = oneshot::channel();
        let task = tokio::spawn(timer_keepalive(period, tx, receiver));
        KeepaliveTimer {
            cancel: Some(cancel),
            task,
        }
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.task.abort();
    }
}

impl Drop for KeepaliveTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
