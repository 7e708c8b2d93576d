//! Periodic refresh.
//!
//! A [`PollHandle`] runs a tick on a fixed period in a background task. Ticks
//! never overlap: a tick that is still running when the next one falls due
//! causes that one to be skipped. Stopping cancels a tick in flight.

use std::{future::Future, time::Duration};

use tokio::{
  sync::mpsc,
  task::JoinHandle,
  time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};

/// How often clients are re-fetched by default.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(30);

pub struct PollHandle {
  shutdown_tx: mpsc::Sender<()>,
  task:        Option<JoinHandle<()>>,
}

impl PollHandle {
  /// Start polling. The first tick runs immediately.
  pub fn spawn<F, Fut>(period: Duration, mut tick: F) -> Self
  where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
  {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    let task = tokio::spawn(async move {
      let mut interval = time::interval(period);
      interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
      debug!(?period, "poller started");

      loop {
        tokio::select! {
          _ = shutdown_rx.recv() => break,
          _ = interval.tick() => {}
        }
        tokio::select! {
          _ = shutdown_rx.recv() => {
            debug!("poll cancelled mid-tick");
            break;
          }
          () = tick() => {}
        }
      }

      debug!("poller stopped");
    });

    Self { shutdown_tx, task: Some(task) }
  }

  /// Signal the task and wait for it to exit.
  pub async fn stop(mut self) {
    let _ = self.shutdown_tx.try_send(());
    let Some(task) = self.task.take() else { return };
    if let Err(e) = task.await {
      warn!(error = %e, "poller task failed");
    }
  }

  pub fn is_finished(&self) -> bool { self.task.as_ref().is_none_or(JoinHandle::is_finished) }
}

impl Drop for PollHandle {
  fn drop(&mut self) {
    if let Some(task) = &self.task {
      task.abort();
    }
  }
}
