//! Background task evicting stale reassembly sessions.
//!
//! Partial sessions whose senders went quiet are only reclaimed by a sweep.
//! [`spawn_sweeper`] runs [`Reassembler::sweep_at`] on a tokio interval until
//! its [`CancellationToken`] fires, so applications get time-based eviction
//! without threading a timer through their receive loop.

use std::{sync::Arc, time::Duration};

use log::debug;
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;

use crate::{
    fragment::{EnvelopeCodec, Reassembler},
    message::MessageDecoder,
};

/// Spawn a task sweeping `engine` every `period`, evicting sessions idle for
/// longer than `timeout`.
///
/// The first sweep happens one `period` after spawning. Cancelling `shutdown`
/// stops the task; await the returned handle to join it.
///
/// # Panics
///
/// Panics if `period` is zero.
pub fn spawn_sweeper<D, C>(
    engine: Arc<Reassembler<D, C>>,
    period: Duration,
    timeout: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    D: MessageDecoder + Send + Sync + 'static,
    D::Message: 'static,
    C: EnvelopeCodec + Send + Sync + 'static,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => break,

                tick = ticker.tick() => {
                    // Tokio's clock drives the sweep so paused-time tests stay
                    // deterministic.
                    engine.sweep_at(tick.into_std(), timeout);
                }
            }
        }
        debug!("sweeper stopped: sessions={}", engine.session_count());
    })
}
