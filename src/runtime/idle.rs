//! Network-idle detection over CDP network events.
//!
//! The page counts as idle once no request has been in flight for a quiet
//! window. Requests that hang longer than the stall threshold are forced
//! complete so a single long-poll cannot hold the wait open, and the whole
//! wait is bounded by a timeout.

use std::collections::HashMap;
use std::pin::Pin;
use std::time::{Duration, Instant};

use chromiumoxide::cdp::IntoEventKind;
use chromiumoxide::cdp::browser_protocol::network::{
    self, EventLoadingFailed, EventLoadingFinished, EventRequestServedFromCache,
    EventRequestWillBeSent, ResourceType,
};
use chromiumoxide::listeners::EventStream;
use chromiumoxide::page::Page as ChromiumPage;
use futures_util::StreamExt;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, MissedTickBehavior, Sleep},
};

use crate::browser::BrowserRuntimeError;

const STALL_THRESHOLD: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleSettings {
    pub timeout: Duration,
    pub quiet_window: Duration,
}

enum NetworkEvent {
    Started { request_id: String, url: String },
    Finished { request_id: String },
}

/// Requests currently in flight, keyed by CDP request id.
#[derive(Debug, Default)]
struct InflightRequests {
    requests: HashMap<String, (String, Instant)>,
}

impl InflightRequests {
    fn start(&mut self, request_id: String, url: String, now: Instant) {
        self.requests.insert(request_id, (url, now));
    }

    fn finish(&mut self, request_id: &str) -> bool {
        self.requests.remove(request_id).is_some()
    }

    fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn len(&self) -> usize {
        self.requests.len()
    }

    /// Drop requests older than `threshold`, returning their URLs.
    fn sweep_stalled(&mut self, now: Instant, threshold: Duration) -> Vec<String> {
        let stalled: Vec<String> = self
            .requests
            .iter()
            .filter(|(_, (_, started))| now.duration_since(*started) > threshold)
            .map(|(id, _)| id.clone())
            .collect();

        stalled
            .into_iter()
            .filter_map(|id| self.requests.remove(&id).map(|(url, _)| url))
            .collect()
    }
}

pub(super) async fn wait_for_network_idle(
    page: &ChromiumPage,
    settings: IdleSettings,
) -> Result<(), BrowserRuntimeError> {
    if let Err(err) = page.execute(network::EnableParams::default()).await {
        log::debug!("failed to enable Network domain before idle wait: {err}");
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let listeners = vec![
        spawn_listener(
            page.event_listener::<EventRequestWillBeSent>()
                .await
                .map_err(cdp_error)?,
            tx.clone(),
            |ev: EventRequestWillBeSent| {
                if matches!(
                    ev.r#type.as_ref(),
                    Some(ResourceType::WebSocket | ResourceType::EventSource)
                ) {
                    return None;
                }
                Some(NetworkEvent::Started {
                    request_id: ev.request_id.as_ref().to_string(),
                    url: ev.request.url.clone(),
                })
            },
        ),
        spawn_listener(
            page.event_listener::<EventLoadingFinished>()
                .await
                .map_err(cdp_error)?,
            tx.clone(),
            |ev: EventLoadingFinished| {
                Some(NetworkEvent::Finished {
                    request_id: ev.request_id.as_ref().to_string(),
                })
            },
        ),
        spawn_listener(
            page.event_listener::<EventLoadingFailed>()
                .await
                .map_err(cdp_error)?,
            tx.clone(),
            |ev: EventLoadingFailed| {
                Some(NetworkEvent::Finished {
                    request_id: ev.request_id.as_ref().to_string(),
                })
            },
        ),
        spawn_listener(
            page.event_listener::<EventRequestServedFromCache>()
                .await
                .map_err(cdp_error)?,
            tx.clone(),
            |ev: EventRequestServedFromCache| {
                Some(NetworkEvent::Finished {
                    request_id: ev.request_id.as_ref().to_string(),
                })
            },
        ),
    ];
    drop(tx);

    let outcome = await_quiet(&mut rx, settings).await;

    for handle in listeners {
        handle.abort();
    }

    outcome
}

/// Drive the idle state machine until the quiet window elapses with nothing
/// in flight, the event stream ends, or `settings.timeout` expires.
async fn await_quiet(
    rx: &mut mpsc::UnboundedReceiver<NetworkEvent>,
    settings: IdleSettings,
) -> Result<(), BrowserRuntimeError> {
    let mut inflight = InflightRequests::default();
    let mut quiet_timer: Option<Pin<Box<Sleep>>> = Some(Box::pin(time::sleep(settings.quiet_window)));
    let mut timeout_timer = Box::pin(time::sleep(settings.timeout));
    let mut stall_tick = time::interval(Duration::from_millis(500));
    stall_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(NetworkEvent::Started { request_id, url }) => {
                        inflight.start(request_id, url, Instant::now());
                        quiet_timer = None;
                    }
                    Some(NetworkEvent::Finished { request_id }) => {
                        inflight.finish(&request_id);
                        if inflight.is_empty() && quiet_timer.is_none() {
                            quiet_timer = Some(Box::pin(time::sleep(settings.quiet_window)));
                        }
                    }
                    None => return Ok(()),
                }
            }
            _ = async {
                if let Some(timer) = quiet_timer.as_mut() {
                    timer.as_mut().await;
                }
            }, if quiet_timer.is_some() => {
                return Ok(());
            }
            _ = stall_tick.tick() => {
                for url in inflight.sweep_stalled(Instant::now(), STALL_THRESHOLD) {
                    log::debug!("forcing completion of stalled request {url}");
                }
                if inflight.is_empty() && quiet_timer.is_none() {
                    quiet_timer = Some(Box::pin(time::sleep(settings.quiet_window)));
                }
            }
            _ = &mut timeout_timer => {
                log::warn!(
                    "network idle not reached within {:?}; {} requests in flight",
                    settings.timeout,
                    inflight.len()
                );
                return Err(BrowserRuntimeError::Timeout {
                    what: "network idle",
                    elapsed: settings.timeout,
                });
            }
        }
    }
}

fn spawn_listener<T, F>(
    mut stream: EventStream<T>,
    tx: mpsc::UnboundedSender<NetworkEvent>,
    map: F,
) -> JoinHandle<()>
where
    T: IntoEventKind + Clone + Unpin + Send + 'static,
    F: Fn(T) -> Option<NetworkEvent> + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = stream.next().await {
            let owned = (*event).clone();
            if let Some(mapped) = map(owned) {
                if tx.send(mapped).is_err() {
                    break;
                }
            }
        }
    })
}

fn cdp_error(err: impl std::fmt::Display) -> BrowserRuntimeError {
    BrowserRuntimeError::Message(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finishing_unknown_request_is_ignored() {
        let mut inflight = InflightRequests::default();
        inflight.start("1".into(), "https://a.test/app.js".into(), Instant::now());
        assert!(!inflight.finish("2"));
        assert!(inflight.finish("1"));
        assert!(inflight.is_empty());
    }

    fn settings(timeout_ms: u64, quiet_ms: u64) -> IdleSettings {
        IdleSettings {
            timeout: Duration::from_millis(timeout_ms),
            quiet_window: Duration::from_millis(quiet_ms),
        }
    }

    #[tokio::test]
    async fn quiet_network_settles_after_window() {
        let (_tx, mut rx) = mpsc::unbounded_channel();
        let result = await_quiet(&mut rx, settings(5_000, 20)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn finished_request_restarts_quiet_window() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(NetworkEvent::Started {
            request_id: "1".into(),
            url: "https://a.test/app.js".into(),
        })
        .unwrap();
        tx.send(NetworkEvent::Finished {
            request_id: "1".into(),
        })
        .unwrap();
        let result = await_quiet(&mut rx, settings(5_000, 20)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn busy_network_times_out_with_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(NetworkEvent::Started {
            request_id: "1".into(),
            url: "https://a.test/slow".into(),
        })
        .unwrap();
        let err = await_quiet(&mut rx, settings(100, 500))
            .await
            .expect_err("request never finishes before the deadline");
        assert!(matches!(
            err,
            BrowserRuntimeError::Timeout {
                what: "network idle",
                ..
            }
        ));
    }

    #[test]
    fn stalled_requests_are_swept() {
        let mut inflight = InflightRequests::default();
        let start = Instant::now();
        inflight.start("old".into(), "https://a.test/poll".into(), start);
        inflight.start(
            "fresh".into(),
            "https://a.test/img.png".into(),
            start + Duration::from_secs(3),
        );

        let swept = inflight.sweep_stalled(start + Duration::from_secs(4), STALL_THRESHOLD);
        assert_eq!(swept, vec!["https://a.test/poll".to_string()]);
        assert_eq!(inflight.len(), 1);
    }
}
