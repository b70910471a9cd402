// THEORY:
// The dispatcher watches the per-frame signal decisions coming out of the
// pipeline. It owns the only "previous frame" memory in the runner, and uses it
// for two things:
//
// 1.  **Transition logging**: the signal is announced when it changes, so a
//     30 fps stream does not flood the log with identical lines.
// 2.  **Advisories**: when the light turns green, every ambulance with a known
//     GPS position is run past the route advisor (proximity to the signal and an
//     ETA to the destination). Advisor calls may block on the network, so a round
//     runs on the tokio blocking pool and at most one round is in flight; green
//     edges that arrive meanwhile are skipped. Advisories are informational and
//     never feed back into the signal decision.

use amburoute::{FrameReport, GeoPoint, GpsStore, RouteAdvisor, RouteEstimate, SignalState};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// What the route advisor said about one tracked ambulance.
#[derive(Debug, Clone, PartialEq)]
pub struct Advisory {
    pub ambulance_id: String,
    pub location: GeoPoint,
    pub near_signal: bool,
    pub route: RouteEstimate,
}

pub struct Dispatcher {
    store: GpsStore,
    advisor: Arc<dyn RouteAdvisor>,
    destination: GeoPoint,
    runtime: Handle,
    in_flight: Arc<AtomicBool>,
    last_signal: SignalState,
}

/// Clears the in-flight flag when an advisory round ends, even by panic.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Dispatcher {
    pub fn new(
        store: GpsStore,
        advisor: Arc<dyn RouteAdvisor>,
        destination: GeoPoint,
        runtime: Handle,
    ) -> Self {
        Self {
            store,
            advisor,
            destination,
            runtime,
            in_flight: Arc::new(AtomicBool::new(false)),
            last_signal: SignalState::default(),
        }
    }

    pub fn last_signal(&self) -> SignalState {
        self.last_signal
    }

    /// Feeds one frame's report. When the light has just turned green and no
    /// advisory round is running, starts one in the background and returns its
    /// handle. Never blocks on the advisor.
    pub fn observe(&mut self, report: &FrameReport) -> Option<JoinHandle<Vec<Advisory>>> {
        let previous = std::mem::replace(&mut self.last_signal, report.signal);
        log::debug!("signal {} ({} detections)", report.signal, report.detection_count);
        if previous == report.signal {
            return None;
        }

        match report.signal {
            SignalState::Go => {
                log::info!(
                    "Ambulance detected! Turning traffic light GREEN ({} match(es)).",
                    report.matches.len()
                );
                self.spawn_advisories()
            }
            SignalState::Stop => {
                log::info!("No ambulance detected. Traffic light back to RED.");
                None
            }
        }
    }

    fn spawn_advisories(&self) -> Option<JoinHandle<Vec<Advisory>>> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            log::debug!("advisory round still running, skipping");
            return None;
        }
        let guard = InFlightGuard(self.in_flight.clone());
        let store = self.store.clone();
        let advisor = self.advisor.clone();
        let destination = self.destination;
        Some(self.runtime.spawn_blocking(move || {
            let _guard = guard;
            advise(&store, advisor.as_ref(), destination)
        }))
    }
}

/// Asks `advisor` about every ambulance currently in `store`.
/// Advisor failures are logged and that ambulance is skipped.
pub fn advise(store: &GpsStore, advisor: &dyn RouteAdvisor, destination: GeoPoint) -> Vec<Advisory> {
    let mut advisories = Vec::new();
    for (ambulance_id, location) in store.snapshot() {
        let near_signal = match advisor.is_near(location) {
            Ok(near) => near,
            Err(err) => {
                log::warn!("{} proximity check for {} failed: {:#}", advisor.name(), ambulance_id, err);
                continue;
            }
        };
        let route = match advisor.fastest_route(location, destination) {
            Ok(route) => route,
            Err(err) => {
                log::warn!("{} route lookup for {} failed: {:#}", advisor.name(), ambulance_id, err);
                continue;
            }
        };
        log::info!(
            "ambulance {} at {}: near signal = {}, route {} / {}",
            ambulance_id,
            location,
            near_signal,
            route.duration,
            route.distance
        );
        advisories.push(Advisory {
            ambulance_id,
            location,
            near_signal,
            route,
        });
    }
    advisories
}

#[cfg(test)]
mod tests {
    use super::*;
    use amburoute::{Presence, StubRouteAdvisor};
    use anyhow::{Result, anyhow};
    use std::sync::RwLock;
    use std::sync::atomic::AtomicUsize;

    fn report(signal: SignalState) -> FrameReport {
        FrameReport {
            signal,
            presence: match signal {
                SignalState::Go => Presence::Present,
                SignalState::Stop => Presence::Absent,
            },
            matches: Vec::new(),
            detection_count: 0,
        }
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    fn dispatcher(store: &GpsStore, runtime: &tokio::runtime::Runtime) -> Dispatcher {
        Dispatcher::new(
            store.clone(),
            Arc::new(StubRouteAdvisor),
            GeoPoint::new(0.0, 0.0),
            runtime.handle().clone(),
        )
    }

    #[test]
    fn advises_only_on_turning_green() {
        let rt = runtime();
        let store = GpsStore::new();
        store.update("A1", GeoPoint::new(1.0, 2.0));
        let mut dispatcher = dispatcher(&store, &rt);

        assert!(dispatcher.observe(&report(SignalState::Stop)).is_none());
        let round = dispatcher.observe(&report(SignalState::Go)).expect("round started");
        assert_eq!(
            rt.block_on(round).unwrap(),
            vec![Advisory {
                ambulance_id: "A1".to_string(),
                location: GeoPoint::new(1.0, 2.0),
                near_signal: false,
                route: RouteEstimate::new("5 mins", "2 km"),
            }]
        );
        // Staying green does not re-advise.
        assert!(dispatcher.observe(&report(SignalState::Go)).is_none());
        assert!(dispatcher.observe(&report(SignalState::Stop)).is_none());
        let round = dispatcher.observe(&report(SignalState::Go)).expect("second round");
        assert_eq!(rt.block_on(round).unwrap().len(), 1);
    }

    #[test]
    fn empty_store_yields_no_advisories() {
        let rt = runtime();
        let store = GpsStore::new();
        let mut dispatcher = dispatcher(&store, &rt);
        let round = dispatcher.observe(&report(SignalState::Go)).unwrap();
        assert!(rt.block_on(round).unwrap().is_empty());
        assert_eq!(dispatcher.last_signal(), SignalState::Go);
    }

    /// Counts calls and blocks each one until the gate's write lock is released.
    struct GatedAdvisor {
        calls: AtomicUsize,
        gate: Arc<RwLock<()>>,
    }

    impl RouteAdvisor for GatedAdvisor {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn is_near(&self, _ambulance: GeoPoint) -> Result<bool> {
            let _open = self.gate.read().unwrap();
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }

        fn fastest_route(&self, _from: GeoPoint, _to: GeoPoint) -> Result<RouteEstimate> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RouteEstimate::new("1 min", "300 m"))
        }
    }

    #[test]
    fn flickering_signal_neither_blocks_nor_fans_out() {
        let rt = runtime();
        let store = GpsStore::new();
        for id in ["A1", "A2", "A3"] {
            store.update(id, GeoPoint::new(1.0, 1.0));
        }
        let gate = Arc::new(RwLock::new(()));
        let advisor = Arc::new(GatedAdvisor {
            calls: AtomicUsize::new(0),
            gate: gate.clone(),
        });
        let mut dispatcher = Dispatcher::new(
            store,
            advisor.clone(),
            GeoPoint::new(0.0, 0.0),
            rt.handle().clone(),
        );

        // Hold every advisor call while the detector flickers for 100 frames.
        let closed = gate.write().unwrap();
        let mut rounds = Vec::new();
        for frame in 0..100 {
            let signal = if frame % 2 == 0 { SignalState::Go } else { SignalState::Stop };
            rounds.extend(dispatcher.observe(&report(signal)));
        }
        assert_eq!(rounds.len(), 1);
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 0);
        drop(closed);

        let advisories = rt.block_on(rounds.pop().unwrap()).unwrap();
        assert_eq!(advisories.len(), 3);
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 6);

        // Once the round has finished, the next green edge starts a new one.
        dispatcher.observe(&report(SignalState::Stop));
        assert!(dispatcher.observe(&report(SignalState::Go)).is_some());
    }

    struct FlakyAdvisor;

    impl RouteAdvisor for FlakyAdvisor {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn is_near(&self, ambulance: GeoPoint) -> Result<bool> {
            if ambulance.latitude < 0.0 {
                Err(anyhow!("service unavailable"))
            } else {
                Ok(true)
            }
        }

        fn fastest_route(&self, _from: GeoPoint, _to: GeoPoint) -> Result<RouteEstimate> {
            Ok(RouteEstimate::new("1 min", "300 m"))
        }
    }

    #[test]
    fn advisor_failures_skip_that_ambulance() {
        let store = GpsStore::new();
        store.update("bad", GeoPoint::new(-1.0, 0.0));
        store.update("good", GeoPoint::new(1.0, 0.0));

        let advisories = advise(&store, &FlakyAdvisor, GeoPoint::new(0.0, 0.0));
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].ambulance_id, "good");
        assert!(advisories[0].near_signal);
    }
}
