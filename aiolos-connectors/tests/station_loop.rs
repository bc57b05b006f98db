//! Station loop passes against doubles

mod common;

use std::cell::Cell;

use aiolos_connectors::{Iteration, StationClient, StationLoop};
use aiolos_core::engine::{ResilienceEngine, RestartReason};
use aiolos_core::schedule::MaintenanceTrigger;
use aiolos_core::time::{FixedTime, TimeSource, Timestamp};
use aiolos_core::{ResilienceConfig, StationSettings};
use common::{FakeOta, FakeSensors, MemoryTransport, NullWatchdog, RecordingSystem, StaticLink};

const MINUTE: u64 = 60_000;
const HOUR: u64 = 60 * MINUTE;

type TestLoop = StationLoop<
    StaticLink,
    NullWatchdog,
    RecordingSystem,
    FixedTime,
    MemoryTransport,
    FakeSensors,
    FakeOta,
>;

fn station(link: StaticLink, transport: MemoryTransport) -> TestLoop {
    station_with(link, transport, StationSettings::default(), FakeOta::default())
}

/// Loop whose engine clock stays at zero; passes are timed by `run_once`
fn station_with(
    link: StaticLink,
    transport: MemoryTransport,
    settings: StationSettings,
    ota: FakeOta,
) -> TestLoop {
    let engine = ResilienceEngine::new(
        link,
        NullWatchdog::default(),
        RecordingSystem::default(),
        FixedTime::new(0),
        ResilienceConfig::default(),
    );
    let client = StationClient::new(transport, "ridge").unwrap();
    StationLoop::new(engine, client, FakeSensors::default(), ota, settings, 0)
}

fn paths(station: &TestLoop) -> Vec<&str> {
    station.client().transport().paths()
}

#[test]
fn first_pass_fetches_config_only() {
    let mut s = station(StaticLink::up().at(12, 0), MemoryTransport::new());

    assert_eq!(s.run_once(0), Iteration::Ran { online: true, sent: 1 });
    assert_eq!(paths(&s), ["/stations/ridge/config"]);
    assert!(s.clock().is_synced());
}

#[test]
fn tasks_run_on_their_intervals() {
    let mut s = station(StaticLink::up().at(12, 0), MemoryTransport::new());
    s.run_once(0);

    assert_eq!(s.run_once(15 * MINUTE), Iteration::Ran { online: true, sent: 3 });
    assert_eq!(
        paths(&s)[1..],
        ["/stations/ridge/diagnostics", "/stations/ridge/wind", "/stations/ridge/temperature"]
    );

    let diagnostics = s.client().transport().sent[1].body.clone().unwrap();
    assert!(diagnostics.contains(r#""signal_quality":17"#));
    assert!(diagnostics.contains(r#""uptime":900"#));

    // only the wind interval has elapsed again
    assert_eq!(s.run_once(16 * MINUTE), Iteration::Ran { online: true, sent: 1 });
    assert_eq!(s.client().transport().count("/wind"), 2);
}

#[test]
fn failed_request_stops_the_pass() {
    let transport = MemoryTransport::new().reply(200, None).reply(503, None);
    let mut s = station(StaticLink::up().at(12, 0), transport);
    s.run_once(0);

    assert_eq!(s.run_once(15 * MINUTE), Iteration::Ran { online: true, sent: 0 });
    assert_eq!(paths(&s).len(), 2);
    assert!(s.engine().is_throttled(15 * MINUTE + 4_999));

    // throttle lifted: the deferred uploads go out, diagnostics waits a full interval
    let resumed = 15 * MINUTE + 5_000;
    assert_eq!(s.run_once(resumed), Iteration::Ran { online: true, sent: 2 });
    assert_eq!(s.client().transport().count("/diagnostics"), 1);
    assert_eq!(s.engine().http_backoff().failed_attempts(), 0);
}

#[test]
fn offline_pass_samples_but_sends_nothing() {
    let mut s = station(StaticLink::down(), MemoryTransport::new());

    assert_eq!(s.run_once(0), Iteration::Ran { online: false, sent: 0 });
    assert_eq!(s.run_once(3_000), Iteration::Ran { online: false, sent: 0 });
    assert_eq!(s.sensors().samples, 1);
    assert!(s.client().transport().sent.is_empty());
}

#[test]
fn sleeps_through_the_night_window() {
    let mut s = station(StaticLink::up().at(23, 0), MemoryTransport::new());

    assert_eq!(s.run_once(0), Iteration::Slept(10 * 3600));
    let system = s.engine().system();
    assert_eq!(system.wake_timer_secs, Some(10 * 3600));
    assert_eq!(system.deep_sleeps, 1);
    assert!(s.engine().modem().powered_off);
    assert!(s.client().transport().sent.is_empty());
}

#[test]
fn no_sleep_without_network_time() {
    let mut s = station(StaticLink::up(), MemoryTransport::new());
    assert_eq!(s.run_once(0), Iteration::Ran { online: true, sent: 1 });
    assert_eq!(s.engine().system().deep_sleeps, 0);
}

#[test]
fn scheduled_window_opens_and_expires() {
    let mut s = station(StaticLink::up().at(10, 5), MemoryTransport::new());

    // clock is not synced yet when the first window check runs
    s.run_once(0);
    assert!(!s.maintenance().is_active());

    s.run_once(MINUTE);
    assert_eq!(s.maintenance().trigger(), Some(MaintenanceTrigger::Scheduled));
    assert_eq!(s.ota().begun, [MaintenanceTrigger::Scheduled]);

    // uploads continue during maintenance
    assert_eq!(s.run_once(2 * MINUTE), Iteration::Ran { online: true, sent: 1 });
    assert!(s.maintenance().is_active());

    s.run_once(16 * MINUTE);
    assert!(!s.maintenance().is_active());
    assert_eq!(s.ota().ended, 1);
    assert_eq!(s.ota().begun.len(), 1);
}

#[test]
fn finished_service_does_not_reopen_same_window() {
    let ota = FakeOta { passes_left: 2, ..FakeOta::default() };
    let link = StaticLink::up().at(10, 0);
    let mut s = station_with(link, MemoryTransport::new(), StationSettings::default(), ota);

    s.run_once(0);
    s.run_once(MINUTE);
    assert!(s.maintenance().is_active());
    s.run_once(2 * MINUTE);
    s.run_once(3 * MINUTE);

    assert!(!s.maintenance().is_active());
    assert_eq!(s.ota().ended, 1);
    s.run_once(4 * MINUTE);
    assert_eq!(s.ota().begun.len(), 1);
}

#[test]
fn refused_service_leaves_window_closed() {
    let ota = FakeOta { accepts: false, ..FakeOta::default() };
    let link = StaticLink::up().at(10, 0);
    let mut s = station_with(link, MemoryTransport::new(), StationSettings::default(), ota);

    s.run_once(0);
    s.run_once(MINUTE);
    assert!(!s.maintenance().is_active());
}

#[test]
fn remote_request_opens_window_and_confirms() {
    let transport = MemoryTransport::new().reply(200, Some(r#"{"remoteOta":true}"#));
    let mut s = station(StaticLink::up().at(14, 0), transport);

    assert_eq!(s.run_once(0), Iteration::Ran { online: true, sent: 1 });
    assert_eq!(s.maintenance().trigger(), Some(MaintenanceTrigger::Remote));
    assert_eq!(s.ota().begun, [MaintenanceTrigger::Remote]);
    assert_eq!(paths(&s), ["/stations/ridge/config", "/stations/ridge/ota-confirm"]);

    s.run_once(30 * MINUTE);
    assert!(!s.maintenance().is_active());
}

#[test]
fn remote_config_reaches_settings_and_engine() {
    let body = r#"{"windSendInterval":10000,"restartInterval":3600}"#;
    let transport = MemoryTransport::new().reply(200, Some(body));
    let mut s = station(StaticLink::up().at(12, 0), transport);

    s.run_once(0);
    assert_eq!(s.settings().wind_send_interval_ms, 10_000);
    assert_eq!(s.settings().restart_interval_ms, 3_600_000);

    assert_eq!(s.run_once(60 * MINUTE), Iteration::Restarted(RestartReason::UptimeLimit));
    assert_eq!(s.engine().system().restarts, 1);
}

#[test]
fn restart_interval_below_uptime_waits_a_full_interval() {
    // config at boot, then diagnostics and config again four hours later
    let transport = MemoryTransport::new()
        .reply(200, None)
        .reply(200, None)
        .reply(200, Some(r#"{"restartInterval":3600}"#));
    let mut s = station(StaticLink::up().at(12, 0), transport);
    s.run_once(0);

    assert!(matches!(s.run_once(4 * HOUR), Iteration::Ran { online: true, .. }));
    assert_eq!(s.settings().restart_interval_ms, HOUR);

    assert!(matches!(s.run_once(4 * HOUR + 59 * MINUTE), Iteration::Ran { .. }));
    assert_eq!(s.run_once(5 * HOUR), Iteration::Restarted(RestartReason::UptimeLimit));
}

struct SteppingTime {
    next: Cell<Timestamp>,
    step: u64,
}

impl TimeSource for SteppingTime {
    fn now(&self) -> Timestamp {
        let now = self.next.get();
        self.next.set(now + self.step);
        now
    }
}

#[test]
fn run_returns_on_restart() {
    let settings =
        StationSettings { restart_interval_ms: 10 * MINUTE, ..StationSettings::default() };
    let link = StaticLink::down();
    let mut s = station_with(link, MemoryTransport::new(), settings, FakeOta::default());
    let time = SteppingTime { next: Cell::new(0), step: MINUTE };

    assert_eq!(s.run(&time), Iteration::Restarted(RestartReason::UptimeLimit));
    assert_eq!(s.engine().watchdog().feeds, 11);
}

#[test]
fn run_returns_on_sleep() {
    let mut s = station(StaticLink::up().at(2, 30), MemoryTransport::new());
    let time = SteppingTime { next: Cell::new(0), step: MINUTE };

    assert_eq!(s.run(&time), Iteration::Slept(6 * 3600 + 30 * 60));
}
