use super::*;

use std::sync::Mutex;

struct Recorder(Arc<Mutex<Vec<u8>>>, Arc<Mutex<Vec<ExportState>>>);

impl ExportObserver for Recorder {
    fn on_progress(&mut self, percent: u8) {
        self.0.lock().unwrap().push(percent);
    }

    fn on_state(&mut self, state: ExportState) {
        self.1.lock().unwrap().push(state);
    }
}

#[test]
fn reporter_drops_backwards_and_repeated_values() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let states = Arc::new(Mutex::new(Vec::new()));
    let cell = ProgressCell::new();
    let mut r = ProgressReporter::new(
        vec![Box::new(Recorder(seen.clone(), states.clone()))],
        cell.clone(),
        StateCell::default(),
    );
    for p in [0, 5, 5, 3, 10, 200] {
        r.progress(p);
    }
    assert_eq!(*seen.lock().unwrap(), vec![0, 5, 10, 100]);
    assert_eq!(cell.get(), 100);
    r.progress(100);
    assert_eq!(seen.lock().unwrap().len(), 4);
}

#[test]
fn states_reach_observers_and_cell() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let states = Arc::new(Mutex::new(Vec::new()));
    let state_cell = StateCell::default();
    let mut r = ProgressReporter::new(
        vec![Box::new(Recorder(seen, states.clone()))],
        ProgressCell::new(),
        state_cell.clone(),
    );
    assert_eq!(state_cell.get(), ExportState::Idle);
    r.state(ExportState::Initializing);
    r.state(ExportState::Rendering);
    assert_eq!(state_cell.get(), ExportState::Rendering);
    assert_eq!(
        *states.lock().unwrap(),
        vec![ExportState::Initializing, ExportState::Rendering]
    );
}

#[test]
fn closures_observe_progress() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut obs = ProgressFn(move |p| sink.lock().unwrap().push(p));
    obs.on_progress(42);
    obs.on_state(ExportState::Complete);
    assert_eq!(*seen.lock().unwrap(), vec![42]);
}

#[test]
fn render_band_maps_into_15_to_90() {
    assert_eq!(render_band(0, 300), 15);
    assert_eq!(render_band(150, 300), 53);
    assert_eq!(render_band(300, 300), 90);
    assert_eq!(render_band(5, 0), 15);
}

#[test]
fn state_classification() {
    assert!(ExportState::Rendering.is_active());
    assert!(!ExportState::Idle.is_active());
    assert!(ExportState::Failed.is_terminal());
    assert!(!ExportState::Finalizing.is_terminal());
}
