//! The demo system: a `Motor` serving a queued `Control` interface and a
//! `Controller` ramping it to a target speed through its `Drive` interface.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use conduit_kernel::{ComponentKind, Task};
use conduit_runtime::ComponentManager;
use conduit_types::{ConduitError, EventDelivery, QueuingPolicy, Requirement};
use tracing::{debug, info, warn};

use crate::config::DemoConfig;

/// Number of `SetSpeed` commands the controller uses to reach the target.
const RAMP_STEPS: u32 = 5;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MotorState {
    pub speed: f64,
    pub distance: f64,
}

/// What the demo exposes to `main` for its summary.
pub struct DemoHandles {
    pub motor: Arc<Mutex<MotorState>>,
    pub speed_events: Arc<AtomicUsize>,
}

struct MotorTask {
    state: Arc<Mutex<MotorState>>,
    period: Duration,
}

impl Task for MotorTask {
    fn startup(&mut self) {
        info!("motor powered up");
    }

    fn run(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.distance += state.speed * self.period.as_secs_f64();
    }

    fn cleanup(&mut self) {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        info!(distance = state.distance, "motor powered down");
    }
}

/// Add both demo components to `manager` and connect them.
pub fn build(manager: &ComponentManager, cfg: &DemoConfig) -> Result<DemoHandles, ConduitError> {
    let period = Duration::from_millis(cfg.period_ms.max(1));

    // ── Motor ────────────────────────────────────────────────────────────────
    let state = Arc::new(Mutex::new(MotorState::default()));
    let motor = manager.new_component("Motor", ComponentKind::Periodic(period));
    motor.set_task(MotorTask {
        state: Arc::clone(&state),
        period,
    })?;

    let control = motor.add_interface_provided("Control", QueuingPolicy::CommandsQueued)?;
    let speed_changed = control.add_event_write::<f64>("SpeedChanged")?;
    let s = Arc::clone(&state);
    let changed = speed_changed.clone();
    control.add_command_write("SetSpeed", move |speed: &f64| {
        s.lock().unwrap_or_else(PoisonError::into_inner).speed = *speed;
        changed.raise(speed);
    })?;
    let s = Arc::clone(&state);
    control.add_command_void("Stop", move || {
        s.lock().unwrap_or_else(PoisonError::into_inner).speed = 0.0;
        speed_changed.raise(&0.0);
    })?;
    let s = Arc::clone(&state);
    control.add_command_read("GetSpeed", move |out: &mut f64| {
        *out = s.lock().unwrap_or_else(PoisonError::into_inner).speed;
    })?;
    manager.add_component(motor)?;

    // ── Controller ───────────────────────────────────────────────────────────
    let controller = manager.new_component("Controller", ComponentKind::Periodic(period));
    let drive = controller.add_interface_required("Drive")?;
    let set_speed = drive.add_function_write::<f64>("SetSpeed", Requirement::Required)?;
    let get_speed = drive.add_function_read::<f64>("GetSpeed", Requirement::Optional)?;
    drive.add_function_void("Stop", Requirement::Optional)?;

    let speed_events = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&speed_events);
    drive.add_event_handler_write(
        "SpeedChanged",
        move |speed: &f64| {
            counter.fetch_add(1, Ordering::Relaxed);
            info!(speed, "motor reported new speed");
        },
        EventDelivery::Queued,
    )?;

    let target = cfg.target_speed;
    let mut step = 0_u32;
    controller.set_body(move || {
        if step >= RAMP_STEPS {
            return;
        }
        let next = target * f64::from(step + 1) / f64::from(RAMP_STEPS);
        let result = set_speed.execute(&next);
        if result.is_ok() {
            step += 1;
        } else {
            warn!(%result, "SetSpeed rejected");
        }
        let mut measured = 0.0;
        if get_speed.execute(&mut measured).is_ok() {
            debug!(measured, commanded = next, "speed sample");
        }
    })?;
    manager.add_component(controller)?;

    manager.connect("Controller", "Drive", "Motor", "Control")?;

    Ok(DemoHandles {
        motor: state,
        speed_events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn demo_graph() {
        let manager = ComponentManager::default();
        build(&manager, &DemoConfig::default()).unwrap();
        assert_eq!(
            manager.graph_format(),
            "add taskA [[Motor],[],[Control]]\n\
             add taskA [[Controller],[Drive],[]]\n\
             connect [[Controller],[Drive]] [[Motor],[Control]]\n"
        );
    }

    #[test]
    fn controller_ramps_motor_to_target() {
        let manager = ComponentManager::default();
        let cfg = DemoConfig {
            period_ms: 2,
            run_secs: 0,
            target_speed: 1.0,
        };
        let handles = build(&manager, &cfg).unwrap();
        manager.create_all().unwrap();
        manager.start_all().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while handles.speed_events.load(Ordering::Relaxed) < RAMP_STEPS as usize && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }

        manager.kill_all().unwrap();
        manager.cleanup().unwrap();

        assert_eq!(handles.speed_events.load(Ordering::Relaxed), RAMP_STEPS as usize);
        let state = *handles.motor.lock().unwrap();
        assert!((state.speed - 1.0).abs() < 1e-9);
        assert!(state.distance > 0.0);
    }
}
