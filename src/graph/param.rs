use crate::MIN_TIME;

/*
Scheduled Parameter Automation
==============================

An AudioParam is a scalar (a gain level, a detune amount) whose value is
described declaratively: the control thread schedules value changes at
absolute future clock times, and the renderer later asks "what is the value
at time t?". The control thread never sleeps or waits for a ramp to finish.

Vocabulary
----------

  event         One scheduled change: a step, a ramp endpoint, or an
                exponential approach toward a target.

  timeline      The sorted list of events. Querying a time walks the
                timeline: events at or before t establish the current
                anchor; the first event after t (if it is a ramp) pulls
                the value toward its endpoint.

  anchor        The (time, value) pair the parameter last settled at.
                Ramps interpolate from the anchor to their endpoint.

  cancel        Dropping every event scheduled at or after a time. Used
                before scheduling a release ramp so a stale attack ramp
                cannot fight the new one.


Segment Shapes
--------------

  set_value_at_time(v, t)              Step to v at t.

  linear_ramp_to_value_at_time(v, t)   Straight line from the anchor to
                                       (t, v). Attack phases use this.

  exponential_ramp_to_value_at_time    Constant-ratio curve from the anchor
                                       to (t, v). Matches how struck and
                                       released notes actually decay.
                                       Undefined through zero, so both ends
                                       are clamped away from it.

  set_target_at_time(v, t, tau)        Asymptotic approach toward v with
                                       time constant tau, running until the
                                       next event. Master-volume smoothing
                                       uses this; the move is monotonic, so
                                       a sweep never overshoots either end.
*/

const EXP_FLOOR: f32 = 1.0e-5;

#[derive(Debug, Clone, Copy, PartialEq)]
enum AutomationEvent {
    SetValue { time: f64, value: f32 },
    LinearRamp { time: f64, value: f32 },
    ExponentialRamp { time: f64, value: f32 },
    SetTarget { time: f64, target: f32, time_constant: f32 },
}

impl AutomationEvent {
    fn time(&self) -> f64 {
        match *self {
            AutomationEvent::SetValue { time, .. }
            | AutomationEvent::LinearRamp { time, .. }
            | AutomationEvent::ExponentialRamp { time, .. }
            | AutomationEvent::SetTarget { time, .. } => time,
        }
    }
}

/// An exponential approach in flight: value(t) = target + (from - target) * e^(-(t-start)/tau)
#[derive(Debug, Clone, Copy)]
struct TargetRun {
    start: f64,
    from: f32,
    target: f32,
    time_constant: f32,
}

impl TargetRun {
    fn value_at(&self, time: f64) -> f32 {
        let tau = self.time_constant.max(MIN_TIME);
        let elapsed = (time - self.start).max(0.0) as f32;
        self.target + (self.from - self.target) * (-elapsed / tau).exp()
    }
}

/// A scalar parameter with a scheduled-automation timeline.
pub struct AudioParam {
    initial: f32,
    events: Vec<AutomationEvent>,
}

impl AudioParam {
    pub fn new(initial: f32) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    /// Step to `value` at `time`.
    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent::SetValue { time, value });
    }

    /// Straight-line ramp from the previous anchor, reaching `value` at `time`.
    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent::LinearRamp { time, value });
    }

    /// Constant-ratio ramp from the previous anchor, reaching `value` at `time`.
    ///
    /// Exponential segments cannot pass through zero; both endpoints are
    /// clamped to a small positive floor at evaluation time.
    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent::ExponentialRamp { time, value });
    }

    /// Asymptotic approach toward `target` starting at `time`, with the given
    /// time constant. Runs until the next scheduled event overrides it.
    pub fn set_target_at_time(&mut self, target: f32, time: f64, time_constant: f32) {
        self.insert(AutomationEvent::SetTarget {
            time,
            target,
            time_constant,
        });
    }

    /// Drop every event scheduled at or after `time`.
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|e| e.time() < time);
    }

    /// Evaluate the parameter at an absolute clock time.
    pub fn value_at(&self, time: f64) -> f32 {
        let mut anchor_time = 0.0_f64;
        let mut anchor_value = self.initial;
        let mut target: Option<TargetRun> = None;

        for event in &self.events {
            if event.time() > time {
                // First future event. Ramps pull from the anchor toward
                // their endpoint; anything else leaves the anchor in force.
                return match *event {
                    AutomationEvent::LinearRamp { time: end, value } => {
                        let from = anchor_value;
                        if end <= anchor_time {
                            value
                        } else {
                            let f = ((time - anchor_time) / (end - anchor_time)) as f32;
                            from + (value - from) * f
                        }
                    }
                    AutomationEvent::ExponentialRamp { time: end, value } => {
                        let from = anchor_value.max(EXP_FLOOR);
                        let to = value.max(EXP_FLOOR);
                        if end <= anchor_time {
                            value
                        } else {
                            let f = ((time - anchor_time) / (end - anchor_time)) as f32;
                            from * (to / from).powf(f)
                        }
                    }
                    _ => resolve(anchor_value, target, time),
                };
            }

            // Event at or before the query time: fold it into the anchor.
            match *event {
                AutomationEvent::SetValue { time: t, value }
                | AutomationEvent::LinearRamp { time: t, value }
                | AutomationEvent::ExponentialRamp { time: t, value } => {
                    anchor_time = t;
                    anchor_value = value;
                    target = None;
                }
                AutomationEvent::SetTarget {
                    time: t,
                    target: to,
                    time_constant,
                } => {
                    // A new approach starts from wherever the previous
                    // segment left the value at its start time.
                    let from = resolve(anchor_value, target, t);
                    anchor_time = t;
                    anchor_value = from;
                    target = Some(TargetRun {
                        start: t,
                        from,
                        target: to,
                        time_constant,
                    });
                }
            }
        }

        resolve(anchor_value, target, time)
    }

    fn insert(&mut self, event: AutomationEvent) {
        let at = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(at, event);
    }
}

fn resolve(anchor_value: f32, target: Option<TargetRun>, time: f64) -> f32 {
    match target {
        Some(run) => run.value_at(time),
        None => anchor_value,
    }
}
