//! Built-in plugin implementations.
//!
//! Every catalog entry with an implementation is registered here. The
//! descriptors (names, schemas, default slots) live in [`super::catalog`].

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};

use super::{LoaderTable, SlotPlugin};
use crate::settings::EffectiveSettings;

impl LoaderTable {
    /// Table with every built-in implementation.
    pub fn builtin() -> Self {
        Self::new()
            .register("clock", || async { Ok(Arc::new(Clock) as Arc<dyn SlotPlugin>) })
            .register("daily-goals", || async { Ok(Arc::new(DailyGoals) as Arc<dyn SlotPlugin>) })
            .register("quick-notes", || async { Ok(Arc::new(QuickNotes) as Arc<dyn SlotPlugin>) })
            .register("pomodoro", || async { Ok(Arc::new(Pomodoro) as Arc<dyn SlotPlugin>) })
            .register("greeting", || async { Ok(Arc::new(Greeting) as Arc<dyn SlotPlugin>) })
    }
}

/// Format a number without a trailing `.0` when it is whole.
fn whole(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Current local time.
#[derive(Debug)]
pub struct Clock;

impl Clock {
    fn format_time<Tz: TimeZone>(at: &DateTime<Tz>, settings: &EffectiveSettings) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let format24h = settings.bool("format24h").unwrap_or(true);
        let seconds = settings.bool("showSeconds").unwrap_or(false);
        let pattern = match (format24h, seconds) {
            (true, true) => "%H:%M:%S",
            (true, false) => "%H:%M",
            (false, true) => "%I:%M:%S %p",
            (false, false) => "%I:%M %p",
        };
        let label = settings.str("label").unwrap_or("Local time");
        format!("{label}: {}", at.format(pattern))
    }
}

impl SlotPlugin for Clock {
    fn id(&self) -> &str {
        "clock"
    }

    fn render(&self, settings: &EffectiveSettings) -> String {
        Self::format_time(&Local::now(), settings)
    }
}

/// Step and water targets.
#[derive(Debug)]
pub struct DailyGoals;

impl SlotPlugin for DailyGoals {
    fn id(&self) -> &str {
        "daily-goals"
    }

    fn render(&self, settings: &EffectiveSettings) -> String {
        let steps = settings.number("dailyGoals.steps").unwrap_or(10_000.0);
        let water = settings.number("dailyGoals.water").unwrap_or(8.0);
        let unit = match settings.str("units") {
            Some("imperial") => "cups",
            _ => "glasses",
        };
        format!("Steps: {}\nWater: {} {unit}", whole(steps), whole(water))
    }
}

/// A titled scratch note.
#[derive(Debug)]
pub struct QuickNotes;

impl SlotPlugin for QuickNotes {
    fn id(&self) -> &str {
        "quick-notes"
    }

    fn render(&self, settings: &EffectiveSettings) -> String {
        let title = settings.str("title").unwrap_or("Notes");
        match settings.str("note").map(str::trim) {
            Some(note) if !note.is_empty() => format!("{title}\n{note}"),
            _ => format!("{title}\n(empty)"),
        }
    }
}

/// Focus and break durations.
#[derive(Debug)]
pub struct Pomodoro;

impl SlotPlugin for Pomodoro {
    fn id(&self) -> &str {
        "pomodoro"
    }

    fn render(&self, settings: &EffectiveSettings) -> String {
        let focus = settings.number("focusMinutes").unwrap_or(25.0);
        let rest = settings.number("breakMinutes").unwrap_or(5.0);
        format!("Focus {} min / break {} min", whole(focus), whole(rest))
    }
}

/// Greets the user by name.
#[derive(Debug)]
pub struct Greeting;

impl SlotPlugin for Greeting {
    fn id(&self) -> &str {
        "greeting"
    }

    fn render(&self, settings: &EffectiveSettings) -> String {
        let name = settings.str("name").unwrap_or("friend");
        if settings.bool("excited").unwrap_or(false) {
            format!("Hello, {name}!")
        } else {
            format!("Hello, {name}.")
        }
    }
}
