//! Indicator pattern selection with an ordered priority table.
//!
//! Maps the pair (device status, battery condition) to what the
//! bi-colour status LED shows.  The table is evaluated top to bottom
//! and the first matching rule wins; rules are non-overlapping and
//! together cover every input, so [`select`] is total.
//!
//! ## Priority hierarchy (highest first)
//!
//! | Status         | Battery   | Colour | Pattern   |
//! |----------------|-----------|--------|-----------|
//! | Booting        | any       | Yellow | Breathe   |
//! | Joining        | any       | Red    | BlinkFast |
//! | Sending        | any       | Green  | BlinkFast |
//! | Idle/Sampling  | Low       | Red    | BlinkRare |
//! | Idle/Sampling  | Charging  | Red    | Breathe   |
//! | Idle/Sampling  | Charged   | Green  | Breathe   |
//! | Idle/Sampling  | Ok        | Off    | Off       |
//!
//! Battery condition is only ever visible while the device has nothing
//! more important to say.

/// Coarse device status pushed by the lifecycle coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceStatus {
    Booting,
    Joining,
    Sending,
    Idle,
    SamplingSensor,
}

impl DeviceStatus {
    pub const ALL: [Self; 5] = [
        Self::Booting,
        Self::Joining,
        Self::Sending,
        Self::Idle,
        Self::SamplingSensor,
    ];
}

/// Battery condition polled from the charger monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BatteryCondition {
    #[default]
    Ok,
    Low,
    Charging,
    Charged,
}

impl BatteryCondition {
    pub const ALL: [Self; 4] = [Self::Ok, Self::Low, Self::Charging, Self::Charged];
}

/// LED colour.  Yellow lights both channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    #[default]
    Off,
    Green,
    Red,
    Yellow,
}

impl Color {
    pub fn has_green(self) -> bool {
        matches!(self, Self::Green | Self::Yellow)
    }

    pub fn has_red(self) -> bool {
        matches!(self, Self::Red | Self::Yellow)
    }
}

/// LED modulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Pattern {
    #[default]
    Off,
    /// Hardware breathing engine; rendered continuously on.
    Breathe,
    /// Symmetric on/off blink.
    BlinkFast,
    /// Short flash followed by a long pause.
    BlinkRare,
}

impl Pattern {
    pub fn blinks(self) -> bool {
        matches!(self, Self::BlinkFast | Self::BlinkRare)
    }
}

/// What the indicator shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IndicatorState {
    pub color: Color,
    pub pattern: Pattern,
}

impl IndicatorState {
    pub const OFF: Self = Self::new(Color::Off, Pattern::Off);

    pub const fn new(color: Color, pattern: Pattern) -> Self {
        Self { color, pattern }
    }
}

/// One row of the priority table.
struct Rule {
    applies: fn(DeviceStatus, BatteryCondition) -> bool,
    show: IndicatorState,
}

/// Rows that only match while the device is otherwise idle.
fn idle_with(status: DeviceStatus, battery: BatteryCondition, want: BatteryCondition) -> bool {
    matches!(status, DeviceStatus::Idle | DeviceStatus::SamplingSensor) && battery == want
}

const RULES: [Rule; 7] = [
    Rule {
        applies: |s, _| s == DeviceStatus::Booting,
        show: IndicatorState::new(Color::Yellow, Pattern::Breathe),
    },
    Rule {
        applies: |s, _| s == DeviceStatus::Joining,
        show: IndicatorState::new(Color::Red, Pattern::BlinkFast),
    },
    Rule {
        applies: |s, _| s == DeviceStatus::Sending,
        show: IndicatorState::new(Color::Green, Pattern::BlinkFast),
    },
    Rule {
        applies: |s, b| idle_with(s, b, BatteryCondition::Low),
        show: IndicatorState::new(Color::Red, Pattern::BlinkRare),
    },
    Rule {
        applies: |s, b| idle_with(s, b, BatteryCondition::Charging),
        show: IndicatorState::new(Color::Red, Pattern::Breathe),
    },
    Rule {
        applies: |s, b| idle_with(s, b, BatteryCondition::Charged),
        show: IndicatorState::new(Color::Green, Pattern::Breathe),
    },
    Rule {
        applies: |s, b| idle_with(s, b, BatteryCondition::Ok),
        show: IndicatorState::OFF,
    },
];

/// Pick the indicator state for the given inputs.
pub fn select(status: DeviceStatus, battery: BatteryCondition) -> IndicatorState {
    RULES
        .iter()
        .find(|rule| (rule.applies)(status, battery))
        .map_or(IndicatorState::OFF, |rule| rule.show)
}
