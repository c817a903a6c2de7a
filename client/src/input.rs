//! Input capture and control mapping
//!
//! Raw device state (controller sticks and buttons, held keys, head
//! orientation) comes from an [`InputSource`]. [`InputMapper`] turns it into
//! the control values the motion model consumes: a yaw-relative thrust
//! vector, a boost flag and discrete snap turns. Which hand does what, and
//! how stick axes map onto world axes, lives in an [`AxisMapping`] table.

use shared::math::{yaw_of, yaw_rotation};
use shared::{HandPose, HandTransforms, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
    /// Controllers that report no handedness
    Unhanded,
}

/// How device axes drive locomotion and turning
#[derive(Debug, Clone, PartialEq)]
pub struct AxisMapping {
    /// Hand whose stick moves the participant. Unhanded controllers always do.
    pub movement_hand: Hand,
    /// Hand whose stick X snap-turns, if any
    pub turn_hand: Option<Hand>,
    pub invert_stick_x: bool,
    /// Gamepad Y reads positive when pulled back, so forward needs a flip
    pub invert_stick_y: bool,
    /// Per-axis sign applied to the yaw-relative thrust
    pub world_sign: [f32; 3],
    pub deadzone: f32,
    pub snap_threshold: f32,
    pub snap_degrees: f32,
    /// Any of these buttons held means boost
    pub boost_buttons: Vec<usize>,
}

impl AxisMapping {
    /// Left stick moves, no turning. World X and Z are inverted to match the
    /// third-person rig.
    pub fn standard() -> Self {
        Self {
            movement_hand: Hand::Left,
            turn_hand: None,
            invert_stick_x: false,
            invert_stick_y: true,
            world_sign: [-1.0, 1.0, -1.0],
            deadzone: 0.15,
            snap_threshold: 0.7,
            snap_degrees: 30.0,
            boost_buttons: vec![0, 1, 4, 5],
        }
    }

    /// Right stick moves, left stick snap-turns.
    pub fn swapped() -> Self {
        Self {
            movement_hand: Hand::Right,
            turn_hand: Some(Hand::Left),
            ..Self::standard()
        }
    }

    fn drives_movement(&self, hand: Hand) -> bool {
        hand == self.movement_hand || hand == Hand::Unhanded
    }

    fn apply_deadzone(&self, value: f32) -> f32 {
        if value.abs() < self.deadzone {
            0.0
        } else {
            value
        }
    }
}

impl Default for AxisMapping {
    fn default() -> Self {
        Self::standard()
    }
}

/// Named mapping presets selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MappingPreset {
    Standard,
    Swapped,
}

impl MappingPreset {
    pub fn mapping(self) -> AxisMapping {
        match self {
            MappingPreset::Standard => AxisMapping::standard(),
            MappingPreset::Swapped => AxisMapping::swapped(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState {
    pub hand: Hand,
    pub axes: Vec<f32>,
    pub buttons: Vec<bool>,
    /// Tracked pose relative to the local rig, when available
    pub pose: Option<HandPose>,
}

impl ControllerState {
    pub fn new(hand: Hand) -> Self {
        Self {
            hand,
            axes: vec![0.0; 4],
            buttons: Vec::new(),
            pose: None,
        }
    }

    fn pressed(&self, button: usize) -> bool {
        self.buttons.get(button).copied().unwrap_or(false)
    }
}

/// Held movement keys (W/A/S/D and Shift)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub fast: bool,
}

impl KeyState {
    pub fn any(&self) -> bool {
        self.forward || self.back || self.left || self.right || self.fast
    }
}

/// One poll of every input device
#[derive(Debug, Clone, PartialEq)]
pub struct RawInput {
    pub controllers: Vec<ControllerState>,
    pub keys: KeyState,
    /// Head orientation relative to the rig
    pub head: Quat,
}

impl Default for RawInput {
    fn default() -> Self {
        Self {
            controllers: Vec::new(),
            keys: KeyState::default(),
            head: Quat::identity(),
        }
    }
}

/// Control values for one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSample {
    pub thrust: Vec3,
    pub fast: bool,
    /// Degrees to turn this step, positive right
    pub turn: f32,
    /// World head orientation
    pub orientation: Quat,
}

impl Default for InputSample {
    fn default() -> Self {
        Self {
            thrust: Vec3::zeros(),
            fast: false,
            turn: 0.0,
            orientation: Quat::identity(),
        }
    }
}

/// Picks the stick axes of a controller.
///
/// Axes 2/3 win when present and carrying at least as much magnitude as 0/1;
/// some runtimes report the thumbstick there and a touchpad on 0/1.
pub fn pick_stick_axes(axes: &[f32]) -> (f32, f32) {
    let axis = |i: usize| axes.get(i).copied().unwrap_or(0.0);
    let (x0, y0) = (axis(0), axis(1));

    if axes.len() >= 4 {
        let (x2, y2) = (axis(2), axis(3));
        if x2.abs() + y2.abs() >= x0.abs() + y0.abs() {
            return (x2, y2);
        }
    }
    (x0, y0)
}

/// Stateful mapping from raw input to control values
///
/// The only state is the snap-turn latch: a turn fires once when the stick
/// crosses the threshold and re-arms when it returns inside the deadzone.
#[derive(Debug, Clone)]
pub struct InputMapper {
    mapping: AxisMapping,
    snap_armed: bool,
}

impl InputMapper {
    pub fn new(mapping: AxisMapping) -> Self {
        Self {
            mapping,
            snap_armed: true,
        }
    }

    pub fn mapping(&self) -> &AxisMapping {
        &self.mapping
    }

    /// Maps `raw` into control values, consuming a pending snap turn.
    pub fn sample(&mut self, raw: &RawInput, rig: &Quat) -> InputSample {
        let mut sample = self.map_motion(raw, rig);
        sample.turn = self.snap_turn(raw);
        sample
    }

    /// Maps `raw` into thrust, boost and orientation without touching the
    /// snap-turn latch. The reported turn is always zero.
    pub fn map_motion(&self, raw: &RawInput, rig: &Quat) -> InputSample {
        let mapping = &self.mapping;
        let (mut lx, mut ly) = (0.0, 0.0);
        let mut fast = false;

        for controller in &raw.controllers {
            if mapping.drives_movement(controller.hand) {
                let (x, y) = self.stick(controller);
                lx = mapping.apply_deadzone(x);
                ly = mapping.apply_deadzone(y);
            }
            fast |= mapping
                .boost_buttons
                .iter()
                .any(|&button| controller.pressed(button));
        }

        if raw.keys.any() {
            let axis = |pos: bool, neg: bool| (pos as i8 - neg as i8) as f32;
            lx = axis(raw.keys.right, raw.keys.left);
            ly = axis(raw.keys.forward, raw.keys.back);
            fast = raw.keys.fast;
        }

        let orientation = rig * raw.head;
        let heading = yaw_rotation(yaw_of(&orientation));
        let forward = heading * Vec3::new(0.0, 0.0, -1.0);
        let right = heading * Vec3::new(1.0, 0.0, 0.0);
        let local = right * lx + forward * ly;

        let sign = mapping.world_sign;
        let thrust = Vec3::new(
            (local.x * sign[0]).clamp(-1.0, 1.0),
            (local.y * sign[1]).clamp(-1.0, 1.0),
            (local.z * sign[2]).clamp(-1.0, 1.0),
        );

        InputSample {
            thrust,
            fast,
            turn: 0.0,
            orientation,
        }
    }

    fn snap_turn(&mut self, raw: &RawInput) -> f32 {
        let Some(turn_hand) = self.mapping.turn_hand else {
            return 0.0;
        };
        let Some(controller) = raw.controllers.iter().find(|c| c.hand == turn_hand) else {
            return 0.0;
        };

        let (x, _) = self.stick(controller);
        if self.snap_armed && x.abs() > self.mapping.snap_threshold {
            self.snap_armed = false;
            return x.signum() * self.mapping.snap_degrees;
        }
        if x.abs() < self.mapping.deadzone {
            self.snap_armed = true;
        }
        0.0
    }

    fn stick(&self, controller: &ControllerState) -> (f32, f32) {
        let (x, y) = pick_stick_axes(&controller.axes);
        let x = if self.mapping.invert_stick_x { -x } else { x };
        let y = if self.mapping.invert_stick_y { -y } else { y };
        (x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0))
    }
}

impl Default for InputMapper {
    fn default() -> Self {
        Self::new(AxisMapping::standard())
    }
}

/// Hand transforms to publish for `raw`, falling back to the desktop pair
/// when no controller is tracked.
pub fn hand_transforms(raw: &RawInput) -> HandTransforms {
    let mut hands = HandTransforms::default();
    for controller in &raw.controllers {
        match (controller.hand, &controller.pose) {
            (Hand::Left, Some(pose)) => hands.left = Some(*pose),
            (Hand::Right, Some(pose)) => hands.right = Some(*pose),
            _ => {}
        }
    }

    if hands.is_empty() {
        HandTransforms::desktop_fallback()
    } else {
        hands
    }
}

/// Where raw input comes from
///
/// Device capture lives outside this crate; implementors poll whatever they
/// wrap. `elapsed` is seconds since the client started.
pub trait InputSource {
    fn poll(&mut self, elapsed: f32) -> RawInput;
}

/// Canned movement patterns for headless clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Script {
    /// No input at all
    Idle,
    /// Walk a circle, stick swept at a constant rate
    Circle,
    /// Walk forward and back along one line
    Line,
}

/// [`InputSource`] that plays back a [`Script`] on a single controller
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    script: Script,
    /// Seconds per leg for `Line`, per revolution for `Circle`
    period: f32,
}

impl ScriptedInput {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            period: 8.0,
        }
    }

    pub fn with_period(mut self, period: f32) -> Self {
        self.period = period.max(0.1);
        self
    }

    fn stick(&self, elapsed: f32) -> (f32, f32) {
        match self.script {
            Script::Idle => (0.0, 0.0),
            Script::Circle => {
                let angle = elapsed / self.period * std::f32::consts::TAU;
                (angle.sin(), -angle.cos())
            }
            Script::Line => {
                let leg = (elapsed / self.period).floor() as i64;
                if leg % 2 == 0 {
                    (0.0, -1.0)
                } else {
                    (0.0, 1.0)
                }
            }
        }
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, elapsed: f32) -> RawInput {
        let (x, y) = self.stick(elapsed);
        let mut controller = ControllerState::new(Hand::Left);
        controller.axes = vec![x, y, 0.0, 0.0];

        RawInput {
            controllers: vec![controller],
            ..RawInput::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f32::consts::FRAC_PI_2;

    fn stick(hand: Hand, x: f32, y: f32) -> ControllerState {
        ControllerState {
            axes: vec![x, y],
            ..ControllerState::new(hand)
        }
    }

    fn raw(controllers: Vec<ControllerState>) -> RawInput {
        RawInput {
            controllers,
            ..RawInput::default()
        }
    }

    fn assert_vec(actual: Vec3, expected: [f32; 3]) {
        assert_approx_eq!(actual.x, expected[0], 1e-5);
        assert_approx_eq!(actual.y, expected[1], 1e-5);
        assert_approx_eq!(actual.z, expected[2], 1e-5);
    }

    #[test]
    fn test_pick_stick_axes() {
        assert_eq!(pick_stick_axes(&[]), (0.0, 0.0));
        assert_eq!(pick_stick_axes(&[0.5, -0.5]), (0.5, -0.5));
        assert_eq!(pick_stick_axes(&[0.1, 0.0, 0.0, -0.9]), (0.0, -0.9));
        assert_eq!(pick_stick_axes(&[0.8, 0.0, 0.1, 0.1]), (0.8, 0.0));
        // Ties go to the thumbstick pair
        assert_eq!(pick_stick_axes(&[0.5, 0.0, 0.0, -0.5]), (0.0, -0.5));
    }

    #[test]
    fn test_forward_stick_with_standard_mapping() {
        let mapper = InputMapper::default();
        // Stick pushed forward reads negative Y
        let sample = mapper.map_motion(&raw(vec![stick(Hand::Left, 0.0, -1.0)]), &Quat::identity());

        // Forward is -Z, then the world sign flips Z
        assert_vec(sample.thrust, [0.0, 0.0, 1.0]);
        assert!(!sample.fast);
    }

    #[test]
    fn test_strafe_follows_head_yaw() {
        let mapper = InputMapper::default();
        let input = RawInput {
            head: yaw_rotation(FRAC_PI_2),
            ..raw(vec![stick(Hand::Left, 1.0, 0.0)])
        };
        let sample = mapper.map_motion(&input, &Quat::identity());

        // Facing -X after a left quarter turn, right points to -Z; sign flips it
        assert_vec(sample.thrust, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_head_pitch_is_ignored() {
        let mapper = InputMapper::default();
        let pitched = Quat::from_euler_angles(-0.6, 0.0, 0.0);
        let input = RawInput {
            head: pitched,
            ..raw(vec![stick(Hand::Left, 0.0, -1.0)])
        };
        let sample = mapper.map_motion(&input, &Quat::identity());

        assert_vec(sample.thrust, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_thrust_components_clamped() {
        let mapper = InputMapper::default();
        let input = RawInput {
            head: yaw_rotation(FRAC_PI_2 / 2.0),
            ..raw(vec![stick(Hand::Left, 1.0, -1.0)])
        };
        let sample = mapper.map_motion(&input, &Quat::identity());

        assert!(sample.thrust.iter().all(|c| (-1.0..=1.0).contains(c)));
    }

    #[test]
    fn test_deadzone() {
        let mapper = InputMapper::default();
        let sample = mapper.map_motion(&raw(vec![stick(Hand::Left, 0.1, -0.14)]), &Quat::identity());
        assert_vec(sample.thrust, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_only_movement_hand_moves() {
        let mapper = InputMapper::default();
        let right_only = mapper.map_motion(&raw(vec![stick(Hand::Right, 0.0, -1.0)]), &Quat::identity());
        assert_vec(right_only.thrust, [0.0, 0.0, 0.0]);

        let unhanded = mapper.map_motion(&raw(vec![stick(Hand::Unhanded, 0.0, -1.0)]), &Quat::identity());
        assert_vec(unhanded.thrust, [0.0, 0.0, 1.0]);

        let swapped = InputMapper::new(AxisMapping::swapped());
        let right = swapped.map_motion(&raw(vec![stick(Hand::Right, 0.0, -1.0)]), &Quat::identity());
        assert_vec(right.thrust, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_boost_buttons() {
        let mapper = InputMapper::default();
        for button in [0usize, 1, 4, 5] {
            let mut controller = stick(Hand::Right, 0.0, 0.0);
            controller.buttons = vec![false; 6];
            controller.buttons[button] = true;
            assert!(mapper.map_motion(&raw(vec![controller]), &Quat::identity()).fast);
        }

        let mut controller = stick(Hand::Left, 0.0, 0.0);
        controller.buttons = vec![false, false, true, true];
        assert!(!mapper.map_motion(&raw(vec![controller]), &Quat::identity()).fast);
    }

    #[test]
    fn test_keyboard_overrides_sticks() {
        let mapper = InputMapper::default();
        let input = RawInput {
            keys: KeyState {
                forward: true,
                right: true,
                fast: true,
                ..KeyState::default()
            },
            ..raw(vec![stick(Hand::Left, 0.0, 1.0)])
        };
        let sample = mapper.map_motion(&input, &Quat::identity());

        assert_vec(sample.thrust, [-1.0, 0.0, 1.0]);
        assert!(sample.fast);
    }

    #[test]
    fn test_snap_turn_fires_once_and_rearms() {
        let mut mapper = InputMapper::new(AxisMapping::swapped());
        let rig = Quat::identity();
        let at = |x: f32| raw(vec![stick(Hand::Left, x, 0.0)]);

        assert_eq!(mapper.sample(&at(0.9), &rig).turn, 30.0);
        // Held past the threshold: no repeat
        assert_eq!(mapper.sample(&at(0.9), &rig).turn, 0.0);
        // Between deadzone and threshold: still latched
        assert_eq!(mapper.sample(&at(0.4), &rig).turn, 0.0);
        assert_eq!(mapper.sample(&at(0.9), &rig).turn, 0.0);
        // Back to centre re-arms
        assert_eq!(mapper.sample(&at(0.0), &rig).turn, 0.0);
        assert_eq!(mapper.sample(&at(-0.8), &rig).turn, -30.0);
    }

    #[test]
    fn test_standard_mapping_never_turns() {
        let mut mapper = InputMapper::default();
        let sample = mapper.sample(&raw(vec![stick(Hand::Right, 1.0, 0.0)]), &Quat::identity());
        assert_eq!(sample.turn, 0.0);
    }

    #[test]
    fn test_orientation_combines_rig_and_head() {
        let mapper = InputMapper::default();
        let input = RawInput {
            head: yaw_rotation(0.25),
            ..RawInput::default()
        };
        let sample = mapper.map_motion(&input, &yaw_rotation(0.5));
        assert_approx_eq!(yaw_of(&sample.orientation), 0.75, 1e-5);
    }

    #[test]
    fn test_hand_transforms_fallback() {
        assert_eq!(hand_transforms(&RawInput::default()), HandTransforms::desktop_fallback());

        let pose = HandPose {
            position: [0.1, 0.2, 0.3],
            quaternion: [0.0, 0.0, 0.0, 1.0],
        };
        let mut left = ControllerState::new(Hand::Left);
        left.pose = Some(pose);
        let hands = hand_transforms(&raw(vec![left, ControllerState::new(Hand::Right)]));

        assert_eq!(hands.left, Some(pose));
        assert!(hands.right.is_none());
    }

    #[test]
    fn test_scripted_sources() {
        let mut idle = ScriptedInput::new(Script::Idle);
        assert_eq!(pick_stick_axes(&idle.poll(3.0).controllers[0].axes), (0.0, 0.0));

        let mut line = ScriptedInput::new(Script::Line).with_period(2.0);
        assert_eq!(pick_stick_axes(&line.poll(1.0).controllers[0].axes), (0.0, -1.0));
        assert_eq!(pick_stick_axes(&line.poll(3.0).controllers[0].axes), (0.0, 1.0));

        let mut circle = ScriptedInput::new(Script::Circle).with_period(4.0);
        let (x, y) = pick_stick_axes(&circle.poll(1.0).controllers[0].axes);
        assert_approx_eq!(x, 1.0, 1e-5);
        assert_approx_eq!(y, 0.0, 1e-5);
    }
}
