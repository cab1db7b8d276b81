//! Trigger support for the Bosch BMG160 3-axis gyroscope.
//!
//! Provides the data-ready trigger and the any-motion trigger (reported as
//! [`TriggerKind::Delta`]), whose slope threshold and duration are configurable, along with the
//! full-scale range.
//!
//! ```ignore
//! static GYRO: Bmg160Device<I2cRegisterBus<I2cDevice>, Input> =
//!     Bmg160Device::new(Bmg160, Range::Dps2000, Some("gyro"));
//! static GYRO_RUNNER: DedicatedRunner = DedicatedRunner::new();
//!
//! GYRO.init(I2cRegisterBus::new(i2c, I2C_ADDRESS), &gpio, &GYRO_RUNNER, &Config::default())?;
//! spawner.spawn(gyro_dispatch())?; // runs `GYRO_RUNNER.run()`
//! GYRO.set_trigger(TriggerKind::Delta, Some(&MOTION_HANDLER))?;
//! ```

use ariel_os_sensor_trigger::{
    attribute::micro_rad_to_degrees,
    bus::RegisterWrite,
    chip::{AttributeUpdate, EnableField, SetupStep, StatusBlock, TriggerChip},
    AttributeKind, ConfigError, SensorChannel, SensorValue, TriggerDevice, TriggerKind,
};

/// I2C address of the sensor with SDO pulled low.
pub const I2C_ADDRESS: u8 = 0x68;

const INT_STATUS0: u8 = 0x09;
const INT_STATUS_LEN: usize = 4;
const ANY_INT: u8 = 1 << 2;

const RANGE: u8 = 0x0f;

const INT_EN0: u8 = 0x15;
const DATA_EN: u8 = 1 << 7;
const INT_EN1: u8 = 0x16;

const INT_MAP0: u8 = 0x17;
const INT1_ANY: u8 = 1 << 1;
const INT1_HIGH: u8 = 1 << 3;
const INT_MAP1: u8 = 0x18;
const INT1_DATA: u8 = 1 << 0;
const INT1_FAST_OFFSET: u8 = 1 << 1;
const INT1_FIFO: u8 = 1 << 2;

const THRES: u8 = 0x1b;
const THRES_MASK: u8 = 0x7f;

const ANY_EN: u8 = 0x1c;
const ANY_EN_XYZ: u8 = 0x07;
const ANY_DURSAMPLE_MASK: u8 = 0x30;
const ANY_DURSAMPLE_SHIFT: u8 = 4;

const INT_RST_LATCH: u8 = 0x21;

const INTERRUPT_SETUP: &[SetupStep] = &[
    SetupStep {
        // INT1_LVL and INT1_OD cleared.
        write: RegisterWrite::byte(INT_EN1, 0),
        description: "configure INT1 as push-pull active-low",
    },
    SetupStep {
        write: RegisterWrite::byte(INT_RST_LATCH, 0),
        description: "select non-latched interrupt mode",
    },
    SetupStep {
        write: RegisterWrite::field(INT_MAP0, INT1_ANY | INT1_HIGH, INT1_ANY | INT1_HIGH),
        description: "map any-motion and high-rate interrupts to INT1",
    },
    SetupStep {
        write: RegisterWrite::field(
            INT_MAP1,
            INT1_DATA | INT1_FAST_OFFSET | INT1_FIFO,
            INT1_DATA | INT1_FAST_OFFSET | INT1_FIFO,
        ),
        description: "map data-ready, fast-offset and FIFO interrupts to INT1",
    },
];

/// Full-scale range of the gyroscope.
///
/// The discriminants are the values of the range register.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Range {
    Dps2000 = 0,
    Dps1000 = 1,
    Dps500 = 2,
    Dps250 = 3,
    Dps125 = 4,
}

impl Range {
    /// Returns the range in degrees/second.
    #[must_use]
    pub const fn dps(self) -> u16 {
        match self {
            Self::Dps2000 => 2000,
            Self::Dps1000 => 1000,
            Self::Dps500 => 500,
            Self::Dps250 => 250,
            Self::Dps125 => 125,
        }
    }

    #[must_use]
    pub const fn from_dps(dps: i32) -> Option<Self> {
        match dps {
            2000 => Some(Self::Dps2000),
            1000 => Some(Self::Dps1000),
            500 => Some(Self::Dps500),
            250 => Some(Self::Dps250),
            125 => Some(Self::Dps125),
            _ => None,
        }
    }

    /// Largest any-motion threshold the sensor can detect in this range, in degrees/second.
    const fn max_slope_threshold(self) -> u16 {
        self.dps() / 16
    }
}

/// The BMG160 register map.
#[derive(Debug, Copy, Clone, Default)]
pub struct Bmg160;

/// A BMG160 with trigger support.
pub type Bmg160Device<B, P> = TriggerDevice<Bmg160, B, P>;

impl Bmg160 {
    fn slope_threshold(value: SensorValue, range: Range) -> Result<RegisterWrite, ConfigError> {
        let micro_rad = value.as_micro().ok_or(ConfigError::InvalidArgument)?;
        let dps = micro_rad_to_degrees(micro_rad);

        if dps > u64::from(range.max_slope_threshold()) {
            return Err(ConfigError::Unsupported);
        }

        // The threshold register has a resolution of range/2000 dps per LSB.
        let raw = dps * 2000 / u64::from(range.dps());
        let raw = u8::try_from(raw).map_err(|_| ConfigError::Unsupported)?;

        Ok(RegisterWrite::field(THRES, THRES_MASK, raw))
    }

    fn slope_duration(value: SensorValue) -> Result<RegisterWrite, ConfigError> {
        let samples = value.as_int().ok_or(ConfigError::InvalidArgument)?;

        // any_dursample is a 2-bit field (ANY_EN bits 5:4) counting groups of 4 samples, minus one.
        let code: u8 = match samples {
            4 => 0,
            8 => 1,
            12 => 2,
            16 => 3,
            _ => return Err(ConfigError::Unsupported),
        };

        Ok(RegisterWrite::field(
            ANY_EN,
            ANY_DURSAMPLE_MASK,
            code << ANY_DURSAMPLE_SHIFT,
        ))
    }
}

impl TriggerChip for Bmg160 {
    type Scale = Range;

    fn part_number(&self) -> &'static str {
        "BMG160"
    }

    fn channel(&self) -> SensorChannel {
        SensorChannel::GyroAny
    }

    fn status_block(&self) -> StatusBlock {
        StatusBlock {
            register: INT_STATUS0,
            len: INT_STATUS_LEN,
        }
    }

    fn classify(&self, status: &[u8]) -> TriggerKind {
        // The data-ready status bit is not checked: any other interrupt is reported as data-ready.
        match status.first() {
            Some(status) if status & ANY_INT != 0 => TriggerKind::Delta,
            _ => TriggerKind::DataReady,
        }
    }

    fn enable_field(&self, kind: TriggerKind) -> Result<EnableField, ConfigError> {
        match kind {
            TriggerKind::DataReady => Ok(EnableField {
                register: INT_EN0,
                mask: DATA_EN,
            }),
            TriggerKind::Delta => Ok(EnableField {
                register: ANY_EN,
                mask: ANY_EN_XYZ,
            }),
        }
    }

    fn configure_attribute(
        &self,
        kind: AttributeKind,
        value: SensorValue,
        scale: Range,
    ) -> Result<AttributeUpdate<Range>, ConfigError> {
        let (write, scale) = match kind {
            AttributeKind::SlopeThreshold => (Self::slope_threshold(value, scale)?, scale),
            AttributeKind::SlopeDuration => (Self::slope_duration(value)?, scale),
            AttributeKind::FullScale => {
                let dps = value.as_int().ok_or(ConfigError::InvalidArgument)?;
                let range = Range::from_dps(dps).ok_or(ConfigError::Unsupported)?;
                (RegisterWrite::byte(RANGE, range as u8), range)
            }
            _ => return Err(ConfigError::Unsupported),
        };

        Ok(AttributeUpdate { write, scale })
    }

    fn interrupt_setup(&self) -> &'static [SetupStep] {
        INTERRUPT_SETUP
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::boxed::Box;

    use ariel_os_sensor_trigger::{
        dummy::{DummyBus, DummyGpio, DummyPin, DummyPinState, DummyRegisters},
        runner::{DedicatedRunner, DispatchRunner, SharedDispatchQueue},
        Config, InitError, State, Trigger, TriggerHandler,
    };
    use portable_atomic::{AtomicU32, Ordering};

    use super::*;

    type TestDevice = Bmg160Device<DummyBus, DummyPin>;

    fn leak<T>(value: T) -> &'static T {
        Box::leak(Box::new(value))
    }

    /// Angular rate of `dps` degrees/second, in rad/s, rounded up to the micro-unit.
    fn rad_per_s(dps: i64) -> SensorValue {
        let micro = (dps.abs() * 3_141_592 + 179) / 180 * dps.signum();
        SensorValue::IntPlusMicro {
            integer: i32::try_from(micro / 1_000_000).unwrap(),
            micro: i32::try_from(micro % 1_000_000).unwrap(),
        }
    }

    struct Gyro {
        registers: &'static DummyRegisters,
        pin: &'static DummyPinState,
        device: &'static TestDevice,
    }

    impl Gyro {
        fn new() -> Self {
            Self {
                registers: leak(DummyRegisters::new()),
                pin: leak(DummyPinState::new()),
                device: leak(TestDevice::new(Bmg160, Range::Dps2000, Some("gyro"))),
            }
        }

        fn init(&self, runner: &'static dyn DispatchRunner) -> Result<(), InitError> {
            self.device.init(
                DummyBus::new(self.registers),
                &DummyGpio::new("GPIO_0", 0, self.pin),
                runner,
                &Config::default(),
            )
        }

        fn started() -> (Self, &'static DedicatedRunner) {
            let gyro = Self::new();
            let runner = leak(DedicatedRunner::new());
            gyro.init(runner).unwrap();
            (gyro, runner)
        }
    }

    #[derive(Default)]
    struct Counts {
        data_ready: AtomicU32,
        delta: AtomicU32,
    }

    impl Counts {
        fn get(&self) -> (u32, u32) {
            (
                self.data_ready.load(Ordering::Acquire),
                self.delta.load(Ordering::Acquire),
            )
        }
    }

    impl TriggerHandler for Counts {
        fn handle(&self, trigger: Trigger) {
            assert_eq!(trigger.channel, SensorChannel::GyroAny);
            match trigger.kind {
                TriggerKind::DataReady => self.data_ready.fetch_add(1, Ordering::AcqRel),
                TriggerKind::Delta => self.delta.fetch_add(1, Ordering::AcqRel),
            };
        }
    }

    #[test]
    fn init_configures_int1() {
        let gyro = Gyro::new();
        gyro.registers.set(INT_EN1, 0xff);
        gyro.registers.set(INT_RST_LATCH, 0xff);

        gyro.init(leak(DedicatedRunner::new())).unwrap();

        assert_eq!(gyro.device.state(), State::Idle);
        assert_eq!(gyro.registers.get(INT_EN1), 0);
        assert_eq!(gyro.registers.get(INT_RST_LATCH), 0);
        assert_eq!(gyro.registers.get(INT_MAP0), 0x0a);
        assert_eq!(gyro.registers.get(INT_MAP1), 0x07);
        assert!(gyro.pin.is_enabled());
    }

    #[test]
    fn init_aborts_on_first_failing_write() {
        let gyro = Gyro::new();
        gyro.registers.fail_writes_to(Some(INT_RST_LATCH));

        assert_eq!(gyro.init(leak(DedicatedRunner::new())), Err(InitError::Io));
        assert_eq!(gyro.registers.write_count(), 1);
        assert_eq!(gyro.registers.get(INT_MAP0), 0);
        assert_eq!(gyro.registers.get(INT_MAP1), 0);
        assert!(!gyro.pin.is_enabled());
    }

    #[test]
    fn threshold_limited_to_sixteenth_of_range() {
        let (gyro, _) = Gyro::started();

        gyro.device
            .set_attribute(AttributeKind::SlopeThreshold, rad_per_s(125))
            .unwrap();
        assert_eq!(gyro.registers.get(THRES), 125);

        gyro.device
            .set_attribute(AttributeKind::SlopeThreshold, rad_per_s(-100))
            .unwrap();
        assert_eq!(gyro.registers.get(THRES), 100);

        gyro.registers.set(THRES, 0);
        assert_eq!(
            gyro.device
                .set_attribute(AttributeKind::SlopeThreshold, rad_per_s(126)),
            Err(ConfigError::Unsupported)
        );
        assert_eq!(gyro.registers.get(THRES), 0);
    }

    #[test]
    fn threshold_requires_fractional_value() {
        let (gyro, _) = Gyro::started();

        assert_eq!(
            gyro.device
                .set_attribute(AttributeKind::SlopeThreshold, SensorValue::Int(1)),
            Err(ConfigError::InvalidArgument)
        );
    }

    #[test]
    fn full_scale_rescales_threshold_limit() {
        let (gyro, _) = Gyro::started();

        gyro.device
            .set_attribute(AttributeKind::FullScale, SensorValue::Int(125))
            .unwrap();
        assert_eq!(gyro.device.scale(), Range::Dps125);
        assert_eq!(gyro.registers.get(RANGE), Range::Dps125 as u8);

        assert_eq!(
            gyro.device
                .set_attribute(AttributeKind::SlopeThreshold, rad_per_s(8)),
            Err(ConfigError::Unsupported)
        );
        gyro.device
            .set_attribute(AttributeKind::SlopeThreshold, rad_per_s(7))
            .unwrap();
        assert_eq!(gyro.registers.get(THRES), 112);

        assert_eq!(
            gyro.device
                .set_attribute(AttributeKind::FullScale, SensorValue::Int(300)),
            Err(ConfigError::Unsupported)
        );
        assert_eq!(gyro.device.scale(), Range::Dps125);
    }

    #[test]
    fn duration_sets_sample_code() {
        let (gyro, _) = Gyro::started();
        gyro.registers.set(ANY_EN, ANY_EN_XYZ);

        for (samples, code) in [(4, 0x00), (8, 0x10), (12, 0x20), (16, 0x30)] {
            gyro.device
                .set_attribute(AttributeKind::SlopeDuration, SensorValue::Int(samples))
                .unwrap();
            assert_eq!(gyro.registers.get(ANY_EN), ANY_EN_XYZ | code);
        }

        assert_eq!(
            gyro.device.set_attribute(
                AttributeKind::SlopeDuration,
                SensorValue::IntPlusMicro {
                    integer: 8,
                    micro: 0
                }
            ),
            Err(ConfigError::InvalidArgument)
        );
        assert_eq!(gyro.registers.get(ANY_EN), ANY_EN_XYZ | 0x30);

        for samples in [0, 5, 20] {
            assert_eq!(
                gyro.device
                    .set_attribute(AttributeKind::SlopeDuration, SensorValue::Int(samples)),
                Err(ConfigError::Unsupported)
            );
        }
    }

    #[test]
    fn data_ready_until_deregistered() {
        let (gyro, runner) = Gyro::started();
        let counts = leak(Counts::default());

        gyro.device
            .set_trigger(TriggerKind::DataReady, Some(counts))
            .unwrap();
        assert_eq!(gyro.registers.get(INT_EN0), DATA_EN);

        gyro.pin.fire_edge();
        assert!(runner.poll_cycle());
        assert_eq!(counts.get(), (1, 0));

        gyro.device.set_trigger(TriggerKind::DataReady, None).unwrap();
        assert_eq!(gyro.registers.get(INT_EN0), 0);

        gyro.pin.fire_edge();
        runner.poll_cycle();
        assert_eq!(counts.get(), (1, 0));
    }

    #[test]
    fn any_motion_wins_over_data_ready() {
        let (gyro, runner) = Gyro::started();
        let counts = leak(Counts::default());
        gyro.device
            .set_trigger(TriggerKind::DataReady, Some(counts))
            .unwrap();
        gyro.device
            .set_trigger(TriggerKind::Delta, Some(counts))
            .unwrap();
        assert_eq!(gyro.registers.get(ANY_EN), ANY_EN_XYZ);

        // any_int in INT_STATUS0, data_int in INT_STATUS1.
        gyro.registers.set(INT_STATUS0, ANY_INT);
        gyro.registers.set(INT_STATUS0 + 1, 1 << 7);
        gyro.pin.fire_edge();
        runner.poll_cycle();

        assert_eq!(counts.get(), (0, 1));
    }

    #[test]
    fn status_read_failure_invokes_nothing() {
        let (gyro, runner) = Gyro::started();
        let counts = leak(Counts::default());
        gyro.device
            .set_trigger(TriggerKind::DataReady, Some(counts))
            .unwrap();

        gyro.registers.fail_reads(true);
        gyro.pin.fire_edge();
        assert!(runner.poll_cycle());

        assert_eq!(counts.get(), (0, 0));
    }

    #[test]
    fn clearing_unregistered_trigger_succeeds() {
        let (gyro, _) = Gyro::started();

        assert_eq!(gyro.device.set_trigger(TriggerKind::Delta, None), Ok(()));
        assert_eq!(gyro.registers.get(ANY_EN), 0);
    }

    #[test]
    fn gyros_share_dispatch_queue() {
        let queue: &'static SharedDispatchQueue<4> = leak(SharedDispatchQueue::new());
        let first = Gyro::new();
        let second = Gyro::new();
        first.init(queue).unwrap();
        second.init(queue).unwrap();
        let first_counts = leak(Counts::default());
        let second_counts = leak(Counts::default());
        first
            .device
            .set_trigger(TriggerKind::DataReady, Some(first_counts))
            .unwrap();
        second
            .device
            .set_trigger(TriggerKind::Delta, Some(second_counts))
            .unwrap();
        second.registers.set(INT_STATUS0, ANY_INT);

        second.pin.fire_edge();
        first.pin.fire_edge();
        while queue.poll_cycle() {}

        assert_eq!(first_counts.get(), (1, 0));
        assert_eq!(second_counts.get(), (0, 1));
    }

    #[test]
    fn supports_both_triggers() {
        let device = TestDevice::new(Bmg160, Range::Dps2000, None);

        assert_eq!(device.supported_triggers().count(), 2);
    }
}
