//! Trigger support for the ST HTS221 humidity and temperature sensor.
//!
//! Only the data-ready trigger is available; the sensor has no configurable trigger attribute.

use ariel_os_sensor_trigger::{
    bus::RegisterWrite,
    chip::{AttributeUpdate, EnableField, SetupStep, StatusBlock, TriggerChip},
    AttributeKind, ConfigError, SensorChannel, SensorValue, TriggerDevice, TriggerKind,
};

/// I2C address of the sensor.
pub const I2C_ADDRESS: u8 = 0x5f;

/// Register address flag enabling auto-increment during burst reads.
///
/// To be passed to
/// [`I2cRegisterBus::with_auto_increment()`](ariel_os_sensor_trigger::bus::I2cRegisterBus::with_auto_increment).
pub const AUTO_INCREMENT: u8 = 0x80;

const CTRL_REG3: u8 = 0x22;
const DRDY_H_L: u8 = 1 << 7;
const PP_OD: u8 = 1 << 6;
const DRDY_EN: u8 = 1 << 2;

const STATUS_REG: u8 = 0x27;

const INTERRUPT_SETUP: &[SetupStep] = &[SetupStep {
    write: RegisterWrite::field(CTRL_REG3, DRDY_H_L | PP_OD, DRDY_H_L),
    description: "configure DRDY as push-pull active-low",
}];

/// The HTS221 register map.
#[derive(Debug, Copy, Clone, Default)]
pub struct Hts221;

/// An HTS221 with trigger support.
pub type Hts221Device<B, P> = TriggerDevice<Hts221, B, P>;

impl TriggerChip for Hts221 {
    type Scale = ();

    fn part_number(&self) -> &'static str {
        "HTS221"
    }

    fn channel(&self) -> SensorChannel {
        SensorChannel::All
    }

    fn status_block(&self) -> StatusBlock {
        StatusBlock {
            register: STATUS_REG,
            len: 1,
        }
    }

    fn classify(&self, _status: &[u8]) -> TriggerKind {
        TriggerKind::DataReady
    }

    fn enable_field(&self, kind: TriggerKind) -> Result<EnableField, ConfigError> {
        match kind {
            TriggerKind::DataReady => Ok(EnableField {
                register: CTRL_REG3,
                mask: DRDY_EN,
            }),
            TriggerKind::Delta => Err(ConfigError::Unsupported),
        }
    }

    fn configure_attribute(
        &self,
        _kind: AttributeKind,
        _value: SensorValue,
        _scale: (),
    ) -> Result<AttributeUpdate<()>, ConfigError> {
        Err(ConfigError::Unsupported)
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
        runner::DedicatedRunner,
        Config, Trigger, TriggerHandler,
    };
    use portable_atomic::{AtomicU32, Ordering};

    use super::*;

    type TestDevice = Hts221Device<DummyBus, DummyPin>;

    fn leak<T>(value: T) -> &'static T {
        Box::leak(Box::new(value))
    }

    struct Sensor {
        registers: &'static DummyRegisters,
        pin: &'static DummyPinState,
        device: &'static TestDevice,
        runner: &'static DedicatedRunner,
    }

    fn started() -> Sensor {
        let sensor = Sensor {
            registers: leak(DummyRegisters::new()),
            pin: leak(DummyPinState::new()),
            device: leak(TestDevice::new(Hts221, (), None)),
            runner: leak(DedicatedRunner::new()),
        };
        // Left over open-drain configuration.
        sensor.registers.set(CTRL_REG3, PP_OD | 0x01);
        sensor
            .device
            .init(
                DummyBus::new(sensor.registers),
                &DummyGpio::new("GPIO_0", 0, sensor.pin),
                sensor.runner,
                &Config::default(),
            )
            .unwrap();
        sensor
    }

    struct Samples(AtomicU32);

    impl TriggerHandler for Samples {
        fn handle(&self, trigger: Trigger) {
            assert_eq!(trigger.kind, TriggerKind::DataReady);
            assert_eq!(trigger.channel, SensorChannel::All);
            self.0.fetch_add(1, Ordering::AcqRel);
        }
    }

    #[test]
    fn init_sets_drdy_active_low_push_pull() {
        let sensor = started();

        assert_eq!(sensor.registers.get(CTRL_REG3), DRDY_H_L | 0x01);
    }

    #[test]
    fn every_edge_is_data_ready() {
        let sensor = started();
        let samples = leak(Samples(AtomicU32::new(0)));
        sensor
            .device
            .set_trigger(TriggerKind::DataReady, Some(samples))
            .unwrap();
        assert_eq!(sensor.registers.get(CTRL_REG3) & DRDY_EN, DRDY_EN);

        sensor.registers.set(STATUS_REG, 0x03);
        sensor.pin.fire_edge();
        sensor.pin.fire_edge();
        while sensor.runner.poll_cycle() {}

        assert_eq!(samples.0.load(Ordering::Acquire), 2);
    }

    #[test]
    fn has_no_motion_trigger() {
        let sensor = started();
        let writes = sensor.registers.write_count();

        assert_eq!(
            sensor.device.set_trigger(TriggerKind::Delta, None),
            Err(ConfigError::Unsupported)
        );
        assert_eq!(
            sensor
                .device
                .set_attribute(AttributeKind::SlopeDuration, SensorValue::Int(4)),
            Err(ConfigError::Unsupported)
        );
        assert_eq!(sensor.registers.write_count(), writes);
        assert!(sensor
            .device
            .supported_triggers()
            .eq([TriggerKind::DataReady]));
    }
}
